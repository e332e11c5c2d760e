//! Class and field name conventions.
//!
//! Class names are `::`-separated paths (`blog::model::Post`). The last
//! segment is the schema type name; everything before it is the namespace.

/// Separator between namespace segments of a class name.
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Returns the class name without its namespace.
pub fn unqualified_name(class_name: &str) -> &str {
    class_name
        .rsplit_once(NAMESPACE_SEPARATOR)
        .map_or(class_name, |(_, name)| name)
}

/// Returns the namespace of a class name, if it has one.
pub fn namespace_of(class_name: &str) -> Option<&str> {
    class_name
        .rsplit_once(NAMESPACE_SEPARATOR)
        .map(|(namespace, _)| namespace)
}

/// Returns `true` if `name` already carries a namespace.
pub fn is_qualified(name: &str) -> bool {
    name.contains(NAMESPACE_SEPARATOR)
}

/// Resolves `name` against the namespace of `declaring_class`.
///
/// Qualified names are returned unchanged.
pub fn qualify(name: &str, declaring_class: &str) -> String {
    if is_qualified(name) {
        return name.to_string();
    }
    match namespace_of(declaring_class) {
        Some(namespace) => format!("{namespace}{NAMESPACE_SEPARATOR}{name}"),
        None => name.to_string(),
    }
}

/// Normalizes a field key to camelCase.
///
/// Only an underscore followed by a lowercase ASCII letter is folded
/// (`first_name` → `firstName`); other underscores are kept.
pub fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '_'
            && let Some(&next) = chars.peek()
            && next.is_ascii_lowercase()
        {
            out.push(next.to_ascii_uppercase());
            chars.next();
            continue;
        }
        out.push(c);
    }
    out
}

/// Derives the conventional accessor name for a field key.
///
/// `first_name` and `firstName` both become `getFirstName`.
pub fn accessor_name(key: &str) -> String {
    let mut name = String::from("get");
    for part in key.split('_') {
        name.push_str(&capitalize_first(part));
    }
    name
}

/// Capitalizes the first character of a string.
fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
    }
}
