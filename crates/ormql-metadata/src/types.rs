//! Entity descriptor and field registration types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// How many target instances an association refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// A single target instance.
    Single,
    /// An ordered collection of target instances.
    List,
}

impl Cardinality {
    /// Returns `true` for [`Cardinality::List`].
    #[must_use]
    pub fn is_list(self) -> bool {
        matches!(self, Self::List)
    }
}

/// ORM association kinds.
///
/// The to-many kinds map to [`Cardinality::List`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
}

impl From<AssociationKind> for Cardinality {
    fn from(kind: AssociationKind) -> Self {
        match kind {
            AssociationKind::OneToMany | AssociationKind::ManyToMany => Self::List,
            AssociationKind::OneToOne | AssociationKind::ManyToOne => Self::Single,
        }
    }
}

/// A persisted column exposed as a scalar field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarFieldDescriptor {
    /// Property name on the entity.
    pub field_name: String,
    /// Storage type key, e.g. `integer` or `datetime`.
    pub storage_type: String,
}

/// A reference from one entity to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDescriptor {
    /// Property name on the entity.
    pub field_name: String,
    /// Fully qualified class name of the target entity.
    pub target_class: String,
    /// Single reference or collection.
    pub cardinality: Cardinality,
}

/// Persistence mapping of one entity class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Fully qualified class name.
    pub class_name: String,
    /// Scalar columns in declaration order.
    #[serde(default)]
    pub scalar_fields: Vec<ScalarFieldDescriptor>,
    /// Associations in declaration order.
    #[serde(default)]
    pub associations: Vec<AssociationDescriptor>,
}

impl EntityDescriptor {
    /// Creates a descriptor with no fields.
    #[must_use]
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            scalar_fields: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// Adds a scalar field.
    #[must_use]
    pub fn scalar(mut self, field_name: impl Into<String>, storage_type: impl Into<String>) -> Self {
        self.scalar_fields.push(ScalarFieldDescriptor {
            field_name: field_name.into(),
            storage_type: storage_type.into(),
        });
        self
    }

    /// Adds an association.
    #[must_use]
    pub fn association(
        mut self,
        field_name: impl Into<String>,
        target_class: impl Into<String>,
        cardinality: impl Into<Cardinality>,
    ) -> Self {
        self.associations.push(AssociationDescriptor {
            field_name: field_name.into(),
            target_class: target_class.into(),
            cardinality: cardinality.into(),
        });
        self
    }
}

/// A declared argument of a registered field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    pub name: String,
    /// Scalar storage type key of the argument.
    pub type_key: String,
    #[serde(default)]
    pub nullable: bool,
}

/// A method-bound field registration declared on an entity class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRegistration {
    /// Explicit field name. Falls back to [`method`](Self::method) when absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Name of the declaring method; invoked as the field's resolver.
    pub method: String,
    /// Scalar storage key, or a class name (qualified or namespace-relative).
    pub return_type: String,
    #[serde(default)]
    pub is_list: bool,
    #[serde(default)]
    pub arguments: Vec<ArgumentSpec>,
}

impl FieldRegistration {
    /// Creates a registration for `method` returning `return_type`.
    #[must_use]
    pub fn new(method: impl Into<String>, return_type: impl Into<String>) -> Self {
        Self {
            name: None,
            method: method.into(),
            return_type: return_type.into(),
            is_list: false,
            arguments: Vec::new(),
        }
    }

    /// Sets an explicit field name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the return value as a list.
    #[must_use]
    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    /// Declares an argument.
    #[must_use]
    pub fn argument(
        mut self,
        name: impl Into<String>,
        type_key: impl Into<String>,
        nullable: bool,
    ) -> Self {
        self.arguments.push(ArgumentSpec {
            name: name.into(),
            type_key: type_key.into(),
            nullable,
        });
        self
    }

    /// The field key before case normalization.
    #[must_use]
    pub fn field_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.method)
    }
}

/// Property names excluded from scalar and association derivation.
pub type BlacklistSet = BTreeSet<String>;
