//! Schema type model and scalar coercions.
//!
//! - [`SchemaType`] - object type with a deferred field thunk
//! - [`FieldSpec`] / [`FieldType`] - fields and their type references
//! - [`ScalarCoercionTable`] - storage type key → scalar type + coercion

mod object;
mod scalars;

pub use object::{
    FieldArgument, FieldMap, FieldSource, FieldSpec, FieldType, FieldsThunk, ObjectRef,
    SchemaType, TypeState, merge_by_precedence,
};
pub use scalars::{
    DateFormat, Eval, ScalarCoercionTable, ScalarMapping, ScalarType, date_eval, json_text_eval,
};
