//! Field resolvers.
//!
//! Every generated field carries a [`FieldResolver`] describing how its value
//! is read from the parent entity. The exported async-graphql schema calls
//! into it from each field's `FieldFuture`.

mod field;

pub use field::{FieldResolver, ValueProxy};
