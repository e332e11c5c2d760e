//! Error types for entity metadata access and method invocation.

/// Errors raised by a [`MetadataProvider`](crate::MetadataProvider).
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The class has no persistence mapping.
    #[error("No mapping information to process for {class_name}")]
    NotMapped {
        /// The class that was looked up.
        class_name: String,
    },

    /// The provider itself failed.
    #[error("Metadata provider error: {message}")]
    Provider {
        /// Description of the failure.
        message: String,
    },
}

impl MetadataError {
    /// Creates a new `NotMapped` error.
    #[must_use]
    pub fn not_mapped(class_name: impl Into<String>) -> Self {
        Self::NotMapped {
            class_name: class_name.into(),
        }
    }

    /// Creates a new `Provider` error.
    #[must_use]
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not mapped error.
    #[must_use]
    pub fn is_not_mapped(&self) -> bool {
        matches!(self, Self::NotMapped { .. })
    }
}

/// Errors raised while invoking a method on an [`EntityObject`](crate::EntityObject).
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The entity does not expose the requested method.
    #[error("{class_name} has no method {method}")]
    UnknownMethod {
        /// Class of the receiver.
        class_name: String,
        /// Method that was requested.
        method: String,
    },

    /// The method ran and failed.
    #[error("{method} failed: {message}")]
    Failed {
        /// Method that failed.
        method: String,
        /// Description of the failure.
        message: String,
    },
}

impl InvokeError {
    /// Creates a new `UnknownMethod` error.
    #[must_use]
    pub fn unknown_method(class_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self::UnknownMethod {
            class_name: class_name.into(),
            method: method.into(),
        }
    }

    /// Creates a new `Failed` error.
    #[must_use]
    pub fn failed(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            method: method.into(),
            message: message.into(),
        }
    }
}
