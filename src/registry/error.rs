//! Registry error types.

/// Error type for registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The stream already has an active producer.
    AlreadyLive(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::AlreadyLive(name) => {
                write!(f, "stream already has a producer: {}", name)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
