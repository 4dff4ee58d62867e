use std::fmt;

/// Dependency resolution failure.
///
/// Every variant is a programming or wiring error from the client's point of
/// view; the dispatcher reports all of them as 500.
#[derive(Debug)]
pub enum RegistryError {
    /// `resolve` was called for a name that was never registered
    UnknownDependency {
        /// The requested name
        name: String,
    },
    /// A factory (transitively) depends on itself
    Cycle {
        /// Resolution stack, outermost first, ending with the repeated name
        chain: Vec<String>,
    },
    /// The resolution stack grew past the configured depth
    DepthExceeded {
        /// The name whose resolution was refused
        name: String,
        /// The configured maximum
        limit: usize,
    },
    /// The memoized instance is not of the requested type
    TypeMismatch {
        /// The dependency name
        name: String,
        /// The type the caller asked for
        expected: &'static str,
    },
    /// The factory itself failed
    Factory {
        /// The dependency being constructed
        name: String,
        /// What the factory returned
        source: anyhow::Error,
    },
}

impl RegistryError {
    /// Stable snake_case tag for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::UnknownDependency { .. } => "unknown_dependency",
            RegistryError::Cycle { .. } => "dependency_cycle",
            RegistryError::DepthExceeded { .. } => "resolution_depth_exceeded",
            RegistryError::TypeMismatch { .. } => "dependency_type_mismatch",
            RegistryError::Factory { .. } => "dependency_factory_failed",
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnknownDependency { name } => {
                write!(f, "unknown dependency '{name}'")
            }
            RegistryError::Cycle { chain } => {
                write!(f, "dependency cycle: {}", chain.join(" -> "))
            }
            RegistryError::DepthExceeded { name, limit } => {
                write!(
                    f,
                    "resolving '{name}' exceeds the maximum resolution depth of {limit}"
                )
            }
            RegistryError::TypeMismatch { name, expected } => {
                write!(f, "dependency '{name}' is not a {expected}")
            }
            RegistryError::Factory { name, .. } => {
                write!(f, "factory for '{name}' failed")
            }
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryError::Factory { source, .. } => Some(&**source),
            _ => None,
        }
    }
}
