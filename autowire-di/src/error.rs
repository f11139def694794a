use crate::instance::ErrorPtr;
use crate::token::Token;
use thiserror::Error;

/// Errors related to resolving instances. Missing providers are not errors - they resolve to
/// `None`.
#[derive(Error, Clone, Debug)]
pub enum ResolverError {
    #[error("Unable to resolve dependency [{token}] for constructor parameter {index}")]
    UnresolvedDependency { token: Token, index: usize },
    #[error("Detected a dependency cycle while resolving: {0}")]
    DependencyCycle(Token),
    #[error("Error constructing instance for [{token}]: {error}")]
    ConstructionFailed { token: Token, error: ErrorPtr },
    #[error("Missing constructor argument {index} of type {type_name}")]
    MissingArgument {
        index: usize,
        type_name: &'static str,
    },
    #[error("Instance resolved for [{0}] cannot be cast to the requested type")]
    IncompatibleInstance(Token),
    #[error(transparent)]
    DefaultContext(#[from] DefaultContextError),
}

/// Errors related to creating application contexts.
#[derive(Error, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum ApplicationContextError {
    #[error("Cannot create an application context without providers")]
    NoProviders,
    #[error(transparent)]
    DefaultContext(#[from] DefaultContextError),
}

/// Errors related to accessing the default context.
#[derive(Error, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum DefaultContextError {
    #[error("Default context accessed while already in use by the current thread, e.g. from a constructor or factory it called")]
    Reentrant,
}
