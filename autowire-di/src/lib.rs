//! Token-based dependency injection runtime.
//!
//! Providers are registered in a [ModuleRegistry](registry::ModuleRegistry) under
//! [tokens](token::Token) - type names, explicit string keys or unique
//! [symbols](token::Symbol). A [Resolver](resolver::Resolver) turns a token into an
//! [Instance](instance::Instance) by returning a fixed value, calling a factory or constructing the
//! target type with recursively resolved parameters. Singleton instances are cached on the
//! provider descriptor. [Injection declarations](injection::InjectionDeclaration) override which
//! token a constructor parameter receives and request property injection after construction.
//!
//! Most applications interact with an [ApplicationContext](context::ApplicationContext), or with
//! the process-wide default context in [global], which is assembled from statically submitted
//! registrations.
//!
//! ### Features
//!
//! * `threadsafe` - use threadsafe pointers and `Send + Sync` trait bounds

pub mod context;
mod error;
pub mod global;
pub mod injection;
pub mod instance;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod token;

pub use error::{ApplicationContextError, DefaultContextError, ResolverError};
