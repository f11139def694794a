//! An [ApplicationContext] pairs one [ModuleRegistry] with one [Resolver] and is the entry point
//! for obtaining instances. Contexts are built from a list of [Provider]s:
//!
//! ```
//! use autowire_di::context::{ApplicationContext, Provider};
//! use autowire_di::instance::ErrorPtr;
//! use autowire_di::provider::{Arguments, Injectable, ProviderDescriptor};
//!
//! struct Clock;
//!
//! impl Injectable for Clock {
//!     fn construct(_arguments: Arguments) -> Result<Self, ErrorPtr> {
//!         Ok(Clock)
//!     }
//! }
//!
//! let mut context = ApplicationContext::builder()
//!     .with_provider(Provider::of::<Clock>())
//!     .with_provider(ProviderDescriptor::new().with_token("TIMEOUT").with_value(30u64))
//!     .build()
//!     .expect("error creating context");
//!
//! assert!(context.get_typed::<Clock>().unwrap().is_some());
//! assert_eq!(*context.get("TIMEOUT").unwrap().unwrap().downcast::<u64>().unwrap(), 30);
//! ```
//!
//! Every provider supplied to a context is injectable, regardless of how its descriptor was
//! declared. Providers without a usable name are logged and skipped.

use crate::error::{ApplicationContextError, ResolverError};
use crate::injection::{InjectionDeclaration, InjectionMap};
use crate::instance::{Instance, InstancePtr};
use crate::provider::{Injectable, MetadataPtr, ProviderDescriptor, TargetType};
use crate::registry::ModuleRegistry;
use crate::resolver::{DefaultResolver, ResolverOptions, ResolverPtr};
use crate::token::Token;
use tracing::error;

/// Entry of a provider list.
#[derive(Clone, Debug)]
pub enum Provider {
    /// Constructible type, registered under its type name.
    Type(TargetType),
    /// Fully specified descriptor, registered under its name.
    Options(ProviderDescriptor),
}

impl Provider {
    #[inline]
    pub fn of<T: Injectable>() -> Self {
        Self::Type(TargetType::of::<T>())
    }

    fn into_descriptor(self) -> ProviderDescriptor {
        match self {
            Self::Type(target) => ProviderDescriptor::from_target(target),
            Self::Options(descriptor) => descriptor,
        }
    }
}

impl From<TargetType> for Provider {
    #[inline]
    fn from(value: TargetType) -> Self {
        Self::Type(value)
    }
}

impl From<ProviderDescriptor> for Provider {
    #[inline]
    fn from(value: ProviderDescriptor) -> Self {
        Self::Options(value)
    }
}

/// Builder for [ApplicationContext] with sensible defaults.
pub struct ApplicationContextBuilder {
    providers: Vec<(Option<Token>, Provider)>,
    resolver: Option<ResolverPtr>,
    resolver_options: ResolverOptions,
    declarations: InjectionMap,
    auto_inject: bool,
}

impl Default for ApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationContextBuilder {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            resolver: None,
            resolver_options: Default::default(),
            declarations: Default::default(),
            auto_inject: true,
        }
    }

    pub fn with_provider<P: Into<Provider>>(mut self, provider: P) -> Self {
        self.providers.push((None, provider.into()));
        self
    }

    pub fn with_providers<I: IntoIterator<Item = Provider>>(mut self, providers: I) -> Self {
        self.providers
            .extend(providers.into_iter().map(|provider| (None, provider)));
        self
    }

    /// Adds a provider which is also listed under given group.
    pub fn with_grouped_provider<G: Into<Token>, P: Into<Provider>>(
        mut self,
        group: G,
        provider: P,
    ) -> Self {
        self.providers.push((Some(group.into()), provider.into()));
        self
    }

    /// Sets a custom resolver. Resolver options are ignored in such case.
    pub fn with_resolver(mut self, resolver: ResolverPtr) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sets options for the [DefaultResolver].
    pub fn with_resolver_options(mut self, resolver_options: ResolverOptions) -> Self {
        self.resolver_options = resolver_options;
        self
    }

    /// Replaces injection declarations, e.g. with ones inherited from another context.
    pub fn with_declarations(mut self, declarations: InjectionMap) -> Self {
        self.declarations = declarations;
        self
    }

    pub fn with_declaration(mut self, declaration: InjectionDeclaration) -> Self {
        self.declarations
            .entry(declaration.target_type.clone())
            .or_default()
            .push(declaration);
        self
    }

    pub fn with_auto_inject(mut self, auto_inject: bool) -> Self {
        self.auto_inject = auto_inject;
        self
    }

    /// Builds the resulting [ApplicationContext]. Fails if there are no providers.
    pub fn build(self) -> Result<ApplicationContext, ApplicationContextError> {
        if self.providers.is_empty() {
            return Err(ApplicationContextError::NoProviders);
        }

        let mut registry = ModuleRegistry::with_seed(None, Some(self.declarations))
            .with_auto_inject(self.auto_inject);

        for (group, provider) in self.providers {
            let mut descriptor = provider.into_descriptor();
            if descriptor.name().is_none() {
                error!("Invalid name was provided for a provider - skipping it");
                continue;
            }

            descriptor.set_injectable(true);

            match group {
                Some(group) => registry.register(group, descriptor),
                None => registry.insert(descriptor),
            };
        }

        let resolver_options = self.resolver_options;
        let resolver = self
            .resolver
            .unwrap_or_else(|| Box::new(DefaultResolver::new(resolver_options)) as ResolverPtr);

        Ok(ApplicationContext::new(registry, resolver))
    }
}

/// Facade over a [ModuleRegistry] and [Resolver](crate::resolver::Resolver) pair.
pub struct ApplicationContext {
    registry: ModuleRegistry,
    resolver: ResolverPtr,
}

impl ApplicationContext {
    #[inline]
    pub fn new(registry: ModuleRegistry, resolver: ResolverPtr) -> Self {
        Self { registry, resolver }
    }

    #[inline]
    pub fn builder() -> ApplicationContextBuilder {
        ApplicationContextBuilder::new()
    }

    /// Resolves given token.
    pub fn get<T: Into<Token>>(&mut self, token: T) -> Result<Option<Instance>, ResolverError> {
        self.resolver.resolve(&token.into(), &mut self.registry)
    }

    /// Resolves given token and casts the instance to `T`.
    pub fn get_as<T: ?Sized + 'static, K: Into<Token>>(
        &mut self,
        token: K,
    ) -> Result<Option<InstancePtr<T>>, ResolverError> {
        let token = token.into();
        self.get(token.clone())?
            .map(|instance| {
                instance
                    .cast::<T>()
                    .ok_or(ResolverError::IncompatibleInstance(token))
            })
            .transpose()
    }

    /// Resolves the provider registered under the name of `T`.
    #[inline]
    pub fn get_typed<T: ?Sized + 'static>(
        &mut self,
    ) -> Result<Option<InstancePtr<T>>, ResolverError> {
        self.get_as::<T, _>(Token::of::<T>())
    }

    /// Returns metadata attached to given provider, without constructing it.
    pub fn get_metadata<T: Into<Token>>(&self, token: T) -> Option<MetadataPtr> {
        self.resolver.metadata(&token.into(), &self.registry)
    }

    /// Resolves all providers listed under given group.
    pub fn get_for<G: Into<Token>>(&mut self, group: G) -> Result<Vec<Instance>, ResolverError> {
        self.resolver.resolve_group(&group.into(), &mut self.registry)
    }

    /// Returns the descriptor registered under given token.
    pub fn get_wrapper<T: Into<Token>>(&self, token: T) -> Option<&ProviderDescriptor> {
        self.registry.descriptor(&token.into())
    }

    /// Returns descriptors listed under given group.
    pub fn get_wrappers_for<G: Into<Token>>(&self, group: G) -> Vec<&ProviderDescriptor> {
        self.registry.group_descriptors(&group.into())
    }

    #[inline]
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    #[inline]
    pub fn registry_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.registry
    }

    /// Starts building a child context, which inherits injection declarations of this one, but
    /// none of its providers.
    pub fn scoped(&self) -> ApplicationContextBuilder {
        ApplicationContextBuilder::new()
            .with_declarations(self.registry.properties().clone())
            .with_auto_inject(self.registry.is_auto_inject_enabled())
    }
}
