//! Core functionality for turning tokens into instances.
//!
//! Resolving a token looks up its [ProviderDescriptor](crate::provider::ProviderDescriptor) in a
//! [ModuleRegistry], returns the cached instance if there is one, and otherwise constructs a new
//! instance: a fixed value wins over a factory, which wins over the target type constructor.
//! Constructor parameters are resolved recursively, using declared injection tokens in place of
//! natural parameter tokens. Properties declared for the target type are injected after
//! construction.
//!
//! Missing dependencies are not fatal by default - they are logged and passed to the constructor
//! as absent arguments. Setting [ResolverOptions::reject_incomplete] turns them into errors.
//!
//! Dependency cycles are detected: re-entering a token which is still under construction fails
//! with [ResolverError::DependencyCycle]. A cycle passing through an already cached singleton is
//! not a cycle, since the cached instance is returned before construction starts.

use crate::error::ResolverError;
use crate::injection::{parameter_override, property_overrides, InjectionDeclaration};
use crate::instance::{BoxedInstance, CastMap, Instance, InstanceAnyPtr, InstancePtr};
use crate::provider::{Arguments, FactoryFunction, MetadataPtr, ProviderDescriptor, TargetType};
use crate::registry::ModuleRegistry;
use crate::token::Token;
use fxhash::FxHashSet;
use itertools::Itertools;
#[cfg(test)]
use mockall::automock;
use tracing::{debug, warn};

#[cfg(not(feature = "threadsafe"))]
pub type ResolverPtr = Box<dyn Resolver>;
#[cfg(feature = "threadsafe")]
pub type ResolverPtr = Box<dyn Resolver + Send + Sync>;

/// Resolution policy.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ResolverOptions {
    /// Reuse cached instances. When disabled, every resolution constructs a new instance.
    pub singleton: bool,
    /// Fail instead of constructing instances with unresolved constructor parameters.
    pub reject_incomplete: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            singleton: true,
            reject_incomplete: false,
        }
    }
}

/// Resolves instances from a [ModuleRegistry]. Resolvers hold no registry state themselves.
#[cfg_attr(test, automock)]
pub trait Resolver {
    /// Resolves given token. Unknown and non-injectable providers resolve to `None`.
    fn resolve(
        &self,
        token: &Token,
        registry: &mut ModuleRegistry,
    ) -> Result<Option<Instance>, ResolverError>;

    /// Returns metadata attached to given provider, without constructing it.
    fn metadata(&self, token: &Token, registry: &ModuleRegistry) -> Option<MetadataPtr>;

    /// Resolves all providers listed under given group, in registration order. Providers which
    /// resolve to `None` are skipped.
    fn resolve_group(
        &self,
        group: &Token,
        registry: &mut ModuleRegistry,
    ) -> Result<Vec<Instance>, ResolverError> {
        let names = registry
            .group(group)
            .map(<[Token]>::to_vec)
            .unwrap_or_default();

        names
            .iter()
            .filter_map(|name| self.resolve(name, registry).transpose())
            .try_collect()
    }
}

/// Default [Resolver] implementation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DefaultResolver {
    options: ResolverOptions,
}

impl DefaultResolver {
    #[inline]
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    #[inline]
    pub fn options(&self) -> ResolverOptions {
        self.options
    }
}

impl Resolver for DefaultResolver {
    fn resolve(
        &self,
        token: &Token,
        registry: &mut ModuleRegistry,
    ) -> Result<Option<Instance>, ResolverError> {
        if !registry.is_auto_inject_enabled() {
            return Ok(None);
        }

        Resolution::new(self.options, registry).resolve(token)
    }

    fn metadata(&self, token: &Token, registry: &ModuleRegistry) -> Option<MetadataPtr> {
        if !registry.is_auto_inject_enabled() {
            return None;
        }

        registry
            .descriptor(token)
            .and_then(|descriptor| descriptor.metadata().cloned())
    }
}

// everything needed to construct an instance, detached from the registry so it can be borrowed
// mutably during recursion
struct ConstructionPlan {
    target: Option<TargetType>,
    value: Option<Instance>,
    factory: Option<FactoryFunction>,
    casts: InstancePtr<CastMap>,
    declarations: Vec<InjectionDeclaration>,
}

impl ConstructionPlan {
    fn new(descriptor: &ProviderDescriptor, registry: &ModuleRegistry) -> Self {
        let declarations = descriptor
            .target()
            .and_then(|target| registry.properties().get(&target.name))
            .cloned()
            .unwrap_or_default();

        Self {
            target: descriptor.target().cloned(),
            value: descriptor.value(),
            factory: descriptor.factory().cloned(),
            casts: descriptor.casts().clone(),
            declarations,
        }
    }
}

/// A single top-level resolution, tracking tokens under construction.
struct Resolution<'r> {
    options: ResolverOptions,
    registry: &'r mut ModuleRegistry,
    tokens_under_construction: FxHashSet<Token>,
}

impl<'r> Resolution<'r> {
    fn new(options: ResolverOptions, registry: &'r mut ModuleRegistry) -> Self {
        Self {
            options,
            registry,
            tokens_under_construction: Default::default(),
        }
    }

    fn resolve(&mut self, token: &Token) -> Result<Option<Instance>, ResolverError> {
        if !token.is_determined() {
            return Ok(None);
        }

        let plan = match self.registry.descriptor(token) {
            Some(descriptor) if descriptor.is_injectable() => {
                if self.options.singleton {
                    if let Some(instance) = descriptor.instance() {
                        return Ok(Some(instance.clone()));
                    }
                }

                ConstructionPlan::new(descriptor, self.registry)
            }
            _ => return Ok(None),
        };

        if !self.tokens_under_construction.insert(token.clone()) {
            return Err(ResolverError::DependencyCycle(token.clone()));
        }

        let instance = self.construct(token, plan);
        self.tokens_under_construction.remove(token);

        let instance = match instance? {
            Some(instance) => instance,
            None => return Ok(None),
        };

        if let Some(descriptor) = self.registry.modules_mut().get_mut(token) {
            descriptor.set_instance(instance.clone());
        }

        Ok(Some(instance))
    }

    fn construct(
        &mut self,
        token: &Token,
        plan: ConstructionPlan,
    ) -> Result<Option<Instance>, ResolverError> {
        if let Some(value) = plan.value {
            return Ok(Some(value));
        }

        let construction_error = |error| ResolverError::ConstructionFailed {
            token: token.clone(),
            error,
        };

        let mut instance = if let Some(factory) = &plan.factory {
            (**factory)().map_err(construction_error)?
        } else if let Some(target) = &plan.target {
            let arguments = self.resolve_arguments(target, &plan.declarations)?;
            (target.constructor)(arguments).map_err(construction_error)?
        } else {
            debug!(token = %token, "Provider has neither a value, factory nor target type");
            return Ok(None);
        };

        if let Some(target) = &plan.target {
            self.inject_properties(target, &plan.declarations, &mut instance)?;
        }

        Ok(Some(Instance::from_parts(
            InstanceAnyPtr::from(instance),
            plan.casts,
        )))
    }

    fn resolve_arguments(
        &mut self,
        target: &TargetType,
        declarations: &[InjectionDeclaration],
    ) -> Result<Arguments, ResolverError> {
        target
            .parameters
            .iter()
            .enumerate()
            .map(|(index, parameter)| {
                // declared tokens always win over natural parameter tokens
                let token = parameter_override(declarations, index).unwrap_or(parameter);
                let dependency = self.resolve(token)?;

                if dependency.is_none() {
                    if self.options.reject_incomplete {
                        return Err(ResolverError::UnresolvedDependency {
                            token: token.clone(),
                            index,
                        });
                    }

                    warn!(
                        token = %token,
                        parameter = %parameter,
                        index,
                        "Unable to resolve dependency"
                    );
                }

                Ok(dependency)
            })
            .try_collect()
            .map(Arguments::new)
    }

    fn inject_properties(
        &mut self,
        target: &TargetType,
        declarations: &[InjectionDeclaration],
        instance: &mut BoxedInstance,
    ) -> Result<(), ResolverError> {
        for (key, token) in property_overrides(declarations) {
            match self.resolve(token)? {
                Some(value) => {
                    if !(target.property_injector)(&mut **instance, key, &value) {
                        debug!(type_name = %target.name, key, token = %token, "Property not injected");
                    }
                }
                None => {
                    debug!(type_name = %target.name, key, token = %token, "Skipping unresolved property");
                }
            }
        }

        Ok(())
    }
}
