//! Providers are the sources of instances: constructible [Injectable] types, fixed values or
//! factory functions. Each registered provider is described by a [ProviderDescriptor], which also
//! holds the cached singleton instance once resolved.
//!
//! ## Injectable types
//!
//! There is no runtime reflection of constructor signatures, so types declare their dependencies
//! explicitly by implementing [Injectable]:
//!
//! ```
//! use autowire_di::instance::{ErrorPtr, InstancePtr};
//! use autowire_di::provider::{Arguments, Injectable};
//! use autowire_di::token::Token;
//!
//! struct Repository;
//!
//! impl Injectable for Repository {
//!     fn construct(_arguments: Arguments) -> Result<Self, ErrorPtr> {
//!         Ok(Repository)
//!     }
//! }
//!
//! struct Service {
//!     repository: InstancePtr<Repository>,
//! }
//!
//! impl Injectable for Service {
//!     fn parameters() -> Vec<Token> {
//!         vec![Token::of::<Repository>()]
//!     }
//!
//!     fn construct(arguments: Arguments) -> Result<Self, ErrorPtr> {
//!         Ok(Service {
//!             repository: arguments.required(0)?,
//!         })
//!     }
//! }
//! ```
//!
//! Parameter tokens can be overridden per type with
//! [InjectionDeclarations](crate::injection::InjectionDeclaration).

use crate::error::ResolverError;
use crate::instance::{
    alias_cast, concrete_casts, AnyInstance, BoxedInstance, CastMap, ErrorPtr, Instance,
    InstanceAnyPtr, InstancePtr, InstanceValue,
};
use crate::token::Token;
use derivative::Derivative;
use std::any::{type_name, TypeId};

/// Types which can be constructed by a [Resolver](crate::resolver::Resolver).
pub trait Injectable: InstanceValue + Sized {
    /// Natural tokens of constructor parameters, in order. No parameters means the type is
    /// constructed with empty [Arguments].
    fn parameters() -> Vec<Token> {
        Vec::new()
    }

    /// Creates a new instance from resolved arguments. Arguments which could not be resolved are
    /// absent.
    fn construct(arguments: Arguments) -> Result<Self, ErrorPtr>;

    /// Assigns an injected property after construction. Returns `false` if the key is unknown or
    /// the value is incompatible.
    fn inject_property(&mut self, _key: &str, _value: &Instance) -> bool {
        false
    }
}

/// Resolved constructor arguments, positionally matching [Injectable::parameters].
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    values: Vec<Option<Instance>>,
}

impl Arguments {
    #[inline]
    pub fn new(values: Vec<Option<Instance>>) -> Self {
        Self { values }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the argument at given position, if it was resolved.
    pub fn get(&self, index: usize) -> Option<&Instance> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Returns the argument at given position as `T`, if it was resolved and supports such view.
    pub fn cast<T: ?Sized + 'static>(&self, index: usize) -> Option<InstancePtr<T>> {
        self.get(index).and_then(|instance| instance.cast::<T>())
    }

    /// Like [Arguments::cast], but fails with [ResolverError::MissingArgument].
    pub fn required<T: ?Sized + 'static>(&self, index: usize) -> Result<InstancePtr<T>, ErrorPtr> {
        self.cast(index).ok_or_else(|| {
            InstancePtr::new(ResolverError::MissingArgument {
                index,
                type_name: type_name::<T>(),
            }) as ErrorPtr
        })
    }
}

fn construct_erased<T: Injectable>(arguments: Arguments) -> Result<BoxedInstance, ErrorPtr> {
    T::construct(arguments).map(|instance| Box::new(instance) as BoxedInstance)
}

fn inject_property_erased<T: Injectable>(
    instance: &mut AnyInstance,
    key: &str,
    value: &Instance,
) -> bool {
    instance
        .downcast_mut::<T>()
        .map(|instance| instance.inject_property(key, value))
        .unwrap_or(false)
}

/// Type-erased description of an [Injectable] type.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct TargetType {
    /// Type name used as the default token.
    pub name: Token,

    pub type_id: TypeId,

    /// Natural constructor parameter tokens.
    pub parameters: Vec<Token>,

    #[derivative(Debug = "ignore")]
    pub constructor: fn(Arguments) -> Result<BoxedInstance, ErrorPtr>,

    #[derivative(Debug = "ignore")]
    pub property_injector: fn(&mut AnyInstance, &str, &Instance) -> bool,

    #[derivative(Debug = "ignore")]
    pub casts: fn() -> CastMap,
}

impl TargetType {
    pub fn of<T: Injectable>() -> Self {
        Self {
            name: Token::of::<T>(),
            type_id: TypeId::of::<T>(),
            parameters: T::parameters(),
            constructor: construct_erased::<T>,
            property_injector: inject_property_erased::<T>,
            casts: concrete_casts::<T>,
        }
    }
}

/// Factory producing new instances.
pub type FactoryFunction =
    InstancePtr<dyn Fn() -> Result<BoxedInstance, ErrorPtr> + Send + Sync + 'static>;

/// Free-form data attached to a provider.
pub type MetadataPtr = InstanceAnyPtr;

/// Registration record for a provider. Apart from the cached instance, descriptors do not change
/// after registration.
///
/// Construction strategy is chosen in order: fixed value, factory, target type constructor.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct ProviderDescriptor {
    token: Option<Token>,
    target: Option<TargetType>,
    #[derivative(Debug = "ignore")]
    use_value: Option<InstanceAnyPtr>,
    #[derivative(Debug = "ignore")]
    use_factory: Option<FactoryFunction>,
    injectable: bool,
    #[derivative(Debug = "ignore")]
    instance: Option<Instance>,
    #[derivative(Debug = "ignore")]
    metadata: Option<MetadataPtr>,
    #[derivative(Debug = "ignore")]
    casts: InstancePtr<CastMap>,
}

impl Default for ProviderDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderDescriptor {
    /// Creates an empty, non-injectable descriptor.
    pub fn new() -> Self {
        Self {
            token: None,
            target: None,
            use_value: None,
            use_factory: None,
            injectable: false,
            instance: None,
            metadata: None,
            casts: Default::default(),
        }
    }

    /// Creates a descriptor constructing `T`.
    pub fn for_type<T: Injectable>() -> Self {
        Self::from_target(TargetType::of::<T>())
    }

    pub fn from_target(target: TargetType) -> Self {
        let casts = (target.casts)();
        Self {
            target: Some(target),
            casts: InstancePtr::new(casts),
            ..Self::new()
        }
    }

    /// Sets a custom token, used instead of the target type name.
    pub fn with_token<T: Into<Token>>(mut self, token: T) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets a fixed value, which takes precedence over any other construction strategy.
    pub fn with_value<T: InstanceValue>(self, value: T) -> Self {
        self.with_shared_value(InstancePtr::new(value))
    }

    /// Like [ProviderDescriptor::with_value], but for already shared values.
    pub fn with_shared_value<T: InstanceValue>(mut self, value: InstancePtr<T>) -> Self {
        self.use_value = Some(value as InstanceAnyPtr);
        InstancePtr::make_mut(&mut self.casts).extend(concrete_casts::<T>());
        self
    }

    /// Sets a factory, which is used when no fixed value is present.
    pub fn with_factory<T, F>(mut self, factory: F) -> Self
    where
        T: InstanceValue,
        F: Fn() -> Result<T, ErrorPtr> + Send + Sync + 'static,
    {
        self.use_factory = Some(InstancePtr::new(move || {
            factory().map(|instance| Box::new(instance) as BoxedInstance)
        }) as FactoryFunction);
        InstancePtr::make_mut(&mut self.casts).extend(concrete_casts::<T>());
        self
    }

    /// Attaches free-form metadata, available without constructing the instance.
    pub fn with_metadata<M: InstanceValue>(mut self, metadata: M) -> Self {
        self.metadata = Some(InstancePtr::new(metadata) as MetadataPtr);
        self
    }

    /// Registers an additional view `A` of the concrete instance type `T`, typically a trait
    /// object: `with_alias::<Concrete, dyn Trait>(|p| p)`.
    pub fn with_alias<T: InstanceValue, A: ?Sized + 'static>(
        mut self,
        upcast: fn(InstancePtr<T>) -> InstancePtr<A>,
    ) -> Self {
        let (key, cast) = alias_cast(upcast);
        InstancePtr::make_mut(&mut self.casts).insert(key, cast);
        self
    }

    pub fn with_injectable(mut self, injectable: bool) -> Self {
        self.injectable = injectable;
        self
    }

    /// Returns the name under which this provider is registered: the custom token or the target
    /// type name. `None` if neither is usable.
    pub fn name(&self) -> Option<&Token> {
        self.token
            .as_ref()
            .or_else(|| self.target.as_ref().map(|target| &target.name))
            .filter(|name| name.is_determined())
    }

    #[inline]
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    #[inline]
    pub fn target(&self) -> Option<&TargetType> {
        self.target.as_ref()
    }

    /// Returns the fixed value as an [Instance], if set.
    pub fn value(&self) -> Option<Instance> {
        self.use_value
            .as_ref()
            .map(|value| Instance::from_parts(value.clone(), self.casts.clone()))
    }

    #[inline]
    pub fn factory(&self) -> Option<&FactoryFunction> {
        self.use_factory.as_ref()
    }

    #[inline]
    pub fn has_value(&self) -> bool {
        self.use_value.is_some()
    }

    #[inline]
    pub fn has_factory(&self) -> bool {
        self.use_factory.is_some()
    }

    #[inline]
    pub fn is_injectable(&self) -> bool {
        self.injectable
    }

    #[inline]
    pub fn set_injectable(&mut self, injectable: bool) {
        self.injectable = injectable;
    }

    /// Returns the cached instance, if already resolved.
    #[inline]
    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    #[inline]
    pub fn set_instance(&mut self, instance: Instance) {
        self.instance = Some(instance);
    }

    #[inline]
    pub fn metadata(&self) -> Option<&MetadataPtr> {
        self.metadata.as_ref()
    }

    /// Views supported by instances of this provider.
    #[inline]
    pub fn casts(&self) -> &InstancePtr<CastMap> {
        &self.casts
    }
}
