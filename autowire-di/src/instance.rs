//! Shared pointers to type-erased instances and typed views over them.
//!
//! Resolution works on type-erased values. To get a typed pointer back, each provider carries a
//! map of [CastFunction]s keyed by the requested pointer type: the concrete type is always
//! available, while trait object views (`InstancePtr<dyn Trait>`) need to be registered as
//! aliases, since there is no way to discover them at runtime.

use derivative::Derivative;
use fxhash::FxHashMap;
use std::any::{Any, TypeId};
use std::error::Error;
#[cfg(not(feature = "threadsafe"))]
use std::rc::Rc;
#[cfg(feature = "threadsafe")]
use std::sync::Arc;

#[cfg(not(feature = "threadsafe"))]
pub type InstancePtr<T> = Rc<T>;
#[cfg(feature = "threadsafe")]
pub type InstancePtr<T> = Arc<T>;

#[cfg(not(feature = "threadsafe"))]
pub type AnyInstance = dyn Any + 'static;
#[cfg(feature = "threadsafe")]
pub type AnyInstance = dyn Any + Send + Sync + 'static;

pub type InstanceAnyPtr = InstancePtr<AnyInstance>;

/// Owned instance, before it gets shared. Properties are injected at this stage.
pub type BoxedInstance = Box<AnyInstance>;

#[cfg(not(feature = "threadsafe"))]
pub type ErrorPtr = InstancePtr<dyn Error + 'static>;
#[cfg(feature = "threadsafe")]
pub type ErrorPtr = InstancePtr<dyn Error + Send + Sync + 'static>;

/// Bounds for values which can be stored as instances.
#[cfg(not(feature = "threadsafe"))]
pub trait InstanceValue: Any {}
#[cfg(not(feature = "threadsafe"))]
impl<T: Any> InstanceValue for T {}

/// Bounds for values which can be stored as instances.
#[cfg(feature = "threadsafe")]
pub trait InstanceValue: Any + Send + Sync {}
#[cfg(feature = "threadsafe")]
impl<T: Any + Send + Sync> InstanceValue for T {}

/// Casts a type-erased instance to a `Box<InstancePtr<T>>` erased as `Box<dyn Any>`. `T` is
/// determined by the key under which the function is registered. Returns the original instance
/// back if the cast is not possible.
pub type CastFunction =
    InstancePtr<dyn Fn(InstanceAnyPtr) -> Result<Box<dyn Any>, InstanceAnyPtr> + Send + Sync>;

/// Available views of an instance, keyed by `TypeId::of::<InstancePtr<T>>()`.
pub type CastMap = FxHashMap<TypeId, CastFunction>;

fn cast_concrete<T: InstanceValue>(
    instance: InstanceAnyPtr,
) -> Result<Box<dyn Any>, InstanceAnyPtr> {
    instance.downcast::<T>().map(|p| Box::new(p) as Box<dyn Any>)
}

/// Creates a cast map containing only the view of the concrete type `T`.
pub fn concrete_casts<T: InstanceValue>() -> CastMap {
    let mut casts = CastMap::default();
    casts.insert(
        TypeId::of::<InstancePtr<T>>(),
        InstancePtr::new(cast_concrete::<T>) as CastFunction,
    );
    casts
}

/// Creates a cast from concrete `T` to a view `A` using the given upcast, e.g. `|p| p` for
/// `InstancePtr<T>` to `InstancePtr<dyn Trait>`.
pub fn alias_cast<T: InstanceValue, A: ?Sized + 'static>(
    upcast: fn(InstancePtr<T>) -> InstancePtr<A>,
) -> (TypeId, CastFunction) {
    (
        TypeId::of::<InstancePtr<A>>(),
        InstancePtr::new(
            move |instance: InstanceAnyPtr| -> Result<Box<dyn Any>, InstanceAnyPtr> {
                instance
                    .downcast::<T>()
                    .map(|p| Box::new(upcast(p)) as Box<dyn Any>)
            },
        ) as CastFunction,
    )
}

/// A resolved instance along with the views it supports.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Instance {
    #[derivative(Debug = "ignore")]
    value: InstanceAnyPtr,
    #[derivative(Debug = "ignore")]
    casts: InstancePtr<CastMap>,
}

impl Instance {
    /// Wraps a typed instance, supporting only its concrete view.
    pub fn new<T: InstanceValue>(value: InstancePtr<T>) -> Self {
        Self {
            value: value as InstanceAnyPtr,
            casts: InstancePtr::new(concrete_casts::<T>()),
        }
    }

    #[inline]
    pub(crate) fn from_parts(value: InstanceAnyPtr, casts: InstancePtr<CastMap>) -> Self {
        Self { value, casts }
    }

    /// Returns the type-erased pointer.
    #[inline]
    pub fn value(&self) -> &InstanceAnyPtr {
        &self.value
    }

    /// Returns a pointer to the concrete type, if it matches.
    pub fn downcast<T: InstanceValue>(&self) -> Option<InstancePtr<T>> {
        self.value.clone().downcast::<T>().ok()
    }

    /// Returns a pointer to any registered view, including trait object aliases.
    pub fn cast<T: ?Sized + 'static>(&self) -> Option<InstancePtr<T>> {
        let cast = self.casts.get(&TypeId::of::<InstancePtr<T>>())?;
        (**cast)(self.value.clone())
            .ok()?
            .downcast::<InstancePtr<T>>()
            .ok()
            .map(|p| *p)
    }

    /// Checks if a view of type `T` is registered.
    #[inline]
    pub fn supports<T: ?Sized + 'static>(&self) -> bool {
        self.casts.contains_key(&TypeId::of::<InstancePtr<T>>())
    }

    /// Checks if both handles point to the same instance.
    #[inline]
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        std::ptr::eq(
            InstancePtr::as_ptr(&self.value) as *const (),
            InstancePtr::as_ptr(&other.value) as *const (),
        )
    }
}
