//! Process-wide default context, assembled from statically submitted registrations.
//!
//! Providers and injection declarations can be submitted from anywhere in the dependency graph
//! of the final binary, without an explicit registration call:
//!
//! ```
//! use autowire_di::global::{self, Registerer, Registration};
//! use autowire_di::provider::ProviderDescriptor;
//!
//! fn register_greeting() -> Registration {
//!     Registration::Provider {
//!         group: "greetings".into(),
//!         descriptor: ProviderDescriptor::new()
//!             .with_token("GREETING")
//!             .with_value("hello")
//!             .with_injectable(true),
//!     }
//! }
//!
//! global::submit! {
//!     Registerer {
//!         register: register_greeting,
//!     }
//! }
//!
//! fn main() {
//!     let greeting = global::resolve("GREETING")
//!         .expect("error resolving greeting")
//!         .and_then(|instance| instance.downcast::<&'static str>());
//!     assert_eq!(greeting.as_deref(), Some(&"hello"));
//! }
//! ```
//!
//! The default context is created lazily on first access. With the `threadsafe` feature it is
//! shared by the whole process and access is serialized, otherwise each thread has its own.
//! Static registration order is not defined, therefore neither is the order of group members
//! registered this way.
//!
//! Accessing the default context from within a constructor or factory of a provider resolved
//! through it fails with [DefaultContextError::Reentrant].

use crate::context::{ApplicationContext, Provider};
use crate::error::{ApplicationContextError, DefaultContextError, ResolverError};
use crate::injection::InjectionDeclaration;
use crate::instance::Instance;
use crate::provider::{MetadataPtr, ProviderDescriptor};
use crate::registry::ModuleRegistry;
use crate::resolver::{DefaultResolver, ResolverOptions, ResolverPtr};
use crate::token::Token;
use inventory::collect;
pub use inventory::submit;
#[cfg(feature = "threadsafe")]
use once_cell::sync::Lazy;
#[cfg(feature = "threadsafe")]
use std::cell::Cell;
#[cfg(not(feature = "threadsafe"))]
use std::cell::RefCell;
#[cfg(feature = "threadsafe")]
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// A single static registration.
pub enum Registration {
    /// Provider registered under a group, following [ModuleRegistry::register] rules.
    Provider {
        group: Token,
        descriptor: ProviderDescriptor,
    },
    Declaration(InjectionDeclaration),
}

pub struct Registerer {
    pub register: fn() -> Registration,
}

collect!(Registerer);

/// Options used when the default context gets created.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct DefaultContextOptions {
    pub auto_inject: bool,
    pub resolver: ResolverOptions,
}

impl Default for DefaultContextOptions {
    fn default() -> Self {
        Self {
            auto_inject: true,
            resolver: Default::default(),
        }
    }
}

#[derive(Default)]
struct DefaultState {
    options: DefaultContextOptions,
    context: Option<ApplicationContext>,
}

impl DefaultState {
    fn context(&mut self) -> &mut ApplicationContext {
        let options = self.options;
        self.context.get_or_insert_with(|| create_default_context(options))
    }
}

#[cfg(feature = "threadsafe")]
static DEFAULT_STATE: Lazy<Mutex<DefaultState>> = Lazy::new(Default::default);

#[cfg(feature = "threadsafe")]
thread_local! {
    static HOLDS_DEFAULT_STATE: Cell<bool> = Cell::new(false);
}

#[cfg(not(feature = "threadsafe"))]
thread_local! {
    static DEFAULT_STATE: RefCell<DefaultState> = RefCell::new(Default::default());
}

/// Marks the current thread as holding the default state lock, so nested access fails instead of
/// deadlocking.
#[cfg(feature = "threadsafe")]
struct StateAccess;

#[cfg(feature = "threadsafe")]
impl StateAccess {
    fn acquire() -> Result<Self, DefaultContextError> {
        if HOLDS_DEFAULT_STATE.with(|holds| holds.replace(true)) {
            Err(DefaultContextError::Reentrant)
        } else {
            Ok(StateAccess)
        }
    }
}

#[cfg(feature = "threadsafe")]
impl Drop for StateAccess {
    fn drop(&mut self) {
        let _ = HOLDS_DEFAULT_STATE.try_with(|holds| holds.set(false));
    }
}

#[cfg(feature = "threadsafe")]
fn with_state<R, F: FnOnce(&mut DefaultState) -> R>(f: F) -> Result<R, DefaultContextError> {
    let _access = StateAccess::acquire()?;

    // a panicking constructor poisons the lock, but leaves the state consistent
    let mut state = DEFAULT_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(f(&mut state))
}

#[cfg(not(feature = "threadsafe"))]
fn with_state<R, F: FnOnce(&mut DefaultState) -> R>(f: F) -> Result<R, DefaultContextError> {
    DEFAULT_STATE.with(|state| {
        let mut state = state
            .try_borrow_mut()
            .map_err(|_| DefaultContextError::Reentrant)?;
        Ok(f(&mut state))
    })
}

fn create_default_context(options: DefaultContextOptions) -> ApplicationContext {
    let mut registry = ModuleRegistry::new().with_auto_inject(options.auto_inject);

    for registerer in inventory::iter::<Registerer> {
        match (registerer.register)() {
            Registration::Provider { group, descriptor } => {
                registry.register(group, descriptor);
            }
            Registration::Declaration(declaration) => {
                registry.register_declaration(declaration);
            }
        }
    }

    debug!(
        providers = registry.modules().len(),
        "Created default application context"
    );

    ApplicationContext::new(registry, Box::new(DefaultResolver::new(options.resolver)))
}

/// Sets options for the default context. Returns `false` if the context has already been created,
/// in which case [reset_default_context] needs to be called first.
pub fn configure_default_context(
    options: DefaultContextOptions,
) -> Result<bool, DefaultContextError> {
    with_state(|state| {
        if state.context.is_some() {
            return false;
        }

        state.options = options;
        true
    })
}

/// Drops the default context, along with all cached instances and runtime registrations. The next
/// access creates it anew.
pub fn reset_default_context() -> Result<(), DefaultContextError> {
    with_state(|state| {
        state.context.take();
    })
}

/// Runs given function with the default context, creating it if needed.
pub fn with_default_context<R, F: FnOnce(&mut ApplicationContext) -> R>(
    f: F,
) -> Result<R, DefaultContextError> {
    with_state(|state| f(state.context()))
}

/// Registers a provider in the default context at runtime.
pub fn register<G: Into<Token>>(
    group: G,
    descriptor: ProviderDescriptor,
) -> Result<bool, DefaultContextError> {
    with_default_context(|context| context.registry_mut().register(group, descriptor))
}

/// Registers an injection declaration in the default context at runtime.
pub fn register_declaration(
    declaration: InjectionDeclaration,
) -> Result<bool, DefaultContextError> {
    with_default_context(|context| context.registry_mut().register_declaration(declaration))
}

pub fn resolve<T: Into<Token>>(token: T) -> Result<Option<Instance>, ResolverError> {
    with_default_context(|context| context.get(token))?
}

pub fn get_metadata<T: Into<Token>>(
    token: T,
) -> Result<Option<MetadataPtr>, DefaultContextError> {
    with_default_context(|context| context.get_metadata(token))
}

pub fn get_for<G: Into<Token>>(group: G) -> Result<Vec<Instance>, ResolverError> {
    with_default_context(|context| context.get_for(group))?
}

/// Returns a copy of the descriptor registered under given token in the default context.
pub fn get_wrapper<T: Into<Token>>(
    token: T,
) -> Result<Option<ProviderDescriptor>, DefaultContextError> {
    with_default_context(|context| context.get_wrapper(token).cloned())
}

/// Returns copies of descriptors listed under given group in the default context.
pub fn get_wrappers_for<G: Into<Token>>(
    group: G,
) -> Result<Vec<ProviderDescriptor>, DefaultContextError> {
    with_default_context(|context| {
        context
            .get_wrappers_for(group)
            .into_iter()
            .cloned()
            .collect()
    })
}

/// Creates a standalone context from given providers, inheriting injection declarations and the
/// auto-injection flag of the default context. Uses a [DefaultResolver] configured like the default
/// one, unless a custom resolver is passed.
pub fn create_application_context(
    providers: Vec<Provider>,
    resolver: Option<ResolverPtr>,
) -> Result<ApplicationContext, ApplicationContextError> {
    let (builder, options) = with_state(|state| (state.context().scoped(), state.options))?;
    let builder = builder
        .with_providers(providers)
        .with_resolver_options(options.resolver);

    match resolver {
        Some(resolver) => builder.with_resolver(resolver),
        None => builder,
    }
    .build()
}

#[cfg(test)]
mod tests {
    use crate::context::Provider;
    use crate::error::{ApplicationContextError, DefaultContextError, ResolverError};
    use crate::global::{
        configure_default_context, create_application_context, get_for, get_metadata,
        get_wrapper, register, register_declaration, reset_default_context, resolve,
        with_default_context, DefaultContextOptions, Registerer, Registration,
    };
    use crate::injection::InjectionDeclaration;
    use crate::instance::{ErrorPtr, InstancePtr};
    use crate::provider::{Arguments, Injectable, ProviderDescriptor};
    use crate::resolver::ResolverOptions;
    use crate::token::Token;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    // the default context is shared between test threads
    static DEFAULT_CONTEXT_LOCK: Mutex<()> = Mutex::new(());

    fn fresh_default_context() -> MutexGuard<'static, ()> {
        let guard = DEFAULT_CONTEXT_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        reset_default_context().unwrap();
        assert!(configure_default_context(DefaultContextOptions::default()).unwrap());
        guard
    }

    struct Counter {
        start: u32,
    }

    impl Injectable for Counter {
        fn parameters() -> Vec<Token> {
            vec!["COUNTER_START".into()]
        }

        fn construct(arguments: Arguments) -> Result<Self, ErrorPtr> {
            Ok(Counter {
                start: arguments.cast::<u32>(0).map(|start| *start).unwrap_or(0),
            })
        }
    }

    fn register_counter() -> Registration {
        Registration::Provider {
            group: "counters".into(),
            descriptor: ProviderDescriptor::for_type::<Counter>()
                .with_metadata("counter")
                .with_injectable(true),
        }
    }

    fn register_start() -> Registration {
        Registration::Provider {
            group: "values".into(),
            descriptor: ProviderDescriptor::new()
                .with_token("START_VALUE")
                .with_value(7u32)
                .with_injectable(true),
        }
    }

    fn declare_start() -> Registration {
        Registration::Declaration(InjectionDeclaration::parameter(
            Token::of::<Counter>(),
            0,
            "START_VALUE",
        ))
    }

    inventory::submit! {
        Registerer {
            register: register_counter,
        }
    }

    inventory::submit! {
        Registerer {
            register: register_start,
        }
    }

    inventory::submit! {
        Registerer {
            register: declare_start,
        }
    }

    #[test]
    fn should_resolve_static_registrations() {
        let _guard = fresh_default_context();

        let counter = resolve(Token::of::<Counter>())
            .unwrap()
            .and_then(|instance| instance.downcast::<Counter>())
            .unwrap();
        assert_eq!(counter.start, 7);

        assert_eq!(get_for("counters").unwrap().len(), 1);
        assert_eq!(
            *get_metadata(Token::of::<Counter>())
                .unwrap()
                .unwrap()
                .downcast_ref::<&str>()
                .unwrap(),
            "counter"
        );
        assert!(get_wrapper(Token::of::<Counter>())
            .unwrap()
            .unwrap()
            .instance()
            .is_some());
    }

    #[test]
    fn should_register_at_runtime() {
        let _guard = fresh_default_context();

        assert!(register(
            "values",
            ProviderDescriptor::new()
                .with_token("RUNTIME")
                .with_value(1u8)
                .with_injectable(true)
        )
        .unwrap());
        assert!(register_declaration(InjectionDeclaration::parameter(
            "Other", 0, "RUNTIME"
        ))
        .unwrap());
        assert!(resolve("RUNTIME").unwrap().is_some());

        reset_default_context().unwrap();
        assert!(resolve("RUNTIME").unwrap().is_none());
    }

    #[test]
    fn should_disable_default_context() {
        let _guard = fresh_default_context();
        assert!(configure_default_context(DefaultContextOptions {
            auto_inject: false,
            resolver: ResolverOptions::default(),
        })
        .unwrap());

        assert!(resolve(Token::of::<Counter>()).unwrap().is_none());
        assert!(!configure_default_context(DefaultContextOptions::default()).unwrap());

        reset_default_context().unwrap();
        assert!(configure_default_context(DefaultContextOptions::default()).unwrap());
    }

    #[test]
    fn should_inherit_declarations_in_created_context() {
        let _guard = fresh_default_context();

        let mut context = create_application_context(
            vec![
                Provider::of::<Counter>(),
                ProviderDescriptor::new()
                    .with_token("START_VALUE")
                    .with_value(3u32)
                    .into(),
            ],
            None,
        )
        .unwrap();

        assert_eq!(context.get_typed::<Counter>().unwrap().unwrap().start, 3);
    }

    #[test]
    fn should_reject_empty_created_context() {
        let _guard = fresh_default_context();

        assert_eq!(
            create_application_context(vec![], None).err(),
            Some(ApplicationContextError::NoProviders)
        );
    }

    #[test]
    fn should_reject_reentrant_access() {
        let _guard = fresh_default_context();

        assert_eq!(
            with_default_context(|_| reset_default_context()).unwrap(),
            Err(DefaultContextError::Reentrant)
        );

        assert!(register(
            "values",
            ProviderDescriptor::new()
                .with_token("NESTED")
                .with_factory(|| {
                    resolve("START_VALUE")
                        .map(|_| 0u8)
                        .map_err(|error| InstancePtr::new(error) as ErrorPtr)
                })
                .with_injectable(true)
        )
        .unwrap());

        match resolve("NESTED") {
            Err(ResolverError::ConstructionFailed { error, .. }) => assert!(matches!(
                error.downcast_ref::<ResolverError>(),
                Some(ResolverError::DefaultContext(DefaultContextError::Reentrant))
            )),
            result => panic!("Unexpected resolution result: {result:?}"),
        }

        // still usable afterwards
        assert!(resolve("START_VALUE").unwrap().is_some());
    }

    #[cfg(feature = "threadsafe")]
    #[test]
    fn should_share_default_context_between_threads() {
        let _guard = fresh_default_context();

        assert!(register(
            "values",
            ProviderDescriptor::new()
                .with_token("SHARED")
                .with_value(11u32)
                .with_injectable(true)
        )
        .unwrap());

        let counter = resolve(Token::of::<Counter>()).unwrap().unwrap();

        let (shared, spawned_counter) = std::thread::spawn(|| {
            (
                resolve("SHARED")
                    .unwrap()
                    .and_then(|instance| instance.downcast::<u32>())
                    .map(|value| *value),
                resolve(Token::of::<Counter>()).unwrap().unwrap(),
            )
        })
        .join()
        .unwrap();

        assert_eq!(shared, Some(11));
        assert!(counter.ptr_eq(&spawned_counter));
    }
}
