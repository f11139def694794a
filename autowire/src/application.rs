//! Core application bootstrap functionality.

use crate::config::ApplicationConfig;
use autowire_di::context::{ApplicationContext, ApplicationContextBuilder, Provider};
use autowire_di::global;
use autowire_di::instance::ErrorPtr;
use autowire_di::resolver::ResolverPtr;
use autowire_di::{ApplicationContextError, DefaultContextError};
use config::ConfigError;
use derive_more::Constructor;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Error creating application context: {0}")]
    ContextError(#[from] ApplicationContextError),
    #[error("Error accessing default context: {0}")]
    DefaultContextError(#[from] DefaultContextError),
    #[error("Runner error: {0}")]
    RunnerError(ErrorPtr),
}

/// Main entrypoint for the application. Configures logging and the default context, and creates
/// [ApplicationContexts](ApplicationContext) according to [ApplicationConfig].
#[derive(Constructor)]
pub struct Application {
    config: ApplicationConfig,
}

impl Application {
    /// Creates an application configured from [CONFIG_FILE](crate::config::CONFIG_FILE) and
    /// environment variables.
    pub fn from_environment() -> Result<Self, ApplicationError> {
        ApplicationConfig::init_from_environment()
            .map(Self::new)
            .map_err(ApplicationError::ConfigError)
    }

    #[inline]
    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    /// Installs a global tracing subscriber, if enabled in the config. Returns `false` when
    /// disabled or when another subscriber is already installed. `RUST_LOG` takes precedence over
    /// the configured level.
    pub fn install_logger(&self) -> Result<bool, ApplicationError> {
        if !self.config.install_tracing_logger {
            return Ok(false);
        }

        let level = self.config.level_filter()?;
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));

        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .is_ok();

        if !installed {
            debug!("Tracing subscriber already installed - skipping");
        }

        Ok(installed)
    }

    /// Applies the config to the default context. Returns `false` if the default context has
    /// already been created.
    pub fn configure_default_context(&self) -> Result<bool, ApplicationError> {
        global::configure_default_context(self.config.default_context_options())
            .map_err(ApplicationError::DefaultContextError)
    }

    /// Returns a context builder with configured auto-injection and resolver options.
    pub fn context_builder(&self) -> ApplicationContextBuilder {
        ApplicationContext::builder()
            .with_auto_inject(self.config.auto_inject)
            .with_resolver_options(self.config.resolver_options())
    }

    pub fn create_context(
        &self,
        providers: Vec<Provider>,
    ) -> Result<ApplicationContext, ApplicationError> {
        self.context_builder()
            .with_providers(providers)
            .build()
            .map_err(ApplicationError::ContextError)
    }

    pub fn create_context_with_resolver(
        &self,
        providers: Vec<Provider>,
        resolver: ResolverPtr,
    ) -> Result<ApplicationContext, ApplicationError> {
        self.context_builder()
            .with_providers(providers)
            .with_resolver(resolver)
            .build()
            .map_err(ApplicationError::ContextError)
    }

    /// Installs the logger, creates a context from given providers and runs application logic
    /// with it.
    pub fn run<R, F>(&self, providers: Vec<Provider>, runner: F) -> Result<R, ApplicationError>
    where
        F: FnOnce(&mut ApplicationContext) -> Result<R, ErrorPtr>,
    {
        self.install_logger()?;

        info!("Creating application context...");
        let mut context = self.create_context(providers)?;

        info!("Running application...");
        runner(&mut context).map_err(ApplicationError::RunnerError)
    }
}
