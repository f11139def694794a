//! Functionality related to registering providers and injection declarations. A [ModuleRegistry]
//! owns three stores: provider descriptors by token, provider tokens by group key and injection
//! declarations by owning type name. [Resolvers](crate::resolver::Resolver) read descriptors and
//! declarations from it and write cached instances back.

use crate::injection::{InjectionDeclaration, InjectionMap};
use crate::provider::ProviderDescriptor;
use crate::token::Token;
use fxhash::FxHashMap;
use tracing::debug;

/// Provider descriptors by name.
pub type ModuleMap = FxHashMap<Token, ProviderDescriptor>;

/// Provider names by group key, in registration order.
pub type InjectableMap = FxHashMap<Token, Vec<Token>>;

#[derive(Clone, Debug)]
pub struct ModuleRegistry {
    modules: ModuleMap,
    injectables: InjectableMap,
    properties: InjectionMap,
    auto_inject: bool,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    /// Creates an empty registry with auto-injection enabled.
    pub fn new() -> Self {
        Self::with_seed(None, None)
    }

    /// Creates a registry with pre-seeded stores, e.g. declarations inherited from another
    /// registry.
    pub fn with_seed(modules: Option<ModuleMap>, properties: Option<InjectionMap>) -> Self {
        Self {
            modules: modules.unwrap_or_default(),
            injectables: Default::default(),
            properties: properties.unwrap_or_default(),
            auto_inject: true,
        }
    }

    /// Enables or disables auto-injection. When disabled, all registration is a no-op and nothing
    /// resolves.
    pub fn with_auto_inject(mut self, auto_inject: bool) -> Self {
        self.auto_inject = auto_inject;
        self
    }

    #[inline]
    pub fn is_auto_inject_enabled(&self) -> bool {
        self.auto_inject
    }

    /// Creates a fresh registry inheriting only injection declarations.
    pub fn scoped(&self) -> Self {
        Self::with_seed(None, Some(self.properties.clone())).with_auto_inject(self.auto_inject)
    }

    #[inline]
    pub fn modules(&self) -> &ModuleMap {
        &self.modules
    }

    #[inline]
    pub fn modules_mut(&mut self) -> &mut ModuleMap {
        &mut self.modules
    }

    #[inline]
    pub fn properties(&self) -> &InjectionMap {
        &self.properties
    }

    #[inline]
    pub fn properties_mut(&mut self) -> &mut InjectionMap {
        &mut self.properties
    }

    #[inline]
    pub fn injectables(&self) -> &InjectableMap {
        &self.injectables
    }

    #[inline]
    pub fn injectables_mut(&mut self) -> &mut InjectableMap {
        &mut self.injectables
    }

    /// Registers a provider under its name and, if injectable, lists it under given group.
    /// Returns `false` when nothing was registered: auto-injection is disabled, the provider has
    /// no usable name or the name is already listed under the group.
    pub fn register<G: Into<Token>>(&mut self, group: G, descriptor: ProviderDescriptor) -> bool {
        if !self.auto_inject {
            return false;
        }

        let group = group.into();
        let name = match descriptor.name() {
            Some(name) => name.clone(),
            None => {
                debug!(group = %group, "Skipping registration of a provider without a name");
                return false;
            }
        };

        let existing = self.injectables.get(&group);
        if existing
            .map(|names| names.contains(&name))
            .unwrap_or(false)
        {
            debug!(group = %group, name = %name, "Provider already registered");
            return false;
        }

        if descriptor.is_injectable() {
            self.injectables
                .entry(group)
                .or_default()
                .push(name.clone());
        }

        self.modules.insert(name, descriptor);
        true
    }

    /// Stores a provider under its name without listing it in any group, replacing a previous
    /// provider of the same name. Returns `false` when auto-injection is disabled or the provider
    /// has no usable name.
    pub fn insert(&mut self, descriptor: ProviderDescriptor) -> bool {
        if !self.auto_inject {
            return false;
        }

        match descriptor.name() {
            Some(name) => {
                let name = name.clone();
                self.modules.insert(name, descriptor);
                true
            }
            None => {
                debug!("Skipping insertion of a provider without a name");
                false
            }
        }
    }

    /// Adds an injection declaration for its owning type. Returns `false` when skipped.
    pub fn register_declaration(&mut self, declaration: InjectionDeclaration) -> bool {
        if !self.auto_inject
            || !declaration.target_type.is_determined()
            || !declaration.token.is_determined()
        {
            return false;
        }

        self.properties
            .entry(declaration.target_type.clone())
            .or_default()
            .push(declaration);
        true
    }

    #[inline]
    pub fn descriptor(&self, token: &Token) -> Option<&ProviderDescriptor> {
        self.modules.get(token)
    }

    /// Returns provider names listed under given group.
    pub fn group(&self, group: &Token) -> Option<&[Token]> {
        self.injectables.get(group).map(Vec::as_slice)
    }

    /// Returns descriptors of providers listed under given group, in registration order.
    pub fn group_descriptors(&self, group: &Token) -> Vec<&ProviderDescriptor> {
        self.group(group)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|name| self.modules.get(name))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Merges another registry into this one. Providers from `other` replace ones with the same
    /// name, while group listings and declarations are appended.
    pub fn merge(&mut self, other: ModuleRegistry) {
        self.modules.extend(other.modules);

        for (group, names) in other.injectables {
            let entry = self.injectables.entry(group).or_default();
            for name in names {
                if !entry.contains(&name) {
                    entry.push(name);
                }
            }
        }

        for (target_type, mut declarations) in other.properties {
            self.properties
                .entry(target_type)
                .or_default()
                .append(&mut declarations);
        }
    }
}
