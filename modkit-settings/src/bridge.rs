//! Reactive persistence bridge between observable bindings and settings
//! files.
//!
//! # Overview
//!
//! Feature code asks the bridge for a named section of a scoped settings
//! file. The bridge creates the section with default values on first
//! access, binds the resulting instance through the observable registry,
//! and from then on every mutation that reaches the active binding is
//! serialized straight back to disk. Callers can additionally register
//! per-property actions that run after each persisted change.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use modkit_core::Side;
use serde_json::Value;

use crate::error::SettingsError;
use crate::fields::{encode_fields, SettingsFields};
use crate::observe::{ChangeEvent, ListenerId, ObservableBinding, ObservableRegistry};
use crate::scope::{Scope, ScopePathResolver};
use crate::store::SettingsFile;
use crate::util::lock;

/// Identifier for a registered property-changed action.
pub type SubscriptionId = u64;

type PropertyAction = Arc<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    action: PropertyAction,
}

struct BridgeShared {
    subscriptions: Mutex<HashMap<(TypeId, String), Vec<Subscription>>>,
    next_subscription: AtomicU64,
}

/// Owns named feature sections inside scoped settings files and keeps them
/// persisted as their bound instances mutate.
///
/// The bridge is the only writer of the files it owns. Writes are
/// synchronous; every mutation that reaches an active binding causes one
/// file write.
pub struct SettingsBridge {
    resolver: Arc<ScopePathResolver>,
    observables: ObservableRegistry,
    side: Side,
    files: Mutex<HashMap<Scope, Arc<SettingsFile>>>,
    /// Internal change listeners, one per bound feature type.
    handlers: Mutex<HashMap<TypeId, ListenerId>>,
    shared: Arc<BridgeShared>,
}

impl SettingsBridge {
    pub fn new(
        resolver: Arc<ScopePathResolver>,
        observables: ObservableRegistry,
        side: Side,
    ) -> Self {
        Self {
            resolver,
            observables,
            side,
            files: Mutex::new(HashMap::new()),
            handlers: Mutex::new(HashMap::new()),
            shared: Arc::new(BridgeShared {
                subscriptions: Mutex::new(HashMap::new()),
                next_subscription: AtomicU64::new(0),
            }),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn observables(&self) -> &ObservableRegistry {
        &self.observables
    }

    /// Settings file for `scope` on this bridge's side, opened once and
    /// cached. World files are re-homed after a world switch.
    pub fn settings_file(&self, scope: Scope) -> Result<Arc<SettingsFile>, SettingsError> {
        let mut files = lock(&self.files);
        if let Some(file) = files.get(&scope) {
            return Ok(Arc::clone(file));
        }
        let file = Arc::new(SettingsFile::open(&self.resolver, scope, self.side)?);
        files.insert(scope, Arc::clone(&file));
        Ok(file)
    }

    /// World-switch signal from the host. Re-homes world-scoped files: the
    /// next [`settings_file`](Self::settings_file) call for world scope
    /// resolves against the new world.
    pub fn on_world_changed(&self, world_id: Option<String>) {
        self.resolver.set_world(world_id);
        lock(&self.files).remove(&Scope::World);
    }

    fn canonical_name<T: SettingsFields>() -> &'static str {
        T::type_name()
            .rsplit("::")
            .next()
            .unwrap_or(T::type_name())
    }

    /// Obtain the bound feature instance for `T` inside `file`.
    ///
    /// When the section named `name` (default: `T`'s type name) is absent,
    /// a default instance is inserted and the file persisted before
    /// binding. Loaded values are applied with the binding inactive, so the
    /// load itself never triggers a save.
    pub fn feature<T>(
        &self,
        file: &Arc<SettingsFile>,
        name: Option<&str>,
    ) -> Result<ObservableBinding<T>, SettingsError>
    where
        T: SettingsFields + Default,
    {
        let section = name.unwrap_or(Self::canonical_name::<T>()).to_string();

        let stored = match file.section(&section) {
            Some(value) => value,
            None => {
                let defaults = encode_fields(&T::default());
                file.set_section(&section, defaults.clone());
                file.write()?;
                defaults
            }
        };

        let binding = self.observables.bind(T::default())?;
        binding.set_active(false);
        let applied = Self::apply_section(&binding, &stored, &section);
        if let Err(err) = applied {
            binding.set_active(true);
            return Err(err);
        }
        self.install_change_handler::<T>(file, &binding, section);
        binding.set_active(true);
        Ok(binding)
    }

    /// Serialize `settings` into `file`'s section for `T` and write it.
    pub fn save<T>(
        &self,
        file: &Arc<SettingsFile>,
        settings: &T,
        name: Option<&str>,
    ) -> Result<(), SettingsError>
    where
        T: SettingsFields,
    {
        let section = name.unwrap_or(Self::canonical_name::<T>());
        file.merge_section(section, encode_fields(settings));
        file.write()
    }

    /// Replace the bound instance of `T` wholesale. Only members whose
    /// value actually changed are persisted and fire their registered
    /// actions; a value-equal overwrite does nothing.
    pub fn update_settings<T>(&self, binding: &ObservableBinding<T>, new: T)
    where
        T: SettingsFields,
    {
        binding.replace(new);
    }

    /// Register `action` to run after changes to `property` on `T`.
    ///
    /// The selector must name a declared settable member; unknown names
    /// fail fast. Actions receive the property's value after the change and
    /// run in registration order.
    pub fn add_property_changed_action<T>(
        &self,
        property: &str,
        action: impl Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Result<SubscriptionId, SettingsError>
    where
        T: SettingsFields,
    {
        let field = T::field(property).ok_or_else(|| SettingsError::InvalidSelector {
            type_name: T::type_name(),
            property: property.to_string(),
        })?;
        let id = self.shared.next_subscription.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.shared.subscriptions)
            .entry((TypeId::of::<T>(), field.name.to_string()))
            .or_default()
            .push(Subscription {
                id,
                action: Arc::new(action),
            });
        Ok(id)
    }

    /// Remove a previously registered property-changed action.
    pub fn remove_property_changed_action(&self, id: SubscriptionId) {
        let mut subscriptions = lock(&self.shared.subscriptions);
        for actions in subscriptions.values_mut() {
            actions.retain(|subscription| subscription.id != id);
        }
    }

    fn apply_section<T>(
        binding: &ObservableBinding<T>,
        stored: &Value,
        section: &str,
    ) -> Result<(), SettingsError>
    where
        T: SettingsFields,
    {
        let map = match stored {
            Value::Object(map) => map,
            _ => return Err(SettingsError::MalformedSection(section.to_string())),
        };
        for field in T::fields() {
            if let Some(value) = map.get(field.name) {
                binding.set(field.name, value.clone())?;
            }
        }
        Ok(())
    }

    fn install_change_handler<T>(
        &self,
        file: &Arc<SettingsFile>,
        binding: &ObservableBinding<T>,
        section: String,
    ) where
        T: SettingsFields,
    {
        let file = Arc::clone(file);
        let binding = binding.clone();
        let shared = Arc::clone(&self.shared);
        let type_id = TypeId::of::<T>();

        let listener_id = self.observables.add_listener(move |event: &ChangeEvent| {
            if event.type_id != type_id {
                return;
            }

            file.merge_section(&section, binding.snapshot());
            if let Err(err) = file.write() {
                log::error!(
                    "failed to persist settings section `{section}` to {}: {err}",
                    file.path().display()
                );
            }

            let actions: Vec<PropertyAction> = lock(&shared.subscriptions)
                .get(&(type_id, event.property.clone()))
                .map(|subscriptions| {
                    subscriptions
                        .iter()
                        .map(|subscription| Arc::clone(&subscription.action))
                        .collect()
                })
                .unwrap_or_default();
            if actions.is_empty() {
                return;
            }
            let Some(field) = T::field(&event.property) else {
                return;
            };
            let current = binding.get(|instance| (field.get)(instance));
            for action in actions {
                if let Err(err) = action(&current) {
                    log::error!(
                        "property-changed action for {}.{} failed: {err:#}",
                        event.type_name,
                        event.property
                    );
                }
            }
        });

        // one handler per type: a repeated feature call replaces the old one
        let mut handlers = lock(&self.handlers);
        if let Some(old) = handlers.insert(type_id, listener_id) {
            self.observables.remove_listener(old);
        }
    }
}

impl Drop for SettingsBridge {
    fn drop(&mut self) {
        let handlers = lock(&self.handlers);
        for listener_id in handlers.values() {
            self.observables.remove_listener(*listener_id);
        }
    }
}
