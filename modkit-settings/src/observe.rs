//! Observable bindings over settings types.
//!
//! # Overview
//!
//! Binding an instance installs one after-hook per declared member through a
//! patch context dedicated to that type. Mutations performed through the
//! binding route through those hooks and raise one unified change event per
//! changed member, which the settings bridge turns into a save.
//!
//! At most one instance per type is observed at a time: rebinding a type
//! swaps the observed instance behind the existing hooks instead of
//! installing a second set. Every binding carries an `active` flag; while it
//! is off, hooks stay installed but deliver no notifications. The bridge
//! uses this to apply loaded values without triggering a save of what was
//! just read.
//!
//! List-typed members additionally receive hooks on their `push`, `insert`,
//! `remove` and `clear` operations. Element-level changes report an empty
//! property name to signal "collection changed" rather than a single field.
//! Only members declared [`FieldKind::List`] in the schema are covered —
//! collections nested inside other members are not observed.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use modkit_core::hooks::{DispatchEngine, HookInvocation, HookResult, MemberHook, MemberSignature};
use modkit_core::patching::PatchHostRegistry;
use serde_json::Value;

use crate::error::SettingsError;
use crate::fields::{FieldAccessor, FieldKind, SettingsFields};
use crate::util::lock;

/// Collection operations hooked on list members.
const LIST_OPS: [&str; 4] = ["push", "insert", "remove", "clear"];

/// One change raised by an observable binding.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub type_id: TypeId,
    pub type_name: &'static str,
    /// Changed member name; empty for collection-level changes.
    pub property: String,
}

pub type ListenerId = u64;

type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Record backing one bound type. The instance slot is the per-type
/// singleton; rebinding swaps the slot without reinstalling hooks.
struct BindingRecord {
    instance: Mutex<Box<dyn Any + Send>>,
    active: AtomicBool,
}

struct RegistryInner {
    engine: Arc<DispatchEngine>,
    patches: Arc<PatchHostRegistry>,
    bindings: Mutex<HashMap<TypeId, Arc<BindingRecord>>>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

impl RegistryInner {
    fn emit(&self, event: &ChangeEvent) {
        // clone the list out of the lock so listeners may add or remove
        // listeners, or trigger further dispatches
        let listeners: Vec<Listener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }
}

/// The after-hook installed on each settable member of a bound type.
struct FieldChangeHook {
    registry: Weak<RegistryInner>,
    record: Weak<BindingRecord>,
    type_id: TypeId,
    type_name: &'static str,
    /// Member name, or `""` for collection-level operations.
    property: &'static str,
}

impl MemberHook for FieldChangeHook {
    fn after(&self, _call: &HookInvocation) {
        let Some(record) = self.record.upgrade() else {
            return;
        };
        if !record.active.load(Ordering::SeqCst) {
            return;
        }
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        registry.emit(&ChangeEvent {
            type_id: self.type_id,
            type_name: self.type_name,
            property: self.property.to_string(),
        });
    }
}

/// Binder for observable settings instances, keyed by type identity.
#[derive(Clone)]
pub struct ObservableRegistry {
    inner: Arc<RegistryInner>,
}

impl ObservableRegistry {
    /// `patches` must be backed by `engine` so the hooks installed through
    /// patch contexts are the ones the binding dispatches.
    pub fn new(engine: Arc<DispatchEngine>, patches: Arc<PatchHostRegistry>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                engine,
                patches,
                bindings: Mutex::new(HashMap::new()),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
            }),
        }
    }

    fn context_key(type_name: &str) -> String {
        format!("observe::{type_name}")
    }

    /// Bind `instance` as the observed singleton for `T`.
    ///
    /// If `T` is already bound, the existing hooks are reused and the
    /// current instance is replaced by `instance`; handles created earlier
    /// observe the new instance from then on.
    pub fn bind<T: SettingsFields>(
        &self,
        instance: T,
    ) -> Result<ObservableBinding<T>, SettingsError> {
        let type_id = TypeId::of::<T>();
        let mut bindings = lock(&self.inner.bindings);

        if let Some(record) = bindings.get(&type_id) {
            *lock(&record.instance) = Box::new(instance);
            return Ok(ObservableBinding::new(
                Arc::clone(&self.inner),
                Arc::clone(record),
            ));
        }

        let record = Arc::new(BindingRecord {
            instance: Mutex::new(Box::new(instance)),
            active: AtomicBool::new(true),
        });

        let context = self.inner.patches.context(&Self::context_key(T::type_name()));
        for field in T::fields() {
            let hook = FieldChangeHook {
                registry: Arc::downgrade(&self.inner),
                record: Arc::downgrade(&record),
                type_id,
                type_name: T::type_name(),
                property: field.name,
            };
            context.install(
                MemberSignature::setter(T::type_name(), field.name),
                Arc::new(hook),
            )?;
            if field.kind == FieldKind::List {
                for op in LIST_OPS {
                    let hook = FieldChangeHook {
                        registry: Arc::downgrade(&self.inner),
                        record: Arc::downgrade(&record),
                        type_id,
                        type_name: T::type_name(),
                        property: "",
                    };
                    context.install(
                        MemberSignature::collection_op(T::type_name(), field.name, op),
                        Arc::new(hook),
                    )?;
                }
            }
        }

        bindings.insert(type_id, Arc::clone(&record));
        Ok(ObservableBinding::new(Arc::clone(&self.inner), record))
    }

    /// Remove `T`'s hooks and clear the singleton. Handles created earlier
    /// stop delivering notifications.
    pub fn unbind<T: SettingsFields>(&self) {
        let removed = lock(&self.inner.bindings).remove(&TypeId::of::<T>());
        if removed.is_some() {
            self.inner
                .patches
                .remove_all(&Self::context_key(T::type_name()));
        }
    }

    pub fn is_bound<T: SettingsFields>(&self) -> bool {
        lock(&self.inner.bindings).contains_key(&TypeId::of::<T>())
    }

    /// Subscribe to the unified change event.
    pub fn add_listener(
        &self,
        listener: impl Fn(&ChangeEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self.inner.next_listener.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.inner.listeners).push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        lock(&self.inner.listeners).retain(|(listener_id, _)| *listener_id != id);
    }
}

/// Handle to the observed singleton of `T`.
pub struct ObservableBinding<T> {
    inner: Arc<RegistryInner>,
    record: Arc<BindingRecord>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ObservableBinding<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            record: Arc::clone(&self.record),
            _marker: PhantomData,
        }
    }
}

impl<T: SettingsFields> ObservableBinding<T> {
    fn new(inner: Arc<RegistryInner>, record: Arc<BindingRecord>) -> Self {
        Self {
            inner,
            record,
            _marker: PhantomData,
        }
    }

    pub fn is_active(&self) -> bool {
        self.record.active.load(Ordering::SeqCst)
    }

    /// Toggle notification delivery. Hooks stay installed; while inactive,
    /// mutations raise no change events.
    pub fn set_active(&self, active: bool) {
        self.record.active.store(active, Ordering::SeqCst);
    }

    fn with_instance<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut slot = lock(&self.record.instance);
        let instance = slot
            .downcast_mut::<T>()
            .expect("binding record holds the bound type");
        f(instance)
    }

    /// Read access to the current instance.
    pub fn get<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.with_instance(|instance| f(instance))
    }

    /// Serialized view of the declared members.
    pub fn snapshot(&self) -> Value {
        self.with_instance(|instance| crate::fields::encode_fields(instance))
    }

    fn dispatch_setter(&self, field: &FieldAccessor<T>) {
        self.inner
            .engine
            .notify_after(&MemberSignature::setter(T::type_name(), field.name));
    }

    /// Apply `f` to the instance, then raise change events for every member
    /// whose value differs from before the call. Value-equal writes raise
    /// nothing.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let changed: Vec<&'static FieldAccessor<T>> = self.with_instance(|instance| {
            let before: Vec<Value> = T::fields().iter().map(|field| (field.get)(instance)).collect();
            f(&mut *instance);
            T::fields()
                .iter()
                .zip(before)
                .filter(|(field, before)| (field.get)(instance) != *before)
                .map(|(field, _)| field)
                .collect()
        });
        for field in changed {
            self.dispatch_setter(field);
        }
    }

    /// Replace the entire instance. Only members whose value actually
    /// differs raise change events.
    pub fn replace(&self, new: T) {
        let changed: Vec<&'static FieldAccessor<T>> = self.with_instance(|instance| {
            let changed = T::fields()
                .iter()
                .filter(|field| (field.get)(instance) != (field.get)(&new))
                .collect();
            *instance = new;
            changed
        });
        for field in changed {
            self.dispatch_setter(field);
        }
    }

    /// Write one member by name, routed through its setter hooks.
    pub fn set(&self, property: &str, value: Value) -> Result<(), SettingsError> {
        let field = T::field(property).ok_or_else(|| SettingsError::InvalidSelector {
            type_name: T::type_name(),
            property: property.to_string(),
        })?;
        let signature = MemberSignature::setter(T::type_name(), field.name);
        if self.inner.engine.dispatch_before(&signature) == HookResult::Skip {
            return Ok(());
        }
        self.with_instance(|instance| (field.set)(instance, value))?;
        self.inner.engine.notify_after(&signature);
        Ok(())
    }

    /// Append to a list member. Raises a collection-level change event.
    pub fn list_push(&self, property: &str, item: Value) -> Result<(), SettingsError> {
        self.list_op(property, "push", |items| {
            items.push(item);
            Ok(())
        })
    }

    /// Insert into a list member at `index`.
    pub fn list_insert(
        &self,
        property: &str,
        index: usize,
        item: Value,
    ) -> Result<(), SettingsError> {
        self.list_op(property, "insert", |items| {
            if index > items.len() {
                return Err(SettingsError::IndexOutOfRange {
                    type_name: T::type_name(),
                    property: property.to_string(),
                    index,
                });
            }
            items.insert(index, item);
            Ok(())
        })
    }

    /// Remove the element at `index` from a list member.
    pub fn list_remove(&self, property: &str, index: usize) -> Result<(), SettingsError> {
        self.list_op(property, "remove", |items| {
            if index >= items.len() {
                return Err(SettingsError::IndexOutOfRange {
                    type_name: T::type_name(),
                    property: property.to_string(),
                    index,
                });
            }
            items.remove(index);
            Ok(())
        })
    }

    /// Clear a list member.
    pub fn list_clear(&self, property: &str) -> Result<(), SettingsError> {
        self.list_op(property, "clear", |items| {
            items.clear();
            Ok(())
        })
    }

    fn list_op(
        &self,
        property: &str,
        op: &str,
        mutate: impl FnOnce(&mut Vec<Value>) -> Result<(), SettingsError>,
    ) -> Result<(), SettingsError> {
        let field = T::field(property).ok_or_else(|| SettingsError::InvalidSelector {
            type_name: T::type_name(),
            property: property.to_string(),
        })?;
        if field.kind != FieldKind::List {
            return Err(SettingsError::InvalidSelector {
                type_name: T::type_name(),
                property: property.to_string(),
            });
        }
        let signature = MemberSignature::collection_op(T::type_name(), field.name, op);
        if self.inner.engine.dispatch_before(&signature) == HookResult::Skip {
            return Ok(());
        }
        self.with_instance(|instance| {
            let mut items = match (field.get)(instance) {
                Value::Array(items) => items,
                _ => {
                    return Err(SettingsError::InvalidSelector {
                        type_name: T::type_name(),
                        property: property.to_string(),
                    })
                }
            };
            mutate(&mut items)?;
            (field.set)(instance, Value::Array(items))
        })?;
        self.inner.engine.notify_after(&signature);
        Ok(())
    }
}
