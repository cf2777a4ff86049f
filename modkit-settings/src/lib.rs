//! Reactive, scoped settings for ModKit mods.
//!
//! # Overview
//!
//! Mods declare plain settings types, publish their members with
//! [`settings_fields!`], and ask the [`bridge::SettingsBridge`] for a named
//! feature section inside a scoped settings file. The bridge creates the
//! section with defaults on first access, instruments the instance through
//! the [`observe::ObservableRegistry`], and persists every mutation back to
//! disk as it happens — the settings type itself implements no observer
//! interface.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use modkit_core::{DispatchEngine, HookEngine, PatchHostRegistry, Side};
//! use modkit_settings::{
//!     settings_fields, ObservableRegistry, Scope, ScopePathResolver, SettingsBridge,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Lighting {
//!     brightness: i32,
//! }
//!
//! settings_fields!(Lighting {
//!     brightness: Scalar,
//! });
//!
//! fn main() -> anyhow::Result<()> {
//!     let engine = Arc::new(DispatchEngine::new());
//!     let patches = Arc::new(PatchHostRegistry::new(Arc::clone(&engine) as Arc<dyn HookEngine>));
//!     let observables = ObservableRegistry::new(engine, patches);
//!     let resolver = Arc::new(ScopePathResolver::for_mod("lanterns"));
//!     let bridge = SettingsBridge::new(resolver, observables, Side::Server);
//!
//!     let file = bridge.settings_file(Scope::Global)?;
//!     let lighting = bridge.feature::<Lighting>(&file, None)?;
//!
//!     // persisted to settings-global-server.json as soon as it changes
//!     lighting.update(|settings| settings.brightness = 80);
//!     Ok(())
//! }
//! ```
//!
//! # Scopes
//!
//! Files are segmented per [`Scope`]: `World` state lives with the save and
//! is re-homed when the host switches worlds, `Global` state belongs to the
//! mod across worlds, and `Shared` state is framework-wide. See
//! [`scope::ScopePathResolver`].

pub mod bridge;
pub mod error;
pub mod fields;
pub mod observe;
pub mod scope;
pub mod store;

mod util;

pub use bridge::{SettingsBridge, SubscriptionId};
pub use error::SettingsError;
pub use fields::{FieldAccessor, FieldKind, SettingsFields};
pub use observe::{ChangeEvent, ListenerId, ObservableBinding, ObservableRegistry};
pub use scope::{FileCategory, Scope, ScopePathResolver};
pub use store::SettingsFile;
