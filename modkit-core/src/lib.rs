//! ModKit core: hook dispatch and patch orchestration.
//!
//! This crate provides the interception layer the rest of the kit is built
//! on. Mods describe the members they want to intercept as patch groups,
//! gated by game side and mod dependencies; the orchestrator applies every
//! eligible group at startup and reverses all of them at shutdown.
//!
//! # Overview
//!
//! - [`hooks`] defines the interception contract ([`hooks::HookEngine`]) and
//!   an in-process implementation ([`hooks::DispatchEngine`]) that routes
//!   instrumented call sites through registered before/after hooks.
//! - [`patching`] groups hooks into named contexts
//!   ([`patching::PatchHostRegistry`]) and drives declarative application
//!   and teardown ([`patching::PatchOrchestrator`]).
//! - [`host`] is the narrow interface the embedding game runtime supplies:
//!   the current side, active-mod lookups and the running world.

pub mod error;
pub mod hooks;
pub mod host;
pub mod patching;

pub use error::PatchError;
pub use hooks::{
    DispatchEngine, HookEngine, HookHandle, HookInvocation, HookResult, MemberHook,
    MemberSignature,
};
pub use host::{ModHost, Side};
pub use patching::{
    PatchAssembly, PatchContext, PatchGroupDescriptor, PatchHostRegistry, PatchOrchestrator,
    PatchTarget,
};
