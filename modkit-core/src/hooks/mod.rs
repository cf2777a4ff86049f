//! Hook system for member interception.
//!
//! Hooks allow mods to intercept member calls at runtime. This is the
//! primary mechanism both for gameplay patches and for observing mutations
//! of settings objects.
//!
//! # Overview
//!
//! A hook is a before/after interceptor attached to a [`MemberSignature`]
//! (owning type, member name, optional argument types). Hooks are installed
//! through a [`HookEngine`] under a named context, so everything one owner
//! installed can be removed in a single call.
//!
//! The engine contract is deliberately narrow: the kit does not rewrite
//! compiled code. [`DispatchEngine`] is the in-process implementation —
//! instrumented call sites route through [`DispatchEngine::run_with_hooks`]
//! instead of calling members directly, which gives installed hooks their
//! interception point.
//!
//! # Creating a hook
//!
//! Implement [`MemberHook`]; both methods default to no-ops:
//!
//! ```rust,no_run
//! use modkit_core::hooks::{HookInvocation, HookResult, MemberHook};
//!
//! struct LogCalls;
//!
//! impl MemberHook for LogCalls {
//!     fn before(&self, call: &HookInvocation) -> HookResult {
//!         log::info!("{} called", call.signature);
//!         HookResult::Continue
//!     }
//! }
//! ```
//!
//! Returning [`HookResult::Skip`] from `before` suppresses the original
//! member; the hook is assumed to have handled the call itself.

pub mod dispatch;
pub mod engine;

pub use dispatch::DispatchEngine;
pub use engine::{HookEngine, HookHandle, HookInvocation, HookResult, MemberHook, MemberSignature};
