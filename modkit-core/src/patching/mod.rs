//! Patch application infrastructure.
//!
//! A patch context ([`PatchContext`]) is an isolated collection of hooks
//! owned by one key — an assembly identity, or an instrumentation owner.
//! The [`PatchHostRegistry`] creates contexts lazily and tears them down as
//! a unit. The [`PatchOrchestrator`] walks registered assemblies, applies
//! every patch group whose side and mod gates are satisfied, and reverses
//! all of them at shutdown.

pub mod descriptor;
pub mod orchestrator;
pub mod registry;

pub use descriptor::{PatchAssembly, PatchGroupDescriptor, PatchTarget};
pub use orchestrator::PatchOrchestrator;
pub use registry::{PatchContext, PatchHostRegistry};
