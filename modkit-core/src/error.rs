//! Error types for hook installation and patching.

use thiserror::Error;

use crate::hooks::MemberSignature;

/// Errors raised while installing or removing hooks.
#[derive(Error, Debug)]
pub enum PatchError {
    /// The hook engine refused an installation. Raised as-is to callers; the
    /// orchestrator catches it per assembly and continues with the rest.
    #[error("hook installation failed for {signature}: {reason}")]
    HookInstallationFailed {
        signature: MemberSignature,
        reason: String,
    },
}
