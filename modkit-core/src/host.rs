//! Capabilities supplied by the embedding game runtime.

use serde::{Deserialize, Serialize};

/// Which side of the game process a patch group or settings file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Matches both client and server.
    Universal,
    Client,
    Server,
}

impl Side {
    /// Whether a gate declared as `self` admits a process running as
    /// `current`. `Universal` matches everything in either position.
    pub fn admits(self, current: Side) -> bool {
        self == Side::Universal || current == Side::Universal || self == current
    }

    /// Lower-case token used in file names.
    pub fn token(self) -> &'static str {
        match self {
            Side::Universal => "universal",
            Side::Client => "client",
            Side::Server => "server",
        }
    }
}

/// Host surface consumed at mod load.
///
/// The runtime embedding the kit implements this once; mods never do.
/// World-switch events are pushed by the host separately (see the settings
/// bridge), so only point-in-time queries live here.
pub trait ModHost: Send + Sync {
    /// Side this process is running as.
    fn current_side(&self) -> Side;

    /// Whether the mod with the given identifier is loaded and active.
    fn is_mod_active(&self, mod_id: &str) -> bool;

    /// Identifier of the active save-world, if a game session is running.
    fn current_world_id(&self) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn universal_admits_both_sides() {
        assert!(Side::Universal.admits(Side::Client));
        assert!(Side::Universal.admits(Side::Server));
        assert!(Side::Client.admits(Side::Universal));
    }

    #[test]
    fn concrete_sides_only_admit_themselves() {
        assert!(Side::Server.admits(Side::Server));
        assert!(!Side::Server.admits(Side::Client));
        assert!(!Side::Client.admits(Side::Server));
    }
}
