use ferrum_types::definitions::{INCOMING_WINDOW, OUTGOING_WINDOW};
use serde::{Deserialize, Serialize};

/// Default handle max of a session
pub const DEFAULT_HANDLE_MAX: u32 = u32::MAX;

/// Plain session settings, loadable from a configuration file
///
/// Windows count bytes of unsettled transfer payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SessionConfig {
    /// Incoming window advertised to the peer
    pub incoming_window: u32,

    /// Outgoing window advertised to the peer
    pub outgoing_window: u32,

    /// Highest link handle
    pub handle_max: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            incoming_window: INCOMING_WINDOW,
            outgoing_window: OUTGOING_WINDOW,
            handle_max: DEFAULT_HANDLE_MAX,
        }
    }
}
