use serde::{Deserialize, Serialize};

use crate::device::constants::{SCAN_WINDOW, SEGMENT_DELAY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Discovery window in milliseconds.
    pub scan_window: u64,

    /// Pause after each print segment write, in milliseconds.
    pub segment_delay: u64,

    /// Identifier of the printer a receipt was last sent to. `print` falls
    /// back to this device when no --device is given.
    pub last_printer: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scan_window: SCAN_WINDOW,
            segment_delay: SEGMENT_DELAY,
            last_printer: None,
        }
    }
}
