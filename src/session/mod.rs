pub mod controller;
pub mod state;
pub mod time_parse;

use std::time::Duration;

pub use controller::{SessionController, SessionProgress, SessionSnapshot};
pub use state::{ArousalOverride, SessionState, SessionStatus};
pub use time_parse::{parse_session_time, try_parse_session_time, DEFAULT_SESSION_SECS};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How often the curve target is re-read and pushed to the device
    pub tick_interval: Duration,

    /// How long a manual arousal setting wins over the curve
    pub override_cooldown: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            override_cooldown: Duration::from_secs(30),
        }
    }
}
