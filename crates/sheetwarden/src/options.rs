//! Session configuration

use std::time::Duration;

use sheetwarden_core::SheetNameRules;
use sheetwarden_formula::ValidatorLimits;

/// Default time to wait for a contended lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between lock attempts
pub const DEFAULT_LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Author recorded on notes written by [`crate::WorkbookSession::add_assumption`]
pub const DEFAULT_NOTE_AUTHOR: &str = "sheetwarden";

/// Options for a [`crate::WorkbookSession`]
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// How long to wait for a contended lock before failing
    pub lock_timeout: Duration,
    /// Interval between lock attempts
    pub lock_poll_interval: Duration,
    /// Formula complexity bounds
    pub validator: ValidatorLimits,
    /// Rules applied to new sheet names
    pub sheet_names: SheetNameRules,
    /// Author written on assumption notes
    pub note_author: String,
    /// Take a shared lock for read-only opens instead of none
    pub shared_read_lock: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            lock_poll_interval: DEFAULT_LOCK_POLL_INTERVAL,
            validator: ValidatorLimits::default(),
            sheet_names: SheetNameRules::default(),
            note_author: DEFAULT_NOTE_AUTHOR.to_string(),
            shared_read_lock: false,
        }
    }
}

impl SessionOptions {
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}
