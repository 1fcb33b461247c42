use std::{
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Duration,
};

/// A process-wide "back off" signal, shared by a dispatcher and its workers.
///
/// The flag is cleared at the start of every cycle. Any worker may set it. The longest cooldown requested during a
/// cycle wins.
#[derive(Debug, Default)]
pub struct Throttle {
    engaged: AtomicBool,
    requested_cooldown_ms: AtomicU64,
}

impl Throttle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::Acquire)
    }

    pub fn engage(&self, cooldown: Option<Duration>) {
        if let Some(cooldown) = cooldown {
            let ms = u64::try_from(cooldown.as_millis()).unwrap_or(u64::MAX);
            self.requested_cooldown_ms.fetch_max(ms, Ordering::AcqRel);
        }
        self.engaged.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.requested_cooldown_ms.store(0, Ordering::Release);
        self.engaged.store(false, Ordering::Release);
    }

    /// The cooldown asked for by the remote side, if it named one.
    pub fn requested_cooldown(&self) -> Option<Duration> {
        match self.requested_cooldown_ms.load(Ordering::Acquire) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}
