use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use solana_program::clock::UnixTimestamp;

pub trait Clock {
    fn unix_timestamp(&self) -> UnixTimestamp;
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn unix_timestamp(&self) -> UnixTimestamp {
        (**self).unix_timestamp()
    }
}

/// Wall clock in UTC seconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_timestamp(&self) -> UnixTimestamp {
        chrono::Utc::now().timestamp()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: UnixTimestamp) -> Self {
        ManualClock {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: UnixTimestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn unix_timestamp(&self) -> UnixTimestamp {
        self.now.load(Ordering::SeqCst)
    }
}
