use std::time::{Duration, Instant};

/// Source of monotonic time and blocking delays.
///
/// The rollout poll loop and the post-kill pause are the only places that
/// wait. Tests drive them with a virtual clock instead of sleeping.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
