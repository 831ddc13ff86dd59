//! Restart cooldown: a shared flag and the timer that clears it.
//!
//! The flag has one writer on the evaluation path (set after a successful
//! restart) and one concurrent writer, the timer task, which clears it. The
//! evaluation path reads it once at the start of each tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Shared "restart in progress, hold off" flag.
#[derive(Debug, Clone, Default)]
pub struct CooldownFlag(Arc<AtomicBool>);

impl CooldownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn engage(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn release(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One-shot timer that clears a [`CooldownFlag`] after a delay.
#[derive(Debug)]
pub struct CooldownTimer {
    flag: CooldownFlag,
    task: Option<JoinHandle<()>>,
}

impl CooldownTimer {
    pub fn new(flag: CooldownFlag) -> Self {
        Self { flag, task: None }
    }

    /// Engage the flag and schedule its release after `duration`.
    ///
    /// The window starts now, not when the timer task is first polled.
    /// Re-arming replaces any pending timer.
    pub fn arm(&mut self, duration: Duration) {
        self.abort_task();
        self.flag.engage();

        let deadline = Instant::now() + duration;
        let flag = self.flag.clone();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            flag.release();
            info!("restart cooldown complete, resuming monitoring");
        }));
        debug!(?duration, "restart cooldown armed");
    }

    /// Drop any pending timer and release the flag.
    pub fn cancel(&mut self) {
        if self.abort_task() {
            debug!("restart cooldown cancelled");
        }
        self.flag.release();
    }

    /// Whether a timer is pending.
    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn flag(&self) -> &CooldownFlag {
        &self.flag
    }

    fn abort_task(&mut self) -> bool {
        match self.task.take() {
            Some(task) if !task.is_finished() => {
                task.abort();
                true
            }
            _ => false,
        }
    }
}

impl Drop for CooldownTimer {
    fn drop(&mut self) {
        self.abort_task();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_starts_clear() {
        let flag = CooldownFlag::new();
        assert!(!flag.is_active());
        flag.engage();
        assert!(flag.is_active());
        flag.release();
        assert!(!flag.is_active());
    }

    #[test]
    fn clones_share_state() {
        let flag = CooldownFlag::new();
        let other = flag.clone();
        flag.engage();
        assert!(other.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_releases_after_duration() {
        let flag = CooldownFlag::new();
        let mut timer = CooldownTimer::new(flag.clone());

        timer.arm(Duration::from_secs(900));
        assert!(flag.is_active());
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_secs(899)).await;
        assert!(flag.is_active());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!flag.is_active());
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn window_counts_from_arm_not_first_poll() {
        let flag = CooldownFlag::new();
        let mut timer = CooldownTimer::new(flag.clone());

        timer.arm(Duration::from_secs(10));
        // Move the clock before the timer task has had a chance to run.
        tokio::time::advance(Duration::from_secs(8)).await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!flag.is_active());
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_replaces_pending_timer() {
        let flag = CooldownFlag::new();
        let mut timer = CooldownTimer::new(flag.clone());

        timer.arm(Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(5)).await;
        timer.arm(Duration::from_secs(10));

        // The first timer would have fired here.
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(flag.is_active());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!flag.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_releases_immediately() {
        let flag = CooldownFlag::new();
        let mut timer = CooldownTimer::new(flag.clone());

        timer.arm(Duration::from_secs(900));
        timer.cancel();
        assert!(!flag.is_active());
        assert!(!timer.is_armed());

        // Nothing fires later to flip it again.
        flag.engage();
        tokio::time::sleep(Duration::from_secs(1_000)).await;
        assert!(flag.is_active());
    }
}
