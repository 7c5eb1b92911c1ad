//! Blocking wait over callback-delivered completions.
//!
//! wgpu reports buffer-map completion through a callback that only runs while
//! the device is being polled. `block_on_completion` turns that into a plain
//! blocking call: it pumps, checks a flag, and yields until the value arrives.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Interval between pump iterations while waiting.
pub const PUMP_INTERVAL: Duration = Duration::from_millis(1);

/// How long a blocking wait may take.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum WaitPolicy {
    /// Wait until the completion is signalled.
    #[default]
    Unbounded,
    /// Give up once the duration has elapsed.
    Bounded(Duration),
}

/// One-shot slot filled by a completion callback.
///
/// Shared between the callback (usually through an `Arc`) and the waiting
/// thread. The flag is published with release ordering after the value is
/// stored, so an acquire load that observes it also observes the value.
#[derive(Debug)]
pub struct Completion<T> {
    ready: AtomicBool,
    value: Mutex<Option<T>>,
}

impl<T> Completion<T> {
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            value: Mutex::new(None),
        }
    }

    /// Stores `value` and signals waiters. Later calls overwrite earlier ones.
    pub fn complete(&self, value: T) {
        match self.value.lock() {
            Ok(mut slot) => *slot = Some(value),
            Err(poisoned) => *poisoned.into_inner() = Some(value),
        }
        self.ready.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Takes the value if the completion has been signalled.
    pub fn take(&self) -> Option<T> {
        if !self.is_complete() {
            return None;
        }
        match self.value.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl<T> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocks the calling thread until `completion` is signalled.
///
/// `pump` is called once per iteration before the flag is checked; it must
/// drive whatever event processing delivers the completion. Returns `None`
/// when a bounded policy expires first.
pub fn block_on_completion<T>(
    completion: &Completion<T>,
    policy: WaitPolicy,
    mut pump: impl FnMut(),
) -> Option<T> {
    let deadline = match policy {
        WaitPolicy::Unbounded => None,
        WaitPolicy::Bounded(limit) => Some(Instant::now() + limit),
    };

    loop {
        pump();
        if let Some(value) = completion.take() {
            return Some(value);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return None;
        }
        std::thread::sleep(PUMP_INTERVAL);
    }
}
