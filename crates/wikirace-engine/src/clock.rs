//! The round clock: wall-clock helpers plus the per-room timer pair.

use std::future;
use std::pin::Pin;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::{self, Instant as TokioInstant, Interval, MissedTickBehavior, Sleep};

/// Current wall-clock time in unix milliseconds.
///
/// Wall clock, not a monotonic instant, because round timestamps are
/// persisted and must stay meaningful across a process restart.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Whole seconds elapsed since `start_millis`, rounded up.
pub fn elapsed_secs(start_millis: u64) -> u64 {
    now_millis().saturating_sub(start_millis).div_ceil(1000)
}

/// Which of the round timers fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClockEvent {
    /// One-second countdown pulse.
    Tick,
    /// The time limit was reached.
    Deadline,
}

/// The two timers that drive a live round, armed and cancelled as a unit.
///
/// - The **ticker** fires every second so the room can broadcast the
///   countdown. It never ends a round.
/// - The **deadline** fires exactly once, at the time limit, and is the
///   only timer allowed to force completion. Keeping the jobs separate
///   avoids a race where a tick-based completion could fire before or
///   after the deadline non-deterministically.
///
/// [`RoundClock::wait`] pends forever while unarmed, so the room actor
/// can keep it in its `select!` loop unconditionally.
pub(crate) struct RoundClock {
    ticker: Option<Interval>,
    deadline: Option<Pin<Box<Sleep>>>,
}

impl RoundClock {
    /// A clock with nothing armed.
    pub fn idle() -> Self {
        Self {
            ticker: None,
            deadline: None,
        }
    }

    /// Arms both timers: the ticker at one-second cadence, the deadline
    /// after `remaining`. On a fresh start `remaining` is the full time
    /// limit; on a restored room it is whatever is left of it.
    pub fn arm(&mut self, remaining: Duration) {
        let mut ticker = time::interval_at(
            TokioInstant::now() + Duration::from_secs(1),
            Duration::from_secs(1),
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);
        self.deadline = Some(Box::pin(time::sleep(remaining)));
    }

    /// Disarms both timers. One call, no timer left leaking.
    pub fn cancel(&mut self) {
        self.ticker = None;
        self.deadline = None;
    }

    /// Disarms only the ticker. Used once the countdown reaches zero —
    /// there is nothing left to broadcast, but the deadline still owns
    /// round completion.
    pub fn stop_ticker(&mut self) {
        self.ticker = None;
    }

    /// Resolves when either timer fires; pends forever while unarmed.
    ///
    /// The deadline wins when both are ready at once, so completion is
    /// never delayed behind a countdown broadcast. After a `Deadline`
    /// the caller must cancel the clock — a completed sleep must not be
    /// polled again.
    pub async fn wait(&mut self) -> ClockEvent {
        tokio::select! {
            biased;
            _ = wait_deadline(&mut self.deadline) => ClockEvent::Deadline,
            _ = wait_tick(&mut self.ticker) => ClockEvent::Tick,
        }
    }
}

async fn wait_tick(slot: &mut Option<Interval>) {
    match slot {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => future::pending::<()>().await,
    }
}

async fn wait_deadline(slot: &mut Option<Pin<Box<Sleep>>>) {
    match slot {
        Some(sleep) => sleep.as_mut().await,
        None => future::pending::<()>().await,
    }
}
