//! Capacity-bounded admission gates
//!
//! A [`Gate`] hands out reservations up to a fixed capacity. Each reservation
//! occupies one slot for a fixed hold duration measured from its own
//! acquisition, after which a scheduled task returns the slot. Capacity
//! therefore recovers one slot at a time, oldest reservation first, rather
//! than in a batch at a fixed boundary.
//!
//! Two gates are used by the client:
//! - the rate gate: `rate_per_minute` slots held for 60 seconds
//! - the replay gate: 10 slots held for 10 seconds
//!
//! Acquisition never fails. It only waits, re-checking capacity every
//! `poll_interval`, so two waiters woken at the same time cannot both take
//! the last slot.


use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep, sleep_until};

/// Rolling window of the rate gate
pub const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Slots in the replay gate
pub const REPLAY_CAPACITY: usize = 10;

/// Hold time of a replay gate reservation
pub const REPLAY_HOLD: Duration = Duration::from_secs(10);

/// Wait reported by a full gate whose release is overdue
const MIN_WAIT: Duration = Duration::from_nanos(1);

/// One consumed unit of a gate's capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    /// Identifier unique within the issuing gate
    pub id: u64,
    /// When the slot was taken
    pub acquired_at: Instant,
    /// When the slot is handed back
    pub expires_at: Instant,
}

struct GateState {
    next_id: u64,
    /// Outstanding reservations by id, value is the expiry
    outstanding: BTreeMap<u64, Instant>,
}

struct GateInner {
    capacity: usize,
    hold: Duration,
    poll_interval: Duration,
    state: Mutex<GateState>,
}

/// Admission gate shared by every concurrent call
///
/// Cloning is cheap and yields a handle to the same gate.
#[derive(Clone)]
pub struct Gate {
    inner: Arc<GateInner>,
}

impl Gate {
    /// Create a gate with `capacity` slots, each held for `hold`
    ///
    /// `capacity` of zero is raised to one; callers are expected to have
    /// validated the value already (see `ClientConfig::effective_rate`).
    pub fn new(capacity: usize, hold: Duration, poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(GateInner {
                capacity: capacity.max(1),
                hold,
                poll_interval,
                state: Mutex::new(GateState {
                    next_id: 0,
                    outstanding: BTreeMap::new(),
                }),
            }),
        }
    }

    /// Gate allowing `per_minute` calls in any rolling 60 second window
    pub fn rate(per_minute: usize, poll_interval: Duration) -> Self {
        Self::new(per_minute, RATE_WINDOW, poll_interval)
    }

    /// Gate for replay downloads: 10 slots, 10 second hold
    pub fn replay(poll_interval: Duration) -> Self {
        Self::new(REPLAY_CAPACITY, REPLAY_HOLD, poll_interval)
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn hold(&self) -> Duration {
        self.inner.hold
    }

    /// Number of reservations not yet released
    pub fn outstanding(&self) -> usize {
        self.inner.state.lock().outstanding.len()
    }

    /// True when the next `acquire` would have to wait
    pub fn is_saturated(&self) -> bool {
        self.outstanding() >= self.inner.capacity
    }

    /// Wait for a free slot and take it
    pub async fn acquire(&self) -> Reservation {
        loop {
            if let Some(reservation) = self.try_acquire() {
                return reservation;
            }
            sleep(self.inner.poll_interval).await;
        }
    }

    /// Take a slot if one is free right now
    ///
    /// On success the release of the slot is already scheduled.
    pub fn try_acquire(&self) -> Option<Reservation> {
        let reservation = {
            let mut state = self.inner.state.lock();
            if state.outstanding.len() >= self.inner.capacity {
                return None;
            }

            let id = state.next_id;
            state.next_id += 1;

            let acquired_at = Instant::now();
            let expires_at = acquired_at + self.inner.hold;
            state.outstanding.insert(id, expires_at);

            Reservation {
                id,
                acquired_at,
                expires_at,
            }
        };

        self.schedule_release(reservation);
        Some(reservation)
    }

    /// Time until the next slot frees up, zero only if one is free already
    ///
    /// A full gate whose oldest reservation is past its expiry but not yet
    /// released by its timer task reports the smallest non-zero wait.
    pub fn time_until_free(&self) -> Duration {
        let state = self.inner.state.lock();
        if state.outstanding.len() < self.inner.capacity {
            return Duration::ZERO;
        }

        let now = Instant::now();
        state
            .outstanding
            .values()
            .min()
            .map(|expires_at| expires_at.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
            .max(MIN_WAIT)
    }

    fn schedule_release(&self, reservation: Reservation) {
        let gate = self.clone();
        tokio::spawn(async move {
            sleep_until(reservation.expires_at).await;
            gate.release(reservation.id);
        });
    }

    /// Return a slot; false if it was not outstanding
    fn release(&self, id: u64) -> bool {
        let released = self.inner.state.lock().outstanding.remove(&id).is_some();
        if !released {
            tracing::warn!(reservation = id, "Release of unknown reservation");
        }
        released
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("capacity", &self.inner.capacity)
            .field("hold", &self.inner.hold)
            .field("outstanding", &self.outstanding())
            .finish()
    }
}
