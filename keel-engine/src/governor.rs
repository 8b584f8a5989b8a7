//! Concurrency governor
//!
//! Caps how many expensive units of work execute at once and owns their
//! cancellation handles. Admission never waits: when every slot is taken the
//! oldest holder is preempted (its token is cancelled) and the newcomer
//! proceeds at once, without waiting for the old unit to wind down. This is
//! deliberately not a queue. It keeps memory bounded on small hosts, and the
//! rest of the engine relies on "newest request wins". `Reject` is the
//! stricter alternative and the only path to `CapacityExceeded`.
//!
//! Every admitted unit carries a deadline. When it passes, the unit is
//! cancelled exactly as if it had been preempted, and a [`Revocation`] with
//! cause `timeout` is sent so the engine can record why the job stopped.

use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use keel_core::domain::job::CancelCause;
use keel_core::dto::governor::{GovernorStatus, SlotHolder};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{EngineError, Result};

/// Behaviour when every slot is occupied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreemptionPolicy {
    /// Cancel the oldest holder and admit the newcomer
    Preempt,
    /// Refuse the newcomer with `CapacityExceeded`
    Reject,
}

impl FromStr for PreemptionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preempt" => Ok(PreemptionPolicy::Preempt),
            "reject" => Ok(PreemptionPolicy::Reject),
            other => Err(anyhow::anyhow!(
                "unknown preemption policy '{}' (expected preempt or reject)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GovernorConfig {
    pub slots: usize,
    pub max_runtime: Duration,
    pub policy: PreemptionPolicy,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            slots: 1,
            max_runtime: Duration::from_secs(1800),
            policy: PreemptionPolicy::Preempt,
        }
    }
}

/// A slot taken away by the governor itself rather than by the job owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revocation {
    pub job_id: Uuid,
    /// `Timeout` or `Preempted`
    pub cause: CancelCause,
    /// Admission the revoked slot belonged to
    pub generation: u64,
}

/// Handed to whoever runs the unit of work
#[derive(Debug, Clone)]
pub struct SlotGrant {
    pub job_id: Uuid,
    /// Cancelled when the unit must stop: pause, cancel, preemption, timeout
    pub token: CancellationToken,
    pub admitted_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    /// Holder that was cancelled to make room
    pub preempted: Option<Uuid>,
    /// Distinguishes this admission from earlier and later ones of the same job
    pub generation: u64,
}

struct Holder {
    job_id: Uuid,
    token: CancellationToken,
    admitted_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
    generation: u64,
}

impl Holder {
    fn grant(&self, preempted: Option<Uuid>) -> SlotGrant {
        SlotGrant {
            job_id: self.job_id,
            token: self.token.clone(),
            admitted_at: self.admitted_at,
            deadline: self.deadline,
            preempted,
            generation: self.generation,
        }
    }
}

#[derive(Default)]
struct Slots {
    /// Oldest first
    holders: Vec<Holder>,
    generation: u64,
    open: bool,
}

struct Shared {
    slots: Mutex<Slots>,
    events: mpsc::UnboundedSender<Revocation>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deadline reached; ignored if the unit already left or was re-admitted
    fn expire(&self, job_id: Uuid, generation: u64) {
        let mut slots = self.lock();
        let Some(pos) = slots
            .holders
            .iter()
            .position(|h| h.job_id == job_id && h.generation == generation)
        else {
            return;
        };
        let holder = slots.holders.remove(pos);
        drop(slots);

        holder.token.cancel();
        warn!(
            job_id = %job_id,
            cause = "timeout",
            "Maximum runtime exceeded, cancelling unit of work"
        );
        let _ = self.events.send(Revocation {
            job_id,
            cause: CancelCause::Timeout,
            generation,
        });
    }
}

/// Admission control for expensive work
///
/// Owned by the process hosting the engine; call [`Governor::init`] before
/// admitting work and [`Governor::shutdown`] when stopping.
pub struct Governor {
    config: GovernorConfig,
    clock: Arc<dyn Clock>,
    shared: Arc<Shared>,
}

impl Governor {
    /// Creates a closed governor and the receiving end of its revocations
    pub fn new(
        config: GovernorConfig,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::UnboundedReceiver<Revocation>) {
        let (events, rx) = mpsc::unbounded_channel();
        let governor = Self {
            config,
            clock,
            shared: Arc::new(Shared {
                slots: Mutex::new(Slots::default()),
                events,
            }),
        };
        (governor, rx)
    }

    /// Opens the governor for admissions
    pub fn init(&self) {
        self.shared.lock().open = true;
        info!(
            slots = self.config.slots,
            max_runtime_secs = self.config.max_runtime.as_secs(),
            policy = ?self.config.policy,
            "Concurrency governor started"
        );
    }

    /// Closes the governor and signals every holder to stop
    ///
    /// Holders are not reported as revoked; their jobs keep their stored
    /// state and can be paused, resumed or cancelled after a restart.
    pub fn shutdown(&self) {
        let holders = {
            let mut slots = self.shared.lock();
            slots.open = false;
            std::mem::take(&mut slots.holders)
        };

        for holder in &holders {
            holder.token.cancel();
        }
        info!(
            signalled = holders.len(),
            cause = "shutdown",
            "Concurrency governor shut down"
        );
    }

    /// Grants `job_id` an execution slot
    ///
    /// Never blocks. Admitting a job that already holds a slot returns its
    /// existing grant.
    pub fn admit(&self, job_id: Uuid) -> Result<SlotGrant> {
        let mut slots = self.shared.lock();

        if !slots.open {
            warn!(job_id = %job_id, "Admission refused, governor is not running");
            return Err(EngineError::CapacityExceeded(job_id));
        }

        if let Some(holder) = slots.holders.iter().find(|h| h.job_id == job_id) {
            return Ok(holder.grant(None));
        }

        let mut preempted = None;
        if slots.holders.len() >= self.config.slots {
            if self.config.policy == PreemptionPolicy::Reject {
                debug!(job_id = %job_id, "All slots taken, rejecting admission");
                return Err(EngineError::CapacityExceeded(job_id));
            }

            let victim = slots.holders.remove(0);
            victim.token.cancel();
            warn!(
                job_id = %victim.job_id,
                preempted_by = %job_id,
                cause = "preempted",
                "Preempting slot holder"
            );
            let _ = self.shared.events.send(Revocation {
                job_id: victim.job_id,
                cause: CancelCause::Preempted,
                generation: victim.generation,
            });
            preempted = Some(victim.job_id);
        }

        slots.generation += 1;
        let generation = slots.generation;
        let admitted_at = self.clock.now();
        let deadline = chrono::Duration::from_std(self.config.max_runtime)
            .ok()
            .and_then(|d| admitted_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let holder = Holder {
            job_id,
            token: CancellationToken::new(),
            admitted_at,
            deadline,
            generation,
        };
        let grant = holder.grant(preempted);
        slots.holders.push(holder);
        drop(slots);

        self.arm_deadline(job_id, generation, grant.token.clone());
        info!(job_id = %job_id, "Execution slot granted");
        Ok(grant)
    }

    /// Frees the slot after a pause or a finished run and tells the work to stop
    pub fn release(&self, job_id: Uuid) -> bool {
        let released = self.take(job_id);
        if released {
            debug!(job_id = %job_id, "Execution slot released");
        }
        released
    }

    /// Signals cancellation and frees the slot
    ///
    /// Returns once the signal is delivered; the work may take longer to
    /// stop. Cancelling a unit that is not admitted is a no-op.
    pub fn cancel(&self, job_id: Uuid) -> bool {
        let cancelled = self.take(job_id);
        if cancelled {
            info!(job_id = %job_id, cause = "user", "Cancellation signalled");
        }
        cancelled
    }

    /// Whether `generation` is still the job's latest admission
    ///
    /// False once the job was admitted again, so a revocation that arrives
    /// after a pause and resume does not touch the new run.
    pub fn is_current(&self, job_id: Uuid, generation: u64) -> bool {
        !self
            .shared
            .lock()
            .holders
            .iter()
            .any(|h| h.job_id == job_id && h.generation != generation)
    }

    pub fn holds(&self, job_id: Uuid) -> bool {
        self.shared.lock().holders.iter().any(|h| h.job_id == job_id)
    }

    /// Cancellation token of a current holder
    pub fn token(&self, job_id: Uuid) -> Option<CancellationToken> {
        self.shared
            .lock()
            .holders
            .iter()
            .find(|h| h.job_id == job_id)
            .map(|h| h.token.clone())
    }

    pub fn status(&self) -> GovernorStatus {
        let slots = self.shared.lock();
        GovernorStatus {
            slots: self.config.slots,
            holders: slots
                .holders
                .iter()
                .map(|h| SlotHolder {
                    job_id: h.job_id,
                    admitted_at: h.admitted_at,
                    deadline: h.deadline,
                })
                .collect(),
        }
    }

    fn take(&self, job_id: Uuid) -> bool {
        let holder = {
            let mut slots = self.shared.lock();
            slots
                .holders
                .iter()
                .position(|h| h.job_id == job_id)
                .map(|pos| slots.holders.remove(pos))
        };

        match holder {
            Some(holder) => {
                holder.token.cancel();
                true
            }
            None => false,
        }
    }

    fn arm_deadline(&self, job_id: Uuid, generation: u64, token: CancellationToken) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(job_id = %job_id, "No async runtime, maximum runtime is not enforced");
            return;
        };

        let shared = Arc::clone(&self.shared);
        let max_runtime = self.config.max_runtime;

        runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(max_runtime) => shared.expire(job_id, generation),
            }
        });
    }
}
