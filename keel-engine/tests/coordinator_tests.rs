//! Integration tests for the recovery coordinator.
//!
//! Every scenario runs against the in-memory store and the SQLite store.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{BACKENDS, checkpoint, governor_config, harness, harness_on, harness_with};
use keel_core::domain::action::ActionKind;
use keel_core::domain::job::{CancelCause, JobRecord, JobState, JobStatus, RESTARTED_STEP};
use keel_core::dto::action::AppendAction;
use keel_core::dto::job::{CompleteJob, CreateJob, FailJob, ProgressUpdate};
use keel_core::machine::Action;
use keel_engine::error::{EngineError, Result as EngineResult};
use keel_engine::governor::{PreemptionPolicy, Revocation};
use keel_engine::repository::{JobStore, MemoryActionLog, MemoryJobStore, Mutator, Settle};
use serde_json::json;
use uuid::Uuid;

/// In-memory store whose writes can be made to fail after the mutator ran
#[derive(Default)]
struct FlakyStore {
    inner: MemoryJobStore,
    failing: AtomicBool,
}

impl FlakyStore {
    fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobStore for FlakyStore {
    async fn create(&self, record: JobRecord) -> EngineResult<JobRecord> {
        self.inner.create(record).await
    }

    async fn get(&self, id: Uuid) -> EngineResult<JobRecord> {
        self.inner.get(id).await
    }

    async fn update_settled(
        &self,
        id: Uuid,
        mutator: Mutator,
        settle: Settle,
    ) -> EngineResult<JobRecord> {
        if !self.failing.load(Ordering::SeqCst) {
            return self.inner.update_settled(id, mutator, settle).await;
        }

        let outcome: EngineResult<JobRecord> = match self.inner.get(id).await {
            Ok(current) => mutator(&current)
                .and_then(|_| Err(EngineError::StorageUnavailable("disk full".to_string()))),
            Err(err) => Err(err),
        };
        settle(false);
        outcome
    }

    async fn list(&self, owner_id: Option<&str>) -> EngineResult<Vec<JobRecord>> {
        self.inner.list(owner_id).await
    }
}

#[tokio::test]
async fn test_resume_restores_last_checkpoint() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create_running("u1", "search").await;

        h.coordinator
            .write_checkpoint("u1", id, checkpoint("Searching", 25.0, 1))
            .await
            .unwrap();
        let ack = h
            .coordinator
            .write_checkpoint("u1", id, checkpoint("Analyzing", 50.0, 2))
            .await
            .unwrap();
        assert!(ack.accepted, "{backend:?}");
        assert_eq!(ack.sequence, 2);
        assert!(!ack.cancel_requested);

        h.coordinator
            .report_progress(
                "u1",
                id,
                ProgressUpdate {
                    step: "Summarizing".to_string(),
                    progress: 65.0,
                },
            )
            .await
            .unwrap();

        let paused = h.coordinator.pause("u1", id).await.unwrap();
        assert_eq!(paused.status(), JobStatus::Paused);
        assert!(!h.governor.holds(id));

        let resumed = h.coordinator.resume("u1", id).await.unwrap();
        assert_eq!(resumed.job.status(), JobStatus::Running, "{backend:?}");
        assert_eq!(resumed.job.step, "Analyzing");
        assert_eq!(resumed.job.progress, 50.0);
        assert_eq!(resumed.job.checkpoint_sequence(), Some(2));
        assert!(!resumed.grant.token.is_cancelled());
        assert!(h.governor.holds(id));
    }
}

#[tokio::test]
async fn test_restart_clears_failure() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create_running("u1", "search").await;
        h.coordinator
            .write_checkpoint("u1", id, checkpoint("Searching", 30.0, 4))
            .await
            .unwrap();

        let failed = h
            .coordinator
            .fail(
                "u1",
                id,
                FailJob {
                    error: "Network timeout".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(failed.error(), Some("Network timeout"), "{backend:?}");
        assert!(!h.governor.holds(id));

        let restarted = h.coordinator.restart("u1", id).await.unwrap();
        assert_eq!(restarted.status(), JobStatus::Created);
        assert!(restarted.error().is_none());
        assert_eq!(restarted.progress, 0.0);
        assert_eq!(restarted.step, RESTARTED_STEP);
        assert_eq!(restarted.checkpoint_sequence(), Some(4));

        let stored = h.coordinator.snapshot("u1", id).await.unwrap();
        assert_eq!(stored, restarted, "{backend:?}");
    }
}

#[tokio::test]
async fn test_restart_from_running_is_rejected() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create_running("u1", "search").await;
        let before = h.coordinator.snapshot("u1", id).await.unwrap();

        let err = h.coordinator.restart("u1", id).await.unwrap_err();
        match err {
            EngineError::InvalidTransition { action, state } => {
                assert_eq!(action, Action::Restart);
                assert_eq!(state, JobStatus::Running);
            }
            other => panic!("{backend:?}: unexpected error {other:?}"),
        }

        let after = h.coordinator.snapshot("u1", id).await.unwrap();
        assert_eq!(before, after, "{backend:?}");
    }
}

#[tokio::test]
async fn test_other_callers_are_forbidden() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create_running("u1", "search").await;

        let snapshot = h.coordinator.snapshot("u2", id).await.unwrap_err();
        assert!(matches!(snapshot, EngineError::Forbidden(_)), "{backend:?}");

        let pause = h.coordinator.pause("u2", id).await.unwrap_err();
        assert!(matches!(pause, EngineError::Forbidden(_)));

        let log = h.coordinator.action_log("u2", id).await.unwrap_err();
        assert!(matches!(log, EngineError::Forbidden(_)));

        let write = h
            .coordinator
            .write_checkpoint("u2", id, checkpoint("Searching", 10.0, 1))
            .await
            .unwrap_err();
        assert!(matches!(write, EngineError::Forbidden(_)));

        // still running, still holding its slot
        let job = h.coordinator.snapshot("u1", id).await.unwrap();
        assert_eq!(job.status(), JobStatus::Running);
        assert!(job.checkpoint.is_none());
        assert!(h.governor.holds(id));

        assert!(h.coordinator.list("u2").await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let err = h
            .coordinator
            .snapshot("u1", uuid::Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)), "{backend:?}");
    }
}

#[tokio::test]
async fn test_cancel_twice_is_idempotent() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create_running("u1", "search").await;
        let token = h.governor.token(id).unwrap();

        let first = h.coordinator.cancel("u1", id).await.unwrap();
        assert_eq!(first.cancel_cause(), Some(CancelCause::User), "{backend:?}");
        assert!(token.is_cancelled());
        assert!(!h.governor.holds(id));

        let second = h.coordinator.cancel("u1", id).await.unwrap();
        assert_eq!(second, first, "{backend:?}");
    }
}

#[tokio::test]
async fn test_cancel_from_created_and_paused() {
    for backend in BACKENDS {
        let h = harness(backend).await;

        let created = h.create("u1", "search").await;
        let job = h.coordinator.cancel("u1", created).await.unwrap();
        assert_eq!(job.status(), JobStatus::Cancelled, "{backend:?}");

        let paused = h.create_running("u1", "search").await;
        h.coordinator.pause("u1", paused).await.unwrap();
        let job = h.coordinator.cancel("u1", paused).await.unwrap();
        assert_eq!(job.status(), JobStatus::Cancelled);

        let completed = h.create_running("u1", "search").await;
        h.coordinator
            .complete("u1", completed, CompleteJob { result: json!(1) })
            .await
            .unwrap();
        let err = h.coordinator.cancel("u1", completed).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }
}

#[tokio::test]
async fn test_stale_checkpoint_is_ignored() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create_running("u1", "search").await;

        h.coordinator
            .write_checkpoint("u1", id, checkpoint("Analyzing", 60.0, 5))
            .await
            .unwrap();
        let before = h.coordinator.snapshot("u1", id).await.unwrap();

        for stale in [checkpoint("Searching", 20.0, 3), checkpoint("Other", 70.0, 5)] {
            let ack = h.coordinator.write_checkpoint("u1", id, stale).await.unwrap();
            assert!(!ack.accepted, "{backend:?}");
            assert_eq!(ack.sequence, 5);
        }

        let after = h.coordinator.snapshot("u1", id).await.unwrap();
        assert_eq!(after, before, "{backend:?}");
    }
}

#[tokio::test]
async fn test_checkpoint_sequence_is_bounded_on_every_backend() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create_running("u1", "search").await;
        h.coordinator
            .write_checkpoint("u1", id, checkpoint("Analyzing", 60.0, 5))
            .await
            .unwrap();
        let before = h.coordinator.snapshot("u1", id).await.unwrap();

        let err = h
            .coordinator
            .write_checkpoint("u1", id, checkpoint("Analyzing", 61.0, u64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)), "{backend:?}: {err:?}");

        let ack = h
            .coordinator
            .write_checkpoint("u1", id, checkpoint("Analyzing", 62.0, i64::MAX as u64))
            .await
            .unwrap();
        assert!(ack.accepted, "{backend:?}");
        assert_eq!(ack.sequence, i64::MAX as u64);

        let after = h.coordinator.snapshot("u1", id).await.unwrap();
        assert_ne!(after.checkpoint, before.checkpoint);
    }
}

#[tokio::test]
async fn test_checkpoint_after_cancel_requests_stop() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create_running("u1", "search").await;
        h.coordinator.cancel("u1", id).await.unwrap();

        let ack = h
            .coordinator
            .write_checkpoint("u1", id, checkpoint("Searching", 10.0, 1))
            .await
            .unwrap();
        assert!(!ack.accepted, "{backend:?}");
        assert!(ack.cancel_requested);

        let job = h.coordinator.snapshot("u1", id).await.unwrap();
        assert!(job.checkpoint.is_none());
    }
}

#[tokio::test]
async fn test_checkpoint_while_paused_is_kept() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create_running("u1", "search").await;
        h.coordinator.pause("u1", id).await.unwrap();

        // the executor flushes its last state after observing the pause
        let ack = h
            .coordinator
            .write_checkpoint("u1", id, checkpoint("Flushing", 42.0, 1))
            .await
            .unwrap();
        assert!(ack.accepted, "{backend:?}");
        assert!(ack.cancel_requested);

        let resumed = h.coordinator.resume("u1", id).await.unwrap();
        assert_eq!(resumed.job.step, "Flushing");
        assert_eq!(resumed.job.progress, 42.0);
    }
}

#[tokio::test]
async fn test_clear_checkpoint_is_idempotent() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create_running("u1", "search").await;
        h.coordinator
            .write_checkpoint("u1", id, checkpoint("Searching", 10.0, 9))
            .await
            .unwrap();

        let cleared = h.coordinator.clear_checkpoint("u1", id).await.unwrap();
        assert!(cleared.checkpoint.is_none(), "{backend:?}");
        let again = h.coordinator.clear_checkpoint("u1", id).await.unwrap();
        assert_eq!(again, cleared);

        // sequence numbering starts over after an explicit clear
        let ack = h
            .coordinator
            .write_checkpoint("u1", id, checkpoint("Searching", 12.0, 1))
            .await
            .unwrap();
        assert!(ack.accepted, "{backend:?}");
    }
}

#[tokio::test]
async fn test_progress_never_moves_backwards() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create_running("u1", "search").await;

        for (step, progress) in [("Searching", 40.0), ("Retrying", 30.0)] {
            h.coordinator
                .report_progress(
                    "u1",
                    id,
                    ProgressUpdate {
                        step: step.to_string(),
                        progress,
                    },
                )
                .await
                .unwrap();
        }

        let job = h.coordinator.snapshot("u1", id).await.unwrap();
        assert_eq!(job.progress, 40.0, "{backend:?}");
        assert_eq!(job.step, "Retrying");

        let err = h
            .coordinator
            .report_progress(
                "u1",
                id,
                ProgressUpdate {
                    step: "Searching".to_string(),
                    progress: 140.0,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}

#[tokio::test]
async fn test_complete_records_result_and_frees_slot() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create_running("u1", "analysis").await;
        let token = h.governor.token(id).unwrap();

        let job = h
            .coordinator
            .complete(
                "u1",
                id,
                CompleteJob {
                    result: json!({"summary": "ok"}),
                },
            )
            .await
            .unwrap();

        assert_eq!(job.result(), Some(&json!({"summary": "ok"})), "{backend:?}");
        assert_eq!(job.progress, 100.0);
        assert!(token.is_cancelled());
        assert!(h.governor.status().holders.is_empty());
    }
}

#[tokio::test]
async fn test_create_validates_and_lists_newest_first() {
    for backend in BACKENDS {
        let h = harness(backend).await;

        let err = h
            .coordinator
            .create(
                "u1",
                CreateJob {
                    kind: " ".to_string(),
                    step: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)), "{backend:?}");

        let custom = h
            .coordinator
            .create(
                "u1",
                CreateJob {
                    kind: "crawl".to_string(),
                    step: Some("Waiting for input".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(custom.step, "Waiting for input");

        h.clock.advance(chrono::Duration::seconds(5));
        let newest = h.create("u1", "search").await;
        h.create("u2", "search").await;

        let mine = h.coordinator.list("u1").await.unwrap();
        let ids: Vec<_> = mine.iter().map(|j| j.id()).collect();
        assert_eq!(ids, vec![newest, custom.id()], "{backend:?}");
    }
}

#[tokio::test]
async fn test_start_preempts_oldest_holder() {
    for backend in BACKENDS {
        let mut h = harness(backend).await;
        let first = h.create("u1", "search").await;
        let first_grant = h.coordinator.start("u1", first).await.unwrap().grant;

        let second = h.create("u1", "search").await;
        let admitted = h.coordinator.start("u1", second).await.unwrap();

        assert_eq!(admitted.grant.preempted, Some(first), "{backend:?}");
        assert!(first_grant.token.is_cancelled());
        assert!(h.governor.holds(second));
        assert_eq!(h.governor.status().holders.len(), 1);

        let revocation = h.revocations.recv().await.unwrap();
        assert_eq!(
            revocation,
            Revocation {
                job_id: first,
                cause: CancelCause::Preempted,
                generation: first_grant.generation,
            }
        );

        let job = h.coordinator.apply_revocation(revocation).await.unwrap();
        assert_eq!(job.cancel_cause(), Some(CancelCause::Preempted));

        let job = h.coordinator.snapshot("u1", second).await.unwrap();
        assert_eq!(job.status(), JobStatus::Running);
    }
}

#[tokio::test]
async fn test_revocation_ignored_once_job_left_running() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create("u1", "search").await;
        let grant = h.coordinator.start("u1", id).await.unwrap().grant;
        let paused = h.coordinator.pause("u1", id).await.unwrap();

        let job = h
            .coordinator
            .apply_revocation(Revocation {
                job_id: id,
                cause: CancelCause::Timeout,
                generation: grant.generation,
            })
            .await
            .unwrap();
        assert_eq!(job, paused, "{backend:?}");
    }
}

#[tokio::test]
async fn test_late_preemption_leaves_resumed_run_alone() {
    for backend in BACKENDS {
        let mut h = harness(backend).await;
        let first = h.create_running("u1", "search").await;
        let second = h.create("u1", "search").await;
        h.coordinator.start("u1", second).await.unwrap();

        // the preemption of `first` is still queued while it is paused and resumed
        h.coordinator.pause("u1", first).await.unwrap();
        let resumed = h.coordinator.resume("u1", first).await.unwrap();

        let revocation = h.revocations.recv().await.unwrap();
        assert_eq!(revocation.job_id, first);
        assert_eq!(revocation.cause, CancelCause::Preempted);
        assert_ne!(revocation.generation, resumed.grant.generation);

        let job = h.coordinator.apply_revocation(revocation).await.unwrap();
        assert_eq!(job.status(), JobStatus::Running, "{backend:?}");
        assert!(h.governor.holds(first));
        assert!(!resumed.grant.token.is_cancelled());

        // resuming `first` preempted `second`; that revocation is still live
        let revocation = h.revocations.recv().await.unwrap();
        assert_eq!(revocation.job_id, second);
        let job = h.coordinator.apply_revocation(revocation).await.unwrap();
        assert_eq!(job.cancel_cause(), Some(CancelCause::Preempted), "{backend:?}");
    }
}

#[tokio::test]
async fn test_failed_write_leaves_slot_with_the_job() {
    let store = Arc::new(FlakyStore::default());
    let h = harness_on(
        store.clone(),
        Arc::new(MemoryActionLog::new()),
        governor_config(2, PreemptionPolicy::Preempt),
    );
    let id = h.create_running("u1", "search").await;
    let waiting = h.create("u1", "search").await;
    let token = h.governor.token(id).unwrap();

    store.fail_writes(true);
    let attempts = vec![
        h.coordinator.pause("u1", id).await,
        h.coordinator.cancel("u1", id).await,
        h.coordinator
            .complete("u1", id, CompleteJob { result: json!(null) })
            .await,
        h.coordinator
            .fail(
                "u1",
                id,
                FailJob {
                    error: "boom".to_string(),
                },
            )
            .await,
    ];
    for attempt in attempts {
        assert!(
            matches!(attempt, Err(EngineError::StorageUnavailable(_))),
            "{attempt:?}"
        );
    }
    assert!(h.governor.holds(id));
    assert!(!token.is_cancelled());

    let err = h.coordinator.start("u1", waiting).await.unwrap_err();
    assert!(matches!(err, EngineError::StorageUnavailable(_)));
    assert!(!h.governor.holds(waiting));

    store.fail_writes(false);
    let job = h.coordinator.snapshot("u1", id).await.unwrap();
    assert_eq!(job.status(), JobStatus::Running);

    let job = h.coordinator.pause("u1", id).await.unwrap();
    assert_eq!(job.status(), JobStatus::Paused);
    assert!(!h.governor.holds(id));
    assert!(token.is_cancelled());
}

#[tokio::test]
async fn test_rejected_batch_appends_nothing() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create_running("u1", "agent-run").await;

        let batch = vec![
            AppendAction {
                kind: ActionKind::Reasoning,
                message: "Looks fine".to_string(),
                detail: None,
            },
            AppendAction {
                kind: ActionKind::Decision,
                message: "   ".to_string(),
                detail: None,
            },
        ];
        let err = h
            .coordinator
            .append_actions("u1", id, batch)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)), "{backend:?}");
        assert!(h.coordinator.action_log("u1", id).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_resume_rejected_without_capacity() {
    for backend in BACKENDS {
        let h = harness_with(backend, governor_config(1, PreemptionPolicy::Reject)).await;
        let first = h.create_running("u1", "search").await;
        h.coordinator.pause("u1", first).await.unwrap();

        let second = h.create_running("u1", "search").await;

        let err = h.coordinator.resume("u1", first).await.unwrap_err();
        assert!(matches!(err, EngineError::CapacityExceeded(_)), "{backend:?}");

        let job = h.coordinator.snapshot("u1", first).await.unwrap();
        assert_eq!(job.status(), JobStatus::Paused);
        assert!(h.governor.holds(second));
        assert!(!h.governor.holds(first));

        let third = h.create("u1", "search").await;
        let err = h.coordinator.start("u1", third).await.unwrap_err();
        assert!(matches!(err, EngineError::CapacityExceeded(_)));
        let job = h.coordinator.snapshot("u1", third).await.unwrap();
        assert_eq!(job.status(), JobStatus::Created);
    }
}

#[tokio::test]
async fn test_action_log_keeps_insertion_order() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create_running("u1", "agent-run").await;

        assert!(h.coordinator.action_log("u1", id).await.unwrap().is_empty());

        let entries = vec![
            AppendAction {
                kind: ActionKind::Reasoning,
                message: "Query is ambiguous".to_string(),
                detail: None,
            },
            AppendAction {
                kind: ActionKind::Decision,
                message: "Search both meanings".to_string(),
                detail: Some(json!({"queries": 2})),
            },
        ];
        h.coordinator
            .append_actions("u1", id, entries)
            .await
            .unwrap();
        h.coordinator
            .append_action(
                "u1",
                id,
                AppendAction {
                    kind: ActionKind::Observation,
                    message: "12 results".to_string(),
                    detail: None,
                },
            )
            .await
            .unwrap();

        let log = h.coordinator.action_log("u1", id).await.unwrap();
        let messages: Vec<_> = log.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Query is ambiguous", "Search both meanings", "12 results"],
            "{backend:?}"
        );
        assert!(log.windows(2).all(|w| w[0].seq < w[1].seq));
        assert_eq!(log[1].detail, Some(json!({"queries": 2})));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pause_has_one_winner() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create_running("u1", "search").await;
        let coordinator = Arc::clone(&h.coordinator);

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                tokio::spawn(async move { coordinator.pause("u1", id).await })
            })
            .collect();

        let mut won = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(job) => {
                    assert_eq!(job.status(), JobStatus::Paused);
                    won += 1;
                }
                Err(EngineError::InvalidTransition { action, state }) => {
                    assert_eq!(action, Action::Pause);
                    assert_eq!(state, JobStatus::Paused);
                }
                Err(other) => panic!("{backend:?}: unexpected error {other:?}"),
            }
        }
        assert_eq!(won, 1, "{backend:?}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pause_and_resume_stay_consistent() {
    for backend in BACKENDS {
        let h = harness(backend).await;
        let id = h.create_running("u1", "search").await;

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let coordinator = Arc::clone(&h.coordinator);
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        coordinator.pause("u1", id).await.map(|j| j.status())
                    } else {
                        coordinator.resume("u1", id).await.map(|a| a.job.status())
                    }
                })
            })
            .collect();

        for task in tasks {
            match task.await.unwrap() {
                Ok(_) | Err(EngineError::InvalidTransition { .. }) => {}
                Err(other) => panic!("{backend:?}: unexpected error {other:?}"),
            }
        }

        let job = h.coordinator.snapshot("u1", id).await.unwrap();
        match job.state {
            JobState::Running => assert!(h.governor.holds(id), "{backend:?}"),
            JobState::Paused => assert!(!h.governor.holds(id), "{backend:?}"),
            other => panic!("{backend:?}: unexpected state {other:?}"),
        }
    }
}
