//! Outbox dispatcher: drains pending messages and drives delivery
//!
//! Grounded on the teacher's `crates/worker/src/lib.rs` `run_worker_loop`
//! (mpsc-trigger + dual `JoinSet` + `CancellationToken`-based shutdown),
//! generalized to the Idle -> Ticked -> Claiming -> Dispatching state
//! machine: a ticker drives single-row claims, and each claimed
//! message's delivery outcome is awaited by an independent waiter task
//! so the main loop never blocks on a single slow send.

pub mod config;

use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use userdir_bus::BusProducer;
use userdir_core::MessageId;
use userdir_store::backoff::BackoffPolicy;
use userdir_store::outbox;

use crate::config::DispatcherConfig;

/// Hard ceiling on how long a single in-flight send may be awaited
/// before the waiter gives up and returns the row to `Waiting`.
const WAITER_DEADLINE: Duration = Duration::from_secs(300);

/// Bounded grace period the loop waits for in-flight waiters to finish
/// during shutdown before abandoning them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Run the dispatcher loop until `shutdown` is cancelled.
///
/// Runs `sweep_stranded` once before entering the loop (recovering rows
/// a prior crash left in `Processing`), then ticks at
/// `config.sleep_interval_secs`, claiming at most one row per tick and
/// spawning an independent waiter for its delivery outcome.
pub async fn run_dispatcher(
    pool: PgPool,
    producer: BusProducer,
    config: DispatcherConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let backoff = BackoffPolicy::new(config.base_retry_secs, config.max_retry_secs);

    let recovered = outbox::sweep_stranded(&pool, backoff).await?;
    if recovered > 0 {
        warn!(
            recovered,
            "swept stranded processing rows back to waiting on startup"
        );
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(config.sleep_interval_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut waiters: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("dispatcher shutting down, draining in-flight waiters");
                break;
            }

            _ = ticker.tick() => {
                dispatch_one(&pool, &producer, backoff, &mut waiters).await;
            }

            Some(res) = waiters.join_next(), if !waiters.is_empty() => {
                if let Err(e) = res {
                    error!(error = %e, "waiter task panicked");
                }
            }
        }
    }

    producer.close(Duration::from_secs(5));

    match tokio::time::timeout(SHUTDOWN_GRACE, drain(&mut waiters)).await {
        Ok(()) => info!("all in-flight waiters finished"),
        Err(_) => warn!(
            remaining = waiters.len(),
            "grace period expired, abandoning in-flight waiters; affected rows stay in Processing and will be recovered by the next startup sweep"
        ),
    }

    Ok(())
}

async fn drain(waiters: &mut JoinSet<()>) {
    while let Some(res) = waiters.join_next().await {
        if let Err(e) = res {
            error!(error = %e, "waiter task panicked during drain");
        }
    }
}

/// One Claiming -> Dispatching step. Never returns an error: failures
/// are logged and the loop simply waits for the next tick, per the
/// dispatcher's error-containment policy (loop errors never crash the
/// process).
async fn dispatch_one(
    pool: &PgPool,
    producer: &BusProducer,
    backoff: BackoffPolicy,
    waiters: &mut JoinSet<()>,
) {
    let message = match outbox::claim_pending(pool, backoff).await {
        Ok(message) => message,
        Err(userdir_core::DirectoryError::NoPendingMessage) => return,
        Err(e) => {
            error!(error = %e, "failed to claim pending outbox row");
            return;
        }
    };

    let msg_id = message.msg_id;
    let envelope = match outbox::envelope_of(&message) {
        Ok(envelope) => envelope,
        Err(e) => {
            error!(
                error = %e,
                msg_id = %msg_id,
                "failed to decode outbox envelope, leaving row in processing for the startup sweep"
            );
            return;
        }
    };

    let receiver = producer.produce(envelope);

    let pool = pool.clone();
    waiters.spawn(async move {
        await_delivery(pool, msg_id, backoff, receiver).await;
    });
}

async fn await_delivery(
    pool: PgPool,
    msg_id: MessageId,
    backoff: BackoffPolicy,
    receiver: tokio::sync::oneshot::Receiver<Result<(), userdir_bus::ProduceError>>,
) {
    let outcome = tokio::time::timeout(WAITER_DEADLINE, receiver).await;

    let delivered = match outcome {
        Ok(Ok(Ok(()))) => true,
        Ok(Ok(Err(e))) => {
            warn!(error = %e, msg_id = %msg_id, "delivery reported failure");
            false
        }
        Ok(Err(_)) => {
            warn!(msg_id = %msg_id, "delivery outcome channel dropped before a result arrived");
            false
        }
        Err(_) => {
            warn!(msg_id = %msg_id, "delivery deadline expired");
            false
        }
    };

    let result = if delivered {
        outbox::mark_sent(&pool, msg_id).await
    } else {
        outbox::mark_retry(&pool, msg_id, backoff).await
    };

    if let Err(e) = result {
        error!(error = %e, msg_id = %msg_id, "failed to record delivery outcome");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiter_deadline_matches_spec() {
        assert_eq!(WAITER_DEADLINE, Duration::from_secs(300));
    }

    #[test]
    fn shutdown_grace_is_bounded() {
        assert!(SHUTDOWN_GRACE <= Duration::from_secs(30));
    }
}
