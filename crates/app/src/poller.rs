//! Status poller for long-running generation jobs.
//!
//! The server advances a process through the generation stages on its own
//! schedule; the client only observes. While a job is in flight the poller
//! fetches the lightweight status endpoint on a fixed interval and folds
//! the result into the shared [`ProcessCache`]. When a terminal status is
//! observed it re-fetches the full detail representation -- the status
//! endpoint may omit the result URLs -- merges it, and stops.
//!
//! The poll loop is an explicit cancellable task: every await is raced
//! against a [`CancellationToken`], so tearing down the owning view (or
//! re-targeting it at a different process) cancels the timer and any
//! in-flight fetch deterministically. A hard wall-clock budget bounds the
//! loop even if no terminal status ever arrives.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use jewelai_client::DesignApi;
use jewelai_core::process::DesignProcessStatus;
use jewelai_core::types::EntityId;

use crate::cache::ProcessCache;

/// Tunable parameters for the polling loop.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Delay between status fetches.
    pub interval: Duration,
    /// Hard wall-clock budget from the moment polling starts.
    pub budget: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(4),
            budget: Duration::from_secs(10 * 60),
        }
    }
}

/// Lifecycle phase of one polling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerPhase {
    /// Not yet started.
    Idle,
    /// Actively fetching on the interval.
    Polling,
    /// Stopped: terminal status observed, budget expired, session expired,
    /// or cancelled.
    Settled,
}

/// Events emitted by a polling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerEvent {
    /// A non-terminal status was merged into the cache.
    StatusUpdated {
        id: EntityId,
        status: DesignProcessStatus,
    },
    /// Terminal status observed and the full detail re-fetched and cached.
    Settled { id: EntityId },
    /// A 401 invalidated the session; the caller should redirect to login.
    SessionExpired,
    /// The wall-clock budget elapsed with no terminal status. The
    /// last-known status stays displayed; no failure state is synthesized.
    Expired,
}

/// Factory for polling runs against one API client and cache.
pub struct StatusPoller {
    api: DesignApi,
    cache: ProcessCache,
    config: PollerConfig,
}

impl StatusPoller {
    pub fn new(api: DesignApi, cache: ProcessCache) -> Self {
        Self::with_config(api, cache, PollerConfig::default())
    }

    pub fn with_config(api: DesignApi, cache: ProcessCache, config: PollerConfig) -> Self {
        Self { api, cache, config }
    }

    /// Whether polling should start for an observed status.
    ///
    /// `generation_triggered` is the optimistic local flag set right after
    /// a successful generate request; it covers the window before the
    /// server-reported status catches up.
    pub fn should_start(status: DesignProcessStatus, generation_triggered: bool) -> bool {
        generation_triggered || status.is_generation_in_flight()
    }

    /// Start a polling run for one process. The returned handle owns the
    /// run; dropping it cancels the loop.
    pub fn spawn(&self, process_id: EntityId) -> PollerHandle {
        let cancel = CancellationToken::new();
        let (phase_tx, phase_rx) = watch::channel(PollerPhase::Polling);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(poll_loop(
            self.api.clone(),
            self.cache.clone(),
            self.config.clone(),
            process_id,
            cancel.clone(),
            phase_tx,
            event_tx,
        ));

        PollerHandle {
            process_id,
            cancel,
            phase: phase_rx,
            events: event_rx,
            task: Some(task),
        }
    }
}

/// Owning handle for one polling run.
pub struct PollerHandle {
    process_id: EntityId,
    cancel: CancellationToken,
    phase: watch::Receiver<PollerPhase>,
    events: mpsc::UnboundedReceiver<PollerEvent>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl PollerHandle {
    pub fn process_id(&self) -> EntityId {
        self.process_id
    }

    pub fn phase(&self) -> PollerPhase {
        *self.phase.borrow()
    }

    /// Next event from the run, or `None` once the loop has finished and
    /// drained.
    pub async fn next_event(&mut self) -> Option<PollerEvent> {
        self.events.recv().await
    }

    /// Cancel the run. Safe to call repeatedly.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Cancel and wait for the loop task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        // The owning view is gone; no timer may outlast it.
        self.cancel.cancel();
    }
}

async fn poll_loop(
    api: DesignApi,
    cache: ProcessCache,
    config: PollerConfig,
    process_id: EntityId,
    cancel: CancellationToken,
    phase: watch::Sender<PollerPhase>,
    events: mpsc::UnboundedSender<PollerEvent>,
) {
    let started = Instant::now();
    let budget = tokio::time::sleep_until(started + config.budget);
    tokio::pin!(budget);

    // First fetch happens one interval after start, matching the reference
    // cadence.
    let mut ticker = interval_at(started + config.interval, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!(process_id, interval_ms = config.interval.as_millis() as u64, "Status polling started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(process_id, "Status polling cancelled");
                break;
            }
            _ = &mut budget => {
                tracing::info!(process_id, "Status polling budget elapsed");
                let _ = events.send(PollerEvent::Expired);
                break;
            }
            _ = ticker.tick() => {}
        }

        // One cycle: status fetch, then (only on a terminal status) the
        // follow-up detail fetch -- strictly sequential, so no two detail
        // fetches for this process can ever overlap. Both fetches also race
        // the budget: a hung connection must not outlive the wall clock.
        let status = tokio::select! {
            _ = cancel.cancelled() => break,
            _ = &mut budget => {
                tracing::info!(process_id, "Status polling budget elapsed mid-fetch");
                let _ = events.send(PollerEvent::Expired);
                break;
            }
            result = api.get_status(process_id) => result,
        };

        match status {
            Ok(observed) if observed.status.is_generation_terminal() => {
                let detail = tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = &mut budget => {
                        tracing::info!(process_id, "Status polling budget elapsed mid-fetch");
                        let _ = events.send(PollerEvent::Expired);
                        break;
                    }
                    result = api.get_process_details(process_id) => result,
                };
                match detail {
                    Ok(fresh) => {
                        cache.upsert_detail(fresh);
                        let _ = events.send(PollerEvent::Settled { id: process_id });
                        break;
                    }
                    Err(err) if err.is_auth_failure() => {
                        let _ = events.send(PollerEvent::SessionExpired);
                        break;
                    }
                    Err(err) => {
                        // The terminal status will be observed again on the
                        // next tick; treat this fetch as transient.
                        tracing::warn!(process_id, error = %err, "Detail fetch after terminal status failed");
                    }
                }
            }
            Ok(observed) => {
                cache.merge_status(&observed);
                let _ = events.send(PollerEvent::StatusUpdated {
                    id: process_id,
                    status: observed.status,
                });
            }
            Err(err) if err.is_auth_failure() => {
                let _ = events.send(PollerEvent::SessionExpired);
                break;
            }
            Err(err) => {
                tracing::debug!(process_id, error = %err, "Transient status fetch error, keeping polling");
            }
        }
    }

    let _ = phase.send(PollerPhase::Settled);
}
