use super::governor::{NetworkGovernor, Submission};
use crate::errors::GovernorError;
use crate::logic::graph::PathHash;
use crate::logic::types::Signal;
use alloy_primitives::B256;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum StrikeCategory {
    Submitted,
    Skipped,
    Failed,
    Faulted,
}

/// Terminal outcome of one governor attempt.
#[derive(Debug)]
pub enum StrikeOutcome {
    Submitted(Submission),
    /// Insufficient funds or provider unavailable
    Skipped(GovernorError),
    /// Submission rejected
    Failed(GovernorError),
    /// The attempt panicked
    Faulted(String),
}

impl StrikeOutcome {
    pub fn from_attempt(attempt: Result<Submission, GovernorError>) -> Self {
        match attempt {
            Ok(submission) => Self::Submitted(submission),
            Err(e) if e.is_recoverable() => Self::Skipped(e),
            Err(e) => Self::Failed(e),
        }
    }

    pub fn category(&self) -> StrikeCategory {
        match self {
            Self::Submitted(_) => StrikeCategory::Submitted,
            Self::Skipped(_) => StrikeCategory::Skipped,
            Self::Failed(_) => StrikeCategory::Failed,
            Self::Faulted(_) => StrikeCategory::Faulted,
        }
    }
}

#[derive(Debug)]
pub struct StrikeReport {
    pub network: String,
    pub path_hash: PathHash,
    pub trigger: Option<B256>,
    pub outcome: StrikeOutcome,
    pub elapsed: Duration,
}

/// Dispatches a profitable signal to every governor at once.
///
/// Attempts are independent: no cancellation, no retry, and a slow or failing network never
/// holds back another. Each attempt reports exactly once on the channel returned by `new`.
pub struct ExecutionRaceCoordinator {
    governors: Vec<Arc<NetworkGovernor>>,
    report_tx: mpsc::UnboundedSender<StrikeReport>,
}

impl ExecutionRaceCoordinator {
    pub fn new(governors: Vec<Arc<NetworkGovernor>>) -> (Self, mpsc::UnboundedReceiver<StrikeReport>) {
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        (Self { governors, report_tx }, report_rx)
    }

    pub fn governors(&self) -> &[Arc<NetworkGovernor>] {
        &self.governors
    }

    /// Spawn one attempt per governor and return the number dispatched without waiting.
    pub fn strike(&self, signal: Arc<Signal>) -> usize {
        if !signal.profitable {
            return 0;
        }

        for governor in &self.governors {
            let governor = Arc::clone(governor);
            let signal = Arc::clone(&signal);
            let report_tx = self.report_tx.clone();

            tokio::spawn(async move {
                let started = Instant::now();
                let outcome = match AssertUnwindSafe(governor.attempt(&signal)).catch_unwind().await {
                    Ok(attempt) => StrikeOutcome::from_attempt(attempt),
                    Err(panic) => StrikeOutcome::Faulted(panic_message(panic.as_ref())),
                };

                let report = StrikeReport {
                    network: governor.name().to_string(),
                    path_hash: signal.path_hash,
                    trigger: signal.trigger,
                    outcome,
                    elapsed: started.elapsed(),
                };
                if let Err(e) = report_tx.send(report) {
                    warn!("Strike report dropped, supervisor gone: {} {}", e.0.network, e.0.outcome.category());
                }
            });
        }

        self.governors.len()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RaceStats {
    pub submitted: u64,
    pub skipped: u64,
    pub failed: u64,
    pub faulted: u64,
}

impl RaceStats {
    pub fn total(&self) -> u64 {
        self.submitted + self.skipped + self.failed + self.faulted
    }

    pub fn count(&self, category: StrikeCategory) -> u64 {
        match category {
            StrikeCategory::Submitted => self.submitted,
            StrikeCategory::Skipped => self.skipped,
            StrikeCategory::Failed => self.failed,
            StrikeCategory::Faulted => self.faulted,
        }
    }

    fn record(&mut self, category: StrikeCategory) {
        match category {
            StrikeCategory::Submitted => self.submitted += 1,
            StrikeCategory::Skipped => self.skipped += 1,
            StrikeCategory::Failed => self.failed += 1,
            StrikeCategory::Faulted => self.faulted += 1,
        }
    }
}

/// Drains strike reports, logging each one once at the level of its category.
pub struct StrikeSupervisor {
    report_rx: mpsc::UnboundedReceiver<StrikeReport>,
    stats: RaceStats,
}

impl StrikeSupervisor {
    pub fn new(report_rx: mpsc::UnboundedReceiver<StrikeReport>) -> Self {
        Self { report_rx, stats: RaceStats::default() }
    }

    pub fn stats(&self) -> RaceStats {
        self.stats
    }

    pub fn observe(&mut self, report: &StrikeReport) {
        let trigger = report.trigger.map(|hash| hash.to_string()).unwrap_or_else(|| "-".to_string());
        match &report.outcome {
            StrikeOutcome::Submitted(submission) => info!(
                "[{}] strike submitted: {} path {} trigger {} in {:?}",
                report.network,
                submission.tx_hash,
                report.path_hash.short(),
                trigger,
                report.elapsed
            ),
            StrikeOutcome::Skipped(e) => warn!(
                "[{}] strike skipped: {} path {} in {:?}",
                report.network,
                e,
                report.path_hash.short(),
                report.elapsed
            ),
            StrikeOutcome::Failed(e) => warn!(
                "[{}] strike failed: {} path {} in {:?}",
                report.network,
                e,
                report.path_hash.short(),
                report.elapsed
            ),
            StrikeOutcome::Faulted(message) => error!(
                "[{}] strike faulted: {} path {} in {:?}",
                report.network,
                message,
                report.path_hash.short(),
                report.elapsed
            ),
        }
        self.stats.record(report.outcome.category());
    }

    /// Runs until every sender, including the coordinator, is dropped.
    pub async fn run(mut self) -> RaceStats {
        while let Some(report) = self.report_rx.recv().await {
            self.observe(&report);
        }
        let summary: Vec<String> =
            StrikeCategory::iter().map(|category| format!("{}={}", category, self.stats.count(category))).collect();
        info!("Strike supervisor stopped: {}", summary.join(" "));
        self.stats
    }
}
