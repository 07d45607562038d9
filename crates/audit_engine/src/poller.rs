use std::sync::Arc;
use std::time::Duration;

use audit_core::{JobId, Tier};
use audit_logging::audit_warn;
use tokio::task::JoinHandle;

use crate::{AnalysisService, EngineEvent, StatusSnapshot};

/// Progress step and absolute deadline for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierTiming {
    pub progress_step: u8,
    pub deadline: Duration,
}

/// Poll cadence and the tier-to-timing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub fast: TierTiming,
    pub standard: TierTiming,
    pub deep: TierTiming,
}

impl PollSettings {
    pub fn timing_for(&self, tier: Tier) -> TierTiming {
        match tier {
            Tier::Fast => self.fast,
            Tier::Standard => self.standard,
            Tier::Deep => self.deep,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            fast: TierTiming {
                progress_step: 20,
                deadline: Duration::from_secs(10),
            },
            standard: TierTiming {
                progress_step: 10,
                deadline: Duration::from_secs(60),
            },
            deep: TierTiming {
                progress_step: 5,
                deadline: Duration::from_secs(180),
            },
        }
    }
}

/// Where the poller reports job events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Sink backed by the engine's outbound channel.
pub struct ChannelEventSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// A live polling loop for exactly one job.
///
/// The task ends on its own after its first terminal event; [`Self::retire`]
/// disposes of it unconditionally when a newer submission supersedes it.
pub struct PollerHandle {
    job_id: JobId,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Spawn the polling loop on the current tokio runtime.
    pub fn spawn(
        service: Arc<dyn AnalysisService>,
        job_id: JobId,
        tier: Tier,
        settings: PollSettings,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let task = tokio::spawn(poll_until_terminal(
            service,
            job_id.clone(),
            tier,
            settings,
            sink,
        ));
        Self { job_id, task }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Stop both timers. Safe to call on an already-finished job.
    pub fn retire(self) {
        self.task.abort();
    }
}

async fn poll_until_terminal(
    service: Arc<dyn AnalysisService>,
    job_id: JobId,
    tier: Tier,
    settings: PollSettings,
    sink: Arc<dyn EventSink>,
) {
    let timing = settings.timing_for(tier);
    let start = tokio::time::Instant::now();
    let deadline = tokio::time::sleep_until(start + timing.deadline);
    tokio::pin!(deadline);
    let mut ticks = tokio::time::interval_at(start + settings.interval, settings.interval);

    // At most one terminal event per job: every terminal arm breaks out of
    // the loop before the losing timer can fire.
    loop {
        tokio::select! {
            _ = &mut deadline => {
                audit_warn!("job {} exceeded the {} deadline", job_id, tier);
                sink.emit(EngineEvent::AnalysisFailed {
                    job_id: job_id.clone(),
                    message: format!("analysis exceeded the time budget for the {tier} tier"),
                });
                break;
            }
            _ = ticks.tick() => match service.poll_status(&job_id).await {
                Ok(StatusSnapshot::Succeeded(report)) => {
                    sink.emit(EngineEvent::AnalysisSucceeded {
                        job_id: job_id.clone(),
                        report,
                    });
                    break;
                }
                Ok(StatusSnapshot::Failed(message)) => {
                    sink.emit(EngineEvent::AnalysisFailed {
                        job_id: job_id.clone(),
                        message,
                    });
                    break;
                }
                Ok(StatusSnapshot::Pending) | Ok(StatusSnapshot::Running) => {
                    sink.emit(EngineEvent::ProgressAdvanced {
                        job_id: job_id.clone(),
                        step: timing.progress_step,
                    });
                }
                Err(err) => {
                    sink.emit(EngineEvent::AnalysisFailed {
                        job_id: job_id.clone(),
                        message: err.message,
                    });
                    break;
                }
            },
        }
    }
}
