use std::sync::{mpsc, Arc};
use std::thread;

use audit_core::{ReportData, ReportFormat, SubmittedFile, Tier};
use audit_logging::{audit_error, audit_info};

use crate::client::{AnalysisService, ReqwestAnalysisService, ServiceSettings};
use crate::poller::{ChannelEventSink, EventSink, PollSettings, PollerHandle};
use crate::{EngineEvent, ServiceError};

/// Everything the engine thread needs to reach the service and pace jobs.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub service: ServiceSettings,
    pub poll: PollSettings,
}

enum EngineCommand {
    Submit {
        submission: u64,
        file: Arc<SubmittedFile>,
        tier: Tier,
    },
    Download {
        report: Box<ReportData>,
        format: ReportFormat,
    },
    CancelActive,
}

/// Command side of the engine thread; cheap to clone.
///
/// The thread owns its own tokio runtime. Commands go in over one channel
/// and [`EngineEvent`]s come out over another, so the application applies
/// outcomes in exactly the order they were emitted.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    /// Start the engine thread against a live HTTP service.
    pub fn new(
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>), ServiceError> {
        let service = Arc::new(ReqwestAnalysisService::new(config.service)?);
        Ok(Self::with_service(service, config.poll))
    }

    /// Start the engine thread with an injected service implementation.
    pub fn with_service(
        service: Arc<dyn AnalysisService>,
        poll: PollSettings,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || run_engine(service, poll, cmd_rx, event_tx));

        (Self { cmd_tx }, event_rx)
    }

    pub fn submit(&self, submission: u64, file: Arc<SubmittedFile>, tier: Tier) {
        let _ = self.cmd_tx.send(EngineCommand::Submit {
            submission,
            file,
            tier,
        });
    }

    pub fn download(&self, report: Box<ReportData>, format: ReportFormat) {
        let _ = self.cmd_tx.send(EngineCommand::Download { report, format });
    }

    pub fn cancel_active(&self) {
        let _ = self.cmd_tx.send(EngineCommand::CancelActive);
    }
}

fn run_engine(
    service: Arc<dyn AnalysisService>,
    poll: PollSettings,
    cmd_rx: mpsc::Receiver<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            audit_error!("failed to start the engine runtime: {}", err);
            return;
        }
    };
    let mut active: Option<PollerHandle> = None;

    while let Ok(command) = cmd_rx.recv() {
        match command {
            EngineCommand::Submit {
                submission,
                file,
                tier,
            } => {
                // The superseded job's timers are disposed of here, whether
                // or not that job already reached a terminal state.
                if let Some(previous) = active.take() {
                    previous.retire();
                }
                active = runtime.block_on(handle_submit(
                    service.clone(),
                    submission,
                    file,
                    tier,
                    poll.clone(),
                    &event_tx,
                ));
            }
            EngineCommand::Download { report, format } => {
                let service = service.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    let event = match service.fetch_rendered(&report, format).await {
                        Ok(bytes) => EngineEvent::DownloadFinished { format, bytes },
                        Err(err) => EngineEvent::DownloadFailed {
                            message: err.message,
                        },
                    };
                    let _ = event_tx.send(event);
                });
            }
            EngineCommand::CancelActive => {
                if let Some(previous) = active.take() {
                    previous.retire();
                }
            }
        }
    }
}

async fn handle_submit(
    service: Arc<dyn AnalysisService>,
    submission: u64,
    file: Arc<SubmittedFile>,
    tier: Tier,
    poll: PollSettings,
    event_tx: &mpsc::Sender<EngineEvent>,
) -> Option<PollerHandle> {
    match service.submit(&file, tier).await {
        Ok(handle) => {
            audit_info!("job {} accepted at tier {}", handle.job_id, tier);
            let _ = event_tx.send(EngineEvent::JobAccepted {
                submission,
                job_id: handle.job_id.clone(),
                tier,
            });
            let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(event_tx.clone()));
            Some(PollerHandle::spawn(
                service,
                handle.job_id,
                tier,
                poll,
                sink,
            ))
        }
        Err(err) => {
            let _ = event_tx.send(EngineEvent::SubmitRejected {
                submission,
                message: err.message,
            });
            None
        }
    }
}
