use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;

use audit_core::{Effect, Msg, ReportFormat};
use audit_engine::{AtomicFileWriter, EngineEvent, EngineHandle};
use audit_logging::{audit_info, audit_warn};
use chrono::Local;

use crate::store::Store;

/// Executes reducer effects by delegating to the engine thread.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub(crate) fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Submit {
                    submission,
                    file,
                    tier,
                } => {
                    audit_info!(
                        "submitting {} ({} bytes) at tier {}",
                        file.name,
                        file.bytes.len(),
                        tier
                    );
                    self.engine.submit(submission, file, tier);
                }
                Effect::Download { report, format } => {
                    self.engine.download(report, format);
                }
                Effect::CancelPolling => self.engine.cancel_active(),
            }
        }
    }
}

/// Drain engine events into the store, in emission order. Downloaded report
/// bytes are saved to disk here before the outcome reaches the reducer.
pub(crate) fn spawn_event_pump(
    events: mpsc::Receiver<EngineEvent>,
    store: Arc<Store>,
    download_dir: PathBuf,
) {
    thread::spawn(move || {
        let writer = AtomicFileWriter::new(download_dir);
        while let Ok(event) = events.recv() {
            let msg = match event {
                EngineEvent::JobAccepted {
                    submission,
                    job_id,
                    tier,
                } => Msg::JobAccepted {
                    submission,
                    job_id,
                    tier,
                },
                EngineEvent::SubmitRejected {
                    submission,
                    message,
                } => Msg::SubmitFailed {
                    submission,
                    message,
                },
                EngineEvent::ProgressAdvanced { job_id, step } => {
                    Msg::ProgressAdvanced { job_id, step }
                }
                EngineEvent::AnalysisSucceeded { job_id, report } => {
                    Msg::AnalysisSucceeded { job_id, report }
                }
                EngineEvent::AnalysisFailed { job_id, message } => {
                    audit_warn!("job {} failed: {}", job_id, message);
                    Msg::AnalysisFailed { job_id, message }
                }
                EngineEvent::DownloadFinished { format, bytes } => {
                    match writer.write(&report_filename(format), &bytes) {
                        Ok(path) => {
                            audit_info!("report saved to {}", path.display());
                            Msg::DownloadFinished { path }
                        }
                        Err(err) => Msg::DownloadFailed {
                            message: err.to_string(),
                        },
                    }
                }
                EngineEvent::DownloadFailed { message } => Msg::DownloadFailed { message },
            };
            store.dispatch(msg);
        }
    });
}

/// Date-stamped name for a saved report.
fn report_filename(format: ReportFormat) -> String {
    format!(
        "accessibility_report_{}.{}",
        Local::now().format("%Y-%m-%d"),
        format.extension()
    )
}
