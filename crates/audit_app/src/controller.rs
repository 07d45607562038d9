use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use audit_core::{AuditViewModel, Msg, ReportFormat, SubmittedFile, Tier};
use audit_engine::{EngineConfig, EngineEvent, EngineHandle, ServiceError};

use crate::effects::{spawn_event_pump, EffectRunner};
use crate::store::Store;

/// Public entry points for a UI layer. One instance per audit session,
/// explicitly constructed and passed around; there is no ambient singleton.
pub struct AuditController {
    store: Arc<Store>,
}

impl AuditController {
    /// Wire the store, effect runner, and engine against a live service.
    /// Downloaded reports are saved under `download_dir`.
    pub fn new(config: EngineConfig, download_dir: PathBuf) -> Result<Self, ServiceError> {
        let (engine, events) = EngineHandle::new(config)?;
        Ok(Self::with_engine(engine, events, download_dir))
    }

    /// Same wiring with an externally constructed engine.
    pub fn with_engine(
        engine: EngineHandle,
        events: mpsc::Receiver<EngineEvent>,
        download_dir: PathBuf,
    ) -> Self {
        let store = Arc::new(Store::new(EffectRunner::new(engine)));
        spawn_event_pump(events, Arc::clone(&store), download_dir);
        Self { store }
    }

    /// Attach a file; clears any previous job, error, or report.
    pub fn select_file(&self, file: SubmittedFile) {
        self.store.dispatch(Msg::FileSelected {
            file: Arc::new(file),
        });
    }

    pub fn begin_drag(&self) {
        self.store.dispatch(Msg::DragEntered);
    }

    pub fn end_drag(&self) {
        self.store.dispatch(Msg::DragLeft);
    }

    /// Submit `file` at `tier` and track the job to completion. Any job
    /// already in flight is superseded, timers included.
    pub fn submit_and_track(&self, file: SubmittedFile, tier: Tier) {
        self.store.dispatch(Msg::SoftReset);
        self.select_file(file);
        self.store.dispatch(Msg::SubmitRequested { tier });
    }

    /// Re-run the already selected file at a different depth.
    pub fn change_tier_and_resubmit(&self, tier: Tier) {
        self.store.dispatch(Msg::SoftReset);
        self.store.dispatch(Msg::SubmitRequested { tier });
    }

    /// Fetch and save the rendered report. A failed download never discards
    /// the report already held in state.
    pub fn download(&self, format: ReportFormat) {
        self.store.dispatch(Msg::DownloadRequested { format });
    }

    pub fn soft_reset(&self) {
        self.store.dispatch(Msg::SoftReset);
    }

    pub fn hard_reset(&self) {
        self.store.dispatch(Msg::HardReset);
    }

    pub fn subscribe(&self, subscriber: impl Fn(&AuditViewModel) + Send + 'static) {
        self.store.subscribe(Box::new(subscriber));
    }

    pub fn view(&self) -> AuditViewModel {
        self.store.view()
    }
}
