use std::sync::Arc;

use crate::{validate_submission, AppState, Effect, Job, Msg, Phase};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages tagged with a job id are discarded unless they match the
/// currently active job, so a stale poller from a superseded submission can
/// never leak into newer state.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FileSelected { file } => {
            if state.in_flight() {
                return (state, Vec::new());
            }
            state.attach_file(file);
            Vec::new()
        }
        Msg::DragEntered => {
            match state.phase() {
                Phase::Idle | Phase::ReportReady | Phase::TerminalError => state.begin_drag(),
                _ => return (state, Vec::new()),
            }
            Vec::new()
        }
        Msg::DragLeft => {
            if state.phase() != Phase::AwaitingDrop {
                return (state, Vec::new());
            }
            state.end_drag();
            Vec::new()
        }
        Msg::SubmitRequested { tier } => {
            if state.phase() != Phase::Idle {
                return (state, Vec::new());
            }
            let file = match state.pending_file() {
                Some(file) => Arc::clone(file),
                None => {
                    state.fail_submission("no file selected for analysis".to_string());
                    return (state, Vec::new());
                }
            };
            if let Err(rejection) = validate_submission(&file) {
                state.fail_submission(rejection.to_string());
                return (state, Vec::new());
            }
            state.begin_submission();
            vec![Effect::Submit {
                submission: state.submission_seq(),
                file,
                tier,
            }]
        }
        Msg::JobAccepted {
            submission,
            job_id,
            tier,
        } => {
            if !state.is_awaiting_submission(submission) {
                return (state, Vec::new());
            }
            let file = match state.pending_file() {
                Some(file) => Arc::clone(file),
                None => return (state, Vec::new()),
            };
            state.accept_job(Job {
                id: job_id,
                tier,
                file,
            });
            Vec::new()
        }
        Msg::SubmitFailed {
            submission,
            message,
        } => {
            if !state.is_awaiting_submission(submission) {
                return (state, Vec::new());
            }
            state.fail_submission(message);
            Vec::new()
        }
        Msg::ProgressAdvanced { job_id, step } => {
            if !state.is_polling_job(&job_id) {
                return (state, Vec::new());
            }
            state.advance_progress(step);
            Vec::new()
        }
        Msg::AnalysisSucceeded { job_id, report } => {
            if !state.is_polling_job(&job_id) {
                return (state, Vec::new());
            }
            state.complete_analysis(*report);
            Vec::new()
        }
        Msg::AnalysisFailed { job_id, message } => {
            if !state.is_polling_job(&job_id) {
                return (state, Vec::new());
            }
            state.fail_analysis(message);
            Vec::new()
        }
        Msg::DownloadRequested { format } => {
            if state.phase() != Phase::ReportReady {
                return (state, Vec::new());
            }
            let report = match state.result() {
                Some(report) => Box::new(report.clone()),
                None => return (state, Vec::new()),
            };
            state.begin_download();
            vec![Effect::Download { report, format }]
        }
        Msg::DownloadFinished { path } => {
            state.finish_download(path);
            Vec::new()
        }
        Msg::DownloadFailed { message } => {
            state.set_download_error(message);
            Vec::new()
        }
        Msg::SoftReset => {
            state.soft_reset();
            vec![Effect::CancelPolling]
        }
        Msg::HardReset => {
            state.hard_reset();
            vec![Effect::CancelPolling]
        }
    };

    (state, effects)
}
