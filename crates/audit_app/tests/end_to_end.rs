use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use audit_app::AuditController;
use audit_core::{AuditViewModel, Phase, ReportFormat, SubmittedFile, Tier};
use audit_engine::{EngineConfig, PollSettings, ServiceSettings, TierTiming};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pdf_file() -> SubmittedFile {
    SubmittedFile::new("report.pdf", "application/pdf", b"%PDF-1.7 sample".to_vec())
}

fn report_body(percentage: f64) -> serde_json::Value {
    json!({
        "metadata": {
            "filename": "report.pdf",
            "analysis_date": "2024-05-14T10:00:00",
            "file_size": 15
        },
        "basic_analysis": {
            "page_count": 3,
            "is_tagged": true,
            "contains_text": true
        },
        "pdf_ua_validation": {
            "is_compliant": true,
            "failed_rules_count": 0
        },
        "accessibility_score": {
            "total_score": 92.0,
            "percentage": percentage,
            "level": "good"
        }
    })
}

/// Millisecond-scale polling so the scenarios settle quickly.
fn controller_for(server: &MockServer, downloads: &Path) -> AuditController {
    let config = EngineConfig {
        service: ServiceSettings {
            base_url: server.uri(),
            ..ServiceSettings::default()
        },
        poll: PollSettings {
            interval: Duration::from_millis(20),
            fast: TierTiming {
                progress_step: 20,
                deadline: Duration::from_millis(300),
            },
            standard: TierTiming {
                progress_step: 10,
                deadline: Duration::from_secs(3),
            },
            deep: TierTiming {
                progress_step: 5,
                deadline: Duration::from_secs(3),
            },
        },
    };
    AuditController::new(config, downloads.to_path_buf()).expect("wire controller")
}

fn observe(controller: &AuditController) -> mpsc::Receiver<AuditViewModel> {
    let (tx, rx) = mpsc::channel();
    controller.subscribe(move |view| {
        let _ = tx.send(view.clone());
    });
    rx
}

fn wait_for(
    views: &mpsc::Receiver<AuditViewModel>,
    accept: impl Fn(&AuditViewModel) -> bool,
) -> AuditViewModel {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let view = views
            .recv_timeout(remaining)
            .expect("state settled in time");
        if accept(&view) {
            return view;
        }
    }
}

fn is_terminal(view: &AuditViewModel) -> bool {
    matches!(view.phase, Phase::ReportReady | Phase::TerminalError)
}

#[tokio::test(flavor = "multi_thread")]
async fn pending_twice_then_success_reaches_report_ready() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/"))
        .and(query_param("analysis_level", "standard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "job_id": "job-7" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/analysis/job-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "PENDING" })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/analysis/job-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "SUCCESS",
            "result": report_body(92.0)
        })))
        .mount(&server)
        .await;

    let downloads = TempDir::new().expect("temp dir");
    let controller = controller_for(&server, downloads.path());
    let views = observe(&controller);

    controller.submit_and_track(pdf_file(), Tier::Standard);

    let view = wait_for(&views, is_terminal);
    assert_eq!(view.phase, Phase::ReportReady);
    assert_eq!(view.progress_percent, 100);
    assert_eq!(view.tier, Some(Tier::Standard));
    let report = view.report.expect("report summary");
    assert_eq!(report.score_percentage, 92.0);
    assert!(report.is_compliant);
}

#[tokio::test(flavor = "multi_thread")]
async fn transport_failure_at_submit_never_starts_polling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let downloads = TempDir::new().expect("temp dir");
    let controller = controller_for(&server, downloads.path());
    let views = observe(&controller);

    controller.submit_and_track(pdf_file(), Tier::Standard);

    let view = wait_for(&views, is_terminal);
    assert_eq!(view.phase, Phase::TerminalError);
    assert!(view.tier.is_none(), "no job should exist");
    assert!(view.last_error.is_some_and(|message| !message.is_empty()));
    assert_eq!(view.progress_percent, 0);

    // Give a would-be poller time to tick, then check none ever polled.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let polls = server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .filter(|request| request.method.to_string() == "GET")
        .count();
    assert_eq!(polls, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_download_leaves_the_report_intact() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "job_id": "job-3" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/analysis/job-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "SUCCESS",
            "result": report_body(88.0)
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/download-report/pdf"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({ "detail": { "message": "renderer crashed" } })),
        )
        .mount(&server)
        .await;

    let downloads = TempDir::new().expect("temp dir");
    let controller = controller_for(&server, downloads.path());
    let views = observe(&controller);

    controller.submit_and_track(pdf_file(), Tier::Standard);
    let view = wait_for(&views, is_terminal);
    assert_eq!(view.phase, Phase::ReportReady);

    controller.download(ReportFormat::Pdf);
    let view = wait_for(&views, |view| view.download_error.is_some());

    assert_eq!(view.phase, Phase::ReportReady);
    assert!(view.report.is_some(), "report must survive the failure");
    assert_eq!(view.progress_percent, 100);
    assert_eq!(view.download_error.as_deref(), Some("renderer crashed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn successful_download_is_saved_with_a_dated_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "job_id": "job-5" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/analysis/job-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "SUCCESS",
            "result": report_body(92.0)
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/download-report/pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4 rendered".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let downloads = TempDir::new().expect("temp dir");
    let controller = controller_for(&server, downloads.path());
    let views = observe(&controller);

    controller.submit_and_track(pdf_file(), Tier::Fast);
    wait_for(&views, is_terminal);

    controller.download(ReportFormat::Pdf);
    let view = wait_for(&views, |view| {
        view.downloaded_to.is_some() || view.download_error.is_some()
    });

    let saved = view.downloaded_to.expect("saved path");
    let name = saved.file_name().and_then(|name| name.to_str()).unwrap();
    assert!(name.starts_with("accessibility_report_"), "name: {name}");
    assert!(name.ends_with(".pdf"), "name: {name}");
    let bytes = std::fs::read(&saved).expect("saved file readable");
    assert_eq!(bytes, b"%PDF-1.4 rendered");
}

#[tokio::test(flavor = "multi_thread")]
async fn changing_tier_supersedes_the_running_job() {
    let server = MockServer::start().await;
    // First submission: a standard job that never finishes.
    Mock::given(method("POST"))
        .and(path("/upload/"))
        .and(query_param("analysis_level", "standard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "job_id": "job-slow" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/analysis/job-slow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "PENDING" })))
        .mount(&server)
        .await;
    // Second submission: the same file escalated to fast, succeeding at once.
    Mock::given(method("POST"))
        .and(path("/upload/"))
        .and(query_param("analysis_level", "fast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "job_id": "job-fast" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/analysis/job-fast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "SUCCESS",
            "result": report_body(75.0)
        })))
        .mount(&server)
        .await;

    let downloads = TempDir::new().expect("temp dir");
    let controller = controller_for(&server, downloads.path());
    let views = observe(&controller);

    controller.submit_and_track(pdf_file(), Tier::Standard);
    wait_for(&views, |view| view.phase == Phase::Polling);

    controller.change_tier_and_resubmit(Tier::Fast);
    let view = wait_for(&views, is_terminal);

    assert_eq!(view.phase, Phase::ReportReady);
    assert_eq!(view.tier, Some(Tier::Fast));
    assert_eq!(
        view.report.expect("report summary").score_percentage,
        75.0
    );
}
