use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use audit_core::{
    AccessibilityScore, BasicAnalysis, PdfUaValidation, ReportData, ReportFormat, ReportMetadata,
    SubmittedFile, Tier,
};
use audit_engine::{
    AnalysisService, EngineEvent, EventSink, JobHandle, PollSettings, PollerHandle, ServiceError,
    ServiceErrorKind, StatusSnapshot, TierTiming,
};

/// Serves a fixed script of snapshots, then stays pending forever.
struct ScriptedService {
    snapshots: Mutex<VecDeque<Result<StatusSnapshot, ServiceError>>>,
    polls: AtomicUsize,
}

impl ScriptedService {
    fn new(snapshots: Vec<Result<StatusSnapshot, ServiceError>>) -> Arc<Self> {
        Arc::new(Self {
            snapshots: Mutex::new(snapshots.into()),
            polls: AtomicUsize::new(0),
        })
    }

    fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisService for ScriptedService {
    async fn submit(&self, _file: &SubmittedFile, _tier: Tier) -> Result<JobHandle, ServiceError> {
        Err(ServiceError {
            kind: ServiceErrorKind::Transport,
            message: "not under test".to_string(),
        })
    }

    async fn poll_status(&self, _job_id: &str) -> Result<StatusSnapshot, ServiceError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.snapshots
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(StatusSnapshot::Pending))
    }

    async fn fetch_rendered(
        &self,
        _report: &ReportData,
        _format: ReportFormat,
    ) -> Result<Vec<u8>, ServiceError> {
        Err(ServiceError {
            kind: ServiceErrorKind::Transport,
            message: "not under test".to_string(),
        })
    }
}

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl TestSink {
    fn snapshot(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn quick_settings() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(10),
        fast: TierTiming {
            progress_step: 20,
            deadline: Duration::from_millis(120),
        },
        standard: TierTiming {
            progress_step: 10,
            deadline: Duration::from_secs(5),
        },
        deep: TierTiming {
            progress_step: 5,
            deadline: Duration::from_secs(5),
        },
    }
}

fn sample_report() -> ReportData {
    ReportData {
        metadata: ReportMetadata {
            filename: "report.pdf".to_string(),
            analysis_date: "2024-05-14T10:00:00".to_string(),
            file_size: 15,
        },
        basic_analysis: BasicAnalysis {
            page_count: 3,
            is_tagged: true,
            contains_text: true,
            image_info: None,
            extracted_text_preview: None,
        },
        pdf_ua_validation: PdfUaValidation {
            is_compliant: true,
            failed_rules_count: 0,
            failed_rules: Vec::new(),
        },
        accessibility_score: AccessibilityScore {
            total_score: 92.0,
            percentage: 92.0,
            level: "good".to_string(),
            details: Vec::new(),
        },
        recommendations: Vec::new(),
    }
}

fn is_terminal(event: &EngineEvent) -> bool {
    matches!(
        event,
        EngineEvent::AnalysisSucceeded { .. } | EngineEvent::AnalysisFailed { .. }
    )
}

/// Wait until the sink holds a terminal event, or give up after `budget`.
async fn wait_for_terminal(sink: &TestSink, budget: Duration) -> Vec<EngineEvent> {
    let deadline = Instant::now() + budget;
    loop {
        let events = sink.snapshot();
        if events.iter().any(is_terminal) {
            return events;
        }
        assert!(
            Instant::now() < deadline,
            "no terminal event within {budget:?}: {events:?}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn emits_progress_then_success() {
    let service = ScriptedService::new(vec![
        Ok(StatusSnapshot::Pending),
        Ok(StatusSnapshot::Running),
        Ok(StatusSnapshot::Succeeded(Box::new(sample_report()))),
    ]);
    let sink = Arc::new(TestSink::default());

    let _handle = PollerHandle::spawn(
        service.clone(),
        "job-1".to_string(),
        Tier::Standard,
        quick_settings(),
        sink.clone(),
    );

    let events = wait_for_terminal(&sink, Duration::from_secs(2)).await;
    assert_eq!(
        events,
        vec![
            EngineEvent::ProgressAdvanced {
                job_id: "job-1".to_string(),
                step: 10,
            },
            EngineEvent::ProgressAdvanced {
                job_id: "job-1".to_string(),
                step: 10,
            },
            EngineEvent::AnalysisSucceeded {
                job_id: "job-1".to_string(),
                report: Box::new(sample_report()),
            },
        ]
    );

    // The loop is done: nothing further may be emitted.
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(sink.snapshot().len(), events.len());
    assert_eq!(service.polls(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn failure_snapshot_terminates_immediately() {
    let service = ScriptedService::new(vec![Ok(StatusSnapshot::Failed(
        "could not parse the document".to_string(),
    ))]);
    let sink = Arc::new(TestSink::default());

    let _handle = PollerHandle::spawn(
        service.clone(),
        "job-2".to_string(),
        Tier::Standard,
        quick_settings(),
        sink.clone(),
    );

    let events = wait_for_terminal(&sink, Duration::from_secs(2)).await;
    assert_eq!(
        events,
        vec![EngineEvent::AnalysisFailed {
            job_id: "job-2".to_string(),
            message: "could not parse the document".to_string(),
        }]
    );
    assert_eq!(service.polls(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn transport_error_terminates_with_its_message() {
    let service = ScriptedService::new(vec![Err(ServiceError {
        kind: ServiceErrorKind::Transport,
        message: "connection refused".to_string(),
    })]);
    let sink = Arc::new(TestSink::default());

    let _handle = PollerHandle::spawn(
        service.clone(),
        "job-3".to_string(),
        Tier::Deep,
        quick_settings(),
        sink.clone(),
    );

    let events = wait_for_terminal(&sink, Duration::from_secs(2)).await;
    assert_eq!(
        events,
        vec![EngineEvent::AnalysisFailed {
            job_id: "job-3".to_string(),
            message: "connection refused".to_string(),
        }]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn deadline_synthesizes_a_timeout_failure() {
    // The script is empty, so every poll comes back pending forever.
    let service = ScriptedService::new(Vec::new());
    let sink = Arc::new(TestSink::default());
    let started = Instant::now();

    let _handle = PollerHandle::spawn(
        service.clone(),
        "job-4".to_string(),
        Tier::Fast,
        quick_settings(),
        sink.clone(),
    );

    let events = wait_for_terminal(&sink, Duration::from_secs(2)).await;
    let elapsed = started.elapsed();

    let terminal = events.last().expect("terminal event");
    match terminal {
        EngineEvent::AnalysisFailed { job_id, message } => {
            assert_eq!(job_id, "job-4");
            assert!(
                message.contains("time budget") && message.contains("fast"),
                "unexpected message: {message}"
            );
        }
        other => panic!("unexpected terminal event: {other:?}"),
    }
    // Fired close to the 120ms deadline, not at the tick cadence forever.
    assert!(elapsed >= Duration::from_millis(100), "fired too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(1), "fired too late: {elapsed:?}");

    // No emission after the deadline won the race.
    let settled = sink.snapshot().len();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(sink.snapshot().len(), settled);
}

#[tokio::test(flavor = "multi_thread")]
async fn retire_stops_both_timers() {
    let service = ScriptedService::new(Vec::new());
    let sink = Arc::new(TestSink::default());
    let settings = PollSettings {
        fast: TierTiming {
            progress_step: 20,
            deadline: Duration::from_millis(200),
        },
        ..quick_settings()
    };

    let handle = PollerHandle::spawn(
        service.clone(),
        "job-5".to_string(),
        Tier::Fast,
        settings,
        sink.clone(),
    );
    assert_eq!(handle.job_id(), "job-5");

    tokio::time::sleep(Duration::from_millis(45)).await;
    handle.retire();
    let polls_at_retire = service.polls();
    assert!(polls_at_retire >= 1, "poller never ran before retirement");

    // Sleep past the old deadline: neither tick nor timeout may surface.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(service.polls() <= polls_at_retire + 1);
    assert!(
        sink.snapshot().iter().all(|event| !is_terminal(event)),
        "retired poller still emitted a terminal event"
    );
}
