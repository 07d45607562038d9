use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use audit_app::logging::{self, LogDestination};
use audit_app::AuditController;
use audit_core::{format_file_size, AuditViewModel, Phase, ReportFormat, SubmittedFile, Tier};
use audit_engine::{EngineConfig, ServiceSettings};
use audit_logging::audit_info;

const USAGE: &str =
    "usage: audit_app <file.pdf> [--tier fast|standard|deep] [--format json|html|pdf] [--url BASE_URL]";

struct CliOptions {
    file: PathBuf,
    tier: Tier,
    format: Option<ReportFormat>,
    base_url: Option<String>,
}

impl CliOptions {
    fn parse(args: &[String]) -> Result<Self> {
        let mut file = None;
        let mut tier = Tier::Standard;
        let mut format = None;
        let mut base_url = None;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--tier" => {
                    let value = next_value(&mut iter, "--tier")?;
                    tier = value.parse().map_err(|err: String| anyhow!(err))?;
                }
                "--format" => {
                    let value = next_value(&mut iter, "--format")?;
                    format = Some(value.parse().map_err(|err: String| anyhow!(err))?);
                }
                "--url" => {
                    base_url = Some(next_value(&mut iter, "--url")?.to_string());
                }
                other if other.starts_with("--") => bail!("unknown option: {other}\n{USAGE}"),
                other => {
                    if file.is_some() {
                        bail!("unexpected argument: {other}\n{USAGE}");
                    }
                    file = Some(PathBuf::from(other));
                }
            }
        }

        let file = file.with_context(|| USAGE.to_string())?;
        Ok(Self {
            file,
            tier,
            format,
            base_url,
        })
    }
}

fn next_value<'a>(iter: &mut std::slice::Iter<'a, String>, option: &str) -> Result<&'a String> {
    iter.next()
        .with_context(|| format!("{option} requires a value\n{USAGE}"))
}

fn main() -> Result<()> {
    logging::initialize(LogDestination::Terminal);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = CliOptions::parse(&args)?;

    let bytes = std::fs::read(&options.file)
        .with_context(|| format!("reading {}", options.file.display()))?;
    let name = options
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document.pdf")
        .to_string();
    let submitted = SubmittedFile::new(name, "application/pdf", bytes);

    let mut config = EngineConfig::default();
    let base_url = options
        .base_url
        .clone()
        .or_else(|| std::env::var("AUDIT_API_URL").ok());
    if let Some(base_url) = base_url {
        config.service = ServiceSettings {
            base_url,
            ..ServiceSettings::default()
        };
    }
    // Leave room for the upload itself on top of the polling deadline.
    let settle_budget = config.poll.timing_for(options.tier).deadline + Duration::from_secs(30);

    let download_dir = std::env::current_dir()
        .context("resolving the current directory")?
        .join("reports");
    let controller = AuditController::new(config, download_dir)?;

    let (view_tx, view_rx) = mpsc::channel();
    controller.subscribe(move |view| {
        let _ = view_tx.send(view.clone());
    });

    audit_info!(
        "submitting {} ({}) at tier {}",
        submitted.name,
        format_file_size(submitted.size()),
        options.tier
    );
    controller.submit_and_track(submitted, options.tier);

    let final_view = wait_for_terminal(&view_rx, settle_budget)?;
    match final_view.phase {
        Phase::ReportReady => {
            let report = final_view
                .report
                .as_ref()
                .context("report missing from a finished audit")?;
            println!("analysis of {} finished", report.filename);
            println!("  accessibility score: {:.0}%", report.score_percentage);
            println!(
                "  PDF/UA compliant: {} ({} failed rules)",
                if report.is_compliant { "yes" } else { "no" },
                report.failed_rules_count
            );
        }
        Phase::TerminalError => {
            bail!(
                "analysis failed: {}",
                final_view.last_error.as_deref().unwrap_or("unknown error")
            );
        }
        _ => bail!("audit ended in an unexpected phase"),
    }

    if let Some(format) = options.format {
        controller.download(format);
        let view = wait_for(&view_rx, Duration::from_secs(60), |view| {
            view.downloaded_to.is_some() || view.download_error.is_some()
        })?;
        match view.downloaded_to {
            Some(path) => println!("report saved to {}", path.display()),
            None => bail!(
                "report download failed: {}",
                view.download_error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    Ok(())
}

fn wait_for_terminal(
    views: &mpsc::Receiver<AuditViewModel>,
    budget: Duration,
) -> Result<AuditViewModel> {
    let mut last_progress = 0;
    wait_for(views, budget, move |view| {
        if view.phase == Phase::Polling && view.progress_percent != last_progress {
            last_progress = view.progress_percent;
            audit_info!("analysis in progress: {}%", view.progress_percent);
        }
        matches!(view.phase, Phase::ReportReady | Phase::TerminalError)
    })
}

fn wait_for(
    views: &mpsc::Receiver<AuditViewModel>,
    budget: Duration,
    mut accept: impl FnMut(&AuditViewModel) -> bool,
) -> Result<AuditViewModel> {
    let deadline = Instant::now() + budget;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            bail!("timed out waiting for the audit to settle");
        }
        match views.recv_timeout(remaining) {
            Ok(view) => {
                if accept(&view) {
                    return Ok(view);
                }
            }
            Err(_) => bail!("timed out waiting for the audit to settle"),
        }
    }
}
