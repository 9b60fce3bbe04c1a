use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, warn};

use netra_core::{
    Analysis, AnalysisOutcome, CoachConfig, CommandPipeline, HttpPipeline, NetraError, Pipeline,
    Provider, ReportViews, SessionAnalyzer, Settings, format_outcome, get_cache_dir,
    get_report_path, get_root_cache_dir, is_failure, load_report, save_report,
    session::supported_video_extension, video_fingerprint,
};

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Copy, ValueEnum)]
enum CliProvider {
    Gemini,
    Openai,
    Grok,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Gemini => Provider::Gemini,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Grok => Provider::Grok,
        }
    }
}

#[derive(Parser)]
#[command(name = "netra", version)]
#[command(about = "Analyze teaching-session videos and render AI coaching reports")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the analysis pipeline on a video and show the report
    Analyze(AnalyzeArgs),
    /// Render a saved raw report
    Render {
        /// Raw report JSON file
        report: PathBuf,

        /// Print the views as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Video file (mp4, mov, avi or mkv)
    video: PathBuf,

    /// Session topic passed to the pipeline
    #[arg(short, long, default_value = "General")]
    topic: String,

    /// Pipeline executable (and arguments)
    #[arg(long, env = "NETRA_PIPELINE_CMD", conflicts_with = "pipeline_url")]
    pipeline_cmd: Option<String>,

    /// Base URL of a remote pipeline exposing POST /process
    #[arg(long, env = "NETRA_PIPELINE_URL")]
    pipeline_url: Option<String>,

    /// AI provider whose credential is handed to the pipeline
    #[arg(short, long)]
    provider: Option<CliProvider>,

    /// Fail early when the coach credential is not set
    #[arg(long)]
    require_coach: bool,

    /// Force re-processing even if a cached report exists
    #[arg(short, long)]
    force: bool,

    /// Print the views as JSON instead of markdown
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct JsonOutput {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
    message: String,
    cached: bool,
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    views: Option<ReportViews>,
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn setup_logging(verbose: u8) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => tracing_subscriber::EnvFilter::new("warn"),
        1 => tracing_subscriber::EnvFilter::new("netra=info,netra_core=info"),
        _ => tracing_subscriber::EnvFilter::new("netra=debug,netra_core=debug"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_pipeline(
    pipeline_cmd: Option<&str>,
    pipeline_url: Option<&str>,
    settings: &Settings,
) -> Result<Arc<dyn Pipeline>> {
    match (pipeline_cmd, pipeline_url) {
        (Some(cmd), _) => Ok(Arc::new(
            CommandPipeline::from_command_line(cmd, settings).context("Invalid pipeline command")?,
        )),
        (None, Some(url)) => Ok(Arc::new(HttpPipeline::new(url))),
        (None, None) => anyhow::bail!("No pipeline configured: pass --pipeline-cmd or --pipeline-url"),
    }
}

fn print_outcome(outcome: &AnalysisOutcome, cached: bool, json: bool) -> Result<()> {
    if json {
        let analysis = outcome.analysis();
        let output = JsonOutput {
            status: outcome.status(),
            message: outcome.message(),
            topic: analysis.map(|a| a.topic.clone()),
            cached,
            warnings: analysis.map(Analysis::warnings).unwrap_or_default(),
            views: analysis.map(Analysis::views),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match outcome {
        AnalysisOutcome::Success(analysis) => {
            for warning in analysis.warnings() {
                println!("{} {}", style("Warning:").yellow().bold(), warning);
            }
        }
        _ => {
            eprintln!("{} {}", style("Error:").red().bold(), outcome.message());
            return Ok(());
        }
    }

    println!("{}", style("─".repeat(60)).dim());
    println!("{}", format_outcome(outcome));
    Ok(())
}

/// Best-effort cache write; returns whether the report was stored.
async fn cache_outcome(outcome: &AnalysisOutcome, report_path: &Path) -> bool {
    let AnalysisOutcome::Success(analysis) = outcome else {
        return false;
    };
    if !analysis.is_cacheable() {
        debug!(coach = ?analysis.coach, "report lacks coach feedback, not caching");
        return false;
    }
    match save_report(&analysis.raw, report_path).await {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %report_path.display(), error = %e, "failed to cache report");
            false
        }
    }
}

async fn analyze(args: AnalyzeArgs) -> Result<bool> {
    let AnalyzeArgs {
        video,
        topic,
        pipeline_cmd,
        pipeline_url,
        provider,
        require_coach,
        force,
        json,
    } = args;
    let (video, topic) = (video.as_path(), topic.as_str());

    let mut settings = Settings::from_env().context("Failed to read settings")?;
    if let Some(provider) = provider {
        settings.coach = CoachConfig::from_env(provider.into());
    }

    // Validate API key early
    if require_coach {
        if let Err(e) = settings.coach.require_api_key() {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    }

    let pipeline = build_pipeline(pipeline_cmd.as_deref(), pipeline_url.as_deref(), &settings)?;
    let analyzer = SessionAnalyzer::new(pipeline, &settings);

    if !json {
        println!(
            "\n{}  {}\n",
            style("netra").cyan().bold(),
            style("Teaching Session Coach").dim()
        );
    }

    let file_name = video.file_name().unwrap_or_default().to_string_lossy();
    if supported_video_extension(&file_name).is_none() {
        return Err(NetraError::UnsupportedVideo {
            file_name: file_name.into_owned(),
        }
        .into());
    }

    let fingerprint = video_fingerprint(video)
        .await
        .with_context(|| format!("Cannot read video {}", video.display()))?;
    let cache_dir = get_cache_dir(&get_root_cache_dir(), fingerprint);
    let report_path = get_report_path(&cache_dir, &settings.coach.provider, topic);

    let (outcome, cached) = if !force && report_path.exists() {
        let raw = load_report(&report_path).await?;
        let analysis = Analysis::from_raw(uuid::Uuid::new_v4(), topic, raw, analyzer.coach());
        if !json {
            println!(
                "{} Analyzed ({}) {}",
                style("✓").green().bold(),
                topic,
                style("(cached)").dim()
            );
        }
        (AnalysisOutcome::Success(analysis), true)
    } else {
        let step_start = Instant::now();
        let spinner = create_spinner("Analyzing audio, video, and text... This may take a while.");
        let outcome = analyzer.analyze_video(video, topic).await;

        cache_outcome(&outcome, &report_path).await;
        let mark = match &outcome {
            AnalysisOutcome::Success(_) => style("✓").green().bold(),
            _ => style("✗").red().bold(),
        };
        spinner.finish_with_message(format!(
            "{} {} via {} pipeline {}",
            mark,
            outcome.message(),
            analyzer.pipeline_name(),
            style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
        ));
        (outcome, false)
    };

    if cached && !json {
        println!(
            "\n{} {}\n",
            style("Cached:").dim(),
            style(report_path.display()).cyan()
        );
    }

    print_outcome(&outcome, cached, json)?;
    Ok(outcome.analysis().is_some())
}

async fn render(report: &Path, json: bool) -> Result<bool> {
    let settings = Settings::from_env().context("Failed to read settings")?;
    let raw = load_report(report)
        .await
        .with_context(|| format!("Cannot load report {}", report.display()))?;

    let outcome = if is_failure(Some(&raw)) {
        AnalysisOutcome::EmptyResult
    } else {
        AnalysisOutcome::Success(Analysis::from_raw(
            uuid::Uuid::new_v4(),
            "General",
            raw,
            &settings.coach,
        ))
    };

    print_outcome(&outcome, false, json)?;
    Ok(outcome.analysis().is_some())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let succeeded = match cli.command {
        Command::Analyze(args) => analyze(args).await?,
        Command::Render { report, json } => render(&report, json).await?,
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn analysis(raw: serde_json::Value, api_key: Option<&str>) -> AnalysisOutcome {
        let coach = CoachConfig::new(Provider::Gemini, api_key.map(str::to_string));
        AnalysisOutcome::Success(Analysis::from_raw(uuid::Uuid::new_v4(), "General", raw, &coach))
    }

    #[tokio::test]
    async fn coached_report_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("42").join("report_gemini_general.json");
        let raw = json!({"coach_feedback": {"performance_summary": "Clear"}});

        assert!(cache_outcome(&analysis(raw.clone(), Some("k")), &path).await);
        assert_eq!(load_report(&path).await.unwrap(), raw);
    }

    #[tokio::test]
    async fn report_without_coach_feedback_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report_gemini_general.json");
        let raw = json!({"scores": {"audio": {"clarity_score": 8}}});

        assert!(!cache_outcome(&analysis(raw.clone(), None), &path).await);
        assert!(!cache_outcome(&analysis(raw, Some("k")), &path).await);
        assert!(!cache_outcome(&AnalysisOutcome::EmptyResult, &path).await);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn unwritable_cache_does_not_fail_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let path = blocker.join("report_gemini_general.json");
        let outcome = analysis(json!({"coach_feedback": {"performance_summary": "Clear"}}), Some("k"));

        assert!(!cache_outcome(&outcome, &path).await);
        assert_eq!(outcome.status(), "complete");
    }

    #[test]
    fn analyze_args_parse_into_struct() {
        let cli = Cli::parse_from([
            "netra",
            "analyze",
            "lecture.mp4",
            "--topic",
            "Optics",
            "--pipeline-cmd",
            "./pipe.sh",
            "--force",
        ]);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.video, PathBuf::from("lecture.mp4"));
        assert_eq!(args.topic, "Optics");
        assert_eq!(args.pipeline_cmd.as_deref(), Some("./pipe.sh"));
        assert!(args.force && !args.json && !args.require_coach);
    }
}
