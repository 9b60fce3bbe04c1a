//! Session analysis: one pipeline call per request, with the uploaded video
//! held in a temporary file that is removed on every exit path.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::{
    config::Settings,
    error::{NetraError, Result},
    pipeline::Pipeline,
    provider::CoachConfig,
    report::{ContractViolation, SessionReport, is_failure, normalize_checked},
    view::{ReportViews, build_views, coach_warning},
};

pub const SUPPORTED_VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "mkv"];

/// Lowercased extension of `file_name` when it names a supported video.
pub fn supported_video_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_string_lossy().to_lowercase();
    SUPPORTED_VIDEO_EXTENSIONS
        .contains(&ext.as_str())
        .then_some(ext)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CoachStatus {
    Available,
    MissingCredential { env_var: String },
    NotProduced,
}

impl CoachStatus {
    fn resolve(report: &SessionReport, coach: &CoachConfig) -> Self {
        if report.coach_feedback.is_some() {
            CoachStatus::Available
        } else if !coach.has_credential() {
            CoachStatus::MissingCredential {
                env_var: coach.env_var().to_string(),
            }
        } else {
            CoachStatus::NotProduced
        }
    }
}

/// A report the pipeline did produce, normalized once.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub session_id: Uuid,
    pub topic: String,
    pub report: SessionReport,
    pub raw: Value,
    pub coach: CoachStatus,
    pub violations: Vec<ContractViolation>,
}

impl Analysis {
    pub fn from_raw(session_id: Uuid, topic: &str, raw: Value, coach: &CoachConfig) -> Self {
        let (report, violations) = normalize_checked(Some(&raw));
        let coach = CoachStatus::resolve(&report, coach);
        Self {
            session_id,
            topic: topic.to_string(),
            report,
            raw,
            coach,
            violations,
        }
    }

    pub fn views(&self) -> ReportViews {
        build_views(&self.report, &self.raw, &self.coach)
    }

    /// Only reports carrying coach feedback are worth keeping; a partial one
    /// must be recomputed once the credential is configured.
    pub fn is_cacheable(&self) -> bool {
        self.coach == CoachStatus::Available
    }

    pub fn warnings(&self) -> Vec<String> {
        match self.coach {
            CoachStatus::Available => Vec::new(),
            _ => vec![coach_warning(&self.coach)],
        }
    }
}

#[derive(Clone, Debug)]
pub enum AnalysisOutcome {
    Success(Analysis),
    EmptyResult,
    Failure { reason: String },
}

impl AnalysisOutcome {
    /// Classify what the pipeline returned for one session.
    pub fn from_pipeline(
        session_id: Uuid,
        topic: &str,
        result: Result<Option<Value>>,
        coach: &CoachConfig,
    ) -> Self {
        match result {
            Ok(raw) if is_failure(raw.as_ref()) => AnalysisOutcome::EmptyResult,
            Ok(Some(raw)) => AnalysisOutcome::Success(Analysis::from_raw(session_id, topic, raw, coach)),
            Ok(None) => AnalysisOutcome::EmptyResult,
            Err(e) => AnalysisOutcome::Failure {
                reason: e.to_string(),
            },
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            AnalysisOutcome::Success(_) => "complete",
            AnalysisOutcome::EmptyResult => "empty",
            AnalysisOutcome::Failure { .. } => "failed",
        }
    }

    pub fn message(&self) -> String {
        match self {
            AnalysisOutcome::Success(_) => "Analysis Complete!".to_string(),
            AnalysisOutcome::EmptyResult => "Analysis failed. Please check the logs.".to_string(),
            AnalysisOutcome::Failure { reason } => format!("An error occurred: {reason}"),
        }
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        match self {
            AnalysisOutcome::Success(analysis) => Some(analysis),
            _ => None,
        }
    }
}

/// Uploaded bytes on disk for the duration of one analysis.
struct ScopedUpload {
    file: NamedTempFile,
}

impl ScopedUpload {
    async fn create(dir: &Path, ext: &str, bytes: &[u8]) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let file = tempfile::Builder::new()
            .prefix("netra-upload-")
            .suffix(&format!(".{ext}"))
            .tempfile_in(dir)?;
        tokio::fs::write(file.path(), bytes).await?;
        Ok(Self { file })
    }

    fn path(&self) -> &Path {
        self.file.path()
    }

    fn remove(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => debug!(path = %path.display(), "upload removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove upload"),
        }
    }
}

/// Entry point shared by the CLI and the server.
pub struct SessionAnalyzer {
    pipeline: Arc<dyn Pipeline>,
    coach: CoachConfig,
    upload_dir: PathBuf,
}

impl SessionAnalyzer {
    pub fn new(pipeline: Arc<dyn Pipeline>, settings: &Settings) -> Self {
        Self {
            pipeline,
            coach: settings.coach.clone(),
            upload_dir: settings.upload_dir.clone(),
        }
    }

    pub fn coach(&self) -> &CoachConfig {
        &self.coach
    }

    pub fn pipeline_name(&self) -> &str {
        self.pipeline.name()
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Analyze a video already on disk.
    pub async fn analyze_video(&self, video: &Path, topic: &str) -> AnalysisOutcome {
        let session_id = Uuid::new_v4();
        let span = info_span!("session", %session_id, topic);
        self.run_session(session_id, video, topic)
            .instrument(span)
            .await
    }

    /// Analyze uploaded bytes. The temporary copy never outlives this call.
    pub async fn analyze_upload(
        &self,
        file_name: &str,
        bytes: &[u8],
        topic: &str,
    ) -> Result<AnalysisOutcome> {
        let ext = supported_video_extension(file_name).ok_or_else(|| NetraError::UnsupportedVideo {
            file_name: file_name.to_string(),
        })?;

        let session_id = Uuid::new_v4();
        let span = info_span!("session", %session_id, topic, file_name);
        async {
            let upload = ScopedUpload::create(&self.upload_dir, &ext, bytes).await?;
            info!(path = %upload.path().display(), bytes = bytes.len(), "upload stored");

            let outcome = self.run_session(session_id, upload.path(), topic).await;
            upload.remove();
            Ok::<_, NetraError>(outcome)
        }
        .instrument(span)
        .await
    }

    /// Forward an arbitrary payload to the pipeline unchanged.
    pub async fn process_payload(&self, payload: Value) -> Result<Option<Value>> {
        debug!(pipeline = self.pipeline.name(), "forwarding payload");
        self.pipeline.process_payload(payload).await
    }

    async fn run_session(&self, session_id: Uuid, video: &Path, topic: &str) -> AnalysisOutcome {
        let result = match tokio::fs::try_exists(video).await {
            Ok(true) => self.pipeline.process_session(video, topic).await,
            Ok(false) => Err(NetraError::VideoNotFound {
                path: video.to_path_buf(),
            }),
            Err(e) => Err(e.into()),
        };

        let outcome = AnalysisOutcome::from_pipeline(session_id, topic, result, &self.coach);
        match &outcome {
            AnalysisOutcome::Success(analysis) => {
                for violation in &analysis.violations {
                    warn!(%violation, "report deviates from contract");
                }
                if let CoachStatus::MissingCredential { env_var } = &analysis.coach {
                    warn!(env_var = %env_var, "coach feedback missing, credential not configured");
                }
                info!(coach = ?analysis.coach, "analysis complete");
            }
            AnalysisOutcome::EmptyResult => warn!("pipeline produced no report"),
            AnalysisOutcome::Failure { reason } => warn!(%reason, "analysis failed"),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::provider::Provider;

    enum Reply {
        Report(Value),
        Nothing,
        Error,
    }

    /// Records whether the video existed while the pipeline ran.
    struct FakePipeline {
        reply: Reply,
        seen: Mutex<Vec<(PathBuf, bool)>>,
    }

    impl FakePipeline {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<(PathBuf, bool)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Pipeline for FakePipeline {
        fn name(&self) -> &str {
            "fake"
        }

        async fn process_session(&self, video: &Path, _topic: &str) -> Result<Option<Value>> {
            self.seen
                .lock()
                .unwrap()
                .push((video.to_path_buf(), video.exists()));
            match &self.reply {
                Reply::Report(value) => Ok(Some(value.clone())),
                Reply::Nothing => Ok(None),
                Reply::Error => Err(NetraError::PipelineFailed {
                    stage: "fake".to_string(),
                    reason: "boom".to_string(),
                }),
            }
        }

        async fn process_payload(&self, payload: Value) -> Result<Option<Value>> {
            Ok(Some(payload))
        }
    }

    fn settings(dir: &Path, api_key: Option<&str>) -> Settings {
        Settings {
            coach: CoachConfig::new(Provider::Gemini, api_key.map(str::to_string)),
            upload_dir: dir.to_path_buf(),
            ..Settings::default()
        }
    }

    async fn upload_with(reply: Reply) -> (AnalysisOutcome, Vec<(PathBuf, bool)>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = FakePipeline::new(reply);
        let analyzer = SessionAnalyzer::new(pipeline.clone(), &settings(dir.path(), Some("key")));

        let outcome = analyzer
            .analyze_upload("lecture.MP4", b"not really a video", "Graphs")
            .await
            .unwrap();
        (outcome, pipeline.seen(), dir)
    }

    #[tokio::test]
    async fn upload_is_removed_after_success() {
        let (outcome, seen, dir) = upload_with(Reply::Report(json!({"scores": {}}))).await;
        assert_eq!(outcome.status(), "complete");

        let (path, existed) = &seen[0];
        assert!(*existed);
        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().unwrap(), "mp4");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn upload_is_removed_after_empty_result() {
        let (outcome, seen, _dir) = upload_with(Reply::Nothing).await;
        assert!(matches!(outcome, AnalysisOutcome::EmptyResult));
        assert!(seen[0].1);
        assert!(!seen[0].0.exists());
    }

    #[tokio::test]
    async fn upload_is_removed_after_pipeline_error() {
        let (outcome, seen, _dir) = upload_with(Reply::Error).await;
        let AnalysisOutcome::Failure { reason } = &outcome else {
            panic!("expected failure, got {}", outcome.status());
        };
        assert!(reason.contains("boom"));
        assert!(outcome.message().starts_with("An error occurred:"));
        assert!(seen[0].1);
        assert!(!seen[0].0.exists());
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = FakePipeline::new(Reply::Nothing);
        let analyzer = SessionAnalyzer::new(pipeline.clone(), &settings(dir.path(), None));

        let err = analyzer
            .analyze_upload("slides.pdf", b"%PDF", "General")
            .await
            .unwrap_err();
        assert!(matches!(err, NetraError::UnsupportedVideo { .. }));
        assert!(pipeline.seen().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_mapping_is_an_empty_result() {
        let (outcome, _, _dir) = upload_with(Reply::Report(json!({}))).await;
        assert!(matches!(outcome, AnalysisOutcome::EmptyResult));
        assert_eq!(outcome.message(), "Analysis failed. Please check the logs.");
    }

    #[tokio::test]
    async fn missing_credential_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = FakePipeline::new(Reply::Report(json!({"scores": {"text": {"technical_depth": 4}}})));
        let analyzer = SessionAnalyzer::new(pipeline, &settings(dir.path(), None));

        let outcome = analyzer.analyze_upload("talk.mkv", b"x", "General").await.unwrap();
        let analysis = outcome.analysis().unwrap();
        assert_eq!(
            analysis.coach,
            CoachStatus::MissingCredential {
                env_var: "GEMINI_API_KEY".to_string()
            }
        );
        assert_eq!(analysis.warnings().len(), 1);
        assert_eq!(analysis.report.scores.text.get("technical_depth"), 4.0);
    }

    #[tokio::test]
    async fn missing_video_file_fails_without_calling_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = FakePipeline::new(Reply::Nothing);
        let analyzer = SessionAnalyzer::new(pipeline.clone(), &settings(dir.path(), None));

        let outcome = analyzer
            .analyze_video(&dir.path().join("absent.mp4"), "General")
            .await;
        assert_eq!(outcome.status(), "failed");
        assert!(pipeline.seen().is_empty());
    }

    struct PanickingPipeline;

    #[async_trait]
    impl Pipeline for PanickingPipeline {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn process_session(&self, video: &Path, _topic: &str) -> Result<Option<Value>> {
            if video.exists() {
                panic!("pipeline crashed mid-session");
            }
            Ok(None)
        }

        async fn process_payload(&self, _payload: Value) -> Result<Option<Value>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn upload_is_removed_when_pipeline_panics() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = Arc::new(SessionAnalyzer::new(
            Arc::new(PanickingPipeline),
            &settings(dir.path(), Some("key")),
        ));

        let task = tokio::spawn({
            let analyzer = analyzer.clone();
            async move { analyzer.analyze_upload("lecture.mp4", b"bytes", "General").await }
        });
        let err = task.await.unwrap_err();
        assert!(err.is_panic());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn only_reports_with_coach_feedback_are_cacheable() {
        let dir = tempfile::tempdir().unwrap();
        let partial = json!({"scores": {"audio": {"clarity_score": 7}}});
        let complete = json!({
            "scores": {"audio": {"clarity_score": 7}},
            "coach_feedback": {"performance_summary": "Clear delivery"}
        });

        let without_key = SessionAnalyzer::new(
            FakePipeline::new(Reply::Report(partial.clone())),
            &settings(dir.path(), None),
        );
        let outcome = without_key.analyze_video(&write_video(dir.path()), "General").await;
        assert!(!outcome.analysis().unwrap().is_cacheable());

        let with_key = SessionAnalyzer::new(
            FakePipeline::new(Reply::Report(partial)),
            &settings(dir.path(), Some("key")),
        );
        let outcome = with_key.analyze_video(&write_video(dir.path()), "General").await;
        assert_eq!(outcome.analysis().unwrap().coach, CoachStatus::NotProduced);
        assert!(!outcome.analysis().unwrap().is_cacheable());

        let coached = SessionAnalyzer::new(
            FakePipeline::new(Reply::Report(complete)),
            &settings(dir.path(), Some("key")),
        );
        let outcome = coached.analyze_video(&write_video(dir.path()), "General").await;
        assert!(outcome.analysis().unwrap().is_cacheable());
    }

    fn write_video(dir: &Path) -> PathBuf {
        let video = dir.join("lecture.mp4");
        std::fs::write(&video, b"frames").unwrap();
        video
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert_eq!(supported_video_extension("a.MOV").as_deref(), Some("mov"));
        assert_eq!(supported_video_extension("a.avi").as_deref(), Some("avi"));
        assert_eq!(supported_video_extension("a.webm"), None);
        assert_eq!(supported_video_extension("mp4"), None);
    }
}
