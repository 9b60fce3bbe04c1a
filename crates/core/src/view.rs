//! The four dashboard views over one normalized report.

use serde::Serialize;
use serde_json::Value;

use crate::{
    report::{KNOWN_METRICS, Modality, SessionReport},
    session::CoachStatus,
};

pub const GENERIC_COACH_WARNING: &str = "Coach feedback not available (Check API Key).";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SummaryView {
    Available {
        performance_summary: String,
        style_label: Option<String>,
        style_explanation: String,
    },
    Unavailable {
        warning: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricReading {
    pub key: String,
    pub label: String,
    pub value: f64,
    pub display: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricColumn {
    pub modality: Modality,
    pub metrics: Vec<MetricReading>,
    /// Reported metrics the dashboard has no fixed slot for.
    pub extra: Vec<MetricReading>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricsView {
    pub columns: Vec<MetricColumn>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeedbackView {
    Available {
        strengths: Vec<String>,
        weaknesses: Vec<String>,
        titles: Vec<String>,
        hashtags: String,
    },
    Unavailable {
        placeholder: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportViews {
    pub summary: SummaryView,
    pub metrics: MetricsView,
    pub feedback: FeedbackView,
    pub raw: Value,
}

/// Warning shown in place of coach feedback.
pub fn coach_warning(status: &CoachStatus) -> String {
    match status {
        CoachStatus::MissingCredential { env_var } => {
            format!("Coach feedback not available: {env_var} is not set.")
        }
        CoachStatus::Available | CoachStatus::NotProduced => GENERIC_COACH_WARNING.to_string(),
    }
}

/// Round to two decimals; whole numbers print without a fraction.
///
/// Magnitudes past 1e15 carry no fractional digits and would overflow the
/// scaling, so they are printed as-is.
pub fn format_metric(value: f64) -> String {
    if value.abs() < 1e15 {
        ((value * 100.0).round() / 100.0).to_string()
    } else {
        value.to_string()
    }
}

pub fn build_views(report: &SessionReport, raw: &Value, coach: &CoachStatus) -> ReportViews {
    ReportViews {
        summary: summary_view(report, coach),
        metrics: metrics_view(report),
        feedback: feedback_view(report, coach),
        raw: raw.clone(),
    }
}

fn summary_view(report: &SessionReport, coach: &CoachStatus) -> SummaryView {
    let Some((feedback, summary)) = report
        .coach_feedback
        .as_ref()
        .and_then(|fb| fb.performance_summary.as_ref().map(|s| (fb, s)))
    else {
        return SummaryView::Unavailable {
            warning: coach_warning(coach),
        };
    };

    SummaryView::Available {
        performance_summary: summary.clone(),
        style_label: feedback.teaching_style.label().map(str::to_string),
        style_explanation: feedback.teaching_style.explanation().to_string(),
    }
}

fn reading(key: &str, label: &str, value: f64) -> MetricReading {
    MetricReading {
        key: key.to_string(),
        label: label.to_string(),
        value,
        display: format_metric(value),
    }
}

fn metrics_view(report: &SessionReport) -> MetricsView {
    let columns = Modality::ALL
        .into_iter()
        .map(|modality| {
            let scores = report.scores.modality(modality);
            let known = KNOWN_METRICS.iter().filter(|m| m.modality == modality);

            let metrics = known
                .clone()
                .map(|m| reading(m.key, m.label, scores.get(m.key)))
                .collect();
            let extra = scores
                .iter()
                .filter(|(key, _)| !known.clone().any(|m| m.key == *key))
                .map(|(key, value)| reading(key, key, value))
                .collect();

            MetricColumn {
                modality,
                metrics,
                extra,
            }
        })
        .collect();

    MetricsView { columns }
}

fn feedback_view(report: &SessionReport, coach: &CoachStatus) -> FeedbackView {
    match &report.coach_feedback {
        Some(fb) => FeedbackView::Available {
            strengths: fb.strengths.clone(),
            weaknesses: fb.weaknesses.clone(),
            titles: fb.content_metadata.titles.clone(),
            hashtags: fb.content_metadata.hashtags.join(" "),
        },
        None => FeedbackView::Unavailable {
            placeholder: coach_warning(coach),
        },
    }
}
