use crate::{
    session::AnalysisOutcome,
    view::{FeedbackView, MetricsView, ReportViews, SummaryView},
};

pub fn format_summary(summary: &SummaryView) -> String {
    let mut output = String::new();
    match summary {
        SummaryView::Available {
            performance_summary,
            style_label,
            style_explanation,
        } => {
            output.push_str("## Performance Summary\n\n");
            output.push_str(performance_summary);
            output.push_str("\n\n");

            output.push_str("## Teaching Style\n\n");
            match style_label {
                Some(label) => output.push_str(&format!("**{}**: {}\n", label, style_explanation)),
                None => output.push_str(&format!("{}\n", style_explanation)),
            }
        }
        SummaryView::Unavailable { warning } => {
            output.push_str(&format!("> ⚠ {}\n", warning));
        }
    }
    output
}

pub fn format_metrics(metrics: &MetricsView) -> String {
    let mut output = String::from("## Detailed Scores\n\n");
    for column in &metrics.columns {
        output.push_str(&format!("### {}\n\n", column.modality.title()));
        for reading in column.metrics.iter().chain(&column.extra) {
            output.push_str(&format!("• {}: {}\n", reading.label, reading.display));
        }
        output.push('\n');
    }
    output
}

fn push_bullets(output: &mut String, items: &[String]) {
    for item in items {
        output.push_str(&format!("- {}\n", item));
    }
}

pub fn format_feedback(feedback: &FeedbackView) -> String {
    let mut output = String::from("## Coach Feedback\n\n");
    match feedback {
        FeedbackView::Available {
            strengths,
            weaknesses,
            titles,
            hashtags,
        } => {
            output.push_str("### ✅ Strengths\n\n");
            push_bullets(&mut output, strengths);
            output.push('\n');

            output.push_str("### ⚠️ Areas for Improvement\n\n");
            push_bullets(&mut output, weaknesses);
            output.push('\n');

            output.push_str("### Titles & Hashtags\n\n");
            output.push_str("**Titles:**\n");
            push_bullets(&mut output, titles);
            output.push_str(&format!("**Hashtags:** {}\n", hashtags));
        }
        FeedbackView::Unavailable { placeholder } => {
            output.push_str(placeholder);
            output.push('\n');
        }
    }
    output
}

/// Format all four views as human-readable markdown
pub fn format_report_readable(views: &ReportViews) -> String {
    let mut output = String::new();

    output.push_str("# Summary\n\n");
    output.push_str(&format_summary(&views.summary));
    output.push('\n');

    output.push_str(&format_metrics(&views.metrics));

    output.push_str(&format_feedback(&views.feedback));
    output.push('\n');

    output.push_str("## Raw Data\n\n```json\n");
    output.push_str(&serde_json::to_string_pretty(&views.raw).unwrap_or_else(|_| views.raw.to_string()));
    output.push_str("\n```\n");

    output
}

/// Status line followed by the views when there is a report to show.
pub fn format_outcome(outcome: &AnalysisOutcome) -> String {
    match outcome {
        AnalysisOutcome::Success(analysis) => format!(
            "{}\n\n{}",
            outcome.message(),
            format_report_readable(&analysis.views())
        ),
        AnalysisOutcome::EmptyResult | AnalysisOutcome::Failure { .. } => {
            format!("{}\n", outcome.message())
        }
    }
}
