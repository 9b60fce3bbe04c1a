//! Session report contract.
//!
//! The pipeline hands back an untyped JSON mapping. Everything downstream
//! works on [`SessionReport`], a total structure produced once by
//! [`normalize`]: absent branches are empty, absent metrics read as zero and
//! wrongly typed sections degrade to their defaults instead of failing.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Audio,
    Video,
    Text,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Modality::Audio, Modality::Video, Modality::Text];

    pub fn key(&self) -> &'static str {
        match self {
            Modality::Audio => "audio",
            Modality::Video => "video",
            Modality::Text => "text",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Modality::Audio => "Audio",
            Modality::Video => "Video",
            Modality::Text => "Text",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }
}

/// A metric the dashboard always displays, whether or not it was reported.
#[derive(Clone, Copy, Debug)]
pub struct KnownMetric {
    pub modality: Modality,
    pub key: &'static str,
    pub label: &'static str,
}

pub const KNOWN_METRICS: [KnownMetric; 6] = [
    KnownMetric {
        modality: Modality::Audio,
        key: "clarity_score",
        label: "Audio Clarity",
    },
    KnownMetric {
        modality: Modality::Audio,
        key: "confidence_score",
        label: "Audio Confidence",
    },
    KnownMetric {
        modality: Modality::Video,
        key: "engagement_score",
        label: "Video Engagement",
    },
    KnownMetric {
        modality: Modality::Video,
        key: "gesture_index",
        label: "Gesture Index",
    },
    KnownMetric {
        modality: Modality::Text,
        key: "technical_depth",
        label: "Technical Depth",
    },
    KnownMetric {
        modality: Modality::Text,
        key: "interaction_index",
        label: "Interaction Index",
    },
];

/// Metric name to value for one modality. Lookups never fail.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ModalityScores(BTreeMap<String, f64>);

impl ModalityScores {
    pub fn get(&self, metric: &str) -> f64 {
        self.0.get(metric).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ModalityScores {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Scores {
    pub audio: ModalityScores,
    pub video: ModalityScores,
    pub text: ModalityScores,
}

impl Scores {
    pub fn modality(&self, modality: Modality) -> &ModalityScores {
        match modality {
            Modality::Audio => &self.audio,
            Modality::Video => &self.video,
            Modality::Text => &self.text,
        }
    }

    fn modality_mut(&mut self, modality: Modality) -> &mut ModalityScores {
        match modality {
            Modality::Audio => &mut self.audio,
            Modality::Video => &mut self.video,
            Modality::Text => &mut self.text,
        }
    }

    pub fn metric(&self, modality: Modality, metric: &str) -> f64 {
        self.modality(modality).get(metric)
    }

    pub fn is_empty(&self) -> bool {
        Modality::ALL.iter().all(|m| self.modality(*m).is_empty())
    }
}

pub const UNKNOWN_STYLE: &str = "Unknown";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TeachingStyle {
    Labelled { style: String, explanation: String },
    Freeform { text: String },
}

impl Default for TeachingStyle {
    fn default() -> Self {
        TeachingStyle::Labelled {
            style: UNKNOWN_STYLE.to_string(),
            explanation: String::new(),
        }
    }
}

impl TeachingStyle {
    /// Short label; a freeform style has none.
    pub fn label(&self) -> Option<&str> {
        match self {
            TeachingStyle::Labelled { style, .. } => Some(style),
            TeachingStyle::Freeform { .. } => None,
        }
    }

    pub fn explanation(&self) -> &str {
        match self {
            TeachingStyle::Labelled { explanation, .. } => explanation,
            TeachingStyle::Freeform { text } => text,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ContentMetadata {
    pub titles: Vec<String>,
    pub hashtags: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CoachFeedback {
    pub performance_summary: Option<String>,
    pub teaching_style: TeachingStyle,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub content_metadata: ContentMetadata,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SessionReport {
    pub scores: Scores,
    pub coach_feedback: Option<CoachFeedback>,
}

/// One place where a raw report deviates from the contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContractViolation {
    pub path: String,
    pub problem: String,
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.problem)
    }
}

/// True when the pipeline produced nothing usable: no value, `null`, an
/// empty mapping, or something that is not a mapping at all.
pub fn is_failure(raw: Option<&Value>) -> bool {
    match raw {
        Some(Value::Object(map)) => map.is_empty(),
        _ => true,
    }
}

/// Fill every optional field of a raw report with its default. Never fails.
pub fn normalize(raw: Option<&Value>) -> SessionReport {
    normalize_checked(raw).0
}

/// List every deviation of `raw` from the report contract.
pub fn check(raw: &Value) -> Vec<ContractViolation> {
    normalize_checked(Some(raw)).1
}

/// Normalize and collect contract violations in a single pass.
pub fn normalize_checked(raw: Option<&Value>) -> (SessionReport, Vec<ContractViolation>) {
    let mut n = Normalizer::default();
    let report = match raw {
        None | Some(Value::Null) => SessionReport::default(),
        Some(Value::Object(map)) => n.report(map),
        Some(other) => {
            n.violation("$", format!("expected a mapping, got {}", kind(other)));
            SessionReport::default()
        }
    };
    (report, n.violations)
}

#[derive(Default)]
struct Normalizer {
    violations: Vec<ContractViolation>,
}

impl Normalizer {
    fn violation(&mut self, path: impl Into<String>, problem: impl Into<String>) {
        self.violations.push(ContractViolation {
            path: path.into(),
            problem: problem.into(),
        });
    }

    fn object<'a>(&mut self, path: &str, value: Option<&'a Value>) -> Option<&'a Map<String, Value>> {
        match value {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                self.violation(path, format!("expected a mapping, got {}", kind(other)));
                None
            }
        }
    }

    fn report(&mut self, map: &Map<String, Value>) -> SessionReport {
        let scores = match self.object("scores", map.get("scores")) {
            Some(scores) => self.scores(scores),
            None => Scores::default(),
        };
        let coach_feedback = self
            .object("coach_feedback", map.get("coach_feedback"))
            .map(|fb| self.feedback(fb));

        SessionReport {
            scores,
            coach_feedback,
        }
    }

    fn scores(&mut self, map: &Map<String, Value>) -> Scores {
        let mut scores = Scores::default();
        for (key, value) in map {
            let path = format!("scores.{key}");
            let Some(modality) = Modality::from_key(key) else {
                self.violation(path, "unknown modality, ignored");
                continue;
            };
            let Some(metrics) = self.object(&path, Some(value)) else {
                continue;
            };

            let target = scores.modality_mut(modality);
            for (metric, value) in metrics {
                match value.as_f64() {
                    Some(v) => {
                        target.0.insert(metric.clone(), v);
                    }
                    None => self.violation(
                        format!("{path}.{metric}"),
                        format!("expected a number, got {}; reads as 0", kind(value)),
                    ),
                }
            }
        }
        scores
    }

    fn feedback(&mut self, map: &Map<String, Value>) -> CoachFeedback {
        let performance_summary =
            self.text("coach_feedback.performance_summary", map.get("performance_summary"));
        let teaching_style = self.teaching_style(map.get("teaching_style"));
        let strengths = self.text_list("coach_feedback.strengths", map.get("strengths"));
        let weaknesses = self.text_list("coach_feedback.weaknesses", map.get("weaknesses"));

        let content_metadata = match self.object(
            "coach_feedback.content_metadata",
            map.get("content_metadata"),
        ) {
            Some(meta) => {
                let titles =
                    self.text_list("coach_feedback.content_metadata.titles", meta.get("titles"));
                let hashtags = self.text_list(
                    "coach_feedback.content_metadata.hashtags",
                    meta.get("hashtags"),
                );
                for (i, tag) in hashtags.iter().enumerate() {
                    if !tag.starts_with('#') {
                        self.violation(
                            format!("coach_feedback.content_metadata.hashtags[{i}]"),
                            format!("hashtag {tag:?} does not start with '#'"),
                        );
                    }
                }
                ContentMetadata { titles, hashtags }
            }
            None => ContentMetadata::default(),
        };

        CoachFeedback {
            performance_summary,
            teaching_style,
            strengths,
            weaknesses,
            content_metadata,
        }
    }

    fn teaching_style(&mut self, value: Option<&Value>) -> TeachingStyle {
        const PATH: &str = "coach_feedback.teaching_style";
        match value {
            None | Some(Value::Null) => TeachingStyle::default(),
            Some(Value::Object(map)) => TeachingStyle::Labelled {
                style: self
                    .text(&format!("{PATH}.style"), map.get("style"))
                    .unwrap_or_else(|| UNKNOWN_STYLE.to_string()),
                explanation: self
                    .text(&format!("{PATH}.explanation"), map.get("explanation"))
                    .unwrap_or_default(),
            },
            Some(Value::String(s)) => TeachingStyle::Freeform { text: s.clone() },
            Some(scalar @ (Value::Number(_) | Value::Bool(_))) => {
                self.violation(PATH, format!("expected a mapping or string, got {}", kind(scalar)));
                TeachingStyle::Freeform {
                    text: scalar.to_string(),
                }
            }
            Some(other) => {
                self.violation(PATH, format!("expected a mapping or string, got {}", kind(other)));
                TeachingStyle::default()
            }
        }
    }

    /// Strings pass through; numbers and booleans are stringified.
    fn text(&mut self, path: &str, value: Option<&Value>) -> Option<String> {
        match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(scalar @ (Value::Number(_) | Value::Bool(_))) => {
                self.violation(path, format!("expected a string, got {}", kind(scalar)));
                Some(scalar.to_string())
            }
            Some(other) => {
                self.violation(path, format!("expected a string, got {}", kind(other)));
                None
            }
        }
    }

    fn text_list(&mut self, path: &str, value: Option<&Value>) -> Vec<String> {
        match value {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| self.text(&format!("{path}[{i}]"), Some(item)))
                .collect(),
            Some(other) => {
                self.violation(path, format!("expected a list, got {}", kind(other)));
                Vec::new()
            }
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
