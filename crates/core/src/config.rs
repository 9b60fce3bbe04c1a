use std::{path::PathBuf, str::FromStr};

use crate::{
    error::{NetraError, Result},
    provider::{CoachConfig, Provider},
};

pub const SAMPLE_RATE_ENV: &str = "NETRA_SAMPLE_RATE";
pub const SPEECH_THRESHOLD_DB_ENV: &str = "NETRA_SPEECH_THRESHOLD_DB";
pub const FRAME_EXTRACTION_RATE_ENV: &str = "NETRA_FRAME_EXTRACTION_RATE";
pub const UPLOAD_DIR_ENV: &str = "NETRA_UPLOAD_DIR";
pub const PROVIDER_ENV: &str = "NETRA_PROVIDER";

/// Tunables forwarded to the analysis pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisSettings {
    pub sample_rate: u32,
    pub speech_threshold_db: f64,
    pub frame_extraction_rate: u32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            speech_threshold_db: 20.0,
            frame_extraction_rate: 30,
        }
    }
}

impl AnalysisSettings {
    /// Environment pairs handed to pipeline child processes.
    pub fn env_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (SAMPLE_RATE_ENV, self.sample_rate.to_string()),
            (SPEECH_THRESHOLD_DB_ENV, self.speech_threshold_db.to_string()),
            (
                FRAME_EXTRACTION_RATE_ENV,
                self.frame_extraction_rate.to_string(),
            ),
        ]
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub coach: CoachConfig,
    pub analysis: AnalysisSettings,
    pub upload_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            coach: CoachConfig::default(),
            analysis: AnalysisSettings::default(),
            upload_dir: std::env::temp_dir(),
        }
    }
}

impl Settings {
    /// Build settings from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] with an injectable variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup(PROVIDER_ENV) {
            Some(name) => Provider::from_name(&name).ok_or_else(|| NetraError::InvalidSetting {
                key: PROVIDER_ENV.to_string(),
                value: name.clone(),
                reason: "expected gemini, openai or grok".to_string(),
            })?,
            None => Provider::default(),
        };
        let coach = CoachConfig::new(provider, lookup(provider.config().env_var));

        let defaults = AnalysisSettings::default();
        let analysis = AnalysisSettings {
            sample_rate: parse_or(&lookup, SAMPLE_RATE_ENV, defaults.sample_rate)?,
            speech_threshold_db: parse_or(
                &lookup,
                SPEECH_THRESHOLD_DB_ENV,
                defaults.speech_threshold_db,
            )?,
            frame_extraction_rate: parse_or(
                &lookup,
                FRAME_EXTRACTION_RATE_ENV,
                defaults.frame_extraction_rate,
            )?,
        };

        let upload_dir = lookup(UPLOAD_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        Ok(Self {
            coach,
            analysis,
            upload_dir,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| NetraError::InvalidSetting {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings.analysis, AnalysisSettings::default());
        assert_eq!(settings.coach.provider, Provider::Gemini);
        assert!(!settings.coach.has_credential());
    }

    #[test]
    fn credential_follows_selected_provider() {
        let settings = Settings::from_lookup(lookup_from(&[
            (PROVIDER_ENV, "openai"),
            ("OPENAI_API_KEY", "sk-test"),
            ("GEMINI_API_KEY", "ignored"),
        ]))
        .unwrap();
        assert_eq!(settings.coach.provider, Provider::Openai);
        assert_eq!(settings.coach.api_key(), Some("sk-test"));
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = Settings::from_lookup(lookup_from(&[
            (SAMPLE_RATE_ENV, "16000"),
            (SPEECH_THRESHOLD_DB_ENV, "12.5"),
            (UPLOAD_DIR_ENV, "/var/tmp/netra"),
        ]))
        .unwrap();
        assert_eq!(settings.analysis.sample_rate, 16000);
        assert_eq!(settings.analysis.speech_threshold_db, 12.5);
        assert_eq!(settings.analysis.frame_extraction_rate, 30);
        assert_eq!(settings.upload_dir, PathBuf::from("/var/tmp/netra"));
    }

    #[test]
    fn malformed_override_is_rejected() {
        let err = Settings::from_lookup(lookup_from(&[(FRAME_EXTRACTION_RATE_ENV, "fast")]))
            .unwrap_err();
        assert!(matches!(err, NetraError::InvalidSetting { ref key, .. } if key == FRAME_EXTRACTION_RATE_ENV));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = Settings::from_lookup(lookup_from(&[(PROVIDER_ENV, "llama")])).unwrap_err();
        assert!(matches!(err, NetraError::InvalidSetting { .. }));
    }
}
