use crate::error::{NetraError, Result};

/// Generative-AI service the pipeline uses for coach feedback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Provider {
    #[default]
    Gemini,
    Openai,
    Grok,
}

pub struct ProviderConfig {
    pub api_url: &'static str,
    pub model: &'static str,
    pub env_var: &'static str,
}

impl Provider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::Gemini => ProviderConfig {
                api_url: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                model: "gemini-3-pro",
                env_var: "GEMINI_API_KEY",
            },
            Provider::Openai => ProviderConfig {
                api_url: "https://api.openai.com/v1/chat/completions",
                model: "gpt-5.1",
                env_var: "OPENAI_API_KEY",
            },
            Provider::Grok => ProviderConfig {
                api_url: "https://api.x.ai/v1/chat/completions",
                model: "grok-4-fast",
                env_var: "XAI_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::Openai => "OpenAI",
            Provider::Grok => "Grok",
        }
    }

    /// Parse a provider from its lowercase CLI/env spelling.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gemini" => Some(Provider::Gemini),
            "openai" => Some(Provider::Openai),
            "grok" | "xai" => Some(Provider::Grok),
            _ => None,
        }
    }
}

/// Coach credential resolved once at startup and handed to the pipeline.
#[derive(Clone, Debug, Default)]
pub struct CoachConfig {
    pub provider: Provider,
    api_key: Option<String>,
}

impl CoachConfig {
    pub fn new(provider: Provider, api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        Self { provider, api_key }
    }

    /// Read the provider's API key from the process environment.
    pub fn from_env(provider: Provider) -> Self {
        Self::new(provider, std::env::var(provider.config().env_var).ok())
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn env_var(&self) -> &'static str {
        self.provider.config().env_var
    }

    pub fn model(&self) -> &'static str {
        self.provider.config().model
    }

    /// Validate that the API key is set for this provider
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key().ok_or_else(|| NetraError::MissingApiKey {
            env_var: self.env_var().to_string(),
        })
    }
}
