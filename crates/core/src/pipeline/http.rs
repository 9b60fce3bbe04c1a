use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::{error::Result, pipeline::Pipeline};

/// Reaches a pipeline served over HTTP at `<base_url>/process`.
#[derive(Clone, Debug)]
pub struct HttpPipeline {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPipeline {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/process", base_url.trim_end_matches('/')),
        }
    }

    async fn post(&self, body: &Value) -> Result<Option<Value>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        info!(endpoint = %self.endpoint, "remote pipeline responded");
        Ok(match response {
            Value::Null => None,
            value => Some(value),
        })
    }
}

#[async_trait]
impl Pipeline for HttpPipeline {
    fn name(&self) -> &str {
        "http"
    }

    async fn process_session(&self, video: &Path, topic: &str) -> Result<Option<Value>> {
        let body = serde_json::json!({
            "video_path": video.to_string_lossy(),
            "topic_name": topic,
        });
        self.post(&body).await
    }

    async fn process_payload(&self, payload: Value) -> Result<Option<Value>> {
        self.post(&payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_ignores_trailing_slash() {
        assert_eq!(
            HttpPipeline::new("http://127.0.0.1:9000/").endpoint,
            "http://127.0.0.1:9000/process"
        );
        assert_eq!(
            HttpPipeline::new("http://pipeline.local").endpoint,
            "http://pipeline.local/process"
        );
    }
}
