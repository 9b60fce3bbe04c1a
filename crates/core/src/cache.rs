use std::{
    hash::{DefaultHasher, Hasher},
    path::{Path, PathBuf},
};

use serde_json::Value;
use tokio::{fs, io::AsyncReadExt};

use crate::{error::Result, provider::Provider};

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("netra")
}

/// Hash of the video's bytes, so renamed or copied recordings share a cache entry.
pub async fn video_fingerprint(video: &Path) -> Result<u64> {
    let mut file = fs::File::open(video).await?;
    let mut hasher = DefaultHasher::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.write(&buf[..n]);
    }
    Ok(hasher.finish())
}

/// Get the cache directory for a given video fingerprint
pub fn get_cache_dir(root: &Path, fingerprint: u64) -> PathBuf {
    root.join(fingerprint.to_string())
}

/// Get the path for a cached report (provider and topic aware)
pub fn get_report_path(cache_dir: &Path, provider: &Provider, topic: &str) -> PathBuf {
    let slug: String = topic
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let slug = if slug.is_empty() { "general".to_string() } else { slug };
    let provider_name = provider.name().to_ascii_lowercase();
    cache_dir.join(format!("report_{}_{}.json", provider_name, slug))
}

/// Load a raw report from a cached file
pub async fn load_report(path: &Path) -> Result<Value> {
    let json_content = fs::read_to_string(path).await?;
    let report: Value = serde_json::from_str(&json_content)?;
    Ok(report)
}

/// Save a raw report to a file
pub async fn save_report(report: &Value, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let pretty_json = serde_json::to_string_pretty(report)?;
    fs::write(path, &pretty_json).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn report_path_slugs_topic() {
        let dir = Path::new("/cache/42");
        assert_eq!(
            get_report_path(dir, &Provider::Gemini, "Linear Algebra 101"),
            dir.join("report_gemini_linear_algebra_101.json")
        );
        assert_eq!(
            get_report_path(dir, &Provider::Grok, "  "),
            dir.join("report_grok_general.json")
        );
    }

    #[tokio::test]
    async fn saved_report_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = get_report_path(&get_cache_dir(dir.path(), 7), &Provider::Openai, "General");
        let raw = json!({"scores": {"audio": {"clarity_score": 8}}, "coach_feedback": null});

        save_report(&raw, &path).await.unwrap();
        assert_eq!(load_report(&path).await.unwrap(), raw);
    }

    #[tokio::test]
    async fn fingerprint_changes_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("lecture.mp4");
        std::fs::write(&video, b"short").unwrap();
        let first = video_fingerprint(&video).await.unwrap();
        assert_eq!(first, video_fingerprint(&video).await.unwrap());

        std::fs::write(&video, b"a longer recording").unwrap();
        assert_ne!(first, video_fingerprint(&video).await.unwrap());
    }

    #[tokio::test]
    async fn fingerprint_follows_content_not_location() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("lecture.mp4");
        let copy = dir.path().join("renamed.mp4");
        let other = dir.path().join("other.mp4");
        std::fs::write(&original, b"same frames").unwrap();
        std::fs::write(&copy, b"same frames").unwrap();
        std::fs::write(&other, b"different frames").unwrap();

        let fingerprint = video_fingerprint(&original).await.unwrap();
        assert_eq!(fingerprint, video_fingerprint(&copy).await.unwrap());
        assert_ne!(fingerprint, video_fingerprint(&other).await.unwrap());
    }
}
