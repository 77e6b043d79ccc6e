//! Capture artifact writer
//!
//! The simulated camera produces a small text artifact per capture.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// Attempts at finding a free file name before giving up
const MAX_NAME_ATTEMPTS: u32 = 16;

/// Writes capture artifacts into a directory
#[derive(Debug, Clone)]
pub struct CaptureWriter {
    dir: PathBuf,
}

impl CaptureWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write one artifact and return its file name
    pub async fn write(&self, lat: f64, lon: f64) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create capture dir {}", self.dir.display()))?;

        let now = chrono::Utc::now();
        let stamp = now.format("%Y%m%d_%H%M%S_%3f").to_string();
        let body = format!(
            "Simulated image at {}\nlat:{}\nlon:{}\n",
            now.format("%Y%m%d_%H%M%S"),
            lat,
            lon
        );

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let filename = if attempt == 0 {
                format!("img_{}.txt", stamp)
            } else {
                format!("img_{}_{}.txt", stamp, attempt)
            };
            let path = self.dir.join(&filename);

            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            match file {
                Ok(mut f) => {
                    f.write_all(body.as_bytes())
                        .await
                        .with_context(|| format!("write capture {}", path.display()))?;
                    f.flush().await?;
                    return Ok(filename);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| format!("create capture {}", path.display()))
                }
            }
        }

        anyhow::bail!("no free capture file name for stamp {}", stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_artifact() {
        let dir = TempDir::new().unwrap();
        let writer = CaptureWriter::new(dir.path().join("uploads"));

        let name = writer.write(21.5, 105.25).await.unwrap();
        assert!(name.starts_with("img_"));
        assert!(name.ends_with(".txt"));

        let contents = std::fs::read_to_string(dir.path().join("uploads").join(&name)).unwrap();
        assert!(contents.starts_with("Simulated image at "));
        assert!(contents.contains("lat:21.5"));
        assert!(contents.contains("lon:105.25"));
    }

    #[tokio::test]
    async fn test_back_to_back_writes_get_distinct_names() {
        let dir = TempDir::new().unwrap();
        let writer = CaptureWriter::new(dir.path());

        let mut names = Vec::new();
        for _ in 0..5 {
            names.push(writer.write(0.0, 0.0).await.unwrap());
        }
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 5);
    }
}
