//! FrameSource - Frame Acquisition from the Camera
//!
//! ## Responsibilities
//!
//! - Acquire/release the camera for a monitoring session
//! - Return one JPEG frame per tick
//!
//! Acquisition and capture failures both surface as `CameraUnavailable`.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::fs;

/// JPEG start-of-image marker
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Camera abstraction consumed by the session controller
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Acquire the device for a session
    async fn acquire(&self) -> Result<()>;

    /// Grab the current frame as JPEG bytes
    async fn get_frame(&self) -> Result<Vec<u8>>;

    /// Release the device
    async fn release(&self);

    /// Short description for logs
    fn describe(&self) -> String;
}

fn ensure_jpeg(data: &[u8], origin: &str) -> Result<()> {
    if data.is_empty() {
        return Err(Error::CameraUnavailable(format!("{} returned an empty frame", origin)));
    }
    if !data.starts_with(&JPEG_SOI) {
        return Err(Error::CameraUnavailable(format!("{} did not return a JPEG frame", origin)));
    }
    Ok(())
}

/// Frame source backed by a camera's HTTP snapshot endpoint
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    snapshot_url: String,
    acquired: AtomicBool,
}

impl HttpSnapshotSource {
    /// Create new snapshot source
    pub fn new(snapshot_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            snapshot_url,
            acquired: AtomicBool::new(false),
        })
    }

    async fn capture_http(&self) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(&self.snapshot_url)
            .send()
            .await
            .map_err(|e| Error::CameraUnavailable(format!("snapshot request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(Error::CameraUnavailable(format!(
                "Snapshot HTTP error: {}",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::CameraUnavailable(format!("snapshot body read failed: {}", e)))?;

        ensure_jpeg(&bytes, "snapshot endpoint")?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl FrameSource for HttpSnapshotSource {
    async fn acquire(&self) -> Result<()> {
        // Probe once so a dead camera fails the session start
        let probe = self.capture_http().await?;
        self.acquired.store(true, Ordering::SeqCst);

        tracing::info!(
            snapshot_url = %self.snapshot_url,
            size = probe.len(),
            "Snapshot source acquired"
        );
        Ok(())
    }

    async fn get_frame(&self) -> Result<Vec<u8>> {
        if !self.acquired.load(Ordering::SeqCst) {
            return Err(Error::CameraUnavailable("snapshot source not acquired".to_string()));
        }

        let data = self.capture_http().await?;
        tracing::debug!(size = data.len(), source = "http", "Frame captured");
        Ok(data)
    }

    async fn release(&self) {
        if self.acquired.swap(false, Ordering::SeqCst) {
            tracing::info!(snapshot_url = %self.snapshot_url, "Snapshot source released");
        }
    }

    fn describe(&self) -> String {
        format!("http:{}", self.snapshot_url)
    }
}

/// Frame source that re-reads a JPEG file on every tick (bench setups, replay)
pub struct FileFrameSource {
    path: PathBuf,
    acquired: AtomicBool,
}

impl FileFrameSource {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            acquired: AtomicBool::new(false),
        }
    }

    async fn read_frame(&self) -> Result<Vec<u8>> {
        let data = fs::read(&self.path).await.map_err(|e| {
            Error::CameraUnavailable(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        ensure_jpeg(&data, &self.path.display().to_string())?;
        Ok(data)
    }
}

#[async_trait]
impl FrameSource for FileFrameSource {
    async fn acquire(&self) -> Result<()> {
        self.read_frame().await?;
        self.acquired.store(true, Ordering::SeqCst);
        tracing::info!(path = %self.path.display(), "File frame source acquired");
        Ok(())
    }

    async fn get_frame(&self) -> Result<Vec<u8>> {
        if !self.acquired.load(Ordering::SeqCst) {
            return Err(Error::CameraUnavailable("file source not acquired".to_string()));
        }
        self.read_frame().await
    }

    async fn release(&self) {
        self.acquired.store(false, Ordering::SeqCst);
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_jpeg() {
        assert!(ensure_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0], "test").is_ok());
        assert!(matches!(
            ensure_jpeg(&[], "test"),
            Err(Error::CameraUnavailable(_))
        ));
        assert!(matches!(
            ensure_jpeg(b"\x89PNG", "test"),
            Err(Error::CameraUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_file_source_lifecycle() {
        let path = std::env::temp_dir().join(format!("zoneguard-{}.jpg", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9]).await.unwrap();

        let source = FileFrameSource::new(path.clone());
        assert!(source.get_frame().await.is_err());

        source.acquire().await.unwrap();
        assert_eq!(source.get_frame().await.unwrap(), vec![0xFF, 0xD8, 0xFF, 0xD9]);

        source.release().await;
        assert!(source.get_frame().await.is_err());

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_camera_unavailable() {
        let source = FileFrameSource::new(PathBuf::from("/nonexistent/zoneguard/frame.jpg"));
        let err = source.acquire().await.unwrap_err();
        assert!(matches!(err, Error::CameraUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_snapshot_url_fails_acquire() {
        let source =
            HttpSnapshotSource::new("http://127.0.0.1:9/snapshot.jpg".to_string(), Duration::from_millis(500))
                .unwrap();
        let err = source.acquire().await.unwrap_err();
        assert!(matches!(err, Error::CameraUnavailable(_)));
    }
}
