use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamError};
use crate::mjpeg::Frame;
use crate::transport::http::{self, MAX_BODY_SIZE};

/// One URL under which a camera serves a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamUrl {
    /// `mp4`, `mjpeg`, `jpeg`, or anything else the camera offers.
    pub format: String,
    pub url: String,
}

/// A named camera stream and its URLs, in the camera's order of preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub name: String,
    #[serde(default)]
    pub urls: Vec<StreamUrl>,
}

/// Where playback of a stream comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSource {
    /// Progressive MP4 (H.264), handed to an external player.
    Mp4(String),
    /// `multipart/x-mixed-replace` JPEG stream, read with
    /// [`MjpegReader`](crate::mjpeg::MjpegReader).
    Mjpeg(String),
}

impl PlaybackSource {
    pub fn url(&self) -> &str {
        match self {
            Self::Mp4(url) | Self::Mjpeg(url) => url,
        }
    }
}

/// The camera's stream list, as returned by `GET /api/v1/streams`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamCatalog {
    streams: Vec<StreamDescriptor>,
}

impl StreamCatalog {
    pub fn new(streams: Vec<StreamDescriptor>) -> Self {
        Self { streams }
    }

    pub fn from_json(json: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(json)?)
    }

    /// Fetch the catalog from a camera at `address` (`host[:port]`).
    pub async fn fetch(address: &str) -> Result<Self> {
        let url = api_url(address, "/streams");
        let (_, body) = http::get(&url, "application/json", MAX_BODY_SIZE).await?;
        let catalog = Self::from_json(&body)?;
        tracing::debug!(address, streams = catalog.streams.len(), "stream catalog fetched");
        Ok(catalog)
    }

    pub fn streams(&self) -> &[StreamDescriptor] {
        &self.streams
    }

    pub fn get(&self, name: &str) -> Option<&StreamDescriptor> {
        self.streams.iter().find(|s| s.name == name)
    }

    /// Pick the playback source for a stream: the first MP4 or MJPEG URL in
    /// the order the camera lists them.
    pub fn select(&self, name: &str) -> Result<PlaybackSource> {
        let stream = self
            .get(name)
            .ok_or_else(|| StreamError::UnknownStream(name.to_string()))?;

        stream
            .urls
            .iter()
            .find_map(|url| match url.format.as_str() {
                "mp4" => Some(PlaybackSource::Mp4(url.url.clone())),
                "mjpeg" => Some(PlaybackSource::Mjpeg(url.url.clone())),
                _ => None,
            })
            .ok_or_else(|| StreamError::NoPlayableSource(name.to_string()))
    }

    /// First still-picture URL offered by any stream.
    pub fn snapshot_url(&self) -> Option<&str> {
        self.streams
            .iter()
            .flat_map(|s| &s.urls)
            .find(|url| url.format == "jpeg")
            .map(|url| url.url.as_str())
    }
}

/// URL of a camera API endpoint.
///
/// ```
/// use camstream::playback::api_url;
///
/// assert_eq!(api_url("10.0.0.5", "/streams"), "http://10.0.0.5/api/v1/streams");
/// ```
pub fn api_url(address: &str, endpoint: &str) -> String {
    format!("http://{}/api/v1{}", address, endpoint)
}

/// Fetch a still picture, if the catalog offers one.
///
/// Pictures larger than [`MAX_BODY_SIZE`] fail with
/// [`StreamError::BodyTooLarge`].
pub async fn fetch_snapshot(catalog: &StreamCatalog) -> Result<Option<Frame>> {
    let Some(url) = catalog.snapshot_url() else {
        return Ok(None);
    };

    let (content_type, data) = http::get(url, "image/jpeg", MAX_BODY_SIZE).await?;
    let content_type = content_type.unwrap_or_else(|| "image/jpeg".to_string());

    tracing::debug!(url, size = data.len(), "snapshot fetched");
    Ok(Some(Frame { content_type, data }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[
        {"name": "main", "urls": [
            {"format": "rtsp", "url": "rtsp://cam/main"},
            {"format": "mjpeg", "url": "http://cam/main.mjpeg"},
            {"format": "mp4", "url": "http://cam/main.mp4"}
        ]},
        {"name": "sub", "urls": [
            {"format": "jpeg", "url": "http://cam/snapshot.jpg"},
            {"format": "mp4", "url": "http://cam/sub.mp4"}
        ]},
        {"name": "audio"}
    ]"#;

    fn catalog() -> StreamCatalog {
        StreamCatalog::from_json(CATALOG.as_bytes()).unwrap()
    }

    #[test]
    fn parse_catalog() {
        let catalog = catalog();
        assert_eq!(catalog.streams().len(), 3);
        assert_eq!(catalog.get("main").unwrap().urls.len(), 3);
        assert!(catalog.get("audio").unwrap().urls.is_empty());
    }

    #[test]
    fn select_uses_listed_order() {
        let catalog = catalog();
        assert_eq!(
            catalog.select("main").unwrap(),
            PlaybackSource::Mjpeg("http://cam/main.mjpeg".to_string())
        );
        assert_eq!(
            catalog.select("sub").unwrap(),
            PlaybackSource::Mp4("http://cam/sub.mp4".to_string())
        );
    }

    #[test]
    fn select_errors() {
        let catalog = catalog();
        assert!(matches!(
            catalog.select("missing"),
            Err(StreamError::UnknownStream(name)) if name == "missing"
        ));
        assert!(matches!(
            catalog.select("audio"),
            Err(StreamError::NoPlayableSource(_))
        ));
    }

    #[test]
    fn snapshot_url_searches_all_streams() {
        assert_eq!(catalog().snapshot_url(), Some("http://cam/snapshot.jpg"));
        assert_eq!(StreamCatalog::default().snapshot_url(), None);
    }

    #[test]
    fn invalid_json() {
        assert!(matches!(
            StreamCatalog::from_json(b"{not json"),
            Err(StreamError::Json(_))
        ));
    }
}
