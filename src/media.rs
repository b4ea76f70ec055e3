//! Client for the external image service. Uploads are multipart posts; the
//! transformed variants are plain URL rewrites so no second round-trip is
//! needed.

use crate::config::MediaConfig;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// Transformation applied when building a delivery URL.
#[derive(Debug, Clone, Copy)]
pub struct MediaTransform {
    pub width: u32,
    pub quality: &'static str,
    pub format: &'static str,
}

/// Profile pictures are delivered at 512px, covers and post images at 1280px,
/// all recompressed to webp.
pub const PROFILE_PICTURE: MediaTransform = MediaTransform {
    width: 512,
    quality: "auto",
    format: "webp",
};

pub const COVER_PHOTO: MediaTransform = MediaTransform {
    width: 1280,
    quality: "auto",
    format: "webp",
};

pub const POST_IMAGE: MediaTransform = MediaTransform {
    width: 1280,
    quality: "auto",
    format: "webp",
};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

#[derive(Debug, Clone)]
pub struct UploadedMedia {
    pub url: String,
}

#[derive(Clone)]
pub struct MediaService {
    config: MediaConfig,
    client: reqwest::Client,
}

impl MediaService {
    pub fn new(config: MediaConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub async fn upload(&self, data: Vec<u8>, file_name: &str) -> Result<UploadedMedia> {
        let upload_url = self
            .config
            .upload_url
            .as_deref()
            .ok_or_else(|| anyhow!("media service is not configured"))?;

        let mime = infer::get(&data)
            .map(|kind| kind.mime_type())
            .unwrap_or("application/octet-stream");

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = reqwest::multipart::Form::new()
            .text("fileName", file_name.to_string())
            .part("file", part);

        let mut request = self.client.post(upload_url).multipart(form);
        if let Some(key) = self.config.api_key.as_deref() {
            request = request.basic_auth(key, Some(""));
        }

        let response = request
            .send()
            .await
            .context("media upload request failed")?
            .error_for_status()
            .context("media service rejected upload")?;
        let body: UploadResponse = response
            .json()
            .await
            .context("media upload response was not valid JSON")?;
        Ok(UploadedMedia { url: body.url })
    }

    /// Appends the `tr=` transformation parameter to a stored URL.
    pub fn transformed_url(url: &str, transform: &MediaTransform) -> String {
        let separator = if url.contains('?') { '&' } else { '?' };
        format!(
            "{url}{separator}tr=w-{},q-{},f-{}",
            transform.width, transform.quality, transform.format
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_parameter_is_appended() {
        let url = MediaService::transformed_url("https://cdn.example/a.png", &PROFILE_PICTURE);
        assert_eq!(url, "https://cdn.example/a.png?tr=w-512,q-auto,f-webp");
    }

    #[test]
    fn transform_respects_existing_query() {
        let url = MediaService::transformed_url("https://cdn.example/a.png?v=2", &COVER_PHOTO);
        assert_eq!(url, "https://cdn.example/a.png?v=2&tr=w-1280,q-auto,f-webp");
    }

    #[tokio::test]
    async fn upload_without_configuration_fails() {
        let service = MediaService::new(MediaConfig::default(), reqwest::Client::new());
        let result = service.upload(vec![1, 2, 3], "a.png").await;
        assert!(result.is_err());
    }
}
