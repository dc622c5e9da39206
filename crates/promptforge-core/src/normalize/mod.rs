//! Image normalization for transport
//!
//! Vision providers enforce payload and timeout limits; raw generated images
//! routinely blow past them. Every image is therefore resized to a bounded
//! edge length, flattened onto an opaque white background (alpha survives
//! JPEG encoding badly), and recompressed before it goes on the wire.

use std::io::Cursor;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use reqwest::Client as HttpClient;
use tracing::debug;

use crate::error::{Error, Result};

/// Longest edge after normalization; smaller images are never upscaled
const MAX_EDGE: u32 = 1024;

/// JPEG quality for the transport encoding
const JPEG_QUALITY: u8 = 70;

/// Default fetch timeout for remote image sources
const FETCH_TIMEOUT_SECS: u64 = 60;

/// Converts any supported image source into a bounded base64 JPEG payload.
///
/// Supported sources: `data:image/...;base64,` URLs, http(s) URLs, and local
/// asset paths. The returned string is the bare base64 payload with no
/// data-URL prefix; callers add whatever prefix their provider expects.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    http_client: HttpClient,
}

impl ImageNormalizer {
    /// Create a normalizer with the default fetch timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout_secs(FETCH_TIMEOUT_SECS)
    }

    /// Create a normalizer with a custom fetch timeout
    pub fn with_timeout_secs(secs: u64) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(secs))
            .build()
            .map_err(Error::Network)?;
        Ok(Self { http_client })
    }

    /// Load, bound, flatten, and recompress an image source
    pub async fn normalize(&self, source: &str) -> Result<String> {
        let bytes = self.load_bytes(source).await?;
        let payload = encode_for_transport(&bytes)?;
        debug!(
            source_bytes = bytes.len(),
            payload_chars = payload.len(),
            "Normalized image for transport"
        );
        Ok(payload)
    }

    async fn load_bytes(&self, source: &str) -> Result<Vec<u8>> {
        if source.starts_with("data:image/") {
            return decode_data_url(source);
        }

        if source.starts_with("http://") || source.starts_with("https://") {
            let response = self
                .http_client
                .get(source)
                .send()
                .await
                .map_err(|e| Error::ImageLoad(format!("failed to fetch {}: {}", source, e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::ImageLoad(format!(
                    "failed to fetch image: {} from {}",
                    status, source
                )));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| Error::ImageLoad(format!("failed to read {}: {}", source, e)))?;
            return Ok(bytes.to_vec());
        }

        if source.starts_with("blob:") {
            return Err(Error::ImageLoad(
                "blob: URLs are only resolvable inside a browser session".to_string(),
            ));
        }

        // Anything else is treated as a local asset path
        tokio::fs::read(source)
            .await
            .map_err(|e| Error::ImageLoad(format!("{}: {}", source, e)))
    }
}

/// Extract the payload of a base64 data URL
fn decode_data_url(source: &str) -> Result<Vec<u8>> {
    let payload = source
        .split_once("base64,")
        .map(|(_, rest)| rest)
        .ok_or_else(|| Error::ImageLoad("invalid data URL: missing base64 payload".to_string()))?;

    BASE64
        .decode(payload.trim())
        .map_err(|e| Error::ImageLoad(format!("invalid base64 in data URL: {}", e)))
}

/// Decode, bound, flatten, and re-encode raw image bytes as base64 JPEG
fn encode_for_transport(bytes: &[u8]) -> Result<String> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| Error::ImageLoad(format!("failed to decode image: {}", e)))?;

    let img = if img.width().max(img.height()) > MAX_EDGE {
        img.resize(MAX_EDGE, MAX_EDGE, FilterType::Lanczos3)
    } else {
        img
    };

    let flattened = flatten_onto_white(&img);

    let mut output = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY);
    flattened
        .write_with_encoder(encoder)
        .map_err(|e| Error::ImageLoad(format!("failed to encode image: {}", e)))?;

    Ok(BASE64.encode(output.into_inner()))
}

/// Composite onto an opaque white background to strip alpha
fn flatten_onto_white(img: &DynamicImage) -> DynamicImage {
    let mut background =
        RgbaImage::from_pixel(img.width(), img.height(), Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut background, &img.to_rgba8(), 0, 0);
    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(background).to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn png_bytes(width: u32, height: u32, pixel: Rgba<u8>) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, pixel));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn decode_payload(payload: &str) -> DynamicImage {
        let bytes = BASE64.decode(payload).unwrap();
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn test_large_image_downscaled_preserving_aspect() {
        let bytes = png_bytes(2000, 1000, Rgba([10, 20, 30, 255]));
        let payload = encode_for_transport(&bytes).unwrap();
        let decoded = decode_payload(&payload);
        assert_eq!(decoded.dimensions(), (1024, 512));
    }

    #[test]
    fn test_small_image_not_upscaled() {
        let bytes = png_bytes(300, 200, Rgba([10, 20, 30, 255]));
        let payload = encode_for_transport(&bytes).unwrap();
        let decoded = decode_payload(&payload);
        assert_eq!(decoded.dimensions(), (300, 200));
    }

    #[test]
    fn test_transparency_flattened_to_white() {
        // Fully transparent input should come back white, not black
        let bytes = png_bytes(8, 8, Rgba([0, 0, 0, 0]));
        let payload = encode_for_transport(&bytes).unwrap();
        let decoded = decode_payload(&payload).to_rgb8();
        let pixel = decoded.get_pixel(4, 4);
        assert!(pixel[0] > 240 && pixel[1] > 240 && pixel[2] > 240);
    }

    #[test]
    fn test_output_is_jpeg() {
        let bytes = png_bytes(16, 16, Rgba([200, 100, 50, 255]));
        let payload = encode_for_transport(&bytes).unwrap();
        let raw = BASE64.decode(payload).unwrap();
        assert!(raw.starts_with(&[0xFF, 0xD8, 0xFF]));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let result = encode_for_transport(&[0x00, 0x01, 0x02, 0x03]);
        assert!(matches!(result, Err(Error::ImageLoad(_))));
    }

    #[tokio::test]
    async fn test_data_url_round_trip() {
        let bytes = png_bytes(32, 32, Rgba([1, 2, 3, 255]));
        let data_url = format!("data:image/png;base64,{}", BASE64.encode(&bytes));

        let normalizer = ImageNormalizer::new().unwrap();
        let payload = normalizer.normalize(&data_url).await.unwrap();
        assert_eq!(decode_payload(&payload).dimensions(), (32, 32));
    }

    #[tokio::test]
    async fn test_malformed_data_url_rejected() {
        let normalizer = ImageNormalizer::new().unwrap();
        let result = normalizer.normalize("data:image/png;bogus").await;
        assert!(matches!(result, Err(Error::ImageLoad(_))));
    }

    #[tokio::test]
    async fn test_blob_url_rejected() {
        let normalizer = ImageNormalizer::new().unwrap();
        let result = normalizer.normalize("blob:https://app.example/1234").await;
        assert!(matches!(result, Err(Error::ImageLoad(_))));
    }

    #[tokio::test]
    async fn test_missing_file_rejected() {
        let normalizer = ImageNormalizer::new().unwrap();
        let result = normalizer.normalize("/nonexistent/target.png").await;
        assert!(matches!(result, Err(Error::ImageLoad(_))));
    }
}
