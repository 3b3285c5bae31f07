use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use image::{DynamicImage, ImageFormat, codecs::jpeg::JpegEncoder};
use reqwest::Url;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

pub const MIME_PNG: &str = "image/png";
pub const MIME_JPEG: &str = "image/jpeg";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("{0}")]
    InvalidEncoding(String),
}

/// An image reference as handed to the pipeline.
#[derive(Debug, Clone)]
pub enum ImageSource {
    DataUrl(String),
    Remote(Url),
    Raw { bytes: Vec<u8>, mime: String },
}

impl ImageSource {
    /// Classifies a string reference: `data:` URLs are decoded locally,
    /// `http(s)` URLs are fetched by the provider.
    pub fn parse(reference: &str) -> Result<Self, NormalizeError> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(NormalizeError::InvalidEncoding(
                "image reference is empty".into(),
            ));
        }
        if trimmed.starts_with("data:") {
            return Ok(Self::DataUrl(trimmed.to_string()));
        }
        let url = Url::parse(trimmed).map_err(|_| {
            NormalizeError::InvalidEncoding(format!("unrecognized image reference: {trimmed}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NormalizeError::InvalidEncoding(format!(
                "unsupported_url_scheme: {}",
                url.scheme()
            )));
        }
        Ok(Self::Remote(url))
    }
}

/// Decoded image bytes. Only lives for the duration of normalization.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub has_alpha: bool,
}

/// What the uploader sends: inline bytes or a URL the provider fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedImage {
    Inline {
        file_name: String,
        bytes: Vec<u8>,
        mime: String,
        recompressed: bool,
    },
    Remote {
        file_name: String,
        url: String,
    },
}

impl NormalizedImage {
    pub fn file_name(&self) -> &str {
        match self {
            Self::Inline { file_name, .. } | Self::Remote { file_name, .. } => file_name,
        }
    }
}

pub fn normalize(source: ImageSource, jpeg_quality: u8) -> Result<NormalizedImage, NormalizeError> {
    match source {
        ImageSource::DataUrl(raw) => {
            let (mime, bytes) = decode_data_url(&raw)?;
            Ok(normalize_bytes(bytes, mime, jpeg_quality))
        }
        ImageSource::Raw { bytes, mime } => {
            if bytes.is_empty() {
                return Err(NormalizeError::InvalidEncoding("image bytes are empty".into()));
            }
            Ok(normalize_bytes(bytes, mime_essence(&mime), jpeg_quality))
        }
        ImageSource::Remote(url) => Ok(NormalizedImage::Remote {
            file_name: file_name_from_url(&url),
            url: url.to_string(),
        }),
    }
}

/// Splits `data:<mime>;base64,<payload>` and decodes the payload.
pub fn decode_data_url(raw: &str) -> Result<(String, Vec<u8>), NormalizeError> {
    let invalid = || NormalizeError::InvalidEncoding("expected data:<mime>;base64,<payload>".into());
    let rest = raw.strip_prefix("data:").ok_or_else(invalid)?;
    let (mime, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;
    let mime = mime_essence(mime);
    if mime.is_empty() || !mime.contains('/') || mime.contains(char::is_whitespace) {
        return Err(invalid());
    }
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(NormalizeError::InvalidEncoding("data URL payload is empty".into()));
    }
    let bytes = BASE64
        .decode(payload)
        .map_err(|err| NormalizeError::InvalidEncoding(format!("invalid base64 payload: {err}")))?;
    Ok((mime, bytes))
}

/// `image/png;name=a.png` → `image/png`.
fn mime_essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

fn normalize_bytes(bytes: Vec<u8>, mime: String, jpeg_quality: u8) -> NormalizedImage {
    let (asset, decoded) = inspect(bytes, mime);
    let (bytes, mime, recompressed) = match decoded {
        Some(image) if !asset.has_alpha => match encode_jpeg(&image, jpeg_quality) {
            Ok(jpeg) => {
                debug!(
                    target = "printdrop.artwork",
                    original_bytes = asset.bytes.len(),
                    jpeg_bytes = jpeg.len(),
                    quality = jpeg_quality,
                    "png_recompressed"
                );
                (jpeg, MIME_JPEG.to_string(), true)
            }
            Err(err) => {
                warn!(target = "printdrop.artwork", error = %err, "recompression_failed_keeping_original");
                (asset.bytes, asset.mime, false)
            }
        },
        _ => (asset.bytes, asset.mime, false),
    };
    NormalizedImage::Inline {
        file_name: generated_file_name(&mime),
        bytes,
        mime,
        recompressed,
    }
}

/// Derives the alpha flag for PNG payloads and hands back the decoded
/// pixels; other formats pass through undecoded.
fn inspect(bytes: Vec<u8>, mime: String) -> (ImageAsset, Option<DynamicImage>) {
    let decoded = if mime == MIME_PNG {
        match image::load_from_memory_with_format(&bytes, ImageFormat::Png) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(target = "printdrop.artwork", error = %err, "png_decode_failed");
                None
            }
        }
    } else {
        None
    };
    let has_alpha = match &decoded {
        Some(image) => image.color().has_alpha(),
        // unknown; keep the bytes as they are
        None => mime == MIME_PNG,
    };
    let asset = ImageAsset {
        bytes,
        mime,
        has_alpha,
    };
    (asset, decoded)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = image.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(out)
}

fn file_name_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("image-{}", Uuid::new_v4().simple()))
}

fn generated_file_name(mime: &str) -> String {
    let ext = match mime {
        MIME_JPEG => "jpg",
        MIME_PNG => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        other => other
            .rsplit('/')
            .next()
            .filter(|ext| !ext.is_empty() && ext.chars().all(|ch| ch.is_ascii_alphanumeric()))
            .unwrap_or("bin"),
    };
    format!("upload-{}.{ext}", Uuid::new_v4().simple())
}
