use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::BTreeMap;

/// `POST /uploads/images.json`. Exactly one of `url` / `contents` is set.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadImageRequest {
    pub file_name: String,
    pub url: Option<String>,
    pub contents: Option<String>,
}

impl UploadImageRequest {
    pub fn by_url(file_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            url: Some(url.into()),
            contents: None,
        }
    }

    pub fn inline(file_name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            file_name: file_name.into(),
            url: None,
            contents: Some(BASE64.encode(bytes)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadImageResponse {
    pub id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogVariant {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default = "available_by_default", alias = "is_available")]
    pub available: bool,
}

fn available_by_default() -> bool {
    true
}

/// The catalog endpoint answers either with a bare list or wrapped in an
/// object next to the blueprint metadata.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum VariantsEnvelope {
    Wrapped { variants: Vec<CatalogVariant> },
    Bare(Vec<CatalogVariant>),
}

impl VariantsEnvelope {
    pub fn into_variants(self) -> Vec<CatalogVariant> {
        match self {
            Self::Wrapped { variants } | Self::Bare(variants) => variants,
        }
    }
}

/// `POST /shops/{shop_id}/products.json`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateProductRequest {
    pub title: String,
    pub description: String,
    pub blueprint_id: u64,
    pub print_provider_id: u64,
    pub variants: Vec<VariantPayload>,
    pub print_areas: PrintAreasPayload,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VariantPayload {
    pub id: u64,
    pub price: u32,
    pub is_enabled: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum PrintAreasPayload {
    /// `{ "front": [{ image_id, x, y, scale, angle }] }`
    Flat(BTreeMap<String, Vec<FlatImagePayload>>),
    /// `[{ variant_ids, placeholders: [{ position, images }] }]`
    Grouped(Vec<PrintAreaPayload>),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FlatImagePayload {
    pub image_id: String,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub angle: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PrintAreaPayload {
    pub variant_ids: Vec<u64>,
    pub placeholders: Vec<PlaceholderPayload>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlaceholderPayload {
    pub position: String,
    pub images: Vec<ImagePayload>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImagePayload {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub angle: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductResponse {
    pub id: String,
    #[serde(default)]
    pub shop_id: Option<u64>,
}

/// `POST /shops/{shop_id}/products/{product_id}/publish.json`.
#[derive(Debug, Clone, Serialize)]
pub struct PublishProductRequest {
    pub title: bool,
    pub description: bool,
    pub images: bool,
    pub variants: bool,
    pub tags: bool,
}

impl PublishProductRequest {
    pub fn everything() -> Self {
        Self {
            title: true,
            description: true,
            images: true,
            variants: true,
            tags: true,
        }
    }
}
