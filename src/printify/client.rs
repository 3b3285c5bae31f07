use crate::config::Settings;
use crate::http::build_client;
use crate::printify::payloads::{
    CatalogVariant, CreateProductRequest, CreateProductResponse, PublishProductRequest,
    UploadImageRequest, UploadImageResponse, VariantsEnvelope,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrintifyError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
}

impl PrintifyError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The slice of the print-on-demand REST surface the publisher needs.
#[async_trait]
pub trait PrintProvider: Send + Sync {
    async fn upload_image(
        &self,
        request: &UploadImageRequest,
    ) -> Result<UploadImageResponse, PrintifyError>;

    /// Full variant catalog, out-of-stock entries included.
    async fn fetch_variants(
        &self,
        blueprint_id: u64,
        print_provider_id: u64,
    ) -> Result<Vec<CatalogVariant>, PrintifyError>;

    async fn create_product(
        &self,
        shop_id: u64,
        request: &CreateProductRequest,
    ) -> Result<CreateProductResponse, PrintifyError>;

    async fn publish_product(&self, shop_id: u64, product_id: &str) -> Result<(), PrintifyError>;
}

#[derive(Clone)]
pub struct PrintifyClient {
    http: Client,
    base_url: String,
    token: String,
}

impl PrintifyClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: build_client(settings),
            base_url: settings.api_base.clone(),
            token: settings.api_token.clone(),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, PrintifyError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| PrintifyError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(target = "printdrop.printify", status = status.as_u16(), body = %body, "provider_error");
            return Err(PrintifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, PrintifyError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|err| PrintifyError::Decode(err.to_string()))
    }
}

#[async_trait]
impl PrintProvider for PrintifyClient {
    async fn upload_image(
        &self,
        request: &UploadImageRequest,
    ) -> Result<UploadImageResponse, PrintifyError> {
        let url = format!("{}/uploads/images.json", self.base_url);
        self.send_json(self.http.post(url).json(request)).await
    }

    async fn fetch_variants(
        &self,
        blueprint_id: u64,
        print_provider_id: u64,
    ) -> Result<Vec<CatalogVariant>, PrintifyError> {
        let url = format!(
            "{}/catalog/blueprints/{blueprint_id}/print_providers/{print_provider_id}/variants.json",
            self.base_url
        );
        let envelope: VariantsEnvelope = self
            .send_json(self.http.get(url).query(&[("show-out-of-stock", "1")]))
            .await?;
        Ok(envelope.into_variants())
    }

    async fn create_product(
        &self,
        shop_id: u64,
        request: &CreateProductRequest,
    ) -> Result<CreateProductResponse, PrintifyError> {
        let url = format!("{}/shops/{shop_id}/products.json", self.base_url);
        self.send_json(self.http.post(url).json(request)).await
    }

    async fn publish_product(&self, shop_id: u64, product_id: &str) -> Result<(), PrintifyError> {
        let url = format!(
            "{}/shops/{shop_id}/products/{}/publish.json",
            self.base_url,
            urlencoding::encode(product_id)
        );
        self.send(self.http.post(url).json(&PublishProductRequest::everything()))
            .await?;
        Ok(())
    }
}
