use crate::printify::client::{PrintProvider, PrintifyError};
use crate::printify::payloads::{
    CatalogVariant, CreateProductRequest, CreateProductResponse, UploadImageRequest,
    UploadImageResponse,
};
use async_trait::async_trait;
use std::{sync::Mutex, time::Duration};

#[derive(Debug, Clone)]
pub enum Call {
    Upload(UploadImageRequest),
    FetchVariants {
        blueprint_id: u64,
        print_provider_id: u64,
    },
    CreateProduct {
        shop_id: u64,
        request: CreateProductRequest,
    },
    Publish {
        shop_id: u64,
        product_id: String,
    },
}

/// Recording provider with canned answers.
pub struct MockProvider {
    upload: Result<UploadImageResponse, PrintifyError>,
    variants: Result<Vec<CatalogVariant>, PrintifyError>,
    product: Result<CreateProductResponse, PrintifyError>,
    publish: Result<(), PrintifyError>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
}

pub fn variant(id: u64, title: &str) -> CatalogVariant {
    CatalogVariant {
        id,
        title: title.to_string(),
        available: true,
    }
}

pub fn http_error(status: u16, body: &str) -> PrintifyError {
    PrintifyError::Status {
        status,
        body: body.to_string(),
    }
}

impl MockProvider {
    /// Asset `A1`, variants `101..=103`, product `P9`.
    pub fn happy() -> Self {
        Self {
            upload: Ok(UploadImageResponse {
                id: "A1".into(),
                file_name: None,
                mime_type: None,
            }),
            variants: Ok(vec![
                variant(101, "Black / S"),
                variant(102, "Black / M"),
                variant(103, "White / L"),
            ]),
            product: Ok(CreateProductResponse {
                id: "P9".into(),
                shop_id: Some(42),
            }),
            publish: Ok(()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_upload(mut self, result: Result<UploadImageResponse, PrintifyError>) -> Self {
        self.upload = result;
        self
    }

    pub fn with_variants(mut self, result: Result<Vec<CatalogVariant>, PrintifyError>) -> Self {
        self.variants = result;
        self
    }

    pub fn with_product(mut self, result: Result<CreateProductResponse, PrintifyError>) -> Self {
        self.product = result;
        self
    }

    pub fn with_publish(mut self, result: Result<(), PrintifyError>) -> Self {
        self.publish = result;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created_products(&self) -> Vec<(u64, CreateProductRequest)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CreateProduct { shop_id, request } => Some((shop_id, request)),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl PrintProvider for MockProvider {
    async fn upload_image(
        &self,
        request: &UploadImageRequest,
    ) -> Result<UploadImageResponse, PrintifyError> {
        self.record(Call::Upload(request.clone())).await;
        self.upload.clone()
    }

    async fn fetch_variants(
        &self,
        blueprint_id: u64,
        print_provider_id: u64,
    ) -> Result<Vec<CatalogVariant>, PrintifyError> {
        self.record(Call::FetchVariants {
            blueprint_id,
            print_provider_id,
        })
        .await;
        self.variants.clone()
    }

    async fn create_product(
        &self,
        shop_id: u64,
        request: &CreateProductRequest,
    ) -> Result<CreateProductResponse, PrintifyError> {
        self.record(Call::CreateProduct {
            shop_id,
            request: request.clone(),
        })
        .await;
        self.product.clone()
    }

    async fn publish_product(&self, shop_id: u64, product_id: &str) -> Result<(), PrintifyError> {
        self.record(Call::Publish {
            shop_id,
            product_id: product_id.to_string(),
        })
        .await;
        self.publish.clone()
    }
}
