use crate::cancel::CancelToken;
use crate::printify::client::{PrintProvider, PrintifyError};
use crate::printify::payloads::{
    CatalogVariant, CreateProductRequest, CreateProductResponse, UploadImageRequest,
    UploadImageResponse,
};
use async_trait::async_trait;
use std::{future::Future, sync::Arc, time::Duration};

/// Applies the per-call timeout and the attempt's cancellation signal to
/// every call on the wrapped provider.
#[derive(Clone)]
pub struct Guarded {
    inner: Arc<dyn PrintProvider>,
    cancel: CancelToken,
    timeout: Duration,
}

impl Guarded {
    pub fn new(inner: Arc<dyn PrintProvider>, cancel: CancelToken, timeout: Duration) -> Self {
        Self {
            inner,
            cancel,
            timeout,
        }
    }

    async fn limit<T, Fut>(&self, fut: Fut) -> Result<T, PrintifyError>
    where
        Fut: Future<Output = Result<T, PrintifyError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(PrintifyError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PrintifyError::Cancelled),
            outcome = tokio::time::timeout(self.timeout, fut) => {
                outcome.unwrap_or(Err(PrintifyError::Timeout(self.timeout)))
            }
        }
    }
}

#[async_trait]
impl PrintProvider for Guarded {
    async fn upload_image(
        &self,
        request: &UploadImageRequest,
    ) -> Result<UploadImageResponse, PrintifyError> {
        self.limit(self.inner.upload_image(request)).await
    }

    async fn fetch_variants(
        &self,
        blueprint_id: u64,
        print_provider_id: u64,
    ) -> Result<Vec<CatalogVariant>, PrintifyError> {
        self.limit(self.inner.fetch_variants(blueprint_id, print_provider_id))
            .await
    }

    async fn create_product(
        &self,
        shop_id: u64,
        request: &CreateProductRequest,
    ) -> Result<CreateProductResponse, PrintifyError> {
        self.limit(self.inner.create_product(shop_id, request)).await
    }

    async fn publish_product(&self, shop_id: u64, product_id: &str) -> Result<(), PrintifyError> {
        self.limit(self.inner.publish_product(shop_id, product_id))
            .await
    }
}
