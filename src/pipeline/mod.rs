pub mod catalog;
pub mod publisher;
pub mod stages;

use crate::artwork::{ImageSource, NormalizeError};
use crate::cancel::CancelToken;
use crate::config::Settings;
use crate::models::{PublishRequest, PublishResponse, StageReport};
use crate::printify::{Guarded, PrintProvider, PrintifyClient, PrintifyError};
use catalog::VariantPreferences;
use publisher::{ProductTemplate, PublishTarget};
use serde_json::Value;
use stages::RemoteAssetReference;
use std::{fmt, future::Future, sync::Arc, time::Instant};
use thiserror::Error;
use tokio::task::{AbortHandle, JoinError};
use tracing::{info, warn};
use uuid::Uuid;

/// Image reference in, purchasable product out.
///
/// Each call to [`Pipeline::run`] is an independent attempt: nothing is
/// shared between attempts except the immutable settings and the provider
/// client. A failed attempt is not resumed; calling `run` again starts
/// from scratch and uploads the image again as a new remote asset.
#[derive(Clone)]
pub struct Pipeline {
    pub settings: Arc<Settings>,
    provider: Arc<dyn PrintProvider>,
}

impl Pipeline {
    pub fn new(settings: Arc<Settings>, provider: Arc<dyn PrintProvider>) -> Self {
        Self { settings, provider }
    }

    pub fn from_settings(settings: Arc<Settings>) -> Self {
        let provider = Arc::new(PrintifyClient::new(&settings));
        Self::new(settings, provider)
    }

    pub async fn run(
        &self,
        request: PublishRequest,
        cancel: &CancelToken,
    ) -> Result<PublishResponse, PipelineError> {
        let mut attempt = Attempt::start();
        let result = self.drive(&mut attempt, request, cancel).await;
        match &result {
            Ok(response) => {
                attempt.advance(PublishState::Published);
                info!(
                    target = "printdrop.pipeline",
                    attempt = %attempt.id,
                    product_id = %response.product_id,
                    "publish_succeeded"
                );
                crate::metrics::attempt_finished("published");
            }
            Err(err) => {
                attempt.fail(err);
                crate::metrics::attempt_finished(err.stage());
            }
        }
        result
    }

    async fn drive(
        &self,
        attempt: &mut Attempt,
        request: PublishRequest,
        cancel: &CancelToken,
    ) -> Result<PublishResponse, PipelineError> {
        let reference = request
            .image_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| PipelineError::InvalidEncoding("imageUrl is required".into()))?;
        let source = ImageSource::parse(reference)?;

        // Fail before touching the provider when the shop is not configured.
        if self.settings.api_token.trim().is_empty() {
            return Err(PipelineError::ConfigurationError(
                "PRINTIFY_API_TOKEN is not set".into(),
            ));
        }
        let target = PublishTarget::from_settings(&self.settings)?;
        let template = ProductTemplate::from_settings(&self.settings, request.title, request.description);

        let provider = Arc::new(Guarded::new(
            self.provider.clone(),
            cancel.clone(),
            self.settings.request_timeout,
        ));
        let mut reports = Vec::new();

        let mut catalog = tokio::spawn({
            let provider = provider.clone();
            let preferences = VariantPreferences::from_settings(&self.settings);
            async move {
                timed(
                    "resolve_variants",
                    catalog::resolve_variants(
                        provider.as_ref(),
                        target.blueprint_id,
                        target.print_provider_id,
                        &preferences,
                    ),
                )
                .await
            }
        });
        let _catalog_guard = AbortOnDrop(catalog.abort_handle());

        attempt.advance(PublishState::Normalizing);
        let (uploaded, resolved) = {
            let upload = self.normalize_and_upload(attempt, source, provider.as_ref());
            tokio::pin!(upload);
            // A catalog leg that has already failed drops the upload before it
            // reaches the provider.
            let first = tokio::select! {
                biased;
                joined = &mut catalog => Leg::Catalog(joined),
                uploaded = &mut upload => Leg::Upload(uploaded),
            };
            match first {
                Leg::Catalog(joined) => {
                    let resolved = require_variants(joined, target)?;
                    (upload.await?, Ok(resolved))
                }
                Leg::Upload(uploaded) => (uploaded?, require_variants(catalog.await, target)),
            }
        };
        let (asset, upload_reports) = uploaded;
        reports.extend(upload_reports);

        attempt.advance(PublishState::ResolvingVariants);
        if let Err(err) = &resolved {
            report_orphan(attempt, &asset, err);
        }
        let (variant_ids, report) = resolved?;
        reports.push(report);

        attempt.advance(PublishState::Submitting);
        let submitted = timed(
            "create_product",
            publisher::publish_product(
                provider.as_ref(),
                &self.settings,
                &template,
                &asset,
                &variant_ids,
            ),
        )
        .await;
        if let Err(err) = &submitted {
            report_orphan(attempt, &asset, err);
        }
        let (product, report) = submitted?;
        reports.push(report);

        Ok(PublishResponse {
            product_id: product.product_id,
            shop_id: product.shop_id,
            attempt_id: attempt.id.to_string(),
            stages: reports,
        })
    }
}

impl Pipeline {
    async fn normalize_and_upload(
        &self,
        attempt: &mut Attempt,
        source: ImageSource,
        provider: &dyn PrintProvider,
    ) -> Result<(RemoteAssetReference, Vec<StageReport>), PipelineError> {
        let (normalized, normalized_report) = timed(
            "normalize_image",
            stages::normalize_image(source, self.settings.jpeg_quality),
        )
        .await?;

        attempt.advance(PublishState::Uploading);
        let (asset, upload_report) =
            timed("upload_asset", stages::upload_asset(provider, &normalized)).await?;
        Ok((asset, vec![normalized_report, upload_report]))
    }
}

enum Leg<C, U> {
    Catalog(C),
    Upload(U),
}

type CatalogResult = Result<(Vec<u64>, StageReport), PipelineError>;

/// An empty selection is fatal here, so it is reported as soon as the
/// catalog leg returns.
fn require_variants(
    joined: Result<CatalogResult, JoinError>,
    target: PublishTarget,
) -> CatalogResult {
    let (variant_ids, report) = joined
        .map_err(|err| PipelineError::Internal(format!("catalog task failed: {err}")))??;
    if variant_ids.is_empty() {
        return Err(PipelineError::ConfigurationError(format!(
            "no catalog variants for blueprint {} / print provider {}",
            target.blueprint_id, target.print_provider_id
        )));
    }
    Ok((variant_ids, report))
}

/// Uploaded assets are left on the provider when a later stage fails; the
/// event below is the hook for out-of-band reconciliation.
fn report_orphan(attempt: &Attempt, asset: &RemoteAssetReference, err: &PipelineError) {
    warn!(
        target = "printdrop.pipeline",
        attempt = %attempt.id,
        asset_id = %asset.id,
        file_name = %asset.file_name,
        stage = err.stage(),
        "orphaned_asset"
    );
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn timed<T, Fut>(name: &'static str, fut: Fut) -> Result<(T, StageReport), PipelineError>
where
    Fut: Future<Output = Result<StageOutcome<T>, PipelineError>>,
{
    let started = Instant::now();
    let outcome = fut.await?;
    let elapsed_ms = started.elapsed().as_millis();
    crate::metrics::stage_elapsed(name, elapsed_ms);
    Ok((outcome.value, StageReport::new(name, elapsed_ms, outcome.output)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Draft,
    Normalizing,
    Uploading,
    ResolvingVariants,
    Submitting,
    Published,
    Failed,
}

impl PublishState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Published | Self::Failed)
    }

    pub fn can_advance_to(self, next: Self) -> bool {
        use PublishState::*;
        match (self, next) {
            (Published | Failed, _) => false,
            (_, Failed) => true,
            (Draft, Normalizing)
            | (Normalizing, Uploading)
            | (Uploading, ResolvingVariants)
            | (ResolvingVariants, Submitting)
            | (Submitting, Published) => true,
            _ => false,
        }
    }
}

#[derive(Debug)]
struct Attempt {
    id: Uuid,
    state: PublishState,
}

impl Attempt {
    fn start() -> Self {
        let attempt = Self {
            id: Uuid::new_v4(),
            state: PublishState::Draft,
        };
        info!(target = "printdrop.pipeline", attempt = %attempt.id, state = ?attempt.state, "attempt_started");
        attempt
    }

    fn advance(&mut self, next: PublishState) -> bool {
        if !self.state.can_advance_to(next) {
            warn!(
                target = "printdrop.pipeline",
                attempt = %self.id,
                from = ?self.state,
                to = ?next,
                "illegal_state_transition"
            );
            return false;
        }
        info!(target = "printdrop.pipeline", attempt = %self.id, from = ?self.state, to = ?next, "state_transition");
        self.state = next;
        true
    }

    fn fail(&mut self, err: &PipelineError) {
        warn!(
            target = "printdrop.pipeline",
            attempt = %self.id,
            state = ?self.state,
            stage = err.stage(),
            error = %err,
            "publish_failed"
        );
        self.advance(PublishState::Failed);
    }
}

/// A provider's answer to a failed call. `message` is the raw response
/// body; `status` is absent for transport failures and timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderFailure {
    pub fn local(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {status}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl From<PrintifyError> for ProviderFailure {
    fn from(err: PrintifyError) -> Self {
        let status = err.status();
        let message = match err {
            PrintifyError::Status { body, .. } => body,
            other => other.to_string(),
        };
        Self { status, message }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("invalid image encoding: {0}")]
    InvalidEncoding(String),
    #[error("upload failed: {0}")]
    UploadFailed(ProviderFailure),
    #[error("catalog fetch failed: {0}")]
    CatalogFetchFailed(ProviderFailure),
    #[error("configuration error: {0}")]
    ConfigurationError(String),
    #[error("product create failed: {0}")]
    ProductCreateFailed(ProviderFailure),
    #[error("publish attempt cancelled")]
    Cancelled,
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    InvalidInput,
    Configuration,
    Upstream,
    Cancelled,
    Internal,
}

impl PipelineError {
    /// Cancellation keeps its own variant whichever stage observed it.
    pub fn from_provider(err: PrintifyError, wrap: fn(ProviderFailure) -> Self) -> Self {
        match err {
            PrintifyError::Cancelled => Self::Cancelled,
            other => wrap(other.into()),
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidEncoding(_) => "normalize_image",
            Self::UploadFailed(_) => "upload_asset",
            Self::CatalogFetchFailed(_) => "resolve_variants",
            Self::ConfigurationError(_) => "configuration",
            Self::ProductCreateFailed(_) => "create_product",
            Self::Cancelled => "cancelled",
            Self::Internal(_) => "internal",
        }
    }

    pub fn kind(&self) -> PipelineErrorKind {
        match self {
            Self::InvalidEncoding(_) => PipelineErrorKind::InvalidInput,
            Self::ConfigurationError(_) => PipelineErrorKind::Configuration,
            Self::UploadFailed(_) | Self::CatalogFetchFailed(_) | Self::ProductCreateFailed(_) => {
                PipelineErrorKind::Upstream
            }
            Self::Cancelled => PipelineErrorKind::Cancelled,
            Self::Internal(_) => PipelineErrorKind::Internal,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            Self::UploadFailed(failure)
            | Self::CatalogFetchFailed(failure)
            | Self::ProductCreateFailed(failure) => failure.to_string(),
            other => other.to_string(),
        }
    }

    pub fn provider_failure(&self) -> Option<&ProviderFailure> {
        match self {
            Self::UploadFailed(failure)
            | Self::CatalogFetchFailed(failure)
            | Self::ProductCreateFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<NormalizeError> for PipelineError {
    fn from(value: NormalizeError) -> Self {
        match value {
            NormalizeError::InvalidEncoding(message) => Self::InvalidEncoding(message),
        }
    }
}

#[derive(Debug)]
pub struct StageOutcome<T> {
    pub value: T,
    pub output: Value,
}

impl<T> StageOutcome<T> {
    fn new(value: T, output: Value) -> Self {
        Self { value, output }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::artwork::tests::png_data_url;
    use crate::config::PrintAreaLayout;
    use crate::printify::mock::{Call, MockProvider, http_error};
    use crate::printify::payloads::PrintAreasPayload;
    use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
    use std::time::Duration;

    pub(crate) fn test_settings() -> Settings {
        Settings {
            api_token: "test-token".into(),
            shop_id: Some(42),
            blueprint_id: Some(5),
            print_provider_id: Some(7),
            ..Settings::default()
        }
    }

    fn pipeline_with(mock: Arc<MockProvider>, settings: Settings) -> Pipeline {
        Pipeline::new(Arc::new(settings), mock)
    }

    fn upload_count(mock: &MockProvider) -> usize {
        mock.calls()
            .iter()
            .filter(|call| matches!(call, Call::Upload(_)))
            .count()
    }

    fn request(image_url: &str) -> PublishRequest {
        PublishRequest {
            image_url: Some(image_url.to_string()),
            title: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn remote_image_publishes_end_to_end() {
        let mock = Arc::new(MockProvider::happy());
        let pipeline = pipeline_with(mock.clone(), test_settings());
        let resp = pipeline
            .run(request("https://example.com/img.jpg"), &CancelToken::new())
            .await
            .expect("pipeline run");

        assert_eq!(resp.product_id, "P9");
        assert_eq!(resp.shop_id, 42);
        let names: Vec<&str> = resp.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "normalize_image",
                "upload_asset",
                "resolve_variants",
                "create_product"
            ]
        );

        let calls = mock.calls();
        let upload = calls
            .iter()
            .find_map(|call| match call {
                Call::Upload(req) => Some(req.clone()),
                _ => None,
            })
            .expect("upload issued");
        assert_eq!(upload.file_name, "img.jpg");
        assert_eq!(upload.url.as_deref(), Some("https://example.com/img.jpg"));
        assert!(upload.contents.is_none());
        assert!(calls.iter().any(|call| matches!(
            call,
            Call::FetchVariants {
                blueprint_id: 5,
                print_provider_id: 7
            }
        )));

        let created = mock.created_products();
        assert_eq!(created.len(), 1);
        let (shop_id, body) = &created[0];
        assert_eq!(*shop_id, 42);
        assert_eq!(body.blueprint_id, 5);
        assert_eq!(body.print_provider_id, 7);
        let ids: Vec<u64> = body.variants.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![101, 102, 103]);
        match &body.print_areas {
            PrintAreasPayload::Grouped(areas) => {
                assert_eq!(areas.len(), 1);
                assert_eq!(areas[0].variant_ids, vec![101, 102, 103]);
                let placeholder = &areas[0].placeholders[0];
                assert_eq!(placeholder.position, "front");
                let image = &placeholder.images[0];
                assert_eq!(image.id, "A1");
                assert_eq!((image.x, image.y, image.scale, image.angle), (0.5, 0.5, 1.0, 0));
            }
            other => panic!("expected grouped print areas, got {other:?}"),
        }
        assert!(!calls.iter().any(|call| matches!(call, Call::Publish { .. })));
    }

    #[tokio::test]
    async fn upload_failure_never_creates_product() {
        let mock = Arc::new(
            MockProvider::happy().with_upload(Err(http_error(500, "{\"error\":\"boom\"}"))),
        );
        let pipeline = pipeline_with(mock.clone(), test_settings());
        let err = pipeline
            .run(request("https://example.com/img.jpg"), &CancelToken::new())
            .await
            .expect_err("upload fails");
        assert_eq!(
            err,
            PipelineError::UploadFailed(ProviderFailure {
                status: Some(500),
                message: "{\"error\":\"boom\"}".into(),
            })
        );
        assert!(mock.created_products().is_empty());
    }

    #[tokio::test]
    async fn catalog_failure_surfaces_raw_message() {
        let mock = Arc::new(MockProvider::happy().with_variants(Err(http_error(404, "not found"))));
        let pipeline = pipeline_with(mock.clone(), test_settings());
        let err = pipeline
            .run(request("https://example.com/img.jpg"), &CancelToken::new())
            .await
            .expect_err("catalog fails");
        assert_eq!(err.stage(), "resolve_variants");
        assert_eq!(err.provider_failure().map(|f| f.message.as_str()), Some("not found"));
        assert_eq!(upload_count(&mock), 0);
        assert!(mock.created_products().is_empty());
    }

    #[tokio::test]
    async fn empty_catalog_blocks_submission() {
        let mock = Arc::new(MockProvider::happy().with_variants(Ok(vec![])));
        let pipeline = pipeline_with(mock.clone(), test_settings());
        let err = pipeline
            .run(request("https://example.com/img.jpg"), &CancelToken::new())
            .await
            .expect_err("no variants");
        assert!(matches!(err, PipelineError::ConfigurationError(_)));
        assert_eq!(upload_count(&mock), 0);
        assert!(mock.created_products().is_empty());
    }

    #[tokio::test]
    async fn missing_shop_fails_before_any_call() {
        let mock = Arc::new(MockProvider::happy());
        let settings = Settings {
            shop_id: None,
            ..test_settings()
        };
        let pipeline = pipeline_with(mock.clone(), settings);
        let err = pipeline
            .run(request("https://example.com/img.jpg"), &CancelToken::new())
            .await
            .expect_err("not configured");
        assert_eq!(err.kind(), PipelineErrorKind::Configuration);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_call() {
        let mock = Arc::new(MockProvider::happy());
        let settings = Settings {
            api_token: String::new(),
            ..test_settings()
        };
        let pipeline = pipeline_with(mock.clone(), settings);
        let err = pipeline
            .run(request("https://example.com/img.jpg"), &CancelToken::new())
            .await
            .expect_err("not configured");
        assert!(matches!(err, PipelineError::ConfigurationError(_)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn data_url_is_uploaded_inline_as_jpeg() {
        let mock = Arc::new(MockProvider::happy());
        let pipeline = pipeline_with(mock.clone(), test_settings());
        pipeline
            .run(request(&png_data_url(false)), &CancelToken::new())
            .await
            .expect("pipeline run");
        let upload = mock
            .calls()
            .into_iter()
            .find_map(|call| match call {
                Call::Upload(req) => Some(req),
                _ => None,
            })
            .expect("upload issued");
        assert!(upload.url.is_none());
        assert!(upload.file_name.ends_with(".jpg"));
        let bytes = BASE64
            .decode(upload.contents.expect("inline contents"))
            .expect("base64");
        assert_eq!(
            image::guess_format(&bytes).expect("format"),
            image::ImageFormat::Jpeg
        );
    }

    #[tokio::test]
    async fn malformed_data_url_is_invalid_encoding() {
        let mock = Arc::new(MockProvider::happy());
        let pipeline = pipeline_with(mock.clone(), test_settings());
        let err = pipeline
            .run(request("data:image/png,AAAA"), &CancelToken::new())
            .await
            .expect_err("invalid");
        assert!(matches!(err, PipelineError::InvalidEncoding(_)));
        assert!(
            !mock
                .calls()
                .iter()
                .any(|call| matches!(call, Call::Upload(_) | Call::CreateProduct { .. }))
        );
    }

    #[tokio::test]
    async fn product_failure_keeps_provider_text() {
        let mock = Arc::new(
            MockProvider::happy().with_product(Err(http_error(422, "variants are invalid"))),
        );
        let pipeline = pipeline_with(mock, test_settings());
        let err = pipeline
            .run(request("https://example.com/img.jpg"), &CancelToken::new())
            .await
            .expect_err("create fails");
        assert_eq!(err.stage(), "create_product");
        assert_eq!(err.detail(), "HTTP 422: variants are invalid");
    }

    #[tokio::test]
    async fn publish_flag_marks_product_purchasable() {
        let mock = Arc::new(MockProvider::happy());
        let settings = Settings {
            publish_on_create: true,
            print_area_layout: PrintAreaLayout::Flat,
            ..test_settings()
        };
        let pipeline = pipeline_with(mock.clone(), settings);
        pipeline
            .run(request("https://example.com/img.jpg"), &CancelToken::new())
            .await
            .expect("pipeline run");
        assert!(mock.calls().iter().any(|call| matches!(
            call,
            Call::Publish { shop_id: 42, product_id } if product_id == "P9"
        )));
    }

    #[tokio::test]
    async fn cancelled_token_aborts_attempt() {
        let mock = Arc::new(MockProvider::happy());
        let pipeline = pipeline_with(mock.clone(), test_settings());
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = pipeline
            .run(request("https://example.com/img.jpg"), &cancel)
            .await
            .expect_err("cancelled");
        assert_eq!(err, PipelineError::Cancelled);
        assert!(mock.created_products().is_empty());
    }

    #[tokio::test]
    async fn cancel_during_upload_surfaces_cancelled() {
        let mock = Arc::new(MockProvider::happy().with_delay(Duration::from_secs(5)));
        let pipeline = pipeline_with(mock.clone(), test_settings());
        let cancel = CancelToken::new();
        let trip = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trip.cancel();
        });
        let err = tokio::time::timeout(
            Duration::from_secs(2),
            pipeline.run(request("https://example.com/img.jpg"), &cancel),
        )
        .await
        .expect("returns promptly")
        .expect_err("cancelled");
        assert_eq!(err, PipelineError::Cancelled);
    }

    #[tokio::test]
    async fn slow_provider_times_out_as_stage_failure() {
        let mock = Arc::new(MockProvider::happy().with_delay(Duration::from_millis(300)));
        let settings = Settings {
            request_timeout: Duration::from_millis(20),
            ..test_settings()
        };
        let pipeline = pipeline_with(mock, settings);
        let err = pipeline
            .run(request("https://example.com/img.jpg"), &CancelToken::new())
            .await
            .expect_err("times out");
        assert_eq!(err.kind(), PipelineErrorKind::Upstream);
        let failure = err.provider_failure().expect("provider failure");
        assert_eq!(failure.status, None);
        assert_eq!(failure.message, "timed out after 20ms");
    }

    #[tokio::test]
    async fn upload_and_catalog_legs_overlap() {
        let mock = Arc::new(MockProvider::happy().with_delay(Duration::from_millis(300)));
        let pipeline = pipeline_with(mock, test_settings());
        let started = std::time::Instant::now();
        pipeline
            .run(request("https://example.com/img.jpg"), &CancelToken::new())
            .await
            .expect("pipeline run");
        let elapsed = started.elapsed();
        // upload and catalog share one 300ms window, create takes another
        assert!(elapsed >= Duration::from_millis(600), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(850), "{elapsed:?}");
    }

    #[test]
    fn state_machine_is_linear_and_terminal() {
        use PublishState::*;
        assert!(Draft.can_advance_to(Normalizing));
        assert!(Uploading.can_advance_to(ResolvingVariants));
        assert!(Submitting.can_advance_to(Published));
        assert!(Uploading.can_advance_to(Failed));
        assert!(!Draft.can_advance_to(Submitting));
        assert!(!Published.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Draft));
        assert!(Failed.is_terminal() && Published.is_terminal());
    }

    #[test]
    fn attempt_refuses_moves_out_of_terminal_state() {
        let mut attempt = Attempt::start();
        assert!(attempt.advance(PublishState::Normalizing));
        attempt.fail(&PipelineError::Cancelled);
        assert_eq!(attempt.state, PublishState::Failed);
        assert!(!attempt.advance(PublishState::Uploading));
    }
}
