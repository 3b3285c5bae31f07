use super::{PipelineError, ProviderFailure, StageOutcome};
use crate::artwork::{self, ImageSource, NormalizedImage};
use crate::printify::PrintProvider;
use crate::printify::payloads::UploadImageRequest;
use serde::Serialize;
use serde_json::json;
use tracing::info;

/// A provider-owned image. Never deleted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteAssetReference {
    pub id: String,
    pub file_name: String,
    pub mime: Option<String>,
}

pub async fn normalize_image(
    source: ImageSource,
    jpeg_quality: u8,
) -> Result<StageOutcome<NormalizedImage>, PipelineError> {
    let normalized = tokio::task::spawn_blocking(move || artwork::normalize(source, jpeg_quality))
        .await
        .map_err(|err| PipelineError::Internal(format!("normalize task failed: {err}")))??;

    let output = match &normalized {
        NormalizedImage::Inline {
            file_name,
            bytes,
            mime,
            recompressed,
        } => json!({
            "mode": "inline",
            "file_name": file_name,
            "bytes": bytes.len(),
            "mime": mime,
            "recompressed": recompressed,
        }),
        NormalizedImage::Remote { file_name, url } => json!({
            "mode": "reference",
            "file_name": file_name,
            "url": url,
        }),
    };
    Ok(StageOutcome::new(normalized, output))
}

/// Registers the image with the provider: by reference for remote URLs,
/// base64 inline for local bytes. No retries.
pub async fn upload_asset(
    provider: &dyn PrintProvider,
    image: &NormalizedImage,
) -> Result<StageOutcome<RemoteAssetReference>, PipelineError> {
    let (request, mime, mode) = match image {
        NormalizedImage::Inline {
            file_name,
            bytes,
            mime,
            ..
        } => {
            if bytes.is_empty() {
                return Err(rejected("inline image content is empty"));
            }
            (
                UploadImageRequest::inline(file_name.as_str(), bytes),
                Some(mime.clone()),
                "inline",
            )
        }
        NormalizedImage::Remote { file_name, url } => (
            UploadImageRequest::by_url(file_name.as_str(), url.as_str()),
            None,
            "reference",
        ),
    };
    if request.file_name.trim().is_empty() {
        return Err(rejected("file name is empty"));
    }

    let response = provider
        .upload_image(&request)
        .await
        .map_err(|err| PipelineError::from_provider(err, PipelineError::UploadFailed))?;
    if response.id.trim().is_empty() {
        return Err(rejected("provider returned an empty asset id"));
    }

    let asset = RemoteAssetReference {
        id: response.id,
        file_name: response.file_name.unwrap_or(request.file_name),
        mime: response.mime_type.or(mime),
    };
    info!(
        target = "printdrop.pipeline",
        asset_id = %asset.id,
        file_name = %asset.file_name,
        mode = mode,
        "asset_uploaded"
    );
    Ok(StageOutcome::new(
        asset.clone(),
        json!({
            "asset_id": asset.id,
            "file_name": asset.file_name,
            "mime": asset.mime,
            "mode": mode,
        }),
    ))
}

fn rejected(message: &str) -> PipelineError {
    PipelineError::UploadFailed(ProviderFailure::local(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printify::mock::{Call, MockProvider};
    use crate::printify::payloads::UploadImageResponse;

    #[tokio::test]
    async fn inline_upload_sends_base64_contents() {
        let mock = MockProvider::happy();
        let image = NormalizedImage::Inline {
            file_name: "upload-1.jpg".into(),
            bytes: vec![1, 2, 3],
            mime: "image/jpeg".into(),
            recompressed: true,
        };
        let out = upload_asset(&mock, &image).await.expect("upload");
        assert_eq!(out.value.id, "A1");
        assert_eq!(out.value.file_name, "upload-1.jpg");
        assert_eq!(out.value.mime.as_deref(), Some("image/jpeg"));
        assert_eq!(out.output["mode"], json!("inline"));
        match &mock.calls()[0] {
            Call::Upload(req) => {
                assert_eq!(req.contents.as_deref(), Some("AQID"));
                assert!(req.url.is_none());
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_inline_content_is_rejected_locally() {
        let mock = MockProvider::happy();
        let image = NormalizedImage::Inline {
            file_name: "upload-1.png".into(),
            bytes: vec![],
            mime: "image/png".into(),
            recompressed: false,
        };
        let err = upload_asset(&mock, &image).await.expect_err("rejected");
        assert!(matches!(err, PipelineError::UploadFailed(ProviderFailure { status: None, .. })));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn blank_file_name_is_rejected_locally() {
        let mock = MockProvider::happy();
        let image = NormalizedImage::Remote {
            file_name: "  ".into(),
            url: "https://example.com/".into(),
        };
        assert!(upload_asset(&mock, &image).await.is_err());
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn provider_file_name_wins_when_returned() {
        let mock = MockProvider::happy().with_upload(Ok(UploadImageResponse {
            id: "A2".into(),
            file_name: Some("stored.png".into()),
            mime_type: Some("image/png".into()),
        }));
        let image = NormalizedImage::Remote {
            file_name: "img.png".into(),
            url: "https://example.com/img.png".into(),
        };
        let out = upload_asset(&mock, &image).await.expect("upload");
        assert_eq!(out.value.file_name, "stored.png");
        assert_eq!(out.value.mime.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn normalize_stage_reports_mode() {
        let source = ImageSource::parse("https://example.com/a/b.png").expect("parse");
        let out = normalize_image(source, 82).await.expect("normalize");
        assert_eq!(out.output["mode"], json!("reference"));
        assert_eq!(out.value.file_name(), "b.png");
    }
}
