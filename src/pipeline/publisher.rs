use super::{PipelineError, ProviderFailure, StageOutcome};
use super::stages::RemoteAssetReference;
use crate::config::{PrintAreaLayout, Settings};
use crate::printify::PrintProvider;
use crate::printify::payloads::{
    CreateProductRequest, FlatImagePayload, ImagePayload, PlaceholderPayload, PrintAreaPayload,
    PrintAreasPayload, VariantPayload,
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Shop, blueprint and manufacturing partner a product is created under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishTarget {
    pub shop_id: u64,
    pub blueprint_id: u64,
    pub print_provider_id: u64,
}

impl PublishTarget {
    pub fn from_settings(settings: &Settings) -> Result<Self, PipelineError> {
        match (
            settings.shop_id,
            settings.blueprint_id,
            settings.print_provider_id,
        ) {
            (Some(shop_id), Some(blueprint_id), Some(print_provider_id)) => Ok(Self {
                shop_id,
                blueprint_id,
                print_provider_id,
            }),
            (shop, blueprint, provider) => {
                let missing: Vec<&str> = [
                    ("PRINTIFY_SHOP_ID", shop.is_none()),
                    ("PRINTIFY_BLUEPRINT_ID", blueprint.is_none()),
                    ("PRINTIFY_PROVIDER_ID", provider.is_none()),
                ]
                .into_iter()
                .filter(|(_, missing)| *missing)
                .map(|(key, _)| key)
                .collect();
                Err(PipelineError::ConfigurationError(format!(
                    "missing {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

/// Caller-facing product copy.
#[derive(Debug, Clone)]
pub struct ProductTemplate {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

impl ProductTemplate {
    pub fn from_settings(
        settings: &Settings,
        title: Option<String>,
        description: Option<String>,
    ) -> Self {
        let pick = |value: Option<String>, fallback: &str| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };
        Self {
            title: pick(title, &settings.product_title),
            description: pick(description, &settings.product_description),
            tags: settings.product_tags.clone(),
        }
    }
}

/// Where an image sits inside a print area. Coordinates are fractions of
/// the print area canvas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub position: String,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub angle: i32,
}

impl Placement {
    pub fn centered_front() -> Self {
        Self {
            position: "front".into(),
            x: 0.5,
            y: 0.5,
            scale: 1.0,
            angle: 0,
        }
    }

    fn is_valid(&self) -> bool {
        !self.position.trim().is_empty()
            && (0.0..=1.0).contains(&self.x)
            && (0.0..=1.0).contains(&self.y)
            && self.scale > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintArea {
    pub asset: RemoteAssetReference,
    pub placement: Placement,
    pub variant_ids: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DraftVariant {
    pub id: u64,
    /// Minor currency units.
    pub price: u32,
    pub is_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDraft {
    pub title: String,
    pub description: String,
    pub blueprint_id: u64,
    pub print_provider_id: u64,
    pub variants: Vec<DraftVariant>,
    pub print_areas: Vec<PrintArea>,
    pub tags: Vec<String>,
}

impl ProductDraft {
    /// One centered `front` print area over every variant. The first
    /// `enabled_count` variants (at least one) are switched on.
    pub fn build(
        template: &ProductTemplate,
        target: PublishTarget,
        asset: &RemoteAssetReference,
        variant_ids: &[u64],
        price: u32,
        enabled_count: usize,
    ) -> Result<Self, PipelineError> {
        if variant_ids.is_empty() {
            return Err(PipelineError::ConfigurationError(format!(
                "no catalog variants for blueprint {} / print provider {}",
                target.blueprint_id, target.print_provider_id
            )));
        }
        if asset.id.trim().is_empty() {
            return Err(PipelineError::ConfigurationError(
                "print area references an empty asset id".into(),
            ));
        }
        let enabled_count = enabled_count.max(1);
        let variants = variant_ids
            .iter()
            .enumerate()
            .map(|(idx, id)| DraftVariant {
                id: *id,
                price,
                is_enabled: idx < enabled_count,
            })
            .collect();
        let placement = Placement::centered_front();
        if !placement.is_valid() {
            return Err(PipelineError::ConfigurationError(format!(
                "invalid placement {placement:?}"
            )));
        }
        Ok(Self {
            title: template.title.clone(),
            description: template.description.clone(),
            blueprint_id: target.blueprint_id,
            print_provider_id: target.print_provider_id,
            variants,
            print_areas: vec![PrintArea {
                asset: asset.clone(),
                placement,
                variant_ids: variant_ids.to_vec(),
            }],
            tags: template.tags.clone(),
        })
    }

    pub fn to_request(&self, layout: PrintAreaLayout) -> CreateProductRequest {
        let print_areas = match layout {
            PrintAreaLayout::Flat => {
                let mut by_position: BTreeMap<String, Vec<FlatImagePayload>> = BTreeMap::new();
                for area in &self.print_areas {
                    by_position
                        .entry(area.placement.position.clone())
                        .or_default()
                        .push(FlatImagePayload {
                            image_id: area.asset.id.clone(),
                            x: area.placement.x,
                            y: area.placement.y,
                            scale: area.placement.scale,
                            angle: area.placement.angle,
                        });
                }
                PrintAreasPayload::Flat(by_position)
            }
            PrintAreaLayout::Placeholders => PrintAreasPayload::Grouped(
                self.print_areas
                    .iter()
                    .map(|area| PrintAreaPayload {
                        variant_ids: area.variant_ids.clone(),
                        placeholders: vec![PlaceholderPayload {
                            position: area.placement.position.clone(),
                            images: vec![ImagePayload {
                                id: area.asset.id.clone(),
                                x: area.placement.x,
                                y: area.placement.y,
                                scale: area.placement.scale,
                                angle: area.placement.angle,
                            }],
                        }],
                    })
                    .collect(),
            ),
        };
        CreateProductRequest {
            title: self.title.clone(),
            description: self.description.clone(),
            blueprint_id: self.blueprint_id,
            print_provider_id: self.print_provider_id,
            variants: self
                .variants
                .iter()
                .map(|variant| VariantPayload {
                    id: variant.id,
                    price: variant.price,
                    is_enabled: variant.is_enabled,
                })
                .collect(),
            print_areas,
            tags: self.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedProduct {
    pub product_id: String,
    pub shop_id: u64,
    pub published: bool,
}

/// Validates identifiers and the variant list, then creates the product and,
/// if configured, marks it purchasable.
pub async fn publish_product(
    provider: &dyn PrintProvider,
    settings: &Settings,
    template: &ProductTemplate,
    asset: &RemoteAssetReference,
    variant_ids: &[u64],
) -> Result<StageOutcome<PublishedProduct>, PipelineError> {
    let target = PublishTarget::from_settings(settings)?;
    let draft = ProductDraft::build(
        template,
        target,
        asset,
        variant_ids,
        settings.default_price,
        settings.enabled_variant_count,
    )?;
    let request = draft.to_request(settings.print_area_layout);

    let created = provider
        .create_product(target.shop_id, &request)
        .await
        .map_err(|err| PipelineError::from_provider(err, PipelineError::ProductCreateFailed))?;
    if created.id.trim().is_empty() {
        return Err(PipelineError::ProductCreateFailed(ProviderFailure::local(
            "provider returned an empty product id",
        )));
    }
    let shop_id = created.shop_id.unwrap_or(target.shop_id);

    if settings.publish_on_create {
        provider
            .publish_product(shop_id, &created.id)
            .await
            .map_err(|err| {
                warn!(
                    target = "printdrop.pipeline",
                    product_id = %created.id,
                    error = %err,
                    "product_created_but_not_published"
                );
                PipelineError::from_provider(err, PipelineError::ProductCreateFailed)
            })?;
    }

    let product = PublishedProduct {
        product_id: created.id,
        shop_id,
        published: settings.publish_on_create,
    };
    info!(
        target = "printdrop.pipeline",
        product_id = %product.product_id,
        shop_id = product.shop_id,
        variants = draft.variants.len(),
        published = product.published,
        "product_created"
    );
    Ok(StageOutcome::new(
        product.clone(),
        json!({
            "product_id": product.product_id,
            "shop_id": product.shop_id,
            "published": product.published,
            "layout": format!("{:?}", settings.print_area_layout).to_lowercase(),
            "variants": draft.variants,
            "enabled": draft.variants.iter().filter(|v| v.is_enabled).count(),
            "asset_id": asset.id,
        }),
    ))
}
