use super::{PipelineError, StageOutcome};
use crate::config::Settings;
use crate::printify::PrintProvider;
use crate::printify::payloads::CatalogVariant;
use serde_json::json;
use std::collections::HashSet;
use tracing::debug;

/// Which catalog titles count as "preferred" and how many ids to keep.
#[derive(Debug, Clone)]
pub struct VariantPreferences {
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub limit: usize,
}

impl VariantPreferences {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            colors: settings.preferred_colors.clone(),
            sizes: settings.preferred_sizes.clone(),
            limit: settings.variant_limit,
        }
    }

    /// A title matches when it names a preferred color and a preferred size,
    /// compared case-insensitively on word boundaries.
    pub fn matches(&self, title: &str) -> bool {
        let words = title_words(title);
        let has = |token: &String| {
            let mut parts = token.split_whitespace().peekable();
            parts.peek().is_some() && parts.all(|part| words.contains(&part.to_lowercase()))
        };
        self.colors.iter().any(has) && self.sizes.iter().any(has)
    }
}

fn title_words(title: &str) -> HashSet<String> {
    title
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .collect()
}

/// Preferred variants in catalog order, or the whole catalog when nothing
/// matches; deduplicated, then cut to `limit`.
pub fn select_variants(catalog: &[CatalogVariant], preferences: &VariantPreferences) -> Vec<u64> {
    let preferred: Vec<&CatalogVariant> = catalog
        .iter()
        .filter(|variant| preferences.matches(&variant.title))
        .collect();
    let pool = if preferred.is_empty() {
        catalog.iter().collect()
    } else {
        preferred
    };
    let mut seen = HashSet::new();
    pool.into_iter()
        .map(|variant| variant.id)
        .filter(|id| seen.insert(*id))
        .take(preferences.limit)
        .collect()
}

/// Fetches the catalog fresh and picks the ids to offer. An empty result is
/// not an error here.
pub async fn resolve_variants(
    provider: &dyn PrintProvider,
    blueprint_id: u64,
    print_provider_id: u64,
    preferences: &VariantPreferences,
) -> Result<StageOutcome<Vec<u64>>, PipelineError> {
    let catalog = provider
        .fetch_variants(blueprint_id, print_provider_id)
        .await
        .map_err(|err| PipelineError::from_provider(err, PipelineError::CatalogFetchFailed))?;

    let preferred = catalog
        .iter()
        .filter(|variant| preferences.matches(&variant.title))
        .count();
    let out_of_stock = catalog.iter().filter(|variant| !variant.available).count();
    let selected = select_variants(&catalog, preferences);
    debug!(
        target = "printdrop.pipeline",
        blueprint_id,
        print_provider_id,
        catalog = catalog.len(),
        preferred,
        selected = selected.len(),
        "variants_resolved"
    );

    Ok(StageOutcome::new(
        selected.clone(),
        json!({
            "blueprint_id": blueprint_id,
            "print_provider_id": print_provider_id,
            "catalog_size": catalog.len(),
            "preferred_matches": preferred,
            "out_of_stock": out_of_stock,
            "fallback_to_catalog": preferred == 0 && !catalog.is_empty(),
            "selected": selected,
        }),
    ))
}
