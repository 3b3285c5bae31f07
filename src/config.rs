use serde::Deserialize;
use std::{env, path::PathBuf, time::Duration};
use thiserror::Error;

const DEFAULT_API_BASE: &str = "https://api.printify.com/v1";
const DEFAULT_TITLE: &str = "Custom AI Tee";
const DEFAULT_DESCRIPTION: &str = "A unique tee featuring your AI-transformed photo.";
const DEFAULT_TAGS: &[&str] = &["custom", "ai-art"];
const DEFAULT_COLORS: &[&str] = &["black", "white"];
const DEFAULT_SIZES: &[&str] = &["s", "m", "l", "xl", "2xl"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("unable to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// How the product body groups images into print areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintAreaLayout {
    /// Historical body: `print_areas` keyed by position name.
    Flat,
    /// Current body: `print_areas` grouped by variant set with placeholders.
    #[default]
    Placeholders,
}

impl PrintAreaLayout {
    pub fn from_raw(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "flat" | "v1" => Some(Self::Flat),
            "placeholders" | "v2" => Some(Self::Placeholders),
            _ => None,
        }
    }
}

/// Immutable runtime settings, built once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_token: String,
    pub api_base: String,
    pub shop_id: Option<u64>,
    pub blueprint_id: Option<u64>,
    pub print_provider_id: Option<u64>,
    pub default_price: u32,
    pub enabled_variant_count: usize,
    pub variant_limit: usize,
    pub jpeg_quality: u8,
    pub print_area_layout: PrintAreaLayout,
    pub publish_on_create: bool,
    pub product_title: String,
    pub product_description: String,
    pub product_tags: Vec<String>,
    pub preferred_colors: Vec<String>,
    pub preferred_sizes: Vec<String>,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            shop_id: None,
            blueprint_id: None,
            print_provider_id: None,
            default_price: 2200,
            enabled_variant_count: 6,
            variant_limit: 6,
            jpeg_quality: 82,
            print_area_layout: PrintAreaLayout::default(),
            publish_on_create: false,
            product_title: DEFAULT_TITLE.to_string(),
            product_description: DEFAULT_DESCRIPTION.to_string(),
            product_tags: owned(DEFAULT_TAGS),
            preferred_colors: owned(DEFAULT_COLORS),
            preferred_sizes: owned(DEFAULT_SIZES),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            port: 8000,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Optional YAML overlay; every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    api_token: Option<String>,
    api_base: Option<String>,
    shop_id: Option<u64>,
    blueprint_id: Option<u64>,
    print_provider_id: Option<u64>,
    default_price: Option<u32>,
    enabled_variant_count: Option<usize>,
    variant_limit: Option<usize>,
    jpeg_quality: Option<u8>,
    print_area_layout: Option<PrintAreaLayout>,
    publish_on_create: Option<bool>,
    product_title: Option<String>,
    product_description: Option<String>,
    product_tags: Option<Vec<String>>,
    preferred_colors: Option<Vec<String>>,
    preferred_sizes: Option<Vec<String>>,
    request_timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
    port: Option<u16>,
    max_body_bytes: Option<usize>,
}

impl Settings {
    /// Defaults, then the YAML file named by `PRINTDROP_CONFIG`, then the
    /// process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        if let Some(path) = env::var_os("PRINTDROP_CONFIG").map(PathBuf::from) {
            let raw = std::fs::read_to_string(&path).map_err(|err| ConfigError::Read {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;
            settings.apply_yaml(&raw).map_err(|reason| ConfigError::Parse {
                path: path.display().to_string(),
                reason,
            })?;
        }
        settings.apply_env(|key| env::var(key).ok())?;
        let settings = settings.normalized();
        settings.validate()?;
        Ok(settings)
    }

    fn apply_yaml(&mut self, raw: &str) -> Result<(), String> {
        let file: SettingsFile = serde_yaml::from_str(raw).map_err(|err| err.to_string())?;
        macro_rules! overlay {
            ($target:ident, $source:ident; $($field:ident),* $(,)?) => {
                $(if let Some(value) = $source.$field { $target.$field = value; })*
            };
        }
        let target = self;
        overlay!(
            target,
            file;
            api_token,
            api_base,
            default_price,
            enabled_variant_count,
            variant_limit,
            jpeg_quality,
            print_area_layout,
            publish_on_create,
            product_title,
            product_description,
            product_tags,
            preferred_colors,
            preferred_sizes,
            port,
            max_body_bytes,
        );
        if file.shop_id.is_some() {
            target.shop_id = file.shop_id;
        }
        if file.blueprint_id.is_some() {
            target.blueprint_id = file.blueprint_id;
        }
        if file.print_provider_id.is_some() {
            target.print_provider_id = file.print_provider_id;
        }
        if let Some(secs) = file.request_timeout_secs {
            target.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.connect_timeout_secs {
            target.connect_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = get("PRINTIFY_API_TOKEN") {
            self.api_token = value;
        }
        if let Some(value) = get("PRINTIFY_API_BASE") {
            self.api_base = value;
        }
        if let Some(value) = get("PRINTIFY_SHOP_ID") {
            self.shop_id = Some(parse("PRINTIFY_SHOP_ID", &value)?);
        }
        if let Some(value) = get("PRINTIFY_BLUEPRINT_ID") {
            self.blueprint_id = Some(parse("PRINTIFY_BLUEPRINT_ID", &value)?);
        }
        if let Some(value) = get("PRINTIFY_PROVIDER_ID") {
            self.print_provider_id = Some(parse("PRINTIFY_PROVIDER_ID", &value)?);
        }
        if let Some(value) = get("PRINTIFY_DEFAULT_PRICE") {
            self.default_price = parse("PRINTIFY_DEFAULT_PRICE", &value)?;
        }
        if let Some(value) = get("PRINTIFY_ENABLED_VARIANTS") {
            self.enabled_variant_count = parse("PRINTIFY_ENABLED_VARIANTS", &value)?;
        }
        if let Some(value) = get("PRINTIFY_VARIANT_LIMIT") {
            self.variant_limit = parse("PRINTIFY_VARIANT_LIMIT", &value)?;
        }
        if let Some(value) = get("PRINTIFY_JPEG_QUALITY") {
            self.jpeg_quality = parse("PRINTIFY_JPEG_QUALITY", &value)?;
        }
        if let Some(value) = get("PRINTIFY_PRINT_AREA_LAYOUT") {
            self.print_area_layout =
                PrintAreaLayout::from_raw(&value).ok_or_else(|| ConfigError::Invalid {
                    key: "PRINTIFY_PRINT_AREA_LAYOUT",
                    value: value.clone(),
                })?;
        }
        if let Some(value) = get("PRINTIFY_PUBLISH") {
            self.publish_on_create = parse_bool("PRINTIFY_PUBLISH", &value)?;
        }
        if let Some(value) = get("PRINTIFY_PRODUCT_TITLE") {
            self.product_title = value;
        }
        if let Some(value) = get("PRINTIFY_PRODUCT_DESCRIPTION") {
            self.product_description = value;
        }
        if let Some(value) = get("PRINTIFY_PRODUCT_TAGS") {
            self.product_tags = split_list(&value);
        }
        if let Some(value) = get("PRINTIFY_PREFERRED_COLORS") {
            self.preferred_colors = split_list(&value);
        }
        if let Some(value) = get("PRINTIFY_PREFERRED_SIZES") {
            self.preferred_sizes = split_list(&value);
        }
        if let Some(value) = get("HTTP_TIMEOUT_SECS") {
            self.request_timeout = Duration::from_secs(parse("HTTP_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = get("HTTP_CONNECT_TIMEOUT_SECS") {
            self.connect_timeout =
                Duration::from_secs(parse("HTTP_CONNECT_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = get("PORT") {
            self.port = parse("PORT", &value)?;
        }
        if let Some(value) = get("REQUEST_MAX_BYTES") {
            self.max_body_bytes = parse("REQUEST_MAX_BYTES", &value)?;
        }
        Ok(())
    }

    /// Values that parse but can never produce a working attempt.
    fn validate(&self) -> Result<(), ConfigError> {
        let zero = |key| {
            Err(ConfigError::Invalid {
                key,
                value: "0".into(),
            })
        };
        if self.request_timeout.is_zero() {
            return zero("HTTP_TIMEOUT_SECS");
        }
        if self.connect_timeout.is_zero() {
            return zero("HTTP_CONNECT_TIMEOUT_SECS");
        }
        if self.variant_limit == 0 {
            return zero("PRINTIFY_VARIANT_LIMIT");
        }
        Ok(())
    }

    fn normalized(mut self) -> Self {
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        self.api_base = self.api_base.trim_end_matches('/').to_string();
        self.preferred_colors = lowercase(self.preferred_colors);
        self.preferred_sizes = lowercase(self.preferred_sizes);
        if self.max_body_bytes == 0 {
            self.max_body_bytes = Self::default().max_body_bytes;
        }
        self
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

fn lowercase(values: Vec<String>) -> Vec<String> {
    values.into_iter().map(|v| v.to_lowercase()).collect()
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
