//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;
use uuid::Uuid;

mod cli;

pub use cli::{CliArgs, Command, DemoArgs, GlobalOverrides, ListArgs, MutateArgs, PurgeArgs};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "itembank";
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000/api/";
const DEFAULT_API_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_PREFETCH_MULTIPLIER: u64 = 3;
const DEFAULT_ENTRY_LIMIT: u64 = 64;
const DEFAULT_STALE_AFTER_MS: u64 = 30_000;
const DEFAULT_RECONCILE_BATCH_LIMIT: u64 = 16;
const DEFAULT_PAGE_SIZE: u64 = 10;
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
const DEFAULT_UNDO_WINDOW_MS: u64 = 5_000;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub cache: CacheSettings,
    pub ui: UiSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub timeout: Duration,
    /// Organization whose items are listed; personal items when unset.
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub prefetch_multiplier: NonZeroU32,
    pub entry_limit: NonZeroUsize,
    pub stale_after: Duration,
    pub reconcile_batch_limit: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct UiSettings {
    pub page_size: NonZeroU32,
    pub search_debounce: Duration,
    pub undo_window: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("ITEMBANK").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_global_overrides(&cli.overrides);
    if let Some(Command::List(args)) = cli.command.as_ref()
        && let Some(page_size) = args.page_size
    {
        raw.ui.page_size = Some(page_size.into());
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    cache: RawCacheSettings,
    ui: RawUiSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_global_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(url) = overrides.api_base_url.as_ref() {
            self.api.base_url = Some(url.clone());
        }
        if let Some(timeout) = overrides.api_timeout_ms {
            self.api.timeout_ms = Some(timeout);
        }
        if let Some(organization) = overrides.organization {
            self.api.organization_id = Some(organization.to_string());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            api,
            cache,
            ui,
            logging,
        } = raw;

        Ok(Self {
            api: build_api_settings(api)?,
            cache: build_cache_settings(cache)?,
            ui: build_ui_settings(ui)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let raw_url = api
        .base_url
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let mut base_url = Url::parse(raw_url.trim())
        .map_err(|err| LoadError::invalid("api.base_url", format!("failed to parse: {err}")))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "api.base_url",
            "scheme must be http or https",
        ));
    }
    // Relative joins drop the last segment unless the path ends with a slash.
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }

    let timeout_ms = api.timeout_ms.unwrap_or(DEFAULT_API_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "api.timeout_ms",
            "must be greater than zero",
        ));
    }

    let organization_id = match api.organization_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => Some(Uuid::parse_str(value).map_err(|err| {
            LoadError::invalid("api.organization_id", format!("failed to parse: {err}"))
        })?),
    };

    Ok(ApiSettings {
        base_url,
        timeout: Duration::from_millis(timeout_ms),
        organization_id,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let prefetch_multiplier = non_zero_u32(
        cache
            .prefetch_multiplier
            .unwrap_or(DEFAULT_PREFETCH_MULTIPLIER),
        "cache.prefetch_multiplier",
    )?;
    let entry_limit = non_zero_usize(
        cache.entry_limit.unwrap_or(DEFAULT_ENTRY_LIMIT),
        "cache.entry_limit",
    )?;
    let reconcile_batch_limit = non_zero_usize(
        cache
            .reconcile_batch_limit
            .unwrap_or(DEFAULT_RECONCILE_BATCH_LIMIT),
        "cache.reconcile_batch_limit",
    )?;
    let stale_after_ms = cache.stale_after_ms.unwrap_or(DEFAULT_STALE_AFTER_MS);

    Ok(CacheSettings {
        prefetch_multiplier,
        entry_limit,
        stale_after: Duration::from_millis(stale_after_ms),
        reconcile_batch_limit,
    })
}

fn build_ui_settings(ui: RawUiSettings) -> Result<UiSettings, LoadError> {
    let page_size = non_zero_u32(ui.page_size.unwrap_or(DEFAULT_PAGE_SIZE), "ui.page_size")?;
    let undo_window_ms = ui.undo_window_ms.unwrap_or(DEFAULT_UNDO_WINDOW_MS);
    if undo_window_ms == 0 {
        return Err(LoadError::invalid(
            "ui.undo_window_ms",
            "must be greater than zero",
        ));
    }
    let search_debounce_ms = ui
        .search_debounce_ms
        .unwrap_or(DEFAULT_SEARCH_DEBOUNCE_MS);

    Ok(UiSettings {
        page_size,
        search_debounce: Duration::from_millis(search_debounce_ms),
        undo_window: Duration::from_millis(undo_window_ms),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    timeout_ms: Option<u64>,
    organization_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    prefetch_multiplier: Option<u64>,
    entry_limit: Option<u64>,
    stale_after_ms: Option<u64>,
    reconcile_batch_limit: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUiSettings {
    page_size: Option<u64>,
    search_debounce_ms: Option<u64>,
    undo_window_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value_usize: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value_usize)
        .ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
