//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "quire";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_NOTION_BASE_URL: &str = "https://api.notion.com/v1/";
const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 8;
const DEFAULT_POSTS_BASE_URL: &str = "http://127.0.0.1:5000/api/";
const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 5;
const DEFAULT_COLLECTION_CONCURRENCY: usize = 4;
const DEFAULT_PUBLIC_SITE_URL: &str = "http://localhost:4000";
const DEFAULT_SITE_NAME: &str = "Quire";
const DEFAULT_AUTHOR: &str = "Quire";
const DEFAULT_ITEM_PATH: &str = "blog";
const DEFAULT_PING_TIMEOUT_SECS: u64 = 4;
const DEFAULT_PING_ENDPOINTS: [&str; 2] =
    ["https://www.google.com/ping", "https://www.bing.com/ping"];

/// Command-line arguments for the Quire binary.
#[derive(Debug, Parser)]
#[command(name = "quire", version, about = "Quire content sync and SSR server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "QUIRE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Content-source API credential; read for every command.
    #[arg(
        long = "notion-api-key",
        env = "NOTION_API_KEY",
        value_name = "TOKEN",
        global = true,
        hide_env_values = true
    )]
    pub notion_api_key: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Notify search engines about the current sitemap and exit.
    Ping(PingArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PingArgs {
    /// Override the public site URL the sitemap lives under.
    #[arg(long = "seo-public-site-url", value_name = "URL")]
    pub public_site_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the post-store base URL.
    #[arg(long = "posts-base-url", value_name = "URL")]
    pub posts_base_url: Option<String>,

    /// Force-disable link-preview enrichment while rendering.
    #[arg(
        long = "render-disable-embeds",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub render_disable_embeds: Option<bool>,

    /// Override how many collection items render at once.
    #[arg(long = "render-collection-concurrency", value_name = "COUNT")]
    pub render_collection_concurrency: Option<usize>,

    /// Override the public site URL used for canonical links and the sitemap.
    #[arg(long = "seo-public-site-url", value_name = "URL")]
    pub seo_public_site_url: Option<String>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub notion: NotionSettings,
    pub posts: PostStoreSettings,
    pub render: RenderSettings,
    pub seo: SeoSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
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

#[derive(Debug, Clone)]
pub struct NotionSettings {
    /// Checked when the server starts; other commands run without it.
    pub api_key: Option<String>,
    pub base_url: Url,
    pub version: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PostStoreSettings {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub disable_embeds: bool,
    pub embed_timeout: Duration,
    pub collection_concurrency: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct SeoSettings {
    pub public_site_url: String,
    pub site_name: String,
    pub author: String,
    pub item_path: String,
    pub ping_endpoints: Vec<String>,
    pub ping_timeout: Duration,
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

    builder = builder.add_source(Environment::with_prefix("QUIRE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Ping(args)) => raw.apply_ping_overrides(args),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }
    if let Some(key) = cli.notion_api_key.as_ref() {
        raw.notion.api_key = Some(key.clone());
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    notion: RawNotionSettings,
    posts: RawPostStoreSettings,
    render: RawRenderSettings,
    seo: RawSeoSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.posts_base_url.as_ref() {
            self.posts.base_url = Some(url.clone());
        }
        if let Some(disable) = overrides.render_disable_embeds {
            self.render.disable_embeds = Some(disable);
        }
        if let Some(value) = overrides.render_collection_concurrency {
            self.render.collection_concurrency = Some(value);
        }
        if let Some(url) = overrides.seo_public_site_url.as_ref() {
            self.seo.public_site_url = Some(url.clone());
        }
    }

    fn apply_ping_overrides(&mut self, overrides: &PingArgs) {
        if let Some(url) = overrides.public_site_url.as_ref() {
            self.seo.public_site_url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            notion,
            posts,
            render,
            seo,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            notion: build_notion_settings(notion)?,
            posts: build_post_store_settings(posts)?,
            render: build_render_settings(render)?,
            seo: build_seo_settings(seo)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }
    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);

    Ok(ServerSettings {
        addr,
        graceful_shutdown: positive_secs(graceful_secs, "server.graceful_shutdown_seconds")?,
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

fn build_notion_settings(notion: RawNotionSettings) -> Result<NotionSettings, LoadError> {
    let api_key = notion.api_key.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let base_url = parse_base_url(
        notion.base_url.as_deref().unwrap_or(DEFAULT_NOTION_BASE_URL),
        "notion.base_url",
    )?;

    let version = notion
        .version
        .unwrap_or_else(|| DEFAULT_NOTION_VERSION.to_string());
    if version.trim().is_empty() {
        return Err(LoadError::invalid("notion.version", "must not be empty"));
    }

    let timeout = positive_secs(
        notion.timeout_seconds.unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        "notion.timeout_seconds",
    )?;

    Ok(NotionSettings {
        api_key,
        base_url,
        version,
        timeout,
    })
}

fn build_post_store_settings(posts: RawPostStoreSettings) -> Result<PostStoreSettings, LoadError> {
    let base_url = parse_base_url(
        posts.base_url.as_deref().unwrap_or(DEFAULT_POSTS_BASE_URL),
        "posts.base_url",
    )?;
    let timeout = positive_secs(
        posts.timeout_seconds.unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        "posts.timeout_seconds",
    )?;

    Ok(PostStoreSettings { base_url, timeout })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let embed_timeout = positive_secs(
        render
            .embed_timeout_seconds
            .unwrap_or(DEFAULT_EMBED_TIMEOUT_SECS),
        "render.embed_timeout_seconds",
    )?;

    let collection_concurrency = NonZeroUsize::new(
        render
            .collection_concurrency
            .unwrap_or(DEFAULT_COLLECTION_CONCURRENCY),
    )
    .ok_or_else(|| {
        LoadError::invalid("render.collection_concurrency", "must be greater than zero")
    })?;

    Ok(RenderSettings {
        disable_embeds: render.disable_embeds.unwrap_or(false),
        embed_timeout,
        collection_concurrency,
    })
}

fn build_seo_settings(seo: RawSeoSettings) -> Result<SeoSettings, LoadError> {
    let public_site_url = seo
        .public_site_url
        .unwrap_or_else(|| DEFAULT_PUBLIC_SITE_URL.to_string());
    Url::parse(public_site_url.trim())
        .map_err(|err| LoadError::invalid("seo.public_site_url", err.to_string()))?;

    let item_path = seo
        .item_path
        .unwrap_or_else(|| DEFAULT_ITEM_PATH.to_string());
    if item_path.trim_matches('/').is_empty() {
        return Err(LoadError::invalid("seo.item_path", "must not be empty"));
    }

    let ping_endpoints = seo.ping_endpoints.unwrap_or_else(|| {
        DEFAULT_PING_ENDPOINTS
            .iter()
            .map(|endpoint| endpoint.to_string())
            .collect()
    });
    for endpoint in &ping_endpoints {
        Url::parse(endpoint).map_err(|err| {
            LoadError::invalid("seo.ping_endpoints", format!("`{endpoint}`: {err}"))
        })?;
    }

    Ok(SeoSettings {
        public_site_url: public_site_url.trim().to_string(),
        site_name: seo
            .site_name
            .unwrap_or_else(|| DEFAULT_SITE_NAME.to_string()),
        author: seo.author.unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        item_path,
        ping_endpoints,
        ping_timeout: positive_secs(
            seo.ping_timeout_seconds.unwrap_or(DEFAULT_PING_TIMEOUT_SECS),
            "seo.ping_timeout_seconds",
        )?,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNotionSettings {
    api_key: Option<String>,
    base_url: Option<String>,
    version: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPostStoreSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    disable_embeds: Option<bool>,
    embed_timeout_seconds: Option<u64>,
    collection_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSeoSettings {
    public_site_url: Option<String>,
    site_name: Option<String>,
    author: Option<String>,
    item_path: Option<String>,
    ping_endpoints: Option<Vec<String>>,
    ping_timeout_seconds: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

/// Base URLs always end in `/` so relative joins keep their path prefix.
fn parse_base_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let trimmed = value.trim();
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&normalized).map_err(|err| LoadError::invalid(key, err.to_string()))
}

fn positive_secs(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
