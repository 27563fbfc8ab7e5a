use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use sync_engine::ViewOptions;

const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_DEBOUNCE: &str = "500ms";
const DEFAULT_CONNECT_TIMEOUT: &str = "5s";
const DEFAULT_REQUEST_TIMEOUT: &str = "15s";
const DEFAULT_LIST_POLL: &str = "10s";
const DEFAULT_USERS_POLL: &str = "30s";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    api: RawApiConfig,
    #[serde(default)]
    views: RawViewsConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawApiConfig {
    base_url: String,
    token: Option<String>,
    token_env: Option<String>,
    connect_timeout: Option<String>,
    request_timeout: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawViewsConfig {
    page_size: Option<u32>,
    debounce: Option<String>,
    #[serde(default)]
    deals: RawViewConfig,
    #[serde(default)]
    disputes: RawViewConfig,
    #[serde(default)]
    users: RawViewConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawViewConfig {
    poll_interval: Option<String>,
    poll_on_mount: Option<bool>,
    page_size: Option<u32>,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiSettings {
    pub(crate) base_url: String,
    pub(crate) token: Option<String>,
    pub(crate) connect_timeout: Duration,
    pub(crate) request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub(crate) struct DeskConfig {
    pub(crate) api: ApiSettings,
    pub(crate) deals: ViewOptions,
    pub(crate) disputes: ViewOptions,
    pub(crate) users: ViewOptions,
}

pub(crate) fn load_desk_config(path: &Path) -> anyhow::Result<DeskConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_desk_config(&raw, |name| std::env::var(name).ok())
        .with_context(|| format!("invalid config {}", path.display()))
}

fn parse_desk_config(
    raw: &str,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<DeskConfig> {
    let parsed: RawConfig = toml::from_str(raw).context("failed to parse toml")?;
    resolve(parsed, env)
}

fn resolve(raw: RawConfig, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<DeskConfig> {
    let base_url = raw.api.base_url.trim().to_string();
    if base_url.is_empty() {
        anyhow::bail!("api.base_url must not be empty");
    }
    let token = match (raw.api.token, raw.api.token_env) {
        (Some(_), Some(_)) => anyhow::bail!("set only one of api.token and api.token_env"),
        (Some(token), None) => Some(token),
        (None, Some(name)) => Some(
            env(name.trim())
                .with_context(|| format!("environment variable {} is not set", name.trim()))?,
        ),
        (None, None) => None,
    };
    let api = ApiSettings {
        base_url,
        token,
        connect_timeout: duration_or(
            "api.connect_timeout",
            raw.api.connect_timeout.as_deref(),
            DEFAULT_CONNECT_TIMEOUT,
        )?,
        request_timeout: duration_or(
            "api.request_timeout",
            raw.api.request_timeout.as_deref(),
            DEFAULT_REQUEST_TIMEOUT,
        )?,
    };

    let page_size = raw.views.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    let debounce = duration_or("views.debounce", raw.views.debounce.as_deref(), DEFAULT_DEBOUNCE)?;
    let deals = view_options("deals", &raw.views.deals, page_size, debounce, DEFAULT_LIST_POLL)?;
    let disputes = view_options(
        "disputes",
        &raw.views.disputes,
        page_size,
        debounce,
        DEFAULT_LIST_POLL,
    )?;
    let users = view_options("users", &raw.views.users, page_size, debounce, DEFAULT_USERS_POLL)?;
    Ok(DeskConfig {
        api,
        deals,
        disputes,
        users,
    })
}

fn view_options(
    name: &str,
    raw: &RawViewConfig,
    page_size: u32,
    debounce: Duration,
    default_poll: &str,
) -> anyhow::Result<ViewOptions> {
    let page_size = raw.page_size.unwrap_or(page_size);
    if page_size == 0 {
        anyhow::bail!("views.{name}.page_size must be at least 1");
    }
    let poll_key = format!("views.{name}.poll_interval");
    let poll_interval = duration_or(&poll_key, raw.poll_interval.as_deref(), default_poll)?;
    if poll_interval.is_zero() {
        anyhow::bail!("{poll_key} must be greater than zero");
    }
    Ok(ViewOptions {
        page_size,
        debounce,
        poll_interval,
        poll_on_mount: raw.poll_on_mount.unwrap_or(true),
    })
}

fn duration_or(key: &str, value: Option<&str>, default: &str) -> anyhow::Result<Duration> {
    let value = value.unwrap_or(default).trim();
    humantime::parse_duration(value).with_context(|| format!("{key} has invalid duration {value:?}"))
}
