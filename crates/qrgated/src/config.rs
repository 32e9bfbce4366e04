//! qrgate.toml configuration.
//!
//! Every field is optional. Values resolve as CLI flag (or its env var),
//! then config file, then default.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use qrgate_render::SvgOptions;
use qrgate_session::StoreOptions;

use crate::cli::ServeArgs;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(240);
pub const DEFAULT_KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub render: RenderConfig,
    pub keepalive: KeepAliveConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: Option<IpAddr>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub freshness_secs: Option<u64>,
    pub render_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub min_size: Option<u32>,
    pub quiet_zone: Option<bool>,
    pub dark_color: Option<String>,
    pub light_color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeepAliveConfig {
    pub url: Option<String>,
    pub interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

/// Keep-alive settings after resolution; present only when a URL is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepAliveSettings {
    pub url: String,
    pub interval: Duration,
    pub timeout: Duration,
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub addr: SocketAddr,
    pub store: StoreOptions,
    pub svg: SvgOptions,
    pub keepalive: Option<KeepAliveSettings>,
}

impl ServiceConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Merge CLI flags over this file config and fill in defaults.
    pub fn merge_cli(&self, args: &ServeArgs) -> ResolvedConfig {
        let bind = args
            .bind
            .or(self.server.bind)
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port = args.port.or(self.server.port).unwrap_or(DEFAULT_PORT);

        let defaults = StoreOptions::default();
        let store = StoreOptions {
            freshness_window: args
                .freshness_secs
                .or(self.session.freshness_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.freshness_window),
            render_timeout: args
                .render_timeout_ms
                .or(self.session.render_timeout_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.render_timeout),
        };

        let svg_defaults = SvgOptions::default();
        let svg = SvgOptions {
            min_size: self.render.min_size.unwrap_or(svg_defaults.min_size),
            quiet_zone: self.render.quiet_zone.unwrap_or(svg_defaults.quiet_zone),
            dark_color: self
                .render
                .dark_color
                .clone()
                .unwrap_or(svg_defaults.dark_color),
            light_color: self
                .render
                .light_color
                .clone()
                .unwrap_or(svg_defaults.light_color),
            ec_level: svg_defaults.ec_level,
        };

        let keepalive = args
            .keepalive_url
            .clone()
            .or_else(|| self.keepalive.url.clone())
            .map(|url| KeepAliveSettings {
                url,
                interval: args
                    .keepalive_interval_secs
                    .or(self.keepalive.interval_secs)
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_KEEPALIVE_INTERVAL),
                timeout: self
                    .keepalive
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_KEEPALIVE_TIMEOUT),
            });

        ResolvedConfig {
            addr: SocketAddr::new(bind, port),
            store,
            svg,
            keepalive,
        }
    }
}
