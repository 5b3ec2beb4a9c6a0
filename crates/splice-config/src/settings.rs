//! Resolver settings parsing.
//!
//! ```kdl
//! resolver {
//!     max-depth 100
//!     max-includes 150
//!     concurrency 8
//! }
//! remote {
//!     timeout-secs 10
//!     max-size 1048576
//!     allow-host "gitlab.example.com" "cdn.example.com"
//! }
//! instance {
//!     url "https://gitlab.example.com"
//! }
//! ```
//!
//! Every setting is optional; omitted values keep their defaults.

use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MAX_DEPTH: usize = 100;
pub const DEFAULT_MAX_INCLUDES: usize = 150;
pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REMOTE_MAX_SIZE: usize = 1024 * 1024;
pub const DEFAULT_INSTANCE_URL: &str = "https://gitlab.example.com";

/// Limits and endpoints for include resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Maximum nesting depth of includes.
    pub max_depth: usize,
    /// Maximum number of includes in one resolution pass.
    pub max_includes: usize,
    /// Maximum number of sibling includes fetched at once.
    pub concurrency: usize,
    pub remote: RemoteSettings,
    /// Base URL of the instance that hosts projects and components.
    pub instance_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Largest accepted remote fragment, in bytes.
    pub max_size: usize,
    /// Hosts remote includes may be fetched from. Empty allows any host.
    pub allowed_hosts: Vec<String>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_includes: DEFAULT_MAX_INCLUDES,
            concurrency: DEFAULT_CONCURRENCY,
            remote: RemoteSettings::default(),
            instance_url: DEFAULT_INSTANCE_URL.to_string(),
        }
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REMOTE_TIMEOUT,
            max_size: DEFAULT_REMOTE_MAX_SIZE,
            allowed_hosts: Vec::new(),
        }
    }
}

impl ResolverSettings {
    /// Host part of the instance URL, used as the component registry host.
    pub fn instance_host(&self) -> Option<String> {
        url::Url::parse(&self.instance_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
    }

    /// Whether a remote include may be fetched from `host`.
    pub fn allows_remote_host(&self, host: &str) -> bool {
        self.remote.allowed_hosts.is_empty()
            || self
                .remote
                .allowed_hosts
                .iter()
                .any(|h| h.eq_ignore_ascii_case(host))
    }
}

/// Parse resolver settings from KDL text.
pub fn parse_settings(kdl: &str) -> ConfigResult<ResolverSettings> {
    let doc: KdlDocument = kdl.parse()?;
    let mut settings = ResolverSettings::default();

    for node in doc.nodes() {
        match node.name().value() {
            "resolver" => {
                for child in child_nodes(node) {
                    match child.name().value() {
                        "max-depth" => settings.max_depth = get_usize_arg(child)?,
                        "max-includes" => settings.max_includes = get_usize_arg(child)?,
                        "concurrency" => settings.concurrency = get_usize_arg(child)?.max(1),
                        other => return Err(ConfigError::UnknownSetting(format!("resolver.{other}"))),
                    }
                }
            }
            "remote" => {
                for child in child_nodes(node) {
                    match child.name().value() {
                        "timeout-secs" => {
                            settings.remote.timeout =
                                Duration::from_secs(get_usize_arg(child)? as u64);
                        }
                        "max-size" => settings.remote.max_size = get_usize_arg(child)?,
                        "allow-host" => settings
                            .remote
                            .allowed_hosts
                            .extend(get_all_string_args(child).into_iter().map(|h| h.to_lowercase())),
                        other => return Err(ConfigError::UnknownSetting(format!("remote.{other}"))),
                    }
                }
            }
            "instance" => {
                for child in child_nodes(node) {
                    match child.name().value() {
                        "url" => {
                            let url = get_first_string_arg(child).ok_or_else(|| {
                                ConfigError::InvalidValue {
                                    field: "instance.url".to_string(),
                                    message: "expected a string".to_string(),
                                }
                            })?;
                            url::Url::parse(&url).map_err(|e| ConfigError::InvalidValue {
                                field: "instance.url".to_string(),
                                message: e.to_string(),
                            })?;
                            settings.instance_url = url.trim_end_matches('/').to_string();
                        }
                        other => return Err(ConfigError::UnknownSetting(format!("instance.{other}"))),
                    }
                }
            }
            other => return Err(ConfigError::UnknownSetting(other.to_string())),
        }
    }

    Ok(settings)
}

/// Load resolver settings from a KDL file.
pub fn load_settings(path: &Path) -> ConfigResult<ResolverSettings> {
    let content = std::fs::read_to_string(path)?;
    parse_settings(&content)
}

// Helper functions for extracting values from KDL nodes

fn child_nodes(node: &KdlNode) -> &[KdlNode] {
    node.children().map(|c| c.nodes()).unwrap_or_default()
}

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

fn get_usize_arg(node: &KdlNode) -> ConfigResult<usize> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_integer())
        .and_then(|i| usize::try_from(i).ok())
        .ok_or_else(|| ConfigError::InvalidValue {
            field: node.name().value().to_string(),
            message: "expected a non-negative integer".to_string(),
        })
}
