//! Sync run configuration.
//!
//! Provides [`SyncConfig`], loaded from `PLUGIN_*` environment variables the
//! way CI plugins receive their settings. Validation is separate from
//! loading so a misconfigured run fails with a precise message before any
//! storage client is built.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{SyncError, SyncResult};
use crate::types::Command;

/// Per-request timeout applied by the storage client, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 100;

/// Configuration of one sync run.
///
/// # Examples
///
/// ```
/// use cossync_core::SyncConfig;
///
/// let config = SyncConfig::builder()
///     .bucket("backups-1250000000".into())
///     .region("ap-guangzhou".into())
///     .key("nightly".into())
///     .local_path("./dist".into())
///     .secret_id("id".into())
///     .secret_key("secret".into())
///     .build();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.command, "upload");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// `upload`, `download` or `delete`. Empty means `upload`.
    #[builder(default = String::from("upload"))]
    pub command: String,

    /// Bucket name.
    #[builder(default)]
    pub bucket: String,

    /// Bucket region.
    #[builder(default)]
    pub region: String,

    /// Base remote key (prefix) of the run.
    #[builder(default)]
    pub key: String,

    /// Local file or directory. Not needed for `delete`.
    #[builder(default)]
    pub local_path: String,

    /// Access key id.
    #[builder(default)]
    pub secret_id: String,

    /// Secret access key.
    #[builder(default)]
    #[serde(skip_serializing, default)]
    pub secret_key: String,

    /// Endpoint override. Defaults to the regional COS endpoint.
    #[builder(default)]
    pub endpoint: Option<String>,

    /// Use path-style bucket addressing.
    #[builder(default = false)]
    pub path_style: bool,

    /// Per-request timeout in seconds.
    #[builder(default = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// Deadline for the whole run in seconds. `None` means no deadline.
    #[builder(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Fallback | Default |
    /// |----------|----------|---------|
    /// | `PLUGIN_LOG_LEVEL` | | `info` |
    /// | `PLUGIN_COMMAND` | | `upload` |
    /// | `PLUGIN_BUCKET` | | |
    /// | `PLUGIN_REGION` | | |
    /// | `PLUGIN_KEY` | `PLUGIN_TARGET` | |
    /// | `PLUGIN_LOCAL_PATH` | `PLUGIN_SOURCE` | |
    /// | `PLUGIN_SECRET_ID` | `COS_SECRETID` | |
    /// | `PLUGIN_SECRET_KEY` | `COS_SECRETKEY` | |
    /// | `PLUGIN_ENDPOINT` | | regional endpoint |
    /// | `PLUGIN_PATH_STYLE` | | `false` |
    /// | `PLUGIN_REQUEST_TIMEOUT` | | `100` |
    /// | `PLUGIN_TIMEOUT` | | none |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |names: &[&str]| names.iter().find_map(|name| lookup(*name));
        let mut config = Self::default();

        if let Some(v) = first(&["PLUGIN_LOG_LEVEL"]) {
            config.log_level = v;
        }
        if let Some(v) = first(&["PLUGIN_COMMAND"]) {
            config.command = v;
        }
        if let Some(v) = first(&["PLUGIN_BUCKET"]) {
            config.bucket = v;
        }
        if let Some(v) = first(&["PLUGIN_REGION"]) {
            config.region = v;
        }
        if let Some(v) = first(&["PLUGIN_KEY", "PLUGIN_TARGET"]) {
            config.key = v;
        }
        if let Some(v) = first(&["PLUGIN_LOCAL_PATH", "PLUGIN_SOURCE"]) {
            config.local_path = v;
        }
        if let Some(v) = first(&["PLUGIN_SECRET_ID", "COS_SECRETID"]) {
            config.secret_id = v;
        }
        if let Some(v) = first(&["PLUGIN_SECRET_KEY", "COS_SECRETKEY"]) {
            config.secret_key = v;
        }
        if let Some(v) = first(&["PLUGIN_ENDPOINT"]) {
            if !v.is_empty() {
                config.endpoint = Some(v);
            }
        }
        if let Some(v) = first(&["PLUGIN_PATH_STYLE"]) {
            config.path_style = parse_bool(&v);
        }
        if let Some(v) = first(&["PLUGIN_REQUEST_TIMEOUT"]) {
            if let Ok(n) = v.parse::<u64>() {
                config.request_timeout_secs = n;
            }
        }
        if let Some(v) = first(&["PLUGIN_TIMEOUT"]) {
            config.timeout_secs = v.parse::<u64>().ok().filter(|n| *n > 0);
        }

        config
    }

    /// The parsed command.
    #[must_use]
    pub fn command(&self) -> Command {
        Command::parse(&self.command)
    }

    /// Check required fields, one at a time, in a fixed order.
    ///
    /// The first empty field wins; errors are not aggregated.
    pub fn validate(&self) -> SyncResult<()> {
        let required = [
            ("bucket", &self.bucket),
            ("region", &self.region),
            ("key", &self.key),
            ("secret_id", &self.secret_id),
            ("secret_key", &self.secret_key),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(SyncError::MissingConfig { field });
            }
        }
        if self.command() != Command::Delete && self.local_path.trim().is_empty() {
            return Err(SyncError::MissingConfig {
                field: "local_path",
            });
        }
        Ok(())
    }

    /// The endpoint the storage client should talk to.
    #[must_use]
    pub fn resolved_endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://cos.{}.myqcloud.com", self.region),
        }
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
