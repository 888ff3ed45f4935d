use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Deserialize;

use crate::config::CdnSettings;
use crate::error::ConfigError;

/// Prefix of environment variables that override file settings, e.g.
/// `CDN_REDIRECT_CDN__AUTH__PRIVATE_KEY`
pub const ENV_PREFIX: &str = "CDN_REDIRECT";

#[derive(Debug, Clone, Parser)]
#[command(name = "cdn-redirect", about = "Signed CDN redirect server for media libraries")]
pub struct Config {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the YAML configuration file
    #[arg(
        short,
        long,
        env = "CDN_REDIRECT_CONFIG",
        default_value = "config.yml",
        global = true
    )]
    pub config: PathBuf,

    /// Listen address
    #[arg(long, env = "CDN_REDIRECT_LISTEN", default_value = "0.0.0.0:8097")]
    pub listen: String,

    /// Origin media server used when a request cannot be redirected to the CDN
    #[arg(long, env = "CDN_REDIRECT_ORIGIN")]
    pub origin: Option<String>,

    /// Enable metrics endpoint at /metrics
    #[arg(long, env = "CDN_REDIRECT_METRICS", default_value_t = false)]
    pub metrics: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        env = "CDN_REDIRECT_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    pub log_level: String,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start the redirect server (default)
    Serve,

    /// Print the redirect URL for a media-library path
    Sign {
        /// Media-library path, e.g. /movie/test.mkv
        path: String,
    },
}

/// Top-level layout of the configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cdn: CdnSettings,
}

impl Settings {
    /// Load `path` as YAML, then apply `CDN_REDIRECT_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)));
        Self::load_with_env(path, vars)
    }

    /// Like [`Settings::load`], reading overrides from `vars` instead of the
    /// process environment.
    ///
    /// Values stay strings until a field asks for a number or a bool, so a
    /// key like `0123456` keeps its leading zero.
    pub fn load_with_env<I>(path: &Path, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let builder = ::config::Config::builder()
            .add_source(::config::File::from(path).format(::config::FileFormat::Yaml))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(Some(env_overrides(vars))),
            );
        Self::from_builder(builder)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let builder = ::config::Config::builder()
            .add_source(::config::File::from_str(yaml, ::config::FileFormat::Yaml));
        Self::from_builder(builder)
    }

    fn from_builder(
        builder: ::config::ConfigBuilder<::config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| ConfigError::Load(e.to_string()))
    }
}

/// Keep the `CDN_REDIRECT_*` variables, spelling each segment the way the file
/// does: `CDN_REDIRECT_CDN__AUTH__PRIVATE_KEY` overrides `cdn.auth.private-key`.
fn env_overrides<I>(vars: I) -> ::config::Map<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let prefix = format!("{ENV_PREFIX}_");
    vars.into_iter()
        .filter_map(|(key, value)| {
            let rest = key.strip_prefix(&prefix)?;
            let rest = rest
                .split("__")
                .map(|segment| segment.replace('_', "-"))
                .collect::<Vec<_>>()
                .join("__");
            Some((format!("{prefix}{rest}"), value))
        })
        .collect()
}
