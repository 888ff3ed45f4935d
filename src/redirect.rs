use std::fmt;

use tracing::debug;

use crate::config::RedirectConfig;
use crate::encoding::encode_path;
use crate::error::{RedirectError, Result};
use crate::signer::{unix_now, PathForm, SignToken};

/// A redirect target ready to be placed in a `Location` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectUrl {
    /// Full URL: endpoint, encoded path and optional sign query
    pub url: String,
    /// Storage path after mapping, normalisation and bucket prefixing
    pub path: String,
    /// Percent-encoded form of `path`
    pub encoded_path: String,
    /// Token appended to the query, if signing is enabled
    pub token: Option<SignToken>,
}

impl RedirectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for RedirectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl From<RedirectUrl> for String {
    fn from(url: RedirectUrl) -> Self {
        url.url
    }
}

/// Builds CDN redirect URLs from media-library paths.
///
/// Holds only immutable configuration, so one instance can be shared across
/// request handlers without locking.
///
/// # Example
///
/// ```rust
/// use cdn_redirect::{PathMapping, RedirectConfig, RedirectUrlBuilder, Signer, Vendor};
///
/// let config = RedirectConfig::new(Vendor::TypeA, "https://cdn.example.com/")
///     .unwrap()
///     .with_mapping(PathMapping::parse(&["/movie:/media"]).unwrap())
///     .with_signer(Signer::new(Vendor::TypeA, "secret"));
/// let builder = RedirectUrlBuilder::new(config);
///
/// let url = builder.build_at("/movie/test.mkv", 1700000000).unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://cdn.example.com/media/test.mkv?sign=1700000000-0-0-5dcdebccb8c83490ef59dfad44fddd55"
/// );
/// ```
#[derive(Debug)]
pub struct RedirectUrlBuilder {
    config: RedirectConfig,
}

impl RedirectUrlBuilder {
    pub fn new(config: RedirectConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RedirectConfig {
        &self.config
    }

    /// Build the redirect URL for `source_path`, signing at the current time.
    pub fn build(&self, source_path: &str) -> Result<RedirectUrl> {
        self.build_at(source_path, unix_now())
    }

    /// Same as [`build`](Self::build) but returns only the URL string.
    pub fn build_url(&self, source_path: &str) -> Result<String> {
        self.build(source_path).map(String::from)
    }

    /// Build with a fixed signing timestamp.
    pub fn build_at(&self, source_path: &str, timestamp: u64) -> Result<RedirectUrl> {
        if !self.config.is_enabled() {
            return Err(RedirectError::FeatureDisabled);
        }

        let mapped = self.config.mapping().map(source_path)?;
        let mut path = normalize(&mapped);
        if let Some(bucket) = self.config.bucket() {
            path = format!("/{bucket}{path}");
        }

        let encoded_path = encode_path(&path);
        debug!(path = %path, encoded = %encoded_path, "cdn path");

        let mut url = format!("{}{}", self.config.endpoint(), encoded_path);
        let token = self.config.signer().map(|signer| {
            let canonical = match signer.path_form() {
                PathForm::Raw => path.as_str(),
                PathForm::Encoded => encoded_path.as_str(),
            };
            signer.sign_at(canonical, timestamp)
        });

        if let Some(token) = &token {
            url.push('?');
            url.push_str(self.config.sign_param());
            url.push('=');
            url.push_str(&token.to_string());
        }

        Ok(RedirectUrl {
            url,
            path,
            encoded_path,
            token,
        })
    }
}

/// Ensure a single leading `/` and collapse runs of `/`.
fn normalize(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    normalized.push('/');
    for c in path.chars() {
        if c == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(c);
    }
    normalized
}
