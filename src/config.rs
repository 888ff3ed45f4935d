//! Configuration shape of the `cdn` section and its validation.
//!
//! [`CdnSettings`] mirrors the file layout. [`CdnSettings::validate`] applies
//! defaults, rejects unusable values, and produces the immutable
//! [`RedirectConfig`] that request handlers share.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::mapping::PathMapping;
use crate::nonce::{Alphabet, NonceGenerator};
use crate::signer::{Signer, SigningScheme, Vendor, DEFAULT_IDENTIFIER, DEFAULT_TTL_SECS};
use crate::utils::crypto::HashCase;

pub const DEFAULT_SIGN_PARAM: &str = "sign";
pub const DEFAULT_API_KEY_HEADER: &str = "X-Api-Key";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CdnSettings {
    pub enable: bool,
    pub vendor: Vendor,
    pub endpoint: String,
    /// Type-A only: prefixed into both the URL and the signed path
    pub bucket: Option<String>,
    pub sign_param: Option<String>,
    /// `source:dest` rules, tried in order
    pub path_mapping: Vec<String>,
    pub auth: AuthSettings,
    pub api_key: ApiKeySettings,
}

#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AuthSettings {
    pub enable: bool,
    pub private_key: String,
    #[serde(alias = "ttl")]
    pub ttl_seconds: i64,
    #[serde(alias = "use-uid")]
    pub use_identifier: bool,
    #[serde(alias = "uid")]
    pub identifier: String,
    pub separator: String,
    #[serde(alias = "md5-to-upper")]
    pub hash_uppercase: bool,
    pub use_random: bool,
    pub random_length: i64,
    pub random_alphabet: Alphabet,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            enable: false,
            private_key: String::new(),
            ttl_seconds: DEFAULT_TTL_SECS as i64,
            use_identifier: true,
            identifier: DEFAULT_IDENTIFIER.to_string(),
            separator: String::new(),
            hash_uppercase: false,
            use_random: false,
            random_length: 0,
            random_alphabet: Alphabet::default(),
        }
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("enable", &self.enable)
            .field("private_key", &"[REDACTED]")
            .field("ttl_seconds", &self.ttl_seconds)
            .field("use_identifier", &self.use_identifier)
            .field("identifier", &self.identifier)
            .field("separator", &self.separator)
            .field("hash_uppercase", &self.hash_uppercase)
            .field("use_random", &self.use_random)
            .field("random_length", &self.random_length)
            .field("random_alphabet", &self.random_alphabet)
            .finish()
    }
}

/// Header attached to redirect responses so the storage origin can tell the
/// request came through this server.
#[derive(Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ApiKeySettings {
    pub enable: bool,
    pub header_name: String,
    pub key: String,
}

impl fmt::Debug for ApiKeySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeySettings")
            .field("enable", &self.enable)
            .field("header_name", &self.header_name)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug)]
pub struct ApiKey {
    header_name: String,
    key: SecretString,
}

impl ApiKey {
    pub fn new(header_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
            key: SecretString::from(key.into()),
        }
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn value(&self) -> &str {
        self.key.expose_secret()
    }
}

/// Validated, immutable redirect configuration
#[derive(Debug)]
pub struct RedirectConfig {
    enabled: bool,
    vendor: Vendor,
    endpoint: String,
    bucket: Option<String>,
    sign_param: String,
    mapping: PathMapping,
    signer: Option<Signer>,
    api_key: Option<ApiKey>,
}

impl RedirectConfig {
    /// An enabled configuration with no mapping rules and no signing
    pub fn new(vendor: Vendor, endpoint: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            enabled: true,
            vendor,
            endpoint: parse_endpoint(endpoint)?,
            bucket: None,
            sign_param: DEFAULT_SIGN_PARAM.to_string(),
            mapping: PathMapping::default(),
            signer: None,
            api_key: None,
        })
    }

    /// A configuration on which every build fails with `FeatureDisabled`
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            vendor: Vendor::default(),
            endpoint: String::new(),
            bucket: None,
            sign_param: DEFAULT_SIGN_PARAM.to_string(),
            mapping: PathMapping::default(),
            signer: None,
            api_key: None,
        }
    }

    pub fn with_mapping(mut self, mapping: PathMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_bucket(mut self, bucket: impl AsRef<str>) -> Self {
        let bucket = bucket.as_ref().trim().trim_matches('/');
        self.bucket = (!bucket.is_empty()).then(|| bucket.to_string());
        self
    }

    pub fn with_signer(mut self, signer: Signer) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn with_sign_param(mut self, sign_param: impl Into<String>) -> Self {
        self.sign_param = sign_param.into();
        self
    }

    pub fn with_api_key(mut self, api_key: ApiKey) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    pub fn sign_param(&self) -> &str {
        &self.sign_param
    }

    pub fn mapping(&self) -> &PathMapping {
        &self.mapping
    }

    pub fn signer(&self) -> Option<&Signer> {
        self.signer.as_ref()
    }

    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }
}

/// Trim trailing `/` and require an absolute http(s) URL.
fn parse_endpoint(endpoint: &str) -> Result<String, ConfigError> {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.is_empty() {
        return Err(ConfigError::MissingEndpoint);
    }

    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = url::Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("only http and https are supported".into()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not carry a query or fragment".into()));
    }

    Ok(endpoint.to_string())
}

impl CdnSettings {
    pub fn validate(self) -> Result<RedirectConfig, ConfigError> {
        if !self.enable {
            info!("cdn redirect disabled");
            return Ok(RedirectConfig::disabled());
        }

        let mapping = PathMapping::parse(&self.path_mapping)?;
        if mapping.is_empty() {
            warn!("no cdn path mapping configured, every request will fall back to origin");
        }
        for rule in mapping.rules() {
            info!(from = %rule.source, to = %rule.dest, "cdn path mapping");
        }

        let mut config = RedirectConfig::new(self.vendor, &self.endpoint)?.with_mapping(mapping);

        if let Some(sign_param) = self.sign_param.as_deref().map(str::trim) {
            if !sign_param.is_empty() {
                config = config.with_sign_param(sign_param);
            }
        }

        if let Some(bucket) = self.bucket.as_deref() {
            match self.vendor {
                Vendor::TypeA => config = config.with_bucket(bucket),
                Vendor::GoEdge if !bucket.trim().is_empty() => {
                    warn!(bucket, "cdn.bucket is only used by type-a, ignoring");
                }
                Vendor::GoEdge => {}
            }
        }

        if let Some(signer) = self.auth.into_signer(self.vendor)? {
            config = config.with_signer(signer);
        }

        if let Some(api_key) = self.api_key.into_api_key() {
            config = config.with_api_key(api_key);
        }

        info!(
            vendor = %config.vendor(),
            endpoint = config.endpoint(),
            bucket = config.bucket().unwrap_or(""),
            signed = config.signer().is_some(),
            "cdn redirect enabled"
        );
        Ok(config)
    }
}

impl AuthSettings {
    /// GoEdge always signs with `@`, no identifier and a lowercase hash; any
    /// `separator`, `identifier` or `hash-uppercase` override is logged and dropped.
    fn into_signer(self, vendor: Vendor) -> Result<Option<Signer>, ConfigError> {
        if !self.enable {
            return Ok(None);
        }
        if self.private_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential {
                field: "cdn.auth.private-key",
            });
        }

        let ttl = u64::try_from(self.ttl_seconds)
            .ok()
            .filter(|ttl| *ttl > 0)
            .unwrap_or(DEFAULT_TTL_SECS);

        let identifier = match self.identifier.trim() {
            "" => DEFAULT_IDENTIFIER.to_string(),
            identifier => identifier.to_string(),
        };

        let separator = if self.separator.is_empty() {
            vendor.default_scheme().separator
        } else {
            self.separator
        };

        if vendor == Vendor::GoEdge
            && (separator != "@" || self.hash_uppercase || identifier != DEFAULT_IDENTIFIER)
        {
            warn!(
                "goedge signs with a fixed '@' separator, no identifier and lowercase hash, ignoring overrides"
            );
        }

        let scheme = SigningScheme {
            separator,
            identifier: self.use_identifier.then_some(identifier),
            hash_case: if self.hash_uppercase {
                HashCase::Upper
            } else {
                HashCase::Lower
            },
        };

        let nonce = NonceGenerator::new(
            self.use_random,
            self.random_alphabet,
            self.random_length,
            vendor.default_nonce_length(),
        );

        let signer = Signer::new(vendor, self.private_key)
            .with_scheme(scheme)
            .with_nonce(nonce)
            .with_ttl(ttl);

        info!(
            vendor = %vendor,
            ttl,
            separator = %signer.scheme().separator,
            identifier = signer.scheme().identifier.as_deref().unwrap_or("-"),
            random = nonce.is_enabled(),
            random_length = nonce.length(),
            "cdn auth enabled"
        );

        Ok(Some(signer))
    }
}

impl ApiKeySettings {
    fn into_api_key(self) -> Option<ApiKey> {
        if !self.enable {
            return None;
        }
        let header_name = match self.header_name.trim() {
            "" => DEFAULT_API_KEY_HEADER,
            name => name,
        };
        if self.key.is_empty() {
            warn!(header = header_name, "cdn.api-key.key is empty");
        }
        info!(header = header_name, "origin api key header enabled");
        Some(ApiKey::new(header_name, self.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nonce::NO_RANDOM;

    fn settings(vendor: Vendor) -> CdnSettings {
        CdnSettings {
            enable: true,
            vendor,
            endpoint: "https://cdn.example.com/".into(),
            path_mapping: vec!["/movie:/media".into(), "/series:/tv".into()],
            ..Default::default()
        }
    }

    fn auth(key: &str) -> AuthSettings {
        AuthSettings {
            enable: true,
            private_key: key.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_disabled_skips_validation() {
        let config = CdnSettings::default().validate().unwrap();
        assert!(!config.is_enabled());
    }

    #[test]
    fn test_endpoint_trimmed() {
        let config = settings(Vendor::TypeA).validate().unwrap();
        assert_eq!(config.endpoint(), "https://cdn.example.com");
        assert_eq!(config.mapping().rules().len(), 2);
        assert_eq!(config.sign_param(), "sign");
        assert!(config.signer().is_none());
    }

    #[test]
    fn test_endpoint_errors() {
        let mut s = settings(Vendor::TypeA);
        s.endpoint = "  ".into();
        assert_eq!(s.validate().unwrap_err(), ConfigError::MissingEndpoint);

        for endpoint in ["cdn.example.com", "ftp://cdn.example.com", "https://cdn.example.com?a=1"] {
            let mut s = settings(Vendor::TypeA);
            s.endpoint = endpoint.into();
            assert!(
                matches!(s.validate(), Err(ConfigError::InvalidEndpoint { .. })),
                "{endpoint}"
            );
        }
    }

    #[test]
    fn test_invalid_mapping_rule_is_fatal() {
        let mut s = settings(Vendor::TypeA);
        s.path_mapping.push("/broken".into());
        assert!(matches!(
            s.validate(),
            Err(ConfigError::InvalidMappingRule { .. })
        ));
    }

    #[test]
    fn test_missing_private_key() {
        let mut s = settings(Vendor::GoEdge);
        s.auth = auth("   ");
        assert_eq!(
            s.validate().unwrap_err(),
            ConfigError::MissingCredential {
                field: "cdn.auth.private-key"
            }
        );
    }

    #[test]
    fn test_auth_disabled_ignores_missing_key() {
        let mut s = settings(Vendor::GoEdge);
        s.auth.enable = false;
        assert!(s.validate().unwrap().signer().is_none());
    }

    #[test]
    fn test_type_a_defaults() {
        let mut s = settings(Vendor::TypeA);
        s.auth = AuthSettings {
            ttl_seconds: 0,
            identifier: " ".into(),
            use_random: true,
            random_length: -1,
            ..auth("key")
        };
        let config = s.validate().unwrap();
        let signer = config.signer().unwrap();

        assert_eq!(signer.ttl(), DEFAULT_TTL_SECS);
        assert_eq!(signer.scheme().separator, "-");
        assert_eq!(signer.scheme().identifier.as_deref(), Some("0"));
        assert_eq!(signer.scheme().hash_case, HashCase::Lower);
        assert_eq!(signer.nonce().length(), 6);
    }

    #[test]
    fn test_type_a_overrides() {
        let mut s = settings(Vendor::TypeA);
        s.auth = AuthSettings {
            ttl_seconds: 600,
            use_identifier: false,
            separator: "@".into(),
            hash_uppercase: true,
            ..auth("key")
        };
        let signer = s.validate().unwrap().signer.unwrap();

        assert_eq!(signer.ttl(), 600);
        assert_eq!(signer.scheme().separator, "@");
        assert_eq!(signer.scheme().identifier, None);
        assert_eq!(signer.scheme().hash_case, HashCase::Upper);
        assert_eq!(signer.nonce().generate(), NO_RANDOM);
    }

    #[test]
    fn test_goedge_fixed_scheme() {
        let mut s = settings(Vendor::GoEdge);
        s.auth = AuthSettings {
            separator: "-".into(),
            identifier: "1001".into(),
            hash_uppercase: true,
            use_random: true,
            ..auth("key")
        };
        let signer = s.validate().unwrap().signer.unwrap();

        assert_eq!(signer.scheme(), &Vendor::GoEdge.default_scheme());
        assert_eq!(signer.scheme().identifier, None);
        assert_eq!(signer.nonce().length(), 16);
    }

    #[test]
    fn test_bucket_only_for_type_a() {
        let mut s = settings(Vendor::TypeA);
        s.bucket = Some("/media-bucket/".into());
        assert_eq!(s.validate().unwrap().bucket(), Some("media-bucket"));

        let mut s = settings(Vendor::GoEdge);
        s.bucket = Some("media-bucket".into());
        assert_eq!(s.validate().unwrap().bucket(), None);
    }

    #[test]
    fn test_api_key_defaults() {
        let mut s = settings(Vendor::TypeA);
        s.api_key = ApiKeySettings {
            enable: true,
            header_name: String::new(),
            key: "k".into(),
        };
        let config = s.validate().unwrap();
        let api_key = config.api_key().unwrap();
        assert_eq!(api_key.header_name(), "X-Api-Key");
        assert_eq!(api_key.value(), "k");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut s = settings(Vendor::TypeA);
        s.auth = auth("super-secret-key");
        s.api_key.key = "api-secret".into();
        let rendered = format!("{s:?}");
        assert!(!rendered.contains("super-secret-key"));
        assert!(!rendered.contains("api-secret"));

        let rendered = format!("{:?}", s.validate().unwrap());
        assert!(!rendered.contains("super-secret-key"));
    }
}
