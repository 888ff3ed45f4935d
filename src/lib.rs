//! # cdn-redirect
//!
//! Builds CDN redirect URLs for media-library requests.
//!
//! Instead of proxying a file, a media server front end can send the client a
//! redirect to a CDN-fronted object-storage bucket. This crate turns a
//! library path into that URL:
//!
//! 1. rewrite the path into the storage namespace ([`PathMapping`])
//! 2. percent-encode it for the wire ([`encode_path`])
//! 3. optionally append the edge authentication token ([`Signer`])
//!
//! ## Quick Start
//!
//! ```rust
//! use cdn_redirect::{PathMapping, RedirectConfig, RedirectUrlBuilder, Signer, Vendor};
//!
//! let config = RedirectConfig::new(Vendor::GoEdge, "https://cdn.example.com")
//!     .unwrap()
//!     .with_mapping(PathMapping::parse(&["/movie:/images"]).unwrap())
//!     .with_signer(Signer::new(Vendor::GoEdge, "123456"));
//!
//! let builder = RedirectUrlBuilder::new(config);
//! let url = builder.build_url("/movie/test.jpg").unwrap();
//! // https://cdn.example.com/images/test.jpg?sign=<ts>-0-<md5>
//! assert!(url.starts_with("https://cdn.example.com/images/test.jpg?sign="));
//! ```
//!
//! ## Vendors
//!
//! - **GoEdge**: `md5(path@ts@rand@key)` over the decoded path, lowercase hash
//! - **Type-A** (Aliyun, Tencent Cloud): `md5(path-ts-rand-uid-key)` over the
//!   percent-encoded path, configurable separator, identifier and hash case
//!
//! Both produce `?sign=<ts>-<rand>[-<uid>]-<md5>`.
//!
//! Failures ([`RedirectError`]) are not fatal: the caller is expected to
//! serve the request from the origin instead.

pub mod config;
mod encoding;
pub mod error;
pub mod mapping;
pub mod nonce;
mod redirect;
pub mod signer;
pub mod utils;

#[cfg(feature = "server")]
pub mod server;

pub use crate::config::{CdnSettings, RedirectConfig};
pub use encoding::encode_path;
pub use error::{ConfigError, RedirectError, VerifyError};
pub use mapping::{MappingRule, PathMapping};
pub use nonce::{Alphabet, NonceGenerator};
pub use redirect::{RedirectUrl, RedirectUrlBuilder};
pub use signer::{PathForm, SignToken, Signer, SigningScheme, Vendor};
pub use utils::crypto::HashCase;

/// Build a redirect URL from a validated configuration (convenience function)
///
/// Shorthand for creating a [`RedirectUrlBuilder`] and calling `build_url`.
/// Prefer keeping one builder around when handling many requests.
pub fn build_url(config: RedirectConfig, source_path: &str) -> Result<String, RedirectError> {
    RedirectUrlBuilder::new(config).build_url(source_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> RedirectUrlBuilder {
        let settings = CdnSettings {
            enable: true,
            vendor: Vendor::TypeA,
            endpoint: "https://s3.example.com".into(),
            path_mapping: vec!["/movie:/media".into(), "/series:/tv".into()],
            auth: crate::config::AuthSettings {
                enable: true,
                private_key: "aliyuncdnexp1234".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        RedirectUrlBuilder::new(settings.validate().unwrap())
    }

    #[test]
    fn test_settings_to_signed_url() {
        let url = builder().build_at("/movie/test.mkv", 1444435200).unwrap();
        let expected = Signer::new(Vendor::TypeA, "aliyuncdnexp1234")
            .sign_with("/media/test.mkv", 1444435200, "0");

        assert_eq!(
            url.as_str(),
            format!("https://s3.example.com/media/test.mkv?sign={expected}")
        );
    }

    #[test]
    fn test_fallback_errors() {
        let builder = builder();
        let err = builder.build("/music/song.mp3").unwrap_err();
        assert_eq!(err.reason(), "no_mapping");

        let err = build_url(RedirectConfig::disabled(), "/movie/a.mkv").unwrap_err();
        assert_eq!(err, RedirectError::FeatureDisabled);
        assert_eq!(err.reason(), "disabled");
    }

    #[test]
    fn test_chinese_path_round_trip() {
        let builder = builder();
        let url = builder
            .build("/movie/星际穿越 (2014)/星际穿越 (2014) - 2160p.mkv")
            .unwrap();

        assert!(url.as_str().starts_with(
            "https://s3.example.com/media/%E6%98%9F%E9%99%85%E7%A9%BF%E8%B6%8A%20%282014%29/"
        ));
        let token = url.token.unwrap();
        builder
            .config()
            .signer()
            .unwrap()
            .verify(&url.encoded_path, &token.to_string(), token.timestamp)
            .unwrap();
    }
}
