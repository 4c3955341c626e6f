//! Request URL resolution and pathname normalization.
//!
//! # Design Decisions
//! - Exactly one resolution strategy per deployment, chosen in config:
//!   forwarded-header derived base or a fixed base
//! - Origin-form targets are applied as path + query onto the base, so a
//!   target such as `//other.host/x` can never swap the host

use axum::http::{HeaderMap, HeaderName};
use url::Url;

use crate::config::UrlResolution;

const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Error type for URL resolution.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("{0} header missing")]
    MissingForwardedHeader(HeaderName),

    #[error("invalid base url [{url}]: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("base url [{0}] must be absolute with a host")]
    RelativeBaseUrl(String),
}

/// Runtime form of [`UrlResolution`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlResolver {
    /// Base URL comes from `x-forwarded-proto` and `x-forwarded-host`.
    Forwarded,
    /// Every request path is relative to this base.
    Fixed(Url),
}

impl UrlResolver {
    /// A fixed resolver for the given base URL.
    pub fn fixed(base_url: &str) -> Result<Self, ContextError> {
        let url = Url::parse(base_url).map_err(|source| ContextError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        if !url.has_host() {
            return Err(ContextError::RelativeBaseUrl(base_url.to_string()));
        }
        Ok(UrlResolver::Fixed(url))
    }

    pub fn from_config(resolution: &UrlResolution) -> Result<Self, ContextError> {
        match resolution {
            UrlResolution::Forwarded => Ok(UrlResolver::Forwarded),
            UrlResolution::Fixed { base_url } => Self::fixed(base_url),
        }
    }

    /// Determine the base URL for a request.
    pub fn base_url(&self, headers: &HeaderMap) -> Result<Url, ContextError> {
        match self {
            UrlResolver::Fixed(url) => Ok(url.clone()),
            UrlResolver::Forwarded => {
                let protocol = single_header(headers, &X_FORWARDED_PROTO)
                    .ok_or(ContextError::MissingForwardedHeader(X_FORWARDED_PROTO))?;
                let host = single_header(headers, &X_FORWARDED_HOST)
                    .ok_or(ContextError::MissingForwardedHeader(X_FORWARDED_HOST))?;

                let raw = format!("{}://{}", protocol, host);
                let url = Url::parse(&raw)
                    .map_err(|source| ContextError::InvalidBaseUrl { url: raw.clone(), source })?;
                if !url.has_host() {
                    return Err(ContextError::RelativeBaseUrl(raw));
                }
                Ok(url)
            }
        }
    }
}

impl Default for UrlResolver {
    fn default() -> Self {
        UrlResolver::Fixed(localhost())
    }
}

pub(crate) fn localhost() -> Url {
    Url::parse("http://localhost").expect("static base url is valid")
}

fn single_header<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    let mut values = headers.get_all(name).iter();
    let value = values.next()?;
    if values.next().is_some() {
        return None;
    }
    value.to_str().ok()
}

/// Resolve a request target (absolute or relative) against a base URL.
pub fn resolve_url(base: &Url, target: &str) -> Url {
    if let Ok(url) = Url::parse(target) {
        if url.has_host() {
            return url;
        }
    }

    let target = target.split('#').next().unwrap_or_default();
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };

    let mut url = base.clone();
    url.set_path(&normalize_leading_slash(path));
    url.set_query(query);
    url.set_fragment(None);
    url
}

fn normalize_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Strip trailing slashes and guarantee a leading one. The root stays `/`.
pub fn normalize_pathname(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        normalize_leading_slash(trimmed)
    }
}
