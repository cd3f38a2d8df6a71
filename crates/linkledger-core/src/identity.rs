//! URL identity: canonical form, stable hash and domain.
//!
//! Two URLs share an identity when they are equal after lowercasing,
//! trimming and dropping the fragment. The query string is part of the
//! identity.

use crate::error::ItemError;
use sha2::{Digest, Sha256};
use url::Url;

/// Domain reported for input that does not parse as an absolute URL.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Canonical identity of a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlIdentity {
    /// Hex SHA-256 of `canonical`. The unique key of a link.
    pub url_hash: String,
    /// Lowercased host in ASCII (punycode) form, or [`UNKNOWN_DOMAIN`].
    pub domain: String,
    /// `scheme://host[:port]/path[?query]`, or the best-effort fallback.
    pub canonical: String,
    well_formed: bool,
}

impl UrlIdentity {
    /// Whether the input parsed as an absolute URL with a host.
    pub fn is_well_formed(&self) -> bool {
        self.well_formed
    }

    /// Reject identities that must not be persisted as links.
    pub fn validate(&self, raw: &str) -> std::result::Result<(), ItemError> {
        if raw.trim().is_empty() {
            return Err(ItemError::Empty);
        }
        if !self.well_formed {
            return Err(ItemError::Malformed(raw.to_string()));
        }
        Ok(())
    }
}

/// Normalize a URL. Never fails: malformed input still gets a hash, with the
/// sentinel domain.
pub fn normalize(url: &str) -> UrlIdentity {
    let lowered = url.trim().to_lowercase();

    match canonicalize(&lowered) {
        Some((canonical, domain)) => UrlIdentity {
            url_hash: digest(&canonical),
            domain,
            canonical,
            well_formed: true,
        },
        None => {
            let canonical = strip_fragment(&lowered).to_string();
            UrlIdentity {
                url_hash: digest(&canonical),
                domain: UNKNOWN_DOMAIN.to_string(),
                canonical,
                well_formed: false,
            }
        }
    }
}

/// Hash only.
pub fn hash_url(url: &str) -> String {
    normalize(url).url_hash
}

/// Lowercased host of `url`, or [`UNKNOWN_DOMAIN`].
pub fn extract_domain(url: &str) -> String {
    normalize(url).domain
}

fn canonicalize(lowered: &str) -> Option<(String, String)> {
    let parsed = Url::parse(lowered).ok()?;
    let host = parsed.host_str()?.to_string();
    if host.is_empty() {
        return None;
    }

    let netloc = match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.clone(),
    };

    let mut canonical = format!("{}://{}{}", parsed.scheme(), netloc, parsed.path());
    if let Some(query) = parsed.query() {
        if !query.is_empty() {
            canonical.push('?');
            canonical.push_str(query);
        }
    }

    Some((canonical, host))
}

fn strip_fragment(s: &str) -> &str {
    match s.find('#') {
        Some(idx) => &s[..idx],
        None => s,
    }
}

fn digest(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}
