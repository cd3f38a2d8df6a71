//! Static exclusion rules: exact-host domain blacklist and shell-style URL
//! patterns. Evaluated without touching the store.

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::identity::UrlIdentity;
use crate::types::reasons;
use globset::{GlobBuilder, GlobMatcher};
use std::collections::HashSet;
use url::Host;

/// Which rule blocked a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleHit {
    Domain(String),
    Pattern(String),
}

impl RuleHit {
    pub fn reason(&self) -> String {
        match self {
            RuleHit::Domain(_) => reasons::DOMAIN_BLACKLISTED.to_string(),
            RuleHit::Pattern(p) => reasons::pattern_match(p),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    source: String,
    matcher: GlobMatcher,
}

/// Compiled domain and pattern rules.
#[derive(Debug, Clone, Default)]
pub struct BlacklistRules {
    domains: HashSet<String>,
    patterns: Vec<CompiledPattern>,
}

impl BlacklistRules {
    pub fn new<D, P>(domains: D, patterns: P) -> Result<Self>
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| canonical_host(d.as_ref()))
            .filter(|d| !d.is_empty())
            .collect();

        let patterns = patterns
            .into_iter()
            .map(|p| {
                let source = p.as_ref().to_string();
                compile_pattern(&source).map(|matcher| CompiledPattern { source, matcher })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { domains, patterns })
    }

    pub fn from_config(config: &LedgerConfig) -> Result<Self> {
        Self::new(&config.domain_blacklist, &config.url_pattern_blacklist)
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.patterns.is_empty()
    }

    /// Domain rule first, then patterns in configured order. The first
    /// matching pattern wins.
    pub fn evaluate(&self, raw_url: &str, identity: &UrlIdentity) -> Option<RuleHit> {
        if self.domains.contains(&identity.domain) {
            return Some(RuleHit::Domain(identity.domain.clone()));
        }

        let lowered = raw_url.trim().to_lowercase();
        self.patterns
            .iter()
            .find(|p| p.matcher.is_match(&lowered))
            .map(|p| RuleHit::Pattern(p.source.clone()))
    }
}

/// Compile a shell-style URL pattern. Matching is case-insensitive and `*`
/// crosses `/`.
pub fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(&pattern.to_lowercase())
        .literal_separator(false)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| LedgerError::Validation(format!("invalid URL pattern {:?}: {}", pattern, e)))
}

/// Configured domains are compared against parsed hosts, which carry the
/// ASCII (punycode) form of internationalized names.
fn canonical_host(domain: &str) -> String {
    let lowered = domain.trim().to_lowercase();
    if lowered.is_empty() {
        return lowered;
    }
    match Host::parse(&lowered) {
        Ok(host) => host.to_string(),
        Err(_) => lowered,
    }
}
