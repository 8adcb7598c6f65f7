//! Site hostnames: exact names and `*.domain.tld` wildcards.

use super::SiteError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deployment environment a hostname is served in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Staging,
    Development,
}

impl Environment {
    pub const ALL: [Self; 3] = [Self::Production, Self::Staging, Self::Development];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Development => "development",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown environment `{s}`"))
    }
}

/// Host part of a url or bare hostname, without user info and port.
///
/// `http://user@WWW.Test.com:8080/path` -> `WWW.Test.com`
pub fn host_of(raw: &str) -> &str {
    let rest = raw.trim();
    let rest = rest.split_once("://").map_or(rest, |(_, r)| r);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

/// A compiled hostname pattern.
#[derive(Debug, Clone)]
pub enum HostPattern {
    Exact(String),
    /// `*.test.com`, compiled once to `^.*\.test\.com$`.
    Wildcard { pattern: String, regex: Regex },
}

impl HostPattern {
    pub fn parse(raw: &str) -> Result<Self, SiteError> {
        let host = host_of(raw).to_ascii_lowercase();
        let valid = !host.is_empty()
            && host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '*'));
        if !valid {
            return Err(SiteError::InvalidHostname(raw.to_string()));
        }

        if !host.contains('*') {
            return Ok(Self::Exact(host));
        }
        let expression = host
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{expression}$"))
            .map_err(|_| SiteError::InvalidHostname(raw.to_string()))?;
        Ok(Self::Wildcard {
            pattern: host,
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(host) => host,
            Self::Wildcard { pattern, .. } => pattern,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard { .. })
    }

    /// Whether `host` (already lowercased) matches.
    pub fn matches(&self, host: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == host,
            Self::Wildcard { regex, .. } => regex.is_match(host),
        }
    }
}

impl PartialEq for HostPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for HostPattern {}

impl fmt::Display for HostPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hostname of a site, bound to one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hostname {
    pattern: HostPattern,
    environment: Environment,
}

impl Hostname {
    pub fn new(raw: &str, environment: Environment) -> Result<Self, SiteError> {
        Ok(Self {
            pattern: HostPattern::parse(raw)?,
            environment,
        })
    }

    pub fn pattern(&self) -> &HostPattern {
        &self.pattern
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.pattern, self.environment)
    }
}
