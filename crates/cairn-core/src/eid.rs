//! Endpoint identifiers.
//!
//! Two schemes are understood:
//!   dtn://node/demux  : node name plus optional application demux
//!   ipn:node.service  : numeric node and service
//!
//! `dtn:none` is the null endpoint. Identifiers are immutable once parsed
//! and order lexically on their canonical string form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DTN_NONE: &str = "dtn:none";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EidError {
    #[error("endpoint identifier is empty")]
    Empty,
    #[error("unknown scheme in {0:?}")]
    UnknownScheme(String),
    #[error("missing node name in {0:?}")]
    MissingNode(String),
    #[error("malformed ipn endpoint {0:?}")]
    MalformedIpn(String),
}

/// A DTN endpoint identifier. Used as the neighbor key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Eid(String);

impl Eid {
    /// The null endpoint.
    pub fn none() -> Self {
        Self(DTN_NONE.to_string())
    }

    pub fn is_none(&self) -> bool {
        self.0 == DTN_NONE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn scheme(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }

    /// The node part of this endpoint, with any application demux stripped.
    ///
    /// `dtn://alpha/inbox` → `dtn://alpha`, `ipn:7.3` → `ipn:7.0`.
    pub fn node(&self) -> Eid {
        if self.is_none() {
            return self.clone();
        }
        if let Some(rest) = self.0.strip_prefix("dtn://") {
            let host = rest.split('/').next().unwrap_or(rest);
            return Eid(format!("dtn://{host}"));
        }
        if let Some(rest) = self.0.strip_prefix("ipn:") {
            let node = rest.split('.').next().unwrap_or(rest);
            return Eid(format!("ipn:{node}.0"));
        }
        self.clone()
    }

    /// Canonical bytes, used when an endpoint feeds a hash key.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for Eid {
    type Err = EidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EidError::Empty);
        }
        if s == DTN_NONE {
            return Ok(Self::none());
        }
        if let Some(rest) = s.strip_prefix("dtn://") {
            let host = rest.split('/').next().unwrap_or_default();
            if host.is_empty() {
                return Err(EidError::MissingNode(s.to_string()));
            }
            return Ok(Self(s.to_string()));
        }
        if let Some(rest) = s.strip_prefix("ipn:") {
            let mut parts = rest.splitn(2, '.');
            let node = parts.next().unwrap_or_default();
            let service = parts.next().unwrap_or("0");
            // Re-formatted from the parsed numbers so `ipn:01.0` keys as `ipn:1.0`.
            return match (node.parse::<u64>(), service.parse::<u64>()) {
                (Ok(node), Ok(service)) => Ok(Self(format!("ipn:{node}.{service}"))),
                _ => Err(EidError::MalformedIpn(s.to_string())),
            };
        }
        Err(EidError::UnknownScheme(s.to_string()))
    }
}

impl TryFrom<String> for Eid {
    type Error = EidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Eid> for String {
    fn from(eid: Eid) -> Self {
        eid.0
    }
}

impl fmt::Display for Eid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Eid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Eid({})", self.0)
    }
}
