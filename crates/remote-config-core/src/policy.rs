//! Read and failure policies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing a policy name
#[derive(Debug, Clone)]
pub struct ParsePolicyError(String);

impl fmt::Display for ParsePolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid policy: {}", self.0)
    }
}

impl std::error::Error for ParsePolicyError {}

/// How the primary cache and the fallback store are consulted on reads
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ReadPolicy {
    /// Primary cache first; every primary hit is mirrored into the fallback
    /// store when the fallback does not hold it yet, keeping it warm while
    /// the remote service is healthy
    #[default]
    MirrorFallback,
    /// Primary cache first; misses are fetched and written back to the
    /// primary only, when it was readable for the request
    ReadThrough,
}

impl ReadPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadPolicy::MirrorFallback => "mirror-fallback",
            ReadPolicy::ReadThrough => "read-through",
        }
    }
}

impl FromStr for ReadPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "mirror-fallback" => Ok(ReadPolicy::MirrorFallback),
            "read-through" => Ok(ReadPolicy::ReadThrough),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// What happens when the remote service cannot be reached
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Serve the last known good document from the fallback store, failing
    /// only when it holds nothing usable
    #[default]
    ServeStale,
    /// Fail with the connection error
    Propagate,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::ServeStale => "serve-stale",
            FailurePolicy::Propagate => "propagate",
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "serve-stale" => Ok(FailurePolicy::ServeStale),
            "propagate" => Ok(FailurePolicy::Propagate),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_read_policy() {
        assert_eq!(
            "mirror-fallback".parse::<ReadPolicy>().unwrap(),
            ReadPolicy::MirrorFallback
        );
        assert_eq!(
            "READ_THROUGH".parse::<ReadPolicy>().unwrap(),
            ReadPolicy::ReadThrough
        );
        assert!("lru".parse::<ReadPolicy>().is_err());
    }

    #[test]
    fn test_parse_failure_policy() {
        assert_eq!(
            "serve-stale".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::ServeStale
        );
        assert_eq!(
            "Propagate".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::Propagate
        );
        assert!("retry".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn test_as_str_roundtrip() {
        for policy in [ReadPolicy::MirrorFallback, ReadPolicy::ReadThrough] {
            assert_eq!(policy.as_str().parse::<ReadPolicy>().unwrap(), policy);
        }
        for policy in [FailurePolicy::ServeStale, FailurePolicy::Propagate] {
            assert_eq!(policy.as_str().parse::<FailurePolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ReadPolicy::default(), ReadPolicy::MirrorFallback);
        assert_eq!(FailurePolicy::default(), FailurePolicy::ServeStale);
    }
}
