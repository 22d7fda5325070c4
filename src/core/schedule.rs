//! Scheduler binding — recurring-invocation triggers with a fixed cadence.
//!
//! A trigger fires its target exactly once per cadence tick. The binder
//! rejects a second trigger for the same (target, cadence) pair: it would
//! add overlapping invocations with no corrective benefit.

use crate::core::error::{SynthError, SynthResult};
use crate::core::types::{DependencyEdge, ResourceKind, ResourceNode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Invocation cadence. Parses `30s`, `5m`, `2h`, `1d`; renders back with the
/// largest unit that divides evenly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cadence {
    seconds: u64,
}

impl Cadence {
    /// Cadence from whole seconds. Zero is not a valid cadence; construction
    /// from specs goes through `parse`, which rejects it.
    pub const fn from_secs(seconds: u64) -> Self {
        Self { seconds }
    }

    /// Cadence in whole seconds.
    pub const fn as_secs(&self) -> u64 {
        self.seconds
    }

    /// Cadence as a std Duration.
    pub const fn as_duration(&self) -> Duration {
        Duration::from_secs(self.seconds)
    }

    /// Parse `<n><s|m|h|d>` into a cadence.
    pub fn parse(s: &str) -> SynthResult<Self> {
        let s = s.trim();
        if s.len() < 2 {
            return Err(SynthError::invalid(format!("invalid cadence '{}'", s)));
        }
        let (digits, unit) = s.split_at(s.len() - 1);
        let n: u64 = digits
            .parse()
            .map_err(|_| SynthError::invalid(format!("invalid cadence '{}'", s)))?;
        if n == 0 {
            return Err(SynthError::invalid(format!(
                "cadence '{}' must be non-zero",
                s
            )));
        }
        let seconds = match unit {
            "s" => n,
            "m" => n * 60,
            "h" => n * 3600,
            "d" => n * 86400,
            _ => {
                return Err(SynthError::invalid(format!(
                    "invalid cadence unit in '{}'",
                    s
                )))
            }
        };
        Ok(Self { seconds })
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.seconds;
        if s % 86400 == 0 {
            write!(f, "{}d", s / 86400)
        } else if s % 3600 == 0 {
            write!(f, "{}h", s / 3600)
        } else if s % 60 == 0 {
            write!(f, "{}m", s / 60)
        } else {
            write!(f, "{}s", s)
        }
    }
}

impl FromStr for Cadence {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Cadence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cadence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Attaches recurring-invocation triggers to compute nodes.
#[derive(Debug, Default)]
pub struct ScheduleBinder {
    bound: HashSet<(String, Cadence)>,
}

impl ScheduleBinder {
    /// Create an empty binder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a trigger to `target` at `cadence`, returning the trigger node
    /// and its edge onto the target. The same (target, cadence) pair may be
    /// bound at most once per region.
    pub fn bind(
        &mut self,
        target: &str,
        cadence: Cadence,
    ) -> SynthResult<(ResourceNode, DependencyEdge)> {
        if !self.bound.insert((target.to_string(), cadence)) {
            return Err(SynthError::DuplicateTrigger {
                target: target.to_string(),
                cadence,
            });
        }

        let logical_id = format!("{}-every-{}", target, cadence);
        let node = ResourceNode::new(&logical_id, ResourceKind::ScheduledTrigger)
            .with_prop("target", target)
            .with_prop("cadence", cadence.to_string())
            .with_prop("cadence_seconds", cadence.as_secs());
        let edge = DependencyEdge::new(logical_id, target);
        Ok((node, edge))
    }
}
