//! Run configuration derived from the check name and run sharding.
//!
//! The resolver is a pure function over an ordered rule table: every rule
//! whose needle occurs in the check name contributes its flags, in table
//! order, followed by the sharding pair when sharding is enabled.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Environment variable carrying this instance's shard index.
pub const RUN_BY_HASH_NUM: &str = "RUN_BY_HASH_NUM";

/// Environment variable carrying the total number of shards.
pub const RUN_BY_HASH_TOTAL: &str = "RUN_BY_HASH_TOTAL";

/// A single `NAME=value` environment assignment passed to the container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct EnvAssignment {
    /// Variable name.
    pub name: String,
    /// Variable value, passed through verbatim.
    pub value: String,
}

impl EnvAssignment {
    /// Create an assignment from a name and value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for EnvAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// A check-name rule: if `needle` occurs in the check name, every flag in
/// `flags` is set to `1`.
#[derive(Debug, Clone, Copy)]
struct EnvRule {
    needle: &'static str,
    flags: &'static [&'static str],
}

/// Ordered rule table. Matching is case-sensitive and non-exclusive.
const CHECK_NAME_RULES: &[EnvRule] = &[
    EnvRule { needle: "DatabaseReplicated", flags: &["USE_DATABASE_REPLICATED"] },
    EnvRule { needle: "DatabaseOrdinary", flags: &["USE_DATABASE_ORDINARY"] },
    EnvRule { needle: "wide parts enabled", flags: &["USE_POLYMORPHIC_PARTS"] },
    EnvRule { needle: "ParallelReplicas", flags: &["USE_PARALLEL_REPLICAS"] },
    EnvRule {
        needle: "s3 storage",
        flags: &["USE_S3_STORAGE_FOR_MERGE_TREE", "RANDOMIZE_OBJECT_KEY_TYPE"],
    },
    EnvRule { needle: "analyzer", flags: &["USE_OLD_ANALYZER"] },
];

/// Which slice of a sharded check this instance runs.
///
/// A `total` of zero means sharding is disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ShardSpec {
    /// Zero-based shard index.
    pub num: u32,
    /// Number of shards, or `0` when unsharded.
    pub total: u32,
}

impl ShardSpec {
    /// Sharding disabled.
    pub const DISABLED: Self = Self { num: 0, total: 0 };

    /// Create a shard selection from raw values. Values are not cross-checked;
    /// the container runner owns their interpretation.
    #[must_use]
    pub fn new(num: u32, total: u32) -> Self {
        Self { num, total }
    }

    /// Parse the sharding pair as read from the environment.
    ///
    /// Sharding is only considered when the index variable is present; a
    /// missing total then defaults to `0`.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidInteger`] if a present value is not a
    /// non-negative integer.
    pub fn from_env_values(num: Option<&str>, total: Option<&str>) -> Result<Self, CoreError> {
        let Some(num) = num else {
            return Ok(Self::DISABLED);
        };
        Ok(Self {
            num: parse_shard_value(RUN_BY_HASH_NUM, num)?,
            total: total.map_or(Ok(0), |t| parse_shard_value(RUN_BY_HASH_TOTAL, t))?,
        })
    }

    /// Whether this run is one shard of several.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.total != 0
    }
}

fn parse_shard_value(var: &'static str, raw: &str) -> Result<u32, CoreError> {
    raw.trim().parse().map_err(|_| CoreError::InvalidInteger {
        var,
        value: raw.to_owned(),
    })
}

/// The immutable set of environment assignments for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfiguration {
    assignments: Vec<EnvAssignment>,
}

impl RunConfiguration {
    /// The assignments in resolution order.
    #[must_use]
    pub fn assignments(&self) -> &[EnvAssignment] {
        &self.assignments
    }

    /// Assignments rendered as `NAME=value` strings.
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        self.assignments.iter().map(ToString::to_string).collect()
    }

    /// Number of assignments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether no assignment was produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

impl<'a> IntoIterator for &'a RunConfiguration {
    type Item = &'a EnvAssignment;
    type IntoIter = std::slice::Iter<'a, EnvAssignment>;

    fn into_iter(self) -> Self::IntoIter {
        self.assignments.iter()
    }
}

/// Derive the container environment from a check name and shard selection.
///
/// Pure and deterministic. When `shard.total` is zero the sharding pair is
/// omitted entirely rather than emitted with zero values.
///
/// # Complexity
/// O(r * n) where r = number of rules and n = `check_name.len()`.
#[must_use]
pub fn resolve(check_name: &str, shard: ShardSpec) -> RunConfiguration {
    let mut assignments: Vec<EnvAssignment> = CHECK_NAME_RULES
        .iter()
        .filter(|rule| check_name.contains(rule.needle))
        .flat_map(|rule| rule.flags.iter().map(|flag| EnvAssignment::new(*flag, "1")))
        .collect();

    if shard.is_enabled() {
        assignments.push(EnvAssignment::new(RUN_BY_HASH_NUM, shard.num.to_string()));
        assignments.push(EnvAssignment::new(RUN_BY_HASH_TOTAL, shard.total.to_string()));
    }

    RunConfiguration { assignments }
}
