//! Sentinel markers.
//!
//! A sentinel is a plain string value standing in for content that policy
//! chose not to expand. Sentinels serialize like any other string.

use std::fmt;

use crate::value::Value;

const MAX_DEPTH_PREFIX: &str = "Max Depth(";

/// Reason a value was not expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sentinel {
    /// Combined ceiling reached, carries the depth that exceeded it.
    MaxDepth(u32),
    /// Composite ceiling reached, carries the ceiling.
    MaxObjectDepth(u32),
    /// Collection ceiling reached, carries the ceiling.
    MaxArrayDepth(u32),
    /// Container already being expanded, carries its type name or key.
    Recursion(String),
    /// Whole composite hidden by a filter, carries its type name.
    ExcludedType(String),
    /// One member hidden by a filter.
    ExcludedMember,
    /// Member value not reachable at its visibility.
    NeedElevatedAccess,
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentinel::MaxDepth(n) => write!(f, "{}{})", MAX_DEPTH_PREFIX, n),
            Sentinel::MaxObjectDepth(n) => write!(f, "Max Object Depth({})", n),
            Sentinel::MaxArrayDepth(n) => write!(f, "Max Array Depth({})", n),
            Sentinel::Recursion(name) => write!(f, "Recursion({})", name),
            Sentinel::ExcludedType(name) => write!(f, "Excluded by Filter({})", name),
            Sentinel::ExcludedMember => f.write_str("Excluded by Filter"),
            Sentinel::NeedElevatedAccess => f.write_str("Need elevated access"),
        }
    }
}

impl From<Sentinel> for Value {
    fn from(sentinel: Sentinel) -> Self {
        Value::String(sentinel.to_string())
    }
}

/// Whether an encoded value is the combined-ceiling sentinel.
pub fn is_max_depth(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.starts_with(MAX_DEPTH_PREFIX) && s.ends_with(')'))
}
