//! Per-type member filters.
//!
//! Entries are keyed by lowercase type name. A lookup walks the type's
//! ancestry starting at the type itself and stops at the first entry, so a
//! filter on a subtype overrides any filter on its ancestors.

use std::collections::{BTreeSet, HashMap};

use crate::value::TypeDescriptor;

/// What a filter hides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectFilter {
    /// The whole composite is replaced by a sentinel.
    ExcludeAll,
    /// Only the named members are replaced by a sentinel.
    ExcludeNames(BTreeSet<String>),
}

impl ObjectFilter {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ObjectFilter::ExcludeNames(names.into_iter().map(Into::into).collect())
    }
}

/// Filter table consulted by the encoder.
#[derive(Debug, Clone, Default)]
pub struct FilterTable {
    entries: HashMap<String, ObjectFilter>,
}

impl FilterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter for a type, replacing any previous one.
    pub fn set(&mut self, type_name: &str, filter: ObjectFilter) {
        self.entries.insert(type_name.to_lowercase(), filter);
    }

    /// Remove the filter for a type.
    pub fn remove(&mut self, type_name: &str) -> Option<ObjectFilter> {
        self.entries.remove(&type_name.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The filter that applies to `ty`: its own entry, else the closest
    /// ancestor's.
    pub fn lookup(&self, ty: &TypeDescriptor) -> Option<&ObjectFilter> {
        if self.entries.is_empty() {
            return None;
        }
        ty.ancestry()
            .find_map(|t| self.entries.get(&t.name().to_lowercase()))
    }

    /// Whether the whole composite is hidden.
    pub fn excludes_type(&self, ty: &TypeDescriptor) -> bool {
        matches!(self.lookup(ty), Some(ObjectFilter::ExcludeAll))
    }

    /// Whether one member is hidden.
    pub fn excludes_member(&self, ty: &TypeDescriptor, member: &str) -> bool {
        match self.lookup(ty) {
            Some(ObjectFilter::ExcludeAll) => true,
            Some(ObjectFilter::ExcludeNames(names)) => names.contains(member),
            None => false,
        }
    }
}
