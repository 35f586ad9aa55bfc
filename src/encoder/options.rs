//! Encoding options and per-call overrides.

use serde::{Deserialize, Serialize};

/// Default combined depth ceiling.
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// Default ceiling for nested composites.
pub const DEFAULT_MAX_OBJECT_DEPTH: u32 = 5;

/// Default ceiling for nested collections.
pub const DEFAULT_MAX_ARRAY_DEPTH: u32 = 5;

/// Effective options for one encode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncodingOptions {
    /// Combined ceiling, counted on every descent.
    pub max_depth: u32,
    /// Ceiling for composite nesting.
    pub max_object_depth: u32,
    /// Ceiling for collection nesting.
    pub max_array_depth: u32,
    pub include_static_properties: bool,
    pub include_private_properties: bool,
    pub include_protected_properties: bool,
    pub include_undeclared_properties: bool,
    /// When false, members whose value hit the combined ceiling are dropped.
    pub include_max_depth_properties: bool,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_object_depth: DEFAULT_MAX_OBJECT_DEPTH,
            max_array_depth: DEFAULT_MAX_ARRAY_DEPTH,
            include_static_properties: true,
            include_private_properties: true,
            include_protected_properties: true,
            include_undeclared_properties: true,
            include_max_depth_properties: true,
        }
    }
}

impl EncodingOptions {
    /// Apply per-call overrides on top of these options.
    ///
    /// Unset fields keep their value. `max_depth` can only be lowered: the
    /// effective ceiling is the smaller of the two.
    pub fn merged(&self, overrides: &OptionOverrides) -> EncodingOptions {
        EncodingOptions {
            max_depth: overrides
                .max_depth
                .map_or(self.max_depth, |d| d.min(self.max_depth)),
            max_object_depth: overrides.max_object_depth.unwrap_or(self.max_object_depth),
            max_array_depth: overrides.max_array_depth.unwrap_or(self.max_array_depth),
            include_static_properties: overrides
                .include_static_properties
                .unwrap_or(self.include_static_properties),
            include_private_properties: overrides
                .include_private_properties
                .unwrap_or(self.include_private_properties),
            include_protected_properties: overrides
                .include_protected_properties
                .unwrap_or(self.include_protected_properties),
            include_undeclared_properties: overrides
                .include_undeclared_properties
                .unwrap_or(self.include_undeclared_properties),
            include_max_depth_properties: overrides
                .include_max_depth_properties
                .unwrap_or(self.include_max_depth_properties),
        }
    }
}

/// A partial set of [`EncodingOptions`]; `None` means "inherit".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionOverrides {
    pub max_depth: Option<u32>,
    pub max_object_depth: Option<u32>,
    pub max_array_depth: Option<u32>,
    pub include_static_properties: Option<bool>,
    pub include_private_properties: Option<bool>,
    pub include_protected_properties: Option<bool>,
    pub include_undeclared_properties: Option<bool>,
    pub include_max_depth_properties: Option<bool>,
}

impl OptionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow, public-only encoding used for stack frame arguments,
    /// table cells and exception traces.
    pub fn trace() -> Self {
        Self {
            max_depth: Some(2),
            max_object_depth: None,
            max_array_depth: None,
            include_static_properties: Some(false),
            include_private_properties: Some(false),
            include_protected_properties: Some(false),
            include_undeclared_properties: Some(false),
            include_max_depth_properties: Some(false),
        }
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn max_object_depth(mut self, depth: u32) -> Self {
        self.max_object_depth = Some(depth);
        self
    }

    pub fn max_array_depth(mut self, depth: u32) -> Self {
        self.max_array_depth = Some(depth);
        self
    }

    pub fn include_static(mut self, include: bool) -> Self {
        self.include_static_properties = Some(include);
        self
    }

    pub fn include_private(mut self, include: bool) -> Self {
        self.include_private_properties = Some(include);
        self
    }

    pub fn include_protected(mut self, include: bool) -> Self {
        self.include_protected_properties = Some(include);
        self
    }

    pub fn include_undeclared(mut self, include: bool) -> Self {
        self.include_undeclared_properties = Some(include);
        self
    }

    pub fn include_max_depth(mut self, include: bool) -> Self {
        self.include_max_depth_properties = Some(include);
        self
    }

    /// Layer `other` on top of `self`; fields set in `other` win.
    pub fn merge(&mut self, other: &OptionOverrides) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            max_depth,
            max_object_depth,
            max_array_depth,
            include_static_properties,
            include_private_properties,
            include_protected_properties,
            include_undeclared_properties,
            include_max_depth_properties
        );
    }
}
