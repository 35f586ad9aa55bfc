//! Emitter configuration.
//!
//! [`EmitterConfig`] holds the stream-wide options. It deserializes from
//! JSON with the same camelCase names the options have on the wire:
//!
//! ```
//! use wildfire_client::config::EmitterConfig;
//!
//! let config = EmitterConfig::from_json_str(r#"{
//!     "maxDepth": 4,
//!     "includeLineNumbers": false,
//!     "objectFilters": { "Session": true, "User": ["password"] }
//! }"#).unwrap();
//!
//! assert_eq!(config.encoding.max_depth, 4);
//! assert!(!config.include_line_numbers);
//! assert_eq!(config.object_filters.len(), 2);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::codec::JsonBackend;
use crate::encoder::{EncodingOptions, FilterTable, ObjectFilter};
use crate::error::{Result, WildfireError};
use crate::value::Value;

/// Names accepted by [`EmitterConfig::option`] and
/// [`EmitterConfig::set_option`].
pub const OPTION_NAMES: [&str; 6] = [
    "maxDepth",
    "maxObjectDepth",
    "maxArrayDepth",
    "useNativeJsonEncode",
    "includeLineNumbers",
    "lineNumberOffset",
];

/// Filter entry as written in configuration: `true` hides the whole type,
/// a list hides the named members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterSpec {
    All(bool),
    Names(Vec<String>),
}

impl FilterSpec {
    /// The filter this entry installs, if any.
    pub fn to_filter(&self) -> Option<ObjectFilter> {
        match self {
            FilterSpec::All(true) => Some(ObjectFilter::ExcludeAll),
            FilterSpec::All(false) => None,
            FilterSpec::Names(names) => Some(ObjectFilter::names(names.iter().cloned())),
        }
    }
}

/// Stream-wide options of an [`Emitter`](crate::Emitter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmitterConfig {
    /// When false, every emit is a no-op.
    pub enabled: bool,
    /// Depth ceilings and visibility flags.
    #[serde(flatten)]
    pub encoding: EncodingOptions,
    /// Use the `serde_json` backend instead of the built-in serializer.
    pub use_native_json_encode: bool,
    /// Add the caller's file and line to each envelope.
    pub include_line_numbers: bool,
    /// Frames to skip when looking for the caller.
    pub line_number_offset: u32,
    /// Type name to filter.
    pub object_filters: BTreeMap<String, FilterSpec>,
    /// Class prefixes dropped from traces.
    pub ignored_classes: Vec<String>,
    /// Path prefixes dropped from traces.
    pub ignored_paths: Vec<String>,
    /// Only send when the request announces a supported console extension.
    pub detect_client: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            encoding: EncodingOptions::default(),
            use_native_json_encode: false,
            include_line_numbers: true,
            line_number_offset: 0,
            object_filters: BTreeMap::new(),
            ignored_classes: Vec::new(),
            ignored_paths: Vec::new(),
            detect_client: false,
        }
    }
}

impl EmitterConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[inline]
    pub fn backend(&self) -> JsonBackend {
        JsonBackend::from_native_flag(self.use_native_json_encode)
    }

    /// Build the filter table described by `object_filters`.
    pub fn filter_table(&self) -> FilterTable {
        let mut table = FilterTable::new();
        for (name, spec) in &self.object_filters {
            if let Some(filter) = spec.to_filter() {
                table.set(name, filter);
            }
        }
        table
    }

    /// Read one option by its wire name.
    pub fn option(&self, name: &str) -> Result<Value> {
        Ok(match name {
            "maxDepth" => self.encoding.max_depth.into(),
            "maxObjectDepth" => self.encoding.max_object_depth.into(),
            "maxArrayDepth" => self.encoding.max_array_depth.into(),
            "useNativeJsonEncode" => self.use_native_json_encode.into(),
            "includeLineNumbers" => self.include_line_numbers.into(),
            "lineNumberOffset" => self.line_number_offset.into(),
            other => return Err(unknown_option(other)),
        })
    }

    /// Set one option by its wire name.
    ///
    /// # Errors
    ///
    /// `InvalidCallArguments` for an unknown name or a value of the wrong
    /// kind.
    pub fn set_option(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match name {
            "maxDepth" => self.encoding.max_depth = as_count(name, &value)?,
            "maxObjectDepth" => self.encoding.max_object_depth = as_count(name, &value)?,
            "maxArrayDepth" => self.encoding.max_array_depth = as_count(name, &value)?,
            "useNativeJsonEncode" => self.use_native_json_encode = as_flag(name, &value)?,
            "includeLineNumbers" => self.include_line_numbers = as_flag(name, &value)?,
            "lineNumberOffset" => self.line_number_offset = as_count(name, &value)?,
            other => return Err(unknown_option(other)),
        }
        Ok(())
    }
}

fn unknown_option(name: &str) -> WildfireError {
    WildfireError::InvalidCallArguments(format!("Unknown option: {}", name))
}

fn as_count(name: &str, value: &Value) -> Result<u32> {
    match value {
        Value::Int(n) => u32::try_from(*n).map_err(|_| {
            WildfireError::InvalidCallArguments(format!("Option {} out of range: {}", name, n))
        }),
        other => Err(WildfireError::InvalidCallArguments(format!(
            "Option {} expects an integer, got {}",
            name,
            other.kind_name()
        ))),
    }
}

fn as_flag(name: &str, value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(WildfireError::InvalidCallArguments(format!(
            "Option {} expects a bool, got {}",
            name,
            other.kind_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TypeDescriptor;

    #[test]
    fn test_defaults() {
        let config = EmitterConfig::default();
        assert!(config.enabled);
        assert!(config.include_line_numbers);
        assert_eq!(config.line_number_offset, 0);
        assert_eq!(config.backend(), JsonBackend::Builtin);
        assert_eq!(config.encoding, EncodingOptions::default());
        assert!(!config.detect_client);
    }

    #[test]
    fn test_detect_client_from_json() {
        let config = EmitterConfig::from_json_str(r#"{"detectClient": true}"#).unwrap();
        assert!(config.detect_client);
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(EmitterConfig::from_json_str("{}").unwrap(), EmitterConfig::default());
    }

    #[test]
    fn test_invalid_json() {
        let err = EmitterConfig::from_json_str("{maxDepth: ").unwrap_err();
        assert!(matches!(err, WildfireError::Json(_)));
    }

    #[test]
    fn test_flattened_encoding_options() {
        let config = EmitterConfig::from_json_str(
            r#"{"maxObjectDepth": 2, "includePrivateProperties": false, "useNativeJsonEncode": true}"#,
        )
        .unwrap();
        assert_eq!(config.encoding.max_object_depth, 2);
        assert!(!config.encoding.include_private_properties);
        assert_eq!(config.backend(), JsonBackend::SerdeJson);
    }

    #[test]
    fn test_filter_table_from_specs() {
        let config = EmitterConfig::from_json_str(
            r#"{"objectFilters": {"Secret": true, "Open": false, "User": ["pin"]}}"#,
        )
        .unwrap();
        let table = config.filter_table();

        let secret = TypeDescriptor::new("Secret");
        let open = TypeDescriptor::new("Open");
        let user = TypeDescriptor::new("User");
        assert!(table.excludes_type(&secret));
        assert!(table.lookup(&open).is_none());
        assert!(table.excludes_member(&user, "pin"));
        assert!(!table.excludes_member(&user, "name"));
    }

    #[test]
    fn test_option_get_set() {
        let mut config = EmitterConfig::default();
        assert_eq!(config.option("maxDepth").unwrap(), Value::Int(10));

        config.set_option("maxDepth", 3).unwrap();
        config.set_option("includeLineNumbers", false).unwrap();
        assert_eq!(config.encoding.max_depth, 3);
        assert_eq!(config.option("includeLineNumbers").unwrap(), Value::Bool(false));

        for name in OPTION_NAMES {
            assert!(config.option(name).is_ok());
        }
    }

    #[test]
    fn test_unknown_option() {
        let mut config = EmitterConfig::default();
        let err = config.option("maxWidth").unwrap_err();
        assert_eq!(err.to_string(), "Invalid call arguments: Unknown option: maxWidth");
        assert!(config.set_option("trace", true).is_err());
    }

    #[test]
    fn test_option_type_checked() {
        let mut config = EmitterConfig::default();
        assert!(config.set_option("maxDepth", "ten").is_err());
        assert!(config.set_option("maxDepth", -1).is_err());
        assert!(config.set_option("includeLineNumbers", 1).is_err());
        assert_eq!(config.encoding.max_depth, 10);
    }
}
