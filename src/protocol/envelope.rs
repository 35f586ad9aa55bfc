//! Message kinds and the metadata envelope sent ahead of each payload.

use std::fmt;
use std::str::FromStr;

use super::wire_format::Structure;
use crate::error::WildfireError;
use crate::value::{Mapping, Value};

/// Option names that configure the emitter and are never forwarded in an
/// envelope, plus `trace`.
pub const RESERVED_OPTION_NAMES: [&str; 7] = [
    "maxDepth",
    "maxObjectDepth",
    "maxArrayDepth",
    "useNativeJsonEncode",
    "includeLineNumbers",
    "lineNumberOffset",
    "trace",
];

/// Message kind, rendered as the envelope's `Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Log,
    Info,
    Warn,
    Error,
    Dump,
    Trace,
    Table,
    GroupStart,
    GroupEnd,
    Exception,
}

impl Kind {
    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Log => "LOG",
            Kind::Info => "INFO",
            Kind::Warn => "WARN",
            Kind::Error => "ERROR",
            Kind::Dump => "DUMP",
            Kind::Trace => "TRACE",
            Kind::Table => "TABLE",
            Kind::GroupStart => "GROUP_START",
            Kind::GroupEnd => "GROUP_END",
            Kind::Exception => "EXCEPTION",
        }
    }

    /// Structure the kind is sent under.
    #[inline]
    pub fn structure(self) -> Structure {
        match self {
            Kind::Dump => Structure::Dump,
            _ => Structure::Console,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = WildfireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "LOG" => Kind::Log,
            "INFO" => Kind::Info,
            "WARN" => Kind::Warn,
            "ERROR" => Kind::Error,
            "DUMP" => Kind::Dump,
            "TRACE" => Kind::Trace,
            "TABLE" => Kind::Table,
            "GROUP_START" => Kind::GroupStart,
            "GROUP_END" => Kind::GroupEnd,
            "EXCEPTION" => Kind::Exception,
            other => {
                return Err(WildfireError::InvalidCallArguments(format!(
                    "Unknown message type: {}",
                    other
                )))
            }
        })
    }
}

/// Metadata sent in front of a payload.
///
/// # Example
///
/// ```
/// use wildfire_client::protocol::{Envelope, Kind};
/// use wildfire_client::value::Value;
///
/// let envelope = Envelope::new(Kind::Warn)
///     .with_label("disk")
///     .with_extra("maxDepth", 3)
///     .with_extra("Color", "red");
///
/// let map = envelope.to_mapping();
/// let keys: Vec<String> = map.keys().map(|k| k.to_string()).collect();
/// assert_eq!(keys, vec!["Color", "Type", "Label"]);
/// assert_eq!(map.get("Type"), Some(&Value::from("WARN")));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    kind: Kind,
    label: Option<String>,
    file: Option<String>,
    line: Option<u32>,
    extra: Mapping,
}

impl Envelope {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            label: None,
            file: None,
            line: None,
            extra: Mapping::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the source location. Ignored on the wire when the extra options
    /// already carry `File` or `Line`.
    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Add an extra option. Reserved option names are dropped when the
    /// envelope is rendered.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    #[inline]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Whether a source location is known, either set directly or through
    /// the extra options.
    pub fn has_location(&self) -> bool {
        (self.file.is_some() || self.extra.contains_key("File"))
            && (self.line.is_some() || self.extra.contains_key("Line"))
    }

    /// Extra option under `name`, reserved names included.
    pub fn extra(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    pub(crate) fn set_location(&mut self, file: String, line: u32) {
        self.file = Some(file);
        self.line = Some(line);
    }

    /// Forget the captured location. `File` and `Line` extras stay.
    pub(crate) fn clear_location(&mut self) {
        self.file = None;
        self.line = None;
    }

    /// Render the envelope in wire order: extra options, `Type`, `Label`,
    /// then `File` and `Line` unless the extras already set them.
    pub fn to_mapping(&self) -> Mapping {
        let mut map = Mapping::with_capacity(self.extra.len() + 4);
        for (key, value) in self.extra.iter() {
            let key = key.text();
            if RESERVED_OPTION_NAMES.contains(&key.as_ref()) {
                continue;
            }
            map.insert(key.into_owned(), value.clone());
        }

        map.insert("Type", self.kind.as_str());
        if let Some(label) = &self.label {
            map.insert("Label", label.as_str());
        }
        if let Some(file) = &self.file {
            if !map.contains_key("File") {
                map.insert("File", file.as_str());
            }
        }
        if let Some(line) = self.line {
            if !map.contains_key("Line") {
                map.insert("Line", line);
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(map: &Mapping) -> Vec<String> {
        map.keys().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_minimal_envelope() {
        let map = Envelope::new(Kind::Log).to_mapping();
        assert_eq!(keys(&map), vec!["Type"]);
        assert_eq!(map.get("Type"), Some(&Value::from("LOG")));
    }

    #[test]
    fn test_full_envelope_order() {
        let map = Envelope::new(Kind::Info)
            .with_label("lbl")
            .with_location("/app/main.rs", 10)
            .to_mapping();
        assert_eq!(keys(&map), vec!["Type", "Label", "File", "Line"]);
        assert_eq!(map.get("Line"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_reserved_options_stripped() {
        let mut envelope = Envelope::new(Kind::Log);
        for name in RESERVED_OPTION_NAMES {
            envelope = envelope.with_extra(name, 1);
        }
        let map = envelope.with_extra("Collapsed", "true").to_mapping();
        assert_eq!(keys(&map), vec!["Collapsed", "Type"]);
    }

    #[test]
    fn test_extra_location_wins() {
        let map = Envelope::new(Kind::Error)
            .with_extra("File", "given.rs")
            .with_extra("Line", 7)
            .with_location("captured.rs", 99)
            .to_mapping();
        assert_eq!(map.get("File"), Some(&Value::from("given.rs")));
        assert_eq!(map.get("Line"), Some(&Value::Int(7)));
        assert_eq!(keys(&map), vec!["File", "Line", "Type"]);
    }

    #[test]
    fn test_extra_type_replaced_in_place() {
        let map = Envelope::new(Kind::Warn)
            .with_extra("Type", "bogus")
            .with_extra("Color", "red")
            .to_mapping();
        assert_eq!(keys(&map), vec!["Type", "Color"]);
        assert_eq!(map.get("Type"), Some(&Value::from("WARN")));
    }

    #[test]
    fn test_has_location() {
        assert!(!Envelope::new(Kind::Log).has_location());
        assert!(Envelope::new(Kind::Log).with_location("f", 1).has_location());
        assert!(Envelope::new(Kind::Log)
            .with_extra("File", "f")
            .with_extra("Line", 1)
            .has_location());
    }

    #[test]
    fn test_kind_names() {
        for kind in [
            Kind::Log,
            Kind::Info,
            Kind::Warn,
            Kind::Error,
            Kind::Dump,
            Kind::Trace,
            Kind::Table,
            Kind::GroupStart,
            Kind::GroupEnd,
            Kind::Exception,
        ] {
            assert_eq!(kind.as_str().parse::<Kind>().unwrap(), kind);
        }
        assert!("VERBOSE".parse::<Kind>().is_err());
        assert_eq!(Kind::Dump.structure(), Structure::Dump);
        assert_eq!(Kind::Table.structure(), Structure::Console);
    }
}
