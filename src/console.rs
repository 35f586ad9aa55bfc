//! Console helpers on [`Emitter`].
//!
//! One method per message kind, plus the stream-wide settings callers
//! change at runtime. All helpers are `#[track_caller]`: without a
//! backtrace provider, the file and line shown in the console are those of
//! the helper call.
//!
//! ```
//! use wildfire_client::console::GroupOptions;
//! use wildfire_client::transport::MemoryTransport;
//! use wildfire_client::EmitterBuilder;
//!
//! let mut console = EmitterBuilder::new()
//!     .include_line_numbers(false)
//!     .build(MemoryTransport::new());
//!
//! console.group("Request", &GroupOptions::new().collapsed(true)).unwrap();
//! console.info("started", None).unwrap();
//! console.dump("user_id", 42).unwrap();
//! console.group_end().unwrap();
//!
//! assert_eq!(console.message_index(), 4);
//! ```

use std::panic::Location;

use crate::emitter::{Emission, Emitter, Payload};
use crate::encoder::{ObjectFilter, OptionOverrides};
use crate::error::{Result, WildfireError};
use crate::protocol::{Envelope, Kind};
use crate::trace::{escape_trace_file, ExceptionInfo};
use crate::transport::Transport;
use crate::value::Value;

/// Longest key accepted by [`Emitter::dump`].
pub const MAX_DUMP_KEY_LEN: usize = 100;

/// Display options of a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupOptions {
    /// Start folded.
    pub collapsed: Option<bool>,
    /// CSS color of the group label.
    pub color: Option<String>,
}

impl GroupOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = Some(collapsed);
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Check a dump key: at most 100 characters from `[a-zA-Z0-9-_.:]`.
pub fn validate_dump_key(key: &str) -> Result<()> {
    if key.chars().count() > MAX_DUMP_KEY_LEN {
        return Err(WildfireError::InvalidCallArguments(
            "Key passed to dump() is longer than 100 characters".to_string(),
        ));
    }
    let valid = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
    if !valid {
        return Err(WildfireError::InvalidCallArguments(
            "Key passed to dump() contains invalid characters [a-zA-Z0-9-_\\.:]".to_string(),
        ));
    }
    Ok(())
}

impl<T: Transport> Emitter<T> {
    #[track_caller]
    pub fn log(&mut self, value: impl Into<Value>, label: Option<&str>) -> Result<Emission> {
        self.log_with(value, label, &OptionOverrides::new())
    }

    #[track_caller]
    pub fn info(&mut self, value: impl Into<Value>, label: Option<&str>) -> Result<Emission> {
        self.info_with(value, label, &OptionOverrides::new())
    }

    #[track_caller]
    pub fn warn(&mut self, value: impl Into<Value>, label: Option<&str>) -> Result<Emission> {
        self.warn_with(value, label, &OptionOverrides::new())
    }

    #[track_caller]
    pub fn error(&mut self, value: impl Into<Value>, label: Option<&str>) -> Result<Emission> {
        self.error_with(value, label, &OptionOverrides::new())
    }

    /// [`log`](Emitter::log) with encoding options for this message only.
    #[track_caller]
    pub fn log_with(
        &mut self,
        value: impl Into<Value>,
        label: Option<&str>,
        overrides: &OptionOverrides,
    ) -> Result<Emission> {
        self.console(Kind::Log, value.into(), label, overrides, Location::caller())
    }

    #[track_caller]
    pub fn info_with(
        &mut self,
        value: impl Into<Value>,
        label: Option<&str>,
        overrides: &OptionOverrides,
    ) -> Result<Emission> {
        self.console(Kind::Info, value.into(), label, overrides, Location::caller())
    }

    #[track_caller]
    pub fn warn_with(
        &mut self,
        value: impl Into<Value>,
        label: Option<&str>,
        overrides: &OptionOverrides,
    ) -> Result<Emission> {
        self.console(Kind::Warn, value.into(), label, overrides, Location::caller())
    }

    #[track_caller]
    pub fn error_with(
        &mut self,
        value: impl Into<Value>,
        label: Option<&str>,
        overrides: &OptionOverrides,
    ) -> Result<Emission> {
        self.console(Kind::Error, value.into(), label, overrides, Location::caller())
    }

    /// Send `value` to the dump panel under `key`.
    ///
    /// # Errors
    ///
    /// `InvalidCallArguments` if the key is too long or has characters
    /// outside `[a-zA-Z0-9-_.:]`.
    #[track_caller]
    pub fn dump(&mut self, key: &str, value: impl Into<Value>) -> Result<Emission> {
        self.dump_with(key, value, &OptionOverrides::new())
    }

    #[track_caller]
    pub fn dump_with(
        &mut self,
        key: &str,
        value: impl Into<Value>,
        overrides: &OptionOverrides,
    ) -> Result<Emission> {
        validate_dump_key(key)?;
        self.console(Kind::Dump, value.into(), Some(key), overrides, Location::caller())
    }

    /// Send a stack trace of the calling code with `label` as its message.
    #[track_caller]
    pub fn trace(&mut self, label: &str) -> Result<Emission> {
        let overrides = OptionOverrides::new();
        self.console(Kind::Trace, Value::from(label), None, &overrides, Location::caller())
    }

    /// Send a table. Each row is a sequence of cells; the first row is
    /// usually the column headings.
    #[track_caller]
    pub fn table(&mut self, label: &str, rows: impl Into<Value>) -> Result<Emission> {
        let overrides = OptionOverrides::new();
        self.console(Kind::Table, rows.into(), Some(label), &overrides, Location::caller())
    }

    /// Open a group. Messages up to the matching [`group_end`] nest inside.
    ///
    /// [`group_end`]: Emitter::group_end
    #[track_caller]
    pub fn group(&mut self, name: &str, options: &GroupOptions) -> Result<Emission> {
        let mut envelope = Envelope::new(Kind::GroupStart).with_label(name);
        if let Some(collapsed) = options.collapsed {
            envelope = envelope.with_extra("Collapsed", if collapsed { "true" } else { "false" });
        }
        if let Some(color) = &options.color {
            envelope = envelope.with_extra("Color", color.as_str());
        }
        self.dispatch(envelope, &Value::Null, &OptionOverrides::new(), Location::caller())
    }

    /// Close the innermost open group.
    #[track_caller]
    pub fn group_end(&mut self) -> Result<Emission> {
        let overrides = OptionOverrides::new();
        self.console(Kind::GroupEnd, Value::Null, None, &overrides, Location::caller())
    }

    /// Send an exception with its trace. File and line come from the
    /// exception, not from the caller.
    #[track_caller]
    pub fn exception(&mut self, info: &ExceptionInfo, label: Option<&str>) -> Result<Emission> {
        let caller = Location::caller();
        if !self.is_enabled() {
            return Ok(Emission::Disabled);
        }
        let mut envelope = Envelope::new(Kind::Exception)
            .with_location(escape_trace_file(&info.file), info.line);
        if let Some(label) = label {
            envelope = envelope.with_label(label);
        }
        let payload = info.to_payload(self.trace_filter(), &self.config().encoding, self.filters())?;
        self.send(envelope, Payload::Encoded(payload), &OptionOverrides::new(), caller)
    }

    fn console(
        &mut self,
        kind: Kind,
        value: Value,
        label: Option<&str>,
        overrides: &OptionOverrides,
        caller: &'static Location<'static>,
    ) -> Result<Emission> {
        let mut envelope = Envelope::new(kind);
        if let Some(label) = label {
            envelope = envelope.with_label(label);
        }
        self.dispatch(envelope, &value, overrides, caller)
    }

    /// Install or replace the filter for a type.
    pub fn set_object_filter(&mut self, type_name: &str, filter: ObjectFilter) {
        self.filters_mut().set(type_name, filter);
    }

    pub fn remove_object_filter(&mut self, type_name: &str) -> Option<ObjectFilter> {
        self.filters_mut().remove(type_name)
    }

    /// Drop frames whose class starts with `prefix` from traces.
    pub fn ignore_class_in_traces(&mut self, prefix: &str) {
        self.trace_filter_mut().ignore_class(prefix);
    }

    /// Drop frames whose file starts with `prefix` from traces.
    pub fn ignore_path_in_traces(&mut self, prefix: &str) {
        self.trace_filter_mut().ignore_path(prefix);
    }

    /// Read one stream option by its wire name.
    pub fn option(&self, name: &str) -> Result<Value> {
        self.config().option(name)
    }

    /// Set one stream option by its wire name.
    pub fn set_option(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.config_mut().set_option(name, value)
    }

    /// Set several stream options. Stops at the first bad entry; entries
    /// before it stay applied.
    pub fn set_options<I, K, V>(&mut self, options: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in options {
            self.set_option(name.as_ref(), value)?;
        }
        Ok(())
    }
}
