//! Stack frames, trace filtering and exception payloads.
//!
//! Frames come from a [`BacktraceProvider`], newest first. The emitter uses
//! them for `TRACE` messages, for exception traces, and to find the file and
//! line of the calling code when line numbers are enabled.
//!
//! # Filtering
//!
//! [`TraceFilter`] drops frames whose class starts with an ignored class
//! prefix or whose file starts with an ignored path prefix. With a negative
//! offset `-k`, the dropped frames from position `k` onwards are put back in
//! front of the kept ones, in their original order.

use std::fmt;

use crate::encoder::{Encoder, EncodingOptions, FilterTable, OptionOverrides};
use crate::error::Result;
use crate::value::{Mapping, Value};

/// Class prefix ignored by default: frames of this crate itself.
pub const CRATE_CLASS_PREFIX: &str = "wildfire_client::";

/// One stack frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub function: Option<String>,
    pub class: Option<String>,
    /// Call operator, `->` for instance calls and `::` for static ones.
    pub call_type: Option<String>,
    pub args: Vec<Value>,
}

impl Frame {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: Some(function.into()),
            ..Self::default()
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn in_class(mut self, class: impl Into<String>, call_type: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self.call_type = Some(call_type.into());
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Render the frame for the wire with its file escaped and its
    /// arguments encoded by `encoder`.
    pub(crate) fn to_value(&self, encoder: &mut Encoder<'_>) -> Result<Value> {
        let mut map = Mapping::new();
        if let Some(file) = &self.file {
            map.insert("file", escape_trace_file(file));
        }
        if let Some(line) = self.line {
            map.insert("line", line);
        }
        if let Some(function) = &self.function {
            map.insert("function", function.as_str());
        }
        if let Some(class) = &self.class {
            map.insert("class", class.as_str());
        }
        if let Some(call_type) = &self.call_type {
            map.insert("type", call_type.as_str());
        }
        if !self.args.is_empty() {
            map.insert("args", encoder.encode(&Value::Sequence(self.args.clone()))?);
        }
        Ok(Value::Mapping(map))
    }
}

/// Source of stack frames.
pub trait BacktraceProvider {
    /// Frames of the current call stack, newest first.
    fn capture(&self) -> Vec<Frame>;
}

/// Provider that never has frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBacktrace;

impl BacktraceProvider for NoBacktrace {
    fn capture(&self) -> Vec<Frame> {
        Vec::new()
    }
}

/// Provider that returns a fixed list of frames.
#[derive(Debug, Clone, Default)]
pub struct FixedBacktrace(pub Vec<Frame>);

impl BacktraceProvider for FixedBacktrace {
    fn capture(&self) -> Vec<Frame> {
        self.0.clone()
    }
}

impl<F> BacktraceProvider for F
where
    F: Fn() -> Vec<Frame>,
{
    fn capture(&self) -> Vec<Frame> {
        self()
    }
}

/// Ignored class and path prefixes.
#[derive(Debug, Clone)]
pub struct TraceFilter {
    classes: Vec<String>,
    paths: Vec<String>,
}

impl Default for TraceFilter {
    fn default() -> Self {
        Self {
            classes: vec![CRATE_CLASS_PREFIX.to_string()],
            paths: Vec::new(),
        }
    }
}

impl TraceFilter {
    /// A filter that ignores nothing.
    pub fn empty() -> Self {
        Self {
            classes: Vec::new(),
            paths: Vec::new(),
        }
    }

    pub fn ignore_class(&mut self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        if !self.classes.contains(&prefix) {
            self.classes.push(prefix);
        }
    }

    pub fn ignore_path(&mut self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        if !self.paths.contains(&prefix) {
            self.paths.push(prefix);
        }
    }

    /// Whether a frame is dropped by this filter.
    pub fn is_ignored(&self, frame: &Frame) -> bool {
        let by_class = frame
            .class
            .as_deref()
            .map_or(false, |c| self.classes.iter().any(|p| c.starts_with(p.as_str())));
        let by_path = frame
            .file
            .as_deref()
            .map_or(false, |f| self.paths.iter().any(|p| f.starts_with(p.as_str())));
        by_class || by_path
    }

    /// Drop ignored frames. A negative `offset` of `-k` puts the dropped
    /// frames from position `k` on back in front.
    ///
    /// # Example
    ///
    /// ```
    /// use wildfire_client::trace::{Frame, TraceFilter};
    ///
    /// let mut filter = TraceFilter::empty();
    /// filter.ignore_class("Lib");
    ///
    /// let frames = vec![
    ///     Frame::new("a").in_class("Lib", "->"),
    ///     Frame::new("b").in_class("Lib\\Inner", "::"),
    ///     Frame::new("c"),
    /// ];
    ///
    /// let kept: Vec<_> = filter.apply(&frames, 0).into_iter().map(|f| f.function).collect();
    /// assert_eq!(kept, vec![Some("c".to_string())]);
    ///
    /// let kept: Vec<_> = filter.apply(&frames, -1).into_iter().map(|f| f.function).collect();
    /// assert_eq!(kept, vec![Some("b".to_string()), Some("c".to_string())]);
    /// ```
    pub fn apply(&self, frames: &[Frame], offset: i32) -> Vec<Frame> {
        let (discarded, mut kept): (Vec<&Frame>, Vec<&Frame>) =
            frames.iter().partition(|f| self.is_ignored(f));

        if offset < 0 {
            let from = offset.unsigned_abs() as usize;
            if from < discarded.len() {
                let mut restored = discarded[from..].to_vec();
                restored.append(&mut kept);
                kept = restored;
            }
        }
        kept.into_iter().cloned().collect()
    }
}

/// Collapse runs of backslashes in a Windows path to a single backslash.
///
/// Paths without a backslash, or starting with one, are returned unchanged.
pub fn escape_trace_file(file: &str) -> String {
    match file.find('\\') {
        Some(pos) if pos > 0 => {}
        _ => return file.to_string(),
    }
    let mut out = String::with_capacity(file.len());
    let mut prev_backslash = false;
    for c in file.chars() {
        if c == '\\' {
            if !prev_backslash {
                out.push(c);
            }
            prev_backslash = true;
        } else {
            out.push(c);
            prev_backslash = false;
        }
    }
    out
}

/// Render frames for a trace payload, arguments encoded shallowly.
pub(crate) fn render_frames(
    frames: &[Frame],
    options: &EncodingOptions,
    filters: &FilterTable,
) -> Result<Value> {
    let mut encoder = Encoder::new(options.merged(&OptionOverrides::trace()), filters);
    frames
        .iter()
        .map(|f| f.to_value(&mut encoder))
        .collect::<Result<Vec<_>>>()
        .map(Value::Sequence)
}

/// Severity of a runtime notice turned into an exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Notice,
    UserError,
    UserWarning,
    UserNotice,
    RecoverableError,
    Deprecated,
    UserDeprecated,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "E_WARNING",
            Severity::Notice => "E_NOTICE",
            Severity::UserError => "E_USER_ERROR",
            Severity::UserWarning => "E_USER_WARNING",
            Severity::UserNotice => "E_USER_NOTICE",
            Severity::RecoverableError => "E_RECOVERABLE_ERROR",
            Severity::Deprecated => "E_DEPRECATED",
            Severity::UserDeprecated => "E_USER_DEPRECATED",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the exception came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionOrigin {
    /// Raised by code.
    Throw,
    /// Converted from a runtime notice.
    Trigger { severity: Severity },
}

/// An exception to log.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionInfo {
    pub class: String,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub trace: Vec<Frame>,
    pub origin: ExceptionOrigin,
}

impl ExceptionInfo {
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
            file: String::new(),
            line: 0,
            trace: Vec::new(),
            origin: ExceptionOrigin::Throw,
        }
    }

    /// Describe a Rust error, using its type name as the class.
    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        Self::new(std::any::type_name::<E>(), error.to_string())
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = file.into();
        self.line = line;
        self
    }

    pub fn with_trace(mut self, trace: Vec<Frame>) -> Self {
        self.trace = trace;
        self
    }

    pub fn triggered(mut self, severity: Severity) -> Self {
        self.origin = ExceptionOrigin::Trigger { severity };
        self
    }

    /// Message as shown in the console; triggered notices carry their
    /// severity name.
    pub fn display_message(&self) -> String {
        match self.origin {
            ExceptionOrigin::Throw => self.message.clone(),
            ExceptionOrigin::Trigger { severity } => format!("{}: {}", severity, self.message),
        }
    }

    fn type_name(&self) -> &'static str {
        match self.origin {
            ExceptionOrigin::Throw => "throw",
            ExceptionOrigin::Trigger { .. } => "trigger",
        }
    }

    /// Build the `EXCEPTION` payload.
    pub(crate) fn to_payload(
        &self,
        filter: &TraceFilter,
        options: &EncodingOptions,
        filters: &FilterTable,
    ) -> Result<Value> {
        let trace = render_frames(&filter.apply(&self.trace, 0), options, filters)?;
        let mut map = Mapping::new();
        map.insert("Class", self.class.as_str());
        map.insert("Message", self.display_message());
        map.insert("File", escape_trace_file(&self.file));
        map.insert("Line", self.line);
        map.insert("Type", self.type_name());
        map.insert("Trace", trace);
        Ok(Value::Mapping(map))
    }
}
