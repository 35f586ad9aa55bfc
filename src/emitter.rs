//! Wire protocol emitter.
//!
//! [`Emitter`] owns one output stream: its transport, options, filters and
//! the running segment index. Each call turns an envelope and a payload into
//! message text and writes it as numbered headers.
//!
//! # Lifecycle
//!
//! 1. Check the emitter is enabled and the stream is not exhausted
//! 2. Check the transport still accepts headers and, when detection is
//!    on, that the request came from a console extension
//! 3. Fill in the caller's file and line when enabled
//! 4. Encode the envelope and payload, then serialize them
//! 5. Split the message into segments and reserve their indices
//! 6. Write declaration headers, segment headers and `X-Wf-1-Index`
//!
//! Errors in steps 3-4 abort only the current message. Index exhaustion is
//! fatal: the stream refuses every later message.

use std::panic::Location;

use bytes::Bytes;

use crate::codec::JsonBackend;
use crate::config::EmitterConfig;
use crate::console::validate_dump_key;
use crate::encoder::{Encoder, EncodingOptions, FilterTable, ObjectFilter, OptionOverrides};
use crate::error::{Result, WildfireError};
use crate::protocol::{
    detect_client, segment_header_name, split, Envelope, Kind, INDEX_HEADER, MAX_MESSAGE_INDEX, PLUGIN_HEADER,
    PLUGIN_URI, PROTOCOL_HEADER, PROTOCOL_URI, SEGMENT_BUDGET,
};
use crate::trace::{
    escape_trace_file, render_frames, BacktraceProvider, Frame, NoBacktrace, TraceFilter,
};
use crate::transport::{ResponseState, Transport};
use crate::value::{Mapping, Value};

/// Outcome of a successful emit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    /// The message was written as `segments` headers starting at
    /// `first_index`.
    Sent { first_index: u32, segments: usize },
    /// The emitter is disabled; nothing was written.
    Disabled,
    /// Headers were already committed and a visible notice was written
    /// into the body instead.
    NoticeWritten,
    /// Client detection is on and the request did not come from a
    /// supported console extension; nothing was written.
    NoClient,
}

impl Emission {
    #[inline]
    pub fn is_sent(&self) -> bool {
        matches!(self, Emission::Sent { .. })
    }
}

/// What the payload still needs before serialization.
pub(crate) enum Payload<'a> {
    /// Caller value, to be encoded with the effective options.
    Raw(&'a Value),
    /// Already built from encoded parts.
    Encoded(Value),
}

/// Builder for configuring and creating an [`Emitter`].
pub struct EmitterBuilder {
    config: EmitterConfig,
    filters: FilterTable,
    trace_filter: TraceFilter,
    backtrace: Option<Box<dyn BacktraceProvider>>,
}

impl EmitterBuilder {
    /// Create a builder with default options.
    pub fn new() -> Self {
        Self {
            config: EmitterConfig::default(),
            filters: FilterTable::new(),
            trace_filter: TraceFilter::default(),
            backtrace: None,
        }
    }

    /// Start from a full configuration, including its filters and ignored
    /// trace prefixes.
    pub fn config(mut self, config: EmitterConfig) -> Self {
        for (name, spec) in &config.object_filters {
            match spec.to_filter() {
                Some(filter) => self.filters.set(name, filter),
                None => {
                    self.filters.remove(name);
                }
            }
        }
        for class in &config.ignored_classes {
            self.trace_filter.ignore_class(class.as_str());
        }
        for path in &config.ignored_paths {
            self.trace_filter.ignore_path(path.as_str());
        }
        self.config = config;
        self
    }

    /// Enable or disable the emitter.
    ///
    /// Default: enabled
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Set the encoding options.
    pub fn encoding(mut self, options: EncodingOptions) -> Self {
        self.config.encoding = options;
        self
    }

    /// Set the combined depth ceiling.
    ///
    /// Default: 10
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.config.encoding.max_depth = depth;
        self
    }

    /// Set the ceiling for nested composites.
    ///
    /// Default: 5
    pub fn max_object_depth(mut self, depth: u32) -> Self {
        self.config.encoding.max_object_depth = depth;
        self
    }

    /// Set the ceiling for nested collections.
    ///
    /// Default: 5
    pub fn max_array_depth(mut self, depth: u32) -> Self {
        self.config.encoding.max_array_depth = depth;
        self
    }

    /// Select the JSON backend.
    ///
    /// Default: [`JsonBackend::Builtin`]
    pub fn backend(mut self, backend: JsonBackend) -> Self {
        self.config.use_native_json_encode = backend.is_native();
        self
    }

    /// Add the caller's file and line to envelopes.
    ///
    /// Default: true
    pub fn include_line_numbers(mut self, include: bool) -> Self {
        self.config.include_line_numbers = include;
        self
    }

    /// Frames to skip when looking for the caller.
    ///
    /// Default: 0
    pub fn line_number_offset(mut self, offset: u32) -> Self {
        self.config.line_number_offset = offset;
        self
    }

    /// Only send when the request announces a supported console extension.
    ///
    /// Default: false
    pub fn detect_client(mut self, detect: bool) -> Self {
        self.config.detect_client = detect;
        self
    }

    /// Install a filter for a type.
    pub fn object_filter(mut self, type_name: &str, filter: ObjectFilter) -> Self {
        self.filters.set(type_name, filter);
        self
    }

    /// Drop frames whose class starts with `prefix` from traces.
    pub fn ignore_class_in_traces(mut self, prefix: &str) -> Self {
        self.trace_filter.ignore_class(prefix);
        self
    }

    /// Drop frames whose file starts with `prefix` from traces.
    pub fn ignore_path_in_traces(mut self, prefix: &str) -> Self {
        self.trace_filter.ignore_path(prefix);
        self
    }

    /// Set the source of stack frames.
    ///
    /// Default: none, the caller's location is used for line numbers.
    pub fn backtrace<P: BacktraceProvider + 'static>(mut self, provider: P) -> Self {
        self.backtrace = Some(Box::new(provider));
        self
    }

    /// Build an emitter writing to `transport`.
    pub fn build<T: Transport>(self, transport: T) -> Emitter<T> {
        Emitter {
            transport,
            config: self.config,
            filters: self.filters,
            trace_filter: self.trace_filter,
            backtrace: self.backtrace.unwrap_or_else(|| Box::new(NoBacktrace)),
            next_index: 1,
            exhausted: false,
            open_groups: 0,
            in_failure_handler: false,
        }
    }
}

impl Default for EmitterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Emits messages on one output stream.
///
/// # Example
///
/// ```
/// use wildfire_client::{EmitterBuilder, Kind};
/// use wildfire_client::encoder::OptionOverrides;
/// use wildfire_client::transport::MemoryTransport;
/// use wildfire_client::value::Value;
///
/// let mut emitter = EmitterBuilder::new()
///     .include_line_numbers(false)
///     .build(MemoryTransport::new());
///
/// let payload = Value::map([("a", Value::Int(1)), ("b", Value::seq([1, 2, 3]))]);
/// emitter
///     .emit_message(Kind::Log, &payload, None, &OptionOverrides::new())
///     .unwrap();
///
/// let transport = emitter.transport();
/// assert_eq!(
///     transport.header("X-Wf-1-1-1-1"),
///     Some(r#"36|[{"Type":"LOG"},{"a":1,"b":[1,2,3]}]|"#)
/// );
/// assert_eq!(transport.header("X-Wf-1-Index"), Some("1"));
/// ```
pub struct Emitter<T: Transport> {
    transport: T,
    config: EmitterConfig,
    filters: FilterTable,
    trace_filter: TraceFilter,
    backtrace: Box<dyn BacktraceProvider>,
    /// Index of the next segment header.
    next_index: u32,
    exhausted: bool,
    open_groups: usize,
    in_failure_handler: bool,
}

impl<T: Transport> Emitter<T> {
    /// Emitter with default options.
    pub fn new(transport: T) -> Self {
        EmitterBuilder::new().build(transport)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    pub(crate) fn config_mut(&mut self) -> &mut EmitterConfig {
        &mut self.config
    }

    pub(crate) fn filters(&self) -> &FilterTable {
        &self.filters
    }

    pub(crate) fn filters_mut(&mut self) -> &mut FilterTable {
        &mut self.filters
    }

    pub(crate) fn trace_filter(&self) -> &TraceFilter {
        &self.trace_filter
    }

    pub(crate) fn trace_filter_mut(&mut self) -> &mut TraceFilter {
        &mut self.trace_filter
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Last segment index written, 0 before the first message.
    #[inline]
    pub fn message_index(&self) -> u32 {
        self.next_index - 1
    }

    /// Whether the index ran out. An exhausted stream accepts no messages.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Number of groups started and not yet ended.
    #[inline]
    pub fn open_groups(&self) -> usize {
        self.open_groups
    }

    /// Mark whether calls come from a top-level failure handler.
    ///
    /// While set, a committed transport gets a visible notice in the body
    /// instead of a `TransportAlreadyCommitted` error.
    pub fn set_in_failure_handler(&mut self, inside: bool) {
        self.in_failure_handler = inside;
    }

    #[cfg(test)]
    pub(crate) fn set_next_index(&mut self, next: u32) {
        self.next_index = next;
    }

    /// Emit one message of `kind`.
    ///
    /// `TRACE` messages use `value` as the trace message and build the
    /// payload from the backtrace provider. `TABLE` messages treat `value`
    /// as a list of rows. Every other kind sends `value` as its payload.
    ///
    /// # Errors
    ///
    /// - `InvalidCallArguments` for a group start without label, a group
    ///   end without an open group, or a dump without a valid key
    /// - `TransportAlreadyCommitted` when headers can no longer be written
    /// - `UnsupportedValueKind` when the value cannot be encoded
    /// - `IndexExhausted` when the message does not fit in the index range
    #[track_caller]
    pub fn emit_message(
        &mut self,
        kind: Kind,
        value: &Value,
        label: Option<&str>,
        overrides: &OptionOverrides,
    ) -> Result<Emission> {
        let caller = Location::caller();
        let mut envelope = Envelope::new(kind);
        if let Some(label) = label {
            envelope = envelope.with_label(label);
        }
        self.dispatch(envelope, value, overrides, caller)
    }

    /// Emit a prepared envelope with `payload`.
    #[track_caller]
    pub fn emit(
        &mut self,
        envelope: Envelope,
        payload: &Value,
        overrides: &OptionOverrides,
    ) -> Result<Emission> {
        let caller = Location::caller();
        self.dispatch(envelope, payload, overrides, caller)
    }

    pub(crate) fn dispatch(
        &mut self,
        mut envelope: Envelope,
        value: &Value,
        overrides: &OptionOverrides,
        caller: &'static Location<'static>,
    ) -> Result<Emission> {
        if !self.config.enabled {
            return Ok(Emission::Disabled);
        }
        match envelope.kind() {
            Kind::GroupStart if envelope.label().map_or(true, str::is_empty) => {
                return Err(WildfireError::InvalidCallArguments(
                    "You must specify a label for the group!".to_string(),
                ));
            }
            Kind::GroupEnd if self.open_groups == 0 => {
                return Err(WildfireError::InvalidCallArguments(
                    "Too many groupEnd() as opposed to group() calls!".to_string(),
                ));
            }
            Kind::Dump => match envelope.label() {
                Some(key) if !key.is_empty() => validate_dump_key(key)?,
                _ => {
                    return Err(WildfireError::InvalidCallArguments(
                        "You must specify a key for dump()".to_string(),
                    ))
                }
            },
            _ => {}
        }
        let overrides = envelope_overrides(&envelope, overrides);

        let payload = match envelope.kind() {
            Kind::Trace => {
                let offset = self.line_number_offset(&envelope);
                let (payload, file, line) = self.trace_payload(value, offset, caller)?;
                if let (Some(file), Some(line)) = (file, line) {
                    envelope.set_location(file, line);
                }
                Payload::Encoded(payload)
            }
            Kind::Table => Payload::Encoded(self.table_payload(value)?),
            _ => Payload::Raw(value),
        };

        let kind = envelope.kind();
        let emission = self.send(envelope, payload, &overrides, caller)?;
        if emission.is_sent() {
            match kind {
                Kind::GroupStart => self.open_groups += 1,
                Kind::GroupEnd => self.open_groups -= 1,
                _ => {}
            }
        }
        Ok(emission)
    }

    /// Encode, serialize, segment and write one message.
    pub(crate) fn send(
        &mut self,
        mut envelope: Envelope,
        payload: Payload<'_>,
        overrides: &OptionOverrides,
        caller: &'static Location<'static>,
    ) -> Result<Emission> {
        if !self.config.enabled {
            tracing::trace!("Emitter disabled, dropping {} message", envelope.kind());
            return Ok(Emission::Disabled);
        }
        if self.exhausted {
            return Err(WildfireError::IndexExhausted {
                limit: MAX_MESSAGE_INDEX,
            });
        }

        if let ResponseState::Started { location } = self.transport.response_state() {
            let err = WildfireError::TransportAlreadyCommitted { location };
            if self.in_failure_handler {
                tracing::warn!("{}", err);
                self.transport.write_notice(&err.to_string());
                return Ok(Emission::NoticeWritten);
            }
            tracing::error!("{}", err);
            return Err(err);
        }

        if self.config.detect_client && !detect_client(&self.transport) {
            tracing::debug!("No console extension detected, dropping {} message", envelope.kind());
            return Ok(Emission::NoClient);
        }

        if self.config.include_line_numbers {
            if !envelope.has_location() {
                let offset = self.line_number_offset(&envelope);
                let (file, line) = self.caller_location(offset, caller);
                envelope.set_location(file, line);
            }
        } else {
            envelope.clear_location();
        }

        let kind = envelope.kind();
        let options = self.config.encoding.merged(overrides);
        let backend = self.config.backend();
        let mut encoder = Encoder::new(options, &self.filters);

        let payload = match payload {
            Payload::Raw(value) => encoder.encode(value)?,
            Payload::Encoded(value) => value,
        };
        let payload_text = backend.serialize(&payload)?;

        let message = if kind == Kind::Dump {
            let key = backend.serialize(&Value::from(envelope.label().unwrap_or_default()))?;
            format!("{{{}:{}}}", key, payload_text)
        } else {
            let mut meta_encoder = Encoder::new(EncodingOptions::default(), &self.filters);
            let meta = meta_encoder.encode(&Value::Mapping(envelope.to_mapping()))?;
            format!("[{},{}]", backend.serialize(&meta)?, payload_text)
        };

        let segments = split(Bytes::from(message), SEGMENT_BUDGET);
        let count = segments.len() as u32;
        let first_index = self.next_index;
        if first_index.saturating_add(count - 1) > MAX_MESSAGE_INDEX {
            self.exhausted = true;
            tracing::error!(
                "Segment index exhausted at {} ({} segments needed)",
                first_index,
                count
            );
            return Err(WildfireError::IndexExhausted {
                limit: MAX_MESSAGE_INDEX,
            });
        }

        let structure = kind.structure();
        self.transport.set_header(PROTOCOL_HEADER, PROTOCOL_URI);
        self.transport.set_header(PLUGIN_HEADER, PLUGIN_URI);
        self.transport
            .set_header(&structure.header_name(), structure.uri());

        for segment in &segments {
            let name = segment_header_name(structure, self.next_index);
            self.transport.set_header(&name, &segment.header_value());
            self.next_index += 1;
        }
        self.transport
            .set_header(INDEX_HEADER, &self.message_index().to_string());

        tracing::debug!(
            "Sent {} message as {} segment(s) from index {}",
            kind,
            count,
            first_index
        );
        Ok(Emission::Sent {
            first_index,
            segments: segments.len(),
        })
    }

    /// Offset from the envelope's `lineNumberOffset` option, else the
    /// configured one.
    fn line_number_offset(&self, envelope: &Envelope) -> usize {
        match envelope.extra("lineNumberOffset") {
            Some(Value::Int(n)) if *n >= 0 => *n as usize,
            _ => self.config.line_number_offset as usize,
        }
    }

    /// File and line of the calling code: the first frame past the offset,
    /// else the location of the public call.
    fn caller_location(
        &self,
        offset: usize,
        caller: &'static Location<'static>,
    ) -> (String, u32) {
        let frames = self.trace_filter.apply(&self.backtrace.capture(), -1);
        match frames.get(offset) {
            Some(frame) => (
                frame
                    .file
                    .as_deref()
                    .map(escape_trace_file)
                    .unwrap_or_default(),
                frame.line.unwrap_or(0),
            ),
            None => (caller.file().to_string(), caller.line()),
        }
    }

    fn trace_payload(
        &self,
        message: &Value,
        offset: usize,
        caller: &'static Location<'static>,
    ) -> Result<(Value, Option<String>, Option<u32>)> {
        let frames = self.backtrace.capture();
        let from = offset.min(frames.len());
        let calling = frames.get(from).cloned().unwrap_or_else(|| Frame {
            file: Some(caller.file().to_string()),
            line: Some(caller.line()),
            ..Frame::default()
        });
        let trace = self.trace_filter.apply(&frames[from..], 0);

        let options = self.config.encoding.merged(&OptionOverrides::trace());
        let mut encoder = Encoder::new(options, &self.filters);
        let file = calling.file.as_deref().map(escape_trace_file);

        let mut map = Mapping::new();
        map.insert("Class", calling.class.clone().unwrap_or_default());
        map.insert("Type", calling.call_type.clone().unwrap_or_default());
        map.insert("Function", calling.function.clone().unwrap_or_default());
        map.insert("Message", encoder.encode(message)?);
        map.insert("File", file.clone().unwrap_or_default());
        map.insert("Line", calling.line.map_or(Value::from(""), Value::from));
        map.insert("Args", encoder.encode(&Value::Sequence(calling.args.clone()))?);
        map.insert(
            "Trace",
            render_frames(&trace, &self.config.encoding, &self.filters)?,
        );
        Ok((Value::Mapping(map), file, calling.line))
    }

    fn table_payload(&self, rows: &Value) -> Result<Value> {
        let options = self.config.encoding.merged(&OptionOverrides::trace());
        let mut encoder = Encoder::new(options, &self.filters);
        let rows = match rows {
            Value::Shared(shared) => table_rows(&shared.borrow())?,
            other => table_rows(other)?,
        };

        let mut table = Vec::with_capacity(rows.len());
        for row in &rows {
            let cells = match row {
                Value::Shared(shared) => row_cells(&shared.borrow()),
                other => row_cells(other),
            };
            let Some(cells) = cells else { continue };
            let encoded = cells
                .iter()
                .map(|cell| encoder.encode(cell))
                .collect::<Result<Vec<_>>>()?;
            table.push(Value::Sequence(encoded));
        }
        Ok(Value::Sequence(table))
    }
}

/// Per-call overrides with the envelope's depth options filled in where the
/// caller left them unset.
fn envelope_overrides(envelope: &Envelope, overrides: &OptionOverrides) -> OptionOverrides {
    let depth = |name: &str| match envelope.extra(name) {
        Some(Value::Int(n)) => u32::try_from(*n).ok(),
        _ => None,
    };
    let mut merged = *overrides;
    merged.max_depth = merged.max_depth.or_else(|| depth("maxDepth"));
    merged.max_object_depth = merged.max_object_depth.or_else(|| depth("maxObjectDepth"));
    merged.max_array_depth = merged.max_array_depth.or_else(|| depth("maxArrayDepth"));
    merged
}

fn table_rows(rows: &Value) -> Result<Vec<Value>> {
    match rows {
        Value::Sequence(rows) => Ok(rows.clone()),
        Value::Mapping(rows) => Ok(rows.iter().map(|(_, row)| row.clone()).collect()),
        other => Err(WildfireError::InvalidCallArguments(format!(
            "Table rows must be a sequence, got {}",
            other.kind_name()
        ))),
    }
}

fn row_cells(row: &Value) -> Option<Vec<Value>> {
    match row {
        Value::Sequence(cells) => Some(cells.clone()),
        Value::Mapping(cells) => Some(cells.iter().map(|(_, c)| c.clone()).collect()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, SourceLocation};
    use crate::value::SharedRef;

    fn quiet() -> Emitter<MemoryTransport> {
        EmitterBuilder::new()
            .include_line_numbers(false)
            .build(MemoryTransport::new())
    }

    fn log(emitter: &mut Emitter<MemoryTransport>, value: Value) -> Result<Emission> {
        emitter.emit_message(Kind::Log, &value, None, &OptionOverrides::new())
    }

    #[test]
    fn test_single_message_headers() {
        let mut emitter = quiet();
        let emission = log(&mut emitter, Value::from("hi")).unwrap();
        assert_eq!(
            emission,
            Emission::Sent {
                first_index: 1,
                segments: 1
            }
        );

        let t = emitter.transport();
        assert_eq!(t.header(PROTOCOL_HEADER), Some(PROTOCOL_URI));
        assert_eq!(t.header(PLUGIN_HEADER), Some(PLUGIN_URI));
        assert!(t.header("X-Wf-1-Structure-1").is_some());
        assert_eq!(t.header("X-Wf-1-1-1-1"), Some(r#"21|[{"Type":"LOG"},"hi"]|"#));
        assert_eq!(t.header(INDEX_HEADER), Some("1"));
    }

    #[test]
    fn test_indices_run_across_messages() {
        let mut emitter = quiet();
        for i in 0..5 {
            log(&mut emitter, Value::Int(i)).unwrap();
        }
        let t = emitter.transport();
        for i in 1..=5 {
            assert!(t.header(&format!("X-Wf-1-1-1-{}", i)).is_some());
        }
        assert_eq!(t.header(INDEX_HEADER), Some("5"));
        assert_eq!(emitter.message_index(), 5);
    }

    #[test]
    fn test_dump_uses_structure_two() {
        let mut emitter = quiet();
        emitter
            .emit_message(Kind::Dump, &Value::Int(5), Some("key"), &OptionOverrides::new())
            .unwrap();
        let t = emitter.transport();
        assert!(t.header("X-Wf-1-Structure-2").is_some());
        assert!(t.header("X-Wf-1-Structure-1").is_none());
        assert_eq!(t.header("X-Wf-1-2-1-1"), Some(r#"9|{"key":5}|"#));
    }

    #[test]
    fn test_disabled_writes_nothing() {
        let mut emitter = EmitterBuilder::new().enabled(false).build(MemoryTransport::new());
        assert_eq!(log(&mut emitter, Value::Null).unwrap(), Emission::Disabled);
        assert!(emitter.transport().headers().is_empty());
    }

    #[test]
    fn test_committed_transport_fails() {
        let mut emitter = quiet();
        emitter.transport_mut().start(Some(SourceLocation {
            file: "out.rs".into(),
            line: 4,
        }));
        let err = log(&mut emitter, Value::Null).unwrap_err();
        assert!(matches!(err, WildfireError::TransportAlreadyCommitted { .. }));
        assert!(emitter.transport().headers().is_empty());
    }

    #[test]
    fn test_committed_transport_inside_failure_handler() {
        let mut emitter = quiet();
        emitter.transport_mut().start(None);
        emitter.set_in_failure_handler(true);
        assert_eq!(log(&mut emitter, Value::Null).unwrap(), Emission::NoticeWritten);
        assert_eq!(emitter.transport().notices().len(), 1);
        assert!(emitter.transport().notices()[0].starts_with("Headers already sent"));
    }

    #[test]
    fn test_index_exhaustion_is_checked_before_writing() {
        let mut emitter = quiet();
        emitter.set_next_index(MAX_MESSAGE_INDEX);

        let big = Value::from("x".repeat(SEGMENT_BUDGET * 2));
        let err = log(&mut emitter, big).unwrap_err();
        assert!(matches!(err, WildfireError::IndexExhausted { limit: 99_999 }));
        assert!(emitter.transport().headers().is_empty());
        assert!(emitter.is_exhausted());

        // dead for good, even for messages that would fit
        assert!(log(&mut emitter, Value::Null).is_err());
    }

    #[test]
    fn test_last_index_is_usable() {
        let mut emitter = quiet();
        emitter.set_next_index(MAX_MESSAGE_INDEX);
        log(&mut emitter, Value::Null).unwrap();
        assert_eq!(emitter.transport().header(INDEX_HEADER), Some("99999"));
        assert!(log(&mut emitter, Value::Null).is_err());
    }

    #[test]
    fn test_encoding_failure_keeps_stream_usable() {
        let mut emitter = quiet();
        assert!(log(&mut emitter, Value::Float(f64::NAN)).is_err());
        assert!(emitter.transport().headers().is_empty());
        log(&mut emitter, Value::Int(1)).unwrap();
        assert_eq!(emitter.transport().header(INDEX_HEADER), Some("1"));
    }

    #[test]
    fn test_line_numbers_from_backtrace() {
        let mut emitter = EmitterBuilder::new()
            .backtrace(|| {
                vec![
                    Frame::new("emit").in_class("wildfire_client::Emitter", "->"),
                    Frame::new("handler").at("C:\\\\app\\\\main.rs", 42),
                ]
            })
            .build(MemoryTransport::new());
        log(&mut emitter, Value::Null).unwrap();
        assert_eq!(
            emitter.transport().header("X-Wf-1-1-1-1"),
            Some(r#"57|[{"Type":"LOG","File":"C:\\app\\main.rs","Line":42},null]|"#)
        );
    }

    #[test]
    fn test_line_numbers_fall_back_to_caller() {
        let mut emitter = Emitter::new(MemoryTransport::new());
        log(&mut emitter, Value::Null).unwrap();
        let value = emitter.transport().header("X-Wf-1-1-1-1").unwrap();
        assert!(value.contains(r#""File":"src\/emitter.rs""#), "{}", value);
    }

    #[test]
    fn test_group_balance() {
        let mut emitter = quiet();
        let err = emitter
            .emit_message(Kind::GroupEnd, &Value::Null, None, &OptionOverrides::new())
            .unwrap_err();
        assert!(matches!(err, WildfireError::InvalidCallArguments(_)));

        let err = emitter
            .emit_message(Kind::GroupStart, &Value::Null, None, &OptionOverrides::new())
            .unwrap_err();
        assert!(matches!(err, WildfireError::InvalidCallArguments(_)));

        emitter
            .emit_message(Kind::GroupStart, &Value::Null, Some("g"), &OptionOverrides::new())
            .unwrap();
        assert_eq!(emitter.open_groups(), 1);
        emitter
            .emit_message(Kind::GroupEnd, &Value::Null, None, &OptionOverrides::new())
            .unwrap();
        assert_eq!(emitter.open_groups(), 0);
    }

    #[test]
    fn test_table_rows() {
        let mut emitter = quiet();
        let rows = Value::seq([
            Value::seq([Value::from("Name"), Value::from("Value")]),
            Value::seq([
                Value::from("deep"),
                Value::seq([1]),
                Value::seq([Value::seq([1])]),
            ]),
            Value::from("not a row"),
        ]);
        emitter
            .emit_message(Kind::Table, &rows, Some("t"), &OptionOverrides::new())
            .unwrap();
        assert_eq!(
            emitter.transport().header("X-Wf-1-1-1-1"),
            Some(r#"77|[{"Type":"TABLE","Label":"t"},[["Name","Value"],["deep",[1],"Max Depth(1)"]]]|"#)
        );
    }

    #[test]
    fn test_builder_sets_options() {
        let emitter = EmitterBuilder::default()
            .max_depth(3)
            .line_number_offset(2)
            .build(MemoryTransport::new());
        assert_eq!(emitter.config().encoding.max_depth, 3);
        assert_eq!(emitter.config().line_number_offset, 2);
        assert_eq!(emitter.message_index(), 0);
        assert!(!emitter.config().detect_client);
    }

    #[test]
    fn test_dump_requires_valid_key() {
        let mut emitter = quiet();
        for label in [None, Some(""), Some("no spaces"), Some("a/b")] {
            let err = emitter
                .emit_message(Kind::Dump, &Value::Int(1), label, &OptionOverrides::new())
                .unwrap_err();
            assert!(matches!(err, WildfireError::InvalidCallArguments(_)), "{:?}", label);
        }
        let err = emitter
            .emit_message(Kind::Dump, &Value::Int(1), None, &OptionOverrides::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid call arguments: You must specify a key for dump()"
        );
        assert!(emitter.transport().headers().is_empty());
        assert_eq!(emitter.message_index(), 0);
    }

    #[test]
    fn test_detect_client_drops_messages_without_extension() {
        let mut emitter = EmitterBuilder::new()
            .include_line_numbers(false)
            .detect_client(true)
            .build(MemoryTransport::new());
        assert_eq!(log(&mut emitter, Value::Null).unwrap(), Emission::NoClient);
        assert!(emitter.transport().headers().is_empty());
        assert_eq!(emitter.message_index(), 0);

        emitter
            .transport_mut()
            .set_request_header("User-Agent", "Mozilla/5.0 Firefox/3.6 FirePHP/0.7.4");
        assert!(log(&mut emitter, Value::Null).unwrap().is_sent());
        assert_eq!(emitter.transport().header(INDEX_HEADER), Some("1"));
    }

    #[test]
    fn test_detect_client_from_version_header() {
        let transport = MemoryTransport::new().with_request_header("X-FirePHP-Version", "0.0.6");
        let mut emitter = EmitterBuilder::new()
            .include_line_numbers(false)
            .detect_client(true)
            .build(transport);
        assert!(log(&mut emitter, Value::Null).unwrap().is_sent());
    }

    #[test]
    fn test_envelope_depth_options() {
        let nested = Value::seq([Value::seq([Value::seq([1])])]);

        let mut emitter = quiet();
        let envelope = Envelope::new(Kind::Log).with_extra("maxDepth", 1);
        emitter
            .emit(envelope, &nested, &OptionOverrides::new())
            .unwrap();
        assert_eq!(
            emitter.transport().header("X-Wf-1-1-1-1"),
            Some(r#"33|[{"Type":"LOG"},["Max Depth(2)"]]|"#)
        );

        // explicit overrides win over envelope options
        let mut emitter = quiet();
        let envelope = Envelope::new(Kind::Log).with_extra("maxDepth", 1);
        emitter
            .emit(envelope, &nested, &OptionOverrides::new().max_depth(10))
            .unwrap();
        assert_eq!(
            emitter.transport().header("X-Wf-1-1-1-1"),
            Some(r#"24|[{"Type":"LOG"},[[[1]]]]|"#)
        );
    }

    #[test]
    fn test_shared_table_rows() {
        let mut emitter = quiet();
        let rows = Value::from(SharedRef::new(Value::map([
            ("first", Value::seq(["x", "y"])),
            ("second", Value::from(SharedRef::new(Value::seq([1, 2])))),
        ])));
        emitter
            .emit_message(Kind::Table, &rows, Some("t"), &OptionOverrides::new())
            .unwrap();
        assert_eq!(
            emitter.transport().header("X-Wf-1-1-1-1"),
            Some(r#"48|[{"Type":"TABLE","Label":"t"},[["x","y"],[1,2]]]|"#)
        );

        let scalar = Value::from(SharedRef::new(Value::Int(3)));
        let err = emitter
            .emit_message(Kind::Table, &scalar, Some("t"), &OptionOverrides::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid call arguments: Table rows must be a sequence, got int"
        );
    }

    #[test]
    fn test_native_backend() {
        let mut emitter = EmitterBuilder::new()
            .include_line_numbers(false)
            .backend(JsonBackend::SerdeJson)
            .build(MemoryTransport::new());
        log(&mut emitter, Value::from("\u{e9}")).unwrap();
        assert_eq!(
            emitter.transport().header("X-Wf-1-1-1-1"),
            Some("21|[{\"Type\":\"LOG\"},\"\u{e9}\"]|")
        );
    }
}
