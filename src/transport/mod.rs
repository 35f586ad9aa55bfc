//! Transport module - the outbound header channel.
//!
//! The emitter only needs to set named headers and to know whether the
//! response has already started sending its body. Anything that can answer
//! both implements [`Transport`]. Request headers are optional and only
//! read when client detection is on.
//!
//! - [`MemoryTransport`] - records headers in memory, for tests and demos

mod memory;

pub use memory::MemoryTransport;

/// Where the response body started, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

/// Whether headers can still be written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResponseState {
    /// Headers are still open.
    #[default]
    Pending,
    /// The body has started; headers are committed.
    Started {
        location: Option<SourceLocation>,
    },
}

impl ResponseState {
    #[inline]
    pub fn is_started(&self) -> bool {
        matches!(self, ResponseState::Started { .. })
    }
}

/// Outbound header channel of one response.
pub trait Transport {
    /// Set a header, replacing any previous value under the same name.
    fn set_header(&mut self, name: &str, value: &str);

    /// Current state of the response.
    fn response_state(&self) -> ResponseState;

    /// Write a visible notice into the response body.
    ///
    /// Used when headers are committed but the caller asked for best-effort
    /// delivery. The default only logs the notice.
    fn write_notice(&mut self, text: &str) {
        tracing::warn!(notice = text, "transport cannot display inline notice");
    }

    /// A header of the incoming request, matched case-insensitively.
    ///
    /// Transports without access to the request keep the default.
    fn request_header(&self, _name: &str) -> Option<String> {
        None
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn set_header(&mut self, name: &str, value: &str) {
        (**self).set_header(name, value)
    }

    fn response_state(&self) -> ResponseState {
        (**self).response_state()
    }

    fn write_notice(&mut self, text: &str) {
        (**self).write_notice(text)
    }

    fn request_header(&self, name: &str) -> Option<String> {
        (**self).request_header(name)
    }
}
