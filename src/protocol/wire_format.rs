//! Wire format constants and header names.
//!
//! A message travels as one or more numbered response headers:
//! ```text
//! X-Wf-Protocol-1: http://meta.wildfirehq.org/Protocol/JsonStream/0.2
//! X-Wf-1-Plugin-1: http://meta.firephp.org/Wildfire/Plugin/FirePHP/Library-FirePHPCore/0.5.4
//! X-Wf-1-Structure-1: http://meta.firephp.org/Wildfire/Structure/FirePHP/FirebugConsole/0.1
//! X-Wf-1-1-1-1: 27|[{"Type":"LOG"},"hello"]|
//! X-Wf-1-1-1-2: 12000|[{"Type":"LOG"},"...|\
//! X-Wf-1-1-1-3: |...|\
//! X-Wf-1-1-1-4: |..."]|
//! X-Wf-1-Index: 4
//! ```
//!
//! Segment header names are `X-Wf-1-<structure>-1-<index>`. The index runs
//! over all segments of the stream, not per message.

/// Protocol declaration header.
pub const PROTOCOL_HEADER: &str = "X-Wf-Protocol-1";

/// JsonStream protocol URI.
pub const PROTOCOL_URI: &str = "http://meta.wildfirehq.org/Protocol/JsonStream/0.2";

/// Plugin declaration header.
pub const PLUGIN_HEADER: &str = "X-Wf-1-Plugin-1";

/// Plugin URI announced to the console.
pub const PLUGIN_URI: &str =
    "http://meta.firephp.org/Wildfire/Plugin/FirePHP/Library-FirePHPCore/0.5.4";

/// Header carrying the last used segment index.
pub const INDEX_HEADER: &str = "X-Wf-1-Index";

/// Maximum bytes of message text per segment.
pub const SEGMENT_BUDGET: usize = 5000;

/// Highest segment index the protocol allows.
pub const MAX_MESSAGE_INDEX: u32 = 99_999;

/// Trailing marker on every segment of a multi-segment message except the
/// last.
pub const CONTINUATION: char = '\\';

/// Segment field separator.
pub const SEPARATOR: char = '|';

/// Message structure, selects how the console renders a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Structure {
    /// Console log lines, groups, tables, traces, exceptions.
    Console,
    /// Keyed variable dumps.
    Dump,
}

impl Structure {
    /// Numeric id used in header names.
    #[inline]
    pub fn id(self) -> u8 {
        match self {
            Structure::Console => 1,
            Structure::Dump => 2,
        }
    }

    pub fn uri(self) -> &'static str {
        match self {
            Structure::Console => {
                "http://meta.firephp.org/Wildfire/Structure/FirePHP/FirebugConsole/0.1"
            }
            Structure::Dump => "http://meta.firephp.org/Wildfire/Structure/FirePHP/Dump/0.1",
        }
    }

    /// Name of the structure declaration header.
    pub fn header_name(self) -> String {
        format!("X-Wf-1-Structure-{}", self.id())
    }
}

/// Name of the header carrying segment `index`.
///
/// # Example
///
/// ```
/// use wildfire_client::protocol::{segment_header_name, Structure};
///
/// assert_eq!(segment_header_name(Structure::Console, 1), "X-Wf-1-1-1-1");
/// assert_eq!(segment_header_name(Structure::Dump, 12), "X-Wf-1-2-1-12");
/// ```
pub fn segment_header_name(structure: Structure, index: u32) -> String {
    format!("X-Wf-1-{}-1-{}", structure.id(), index)
}
