//! # wildfire-client
//!
//! Server-side emitter for the Wildfire JsonStream protocol, the header
//! channel FirePHP-style browser consoles read log messages from.
//!
//! Values are walked by a depth- and cycle-aware encoder, serialized as
//! ASCII JSON, split into segments of at most 5000 bytes and written as
//! numbered `X-Wf-*` response headers.
//!
//! ## Architecture
//!
//! - **Value model** ([`value`]): tagged union with identity-bearing
//!   containers and object instances
//! - **Encoder** ([`encoder`]): depth ceilings, visibility, filters and
//!   cycle markers
//! - **Codec** ([`codec`]): built-in ASCII JSON writer or `serde_json`
//! - **Protocol** ([`protocol`]): envelopes, segmentation, header names
//! - **Emitter** ([`Emitter`]): index bookkeeping and header output over a
//!   [`Transport`](transport::Transport)
//!
//! ## Example
//!
//! ```
//! use wildfire_client::transport::MemoryTransport;
//! use wildfire_client::value::Value;
//! use wildfire_client::EmitterBuilder;
//!
//! let mut console = EmitterBuilder::new()
//!     .include_line_numbers(false)
//!     .build(MemoryTransport::new());
//!
//! console
//!     .log(Value::map([("a", Value::Int(1)), ("b", Value::seq([1, 2, 3]))]), None)
//!     .unwrap();
//!
//! let transport = console.into_transport();
//! assert_eq!(
//!     transport.header("X-Wf-1-1-1-1"),
//!     Some(r#"36|[{"Type":"LOG"},{"a":1,"b":[1,2,3]}]|"#)
//! );
//! assert_eq!(transport.header("X-Wf-1-Index"), Some("1"));
//! ```

pub mod codec;
pub mod config;
pub mod console;
pub mod encoder;
pub mod error;
pub mod protocol;
pub mod trace;
pub mod transport;
pub mod value;

mod emitter;

pub use config::EmitterConfig;
pub use emitter::{Emission, Emitter, EmitterBuilder};
pub use error::{Result, WildfireError};
pub use protocol::{Envelope, Kind};
