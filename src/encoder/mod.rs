//! Encoder module - depth-limited, cycle-aware sanitizing of values.
//!
//! The encoder turns an arbitrary [`Value`](crate::value::Value) graph into a
//! finite tree that contains only scalars, strings, sequences and mappings:
//!
//! - [`Encoder`] - the walker, one per top-level encode
//! - [`EncodingOptions`] / [`OptionOverrides`] - ceilings and visibility flags
//! - [`FilterTable`] / [`ObjectFilter`] - per-type member exclusion
//! - [`CycleGuard`] - identity stack of containers being expanded
//! - [`Sentinel`] - string markers substituted where expansion stops
//!
//! # Example
//!
//! ```
//! use wildfire_client::encoder::{encode, EncodingOptions, FilterTable, OptionOverrides};
//! use wildfire_client::value::Value;
//!
//! let deep = Value::seq([Value::seq([Value::seq([1])])]);
//! let opts = EncodingOptions::default().merged(&OptionOverrides::new().max_array_depth(2));
//!
//! let encoded = encode(&deep, opts, &FilterTable::new()).unwrap();
//! assert_eq!(encoded, Value::seq([Value::seq([Value::from("Max Array Depth(2)")])]));
//! ```

mod depth;
mod filter;
mod guard;
mod options;
mod sentinel;

pub use depth::{encode, Depth, Encoder};
pub use filter::{FilterTable, ObjectFilter};
pub use guard::CycleGuard;
pub use options::{
    EncodingOptions, OptionOverrides, DEFAULT_MAX_ARRAY_DEPTH, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_OBJECT_DEPTH,
};
pub use sentinel::{is_max_depth, Sentinel};
