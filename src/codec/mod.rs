//! Codec module - JSON text for encoded values.
//!
//! Two backends turn an encoded [`Value`] into JSON text:
//!
//! - [`TextEncoder`] - built-in serializer, ASCII-only output with `\uXXXX`
//!   escapes, its own re-entrancy stack
//! - [`NativeCodec`] - `serde_json` backend, raw UTF-8 output
//!
//! [`JsonBackend`] selects between them at runtime.
//!
//! # Example
//!
//! ```
//! use wildfire_client::codec::{JsonBackend, NativeCodec};
//! use wildfire_client::value::Value;
//!
//! let value = Value::map([("msg", "naïve")]);
//!
//! assert_eq!(JsonBackend::Builtin.serialize(&value).unwrap(), r#"{"msg":"na\u00efve"}"#);
//! assert_eq!(NativeCodec::encode(&value).unwrap(), r#"{"msg":"naïve"}"#);
//! ```

mod native;
mod text;

pub use native::NativeCodec;
pub use text::{serialize, write_string, TextEncoder, RECURSION_MARKER};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::value::Value;

/// Which serializer produces the wire text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JsonBackend {
    /// [`TextEncoder`]; output is header-safe ASCII.
    #[default]
    Builtin,
    /// [`NativeCodec`].
    SerdeJson,
}

impl JsonBackend {
    /// Backend for the `useNativeJsonEncode` option.
    pub fn from_native_flag(native: bool) -> Self {
        if native {
            JsonBackend::SerdeJson
        } else {
            JsonBackend::Builtin
        }
    }

    pub fn is_native(self) -> bool {
        self == JsonBackend::SerdeJson
    }

    /// Serialize `value` with this backend.
    pub fn serialize(self, value: &Value) -> Result<String> {
        match self {
            JsonBackend::Builtin => serialize(value),
            JsonBackend::SerdeJson => NativeCodec::encode(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backends_agree_on_ascii() {
        let value = Value::map([
            ("a", Value::Int(1)),
            ("b", Value::seq([Value::Bool(true), Value::Null])),
            ("c", Value::Float(0.25)),
        ]);
        assert_eq!(
            JsonBackend::Builtin.serialize(&value).unwrap(),
            JsonBackend::SerdeJson.serialize(&value).unwrap()
        );
    }

    #[test]
    fn test_native_flag() {
        assert_eq!(JsonBackend::from_native_flag(true), JsonBackend::SerdeJson);
        assert_eq!(JsonBackend::from_native_flag(false), JsonBackend::Builtin);
        assert!(!JsonBackend::default().is_native());
    }
}
