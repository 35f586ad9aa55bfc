//! JSON backend using `serde_json`.
//!
//! Values are converted to [`serde_json::Value`] first. Mapping order is
//! kept because the crate enables serde_json's `preserve_order` feature.
//!
//! Unlike [`TextEncoder`](super::TextEncoder), the output carries non-ASCII
//! characters as raw UTF-8 and does not escape `/`.

use serde_json::{Map, Number};

use super::text::RECURSION_MARKER;
use crate::error::{Result, WildfireError};
use crate::value::{coerce_utf8, Value};

/// `serde_json` codec for encoded values.
pub struct NativeCodec;

impl NativeCodec {
    /// Serialize a value to JSON text.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedValueKind` for non-finite floats.
    #[inline]
    pub fn encode(value: &Value) -> Result<String> {
        let json = Self::to_json(value)?;
        Ok(serde_json::to_string(&json)?)
    }

    /// Convert a value to a `serde_json` tree.
    pub fn to_json(value: &Value) -> Result<serde_json::Value> {
        let mut stack = Vec::new();
        convert(value, &mut stack)
    }
}

fn convert(value: &Value, stack: &mut Vec<usize>) -> Result<serde_json::Value> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::Number((*n).into()),
        Value::Float(f) => match Number::from_f64(*f) {
            Some(n) => serde_json::Value::Number(n),
            None => {
                return Err(WildfireError::UnsupportedValueKind(format!(
                    "non-finite float {}",
                    f
                )))
            }
        },
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Bytes(b) => serde_json::Value::String(coerce_utf8(b).into_owned()),
        Value::Sequence(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|item| convert(item, stack))
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Mapping(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map.iter() {
                out.insert(key.text().into_owned(), convert(value, stack)?);
            }
            serde_json::Value::Object(out)
        }
        Value::Shared(shared) => {
            let id = shared.id();
            if stack.contains(&id) {
                return Ok(RECURSION_MARKER.into());
            }
            stack.push(id);
            let result = convert(&shared.borrow(), stack);
            stack.pop();
            result?
        }
        Value::Composite(object) => {
            let id = object.id();
            if stack.contains(&id) {
                return Ok(RECURSION_MARKER.into());
            }
            stack.push(id);
            let mut out = Map::new();
            out.insert("__className".to_string(), object.type_name().into());
            let slots = object.slots().clone();
            let result = slots.iter().try_for_each(|(name, value)| {
                out.insert(name.clone(), convert(value, stack)?);
                Ok::<_, WildfireError>(())
            });
            stack.pop();
            result?;
            serde_json::Value::Object(out)
        }
    })
}
