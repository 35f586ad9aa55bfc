//! Depth-limited, cycle-aware value encoder.

use std::fmt;

use super::filter::FilterTable;
use super::guard::CycleGuard;
use super::options::EncodingOptions;
use super::sentinel::{is_max_depth, Sentinel};
use crate::error::{Result, WildfireError};
use crate::value::{coerce_utf8, Mapping, ObjectRef, SharedRef, Value, Visibility};

/// Mapping key whose by-value self reference is cut.
const GLOBALS_KEY: &str = "GLOBALS";

/// Position of a value in the walk.
///
/// The three counters move independently: `total` grows on every descent,
/// `object` only through composite members and `array` only through
/// collection elements. Entering one kind resets the other counter to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Depth {
    pub object: u32,
    pub array: u32,
    pub total: u32,
}

impl Depth {
    /// Depth of a top-level value.
    pub const ROOT: Depth = Depth {
        object: 1,
        array: 1,
        total: 1,
    };

    /// Depth of a composite member.
    #[inline]
    pub fn member(self) -> Depth {
        Depth {
            object: self.object + 1,
            array: 1,
            total: self.total + 1,
        }
    }

    /// Depth of a collection element.
    #[inline]
    pub fn element(self) -> Depth {
        Depth {
            object: 1,
            array: self.array + 1,
            total: self.total + 1,
        }
    }
}

impl Default for Depth {
    fn default() -> Self {
        Depth::ROOT
    }
}

/// Where a child value sits in its parent, used to name shared-container
/// recursion.
#[derive(Debug, Clone, Copy)]
enum Slot<'a> {
    Root,
    Index(usize),
    Key(&'a str),
}

impl fmt::Display for Slot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Root => f.write_str("root"),
            Slot::Index(i) => write!(f, "{}", i),
            Slot::Key(k) => f.write_str(k),
        }
    }
}

/// Walks a [`Value`] and produces its sanitized, wire-ready form.
///
/// The output contains only scalars, strings, sequences and mappings.
/// Composites become mappings with a leading `__className` entry followed
/// by their members under display names such as `private:static:count`.
///
/// # Example
///
/// ```
/// use wildfire_client::encoder::{Encoder, EncodingOptions, FilterTable};
/// use wildfire_client::value::{FieldDescriptor, Object, TypeDescriptor, Value};
///
/// let node = TypeDescriptor::new("Node")
///     .field(FieldDescriptor::public("next"))
///     .shared();
/// let n = Object::new(&node);
/// n.set("next", n.clone());
///
/// let filters = FilterTable::new();
/// let mut encoder = Encoder::new(EncodingOptions::default(), &filters);
/// let encoded = encoder.encode(&Value::Composite(n)).unwrap();
///
/// let map = encoded.as_mapping().unwrap();
/// assert_eq!(map.get("public:next"), Some(&Value::from("Recursion(Node)")));
/// ```
pub struct Encoder<'a> {
    options: EncodingOptions,
    filters: &'a FilterTable,
    guard: CycleGuard,
}

impl<'a> Encoder<'a> {
    /// Create an encoder with effective options and a filter table.
    pub fn new(options: EncodingOptions, filters: &'a FilterTable) -> Self {
        Self {
            options,
            filters,
            guard: CycleGuard::new(),
        }
    }

    /// Options this encoder applies.
    pub fn options(&self) -> &EncodingOptions {
        &self.options
    }

    /// Encode a top-level value.
    pub fn encode(&mut self, value: &Value) -> Result<Value> {
        self.encode_at(value, Depth::ROOT)
    }

    /// Encode a value as if it were found at `depth`.
    pub fn encode_at(&mut self, value: &Value, depth: Depth) -> Result<Value> {
        self.encode_value(value, Slot::Root, depth)
    }

    fn encode_value(&mut self, value: &Value, slot: Slot<'_>, depth: Depth) -> Result<Value> {
        if depth.total > self.options.max_depth {
            return Ok(Sentinel::MaxDepth(depth.total).into());
        }

        match value {
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::String(_) => Ok(value.clone()),
            Value::Float(f) => {
                if f.is_finite() {
                    Ok(Value::Float(*f))
                } else {
                    Err(WildfireError::UnsupportedValueKind(format!(
                        "non-finite float {} at {}",
                        f, slot
                    )))
                }
            }
            Value::Bytes(bytes) => Ok(Value::String(coerce_utf8(bytes).into_owned())),
            Value::Sequence(items) => self.encode_sequence(items, depth),
            Value::Mapping(map) => self.encode_mapping(map, depth),
            Value::Shared(shared) => self.encode_shared(shared, slot, depth),
            Value::Composite(object) => self.encode_object(object, depth),
        }
    }

    fn encode_shared(&mut self, shared: &SharedRef, slot: Slot<'_>, depth: Depth) -> Result<Value> {
        let id = shared.id();
        if self.guard.contains(id) {
            tracing::trace!(%slot, "shared container revisited");
            return Ok(Sentinel::Recursion(slot.to_string()).into());
        }

        self.guard.push(id);
        let result = {
            let inner = shared.borrow();
            self.encode_value(&inner, slot, depth)
        };
        self.guard.pop(id);
        result
    }

    fn encode_sequence(&mut self, items: &[Value], depth: Depth) -> Result<Value> {
        if depth.array > self.options.max_array_depth {
            return Ok(Sentinel::MaxArrayDepth(self.options.max_array_depth).into());
        }

        let child = depth.element();
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let encoded = self.encode_value(item, Slot::Index(i), child)?;
            if !self.options.include_max_depth_properties && is_max_depth(&encoded) {
                continue;
            }
            out.push(encoded);
        }

        if self.all_dropped(items.len(), out.len()) {
            return Ok(Sentinel::MaxDepth(depth.total).into());
        }
        Ok(Value::Sequence(out))
    }

    fn encode_mapping(&mut self, map: &Mapping, depth: Depth) -> Result<Value> {
        if depth.array > self.options.max_array_depth {
            return Ok(Sentinel::MaxArrayDepth(self.options.max_array_depth).into());
        }

        let child = depth.element();
        let mut out = Mapping::with_capacity(map.len());
        for (key, value) in map.iter() {
            let key = key.text();
            let cut;
            let value = match cut_globals_backref(&key, value) {
                Some(replaced) => {
                    cut = replaced;
                    &cut
                }
                None => value,
            };

            let encoded = self.encode_value(value, Slot::Key(&key), child)?;
            if !self.options.include_max_depth_properties && is_max_depth(&encoded) {
                continue;
            }
            out.insert(key.into_owned(), encoded);
        }

        if self.all_dropped(map.len(), out.len()) {
            return Ok(Sentinel::MaxDepth(depth.total).into());
        }
        Ok(Value::Mapping(out))
    }

    fn all_dropped(&self, before: usize, after: usize) -> bool {
        !self.options.include_max_depth_properties && before > 0 && after == 0
    }

    fn encode_object(&mut self, object: &ObjectRef, depth: Depth) -> Result<Value> {
        if depth.object > self.options.max_object_depth {
            return Ok(Sentinel::MaxObjectDepth(self.options.max_object_depth).into());
        }

        let id = object.id();
        if self.guard.contains(id) {
            tracing::trace!(type_name = object.type_name(), "composite revisited");
            return Ok(Sentinel::Recursion(object.type_name().to_string()).into());
        }

        if self.filters.excludes_type(object.descriptor()) {
            return Ok(Sentinel::ExcludedType(object.type_name().to_string()).into());
        }

        self.guard.push(id);
        let result = self.encode_members(object, depth);
        self.guard.pop(id);
        result
    }

    fn encode_members(&mut self, object: &ObjectRef, depth: Depth) -> Result<Value> {
        let ty = object.descriptor();
        let child = depth.member();
        let mut out = Mapping::new();
        out.insert("__className", object.type_name());

        for field in ty.declared_fields() {
            let visibility = match field.visibility() {
                Visibility::Private if !self.options.include_private_properties => continue,
                Visibility::Protected if !self.options.include_protected_properties => continue,
                Visibility::Static => None,
                other => Some(other),
            };
            if field.is_static() && !self.options.include_static_properties {
                continue;
            }

            let name = display_name(visibility, field.is_static(), field.name());
            let encoded = if self.filters.excludes_member(ty, field.name()) {
                Sentinel::ExcludedMember.into()
            } else {
                let live = if field.is_static() {
                    None
                } else {
                    object.get(field.name())
                };
                match live {
                    Some(value) => self.encode_value(&value, Slot::Key(field.name()), child)?,
                    None if field.has_accessor() => match field.read(object) {
                        Some(value) => {
                            self.encode_value(&value, Slot::Key(field.name()), child)?
                        }
                        None => Sentinel::NeedElevatedAccess.into(),
                    },
                    None if field.visibility() == Visibility::Public => Value::Null,
                    None => Sentinel::NeedElevatedAccess.into(),
                }
            };

            if !self.options.include_max_depth_properties && is_max_depth(&encoded) {
                continue;
            }
            out.insert(name, encoded);
        }

        if self.options.include_undeclared_properties {
            // Cloned so accessors and nested walks may touch the instance.
            let slots: Vec<(String, Value)> = object.slots().clone();
            for (name, value) in &slots {
                if ty.declares(name) {
                    continue;
                }
                let encoded = if self.filters.excludes_member(ty, name) {
                    Sentinel::ExcludedMember.into()
                } else {
                    self.encode_value(value, Slot::Key(name), child)?
                };

                if !self.options.include_max_depth_properties && is_max_depth(&encoded) {
                    continue;
                }
                out.insert(
                    display_name(Some(Visibility::Undeclared), false, name),
                    encoded,
                );
            }
        }

        Ok(Value::Mapping(out))
    }
}

fn display_name(visibility: Option<Visibility>, is_static: bool, name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 16);
    if let Some(visibility) = visibility {
        out.push_str(visibility.tag());
        out.push(':');
    }
    if is_static {
        out.push_str("static:");
    }
    out.push_str(name);
    out
}

/// A `GLOBALS` entry holding a mapping that itself holds `GLOBALS` gets the
/// nested entry replaced by a recursion sentinel.
fn cut_globals_backref(key: &str, value: &Value) -> Option<Value> {
    if key != GLOBALS_KEY {
        return None;
    }
    match value {
        Value::Mapping(inner) if inner.contains_key(GLOBALS_KEY) => {
            let mut inner = inner.clone();
            inner.insert(
                GLOBALS_KEY,
                Sentinel::Recursion(GLOBALS_KEY.to_string()),
            );
            Some(Value::Mapping(inner))
        }
        _ => None,
    }
}

/// Encode `value` with the given options and filters.
pub fn encode(value: &Value, options: EncodingOptions, filters: &FilterTable) -> Result<Value> {
    Encoder::new(options, filters).encode(value)
}
