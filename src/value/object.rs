//! Composite objects and their explicit type descriptors.
//!
//! A [`TypeDescriptor`] lists the declared fields of a type in declaration
//! order, with their visibility and an optional [`Accessor`]. Inheritance is
//! a parent link; lookups walk from the type itself up through its ancestors.
//!
//! An [`Object`] carries the slots physically present on one instance.
//! Slots whose name is not declared anywhere in the type chain are
//! "undeclared" members.
//!
//! # Example
//!
//! ```
//! use wildfire_client::value::{FieldDescriptor, Object, TypeDescriptor, Value};
//!
//! let point = TypeDescriptor::new("Point")
//!     .field(FieldDescriptor::public("x"))
//!     .field(FieldDescriptor::private("y"))
//!     .shared();
//!
//! let p = Object::new(&point);
//! p.set("x", 1);
//! p.set("y", 2);
//! p.set("label", "origin"); // undeclared
//!
//! assert_eq!(p.type_name(), "Point");
//! assert_eq!(p.get("x"), Some(Value::Int(1)));
//! assert!(!point.declares("label"));
//! ```

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use super::Value;

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    Private,
    /// Class-level member with no other visibility information.
    Static,
    /// Present on the instance but not declared by the type.
    Undeclared,
}

impl Visibility {
    /// Prefix used in member display names.
    pub fn tag(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
            Visibility::Static => "static",
            Visibility::Undeclared => "undeclared",
        }
    }
}

/// Reads a member value off an instance. `None` means the value cannot be
/// reached.
pub type Accessor = Rc<dyn Fn(&Object) -> Option<Value>>;

/// One declared field.
#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    visibility: Visibility,
    is_static: bool,
    accessor: Option<Accessor>,
}

impl FieldDescriptor {
    /// Declare a field. `Visibility::Static` marks the field static.
    pub fn new(name: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            name: name.into(),
            visibility,
            is_static: visibility == Visibility::Static,
            accessor: None,
        }
    }

    pub fn public(name: impl Into<String>) -> Self {
        Self::new(name, Visibility::Public)
    }

    pub fn protected(name: impl Into<String>) -> Self {
        Self::new(name, Visibility::Protected)
    }

    pub fn private(name: impl Into<String>) -> Self {
        Self::new(name, Visibility::Private)
    }

    /// Mark the field as class-level. Static fields are always read
    /// through the accessor.
    pub fn make_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Attach an accessor used when the instance has no live slot.
    pub fn with_accessor<F>(mut self, accessor: F) -> Self
    where
        F: Fn(&Object) -> Option<Value> + 'static,
    {
        self.accessor = Some(Rc::new(accessor));
        self
    }

    /// Attach a constant value, typically for static fields.
    pub fn with_value(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.with_accessor(move |_| Some(value.clone()))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Read the field through its accessor.
    pub fn read(&self, object: &Object) -> Option<Value> {
        self.accessor.as_ref().and_then(|accessor| accessor(object))
    }

    #[inline]
    pub fn has_accessor(&self) -> bool {
        self.accessor.is_some()
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("is_static", &self.is_static)
            .field("accessor", &self.accessor.is_some())
            .finish()
    }
}

/// Declared shape of a type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    name: String,
    parent: Option<Rc<TypeDescriptor>>,
    fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            fields: Vec::new(),
        }
    }

    /// Set the parent type.
    pub fn extends(mut self, parent: &Rc<TypeDescriptor>) -> Self {
        self.parent = Some(Rc::clone(parent));
        self
    }

    /// Append a declared field.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Finish building and wrap in an `Rc` for sharing between instances.
    pub fn shared(self) -> Rc<TypeDescriptor> {
        Rc::new(self)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<TypeDescriptor>> {
        self.parent.as_ref()
    }

    /// Fields declared directly on this type.
    pub fn own_fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// The type itself followed by its ancestors, closest first.
    pub fn ancestry(&self) -> impl Iterator<Item = &TypeDescriptor> {
        std::iter::successors(Some(self), |ty| ty.parent.as_deref())
    }

    /// All declared fields, own type first. A name declared on several
    /// types in the chain is taken from the closest one.
    pub fn declared_fields(&self) -> Vec<&FieldDescriptor> {
        let mut out: Vec<&FieldDescriptor> = Vec::new();
        for ty in self.ancestry() {
            for field in &ty.fields {
                if !out.iter().any(|f| f.name == field.name) {
                    out.push(field);
                }
            }
        }
        out
    }

    /// Whether any type in the chain declares `name`.
    pub fn declares(&self, name: &str) -> bool {
        self.ancestry()
            .any(|ty| ty.fields.iter().any(|f| f.name == name))
    }
}

/// An object instance.
pub struct Object {
    ty: Rc<TypeDescriptor>,
    slots: RefCell<Vec<(String, Value)>>,
}

impl Object {
    /// Create an empty instance of `ty`.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(ty: &Rc<TypeDescriptor>) -> ObjectRef {
        ObjectRef(Rc::new(Object {
            ty: Rc::clone(ty),
            slots: RefCell::new(Vec::new()),
        }))
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.ty
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    /// Live value of a slot.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.slots
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    /// Whether the instance holds a live slot named `name`.
    pub fn has_slot(&self, name: &str) -> bool {
        self.slots.borrow().iter().any(|(n, _)| n == name)
    }

    /// Set a slot, keeping its position when it already exists.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        let mut slots = self.slots.borrow_mut();
        match slots.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => slots.push((name, value)),
        }
    }

    /// Remove a slot, making a declared field "unset" on this instance.
    pub fn unset(&self, name: &str) -> Option<Value> {
        let mut slots = self.slots.borrow_mut();
        let pos = slots.iter().position(|(n, _)| n == name)?;
        Some(slots.remove(pos).1)
    }

    /// Borrow all live slots in insertion order.
    pub fn slots(&self) -> Ref<'_, Vec<(String, Value)>> {
        self.slots.borrow()
    }
}

/// Shared handle to an [`Object`]. Equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Rc<Object>);

impl ObjectRef {
    /// Allocation identity.
    #[inline]
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl std::ops::Deref for ObjectRef {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.0
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({} @ {:#x})", self.type_name(), self.id())
    }
}
