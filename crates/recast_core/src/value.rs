//! Runtime values flowing through statements, delegates and codecs.
//!
//! Scalars, text and type references are plain values. Objects, arrays and
//! proxies live in shared heap cells carrying an [`ObjectId`]; cloning a
//! [`Value`] clones the handle, never the cell.

use crate::builtins;
use crate::error::CallError;
use crate::id::ObjectId;
use crate::types::{self, ClassInfo};
use std::any::Any;
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::sync::Arc;

/// A runtime value
#[derive(Clone)]
pub enum Value {
    /// The absent value
    Null,
    /// `boolean`
    Bool(bool),
    /// `byte`
    Byte(i8),
    /// `char`
    Char(char),
    /// `short`
    Short(i16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// Immutable text
    Str(Rc<str>),
    /// Reference to a registered type
    Type(Arc<ClassInfo>),
    /// Instance of a registered class
    Object(ObjectRef),
    /// Fixed-length array
    Array(ArrayRef),
    /// Proxy forwarding every call to a handler
    Proxy(ProxyRef),
}

/// Key under which identity-keyed maps file a value.
///
/// Heap values key by [`ObjectId`]; scalars by value (floats by bit pattern);
/// text by content; types by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    /// The null value
    Null,
    /// `boolean` by value
    Bool(bool),
    /// `byte` by value
    Byte(i8),
    /// `char` by value
    Char(char),
    /// `short` by value
    Short(i16),
    /// `int` by value
    Int(i32),
    /// `long` by value
    Long(i64),
    /// `float` by bit pattern
    Float(u32),
    /// `double` by bit pattern
    Double(u64),
    /// Text by content
    Text(Rc<str>),
    /// Type by name
    Type(String),
    /// Object, array or proxy by identity
    Heap(ObjectId),
}

struct ObjectCell {
    id: ObjectId,
    class: Arc<ClassInfo>,
    data: RefCell<Box<dyn Any>>,
}

/// Shared handle to an object cell
#[derive(Clone)]
pub struct ObjectRef(Rc<ObjectCell>);

impl ObjectRef {
    /// Identity of the cell
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// Runtime class
    #[must_use]
    pub fn class(&self) -> &Arc<ClassInfo> {
        &self.0.class
    }

    /// Borrow the backing data as `T`
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not a `T` or is mutably borrowed
    pub fn with<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, CallError> {
        let data = self
            .0
            .data
            .try_borrow()
            .map_err(|_| CallError::new(format!("{} is being mutated", self.0.class.name())))?;
        let typed = data.downcast_ref::<T>().ok_or_else(|| self.data_mismatch())?;
        Ok(f(typed))
    }

    /// Mutably borrow the backing data as `T`
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not a `T` or is already borrowed
    pub fn with_mut<T: 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, CallError> {
        let mut data = self
            .0
            .data
            .try_borrow_mut()
            .map_err(|_| CallError::new(format!("{} is already borrowed", self.0.class.name())))?;
        let typed = data.downcast_mut::<T>().ok_or_else(|| self.data_mismatch())?;
        Ok(f(typed))
    }

    fn data_mismatch(&self) -> CallError {
        CallError::new(format!(
            "{} does not hold the expected data",
            self.0.class.name()
        ))
    }
}

struct ArrayCell {
    id: ObjectId,
    class: Arc<ClassInfo>,
    items: RefCell<Vec<Value>>,
}

/// Shared handle to an array cell
#[derive(Clone)]
pub struct ArrayRef(Rc<ArrayCell>);

impl ArrayRef {
    /// Identity of the cell
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// Array class (`T[]`)
    #[must_use]
    pub fn class(&self) -> &Arc<ClassInfo> {
        &self.0.class
    }

    /// Component type
    #[must_use]
    pub fn component(&self) -> Arc<ClassInfo> {
        self.0
            .class
            .component()
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.0.class))
    }

    /// Number of slots
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    /// Whether the array has no slots
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a slot
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.items.borrow().get(index).cloned()
    }

    /// Write a slot, converting to the component type
    ///
    /// # Errors
    ///
    /// Returns an error on out-of-range index or incompatible element
    pub fn set(&self, index: usize, value: Value) -> Result<(), CallError> {
        let component = self.component();
        let stored = value.coerce_element(&component)?;
        let mut items = self.0.items.borrow_mut();
        let len = items.len();
        let slot = items
            .get_mut(index)
            .ok_or_else(|| CallError::new(format!("index {} out of bounds for length {}", index, len)))?;
        *slot = stored;
        Ok(())
    }

    /// Borrow all slots
    #[must_use]
    pub fn items(&self) -> Ref<'_, Vec<Value>> {
        self.0.items.borrow()
    }

    /// Copy all slots
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }
}

struct ProxyCell {
    id: ObjectId,
    class: Arc<ClassInfo>,
    handler: Value,
}

/// Shared handle to a proxy cell
#[derive(Clone)]
pub struct ProxyRef(Rc<ProxyCell>);

impl ProxyRef {
    /// Identity of the cell
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// Synthesized proxy class
    #[must_use]
    pub fn class(&self) -> &Arc<ClassInfo> {
        &self.0.class
    }

    /// The invocation handler every call is forwarded to
    #[must_use]
    pub fn handler(&self) -> &Value {
        &self.0.handler
    }

    /// Interfaces the proxy implements, in declaration order
    #[must_use]
    pub fn interfaces(&self) -> Vec<Arc<ClassInfo>> {
        self.0.class.interfaces()
    }
}

impl Value {
    /// Wrap Rust data as an instance of `class`
    #[must_use]
    pub fn object<T: 'static>(class: Arc<ClassInfo>, data: T) -> Self {
        Self::Object(ObjectRef(Rc::new(ObjectCell {
            id: ObjectId::next(),
            class,
            data: RefCell::new(Box::new(data)),
        })))
    }

    /// Build an array from items; items are not converted
    #[must_use]
    pub fn array(component: &Arc<ClassInfo>, items: Vec<Value>) -> Self {
        Self::Array(ArrayRef(Rc::new(ArrayCell {
            id: ObjectId::next(),
            class: types::array_class(component),
            items: RefCell::new(items),
        })))
    }

    /// Build an array of `len` default slots
    #[must_use]
    pub fn array_of_len(component: &Arc<ClassInfo>, len: usize) -> Self {
        let fill = Self::default_for(component);
        Self::array(component, vec![fill; len])
    }

    /// Build a proxy implementing `interfaces` that forwards to `handler`
    #[must_use]
    pub fn proxy(interfaces: &[Arc<ClassInfo>], handler: Value) -> Self {
        Self::Proxy(ProxyRef(Rc::new(ProxyCell {
            id: ObjectId::next(),
            class: types::proxy_class(interfaces),
            handler,
        })))
    }

    /// Text value
    #[must_use]
    pub fn text(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }

    /// Default slot value for a component type: zero for primitives, null otherwise
    #[must_use]
    pub fn default_for(class: &ClassInfo) -> Self {
        match class.name() {
            builtins::BOOLEAN_PRIM => Self::Bool(false),
            builtins::BYTE_PRIM => Self::Byte(0),
            builtins::CHAR_PRIM => Self::Char('\0'),
            builtins::SHORT_PRIM => Self::Short(0),
            builtins::INT_PRIM => Self::Int(0),
            builtins::LONG_PRIM => Self::Long(0),
            builtins::FLOAT_PRIM => Self::Float(0.0),
            builtins::DOUBLE_PRIM => Self::Double(0.0),
            _ => Self::Null,
        }
    }

    /// Whether this is the absent value
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value lives in a heap cell
    #[must_use]
    pub fn is_heap(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Array(_) | Self::Proxy(_))
    }

    /// Whether this is a scalar
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Bool(_)
                | Self::Byte(_)
                | Self::Char(_)
                | Self::Short(_)
                | Self::Int(_)
                | Self::Long(_)
                | Self::Float(_)
                | Self::Double(_)
        )
    }

    /// Null, scalar, text or type reference
    #[must_use]
    pub fn is_basic(&self) -> bool {
        !self.is_heap()
    }

    /// Heap identity, if any
    #[must_use]
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Self::Object(o) => Some(o.id()),
            Self::Array(a) => Some(a.id()),
            Self::Proxy(p) => Some(p.id()),
            _ => None,
        }
    }

    /// Runtime class; `None` for null
    #[must_use]
    pub fn class(&self) -> Option<Arc<ClassInfo>> {
        let name = match self {
            Self::Null => return None,
            Self::Object(o) => return Some(Arc::clone(o.class())),
            Self::Array(a) => return Some(Arc::clone(a.class())),
            Self::Proxy(p) => return Some(Arc::clone(p.class())),
            Self::Bool(_) => builtins::BOOLEAN,
            Self::Byte(_) => builtins::BYTE,
            Self::Char(_) => builtins::CHARACTER,
            Self::Short(_) => builtins::SHORT,
            Self::Int(_) => builtins::INTEGER,
            Self::Long(_) => builtins::LONG,
            Self::Float(_) => builtins::FLOAT,
            Self::Double(_) => builtins::DOUBLE,
            Self::Str(_) => builtins::STRING,
            Self::Type(_) => builtins::CLASS,
        };
        types::class_for_name(name)
    }

    /// Runtime type name for diagnostics; `null` for null
    #[must_use]
    pub fn type_name(&self) -> String {
        self.class()
            .map_or_else(|| "null".to_string(), |c| c.name().to_string())
    }

    /// Identity-map key
    #[must_use]
    pub fn identity_key(&self) -> IdentityKey {
        match self {
            Self::Null => IdentityKey::Null,
            Self::Bool(b) => IdentityKey::Bool(*b),
            Self::Byte(b) => IdentityKey::Byte(*b),
            Self::Char(c) => IdentityKey::Char(*c),
            Self::Short(s) => IdentityKey::Short(*s),
            Self::Int(i) => IdentityKey::Int(*i),
            Self::Long(l) => IdentityKey::Long(*l),
            Self::Float(f) => IdentityKey::Float(f.to_bits()),
            Self::Double(d) => IdentityKey::Double(d.to_bits()),
            Self::Str(s) => IdentityKey::Text(Rc::clone(s)),
            Self::Type(t) => IdentityKey::Type(t.name().to_string()),
            Self::Object(o) => IdentityKey::Heap(o.id()),
            Self::Array(a) => IdentityKey::Heap(a.id()),
            Self::Proxy(p) => IdentityKey::Heap(p.id()),
        }
    }

    /// Identity comparison
    #[must_use]
    pub fn same(&self, other: &Value) -> bool {
        self.identity_key() == other.identity_key()
    }

    /// Value equality: the class equality hook for objects, identity for
    /// arrays and proxies, value comparison for everything else
    #[must_use]
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Object(a), Self::Object(b)) => {
                if a.id() == b.id() {
                    return true;
                }
                if a.class().name() != b.class().name() {
                    return false;
                }
                a.class()
                    .equality()
                    .is_some_and(|equals| equals(self, other))
            }
            _ => self.same(other),
        }
    }

    /// Textual form of a scalar or text value
    #[must_use]
    pub fn scalar_text(&self) -> Option<String> {
        Some(match self {
            Self::Bool(b) => b.to_string(),
            Self::Byte(b) => b.to_string(),
            Self::Char(c) => c.to_string(),
            Self::Short(s) => s.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Long(l) => l.to_string(),
            Self::Float(f) => format!("{:?}", f),
            Self::Double(d) => format!("{:?}", d),
            Self::Str(s) => s.to_string(),
            _ => return None,
        })
    }

    /// Parse `text` as a value of the named scalar or text type.
    ///
    /// Accepts both primitive (`int`) and boxed (`Integer`) names. The text
    /// is taken as is; surrounding whitespace makes a number unparseable.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is not scalar or the text does not parse
    pub fn parse_as(type_name: &str, text: &str) -> Result<Value, CallError> {
        let bad = || CallError::new(format!("cannot parse {:?} as {}", text, type_name));
        let name = types::boxed_name(type_name).unwrap_or(type_name);
        Ok(match name {
            builtins::BOOLEAN => Self::Bool(text.parse().map_err(|_| bad())?),
            builtins::BYTE => Self::Byte(text.parse().map_err(|_| bad())?),
            builtins::SHORT => Self::Short(text.parse().map_err(|_| bad())?),
            builtins::INTEGER => Self::Int(text.parse().map_err(|_| bad())?),
            builtins::LONG => Self::Long(text.parse().map_err(|_| bad())?),
            builtins::FLOAT => Self::Float(text.parse().map_err(|_| bad())?),
            builtins::DOUBLE => Self::Double(text.parse().map_err(|_| bad())?),
            builtins::CHARACTER => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Char(c),
                    _ => return Err(CallError::new(format!("{:?} is not a single char", text))),
                }
            }
            builtins::STRING => Self::text(text),
            other => return Err(CallError::new(format!("{} has no textual form", other))),
        })
    }

    /// Convert a scalar to the named primitive by identity or widening
    #[must_use]
    pub fn widen_to(&self, primitive: &str) -> Option<Value> {
        use builtins::*;
        match (self, primitive) {
            (Self::Bool(b), BOOLEAN_PRIM) => Some(Self::Bool(*b)),
            (Self::Char(c), CHAR_PRIM) => Some(Self::Char(*c)),
            (Self::Char(c), INT_PRIM) => Some(Self::Int(*c as i32)),
            (Self::Char(c), LONG_PRIM) => Some(Self::Long(i64::from(u32::from(*c)))),
            (Self::Char(c), FLOAT_PRIM) => Some(Self::Float(u32::from(*c) as f32)),
            (Self::Char(c), DOUBLE_PRIM) => Some(Self::Double(f64::from(u32::from(*c)))),
            (Self::Byte(b), BYTE_PRIM) => Some(Self::Byte(*b)),
            (Self::Byte(b), SHORT_PRIM) => Some(Self::Short(i16::from(*b))),
            (Self::Byte(b), INT_PRIM) => Some(Self::Int(i32::from(*b))),
            (Self::Byte(b), LONG_PRIM) => Some(Self::Long(i64::from(*b))),
            (Self::Byte(b), FLOAT_PRIM) => Some(Self::Float(f32::from(*b))),
            (Self::Byte(b), DOUBLE_PRIM) => Some(Self::Double(f64::from(*b))),
            (Self::Short(s), SHORT_PRIM) => Some(Self::Short(*s)),
            (Self::Short(s), INT_PRIM) => Some(Self::Int(i32::from(*s))),
            (Self::Short(s), LONG_PRIM) => Some(Self::Long(i64::from(*s))),
            (Self::Short(s), FLOAT_PRIM) => Some(Self::Float(f32::from(*s))),
            (Self::Short(s), DOUBLE_PRIM) => Some(Self::Double(f64::from(*s))),
            (Self::Int(i), INT_PRIM) => Some(Self::Int(*i)),
            (Self::Int(i), LONG_PRIM) => Some(Self::Long(i64::from(*i))),
            (Self::Int(i), FLOAT_PRIM) => Some(Self::Float(*i as f32)),
            (Self::Int(i), DOUBLE_PRIM) => Some(Self::Double(f64::from(*i))),
            (Self::Long(l), LONG_PRIM) => Some(Self::Long(*l)),
            (Self::Long(l), FLOAT_PRIM) => Some(Self::Float(*l as f32)),
            (Self::Long(l), DOUBLE_PRIM) => Some(Self::Double(*l as f64)),
            (Self::Float(f), FLOAT_PRIM) => Some(Self::Float(*f)),
            (Self::Float(f), DOUBLE_PRIM) => Some(Self::Double(f64::from(*f))),
            (Self::Double(d), DOUBLE_PRIM) => Some(Self::Double(*d)),
            _ => None,
        }
    }

    /// Convert for storage in an array of `component`
    ///
    /// # Errors
    ///
    /// Returns an error when the value cannot be stored in that component type
    pub fn coerce_element(&self, component: &ClassInfo) -> Result<Value, CallError> {
        let mismatch = || {
            CallError::new(format!(
                "{} cannot be stored in {}[]",
                self.type_name(),
                component.name()
            ))
        };
        if component.is_primitive() {
            return self.widen_to(component.name()).ok_or_else(mismatch);
        }
        match self.class() {
            None => Ok(Self::Null),
            Some(class) if component.is_assignable_from(&class) => Ok(self.clone()),
            Some(_) => Err(mismatch()),
        }
    }

    /// Read as `boolean`
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a boolean
    pub fn as_bool(&self) -> Result<bool, CallError> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(other.expected("boolean")),
        }
    }

    /// Read as `int`, widening smaller integral types
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not widen to int
    pub fn as_int(&self) -> Result<i32, CallError> {
        match self.widen_to(builtins::INT_PRIM) {
            Some(Self::Int(i)) => Ok(i),
            _ => Err(self.expected("int")),
        }
    }

    /// Read as `long`, widening smaller integral types
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not widen to long
    pub fn as_long(&self) -> Result<i64, CallError> {
        match self.widen_to(builtins::LONG_PRIM) {
            Some(Self::Long(l)) => Ok(l),
            _ => Err(self.expected("long")),
        }
    }

    /// Read as `double`, widening any numeric type
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not numeric
    pub fn as_double(&self) -> Result<f64, CallError> {
        match self.widen_to(builtins::DOUBLE_PRIM) {
            Some(Self::Double(d)) => Ok(d),
            _ => Err(self.expected("double")),
        }
    }

    /// Read as text
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not text
    pub fn as_text(&self) -> Result<Rc<str>, CallError> {
        match self {
            Self::Str(s) => Ok(Rc::clone(s)),
            other => Err(other.expected("String")),
        }
    }

    /// Read as a type reference
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a type
    pub fn as_type(&self) -> Result<Arc<ClassInfo>, CallError> {
        match self {
            Self::Type(t) => Ok(Arc::clone(t)),
            other => Err(other.expected("Class")),
        }
    }

    /// Read as an array
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an array
    pub fn as_array(&self) -> Result<&ArrayRef, CallError> {
        match self {
            Self::Array(a) => Ok(a),
            other => Err(other.expected("array")),
        }
    }

    /// Read as an object
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an object
    pub fn as_object(&self) -> Result<&ObjectRef, CallError> {
        match self {
            Self::Object(o) => Ok(o),
            other => Err(other.expected("object")),
        }
    }

    /// Borrow the data of an object value as `T`
    ///
    /// # Errors
    ///
    /// Returns an error if this is not an object holding a `T`
    pub fn with_data<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, CallError> {
        self.as_object()?.with(f)
    }

    /// Mutably borrow the data of an object value as `T`
    ///
    /// # Errors
    ///
    /// Returns an error if this is not an object holding a `T`
    pub fn with_data_mut<T: 'static, R>(
        &self,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, CallError> {
        self.as_object()?.with_mut(f)
    }

    fn expected(&self, what: &str) -> CallError {
        CallError::new(format!("expected {}, found {}", what, self.type_name()))
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Byte(b) => write!(f, "{}b", b),
            Self::Char(c) => write!(f, "{:?}", c),
            Self::Short(s) => write!(f, "{}s", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Long(l) => write!(f, "{}L", l),
            Self::Float(x) => write!(f, "{:?}f", x),
            Self::Double(d) => write!(f, "{:?}", d),
            Self::Str(s) => write!(f, "{:?}", s),
            Self::Type(t) => write!(f, "{}.class", t.name()),
            Self::Object(o) => write!(f, "{}{}", o.class().simple_name(), o.id()),
            Self::Array(a) => write!(f, "{}{}", a.class().simple_name(), a.id()),
            Self::Proxy(p) => write!(f, "Proxy{}", p.id()),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Self::Long(l)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<Arc<ClassInfo>> for Value {
    fn from(class: Arc<ClassInfo>) -> Self {
        Self::Type(class)
    }
}
