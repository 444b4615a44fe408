//! Type catalog: the signature table every dispatch decision is made against.
//!
//! Types are registered explicitly (name, hierarchy, constructors, methods,
//! static fields, property catalog). The table is process-wide and
//! last-write-wins; array and proxy classes are synthesized on demand.

use crate::builtins;
use crate::error::{CallError, RecastError, RecastResult};
use crate::value::Value;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::sync::{Arc, PoisonError, RwLock};

/// Upper bound on superclass/interface hops, guards against cyclic registrations
pub const MAX_HIERARCHY_DEPTH: usize = 64;

/// Invoker for an instance or static method
pub type Invoker = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, CallError> + Send + Sync>;

/// Invoker for a constructor; receives the class being constructed
pub type ConstructorFn =
    Arc<dyn Fn(&Arc<ClassInfo>, &[Value]) -> Result<Value, CallError> + Send + Sync>;

/// Supplier for a static field value
pub type FieldFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Value-equality hook
pub type EqualsFn = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// Textual form used by the single-argument textual constructor
pub type TextFn = Arc<dyn Fn(&Value) -> Result<String, CallError> + Send + Sync>;

/// What kind of type a [`ClassInfo`] describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    /// Concrete or abstract class
    Class,
    /// Interface; never instantiated directly
    Interface,
    /// Primitive scalar type
    Primitive,
    /// Synthesized `T[]` type
    Array,
    /// Synthesized proxy type over an interface set
    Proxy,
}

/// Persistence strategy a type declares for itself
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PersistenceHint {
    /// Immutable value rebuilt from its textual form
    Value,
    /// Instances are the values of the type's static fields
    Constants,
    /// Delegate registered under this key
    Named(String),
}

/// A registered method signature
#[derive(Clone)]
pub struct Method {
    /// Method name
    pub name: String,
    /// Parameter type names
    pub params: Vec<String>,
    /// Return type name (`void` for none)
    pub returns: String,
    /// Whether the method is called on the type rather than an instance
    pub is_static: bool,
    invoker: Invoker,
}

impl Method {
    /// Run the method body
    ///
    /// # Errors
    ///
    /// Returns the invoker's own fault
    pub fn call(&self, target: &Value, args: &[Value]) -> Result<Value, CallError> {
        (self.invoker)(target, args)
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}({})", self.returns, self.name, self.params.join(", "))
    }
}

/// A registered constructor signature
#[derive(Clone)]
pub struct Constructor {
    /// Parameter type names
    pub params: Vec<String>,
    build: ConstructorFn,
}

impl Constructor {
    /// Run the constructor body
    ///
    /// # Errors
    ///
    /// Returns the invoker's own fault
    pub fn call(&self, class: &Arc<ClassInfo>, args: &[Value]) -> Result<Value, CallError> {
        (self.build)(class, args)
    }
}

impl std::fmt::Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "new({})", self.params.join(", "))
    }
}

/// A static field readable by name
#[derive(Clone)]
pub struct StaticField {
    /// Field name
    pub name: String,
    supplier: FieldFn,
}

impl StaticField {
    /// Read the field
    #[must_use]
    pub fn value(&self) -> Value {
        (self.supplier)()
    }
}

/// Accessor/mutator pair exposed as a named property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// Property name (`name` for `getName`/`setName`)
    pub name: String,
    /// Value type name
    pub value_type: String,
    /// Accessor method name
    pub getter: Option<String>,
    /// Mutator method name
    pub setter: Option<String>,
    /// Skipped by property alignment
    pub transient: bool,
}

impl PropertyDescriptor {
    /// Whether both halves of the pair exist
    #[must_use]
    pub fn is_read_write(&self) -> bool {
        self.getter.is_some() && self.setter.is_some()
    }
}

/// Everything the resolver and the delegates know about one type
pub struct ClassInfo {
    name: String,
    kind: ClassKind,
    superclass: Option<String>,
    interfaces: Vec<String>,
    component: Option<Arc<ClassInfo>>,
    constructors: Vec<Constructor>,
    methods: Vec<Method>,
    fields: Vec<StaticField>,
    properties: Vec<PropertyDescriptor>,
    construction_properties: Option<Vec<String>>,
    hint: Option<PersistenceHint>,
    equals: Option<EqualsFn>,
    to_text: Option<TextFn>,
}

impl ClassInfo {
    /// Fully qualified name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without its dotted prefix; arrays become `<Component>Array`
    #[must_use]
    pub fn simple_name(&self) -> String {
        if let Some(component) = &self.component {
            let inner = component.simple_name();
            let mut chars = inner.chars();
            let capitalized = match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => inner,
            };
            return format!("{}Array", capitalized);
        }
        self.name
            .rsplit('.')
            .next()
            .unwrap_or(&self.name)
            .to_string()
    }

    /// Kind of type
    #[must_use]
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Whether this is an interface
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// Whether this is a primitive type
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        self.kind == ClassKind::Primitive
    }

    /// Whether this is an array type
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.kind == ClassKind::Array
    }

    /// Whether this is a synthesized proxy type
    #[must_use]
    pub fn is_proxy(&self) -> bool {
        self.kind == ClassKind::Proxy
    }

    /// Component type of an array class
    #[must_use]
    pub fn component(&self) -> Option<&Arc<ClassInfo>> {
        self.component.as_ref()
    }

    /// Superclass name
    #[must_use]
    pub fn superclass_name(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    /// Resolved superclass
    #[must_use]
    pub fn superclass(&self) -> Option<Arc<ClassInfo>> {
        self.superclass.as_deref().and_then(class_for_name)
    }

    /// Declared interface names
    #[must_use]
    pub fn interface_names(&self) -> &[String] {
        &self.interfaces
    }

    /// Resolved declared interfaces; unknown names are skipped
    #[must_use]
    pub fn interfaces(&self) -> Vec<Arc<ClassInfo>> {
        self.interfaces
            .iter()
            .filter_map(|name| class_for_name(name))
            .collect()
    }

    /// Declared constructors
    #[must_use]
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// Methods declared on this type only
    #[must_use]
    pub fn declared_methods(&self) -> &[Method] {
        &self.methods
    }

    /// Methods of this type and its superclasses; a subclass method hides a
    /// superclass method with the same name and parameters.
    #[must_use]
    pub fn methods(&self) -> Vec<Method> {
        let mut out: Vec<Method> = self.methods.clone();
        let mut current = self.superclass();
        let mut depth = 0;
        while let Some(class) = current {
            if depth >= MAX_HIERARCHY_DEPTH {
                break;
            }
            for method in class.declared_methods() {
                let hidden = out
                    .iter()
                    .any(|m| m.name == method.name && m.params == method.params);
                if !hidden {
                    out.push(method.clone());
                }
            }
            current = class.superclass();
            depth += 1;
        }
        out
    }

    /// Look up a static field
    #[must_use]
    pub fn static_field(&self, name: &str) -> Option<&StaticField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// All static fields in declaration order
    #[must_use]
    pub fn static_fields(&self) -> &[StaticField] {
        &self.fields
    }

    /// Properties declared on this type only
    #[must_use]
    pub fn declared_properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Properties of the superclass chain first, then this type's; a
    /// redeclared name replaces the inherited descriptor in place.
    #[must_use]
    pub fn properties(&self) -> Vec<PropertyDescriptor> {
        let mut chain = Vec::new();
        let mut current = self.superclass();
        while let Some(class) = current {
            if chain.len() >= MAX_HIERARCHY_DEPTH {
                break;
            }
            current = class.superclass();
            chain.push(class);
        }

        let mut out: Vec<PropertyDescriptor> = Vec::new();
        let declared = chain
            .iter()
            .rev()
            .flat_map(|c| c.declared_properties().iter())
            .chain(self.properties.iter());
        for property in declared {
            match out.iter_mut().find(|p| p.name == property.name) {
                Some(existing) => *existing = property.clone(),
                None => out.push(property.clone()),
            }
        }
        out
    }

    /// Ordered construction properties, when the type declares them
    #[must_use]
    pub fn construction_properties(&self) -> Option<&[String]> {
        self.construction_properties.as_deref()
    }

    /// Declared persistence hint
    #[must_use]
    pub fn hint(&self) -> Option<&PersistenceHint> {
        self.hint.as_ref()
    }

    /// Value-equality hook
    #[must_use]
    pub fn equality(&self) -> Option<&EqualsFn> {
        self.equals.as_ref()
    }

    /// Textual form hook
    #[must_use]
    pub fn text_form(&self) -> Option<&TextFn> {
        self.to_text.as_ref()
    }

    /// Whether a value of type `from` can be passed where `self` is expected
    #[must_use]
    pub fn is_assignable_from(&self, from: &ClassInfo) -> bool {
        self.assignable_from_depth(from, 0)
    }

    fn assignable_from_depth(&self, from: &ClassInfo, depth: usize) -> bool {
        if self.name == from.name {
            return true;
        }
        if depth >= MAX_HIERARCHY_DEPTH || self.is_primitive() || from.is_primitive() {
            return false;
        }
        if let (Some(to_component), Some(from_component)) = (&self.component, &from.component) {
            if to_component.is_primitive() || from_component.is_primitive() {
                return to_component.name == from_component.name;
            }
            return to_component.assignable_from_depth(from_component, depth + 1);
        }
        if self.name == builtins::OBJECT {
            return true;
        }
        let via_super = from
            .superclass()
            .is_some_and(|s| self.assignable_from_depth(&s, depth + 1));
        via_super
            || from
                .interfaces()
                .iter()
                .any(|i| self.assignable_from_depth(i, depth + 1))
    }
}

impl std::fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("superclass", &self.superclass)
            .field("interfaces", &self.interfaces)
            .finish_non_exhaustive()
    }
}

/// Boxed counterpart of a primitive type name
#[must_use]
pub fn boxed_name(primitive: &str) -> Option<&'static str> {
    match primitive {
        builtins::BOOLEAN_PRIM => Some(builtins::BOOLEAN),
        builtins::BYTE_PRIM => Some(builtins::BYTE),
        builtins::CHAR_PRIM => Some(builtins::CHARACTER),
        builtins::SHORT_PRIM => Some(builtins::SHORT),
        builtins::INT_PRIM => Some(builtins::INTEGER),
        builtins::LONG_PRIM => Some(builtins::LONG),
        builtins::FLOAT_PRIM => Some(builtins::FLOAT),
        builtins::DOUBLE_PRIM => Some(builtins::DOUBLE),
        _ => None,
    }
}

/// The boxed class for a primitive, the class itself otherwise
#[must_use]
pub fn boxed(class: &Arc<ClassInfo>) -> Arc<ClassInfo> {
    boxed_name(class.name())
        .and_then(class_for_name)
        .unwrap_or_else(|| Arc::clone(class))
}

fn accessor_name(prefix: &str, property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("{}{}{}", prefix, first.to_uppercase(), chars.as_str()),
        None => prefix.to_string(),
    }
}

/// Builder for [`ClassInfo`]
pub struct ClassBuilder {
    info: ClassInfo,
}

impl ClassBuilder {
    /// Start a concrete class extending `Object`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let superclass = (name != builtins::OBJECT).then(|| builtins::OBJECT.to_string());
        Self::with_kind(name, ClassKind::Class, superclass)
    }

    /// Start an interface
    #[must_use]
    pub fn interface(name: impl Into<String>) -> Self {
        Self::with_kind(name.into(), ClassKind::Interface, None)
    }

    pub(crate) fn primitive(name: &str) -> Self {
        Self::with_kind(name.to_string(), ClassKind::Primitive, None)
    }

    fn with_kind(name: String, kind: ClassKind, superclass: Option<String>) -> Self {
        Self {
            info: ClassInfo {
                name,
                kind,
                superclass,
                interfaces: Vec::new(),
                component: None,
                constructors: Vec::new(),
                methods: Vec::new(),
                fields: Vec::new(),
                properties: Vec::new(),
                construction_properties: None,
                hint: None,
                equals: None,
                to_text: None,
            },
        }
    }

    /// Set the superclass
    #[must_use]
    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.info.superclass = Some(superclass.into());
        self
    }

    /// Add an implemented (or, for interfaces, extended) interface
    #[must_use]
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.info.interfaces.push(interface.into());
        self
    }

    /// Add a constructor
    #[must_use]
    pub fn constructor<F>(mut self, params: &[&str], build: F) -> Self
    where
        F: Fn(&Arc<ClassInfo>, &[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        self.info.constructors.push(Constructor {
            params: params.iter().map(|p| (*p).to_string()).collect(),
            build: Arc::new(build),
        });
        self
    }

    /// Add an instance method
    #[must_use]
    pub fn method<F>(self, name: &str, params: &[&str], returns: &str, invoker: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        self.push_method(name, params, returns, false, Arc::new(invoker))
    }

    /// Add a static method; the invoker receives the type value as target
    #[must_use]
    pub fn static_method<F>(self, name: &str, params: &[&str], returns: &str, invoker: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        self.push_method(name, params, returns, true, Arc::new(invoker))
    }

    fn push_method(
        mut self,
        name: &str,
        params: &[&str],
        returns: &str,
        is_static: bool,
        invoker: Invoker,
    ) -> Self {
        self.info.methods.push(Method {
            name: name.to_string(),
            params: params.iter().map(|p| (*p).to_string()).collect(),
            returns: returns.to_string(),
            is_static,
            invoker,
        });
        self
    }

    /// Add a static field
    #[must_use]
    pub fn static_field<F>(mut self, name: &str, supplier: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.info.fields.push(StaticField {
            name: name.to_string(),
            supplier: Arc::new(supplier),
        });
        self
    }

    /// Add a read/write property backed by Rust data of type `T`.
    ///
    /// Registers `get<Name>()` and `set<Name>(value_type)` and the catalog entry.
    #[must_use]
    pub fn property<T, G, S>(self, name: &str, value_type: &str, get: G, set: S) -> Self
    where
        T: 'static,
        G: Fn(&T) -> Value + Send + Sync + 'static,
        S: Fn(&mut T, &Value) -> Result<(), CallError> + Send + Sync + 'static,
    {
        let getter = accessor_name("get", name);
        let setter = accessor_name("set", name);
        let mut builder = self
            .method(&getter, &[], value_type, move |this, _| {
                this.with_data::<T, _>(|data| get(data))
            })
            .method(&setter, &[value_type], "void", move |this, args| {
                let value = args.first().cloned().unwrap_or(Value::Null);
                this.with_data_mut::<T, _>(|data| set(data, &value))??;
                Ok(Value::Null)
            });
        builder.info.properties.push(PropertyDescriptor {
            name: name.to_string(),
            value_type: value_type.to_string(),
            getter: Some(getter),
            setter: Some(setter),
            transient: false,
        });
        builder
    }

    /// Add a read-only property backed by Rust data of type `T`
    #[must_use]
    pub fn read_only_property<T, G>(self, name: &str, value_type: &str, get: G) -> Self
    where
        T: 'static,
        G: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let getter = accessor_name("get", name);
        let mut builder = self.method(&getter, &[], value_type, move |this, _| {
            this.with_data::<T, _>(|data| get(data))
        });
        builder.info.properties.push(PropertyDescriptor {
            name: name.to_string(),
            value_type: value_type.to_string(),
            getter: Some(getter),
            setter: None,
            transient: false,
        });
        builder
    }

    /// Mark an already declared property transient
    #[must_use]
    pub fn transient(mut self, name: &str) -> Self {
        if let Some(property) = self.info.properties.iter_mut().find(|p| p.name == name) {
            property.transient = true;
        }
        self
    }

    /// Declare the ordered properties the matching constructor takes
    #[must_use]
    pub fn construction_properties(mut self, names: &[&str]) -> Self {
        self.info.construction_properties = Some(names.iter().map(|n| (*n).to_string()).collect());
        self
    }

    /// Declare a persistence hint
    #[must_use]
    pub fn hint(mut self, hint: PersistenceHint) -> Self {
        self.info.hint = Some(hint);
        self
    }

    /// Declare value semantics: an equality hook and a textual form
    #[must_use]
    pub fn value_semantics<E, X>(mut self, equals: E, to_text: X) -> Self
    where
        E: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
        X: Fn(&Value) -> Result<String, CallError> + Send + Sync + 'static,
    {
        self.info.equals = Some(Arc::new(equals));
        self.info.to_text = Some(Arc::new(to_text));
        self
    }

    /// Declare only an equality hook
    #[must_use]
    pub fn equality<E>(mut self, equals: E) -> Self
    where
        E: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.info.equals = Some(Arc::new(equals));
        self
    }

    /// Finish without registering
    #[must_use]
    pub fn build(self) -> ClassInfo {
        self.info
    }

    /// Finish and register in the global table
    pub fn register(self) -> Arc<ClassInfo> {
        register(self.info)
    }
}

struct TypeTable {
    classes: IndexMap<String, Arc<ClassInfo>>,
}

impl TypeTable {
    fn with_builtins() -> Self {
        let mut classes = IndexMap::new();
        for info in builtins::all() {
            classes.insert(info.name.clone(), Arc::new(info));
        }
        Self { classes }
    }
}

static TYPES: Lazy<RwLock<TypeTable>> = Lazy::new(|| RwLock::new(TypeTable::with_builtins()));

/// Register a type; a later registration under the same name wins
pub fn register(info: ClassInfo) -> Arc<ClassInfo> {
    let class = Arc::new(info);
    let mut table = TYPES.write().unwrap_or_else(PoisonError::into_inner);
    table.classes.insert(class.name.clone(), Arc::clone(&class));
    tracing::debug!(class = %class.name, "registered type");
    class
}

/// Look up a type by name; `T[]` names synthesize the array class
#[must_use]
pub fn class_for_name(name: &str) -> Option<Arc<ClassInfo>> {
    {
        let table = TYPES.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(class) = table.classes.get(name) {
            return Some(Arc::clone(class));
        }
    }
    let component = name.strip_suffix("[]")?;
    let component = class_for_name(component)?;
    Some(array_class(&component))
}

/// Look up a type by name, failing with a resolution fault
///
/// # Errors
///
/// Returns `ResolutionFailure` when the name is not registered
pub fn require(name: &str) -> RecastResult<Arc<ClassInfo>> {
    class_for_name(name).ok_or_else(|| {
        RecastError::resolution(builtins::CLASS, "forName", name.to_string())
    })
}

/// The array class with the given component type
#[must_use]
pub fn array_class(component: &Arc<ClassInfo>) -> Arc<ClassInfo> {
    let name = format!("{}[]", component.name);
    {
        let table = TYPES.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(class) = table.classes.get(&name) {
            return Arc::clone(class);
        }
    }
    let mut builder = ClassBuilder::with_kind(name, ClassKind::Array, Some(builtins::OBJECT.to_string()));
    builder.info.component = Some(Arc::clone(component));
    let class = Arc::new(builder.info);
    let mut table = TYPES.write().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(
        table
            .classes
            .entry(class.name.clone())
            .or_insert(class),
    )
}

/// The proxy class implementing exactly `interfaces`, in order
#[must_use]
pub fn proxy_class(interfaces: &[Arc<ClassInfo>]) -> Arc<ClassInfo> {
    let names: Vec<String> = interfaces.iter().map(|i| i.name.clone()).collect();
    let name = format!("$Proxy<{}>", names.join(","));
    {
        let table = TYPES.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(class) = table.classes.get(&name) {
            return Arc::clone(class);
        }
    }
    let mut builder = ClassBuilder::with_kind(name, ClassKind::Proxy, Some(builtins::OBJECT.to_string()));
    builder.info.interfaces = names;
    let class = Arc::new(builder.info);
    let mut table = TYPES.write().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(
        table
            .classes
            .entry(class.name.clone())
            .or_insert(class),
    )
}

/// Names of every registered type, in registration order
#[must_use]
pub fn registered_names() -> Vec<String> {
    let table = TYPES.read().unwrap_or_else(PoisonError::into_inner);
    table.classes.keys().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str) -> Arc<ClassInfo> {
        class_for_name(name).unwrap()
    }

    #[test]
    fn test_builtins_present() {
        assert!(class_for_name("Integer").is_some());
        assert!(class_for_name("int").unwrap().is_primitive());
        assert!(class_for_name("List").unwrap().is_interface());
    }

    #[test]
    fn test_assignability_walks_hierarchy() {
        assert!(class("Number").is_assignable_from(&class("Integer")));
        assert!(class("Object").is_assignable_from(&class("Integer")));
        assert!(class("Collection").is_assignable_from(&class("ArrayList")));
        assert!(!class("Integer").is_assignable_from(&class("Number")));
        assert!(!class("int").is_assignable_from(&class("Integer")));
    }

    #[test]
    fn test_array_class_synthesized() {
        let ints = class_for_name("int[]").unwrap();
        assert!(ints.is_array());
        assert_eq!(ints.component().unwrap().name(), "int");
        assert_eq!(ints.simple_name(), "IntArray");

        let nested = class_for_name("int[][]").unwrap();
        assert_eq!(nested.component().unwrap().name(), "int[]");
    }

    #[test]
    fn test_array_covariance() {
        let objects = class("Object[]");
        let strings = class("String[]");
        let ints = class("int[]");
        assert!(objects.is_assignable_from(&strings));
        assert!(!strings.is_assignable_from(&objects));
        assert!(!objects.is_assignable_from(&ints));
        assert!(class("Object").is_assignable_from(&ints));
    }

    #[test]
    fn test_simple_name() {
        let info = ClassBuilder::new("demo.types.Widget").build();
        assert_eq!(info.simple_name(), "Widget");
    }

    #[test]
    fn test_property_generates_accessors() {
        #[derive(Default)]
        struct Counter {
            count: i32,
        }

        let info = ClassBuilder::new("test.types.Counter")
            .property::<Counter, _, _>(
                "count",
                "int",
                |c| Value::Int(c.count),
                |c, v| {
                    c.count = v.as_int()?;
                    Ok(())
                },
            )
            .build();
        let names: Vec<&str> = info.declared_methods().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["getCount", "setCount"]);
        assert!(info.declared_properties()[0].is_read_write());
    }

    #[test]
    fn test_inherited_properties_superclass_first() {
        ClassBuilder::new("test.types.Base")
            .read_only_property::<(), _>("id", "int", |_| Value::Int(0))
            .register();
        let child = ClassBuilder::new("test.types.Child")
            .extends("test.types.Base")
            .read_only_property::<(), _>("label", "String", |_| Value::Null)
            .build();
        let names: Vec<String> = child.properties().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["id".to_string(), "label".to_string()]);
    }

    #[test]
    fn test_proxy_class_cached() {
        let handler = class("InvocationHandler");
        let a = proxy_class(&[Arc::clone(&handler)]);
        let b = proxy_class(&[handler]);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.is_proxy());
    }

    #[test]
    fn test_require_unknown() {
        assert!(matches!(
            require("no.such.Type"),
            Err(RecastError::ResolutionFailure { .. })
        ));
    }
}
