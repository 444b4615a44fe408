//! Persistence delegates: per-type strategies for equivalence, construction
//! and alignment.

use crate::encoder::Encode;
use recast_core::{
    ClassInfo, Expression, PropertyDescriptor, RecastError, RecastResult, Statement, Value,
    resolve,
};
use std::rc::Rc;
use std::sync::Arc;

/// Strategy deciding how instances of a type are rebuilt.
///
/// Implementations must be cheap to share; one instance serves every object
/// of the types it is registered for.
pub trait PersistenceDelegate: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Whether `new` can stand in for `old` without being rebuilt.
    ///
    /// `new` is `None` when `old` has no counterpart yet; the answer is then
    /// always `false`.
    fn equivalent_to(&self, old: &Value, new: Option<&Value>) -> bool;

    /// Construction expression for `old`; its result is preset to `old`
    ///
    /// # Errors
    ///
    /// Returns an error when `old` cannot be described by a construction
    fn instantiate(&self, old: &Value, out: &mut dyn Encode) -> RecastResult<Rc<Expression>>;

    /// Emit statements that bring `new` in line with `old`
    ///
    /// # Errors
    ///
    /// Returns the first fault that stops alignment
    fn align(&self, old: &Value, new: &Value, out: &mut dyn Encode) -> RecastResult<()>;

    /// Record `old`: align an equivalent counterpart, or instantiate a new one.
    ///
    /// Instantiation recurses back here through the encoder, so alignment
    /// always runs against the counterpart that exists afterwards.
    fn write_object(&self, old: &Value, out: &mut dyn Encode) {
        let current = out.state().get(old);
        match current {
            Some(new) if self.equivalent_to(old, Some(&new)) => {
                if let Err(err) = self.align(old, &new, out) {
                    out.state().report(err);
                }
            }
            _ => {
                out.state().remove(old);
                match self.instantiate(old, out) {
                    Ok(exp) => out.write_expression(&exp),
                    Err(err) => out.state().report(err),
                }
            }
        }
    }
}

/// Runtime class of `old`, or a resolution fault naming `operation`
///
/// # Errors
///
/// Returns `ResolutionFailure` for null
pub fn class_of(old: &Value, operation: &str) -> RecastResult<Arc<ClassInfo>> {
    old.class()
        .ok_or_else(|| RecastError::resolution("null", operation, String::new()))
}

/// Whether `new_value` already matches what `old_value` will be rebuilt as.
///
/// Heap values compare by counterpart identity; everything else through the
/// value's own delegate.
pub fn counterpart_matches(out: &mut dyn Encode, old_value: &Value, new_value: &Value) -> bool {
    if old_value.is_heap() {
        return out
            .state()
            .get(old_value)
            .is_some_and(|counterpart| counterpart.same(new_value));
    }
    if old_value.is_null() || new_value.is_null() {
        return old_value.is_null() && new_value.is_null();
    }
    out.delegate_for(old_value)
        .is_some_and(|delegate| delegate.equivalent_to(old_value, Some(new_value)))
}

/// Read through `getter` on both sides, record the old read, and emit
/// `mutator(old_value)` when the counterpart does not already match.
///
/// # Errors
///
/// Returns an error when either read fails
pub fn align_slot(
    out: &mut dyn Encode,
    old: &Value,
    new: &Value,
    getter: &str,
    getter_args: Vec<Value>,
    mutator: &str,
) -> RecastResult<()> {
    let old_get = Rc::new(Expression::new(old.clone(), getter, getter_args.clone()));
    let new_get = Expression::new(new.clone(), getter, getter_args.clone());
    let old_value = old_get.evaluate()?;
    let new_value = new_get.evaluate()?;
    out.write_expression(&old_get);
    if !counterpart_matches(out, &old_value, &new_value) {
        let mut args = getter_args;
        args.push(old_value);
        out.write_statement(&Rc::new(Statement::new(old.clone(), mutator, args)));
    }
    Ok(())
}

/// Generic strategy: construct with no arguments (or the declared
/// construction properties) and diff every read/write property.
#[derive(Debug, Default, Clone)]
pub struct DefaultPersistenceDelegate {
    construction_properties: Option<Vec<String>>,
}

impl DefaultPersistenceDelegate {
    /// Construct through the no-argument constructor unless the type
    /// declares construction properties
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct through the constructor taking these property values, in order
    #[must_use]
    pub fn with_construction_properties(names: &[&str]) -> Self {
        Self {
            construction_properties: Some(names.iter().map(|n| (*n).to_string()).collect()),
        }
    }

    fn construction_properties(&self, class: &ClassInfo) -> Vec<String> {
        self.construction_properties
            .clone()
            .or_else(|| class.construction_properties().map(<[String]>::to_vec))
            .unwrap_or_default()
    }

    fn align_property(
        &self,
        property: &PropertyDescriptor,
        old: &Value,
        new: &Value,
        out: &mut dyn Encode,
    ) -> RecastResult<()> {
        let (Some(getter), Some(setter)) = (&property.getter, &property.setter) else {
            return Ok(());
        };
        align_slot(out, old, new, getter, Vec::new(), setter)
    }
}

impl PersistenceDelegate for DefaultPersistenceDelegate {
    fn name(&self) -> &'static str {
        "default"
    }

    fn equivalent_to(&self, old: &Value, new: Option<&Value>) -> bool {
        let Some(new) = new else {
            return false;
        };
        let (Some(old_class), Some(new_class)) = (old.class(), new.class()) else {
            return false;
        };
        if old_class.name() != new_class.name() {
            return false;
        }
        if !self.construction_properties(&old_class).is_empty() && old_class.equality().is_some() {
            return old.equals(new);
        }
        true
    }

    fn instantiate(&self, old: &Value, _out: &mut dyn Encode) -> RecastResult<Rc<Expression>> {
        let class = class_of(old, resolve::NEW)?;
        let properties = class.properties();
        let args = self
            .construction_properties(&class)
            .iter()
            .map(|name| {
                let getter = properties
                    .iter()
                    .find(|p| &p.name == name)
                    .and_then(|p| p.getter.clone())
                    .ok_or_else(|| {
                        RecastError::resolution(class.name(), resolve::NEW, format!("no accessor for {}", name))
                    })?;
                Expression::new(old.clone(), getter, Vec::new()).evaluate()
            })
            .collect::<RecastResult<Vec<_>>>()?;
        Ok(Rc::new(Expression::with_value(
            old.clone(),
            Value::Type(class),
            resolve::NEW,
            args,
        )))
    }

    fn align(&self, old: &Value, new: &Value, out: &mut dyn Encode) -> RecastResult<()> {
        let class = class_of(old, "align")?;
        for property in class.properties() {
            if property.transient || !property.is_read_write() {
                continue;
            }
            if let Err(err) = self.align_property(&property, old, new, out) {
                tracing::debug!(class = class.name(), property = %property.name, "property alignment failed");
                out.state().report(err);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{Encoder, EncoderState};
    use recast_core::{ClassBuilder, Operation};

    #[derive(Default, Clone)]
    struct Point {
        x: i32,
        y: i32,
        cache: i32,
    }

    fn point_class(name: &str) -> Arc<ClassInfo> {
        ClassBuilder::new(name)
            .constructor(&[], |class, _| Ok(Value::object(Arc::clone(class), Point::default())))
            .constructor(&["int", "int"], |class, args| {
                Ok(Value::object(
                    Arc::clone(class),
                    Point {
                        x: args[0].as_int()?,
                        y: args[1].as_int()?,
                        cache: 0,
                    },
                ))
            })
            .property::<Point, _, _>("x", "int", |p| Value::Int(p.x), |p, v| {
                p.x = v.as_int()?;
                Ok(())
            })
            .property::<Point, _, _>("y", "int", |p| Value::Int(p.y), |p, v| {
                p.y = v.as_int()?;
                Ok(())
            })
            .property::<Point, _, _>("cache", "int", |p| Value::Int(p.cache), |p, v| {
                p.cache = v.as_int()?;
                Ok(())
            })
            .transient("cache")
            .register()
    }

    fn statements(encoder: &Encoder) -> Vec<String> {
        encoder
            .session()
            .trace()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                Operation::Statement(s) => Some(s.operation().to_string()),
                Operation::Expression(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_equivalence_needs_counterpart() {
        let class = point_class("test.delegate.Eq");
        let delegate = DefaultPersistenceDelegate::new();
        let a = Value::object(Arc::clone(&class), Point::default());
        let b = Value::object(class, Point::default());
        assert!(!delegate.equivalent_to(&a, None));
        assert!(delegate.equivalent_to(&a, Some(&b)));
        assert!(!delegate.equivalent_to(&a, Some(&Value::Int(1))));
    }

    #[test]
    fn test_transient_property_skipped() {
        let class = point_class("test.delegate.Transient");
        let old = Value::object(class, Point { x: 0, y: 0, cache: 9 });
        let mut encoder = Encoder::with_state(EncoderState::new().with_trace());
        encoder.write_object(&old);
        assert!(statements(&encoder).is_empty());
    }

    #[test]
    fn test_construction_properties_feed_constructor() {
        let class = point_class("test.delegate.Ctor");
        let old = Value::object(class, Point { x: 3, y: 4, cache: 0 });
        let delegate = DefaultPersistenceDelegate::with_construction_properties(&["x", "y"]);
        let mut encoder = Encoder::new();
        let exp = delegate.instantiate(&old, &mut encoder).unwrap();
        assert_eq!(exp.operation(), "new");
        assert!(exp.arguments()[0].same(&Value::Int(3)));
        assert!(exp.arguments()[1].same(&Value::Int(4)));
        assert!(exp.known_value().unwrap().same(&old));
    }

    #[test]
    fn test_align_against_preexisting_counterpart() {
        let class = point_class("test.delegate.Existing");
        let old = Value::object(Arc::clone(&class), Point { x: 1, y: 2, cache: 0 });
        let new = Value::object(class, Point { x: 1, y: 7, cache: 0 });
        let mut encoder = Encoder::with_state(EncoderState::new().with_trace());
        encoder.put(old.clone(), new.clone());
        encoder.write_object(&old);
        assert_eq!(statements(&encoder), vec!["setY"]);
        assert_eq!(new.with_data::<Point, _>(|p| p.y).unwrap(), 2);
    }

    #[test]
    fn test_inherited_properties_aligned_first() {
        #[derive(Default)]
        struct Labeled {
            x: i32,
            label: Option<String>,
        }
        ClassBuilder::new("test.delegate.LabelBase")
            .property::<Labeled, _, _>(
                "label",
                "String",
                |l| l.label.as_deref().map_or(Value::Null, Value::text),
                |l, v| {
                    l.label = Some(v.as_text()?.to_string());
                    Ok(())
                },
            )
            .register();
        let class = ClassBuilder::new("test.delegate.Labeled")
            .extends("test.delegate.LabelBase")
            .constructor(&[], |class, _| Ok(Value::object(Arc::clone(class), Labeled::default())))
            .property::<Labeled, _, _>("x", "int", |l| Value::Int(l.x), |l, v| {
                l.x = v.as_int()?;
                Ok(())
            })
            .register();
        let old = Value::object(
            class,
            Labeled {
                x: 5,
                label: Some("hi".to_string()),
            },
        );
        let mut encoder = Encoder::with_state(EncoderState::new().with_trace());
        encoder.write_object(&old);
        assert_eq!(statements(&encoder), vec!["setLabel", "setX"]);
    }
}
