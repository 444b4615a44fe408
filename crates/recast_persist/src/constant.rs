//! Enumerated constants: instances are fetched from a static field.

use crate::delegate::{PersistenceDelegate, class_of};
use crate::encoder::Encode;
use recast_core::{Expression, RecastError, RecastResult, Value, resolve};
use std::rc::Rc;

/// Strategy for types whose instances are the values of their static fields
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstantPersistenceDelegate;

impl PersistenceDelegate for ConstantPersistenceDelegate {
    fn name(&self) -> &'static str {
        "constant"
    }

    fn equivalent_to(&self, old: &Value, new: Option<&Value>) -> bool {
        new.is_some_and(|new| old.equals(new))
    }

    fn instantiate(&self, old: &Value, _out: &mut dyn Encode) -> RecastResult<Rc<Expression>> {
        let class = class_of(old, resolve::GET_FIELD)?;
        let field = class
            .static_fields()
            .iter()
            .find(|field| field.value().equals(old))
            .map(|field| field.name.clone())
            .ok_or_else(|| {
                RecastError::resolution(class.name(), resolve::GET_FIELD, format!("{:?}", old))
            })?;
        Ok(Rc::new(Expression::with_value(
            old.clone(),
            Value::Type(class),
            resolve::GET_FIELD,
            vec![Value::from(field)],
        )))
    }

    fn align(&self, _old: &Value, _new: &Value, _out: &mut dyn Encode) -> RecastResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;
    use recast_core::{ClassBuilder, PersistenceHint, types};
    use std::sync::Arc;

    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    enum Suit {
        Hearts,
        Spades,
    }

    fn suit_class() -> Arc<recast_core::ClassInfo> {
        if let Some(class) = types::class_for_name("test.constant.Suit") {
            return class;
        }
        ClassBuilder::new("test.constant.Suit")
            .hint(PersistenceHint::Constants)
            .static_field("HEARTS", || suit(Suit::Hearts))
            .static_field("SPADES", || suit(Suit::Spades))
            .equality(|a, b| {
                let a = a.with_data::<Suit, _>(|s| *s).ok();
                let b = b.with_data::<Suit, _>(|s| *s).ok();
                a.is_some() && a == b
            })
            .register()
    }

    fn suit(value: Suit) -> Value {
        let class = types::class_for_name("test.constant.Suit").unwrap();
        Value::object(class, value)
    }

    #[test]
    fn test_constant_fetched_by_field() {
        suit_class();
        let old = suit(Suit::Spades);
        let mut encoder = Encoder::new();
        let exp = ConstantPersistenceDelegate.instantiate(&old, &mut encoder).unwrap();
        assert_eq!(exp.operation(), "getField");
        assert!(exp.arguments()[0].same(&Value::text("SPADES")));

        encoder.write_object(&old);
        let new = encoder.get(&old).unwrap();
        assert!(new.equals(&old));
    }

    #[test]
    fn test_unknown_constant_is_resolution_failure() {
        let class = suit_class();
        let stray = Value::object(class, 7_u8);
        let mut encoder = Encoder::new();
        assert!(ConstantPersistenceDelegate.instantiate(&stray, &mut encoder).is_err());
    }
}
