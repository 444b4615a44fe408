//! Arrays: construct by length, then set only the slots that differ.

use crate::delegate::{PersistenceDelegate, align_slot};
use crate::encoder::Encode;
use recast_core::{Expression, RecastError, RecastResult, Value, builtins, resolve, types};
use std::rc::Rc;

/// Strategy for every array type
#[derive(Debug, Default, Clone, Copy)]
pub struct ArrayPersistenceDelegate;

impl PersistenceDelegate for ArrayPersistenceDelegate {
    fn name(&self) -> &'static str {
        "array"
    }

    fn equivalent_to(&self, old: &Value, new: Option<&Value>) -> bool {
        match (old, new) {
            (Value::Array(old), Some(Value::Array(new))) => {
                old.class().name() == new.class().name() && old.len() == new.len()
            }
            _ => false,
        }
    }

    fn instantiate(&self, old: &Value, _out: &mut dyn Encode) -> RecastResult<Rc<Expression>> {
        let array = old
            .as_array()
            .map_err(|err| RecastError::invocation(resolve::NEW_INSTANCE, err))?;
        let length = i32::try_from(array.len())
            .map_err(|_| RecastError::invocation(resolve::NEW_INSTANCE, "array too long"))?;
        Ok(Rc::new(Expression::with_value(
            old.clone(),
            Value::Type(types::require(builtins::ARRAY)?),
            resolve::NEW_INSTANCE,
            vec![Value::Type(array.component()), Value::Int(length)],
        )))
    }

    fn align(&self, old: &Value, new: &Value, out: &mut dyn Encode) -> RecastResult<()> {
        let len = old
            .as_array()
            .map_err(|err| RecastError::invocation(resolve::SET, err))?
            .len();
        for index in 0..len {
            let index = i32::try_from(index)
                .map_err(|_| RecastError::invocation(resolve::GET, "index overflow"))?;
            align_slot(
                out,
                old,
                new,
                resolve::GET,
                vec![Value::Int(index)],
                resolve::SET,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{Encoder, EncoderState};
    use proptest::prelude::*;
    use recast_core::Operation;

    fn int_array(items: &[i32]) -> Value {
        let int = types::class_for_name("int").unwrap();
        Value::array(&int, items.iter().map(|i| Value::Int(*i)).collect())
    }

    fn set_statements(encoder: &Encoder) -> Vec<(i32, i32)> {
        encoder
            .session()
            .trace()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                Operation::Statement(s) if s.operation() == "set" => Some((
                    s.arguments()[0].as_int().unwrap(),
                    s.arguments()[1].as_int().unwrap(),
                )),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_only_differing_slot_is_set() {
        let old = int_array(&[1, 2, 3]);
        let new = int_array(&[1, 0, 3]);
        let mut encoder = Encoder::with_state(EncoderState::new().with_trace());
        encoder.put(old.clone(), new.clone());
        encoder.write_object(&old);
        assert_eq!(set_statements(&encoder), vec![(1, 2)]);
        assert!(new.as_array().unwrap().get(1).unwrap().same(&Value::Int(2)));
    }

    #[test]
    fn test_length_mismatch_reinstantiates() {
        let old = int_array(&[1, 2]);
        let delegate = ArrayPersistenceDelegate;
        assert!(!delegate.equivalent_to(&old, Some(&int_array(&[1, 2, 3]))));
        assert!(delegate.equivalent_to(&old, Some(&int_array(&[0, 0]))));
    }

    #[test]
    fn test_fresh_array_materialized() {
        let old = int_array(&[0, 7, 0]);
        let mut encoder = Encoder::with_state(EncoderState::new().with_trace());
        encoder.write_object(&old);
        let new = encoder.get(&old).unwrap();
        assert_eq!(new.as_array().unwrap().len(), 3);
        assert_eq!(set_statements(&encoder), vec![(1, 7)]);
    }

    #[test]
    fn test_nested_arrays_share_counterparts() {
        let int = types::class_for_name("int").unwrap();
        let inner = int_array(&[4]);
        let outer_class = types::array_class(&int);
        let outer = Value::array(&outer_class, vec![inner.clone(), inner.clone()]);
        let mut encoder = Encoder::new();
        encoder.write_object(&outer);
        let new_outer = encoder.get(&outer).unwrap();
        let items = new_outer.as_array().unwrap().to_vec();
        assert!(items[0].same(&items[1]));
        assert!(items[0].same(&encoder.get(&inner).unwrap()));
    }

    proptest! {
        #[test]
        fn prop_alignment_sets_exactly_the_differences(
            pairs in proptest::collection::vec((any::<i32>(), any::<i32>()), 0..12)
        ) {
            let old_items: Vec<i32> = pairs.iter().map(|(a, _)| *a).collect();
            let new_items: Vec<i32> = pairs.iter().map(|(_, b)| *b).collect();
            let old = int_array(&old_items);
            let new = int_array(&new_items);
            let mut encoder = Encoder::with_state(EncoderState::new().with_trace());
            encoder.put(old.clone(), new.clone());
            encoder.write_object(&old);

            let expected: Vec<(i32, i32)> = pairs
                .iter()
                .enumerate()
                .filter(|(_, (a, b))| a != b)
                .map(|(i, (a, _))| (i as i32, *a))
                .collect();
            prop_assert_eq!(set_statements(&encoder), expected);
            prop_assert_eq!(new.as_array().unwrap().to_vec().iter().map(|v| v.as_int().unwrap()).collect::<Vec<_>>(), old_items);
        }
    }
}
