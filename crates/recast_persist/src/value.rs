//! Immutable values rebuilt from their textual form.

use crate::delegate::{PersistenceDelegate, class_of};
use crate::encoder::Encode;
use recast_core::{Expression, RecastError, RecastResult, Value, builtins, resolve, types};
use std::rc::Rc;

/// Equivalence by value equality; construction through the single-argument
/// textual constructor (`Class.forName` for type references).
#[derive(Debug, Default, Clone, Copy)]
pub struct ValuePersistenceDelegate;

impl PersistenceDelegate for ValuePersistenceDelegate {
    fn name(&self) -> &'static str {
        "value"
    }

    fn equivalent_to(&self, old: &Value, new: Option<&Value>) -> bool {
        new.is_some_and(|new| old.equals(new))
    }

    fn instantiate(&self, old: &Value, _out: &mut dyn Encode) -> RecastResult<Rc<Expression>> {
        if let Value::Type(class) = old {
            let meta = types::require(builtins::CLASS)?;
            return Ok(Rc::new(Expression::with_value(
                old.clone(),
                Value::Type(meta),
                "forName",
                vec![Value::text(class.name())],
            )));
        }

        let class = class_of(old, resolve::NEW)?;
        let text = match old.scalar_text() {
            Some(text) => text,
            None => {
                let to_text = class.text_form().ok_or_else(|| {
                    RecastError::invocation(resolve::NEW, format!("{} has no textual form", class.name()))
                })?;
                to_text(old).map_err(|err| RecastError::invocation(resolve::NEW, err))?
            }
        };
        Ok(Rc::new(Expression::with_value(
            old.clone(),
            Value::Type(class),
            resolve::NEW,
            vec![Value::from(text)],
        )))
    }

    fn align(&self, _old: &Value, _new: &Value, _out: &mut dyn Encode) -> RecastResult<()> {
        Ok(())
    }
}
