//! Collections and mappings: aligned through their element operations
//! rather than property pairs.

use crate::delegate::{
    DefaultPersistenceDelegate, PersistenceDelegate, align_slot, counterpart_matches,
};
use crate::encoder::Encode;
use recast_core::{Expression, RecastError, RecastResult, Statement, Value, resolve};
use std::rc::Rc;

fn size(target: &Value) -> RecastResult<usize> {
    let size = resolve::invoke(target, "size", &[])?
        .as_int()
        .map_err(|err| RecastError::invocation("size", err))?;
    usize::try_from(size).map_err(|_| RecastError::invocation("size", format!("negative size {}", size)))
}

fn contents(target: &Value, operation: &str) -> RecastResult<Vec<Value>> {
    let array = resolve::invoke(target, operation, &[])?;
    Ok(array
        .as_array()
        .map_err(|err| RecastError::invocation(operation, err))?
        .to_vec())
}

fn emit(out: &mut dyn Encode, old: &Value, operation: &str, args: Vec<Value>) {
    out.write_statement(&Rc::new(Statement::new(old.clone(), operation, args)));
}

fn index_value(index: usize) -> RecastResult<Value> {
    i32::try_from(index)
        .map(Value::Int)
        .map_err(|_| RecastError::invocation(resolve::GET, "index overflow"))
}

/// Lists: per-index `set`, trailing `add`, trailing `remove`
#[derive(Debug, Default, Clone)]
pub struct SequencePersistenceDelegate {
    base: DefaultPersistenceDelegate,
}

impl SequencePersistenceDelegate {
    /// Create the delegate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceDelegate for SequencePersistenceDelegate {
    fn name(&self) -> &'static str {
        "sequence"
    }

    fn equivalent_to(&self, old: &Value, new: Option<&Value>) -> bool {
        self.base.equivalent_to(old, new)
    }

    fn instantiate(&self, old: &Value, out: &mut dyn Encode) -> RecastResult<Rc<Expression>> {
        self.base.instantiate(old, out)
    }

    fn align(&self, old: &Value, new: &Value, out: &mut dyn Encode) -> RecastResult<()> {
        self.base.align(old, new, out)?;
        let old_size = size(old)?;
        let new_size = size(new)?;
        for index in 0..old_size.min(new_size) {
            align_slot(out, old, new, resolve::GET, vec![index_value(index)?], resolve::SET)?;
        }
        for index in new_size..old_size {
            let item = resolve::invoke(old, resolve::GET, &[index_value(index)?])?;
            emit(out, old, "add", vec![item]);
        }
        for index in (old_size..new_size).rev() {
            emit(out, old, "remove", vec![index_value(index)?]);
        }
        Ok(())
    }
}

/// Unordered collections: `clear` then `add` in iteration order when the
/// contents differ
#[derive(Debug, Default, Clone)]
pub struct CollectionPersistenceDelegate {
    base: DefaultPersistenceDelegate,
}

impl CollectionPersistenceDelegate {
    /// Create the delegate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceDelegate for CollectionPersistenceDelegate {
    fn name(&self) -> &'static str {
        "collection"
    }

    fn equivalent_to(&self, old: &Value, new: Option<&Value>) -> bool {
        self.base.equivalent_to(old, new)
    }

    fn instantiate(&self, old: &Value, out: &mut dyn Encode) -> RecastResult<Rc<Expression>> {
        self.base.instantiate(old, out)
    }

    fn align(&self, old: &Value, new: &Value, out: &mut dyn Encode) -> RecastResult<()> {
        self.base.align(old, new, out)?;
        let old_items = contents(old, "toArray")?;
        let new_items = contents(new, "toArray")?;
        let same = old_items.len() == new_items.len()
            && old_items
                .iter()
                .zip(&new_items)
                .all(|(o, n)| counterpart_matches(out, o, n));
        if same {
            return Ok(());
        }
        if !new_items.is_empty() {
            emit(out, old, "clear", Vec::new());
        }
        for item in old_items {
            emit(out, old, "add", vec![item]);
        }
        Ok(())
    }
}

/// Maps: `remove` keys the original lacks, then `put` entries that differ
#[derive(Debug, Default, Clone)]
pub struct MappingPersistenceDelegate {
    base: DefaultPersistenceDelegate,
}

impl MappingPersistenceDelegate {
    /// Create the delegate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceDelegate for MappingPersistenceDelegate {
    fn name(&self) -> &'static str {
        "mapping"
    }

    fn equivalent_to(&self, old: &Value, new: Option<&Value>) -> bool {
        self.base.equivalent_to(old, new)
    }

    fn instantiate(&self, old: &Value, out: &mut dyn Encode) -> RecastResult<Rc<Expression>> {
        self.base.instantiate(old, out)
    }

    fn align(&self, old: &Value, new: &Value, out: &mut dyn Encode) -> RecastResult<()> {
        self.base.align(old, new, out)?;
        for new_key in contents(new, "keys")? {
            if !new_key.is_basic() {
                continue;
            }
            let present = resolve::invoke(old, "containsKey", &[new_key.clone()])?
                .as_bool()
                .map_err(|err| RecastError::invocation("containsKey", err))?;
            if !present {
                emit(out, old, "remove", vec![new_key]);
            }
        }
        for old_key in contents(old, "keys")? {
            let new_key = out.state().get(&old_key).unwrap_or_else(|| old_key.clone());
            let old_value = resolve::invoke(old, resolve::GET, &[old_key.clone()])?;
            let new_value = resolve::invoke(new, resolve::GET, &[new_key.clone()])?;
            out.write_expression(&Rc::new(Expression::new(
                old.clone(),
                resolve::GET,
                vec![old_key.clone()],
            )));
            let missing = old_value.is_null()
                && !resolve::invoke(new, "containsKey", &[new_key])?
                    .as_bool()
                    .map_err(|err| RecastError::invocation("containsKey", err))?;
            if missing || !counterpart_matches(out, &old_value, &new_value) {
                emit(out, old, "put", vec![old_key, old_value]);
            }
        }
        Ok(())
    }
}
