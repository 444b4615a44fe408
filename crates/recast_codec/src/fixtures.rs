//! Types shared by the codec tests.

use recast_core::{ClassBuilder, ClassInfo, Value, builtins, types};
use std::sync::Arc;

pub const ITEM: &str = "codec.Item";

#[derive(Default)]
pub struct Item {
    pub name: Option<String>,
    pub count: i32,
    pub child: Value,
    pub weights: Value,
}

pub fn item_class() -> Arc<ClassInfo> {
    if let Some(class) = types::class_for_name(ITEM) {
        return class;
    }
    ClassBuilder::new(ITEM)
        .constructor(&[], |class, _| Ok(Value::object(Arc::clone(class), Item::default())))
        .property::<Item, _, _>(
            "name",
            builtins::STRING,
            |i| i.name.as_deref().map_or(Value::Null, Value::text),
            |i, v| {
                i.name = match v {
                    Value::Null => None,
                    other => Some(other.as_text()?.to_string()),
                };
                Ok(())
            },
        )
        .property::<Item, _, _>(
            "count",
            builtins::INT_PRIM,
            |i| Value::Int(i.count),
            |i, v| {
                i.count = v.as_int()?;
                Ok(())
            },
        )
        .property::<Item, _, _>(
            "child",
            ITEM,
            |i| i.child.clone(),
            |i, v| {
                i.child = v.clone();
                Ok(())
            },
        )
        .property::<Item, _, _>(
            "weights",
            "int[]",
            |i| i.weights.clone(),
            |i, v| {
                i.weights = v.clone();
                Ok(())
            },
        )
        .register()
}

pub fn item(name: Option<&str>, count: i32) -> Value {
    Value::object(
        item_class(),
        Item {
            name: name.map(str::to_string),
            count,
            ..Item::default()
        },
    )
}

pub fn set_child(parent: &Value, child: &Value) {
    parent
        .with_data_mut::<Item, _>(|i| i.child = child.clone())
        .unwrap();
}

pub fn set_weights(parent: &Value, weights: &Value) {
    parent
        .with_data_mut::<Item, _>(|i| i.weights = weights.clone())
        .unwrap();
}

pub fn read<R>(value: &Value, f: impl FnOnce(&Item) -> R) -> R {
    value.with_data::<Item, _>(f).unwrap()
}
