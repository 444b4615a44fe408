//! Types seeded into the catalog at first use.

use crate::error::CallError;
use crate::types::{self, ClassBuilder, ClassInfo, PersistenceHint};
use crate::value::Value;
use std::sync::Arc;

/// Root of the class hierarchy
pub const OBJECT: &str = "Object";
/// Superclass of the numeric boxes
pub const NUMBER: &str = "Number";
/// Boxed `boolean`
pub const BOOLEAN: &str = "Boolean";
/// Boxed `byte`
pub const BYTE: &str = "Byte";
/// Boxed `char`
pub const CHARACTER: &str = "Character";
/// Boxed `short`
pub const SHORT: &str = "Short";
/// Boxed `int`
pub const INTEGER: &str = "Integer";
/// Boxed `long`
pub const LONG: &str = "Long";
/// Boxed `float`
pub const FLOAT: &str = "Float";
/// Boxed `double`
pub const DOUBLE: &str = "Double";
/// Immutable text
pub const STRING: &str = "String";
/// Type references
pub const CLASS: &str = "Class";
/// Array factory (`newInstance`, `newArray`)
pub const ARRAY: &str = "Array";
/// Proxy factory (`newProxyInstance`)
pub const PROXY: &str = "Proxy";

/// Primitive `boolean`
pub const BOOLEAN_PRIM: &str = "boolean";
/// Primitive `byte`
pub const BYTE_PRIM: &str = "byte";
/// Primitive `char`
pub const CHAR_PRIM: &str = "char";
/// Primitive `short`
pub const SHORT_PRIM: &str = "short";
/// Primitive `int`
pub const INT_PRIM: &str = "int";
/// Primitive `long`
pub const LONG_PRIM: &str = "long";
/// Primitive `float`
pub const FLOAT_PRIM: &str = "float";
/// Primitive `double`
pub const DOUBLE_PRIM: &str = "double";
/// Return type of statements
pub const VOID: &str = "void";

/// Interface of ordered values
pub const COMPARABLE: &str = "Comparable";
/// Interface of text
pub const CHAR_SEQUENCE: &str = "CharSequence";
/// Interface of element containers
pub const COLLECTION: &str = "Collection";
/// Interface of indexed sequences
pub const LIST: &str = "List";
/// Interface of deduplicating collections
pub const SET: &str = "Set";
/// Interface of key/value mappings
pub const MAP: &str = "Map";
/// Interface of proxy handlers
pub const INVOCATION_HANDLER: &str = "InvocationHandler";

/// Growable indexed list
pub const ARRAY_LIST: &str = "ArrayList";
/// Insertion-ordered set
pub const LINKED_HASH_SET: &str = "LinkedHashSet";
/// Insertion-ordered map
pub const LINKED_HASH_MAP: &str = "LinkedHashMap";

/// Backing data of `ArrayList`
#[derive(Debug, Default, Clone)]
pub struct ListData(pub Vec<Value>);

/// Backing data of `LinkedHashSet`; insertion ordered, no equal duplicates
#[derive(Debug, Default, Clone)]
pub struct SetData(pub Vec<Value>);

/// Backing data of `LinkedHashMap`; insertion ordered entries
#[derive(Debug, Default, Clone)]
pub struct MapData(pub Vec<(Value, Value)>);

/// Fetch argument `i`
///
/// # Errors
///
/// Returns an error when fewer arguments were passed
pub fn arg(args: &[Value], i: usize) -> Result<&Value, CallError> {
    args.get(i)
        .ok_or_else(|| CallError::new(format!("missing argument {}", i)))
}

fn index(value: &Value) -> Result<usize, CallError> {
    let i = value.as_int()?;
    usize::try_from(i).map_err(|_| CallError::new(format!("negative index {}", i)))
}

fn out_of_bounds(i: usize, len: usize) -> CallError {
    CallError::new(format!("index {} out of bounds for length {}", i, len))
}

fn object_array(items: Vec<Value>) -> Result<Value, CallError> {
    let object = types::class_for_name(OBJECT)
        .ok_or_else(|| CallError::new("Object is not registered"))?;
    Ok(Value::array(&object, items))
}

fn boxed_scalar(name: &'static str, primitive: &'static str) -> ClassInfo {
    let superclass = if matches!(name, BOOLEAN | CHARACTER) {
        OBJECT
    } else {
        NUMBER
    };
    ClassBuilder::new(name)
        .extends(superclass)
        .implements(COMPARABLE)
        .hint(PersistenceHint::Value)
        .constructor(&[STRING], move |_, args| {
            let text = arg(args, 0)?.as_text()?;
            Value::parse_as(primitive, &text)
        })
        .constructor(&[primitive], move |_, args| {
            arg(args, 0)?
                .widen_to(primitive)
                .ok_or_else(|| CallError::new(format!("expected {}", primitive)))
        })
        .build()
}

fn object_class() -> ClassInfo {
    ClassBuilder::new(OBJECT)
        .constructor(&[], |class, _| Ok(Value::object(Arc::clone(class), ())))
        .method("toString", &[], STRING, |this, _| {
            Ok(Value::from(
                this.scalar_text().unwrap_or_else(|| format!("{:?}", this)),
            ))
        })
        .method("equals", &[OBJECT], BOOLEAN_PRIM, |this, args| {
            Ok(Value::Bool(this.equals(arg(args, 0)?)))
        })
        .build()
}

fn number_class() -> ClassInfo {
    ClassBuilder::new(NUMBER)
        .method("intValue", &[], INT_PRIM, |this, _| {
            Ok(Value::Int(match this {
                Value::Long(l) => *l as i32,
                other => other.as_double()? as i32,
            }))
        })
        .method("longValue", &[], LONG_PRIM, |this, _| {
            Ok(Value::Long(match this {
                Value::Long(l) => *l,
                other => other.as_double()? as i64,
            }))
        })
        .method("doubleValue", &[], DOUBLE_PRIM, |this, _| {
            Ok(Value::Double(this.as_double()?))
        })
        .build()
}

fn string_class() -> ClassInfo {
    ClassBuilder::new(STRING)
        .implements(COMPARABLE)
        .implements(CHAR_SEQUENCE)
        .hint(PersistenceHint::Value)
        .constructor(&[], |_, _| Ok(Value::text("")))
        .constructor(&[STRING], |_, args| Ok(Value::Str(arg(args, 0)?.as_text()?)))
        .method("length", &[], INT_PRIM, |this, _| {
            let text = this.as_text()?;
            Ok(Value::Int(i32::try_from(text.chars().count()).unwrap_or(i32::MAX)))
        })
        .method("isEmpty", &[], BOOLEAN_PRIM, |this, _| {
            Ok(Value::Bool(this.as_text()?.is_empty()))
        })
        .build()
}

fn class_class() -> ClassInfo {
    ClassBuilder::new(CLASS)
        .hint(PersistenceHint::Value)
        .static_method("forName", &[STRING], CLASS, |_, args| {
            let name = arg(args, 0)?.as_text()?;
            Ok(Value::Type(types::require(&name)?))
        })
        .method("getName", &[], STRING, |this, _| {
            Ok(Value::text(this.as_type()?.name()))
        })
        .method("getSimpleName", &[], STRING, |this, _| {
            Ok(Value::from(this.as_type()?.simple_name()))
        })
        .build()
}

fn proxy_factory() -> ClassInfo {
    ClassBuilder::new(PROXY)
        .static_method(
            "newProxyInstance",
            &["Class[]", INVOCATION_HANDLER],
            OBJECT,
            |_, args| {
                let interfaces = arg(args, 0)?
                    .as_array()?
                    .to_vec()
                    .iter()
                    .map(Value::as_type)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::proxy(&interfaces, arg(args, 1)?.clone()))
            },
        )
        .build()
}

fn array_list() -> ClassInfo {
    ClassBuilder::new(ARRAY_LIST)
        .implements(LIST)
        .constructor(&[], |class, _| {
            Ok(Value::object(Arc::clone(class), ListData::default()))
        })
        .method("add", &[OBJECT], BOOLEAN_PRIM, |this, args| {
            let item = arg(args, 0)?.clone();
            this.with_data_mut::<ListData, _>(|l| l.0.push(item))?;
            Ok(Value::Bool(true))
        })
        .method("get", &[INT_PRIM], OBJECT, |this, args| {
            let i = index(arg(args, 0)?)?;
            this.with_data::<ListData, _>(|l| l.0.get(i).cloned().ok_or_else(|| out_of_bounds(i, l.0.len())))?
        })
        .method("set", &[INT_PRIM, OBJECT], OBJECT, |this, args| {
            let i = index(arg(args, 0)?)?;
            let item = arg(args, 1)?.clone();
            this.with_data_mut::<ListData, _>(|l| {
                let len = l.0.len();
                let slot = l.0.get_mut(i).ok_or_else(|| out_of_bounds(i, len))?;
                Ok(std::mem::replace(slot, item))
            })?
        })
        .method("remove", &[INT_PRIM], OBJECT, |this, args| {
            let i = index(arg(args, 0)?)?;
            this.with_data_mut::<ListData, _>(|l| {
                if i < l.0.len() {
                    Ok(l.0.remove(i))
                } else {
                    Err(out_of_bounds(i, l.0.len()))
                }
            })?
        })
        .method("size", &[], INT_PRIM, |this, _| {
            let len = this.with_data::<ListData, _>(|l| l.0.len())?;
            Ok(Value::Int(i32::try_from(len).unwrap_or(i32::MAX)))
        })
        .method("isEmpty", &[], BOOLEAN_PRIM, |this, _| {
            Ok(Value::Bool(this.with_data::<ListData, _>(|l| l.0.is_empty())?))
        })
        .method("contains", &[OBJECT], BOOLEAN_PRIM, |this, args| {
            let needle = arg(args, 0)?;
            Ok(Value::Bool(
                this.with_data::<ListData, _>(|l| l.0.iter().any(|v| v.equals(needle)))?,
            ))
        })
        .method("clear", &[], VOID, |this, _| {
            this.with_data_mut::<ListData, _>(|l| l.0.clear())?;
            Ok(Value::Null)
        })
        .method("toArray", &[], "Object[]", |this, _| {
            object_array(this.with_data::<ListData, _>(|l| l.0.clone())?)
        })
        .build()
}

fn linked_hash_set() -> ClassInfo {
    ClassBuilder::new(LINKED_HASH_SET)
        .implements(SET)
        .constructor(&[], |class, _| {
            Ok(Value::object(Arc::clone(class), SetData::default()))
        })
        .method("add", &[OBJECT], BOOLEAN_PRIM, |this, args| {
            let item = arg(args, 0)?.clone();
            let added = this.with_data_mut::<SetData, _>(|s| {
                if s.0.iter().any(|v| v.equals(&item)) {
                    false
                } else {
                    s.0.push(item);
                    true
                }
            })?;
            Ok(Value::Bool(added))
        })
        .method("remove", &[OBJECT], BOOLEAN_PRIM, |this, args| {
            let needle = arg(args, 0)?;
            let removed = this.with_data_mut::<SetData, _>(|s| {
                match s.0.iter().position(|v| v.equals(needle)) {
                    Some(i) => {
                        s.0.remove(i);
                        true
                    }
                    None => false,
                }
            })?;
            Ok(Value::Bool(removed))
        })
        .method("contains", &[OBJECT], BOOLEAN_PRIM, |this, args| {
            let needle = arg(args, 0)?;
            Ok(Value::Bool(
                this.with_data::<SetData, _>(|s| s.0.iter().any(|v| v.equals(needle)))?,
            ))
        })
        .method("size", &[], INT_PRIM, |this, _| {
            let len = this.with_data::<SetData, _>(|s| s.0.len())?;
            Ok(Value::Int(i32::try_from(len).unwrap_or(i32::MAX)))
        })
        .method("isEmpty", &[], BOOLEAN_PRIM, |this, _| {
            Ok(Value::Bool(this.with_data::<SetData, _>(|s| s.0.is_empty())?))
        })
        .method("clear", &[], VOID, |this, _| {
            this.with_data_mut::<SetData, _>(|s| s.0.clear())?;
            Ok(Value::Null)
        })
        .method("toArray", &[], "Object[]", |this, _| {
            object_array(this.with_data::<SetData, _>(|s| s.0.clone())?)
        })
        .build()
}

fn linked_hash_map() -> ClassInfo {
    ClassBuilder::new(LINKED_HASH_MAP)
        .implements(MAP)
        .constructor(&[], |class, _| {
            Ok(Value::object(Arc::clone(class), MapData::default()))
        })
        .method("put", &[OBJECT, OBJECT], OBJECT, |this, args| {
            let key = arg(args, 0)?.clone();
            let value = arg(args, 1)?.clone();
            this.with_data_mut::<MapData, _>(|m| {
                match m.0.iter_mut().find(|(k, _)| k.equals(&key)) {
                    Some((_, slot)) => std::mem::replace(slot, value),
                    None => {
                        m.0.push((key, value));
                        Value::Null
                    }
                }
            })
        })
        .method("get", &[OBJECT], OBJECT, |this, args| {
            let key = arg(args, 0)?;
            this.with_data::<MapData, _>(|m| {
                m.0.iter()
                    .find(|(k, _)| k.equals(key))
                    .map_or(Value::Null, |(_, v)| v.clone())
            })
        })
        .method("remove", &[OBJECT], OBJECT, |this, args| {
            let key = arg(args, 0)?;
            this.with_data_mut::<MapData, _>(|m| {
                match m.0.iter().position(|(k, _)| k.equals(key)) {
                    Some(i) => m.0.remove(i).1,
                    None => Value::Null,
                }
            })
        })
        .method("containsKey", &[OBJECT], BOOLEAN_PRIM, |this, args| {
            let key = arg(args, 0)?;
            Ok(Value::Bool(
                this.with_data::<MapData, _>(|m| m.0.iter().any(|(k, _)| k.equals(key)))?,
            ))
        })
        .method("size", &[], INT_PRIM, |this, _| {
            let len = this.with_data::<MapData, _>(|m| m.0.len())?;
            Ok(Value::Int(i32::try_from(len).unwrap_or(i32::MAX)))
        })
        .method("isEmpty", &[], BOOLEAN_PRIM, |this, _| {
            Ok(Value::Bool(this.with_data::<MapData, _>(|m| m.0.is_empty())?))
        })
        .method("clear", &[], VOID, |this, _| {
            this.with_data_mut::<MapData, _>(|m| m.0.clear())?;
            Ok(Value::Null)
        })
        .method("keys", &[], "Object[]", |this, _| {
            object_array(this.with_data::<MapData, _>(|m| {
                m.0.iter().map(|(k, _)| k.clone()).collect()
            })?)
        })
        .build()
}

/// Every builtin type, in registration order
pub(crate) fn all() -> Vec<ClassInfo> {
    let mut out = vec![object_class(), number_class()];
    for (boxed, primitive) in [
        (BOOLEAN, BOOLEAN_PRIM),
        (BYTE, BYTE_PRIM),
        (CHARACTER, CHAR_PRIM),
        (SHORT, SHORT_PRIM),
        (INTEGER, INT_PRIM),
        (LONG, LONG_PRIM),
        (FLOAT, FLOAT_PRIM),
        (DOUBLE, DOUBLE_PRIM),
    ] {
        out.push(boxed_scalar(boxed, primitive));
    }
    for primitive in [
        BOOLEAN_PRIM,
        BYTE_PRIM,
        CHAR_PRIM,
        SHORT_PRIM,
        INT_PRIM,
        LONG_PRIM,
        FLOAT_PRIM,
        DOUBLE_PRIM,
        VOID,
    ] {
        out.push(ClassBuilder::primitive(primitive).build());
    }
    out.push(string_class());
    out.push(class_class());
    out.push(ClassBuilder::new(ARRAY).build());
    out.push(proxy_factory());
    for interface in [COMPARABLE, CHAR_SEQUENCE, COLLECTION, MAP, INVOCATION_HANDLER] {
        out.push(ClassBuilder::interface(interface).build());
    }
    out.push(ClassBuilder::interface(LIST).implements(COLLECTION).build());
    out.push(ClassBuilder::interface(SET).implements(COLLECTION).build());
    out.push(array_list());
    out.push(linked_hash_set());
    out.push(linked_hash_map());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::invoke;

    fn new_instance(name: &str) -> Value {
        let class = types::class_for_name(name).unwrap();
        invoke(&Value::Type(class), "new", &[]).unwrap()
    }

    #[test]
    fn test_list_operations() {
        let list = new_instance(ARRAY_LIST);
        invoke(&list, "add", &[Value::text("a")]).unwrap();
        invoke(&list, "add", &[Value::Int(2)]).unwrap();
        assert!(matches!(invoke(&list, "size", &[]), Ok(Value::Int(2))));
        assert!(invoke(&list, "get", &[Value::Int(1)]).unwrap().same(&Value::Int(2)));
        assert!(invoke(&list, "get", &[Value::Int(5)]).is_err());
        let array = invoke(&list, "toArray", &[]).unwrap();
        assert_eq!(array.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_set_deduplicates_by_equality() {
        let set = new_instance(LINKED_HASH_SET);
        assert!(matches!(invoke(&set, "add", &[Value::text("a")]), Ok(Value::Bool(true))));
        assert!(matches!(invoke(&set, "add", &[Value::text("a")]), Ok(Value::Bool(false))));
        assert!(matches!(invoke(&set, "size", &[]), Ok(Value::Int(1))));
    }

    #[test]
    fn test_map_put_replaces() {
        let map = new_instance(LINKED_HASH_MAP);
        invoke(&map, "put", &[Value::text("k"), Value::Int(1)]).unwrap();
        let old = invoke(&map, "put", &[Value::text("k"), Value::Int(2)]).unwrap();
        assert!(old.same(&Value::Int(1)));
        assert!(invoke(&map, "get", &[Value::text("k")]).unwrap().same(&Value::Int(2)));
        assert!(invoke(&map, "get", &[Value::text("missing")]).unwrap().is_null());
    }

    #[test]
    fn test_boxed_constructors() {
        let integer = Value::Type(types::class_for_name(INTEGER).unwrap());
        assert!(invoke(&integer, "new", &[Value::text("12")]).unwrap().same(&Value::Int(12)));
        assert!(invoke(&integer, "new", &[Value::Int(3)]).unwrap().same(&Value::Int(3)));
    }

    #[test]
    fn test_class_for_name_round_trip() {
        let class = Value::Type(types::class_for_name(CLASS).unwrap());
        let found = invoke(&class, "forName", &[Value::text(ARRAY_LIST)]).unwrap();
        let name = invoke(&found, "getName", &[]).unwrap();
        assert!(name.same(&Value::text(ARRAY_LIST)));
    }
}
