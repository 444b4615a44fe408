//! Operation resolution.
//!
//! Turns `(target, operation, arguments)` into exactly one call against the
//! type catalog. Overloads are ranked by summed hierarchy distance between the
//! arguments' runtime types and the declared parameter types; a tie at the
//! minimum is an [`RecastError::AmbiguousResolution`].

use crate::builtins;
use crate::error::{RecastError, RecastResult};
use crate::types::{self, ClassInfo, MAX_HIERARCHY_DEPTH, Method};
use crate::value::{ArrayRef, ProxyRef, Value};
use std::sync::Arc;

/// Construct; requires a type target
pub const NEW: &str = "new";
/// Construct on a type target, ordinary call otherwise; array allocation on `Array`
pub const NEW_INSTANCE: &str = "newInstance";
/// Build an array from element values
pub const NEW_ARRAY: &str = "newArray";
/// Static field fetch by name
pub const GET_FIELD: &str = "getField";
/// Indexed read
pub const GET: &str = "get";
/// Indexed write
pub const SET: &str = "set";
/// Operation every proxy call is forwarded to
pub const INVOKE: &str = "invoke";

/// Resolve and invoke `operation` on `target`
///
/// # Errors
///
/// `ResolutionFailure` when nothing matches, `AmbiguousResolution` on a tie,
/// `InvocationFailure` when the resolved operation itself fails
pub fn invoke(target: &Value, operation: &str, args: &[Value]) -> RecastResult<Value> {
    match target {
        Value::Null => Err(RecastError::resolution("null", operation, describe(args))),
        Value::Array(array) => array_operation(array, operation, args),
        Value::Proxy(proxy) => forward(proxy, operation, args),
        Value::Type(class) => invoke_on_type(target, class, operation, args),
        _ if operation == NEW => Err(RecastError::resolution(
            target.type_name(),
            operation,
            describe(args),
        )),
        _ => {
            let class = runtime_class(target, operation, args)?;
            let method = find_method(&class, operation, args, false)?;
            call(&method, target, operation, args)
        }
    }
}

/// Owner fallback: an exact signature match first, then the scored search.
///
/// # Errors
///
/// Same as [`invoke`]
pub fn invoke_best_effort(target: &Value, operation: &str, args: &[Value]) -> RecastResult<Value> {
    if matches!(target, Value::Type(_) | Value::Array(_) | Value::Proxy(_)) {
        return invoke(target, operation, args);
    }
    let class = runtime_class(target, operation, args)?;
    let arg_types = arg_classes(args);
    let exact = class.methods().into_iter().find(|m| {
        m.name == operation
            && m.params.len() == args.len()
            && param_classes(&m.params).is_some_and(|params| is_exact(&params, &arg_types))
    });
    let method = match exact {
        Some(method) => method,
        None => find_method(&class, operation, args, false)?,
    };
    call(&method, target, operation, args)
}

/// Comma separated runtime types of `args`, for diagnostics
#[must_use]
pub fn describe(args: &[Value]) -> String {
    args.iter()
        .map(Value::type_name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn runtime_class(target: &Value, operation: &str, args: &[Value]) -> RecastResult<Arc<ClassInfo>> {
    target
        .class()
        .ok_or_else(|| RecastError::resolution(target.type_name(), operation, describe(args)))
}

fn invoke_on_type(
    target: &Value,
    class: &Arc<ClassInfo>,
    operation: &str,
    args: &[Value],
) -> RecastResult<Value> {
    match operation {
        NEW_INSTANCE if class.name() == builtins::ARRAY => new_array_of_length(args),
        NEW | NEW_INSTANCE => construct(class, operation, args),
        NEW_ARRAY => new_array(class, args),
        GET_FIELD => static_field(class, args),
        _ => match find_method(class, operation, args, true) {
            Ok(method) => call(&method, target, operation, args),
            Err(RecastError::ResolutionFailure { .. }) => {
                let meta = types::require(builtins::CLASS)?;
                let method = find_method(&meta, operation, args, false).map_err(|err| match err {
                    RecastError::ResolutionFailure { .. } => {
                        RecastError::resolution(class.name(), operation, describe(args))
                    }
                    other => other,
                })?;
                call(&method, target, operation, args)
            }
            Err(err) => Err(err),
        },
    }
}

fn array_operation(array: &ArrayRef, operation: &str, args: &[Value]) -> RecastResult<Value> {
    match (operation, args) {
        (GET, [index]) => {
            let i = array_index(index, operation)?;
            array.get(i).ok_or_else(|| {
                RecastError::invocation(
                    operation,
                    format!("index {} out of bounds for length {}", i, array.len()),
                )
            })
        }
        (SET, [index, value]) => {
            let i = array_index(index, operation)?;
            array
                .set(i, value.clone())
                .map_err(|err| RecastError::invocation(operation, err))?;
            Ok(Value::Null)
        }
        _ => Err(RecastError::resolution(
            array.class().name(),
            operation,
            describe(args),
        )),
    }
}

fn array_index(index: &Value, operation: &str) -> RecastResult<usize> {
    let i = index
        .as_int()
        .map_err(|err| RecastError::invocation(operation, err))?;
    usize::try_from(i).map_err(|_| RecastError::invocation(operation, format!("negative index {}", i)))
}

fn forward(proxy: &ProxyRef, operation: &str, args: &[Value]) -> RecastResult<Value> {
    let object = types::require(builtins::OBJECT)?;
    let packed = Value::array(&object, args.to_vec());
    tracing::trace!(proxy = %proxy.id(), operation, "forwarding to handler");
    invoke(proxy.handler(), INVOKE, &[Value::text(operation), packed])
}

fn new_array_of_length(args: &[Value]) -> RecastResult<Value> {
    let [Value::Type(component), length] = args else {
        return Err(RecastError::resolution(
            builtins::ARRAY,
            NEW_INSTANCE,
            describe(args),
        ));
    };
    let length = length
        .as_int()
        .map_err(|err| RecastError::invocation(NEW_INSTANCE, err))?;
    let length = usize::try_from(length)
        .map_err(|_| RecastError::invocation(NEW_INSTANCE, format!("negative length {}", length)))?;
    Ok(Value::array_of_len(component, length))
}

fn new_array(class: &Arc<ClassInfo>, args: &[Value]) -> RecastResult<Value> {
    let component = class.component().cloned().unwrap_or_else(|| Arc::clone(class));
    let items = args
        .iter()
        .map(|item| item.coerce_element(&component))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| RecastError::invocation(NEW_ARRAY, err))?;
    Ok(Value::array(&component, items))
}

fn static_field(class: &Arc<ClassInfo>, args: &[Value]) -> RecastResult<Value> {
    let [Value::Str(name)] = args else {
        return Err(RecastError::resolution(class.name(), GET_FIELD, describe(args)));
    };
    class
        .static_field(name)
        .map(types::StaticField::value)
        .ok_or_else(|| RecastError::resolution(class.name(), GET_FIELD, name.to_string()))
}

fn construct(class: &Arc<ClassInfo>, operation: &str, args: &[Value]) -> RecastResult<Value> {
    let arg_types = arg_classes(args);
    let candidates = class
        .constructors()
        .iter()
        .filter(|c| c.params.len() == args.len())
        .filter_map(|c| {
            let params = param_classes(&c.params)?;
            is_applicable(&params, &arg_types).then(|| (c.clone(), params))
        })
        .collect::<Vec<_>>();
    let (constructor, params) = select(candidates, &arg_types, class.name(), operation, args)?;
    check_primitive_nulls(&params, args, operation)?;
    constructor
        .call(class, args)
        .map_err(|err| RecastError::invocation(operation, err))
}

fn find_method(
    class: &Arc<ClassInfo>,
    operation: &str,
    args: &[Value],
    static_only: bool,
) -> RecastResult<Method> {
    let arg_types = arg_classes(args);
    let candidates = class
        .methods()
        .into_iter()
        .filter(|m| m.name == operation && m.params.len() == args.len())
        .filter(|m| !static_only || m.is_static)
        .filter_map(|m| {
            let params = param_classes(&m.params)?;
            is_applicable(&params, &arg_types).then_some((m, params))
        })
        .collect::<Vec<_>>();
    let (method, params) = select(candidates, &arg_types, class.name(), operation, args)?;
    check_primitive_nulls(&params, args, operation)?;
    Ok(method)
}

fn call(method: &Method, target: &Value, operation: &str, args: &[Value]) -> RecastResult<Value> {
    method
        .call(target, args)
        .map_err(|err| RecastError::invocation(operation, err))
}

fn select<T>(
    candidates: Vec<(T, Vec<Arc<ClassInfo>>)>,
    arg_types: &[Option<Arc<ClassInfo>>],
    target: &str,
    operation: &str,
    args: &[Value],
) -> RecastResult<(T, Vec<Arc<ClassInfo>>)> {
    if candidates.len() <= 1 {
        return candidates
            .into_iter()
            .next()
            .ok_or_else(|| RecastError::resolution(target, operation, describe(args)));
    }

    let scored = candidates
        .into_iter()
        .map(|(candidate, params)| (norm(&params, arg_types), candidate, params))
        .collect::<Vec<_>>();
    let best = scored.iter().map(|(score, _, _)| *score).min().unwrap_or(usize::MAX);
    let tied = scored.iter().filter(|(score, _, _)| *score == best).count();
    tracing::trace!(target, operation, best, tied, "scored overloads");
    if tied > 1 {
        return Err(RecastError::AmbiguousResolution {
            target: target.to_string(),
            operation: operation.to_string(),
            candidates: tied,
        });
    }
    scored
        .into_iter()
        .find(|(score, _, _)| *score == best)
        .map(|(_, candidate, params)| (candidate, params))
        .ok_or_else(|| RecastError::resolution(target, operation, describe(args)))
}

fn arg_classes(args: &[Value]) -> Vec<Option<Arc<ClassInfo>>> {
    args.iter().map(Value::class).collect()
}

fn param_classes(params: &[String]) -> Option<Vec<Arc<ClassInfo>>> {
    params.iter().map(|p| types::class_for_name(p)).collect()
}

fn is_applicable(params: &[Arc<ClassInfo>], arg_types: &[Option<Arc<ClassInfo>>]) -> bool {
    params.iter().zip(arg_types).all(|(param, arg)| match arg {
        None => true,
        Some(arg) => {
            param.is_assignable_from(arg)
                || types::boxed_name(param.name()).is_some_and(|boxed| boxed == arg.name())
        }
    })
}

fn is_exact(params: &[Arc<ClassInfo>], arg_types: &[Option<Arc<ClassInfo>>]) -> bool {
    params.iter().zip(arg_types).all(|(param, arg)| {
        arg.as_ref()
            .is_some_and(|arg| types::boxed(param).name() == arg.name())
    })
}

fn check_primitive_nulls(
    params: &[Arc<ClassInfo>],
    args: &[Value],
    operation: &str,
) -> RecastResult<()> {
    match params
        .iter()
        .zip(args)
        .position(|(param, arg)| param.is_primitive() && arg.is_null())
    {
        Some(i) => Err(RecastError::invocation(
            operation,
            format!("null passed for primitive parameter {} ({})", i, params[i].name()),
        )),
        None => Ok(()),
    }
}

fn norm(params: &[Arc<ClassInfo>], arg_types: &[Option<Arc<ClassInfo>>]) -> usize {
    params
        .iter()
        .zip(arg_types)
        .filter_map(|(param, arg)| arg.as_ref().map(|arg| (param, arg)))
        .map(|(param, arg)| {
            distance(&types::boxed(arg), &types::boxed(param), 0).unwrap_or(usize::MAX / 64)
        })
        .sum()
}

/// Hierarchy distance from `from` up to `to`.
///
/// Zero for the same type; each superclass hop weighs two; when `to` is an
/// interface the shorter of the interface path and the superclass path is
/// taken, plus one.
#[must_use]
pub fn distance(from: &ClassInfo, to: &ClassInfo, depth: usize) -> Option<usize> {
    if from.name() == to.name() {
        return Some(0);
    }
    if depth >= MAX_HIERARCHY_DEPTH {
        return None;
    }
    if let (Some(from_component), Some(to_component)) = (from.component(), to.component()) {
        return distance(from_component, to_component, depth + 1);
    }

    let via_super = from
        .superclass()
        .and_then(|s| distance(&s, to, depth + 1))
        .map(|d| d + 2);
    if !to.is_interface() {
        return via_super;
    }
    let via_interfaces = from
        .interfaces()
        .iter()
        .filter_map(|i| distance(i, to, depth + 1))
        .min();
    match (via_interfaces, via_super) {
        (Some(i), Some(s)) => Some(i.min(s) + 1),
        (Some(d), None) | (None, Some(d)) => Some(d + 1),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallError;
    use crate::types::ClassBuilder;

    fn type_value(name: &str) -> Value {
        Value::Type(types::class_for_name(name).unwrap())
    }

    #[test]
    fn test_most_specific_overload_wins() {
        let class = ClassBuilder::new("test.resolve.Overloads")
            .constructor(&[], |class, _| Ok(Value::object(Arc::clone(class), ())))
            .method("f", &["Number"], "String", |_, _| Ok(Value::text("number")))
            .method("f", &["Integer"], "String", |_, _| Ok(Value::text("integer")))
            .register();
        let target = invoke(&Value::Type(class), NEW, &[]).unwrap();
        let result = invoke(&target, "f", &[Value::Int(1)]).unwrap();
        assert!(result.same(&Value::text("integer")));
        let result = invoke(&target, "f", &[Value::Long(1)]).unwrap();
        assert!(result.same(&Value::text("number")));
    }

    #[test]
    fn test_equal_distance_is_ambiguous() {
        ClassBuilder::interface("test.resolve.A").register();
        ClassBuilder::interface("test.resolve.B").register();
        let both = ClassBuilder::new("test.resolve.Both")
            .implements("test.resolve.A")
            .implements("test.resolve.B")
            .constructor(&[], |class, _| Ok(Value::object(Arc::clone(class), ())))
            .register();
        let class = ClassBuilder::new("test.resolve.Ambiguous")
            .constructor(&[], |class, _| Ok(Value::object(Arc::clone(class), ())))
            .method("g", &["test.resolve.A"], "String", |_, _| Ok(Value::Null))
            .method("g", &["test.resolve.B"], "int", |_, _| Ok(Value::Null))
            .register();
        let target = invoke(&Value::Type(class), NEW, &[]).unwrap();
        let arg = invoke(&Value::Type(both), NEW, &[]).unwrap();
        let err = invoke(&target, "g", &[arg]).unwrap_err();
        assert!(matches!(
            err,
            RecastError::AmbiguousResolution { candidates: 2, .. }
        ));
    }

    #[test]
    fn test_identical_return_tie_is_ambiguous() {
        ClassBuilder::interface("test.resolve.Left").register();
        ClassBuilder::interface("test.resolve.Right").register();
        let both = ClassBuilder::new("test.resolve.LeftRight")
            .implements("test.resolve.Left")
            .implements("test.resolve.Right")
            .constructor(&[], |class, _| Ok(Value::object(Arc::clone(class), ())))
            .register();
        let class = ClassBuilder::new("test.resolve.SameReturn")
            .constructor(&[], |class, _| Ok(Value::object(Arc::clone(class), ())))
            .method("f", &["test.resolve.Left"], "int", |_, _| Ok(Value::Int(1)))
            .method("f", &["test.resolve.Right"], "int", |_, _| Ok(Value::Int(2)))
            .register();
        let target = invoke(&Value::Type(class), NEW, &[]).unwrap();
        let arg = invoke(&Value::Type(both), NEW, &[]).unwrap();
        let err = invoke(&target, "f", &[arg]).unwrap_err();
        assert!(matches!(
            err,
            RecastError::AmbiguousResolution { candidates: 2, .. }
        ));
    }

    #[test]
    fn test_primitive_counterpart_matches() {
        let list = invoke(&type_value("ArrayList"), NEW, &[]).unwrap();
        invoke(&list, "add", &[Value::text("x")]).unwrap();
        let item = invoke(&list, GET, &[Value::Int(0)]).unwrap();
        assert!(item.same(&Value::text("x")));
    }

    #[test]
    fn test_null_for_primitive_parameter_fails_invocation() {
        let list = invoke(&type_value("ArrayList"), NEW, &[]).unwrap();
        let err = invoke(&list, GET, &[Value::Null]).unwrap_err();
        assert!(matches!(err, RecastError::InvocationFailure { .. }));
    }

    #[test]
    fn test_invoker_fault_is_unwrapped() {
        let class = ClassBuilder::new("test.resolve.Faulty")
            .constructor(&[], |class, _| Ok(Value::object(Arc::clone(class), ())))
            .method("boom", &[], "void", |_, _| Err(CallError::new("kaboom")))
            .register();
        let target = invoke(&Value::Type(class), NEW, &[]).unwrap();
        let err = invoke(&target, "boom", &[]).unwrap_err();
        assert_eq!(
            err,
            RecastError::InvocationFailure {
                operation: "boom".to_string(),
                cause: "kaboom".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_operation_is_resolution_failure() {
        let err = invoke(&Value::Int(1), "frobnicate", &[]).unwrap_err();
        assert!(matches!(err, RecastError::ResolutionFailure { .. }));
        let err = invoke(&Value::Int(1), NEW, &[]).unwrap_err();
        assert!(matches!(err, RecastError::ResolutionFailure { .. }));
    }

    #[test]
    fn test_array_operations() {
        let array = invoke(
            &type_value("Array"),
            NEW_INSTANCE,
            &[type_value("int"), Value::Int(3)],
        )
        .unwrap();
        invoke(&array, SET, &[Value::Int(1), Value::Int(9)]).unwrap();
        assert!(invoke(&array, GET, &[Value::Int(1)]).unwrap().same(&Value::Int(9)));
        assert!(invoke(&array, GET, &[Value::Int(0)]).unwrap().same(&Value::Int(0)));
        assert!(matches!(
            invoke(&array, GET, &[Value::Int(3)]),
            Err(RecastError::InvocationFailure { .. })
        ));
        assert!(matches!(
            invoke(&array, "size", &[]),
            Err(RecastError::ResolutionFailure { .. })
        ));
    }

    #[test]
    fn test_new_array_widens_elements() {
        let array = invoke(
            &type_value("long[]"),
            NEW_ARRAY,
            &[Value::Int(1), Value::Byte(2)],
        )
        .unwrap();
        let items = array.as_array().unwrap().to_vec();
        assert!(items[0].same(&Value::Long(1)));
        assert!(items[1].same(&Value::Long(2)));

        let err = invoke(&type_value("int[]"), NEW_ARRAY, &[Value::text("x")]).unwrap_err();
        assert!(matches!(err, RecastError::InvocationFailure { .. }));
    }

    #[test]
    fn test_static_field_fetch() {
        let class = ClassBuilder::new("test.resolve.Colors")
            .static_field("RED", || Value::text("red"))
            .register();
        let red = invoke(&Value::Type(class.clone()), GET_FIELD, &[Value::text("RED")]).unwrap();
        assert!(red.same(&Value::text("red")));
        assert!(invoke(&Value::Type(class), GET_FIELD, &[Value::text("BLUE")]).is_err());
    }

    #[test]
    fn test_proxy_forwards_to_handler() {
        let handler_class = ClassBuilder::new("test.resolve.EchoHandler")
            .implements("InvocationHandler")
            .constructor(&[], |class, _| Ok(Value::object(Arc::clone(class), ())))
            .method("invoke", &["String", "Object[]"], "Object", |_, args| {
                Ok(args[0].clone())
            })
            .register();
        let handler = invoke(&Value::Type(handler_class), NEW, &[]).unwrap();
        let comparable = types::class_for_name("Comparable").unwrap();
        let proxy = Value::proxy(&[comparable], handler);
        let echoed = invoke(&proxy, "compareTo", &[Value::Int(1)]).unwrap();
        assert!(echoed.same(&Value::text("compareTo")));
    }

    #[test]
    fn test_best_effort_prefers_exact_signature() {
        let class = ClassBuilder::new("test.resolve.Owner")
            .constructor(&[], |class, _| Ok(Value::object(Arc::clone(class), ())))
            .method("h", &["Object"], "String", |_, _| Ok(Value::text("object")))
            .method("h", &["Comparable"], "String", |_, _| Ok(Value::text("comparable")))
            .method("h", &["String"], "String", |_, _| Ok(Value::text("string")))
            .register();
        let owner = invoke(&Value::Type(class), NEW, &[]).unwrap();
        let picked = invoke_best_effort(&owner, "h", &[Value::text("s")]).unwrap();
        assert!(picked.same(&Value::text("string")));
    }

    #[test]
    fn test_distance_weights() {
        let integer = types::class_for_name("Integer").unwrap();
        let number = types::class_for_name("Number").unwrap();
        let object = types::class_for_name("Object").unwrap();
        let comparable = types::class_for_name("Comparable").unwrap();
        assert_eq!(distance(&integer, &integer, 0), Some(0));
        assert_eq!(distance(&integer, &number, 0), Some(2));
        assert_eq!(distance(&integer, &object, 0), Some(4));
        assert_eq!(distance(&integer, &comparable, 0), Some(1));
        assert_eq!(distance(&number, &integer, 0), None);
    }
}
