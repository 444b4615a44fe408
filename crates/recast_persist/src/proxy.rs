//! Proxies: rebuilt from their interface set and handler.

use crate::delegate::PersistenceDelegate;
use crate::encoder::Encode;
use recast_core::{Expression, RecastError, RecastResult, Value, builtins, types};
use std::rc::Rc;

/// Operation on `Proxy` that builds a proxy
pub const NEW_PROXY_INSTANCE: &str = "newProxyInstance";

/// Strategy for proxy values
#[derive(Debug, Default, Clone, Copy)]
pub struct ProxyPersistenceDelegate;

impl PersistenceDelegate for ProxyPersistenceDelegate {
    fn name(&self) -> &'static str {
        "proxy"
    }

    fn equivalent_to(&self, old: &Value, new: Option<&Value>) -> bool {
        match (old, new) {
            (Value::Proxy(old), Some(Value::Proxy(new))) => {
                old.class().name() == new.class().name()
            }
            _ => false,
        }
    }

    fn instantiate(&self, old: &Value, _out: &mut dyn Encode) -> RecastResult<Rc<Expression>> {
        let Value::Proxy(proxy) = old else {
            return Err(RecastError::invocation(
                NEW_PROXY_INSTANCE,
                format!("expected proxy, found {}", old.type_name()),
            ));
        };
        let meta = types::require(builtins::CLASS)?;
        let interfaces = proxy.interfaces().into_iter().map(Value::Type).collect();
        Ok(Rc::new(Expression::with_value(
            old.clone(),
            Value::Type(types::require(builtins::PROXY)?),
            NEW_PROXY_INSTANCE,
            vec![Value::array(&meta, interfaces), proxy.handler().clone()],
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
    use recast_core::{ClassBuilder, resolve};
    use std::sync::Arc;

    #[test]
    fn test_proxy_rebuilt_with_handler_counterpart() {
        let handler_class = ClassBuilder::new("test.proxy.Handler")
            .implements(builtins::INVOCATION_HANDLER)
            .constructor(&[], |class, _| Ok(Value::object(Arc::clone(class), ())))
            .method("invoke", &["String", "Object[]"], "Object", |_, args| Ok(args[0].clone()))
            .register();
        let handler = resolve::invoke(&Value::Type(handler_class), resolve::NEW, &[]).unwrap();
        let comparable = types::class_for_name(builtins::COMPARABLE).unwrap();
        let old = Value::proxy(&[comparable], handler.clone());

        let mut encoder = Encoder::new();
        encoder.write_object(&old);
        let new = encoder.get(&old).unwrap();
        let Value::Proxy(new_proxy) = &new else {
            panic!("expected proxy");
        };
        assert!(!new.same(&old));
        assert!(new_proxy.handler().same(&encoder.get(&handler).unwrap()));
        assert_eq!(new_proxy.interfaces()[0].name(), builtins::COMPARABLE);
    }
}
