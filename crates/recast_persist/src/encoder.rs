//! The memoizing graph walk.
//!
//! [`Encode`] is the seam the delegates talk to. The free functions
//! [`write_object`], [`write_expression`] and [`write_statement`] are the base
//! walk; an implementation that wants to observe the walk (the textual export
//! session does) overrides the trait methods and calls back into them.

use crate::delegate::PersistenceDelegate;
use crate::fault::{FaultSink, LogFaultSink};
use crate::identity::IdentityRegistry;
use crate::registry;
use recast_core::{Expression, Operation, RecastError, RecastResult, SessionId, Statement, Value};
use std::rc::Rc;
use std::sync::Arc;

/// Session state shared by every [`Encode`] implementation
pub struct EncoderState {
    identities: IdentityRegistry,
    sink: Box<dyn FaultSink>,
    session: SessionId,
    trace: Option<Vec<Operation>>,
}

impl EncoderState {
    /// Fresh state logging faults through `tracing`
    #[must_use]
    pub fn new() -> Self {
        Self {
            identities: IdentityRegistry::new(),
            sink: Box::new(LogFaultSink),
            session: SessionId::new(),
            trace: None,
        }
    }

    /// Replace the fault sink
    #[must_use]
    pub fn with_fault_sink(mut self, sink: impl FaultSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Keep a log of every recorded old-side operation
    #[must_use]
    pub fn with_trace(mut self) -> Self {
        self.trace = Some(Vec::new());
        self
    }

    /// Replace the fault sink in place
    pub fn set_fault_sink(&mut self, sink: impl FaultSink + 'static) {
        self.sink = Box::new(sink);
    }

    /// Session identifier used for log correlation
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Counterpart of `old`; null, text and type values are their own counterpart
    #[must_use]
    pub fn get(&self, old: &Value) -> Option<Value> {
        match old {
            Value::Null | Value::Str(_) | Value::Type(_) => Some(old.clone()),
            _ => self.identities.get(old),
        }
    }

    /// Record a counterpart; a null counterpart is never stored
    pub fn put(&mut self, old: Value, new: Value) {
        if !new.is_null() {
            self.identities.put(old, new);
        }
    }

    /// Forget the counterpart of `old`
    pub fn remove(&mut self, old: &Value) -> Option<Value> {
        self.identities.remove(old)
    }

    /// Send a fault to the sink
    pub fn report(&mut self, error: RecastError) {
        self.sink.fault(error);
    }

    /// Append to the operation trace, if enabled
    pub fn record(&mut self, operation: Operation) {
        if let Some(trace) = self.trace.as_mut() {
            trace.push(operation);
        }
    }

    /// Operations recorded so far, if tracing is enabled
    #[must_use]
    pub fn trace(&self) -> Option<&[Operation]> {
        self.trace.as_deref()
    }

    /// The identity map
    #[must_use]
    pub fn identities(&self) -> &IdentityRegistry {
        &self.identities
    }

    /// Discard all identity state and the trace; the fault sink stays
    pub fn clear(&mut self) {
        self.identities.clear();
        if let Some(trace) = self.trace.as_mut() {
            trace.clear();
        }
    }
}

impl Default for EncoderState {
    fn default() -> Self {
        Self::new()
    }
}

/// Recording surface the delegates drive
pub trait Encode {
    /// Session state
    fn state(&mut self) -> &mut EncoderState;

    /// Record `old` and everything reachable from it
    fn write_object(&mut self, old: &Value);

    /// Record a value-producing operation on old objects
    fn write_expression(&mut self, old: &Rc<Expression>);

    /// Record a pure-effect operation on old objects
    fn write_statement(&mut self, old: &Rc<Statement>);

    /// Delegate responsible for `value`
    fn delegate_for(&self, value: &Value) -> Option<Arc<dyn PersistenceDelegate>> {
        value.class().map(|class| registry::lookup(&class))
    }
}

/// Base object walk: find the delegate and let it decide
pub fn write_object(out: &mut dyn Encode, old: &Value) {
    if old.is_null() {
        return;
    }
    let Some(delegate) = out.delegate_for(old) else {
        return;
    };
    tracing::debug!(
        session = %out.state().session(),
        object = ?old,
        delegate = delegate.name(),
        "writing object"
    );
    delegate.write_object(old, out);
}

/// Base expression walk: evaluate on the old side, rebuild against
/// counterparts, execute, remember the result, then walk the old result
pub fn write_expression(out: &mut dyn Encode, old: &Rc<Expression>) {
    match rebuild_expression(out, old) {
        Ok(Some(old_value)) => out.write_object(&old_value),
        Ok(None) => {}
        Err(err) => out.state().report(err),
    }
}

/// Base statement walk: rebuild against counterparts and execute for effect
pub fn write_statement(out: &mut dyn Encode, old: &Rc<Statement>) {
    out.state().record(Operation::Statement(Rc::clone(old)));
    let rebuilt = rebuild(out, old);
    if let Err(err) = rebuilt.execute() {
        out.state().report(err);
    }
}

fn rebuild_expression(out: &mut dyn Encode, old: &Rc<Expression>) -> RecastResult<Option<Value>> {
    let old_value = old.evaluate()?;
    if old_value.is_null() || out.state().get(&old_value).is_some() {
        return Ok(None);
    }
    out.state().record(Operation::Expression(Rc::clone(old)));
    let rebuilt = rebuild(out, old.statement());
    let new_value = Expression::new(
        rebuilt.target().clone(),
        rebuilt.operation(),
        rebuilt.arguments().to_vec(),
    )
    .evaluate()?;
    out.state().put(old_value.clone(), new_value);
    Ok(Some(old_value))
}

fn rebuild(out: &mut dyn Encode, old: &Statement) -> Statement {
    let target = counterpart(out, old.target());
    let arguments = old
        .arguments()
        .iter()
        .map(|arg| counterpart(out, arg))
        .collect();
    Statement::new(target, old.operation(), arguments)
}

/// Counterpart of `old`, recording it first if it has none yet.
///
/// Yields null when recording did not produce one (the fault has already
/// gone to the sink).
pub fn counterpart(out: &mut dyn Encode, old: &Value) -> Value {
    if let Some(existing) = out.state().get(old) {
        return existing;
    }
    out.write_object(old);
    out.state().get(old).unwrap_or_else(|| {
        tracing::debug!(object = ?old, "no counterpart after recording");
        Value::Null
    })
}

/// Plain encoder: records into its identity map and nothing else
#[derive(Default)]
pub struct Encoder {
    state: EncoderState,
}

impl Encoder {
    /// Create an encoder that logs faults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an encoder over prepared state
    #[must_use]
    pub fn with_state(state: EncoderState) -> Self {
        Self { state }
    }

    /// Read-only view of the state
    #[must_use]
    pub fn session(&self) -> &EncoderState {
        &self.state
    }

    /// Counterpart of `old`, if recorded
    #[must_use]
    pub fn get(&self, old: &Value) -> Option<Value> {
        self.state.get(old)
    }

    /// Register an existing counterpart before recording
    pub fn put(&mut self, old: Value, new: Value) {
        self.state.put(old, new);
    }

    /// End the session
    pub fn clear(&mut self) {
        self.state.clear();
    }
}

impl Encode for Encoder {
    fn state(&mut self) -> &mut EncoderState {
        &mut self.state
    }

    fn write_object(&mut self, old: &Value) {
        write_object(self, old);
    }

    fn write_expression(&mut self, old: &Rc<Expression>) {
        write_expression(self, old);
    }

    fn write_statement(&mut self, old: &Rc<Statement>) {
        write_statement(self, old);
    }
}
