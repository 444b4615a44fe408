//! Operation records: pure-effect [`Statement`]s and value-producing [`Expression`]s.

use crate::error::RecastResult;
use crate::resolve;
use crate::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A call executed for its effect
#[derive(Clone)]
pub struct Statement {
    target: Value,
    operation: String,
    arguments: Vec<Value>,
}

impl Statement {
    /// Create a statement
    #[must_use]
    pub fn new(target: Value, operation: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            target,
            operation: operation.into(),
            arguments,
        }
    }

    /// Call target
    #[must_use]
    pub fn target(&self) -> &Value {
        &self.target
    }

    /// Operation name
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Ordered arguments
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Resolve and run the call, discarding the result
    ///
    /// # Errors
    ///
    /// Any resolver fault
    pub fn execute(&self) -> RecastResult<()> {
        self.invoke().map(|_| ())
    }

    pub(crate) fn invoke(&self) -> RecastResult<Value> {
        resolve::invoke(&self.target, &self.operation, &self.arguments)
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}.{}(", self.target, self.operation)?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", arg)?;
        }
        write!(f, ");")
    }
}

/// A call whose result is computed at most once
pub struct Expression {
    statement: Statement,
    value: RefCell<Option<Value>>,
}

impl Expression {
    /// Create an expression with no known result
    #[must_use]
    pub fn new(target: Value, operation: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            statement: Statement::new(target, operation, arguments),
            value: RefCell::new(None),
        }
    }

    /// Create an expression whose result is already known
    #[must_use]
    pub fn with_value(
        value: Value,
        target: Value,
        operation: impl Into<String>,
        arguments: Vec<Value>,
    ) -> Self {
        Self {
            statement: Statement::new(target, operation, arguments),
            value: RefCell::new(Some(value)),
        }
    }

    /// The underlying call
    #[must_use]
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Call target
    #[must_use]
    pub fn target(&self) -> &Value {
        self.statement.target()
    }

    /// Operation name
    #[must_use]
    pub fn operation(&self) -> &str {
        self.statement.operation()
    }

    /// Ordered arguments
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        self.statement.arguments()
    }

    /// The result: cached if known, otherwise invoked once and cached.
    ///
    /// A failed invocation leaves the result unknown.
    ///
    /// # Errors
    ///
    /// Any resolver fault
    pub fn evaluate(&self) -> RecastResult<Value> {
        if let Some(value) = self.value.borrow().as_ref() {
            return Ok(value.clone());
        }
        let value = self.statement.invoke()?;
        *self.value.borrow_mut() = Some(value.clone());
        Ok(value)
    }

    /// Inject the result, short-circuiting invocation
    pub fn set_value(&self, value: Value) {
        *self.value.borrow_mut() = Some(value);
    }

    /// The result if already known
    #[must_use]
    pub fn known_value(&self) -> Option<Value> {
        self.value.borrow().clone()
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.borrow().as_ref() {
            Some(value) => write!(f, "{:?} = {:?}", value, self.statement),
            None => write!(f, "<unbound> = {:?}", self.statement),
        }
    }
}

/// One recorded operation
#[derive(Clone, Debug)]
pub enum Operation {
    /// Pure-effect call
    Statement(Rc<Statement>),
    /// Value-producing call
    Expression(Rc<Expression>),
}

impl Operation {
    /// The call common to both shapes
    #[must_use]
    pub fn statement(&self) -> &Statement {
        match self {
            Self::Statement(s) => s,
            Self::Expression(e) => e.statement(),
        }
    }
}
