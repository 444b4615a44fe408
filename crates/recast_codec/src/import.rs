//! Import session.
//!
//! [`XmlDecoder`] replays a document written by the export session. Each
//! element becomes an [`Elem`] on a stack; an element executes either when a
//! child needs its result as a target or when it closes, and the results of
//! closed expression elements left on the stack are the arguments of their
//! parent. Whatever remains at the bottom of the stack once the document is
//! consumed are the roots, pulled in order by [`XmlDecoder::read_object`].

use crate::config::CodecConfig;
use crate::error::{CodecError, CodecResult};
use crate::reader::{Event, TagReader};
use indexmap::IndexMap;
use recast_core::{Expression, RecastError, RecastResult, SessionId, Value, resolve, types};
use recast_persist::{FaultSink, LogFaultSink};
use std::collections::HashMap;
use std::io::Read;

const LEAF_TAGS: [&str; 11] = [
    "boolean", "byte", "char", "class", "double", "float", "int", "long", "short", "string", "null",
];

/// How an element names its operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Via {
    Method,
    Property,
    Index,
    Field,
    Owner,
}

/// One parsed element awaiting or holding its result
#[derive(Debug)]
struct Elem {
    position: usize,
    id: Option<String>,
    idref: Option<String>,
    leaf: Option<String>,
    expression: bool,
    executed: bool,
    closed: bool,
    target: Value,
    method: String,
    via: Via,
    text: String,
    result: Value,
}

impl Elem {
    fn new(position: usize, attributes: &IndexMap<String, String>) -> Self {
        Self {
            position,
            id: attributes.get("id").cloned(),
            idref: None,
            leaf: None,
            expression: false,
            executed: false,
            closed: false,
            target: Value::Null,
            method: resolve::NEW.to_string(),
            via: Via::Method,
            text: String::new(),
            result: Value::Null,
        }
    }
}

/// Reads object graphs back from a tagged tree
pub struct XmlDecoder<R: Read> {
    source: Option<R>,
    config: CodecConfig,
    owner: Value,
    sink: Box<dyn FaultSink>,
    session: SessionId,
    parsed: bool,
    in_root: bool,
    skip_depth: usize,
    stack: Vec<Elem>,
    cursor: usize,
    ids: HashMap<String, Value>,
}

impl<R: Read> XmlDecoder<R> {
    /// Import session over `source` with the default configuration
    #[must_use]
    pub fn new(source: R) -> Self {
        Self::with_config(source, CodecConfig::default())
    }

    /// Import session over `source`
    #[must_use]
    pub fn with_config(source: R, config: CodecConfig) -> Self {
        Self {
            source: Some(source),
            config,
            owner: Value::Null,
            sink: Box::new(LogFaultSink),
            session: SessionId::new(),
            parsed: false,
            in_root: false,
            skip_depth: 0,
            stack: Vec::new(),
            cursor: 0,
            ids: HashMap::new(),
        }
    }

    /// Set the external owner object
    #[must_use]
    pub fn with_owner(mut self, owner: Value) -> Self {
        self.owner = owner;
        self
    }

    /// Replace the fault sink
    #[must_use]
    pub fn with_fault_sink(mut self, sink: impl FaultSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Set the external owner object
    pub fn set_owner(&mut self, owner: Value) {
        self.owner = owner;
    }

    /// The external owner object; null when none was set
    #[must_use]
    pub fn owner(&self) -> &Value {
        &self.owner
    }

    /// Next completed root, in document order.
    ///
    /// The whole document is read and executed on the first call.
    ///
    /// # Errors
    ///
    /// `OutOfRoots` once every completed root has been returned, `Io` if the
    /// source fails, `Closed` if the session was closed before reading
    pub fn read_object(&mut self) -> CodecResult<Value> {
        if !self.parsed {
            self.parse()?;
        }
        match self.stack.get(self.cursor) {
            Some(elem) if elem.closed => {
                let result = elem.result.clone();
                self.cursor += 1;
                Ok(result)
            }
            _ => Err(RecastError::OutOfRoots.into()),
        }
    }

    /// Every remaining root
    ///
    /// # Errors
    ///
    /// Same as [`XmlDecoder::read_object`], except that running out of roots
    /// ends the list
    pub fn read_all(&mut self) -> CodecResult<Vec<Value>> {
        let mut roots = Vec::new();
        loop {
            match self.read_object() {
                Ok(root) => roots.push(root),
                Err(err) if err.is_out_of_roots() => return Ok(roots),
                Err(err) => return Err(err),
            }
        }
    }

    /// Release the source; roots already read stay available
    pub fn close(&mut self) {
        self.source = None;
    }

    fn report(&mut self, error: RecastError) {
        tracing::debug!(session = %self.session, error = %error, "import fault");
        self.sink.fault(error);
    }

    fn parse(&mut self) -> CodecResult<()> {
        let Some(mut source) = self.source.take() else {
            return Err(CodecError::Closed);
        };
        self.parsed = true;
        let mut text = String::new();
        source.read_to_string(&mut text)?;

        let span = tracing::debug_span!("import", session = %self.session);
        let _entered = span.enter();
        for token in TagReader::new(&text) {
            let (position, event) = match token {
                Ok(token) => token,
                Err(err) => {
                    self.report(err);
                    break;
                }
            };
            match event {
                Event::Start {
                    name,
                    attributes,
                    empty,
                } => {
                    if self.skip_depth > 0 {
                        if !empty {
                            self.skip_depth += 1;
                        }
                        continue;
                    }
                    let accepted = self.start_element(position, &name, &attributes);
                    if !accepted {
                        if !empty {
                            self.skip_depth = 1;
                        }
                    } else if empty {
                        self.end_element(position, &name);
                    }
                }
                Event::End { name } => {
                    if self.skip_depth > 0 {
                        self.skip_depth -= 1;
                        continue;
                    }
                    self.end_element(position, &name);
                }
                Event::Text(text) => self.characters(&text),
            }
        }
        tracing::debug!(roots = self.stack.len(), ids = self.ids.len(), "document executed");
        Ok(())
    }

    fn characters(&mut self, text: &str) {
        if !self.in_root || self.skip_depth > 0 {
            return;
        }
        if let Some(elem) = self.stack.last_mut() {
            if elem.leaf.is_some() && !elem.closed {
                elem.text.push_str(text);
            }
        }
    }

    /// Returns `false` when the element and its subtree are skipped
    fn start_element(&mut self, position: usize, name: &str, attributes: &IndexMap<String, String>) -> bool {
        if !self.in_root {
            if name == self.config.root_tag {
                self.in_root = true;
                return true;
            }
            self.report(RecastError::malformed(
                position,
                format!("expected <{}> root, found <{}>", self.config.root_tag, name),
            ));
            return false;
        }
        match name {
            "object" => self.start_object(position, attributes),
            "array" => self.start_array(position, attributes),
            "void" => self.start_void(position, attributes),
            leaf if LEAF_TAGS.contains(&leaf) => self.start_leaf(position, leaf, attributes),
            other => {
                self.report(RecastError::malformed(position, format!("unknown element <{}>", other)));
                return false;
            }
        }
        true
    }

    fn start_object(&mut self, position: usize, attributes: &IndexMap<String, String>) {
        let mut elem = Elem::new(position, attributes);
        elem.expression = true;
        elem.idref = attributes.get("idref").cloned();
        if elem.idref.is_none() {
            self.obtain_target(&mut elem, attributes);
            obtain_method(&mut elem, attributes);
        }
        self.stack.push(elem);
    }

    fn start_void(&mut self, position: usize, attributes: &IndexMap<String, String>) {
        let mut elem = Elem::new(position, attributes);
        self.obtain_target(&mut elem, attributes);
        obtain_method(&mut elem, attributes);
        self.stack.push(elem);
    }

    fn start_array(&mut self, position: usize, attributes: &IndexMap<String, String>) {
        let mut elem = Elem::new(position, attributes);
        elem.expression = true;
        let component = attributes
            .get("class")
            .ok_or_else(|| RecastError::malformed(position, "array without class"))
            .and_then(|name| types::require(name));
        let allocated = component.and_then(|component| match attributes.get("length") {
            Some(length) => {
                let length = length.trim().parse::<usize>().map_err(|_| {
                    RecastError::malformed(position, format!("bad array length {:?}", length))
                })?;
                Ok(Some(Value::array_of_len(&component, length)))
            }
            None => {
                elem.target = Value::Type(component);
                elem.method = resolve::NEW_ARRAY.to_string();
                Ok(None)
            }
        });
        match allocated {
            Ok(Some(array)) => self.preset(&mut elem, array),
            Ok(None) => {}
            Err(err) => {
                self.report(err);
                self.preset(&mut elem, Value::Null);
            }
        }
        self.stack.push(elem);
    }

    fn start_leaf(&mut self, position: usize, tag: &str, attributes: &IndexMap<String, String>) {
        let mut elem = Elem::new(position, attributes);
        elem.expression = true;
        elem.leaf = Some(tag.to_string());
        elem.idref = attributes.get("idref").cloned();
        self.stack.push(elem);
    }

    fn preset(&mut self, elem: &mut Elem, result: Value) {
        if let Some(id) = &elem.id {
            self.ids.insert(id.clone(), result.clone());
        }
        elem.result = result;
        elem.executed = true;
    }

    fn obtain_target(&mut self, elem: &mut Elem, attributes: &IndexMap<String, String>) {
        if let Some(name) = attributes.get("class") {
            match types::require(name) {
                Ok(class) => elem.target = Value::Type(class),
                Err(err) => self.report(err),
            }
            return;
        }
        elem.target = match self.latest_unclosed() {
            Some(parent) => self.execute(parent),
            None => self.owner.clone(),
        };
    }

    fn end_element(&mut self, position: usize, name: &str) {
        if !self.in_root {
            return;
        }
        if name == self.config.root_tag {
            self.in_root = false;
            return;
        }
        let Some(index) = self.latest_unclosed() else {
            self.report(RecastError::malformed(position, format!("unbalanced </{}>", name)));
            return;
        };
        self.execute(index);
        self.stack.truncate(index + 1);
        if let Some(mut elem) = self.stack.pop() {
            elem.closed = true;
            if elem.expression {
                self.stack.push(elem);
            }
        }
    }

    fn latest_unclosed(&self) -> Option<usize> {
        self.stack.iter().rposition(|elem| !elem.closed)
    }

    fn execute(&mut self, index: usize) -> Value {
        if self.stack[index].executed {
            return self.stack[index].result.clone();
        }
        let outcome = if let Some(idref) = &self.stack[index].idref {
            self.ids.get(idref).cloned().ok_or_else(|| {
                RecastError::malformed(self.stack[index].position, format!("unknown idref {:?}", idref))
            })
        } else if self.stack[index].leaf.is_some() {
            execute_leaf(&self.stack[index])
        } else {
            self.execute_common(index)
        };
        let result = outcome.unwrap_or_else(|err| {
            self.report(err);
            Value::Null
        });
        let elem = &mut self.stack[index];
        if let Some(id) = &elem.id {
            self.ids.insert(id.clone(), result.clone());
        }
        elem.result = result.clone();
        elem.executed = true;
        result
    }

    fn execute_common(&mut self, index: usize) -> RecastResult<Value> {
        let mut args: Vec<Value> = self.stack.drain(index + 1..).map(|elem| elem.result).collect();
        let elem = &self.stack[index];
        let target = elem.target.clone();
        let mut method = elem.method.clone();
        if elem.via == Via::Property && method == "owner" && target.same(&self.owner) {
            return Ok(self.owner.clone());
        }
        match elem.via {
            Via::Method => {}
            Via::Property => {
                let prefix = if args.is_empty() { "get" } else { "set" };
                method = accessor(prefix, &method);
            }
            Via::Index => {
                let position = elem.position;
                let slot = method.trim().parse::<i32>().map_err(|_| {
                    RecastError::malformed(position, format!("bad index {:?}", method))
                })?;
                args.insert(0, Value::Int(slot));
                let operation = if args.len() == 1 { resolve::GET } else { resolve::SET };
                method = operation.to_string();
            }
            Via::Field => {
                return Expression::new(target, resolve::GET_FIELD, vec![Value::text(&method)]).evaluate();
            }
            Via::Owner => return Ok(self.owner.clone()),
        }

        if target.same(&self.owner) {
            if method == "getOwner" {
                return Ok(self.owner.clone());
            }
            return resolve::invoke_best_effort(&target, &method, &args);
        }
        Expression::new(target, method, args).evaluate()
    }
}

fn obtain_method(elem: &mut Elem, attributes: &IndexMap<String, String>) {
    let named = [
        ("method", Via::Method),
        ("property", Via::Property),
        ("index", Via::Index),
        ("field", Via::Field),
        ("owner", Via::Owner),
    ]
    .into_iter()
    .find_map(|(attribute, via)| attributes.get(attribute).map(|name| (name.clone(), via)));
    if let Some((name, via)) = named {
        elem.method = name;
        elem.via = via;
    }
}

fn execute_leaf(elem: &Elem) -> RecastResult<Value> {
    let tag = elem.leaf.as_deref().unwrap_or("null");
    let text = elem.text.as_str();
    match tag {
        "null" => Ok(Value::Null),
        "string" => Ok(Value::text(text)),
        "class" => types::require(text.trim()).map(Value::Type),
        "char" => Value::parse_as("char", text)
            .map_err(|err| RecastError::malformed(elem.position, err.to_string())),
        scalar => Value::parse_as(scalar, text.trim())
            .map_err(|err| RecastError::malformed(elem.position, err.to_string())),
    }
}

fn accessor(prefix: &str, property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("{}{}{}", prefix, first.to_uppercase(), chars.as_str()),
        None => prefix.to_string(),
    }
}
