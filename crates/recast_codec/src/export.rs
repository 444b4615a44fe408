//! Export session.
//!
//! [`XmlEncoder`] sits in the middle of the graph walk: every expression and
//! statement the delegates emit is recorded against the object it creates or
//! mutates. Nothing is written until [`XmlEncoder::flush`], which prunes
//! read-only sub-expressions, counts references, and emits one node per
//! object with ids only where an object is referenced more than once.

use crate::config::CodecConfig;
use crate::error::CodecResult;
use crate::escape::escape;
use indexmap::IndexMap;
use recast_core::{
    Expression, IdentityKey, Operation, RecastError, Statement, Value, builtins, resolve,
};
use recast_persist::FaultSink;
use recast_persist::encoder::{self, Encode, EncoderState};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::rc::Rc;

/// How one object is obtained and what happens to it afterwards
#[derive(Debug, Default)]
struct Record {
    exp: Option<Rc<Expression>>,
    id: Option<String>,
    ref_count: usize,
    stats: Vec<Operation>,
}

/// Records an object graph and writes it as a tagged tree
pub struct XmlEncoder<W: Write> {
    state: EncoderState,
    out: W,
    config: CodecConfig,
    owner: Option<Value>,
    need_owner: bool,
    records: IndexMap<IdentityKey, Record>,
    id_counters: HashMap<String, usize>,
    // roots in submission order
    pending: Vec<Value>,
    // roots emitted as statements rather than expressions
    pending_stat: Vec<Value>,
    // objects produced by their own sub-expressions, scheduled before the root
    pre_pending: Vec<Value>,
    pre_pending_cache: HashMap<IdentityKey, Vec<Value>>,
    writing_object: bool,
    has_header: bool,
    buf: String,
}

impl<W: Write> XmlEncoder<W> {
    /// Export session over `out` with the default configuration
    #[must_use]
    pub fn new(out: W) -> Self {
        Self::with_config(out, CodecConfig::default())
    }

    /// Export session over `out`
    #[must_use]
    pub fn with_config(out: W, config: CodecConfig) -> Self {
        Self {
            state: EncoderState::new(),
            out,
            config,
            owner: None,
            need_owner: false,
            records: IndexMap::new(),
            id_counters: HashMap::new(),
            pending: Vec::new(),
            pending_stat: Vec::new(),
            pre_pending: Vec::new(),
            pre_pending_cache: HashMap::new(),
            writing_object: false,
            has_header: false,
            buf: String::new(),
        }
    }

    /// Replace the fault sink
    #[must_use]
    pub fn with_fault_sink(mut self, sink: impl FaultSink + 'static) -> Self {
        self.state.set_fault_sink(sink);
        self
    }

    /// Set the external owner object
    pub fn set_owner(&mut self, owner: Value) {
        self.owner = if owner.is_null() { None } else { Some(owner) };
    }

    /// The external owner object, if any
    #[must_use]
    pub fn owner(&self) -> Option<&Value> {
        self.owner.as_ref()
    }

    /// Session state
    #[must_use]
    pub fn session(&self) -> &EncoderState {
        &self.state
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Write every pending root, then discard all session state.
    ///
    /// The root element is opened on the first flush.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails
    pub fn flush(&mut self) -> CodecResult<()> {
        let span = tracing::debug_span!("flush", session = %self.state.session());
        let _entered = span.enter();

        if !self.has_header {
            self.write_header();
            self.has_header = true;
        }

        let roots = self.pending.clone();
        for root in &roots {
            self.preprocess(root);
        }
        for root in &roots {
            self.flush_object(root, 1);
        }
        tracing::debug!(roots = roots.len(), records = self.records.len(), "flushed pending roots");

        self.pending.clear();
        self.pending_stat.clear();
        self.pre_pending.clear();
        self.pre_pending_cache.clear();
        self.records.clear();
        self.id_counters.clear();
        self.state.clear();

        let text = std::mem::take(&mut self.buf);
        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    /// Flush, close the root element and hand back the sink
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails
    pub fn close(mut self) -> CodecResult<W> {
        self.flush()?;
        let closing = format!("</{}>\n", self.config.root_tag);
        self.out.write_all(closing.as_bytes())?;
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_header(&mut self) {
        if self.config.write_declaration {
            self.buf.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        }
        let header = format!(
            "<{} version=\"{}\">\n",
            self.config.root_tag,
            escape(&self.config.version)
        );
        self.buf.push_str(&header);
    }

    fn is_owner(&self, value: &Value) -> bool {
        self.owner.as_ref().is_some_and(|owner| owner.same(value))
    }

    fn record_expression(&mut self, value: &Value, exp: &Rc<Expression>) {
        let key = value.identity_key();
        let record = self.records.entry(key).or_default();
        if record.exp.is_none()
            && record
                .stats
                .iter()
                .any(|op| matches!(op, Operation::Expression(_)))
        {
            self.pre_pending.push(value.clone());
        }
        record.exp = Some(Rc::clone(exp));
        if self.is_owner(value) {
            self.need_owner = true;
        }
        self.record_statement(Operation::Expression(Rc::clone(exp)));
    }

    // an object whose construction failed is not emitted
    fn forget_expression(&mut self, value: &Value, exp: &Rc<Expression>) {
        if let Some(record) = self.records.get_mut(&value.identity_key()) {
            if record.exp.as_ref().is_some_and(|recorded| Rc::ptr_eq(recorded, exp)) {
                record.exp = None;
            }
        }
    }

    fn record_statement(&mut self, op: Operation) {
        let target = op.statement().target();
        if !target.is_heap() {
            return;
        }
        if self.is_owner(target) {
            self.need_owner = true;
        }
        self.records
            .entry(target.identity_key())
            .or_default()
            .stats
            .push(op);
    }

    /// Walk the originating-expression chain of `value`; a chain that keeps
    /// producing equal values is a dead loop.
    fn check_dead_loop(&self, value: &Value) -> bool {
        let mut hits = 0;
        let mut visited = HashSet::new();
        let mut current = value.clone();
        loop {
            let Some(exp) = self
                .records
                .get(&current.identity_key())
                .and_then(|record| record.exp.as_ref())
            else {
                return false;
            };
            current = exp.target().clone();
            if current.is_null() {
                return false;
            }
            if current.equals(value) {
                hits += 1;
                if hits >= self.config.dead_loop_threshold {
                    return true;
                }
            }
            if !visited.insert(current.identity_key()) {
                return hits > 0;
            }
        }
    }

    fn preprocess(&mut self, value: &Value) {
        if matches!(value, Value::Type(_)) {
            return;
        }
        let key = value.identity_key();
        let (exp, stats) = match self.records.get_mut(&key) {
            Some(record) => {
                record.ref_count += 1;
                if record.ref_count > 1 {
                    return;
                }
                (record.exp.clone(), record.stats.clone())
            }
            None => return,
        };

        if let Some(exp) = exp {
            let from_field = self
                .records
                .get(&exp.target().identity_key())
                .and_then(|record| record.exp.as_ref())
                .is_some_and(|target_exp| target_exp.operation() == resolve::GET_FIELD);
            if from_field {
                self.records.shift_remove(&key);
            }
            for arg in exp.arguments() {
                self.preprocess(arg);
            }
        }

        let mut kept = Vec::with_capacity(stats.len());
        for op in stats {
            match &op {
                Operation::Expression(sub) => {
                    let Some(sub_value) = sub.known_value() else {
                        continue;
                    };
                    let sub_key = sub_value.identity_key();
                    let owns = self
                        .records
                        .get(&sub_key)
                        .and_then(|record| record.exp.as_ref())
                        .is_some_and(|sub_exp| Rc::ptr_eq(sub_exp, sub));
                    if !owns {
                        continue;
                    }
                    self.preprocess(&sub_value);
                    let untouched = self
                        .records
                        .get(&sub_key)
                        .is_none_or(|record| record.stats.is_empty());
                    if untouched && is_read(sub.statement()) {
                        continue;
                    }
                    kept.push(op.clone());
                }
                Operation::Statement(stat) => {
                    for arg in stat.arguments() {
                        self.preprocess(arg);
                    }
                    kept.push(op.clone());
                }
            }
        }
        if let Some(record) = self.records.get_mut(&key) {
            record.stats = kept;
        }
    }

    fn next_id(&mut self, value: &Value) -> String {
        let name = value
            .class()
            .map_or_else(|| "Null".to_string(), |class| class.simple_name());
        let counter = self.id_counters.entry(name.clone()).or_insert(0);
        let id = format!("{}{}", name, counter);
        *counter += 1;
        id
    }

    fn assign_id(&mut self, value: &Value) -> Option<String> {
        let key = value.identity_key();
        let needs_id = self
            .records
            .get(&key)
            .is_some_and(|record| record.ref_count > 1 && record.id.is_none());
        if !needs_id {
            return self.records.get(&key).and_then(|record| record.id.clone());
        }
        let id = self.next_id(value);
        if let Some(record) = self.records.get_mut(&key) {
            record.id = Some(id.clone());
        }
        Some(id)
    }

    fn flush_object(&mut self, value: &Value, level: usize) {
        let has_record = self.records.contains_key(&value.identity_key());
        if !has_record && !value.is_basic() {
            return;
        }
        if self.need_owner && self.is_owner(value) {
            self.flush_owner(value, level);
            self.need_owner = false;
            return;
        }
        if value.is_basic() {
            self.flush_basic(value, level);
        } else {
            let as_statement = contains(&self.pending_stat, value);
            self.flush_expression(value, level, as_statement);
        }
    }

    fn flush_basic(&mut self, value: &Value, level: usize) {
        let tag = match value {
            Value::Null => {
                self.open(level, "null", &[]);
                self.finish_open(true);
                return;
            }
            Value::Type(class) => {
                let name = class.name().to_string();
                self.leaf(level, "class", &name);
                return;
            }
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Byte(_) => "byte",
            Value::Char(_) => "char",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Object(_) | Value::Array(_) | Value::Proxy(_) => return,
        };
        let text = value.scalar_text().unwrap_or_default();
        self.leaf(level, tag, &text);
    }

    fn flush_owner(&mut self, value: &Value, level: usize) {
        let id = self.assign_id(value);
        let (args, stats) = match self.records.get(&value.identity_key()) {
            Some(record) => (
                record
                    .exp
                    .as_ref()
                    .map(|exp| exp.arguments().to_vec())
                    .unwrap_or_default(),
                record.stats.clone(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        let mut attributes = Vec::new();
        if let Some(id) = id {
            attributes.push(("id", id));
        }
        attributes.push(("property", "owner".to_string()));
        self.flush_node(level, "void", attributes, &args, &stats);
    }

    fn flush_expression(&mut self, value: &Value, level: usize, as_statement: bool) {
        let key = value.identity_key();
        let Some((exp, existing_id, stats)) = self.records.get(&key).and_then(|record| {
            record
                .exp
                .clone()
                .map(|exp| (exp, record.id.clone(), record.stats.clone()))
        }) else {
            return;
        };

        if exp.operation() == resolve::GET_FIELD {
            self.flush_field(exp.statement(), level);
            return;
        }

        if let Some(id) = existing_id {
            self.open(level, "object", &[("idref", id)]);
            self.finish_open(true);
            return;
        }

        let id = self.assign_id(value);
        self.flush_statement(exp.statement(), !as_statement, id, &stats, level);
    }

    fn flush_statement(
        &mut self,
        stat: &Statement,
        expression: bool,
        id: Option<String>,
        stats: &[Operation],
        level: usize,
    ) {
        let target = stat.target();
        let operation = stat.operation();
        let args = stat.arguments();
        let tag = if expression { "object" } else { "void" };

        if is_array_allocation(stat) {
            self.flush_array(stat, id, stats, level);
            return;
        }

        if is_indexed_read(stat) || is_indexed_write(stat) {
            let mut attributes = head(id, target);
            attributes.push(("index", args[0].scalar_text().unwrap_or_default()));
            self.flush_node(level, tag, attributes, &args[1..], stats);
            return;
        }

        if is_property_read(stat) || is_property_write(stat) {
            let mut attributes = head(id, target);
            attributes.push(("property", decapitalize(&operation[3..])));
            self.flush_node(level, tag, attributes, args, stats);
            return;
        }

        if operation == resolve::GET_FIELD {
            self.flush_field(stat, level);
            return;
        }

        let mut attributes = head(id, target);
        if operation != resolve::NEW {
            attributes.push(("method", operation.to_string()));
        }
        self.flush_node(level, tag, attributes, args, stats);
    }

    fn flush_array(&mut self, stat: &Statement, id: Option<String>, stats: &[Operation], level: usize) {
        let (Some(Value::Type(component)), Some(length)) = (stat.arguments().first(), stat.arguments().get(1))
        else {
            self.state.report(RecastError::invocation(
                resolve::NEW_INSTANCE,
                "array allocation without component and length",
            ));
            return;
        };
        let mut attributes = Vec::new();
        if let Some(id) = id {
            attributes.push(("id", id));
        }
        attributes.push(("class", component.name().to_string()));
        attributes.push(("length", length.scalar_text().unwrap_or_default()));
        self.flush_node(level, "array", attributes, &[], stats);
    }

    fn flush_field(&mut self, stat: &Statement, level: usize) {
        let target = stat.target();
        let field = match (target, stat.arguments()) {
            (Value::Type(class), [Value::Str(name)]) if class.static_field(name).is_some() => {
                Some(name.to_string())
            }
            _ => None,
        };
        let mut attributes = head(None, target);
        match field {
            Some(name) => {
                attributes.push(("field", name));
                self.open(level, "object", &attributes);
                self.finish_open(true);
            }
            None => {
                attributes.push(("method", stat.operation().to_string()));
                self.flush_node(level, "object", attributes, stat.arguments(), &[]);
            }
        }
    }

    fn flush_sub_statements(&mut self, stats: &[Operation], level: usize) {
        for op in stats {
            match op {
                Operation::Expression(sub) => {
                    if let Some(value) = sub.known_value() {
                        self.flush_expression(&value, level + 1, true);
                    }
                }
                Operation::Statement(stat) => {
                    self.flush_statement(stat, false, None, &[], level + 1);
                }
            }
        }
    }

    fn flush_node(
        &mut self,
        level: usize,
        tag: &str,
        attributes: Vec<(&str, String)>,
        args: &[Value],
        stats: &[Operation],
    ) {
        self.open(level, tag, &attributes);
        if args.is_empty() && stats.is_empty() {
            self.finish_open(true);
            return;
        }
        self.finish_open(false);
        for arg in args {
            self.flush_object(arg, level + 1);
        }
        self.flush_sub_statements(stats, level);
        self.end_tag(level, tag);
    }

    fn indent(&mut self, level: usize) {
        let width = level * self.config.indent;
        self.buf.extend(std::iter::repeat_n(' ', width));
    }

    fn open(&mut self, level: usize, tag: &str, attributes: &[(&str, String)]) {
        self.indent(level);
        self.buf.push('<');
        self.buf.push_str(tag);
        for (name, value) in attributes {
            self.buf.push(' ');
            self.buf.push_str(name);
            self.buf.push_str("=\"");
            self.buf.push_str(&escape(value));
            self.buf.push('"');
        }
    }

    fn finish_open(&mut self, empty: bool) {
        self.buf.push_str(if empty { "/>\n" } else { ">\n" });
    }

    fn end_tag(&mut self, level: usize, tag: &str) {
        self.indent(level);
        self.buf.push_str("</");
        self.buf.push_str(tag);
        self.buf.push_str(">\n");
    }

    fn leaf(&mut self, level: usize, tag: &str, text: &str) {
        self.indent(level);
        self.buf.push('<');
        self.buf.push_str(tag);
        self.buf.push('>');
        self.buf.push_str(&escape(text));
        self.buf.push_str("</");
        self.buf.push_str(tag);
        self.buf.push_str(">\n");
    }
}

impl<W: Write> Encode for XmlEncoder<W> {
    fn state(&mut self) -> &mut EncoderState {
        &mut self.state
    }

    fn write_object(&mut self, old: &Value) {
        let key = old.identity_key();
        let cached = self.pre_pending_cache.get(&key).cloned();
        match &cached {
            None => {
                let was_writing = self.writing_object;
                self.writing_object = true;
                encoder::write_object(self, old);
                self.writing_object = was_writing;
            }
            Some(pre_pending) => self.pre_pending = pre_pending.clone(),
        }

        if self.writing_object {
            return;
        }

        let not_cached = cached.is_none();
        if not_cached && !old.is_null() {
            self.pre_pending_cache.insert(key, self.pre_pending.clone());
        }
        let pre_pending = std::mem::take(&mut self.pre_pending);
        self.pending.extend(pre_pending.iter().cloned());
        self.pending_stat.extend(pre_pending);

        if not_cached && contains(&self.pending, old) {
            remove_first(&mut self.pending_stat, old);
        } else {
            self.pending.push(old.clone());
        }

        if self.need_owner {
            if let Some(owner) = self.owner.clone() {
                remove_first(&mut self.pending, &owner);
                self.pending.insert(0, owner);
            }
        }
    }

    fn write_expression(&mut self, old: &Rc<Expression>) {
        let was_writing = self.writing_object;
        self.writing_object = true;
        match old.evaluate() {
            Ok(old_value) => {
                let known = old_value.is_null() || self.state.get(&old_value).is_some();
                if !known {
                    if old_value.is_heap() {
                        self.record_expression(&old_value, old);
                    }
                    if self.check_dead_loop(&old_value) {
                        tracing::debug!(object = ?old_value, "dead loop on originating chain; skipped");
                    } else {
                        encoder::write_expression(self, old);
                        if old_value.is_heap() && self.state.get(&old_value).is_none() {
                            self.forget_expression(&old_value, old);
                        }
                    }
                }
            }
            Err(err) => self.state.report(err),
        }
        self.writing_object = was_writing;
    }

    fn write_statement(&mut self, old: &Rc<Statement>) {
        self.record_statement(Operation::Statement(Rc::clone(old)));
        encoder::write_statement(self, old);
    }
}

fn contains(values: &[Value], value: &Value) -> bool {
    values.iter().any(|v| v.same(value))
}

fn remove_first(values: &mut Vec<Value>, value: &Value) {
    if let Some(index) = values.iter().position(|v| v.same(value)) {
        values.remove(index);
    }
}

fn head(id: Option<String>, target: &Value) -> Vec<(&'static str, String)> {
    let mut attributes = Vec::new();
    if let Some(id) = id {
        attributes.push(("id", id));
    }
    if let Value::Type(class) = target {
        attributes.push(("class", class.name().to_string()));
    }
    attributes
}

fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_array_allocation(stat: &Statement) -> bool {
    stat.operation() == resolve::NEW_INSTANCE
        && matches!(stat.target(), Value::Type(class) if class.name() == builtins::ARRAY)
}

fn is_indexed_read(stat: &Statement) -> bool {
    stat.operation() == resolve::GET
        && matches!(stat.target(), Value::Array(_))
        && matches!(stat.arguments(), [Value::Int(_)])
}

fn is_indexed_write(stat: &Statement) -> bool {
    stat.operation() == resolve::SET
        && matches!(stat.target(), Value::Array(_))
        && matches!(stat.arguments(), [Value::Int(_), _])
}

/// Bean accessors only: static calls and proxy dispatch keep the method shape
fn is_property_read(stat: &Statement) -> bool {
    let op = stat.operation();
    matches!(stat.target(), Value::Object(_))
        && op.len() > 3
        && op.starts_with("get")
        && stat.arguments().is_empty()
}

fn is_property_write(stat: &Statement) -> bool {
    let op = stat.operation();
    matches!(stat.target(), Value::Object(_))
        && op.len() > 3
        && op.starts_with("set")
        && stat.arguments().len() == 1
}

fn is_read(stat: &Statement) -> bool {
    is_indexed_read(stat) || is_property_read(stat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, ITEM};
    use recast_core::{ClassBuilder, PersistenceHint, types};
    use std::cell::RefCell;
    use std::sync::Arc;

    fn export(roots: &[Value]) -> String {
        let mut encoder = XmlEncoder::new(Vec::new());
        for root in roots {
            encoder.write_object(root);
        }
        String::from_utf8(encoder.close().unwrap()).unwrap()
    }

    #[test]
    fn test_document_frame() {
        let text = export(&[]);
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<recast version=\""));
        assert!(text.ends_with("</recast>\n"));
    }

    #[test]
    fn test_configured_frame() {
        let config = CodecConfig {
            root_tag: "graph".to_string(),
            write_declaration: false,
            version: "9".to_string(),
            ..CodecConfig::default()
        };
        let encoder = XmlEncoder::with_config(Vec::new(), config);
        let text = String::from_utf8(encoder.close().unwrap()).unwrap();
        assert_eq!(text, "<graph version=\"9\">\n</graph>\n");
    }

    #[test]
    fn test_record_emits_construct_then_properties() {
        let text = export(&[fixtures::item(Some("a"), 2)]);
        let expected = format!(
            concat!(
                " <object class=\"{}\">\n",
                "  <void property=\"name\">\n",
                "   <string>a</string>\n",
                "  </void>\n",
                "  <void property=\"count\">\n",
                "   <int>2</int>\n",
                "  </void>\n",
                " </object>\n",
            ),
            ITEM
        );
        assert!(text.contains(&expected), "{}", text);
    }

    #[test]
    fn test_default_object_is_empty_node() {
        let text = export(&[fixtures::item(None, 0)]);
        assert!(text.contains(&format!(" <object class=\"{}\"/>\n", ITEM)), "{}", text);
    }

    #[test]
    fn test_leaf_roots_and_escaping() {
        let text = export(&[
            Value::text("a<b & \"c\""),
            Value::Int(7),
            Value::Bool(true),
            Value::Null,
            Value::Type(types::class_for_name(builtins::STRING).unwrap()),
        ]);
        assert!(text.contains(" <string>a&lt;b &amp; &quot;c&quot;</string>\n"));
        assert!(text.contains(" <int>7</int>\n"));
        assert!(text.contains(" <boolean>true</boolean>\n"));
        assert!(text.contains(" <null/>\n"));
        assert!(text.contains(" <class>String</class>\n"));
    }

    #[test]
    fn test_shared_object_gets_id_then_idref() {
        let shared = fixtures::item(Some("s"), 0);
        let a = fixtures::item(None, 1);
        let b = fixtures::item(None, 2);
        fixtures::set_child(&a, &shared);
        fixtures::set_child(&b, &shared);
        let text = export(&[a, b]);
        assert_eq!(text.matches("id=\"Item0\"").count(), 1, "{}", text);
        assert_eq!(text.matches("idref=\"Item0\"").count(), 1, "{}", text);
        let first = text.find("id=\"Item0\"").unwrap();
        let second = text.find("idref=\"Item0\"").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_single_reference_has_no_id() {
        let parent = fixtures::item(None, 0);
        fixtures::set_child(&parent, &fixtures::item(Some("c"), 0));
        let text = export(&[parent]);
        assert!(!text.contains("id="), "{}", text);
        assert!(text.contains("<void property=\"child\">"));
    }

    #[test]
    fn test_array_uses_array_and_index_shapes() {
        let int = types::class_for_name(builtins::INT_PRIM).unwrap();
        let array = Value::array(&int, vec![Value::Int(1), Value::Int(0), Value::Int(3)]);
        let text = export(&[array]);
        assert!(text.contains(" <array class=\"int\" length=\"3\">\n"), "{}", text);
        assert!(text.contains("  <void index=\"0\">\n   <int>1</int>\n  </void>\n"), "{}", text);
        assert!(!text.contains("index=\"1\""), "{}", text);
        assert!(text.contains("<void index=\"2\">"), "{}", text);
    }

    #[test]
    fn test_constant_uses_field_shape() {
        let class = ClassBuilder::new("codec.Mode")
            .hint(PersistenceHint::Constants)
            .static_field("FAST", || Value::object(types::class_for_name("codec.Mode").unwrap(), 1_u8))
            .equality(|a, b| {
                let a = a.with_data::<u8, _>(|v| *v).ok();
                a.is_some() && a == b.with_data::<u8, _>(|v| *v).ok()
            })
            .register();
        let text = export(&[Value::object(class, 1_u8)]);
        assert!(text.contains(" <object class=\"codec.Mode\" field=\"FAST\"/>\n"), "{}", text);
    }

    #[test]
    fn test_collection_uses_method_shape() {
        let list = resolve::invoke(
            &Value::Type(types::class_for_name(builtins::ARRAY_LIST).unwrap()),
            resolve::NEW,
            &[],
        )
        .unwrap();
        resolve::invoke(&list, "add", &[Value::text("x")]).unwrap();
        let text = export(&[list]);
        assert!(text.contains(" <object class=\"ArrayList\">\n  <void method=\"add\">\n   <string>x</string>\n"), "{}", text);
    }

    #[test]
    fn test_owner_is_emitted_first_as_owner_property() {
        let owner = fixtures::item(Some("boss"), 0);
        let root = fixtures::item(None, 4);
        fixtures::set_child(&root, &owner);

        let mut encoder = XmlEncoder::new(Vec::new());
        encoder.set_owner(owner.clone());
        encoder.write_object(&root);
        let text = String::from_utf8(encoder.close().unwrap()).unwrap();

        let owner_at = text.find("<void id=\"Item0\" property=\"owner\">").unwrap_or_else(|| panic!("{}", text));
        let root_at = text.find(&format!("<object class=\"{}\">", ITEM)).unwrap();
        assert!(owner_at < root_at);
        assert!(text.contains("<object idref=\"Item0\"/>"), "{}", text);
    }

    #[test]
    fn test_flush_resets_session() {
        let item = fixtures::item(Some("again"), 0);
        let mut encoder = XmlEncoder::new(Vec::new());
        encoder.write_object(&item);
        encoder.flush().unwrap();
        assert!(encoder.session().identities().is_empty());
        encoder.write_object(&item);
        let text = String::from_utf8(encoder.close().unwrap()).unwrap();
        assert_eq!(text.matches("<string>again</string>").count(), 2);
        assert_eq!(text.matches("<recast ").count(), 1);
    }

    #[test]
    fn test_faults_reach_sink_and_other_roots_survive() {
        let broken = ClassBuilder::new("codec.Broken")
            .constructor(&[builtins::INT_PRIM], |class, _| Ok(Value::object(Arc::clone(class), ())))
            .register();
        let faults = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&faults);
        let mut encoder = XmlEncoder::new(Vec::new()).with_fault_sink(move |_: RecastError| *seen.borrow_mut() += 1);
        encoder.write_object(&Value::object(broken, ()));
        encoder.write_object(&fixtures::item(Some("fine"), 0));
        let text = String::from_utf8(encoder.close().unwrap()).unwrap();
        assert_eq!(*faults.borrow(), 1);
        assert!(!text.contains("codec.Broken"));
        assert!(text.contains("<string>fine</string>"));
    }

    #[test]
    fn test_dead_loop_on_self_producing_chain() {
        // every `next()` returns an equal but distinct node
        struct Node;
        let class = ClassBuilder::new("codec.Chain")
            .method("next", &[], "codec.Chain", |_, _| {
                Ok(Value::object(types::class_for_name("codec.Chain").unwrap(), Node))
            })
            .equality(|a, b| a.with_data::<Node, _>(|_| ()).is_ok() && b.with_data::<Node, _>(|_| ()).is_ok())
            .register();
        let mut encoder = XmlEncoder::new(Vec::new());
        let mut current = Value::object(Arc::clone(&class), Node);
        for _ in 0..3 {
            let exp = Rc::new(Expression::new(current.clone(), "next", Vec::new()));
            let next = exp.evaluate().unwrap();
            encoder.record_expression(&next, &exp);
            current = next;
        }
        assert!(!encoder.check_dead_loop(&current));
        for _ in 0..8 {
            let exp = Rc::new(Expression::new(current.clone(), "next", Vec::new()));
            let next = exp.evaluate().unwrap();
            encoder.record_expression(&next, &exp);
            current = next;
        }
        assert!(encoder.check_dead_loop(&current));
    }

    #[test]
    fn test_cyclic_chain_terminates() {
        let a = fixtures::item(Some("a"), 0);
        let b = fixtures::item(Some("b"), 0);
        let c = fixtures::item(Some("c"), 0);
        let mut encoder = XmlEncoder::new(Vec::new());
        encoder.record_expression(&a, &Rc::new(Expression::with_value(a.clone(), b.clone(), "getChild", vec![])));
        encoder.record_expression(&b, &Rc::new(Expression::with_value(b.clone(), a.clone(), "getChild", vec![])));
        encoder.record_expression(&c, &Rc::new(Expression::with_value(c.clone(), a.clone(), "getChild", vec![])));
        assert!(!encoder.check_dead_loop(&c));
    }

    #[test]
    fn test_static_accessor_keeps_method_shape() {
        let class = Value::Type(fixtures::item_class());
        let item = fixtures::item(Some("a"), 0);
        assert!(!is_property_read(&Statement::new(class.clone(), "getInstance", vec![])));
        assert!(!is_property_write(&Statement::new(class.clone(), "setDefault", vec![item.clone()])));
        assert!(is_property_read(&Statement::new(item.clone(), "getName", vec![])));
        assert!(is_property_write(&Statement::new(item, "setName", vec![Value::text("b")])));

        let mut encoder = XmlEncoder::new(Vec::new());
        encoder.flush_statement(&Statement::new(class, "getInstance", vec![]), true, None, &[], 1);
        let text = encoder.buf.clone();
        assert!(text.contains("method=\"getInstance\""), "{}", text);
        assert!(!text.contains("property="), "{}", text);
    }

    #[test]
    fn test_decapitalize() {
        assert_eq!(decapitalize("Name"), "name");
        assert_eq!(decapitalize("URL"), "uRL");
        assert_eq!(decapitalize(""), "");
    }
}
