//! The binder's output: declared fields with an explicit "not set" state.

use std::collections::BTreeMap;

use scalegrid_core::{Fault, FaultResult};

use crate::schema::{FieldDecl, Kind, Schema};

/// A converted parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Object(Bound),
}

impl Value {
    /// Empty values (`""`, `0`, an object with nothing set) count as
    /// "not provided".
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Str(s) => s.is_empty(),
            Value::Int(n) => *n == 0,
            Value::Object(b) => b.is_empty(),
        }
    }
}

/// A request bound against a [`Schema`].
///
/// Reads of unset optional fields return `None`. Reading an undeclared
/// field, or a required field that is unset, is a schema bug and comes back
/// as `InternalFailure`.
#[derive(Debug, Clone)]
pub struct Bound {
    schema: Schema,
    scalars: BTreeMap<&'static str, Value>,
    lists: BTreeMap<&'static str, Vec<Value>>,
}

impl PartialEq for Bound {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name()
            && self.scalars == other.scalars
            && self.lists == other.lists
    }
}

impl Bound {
    pub(crate) fn new(schema: Schema) -> Self {
        Self {
            schema,
            scalars: BTreeMap::new(),
            lists: BTreeMap::new(),
        }
    }

    pub(crate) fn set(&mut self, key: &'static str, value: Value) {
        self.scalars.insert(key, value);
    }

    pub(crate) fn push(&mut self, key: &'static str, value: Value) {
        self.lists.entry(key).or_default().push(value);
    }

    pub fn schema_name(&self) -> &'static str {
        self.schema.name()
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty() && self.lists.is_empty()
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.scalars.contains_key(key) || self.lists.contains_key(key)
    }

    fn decl(&self, key: &str, list: bool) -> FaultResult<&FieldDecl> {
        let decl = self.schema.field(key).ok_or_else(|| {
            Fault::internal(format!("{} does not declare {key}", self.schema.name()))
        })?;
        if decl.list != list {
            let shape = if decl.list { "a list group" } else { "a scalar" };
            return Err(Fault::internal(format!(
                "{}.{key} is declared as {shape}",
                self.schema.name()
            )));
        }
        Ok(decl)
    }

    /// Scalar value, or `None` when not provided.
    pub fn value(&self, key: &str) -> FaultResult<Option<&Value>> {
        let decl = self.decl(key, false)?;
        match self.scalars.get(key) {
            Some(v) => Ok(Some(v)),
            None if decl.required && !matches!(decl.kind, Kind::Ignored) => Err(Fault::internal(
                format!("required field {}.{key} read before it was bound", self.schema.name()),
            )),
            None => Ok(None),
        }
    }

    /// List-group elements, or `None` when no parameter matched the prefix.
    pub fn list(&self, key: &str) -> FaultResult<Option<&[Value]>> {
        self.decl(key, true)?;
        Ok(self.lists.get(key).map(Vec::as_slice))
    }

    pub fn opt_str(&self, key: &str) -> FaultResult<Option<String>> {
        match self.value(key)? {
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.mismatch(key, "a string", other)),
            None => Ok(None),
        }
    }

    pub fn req_str(&self, key: &str) -> FaultResult<String> {
        self.opt_str(key)?.ok_or_else(|| self.unset(key))
    }

    pub fn opt_int(&self, key: &str) -> FaultResult<Option<i64>> {
        match self.value(key)? {
            Some(Value::Int(n)) => Ok(Some(*n)),
            Some(other) => Err(self.mismatch(key, "an integer", other)),
            None => Ok(None),
        }
    }

    pub fn req_int(&self, key: &str) -> FaultResult<i64> {
        self.opt_int(key)?.ok_or_else(|| self.unset(key))
    }

    pub fn opt_object(&self, key: &str) -> FaultResult<Option<&Bound>> {
        match self.value(key)? {
            Some(Value::Object(b)) => Ok(Some(b)),
            Some(other) => Err(self.mismatch(key, "an object", other)),
            None => Ok(None),
        }
    }

    /// String list; an absent group reads back as empty.
    pub fn str_list(&self, key: &str) -> FaultResult<Vec<String>> {
        let Some(values) = self.list(key)? else {
            return Ok(Vec::new());
        };
        values
            .iter()
            .map(|v| match v {
                Value::Str(s) => Ok(s.clone()),
                other => Err(self.mismatch(key, "a string", other)),
            })
            .collect()
    }

    /// Nested-element list; an absent group reads back as empty.
    pub fn object_list(&self, key: &str) -> FaultResult<Vec<&Bound>> {
        let Some(values) = self.list(key)? else {
            return Ok(Vec::new());
        };
        values
            .iter()
            .map(|v| match v {
                Value::Object(b) => Ok(b),
                other => Err(self.mismatch(key, "an object", other)),
            })
            .collect()
    }

    fn unset(&self, key: &str) -> Fault {
        Fault::internal(format!("{}.{key} is not set", self.schema.name()))
    }

    fn mismatch(&self, key: &str, expected: &str, got: &Value) -> Fault {
        Fault::internal(format!(
            "{}.{key} holds {got:?}, expected {expected}",
            self.schema.name()
        ))
    }
}
