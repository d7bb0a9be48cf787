//! The binding algorithm.
//!
//! ```text
//! 1. required keys (scalars ∪ list groups) must all be present
//! 2. list groups: every key starting with the group prefix is converted
//!    and appended in scan order
//! 3. scalars: convert by kind; empty results stay unset
//! 4. required scalars that ended up unset are reported missing
//! ```

use indexmap::IndexMap;
use scalegrid_core::{Fault, FaultResult};
use tracing::trace;

use crate::bound::{Bound, Value};
use crate::params::Params;
use crate::schema::{FieldDecl, Kind, Schema};

/// Bind `params` against `schema`.
pub fn bind(schema: &Schema, params: &Params) -> FaultResult<Bound> {
    check_required(schema, params)?;

    let mut bound = Bound::new(schema.clone());
    bind_lists(schema, params, &mut bound)?;
    bind_scalars(schema, params, &mut bound)?;

    let unset: Vec<&str> = schema
        .scalars()
        .filter(|f| f.required && !matches!(f.kind, Kind::Ignored) && !bound.is_set(f.key))
        .map(|f| f.key)
        .collect();
    if !unset.is_empty() {
        return Err(Fault::missing(format!("{} has no value", describe_keys(&unset))));
    }

    trace!(schema = schema.name(), params = params.len(), "request bound");
    Ok(bound)
}

fn check_required(schema: &Schema, params: &Params) -> FaultResult<()> {
    let missing: Vec<&str> = schema
        .required_keys()
        .into_iter()
        .filter(|key| schema.field(key).is_some_and(|decl| !is_present(decl, params)))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Fault::missing(format!("{} missing", describe_keys(&missing))))
    }
}

fn is_present(decl: &FieldDecl, params: &Params) -> bool {
    if decl.list {
        return params.has_prefix(decl.key);
    }
    match decl.kind {
        Kind::Nested(_) => {
            params.contains_key(decl.key) || params.has_prefix(&format!("{}.", decl.key))
        }
        _ => params.contains_key(decl.key),
    }
}

fn describe_keys(keys: &[&str]) -> String {
    match keys {
        [one] => format!("parameter {one}"),
        many => format!("parameters {}", many.join(", ")),
    }
}

/// A nested list element being collected from the scan.
struct PendingElement {
    make: fn() -> Schema,
    payload: Params,
}

fn bind_lists(schema: &Schema, params: &Params, bound: &mut Bound) -> FaultResult<()> {
    let lists: Vec<&FieldDecl> = schema.lists().collect();
    // keyed by (list, element id), in order of first appearance
    let mut pending: IndexMap<(&'static str, String), PendingElement> = IndexMap::new();

    for (key, raw) in params.iter() {
        for decl in &lists {
            let Some(suffix) = key.strip_prefix(decl.key) else {
                continue;
            };
            match decl.kind {
                Kind::Ignored => {}
                Kind::Str | Kind::Int => {
                    if let Some(value) = convert(key, raw, decl.kind)? {
                        bound.push(decl.key, value);
                    }
                }
                Kind::Nested(make) => {
                    let (id, field) = split_element(suffix).ok_or_else(|| {
                        Fault::invalid(format!(
                            "parameter {key} does not address a field of {}",
                            decl.key
                        ))
                    })?;
                    pending
                        .entry((decl.key, id))
                        .or_insert_with(|| PendingElement {
                            make,
                            payload: Params::new(),
                        })
                        .payload
                        .insert(field, raw);
                }
            }
        }
    }

    for ((list, _), element) in pending {
        let nested = bind(&(element.make)(), &element.payload)?;
        if !nested.is_empty() {
            bound.push(list, Value::Object(nested));
        }
    }
    Ok(())
}

fn bind_scalars(schema: &Schema, params: &Params, bound: &mut Bound) -> FaultResult<()> {
    for decl in schema.scalars() {
        match decl.kind {
            Kind::Ignored => {}
            Kind::Nested(make) => {
                let payload = params.nested(decl.key);
                if payload.is_empty() {
                    continue;
                }
                let nested = bind(&make(), &payload)?;
                if !nested.is_empty() {
                    bound.set(decl.key, Value::Object(nested));
                }
            }
            Kind::Str | Kind::Int => {
                let Some(raw) = params.get(decl.key) else {
                    continue;
                };
                if let Some(value) = convert(decl.key, raw, decl.kind)? {
                    bound.set(decl.key, value);
                }
            }
        }
    }
    Ok(())
}

/// Convert a raw value by kind. Empty input and empty results (`""`, `0`)
/// come back as `None`: not provided.
fn convert(key: &str, raw: &str, kind: Kind) -> FaultResult<Option<Value>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let value = match kind {
        Kind::Int => raw.parse::<i64>().map(Value::Int).map_err(|_| {
            Fault::invalid(format!("parameter {key} value '{raw}' is not an integer"))
        })?,
        _ => Value::Str(raw.to_string()),
    };
    Ok((!value.is_empty()).then_some(value))
}

/// Split a list-member suffix into (element id, field key).
///
/// The element id runs up to and including the first numeric segment
/// (`.member.1` in `.member.1.Ebs.VolumeSize`); without one, the last
/// segment is the field.
fn split_element(suffix: &str) -> Option<(String, String)> {
    let segments: Vec<&str> = suffix.split('.').collect();
    let index = segments
        .iter()
        .position(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()));

    let (id, field) = match index {
        Some(i) if i + 1 < segments.len() => {
            (segments[..=i].join("."), segments[i + 1..].join("."))
        }
        Some(_) => return None,
        None => {
            let (id, field) = suffix.rsplit_once('.')?;
            (id.to_string(), field.to_string())
        }
    };
    (!field.is_empty()).then_some((id, field))
}
