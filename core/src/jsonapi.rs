//! JSON:API denormalization.
//!
//! Resolves relationship references and `included` resources into a single
//! nested plain-object tree: each resource becomes `{id, type, ...attributes,
//! ...relationships}` with every relationship replaced by the denormalized
//! related resource. Related resources are looked up in `included` and in the
//! primary data itself; a reference with no matching resource degrades to its
//! `{type, id}` identifier stub, and reference cycles stop at the stub rather
//! than recursing forever.

use serde_json::{json, Map, Value};

/// Decode a response body: the denormalized `data` member when the body is a
/// usable JSON:API document, otherwise the input unchanged.
pub fn decode_response(raw: Value) -> Value {
    match decode_document(&raw) {
        Some(data) => data,
        None => raw,
    }
}

/// Denormalize a JSON:API document. Returns `None` when `document` is not an
/// object with a `data` member.
pub fn decode_document(document: &Value) -> Option<Value> {
    let data = document.as_object()?.get("data")?;

    let mut pool: Vec<&Value> = document
        .get("included")
        .and_then(Value::as_array)
        .map(|included| included.iter().collect())
        .unwrap_or_default();

    match data {
        Value::Null => Some(Value::Null),
        Value::Object(_) => {
            pool.push(data);
            let mut in_flight = Vec::new();
            Some(resolve(data, &pool, &mut in_flight))
        }
        Value::Array(resources) => {
            pool.extend(resources.iter());
            let mut in_flight = Vec::new();
            Some(Value::Array(
                resources
                    .iter()
                    .map(|resource| resolve(resource, &pool, &mut in_flight))
                    .collect(),
            ))
        }
        _ => None,
    }
}

fn identity(resource: &Value) -> (String, String) {
    let get = |key: &str| {
        resource
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    (get("type"), get("id"))
}

fn stub(resource_type: &str, id: &str) -> Value {
    json!({ "type": resource_type, "id": id })
}

/// Flatten one resource object, recursing into its relationships.
/// `in_flight` holds the identities currently being resolved on this path.
fn resolve(resource: &Value, pool: &[&Value], in_flight: &mut Vec<(String, String)>) -> Value {
    let key = identity(resource);
    if in_flight.contains(&key) {
        return stub(&key.0, &key.1);
    }
    in_flight.push(key.clone());

    let mut out = Map::new();
    out.insert("type".to_string(), Value::String(key.0));
    out.insert("id".to_string(), Value::String(key.1));

    if let Some(attributes) = resource.get("attributes").and_then(Value::as_object) {
        for (name, value) in attributes {
            out.insert(name.clone(), value.clone());
        }
    }

    if let Some(relationships) = resource.get("relationships").and_then(Value::as_object) {
        for (name, relationship) in relationships {
            let Some(data) = relationship.get("data") else {
                continue;
            };
            out.insert(name.clone(), resolve_reference(data, pool, in_flight));
        }
    }

    in_flight.pop();
    Value::Object(out)
}

fn resolve_reference(data: &Value, pool: &[&Value], in_flight: &mut Vec<(String, String)>) -> Value {
    match data {
        Value::Null => Value::Null,
        Value::Array(identifiers) => Value::Array(
            identifiers
                .iter()
                .map(|identifier| resolve_reference(identifier, pool, in_flight))
                .collect(),
        ),
        identifier => {
            let (resource_type, id) = identity(identifier);
            match lookup(pool, &resource_type, &id) {
                Some(resource) => resolve(resource, pool, in_flight),
                None => stub(&resource_type, &id),
            }
        }
    }
}

fn lookup<'a>(pool: &[&'a Value], resource_type: &str, id: &str) -> Option<&'a Value> {
    pool.iter().copied().find(|resource| {
        resource.get("type").and_then(Value::as_str) == Some(resource_type)
            && resource.get("id").and_then(Value::as_str) == Some(id)
    })
}
