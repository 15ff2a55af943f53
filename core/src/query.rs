//! Query Specifications and their URL serialization.
//!
//! # Design
//! A [`Query`] is built declaratively with consuming builder methods and never
//! mutated afterwards; it is plain data with no identity beyond its content.
//! `to_query_string` serializes it into the JSON:API bracketed-parameter
//! convention (`filter[x][path]`, `filter[x][condition][operator]`,
//! `fields[type]`, `page[limit]`, ...). Multi-valued members serialize as
//! repeated bare keys — `k=a&k=b`, never `k[0]=a&k[1]=b` — which is the array
//! convention the backend deserializes. `include`, `fields` and `sort` follow
//! the JSON:API comma-separated form.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything outside the RFC 3986 unreserved set is percent-encoded, in both
/// keys and values.
const QUERY_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, QUERY_ENCODE).to_string()
}

/// A scalar or multi-valued query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::One(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::One(value)
    }
}

impl From<u64> for QueryValue {
    fn from(value: u64) -> Self {
        QueryValue::One(value.to_string())
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::Many(values)
    }
}

/// A named filter predicate.
///
/// `Value` is the direct `{path, value}` equality shape; `Condition` is the
/// `{condition: {path, value, operator}}` comparison shape. A condition
/// without an operator leaves the comparison to the server default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Value {
        path: String,
        value: QueryValue,
    },
    Condition {
        path: String,
        value: QueryValue,
        operator: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Page {
    limit: Option<u64>,
    offset: Option<u64>,
}

/// An immutable specification of one content query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    page: Page,
    filter: Vec<(String, Filter)>,
    include: Vec<String>,
    fields: Vec<(String, Vec<String>)>,
    sort: Option<String>,
    params: Vec<(String, QueryValue)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_limit(mut self, limit: u64) -> Self {
        self.page.limit = Some(limit);
        self
    }

    pub fn page_offset(mut self, offset: u64) -> Self {
        self.page.offset = Some(offset);
        self
    }

    /// Add a direct-equality filter: `filter[name][path]` / `filter[name][value]`.
    pub fn filter(mut self, name: &str, path: &str, value: impl Into<QueryValue>) -> Self {
        self.filter.push((
            name.to_string(),
            Filter::Value {
                path: path.to_string(),
                value: value.into(),
            },
        ));
        self
    }

    /// Add a condition filter: `filter[name][condition][path]` / `[value]` /
    /// optional `[operator]`.
    pub fn filter_condition(
        mut self,
        name: &str,
        path: &str,
        value: impl Into<QueryValue>,
        operator: Option<&str>,
    ) -> Self {
        self.filter.push((
            name.to_string(),
            Filter::Condition {
                path: path.to_string(),
                value: value.into(),
                operator: operator.map(str::to_string),
            },
        ));
        self
    }

    /// Relationship paths to expand, comma-joined on the wire.
    pub fn include<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Sparse fieldset for one resource type: `fields[type]=a,b,c`.
    pub fn fields<I, S>(mut self, resource_type: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.push((
            resource_type.to_string(),
            names.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Sort field name, `-`-prefixed for descending order.
    pub fn sort(mut self, field: &str) -> Self {
        self.sort = Some(field.to_string());
        self
    }

    /// A bare top-level parameter (`path=...`, `_format=json`, ...).
    pub fn param(mut self, name: &str, value: impl Into<QueryValue>) -> Self {
        self.params.push((name.to_string(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.page == Page::default()
            && self.filter.is_empty()
            && self.include.is_empty()
            && self.fields.is_empty()
            && self.sort.is_none()
            && self.params.is_empty()
    }

    /// Deterministic URL-encoded serialization. Empty queries yield `""`.
    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if let Some(limit) = self.page.limit {
            push_value(&mut parts, "page[limit]", &QueryValue::One(limit.to_string()));
        }
        if let Some(offset) = self.page.offset {
            push_value(&mut parts, "page[offset]", &QueryValue::One(offset.to_string()));
        }

        for (name, filter) in &self.filter {
            match filter {
                Filter::Value { path, value } => {
                    push_value(&mut parts, &format!("filter[{name}][path]"), &path.as_str().into());
                    push_value(&mut parts, &format!("filter[{name}][value]"), value);
                }
                Filter::Condition { path, value, operator } => {
                    push_value(
                        &mut parts,
                        &format!("filter[{name}][condition][path]"),
                        &path.as_str().into(),
                    );
                    push_value(&mut parts, &format!("filter[{name}][condition][value]"), value);
                    if let Some(operator) = operator {
                        push_value(
                            &mut parts,
                            &format!("filter[{name}][condition][operator]"),
                            &operator.as_str().into(),
                        );
                    }
                }
            }
        }

        if !self.include.is_empty() {
            push_value(&mut parts, "include", &self.include.join(",").into());
        }
        for (resource_type, names) in &self.fields {
            push_value(
                &mut parts,
                &format!("fields[{resource_type}]"),
                &names.join(",").into(),
            );
        }
        if let Some(sort) = &self.sort {
            push_value(&mut parts, "sort", &sort.as_str().into());
        }
        for (name, value) in &self.params {
            push_value(&mut parts, name, value);
        }

        parts.join("&")
    }
}

/// Append `key=value` pairs; multi-valued entries repeat the bare key with no
/// index suffix.
fn push_value(parts: &mut Vec<String>, key: &str, value: &QueryValue) {
    let key = encode(key);
    match value {
        QueryValue::One(v) => parts.push(format!("{key}={}", encode(v))),
        QueryValue::Many(vs) => {
            for v in vs {
                parts.push(format!("{key}={}", encode(v)));
            }
        }
    }
}
