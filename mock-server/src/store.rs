//! In-memory JSON:API resource store and query engine.
//!
//! Resources are kept as JSON:API resource objects (`type`/`id`/`attributes`/
//! `relationships`) so list and get responses can be assembled directly.
//! The query engine understands the subset of the JSON:API query grammar the
//! client emits: bracketed `filter`/`page`/`fields` parameters, comma-joined
//! `include` paths, and a `-`-prefixed `sort` field.

use std::cmp::Ordering;
use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use serde_json::{json, Map, Value};

const COLLECTIONS: [&str; 6] = [
    "recipes",
    "articles",
    "categories",
    "images",
    "files",
    "contentTypes",
];

const DEFAULT_PAGE_LIMIT: usize = 50;

/// One parsed filter predicate. Direct and condition forms collapse to the
/// same shape; a missing operator means equality.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    pub path: String,
    pub value: String,
    pub operator: String,
}

/// The parsed query string of a list or single-resource request.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filters: Vec<FilterSpec>,
    pub sort: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
    pub include: Vec<String>,
    pub fields: HashMap<String, Vec<String>>,
    /// Bare top-level parameters (`path`, `_format`, ...).
    pub params: HashMap<String, String>,
}

/// Percent-decode a raw query string into key/value pairs.
pub fn decode_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (
                percent_decode_str(key).decode_utf8_lossy().into_owned(),
                percent_decode_str(value).decode_utf8_lossy().into_owned(),
            )
        })
        .collect()
}

/// Split `filter[name][path]` into `["filter", "name", "path"]`.
fn key_segments(key: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let (head, rest) = key.split_once('[').unwrap_or((key, ""));
    segments.push(head.to_string());
    for part in rest.split('[') {
        if let Some(segment) = part.strip_suffix(']') {
            segments.push(segment.to_string());
        }
    }
    segments
}

pub fn parse_list_query(raw: &str) -> ListQuery {
    let mut query = ListQuery::default();
    let mut filters: Vec<(String, FilterSpec)> = Vec::new();

    for (key, value) in decode_pairs(raw) {
        let segments = key_segments(&key);
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        match segments.as_slice() {
            ["page", "limit"] => query.limit = value.parse().ok(),
            ["page", "offset"] => query.offset = value.parse().unwrap_or(0),
            ["filter", name, member @ ("path" | "value")]
            | ["filter", name, "condition", member @ ("path" | "value" | "operator")] => {
                let spec = filter_entry(&mut filters, name);
                match *member {
                    "path" => spec.path = value,
                    "value" => spec.value = value,
                    _ => spec.operator = value,
                }
            }
            ["include"] => {
                query.include = value.split(',').map(str::to_string).collect();
            }
            ["fields", resource_type] => {
                query.fields.insert(
                    resource_type.to_string(),
                    value.split(',').map(str::to_string).collect(),
                );
            }
            ["sort"] => query.sort = Some(value),
            _ => {
                query.params.insert(key, value);
            }
        }
    }

    query.filters = filters.into_iter().map(|(_, spec)| spec).collect();
    query
}

fn filter_entry<'a>(filters: &'a mut Vec<(String, FilterSpec)>, name: &str) -> &'a mut FilterSpec {
    if !filters.iter().any(|(existing, _)| existing == name) {
        filters.push((
            name.to_string(),
            FilterSpec {
                path: String::new(),
                value: String::new(),
                operator: "=".to_string(),
            },
        ));
    }
    &mut filters
        .iter_mut()
        .find(|(existing, _)| existing == name)
        .unwrap()
        .1
}

pub struct Store {
    resources: Vec<Value>,
    /// alias path -> (collection, id)
    aliases: HashMap<String, (String, String)>,
}

pub fn has_collection(collection: &str) -> bool {
    COLLECTIONS.contains(&collection)
}

impl Store {
    /// List resources of `collection`, honoring filters, sort, paging,
    /// include and sparse fieldsets.
    pub fn list(&self, collection: &str, query: &ListQuery) -> Value {
        let mut results: Vec<&Value> = self
            .resources
            .iter()
            .filter(|resource| resource["type"] == collection)
            .filter(|resource| query.filters.iter().all(|f| self.matches(resource, f)))
            .collect();

        if let Some(sort) = &query.sort {
            let (field, descending) = match sort.strip_prefix('-') {
                Some(field) => (field.to_string(), true),
                None => (sort.clone(), false),
            };
            results.sort_by(|a, b| {
                cmp_values(self.resolve_path(a, &field), self.resolve_path(b, &field))
            });
            if descending {
                results.reverse();
            }
        }

        let page: Vec<&Value> = results
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(DEFAULT_PAGE_LIMIT))
            .collect();

        let mut included = Vec::new();
        for resource in &page {
            for path in &query.include {
                self.collect_included(resource, path, &mut included);
            }
        }

        json!({
            "data": page
                .iter()
                .map(|resource| apply_fields(resource, &query.fields))
                .collect::<Vec<_>>(),
            "included": included
                .iter()
                .map(|resource| apply_fields(resource, &query.fields))
                .collect::<Vec<_>>(),
        })
    }

    /// Fetch one resource as a single-resource document.
    pub fn get_one(&self, collection: &str, id: &str, query: &ListQuery) -> Option<Value> {
        let resource = self.find(collection, id)?;
        let mut included = Vec::new();
        for path in &query.include {
            self.collect_included(resource, path, &mut included);
        }
        Some(json!({
            "data": apply_fields(resource, &query.fields),
            "included": included
                .iter()
                .map(|resource| apply_fields(resource, &query.fields))
                .collect::<Vec<_>>(),
        }))
    }

    /// Translate an alias path to its canonical resource locator.
    pub fn translate(&self, alias: &str) -> Option<Value> {
        let (collection, id) = self.aliases.get(alias)?;
        Some(json!({
            "resolved": alias,
            "entity": { "canonical": alias, "uuid": id, "type": collection },
            "jsonapi": { "individual": format!("/api/{collection}/{id}") },
        }))
    }

    fn find(&self, collection: &str, id: &str) -> Option<&Value> {
        self.resources
            .iter()
            .find(|resource| resource["type"] == collection && resource["id"] == id)
    }

    /// Walk a dotted path: attribute segments terminate, relationship
    /// segments hop to the related resource.
    fn resolve_path(&self, resource: &Value, path: &str) -> Option<Value> {
        let segments: Vec<&str> = path.split('.').collect();
        let mut current = resource;
        for (position, segment) in segments.iter().enumerate() {
            if let Some(attribute) = current.get("attributes").and_then(|a| a.get(*segment)) {
                return (position == segments.len() - 1).then(|| attribute.clone());
            }
            let identifier = current.get("relationships")?.get(*segment)?.get("data")?;
            current = self.find(
                identifier.get("type")?.as_str()?,
                identifier.get("id")?.as_str()?,
            )?;
        }
        None
    }

    fn matches(&self, resource: &Value, filter: &FilterSpec) -> bool {
        let Some(actual) = self.resolve_path(resource, &filter.path) else {
            return false;
        };
        match filter.operator.as_str() {
            "<" => match (actual.as_f64(), filter.value.parse::<f64>()) {
                (Some(actual), Ok(threshold)) => actual < threshold,
                _ => false,
            },
            ">" => match (actual.as_f64(), filter.value.parse::<f64>()) {
                (Some(actual), Ok(threshold)) => actual > threshold,
                _ => false,
            },
            _ => loose_eq(&actual, &filter.value),
        }
    }

    /// Gather the resources along one include path, deduplicated.
    fn collect_included(&self, resource: &Value, path: &str, out: &mut Vec<Value>) {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let Some(data) = resource
            .get("relationships")
            .and_then(|relationships| relationships.get(head))
            .and_then(|relationship| relationship.get("data"))
        else {
            return;
        };
        let identifiers: Vec<&Value> = match data {
            Value::Array(identifiers) => identifiers.iter().collect(),
            Value::Null => Vec::new(),
            identifier => vec![identifier],
        };
        for identifier in identifiers {
            let Some(found) = identifier
                .get("type")
                .and_then(Value::as_str)
                .zip(identifier.get("id").and_then(Value::as_str))
                .and_then(|(collection, id)| self.find(collection, id))
            else {
                continue;
            };
            if !out
                .iter()
                .any(|existing| existing["type"] == found["type"] && existing["id"] == found["id"])
            {
                out.push(found.clone());
            }
            if let Some(rest) = rest {
                self.collect_included(found, rest, out);
            }
        }
    }
}

/// Loose scalar comparison: filter values arrive as decoded strings.
fn loose_eq(actual: &Value, expected: &str) -> bool {
    match actual {
        Value::String(s) => s == expected,
        Value::Number(n) => expected.parse::<f64>().ok() == n.as_f64(),
        Value::Bool(b) => {
            if *b {
                expected == "1" || expected == "true"
            } else {
                expected == "0" || expected == "false"
            }
        }
        _ => false,
    }
}

fn cmp_values(a: Option<Value>, b: Option<Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .unwrap_or(0.0)
            .total_cmp(&b.as_f64().unwrap_or(0.0)),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(&b),
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}

/// Project a resource down to a sparse fieldset. Field names may refer to
/// attributes or relationships.
fn apply_fields(resource: &Value, fields: &HashMap<String, Vec<String>>) -> Value {
    let resource_type = resource["type"].as_str().unwrap_or_default();
    let Some(keep) = fields.get(resource_type) else {
        return resource.clone();
    };

    let mut out = Map::new();
    out.insert("type".to_string(), resource["type"].clone());
    out.insert("id".to_string(), resource["id"].clone());
    for member in ["attributes", "relationships"] {
        if let Some(entries) = resource.get(member).and_then(Value::as_object) {
            let kept: Map<String, Value> = entries
                .iter()
                .filter(|(name, _)| keep.contains(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            if !kept.is_empty() {
                out.insert(member.to_string(), Value::Object(kept));
            }
        }
    }
    Value::Object(out)
}

// --- seed data ---------------------------------------------------------

pub const RECIPE_QUICHE: &str = "00000000-0000-4000-8000-000000000001";
pub const RECIPE_CAKE: &str = "00000000-0000-4000-8000-000000000002";
pub const RECIPE_SALAD: &str = "00000000-0000-4000-8000-000000000003";
pub const RECIPE_STEW: &str = "00000000-0000-4000-8000-000000000004";
pub const ARTICLE_BAKING: &str = "00000000-0000-4000-8000-000000000101";
pub const ARTICLE_KNIVES: &str = "00000000-0000-4000-8000-000000000102";

const CAT_DESSERT: &str = "00000000-0000-4000-8000-000000000201";
const CAT_MAIN: &str = "00000000-0000-4000-8000-000000000202";
const CAT_SALAD: &str = "00000000-0000-4000-8000-000000000203";
const IMG_QUICHE: &str = "00000000-0000-4000-8000-000000000301";
const IMG_CAKE: &str = "00000000-0000-4000-8000-000000000302";
const IMG_SALAD: &str = "00000000-0000-4000-8000-000000000303";
const FILE_QUICHE: &str = "00000000-0000-4000-8000-000000000401";
const FILE_CAKE: &str = "00000000-0000-4000-8000-000000000402";
const FILE_SALAD: &str = "00000000-0000-4000-8000-000000000403";
const CT_RECIPE: &str = "00000000-0000-4000-8000-000000000501";
const CT_ARTICLE: &str = "00000000-0000-4000-8000-000000000502";

#[allow(clippy::too_many_arguments)]
fn content(
    kind: &str,
    id: &str,
    title: &str,
    created: &str,
    promoted: u8,
    published: u8,
    extra_attributes: Value,
    category: Option<&str>,
    image: &str,
    content_type: &str,
) -> Value {
    let mut attributes = json!({
        "title": title,
        "created": created,
        "createdAt": created,
        "isPromoted": promoted,
        "isPublished": published,
    });
    if let Some(extra) = extra_attributes.as_object() {
        for (name, value) in extra {
            attributes[name] = value.clone();
        }
    }
    let mut relationships = json!({
        "image": { "data": { "type": "images", "id": image } },
        "contentType": { "data": { "type": "contentTypes", "id": content_type } },
    });
    if let Some(category) = category {
        relationships["category"] = json!({ "data": { "type": "categories", "id": category } });
    }
    json!({ "type": kind, "id": id, "attributes": attributes, "relationships": relationships })
}

fn category(id: &str, name: &str) -> Value {
    json!({ "type": "categories", "id": id, "attributes": { "name": name } })
}

fn image(id: &str, name: &str, thumbnail: &str) -> Value {
    json!({
        "type": "images",
        "id": id,
        "attributes": { "name": name },
        "relationships": { "thumbnail": { "data": { "type": "files", "id": thumbnail } } },
    })
}

fn file(id: &str, filename: &str) -> Value {
    json!({
        "type": "files",
        "id": id,
        "attributes": { "filename": filename, "uri": format!("/files/{filename}") },
    })
}

impl Store {
    pub fn seed() -> Self {
        let resources = vec![
            content(
                "recipes",
                RECIPE_QUICHE,
                "Deep mediterranean quiche",
                "2026-01-05T10:00:00+00:00",
                1,
                1,
                json!({ "difficulty": "medium", "totalTime": 90 }),
                Some(CAT_MAIN),
                IMG_QUICHE,
                CT_RECIPE,
            ),
            content(
                "recipes",
                RECIPE_CAKE,
                "Chocolate cake",
                "2026-02-10T10:00:00+00:00",
                1,
                1,
                json!({ "difficulty": "easy", "totalTime": 60 }),
                Some(CAT_DESSERT),
                IMG_CAKE,
                CT_RECIPE,
            ),
            content(
                "recipes",
                RECIPE_SALAD,
                "Watercress salad",
                "2026-03-01T10:00:00+00:00",
                0,
                1,
                json!({ "difficulty": "easy", "totalTime": 15 }),
                Some(CAT_SALAD),
                IMG_SALAD,
                CT_RECIPE,
            ),
            content(
                "recipes",
                RECIPE_STEW,
                "Secret stew",
                "2026-03-15T10:00:00+00:00",
                1,
                0,
                json!({ "difficulty": "hard", "totalTime": 120 }),
                Some(CAT_MAIN),
                IMG_QUICHE,
                CT_RECIPE,
            ),
            content(
                "articles",
                ARTICLE_BAKING,
                "Baking basics",
                "2026-02-20T10:00:00+00:00",
                1,
                1,
                json!({}),
                None,
                IMG_CAKE,
                CT_ARTICLE,
            ),
            content(
                "articles",
                ARTICLE_KNIVES,
                "Knife skills",
                "2026-01-20T10:00:00+00:00",
                1,
                1,
                json!({}),
                None,
                IMG_SALAD,
                CT_ARTICLE,
            ),
            category(CAT_DESSERT, "Dessert"),
            category(CAT_MAIN, "Main course"),
            category(CAT_SALAD, "Salad"),
            image(IMG_QUICHE, "Quiche shot", FILE_QUICHE),
            image(IMG_CAKE, "Cake shot", FILE_CAKE),
            image(IMG_SALAD, "Salad shot", FILE_SALAD),
            file(FILE_QUICHE, "quiche.jpg"),
            file(FILE_CAKE, "cake.jpg"),
            file(FILE_SALAD, "salad.jpg"),
            json!({ "type": "contentTypes", "id": CT_RECIPE, "attributes": { "type": "recipe" } }),
            json!({ "type": "contentTypes", "id": CT_ARTICLE, "attributes": { "type": "article" } }),
        ];

        let aliases = HashMap::from([
            (
                "/recipes/deep-mediterranean-quiche".to_string(),
                ("recipes".to_string(), RECIPE_QUICHE.to_string()),
            ),
            (
                "/recipes/chocolate-cake".to_string(),
                ("recipes".to_string(), RECIPE_CAKE.to_string()),
            ),
            (
                "/articles/baking-basics".to_string(),
                ("articles".to_string(), ARTICLE_BAKING.to_string()),
            ),
        ]);

        Self { resources, aliases }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_segments_splits_brackets() {
        assert_eq!(
            key_segments("filter[totalTime][condition][operator]"),
            vec!["filter", "totalTime", "condition", "operator"]
        );
        assert_eq!(key_segments("include"), vec!["include"]);
    }

    #[test]
    fn parse_direct_and_condition_filters() {
        let query = parse_list_query(
            "filter%5Bdifficulty%5D%5Bpath%5D=difficulty\
             &filter%5Bdifficulty%5D%5Bvalue%5D=easy\
             &filter%5BtotalTime%5D%5Bcondition%5D%5Bpath%5D=totalTime\
             &filter%5BtotalTime%5D%5Bcondition%5D%5Bvalue%5D=30\
             &filter%5BtotalTime%5D%5Bcondition%5D%5Boperator%5D=%3C",
        );
        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[0].path, "difficulty");
        assert_eq!(query.filters[0].operator, "=");
        assert_eq!(query.filters[1].operator, "<");
        assert_eq!(query.filters[1].value, "30");
    }

    #[test]
    fn parse_page_include_fields_sort() {
        let query = parse_list_query(
            "page%5Blimit%5D=4&page%5Boffset%5D=2\
             &include=image%2Cimage.thumbnail\
             &fields%5Brecipes%5D=title%2Cdifficulty\
             &sort=-created",
        );
        assert_eq!(query.limit, Some(4));
        assert_eq!(query.offset, 2);
        assert_eq!(query.include, vec!["image", "image.thumbnail"]);
        assert_eq!(query.fields["recipes"], vec!["title", "difficulty"]);
        assert_eq!(query.sort.as_deref(), Some("-created"));
    }

    #[test]
    fn relationship_path_resolves_through_category() {
        let store = Store::seed();
        let cake = store.find("recipes", RECIPE_CAKE).unwrap();
        assert_eq!(
            store.resolve_path(cake, "category.name"),
            Some(Value::String("Dessert".to_string()))
        );
        assert_eq!(store.resolve_path(cake, "nope"), None);
    }

    #[test]
    fn numeric_comparison_filter() {
        let store = Store::seed();
        let query = parse_list_query(
            "filter%5BtotalTime%5D%5Bcondition%5D%5Bpath%5D=totalTime\
             &filter%5BtotalTime%5D%5Bcondition%5D%5Bvalue%5D=30\
             &filter%5BtotalTime%5D%5Bcondition%5D%5Boperator%5D=%3C",
        );
        let document = store.list("recipes", &query);
        let data = document["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["attributes"]["title"], "Watercress salad");
    }

    #[test]
    fn fields_projection_drops_unlisted_members() {
        let store = Store::seed();
        let query = parse_list_query("fields%5Brecipes%5D=title%2Cimage&page%5Blimit%5D=1");
        let document = store.list("recipes", &query);
        let first = &document["data"][0];
        assert!(first["attributes"].get("title").is_some());
        assert!(first["attributes"].get("difficulty").is_none());
        assert!(first["relationships"].get("image").is_some());
        assert!(first["relationships"].get("category").is_none());
    }

    #[test]
    fn include_path_collects_nested_resources() {
        let store = Store::seed();
        let query = parse_list_query("include=image.thumbnail&page%5Blimit%5D=1&sort=created");
        let document = store.list("recipes", &query);
        let included = document["included"].as_array().unwrap();
        assert!(included.iter().any(|r| r["type"] == "images"));
        assert!(included.iter().any(|r| r["type"] == "files"));
    }

    #[test]
    fn translate_known_alias() {
        let store = Store::seed();
        let translation = store.translate("/recipes/chocolate-cake").unwrap();
        assert_eq!(
            translation["jsonapi"]["individual"],
            format!("/api/recipes/{RECIPE_CAKE}")
        );
        assert!(store.translate("/recipes/unknown").is_none());
    }
}
