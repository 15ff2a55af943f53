//! Sub-request batching descriptors.
//!
//! The batching endpoint takes an ordered list of descriptors, executes them
//! honoring `waitFor` dependencies, and substitutes `{{id.body@$.path}}`
//! tokens in dependent URIs with values extracted from completed responses.
//! Instead of hand-embedding those tokens, a dependency is expressed as a
//! typed [`ResponseRef`] and rendered at composition time; `validate` then
//! checks every reference against the declared `waitFor` edges before the
//! batch ever leaves the client.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A typed reference to a member of another sub-request's response body.
///
/// `pointer` is a dot path into the body, e.g. `jsonapi.individual`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRef {
    request_id: String,
    pointer: String,
}

impl ResponseRef {
    pub fn new(request_id: &str, pointer: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            pointer: pointer.to_string(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Render the wire placeholder the batching endpoint substitutes.
    pub fn render(&self) -> String {
        format!("{{{{{}.body@$.{}}}}}", self.request_id, self.pointer)
    }
}

/// One named unit of a batched request sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubRequest {
    pub request_id: String,
    pub action: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wait_for: Vec<String>,
}

impl SubRequest {
    /// A `view` sub-request with the JSON:API accept header.
    pub fn view(request_id: &str, uri: String) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Accept".to_string(), "application/vnd.api+json".to_string());
        Self {
            request_id: request_id.to_string(),
            action: "view".to_string(),
            uri,
            headers,
            wait_for: Vec::new(),
        }
    }

    /// Declare a data dependency on another descriptor's result.
    pub fn wait_for(mut self, request_id: &str) -> Self {
        self.wait_for.push(request_id.to_string());
        self
    }
}

/// An ordered sub-request batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubRequestBatch {
    requests: Vec<SubRequest>,
}

impl SubRequestBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(mut self, request: SubRequest) -> Self {
        self.requests.push(request);
        self
    }

    pub fn requests(&self) -> &[SubRequest] {
        &self.requests
    }

    /// Check every placeholder and `waitFor` edge: a URI may only reference a
    /// descriptor that appears earlier in the batch and is declared in the
    /// referencing descriptor's `waitFor`.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut earlier: Vec<&str> = Vec::new();
        for request in &self.requests {
            for dependency in &request.wait_for {
                if !earlier.contains(&dependency.as_str()) {
                    return Err(ApiError::Batch(format!(
                        "request `{}` waits for `{dependency}`, which does not precede it",
                        request.request_id
                    )));
                }
            }
            for referenced in placeholder_refs(&request.uri) {
                if !earlier.contains(&referenced.as_str()) {
                    return Err(ApiError::Batch(format!(
                        "request `{}` references `{referenced}`, which does not precede it",
                        request.request_id
                    )));
                }
                if !request.wait_for.iter().any(|w| w == &referenced) {
                    return Err(ApiError::Batch(format!(
                        "request `{}` references `{referenced}` without declaring it in waitFor",
                        request.request_id
                    )));
                }
            }
            earlier.push(&request.request_id);
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ApiError> {
        Ok(serde_json::to_string(&self.requests)?)
    }
}

/// Request ids referenced by `{{<id>.body@...}}` placeholders in a URI.
fn placeholder_refs(uri: &str) -> Vec<String> {
    let mut refs = Vec::new();
    let mut rest = uri;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else { break };
        let token = &after[..end];
        if let Some(split) = token.find(".body@") {
            refs.push(token[..split].to_string());
        }
        rest = &after[end + 2..];
    }
    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias_batch() -> SubRequestBatch {
        let target = ResponseRef::new("router", "jsonapi.individual");
        SubRequestBatch::new()
            .request(SubRequest::view(
                "router",
                "/router/translate-path?path=%2Frecipes%2Fcake&_format=json".to_string(),
            ))
            .request(
                SubRequest::view("resource", format!("{}?include=image", target.render()))
                    .wait_for("router"),
            )
    }

    #[test]
    fn response_ref_renders_wire_placeholder() {
        let target = ResponseRef::new("router", "jsonapi.individual");
        assert_eq!(target.render(), "{{router.body@$.jsonapi.individual}}");
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let batch = alias_batch();
        let wire: serde_json::Value = serde_json::from_str(&batch.to_json().unwrap()).unwrap();
        assert_eq!(wire[0]["requestId"], "router");
        assert_eq!(wire[0]["action"], "view");
        assert_eq!(wire[0]["headers"]["Accept"], "application/vnd.api+json");
        assert!(wire[0].get("waitFor").is_none());
        assert_eq!(wire[1]["waitFor"], serde_json::json!(["router"]));
        assert!(wire[1]["uri"]
            .as_str()
            .unwrap()
            .contains("{{router.body@$.jsonapi.individual}}"));
    }

    #[test]
    fn valid_batch_passes_validation() {
        assert!(alias_batch().validate().is_ok());
    }

    #[test]
    fn reference_without_wait_for_is_rejected() {
        let target = ResponseRef::new("router", "jsonapi.individual");
        let batch = SubRequestBatch::new()
            .request(SubRequest::view("router", "/router/translate-path".to_string()))
            .request(SubRequest::view("resource", target.render()));
        let err = batch.validate().unwrap_err();
        assert!(err.to_string().contains("without declaring it in waitFor"));
    }

    #[test]
    fn reference_to_later_request_is_rejected() {
        let target = ResponseRef::new("resource", "id");
        let batch = SubRequestBatch::new()
            .request(SubRequest::view("router", target.render()).wait_for("resource"))
            .request(SubRequest::view("resource", "/api/recipes".to_string()));
        assert!(batch.validate().is_err());
    }

    #[test]
    fn wait_for_unknown_request_is_rejected() {
        let batch = SubRequestBatch::new()
            .request(SubRequest::view("resource", "/api/recipes".to_string()).wait_for("router"));
        let err = batch.validate().unwrap_err();
        assert!(err.to_string().contains("does not precede it"));
    }

    #[test]
    fn placeholder_refs_finds_all_tokens() {
        let refs = placeholder_refs(
            "{{a.body@$.x}}/sub/{{b.body@$.y.z}}?q={{not-a-body-token}}",
        );
        assert_eq!(refs, vec!["a".to_string(), "b".to_string()]);
    }
}
