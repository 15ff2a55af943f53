//! Content facade: one operation per content-access need.
//!
//! # Design
//! Each operation assembles a declarative [`Query`] from scalar parameters
//! and delegates straight to [`JsonApiClient`]; no input validation happens
//! here and every transport failure propagates unchanged. The only real
//! coordination logic lives in [`ContentApi::find_home_promoted`] (two
//! concurrent fetches, fail-fast merge) and
//! [`ContentApi::get_resource_by_alias`] (a dependent two-descriptor batch
//! resolved server-side in a single round trip).

use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::client::{Base, JsonApiClient};
use crate::error::ApiError;
use crate::jsonapi;
use crate::query::Query;
use crate::subrequest::{ResponseRef, SubRequest, SubRequestBatch};

/// Relationship paths expanded for recipe card rendering.
const CARD_INCLUDE: [&str; 2] = ["image", "image.thumbnail"];

/// Sparse fieldsets shared by every recipe-card list query.
fn card_fields(query: Query) -> Query {
    query
        .fields("recipes", ["title", "difficulty", "image"])
        .fields("images", ["name", "thumbnail"])
        .fields("files", ["filename", "uri"])
}

pub struct ContentApi {
    client: JsonApiClient,
}

impl ContentApi {
    pub fn new(client: JsonApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &JsonApiClient {
        &self.client
    }

    /// Fetch a single published recipe by id, expanding image, category and
    /// image thumbnail.
    pub async fn find_one_recipe_by_uuid(&self, uuid: Uuid) -> Result<Value, ApiError> {
        debug!(%uuid, "find recipe by uuid");
        let query = Query::new()
            .filter("isPublished", "isPublished", 1u64)
            .include(["image", "category", "image.thumbnail"]);
        self.client.get(&format!("recipes/{uuid}"), &query, Base::Api).await
    }

    /// Fetch up to `limit` promoted, published recipes, newest first, with a
    /// card-sized field projection.
    pub async fn find_all_promoted_recipes(&self, limit: u64) -> Result<Value, ApiError> {
        let query = card_fields(
            Query::new()
                .page_limit(limit)
                .filter("isPromoted", "isPromoted", 1u64)
                .filter("isPublished", "isPublished", 1u64)
                .include(CARD_INCLUDE),
        )
        .sort("-created");
        self.client.get("recipes", &query, Base::Api).await
    }

    /// Fetch up to `limit` recipe categories.
    pub async fn find_all_recipe_categories(&self, limit: u64) -> Result<Value, ApiError> {
        let query = Query::new().page_limit(limit);
        self.client.get("categories", &query, Base::Api).await
    }

    /// Fetch the `limit` most recently created recipes.
    pub async fn find_all_latest_recipes(&self, limit: u64) -> Result<Value, ApiError> {
        let query = card_fields(
            Query::new()
                .sort("-created")
                .page_limit(limit)
                .include(CARD_INCLUDE),
        );
        self.client.get("recipes", &query, Base::Api).await
    }

    /// Fetch recipes whose category relationship matches `category_name`.
    pub async fn find_all_recipes_by_category_name(
        &self,
        category_name: &str,
        limit: u64,
    ) -> Result<Value, ApiError> {
        let query = card_fields(
            Query::new()
                .sort("-created")
                .include(CARD_INCLUDE)
                .filter_condition("categoryName", "category.name", category_name, None)
                .page_offset(0)
                .page_limit(limit),
        );
        self.client.get("recipes", &query, Base::Api).await
    }

    /// Fetch recipes with an exact difficulty label.
    pub async fn find_all_recipes_by_difficulty(
        &self,
        difficulty: &str,
        limit: u64,
    ) -> Result<Value, ApiError> {
        let query = card_fields(
            Query::new()
                .sort("-created")
                .include(CARD_INCLUDE)
                .filter("difficulty", "difficulty", difficulty)
                .page_offset(0)
                .page_limit(limit),
        );
        self.client.get("recipes", &query, Base::Api).await
    }

    /// Fetch recipes whose total time is strictly below `max_total_time`.
    pub async fn find_all_recipes_by_max_total_time(
        &self,
        max_total_time: u64,
        limit: u64,
    ) -> Result<Value, ApiError> {
        let query = card_fields(
            Query::new()
                .sort("-created")
                .include(CARD_INCLUDE)
                .filter_condition("totalTime", "totalTime", max_total_time, Some("<"))
                .page_offset(0)
                .page_limit(limit),
        );
        self.client.get("recipes", &query, Base::Api).await
    }

    /// Fetch promoted recipes and promoted articles concurrently, merge them
    /// sorted ascending by creation time, and truncate to `limit`.
    ///
    /// Both fetches must succeed; if either fails the whole operation fails
    /// with no partial result. Items with a missing or unparsable `createdAt`
    /// sort first; ties keep fetch order.
    pub async fn find_home_promoted(&self, limit: usize) -> Result<Vec<Value>, ApiError> {
        let recipes = self.promoted_page("recipes");
        let articles = self.promoted_page("articles");
        let (recipes, articles) = futures::try_join!(recipes, articles)?;

        let mut items = collection_items(recipes);
        items.extend(collection_items(articles));
        items.sort_by_key(created_at);
        items.truncate(limit);
        Ok(items)
    }

    /// One side of the home merge: up to three promoted, published items of
    /// `collection`, newest first, projected down to card fields plus the
    /// content type and `createdAt`, the merge sort key.
    async fn promoted_page(&self, collection: &str) -> Result<Value, ApiError> {
        let query = Query::new()
            .page_limit(3)
            .filter("isPromoted", "isPromoted", 1u64)
            .filter("isPublished", "isPublished", 1u64)
            .include(["contentType", "image", "image.thumbnail"])
            .fields(collection, ["contentType", "title", "difficulty", "image", "createdAt"])
            .fields("images", ["name", "thumbnail"])
            .fields("files", ["filename", "uri"])
            .fields("contentTypes", ["type"])
            .sort("-created");
        self.client.get(collection, &query, Base::Api).await
    }

    /// Resolve a human-readable path to its canonical resource descriptor via
    /// the path-translation endpoint.
    pub async fn find_resource_by_alias(&self, alias: &str) -> Result<Value, ApiError> {
        debug!(alias, "find resource by alias");
        let query = Query::new().param("path", alias);
        self.client.get("router/translate-path", &query, Base::Server).await
    }

    /// Resolve an alias and fetch the resource it names in one network
    /// operation: a two-descriptor batch where the resource fetch waits for
    /// the translation result and embeds it via placeholder substitution.
    ///
    /// Returns the composed batch response keyed by request id, with each
    /// sub-response JSON:API-decoded where possible.
    pub async fn get_resource_by_alias(&self, alias: &str) -> Result<Value, ApiError> {
        debug!(alias, "get resource by alias");

        let resolve_query = Query::new().param("path", alias).param("_format", "json");
        let resolve_uri =
            self.client
                .prepare_url("/router/translate-path", &resolve_query, Base::Relative);

        let target = ResponseRef::new("router", "jsonapi.individual");
        let resource_query = Query::new().include(["image", "category", "image.thumbnail"]);
        let resource_uri = self
            .client
            .prepare_url(&target.render(), &resource_query, Base::Relative);

        let batch = SubRequestBatch::new()
            .request(SubRequest::view("router", resolve_uri))
            .request(SubRequest::view("resource", resource_uri).wait_for(target.request_id()));
        batch.validate()?;

        let response = self
            .client
            .post(
                "subrequests",
                &Query::new().param("_format", "json"),
                batch.to_json()?,
                Base::Server,
            )
            .await?;
        Ok(decode_members(response))
    }
}

/// Items of a decoded list response; anything else is an empty list.
fn collection_items(decoded: Value) -> Vec<Value> {
    match decoded {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

fn created_at(item: &Value) -> Option<DateTime<FixedOffset>> {
    item.get("createdAt")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
}

/// Decode each member of a composed batch response.
fn decode_members(response: Value) -> Value {
    match response {
        Value::Object(members) => Value::Object(
            members
                .into_iter()
                .map(|(request_id, body)| (request_id, jsonapi::decode_response(body)))
                .collect(),
        ),
        other => other,
    }
}
