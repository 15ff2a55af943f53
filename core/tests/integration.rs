//! End-to-end tests against the live mock backend.
//!
//! Each test starts the mock server on a random port and exercises the
//! content facade over real HTTP through the reqwest transport, validating
//! URL construction, response decoding and the batched alias protocol
//! together.

use mock_server::store::{RECIPE_CAKE, RECIPE_QUICHE};
use recipes_core::{ApiError, Base, ClientConfig, ContentApi, JsonApiClient, Query};
use serde_json::Value;
use uuid::Uuid;

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { mock_server::run(listener).await.unwrap() });
    format!("http://{addr}")
}

async fn content_api() -> ContentApi {
    let base = start_server().await;
    ContentApi::new(JsonApiClient::new(ClientConfig::new(
        &format!("{base}/api"),
        &base,
    )))
}

fn titles(items: &Value) -> Vec<&str> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn categories_come_back_denormalized() {
    let api = content_api().await;
    let categories = api.find_all_recipe_categories(20).await.unwrap();
    let names: Vec<&str> = categories
        .as_array()
        .unwrap()
        .iter()
        .map(|category| category["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 3);
    assert!(names.contains(&"Dessert"));
}

#[tokio::test]
async fn promoted_recipes_are_capped_and_inline_images() {
    let api = content_api().await;
    let recipes = api.find_all_promoted_recipes(1).await.unwrap();
    let items = recipes.as_array().unwrap();
    assert_eq!(items.len(), 1);
    // Newest promoted, published recipe.
    assert_eq!(items[0]["title"], "Chocolate cake");
    assert_eq!(items[0]["image"]["name"], "Cake shot");
    // Sparse fieldset dropped everything else.
    assert!(items[0].get("totalTime").is_none());
}

#[tokio::test]
async fn recipe_by_uuid_expands_relationships() {
    let api = content_api().await;
    let recipe = api
        .find_one_recipe_by_uuid(Uuid::parse_str(RECIPE_QUICHE).unwrap())
        .await
        .unwrap();
    assert_eq!(recipe["title"], "Deep mediterranean quiche");
    assert_eq!(recipe["category"]["name"], "Main course");
    assert_eq!(recipe["image"]["thumbnail"]["filename"], "quiche.jpg");
}

#[tokio::test]
async fn latest_recipes_sort_newest_first() {
    let api = content_api().await;
    let recipes = api.find_all_latest_recipes(2).await.unwrap();
    assert_eq!(titles(&recipes), vec!["Secret stew", "Watercress salad"]);
}

#[tokio::test]
async fn recipes_filter_by_category_name() {
    let api = content_api().await;
    let recipes = api
        .find_all_recipes_by_category_name("Dessert", 4)
        .await
        .unwrap();
    assert_eq!(titles(&recipes), vec!["Chocolate cake"]);
}

#[tokio::test]
async fn recipes_filter_by_difficulty() {
    let api = content_api().await;
    let recipes = api.find_all_recipes_by_difficulty("easy", 4).await.unwrap();
    assert_eq!(titles(&recipes), vec!["Watercress salad", "Chocolate cake"]);
}

#[tokio::test]
async fn recipes_filter_by_max_total_time() {
    let api = content_api().await;
    let recipes = api.find_all_recipes_by_max_total_time(61, 4).await.unwrap();
    assert_eq!(titles(&recipes), vec!["Watercress salad", "Chocolate cake"]);
}

#[tokio::test]
async fn home_merge_combines_both_collections_ascending() {
    let api = content_api().await;
    let items = api.find_home_promoted(3).await.unwrap();
    // Promoted published content sorted ascending by creation time:
    // quiche (01-05), knife skills (01-20), cake (02-10); baking basics
    // (02-20) falls past the limit.
    let found: Vec<&str> = items
        .iter()
        .map(|item| item["title"].as_str().unwrap())
        .collect();
    assert_eq!(
        found,
        vec!["Deep mediterranean quiche", "Knife skills", "Chocolate cake"]
    );
    assert_eq!(items[0]["contentType"]["type"], "recipe");
    assert_eq!(items[1]["contentType"]["type"], "article");
}

#[tokio::test]
async fn alias_translates_to_canonical_uri() {
    let api = content_api().await;
    let translation = api
        .find_resource_by_alias("/recipes/chocolate-cake")
        .await
        .unwrap();
    assert_eq!(
        translation["jsonapi"]["individual"],
        format!("/api/recipes/{RECIPE_CAKE}")
    );
}

#[tokio::test]
async fn alias_batch_resolves_and_fetches_in_one_round_trip() {
    let api = content_api().await;
    let composed = api
        .get_resource_by_alias("/recipes/deep-mediterranean-quiche")
        .await
        .unwrap();
    assert_eq!(
        composed["router"]["jsonapi"]["individual"],
        format!("/api/recipes/{RECIPE_QUICHE}")
    );
    assert_eq!(composed["resource"]["title"], "Deep mediterranean quiche");
    assert_eq!(composed["resource"]["category"]["name"], "Main course");
}

#[tokio::test]
async fn http_failures_surface_verbatim() {
    let api = content_api().await;
    let err = api
        .client()
        .get("nope", &Query::new(), Base::Api)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 404, .. }));
}
