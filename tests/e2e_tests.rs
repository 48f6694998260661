//! End-to-end HTTP tests.

mod common;

use common::harness::{TEST_EMBEDDING_DIM, TestServerConfig, spawn_test_server};
use common::http_client::TestClient;

fn book(title: &str, review: &str) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "author": "Test Author",
        "review": review,
        "rating": 4.0,
        "isbn": "9780000000000",
        "tags": ["e2e"]
    })
}

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let server = spawn_test_server(TestServerConfig::default())
        .await
        .expect("Server should start");

    let client = TestClient::new(server.url());
    let health = client.health().await.expect("Health check should succeed");

    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn test_ready_endpoint_indicates_dependencies() {
    let server = spawn_test_server(TestServerConfig::default())
        .await
        .expect("Server should start");

    let client = TestClient::new(server.url());
    let ready = client.ready().await.expect("Ready check should succeed");

    assert!(ready.is_ok(), "Server should report ready");
    assert_eq!(ready.components.vectordb, "ready");
    assert_eq!(ready.components.embedder_mode, "stub");
    assert_eq!(ready.components.embedding_dim, TEST_EMBEDDING_DIM);
    assert_eq!(ready.components.catalog, "not_configured");
}

#[tokio::test]
async fn test_register_list_recommend_delete() {
    let server = spawn_test_server(TestServerConfig::default())
        .await
        .expect("Server should start");
    let client = TestClient::new(server.url());

    let stars = client
        .create_book(book(
            "Stars",
            "Astronauts explore distant galaxies aboard rocket ships.",
        ))
        .await
        .unwrap();
    let orbit = client
        .create_book(book(
            "Orbit",
            "Rocket ships carry astronauts toward distant galaxies.",
        ))
        .await
        .unwrap();
    client
        .create_book(book("Kitchen", "Chefs simmer garlic sauces over gentle heat."))
        .await
        .unwrap();

    assert_eq!(stars.isbn.as_deref(), Some("9780000000000"));
    assert_eq!(server.vectordb.point_count("librarian_test_books"), Some(3));

    let listed = client.list_books(10).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].title, "Kitchen");

    let (status, body) = client
        .recommend(
            "/recommendations/by-book",
            serde_json::json!({ "book_id": stars.id, "top_k": 1 }),
        )
        .await
        .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body[0]["book"]["id"], orbit.id.as_str());

    let (status, body) = client
        .recommend(
            "/recommendations/by-review",
            serde_json::json!({ "review": "astronauts rocket ships exploring galaxies", "top_k": 3 }),
        )
        .await
        .unwrap();
    assert_eq!(status, 200);
    assert_eq!(body.as_array().unwrap().len(), 3);
    assert_ne!(body[0]["book"]["title"], "Kitchen");

    assert_eq!(client.delete_book(&stars.id).await.unwrap(), 204);
    assert_eq!(client.get_book(&stars.id).await.unwrap().status(), 404);
    assert_eq!(client.delete_book(&stars.id).await.unwrap(), 404);

    let (status, _body) = client
        .recommend(
            "/recommendations/by-book",
            serde_json::json!({ "book_id": stars.id }),
        )
        .await
        .unwrap();
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_empty_library_guidance() {
    let server = spawn_test_server(TestServerConfig::default())
        .await
        .expect("Server should start");
    let client = TestClient::new(server.url());

    let (status, body) = client
        .recommend(
            "/recommendations/by-review",
            serde_json::json!({ "review": "Anything at all, really." }),
        )
        .await
        .unwrap();

    assert_eq!(status, 404);
    assert_eq!(body["code"], 404);
    assert!(body["error"].as_str().unwrap().contains("register"));
}

#[tokio::test]
async fn test_store_outage_maps_to_service_unavailable() {
    let server = spawn_test_server(TestServerConfig::default())
        .await
        .expect("Server should start");
    let client = TestClient::new(server.url());

    server.vectordb.set_available(false);

    let err = client
        .create_book(book("Dune", "Sand, spice and desert politics."))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("503"), "{err}");

    let (status, _body) = client
        .recommend(
            "/recommendations/by-book",
            serde_json::json!({ "book_id": uuid::Uuid::new_v4().to_string() }),
        )
        .await
        .unwrap();
    assert_eq!(status, 503);

    server.vectordb.set_available(true);
    client
        .create_book(book("Dune", "Sand, spice and desert politics."))
        .await
        .expect("Writes resume once the store is back");
}
