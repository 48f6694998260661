//! Recommendation flows over the stub encoder and the in-memory engine.

mod common;

use librarian::recommend::{BookCreateRequest, RecommendError};
use librarian::store::knn_request_size;

use common::harness::{TEST_EMBEDDING_DIM, in_memory_orchestrator};

fn space_and_cooking() -> [BookCreateRequest; 3] {
    [
        BookCreateRequest::new(
            "Stars",
            "Test Author",
            "Astronauts explore distant galaxies aboard rocket ships.",
        )
        .with_rating(5.0),
        BookCreateRequest::new(
            "Orbit",
            "Test Author",
            "Rocket ships carry astronauts toward distant galaxies.",
        )
        .with_rating(4.0),
        BookCreateRequest::new(
            "Kitchen",
            "Test Author",
            "Chefs simmer garlic sauces over gentle heat.",
        )
        .with_rating(3.5),
    ]
}

#[tokio::test]
async fn test_space_review_prefers_space_books() {
    let (_vectordb, orchestrator) = in_memory_orchestrator(TEST_EMBEDDING_DIM)
        .await
        .expect("orchestrator builds");

    for request in space_and_cooking() {
        orchestrator.register_book(request).await.unwrap();
    }

    let results = orchestrator
        .recommend_by_review("astronauts rocket ships exploring galaxies", 2)
        .await
        .unwrap();

    let mut titles: Vec<&str> = results.iter().map(|r| r.book.title.as_str()).collect();
    titles.sort_unstable();
    assert_eq!(titles, vec!["Orbit", "Stars"]);
    assert!(results[0].score >= results[1].score);
}

#[tokio::test]
async fn test_space_book_neighbours() {
    let (_vectordb, orchestrator) = in_memory_orchestrator(TEST_EMBEDDING_DIM)
        .await
        .expect("orchestrator builds");

    let mut ids = Vec::new();
    for request in space_and_cooking() {
        ids.push(orchestrator.register_book(request).await.unwrap().id);
    }

    let results = orchestrator.recommend_by_book(&ids[0], 2).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].book.title, "Orbit");
    assert_eq!(results[1].book.title, "Kitchen");
    assert!(results.iter().all(|r| r.book.id != ids[0]));
}

#[tokio::test]
async fn test_scores_are_rounded_to_four_decimals() {
    let (_vectordb, orchestrator) = in_memory_orchestrator(TEST_EMBEDDING_DIM)
        .await
        .expect("orchestrator builds");
    for request in space_and_cooking() {
        orchestrator.register_book(request).await.unwrap();
    }

    let results = orchestrator
        .recommend_by_review("garlic sauces simmering slowly", 3)
        .await
        .unwrap();

    for result in results {
        let scaled = result.score * 10_000.0;
        assert!((scaled - scaled.round()).abs() < 1e-6, "{}", result.score);
    }
}

#[tokio::test]
async fn test_by_book_pool_smaller_than_request() {
    let (vectordb, orchestrator) = in_memory_orchestrator(TEST_EMBEDDING_DIM)
        .await
        .expect("orchestrator builds");

    let mut ids = Vec::new();
    for request in space_and_cooking() {
        ids.push(orchestrator.register_book(request).await.unwrap().id);
    }

    // Three stored books: asking for five returns the other two.
    let results = orchestrator.recommend_by_book(&ids[2], 5).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(
        vectordb.last_search_params().map(|(limit, _)| limit),
        Some(knn_request_size(5, true))
    );
}

#[tokio::test]
async fn test_deleted_reference_is_not_found() {
    let (_vectordb, orchestrator) = in_memory_orchestrator(TEST_EMBEDDING_DIM)
        .await
        .expect("orchestrator builds");

    let [first, ..] = space_and_cooking();
    let book = orchestrator.register_book(first).await.unwrap();
    assert!(orchestrator.store().delete(&book.id).await.unwrap());

    let err = orchestrator.recommend_by_book(&book.id, 3).await.unwrap_err();
    assert!(matches!(err, RecommendError::ReferenceNotFound { .. }));
}

#[tokio::test]
async fn test_truncated_dimension_end_to_end() {
    let (_vectordb, orchestrator) = in_memory_orchestrator(256)
        .await
        .expect("orchestrator builds");

    let [first, ..] = space_and_cooking();
    let book = orchestrator.register_book(first).await.unwrap();

    let stored = orchestrator.store().fetch(&book.id).await.unwrap().unwrap();
    assert_eq!(stored.embedding.len(), 256);
    let norm: f32 = stored.embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-4);
}
