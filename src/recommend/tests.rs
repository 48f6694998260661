use super::*;
use crate::constants::DimConfig;
use crate::embedding::EncoderConfig;
use crate::store::StoreError;
use crate::vectordb::MockVectorDbClient;

const DIM: usize = 256;

async fn orchestrator() -> (
    Arc<MockVectorDbClient>,
    RecommendationOrchestrator<MockVectorDbClient>,
) {
    let encoder =
        Arc::new(TextEncoder::load(EncoderConfig::stub().with_embedding_dim(DIM)).unwrap());
    let client = Arc::new(MockVectorDbClient::new());
    let store = Arc::new(BookStore::new(client.clone(), "books", DimConfig::new(DIM)));
    store.ensure_index().await.unwrap();
    (client, RecommendationOrchestrator::new(encoder, store))
}

fn request(title: &str, review: &str) -> BookCreateRequest {
    BookCreateRequest::new(title, "Test Author", review).with_rating(4.0)
}

mod validation_tests {
    use super::*;

    #[test]
    fn test_valid_request() {
        let req = request("Dune", "Sand, spice and politics.")
            .with_isbn("9780441013593")
            .with_tags(["sf"]);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_blank_title_or_author() {
        let mut req = request("  ", "Long enough review text");
        assert!(req.validate().is_err());

        req.title = "Dune".to_string();
        req.author = String::new();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_short_review() {
        let err = request("Dune", "too short").validate().unwrap_err();
        assert!(err.to_string().contains("at least 10"));
    }

    #[test]
    fn test_rating_bounds() {
        let base = request("Dune", "Long enough review text");
        assert!(base.clone().with_rating(0.0).validate().is_ok());
        assert!(base.clone().with_rating(5.0).validate().is_ok());
        assert!(base.clone().with_rating(5.5).validate().is_err());
        assert!(base.clone().with_rating(-0.1).validate().is_err());
        assert!(base.with_rating(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_top_k_bounds() {
        assert!(validate_top_k(0).is_err());
        assert!(validate_top_k(1).is_ok());
        assert!(validate_top_k(20).is_ok());
        assert!(validate_top_k(21).is_err());
    }

    #[test]
    fn test_request_defaults_from_json() {
        let req: BookCreateRequest = serde_json::from_str(
            r#"{"title":"Dune","author":"Frank Herbert","review":"Sand and spice everywhere"}"#,
        )
        .unwrap();
        assert_eq!(req.rating, 0.0);
        assert!(req.tags.is_empty());
        assert!(req.isbn.is_none());

        let by_review: RecommendByReviewRequest =
            serde_json::from_str(r#"{"review":"something long enough"}"#).unwrap();
        assert_eq!(by_review.top_k, 5);
    }

    #[test]
    fn test_document_text_and_rounding() {
        assert_eq!(document_text("Dune", "Herbert", "Great."), "Dune - Herbert. Great.");
        assert_eq!(round_score(0.123_456), 0.1235);
        assert_eq!(round_score(1.0), 1.0);
    }
}

mod flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_register_returns_book_without_embedding() {
        let (client, orch) = orchestrator().await;
        let book = orch
            .register_book(request("Dune", "Sand, spice and politics.").with_isbn(""))
            .await
            .unwrap();

        assert_eq!(book.title, "Dune");
        assert!(book.isbn.is_none());
        assert_eq!(client.point_count("books"), Some(1));

        let stored = orch.store().fetch(&book.id).await.unwrap().unwrap();
        let expected = orch
            .encoder()
            .encode_document("Dune - Test Author. Sand, spice and politics.")
            .unwrap();
        assert_eq!(stored.embedding, expected);
    }

    #[tokio::test]
    async fn test_register_invalid_request_stores_nothing() {
        let (client, orch) = orchestrator().await;
        let err = orch.register_book(request("Dune", "short")).await.unwrap_err();

        assert!(matches!(err, RecommendError::InvalidRequest { .. }));
        assert_eq!(client.point_count("books"), Some(0));
    }

    #[tokio::test]
    async fn test_by_review_on_empty_store_is_empty() {
        let (_client, orch) = orchestrator().await;
        let results = orch
            .recommend_by_review("A review that is long enough", 5)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_by_review_uses_instruction_query() {
        let (client, orch) = orchestrator().await;
        orch.register_book(request("Dune", "Sand, spice and politics."))
            .await
            .unwrap();

        let review = "Sand, spice and politics.";
        orch.recommend_by_review(review, 3).await.unwrap();
        assert_eq!(client.last_search_params(), Some((3, 100)));

        let query = orch.encoder().encode_query(review).unwrap();
        let direct = orch.store().knn_search(&query, 3, None).await.unwrap();
        let via_orch = orch.recommend_by_review(review, 3).await.unwrap();
        assert_eq!(via_orch[0].score, round_score(direct[0].1));
    }

    #[tokio::test]
    async fn test_by_review_validates_inputs() {
        let (_client, orch) = orchestrator().await;
        assert!(matches!(
            orch.recommend_by_review("short", 5).await,
            Err(RecommendError::InvalidRequest { .. })
        ));
        assert!(matches!(
            orch.recommend_by_review("long enough review", 0).await,
            Err(RecommendError::InvalidRequest { .. })
        ));
    }

    #[tokio::test]
    async fn test_by_book_excludes_reference() {
        let (_client, orch) = orchestrator().await;
        let reference = orch
            .register_book(request("Ref", "Rockets astronauts orbit galaxy"))
            .await
            .unwrap();
        for i in 0..3 {
            orch.register_book(request(&format!("Book {i}"), "Rockets orbit planets"))
                .await
                .unwrap();
        }

        let results = orch.recommend_by_book(&reference.id, 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.book.id != reference.id));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_by_book_unknown_reference() {
        let (_client, orch) = orchestrator().await;
        let missing = uuid::Uuid::new_v4().to_string();

        let err = orch.recommend_by_book(&missing, 5).await.unwrap_err();
        assert!(matches!(err, RecommendError::ReferenceNotFound { id } if id == missing));
    }

    #[tokio::test]
    async fn test_by_book_only_reference_stored_is_empty() {
        let (_client, orch) = orchestrator().await;
        let reference = orch
            .register_book(request("Alone", "The only book in the library"))
            .await
            .unwrap();

        let results = orch.recommend_by_book(&reference.id, 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_store_outage_is_not_reported_as_not_found() {
        let (client, orch) = orchestrator().await;
        client.set_available(false);

        let missing = uuid::Uuid::new_v4().to_string();
        let err = orch.recommend_by_book(&missing, 5).await.unwrap_err();
        assert!(matches!(
            err,
            RecommendError::Store(StoreError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_dimension_check() {
        let (_client, orch) = orchestrator().await;
        assert!(orch.check_dimensions().is_ok());

        let encoder =
            Arc::new(TextEncoder::load(EncoderConfig::stub().with_embedding_dim(512)).unwrap());
        let store = Arc::new(BookStore::new(
            Arc::new(MockVectorDbClient::new()),
            "books",
            DimConfig::new(DIM),
        ));
        let mismatched = RecommendationOrchestrator::new(encoder, store);
        assert_eq!(
            mismatched.check_dimensions(),
            Err(crate::constants::DimValidationError::DimensionMismatch {
                expected: DIM,
                actual: 512
            })
        );
    }
}
