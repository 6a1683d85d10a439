#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::tests::support::setup;

    #[tokio::test]
    async fn test_submit_then_approve() {
        let t = setup().await;
        let admin = t.admin("admin@example.com").await;
        let reader = t.signup("Ada", "ada@example.com").await;
        let book = t.create_book(&admin, "Dune", &["Sci-Fi"], 4.5).await;

        let (status, body) = t
            .request(
                "PATCH",
                &format!("/books/review/{}", book),
                Some(&reader),
                Some(json!({ "rating": 5, "comment": "Loved it", "date": "2024-03-01T10:00:00.000Z" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "matchedCount": 1, "modifiedCount": 1 }));

        let (status, pending) = t.get("/books/reviews", &admin).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            pending,
            json!([{
                "bookId": book,
                "rating": 5.0,
                "comment": "Loved it",
                "name": "Ada",
                "email": "ada@example.com",
                "date": "2024-03-01T10:00:00.000Z",
                "status": "pending"
            }])
        );

        let approve = json!({ "bookId": book, "email": "ada@example.com", "date": "2024-03-01T10:00:00.000Z" });
        let (status, body) = t.request("PATCH", "/reviews/approve", Some(&admin), Some(approve.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "matchedCount": 1, "modifiedCount": 1 }));

        let (_, pending) = t.get("/books/reviews", &admin).await;
        assert_eq!(pending, json!([]));
        let (_, detail) = t.get(&format!("/books/{}", book), &reader).await;
        assert_eq!(detail["reviews"][0]["status"], "approved");

        // Approving again matches but changes nothing
        let (_, body) = t.request("PATCH", "/reviews/approve", Some(&admin), Some(approve)).await;
        assert_eq!(body, json!({ "matchedCount": 1, "modifiedCount": 0 }));

        let snapshot = t.state.metrics.get_snapshot();
        assert_eq!(snapshot.reviews_submitted, 1);
        assert_eq!(snapshot.reviews_approved, 1);
    }

    #[tokio::test]
    async fn test_approve_requires_exact_identity() {
        let t = setup().await;
        let admin = t.admin("admin@example.com").await;
        let reader = t.signup("Ada", "ada@example.com").await;
        let book = t.create_book(&admin, "Dune", &[], 4.5).await;
        t.request(
            "PATCH",
            &format!("/books/review/{}", book),
            Some(&reader),
            Some(json!({ "rating": 4, "comment": "Fine", "date": "2024-03-01T10:00:00.000Z" })),
        )
        .await;

        let (status, body) = t
            .request(
                "PATCH",
                "/reviews/approve",
                Some(&admin),
                Some(json!({ "bookId": book, "email": "ada@example.com", "date": "2024-03-01T10:00:00.001Z" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "matchedCount": 0, "modifiedCount": 0 }));
        assert_eq!(t.count("SELECT COUNT(*) FROM reviews WHERE status = 'pending'").await, 1);
    }

    #[tokio::test]
    async fn test_submit_defaults_and_duplicates() {
        let t = setup().await;
        let admin = t.admin("admin@example.com").await;
        let reader = t.signup("Ada", "ada@example.com").await;
        let book = t.create_book(&admin, "Dune", &[], 4.5).await;

        for _ in 0..2 {
            let (_, body) = t
                .request(
                    "PATCH",
                    &format!("/books/review/{}", book),
                    Some(&reader),
                    Some(json!({ "rating": 3.5, "comment": "Again" })),
                )
                .await;
            assert_eq!(body["modifiedCount"], 1);
        }

        let (_, detail) = t.get(&format!("/books/{}", book), &reader).await;
        let reviews = detail["reviews"].as_array().unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0]["name"], "Ada");
        assert_eq!(reviews[0]["email"], "ada@example.com");
        assert!(reviews[0]["date"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_submit_to_unknown_book_matches_nothing() {
        let t = setup().await;
        let reader = t.signup("Ada", "ada@example.com").await;
        let (status, body) = t
            .request("PATCH", "/books/review/nope", Some(&reader), Some(json!({ "rating": 4, "comment": "?" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "matchedCount": 0, "modifiedCount": 0 }));
        assert_eq!(t.count("SELECT COUNT(*) FROM reviews").await, 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_out_of_range_rating() {
        let t = setup().await;
        let admin = t.admin("admin@example.com").await;
        let book = t.create_book(&admin, "Dune", &[], 4.5).await;
        let (status, _) = t
            .request("PATCH", &format!("/books/review/{}", book), Some(&admin), Some(json!({ "rating": 7, "comment": "!" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_approve_flips_only_the_addressed_review() {
        let t = setup().await;
        let admin = t.admin("admin@example.com").await;
        let ada = t.signup("Ada", "ada@example.com").await;
        let bob = t.signup("Bob", "bob@example.com").await;
        let book = t.create_book(&admin, "Dune", &[], 4.5).await;
        let date = "2024-03-01T10:00:00.000Z";

        for (token, comment) in [(&ada, "From Ada"), (&bob, "From Bob")] {
            t.request(
                "PATCH",
                &format!("/books/review/{}", book),
                Some(token),
                Some(json!({ "rating": 4, "comment": comment, "date": date })),
            )
            .await;
        }

        let (_, body) = t
            .request(
                "PATCH",
                "/reviews/approve",
                Some(&admin),
                Some(json!({ "bookId": book, "email": "ada@example.com", "date": date })),
            )
            .await;
        assert_eq!(body, json!({ "matchedCount": 1, "modifiedCount": 1 }));

        let (_, pending) = t.get("/books/reviews", &admin).await;
        let pending = pending.as_array().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0]["email"], "bob@example.com");

        let (_, detail) = t.get(&format!("/books/{}", book), &admin).await;
        assert_eq!(detail["reviews"][0]["status"], "approved");
        assert_eq!(detail["reviews"][1]["status"], "pending");
    }

    #[tokio::test]
    async fn test_identical_reviews_are_approved_one_at_a_time() {
        let t = setup().await;
        let admin = t.admin("admin@example.com").await;
        let ada = t.signup("Ada", "ada@example.com").await;
        let book = t.create_book(&admin, "Dune", &[], 4.5).await;
        let date = "2024-03-01T10:00:00.000Z";

        for comment in ["First", "Second"] {
            t.request(
                "PATCH",
                &format!("/books/review/{}", book),
                Some(&ada),
                Some(json!({ "rating": 4, "comment": comment, "date": date })),
            )
            .await;
        }
        let approve = json!({ "bookId": book, "email": "ada@example.com", "date": date });

        let (_, body) = t.request("PATCH", "/reviews/approve", Some(&admin), Some(approve.clone())).await;
        assert_eq!(body, json!({ "matchedCount": 1, "modifiedCount": 1 }));
        let (_, detail) = t.get(&format!("/books/{}", book), &admin).await;
        assert_eq!(detail["reviews"][0]["comment"], "First");
        assert_eq!(detail["reviews"][0]["status"], "approved");
        assert_eq!(detail["reviews"][1]["status"], "pending");

        let (_, body) = t.request("PATCH", "/reviews/approve", Some(&admin), Some(approve.clone())).await;
        assert_eq!(body, json!({ "matchedCount": 1, "modifiedCount": 1 }));
        let (_, body) = t.request("PATCH", "/reviews/approve", Some(&admin), Some(approve)).await;
        assert_eq!(body, json!({ "matchedCount": 1, "modifiedCount": 0 }));
        assert_eq!(t.count("SELECT COUNT(*) FROM reviews WHERE status = 'pending'").await, 0);
    }
}
