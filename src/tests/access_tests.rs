#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::config::AuthConfig;
    use crate::credentials::Credentials;
    use crate::tests::support::{setup, setup_with};
    use crate::types::Role;

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let t = setup().await;
        let (status, body) = t.request("GET", "/books", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "message": "Unauthorized", "status": 401 }));

        let (status, _) = t.request("GET", "/users", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bad_tokens_are_invalid() {
        let t = setup().await;
        let (status, body) = t.request("GET", "/books", Some("not-a-jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token");

        let req = axum::http::Request::builder()
            .uri("/books")
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(axum::body::Body::empty())
            .unwrap();
        let res = tower::ServiceExt::oneshot(t.app.clone(), req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_token_signed_with_another_secret_is_rejected() {
        let t = setup().await;
        let forger = Credentials::new(&AuthConfig {
            jwt_secret: "bookworm-development-secret-change-me".to_string(),
            token_ttl_hours: 24,
            bcrypt_cost: 4,
        });
        let forged = forger.issue_token("nobody", "evil@example.com", Role::Admin).unwrap();

        let (status, body) = t.get("/users", &forged).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token");
    }

    #[tokio::test]
    async fn test_admin_route_forbidden_for_regular_user() {
        let t = setup().await;
        let user = t.signup("Ada", "ada@example.com").await;

        for (method, uri) in [("GET", "/users"), ("GET", "/genre-stats"), ("GET", "/user-register-stats"), ("GET", "/metrics")] {
            let (status, body) = t.request(method, uri, Some(&user), None).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{} {}", method, uri);
            assert_eq!(body, json!({ "message": "Forbidden", "status": 403 }));
        }

        let (status, _) = t.request("POST", "/books", Some(&user), Some(json!({ "title": "Dune" }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(t.count("SELECT COUNT(*) FROM books").await, 0);
    }

    #[tokio::test]
    async fn test_role_is_read_from_token() {
        let t = setup().await;
        let stale = t.signup("Ada", "ada@example.com").await;
        sqlx::query("UPDATE users SET role = 'admin'").execute(&t.state.db).await.unwrap();

        // Promotion takes effect on the next login, not for tokens already issued
        let (status, _) = t.get("/users", &stale).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_genre_listing_switch() {
        let open = setup().await;
        let user = open.signup("Ada", "ada@example.com").await;
        let (status, _) = open.get("/genres", &user).await;
        assert_eq!(status, StatusCode::OK);

        let closed = setup_with(|cfg| cfg.access.open_genre_listing = false).await;
        let user = closed.signup("Ada", "ada@example.com").await;
        let (status, _) = closed.get("/genres", &user).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_moderation_switch() {
        let t = setup().await;
        let user = t.signup("Ada", "ada@example.com").await;
        let (status, _) = t.get("/books/reviews", &user).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let open = setup_with(|cfg| cfg.access.admin_moderation = false).await;
        let user = open.signup("Ada", "ada@example.com").await;
        let (status, body) = open.get("/books/reviews", &user).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }
}
