#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::tests::support::setup;

    #[tokio::test]
    async fn test_genre_stats_sorted_by_count_then_name() {
        let t = setup().await;
        let admin = t.admin("admin@example.com").await;
        t.create_book(&admin, "Dune", &["Sci-Fi", "Classic"], 4.5).await;
        t.create_book(&admin, "Emma", &["Classic", "Romance"], 4.1).await;
        t.create_book(&admin, "Neuromancer", &["Sci-Fi"], 4.0).await;
        t.create_book(&admin, "Untagged", &[], 2.0).await;

        let (status, body) = t.get("/genre-stats", &admin).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                { "genre": "Classic", "count": 2 },
                { "genre": "Sci-Fi", "count": 2 },
                { "genre": "Romance", "count": 1 }
            ])
        );
    }

    #[tokio::test]
    async fn test_registration_trend_counts_every_user() {
        let t = setup().await;
        let admin = t.admin("admin@example.com").await;
        t.signup("Ada", "ada@example.com").await;
        t.signup("Bob", "bob@example.com").await;
        sqlx::query("UPDATE users SET created_at = '2024-01-15T12:00:00Z' WHERE email = 'bob@example.com'")
            .execute(&t.state.db)
            .await
            .unwrap();

        let (status, body) = t.get("/user-register-stats", &admin).await;
        assert_eq!(status, StatusCode::OK);
        let days = body.as_array().unwrap();
        assert_eq!(days.len(), 2);
        let total: i64 = days.iter().map(|d| d["count"].as_i64().unwrap()).sum();
        assert_eq!(total, 3);
        assert!(days[0]["date"].as_str().unwrap().starts_with("2024-01-1"));
        assert_eq!(days[1]["count"], 2);
        assert!(days.iter().all(|d| d["date"].as_str().unwrap().len() == 10));
    }

    fn local_day(utc: &str) -> String {
        chrono::DateTime::parse_from_rfc3339(utc)
            .unwrap()
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d")
            .to_string()
    }

    #[tokio::test]
    async fn test_registration_trend_groups_days_in_ascending_order() {
        let t = setup().await;
        let admin = t.admin("admin@example.com").await;
        t.signup("Ada", "ada@example.com").await;
        t.signup("Bob", "bob@example.com").await;

        let later = "2024-02-10T12:00:00Z";
        let earlier = "2024-01-15T12:00:00Z";
        sqlx::query("UPDATE users SET created_at = ?1 WHERE email IN ('admin@example.com', 'ada@example.com')")
            .bind(later)
            .execute(&t.state.db)
            .await
            .unwrap();
        sqlx::query("UPDATE users SET created_at = ?1 WHERE email = 'bob@example.com'")
            .bind(earlier)
            .execute(&t.state.db)
            .await
            .unwrap();

        let (status, body) = t.get("/user-register-stats", &admin).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                { "date": local_day(earlier), "count": 1 },
                { "date": local_day(later), "count": 2 }
            ])
        );
    }
}
