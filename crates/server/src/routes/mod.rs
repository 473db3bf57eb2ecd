use axum::Router;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod auth;
pub mod roles;
pub mod tags;
pub mod tasks;
pub mod users;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(tasks::router())
        .merge(users::router())
        .merge(auth::router())
        .merge(roles::router())
        .merge(tags::router());

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use db::{DBService, partial_update::UnknownFieldPolicy};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    async fn app() -> Router {
        let db = DBService::new_in_memory().await.unwrap();
        router(AppState::new(db, UnknownFieldPolicy::Ignore))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_task_lifecycle_over_http() {
        let app = app().await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/users",
            Some(json!({"document": "D1", "name": "Ana", "secret": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let owner_id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/tasks",
            Some(json!({"owner_id": owner_id, "description": "Call client", "assigned_on": "2024-03-01"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status_id"], 1);
        assert_eq!(body["data"]["completed"], false);
        let task_id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = call(
            &app,
            Method::PATCH,
            &format!("/api/tasks/{task_id}"),
            Some(json!({"completed": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["completed"], true);
        assert_eq!(body["data"]["description"], "Call client");

        let (status, body) = call(&app, Method::GET, &format!("/api/tasks/owner/{owner_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["tags"], json!([]));

        let (status, _) = call(&app, Method::DELETE, &format!("/api/tasks/{task_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&app, Method::GET, &format!("/api/tasks/{task_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = app().await;

        let (status, _) = call(&app, Method::POST, "/api/tasks", Some(json!({"description": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::PATCH, "/api/tasks/1", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::DELETE, "/api/roles/7", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            Some(json!({"document": "nobody", "secret": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "invalid credentials");
    }

    #[tokio::test]
    async fn test_login_returns_roles_without_secret_hash() {
        let app = app().await;
        let (_, role) = call(&app, Method::POST, "/api/roles", Some(json!({"name": "admin"}))).await;
        let role_id = role["data"]["id"].as_i64().unwrap();
        call(
            &app,
            Method::POST,
            "/api/users",
            Some(json!({"document": "D1", "name": "Ana", "secret": "pw", "role_ids": [role_id]})),
        )
        .await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            Some(json!({"document": "D1", "secret": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["roles"], json!([{"id": role_id, "name": "admin"}]));
        assert!(body["data"].get("secret_hash").is_none());
    }
}
