//! HTTP router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Appointment routes live under `/api/appointments`, GDPR routes under
//! `/api/gdpr`; `/`, `/health` and `/metrics` sit at the root.
//!
//! Layers (outermost → innermost):
//! 1. Trace (only when request tracing is enabled) → 2. Extension(ApiContext)
//! → 3. CORS → 4. Metrics recorder

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the full API router around a shared `CoreState`.
///
/// `trace` adds a `TraceLayer` that emits one span per request.
pub fn api_router(core: Arc<CoreState>, trace: bool) -> Router {
    build_router(ApiContext::new(core), trace)
}

/// Build the router from a pre-constructed `ApiContext`.
///
/// Middleware uses `Extension<ApiContext>`; handlers use `State<ApiContext>`.
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn build_router(ctx: ApiContext, trace: bool) -> Router {
    let appointments = Router::new()
        .route(
            "/",
            get(endpoints::appointments::list).post(endpoints::appointments::create),
        )
        .route(
            "/:id",
            get(endpoints::appointments::get)
                .put(endpoints::appointments::update)
                .delete(endpoints::appointments::delete),
        );

    let gdpr = Router::new()
        .route("/access/:user_id", get(endpoints::gdpr::access))
        .route("/rectify/:user_id", put(endpoints::gdpr::rectify))
        .route("/erase/:user_id", delete(endpoints::gdpr::erase))
        .route("/restrict/:user_id", put(endpoints::gdpr::restrict))
        .route("/portability/:user_id", get(endpoints::gdpr::portability))
        .route("/object/:user_id", put(endpoints::gdpr::object))
        .route("/consent/:user_id", post(endpoints::gdpr::consent))
        .route(
            "/breach-notification",
            post(endpoints::gdpr::breach_notification),
        )
        .route("/audit/:user_id", get(endpoints::gdpr::audit));

    let router = Router::new()
        .route("/", get(endpoints::health::root))
        .route("/health", get(endpoints::health::check))
        .route("/metrics", get(endpoints::metrics::scrape))
        .nest("/api/appointments", appointments)
        .nest("/api/gdpr", gdpr)
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::metrics::record))
        .layer(CorsLayer::permissive())
        // Extension must be outside the metrics layer so it can read ApiContext
        .layer(axum::Extension(ctx));

    if trace {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::db::repository;
    use crate::models::NewUser;

    fn test_ctx() -> ApiContext {
        ApiContext::new(Arc::new(CoreState::in_memory().unwrap()))
    }

    fn checkup() -> Value {
        json!({
            "title": "Annual Checkup",
            "description": "Routine yearly physical",
            "dateTime": "2024-01-15T10:00:00.000Z",
            "clinic": "c1",
            "clinicName": "City Medical Center",
            "image": "https://images.example.com/clinic.jpg",
            "address": "123 Main St, Downtown",
            "doctor": "Dr. Sarah Johnson",
            "doctorSpecialty": "General Practitioner"
        })
    }

    fn make_request(method: &str, uri: &str, body: Option<&Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    /// Send one request; JSON bodies are parsed, anything else comes back
    /// as a JSON string.
    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<&Value>,
    ) -> (StatusCode, Value) {
        send(app, make_request(method, uri, body)).await
    }

    async fn create_checkup(app: &Router) -> Value {
        let (status, body) = call(app, "POST", "/api/appointments", Some(&checkup())).await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    // ── Ancillary routes ────────────────────────────────────

    #[tokio::test]
    async fn root_reports_liveness() {
        let app = build_router(test_ctx(), false);
        let (status, body) = call(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Healthcare Appointment API is running");
    }

    #[tokio::test]
    async fn health_reports_connected_store() {
        let app = build_router(test_ctx(), false);
        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "database": "connected"}));
    }

    #[tokio::test]
    async fn health_reports_503_when_store_is_unreachable() {
        let ctx = test_ctx();
        ctx.core
            .with_db(|conn| Ok(conn.execute_batch("DROP TABLE schema_version")?))
            .unwrap();
        let app = build_router(ctx, false);

        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({"status": "error", "database": "disconnected"}));
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = build_router(test_ctx(), false);
        let (status, _) = call(&app, "GET", "/nonexistent", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_count_requests_by_route_method_and_status() {
        let app = build_router(test_ctx(), false);
        create_checkup(&app).await;
        call(&app, "GET", "/api/appointments", None).await;
        let missing = format!("/api/appointments/{}", Uuid::new_v4());
        call(&app, "GET", &missing, None).await;

        let response = app
            .clone()
            .oneshot(make_request("GET", "/metrics", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(text.contains(
            "http_request_total{method=\"POST\",route=\"/api/appointments\",code=\"201\"} 1"
        ));
        assert!(text.contains(
            "http_request_total{method=\"GET\",route=\"/api/appointments\",code=\"200\"} 1"
        ));
        assert!(text.contains(
            "http_request_total{method=\"GET\",route=\"/api/appointments/:id\",code=\"404\"} 1"
        ));
    }

    async fn scrape(app: &Router) -> String {
        let (status, body) = call(app, "GET", "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        body.as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn unmatched_paths_share_one_metrics_series() {
        let app = build_router(test_ctx(), false);
        for i in 0..50 {
            let (status, _) = call(&app, "GET", &format!("/scan{i}/x"), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
        for _ in 0..3 {
            let uri = format!("/api/appointments/{}", Uuid::new_v4());
            call(&app, "GET", &uri, None).await;
        }

        let text = scrape(&app).await;
        let totals: Vec<&str> = text
            .lines()
            .filter(|line| line.starts_with("http_request_total{"))
            .collect();
        assert!(totals.contains(
            &"http_request_total{method=\"GET\",route=\"unmatched\",code=\"404\"} 50"
        ));
        assert!(totals.contains(
            &"http_request_total{method=\"GET\",route=\"/api/appointments/:id\",code=\"404\"} 3"
        ));
        assert_eq!(totals.len(), 2);
        assert!(!text.contains("/scan"));
    }

    #[tokio::test]
    async fn tracing_layer_keeps_routes_intact() {
        let app = build_router(test_ctx(), true);
        let (status, _) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let app = build_router(test_ctx(), false);
        let req = Request::builder()
            .method("GET")
            .uri("/api/appointments")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    // ── Appointments ────────────────────────────────────────

    #[tokio::test]
    async fn create_then_get_returns_payload_with_id_and_timestamps() {
        let app = build_router(test_ctx(), false);
        let created = create_checkup(&app).await;
        let id = created["_id"].as_str().unwrap().to_string();

        let (status, fetched) = call(&app, "GET", &format!("/api/appointments/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        for (key, value) in checkup().as_object().unwrap() {
            assert_eq!(&fetched[key], value, "field {key}");
        }
        assert_eq!(fetched["_id"], id.as_str());
        assert!(fetched["createdAt"].is_string());
        assert!(fetched["updatedAt"].is_string());
    }

    #[tokio::test]
    async fn annual_checkup_lifecycle() {
        let app = build_router(test_ctx(), false);
        let created = create_checkup(&app).await;
        let id = created["_id"].as_str().unwrap();

        let (_, list) = call(&app, "GET", "/api/appointments", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, body) = call(&app, "DELETE", &format!("/api/appointments/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Appointment deleted successfully"}));

        let (_, list) = call(&app, "GET", "/api/appointments", None).await;
        assert!(list.as_array().unwrap().is_empty());

        let (status, body) = call(&app, "GET", &format!("/api/appointments/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"message": "Appointment not found"}));
    }

    #[tokio::test]
    async fn concurrent_creates_get_distinct_ids() {
        let app = build_router(test_ctx(), false);
        let requests = (0..5).map(|i| {
            let app = app.clone();
            async move {
                let mut payload = checkup();
                payload["title"] = json!(format!("Visit {i}"));
                call(&app, "POST", "/api/appointments", Some(&payload)).await
            }
        });
        let results = futures_util::future::join_all(requests).await;

        let mut ids: Vec<String> = results
            .iter()
            .map(|(status, body)| {
                assert_eq!(*status, StatusCode::CREATED);
                body["_id"].as_str().unwrap().to_string()
            })
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);

        let (_, list) = call(&app, "GET", "/api/appointments", None).await;
        assert_eq!(list.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let app = build_router(test_ctx(), false);
        for title in ["First", "Second", "Third"] {
            let mut payload = checkup();
            payload["title"] = json!(title);
            call(&app, "POST", "/api/appointments", Some(&payload)).await;
        }
        let (_, list) = call(&app, "GET", "/api/appointments", None).await;
        let titles: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, ["First", "Second", "Third"]);
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let app = build_router(test_ctx(), false);
        let created = create_checkup(&app).await;
        let id = created["_id"].as_str().unwrap();

        let (status, updated) = send(
            &app,
            make_request(
                "PUT",
                &format!("/api/appointments/{id}"),
                Some(&json!({"title": "Updated"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Updated");
        for key in [
            "description",
            "dateTime",
            "clinic",
            "clinicName",
            "image",
            "address",
            "doctor",
            "doctorSpecialty",
        ] {
            assert_eq!(updated[key], created[key], "field {key}");
        }
        assert_eq!(updated["createdAt"], created["createdAt"]);
    }

    #[tokio::test]
    async fn update_rejects_empty_field() {
        let app = build_router(test_ctx(), false);
        let created = create_checkup(&app).await;
        let id = created["_id"].as_str().unwrap();

        let (status, body) = send(
            &app,
            make_request("PUT", &format!("/api/appointments/{id}"), Some(&json!({"doctor": ""}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("doctor"));
    }

    #[tokio::test]
    async fn unknown_ids_are_404() {
        let app = build_router(test_ctx(), false);
        let uri = format!("/api/appointments/{}", Uuid::new_v4());

        let (status, _) = call(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "PUT", &uri, Some(&json!({"title": "x"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = call(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Appointment not found");
    }

    #[tokio::test]
    async fn malformed_ids_map_per_operation() {
        let app = build_router(test_ctx(), false);
        let uri = "/api/appointments/not-an-id";

        let (status, body) = call(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An internal error occurred");
        let (status, _) = call(&app, "DELETE", uri, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let (status, _) = call(&app, "PUT", uri, Some(&json!({"title": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_field_is_400_and_creates_nothing() {
        let ctx = test_ctx();
        let app = build_router(ctx.clone(), false);
        let mut payload = checkup();
        payload.as_object_mut().unwrap().remove("clinicName");

        let (status, body) = call(&app, "POST", "/api/appointments", Some(&payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("clinicName"));

        let count = ctx.core.with_db(repository::count_appointments).unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let app = build_router(test_ctx(), false);
        let req = Request::builder()
            .method("POST")
            .uri("/api/appointments")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"title\": "))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn store_failure_returns_generic_500() {
        let ctx = test_ctx();
        ctx.core
            .with_db(|conn| Ok(conn.execute_batch("DROP TABLE appointments")?))
            .unwrap();
        let app = build_router(ctx, false);

        let (status, body) = call(&app, "GET", "/api/appointments", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"message": "An internal error occurred"}));

        let (status, _) = call(&app, "POST", "/api/appointments", Some(&checkup())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    // ── GDPR ────────────────────────────────────────────────

    fn seed_user(ctx: &ApiContext) -> String {
        let user = ctx
            .core
            .with_db(|conn| {
                repository::insert_user(
                    conn,
                    &NewUser {
                        name: Some("Jane Doe".into()),
                        email: Some("jane@example.com".into()),
                        phone: Some("555-123-4567".into()),
                        date_of_birth: Some("1990-04-01".into()),
                        medical_id: Some("MED-001".into()),
                        consent_given: true,
                        data_processing_purposes: vec!["treatment".into()],
                    },
                )
            })
            .unwrap();
        user.id.to_string()
    }

    async fn audit_actions(app: &Router, user_id: &str) -> Vec<String> {
        let (status, body) = call(app, "GET", &format!("/api/gdpr/audit/{user_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        body["auditLogs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["action"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn gdpr_access_returns_data_and_audits() {
        let ctx = test_ctx();
        let user_id = seed_user(&ctx);
        let app = build_router(ctx, false);

        let (status, body) = send(
            &app,
            make_request("GET", &format!("/api/gdpr/access/{user_id}?requestedBy=patient"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Data access request processed");
        assert_eq!(body["data"]["personalData"]["email"], "jane@example.com");
        assert_eq!(body["data"]["consent"]["given"], true);
        assert_eq!(body["data"]["consent"]["purposes"], json!(["treatment"]));

        assert_eq!(audit_actions(&app, &user_id).await, ["DATA_ACCESS_REQUEST"]);
    }

    #[tokio::test]
    async fn gdpr_unknown_and_malformed_users() {
        let app = build_router(test_ctx(), false);

        let (status, body) = call(
            &app,
            "GET",
            &format!("/api/gdpr/access/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "User not found"}));

        let (status, body) = call(&app, "GET", "/api/gdpr/access/bogus", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Internal server error"}));
    }

    #[tokio::test]
    async fn gdpr_rectify_applies_personal_fields_only() {
        let ctx = test_ctx();
        let user_id = seed_user(&ctx);
        let app = build_router(ctx.clone(), false);

        let corrections = json!({
            "corrections": {"email": "jane.doe@example.com", "favouriteColour": "blue"}
        });
        let (status, body) = send(
            &app,
            make_request("PUT", &format!("/api/gdpr/rectify/{user_id}"), Some(&corrections)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let mut fields: Vec<&str> = body["updatedFields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        fields.sort();
        assert_eq!(fields, ["email", "favouriteColour"]);

        let id = Uuid::parse_str(&user_id).unwrap();
        let user = ctx.core.with_db(|conn| repository::get_user(conn, &id)).unwrap().unwrap();
        assert_eq!(user.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(audit_actions(&app, &user_id).await, ["DATA_RECTIFICATION"]);
    }

    #[tokio::test]
    async fn gdpr_rectify_rejects_bad_input() {
        let ctx = test_ctx();
        let user_id = seed_user(&ctx);
        let app = build_router(ctx, false);
        let uri = format!("/api/gdpr/rectify/{user_id}");

        let (status, body) = call(
            &app,
            "PUT",
            &uri,
            Some(&json!({"corrections": {"email": "nope"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid email format");

        let (status, _) = call(&app, "PUT", &uri, Some(&json!({"requestedBy": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(audit_actions(&app, &user_id).await.is_empty());
    }

    #[tokio::test]
    async fn gdpr_erase_removes_user_and_audits() {
        let ctx = test_ctx();
        let user_id = seed_user(&ctx);
        let app = build_router(ctx.clone(), false);

        let (status, body) = send(
            &app,
            make_request(
                "DELETE",
                &format!("/api/gdpr/erase/{user_id}"),
                Some(&json!({"reason": "leaving"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userId"], user_id.as_str());

        let id = Uuid::parse_str(&user_id).unwrap();
        assert!(ctx.core.with_db(|conn| repository::get_user(conn, &id)).unwrap().is_none());
        assert_eq!(audit_actions(&app, &user_id).await, ["DATA_ERASURE"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_gdpr_updates_keep_every_change() {
        let ctx = test_ctx();
        let user_id = seed_user(&ctx);
        let id = Uuid::parse_str(&user_id).unwrap();
        let app = build_router(ctx.clone(), false);

        for round in 0..10 {
            let name = format!("Jane Smith {round}");
            let requests = [
                make_request(
                    "PUT",
                    &format!("/api/gdpr/rectify/{user_id}"),
                    Some(&json!({"corrections": {"name": name}})),
                ),
                make_request(
                    "PUT",
                    &format!("/api/gdpr/restrict/{user_id}"),
                    Some(&json!({"restrictionType": "temporary", "reason": "dispute"})),
                ),
                make_request(
                    "PUT",
                    &format!("/api/gdpr/object/{user_id}"),
                    Some(&json!({"objectionType": "marketing"})),
                ),
                make_request(
                    "POST",
                    &format!("/api/gdpr/consent/{user_id}"),
                    Some(&json!({"consentGiven": true, "purposes": ["treatment", "research"]})),
                ),
            ];
            let handles: Vec<_> = requests
                .into_iter()
                .map(|req| {
                    let app = app.clone();
                    tokio::spawn(async move { send(&app, req).await.0 })
                })
                .collect();
            for handle in futures_util::future::join_all(handles).await {
                assert_eq!(handle.unwrap(), StatusCode::OK);
            }

            let user = ctx
                .core
                .with_db(|conn| repository::get_user(conn, &id))
                .unwrap()
                .unwrap();
            assert_eq!(user.name.as_deref(), Some(name.as_str()));
            assert!(user.processing_restricted);
            assert_eq!(user.restriction_type.as_deref(), Some("temporary"));
            assert!(user.objection_filed);
            assert_eq!(user.data_processing_purposes, vec!["treatment", "research"]);
            assert_eq!(user.email.as_deref(), Some("jane@example.com"));
        }
    }

    async fn personal_data_of(app: &Router, user_id: &str) -> Value {
        let (status, body) = call(app, "GET", &format!("/api/gdpr/access/{user_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["personalData"].clone()
    }

    #[tokio::test]
    async fn gdpr_rectify_allows_shared_email() {
        let ctx = test_ctx();
        let first = seed_user(&ctx);
        let second = ctx
            .core
            .with_db(|conn| {
                repository::insert_user(
                    conn,
                    &NewUser {
                        email: Some("john@example.com".into()),
                        ..NewUser::default()
                    },
                )
            })
            .unwrap();
        let app = build_router(ctx, false);

        let (status, _) = send(
            &app,
            make_request(
                "PUT",
                &format!("/api/gdpr/rectify/{}", second.id),
                Some(&json!({"corrections": {"email": "jane@example.com"}})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(personal_data_of(&app, &first).await["email"], "jane@example.com");
        assert_eq!(
            personal_data_of(&app, &second.id.to_string()).await["email"],
            "jane@example.com"
        );
    }

    #[tokio::test]
    async fn gdpr_erase_refused_under_legal_hold() {
        let ctx = test_ctx();
        let user_id = seed_user(&ctx);
        let app = build_router(ctx, false);

        let (status, body) = send(
            &app,
            make_request(
                "PUT",
                &format!("/api/gdpr/restrict/{user_id}"),
                Some(&json!({"restrictionType": "legal_hold", "reason": "litigation"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["restrictionType"], "legal_hold");

        let (status, body) = call(
            &app,
            "DELETE",
            &format!("/api/gdpr/erase/{user_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["reason"], "Legal exception applies");
    }

    #[tokio::test]
    async fn gdpr_portability_formats() {
        let ctx = test_ctx();
        let user_id = seed_user(&ctx);
        let app = build_router(ctx, false);

        let response = app
            .clone()
            .oneshot(make_request("GET", &format!("/api/gdpr/portability/{user_id}"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            format!("attachment; filename=\"user-data-{user_id}.json\"").as_str()
        );
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["personalData"]["name"], "Jane Doe");
        assert!(json["metadata"]["exportDate"].is_string());

        let response = app
            .clone()
            .oneshot(make_request(
                "GET",
                &format!("/api/gdpr/portability/{user_id}?format=xml"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/xml");
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
        let xml = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(xml.contains("<name>Jane Doe</name>"));
        assert!(xml.contains("<purposes>treatment</purposes>"));

        let (status, body) = send(
            &app,
            make_request("GET", &format!("/api/gdpr/portability/{user_id}?format=csv"), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unsupported format. Use 'json' or 'xml'");
    }

    #[tokio::test]
    async fn gdpr_object_records_objection() {
        let ctx = test_ctx();
        let user_id = seed_user(&ctx);
        let app = build_router(ctx.clone(), false);

        let (status, body) = send(
            &app,
            make_request(
                "PUT",
                &format!("/api/gdpr/object/{user_id}"),
                Some(&json!({"objectionType": "marketing", "reason": "no thanks"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Objection recorded");

        let id = Uuid::parse_str(&user_id).unwrap();
        let user = ctx.core.with_db(|conn| repository::get_user(conn, &id)).unwrap().unwrap();
        assert!(user.objection_filed);
        assert_eq!(user.objection_type.as_deref(), Some("marketing"));
    }

    #[tokio::test]
    async fn gdpr_consent_update_and_withdrawal() {
        let ctx = test_ctx();
        let user_id = seed_user(&ctx);
        let app = build_router(ctx, false);
        let uri = format!("/api/gdpr/consent/{user_id}");

        let (status, body) = send(
            &app,
            make_request(
                "POST",
                &uri,
                Some(&json!({"consentGiven": true, "purposes": ["treatment", "research"]})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Consent updated");
        assert_eq!(body["purposes"], json!(["treatment", "research"]));

        let (status, body) = call(&app, "POST", &uri, Some(&json!({"withdrawal": true}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Consent withdrawn");
        assert_eq!(body["consentGiven"], false);
        assert_eq!(body["purposes"], json!([]));

        assert_eq!(
            audit_actions(&app, &user_id).await,
            ["CONSENT_WITHDRAWAL", "CONSENT_UPDATE"]
        );
    }

    #[tokio::test]
    async fn gdpr_breach_notification_logs_system_entry() {
        let app = build_router(test_ctx(), false);

        let (status, body) = send(
            &app,
            make_request(
                "POST",
                "/api/gdpr/breach-notification",
                Some(&json!({"breachDetails": "laptop lost", "affectedUsers": ["a", "b"]})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["breachId"].as_str().unwrap().starts_with("breach-"));
        assert_eq!(body["notificationRequired"], true);

        let (_, audit) = call(&app, "GET", "/api/gdpr/audit/SYSTEM", None).await;
        assert_eq!(audit["totalLogs"], 1);
        assert_eq!(audit["auditLogs"][0]["details"]["affectedUsersCount"], 2);

        let (status, _) = send(
            &app,
            make_request(
                "POST",
                "/api/gdpr/breach-notification",
                Some(&json!({"breachDetails": "x"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn gdpr_audit_window_filters_entries() {
        let ctx = test_ctx();
        let user_id = seed_user(&ctx);
        let app = build_router(ctx, false);
        call(&app, "GET", &format!("/api/gdpr/access/{user_id}"), None).await;

        let (_, body) = send(
            &app,
            make_request(
                "GET",
                &format!("/api/gdpr/audit/{user_id}?startDate=2000-01-01&endDate=2000-12-31"),
                None,
            ),
        )
        .await;
        assert_eq!(body["totalLogs"], 0);

        let (status, _) = send(
            &app,
            make_request(
                "GET",
                &format!("/api/gdpr/audit/{user_id}?startDate=soon&endDate=later"),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
