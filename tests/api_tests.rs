//! End-to-end tests over the full router with the in-memory backends

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use assetmarket::{
    config::{
        Config, DatabaseConfig, JwtConfig, NsfwConfig, SchedulerConfig, ServerConfig,
        StorageConfig, StoreBackend,
    },
    constants::{roles, BAN_NOTICE_PATH},
    create_router,
    db::{MemoryStore, Store, UserStore},
    error::AppResult,
    models::NewUser,
    services::{
        nsfw_service::Classification, AuthService, MemoryObjectStorage, NsfwDetector,
        StorageUploadPublisher, UploadWorker,
    },
    state::AppState,
    utils::{Clock, ManualClock},
};

const PASSWORD: &str = "correct-horse-battery";

struct StubDetector;

#[async_trait]
impl NsfwDetector for StubDetector {
    async fn classify(&self, _image: Vec<u8>, _file_name: String) -> AppResult<Classification> {
        Ok(Classification {
            is_nsfw: false,
            category: "neutral".to_string(),
            confidence: 0.9731,
        })
    }
}

fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            rust_log: "warn".to_string(),
            json_logs: false,
        },
        database: DatabaseConfig {
            backend: StoreBackend::Memory,
            url: None,
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            expiry_hours: 24,
        },
        storage: StorageConfig {
            base_url: "http://storage.invalid/v0/b".to_string(),
            bucket: "test-bucket".to_string(),
        },
        nsfw: NsfwConfig {
            detector_url: "http://detector.invalid/classify".to_string(),
            threshold: 0.7,
            checks_per_minute: 30,
        },
        scheduler: SchedulerConfig {
            enabled: false,
            poll_interval_secs: 60,
            lease_secs: 300,
            worker_id: "test-worker".to_string(),
        },
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    storage: Arc<MemoryObjectStorage>,
    clock: Arc<ManualClock>,
    config: Config,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let storage = Arc::new(MemoryObjectStorage::new());
        // Tokens are checked against wall time, so start the clock there.
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let config = test_config();

        let state = AppState::new(
            store.clone(),
            storage.clone(),
            Arc::new(StubDetector),
            clock.clone(),
            config.clone(),
        );

        Self {
            router: create_router(state),
            store,
            storage,
            clock,
            config,
        }
    }

    fn worker(&self) -> UploadWorker {
        let store: Arc<dyn Store> = self.store.clone();
        UploadWorker::new(
            store,
            Arc::new(StorageUploadPublisher::new(self.storage.clone())),
            self.clock.clone(),
            &self.config.scheduler,
        )
    }

    async fn seed_user(&self, username: &str, role: &str) -> Uuid {
        let user = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: AuthService::hash_password(PASSWORD).unwrap(),
                display_name: None,
                role: role.to_string(),
                created_at: self.clock.now(),
            })
            .await
            .unwrap();
        user.id
    }

    async fn login(&self, username: &str) -> String {
        let (status, _, body) = self
            .send(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "identifier": username, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }
}

fn schedule_body(asset_id: Uuid, scheduled_for: chrono::DateTime<Utc>) -> Value {
    json!({
        "assetId": asset_id,
        "files": [{ "name": "model.fbx", "size": 2048, "contentType": "application/octet-stream" }],
        "changeNotes": "Rigging fixes",
        "scheduledFor": scheduled_for,
    })
}

fn multipart_request(uri: &str, image: Option<&[u8]>) -> Request<Body> {
    let boundary = "assetmarket-test-boundary";
    let mut body = Vec::new();
    if let Some(image) = image {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cover.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(image);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, _, body) = app.send(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = TestApp::new();

    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "username": "maker", "email": "maker@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], roles::MEMBER);

    let token = app.login("maker@example.com").await;
    let (status, _, body) = app.send(Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "maker");

    let (status, _, _) = app.send(Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_schedule_in_past_is_rejected() {
    let app = TestApp::new();
    app.seed_user("seller", roles::MEMBER).await;
    let token = app.login("seller").await;

    let past = app.clock.now() - Duration::hours(1);
    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/uploads/scheduled",
            Some(&token),
            Some(schedule_body(Uuid::new_v4(), past)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _, body) = app
        .send(Method::GET, "/api/v1/uploads/scheduled", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_scheduled_upload_lifecycle() {
    let app = TestApp::new();
    app.seed_user("seller", roles::MEMBER).await;
    app.seed_user("root", roles::ADMIN).await;
    let token = app.login("seller").await;
    let admin = app.login("root").await;

    let asset_id = Uuid::new_v4();
    let publish_at = app.clock.now() + Duration::hours(1);
    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/uploads/scheduled",
            Some(&token),
            Some(schedule_body(asset_id, publish_at)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "scheduled");
    assert_eq!(body["timeRemaining"], "1h 0m");
    let id = body["id"].as_str().unwrap().to_string();

    app.storage.put(
        &format!("assets/{}/model.fbx", asset_id),
        "application/octet-stream",
        vec![0u8; 16],
    );

    let worker = app.worker();
    assert_eq!(worker.run_once().await.claimed, 0);

    app.clock.advance(Duration::minutes(61));

    let (_, _, body) = app
        .send(
            Method::GET,
            "/api/v1/admin/scheduled-uploads/pending",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["uploads"][0]["id"], id.as_str());

    let report = worker.run_once().await;
    assert_eq!(report.claimed, 1);
    assert_eq!(report.completed, 1);

    let (status, _, body) = app
        .send(
            Method::GET,
            &format!("/api/v1/uploads/scheduled/{}", id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["claimedBy"], "test-worker");

    let (status, _, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/uploads/scheduled/{}/cancel", id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, _, body) = app
        .send(
            Method::GET,
            "/api/v1/admin/scheduled-uploads/pending",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_missing_file_fails_upload() {
    let app = TestApp::new();
    app.seed_user("seller", roles::MEMBER).await;
    let token = app.login("seller").await;

    let publish_at = app.clock.now() + Duration::minutes(5);
    let (status, _, body) = app
        .send(
            Method::POST,
            "/api/v1/uploads/scheduled",
            Some(&token),
            Some(schedule_body(Uuid::new_v4(), publish_at)),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().unwrap().to_string();

    app.clock.advance(Duration::minutes(10));
    let report = app.worker().run_once().await;
    assert_eq!(report.failed, 1);

    let (_, _, body) = app
        .send(
            Method::GET,
            &format!("/api/v1/uploads/scheduled/{}", id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(body["status"], "failed");
    assert!(body["errorMessage"].as_str().unwrap().contains("model.fbx"));
}

#[tokio::test]
async fn test_other_users_upload_is_forbidden() {
    let app = TestApp::new();
    app.seed_user("seller", roles::MEMBER).await;
    app.seed_user("snoop", roles::MEMBER).await;
    let owner = app.login("seller").await;
    let other = app.login("snoop").await;

    let publish_at = app.clock.now() + Duration::hours(3);
    let (_, _, body) = app
        .send(
            Method::POST,
            "/api/v1/uploads/scheduled",
            Some(&owner),
            Some(schedule_body(Uuid::new_v4(), publish_at)),
        )
        .await;
    let id = body["id"].as_str().unwrap().to_string();

    let (status, _, _) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/uploads/scheduled/{}", id),
            Some(&other),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/uploads/scheduled/{}", id),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_ban_and_unban_are_audited() {
    let app = TestApp::new();
    let admin_id = app.seed_user("root", roles::ADMIN).await;
    let target_id = app.seed_user("spammer", roles::MEMBER).await;
    let admin = app.login("root").await;
    let target = app.login("spammer").await;

    let (status, _, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/admin/users/{}/ban", target_id),
            Some(&admin),
            Some(json!({ "reason": "Repeated spam listings" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["warning"]["type"], "ban");
    assert_eq!(body["warning"]["isActive"], true);

    let (status, _, _) = app
        .send(
            Method::POST,
            &format!("/api/v1/admin/users/{}/ban", target_id),
            Some(&admin),
            Some(json!({ "reason": "Again" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, headers, _) = app
        .send(Method::GET, "/api/v1/uploads/scheduled", Some(&target), None)
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers[header::LOCATION], BAN_NOTICE_PATH);

    let (status, _, body) = app.send(Method::GET, BAN_NOTICE_PATH, Some(&target), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["permanent"], true);
    assert_eq!(body["reason"], "Repeated spam listings");

    app.clock.advance(Duration::minutes(5));
    let (status, _, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/admin/users/{}/unban", target_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deactivatedWarnings"], 1);

    let user = app.store.find_user_by_id(target_id).await.unwrap().unwrap();
    assert!(!user.is_banned);
    assert!(user.ban_reason.is_none());

    let (status, _, body) = app
        .send(
            Method::GET,
            &format!("/api/v1/admin/audit-logs?targetUserId={}", target_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["logs"][0]["action"], "user_unbanned");
    assert_eq!(body["logs"][1]["action"], "user_banned");
    assert_eq!(body["logs"][1]["performedBy"], admin_id.to_string());

    let (status, _, _) = app
        .send(Method::GET, "/api/v1/uploads/scheduled", Some(&target), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_suspension_redirects_and_clean_user_passes() {
    let app = TestApp::new();
    app.seed_user("root", roles::FOUNDER).await;
    let target_id = app.seed_user("late-payer", roles::MEMBER).await;
    app.seed_user("regular", roles::MEMBER).await;
    let admin = app.login("root").await;
    let target = app.login("late-payer").await;
    let regular = app.login("regular").await;

    let (status, _, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/admin/users/{}/warnings", target_id),
            Some(&admin),
            Some(json!({ "type": "suspension", "reason": "Chargebacks", "durationHours": 48 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["type"], "suspension");

    let (status, headers, _) = app
        .send(Method::GET, "/api/v1/uploads/scheduled", Some(&target), None)
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers[header::LOCATION], BAN_NOTICE_PATH);

    let (status, _, body) = app
        .send(Method::GET, "/api/v1/moderation/guard", Some(&target), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "redirect_to_ban_notice");

    let (_, _, body) = app.send(Method::GET, BAN_NOTICE_PATH, Some(&target), None).await;
    assert_eq!(body["permanent"], false);
    assert_eq!(body["daysRemaining"], 2);

    let (status, _, body) = app
        .send(Method::GET, "/api/v1/uploads/scheduled", Some(&regular), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);

    let (status, _, _) = app.send(Method::GET, BAN_NOTICE_PATH, Some(&regular), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_routes_require_moderator() {
    let app = TestApp::new();
    app.seed_user("support-agent", roles::SUPPORT).await;
    let token = app.login("support-agent").await;

    let (status, _, body) = app
        .send(Method::GET, "/api/v1/admin/users", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_download_rejects_traversal_and_missing() {
    let app = TestApp::new();

    let (status, _, body) = app
        .send(Method::GET, "/api/download?filePath=..%2Fsecret", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid file path");

    let (status, _, body) = app.send(Method::GET, "/api/download", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing filePath parameter");

    let (status, _, body) = app
        .send(Method::GET, "/api/download?filePath=assets%2Fnope.zip", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "OBJECT_NOT_FOUND");
}

#[tokio::test]
async fn test_download_denied_object_is_forbidden() {
    let app = TestApp::new();
    app.storage.put("private/ledger.csv", "text/csv", b"secret".to_vec());
    app.storage.deny("private/");

    let (status, _, body) = app
        .send(Method::GET, "/api/download?filePath=private%2Fledger.csv", None, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied");
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_download_streams_object() {
    let app = TestApp::new();
    app.storage
        .put("assets/pack/textures.zip", "application/zip", b"PK\x03\x04".to_vec());

    let request = Request::builder()
        .uri("/api/download?filePath=assets%2Fpack%2Ftextures.zip&fileName=Textures.zip")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Textures.zip\""
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"PK\x03\x04");
}

#[tokio::test]
async fn test_nsfw_check_approves_and_rate_limits() {
    let app = TestApp::new();

    let (status, _, body) = app
        .dispatch(multipart_request("/api/nsfw-check?userId=u1", Some(b"\x89PNG fake")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approved"], true);
    assert_eq!(body["confidence"], 0.97);

    let (status, _, body) = app
        .dispatch(multipart_request("/api/nsfw-check?userId=u1", None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "NO_IMAGE");

    for _ in 0..28 {
        let (status, _, _) = app
            .dispatch(multipart_request("/api/nsfw-check?userId=u1", None))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _, body) = app
        .dispatch(multipart_request("/api/nsfw-check?userId=u1", None))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["retryAfter"], 60);

    let (status, _, _) = app
        .dispatch(multipart_request("/api/nsfw-check?userId=u2", Some(b"img")))
        .await;
    assert_eq!(status, StatusCode::OK);

    app.clock.advance(Duration::seconds(61));
    let (status, _, _) = app
        .dispatch(multipart_request("/api/nsfw-check?userId=u1", Some(b"img")))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_nsfw_stats_reflect_checks() {
    let app = TestApp::new();
    app.seed_user("root", roles::ADMIN).await;
    let admin = app.login("root").await;

    for user in ["a", "b"] {
        let (status, _, _) = app
            .dispatch(multipart_request(
                &format!("/api/nsfw-check?userId={}", user),
                Some(b"img"),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _, body) = app
        .send(Method::GET, "/api/v1/admin/nsfw/stats", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    tokio_test::assert_ok!(serde_json::from_value::<Value>(body["stats"].clone()));
    assert_eq!(body["stats"]["totalChecks"], 2);
    assert_eq!(body["stats"]["approved"], 2);

    let (_, _, body) = app
        .send(Method::GET, "/api/v1/admin/nsfw/audit?limit=1", Some(&admin), None)
        .await;
    assert_eq!(body["count"], 1);
}
