//! Integration tests for the Komuni backend.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::{Config, LogFormat};
use crate::db::{init_database, Repository};
use crate::geocode::Geocoder;
use crate::search::SearchIndex;
use crate::storage::ObjectStore;
use crate::{create_router, AppState};

const ADMIN_EMAIL: &str = "admin@komuni.org";
const ADMIN_KEY: &str = "test-admin-key";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    repo: Arc<Repository>,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let index_path = temp_dir.path().join("index");
        let upload_dir = temp_dir.path().join("uploads");

        let config = Config {
            db_path: db_path.clone(),
            index_path: index_path.clone(),
            upload_dir: upload_dir.clone(),
            public_upload_url: "/uploads".to_string(),
            max_upload_bytes: 1024 * 1024,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            log_format: LogFormat::Plain,
            // Nothing listens on the discard port, so lookups fail fast
            geocoder_url: "http://127.0.0.1:9".to_string(),
            geocoder_timeout_secs: 1,
            session_ttl_hours: 1,
            admin_emails: vec![ADMIN_EMAIL.to_string()],
            admin_api_key: Some(ADMIN_KEY.to_string()),
        };

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));
        let search = Arc::new(SearchIndex::open(&index_path).expect("Failed to init search"));
        let geocoder = Arc::new(
            Geocoder::new(&config.geocoder_url, config.geocoder_timeout_secs)
                .expect("Failed to init geocoder"),
        );
        let storage = Arc::new(
            ObjectStore::open(&upload_dir, &config.public_upload_url, config.max_upload_bytes)
                .expect("Failed to init storage"),
        );

        let state = AppState {
            repo: repo.clone(),
            search,
            geocoder,
            storage,
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            repo,
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Number of images written to the object store.
    fn stored_images(&self) -> usize {
        std::fs::read_dir(self._temp_dir.path().join("uploads/report_images"))
            .unwrap()
            .count()
    }

    async fn get(&self, path: &str, token: Option<&str>) -> (u16, Value) {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let resp = request.send().await.unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Value,
        token: Option<&str>,
    ) -> (u16, Value) {
        let mut request = self.client.request(method, self.url(path)).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let resp = request.send().await.unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value, token: Option<&str>) -> (u16, Value) {
        self.send(reqwest::Method::POST, path, body, token).await
    }

    async fn create_report(&self, body: Value) -> Value {
        let (status, body) = self.post("/api/reports", body, None).await;
        assert_eq!(status, 200, "{}", body);
        body["data"].clone()
    }

    /// Register an account and return its session token.
    async fn register(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/register",
                json!({
                    "email": email,
                    "password": password,
                    "name": "Ana",
                    "surname": "García",
                    "birthDate": "1990-06-15",
                    "gender": "mujer"
                }),
                None,
            )
            .await;
        assert_eq!(status, 200, "{}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }
}

fn report_body(street: &str, description: &str) -> Value {
    json!({
        "street": street,
        "description": description,
        "latitude": 41.1189,
        "longitude": 1.2459,
        "barrierType": "escalera",
        "status": "permanente"
    })
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_create_list_and_delete_report() {
    let fixture = TestFixture::new().await;

    let report = fixture
        .create_report(report_body("Carrer Major", "Escalón sin rampa"))
        .await;
    let id = report["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());
    assert_eq!(report["street"], "Carrer Major");
    assert_eq!(report["description"], "Escalón sin rampa");
    assert_eq!(report["latitude"], 41.1189);
    assert_eq!(report["status"], "permanente");

    let (status, body) = fixture.get("/api/reports", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = fixture.get("/api/map/markers", None).await;
    let markers = body["data"].as_array().unwrap();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0]["id"], id.as_str());
    assert_eq!(markers[0]["color"], "red");
    assert_eq!(markers[0]["incidentEmoji"], "🪜");
    assert_eq!(markers[0]["popup"]["commentsPlaceholder"], "Sin comentarios");

    let (status, _) = fixture
        .send(
            reqwest::Method::DELETE,
            &format!("/api/reports/{}", id),
            json!({}),
            None,
        )
        .await;
    assert_eq!(status, 200);

    let (_, body) = fixture.get("/api/reports", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
    let (_, body) = fixture.get("/api/map/markers", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = fixture.get(&format!("/api/reports/{}", id), None).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_report_without_coordinates_rejected() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/reports",
            json!({ "street": "Carrer Major", "description": "Bache" }),
            None,
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (_, body) = fixture.get("/api/reports", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_report_defaults_and_legacy_severity() {
    let fixture = TestFixture::new().await;

    let report = fixture
        .create_report(json!({
            "latitude": 41.1,
            "longitude": 1.2,
            "barrierType": "rampa",
            "dificultad": "solucionado"
        }))
        .await;
    assert_eq!(report["description"], "Incidencia de tipo rampa");
    assert_eq!(report["status"], "solucionado");
    assert!(report.get("severity").is_none());

    let (status, body) = fixture
        .post(
            "/api/reports",
            json!({ "latitude": 41.1, "longitude": 1.2, "severity": "extrema" }),
            None,
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_comments_keep_order() {
    let fixture = TestFixture::new().await;

    let report = fixture
        .create_report(report_body("Carrer Major", "Acera rota"))
        .await;
    let path = format!("/api/reports/{}/comments", report["id"].as_str().unwrap());

    for text in ["primero", "  segundo  ", "tercero"] {
        let (status, _) = fixture.post(&path, json!({ "text": text }), None).await;
        assert_eq!(status, 200);
    }

    let (status, body) = fixture.post(&path, json!({ "text": "   " }), None).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (_, body) = fixture
        .get(&format!("/api/reports/{}", report["id"].as_str().unwrap()), None)
        .await;
    assert_eq!(body["data"]["comments"], json!(["primero", "segundo", "tercero"]));
}

#[tokio::test]
async fn test_update_leaves_comments_alone() {
    let fixture = TestFixture::new().await;

    let report = fixture
        .create_report(report_body("Carrer Major", "Acera rota"))
        .await;
    let id = report["id"].as_str().unwrap();
    let comments_path = format!("/api/reports/{}/comments", id);
    for text in ["primero", "segundo"] {
        let (status, _) = fixture
            .post(&comments_path, json!({ "text": text }), None)
            .await;
        assert_eq!(status, 200);
    }

    let (status, body) = fixture
        .send(
            reqwest::Method::PUT,
            &format!("/api/reports/{}", id),
            json!({ "comments": ["reescrito"], "street": "Carrer Nou" }),
            None,
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["data"]["street"], "Carrer Nou");
    assert_eq!(body["data"]["comments"], json!(["primero", "segundo"]));

    let (_, body) = fixture.get(&format!("/api/reports/{}", id), None).await;
    assert_eq!(body["data"]["comments"], json!(["primero", "segundo"]));
}

#[tokio::test]
async fn test_update_report() {
    let fixture = TestFixture::new().await;

    let report = fixture
        .create_report(json!({
            "street": "Carrer Major",
            "description": "Bache",
            "imageUrl": "/uploads/report_images/1_a.png",
            "latitude": 41.1,
            "longitude": 1.2
        }))
        .await;
    let path = format!("/api/reports/{}", report["id"].as_str().unwrap());

    let (status, body) = fixture
        .send(
            reqwest::Method::PUT,
            &path,
            json!({ "imageUrl": null, "dificultad": "alta", "extraInfo": "Junto al portal 3" }),
            None,
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    let updated = &body["data"];
    assert!(updated.get("imageUrl").is_none());
    assert_eq!(updated["severity"], "alta");
    assert_eq!(updated["extraInfo"], "Junto al portal 3");
    assert_eq!(updated["description"], "Bache");

    let (status, _) = fixture
        .send(reqwest::Method::PUT, &path, json!({ "latitude": 120.0 }), None)
        .await;
    assert_eq!(status, 400);

    let (status, _) = fixture
        .send(
            reqwest::Method::PUT,
            "/api/reports/missing",
            json!({ "street": "x" }),
            None,
        )
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/reports"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_search_reports() {
    let fixture = TestFixture::new().await;

    fixture
        .create_report(report_body("Rambla Nova", "Escalera sin pasamanos"))
        .await;
    let other = fixture
        .create_report(report_body("Carrer Major", "Farola caída"))
        .await;

    let (_, body) = fixture.get("/api/reports/search?q=pasamanos", None).await;
    let results = body["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["report"]["street"], "Rambla Nova");

    fixture
        .post(
            &format!("/api/reports/{}/comments", other["id"].as_str().unwrap()),
            json!({ "text": "bloquea la acera" }),
            None,
        )
        .await;
    let (_, body) = fixture.get("/api/reports/search?q=bloquea", None).await;
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn test_search_pagination_bounds() {
    let fixture = TestFixture::new().await;

    fixture
        .create_report(report_body("Rambla Nova", "Acera estrecha"))
        .await;

    let (status, body) = fixture
        .get("/api/reports/search?q=acera&limit=0", None)
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["data"]["limit"], 1);
    assert_eq!(body["data"]["total"], 1);

    let (status, body) = fixture
        .get(
            &format!("/api/reports/search?q=acera&offset={}", usize::MAX),
            None,
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let fixture = TestFixture::new().await;

    fixture.register("ana@komuni.org", "secreto1").await;

    let (status, body) = fixture
        .post(
            "/api/auth/register",
            json!({
                "email": "ANA@komuni.org",
                "password": "otroSecreto",
                "name": "Ana",
                "surname": "Otra"
            }),
            None,
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "DUPLICATE_ACCOUNT");

    let (_, body) = fixture.get("/api/admin/stats", Some(ADMIN_KEY)).await;
    assert_eq!(body["data"]["totalUsers"], 1);
}

#[tokio::test]
async fn test_register_validation() {
    let fixture = TestFixture::new().await;

    let cases = [
        json!({ "email": "no-arroba", "password": "secreto1", "name": "A", "surname": "B" }),
        json!({ "email": "a@komuni.org", "password": "123", "name": "A", "surname": "B" }),
        json!({ "email": "a@komuni.org", "password": "secreto1", "name": " ", "surname": "B" }),
    ];
    for case in cases {
        let (status, body) = fixture.post("/api/auth/register", case, None).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_login_sweeps_expired_sessions() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("marta@komuni.org", "secreto1").await;

    let (_, body) = fixture.get("/api/auth/me", Some(&token)).await;
    let uid = body["data"]["uid"].as_str().unwrap().to_string();

    let past = crate::db::format_timestamp(chrono::Utc::now() - chrono::Duration::hours(2));
    fixture
        .repo
        .create_session(&uid, "stale", &past)
        .await
        .unwrap();

    let (status, _) = fixture
        .post(
            "/api/auth/login",
            json!({ "email": "marta@komuni.org", "password": "secreto1" }),
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(fixture.repo.purge_expired_sessions().await.unwrap(), 0);

    // the registration session is still live
    let (status, _) = fixture.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_login_and_logout() {
    let fixture = TestFixture::new().await;
    fixture.register("luis@komuni.org", "secreto1").await;

    let (status, body) = fixture
        .post(
            "/api/auth/login",
            json!({ "email": "luis@komuni.org", "password": "incorrecto" }),
            None,
        )
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
    assert!(body.get("data").is_none());

    let (status, _) = fixture
        .post(
            "/api/auth/login",
            json!({ "email": "nadie@komuni.org", "password": "secreto1" }),
            None,
        )
        .await;
    assert_eq!(status, 401);

    let (status, body) = fixture
        .post(
            "/api/auth/login",
            json!({ "email": "Luis@Komuni.org", "password": "secreto1" }),
            None,
        )
        .await;
    assert_eq!(status, 200);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = fixture.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["email"], "luis@komuni.org");
    assert!(body["data"].get("passwordHash").is_none());

    let (status, _) = fixture.post("/api/auth/logout", json!({}), Some(&token)).await;
    assert_eq!(status, 200);

    let (status, body) = fixture.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_verify_email_and_password_reset() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("eva@komuni.org", "secreto1").await;

    let (_, body) = fixture.get("/api/auth/me", Some(&token)).await;
    assert_eq!(body["data"]["emailVerified"], false);

    let (status, body) = fixture
        .post("/api/auth/verify-email", json!({}), Some(&token))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["emailVerified"], true);

    let (status, _) = fixture
        .post("/api/auth/password-reset", json!({ "email": "eva@komuni.org" }), None)
        .await;
    assert_eq!(status, 200);

    let (status, body) = fixture
        .post("/api/auth/password-reset", json!({ "email": "x@komuni.org" }), None)
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_profile_links_email_matched_reports() {
    let fixture = TestFixture::new().await;

    // Submitted anonymously before the account existed
    let mut body = report_body("Carrer Major", "Rampa demasiado inclinada");
    body["submitterEmail"] = json!("Marta@Komuni.org");
    let early = fixture.create_report(body).await;

    let token = fixture.register("marta@komuni.org", "secreto1").await;

    let resp = fixture
        .client
        .post(fixture.url("/api/reports"))
        .bearer_auth(&token)
        .json(&report_body("Rambla Nova", "Bache"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let (status, body) = fixture.get("/api/profile", Some(&token)).await;
    assert_eq!(status, 200, "{}", body);
    let profile = &body["data"];
    assert_eq!(profile["reportCount"], 2);
    assert!(profile["age"].as_i64().unwrap() >= 35);
    let owned: Vec<&str> = profile["user"]["reports"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(owned.contains(&early["id"].as_str().unwrap()));

    // Reconciliation is idempotent
    let (_, body) = fixture.get("/api/profile", Some(&token)).await;
    assert_eq!(body["data"]["reportCount"], 2);

    let (status, _) = fixture.get("/api/profile", None).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_update_profile() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("pau@komuni.org", "secreto1").await;

    let (status, body) = fixture
        .send(
            reqwest::Method::PUT,
            "/api/profile",
            json!({ "name": "  Pau ", "gender": "hombre" }),
            Some(&token),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "Pau");
    assert_eq!(body["data"]["surname"], "García");
    assert_eq!(body["data"]["gender"], "hombre");

    let (status, _) = fixture
        .send(
            reqwest::Method::PUT,
            "/api/profile",
            json!({ "surname": "" }),
            Some(&token),
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/admin/dashboard", None).await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let user_token = fixture.register("vecino@komuni.org", "secreto1").await;
    let (status, body) = fixture.get("/api/admin/dashboard", Some(&user_token)).await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let admin_token = fixture.register(ADMIN_EMAIL, "secreto1").await;
    let (status, body) = fixture.get("/api/admin/dashboard", Some(&admin_token)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["stats"]["totalUsers"], 2);

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/stats"))
        .header("x-api-key", ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_promote_and_delete_user() {
    let fixture = TestFixture::new().await;
    let token = fixture.register("jordi@komuni.org", "secreto1").await;

    let resp = fixture
        .client
        .post(fixture.url("/api/reports"))
        .bearer_auth(&token)
        .json(&report_body("Carrer Major", "Escalera"))
        .send()
        .await
        .unwrap();
    let report: Value = resp.json().await.unwrap();
    let report_id = report["data"]["id"].as_str().unwrap().to_string();
    assert!(report["data"]["submitterId"].is_string());

    let (_, me) = fixture.get("/api/auth/me", Some(&token)).await;
    let uid = me["data"]["uid"].as_str().unwrap().to_string();

    let (status, body) = fixture
        .post(&format!("/api/admin/users/{}/promote", uid), json!({}), Some(ADMIN_KEY))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["isAdmin"], true);
    let (status, _) = fixture.get("/api/admin/stats", Some(&token)).await;
    assert_eq!(status, 200);

    let (status, body) = fixture
        .post(&format!("/api/admin/users/{}/demote", uid), json!({}), Some(ADMIN_KEY))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["isAdmin"], false);
    let (status, _) = fixture.get("/api/admin/stats", Some(&token)).await;
    assert_eq!(status, 403);

    let (status, _) = fixture
        .send(
            reqwest::Method::DELETE,
            &format!("/api/admin/users/{}", uid),
            json!({}),
            Some(ADMIN_KEY),
        )
        .await;
    assert_eq!(status, 200);

    // The account is gone, its session with it; the report stays
    let (status, _) = fixture.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, 401);
    let (status, body) = fixture
        .get(&format!("/api/reports/{}", report_id), None)
        .await;
    assert_eq!(status, 200);
    assert!(body["data"].get("submitterId").is_none());
}

#[tokio::test]
async fn test_contact_messages() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/contact",
            json!({ "name": "Ana", "email": "ana@komuni.org", "message": "Hola" }),
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["read"], false);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = fixture
        .post(
            "/api/contact",
            json!({ "name": "Ana", "email": "ana@komuni.org", "message": "  " }),
            None,
        )
        .await;
    assert_eq!(status, 400);

    let (status, body) = fixture
        .send(
            reqwest::Method::PUT,
            &format!("/api/admin/contacts/{}/read", id),
            json!({}),
            Some(ADMIN_KEY),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["read"], true);

    let (_, body) = fixture.get("/api/admin/contacts", Some(ADMIN_KEY)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["read"], true);
}

#[tokio::test]
async fn test_team_roster() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/admin/team",
            json!({ "name": "Laia", "github": "https://github.com/laia", "description": "Frontend" }),
            Some(ADMIN_KEY),
        )
        .await;
    assert_eq!(status, 200);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = fixture.get("/api/team", None).await;
    assert_eq!(body["data"][0]["name"], "Laia");

    let (_, body) = fixture.get("/api/admin/stats", Some(ADMIN_KEY)).await;
    assert_eq!(body["data"]["totalAdmins"], 1);

    let (status, _) = fixture
        .send(
            reqwest::Method::DELETE,
            &format!("/api/admin/team/{}", id),
            json!({}),
            Some(ADMIN_KEY),
        )
        .await;
    assert_eq!(status, 200);
    let (_, body) = fixture.get("/api/team", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_legacy_import() {
    let fixture = TestFixture::new().await;
    let report = fixture
        .create_report(report_body("Carrer Major", "Escalera"))
        .await;

    let (status, body) = fixture
        .post(
            "/api/admin/users/import",
            json!({
                "users": [
                    {
                        "uid": "uid_1720000000000",
                        "email": "nuria@komuni.org",
                        "password": "secreto1",
                        "nombre": "Núria",
                        "apellidos": "Puig",
                        "reportes": [report["id"], "borrado-hace-tiempo"]
                    },
                    { "email": "sin-arroba", "password": "x" }
                ],
                "loggedUser": "nuria@komuni.org"
            }),
            Some(ADMIN_KEY),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["data"]["imported"], 1);
    assert_eq!(body["data"]["linkedReports"], 1);
    assert_eq!(body["data"]["skipped"], json!(["sin-arroba"]));

    let (status, body) = fixture
        .post(
            "/api/auth/login",
            json!({ "email": "nuria@komuni.org", "password": "secreto1" }),
            None,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["user"]["reports"], json!([report["id"]]));
}

#[tokio::test]
async fn test_blog_and_faq() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture.get("/api/blog", None).await;
    let posts = body["data"].as_array().unwrap();
    assert_eq!(posts.len(), 3);
    assert!(posts[0].get("content").is_none());

    let (status, body) = fixture.get("/api/blog/primer-post-de-komuni", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["author"], "Equipo Komuni");

    let (status, body) = fixture.get("/api/blog/no-existe", None).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (_, body) = fixture.get("/api/faq", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_map_click_opens_sidebar() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post("/api/map/click", json!({ "lat": 41.1189, "lng": 1.2459 }), None)
        .await;
    assert_eq!(status, 200, "{}", body);
    let data = &body["data"];
    assert_eq!(data["sidebar"]["state"], "open");
    assert_eq!(data["sidebar"]["street"], "");
    assert_eq!(data["sidebar"]["mode"]["kind"], "new");
    assert_eq!(data["preview"]["lat"], 41.1189);
    assert_eq!(data["preview"]["color"], "blue");

    let (status, _) = fixture
        .post("/api/map/click", json!({ "lat": null, "lng": 1.0 }), None)
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_map_edit_and_close_sidebar() {
    let fixture = TestFixture::new().await;

    let report = fixture
        .create_report(report_body("Carrer Major", "Escalón sin rampa"))
        .await;
    let id = report["id"].as_str().unwrap();

    let (status, body) = fixture
        .get(&format!("/api/map/reports/{}/edit", id), None)
        .await;
    assert_eq!(status, 200, "{}", body);
    let data = &body["data"];
    assert_eq!(data["sidebar"]["state"], "open");
    assert_eq!(data["sidebar"]["street"], "Carrer Major");
    assert_eq!(data["sidebar"]["mode"]["kind"], "edit");
    assert_eq!(data["sidebar"]["mode"]["report"]["id"], id);
    assert!(data["preview"].is_null());

    let (status, _) = fixture.get("/api/map/reports/missing/edit", None).await;
    assert_eq!(status, 404);

    let (status, body) = fixture.post("/api/map/close", json!({}), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["sidebar"]["state"], "closed");
    assert!(body["data"]["preview"].is_null());
}

#[tokio::test]
async fn test_geocoding_failures_are_empty() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .get("/api/geocode/reverse?lat=41.1&lng=1.2", None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["street"], "");

    let (status, body) = fixture.get("/api/geocode/search?q=Tarragona", None).await;
    assert_eq!(status, 200);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_upload_and_serve_image() {
    let fixture = TestFixture::new().await;

    let image = b"\x89PNG\r\n\x1a\nfake image".to_vec();
    let form = Form::new().part(
        "file",
        Part::bytes(image.clone())
            .file_name("rampa rota.png")
            .mime_str("image/png")
            .unwrap(),
    );
    let resp = fixture
        .client
        .post(fixture.url("/api/uploads"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let url = body["data"]["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/report_images/"));
    assert!(url.ends_with("_rampa_rota.png"));

    let served = fixture.client.get(fixture.url(&url)).send().await.unwrap();
    assert_eq!(served.status(), 200);
    assert_eq!(served.bytes().await.unwrap().to_vec(), image);

    let form = Form::new().part(
        "file",
        Part::bytes(b"hola".to_vec())
            .file_name("nota.txt")
            .mime_str("text/plain")
            .unwrap(),
    );
    let resp = fixture
        .client
        .post(fixture.url("/api/uploads"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_submit_form_with_image() {
    let fixture = TestFixture::new().await;

    let form = Form::new()
        .text(
            "report",
            report_body("Carrer Major", "Escalón").to_string(),
        )
        .part(
            "image",
            Part::bytes(b"\xff\xd8\xff fake jpeg".to_vec())
                .file_name("escalon.jpg")
                .mime_str("image/jpeg")
                .unwrap(),
        );
    let resp = fixture
        .client
        .post(fixture.url("/api/reports/submit"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let report = &body["data"];
    assert!(report["imageUrl"]
        .as_str()
        .unwrap()
        .ends_with("_escalon.jpg"));

    // Editing through the same form
    let form = Form::new()
        .text("id", report["id"].as_str().unwrap().to_string())
        .text("report", json!({ "status": "solucionado" }).to_string());
    let resp = fixture
        .client
        .post(fixture.url("/api/reports/submit"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "solucionado");
    assert_eq!(body["data"]["imageUrl"], report["imageUrl"]);

    // A failed edit leaves no image behind
    let form = Form::new()
        .text("id", "missing")
        .text("report", json!({ "status": "temporal" }).to_string())
        .part(
            "image",
            Part::bytes(b"\xff\xd8\xff other".to_vec())
                .file_name("otra.jpg")
                .mime_str("image/jpeg")
                .unwrap(),
        );
    let resp = fixture
        .client
        .post(fixture.url("/api/reports/submit"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(fixture.stored_images(), 1);

    // No coordinates: nothing is written
    let form = Form::new()
        .text("report", json!({ "description": "Sin ubicación" }).to_string())
        .part(
            "image",
            Part::bytes(b"\xff\xd8\xff".to_vec())
                .file_name("x.jpg")
                .mime_str("image/jpeg")
                .unwrap(),
        );
    let resp = fixture
        .client
        .post(fixture.url("/api/reports/submit"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(fixture.stored_images(), 1);

    let (_, body) = fixture.get("/api/reports", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}
