use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use auth_gateway::{router, GatewayState};
use auth_identity::totp::{code_at, decode_secret};
use auth_identity::{
    AuthService, IdentityConfig, InMemoryIdentityStore, NewIdentity, PasswordPolicy, TokenConfig,
};
use auth_rbac::{PermissionRegistry, Role};
use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use config_engine::InMemoryConfigStore;
use rate_limiter::{InMemoryCounterStore, RateLimitConfig, RateLimiter};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const PASSWORD: &str = "Str0ng-Passw0rd!";

struct TestApp {
    router: Router,
    auth: Arc<AuthService>,
}

impl TestApp {
    fn new() -> Self {
        let config = IdentityConfig {
            tokens: TokenConfig::with_secrets("gateway-access-secret", "gateway-refresh-secret"),
            password: PasswordPolicy {
                memory_kib: 1024,
                iterations: 1,
                ..PasswordPolicy::default()
            },
            ..IdentityConfig::default()
        };
        let auth = Arc::new(AuthService::new(Arc::new(InMemoryIdentityStore::new()), config).unwrap());
        let limiter = Arc::new(RateLimiter::new(
            Arc::new(InMemoryCounterStore::new()),
            Arc::new(InMemoryConfigStore::new(RateLimitConfig::default())),
        ));
        let state = GatewayState::new(auth.clone(), limiter, PermissionRegistry::default());

        Self {
            router: router(state),
            auth,
        }
    }

    async fn register(&self, role: Role, phone: &str) -> Uuid {
        self.auth
            .register(NewIdentity {
                role,
                phone: phone.to_string(),
                email: None,
                name: Some("Test".to_string()),
                password: PASSWORD.to_string(),
            })
            .await
            .unwrap()
            .id
    }

    async fn access_token(&self, phone: &str) -> String {
        let (status, body) = self
            .post_json("/auth/login", None, json!({ "phone": phone, "password": PASSWORD }), "198.51.100.1")
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["tokens"]["accessToken"].as_str().unwrap().to_string()
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: Value,
        client: &str,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = from_peer(builder.body(Body::from(body.to_string())).unwrap(), client);
        split(self.send(request).await).await
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.get_from(uri, token, "192.0.2.20").await
    }

    async fn get_from(&self, uri: &str, token: Option<&str>, client: &str) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(from_peer(builder.body(Body::empty()).unwrap(), client))
            .await
    }
}

/// Attach the socket address axum records for a served connection
fn from_peer(mut request: Request<Body>, client: &str) -> Request<Body> {
    let ip: IpAddr = client.parse().unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::new(ip, 40000)));
    request
}

async fn split(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn login_request(phone: &str, password: &str, client: &str) -> Request<Body> {
    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "phone": phone, "password": password }).to_string()))
        .unwrap();
    from_peer(request, client)
}

#[tokio::test]
async fn test_login_carries_rate_limit_headers() {
    let app = TestApp::new();
    app.register(Role::Guardian, "+8801700000001").await;

    let response = app
        .send(login_request("+8801700000001", PASSWORD, "203.0.113.1"))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-ratelimit-limit"], "5");
    assert_eq!(headers["x-ratelimit-remaining"], "4");
    let reset: i64 = headers["x-ratelimit-reset"].to_str().unwrap().parse().unwrap();
    assert!(reset > Utc::now().timestamp());
    assert!(reset <= Utc::now().timestamp() + 61);

    let (_, body) = split(response).await;
    assert_eq!(body["status"], "authenticated");
    assert!(body["tokens"]["refreshToken"].is_string());
    assert!(body["identity"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_sixth_login_attempt_is_throttled() {
    let app = TestApp::new();
    app.register(Role::Guardian, "+8801700000002").await;

    for attempt in 0..5 {
        let response = app
            .send(login_request("+8801700000002", "wrong-password", "203.0.113.2"))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "attempt {}", attempt + 1);
        assert_eq!(
            response.headers()["x-ratelimit-remaining"],
            (4 - attempt).to_string().as_str()
        );
    }

    // Even the right password is refused once the budget is spent
    let response = app
        .send(login_request("+8801700000002", PASSWORD, "203.0.113.2"))
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    let retry_after: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));

    let (_, body) = split(response).await;
    assert_eq!(body["code"], "RATE_5001");
    assert_eq!(body["status"], 429);

    // Another client address has its own budget
    let response = app
        .send(login_request("+8801700000002", PASSWORD, "203.0.113.99"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forwarded_for_does_not_reset_login_budget() {
    let app = TestApp::new();
    app.register(Role::Guardian, "+8801700000013").await;

    for attempt in 0..5 {
        let mut request = login_request("+8801700000013", "wrong-password", "203.0.113.20");
        request.headers_mut().insert(
            "x-forwarded-for",
            format!("198.51.100.{attempt}").parse().unwrap(),
        );
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "attempt {}", attempt + 1);
    }

    let mut request = login_request("+8801700000013", PASSWORD, "203.0.113.20");
    request
        .headers_mut()
        .insert("x-forwarded-for", "198.51.100.200".parse().unwrap());
    request.headers_mut().insert("x-real-ip", "198.51.100.201".parse().unwrap());
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_rejected_tokens_spend_the_client_budget() {
    let app = TestApp::new();
    app.register(Role::Caregiver, "+8801700000014").await;
    let token = app.access_token("+8801700000014").await;

    for attempt in 0..100u32 {
        let forged = format!("forged.{attempt}.token");
        let response = app.get_from("/auth/me", Some(&forged), "203.0.113.30").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "attempt {}", attempt + 1);
        assert_eq!(response.headers()["x-ratelimit-limit"], "100");
        assert_eq!(
            response.headers()["x-ratelimit-remaining"],
            (99 - attempt).to_string().as_str()
        );
    }

    let response = app.get_from("/auth/me", None, "203.0.113.30").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    // A verified token is counted against its identity, not the address
    let response = app.get_from("/auth/me", Some(&token), "203.0.113.30").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "99");
}

#[tokio::test]
async fn test_protected_routes_require_a_bearer_token() {
    let app = TestApp::new();

    let (status, body) = split(app.get("/auth/me", None).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_2002");

    let (status, _) = split(app.get("/auth/me", Some("not-a-jwt")).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = TestApp::new();
    app.register(Role::Caregiver, "+8801700000003").await;

    let response = app
        .send(login_request("+8801700000003", PASSWORD, "203.0.113.3"))
        .await;
    let (_, body) = split(response).await;
    let refresh_token = body["tokens"]["refreshToken"].as_str().unwrap().to_string();

    let (status, _) = split(app.get("/auth/me", Some(&refresh_token)).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post_json("/auth/refresh", None, json!({ "refreshToken": refresh_token }), "203.0.113.3")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 900);
}

#[tokio::test]
async fn test_me_lists_role_permissions() {
    let app = TestApp::new();
    let id = app.register(Role::Caregiver, "+8801700000004").await;
    let token = app.access_token("+8801700000004").await;

    let response = app.get("/auth/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-limit"], "100");

    let (_, body) = split(response).await;
    assert_eq!(body["identity"]["id"], id.to_string());
    assert_eq!(body["roleName"], "Caregiver");
    assert_eq!(body["mfaState"], "none");
    let permissions: Vec<&str> = body["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(permissions.contains(&"care_logs:create"));
    assert!(!permissions.contains(&"users:write"));
}

#[tokio::test]
async fn test_role_guard_admits_staff_only() {
    let app = TestApp::new();
    app.register(Role::Guardian, "+8801700000005").await;
    app.register(Role::Moderator, "+8801700000006").await;

    let guardian = app.access_token("+8801700000005").await;
    let (status, body) = split(app.get("/auth/roles", Some(&guardian)).await).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "AUTHZ_3002");

    let moderator = app.access_token("+8801700000006").await;
    let (status, body) = split(app.get("/auth/roles", Some(&moderator)).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), Role::ALL.len());
}

#[tokio::test]
async fn test_permission_guard_on_deactivation() {
    let app = TestApp::new();
    let target = app.register(Role::Shop, "+8801700000007").await;
    app.register(Role::Moderator, "+8801700000008").await;
    app.register(Role::Admin, "+8801700000009").await;

    let uri = format!("/auth/identities/{target}/deactivate");

    let moderator = app.access_token("+8801700000008").await;
    let (status, _) = app.post_json(&uri, Some(&moderator), json!({}), "192.0.2.8").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.access_token("+8801700000009").await;
    let (status, _) = app.post_json(&uri, Some(&admin), json!({}), "192.0.2.9").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let response = app
        .send(login_request("+8801700000007", PASSWORD, "192.0.2.7"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_mfa_enrollment_and_login_over_http() {
    let app = TestApp::new();
    app.register(Role::Agency, "+8801700000010").await;
    let token = app.access_token("+8801700000010").await;

    let (status, enrollment) = app
        .post_json("/auth/mfa/setup", Some(&token), json!({}), "192.0.2.10")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(enrollment["provisioningUri"]
        .as_str()
        .unwrap()
        .starts_with("otpauth://totp/"));
    assert!(enrollment["qrImage"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
    assert_eq!(enrollment["backupCodes"].as_array().unwrap().len(), 10);

    let secret = decode_secret(enrollment["secret"].as_str().unwrap()).unwrap();
    let code = code_at(&secret, Utc::now().timestamp() as u64);
    let (status, body) = app
        .post_json("/auth/mfa/verify", Some(&token), json!({ "code": code }), "192.0.2.10")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mfaEnabled"], true);

    // Password alone now yields a challenge
    let (status, body) = app
        .post_json(
            "/auth/login",
            None,
            json!({ "phone": "+8801700000010", "password": PASSWORD }),
            "192.0.2.11",
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "mfa_required");
    let challenge = body["challengeToken"].as_str().unwrap().to_string();

    // The challenge is not usable as an access token
    let (status, _) = split(app.get("/auth/me", Some(&challenge)).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post_json(
            "/auth/mfa/login",
            None,
            json!({ "challengeToken": challenge, "code": "000000x" }),
            "192.0.2.11",
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let backup = enrollment["backupCodes"][0].as_str().unwrap();
    let (status, body) = app
        .post_json(
            "/auth/mfa/recover",
            None,
            json!({ "challengeToken": challenge, "code": backup }),
            "192.0.2.11",
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["accessToken"].is_string());
    assert_eq!(body["identity"]["mfa_enabled"], true);
}

#[tokio::test]
async fn test_mfa_disable_requires_current_code() {
    let app = TestApp::new();
    app.register(Role::Admin, "+8801700000011").await;
    let token = app.access_token("+8801700000011").await;

    let (_, enrollment) = app
        .post_json("/auth/mfa/setup", Some(&token), json!({}), "192.0.2.12")
        .await;
    let secret = decode_secret(enrollment["secret"].as_str().unwrap()).unwrap();
    let code = code_at(&secret, Utc::now().timestamp() as u64);
    let (status, _) = app
        .post_json("/auth/mfa/verify", Some(&token), json!({ "code": code }), "192.0.2.12")
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post_json("/auth/mfa/disable", Some(&token), json!({}), "192.0.2.12")
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let code = code_at(&secret, Utc::now().timestamp() as u64);
    let (status, body) = app
        .post_json("/auth/mfa/disable", Some(&token), json!({ "code": code }), "192.0.2.12")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mfaEnabled"], false);
}

#[tokio::test]
async fn test_ineligible_role_cannot_enroll() {
    let app = TestApp::new();
    app.register(Role::Guardian, "+8801700000012").await;
    let token = app.access_token("+8801700000012").await;

    let (status, body) = app
        .post_json("/auth/mfa/setup", Some(&token), json!({}), "192.0.2.13")
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Insufficient permissions");
}
