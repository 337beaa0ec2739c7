//! # REST API
//!
//! Builds the axum router that exposes the authentication flow over HTTP.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path       | Auth    | Description                              |
//! |--------|------------|---------|------------------------------------------|
//! | GET    | `/health`  | public  | Liveness probe                           |
//! | POST   | `/signup`  | public  | Register a `did:key` identity            |
//! | POST   | `/login`   | public  | Issue a nonce for a registered identity  |
//! | POST   | `/verify`  | public  | Exchange a signed credential for a cookie|
//! | GET    | `/profile` | public  | Look up an identity by `?did=`           |
//! | POST   | `/logout`  | public  | Expire the session cookie                |
//! | GET    | `/me`      | session | Profile of the session holder            |
//!
//! Every failure body is `{"error": "<message>"}`.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use peerflash_protocol::auth::{
    AuthError, AuthenticatedDid, IdentityRegistry, NonceIssuer, SessionError, SessionIssuer,
    SessionValidator, SignatureVerifier,
};
use peerflash_protocol::config::AuthConfig;
use peerflash_protocol::credential::VerifiableCredential;
use peerflash_protocol::identity::{canonical_did, IdentityRecord};
use peerflash_protocol::storage::AuthDb;

use crate::cookie;
use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone. The sled handles are reference counted and the config
/// is behind an `Arc`, read once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AuthConfig>,
    pub registry: IdentityRegistry,
    pub nonces: NonceIssuer,
    pub verifier: SignatureVerifier,
    pub sessions: SessionIssuer,
    pub validator: SessionValidator,
    pub metrics: SharedMetrics,
}

impl AppState {
    /// Wire every protocol component to one database and one config.
    pub fn new(db: AuthDb, config: AuthConfig, metrics: SharedMetrics) -> Self {
        Self {
            registry: IdentityRegistry::new(db.clone()),
            nonces: NonceIssuer::new(db.clone(), &config),
            verifier: SignatureVerifier::new(db, &config),
            sessions: SessionIssuer::new(&config),
            validator: SessionValidator::new(&config),
            config: Arc::new(config),
            metrics,
        }
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let protected = Router::new()
        .route("/me", get(me_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::require_session,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/signup", post(signup_handler))
        .route("/login", post(login_handler))
        .route("/verify", post(verify_handler))
        .route("/profile", get(profile_handler))
        .route("/logout", post(logout_handler))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /signup`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignupRequest {
    pub did: String,
    pub name: String,
    pub major: String,
}

/// Body of a successful `POST /signup`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub message: String,
    pub user: UserProfile,
}

/// Body of `POST /login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub did: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub nonce: String,
}

/// Body of `POST /verify`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub did: String,
    pub credential: VerifiableCredential,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub did: Option<String>,
}

/// Public view of an identity record.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub did: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub major: String,
}

impl From<IdentityRecord> for UserProfile {
    fn from(record: IdentityRecord) -> Self {
        Self {
            id: record.id.to_string(),
            did: record.did,
            display_name: record.display_name,
            major: record.major,
        }
    }
}

/// Generic error body returned by every endpoint on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Handler error. Wraps the protocol taxonomy and renders it as a status
/// code plus [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError(AuthError);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AuthError::Validation(rejection.body_text()))
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self(AuthError::Internal(err.to_string()))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Validation(_)
            | AuthError::AlreadyRegistered
            | AuthError::InvalidNonce
            | AuthError::NonceMismatch
            | AuthError::MalformedIdentity
            | AuthError::InvalidSignature => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            AuthError::Internal(cause) => {
                tracing::error!(error = %cause, "internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the server is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `POST /signup`: registers a new identity.
async fn signup_handler(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let record = state.registry.register(&req.did, &req.name, &req.major)?;
    state.metrics.signups_total.inc();

    let body = SignupResponse {
        message: "User registered successfully".into(),
        user: record.into(),
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// `POST /login`: issues a fresh nonce, replacing any outstanding one.
async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = payload?;
    let did = req.did.trim();
    if did.is_empty() {
        return Err(AuthError::Validation("did is required".into()).into());
    }
    let challenge = state.nonces.issue(did)?;
    state.metrics.nonces_issued_total.inc();

    Ok(Json(LoginResponse {
        nonce: challenge.value,
    }))
}

/// `POST /verify`: runs the verification pipeline and, on success,
/// sets the session cookie.
async fn verify_handler(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let started = Instant::now();
    let result = verify_and_issue(&state, payload);
    state
        .metrics
        .verify_latency_seconds
        .observe(started.elapsed().as_secs_f64());

    match result {
        Ok(set_cookie) => {
            state.metrics.verify_success_total.inc();
            let body = Json(SuccessResponse { success: true });
            Ok(([(header::SET_COOKIE, set_cookie)], body).into_response())
        }
        Err(e) => {
            state
                .metrics
                .verify_failures_total
                .with_label_values(&[e.0.reason()])
                .inc();
            Err(e)
        }
    }
}

/// Everything `/verify` does that can fail. Returns the `Set-Cookie` value.
fn verify_and_issue(
    state: &AppState,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<String, ApiError> {
    let Json(req) = payload?;
    if canonical_did(&req.did) != canonical_did(req.credential.issuer()) {
        return Err(AuthError::Validation("did does not match credential issuer".into()).into());
    }

    let did = state.verifier.verify(&req.credential)?;
    let session = state.sessions.issue(&did)?;
    Ok(cookie::session_cookie(&session.token, &state.config))
}

/// `GET /profile?did=`: public profile lookup.
async fn profile_handler(
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<UserProfile>, ApiError> {
    let did = query
        .did
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| AuthError::Validation("did query parameter is required".into()))?;
    let record = state.registry.profile(&did)?;
    Ok(Json(record.into()))
}

/// `GET /me`: profile of the authenticated caller.
async fn me_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedDid>,
) -> Result<Json<UserProfile>, ApiError> {
    let record = state.registry.profile(identity.as_str())?;
    Ok(Json(record.into()))
}

/// `POST /logout`: tells the browser to drop the session cookie.
///
/// Sessions are stateless, so a copied token stays valid until it expires.
async fn logout_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, cookie::cleared_session_cookie(&state.config))],
        Json(SuccessResponse { success: true }),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{HeaderValue, Request};
    use http_body_util::BodyExt;
    use peerflash_protocol::config::SessionSecret;
    use peerflash_protocol::credential::CredentialBuilder;
    use peerflash_protocol::crypto::IdentityKeypair;
    use peerflash_protocol::identity::DidKey;
    use tower::ServiceExt;

    use crate::metrics::AuthMetrics;

    /// Creates a test AppState backed by a temporary database.
    fn test_app_state() -> AppState {
        let db = AuthDb::open_temporary().expect("temp db");
        let config = AuthConfig::new(SessionSecret::ephemeral());
        AppState::new(db, config, Arc::new(AuthMetrics::new()))
    }

    struct TestResponse {
        status: StatusCode,
        set_cookie: Option<String>,
        location: Option<HeaderValue>,
        body: serde_json::Value,
    }

    async fn send(router: &Router, req: Request<Body>) -> TestResponse {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let set_cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let location = resp.headers().get(header::LOCATION).cloned();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        TestResponse {
            status,
            set_cookie,
            location,
            body,
        }
    }

    async fn post_json(router: &Router, path: &str, body: serde_json::Value) -> TestResponse {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        send(router, req).await
    }

    async fn get(router: &Router, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = Request::builder().uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        send(router, builder.body(Body::empty()).unwrap()).await
    }

    /// A client identity plus the router it signed up with.
    async fn signed_up() -> (Router, AppState, IdentityKeypair, DidKey) {
        let state = test_app_state();
        let router = create_router(state.clone());
        let keypair = IdentityKeypair::generate();
        let did = DidKey::from_public_key(&keypair.public_key());

        let resp = post_json(
            &router,
            "/signup",
            serde_json::json!({ "did": did.as_str(), "name": "Ada", "major": "Mathematics" }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::CREATED);
        (router, state, keypair, did)
    }

    async fn login(router: &Router, did: &DidKey) -> String {
        let resp = post_json(router, "/login", serde_json::json!({ "did": did.as_str() })).await;
        assert_eq!(resp.status, StatusCode::OK);
        resp.body["nonce"].as_str().unwrap().to_string()
    }

    fn verify_body(did: &DidKey, vc: &VerifiableCredential) -> serde_json::Value {
        serde_json::json!({ "did": did.as_str(), "credential": vc })
    }

    /// `token=<jwt>` from a `Set-Cookie` value.
    fn cookie_pair(set_cookie: &str) -> String {
        set_cookie.split(';').next().unwrap().to_string()
    }

    // -- Health ------------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let resp = get(&router, "/health", &[]).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["status"], "ok");
    }

    // -- Signup ------------------------------------------------------------

    #[tokio::test]
    async fn signup_returns_created_user() {
        let state = test_app_state();
        let router = create_router(state);
        let did = DidKey::from_public_key(&IdentityKeypair::generate().public_key());

        let resp = post_json(
            &router,
            "/signup",
            serde_json::json!({ "did": did.as_str(), "name": "Ada", "major": "Mathematics" }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::CREATED);
        assert_eq!(resp.body["message"], "User registered successfully");
        assert_eq!(resp.body["user"]["did"], did.as_str());
        assert_eq!(resp.body["user"]["displayName"], "Ada");
        assert_eq!(resp.body["user"]["major"], "Mathematics");
        assert!(resp.body["user"]["id"].is_string());
    }

    #[tokio::test]
    async fn duplicate_signup_is_400() {
        let (router, _, _, did) = signed_up().await;
        let resp = post_json(
            &router,
            "/signup",
            serde_json::json!({ "did": did.as_str(), "name": "Eve", "major": "Forgery" }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body["error"], "identity already registered");
    }

    #[tokio::test]
    async fn signup_with_missing_fields_is_400() {
        let router = create_router(test_app_state());
        let resp = post_json(&router, "/signup", serde_json::json!({ "did": "did:key:zA" })).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(resp.body["error"].is_string());
    }

    #[tokio::test]
    async fn signup_with_non_did_key_is_400() {
        let router = create_router(test_app_state());
        let resp = post_json(
            &router,
            "/signup",
            serde_json::json!({ "did": "did:web:example.com", "name": "A", "major": "B" }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    }

    // -- Login -------------------------------------------------------------

    #[tokio::test]
    async fn login_unknown_identity_is_404() {
        let router = create_router(test_app_state());
        let body = serde_json::json!({ "did": "did:key:zNobody" });
        let resp = post_json(&router, "/login", body).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(resp.body["error"], "identity not found");
    }

    #[tokio::test]
    async fn login_returns_hex_nonce() {
        let (router, _, _, did) = signed_up().await;
        let nonce = login(&router, &did).await;
        assert_eq!(nonce.len(), 64);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
    }

    // -- Verify ------------------------------------------------------------

    #[tokio::test]
    async fn full_flow_sets_session_cookie_and_unlocks_me() {
        let (router, state, keypair, did) = signed_up().await;
        let nonce = login(&router, &did).await;
        let vc = CredentialBuilder::new(&did, nonce).sign(&keypair).unwrap();

        let resp = post_json(&router, "/verify", verify_body(&did, &vc)).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["success"], true);

        let set_cookie = resp.set_cookie.expect("session cookie");
        assert!(set_cookie.starts_with("token="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("Max-Age=86400"));
        assert!(set_cookie.contains("Path=/"));
        assert!(set_cookie.contains("Secure"));

        let cookie = cookie_pair(&set_cookie);
        let me = get(&router, "/me", &[("cookie", cookie.as_str())]).await;
        assert_eq!(me.status, StatusCode::OK);
        assert_eq!(me.body["did"], did.as_str());
        assert_eq!(me.body["displayName"], "Ada");

        assert_eq!(state.metrics.verify_success_total.get(), 1);
        assert_eq!(state.metrics.nonces_issued_total.get(), 1);
    }

    /// Signs up and logs in with `did_form` everywhere, the way a client
    /// that keeps one DID string for the whole flow would.
    async fn full_flow_with_did_form(did_form: impl Fn(&DidKey) -> String) {
        let router = create_router(test_app_state());
        let keypair = IdentityKeypair::generate();
        let did = DidKey::from_public_key(&keypair.public_key());
        let sent = did_form(&did);

        let signup = post_json(
            &router,
            "/signup",
            serde_json::json!({ "did": sent, "name": "Ada", "major": "Mathematics" }),
        )
        .await;
        assert_eq!(signup.status, StatusCode::CREATED);
        assert_eq!(signup.body["user"]["did"], did.as_str());

        let login = post_json(&router, "/login", serde_json::json!({ "did": sent })).await;
        assert_eq!(login.status, StatusCode::OK);
        let nonce = login.body["nonce"].as_str().unwrap();

        let vc = CredentialBuilder::new(&did, nonce).sign(&keypair).unwrap();
        let verify = post_json(
            &router,
            "/verify",
            serde_json::json!({ "did": sent, "credential": vc }),
        )
        .await;
        assert_eq!(verify.status, StatusCode::OK);

        let cookie = cookie_pair(&verify.set_cookie.expect("session cookie"));
        let me = get(&router, "/me", &[("cookie", cookie.as_str())]).await;
        assert_eq!(me.status, StatusCode::OK);
        assert_eq!(me.body["did"], did.as_str());
    }

    #[tokio::test]
    async fn did_url_works_for_signup_login_and_verify() {
        full_flow_with_did_form(|did| did.verification_method()).await;
    }

    #[tokio::test]
    async fn padded_did_works_for_signup_login_and_verify() {
        full_flow_with_did_form(|did| format!("  {} ", did)).await;
    }

    #[tokio::test]
    async fn altered_issuance_date_is_invalid_signature() {
        let (router, state, keypair, did) = signed_up().await;
        let nonce = login(&router, &did).await;
        let mut vc = CredentialBuilder::new(&did, nonce).sign(&keypair).unwrap();
        vc.claim.issuance_date = "2001-01-01T00:00:00.000Z".into();

        let resp = post_json(&router, "/verify", verify_body(&did, &vc)).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body["error"], "invalid signature");
        assert!(resp.set_cookie.is_none());
        assert_eq!(
            state
                .metrics
                .verify_failures_total
                .with_label_values(&["invalid_signature"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn replayed_verify_is_rejected() {
        let (router, _, keypair, did) = signed_up().await;
        let nonce = login(&router, &did).await;
        let vc = CredentialBuilder::new(&did, nonce).sign(&keypair).unwrap();

        let first = post_json(&router, "/verify", verify_body(&did, &vc)).await;
        assert_eq!(first.status, StatusCode::OK);

        let replay = post_json(&router, "/verify", verify_body(&did, &vc)).await;
        assert_eq!(replay.status, StatusCode::BAD_REQUEST);
        assert_eq!(replay.body["error"], "invalid or expired nonce");
        assert!(replay.set_cookie.is_none());
    }

    #[tokio::test]
    async fn wrong_nonce_is_mismatch() {
        let (router, _, keypair, did) = signed_up().await;
        login(&router, &did).await;
        let vc = CredentialBuilder::new(&did, "guessed").sign(&keypair).unwrap();

        let resp = post_json(&router, "/verify", verify_body(&did, &vc)).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body["error"], "nonce mismatch");
    }

    #[tokio::test]
    async fn did_must_match_credential_issuer() {
        let (router, _, keypair, did) = signed_up().await;
        let nonce = login(&router, &did).await;
        let vc = CredentialBuilder::new(&did, nonce).sign(&keypair).unwrap();
        let other = DidKey::from_public_key(&IdentityKeypair::generate().public_key());

        let resp = post_json(&router, "/verify", verify_body(&other, &vc)).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(resp.set_cookie.is_none());
    }

    #[tokio::test]
    async fn verify_for_unregistered_issuer_is_404() {
        let router = create_router(test_app_state());
        let keypair = IdentityKeypair::generate();
        let did = DidKey::from_public_key(&keypair.public_key());
        let vc = CredentialBuilder::new(&did, "n1").sign(&keypair).unwrap();

        let resp = post_json(&router, "/verify", verify_body(&did, &vc)).await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn verify_with_malformed_credential_is_400() {
        let (router, _, _, did) = signed_up().await;
        let resp = post_json(
            &router,
            "/verify",
            serde_json::json!({ "did": did.as_str(), "credential": { "issuer": did.as_str() } }),
        )
        .await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    }

    // -- Session gate ------------------------------------------------------

    #[tokio::test]
    async fn me_without_cookie_is_401_for_api_clients() {
        let state = test_app_state();
        let router = create_router(state.clone());
        let resp = get(&router, "/me", &[("accept", "application/json")]).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp.body["error"], "unauthorized");
        assert_eq!(state.metrics.sessions_rejected_total.get(), 1);
    }

    #[tokio::test]
    async fn me_without_cookie_redirects_browsers() {
        let router = create_router(test_app_state());
        let resp = get(&router, "/me", &[("accept", "text/html")]).await;
        assert_eq!(resp.status, StatusCode::SEE_OTHER);
        assert_eq!(resp.location.unwrap(), "/login");
    }

    #[tokio::test]
    async fn me_with_forged_cookie_is_401() {
        let router = create_router(test_app_state());
        let forged = "token=eyJhbGciOiJIUzI1NiJ9.e30.AAAA";
        let resp = get(&router, "/me", &[("cookie", forged)]).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn session_from_other_server_is_401() {
        let (router, _, _, did) = signed_up().await;
        let foreign = SessionIssuer::new(&AuthConfig::new(SessionSecret::ephemeral()))
            .issue(&did)
            .unwrap();
        let cookie = format!("token={}", foreign.token);

        let resp = get(&router, "/me", &[("cookie", cookie.as_str())]).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    }

    // -- Profile & logout --------------------------------------------------

    #[tokio::test]
    async fn profile_lookup() {
        let (router, _, _, did) = signed_up().await;

        let missing = get(&router, "/profile", &[]).await;
        assert_eq!(missing.status, StatusCode::BAD_REQUEST);

        let unknown = get(&router, "/profile?did=did:key:zNobody", &[]).await;
        assert_eq!(unknown.status, StatusCode::NOT_FOUND);

        let path = format!("/profile?did={}", encode_query(did.as_str()));
        let found = get(&router, &path, &[]).await;
        assert_eq!(found.status, StatusCode::OK);
        assert_eq!(found.body["did"], did.as_str());
        assert_eq!(found.body["displayName"], "Ada");
    }

    #[tokio::test]
    async fn logout_expires_cookie() {
        let router = create_router(test_app_state());
        let req = Request::builder()
            .method("POST")
            .uri("/logout")
            .body(Body::empty())
            .unwrap();
        let resp = send(&router, req).await;
        assert_eq!(resp.status, StatusCode::OK);
        let set_cookie = resp.set_cookie.unwrap();
        assert!(set_cookie.starts_with("token=;"));
        assert!(set_cookie.contains("Max-Age=0"));
    }

    /// Percent-encode the characters base64 DIDs contain that are not
    /// query-safe.
    fn encode_query(value: &str) -> String {
        value
            .replace('%', "%25")
            .replace('+', "%2B")
            .replace('/', "%2F")
            .replace('=', "%3D")
            .replace(':', "%3A")
    }
}
