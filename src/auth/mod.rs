//! Authentication for the shared-cookie session scheme.
//!
//! Sign-in is passwordless: the user requests a magic link by email, the
//! callback exchanges the single-use token for a JWT, and the JWT rides in
//! a cookie shared across the Nubras subdomains. Every app verifies the
//! cookie statelessly against the same secret; there is no server-side
//! session store and no revocation list.

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::Mailer,
    ApiResponse, ApiResult,
};

pub mod user;
pub mod verification_token;

/// Claim structure for session JWTs
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    /// JWT ID (unique identifier for this token)
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated identity extracted from a verified session token
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub token_id: String,
}

/// A freshly issued session token with its expiry
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_lifetime: Duration,
    pub cookie_name: String,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
    pub magic_link_base_url: String,
    pub magic_link_lifetime: Duration,
}

impl AuthConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            issuer: cfg.auth_issuer.clone(),
            audience: cfg.auth_audience.clone(),
            token_lifetime: Duration::from_secs(cfg.jwt_expiration),
            cookie_name: cfg.session_cookie_name.clone(),
            cookie_domain: cfg.session_cookie_domain.clone(),
            cookie_secure: cfg.cookie_secure(),
            magic_link_base_url: cfg.magic_link_base_url.clone(),
            magic_link_lifetime: Duration::from_secs(cfg.magic_link_expiration_secs),
        }
    }
}

/// Issues and verifies sessions, and drives the magic-link exchange.
pub struct AuthService {
    config: AuthConfig,
    db_pool: Arc<DbPool>,
    mailer: Arc<dyn Mailer>,
    event_sender: Arc<EventSender>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(
        config: AuthConfig,
        db_pool: Arc<DbPool>,
        mailer: Arc<dyn Mailer>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        Self {
            config,
            db_pool,
            mailer,
            event_sender,
            encoding_key,
            decoding_key,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    /// Issues a signed session JWT for a user.
    pub fn issue_session(&self, user: &user::Model) -> Result<SessionToken, ServiceError> {
        let now = Utc::now();
        let expires_at = now
            + ChronoDuration::from_std(self.config.token_lifetime)
                .map_err(|e| ServiceError::InternalError(format!("Invalid token lifetime: {}", e)))?;

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::InternalError(format!("Failed to sign session token: {}", e)))?;

        Ok(SessionToken { token, expires_at })
    }

    /// Verifies signature, expiry, issuer, and audience; returns the
    /// session identity.
    pub fn verify_token(&self, token: &str) -> Result<SessionUser, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| ServiceError::Unauthorized(format!("Invalid session token: {}", e)))?;

        let user_id = data
            .claims
            .sub
            .parse::<Uuid>()
            .map_err(|_| ServiceError::Unauthorized("Invalid session subject".to_string()))?;

        Ok(SessionUser {
            user_id,
            email: data.claims.email,
            name: data.claims.name,
            token_id: data.claims.jti,
        })
    }

    /// Builds the `Set-Cookie` value for a session token.
    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.config.cookie_name,
            token,
            self.config.token_lifetime.as_secs()
        );
        if let Some(domain) = &self.config.cookie_domain {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        if self.config.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Starts a sign-in: finds or creates the user, stores a hashed
    /// single-use token, and mails the link. Callers respond uniformly
    /// regardless of whether the address was known.
    #[instrument(skip(self))]
    pub async fn request_sign_in(&self, raw_email: &str) -> Result<(), ServiceError> {
        let email = normalize_email(raw_email)?;
        let db = &*self.db_pool;
        let now = Utc::now();

        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(db)
            .await?;
        let account = match existing {
            Some(account) => account,
            None => {
                user::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    email: Set(email.clone()),
                    name: Set(None),
                    created_at: Set(now),
                    last_sign_in_at: Set(None),
                }
                .insert(db)
                .await?
            }
        };

        // Housekeeping: expired tokens for this address are dead weight.
        verification_token::Entity::delete_many()
            .filter(verification_token::Column::Identifier.eq(email.clone()))
            .filter(verification_token::Column::ExpiresAt.lt(now))
            .exec(db)
            .await?;

        let token: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(48)
            .map(char::from)
            .collect();
        let expires_at = now
            + ChronoDuration::from_std(self.config.magic_link_lifetime).map_err(|e| {
                ServiceError::InternalError(format!("Invalid magic link lifetime: {}", e))
            })?;

        verification_token::ActiveModel {
            id: Set(Uuid::new_v4()),
            identifier: Set(email.clone()),
            token_hash: Set(hash_token(&token)),
            expires_at: Set(expires_at),
            created_at: Set(now),
        }
        .insert(db)
        .await?;

        let link = self.magic_link(&email, &token)?;
        self.mailer
            .send_magic_link(&email, &link)
            .await
            .map_err(|e| ServiceError::MailError(e.to_string()))?;

        info!(user_id = %account.id, "Sign-in link issued");
        if let Err(e) = self
            .event_sender
            .send(Event::SignInLinkIssued {
                user_id: account.id,
            })
            .await
        {
            warn!(user_id = %account.id, error = %e, "Failed to send sign-in link event");
        }

        Ok(())
    }

    /// Exchanges a magic-link token for a session. The stored hash is
    /// deleted on success, so a link verifies exactly once.
    #[instrument(skip(self, token))]
    pub async fn verify_magic_link(
        &self,
        raw_email: &str,
        token: &str,
    ) -> Result<(user::Model, SessionToken), ServiceError> {
        let email = normalize_email(raw_email)?;
        let db = &*self.db_pool;
        let now = Utc::now();

        let stored = verification_token::Entity::find()
            .filter(verification_token::Column::Identifier.eq(email.clone()))
            .filter(verification_token::Column::TokenHash.eq(hash_token(token)))
            .one(db)
            .await?
            .ok_or_else(|| {
                debug!("No matching verification token");
                ServiceError::Unauthorized("Invalid or expired sign-in link".to_string())
            })?;

        // Single use, valid or not.
        verification_token::Entity::delete_by_id(stored.id)
            .exec(db)
            .await?;

        if stored.expires_at < now {
            return Err(ServiceError::Unauthorized(
                "Invalid or expired sign-in link".to_string(),
            ));
        }

        let account = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid or expired sign-in link".to_string()))?;

        let mut active: user::ActiveModel = account.clone().into();
        active.last_sign_in_at = Set(Some(now));
        let account = active.update(db).await?;

        let session = self.issue_session(&account)?;

        info!(user_id = %account.id, "Session issued via magic link");
        if let Err(e) = self
            .event_sender
            .send(Event::SessionIssued {
                user_id: account.id,
            })
            .await
        {
            warn!(user_id = %account.id, error = %e, "Failed to send session issued event");
        }

        Ok((account, session))
    }

    fn magic_link(&self, email: &str, token: &str) -> Result<String, ServiceError> {
        let mut link = Url::parse(&self.config.magic_link_base_url)
            .and_then(|base| base.join("auth/callback"))
            .map_err(|e| {
                ServiceError::InternalError(format!("Invalid magic link base URL: {}", e))
            })?;
        link.query_pairs_mut()
            .append_pair("email", email)
            .append_pair("token", token);
        Ok(link.to_string())
    }
}

fn normalize_email(raw: &str) -> Result<String, ServiceError> {
    let email = raw.trim().to_ascii_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ServiceError::ValidationError(
            "A valid email address is required".to_string(),
        ));
    }
    Ok(email)
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Pulls the session token from the shared cookie, falling back to an
/// `Authorization: Bearer` header for API clients.
pub fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some(token) = pair
                .trim()
                .strip_prefix(cookie_name)
                .and_then(|rest| rest.strip_prefix('='))
            {
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Middleware gating a router behind a verified session. The identity is
/// exposed to handlers as a `SessionUser` request extension.
pub async fn require_session(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = extract_session_token(request.headers(), auth.cookie_name())
        .ok_or_else(|| ServiceError::Unauthorized("Missing session credentials".to_string()))?;
    let session = auth.verify_token(&token)?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

// ---------------------------------------------------------------------------
// HTTP surface
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignInRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CallbackQuery {
    pub email: String,
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: SessionUser,
}

pub fn auth_routes() -> Router<Arc<AuthService>> {
    Router::new()
        .route("/sign-in", post(sign_in))
        .route("/callback", get(callback))
        .route("/session", get(session))
}

/// Responds uniformly so the endpoint does not reveal which addresses
/// have accounts.
async fn sign_in(
    State(auth): State<Arc<AuthService>>,
    Json(payload): Json<SignInRequest>,
) -> ApiResult<serde_json::Value> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    auth.request_sign_in(&payload.email).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "If the address exists, a sign-in link has been sent"
    }))))
}

async fn callback(
    State(auth): State<Arc<AuthService>>,
    Query(query): Query<CallbackQuery>,
) -> Result<(HeaderMap, Json<ApiResponse<SessionResponse>>), ServiceError> {
    let (account, session) = auth.verify_magic_link(&query.email, &query.token).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        auth.session_cookie(&session.token)
            .parse()
            .map_err(|_| ServiceError::InternalError("Failed to build session cookie".to_string()))?,
    );

    let user = SessionUser {
        user_id: account.id,
        email: account.email,
        name: account.name,
        token_id: String::new(),
    };

    Ok((
        headers,
        Json(ApiResponse::success(SessionResponse {
            token: session.token,
            expires_at: session.expires_at,
            user,
        })),
    ))
}

/// Echoes the identity behind the presented cookie or bearer token.
async fn session(
    State(auth): State<Arc<AuthService>>,
    headers: HeaderMap,
) -> ApiResult<SessionUser> {
    let token = extract_session_token(&headers, auth.cookie_name())
        .ok_or_else(|| ServiceError::Unauthorized("Missing session credentials".to_string()))?;
    let session = auth.verify_token(&token)?;

    Ok(Json(ApiResponse::success(session)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::LogMailer;
    use axum::http::HeaderValue;
    use sea_orm::DatabaseConnection;
    use tokio::sync::mpsc;

    fn test_service(cookie_domain: Option<String>, secure: bool) -> AuthService {
        let config = AuthConfig {
            jwt_secret: "a_sufficiently_long_testing_secret_0123456789".to_string(),
            issuer: "nubras-auth".to_string(),
            audience: "nubras-apps".to_string(),
            token_lifetime: Duration::from_secs(3600),
            cookie_name: "nubras-session".to_string(),
            cookie_domain,
            cookie_secure: secure,
            magic_link_base_url: "http://localhost:3000".to_string(),
            magic_link_lifetime: Duration::from_secs(900),
        };
        let (tx, _rx) = mpsc::channel(8);
        AuthService::new(
            config,
            Arc::new(DatabaseConnection::Disconnected),
            Arc::new(LogMailer),
            Arc::new(EventSender::new(tx)),
        )
    }

    fn test_user() -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            email: "fatima@example.com".to_string(),
            name: Some("Fatima".to_string()),
            created_at: Utc::now(),
            last_sign_in_at: None,
        }
    }

    #[test]
    fn issued_tokens_round_trip() {
        let service = test_service(None, false);
        let account = test_user();

        let session = service.issue_session(&account).unwrap();
        let verified = service.verify_token(&session.token).unwrap();

        assert_eq!(verified.user_id, account.id);
        assert_eq!(verified.email, account.email);
        assert_eq!(verified.name, account.name);
        assert!(!verified.token_id.is_empty());
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let service = test_service(None, false);
        let session = service.issue_session(&test_user()).unwrap();

        let mut tampered = session.token.clone();
        tampered.pop();
        tampered.push('x');

        assert!(service.verify_token(&tampered).is_err());
    }

    #[test]
    fn tokens_from_a_different_secret_are_rejected() {
        let issuer = test_service(None, false);
        let session = issuer.issue_session(&test_user()).unwrap();

        let mut other_config = issuer.config.clone();
        other_config.jwt_secret = "an_entirely_different_secret_9876543210_zyxw".to_string();
        let (tx, _rx) = mpsc::channel(8);
        let verifier = AuthService::new(
            other_config,
            Arc::new(DatabaseConnection::Disconnected),
            Arc::new(LogMailer),
            Arc::new(EventSender::new(tx)),
        );

        assert!(verifier.verify_token(&session.token).is_err());
    }

    #[test]
    fn cookie_carries_the_shared_session_attributes() {
        let service = test_service(Some(".nubras.com".to_string()), true);
        let cookie = service.session_cookie("tok123");

        assert!(cookie.starts_with("nubras-session=tok123; "));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(cookie.contains("Domain=.nubras.com"));
        assert!(cookie.ends_with("Secure"));
    }

    #[test]
    fn development_cookies_skip_secure() {
        let service = test_service(None, false);
        let cookie = service.session_cookie("tok123");
        assert!(!cookie.contains("Secure"));
        assert!(!cookie.contains("Domain="));
    }

    #[test]
    fn token_extraction_prefers_the_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; nubras-session=cookie-token; lang=en"),
        );
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer bearer-token"),
        );

        assert_eq!(
            extract_session_token(&headers, "nubras-session").as_deref(),
            Some("cookie-token")
        );
    }

    #[test]
    fn token_extraction_falls_back_to_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer bearer-token"),
        );

        assert_eq!(
            extract_session_token(&headers, "nubras-session").as_deref(),
            Some("bearer-token")
        );
        assert_eq!(extract_session_token(&HeaderMap::new(), "nubras-session"), None);
    }

    #[test]
    fn similarly_named_cookies_do_not_match() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("nubras-session-old=stale"),
        );
        assert_eq!(extract_session_token(&headers, "nubras-session"), None);
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Amal@Nubras.COM ").unwrap(), "amal@nubras.com");
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("   ").is_err());
    }

    #[test]
    fn magic_links_carry_encoded_query_params() {
        let service = test_service(None, false);
        let link = service.magic_link("amal@nubras.com", "tok/123").unwrap();
        assert!(link.starts_with("http://localhost:3000/auth/callback?"));
        assert!(link.contains("email=amal%40nubras.com"));
        assert!(link.contains("token=tok%2F123"));
    }

    #[test]
    fn token_hashing_is_stable_and_hex() {
        let first = hash_token("abc");
        assert_eq!(first, hash_token("abc"));
        assert_ne!(first, hash_token("abd"));
        assert_eq!(first.len(), 64);
    }
}
