//! Identity endpoints
//!
//! The identity service itself is opaque; this module only keeps the
//! session store in step with it:
//! - login and signup success store `{user, token}`
//! - logout clears the session whether or not the server call succeeds
//! - a 401 from `auth/user` clears the session

use crate::client::StorefrontClient;
use crate::descriptor::RequestDescriptor;
use crate::error::ApiResult;
use crate::session::Session;
use chrono::Utc;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use storefront_core::validation::{Field, Schema};
use tracing::{info, warn};

/// Longest token lifetime accepted from the identity service (ten years)
pub const MAX_EXPIRES_IN_SECS: i64 = 10 * 365 * 24 * 60 * 60;

static LOGIN_SCHEMA: Lazy<Arc<Schema>> = Lazy::new(|| {
    Arc::new(Schema::object(
        "login",
        [
            Field::string("email").email(),
            Field::string("password").min_length(6),
        ],
    ))
});

static SIGNUP_SCHEMA: Lazy<Arc<Schema>> = Lazy::new(|| {
    Arc::new(Schema::object(
        "signup",
        [
            Field::string("email").email(),
            Field::string("password").min_length(8).max_length(72),
            Field::string("name").min_length(1).max_length(100),
        ],
    ))
});

static AUTH_RESPONSE_SCHEMA: Lazy<Arc<Schema>> = Lazy::new(|| {
    Arc::new(Schema::object(
        "auth_response",
        [
            Field::object("user", [Field::string("id"), Field::string("email").optional()]),
            Field::string("access_token").min_length(1),
            Field::string("refresh_token").optional().nullable(),
            Field::integer("expires_in")
                .optional()
                .nullable()
                .min(0.0)
                .max(MAX_EXPIRES_IN_SECS as f64),
        ],
    ))
});

static USER_SCHEMA: Lazy<Arc<Schema>> = Lazy::new(|| {
    Arc::new(Schema::object(
        "user",
        [
            Field::string("id"),
            Field::string("email").optional(),
            Field::string("name").optional().nullable(),
        ],
    ))
});

/// Login credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

/// Signup details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupDetails {
    /// Account email
    pub email: String,
    /// Account password, at least 8 characters
    pub password: String,
    /// Display name
    pub name: String,
}

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: String,
    /// Email, when the provider exposes it
    #[serde(default)]
    pub email: Option<String>,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    user: Value,
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl From<AuthResponse> for Session {
    fn from(response: AuthResponse) -> Self {
        Self {
            user: response.user,
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: response
                .expires_in
                .and_then(chrono::Duration::try_seconds)
                .and_then(|ttl| Utc::now().checked_add_signed(ttl)),
        }
    }
}

/// Identity API interface
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: StorefrontClient,
}

impl AuthApi {
    /// Create a new identity API interface
    pub(crate) fn new(client: StorefrontClient) -> Self {
        Self { client }
    }

    /// Sign in and store the session
    ///
    /// POST /auth/login
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<Session> {
        let descriptor = RequestDescriptor::post("auth/login")
            .json(credentials)?
            .outbound(Arc::clone(&LOGIN_SCHEMA))
            .inbound(Arc::clone(&AUTH_RESPONSE_SCHEMA));
        self.establish(descriptor).await
    }

    /// Create an account and store the session
    ///
    /// POST /auth/signup
    pub async fn signup(&self, details: &SignupDetails) -> ApiResult<Session> {
        let descriptor = RequestDescriptor::post("auth/signup")
            .json(details)?
            .outbound(Arc::clone(&SIGNUP_SCHEMA))
            .inbound(Arc::clone(&AUTH_RESPONSE_SCHEMA));
        self.establish(descriptor).await
    }

    /// Sign out; the local session is cleared even if the call fails
    ///
    /// POST /auth/logout
    pub async fn logout(&self) -> ApiResult<()> {
        let result = self
            .client
            .request(RequestDescriptor::post("auth/logout").skip_validation())
            .await;
        self.client.session().clear();

        match result {
            Ok(_) => {
                info!("Signed out");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Logout call failed; local session cleared anyway");
                Err(e)
            }
        }
    }

    /// The signed-in user
    ///
    /// GET /auth/user
    pub async fn get_current_user(&self) -> ApiResult<User> {
        let result = self
            .client
            .request_as(RequestDescriptor::get("auth/user").inbound(Arc::clone(&USER_SCHEMA)))
            .await;

        if let Err(ref e) = result {
            if e.is_unauthorized() {
                info!("Session rejected; clearing");
                self.client.session().clear();
            }
        }
        result
    }

    /// Session currently stored, if any
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.client.session().get()
    }

    async fn establish(&self, descriptor: RequestDescriptor) -> ApiResult<Session> {
        let response: AuthResponse = self.client.request_as(descriptor).await?;
        let session = Session::from(response);
        self.client.session().set(session.clone());
        info!(email = session.email().unwrap_or("-"), "Signed in");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::descriptor::HttpMethod;
    use crate::testing::MockTransport;
    use serde_json::json;

    fn client(transport: &Arc<MockTransport>) -> StorefrontClient {
        StorefrontClient::with_transport(
            ClientConfig::default().with_base_url("http://api.test"),
            transport.clone(),
        )
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn test_login_stores_session() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            HttpMethod::Post,
            "auth/login",
            200,
            json!({"user": {"id": "u1", "email": "a@shop.dev"}, "access_token": "tok", "expires_in": 3600}),
        );
        let client = client(&transport);

        let session = client.auth().login(&credentials("a@shop.dev", "secret1")).await.unwrap();
        assert_eq!(session.access_token, "tok");
        assert!(session.expires_at.is_some());
        assert_eq!(client.session().get().unwrap().email(), Some("a@shop.dev"));
    }

    #[tokio::test]
    async fn test_login_with_out_of_range_expiry_is_validation_error() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            HttpMethod::Post,
            "auth/login",
            200,
            json!({"user": {"id": "u1"}, "access_token": "tok", "expires_in": i64::MAX}),
        );
        let client = client(&transport);

        let err = client.auth().login(&credentials("a@shop.dev", "secret1")).await.unwrap_err();
        assert!(err.is_validation());
        assert!(err.message.contains("expires_in"));
        assert!(client.session().get().is_none());
    }

    #[test]
    fn test_unrepresentable_expiry_is_dropped() {
        let response = AuthResponse {
            user: json!({"id": "u1"}),
            access_token: "tok".into(),
            refresh_token: None,
            expires_in: Some(i64::MAX),
        };
        let session = Session::from(response);
        assert_eq!(session.access_token, "tok");
        assert_eq!(session.expires_at, None);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_input_without_calling() {
        let transport = Arc::new(MockTransport::new());
        let client = client(&transport);

        let err = client.auth().login(&credentials("nope", "123")).await.unwrap_err();
        assert!(err.is_validation());
        let fields = err.details.unwrap()["fieldErrors"].clone();
        assert_eq!(fields["email"], json!("invalid format"));
        assert_eq!(fields["password"], json!("must be at least 6 characters"));
        assert_eq!(transport.calls(), 0);
        assert!(client.session().get().is_none());
    }

    #[tokio::test]
    async fn test_failed_login_leaves_session_empty() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(HttpMethod::Post, "auth/login", 400, json!({"error_description": "Invalid login credentials"}));
        let client = client(&transport);

        let err = client.auth().login(&credentials("a@shop.dev", "secret1")).await.unwrap_err();
        assert_eq!(err.message, "Invalid login credentials");
        assert!(client.session().get().is_none());
    }

    #[tokio::test]
    async fn test_signup_requires_longer_password() {
        let transport = Arc::new(MockTransport::new());
        let client = client(&transport);
        let details = SignupDetails {
            email: "a@shop.dev".into(),
            password: "short1".into(),
            name: "Ada".into(),
        };

        let err = client.auth().signup(&details).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_logout_clears_session_even_on_failure() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(HttpMethod::Post, "auth/logout", 500, json!({}));
        let client = client(&transport);
        client.session().set(Session::new(json!({"id": "u1"}), "tok"));

        assert!(client.auth().logout().await.is_err());
        assert!(client.session().get().is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_user_lookup_clears_session() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(HttpMethod::Get, "auth/user", 401, json!({"msg": "JWT expired"}));
        let client = client(&transport);
        client.session().set(Session::new(json!({"id": "u1"}), "tok"));

        let err = client.auth().get_current_user().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.message, "JWT expired");
        assert!(client.auth().current_session().is_none());
    }

    #[tokio::test]
    async fn test_current_user() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(HttpMethod::Get, "auth/user", 200, json!({"id": "u1", "email": "a@shop.dev"}));
        let client = client(&transport);

        let user = client.auth().get_current_user().await.unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.name, None);
    }
}
