use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::jwt::{JwtError, JwtService};
use crate::handlers::error::service_error_to_response;
use crate::models::{CurrentUser, ServiceError};
use crate::services::AuthService;

fn rejection(message: &str) -> (StatusCode, Json<Value>) {
    service_error_to_response(ServiceError::Authentication {
        message: message.to_string(),
    })
}

/// Resolve the bearer token in the request, if any, against the stored account
async fn authenticate(
    parts: &Parts,
    jwt: &JwtService,
    auth: &AuthService,
) -> Result<Option<CurrentUser>, (StatusCode, Json<Value>)> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let token = value
        .to_str()
        .ok()
        .and_then(JwtService::extract_from_header)
        .ok_or_else(|| rejection("Authorization header must be a bearer token"))?;

    let claims = jwt.validate(token).map_err(|e| {
        warn!(error = %e, "Rejected bearer token");
        match e {
            JwtError::ExpiredToken => rejection("Token expired"),
            _ => rejection("Invalid token"),
        }
    })?;

    let claimed = CurrentUser::try_from(claims).map_err(|_| rejection("Invalid token"))?;
    let user = auth
        .resolve(claimed)
        .await
        .map_err(service_error_to_response)?;
    debug!(user_id = user.id, role = %user.role, "Authenticated request");
    Ok(Some(user))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<JwtService>: FromRef<S>,
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jwt = Arc::<JwtService>::from_ref(state);
        let auth = Arc::<AuthService>::from_ref(state);
        authenticate(parts, &jwt, &auth)
            .await?
            .ok_or_else(|| service_error_to_response(ServiceError::Unauthorized))
    }
}

/// Caller identity when a token is sent; a malformed token is still rejected
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<CurrentUser>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for OptionalUser
where
    Arc<JwtService>: FromRef<S>,
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jwt = Arc::<JwtService>::from_ref(state);
        let auth = Arc::<AuthService>::from_ref(state);
        authenticate(parts, &jwt, &auth).await.map(OptionalUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, Role, User};
    use crate::repositories::{Database, SqliteUserRepository, UserRepository};
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    #[derive(Clone)]
    struct TestState {
        jwt: Arc<JwtService>,
        auth: Arc<AuthService>,
        users: Arc<SqliteUserRepository>,
    }

    impl FromRef<TestState> for Arc<JwtService> {
        fn from_ref(state: &TestState) -> Self {
            state.jwt.clone()
        }
    }

    impl FromRef<TestState> for Arc<AuthService> {
        fn from_ref(state: &TestState) -> Self {
            state.auth.clone()
        }
    }

    async fn state() -> TestState {
        let database = Database::in_memory().await.unwrap();
        let users = Arc::new(SqliteUserRepository::new(database.pool().clone()));
        let jwt = Arc::new(JwtService::new("extractor-test-secret-value", "restaurant-rs", 30));
        TestState {
            auth: Arc::new(AuthService::new(users.clone(), jwt.clone())),
            jwt,
            users,
        }
    }

    async fn stored_user(state: &TestState, role: Role) -> User {
        state
            .users
            .create(NewUser {
                name: "Tester".to_string(),
                email: "tester@example.com".to_string(),
                phone: None,
                role,
                password_hash: String::new(),
            })
            .await
            .unwrap()
    }

    fn app(state: TestState) -> Router {
        Router::new()
            .route(
                "/me",
                get(|user: CurrentUser| async move { user.role.to_string() }),
            )
            .route(
                "/maybe",
                get(|OptionalUser(user): OptionalUser| async move {
                    user.map(|u| u.id.to_string()).unwrap_or_else(|| "anonymous".to_string())
                }),
            )
            .with_state(state)
    }

    fn authorized(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_accepted() {
        let state = state().await;
        let user = stored_user(&state, Role::Courier).await;
        let token = state.jwt.issue(&user).unwrap().token;

        let response = app(state).oneshot(authorized("/me", &token)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "courier");
    }

    #[tokio::test]
    async fn test_missing_or_bad_token_rejected() {
        let state = state().await;
        let response = app(state.clone())
            .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app(state)
            .oneshot(authorized("/me", "not-a-jwt"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_role_is_read_from_the_stored_account() {
        let state = state().await;
        let user = stored_user(&state, Role::Admin).await;
        let token = state.jwt.issue(&user).unwrap().token;

        let demoted = User {
            role: Role::User,
            ..user
        };
        state.users.update(demoted).await.unwrap();

        let response = app(state).oneshot(authorized("/me", &token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "user");
    }

    #[tokio::test]
    async fn test_token_for_deleted_account_rejected() {
        let state = state().await;
        let user = stored_user(&state, Role::Admin).await;
        let token = state.jwt.issue(&user).unwrap().token;
        assert!(state.users.delete(user.id).await.unwrap());

        let response = app(state.clone())
            .oneshot(authorized("/me", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app(state)
            .oneshot(authorized("/maybe", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_optional_user() {
        let state = state().await;
        let user = stored_user(&state, Role::User).await;
        let token = state.jwt.issue(&user).unwrap().token;

        let response = app(state.clone())
            .oneshot(Request::builder().uri("/maybe").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_text(response).await, "anonymous");

        let response = app(state)
            .oneshot(authorized("/maybe", &token))
            .await
            .unwrap();
        assert_eq!(body_text(response).await, user.id.to_string());
    }
}
