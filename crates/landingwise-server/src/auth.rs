//! Caller identity.
//!
//! Authentication happens upstream. The identity provider or proxy in front
//! of the server sets `x-user-id`, and protected handlers take an
//! [`AuthUser`] argument to require it.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

impl AuthUser {
    /// The caller's user id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| Self(id.to_string()))
            .ok_or(ApiError::Unauthorized)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<AuthUser, ApiError> {
        let (mut parts, ()) = request.into_parts();
        AuthUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_header_present() {
        let request = Request::builder()
            .header(USER_ID_HEADER, "user-42")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap().id(), "user-42");
    }

    #[tokio::test]
    async fn test_missing_or_blank_header_rejected() {
        let missing = Request::builder().body(()).unwrap();
        assert!(matches!(extract(missing).await, Err(ApiError::Unauthorized)));

        let blank = Request::builder()
            .header(USER_ID_HEADER, "  ")
            .body(())
            .unwrap();
        assert!(matches!(extract(blank).await, Err(ApiError::Unauthorized)));
    }
}
