use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the id of the user issuing the request.
pub const USER_ID_HEADER: &str = "x-user-id";

/// User issuing the request, taken from the `x-user-id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub Uuid);

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing user header `x-user-id`".into()))?;

        Uuid::parse_str(raw.trim())
            .map(ActingUser)
            .map_err(|_| AppError::Unauthorized("`x-user-id` must be a UUID".into()))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<ActingUser, AppError> {
        let (mut parts, _) = request.into_parts();
        ActingUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_the_user_header() {
        let user = Uuid::new_v4();
        let request = Request::builder()
            .header(USER_ID_HEADER, user.to_string())
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap(), ActingUser(user));
    }

    #[tokio::test]
    async fn missing_or_malformed_header_is_unauthorized() {
        let missing = Request::builder().body(()).unwrap();
        assert!(matches!(
            extract(missing).await.unwrap_err(),
            AppError::Unauthorized(_)
        ));

        let malformed = Request::builder()
            .header(USER_ID_HEADER, "not-a-uuid")
            .body(())
            .unwrap();
        assert!(matches!(
            extract(malformed).await.unwrap_err(),
            AppError::Unauthorized(_)
        ));
    }
}
