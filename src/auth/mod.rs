use std::future::{ready, Ready};

use actix_web::{FromRequest, HttpRequest};

use crate::errors::AppError;

/// Header injected by the API gateway after it has verified the session
/// cookie. Token mechanics live entirely in the gateway; this core only
/// trusts the forwarded identity.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the authenticated caller in handlers.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::Unauthorized("Missing user identity".to_string()));

        ready(user_id.map(|user_id| AuthenticatedUser { user_id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn extracts_user_id_from_gateway_header() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "user-42"))
            .to_http_request();

        let user = AuthenticatedUser::extract(&req).await.unwrap();
        assert_eq!(user.user_id, "user-42");
    }

    #[actix_web::test]
    async fn missing_header_is_unauthorized() {
        let req = TestRequest::default().to_http_request();

        let err = AuthenticatedUser::extract(&req).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[actix_web::test]
    async fn blank_header_is_unauthorized() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "   "))
            .to_http_request();

        let err = AuthenticatedUser::extract(&req).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
