use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;

use crate::api::error::ApiError;
use crate::model::{UploadedFile, UserContext};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const UPLOAD_FILENAME_HEADER: &str = "x-upload-filename";

/// Axum extractor for the caller identity
///
/// The authentication layer in front of this service forwards the verified caller
/// in request headers:
/// - X-User-Id: Required user identifier
/// - X-User-Email: Optional user email
/// - X-User-Role: Optional role (`user` or `admin`)
///
/// Requests without a caller are rejected as unauthorized.
#[async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;

        let user_id = extract_header_value(headers, USER_ID_HEADER).ok_or(ApiError::Unauthorized)?;
        let user_email = extract_header_value(headers, USER_EMAIL_HEADER);
        let user_role = extract_header_value(headers, USER_ROLE_HEADER);

        Ok(UserContext::with_details(user_id, user_email, user_role))
    }
}

/// File name the upload middleware generated for this request, if any.
#[async_trait]
impl<S> FromRequestParts<S> for UploadedFile
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(UploadedFile(extract_header_value(
            &parts.headers,
            UPLOAD_FILENAME_HEADER,
        )))
    }
}

/// Extract a non-blank header value as string
fn extract_header_value(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|s| s.to_string())
}
