//! JSON extractor reporting body errors in the gateway envelope

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Serialize};

use super::error::ApiError;

/// `axum::Json` whose rejections become `invalid_argument` errors
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        axum::Json::<T>::from_request(req, state)
            .await
            .map(|axum::Json(value)| Json(value))
            .map_err(|rejection| ApiError::bad_request(describe(&rejection)))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Reason text without echoing the body back
fn describe(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::JsonDataError(err) => format!("Invalid request body: {}", err.body_text()),
        JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON".to_string(),
        JsonRejection::MissingJsonContentType(_) => {
            "Expected Content-Type: application/json".to_string()
        }
        _ => "Unreadable request body".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;
    use serde::Deserialize;

    use super::*;
    use crate::api::types::ApiErrorKind;

    #[derive(Debug, Deserialize)]
    struct PromptBody {
        #[allow(dead_code)]
        prompt: String,
    }

    fn post(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = Request::builder().method("POST");
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_wrong_field_type_is_invalid_argument() {
        let err = Json::<PromptBody>::from_request(post(Some("application/json"), r#"{"prompt": 42}"#), &())
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.response.error.kind, ApiErrorKind::InvalidArgument);
        assert!(err.response.error.message.starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn test_syntax_error_does_not_echo_body() {
        let err = Json::<PromptBody>::from_request(
            post(Some("application/json"), r#"{"prompt": "Patient: John Smith"#),
            &(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(!err.response.error.message.contains("John"));
    }

    #[tokio::test]
    async fn test_missing_content_type() {
        let err = Json::<PromptBody>::from_request(post(None, r#"{"prompt": "x"}"#), &())
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
