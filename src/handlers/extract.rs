// handlers/extract.rs - Body and query extractors that fail with ApiError
//
// The stock axum extractors reject with plain-text bodies; these wrap them so
// malformed input gets the same error envelope as everything else.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ApiError::invalid_json(rejection.body_text())),
        }
    }
}

/// JSON body where an empty body means `T::default()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJson(T::default()));
        }
        serde_json::from_slice(&bytes)
            .map(OptionalJson)
            .map_err(|e| ApiError::invalid_json(format!("Failed to parse the request body as JSON: {}", e)))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Note {
        note: Option<String>,
    }

    fn request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn empty_body_is_default() {
        let OptionalJson(note) = OptionalJson::<Note>::from_request(request(""), &()).await.unwrap();
        assert_eq!(note, Note::default());
    }

    #[tokio::test]
    async fn body_is_parsed() {
        let OptionalJson(note) = OptionalJson::<Note>::from_request(request(r#"{"note":"done"}"#), &())
            .await
            .unwrap();
        assert_eq!(note.note.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_json() {
        let err = OptionalJson::<Note>::from_request(request("{nope"), &()).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_JSON");
    }

    #[tokio::test]
    async fn missing_content_type_is_rejected_by_json_body() {
        let req = Request::builder().method("POST").uri("/").body(Body::from("{}")).unwrap();
        let err = JsonBody::<Note>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_JSON");
    }
}
