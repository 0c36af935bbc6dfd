//! Request extractors that report schema violations through the portal error
//! taxonomy instead of axum's plain-text rejections.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::path::ErrorKind;
use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, RawPathParams, Request};
use axum::http::header;
use axum::http::request::Parts;
use portal_core::{PortalError, PortalResult};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON body whose decode errors name the offending field path.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |ct| ct.starts_with("application/json") || ct.contains("+json"));
        if !is_json {
            return Err(PortalError::validation("content-type", "must be application/json").into());
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| PortalError::validation("body", e.body_text()))?;
        Ok(ValidatedJson(decode_json(&body)?))
    }
}

/// Decode a JSON document, locating failures with `serde_path_to_error`
/// (`audienceSource`, `filterTree`, `userNotificationPreferences[1]`).
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> PortalResult<T> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let value = serde_path_to_error::deserialize(&mut de).map_err(|err| {
        let path = err.path().to_string();
        let located = path != "." && !err.inner().is_syntax() && !err.inner().is_eof();
        let field = if located { path } else { "body".to_string() };
        PortalError::validation(field, err.inner().to_string())
    })?;
    de.end()
        .map_err(|e| PortalError::validation("body", e.to_string()))?;
    Ok(value)
}

/// Path parameters; a bad segment is reported under its route key (`id`).
#[derive(Debug)]
pub struct ValidatedPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys: Vec<String> = match RawPathParams::from_request_parts(parts, state).await {
            Ok(params) => params.iter().map(|(key, _)| key.to_string()).collect(),
            Err(_) => Vec::new(),
        };
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ValidatedPath(value)),
            Err(rejection) => Err(path_error(rejection, &keys).into()),
        }
    }
}

fn path_error(rejection: PathRejection, keys: &[String]) -> PortalError {
    let fallback = match keys {
        [only] => only.clone(),
        _ => "path".to_string(),
    };
    match rejection {
        PathRejection::FailedToDeserializePathParams(err) => {
            let field = match err.kind() {
                ErrorKind::ParseErrorAtKey { key, .. }
                | ErrorKind::InvalidUtf8InPathParam { key } => key.clone(),
                ErrorKind::ParseErrorAtIndex { index, .. } => {
                    keys.get(*index).cloned().unwrap_or(fallback)
                }
                _ => fallback,
            };
            PortalError::validation(field, err.body_text())
        }
        other => PortalError::validation(fallback, other.body_text()),
    }
}

/// Query string; decode errors are reported under `query`.
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| ValidatedQuery(value))
            .map_err(|e| PortalError::validation("query", e.body_text()).into())
    }
}
