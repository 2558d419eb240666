//! JSON request body parsing.
//!
//! Runs ahead of route dispatch: a request that declares a JSON content type
//! has its body buffered and parsed once. Malformed input is rejected here so
//! handlers never see it. The parsed document is stored in the request
//! extensions as [`JsonBody`] and the raw bytes are put back, so the regular
//! `Json<T>` extractor keeps working downstream.

use crate::error::AppError;
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::Value;
use std::convert::Infallible;

/// Largest JSON body accepted, in bytes.
pub const JSON_BODY_LIMIT: usize = 100 * 1024;

/// Parsed JSON request body. Defaults to an empty object.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonBody(pub Value);

impl Default for JsonBody {
    fn default() -> Self {
        JsonBody(Value::Object(Default::default()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<JsonBody>().cloned().unwrap_or_default())
    }
}

pub async fn json_body_middleware(req: Request, next: Next) -> Result<Response, AppError> {
    if !is_json_content_type(req.headers()) {
        return Ok(next.run(req).await);
    }

    let (mut parts, body) = req.into_parts();
    let bytes = Limited::new(body, JSON_BODY_LIMIT)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                AppError::PayloadTooLarge(anyhow::anyhow!(
                    "Request body exceeds {} bytes",
                    JSON_BODY_LIMIT
                ))
            } else {
                AppError::BadRequest(anyhow::anyhow!("Failed to read request body: {}", e))
            }
        })?
        .to_bytes();

    let parsed = parse_json(&bytes)?;
    parts.extensions.insert(parsed);

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

fn parse_json(bytes: &[u8]) -> Result<JsonBody, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(JsonBody::default());
    }

    let value: Value = serde_json::from_slice(bytes).map_err(|e| {
        tracing::debug!(error = %e, "Rejecting malformed JSON body");
        AppError::BadRequest(anyhow::anyhow!("Malformed JSON body: {}", e))
    })?;

    // Only objects and arrays are accepted at the top level.
    if !(value.is_object() || value.is_array()) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "JSON body must be an object or an array"
        )));
    }

    Ok(JsonBody(value))
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}
