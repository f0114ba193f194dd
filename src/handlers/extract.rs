//! Request extractors whose rejections render as [`ServiceError`] bodies.
//!
//! axum's own `Json`, `Path` and `Query` reject with plain-text 4xx
//! responses. These wrappers route the same failures through
//! `ServiceError::ValidationError` so malformed input gets the usual
//! `{success: false, ...}` envelope and a 400.

use axum::extract::{FromRequest, FromRequestParts};

use crate::errors::ServiceError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ServiceError))]
pub struct AppJson<T>(pub T);

/// Path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ServiceError))]
pub struct AppPath<T>(pub T);

/// Query string.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ServiceError))]
pub struct AppQuery<T>(pub T);
