//! Extractors whose rejections render through `AgendaError`, so malformed
//! bodies, paths and queries get the same `INVALID_INPUT` envelope as
//! validation failures.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AgendaError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AgendaError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AgendaError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AgendaError))]
pub struct ApiQuery<T>(pub T);
