//! Extractors whose rejections render as `{"detail": "..."}`.

use axum::extract::{FromRequest, FromRequestParts};

use crate::api::error::ApiError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
