//! Request extractors whose rejections answer with the same field-level
//! 400 body as service validation errors.

use axum::extract::{FromRequest, FromRequestParts};

use crate::web::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ValidJson<T>(pub T);

/// Query string extractor; repeated keys (`tags=a&tags=b`) collect into a `Vec`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum_extra::extract::Query), rejection(AppError))]
pub struct ValidQuery<T>(pub T);
