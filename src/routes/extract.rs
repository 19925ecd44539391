use axum::extract::{FromRequestParts, Path, Query};

use crate::error::AppError;

/// `Query` whose rejection is an `AppError`, so bad parameters get a JSON body
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// `Path` whose rejection is an `AppError`
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
