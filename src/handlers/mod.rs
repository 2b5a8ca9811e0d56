//! HTTP handlers

pub mod health;
pub mod model;
pub mod predict;


use crate::AppError;

pub async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}
