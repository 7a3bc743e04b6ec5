//! Request extractors.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use tracing::debug;
use validator::Validate;

use crate::error::AppError;
use crate::models::validation_messages;

/// JSON body that has been decoded and then validated field by field.
///
/// A body that is not valid JSON for `T` is a 400 `Invalid request body`;
/// a decodable body with bad fields is a 400 listing every failing field.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(invalid_body)?;
        validated(value).map(Self)
    }
}

/// Decode and validate a body that was read as raw bytes, for handlers that
/// must make other checks before looking at the body.
pub fn parse_valid<T>(body: &[u8]) -> Result<T, AppError>
where
    T: DeserializeOwned + Validate,
{
    let Json(value) = Json::<T>::from_bytes(body).map_err(invalid_body)?;
    validated(value)
}

fn validated<T: Validate>(value: T) -> Result<T, AppError> {
    value
        .validate()
        .map_err(|errors| AppError::Validation(validation_messages(&errors)))?;
    Ok(value)
}

fn invalid_body(rejection: JsonRejection) -> AppError {
    debug!(%rejection, "rejected request body");
    AppError::BadRequest("Invalid request body".into())
}
