//! Query, path and form extractors that answer with the JSON error body.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Form,
};
use serde::de::DeserializeOwned;

use crate::errors::AppError;

/// `Query<T>` whose rejection is an [`AppError::BadRequest`].
pub struct ParsedQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ParsedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
        Ok(ParsedQuery(value))
    }
}

/// `Path<T>` whose rejection is an [`AppError::BadRequest`].
pub struct ParsedPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ParsedPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
        Ok(ParsedPath(value))
    }
}

/// `Form<T>` whose rejection is an [`AppError::BadRequest`].
pub struct ParsedForm<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ParsedForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
        Ok(ParsedForm(value))
    }
}
