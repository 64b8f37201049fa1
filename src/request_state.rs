use std::ops::{Deref, DerefMut};

use aide::OperationInput;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};

use crate::{
    database::{AppState, DatabaseConnection},
    error::{ServiceError, ServiceResult},
    models::{Role, Session},
    token::{self, TokenIssuer},
    uploads::ImageStore,
};

/// Per request state: a pooled database connection and the verified session, if the request
/// carried a bearer token.
///
/// A token that is present but fails verification is rejected right away, so handlers only
/// ever see `None` for requests without an `Authorization` header.
pub struct RequestState {
    pub db: DatabaseConnection,
    pub session: Option<Session>,
    pub tokens: TokenIssuer,
    pub images: ImageStore,
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestState
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let session = if parts.headers.contains_key(axum::http::header::AUTHORIZATION) {
            let TypedHeader(Authorization(bearer)) = parts
                .extract::<TypedHeader<Authorization<Bearer>>>()
                .await
                .map_err(|_| ServiceError::Unauthorized("Invalid authorization header"))?;
            Some(state.tokens.verify(bearer.token())?)
        } else {
            None
        };

        let db = state.connection().await?;

        Ok(Self {
            db,
            session,
            tokens: state.tokens,
            images: state.images,
        })
    }
}

impl OperationInput for RequestState {}

impl RequestState {
    /// The session of the caller, `Unauthorized` if the request carried no token.
    pub fn session_require(&self) -> ServiceResult<&Session> {
        self.session
            .as_ref()
            .ok_or(ServiceError::Unauthorized("Missing login"))
    }
}

/// `RequestState` of a request with a valid session token.
///
/// Rejects with `Unauthorized` while the request parts are extracted, so a missing login is
/// reported before the body is looked at.
pub struct SessionState {
    pub session: Session,
    state: RequestState,
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionState
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = RequestState::from_request_parts(parts, state).await?;
        let session = state.session_require()?.clone();
        Ok(Self { session, state })
    }
}

impl OperationInput for SessionState {}

impl Deref for SessionState {
    type Target = RequestState;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl DerefMut for SessionState {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.state
    }
}

/// `SessionState` of an admin, `Forbidden` for every other role.
pub struct AdminState(SessionState);

#[async_trait]
impl<S> FromRequestParts<S> for AdminState
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = SessionState::from_request_parts(parts, state).await?;
        token::authorize(&state.session, Role::Admin)?;
        Ok(Self(state))
    }
}

impl OperationInput for AdminState {}

impl Deref for AdminState {
    type Target = SessionState;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for AdminState {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
