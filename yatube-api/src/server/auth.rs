use crate::server::{ServerError, ServerSettings};
use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use std::sync::Arc;
use time::UtcDateTime;
use yatube_common::model::{Id, auth::AuthToken, user::UserMarker};
use yatube_db::Store;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The signed-in viewer.
///
/// Requests without an `Authorization` header are redirected to the login
/// page. Use `Option<AuthenticatedUser>` where anonymous viewers are allowed.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }
}

async fn authenticate(
    header: &AuthorizationHeader,
    store: &dyn Store,
) -> Result<AuthenticatedUser, ServerError> {
    let request_token: AuthToken = header.token().parse()?;
    let token_hash = request_token.hash()?;

    let authentication = store
        .fetch_auth(&token_hash)
        .await?
        .ok_or(ServerError::InvalidToken)?;

    if authentication.user != request_token.user_id
        || authentication.is_expired_at(UtcDateTime::now())
    {
        return Err(ServerError::InvalidToken);
    }

    Ok(AuthenticatedUser {
        id: authentication.user,
    })
}

fn login_required(parts: &Parts, settings: &ServerSettings) -> ServerError {
    let next = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_owned(), |path| path.as_str().to_owned());

    ServerError::LoginRequired {
        login_url: settings.login_url.clone(),
        next,
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<dyn Store>: FromRef<S>,
    Arc<ServerSettings>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = match <AuthorizationHeader as FromRequestParts<S>>::from_request_parts(
            parts, state,
        )
        .await
        {
            Ok(header) => header,
            Err(rejection) if rejection.is_missing() => {
                return Err(login_required(parts, &Arc::<ServerSettings>::from_ref(state)));
            }
            Err(rejection) => return Err(ServerError::InvalidAuthorizationHeader(rejection)),
        };

        authenticate(&header, Arc::<dyn Store>::from_ref(state).as_ref()).await
    }
}

impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    Arc<dyn Store>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let header = match <AuthorizationHeader as FromRequestParts<S>>::from_request_parts(
            parts, state,
        )
        .await
        {
            Ok(header) => header,
            Err(rejection) if rejection.is_missing() => return Ok(None),
            Err(rejection) => return Err(ServerError::InvalidAuthorizationHeader(rejection)),
        };

        authenticate(&header, Arc::<dyn Store>::from_ref(state).as_ref())
            .await
            .map(Some)
    }
}
