use crate::{
    cache::PageCache,
    config::AppConfig,
    media::MediaStorage,
    service::{
        ServiceError, accounts::Accounts, comments::CommentManager, feed::FeedBuilder,
        follow::FollowGraph, posts::PostService,
    },
};
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use json::Json;
use redirect::Found;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};
use yatube_common::{
    model::auth::{AuthTokenDecodeError, AuthTokenHashError},
    pagination::Paginator,
};
use yatube_db::{DbError, Store};

mod auth;
mod json;
mod redirect;
mod routes;

pub type ServerRouter = Router<ServerState>;

/// Settings the HTTP layer needs beyond the services.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ServerSettings {
    pub login_url: String,
}

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub store: Arc<dyn Store>,
    pub feeds: FeedBuilder,
    pub follows: FollowGraph,
    pub comments: CommentManager,
    pub posts: PostService,
    pub accounts: Accounts,
    pub page_cache: Arc<PageCache>,
    pub settings: Arc<ServerSettings>,
}

impl ServerState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: &AppConfig, media: MediaStorage) -> Self {
        let follows = FollowGraph::new(store.clone());
        let page_cache = PageCache::new(std::time::Duration::from_secs(
            config.index_cache_seconds.get(),
        ));

        Self {
            feeds: FeedBuilder::new(
                store.clone(),
                follows.clone(),
                Paginator::new(config.paginate_by),
            ),
            follows,
            comments: CommentManager::new(store.clone()),
            posts: PostService::new(store.clone(), media),
            accounts: Accounts::new(store.clone()),
            page_cache: Arc::new(page_cache),
            settings: Arc::new(ServerSettings {
                login_url: config.login_url.clone(),
            }),
            store,
        }
    }
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub fn app(state: ServerState) -> Router {
    routes().with_state(state)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error("Provided token was invalid or expired")]
    InvalidToken,
    #[error("Login required to access {next}")]
    LoginRequired { login_url: String, next: String },
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Database(#[from] DbError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PathRejection(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidToken => StatusCode::UNAUTHORIZED,
            ServerError::LoginRequired { .. } => StatusCode::FOUND,
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_) => StatusCode::BAD_REQUEST,
            ServerError::Service(err) => match err {
                ServiceError::PostNotFound(_)
                | ServiceError::GroupNotFound(_)
                | ServiceError::UserNotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
                ServiceError::HandleTaken => StatusCode::CONFLICT,
                ServiceError::Store(_) | ServiceError::Media(_) | ServiceError::TokenHash(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::AuthTokenHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct ErrorResponse {
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<crate::service::FormErrors>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            ServerError::LoginRequired { login_url, next } => {
                debug!(%next, "Redirecting to login");
                Found::to_login(&login_url, &next).into_response()
            }
            err => {
                if status.is_server_error() {
                    error!(error = %err, %status, "Replying with error");
                } else {
                    debug!(error = %err, %status, "Replying with error");
                }

                let errors = match err {
                    ServerError::Service(ServiceError::Validation(errors)) => Some(errors),
                    _ => None,
                };
                let error_response = ErrorResponse {
                    status: status.as_u16(),
                    errors,
                };
                (status, Json(error_response)).into_response()
            }
        }
    }
}
