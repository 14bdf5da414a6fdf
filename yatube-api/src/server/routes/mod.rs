use crate::server::ServerRouter;
use axum::Router;
use serde::Deserialize;

mod feeds;
mod posts;
mod profiles;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(feeds::routes())
        .merge(posts::routes())
        .merge(profiles::routes())
        .merge(users::routes())
}

/// `?page=` as given. Resolving it to a page is up to the paginator.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct PageQuery {
    #[serde(default)]
    page: Option<String>,
}
