use crate::{
    cache::PageCache,
    server::{
        Result, ServerError, ServerRouter,
        auth::AuthenticatedUser,
        json::{Json, Query, RawJson},
        routes::PageQuery,
    },
    service::feed::{FeedBuilder, GroupFeed, ProfileFeed},
};
use axum::{body::Bytes, extract::State};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use yatube_common::{
    model::post::Post,
    pagination::{Page, PageRequest},
};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(index)
        .typed_get(group_posts)
        .typed_get(profile)
        .typed_get(follow_index)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/", rejection(ServerError))]
struct IndexPath();

/// The global feed, served from the page cache while it is fresh.
async fn index(
    IndexPath(): IndexPath,
    State(feeds): State<FeedBuilder>,
    State(cache): State<Arc<PageCache>>,
    Query(query): Query<PageQuery>,
) -> Result<RawJson> {
    // Entries are stored under the resolved page number.
    let cached = match PageRequest::parse(query.page.as_deref()) {
        PageRequest::Number(number) => cache.get(number.get()),
        PageRequest::Last => None,
    };
    if let Some(body) = cached {
        debug!("Serving cached index page");
        return Ok(RawJson(body));
    }

    let page = feeds.global(query.page.as_deref()).await?;
    let body = Bytes::from(serde_json::to_vec(&page)?);
    cache.set(page.number, body.clone());

    Ok(RawJson(body))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/group/{slug}/", rejection(ServerError))]
struct GroupPath {
    slug: String,
}

async fn group_posts(
    GroupPath { slug }: GroupPath,
    State(feeds): State<FeedBuilder>,
    Query(query): Query<PageQuery>,
) -> Result<Json<GroupFeed>> {
    let feed = feeds.group(&slug, query.page.as_deref()).await?;

    Ok(Json(feed))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/", rejection(ServerError))]
struct ProfilePath {
    username: String,
}

async fn profile(
    ProfilePath { username }: ProfilePath,
    State(feeds): State<FeedBuilder>,
    viewer: Option<AuthenticatedUser>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProfileFeed>> {
    let viewer = viewer.map(AuthenticatedUser::user_id);
    let feed = feeds
        .profile(viewer, &username, query.page.as_deref())
        .await?;

    Ok(Json(feed))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/follow/", rejection(ServerError))]
struct FollowIndexPath();

async fn follow_index(
    FollowIndexPath(): FollowIndexPath,
    State(feeds): State<FeedBuilder>,
    user: AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Post>>> {
    let page = feeds
        .following(user.user_id(), query.page.as_deref())
        .await?;

    Ok(Json(page))
}
