use crate::{
    server::{
        Result, ServerError, ServerRouter,
        auth::AuthenticatedUser,
        redirect::{self, Found},
    },
    service::follow::FollowGraph,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;

// Both verbs are accepted so plain links work as well as forms.
pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(profile_follow)
        .typed_post(profile_follow)
        .typed_get(profile_unfollow)
        .typed_post(profile_unfollow)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/follow", rejection(ServerError))]
struct FollowPath {
    username: String,
}

async fn profile_follow(
    FollowPath { username }: FollowPath,
    State(follows): State<FollowGraph>,
    user: AuthenticatedUser,
) -> Result<Found> {
    follows.follow_handle(user.user_id(), &username).await?;

    Ok(Found::to(redirect::follow_index()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/unfollow", rejection(ServerError))]
struct UnfollowPath {
    username: String,
}

async fn profile_unfollow(
    UnfollowPath { username }: UnfollowPath,
    State(follows): State<FollowGraph>,
    user: AuthenticatedUser,
) -> Result<Found> {
    follows.unfollow_handle(user.user_id(), &username).await?;

    Ok(Found::to(redirect::index()))
}
