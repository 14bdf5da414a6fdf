use crate::{
    server::{
        Result, ServerError, ServerRouter,
        auth::AuthenticatedUser,
        json::Json,
        redirect::{self, Found},
    },
    service::{
        CommentForm, PostForm,
        comments::CommentManager,
        posts::{EditOutcome, PostDetail, PostFormContext, PostService},
    },
};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use yatube_common::model::{Id, post::PostMarker};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(post_detail)
        .typed_get(edit_form)
        .typed_post(edit_post)
        .typed_get(create_form)
        .typed_post(create_post)
        .typed_post(add_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn post_detail(
    PostPath { id }: PostPath,
    State(posts): State<PostService>,
) -> Result<Json<PostDetail>> {
    let detail = posts.detail(id).await?;

    Ok(Json(detail))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/edit/", rejection(ServerError))]
struct EditPath {
    id: Id<PostMarker>,
}

async fn edit_form(
    EditPath { id }: EditPath,
    State(posts): State<PostService>,
    user: AuthenticatedUser,
) -> Result<Response> {
    let response = match posts.edit_context(user.user_id(), id).await? {
        Some(context) => Json(context).into_response(),
        None => Found::to(redirect::post_detail(id)).into_response(),
    };

    Ok(response)
}

async fn edit_post(
    EditPath { id }: EditPath,
    State(posts): State<PostService>,
    user: AuthenticatedUser,
    Json(form): Json<PostForm>,
) -> Result<Found> {
    match posts.edit(user.user_id(), id, &form).await? {
        EditOutcome::Updated(post) | EditOutcome::NotAuthor(post) => {
            Ok(Found::to(redirect::post_detail(post.id)))
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/create/", rejection(ServerError))]
struct CreatePath();

async fn create_form(
    CreatePath(): CreatePath,
    State(posts): State<PostService>,
    _user: AuthenticatedUser,
) -> Result<Json<PostFormContext>> {
    let context = posts.create_context().await?;

    Ok(Json(context))
}

async fn create_post(
    CreatePath(): CreatePath,
    State(posts): State<PostService>,
    user: AuthenticatedUser,
    Json(form): Json<PostForm>,
) -> Result<Found> {
    let post = posts.create(user.user_id(), &form).await?;

    Ok(Found::to(redirect::profile(post.author.handle.get())))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comment", rejection(ServerError))]
struct CommentPath {
    id: Id<PostMarker>,
}

async fn add_comment(
    CommentPath { id }: CommentPath,
    State(comments): State<CommentManager>,
    user: AuthenticatedUser,
    Json(form): Json<CommentForm>,
) -> Result<Found> {
    comments.add_comment(user.user_id(), id, &form).await?;

    Ok(Found::to(redirect::post_detail(id)))
}
