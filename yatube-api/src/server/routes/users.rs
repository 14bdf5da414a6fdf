use crate::{
    server::{Result, ServerError, ServerRouter, json::Json},
    service::accounts::{Accounts, SignUp, SignUpForm},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_post(sign_up)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/", rejection(ServerError))]
struct SignUpPath();

async fn sign_up(
    SignUpPath(): SignUpPath,
    State(accounts): State<Accounts>,
    Json(form): Json<SignUpForm>,
) -> Result<(StatusCode, Json<SignUp>)> {
    let sign_up = accounts.sign_up(&form).await?;

    Ok((StatusCode::CREATED, Json(sign_up)))
}
