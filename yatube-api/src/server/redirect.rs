//! `302 Found` redirects and the URLs they point at.

use axum::{
    http::{HeaderValue, StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use percent_encoding::{AsciiSet, CONTROLS, NON_ALPHANUMERIC, utf8_percent_encode};
use std::fmt::Display;
use tracing::error;

/// Characters escaped in a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters escaped in a query value. Slashes stay readable.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Found(String);

impl Found {
    #[must_use]
    pub fn to(location: String) -> Self {
        Self(location)
    }

    #[must_use]
    pub fn to_login(login_url: &str, next: &str) -> Self {
        Self(format!(
            "{login_url}?next={}",
            utf8_percent_encode(next, QUERY_VALUE)
        ))
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.0
    }
}

impl IntoResponse for Found {
    fn into_response(self) -> Response {
        match HeaderValue::try_from(self.0) {
            Ok(location) => (StatusCode::FOUND, [(LOCATION, location)]).into_response(),
            Err(err) => {
                error!(%err, "Redirect location is not a valid header value");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

pub fn index() -> String {
    "/".to_owned()
}

pub fn follow_index() -> String {
    "/follow/".to_owned()
}

pub fn post_detail(post_id: impl Display) -> String {
    format!("/posts/{post_id}/")
}

pub fn profile(handle: &str) -> String {
    format!("/profile/{}/", utf8_percent_encode(handle, SEGMENT))
}
