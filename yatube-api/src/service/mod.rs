use crate::media::{ImageUpload, MediaError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use yatube_common::model::{
    Id,
    auth::AuthTokenHashError,
    group::GroupSlug,
    post::PostMarker,
    user::{User, UserHandle},
};
use yatube_db::{DbError, Store};

pub mod accounts;
pub mod comments;
pub mod feed;
pub mod follow;
pub mod posts;

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Post with id {0} was not found.")]
    PostNotFound(Id<PostMarker>),
    #[error("Group with slug {0:?} was not found.")]
    GroupNotFound(String),
    #[error("User with handle {0:?} was not found.")]
    UserNotFound(String),
    #[error("The submitted form was invalid: {0}")]
    Validation(FormErrors),
    #[error("An anonymous viewer asked for a viewer-specific result")]
    Unauthenticated,
    #[error("The user handle is already taken")]
    HandleTaken,
    #[error(transparent)]
    Store(#[from] DbError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    TokenHash(#[from] AuthTokenHashError),
}

/// Validation messages per form field.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl ToString) {
        self.0.entry(field).or_default().push(message.to_string());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// `Ok(())` if nothing was reported.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self))
        }
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                write!(f, "{field}: {message}")?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub text: String,
    /// Slug of the group, if any.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub image: Option<ImageUpload>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

/// Looks up a user by the handle found in a URL. Malformed handles cannot
/// exist, so they are reported as not found.
pub(crate) async fn resolve_user(store: &dyn Store, handle: &str) -> Result<User> {
    let not_found = || ServiceError::UserNotFound(handle.to_owned());
    let handle = UserHandle::new(handle.to_owned()).map_err(|_| not_found())?;

    store.fetch_user_by_handle(&handle).await?.ok_or_else(not_found)
}

pub(crate) fn parse_slug(slug: &str) -> Option<GroupSlug> {
    GroupSlug::new(slug.to_owned()).ok()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use yatube_common::model::{
        group::{CreateGroup, Group, GroupSlug},
        post::{CreatePost, Post},
        text::Text,
        user::{CreateUser, User, UserHandle},
    };
    use yatube_db::{MemoryStore, Store};

    pub(crate) fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    pub(crate) async fn user(store: &MemoryStore, handle: &str) -> User {
        store
            .create_user(&CreateUser {
                handle: UserHandle::new(handle.to_owned()).unwrap(),
            })
            .await
            .unwrap()
    }

    pub(crate) async fn group(store: &MemoryStore, slug: &str) -> Group {
        store
            .create_group(&CreateGroup {
                title: "Тестовая группа".to_owned(),
                slug: GroupSlug::new(slug.to_owned()).unwrap(),
                description: "Тестовое описание".to_owned(),
            })
            .await
            .unwrap()
    }

    pub(crate) async fn post(
        store: &MemoryStore,
        author: &User,
        text: &str,
        group: Option<&Group>,
    ) -> Post {
        store
            .create_post(&CreatePost {
                author: author.id,
                text: Text::new(text).unwrap(),
                group: group.map(|group| group.id),
                image: None,
            })
            .await
            .unwrap()
    }
}
