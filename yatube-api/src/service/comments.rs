use crate::service::{CommentForm, FormErrors, Result, ServiceError};
use std::sync::Arc;
use tracing::info;
use yatube_common::model::{
    Id,
    comment::{Comment, CreateComment},
    post::PostMarker,
    text::Text,
    user::UserMarker,
};
use yatube_db::{DbError, Store};

#[derive(Clone)]
pub struct CommentManager {
    store: Arc<dyn Store>,
}

impl CommentManager {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Appends a comment by `viewer` to the post. Nothing is stored if the text is blank.
    pub async fn add_comment(
        &self,
        viewer: Id<UserMarker>,
        post_id: Id<PostMarker>,
        form: &CommentForm,
    ) -> Result<Comment> {
        if self.store.fetch_post(post_id).await?.is_none() {
            return Err(ServiceError::PostNotFound(post_id));
        }

        let text = match Text::new(&form.text) {
            Ok(text) => text,
            Err(err) => {
                let mut errors = FormErrors::default();
                errors.add("text", err);
                return Err(ServiceError::Validation(errors));
            }
        };

        let comment = self
            .store
            .create_comment(&CreateComment {
                post: post_id,
                author: viewer,
                text,
            })
            .await
            .map_err(|err| match err {
                // The post was deleted between the lookup and the insert.
                DbError::MissingReference => ServiceError::PostNotFound(post_id),
                err => err.into(),
            })?;

        info!(comment_id = %comment.id, %post_id, author = %viewer, "New comment");
        Ok(comment)
    }
}
