use crate::{
    media::{DecodedImage, MediaStorage},
    service::{FormErrors, PostForm, Result, ServiceError, parse_slug},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use yatube_common::model::{
    Id,
    comment::Comment,
    group::{Group, GroupMarker},
    post::{CreatePost, Post, PostMarker, UpdatePost},
    text::Text,
    user::UserMarker,
};
use yatube_db::Store;

const INVALID_GROUP: &str =
    "Select a valid choice. That choice is not one of the available choices.";

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// What a post form needs to be filled in.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostFormContext {
    pub groups: Vec<Group>,
    /// The post being edited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Post>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum EditOutcome {
    Updated(Post),
    /// Only the author may edit; nothing was changed.
    NotAuthor(Post),
}

/// A form that passed validation. The image is decoded but not yet written.
struct ValidPost {
    text: Text,
    group: Option<Id<GroupMarker>>,
    image: Option<DecodedImage>,
}

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn Store>,
    media: MediaStorage,
}

impl PostService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, media: MediaStorage) -> Self {
        Self { store, media }
    }

    async fn fetch(&self, post_id: Id<PostMarker>) -> Result<Post> {
        self.store
            .fetch_post(post_id)
            .await?
            .ok_or(ServiceError::PostNotFound(post_id))
    }

    pub async fn detail(&self, post_id: Id<PostMarker>) -> Result<PostDetail> {
        let post = self.fetch(post_id).await?;
        let comments = self.store.fetch_comments(post_id).await?;

        Ok(PostDetail { post, comments })
    }

    pub async fn form_groups(&self) -> Result<Vec<Group>> {
        Ok(self.store.fetch_groups().await?)
    }

    pub async fn create_context(&self) -> Result<PostFormContext> {
        Ok(PostFormContext {
            groups: self.form_groups().await?,
            post: None,
        })
    }

    /// The edit form, or `None` if `editor` is not the author.
    pub async fn edit_context(
        &self,
        editor: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<Option<PostFormContext>> {
        let post = self.fetch(post_id).await?;
        if !post.is_authored_by(editor) {
            return Ok(None);
        }

        Ok(Some(PostFormContext {
            groups: self.form_groups().await?,
            post: Some(post),
        }))
    }

    async fn validate(&self, form: &PostForm) -> Result<ValidPost> {
        let mut errors = FormErrors::default();

        let text = Text::new(&form.text)
            .map_err(|err| errors.add("text", err))
            .ok();

        let group = match form.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(slug) => {
                let group = match parse_slug(slug) {
                    Some(slug) => self.store.fetch_group_by_slug(&slug).await?,
                    None => None,
                };
                if group.is_none() {
                    errors.add("group", INVALID_GROUP);
                }
                group.map(|group| group.id)
            }
        };

        let image = form
            .image
            .as_ref()
            .map(DecodedImage::decode)
            .transpose()
            .map_err(|err| errors.add("image", err))
            .ok()
            .flatten();

        match text {
            Some(text) if errors.is_empty() => Ok(ValidPost { text, group, image }),
            _ => {
                debug!(%errors, "Post form rejected");
                Err(ServiceError::Validation(errors))
            }
        }
    }

    async fn store_image(&self, image: Option<&DecodedImage>) -> Result<Option<String>> {
        match image {
            Some(image) => Ok(Some(self.media.save(image).await?)),
            None => Ok(None),
        }
    }

    async fn discard_image(&self, image: Option<&str>) {
        let Some(path) = image else {
            return;
        };
        if let Err(err) = self.media.remove(path).await {
            warn!(%path, %err, "Could not remove unused post image");
        }
    }

    pub async fn create(&self, author: Id<UserMarker>, form: &PostForm) -> Result<Post> {
        let valid = self.validate(form).await?;
        let image = self.store_image(valid.image.as_ref()).await?;

        let created = self
            .store
            .create_post(&CreatePost {
                author,
                text: valid.text,
                group: valid.group,
                image: image.clone(),
            })
            .await;
        let post = match created {
            Ok(post) => post,
            Err(err) => {
                self.discard_image(image.as_deref()).await;
                return Err(err.into());
            }
        };

        info!(post_id = %post.id, %author, "New post");
        Ok(post)
    }

    /// Replaces text, group and (if given) image. Non-authors change nothing.
    pub async fn edit(
        &self,
        editor: Id<UserMarker>,
        post_id: Id<PostMarker>,
        form: &PostForm,
    ) -> Result<EditOutcome> {
        let post = self.fetch(post_id).await?;
        if !post.is_authored_by(editor) {
            debug!(%post_id, %editor, "Edit by non-author ignored");
            return Ok(EditOutcome::NotAuthor(post));
        }

        let valid = self.validate(form).await?;
        let image = self.store_image(valid.image.as_ref()).await?;

        let updated = self
            .store
            .update_post(
                post_id,
                &UpdatePost {
                    text: valid.text,
                    group: valid.group,
                    image: image.clone(),
                },
            )
            .await
            .map_err(ServiceError::from)
            .and_then(|updated| updated.ok_or(ServiceError::PostNotFound(post_id)));
        let updated = match updated {
            Ok(updated) => updated,
            Err(err) => {
                self.discard_image(image.as_deref()).await;
                return Err(err);
            }
        };

        info!(%post_id, "Post edited");
        Ok(EditOutcome::Updated(updated))
    }
}
