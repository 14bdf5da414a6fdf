use async_trait::async_trait;
use thiserror::Error;
use yatube_common::model::{
    Id, ModelValidationError,
    auth::{AuthTokenHash, Authentication},
    comment::{Comment, CreateComment},
    group::{CreateGroup, Group, GroupMarker, GroupSlug},
    post::{CreatePost, Post, PostMarker, UpdatePost},
    user::{CreateUser, User, UserHandle, UserMarker},
};

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("A uniqueness or check constraint was violated")]
    Conflict,
    #[error("A referenced row does not exist")]
    MissingReference,
    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err)
                if db_err.is_unique_violation() || db_err.is_check_violation() =>
            {
                Self::Conflict
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                Self::MissingReference
            }
            _ => Self::Sqlx(err),
        }
    }
}

/// Which posts a feed query selects. Results are always newest first.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum PostFilter {
    All,
    Group(Id<GroupMarker>),
    Author(Id<UserMarker>),
    /// Posts by every author the given user follows.
    FollowedBy(Id<UserMarker>),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>>;

    async fn fetch_user_by_handle(&self, handle: &UserHandle) -> Result<Option<User>>;

    /// Fails with [`DbError::Conflict`] if the handle is taken.
    async fn create_user(&self, user: &CreateUser) -> Result<User>;

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>>;

    async fn create_auth(&self, authentication: &Authentication) -> Result<()>;

    async fn fetch_groups(&self) -> Result<Vec<Group>>;

    async fn fetch_group_by_slug(&self, slug: &GroupSlug) -> Result<Option<Group>>;

    async fn create_group(&self, group: &CreateGroup) -> Result<Group>;

    /// Deletes the group. Its posts survive with their group cleared.
    async fn delete_group(&self, group_id: Id<GroupMarker>) -> Result<bool>;

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;

    async fn create_post(&self, post: &CreatePost) -> Result<Post>;

    async fn update_post(&self, post_id: Id<PostMarker>, update: &UpdatePost)
    -> Result<Option<Post>>;

    async fn count_posts(&self, filter: PostFilter) -> Result<u64>;

    /// Newest first, ties broken by descending id.
    async fn fetch_posts(&self, filter: PostFilter, limit: u64, offset: u64) -> Result<Vec<Post>>;

    /// Oldest first.
    async fn fetch_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>>;

    async fn create_comment(&self, comment: &CreateComment) -> Result<Comment>;

    async fn follow_exists(
        &self,
        follower: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<bool>;

    /// Inserts the edge unless it already exists. Returns whether a row was created.
    async fn insert_follow(
        &self,
        follower: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<bool>;

    /// Returns whether an edge was removed.
    async fn delete_follow(
        &self,
        follower: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<bool>;
}
