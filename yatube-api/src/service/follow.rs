use crate::service::{Result, resolve_user};
use std::sync::Arc;
use tracing::{debug, info};
use yatube_common::model::{
    Id,
    user::{User, UserMarker},
};
use yatube_db::{DbError, Store};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
    /// Following yourself is silently ignored.
    SelfFollow,
}

/// Follow edges. The store's uniqueness constraint settles concurrent follows.
#[derive(Clone)]
pub struct FollowGraph {
    store: Arc<dyn Store>,
}

impl FollowGraph {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn is_following(
        &self,
        follower: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<bool> {
        Ok(self.store.follow_exists(follower, author).await?)
    }

    pub async fn follow(
        &self,
        follower: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<FollowOutcome> {
        if follower == author {
            debug!(%follower, "Ignoring self-follow");
            return Ok(FollowOutcome::SelfFollow);
        }

        if self.is_following(follower, author).await? {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        match self.store.insert_follow(follower, author).await {
            Ok(true) => {
                info!(%follower, %author, "New follow edge");
                Ok(FollowOutcome::Followed)
            }
            Ok(false) | Err(DbError::Conflict) => Ok(FollowOutcome::AlreadyFollowing),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns whether an edge was removed. Removing a missing edge is not an error.
    pub async fn unfollow(&self, follower: Id<UserMarker>, author: Id<UserMarker>) -> Result<bool> {
        let removed = self.store.delete_follow(follower, author).await?;
        if removed {
            info!(%follower, %author, "Removed follow edge");
        }
        Ok(removed)
    }

    /// Follows the user with the given handle.
    pub async fn follow_handle(
        &self,
        follower: Id<UserMarker>,
        handle: &str,
    ) -> Result<(User, FollowOutcome)> {
        let author = resolve_user(self.store.as_ref(), handle).await?;
        let outcome = self.follow(follower, author.id).await?;
        Ok((author, outcome))
    }

    pub async fn unfollow_handle(&self, follower: Id<UserMarker>, handle: &str) -> Result<bool> {
        let author = resolve_user(self.store.as_ref(), handle).await?;
        self.unfollow(follower, author.id).await
    }
}
