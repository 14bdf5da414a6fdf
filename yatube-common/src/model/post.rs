use crate::model::{
    Id,
    group::{Group, GroupMarker},
    text::Text,
    user::{User, UserMarker},
};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub text: Text,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub author: User,
    pub group: Option<Group>,
    /// Path of the attached image relative to the media root.
    pub image: Option<String>,
}

/// A post about to be stored. The store assigns id and creation time.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatePost {
    pub author: Id<UserMarker>,
    pub text: Text,
    pub group: Option<Id<GroupMarker>>,
    pub image: Option<String>,
}

/// Replacement content for an existing post. `image: None` keeps the current image.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct UpdatePost {
    pub text: Text,
    pub group: Option<Id<GroupMarker>>,
    pub image: Option<String>,
}

impl Post {
    #[must_use]
    pub fn is_authored_by(&self, user: Id<UserMarker>) -> bool {
        self.author.id == user
    }
}

impl Display for Post {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text.preview())
    }
}
