//! In-process store with the same constraints as the Postgres schema.

use crate::store::{DbError, PostFilter, Result, Store};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use time::OffsetDateTime;
use yatube_common::model::{
    Id,
    auth::{AuthTokenHash, Authentication},
    comment::{Comment, CommentMarker, CreateComment},
    group::{CreateGroup, Group, GroupMarker, GroupSlug},
    post::{CreatePost, Post, PostMarker, UpdatePost},
    text::Text,
    user::{CreateUser, User, UserHandle, UserMarker},
};

#[derive(Clone, Debug)]
struct PostRow {
    id: Id<PostMarker>,
    text: Text,
    created_at: OffsetDateTime,
    author: Id<UserMarker>,
    group: Option<Id<GroupMarker>>,
    image: Option<String>,
}

#[derive(Clone, Debug)]
struct CommentRow {
    id: Id<CommentMarker>,
    post: Id<PostMarker>,
    author: Id<UserMarker>,
    text: Text,
    created_at: OffsetDateTime,
}

#[derive(Default, Debug)]
struct State {
    last_user_id: u64,
    last_group_id: u64,
    last_post_id: u64,
    last_comment_id: u64,
    users: Vec<User>,
    authentications: HashMap<AuthTokenHash, Authentication>,
    groups: Vec<Group>,
    posts: Vec<PostRow>,
    comments: Vec<CommentRow>,
    follows: BTreeSet<(Id<UserMarker>, Id<UserMarker>)>,
}

#[derive(Default, Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored follow edges, for assertions on graph invariants.
    #[must_use]
    pub fn follow_count(&self) -> usize {
        self.state.lock().follows.len()
    }
}

/// Each table counts its ids from 1, like an identity column.
fn next_id<Marker>(last_id: &mut u64) -> Id<Marker> {
    *last_id += 1;
    Id::new(*last_id)
}

impl State {
    fn user(&self, user_id: Id<UserMarker>) -> Option<&User> {
        self.users.iter().find(|user| user.id == user_id)
    }

    fn group(&self, group_id: Id<GroupMarker>) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == group_id)
    }

    fn hydrate_post(&self, row: &PostRow) -> Result<Post> {
        let author = self
            .user(row.author)
            .ok_or(DbError::MissingReference)?
            .clone();

        Ok(Post {
            id: row.id,
            text: row.text.clone(),
            created_at: row.created_at,
            author,
            group: row.group.and_then(|group_id| self.group(group_id)).cloned(),
            image: row.image.clone(),
        })
    }

    fn hydrate_comment(&self, row: &CommentRow) -> Result<Comment> {
        let author = self
            .user(row.author)
            .ok_or(DbError::MissingReference)?
            .clone();

        Ok(Comment {
            id: row.id,
            post: row.post,
            author,
            text: row.text.clone(),
            created_at: row.created_at,
        })
    }

    fn matches(&self, row: &PostRow, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => row.group == Some(group_id),
            PostFilter::Author(author_id) => row.author == author_id,
            PostFilter::FollowedBy(follower_id) => {
                self.follows.contains(&(follower_id, row.author))
            }
        }
    }

    fn check_references(
        &self,
        author: Id<UserMarker>,
        group: Option<Id<GroupMarker>>,
    ) -> Result<()> {
        let group_missing = group.is_some_and(|group_id| self.group(group_id).is_none());
        if self.user(author).is_none() || group_missing {
            return Err(DbError::MissingReference);
        }
        Ok(())
    }
}

fn saturating_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        Ok(self.state.lock().user(user_id).cloned())
    }

    async fn fetch_user_by_handle(&self, handle: &UserHandle) -> Result<Option<User>> {
        let state = self.state.lock();
        Ok(state.users.iter().find(|user| &user.handle == handle).cloned())
    }

    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let mut state = self.state.lock();
        if state.users.iter().any(|existing| existing.handle == user.handle) {
            return Err(DbError::Conflict);
        }

        let user = User {
            id: next_id(&mut state.last_user_id),
            handle: user.handle.clone(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        Ok(self.state.lock().authentications.get(token_hash).cloned())
    }

    async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        let mut state = self.state.lock();
        if state.user(authentication.user).is_none() {
            return Err(DbError::MissingReference);
        }
        if state
            .authentications
            .contains_key(&authentication.token_hash)
        {
            return Err(DbError::Conflict);
        }

        state
            .authentications
            .insert(authentication.token_hash.clone(), authentication.clone());
        Ok(())
    }

    async fn fetch_groups(&self) -> Result<Vec<Group>> {
        let mut groups = self.state.lock().groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn fetch_group_by_slug(&self, slug: &GroupSlug) -> Result<Option<Group>> {
        let state = self.state.lock();
        Ok(state.groups.iter().find(|group| &group.slug == slug).cloned())
    }

    async fn create_group(&self, group: &CreateGroup) -> Result<Group> {
        let mut state = self.state.lock();
        if state.groups.iter().any(|existing| existing.slug == group.slug) {
            return Err(DbError::Conflict);
        }

        let group = Group {
            id: next_id(&mut state.last_group_id),
            title: group.title.clone(),
            slug: group.slug.clone(),
            description: group.description.clone(),
        };
        state.groups.push(group.clone());
        Ok(group)
    }

    async fn delete_group(&self, group_id: Id<GroupMarker>) -> Result<bool> {
        let mut state = self.state.lock();
        let before = state.groups.len();
        state.groups.retain(|group| group.id != group_id);
        if state.groups.len() == before {
            return Ok(false);
        }

        for post in &mut state.posts {
            if post.group == Some(group_id) {
                post.group = None;
            }
        }
        Ok(true)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let state = self.state.lock();
        state
            .posts
            .iter()
            .find(|row| row.id == post_id)
            .map(|row| state.hydrate_post(row))
            .transpose()
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let mut state = self.state.lock();
        state.check_references(post.author, post.group)?;

        let row = PostRow {
            id: next_id(&mut state.last_post_id),
            text: post.text.clone(),
            created_at: OffsetDateTime::now_utc(),
            author: post.author,
            group: post.group,
            image: post.image.clone(),
        };
        let post = state.hydrate_post(&row)?;
        state.posts.push(row);
        Ok(post)
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        update: &UpdatePost,
    ) -> Result<Option<Post>> {
        let mut state = self.state.lock();
        let Some(index) = state.posts.iter().position(|row| row.id == post_id) else {
            return Ok(None);
        };
        let author = state.posts[index].author;
        state.check_references(author, update.group)?;

        let row = &mut state.posts[index];
        row.text = update.text.clone();
        row.group = update.group;
        if let Some(image) = &update.image {
            row.image = Some(image.clone());
        }

        let row = state.posts[index].clone();
        state.hydrate_post(&row).map(Some)
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<u64> {
        let state = self.state.lock();
        let count = state
            .posts
            .iter()
            .filter(|row| state.matches(row, filter))
            .count();
        Ok(count as u64)
    }

    async fn fetch_posts(&self, filter: PostFilter, limit: u64, offset: u64) -> Result<Vec<Post>> {
        let state = self.state.lock();
        let mut rows: Vec<&PostRow> = state
            .posts
            .iter()
            .filter(|row| state.matches(row, filter))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        rows.into_iter()
            .skip(saturating_usize(offset))
            .take(saturating_usize(limit))
            .map(|row| state.hydrate_post(row))
            .collect()
    }

    async fn fetch_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let state = self.state.lock();
        let mut rows: Vec<&CommentRow> = state
            .comments
            .iter()
            .filter(|row| row.post == post_id)
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        rows.into_iter()
            .map(|row| state.hydrate_comment(row))
            .collect()
    }

    async fn create_comment(&self, comment: &CreateComment) -> Result<Comment> {
        let mut state = self.state.lock();
        let post_exists = state.posts.iter().any(|row| row.id == comment.post);
        if !post_exists || state.user(comment.author).is_none() {
            return Err(DbError::MissingReference);
        }

        let row = CommentRow {
            id: next_id(&mut state.last_comment_id),
            post: comment.post,
            author: comment.author,
            text: comment.text.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        let comment = state.hydrate_comment(&row)?;
        state.comments.push(row);
        Ok(comment)
    }

    async fn follow_exists(
        &self,
        follower: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<bool> {
        Ok(self.state.lock().follows.contains(&(follower, author)))
    }

    async fn insert_follow(
        &self,
        follower: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<bool> {
        let mut state = self.state.lock();
        if follower == author {
            return Err(DbError::Conflict);
        }
        if state.user(follower).is_none() || state.user(author).is_none() {
            return Err(DbError::MissingReference);
        }
        Ok(state.follows.insert((follower, author)))
    }

    async fn delete_follow(
        &self,
        follower: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<bool> {
        Ok(self.state.lock().follows.remove(&(follower, author)))
    }
}
