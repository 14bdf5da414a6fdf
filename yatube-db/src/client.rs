use crate::{
    record::{AuthenticationRecord, CommentRecord, FullPostRecord, GroupRecord, UserRecord},
    store::{PostFilter, Result, Store},
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, migrate::MigrateError, query, query_as, query_scalar};
use time::PrimitiveDateTime;
use tracing::debug;
use yatube_common::model::{
    Id,
    auth::{AuthTokenHash, Authentication},
    comment::{Comment, CreateComment},
    group::{CreateGroup, Group, GroupMarker, GroupSlug},
    post::{CreatePost, Post, PostMarker, UpdatePost},
    user::{CreateUser, User, UserHandle, UserMarker},
};

const SELECT_FULL_POST: &str = "
    SELECT
        posts.post_id,
        posts.text,
        posts.created_at,
        posts.image,
        users.user_id,
        users.handle,
        groups.group_id,
        groups.title AS group_title,
        groups.slug AS group_slug,
        groups.description AS group_description
    FROM
        posts.posts
        JOIN users.users ON users.user_id = posts.author_id
        LEFT JOIN posts.groups ON groups.group_id = posts.group_id
    ";

const SELECT_COMMENT: &str = "
    SELECT
        comments.comment_id,
        comments.post_id,
        comments.text,
        comments.created_at,
        users.user_id,
        users.handle
    FROM
        posts.comments
        JOIN users.users ON users.user_id = comments.author_id
    ";

/// Postgres-backed entity store.
pub struct DbClient {
    pool: PgPool,
}

fn bind_id<Marker>(id: Id<Marker>) -> i64 {
    id.get().cast_signed()
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: PostFilter) {
    match filter {
        PostFilter::All => {}
        PostFilter::Group(group_id) => {
            builder
                .push(" WHERE posts.group_id = ")
                .push_bind(bind_id(group_id));
        }
        PostFilter::Author(author_id) => {
            builder
                .push(" WHERE posts.author_id = ")
                .push_bind(bind_id(author_id));
        }
        PostFilter::FollowedBy(follower_id) => {
            builder
                .push(
                    " WHERE posts.author_id IN \
                    (SELECT follows.author_id FROM users.follows WHERE follows.follower_id = ",
                )
                .push_bind(bind_id(follower_id))
                .push(")");
        }
    }
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> std::result::Result<(), MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Store for DbClient {
    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT users.user_id, users.handle
            FROM users.users
            WHERE users.user_id = $1
            ",
        )
        .bind(bind_id(user_id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(User::try_from).transpose()?)
    }

    async fn fetch_user_by_handle(&self, handle: &UserHandle) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT users.user_id, users.handle
            FROM users.users
            WHERE users.handle = $1
            ",
        )
        .bind(handle.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(User::try_from).transpose()?)
    }

    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO users.users (handle)
            VALUES ($1)
            RETURNING user_id, handle
            ",
        )
        .bind(user.handle.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(User::try_from(record)?)
    }

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT user_id, token_hash, created_at, expires_after_seconds
            FROM users.authentications
            WHERE token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Authentication::try_from).transpose()?)
    }

    async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        let created_at = authentication.created_at;

        query(
            "
            INSERT INTO users.authentications
                (token_hash, user_id, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(&authentication.token_hash.0[..])
        .bind(bind_id(authentication.user))
        .bind(PrimitiveDateTime::new(created_at.date(), created_at.time()))
        .bind(
            authentication
                .expires_after
                .map(|duration| duration.get().whole_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_groups(&self) -> Result<Vec<Group>> {
        let records = query_as::<_, GroupRecord>(
            "
            SELECT group_id, title, slug, description
            FROM posts.groups
            ORDER BY title, group_id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(Group::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn fetch_group_by_slug(&self, slug: &GroupSlug) -> Result<Option<Group>> {
        let record = query_as::<_, GroupRecord>(
            "
            SELECT group_id, title, slug, description
            FROM posts.groups
            WHERE slug = $1
            ",
        )
        .bind(slug.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Group::try_from).transpose()?)
    }

    async fn create_group(&self, group: &CreateGroup) -> Result<Group> {
        let record = query_as::<_, GroupRecord>(
            "
            INSERT INTO posts.groups (title, slug, description)
            VALUES ($1, $2, $3)
            RETURNING group_id, title, slug, description
            ",
        )
        .bind(&group.title)
        .bind(group.slug.get())
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(Group::try_from(record)?)
    }

    async fn delete_group(&self, group_id: Id<GroupMarker>) -> Result<bool> {
        let affected = query("DELETE FROM posts.groups WHERE group_id = $1")
            .bind(bind_id(group_id))
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(affected > 0)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = QueryBuilder::<Postgres>::new(SELECT_FULL_POST)
            .push(" WHERE posts.post_id = ")
            .push_bind(bind_id(post_id))
            .build_query_as::<FullPostRecord>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(Post::try_from).transpose()?)
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let post_id: i64 = query_scalar(
            "
            INSERT INTO posts.posts (text, author_id, group_id, image)
            VALUES ($1, $2, $3, $4)
            RETURNING post_id
            ",
        )
        .bind(post.text.get())
        .bind(bind_id(post.author))
        .bind(post.group.map(bind_id))
        .bind(post.image.as_deref())
        .fetch_one(&self.pool)
        .await?;

        debug!(post_id, "Inserted post");

        let post_id = Id::new(post_id.cast_unsigned());
        self.fetch_post(post_id)
            .await?
            .ok_or_else(|| sqlx::Error::RowNotFound.into())
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        update: &UpdatePost,
    ) -> Result<Option<Post>> {
        let affected = query(
            "
            UPDATE posts.posts
            SET text = $2, group_id = $3, image = COALESCE($4, image)
            WHERE post_id = $1
            ",
        )
        .bind(bind_id(post_id))
        .bind(update.text.get())
        .bind(update.group.map(bind_id))
        .bind(update.image.as_deref())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Ok(None);
        }
        self.fetch_post(post_id).await
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<u64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts.posts");
        push_filter(&mut builder, filter);

        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count.cast_unsigned())
    }

    async fn fetch_posts(&self, filter: PostFilter, limit: u64, offset: u64) -> Result<Vec<Post>> {
        let mut builder = QueryBuilder::<Postgres>::new(SELECT_FULL_POST);
        push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY posts.created_at DESC, posts.post_id DESC LIMIT ")
            .push_bind(limit.cast_signed())
            .push(" OFFSET ")
            .push_bind(offset.cast_signed());

        let records = builder
            .build_query_as::<FullPostRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn fetch_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = QueryBuilder::<Postgres>::new(SELECT_COMMENT)
            .push(" WHERE comments.post_id = ")
            .push_bind(bind_id(post_id))
            .push(" ORDER BY comments.created_at, comments.comment_id")
            .build_query_as::<CommentRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn create_comment(&self, comment: &CreateComment) -> Result<Comment> {
        let record = query_as::<_, CommentRecord>(
            "
            WITH inserted AS (
                INSERT INTO posts.comments (post_id, author_id, text)
                VALUES ($1, $2, $3)
                RETURNING comment_id, post_id, author_id, text, created_at
            )
            SELECT
                inserted.comment_id,
                inserted.post_id,
                inserted.text,
                inserted.created_at,
                users.user_id,
                users.handle
            FROM inserted JOIN users.users ON users.user_id = inserted.author_id
            ",
        )
        .bind(bind_id(comment.post))
        .bind(bind_id(comment.author))
        .bind(comment.text.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(Comment::try_from(record)?)
    }

    async fn follow_exists(
        &self,
        follower: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<bool> {
        let exists: bool = query_scalar(
            "
            SELECT EXISTS (
                SELECT 1 FROM users.follows
                WHERE follower_id = $1 AND author_id = $2
            )
            ",
        )
        .bind(bind_id(follower))
        .bind(bind_id(author))
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert_follow(
        &self,
        follower: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<bool> {
        // The unique constraint settles concurrent inserts for the same pair.
        let inserted: Option<i64> = query_scalar(
            "
            INSERT INTO users.follows (follower_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT ON CONSTRAINT unique_following DO NOTHING
            RETURNING follow_id
            ",
        )
        .bind(bind_id(follower))
        .bind(bind_id(author))
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted.is_some())
    }

    async fn delete_follow(
        &self,
        follower: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<bool> {
        let affected = query(
            "
            DELETE FROM users.follows
            WHERE follower_id = $1 AND author_id = $2
            ",
        )
        .bind(bind_id(follower))
        .bind(bind_id(author))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }
}
