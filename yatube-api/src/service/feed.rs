use crate::service::{Result, ServiceError, follow::FollowGraph, parse_slug, resolve_user};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use yatube_common::{
    model::{
        Id,
        group::Group,
        post::Post,
        user::{User, UserMarker},
    },
    pagination::{Page, Paginator},
};
use yatube_db::{PostFilter, Store};

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum FeedSelector {
    Global,
    /// Group by slug.
    Group(String),
    /// Author by handle.
    Author(String),
    /// Authors the viewer follows.
    Following,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct GroupFeed {
    pub group: Group,
    pub page: Page<Post>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct ProfileFeed {
    pub author: User,
    pub post_count: u64,
    /// Only known for a signed-in viewer looking at someone else's profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following: Option<bool>,
    pub page: Page<Post>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(untagged)]
pub enum Feed {
    Global(Page<Post>),
    Group(GroupFeed),
    Profile(ProfileFeed),
    Following(Page<Post>),
}

#[derive(Clone)]
pub struct FeedBuilder {
    store: Arc<dyn Store>,
    follows: FollowGraph,
    paginator: Paginator,
}

impl FeedBuilder {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, follows: FollowGraph, paginator: Paginator) -> Self {
        Self {
            store,
            follows,
            paginator,
        }
    }

    async fn page(&self, filter: PostFilter, requested: Option<&str>) -> Result<Page<Post>> {
        let count = self.store.count_posts(filter).await?;
        let window = self.paginator.window(requested, count);

        let posts = if window.limit == 0 {
            Vec::new()
        } else {
            self.store
                .fetch_posts(filter, window.limit, window.offset)
                .await?
        };

        debug!(
            ?filter,
            page = window.number,
            num_pages = window.num_pages,
            count,
            "Built feed page"
        );
        Ok(window.into_page(posts))
    }

    pub async fn global(&self, page: Option<&str>) -> Result<Page<Post>> {
        self.page(PostFilter::All, page).await
    }

    pub async fn group(&self, slug: &str, page: Option<&str>) -> Result<GroupFeed> {
        let not_found = || ServiceError::GroupNotFound(slug.to_owned());
        let parsed = parse_slug(slug).ok_or_else(not_found)?;
        let group = self
            .store
            .fetch_group_by_slug(&parsed)
            .await?
            .ok_or_else(not_found)?;

        let page = self.page(PostFilter::Group(group.id), page).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile(
        &self,
        viewer: Option<Id<UserMarker>>,
        handle: &str,
        page: Option<&str>,
    ) -> Result<ProfileFeed> {
        let author = resolve_user(self.store.as_ref(), handle).await?;

        let page = self.page(PostFilter::Author(author.id), page).await?;
        let following = match viewer {
            Some(viewer) if viewer != author.id => {
                Some(self.follows.is_following(viewer, author.id).await?)
            }
            _ => None,
        };

        Ok(ProfileFeed {
            author,
            post_count: page.count,
            following,
            page,
        })
    }

    pub async fn following(
        &self,
        viewer: Id<UserMarker>,
        page: Option<&str>,
    ) -> Result<Page<Post>> {
        self.page(PostFilter::FollowedBy(viewer), page).await
    }

    /// Builds any feed. The following feed needs a signed-in viewer.
    pub async fn build(
        &self,
        viewer: Option<Id<UserMarker>>,
        selector: &FeedSelector,
        page: Option<&str>,
    ) -> Result<Feed> {
        Ok(match selector {
            FeedSelector::Global => Feed::Global(self.global(page).await?),
            FeedSelector::Group(slug) => Feed::Group(self.group(slug, page).await?),
            FeedSelector::Author(handle) => {
                Feed::Profile(self.profile(viewer, handle, page).await?)
            }
            FeedSelector::Following => {
                let viewer = viewer.ok_or(ServiceError::Unauthenticated)?;
                Feed::Following(self.following(viewer, page).await?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::service::{
        ServiceError,
        feed::{Feed, FeedBuilder, FeedSelector},
        follow::FollowGraph,
        test_support::{group, post, store, user},
    };
    use std::{num::NonZeroU64, sync::Arc};
    use yatube_common::{model::post::Post, pagination::Paginator};
    use yatube_db::MemoryStore;

    fn builder(store: &Arc<MemoryStore>, per_page: u64) -> FeedBuilder {
        FeedBuilder::new(
            store.clone(),
            FollowGraph::new(store.clone()),
            Paginator::new(NonZeroU64::new(per_page).unwrap()),
        )
    }

    fn texts(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|post| post.text.get()).collect()
    }

    fn assert_newest_first(posts: &[Post]) {
        for pair in posts.windows(2) {
            assert!(
                (pair[0].created_at, pair[0].id) > (pair[1].created_at, pair[1].id),
                "{} is not newer than {}",
                pair[0].id,
                pair[1].id
            );
        }
    }

    #[tokio::test]
    async fn group_feed_pages() {
        let store = store();
        let feeds = builder(&store, 10);
        let author = user(&store, "TestUser").await;
        let test_group = group(&store, "test-slug").await;
        for i in 0..15 {
            post(&store, &author, &format!("Тестовый текст{i}"), Some(&test_group)).await;
        }

        let first = feeds.group("test-slug", None).await.unwrap();
        assert_eq!(first.group, test_group);
        assert_eq!(first.page.len(), 10);
        assert_eq!(first.page.items[0].text.get(), "Тестовый текст14");
        assert_eq!(first.page.items[9].text.get(), "Тестовый текст5");
        assert_newest_first(&first.page.items);

        let second = feeds.group("test-slug", Some("2")).await.unwrap();
        assert_eq!(second.page.len(), 5);
        assert_eq!(second.page.items[4].text.get(), "Тестовый текст0");

        let beyond = feeds.group("test-slug", Some("3")).await.unwrap();
        assert_eq!(beyond.page, second.page);
    }

    #[tokio::test]
    async fn group_feed_only_shows_its_group() {
        let store = store();
        let feeds = builder(&store, 10);
        let author = user(&store, "author").await;
        let first = group(&store, "first").await;
        let second = group(&store, "second").await;
        post(&store, &author, "in first", Some(&first)).await;
        post(&store, &author, "in second", Some(&second)).await;
        post(&store, &author, "in none", None).await;

        let feed = feeds.group("first", None).await.unwrap();
        assert_eq!(texts(&feed.page.items), ["in first"]);

        let global = feeds.global(None).await.unwrap();
        assert_eq!(texts(&global.items), ["in none", "in second", "in first"]);
    }

    #[tokio::test]
    async fn unknown_group_is_not_found() {
        let store = store();
        let feeds = builder(&store, 10);

        for slug in ["missing", "not a slug"] {
            assert!(matches!(
                feeds.group(slug, None).await,
                Err(ServiceError::GroupNotFound(_))
            ));
        }
    }

    #[tokio::test]
    async fn empty_feed_has_one_empty_page() {
        let store = store();
        let feeds = builder(&store, 10);

        let page = feeds.global(Some("5")).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
    }

    #[tokio::test]
    async fn profile_reports_count_and_follow_state() {
        let store = store();
        let feeds = builder(&store, 2);
        let author = user(&store, "author").await;
        let reader = user(&store, "reader").await;
        for i in 0..3 {
            post(&store, &author, &format!("post {i}"), None).await;
        }
        post(&store, &reader, "not by author", None).await;

        let anonymous = feeds.profile(None, "author", None).await.unwrap();
        assert_eq!(anonymous.post_count, 3);
        assert_eq!(anonymous.following, None);
        assert_eq!(texts(&anonymous.page.items), ["post 2", "post 1"]);

        let own = feeds.profile(Some(author.id), "author", None).await.unwrap();
        assert_eq!(own.following, None);

        let before = feeds.profile(Some(reader.id), "author", None).await.unwrap();
        assert_eq!(before.following, Some(false));

        FollowGraph::new(store.clone())
            .follow(reader.id, author.id)
            .await
            .unwrap();
        let after = feeds
            .profile(Some(reader.id), "author", Some("2"))
            .await
            .unwrap();
        assert_eq!(after.following, Some(true));
        assert_eq!(texts(&after.page.items), ["post 0"]);
    }

    #[tokio::test]
    async fn following_feed_tracks_follow_edges() {
        let store = store();
        let feeds = builder(&store, 10);
        let graph = FollowGraph::new(store.clone());
        let author = user(&store, "author").await;
        let follower = user(&store, "follower").await;
        let stranger = user(&store, "stranger").await;
        post(&store, &author, "followed post", None).await;
        post(&store, &stranger, "stranger post", None).await;

        assert!(feeds.following(follower.id, None).await.unwrap().is_empty());

        graph.follow(follower.id, author.id).await.unwrap();
        let feed = feeds.following(follower.id, None).await.unwrap();
        assert_eq!(texts(&feed.items), ["followed post"]);
        assert!(feeds.following(stranger.id, None).await.unwrap().is_empty());

        graph.unfollow(follower.id, author.id).await.unwrap();
        assert!(feeds.following(follower.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn build_dispatches_on_selector() {
        let store = store();
        let feeds = builder(&store, 10);
        let author = user(&store, "author").await;
        post(&store, &author, "hello", None).await;

        assert!(matches!(
            feeds.build(None, &FeedSelector::Global, None).await.unwrap(),
            Feed::Global(page) if page.len() == 1
        ));
        assert!(matches!(
            feeds
                .build(None, &FeedSelector::Author("author".to_owned()), None)
                .await
                .unwrap(),
            Feed::Profile(profile) if profile.post_count == 1
        ));
        assert!(matches!(
            feeds.build(None, &FeedSelector::Following, None).await,
            Err(ServiceError::Unauthenticated)
        ));
        assert!(matches!(
            feeds
                .build(Some(author.id), &FeedSelector::Following, None)
                .await
                .unwrap(),
            Feed::Following(page) if page.is_empty()
        ));
    }
}
