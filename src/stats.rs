use crate::types::{Post, StatsSnapshot};
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Running aggregate over every post delivered since startup.
///
/// Summary fields are recomputed from the full map rather than patched in
/// place, so upsert interleavings from overlapping drain chains cannot drift
/// them. Ties on the top score go to whichever post the map yields first;
/// HashMap iteration order is unspecified, so the tie winner is stable within
/// a run but not across runs.
pub struct PostStats {
    inner: RwLock<StatsInner>,
}

#[derive(Default)]
struct StatsInner {
    by_id: HashMap<String, Post>,
    top_scored: Option<Post>,
    top_author: Option<String>,
    author_counts: HashMap<String, usize>,
}

impl PostStats {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StatsInner::default()),
        }
    }

    /// Insert or overwrite posts by id. Idempotent and commutative, so
    /// overlapping drain chains may interleave freely. Summary fields are left
    /// to the `recompute` a chain runs once its window finishes draining.
    pub async fn upsert_all(&self, posts: &[Post]) {
        if posts.is_empty() {
            return;
        }
        let mut inner = self.inner.write().await;
        for post in posts {
            inner.by_id.insert(post.id.clone(), post.clone());
        }
    }

    /// Rebuild the derived summary from the full post map.
    pub async fn recompute(&self) {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        inner.author_counts.clear();
        let mut top_scored: Option<Post> = None;
        for post in inner.by_id.values() {
            if top_scored.as_ref().map_or(true, |best| post.ups > best.ups) {
                top_scored = Some(post.clone());
            }
            *inner.author_counts.entry(post.author.clone()).or_insert(0) += 1;
        }

        let top_author = inner
            .author_counts
            .iter()
            .fold(None::<(&String, usize)>, |best, (author, &count)| {
                match best {
                    Some((_, best_count)) if count <= best_count => best,
                    _ => Some((author, count)),
                }
            })
            .map(|(author, _)| author.clone());

        inner.top_scored = top_scored;
        inner.top_author = top_author;
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.inner.read().await.by_id.contains_key(id)
    }

    pub async fn snapshot(&self) -> StatsSnapshot {
        let inner = self.inner.read().await;
        StatsSnapshot {
            total_posts: inner.by_id.len(),
            top_scored: inner.top_scored.clone(),
            top_author: inner.top_author.clone(),
            taken_at: Utc::now(),
        }
    }
}

impl Default for PostStats {
    fn default() -> Self {
        Self::new()
    }
}
