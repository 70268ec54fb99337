use crate::domain::{Handle, Post, sort_newest_first};
use crate::ports::PostStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{Error, Result};
use sled::Transactional;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
};
use std::collections::HashSet;
use std::path::Path;

const POSTS_TREE: &str = "posts";
const POSTS_BY_AUTHOR_TREE: &str = "posts_by_author";
const SEPARATOR: u8 = 0;

/// Sled-based persistence for cached posts
///
/// `posts` maps id -> JSON record. `posts_by_author` is the
/// (author_handle, fetched_at) access path used by the freshness query:
/// `handle \0 fetched_at_millis (big endian) \0 id` -> ().
#[derive(Clone)]
pub struct SledPostStore {
    db: sled::Db,
}

impl SledPostStore {
    /// Create a new Sled post store
    /// Creates the parent directory if it doesn't exist
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("Failed to create directory: {}", e)))?;
        }

        let db = sled::open(path)
            .map_err(|e| Error::Storage(format!("Failed to open Sled database: {}", e)))?;

        Ok(Self { db })
    }

    fn posts_tree(&self) -> Result<sled::Tree> {
        self.db
            .open_tree(POSTS_TREE)
            .map_err(|e| Error::Storage(format!("Failed to open posts tree: {}", e)))
    }

    fn index_tree(&self) -> Result<sled::Tree> {
        self.db
            .open_tree(POSTS_BY_AUTHOR_TREE)
            .map_err(|e| Error::Storage(format!("Failed to open index tree: {}", e)))
    }

    /// Look up a single cached record by id, fresh or not
    pub fn get(&self, id: &str) -> Result<Option<Post>> {
        match self
            .posts_tree()?
            .get(id.as_bytes())
            .map_err(|e| Error::Storage(format!("Failed to get post: {}", e)))?
        {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }
}

fn author_prefix(handle: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(handle.len() + 1);
    key.extend_from_slice(handle.as_bytes());
    key.push(SEPARATOR);
    key
}

// Offset so that pre-epoch instants still sort before later ones as bytes
fn millis_key(at: DateTime<Utc>) -> [u8; 8] {
    ((at.timestamp_millis() as u64) ^ (1 << 63)).to_be_bytes()
}

fn index_key(post: &Post) -> Vec<u8> {
    let mut key = author_prefix(&post.author_handle);
    key.extend_from_slice(&millis_key(post.fetched_at));
    key.push(SEPARATOR);
    key.extend_from_slice(post.id.as_bytes());
    key
}

fn decode(bytes: &[u8]) -> Result<Post> {
    serde_json::from_slice(bytes)
        .map_err(|e| Error::Storage(format!("Failed to deserialize post: {}", e)))
}

#[async_trait]
impl PostStore for SledPostStore {
    async fn fresh_posts(&self, handle: &Handle, fresh_since: DateTime<Utc>) -> Result<Vec<Post>> {
        let posts_tree = self.posts_tree()?;
        let index_tree = self.index_tree()?;

        let prefix = author_prefix(handle.as_str());
        let mut start = prefix.clone();
        start.extend_from_slice(&millis_key(fresh_since));

        let mut posts = Vec::new();
        let mut seen = HashSet::new();

        for item in index_tree.range(start..) {
            let (key, _) =
                item.map_err(|e| Error::Storage(format!("Failed to iterate index: {}", e)))?;

            if !key.starts_with(&prefix) {
                break;
            }

            let id = &key[prefix.len() + 8 + 1..];
            if !seen.insert(id.to_vec()) {
                continue;
            }
            let Some(bytes) = posts_tree
                .get(id)
                .map_err(|e| Error::Storage(format!("Failed to get post: {}", e)))?
            else {
                continue;
            };

            let post = decode(&bytes)?;
            // millisecond keys are coarser than the stored timestamps
            if post.is_fresh(fresh_since) {
                posts.push(post);
            }
        }

        sort_newest_first(&mut posts);
        Ok(posts)
    }

    async fn upsert(&self, posts: &[Post]) -> Result<()> {
        let posts_tree = self.posts_tree()?;
        let index_tree = self.index_tree()?;

        let encoded = posts
            .iter()
            .map(|post| {
                serde_json::to_vec(post)
                    .map(|value| (post, value))
                    .map_err(|e| Error::Storage(format!("Failed to serialize post: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        // record and index entry move together
        (&posts_tree, &index_tree)
            .transaction(|(posts_tx, index_tx)| -> ConflictableTransactionResult<(), Error> {
                for (post, value) in &encoded {
                    if let Some(bytes) = posts_tx.get(post.id.as_bytes())? {
                        let previous = decode(&bytes).map_err(ConflictableTransactionError::Abort)?;
                        // an older fetch never replaces a newer one
                        if previous.fetched_at > post.fetched_at {
                            continue;
                        }
                        index_tx.remove(index_key(&previous))?;
                    }

                    posts_tx.insert(post.id.as_bytes(), value.as_slice())?;
                    index_tx.insert(index_key(post), Vec::<u8>::new())?;
                }
                Ok(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => {
                    Error::Storage(format!("Failed to save posts: {}", e))
                }
            })?;

        self.db
            .flush()
            .map_err(|e| Error::Storage(format!("Failed to flush database: {}", e)))?;

        Ok(())
    }
}
