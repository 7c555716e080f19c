//! In-memory doubles for the system of record and the shared cache backends.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use banner_cache::application::repos::{BannerRepo, RepoError};
use banner_cache::cache::{
    CacheBackends, CacheConfig, CacheRuntime, DistributedStore, FallbackTable, LocalObjectCache,
    TierError,
};
use banner_cache::domain::entities::{BannerRecord, BannerSummary};
use time::OffsetDateTime;

pub fn banner(id: i64, slug: &str) -> BannerRecord {
    BannerRecord {
        id,
        slug: slug.to_string(),
        title: format!("Banner {slug}"),
        content: format!("<p>{slug} content</p>"),
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

/// Banner store that counts every lookup.
#[derive(Default)]
pub struct CountingRepo {
    records: Mutex<BTreeMap<i64, BannerRecord>>,
    slug_calls: AtomicUsize,
    id_calls: AtomicUsize,
}

impl CountingRepo {
    pub fn with(records: impl IntoIterator<Item = BannerRecord>) -> Arc<Self> {
        let repo = Self::default();
        {
            let mut map = repo.records.lock().expect("records lock");
            for record in records {
                map.insert(record.id, record);
            }
        }
        Arc::new(repo)
    }

    pub fn slug_calls(&self) -> usize {
        self.slug_calls.load(Ordering::SeqCst)
    }

    pub fn id_calls(&self) -> usize {
        self.id_calls.load(Ordering::SeqCst)
    }

    pub fn upsert(&self, record: BannerRecord) {
        self.records
            .lock()
            .expect("records lock")
            .insert(record.id, record);
    }

    pub fn remove(&self, id: i64) {
        self.records.lock().expect("records lock").remove(&id);
    }
}

#[async_trait]
impl BannerRepo for CountingRepo {
    async fn get_by_slug(&self, slug: &str) -> Result<Option<BannerRecord>, RepoError> {
        self.slug_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .records
            .lock()
            .expect("records lock")
            .values()
            .find(|record| record.slug == slug)
            .cloned())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<BannerRecord>, RepoError> {
        self.id_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().expect("records lock").get(&id).cloned())
    }

    async fn list_lightweight(&self) -> Result<Vec<BannerSummary>, RepoError> {
        Ok(self
            .records
            .lock()
            .expect("records lock")
            .values()
            .map(|record| BannerSummary {
                id: record.id,
                slug: record.slug.clone(),
            })
            .collect())
    }
}

/// Redis stand-in. `keys` understands a single trailing `*`.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
    gets: AtomicUsize,
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.entries.lock().expect("store lock").len()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.entries
            .lock()
            .expect("store lock")
            .keys()
            .any(|key| key.starts_with(prefix))
    }
}

#[async_trait]
impl DistributedStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TierError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.lock().expect("store lock").get(key).cloned())
    }

    async fn setex(&self, key: &str, _ttl: Duration, value: &[u8]) -> Result<(), TierError> {
        self.entries
            .lock()
            .expect("store lock")
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, TierError> {
        let entries = self.entries.lock().expect("store lock");
        let matched = match pattern.strip_suffix('*') {
            Some(prefix) => entries
                .keys()
                .filter(|key| key.starts_with(prefix))
                .cloned()
                .collect(),
            None => entries.keys().filter(|key| *key == pattern).cloned().collect(),
        };
        Ok(matched)
    }

    async fn del(&self, keys: &[String]) -> Result<(), TierError> {
        let mut entries = self.entries.lock().expect("store lock");
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}

/// Distributed store whose every call fails with `Unavailable`.
#[derive(Default)]
pub struct UnreachableStore {
    calls: AtomicUsize,
}

impl UnreachableStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn refuse<T>(&self) -> Result<T, TierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TierError::unavailable("distributed", "connection refused"))
    }
}

#[async_trait]
impl DistributedStore for UnreachableStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, TierError> {
        self.refuse()
    }

    async fn setex(&self, _key: &str, _ttl: Duration, _value: &[u8]) -> Result<(), TierError> {
        self.refuse()
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, TierError> {
        self.refuse()
    }

    async fn del(&self, _keys: &[String]) -> Result<(), TierError> {
        self.refuse()
    }
}

/// Durable table stand-in with expiry.
#[derive(Default)]
pub struct MemoryTable {
    rows: Mutex<BTreeMap<String, (Vec<u8>, OffsetDateTime)>>,
    gets: AtomicUsize,
}

impl MemoryTable {
    pub fn len(&self) -> usize {
        self.rows.lock().expect("table lock").len()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackTable for MemoryTable {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TierError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock().expect("table lock");
        Ok(rows
            .get(key)
            .filter(|(_, expires_at)| *expires_at > OffsetDateTime::now_utc())
            .map(|(value, _)| value.clone()))
    }

    async fn put(
        &self,
        key: &str,
        value: &[u8],
        expires_at: OffsetDateTime,
    ) -> Result<(), TierError> {
        self.rows
            .lock()
            .expect("table lock")
            .insert(key.to_string(), (value.to_vec(), expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), TierError> {
        self.rows.lock().expect("table lock").remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, TierError> {
        let mut rows = self.rows.lock().expect("table lock");
        let before = rows.len();
        rows.retain(|key, _| !key.starts_with(prefix));
        Ok((before - rows.len()) as u64)
    }
}

pub fn object_cache() -> Arc<LocalObjectCache> {
    Arc::new(LocalObjectCache::new(
        NonZeroUsize::new(64).expect("non-zero limit"),
    ))
}

pub fn runtime(backends: CacheBackends, repo: Arc<CountingRepo>) -> CacheRuntime {
    CacheRuntime::new(backends, repo)
}

pub fn memory_only() -> CacheBackends {
    CacheBackends::new(CacheConfig::default())
}
