//! The external member store.
//!
//! The registry never owns member storage. It talks to a remote store
//! through [`MemberStore`], a three-call contract:
//!
//! | Call | Returns |
//! |------|---------|
//! | [`MemberStore::submit_one`] | id of the new member |
//! | [`MemberStore::submit_batch`] | number of members added |
//! | [`MemberStore::list_all`] | every stored member, once each, in no particular order |
//!
//! Implementations:
//! - [`HttpStore`] - JSON over HTTP to a remote service
//! - [`InMemoryStore`] - process-local store for development and tests

pub mod http;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{MemberId, MemberRecord, StoredMember};

pub use http::HttpStore;

/// Contract of the remote member store.
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// Add one member.
    async fn submit_one(&self, record: &MemberRecord) -> StoreResult<MemberId>;

    /// Add many members in a single call.
    async fn submit_batch(&self, records: &[MemberRecord]) -> StoreResult<u64>;

    /// Every stored member.
    async fn list_all(&self) -> StoreResult<Vec<StoredMember>>;
}

/// In-process store.
///
/// Enforces unique membership numbers and treats a batch as all-or-nothing.
/// Can be switched offline to exercise failure paths.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    members: Mutex<Vec<StoredMember>>,
    offline: AtomicBool,
    batch_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with records.
    pub fn with_records(records: impl IntoIterator<Item = MemberRecord>) -> Self {
        let members = records
            .into_iter()
            .map(|record| StoredMember { id: Uuid::new_v4().to_string(), record })
            .collect();
        Self {
            members: Mutex::new(members),
            ..Self::default()
        }
    }

    /// While offline every call fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `submit_batch` calls received (including failed ones).
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.members.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MemberStore for InMemoryStore {
    async fn submit_one(&self, record: &MemberRecord) -> StoreResult<MemberId> {
        self.check_online()?;
        let mut members = self.members.lock().await;
        if members
            .iter()
            .any(|m| m.record.membership_number == record.membership_number)
        {
            return Err(StoreError::DuplicateMembershipNumber(
                record.membership_number.clone(),
            ));
        }
        let id = Uuid::new_v4().to_string();
        members.push(StoredMember { id: id.clone(), record: record.clone() });
        Ok(id)
    }

    async fn submit_batch(&self, records: &[MemberRecord]) -> StoreResult<u64> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let mut members = self.members.lock().await;

        let mut seen: HashSet<&str> = members
            .iter()
            .map(|m| m.record.membership_number.as_str())
            .collect();
        for record in records {
            if !seen.insert(record.membership_number.as_str()) {
                return Err(StoreError::DuplicateMembershipNumber(
                    record.membership_number.clone(),
                ));
            }
        }

        members.extend(records.iter().map(|record| StoredMember {
            id: Uuid::new_v4().to_string(),
            record: record.clone(),
        }));
        Ok(records.len() as u64)
    }

    async fn list_all(&self) -> StoreResult<Vec<StoredMember>> {
        self.check_online()?;
        Ok(self.members.lock().await.clone())
    }
}
