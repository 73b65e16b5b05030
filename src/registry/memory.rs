//! In-memory repository for tests.

use super::assets::AssetStore;
use super::repository::SchoolRepository;
use crate::error::{GatewayError, Result};
use crate::school::{NewSchool, SchoolSummary};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct StoredRow {
    pub id: i64,
    pub school: NewSchool,
    pub image: String,
    /// Whether `image` already resolved to a file when the row was inserted.
    pub image_present_at_insert: bool,
}

#[derive(Default)]
struct Rows {
    next_id: i64,
    rows: Vec<StoredRow>,
}

pub struct MemoryRepository {
    rows: Mutex<Rows>,
    assets: Option<AssetStore>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Rows::default()),
            assets: None,
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Check image paths against `assets` on every insert.
    pub fn with_assets(assets: AssetStore) -> Self {
        Self {
            assets: Some(assets),
            ..Self::new()
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<StoredRow> {
        self.rows.lock().unwrap().rows.clone()
    }
}

#[async_trait]
impl SchoolRepository for MemoryRepository {
    async fn insert(&self, school: &NewSchool, image: &str) -> Result<i64> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GatewayError::QueryFailed {
                cause: "connection reset by peer".to_string(),
            });
        }

        let image_present_at_insert = match (&self.assets, image.is_empty()) {
            (_, true) => false,
            (Some(assets), false) => assets.resolve(image).is_some_and(|p| p.is_file()),
            (None, false) => false,
        };

        let mut rows = self.rows.lock().unwrap();
        rows.next_id += 1;
        let id = rows.next_id;
        rows.rows.push(StoredRow {
            id,
            school: school.clone(),
            image: image.to_string(),
            image_present_at_insert,
        });
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<SchoolSummary>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(GatewayError::QueryFailed {
                cause: "relation \"schools\" does not exist".to_string(),
            });
        }

        let rows = self.rows.lock().unwrap();
        let mut schools: Vec<SchoolSummary> = rows
            .rows
            .iter()
            .map(|row| SchoolSummary {
                id: row.id,
                name: row.school.name.clone(),
                address: row.school.address.clone(),
                city: row.school.city.clone(),
                image: row.image.clone(),
            })
            .collect();
        schools.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(schools)
    }

    async fn ping(&self) -> bool {
        !self.fail_reads.load(Ordering::SeqCst)
    }
}
