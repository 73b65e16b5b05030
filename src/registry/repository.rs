//! School repository
//!
//! The relational side of the directory. [`SchoolRepository`] is the seam the
//! registry talks to; [`PgSchoolRepository`] is the PostgreSQL implementation.

use crate::error::Result;
use crate::pool::PoolManager;
use crate::school::{NewSchool, SchoolSummary};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

const CREATE_SCHOOLS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schools (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    city TEXT NOT NULL,
    state TEXT NOT NULL,
    contact TEXT NOT NULL,
    image TEXT NOT NULL DEFAULT '',
    email_id TEXT NOT NULL
)
"#;

const INSERT_SCHOOL: &str = "INSERT INTO schools (name, address, city, state, contact, image, email_id) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id";

const LIST_SCHOOLS: &str = "SELECT id, name, address, city, image FROM schools ORDER BY id DESC";

#[async_trait]
pub trait SchoolRepository: Send + Sync {
    /// Insert a new row and return its generated id. Never updates.
    async fn insert(&self, school: &NewSchool, image: &str) -> Result<i64>;

    /// Every school, newest first.
    async fn list(&self) -> Result<Vec<SchoolSummary>>;

    async fn ping(&self) -> bool;
}

pub struct PgSchoolRepository {
    pool: Arc<PoolManager>,
}

impl PgSchoolRepository {
    pub fn new(pool: Arc<PoolManager>) -> Self {
        Self { pool }
    }

    /// Create the `schools` table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client.batch_execute(CREATE_SCHOOLS_TABLE).await?;
        info!("schools table ready");
        Ok(())
    }
}

#[async_trait]
impl SchoolRepository for PgSchoolRepository {
    async fn insert(&self, school: &NewSchool, image: &str) -> Result<i64> {
        let client = self.pool.get().await?;

        let row = client
            .query_one(
                INSERT_SCHOOL,
                &[
                    &school.name,
                    &school.address,
                    &school.city,
                    &school.state,
                    &school.contact,
                    &image,
                    &school.email_id,
                ],
            )
            .await?;

        let id: i64 = row.try_get(0)?;
        debug!("Inserted school {} as id {}", school.name, id);
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<SchoolSummary>> {
        let client = self.pool.get().await?;
        let rows = client.query(LIST_SCHOOLS, &[]).await?;

        rows.iter()
            .map(|row| -> Result<SchoolSummary> {
                // Rows written by older deployments may carry NULL images
                let image: Option<String> = row.try_get(4)?;
                Ok(SchoolSummary {
                    id: row.try_get(0)?,
                    name: row.try_get(1)?,
                    address: row.try_get(2)?,
                    city: row.try_get(3)?,
                    image: image.unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn ping(&self) -> bool {
        self.pool.ping().await
    }
}
