//! School Registry
//!
//! Turns a validated school and an optional staged image into one stored
//! record. The image is committed and synced before the row referencing it is
//! inserted, so a listed school never points at a missing file.
//!
//! The two writes are not one transaction. If the insert fails after the image
//! was committed, the image stays on disk unreferenced and is logged.

use super::assets::{AssetStore, PendingAsset};
use super::repository::SchoolRepository;
use crate::error::Result;
use crate::school::{NewSchool, SchoolSummary};
use std::sync::Arc;
use tracing::{info, warn};

pub struct SchoolRegistry {
    repository: Arc<dyn SchoolRepository>,
    assets: AssetStore,
}

impl SchoolRegistry {
    pub fn new(repository: Arc<dyn SchoolRepository>, assets: AssetStore) -> Self {
        Self { repository, assets }
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    /// Store `school` and its image, returning the new id.
    pub async fn register(&self, school: NewSchool, image: Option<PendingAsset>) -> Result<i64> {
        let stored = match image {
            Some(pending) => Some(self.assets.commit(pending).await?),
            None => None,
        };
        let image_path = stored
            .as_ref()
            .map(|asset| asset.public_path.as_str())
            .unwrap_or("");

        match self.repository.insert(&school, image_path).await {
            Ok(id) => {
                info!(
                    "Registered school '{}' as id {} (image: {})",
                    school.name,
                    id,
                    if image_path.is_empty() { "none" } else { image_path }
                );
                Ok(id)
            }
            Err(e) => {
                if let Some(asset) = &stored {
                    warn!(
                        "Insert failed after storing {}; image left orphaned",
                        asset.path.display()
                    );
                }
                Err(e)
            }
        }
    }

    pub async fn list(&self) -> Result<Vec<SchoolSummary>> {
        self.repository.list().await
    }

    pub async fn database_connected(&self) -> bool {
        self.repository.ping().await
    }
}
