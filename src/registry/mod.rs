//! School Registry
//!
//! Persists schools: images go to the asset store on disk, rows go to
//! PostgreSQL.
//!
//! Directory structure:
//! ```text
//! {upload_dir}/                               # served under the public prefix
//!   ├── lotus-high-20260101120000000-ab12cd34.png
//!   └── ...
//! {upload_dir}.staging/                        # uploads still being received
//! ```

mod assets;
#[cfg(test)]
pub(crate) mod memory;
mod repository;
mod schools;

pub use assets::{AssetStore, PendingAsset, StoredAsset};
pub use repository::{PgSchoolRepository, SchoolRepository};
pub use schools::SchoolRegistry;
