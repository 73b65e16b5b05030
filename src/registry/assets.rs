//! Asset Store
//!
//! Stores uploaded school images under the public upload directory.
//!
//! An upload is streamed into a staging file first ([`PendingAsset`]).
//! Staging files live in a sibling directory `{root}.staging/`, outside the
//! tree served under the public prefix, and are removed when dropped, so a
//! rejected or abandoned upload never becomes visible. The sibling keeps
//! staging on the same filesystem as the root, which the final rename needs.
//! [`AssetStore::commit`] syncs the staged bytes and renames them to a unique
//! public name.

use crate::error::{GatewayError, Result};
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const STAGING_SUFFIX: &str = ".staging";
const MAX_STEM_CHARS: usize = 64;
const MAX_EXTENSION_CHARS: usize = 10;
const MAX_NAME_ATTEMPTS: usize = 5;

/// A committed image.
#[derive(Debug, Clone)]
pub struct StoredAsset {
    pub file_name: String,
    pub path: PathBuf,
    /// Path clients use to fetch the image, e.g. `/schoolImages/lotus-....png`.
    pub public_path: String,
}

/// An image being received. Dropping it discards the staged bytes.
#[derive(Debug)]
pub struct PendingAsset {
    file: File,
    temp_path: TempPath,
    original_name: String,
    content_type: String,
    size: u64,
    max_bytes: u64,
}

impl PendingAsset {
    /// Append one chunk, failing as soon as the image grows past the cap.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let size = self.size + chunk.len() as u64;
        if size > self.max_bytes {
            return Err(GatewayError::PayloadTooLarge {
                message: format!("File size must be less than {}", describe_size(self.max_bytes)),
            });
        }

        self.file.write_all(chunk).await?;
        self.size = size;
        Ok(())
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

/// Content store rooted at the public upload directory.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
    staging: PathBuf,
    url_prefix: String,
    max_bytes: u64,
}

impl AssetStore {
    pub fn new(root: &Path, url_prefix: &str, max_bytes: u64) -> Self {
        Self {
            root: root.to_path_buf(),
            staging: staging_dir_for(root),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    /// Create the upload and staging directories if they are missing.
    pub async fn ensure_root(&self) -> Result<()> {
        for dir in [&self.root, &self.staging] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| GatewayError::AssetWriteFailed {
                    cause: format!("Failed to create upload directory {}: {}", dir.display(), e),
                })?;
        }
        Ok(())
    }

    /// Open a staging file for a new upload.
    pub async fn begin(&self, original_name: &str, content_type: &str) -> Result<PendingAsset> {
        self.ensure_root().await?;

        let temp = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(&self.staging)?;
        let (file, temp_path) = temp.into_parts();

        debug!(
            "Staging upload '{}' ({}) at {}",
            original_name,
            content_type,
            temp_path.display()
        );

        Ok(PendingAsset {
            file: File::from_std(file),
            temp_path,
            original_name: original_name.to_string(),
            content_type: content_type.to_string(),
            size: 0,
            max_bytes: self.max_bytes,
        })
    }

    /// Make a staged upload durable and move it to a unique public name.
    ///
    /// Returns only after the bytes are synced to disk, so the returned
    /// path can be referenced from the database right away.
    pub async fn commit(&self, pending: PendingAsset) -> Result<StoredAsset> {
        let PendingAsset {
            mut file,
            mut temp_path,
            original_name,
            content_type,
            size,
            ..
        } = pending;

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        self.ensure_root().await?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let file_name = unique_file_name(&original_name, &content_type);
            let target = self.root.join(&file_name);

            match temp_path.persist_noclobber(&target) {
                Ok(()) => {
                    sync_dir(&self.root).await;
                    info!("Stored image {} ({} bytes)", target.display(), size);
                    return Ok(StoredAsset {
                        public_path: format!("{}/{}", self.url_prefix, file_name),
                        file_name,
                        path: target,
                    });
                }
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    debug!("Upload name {} already taken, retrying", file_name);
                    temp_path = e.path;
                }
                Err(e) => return Err(e.error.into()),
            }
        }

        Err(GatewayError::AssetWriteFailed {
            cause: format!(
                "Could not find a free file name for '{}' after {} attempts",
                original_name, MAX_NAME_ATTEMPTS
            ),
        })
    }

    /// Resolve a public image path back to the file it names.
    #[cfg(test)]
    pub(crate) fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let file_name = public_path
            .strip_prefix(&self.url_prefix)?
            .strip_prefix('/')?;
        if file_name.is_empty() || file_name.contains('/') || file_name.contains("..") {
            return None;
        }
        Some(self.root.join(file_name))
    }
}

/// `./public/schoolImages` stages into `./public/schoolImages.staging`.
fn staging_dir_for(root: &Path) -> PathBuf {
    let mut name = root
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "uploads".into());
    name.push(STAGING_SUFFIX);
    root.with_file_name(name)
}

/// Human readable size limit: whole MB or KB when exact, bytes otherwise.
fn describe_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Best effort: persist the rename itself.
#[cfg(unix)]
async fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir).await {
        if let Err(e) = handle.sync_all().await {
            debug!("Directory sync failed for {}: {}", dir.display(), e);
        }
    }
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) {}

fn unique_file_name(original_name: &str, content_type: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S%3f").to_string();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    build_file_name(original_name, content_type, &timestamp, &suffix[..8])
}

/// `{stem}-{timestamp}-{suffix}.{ext}` built from the client's filename.
///
/// The stem is reduced to lowercase ASCII alphanumerics, '-' and '_'. The
/// extension is kept from the original name, or derived from the content
/// type when the original has none.
fn build_file_name(original_name: &str, content_type: &str, timestamp: &str, suffix: &str) -> String {
    // Some browsers send a full client-side path
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);

    let (stem, extension) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (base, None),
    };

    let mut stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .take(MAX_STEM_CHARS)
        .collect();
    stem = stem.trim_matches('-').to_string();
    if stem.is_empty() {
        stem = "image".to_string();
    }

    let extension = extension
        .map(|ext| {
            ext.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .take(MAX_EXTENSION_CHARS)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|ext| !ext.is_empty())
        .or_else(|| extension_for(content_type).map(str::to_string));

    match extension {
        Some(ext) => format!("{}-{}-{}.{}", stem, timestamp, suffix, ext),
        None => format!("{}-{}-{}", stem, timestamp, suffix),
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type.split(';').next().unwrap_or("").trim() {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> AssetStore {
        AssetStore::new(&dir.path().join("schoolImages"), "/schoolImages", 1024)
    }

    fn public_files(store: &AssetStore) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(store.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_build_file_name_keeps_extension() {
        assert_eq!(
            build_file_name("Lotus Campus.PNG", "image/png", "20260101120000000", "ab12cd34"),
            "lotus-campus-20260101120000000-ab12cd34.png"
        );
    }

    #[test]
    fn test_build_file_name_strips_client_path() {
        assert_eq!(
            build_file_name(r"C:\Users\me\..\photo.jpeg", "image/jpeg", "1", "x"),
            "photo-1-x.jpeg"
        );
        assert_eq!(build_file_name("../../etc/passwd.gif", "image/gif", "1", "x"), "passwd-1-x.gif");
    }

    #[test]
    fn test_build_file_name_falls_back_to_content_type() {
        assert_eq!(build_file_name("campus", "image/webp", "1", "x"), "campus-1-x.webp");
        assert_eq!(build_file_name(".png", "image/jpeg", "1", "x"), "png-1-x.jpg");
        assert_eq!(build_file_name("", "image/gif", "1", "x"), "image-1-x.gif");
        assert_eq!(build_file_name("日本.png", "image/png", "1", "x"), "image-1-x.png");
    }

    #[tokio::test]
    async fn test_root_created_lazily() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(!store.root().exists());

        store.ensure_root().await.unwrap();
        assert!(store.root().is_dir());
    }

    #[tokio::test]
    async fn test_commit_writes_file_under_public_path() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut pending = store.begin("campus.png", "image/png").await.unwrap();
        pending.write_chunk(b"\x89PNG").await.unwrap();
        pending.write_chunk(b"rest").await.unwrap();
        assert_eq!(pending.size(), 8);

        let stored = store.commit(pending).await.unwrap();
        assert!(stored.public_path.starts_with("/schoolImages/campus-"));
        assert!(stored.public_path.ends_with(".png"));
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"\x89PNGrest");
        assert_eq!(store.resolve(&stored.public_path), Some(stored.path.clone()));
        assert_eq!(public_files(&store), vec![stored.file_name]);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected_and_discarded() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut pending = store.begin("big.png", "image/png").await.unwrap();
        pending.write_chunk(&[0u8; 1000]).await.unwrap();
        let err = pending.write_chunk(&[0u8; 25]).await.unwrap_err();
        match err {
            GatewayError::PayloadTooLarge { message } => {
                assert_eq!(message, "File size must be less than 1KB")
            }
            other => panic!("expected PayloadTooLarge, got {:?}", other),
        }
        assert_eq!(pending.size(), 1000);

        drop(pending);
        assert!(public_files(&store).is_empty());
        assert_eq!(std::fs::read_dir(store.staging_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_same_original_name_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut first = store.begin("logo.png", "image/png").await.unwrap();
        first.write_chunk(b"first").await.unwrap();
        let mut second = store.begin("logo.png", "image/png").await.unwrap();
        second.write_chunk(b"second").await.unwrap();

        let (a, b) = tokio::join!(store.commit(first), store.commit(second));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.file_name, b.file_name);
        assert_eq!(std::fs::read(&a.path).unwrap(), b"first");
        assert_eq!(std::fs::read(&b.path).unwrap(), b"second");
        assert_eq!(public_files(&store).len(), 2);
    }

    #[test]
    fn test_size_limit_message() {
        assert_eq!(describe_size(5 * 1024 * 1024), "5MB");
        assert_eq!(describe_size(512 * 1024), "512KB");
        assert_eq!(describe_size(1000), "1000 bytes");
        assert_eq!(describe_size(1024 * 1024 + 1), "1048577 bytes");
    }

    #[test]
    fn test_staging_is_outside_public_root() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert_eq!(store.staging_dir(), dir.path().join("schoolImages.staging"));
        assert!(!store.staging_dir().starts_with(store.root()));
        assert_eq!(
            staging_dir_for(Path::new("./public/schoolImages/")),
            Path::new("./public/schoolImages.staging")
        );
    }

    #[tokio::test]
    async fn test_staged_upload_lives_outside_public_root() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut pending = store.begin("campus.png", "image/png").await.unwrap();
        pending.write_chunk(b"unvalidated").await.unwrap();

        assert!(public_files(&store).is_empty());
        assert_eq!(std::fs::read_dir(store.staging_dir()).unwrap().count(), 1);
        assert!(walk(store.root()).is_empty());
    }

    fn walk(dir: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(dir).unwrap().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                found.extend(walk(&path));
            } else {
                found.push(path);
            }
        }
        found
    }

    #[test]
    fn test_resolve_rejects_foreign_paths() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert_eq!(store.resolve(""), None);
        assert_eq!(store.resolve("/other/a.png"), None);
        assert_eq!(store.resolve("/schoolImages/../secret"), None);
        assert_eq!(store.resolve("/schoolImages/"), None);
    }
}
