use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;
use rand::Rng;

/// Extensions accepted for avatar uploads.
pub const ALLOWED_IMAGE_EXTS: &[&str] = &["jpg", "png"];

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
}

/// Local-disk storage rooted at the configured upload directory.
#[derive(Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub async fn new(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create upload dir {}", root.display()))?;
        Ok(Self { root })
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl StorageClient for DiskStorage {
    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<()> {
        let path = self.resolve(key);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let path = self.resolve(key);
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("remove {}", path.display()))?;
        Ok(())
    }
}

/// Picks a random hex filename keeping the upload's extension.
/// Returns None when the extension is missing or not allow-listed.
pub fn random_image_key(original_filename: &str) -> Option<String> {
    let ext = Path::new(original_filename)
        .extension()
        .and_then(|e| e.to_str())?
        .to_lowercase();
    if !ALLOWED_IMAGE_EXTS.contains(&ext.as_str()) {
        return None;
    }
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill(&mut bytes);
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    Some(format!("{}.{}", hex, ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_image_key_keeps_extension() {
        let key = random_image_key("me.PNG").expect("png is allowed");
        assert!(key.ends_with(".png"));
        assert_eq!(key.len(), "0123456789abcdef.png".len());
    }

    #[test]
    fn random_image_key_rejects_disallowed() {
        assert!(random_image_key("shell.gif").is_none());
        assert!(random_image_key("script.sh").is_none());
        assert!(random_image_key("noext").is_none());
    }

    #[test]
    fn random_image_key_rejects_jpeg_spelling() {
        // The allow-list is exactly {jpg, png}; the long spelling is out.
        assert!(random_image_key("avatar.jpeg").is_none());
        assert!(random_image_key("avatar.JPEG").is_none());
    }

    #[test]
    fn random_image_keys_differ() {
        let a = random_image_key("a.jpg").unwrap();
        let b = random_image_key("a.jpg").unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn disk_storage_put_and_delete() {
        let dir = std::env::temp_dir().join(format!("inkpost-test-{}", uuid::Uuid::new_v4()));
        let storage = DiskStorage::new(&dir).await.expect("create storage");

        storage
            .put_object("ab.png", Bytes::from_static(b"png-bytes"))
            .await
            .expect("put");
        let written = tokio::fs::read(dir.join("ab.png")).await.expect("read back");
        assert_eq!(written, b"png-bytes");

        storage.delete_object("ab.png").await.expect("delete");
        assert!(!dir.join("ab.png").exists());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
