//! Product image storage
//!
//! Images are written by [`ImageStore`]. The bundled [`LocalImageStore`] keeps
//! them in a directory that the router serves under `/uploads`.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rand::{distr::Alphanumeric, Rng};
use tracing::debug;

use crate::model::ProductImage;

/// URL prefix the upload directory is served from
pub const UPLOADS_ROUTE: &str = "/uploads";

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persists an image and returns its public URL and deletion handle
    async fn store(&self, file_name: &str, bytes: &[u8]) -> io::Result<ProductImage>;

    async fn delete(&self, public_id: &str) -> io::Result<()>;
}

pub struct LocalImageStore {
    dir: PathBuf,
    public_url: String,
}

impl LocalImageStore {
    /// Creates the directory if needed. `public_url` is the server's own base
    /// URL, without trailing slash.
    pub fn new(dir: impl Into<PathBuf>, public_url: &str) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> io::Result<ProductImage> {
        let public_id = public_id_for(file_name);
        tokio::fs::write(self.dir.join(&public_id), bytes).await?;
        debug!(%public_id, size = bytes.len(), "image stored");

        Ok(ProductImage {
            url: format!("{}{}/{}", self.public_url, UPLOADS_ROUTE, public_id),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> io::Result<()> {
        if !is_safe_id(public_id) {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid image id"));
        }
        tokio::fs::remove_file(self.dir.join(public_id)).await
    }
}

/// Random file name keeping the original extension, e.g. `k3J9xQ2mPz7a.png`
fn public_id_for(file_name: &str) -> String {
    let stem: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();

    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase);

    match extension {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

/// Ids are plain file names; anything that could escape the directory is refused
fn is_safe_id(public_id: &str) -> bool {
    !public_id.is_empty()
        && public_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
        && !public_id.starts_with('.')
}
