use async_trait::async_trait;

use crate::Error;

/// An object that can be used to get and put blobs, used to cache downloaded datasets.
#[async_trait]
pub trait BlobStorageProvider: Send + Sync {
    async fn maybe_get(&self, blob_name: &str) -> Result<Option<Vec<u8>>, std::io::Error>;
    async fn put(&self, blob_name: &str, contents: Vec<u8>) -> Result<Vec<u8>, std::io::Error>;
}

/// A [`BlobStorageProvider`] for local disk
pub struct LocalDisk;

#[async_trait]
impl BlobStorageProvider for LocalDisk {
    #[must_use]
    async fn maybe_get(&self, blob_name: &str) -> Result<Option<Vec<u8>>, std::io::Error> {
        if std::path::Path::new(blob_name).try_exists()? {
            Ok(Some(std::fs::read(blob_name)?))
        } else {
            Ok(None)
        }
    }

    #[must_use]
    async fn put(&self, blob_name: &str, contents: Vec<u8>) -> Result<Vec<u8>, std::io::Error> {
        let mut dir: std::path::PathBuf = blob_name.into();
        dir.pop();
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(blob_name, &contents)?;
        Ok(contents)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    ReadFetchWrite,
    ReadFetch,
}

/// Tries to retrive `blob_name` from `provider`. If it does not exist,
/// it calls `fetch` and writes the result into `provider` (unless `action` is [`CacheAction::ReadFetch`]).
/// # Implementation
/// This function is idempotent but not pure.
pub async fn cached<F, P>(
    blob_name: &str,
    fetch: F,
    provider: &P,
    action: CacheAction,
) -> Result<Vec<u8>, Error>
where
    F: futures::Future<Output = Result<Vec<u8>, Error>>,
    P: BlobStorageProvider + ?Sized,
{
    log::info!("Fetch {blob_name}");
    if let Some(data) = provider.maybe_get(blob_name).await? {
        log::info!("{blob_name} - cache hit");
        Ok(data)
    } else {
        log::info!("{blob_name} - cache miss");
        let contents = fetch.await?;
        if action == CacheAction::ReadFetch {
            log::info!("{blob_name} - cache do not write");
            return Ok(contents);
        };
        let data = provider.put(blob_name, contents).await?;
        log::info!("{blob_name} - cache write");
        Ok(data)
    }
}
