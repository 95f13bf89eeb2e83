use std::{io::ErrorKind, path::Path};

use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{self, AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::debug;

/// Reads the whole file under a shared lock. Missing files are reported as `None`.
pub async fn read_locked(path: &Path) -> Result<Option<String>, io::Error> {
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    file.lock_shared()?;
    let mut content = String::new();
    let result = file.read_to_string(&mut content).await;
    file.unlock_async().await?;
    result?;

    debug!("Read {} bytes from {path:?}", content.len());
    Ok(Some(content))
}

/// Replaces contents of a file under an exclusive lock, so readers never observe a partially
/// written file.
pub async fn overwrite_locked(path: &Path, content: &[u8]) -> Result<(), io::Error> {
    let mut file = File::options()
        .write(true)
        .create(true)
        .read(true)
        .truncate(false)
        .open(path)
        .await?;

    file.lock_exclusive()?;
    let result = overwrite_with_file(&mut file, content).await;
    file.unlock_async().await?;
    result?;

    debug!("Wrote {} bytes into {path:?}", content.len());
    Ok(())
}

async fn overwrite_with_file(file: &mut File, content: &[u8]) -> Result<(), io::Error> {
    // Truncate only while holding the lock.
    file.set_len(0).await?;
    file.rewind().await?;
    file.write_all(content).await?;
    file.flush().await?;
    file.sync_data().await
}
