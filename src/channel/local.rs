//! Channel backed by the process's own file I/O

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;

use super::{ByteStream, ChannelError, PrivilegedChannel};

/// Opens files with the calling process's own permissions
///
/// Used on development hosts where the webroot is readable without elevation,
/// and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalChannel;

impl LocalChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PrivilegedChannel for LocalChannel {
    async fn open_for_read(&self, path: &Path) -> Result<ByteStream, ChannelError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| map_open_error(path, e))?;

        // Directories open fine on unix but fail on first read
        let metadata = file.metadata().await?;
        if metadata.is_dir() {
            return Err(ChannelError::NotFound {
                path: path.display().to_string(),
            });
        }

        Ok(Box::pin(file))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

fn map_open_error(path: &Path, error: std::io::Error) -> ChannelError {
    match error.kind() {
        ErrorKind::NotFound => ChannelError::NotFound {
            path: path.display().to_string(),
        },
        ErrorKind::PermissionDenied => ChannelError::Denied {
            path: path.display().to_string(),
            reason: error.to_string(),
        },
        _ => ChannelError::Io(error),
    }
}
