//! Serialized use of a shared privileged session

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{ByteStream, ChannelError, PrivilegedChannel};

/// Wraps a channel whose session processes one command at a time
///
/// The exclusive permit is taken before the open command is issued and lives
/// inside the returned stream, so a file's open-and-stream sequence is one
/// atomic unit of channel usage. Dropping the stream releases the permit.
pub struct ExclusiveChannel<C> {
    inner: C,
    permit: Arc<Mutex<()>>,
}

impl<C: PrivilegedChannel> ExclusiveChannel<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            permit: Arc::new(Mutex::new(())),
        }
    }

    /// Access the wrapped channel
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: PrivilegedChannel> PrivilegedChannel for ExclusiveChannel<C> {
    async fn open_for_read(&self, path: &Path) -> Result<ByteStream, ChannelError> {
        let guard = Arc::clone(&self.permit).lock_owned().await;
        let stream = self.inner.open_for_read(path).await?;

        Ok(Box::pin(GuardedStream {
            stream,
            _guard: guard,
        }))
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Stream holding the session permit until dropped
struct GuardedStream {
    stream: ByteStream,
    _guard: OwnedMutexGuard<()>,
}

impl AsyncRead for GuardedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.get_mut().stream.as_mut().poll_read(cx, buf)
    }
}
