//! Privileged I/O channels
//!
//! The bridge never reads exposed files with its own I/O capability. Bytes are
//! sourced through a [`PrivilegedChannel`], an opaque capability that can open
//! files the calling process itself may not be able to read.
//!
//! Implementations:
//! - [`SuShellChannel`]: one elevated shell per request, streaming `cat`
//! - [`LocalChannel`]: the process's own I/O (development hosts, tests)
//! - [`ExclusiveChannel`]: serializes a shared session so one request's
//!   open-and-stream sequence never interleaves with another's

mod error;
mod exclusive;
mod local;
mod su;

pub use error::ChannelError;
pub use exclusive::ExclusiveChannel;
pub use local::LocalChannel;
pub use su::SuShellChannel;

use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

/// Readable byte stream handed back by a channel
///
/// Dropping the stream closes it and releases the channel resources behind it.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Capability to open files through an elevated execution channel
#[async_trait]
pub trait PrivilegedChannel: Send + Sync {
    /// Open `path` for reading
    ///
    /// `path` is always an absolute, already validated path.
    async fn open_for_read(&self, path: &Path) -> Result<ByteStream, ChannelError>;

    /// Short name used in diagnostics
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<C: PrivilegedChannel + ?Sized> PrivilegedChannel for Arc<C> {
    async fn open_for_read(&self, path: &Path) -> Result<ByteStream, ChannelError> {
        (**self).open_for_read(path).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Which channel implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Elevated shell (`su` by default)
    #[default]
    Su,
    /// The process's own file I/O
    Local,
}

/// Channel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Channel implementation
    #[serde(default)]
    pub kind: ChannelKind,

    /// Elevation program spawning a shell that reads commands from stdin
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments passed to the elevation program
    #[serde(default)]
    pub args: Vec<String>,

    /// Serialize requests through a single exclusive unit of channel usage
    #[serde(default)]
    pub serialize: bool,
}

fn default_program() -> String {
    "su".to_string()
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            kind: ChannelKind::Su,
            program: default_program(),
            args: Vec::new(),
            serialize: false,
        }
    }
}

impl ChannelConfig {
    /// Configuration for the unprivileged local channel
    pub fn local() -> Self {
        Self {
            kind: ChannelKind::Local,
            ..Default::default()
        }
    }
}

/// Build the channel described by `config`
pub fn connect(config: &ChannelConfig) -> Arc<dyn PrivilegedChannel> {
    let channel: Arc<dyn PrivilegedChannel> = match config.kind {
        ChannelKind::Su => Arc::new(SuShellChannel::new(
            config.program.clone(),
            config.args.clone(),
        )),
        ChannelKind::Local => Arc::new(LocalChannel::new()),
    };

    tracing::debug!(
        channel = channel.name(),
        serialize = config.serialize,
        "Privileged channel configured"
    );

    if config.serialize {
        Arc::new(ExclusiveChannel::new(channel))
    } else {
        channel
    }
}
