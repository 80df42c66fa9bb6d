//! Privileged file bridge implementation

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_compression::tokio::bufread::GzipDecoder;
use tokio::io::BufReader;

use super::envelope::ResponseEnvelope;
use super::error::ConstructionError;
use super::path::{absolute_lexical, canonical_child_path, canonical_dir_path, forbidden_prefix};
use crate::channel::{ByteStream, PrivilegedChannel};
use crate::mime::MimeResolver;

/// Serves files under one directory through a privileged channel
///
/// To avoid leaking data to the renderer, choose the directory carefully and
/// assume any file under it can be read by any page the renderer loads.
///
/// ```ignore
/// let channel = channel::connect(&ChannelConfig::default());
/// let bridge = PrivilegedFileBridge::new("/data/adb/modules/demo/webroot", channel)?;
/// let envelope = bridge.handle("index.html").await;
/// ```
pub struct PrivilegedFileBridge {
    /// Canonical exposed directory, always ending with a separator
    directory: String,
    channel: Arc<dyn PrivilegedChannel>,
    mime: MimeResolver,
    stats: Arc<BridgeCounters>,
}

impl std::fmt::Debug for PrivilegedFileBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivilegedFileBridge")
            .field("directory", &self.directory)
            .field("channel", &self.channel.name())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct BridgeCounters {
    served: AtomicU64,
    rejected: AtomicU64,
    missing: AtomicU64,
}

/// Request counters, for diagnostics only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeStats {
    /// Requests answered with a stream
    pub served: u64,
    /// Requests that failed resolution or containment
    pub rejected: u64,
    /// Contained requests the channel could not open
    pub missing: u64,
}

impl PrivilegedFileBridge {
    /// Create a bridge exposing `directory`
    ///
    /// # Errors
    ///
    /// - [`ConstructionError::ForbiddenDirectory`] if the directory is, or is
    ///   nested under, a forbidden prefix (whether or not it exists)
    /// - [`ConstructionError::UnresolvablePath`] if the canonical path cannot
    ///   be determined
    pub fn new(
        directory: impl AsRef<Path>,
        channel: Arc<dyn PrivilegedChannel>,
    ) -> Result<Self, ConstructionError> {
        let directory = directory.as_ref();
        let unresolvable = |source| ConstructionError::UnresolvablePath {
            path: directory.to_path_buf(),
            source,
        };

        // Checked lexically first so a forbidden directory is refused even
        // when it cannot be resolved.
        let lexical = absolute_lexical(directory).map_err(unresolvable)?;
        check_allowed(directory, &lexical.to_string_lossy())?;

        let canonical = canonical_dir_path(directory).map_err(unresolvable)?;
        check_allowed(directory, &canonical)?;

        tracing::info!(
            directory = %canonical,
            channel = channel.name(),
            "Privileged file bridge ready"
        );

        Ok(Self {
            directory: canonical,
            channel,
            mime: MimeResolver::default(),
            stats: Arc::new(BridgeCounters::default()),
        })
    }

    /// Replace the MIME resolver
    pub fn with_mime_resolver(mut self, mime: MimeResolver) -> Self {
        self.mime = mime;
        self
    }

    /// Canonical exposed directory, ending with a separator
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// Snapshot of the request counters
    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            served: self.stats.served.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
            missing: self.stats.missing.load(Ordering::Relaxed),
        }
    }

    /// Open the requested file from the exposed directory
    ///
    /// `path` is the suffix path relative to the exposed directory. Escaping,
    /// missing and unreadable files all produce
    /// [`ResponseEnvelope::not_found`]; nothing about the cause reaches the
    /// caller. The content type is guessed from the requested name, falling
    /// back to `text/plain`.
    pub async fn handle(&self, path: &str) -> ResponseEnvelope {
        let resolved = match self.resolve(path).await {
            Some(resolved) => resolved,
            None => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                return ResponseEnvelope::not_found();
            }
        };

        // Containment has been proven above; only now may the channel be used.
        let stream = match self.channel.open_for_read(&resolved).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::debug!(
                    path = %path,
                    channel = self.channel.name(),
                    "Error opening the requested path: {}",
                    e
                );
                self.stats.missing.fetch_add(1, Ordering::Relaxed);
                return ResponseEnvelope::not_found();
            }
        };

        let stream = decompress_if_needed(&resolved, stream);
        let content_type = self.mime.resolve_or_default(path);

        tracing::trace!(path = %path, content_type = %content_type, "Serving file");
        self.stats.served.fetch_add(1, Ordering::Relaxed);

        ResponseEnvelope::found(content_type, stream)
    }

    /// Canonicalize `path` under the exposed directory on the blocking pool
    ///
    /// Paths that leave the directory, or resolve under a forbidden prefix,
    /// yield `None`.
    async fn resolve(&self, path: &str) -> Option<PathBuf> {
        let directory = self.directory.clone();
        let child = path.to_string();

        let result =
            tokio::task::spawn_blocking(move || canonical_child_path(&directory, &child)).await;

        match result {
            Ok(Ok(Some(resolved))) => {
                // A base above a forbidden root, or a symlink the process
                // cannot follow, can still land inside one.
                match resolved.to_str().and_then(forbidden_prefix) {
                    Some(prefix) => {
                        tracing::warn!(
                            "The requested file: {} resolves under the forbidden directory: {}",
                            path,
                            prefix
                        );
                        None
                    }
                    None => Some(resolved),
                }
            }
            Ok(Ok(None)) => {
                tracing::warn!(
                    "The requested file: {} is outside the mounted directory: {}",
                    path,
                    self.directory
                );
                None
            }
            Ok(Err(e)) => {
                tracing::warn!("Error resolving the requested path: {}: {}", path, e);
                None
            }
            Err(e) => {
                tracing::error!("Path resolution task failed: {}", e);
                None
            }
        }
    }
}

fn check_allowed(directory: &Path, candidate: &str) -> Result<(), ConstructionError> {
    match forbidden_prefix(candidate) {
        Some(prefix) => Err(ConstructionError::ForbiddenDirectory {
            path: directory.to_path_buf(),
            prefix,
        }),
        None => Ok(()),
    }
}

/// Wrap `.svgz` files in a transparent gzip decoder
fn decompress_if_needed(resolved: &Path, stream: ByteStream) -> ByteStream {
    if is_svgz(resolved) {
        let mut decoder = GzipDecoder::new(BufReader::new(stream));
        decoder.multiple_members(true);
        Box::pin(decoder)
    } else {
        stream
    }
}

/// Exact, case-sensitive `.svgz` suffix of the resolved path
fn is_svgz(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "svgz")
}
