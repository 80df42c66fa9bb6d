//! MIME resolver implementation

use std::path::Path;
use std::sync::Arc;

/// Default value used as content type when guessing fails
pub const DEFAULT_MIME_TYPE: &str = "text/plain";

/// Host-provided name → content type guesser
///
/// Consulted before the built-in table because it reflects the host's own
/// registered type associations.
pub trait PlatformMimeGuesser: Send + Sync {
    /// Guess a content type from a file name, `None` when unknown
    fn guess(&self, file_name: &str) -> Option<String>;
}

/// Platform guesser backed by the `mime_guess` registry
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeGuessPlatform;

impl PlatformMimeGuesser for MimeGuessPlatform {
    fn guess(&self, file_name: &str) -> Option<String> {
        mime_guess::from_path(Path::new(file_name))
            .first_raw()
            .filter(|mime| !mime.is_empty())
            .map(str::to_string)
    }
}

/// Platform guesser that never answers, leaving only the built-in table
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlatformGuess;

impl PlatformMimeGuesser for NoPlatformGuess {
    fn guess(&self, _file_name: &str) -> Option<String> {
        None
    }
}

/// Maps file names to content types
#[derive(Clone)]
pub struct MimeResolver {
    platform: Arc<dyn PlatformMimeGuesser>,
}

impl Default for MimeResolver {
    fn default() -> Self {
        Self::with_platform(MimeGuessPlatform)
    }
}

impl std::fmt::Debug for MimeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MimeResolver").finish_non_exhaustive()
    }
}

impl MimeResolver {
    /// Create a resolver with the default platform guesser
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver consulting the given platform guesser first
    pub fn with_platform(platform: impl PlatformMimeGuesser + 'static) -> Self {
        Self {
            platform: Arc::new(platform),
        }
    }

    /// Resolve a content type for `file_name`
    ///
    /// Returns `None` when neither the platform nor the built-in table knows
    /// the name. Unknown input is never an error.
    pub fn resolve(&self, file_name: &str) -> Option<String> {
        if let Some(mime) = self.platform.guess(file_name) {
            if !mime.is_empty() {
                return Some(mime);
            }
        }

        hardcoded_mime(file_name).map(str::to_string)
    }

    /// Resolve a content type, falling back to [`DEFAULT_MIME_TYPE`]
    pub fn resolve_or_default(&self, file_name: &str) -> String {
        self.resolve(file_name)
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
    }
}

/// Look up the extension after the last `.` in the built-in table
///
/// Kept in sync with the list browsers ship for web content; types with no
/// meaning for a webroot are left out.
pub fn hardcoded_mime(file_name: &str) -> Option<&'static str> {
    let final_full_stop = file_name.rfind('.')?;
    let extension = file_name[final_full_stop + 1..].to_ascii_lowercase();

    let mime = match extension.as_str() {
        "webm" => "video/webm",
        "mpeg" | "mpg" => "video/mpeg",
        "mp3" => "audio/mpeg",
        "wasm" => "application/wasm",
        "xhtml" | "xht" | "xhtm" => "application/xhtml+xml",
        "flac" => "audio/flac",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "wav" => "audio/wav",
        "m4a" => "audio/x-m4a",
        "gif" => "image/gif",
        "jpeg" | "jpg" | "jfif" | "pjpeg" | "pjp" => "image/jpeg",
        "png" => "image/png",
        "apng" => "image/apng",
        "svg" | "svgz" => "image/svg+xml",
        "webp" => "image/webp",
        "mht" | "mhtml" => "multipart/related",
        "css" => "text/css",
        "html" | "htm" | "shtml" | "shtm" | "ehtml" => "text/html",
        "js" | "mjs" => "application/javascript",
        "xml" => "text/xml",
        "mp4" | "m4v" => "video/mp4",
        "ogv" | "ogm" => "video/ogg",
        "ico" => "image/x-icon",
        "woff" => "application/font-woff",
        "gz" | "tgz" => "application/gzip",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "bmp" => "image/bmp",
        "tiff" | "tif" => "image/tiff",
        _ => return None,
    };

    Some(mime)
}
