//! Content type resolution for served files
//!
//! Layered fallback chain:
//! - Platform registry guess (host type associations)
//! - Fixed extension table of web-relevant media types
//! - Caller-side default (`text/plain`)

mod resolver;

pub use resolver::{
    hardcoded_mime, MimeGuessPlatform, MimeResolver, NoPlatformGuess, PlatformMimeGuesser,
    DEFAULT_MIME_TYPE,
};
