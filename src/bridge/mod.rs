//! Privileged File Bridge
//!
//! Exposes one configured directory of a higher-privilege filesystem to a
//! sandboxed renderer through a path-request/byte-response protocol.
//!
//! For every request the bridge:
//! 1. Canonicalizes the requested path against the exposed directory
//! 2. Proves containment with a string-prefix test and refuses forbidden
//!    system directories, before any privileged I/O
//! 3. Opens the file through the privileged channel
//! 4. Decompresses `.svgz` transparently
//! 5. Guesses the content type from the requested name
//!
//! Every failure produces the same empty envelope, so the renderer cannot use
//! the bridge as an existence or permission oracle.

mod envelope;
mod error;
mod handler;
mod module;
mod path;

pub use envelope::ResponseEnvelope;
pub use error::ConstructionError;
pub use handler::{BridgeStats, PrivilegedFileBridge};
pub use module::{ModuleError, ModuleWebRoot, MODULES_ROOT};
pub use path::{canonical_child_path, canonical_dir_path, canonicalize_lenient, FORBIDDEN_DATA_DIRS};
