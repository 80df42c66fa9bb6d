//! Installed module webroots
//!
//! A module lives in `<modules root>/<id>`. Its web UI is `webroot/index.html`,
//! and the manager leaves empty marker files next to it: `disable` while the
//! module is turned off, `remove` and `update` until the next reboot applies
//! the pending change. A module is only served while none of the markers exist.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::channel::{ChannelError, PrivilegedChannel};

/// Root of installed modules
pub const MODULES_ROOT: &str = "/data/adb/modules";

const WEBROOT_DIR: &str = "webroot";
const ENTRY_FILE: &str = "index.html";
const DISABLE_MARKER: &str = "disable";
const REMOVE_MARKER: &str = "remove";
const UPDATE_MARKER: &str = "update";

/// Reasons a module webroot cannot be served
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Invalid module id: {0:?}")]
    InvalidId(String),

    #[error("Module '{id}' is disabled")]
    Disabled { id: String },

    #[error("Module '{id}' will be removed on the next reboot")]
    PendingRemoval { id: String },

    #[error("Module '{id}' has an update waiting for the next reboot")]
    PendingUpdate { id: String },

    #[error("Module '{id}' has no web UI: '{}' is missing", .entry.display())]
    NoWebUi { id: String, entry: PathBuf },

    #[error("Cannot inspect module '{id}': {source}")]
    Inspection {
        id: String,
        #[source]
        source: ChannelError,
    },
}

impl ModuleError {
    /// Check if the module exists but is not in a servable state
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ModuleError::Disabled { .. }
                | ModuleError::PendingRemoval { .. }
                | ModuleError::PendingUpdate { .. }
        )
    }
}

/// One installed module and the directory holding it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleWebRoot {
    id: String,
    module_dir: PathBuf,
}

impl ModuleWebRoot {
    /// Module `id` under [`MODULES_ROOT`]
    pub fn new(id: impl Into<String>) -> Result<Self, ModuleError> {
        Self::under(MODULES_ROOT, id)
    }

    /// Module `id` under `modules_root`
    ///
    /// Ids name a single directory, so separators, `.`, `..` and NUL are
    /// refused.
    pub fn under(
        modules_root: impl AsRef<Path>,
        id: impl Into<String>,
    ) -> Result<Self, ModuleError> {
        let id = id.into();
        if id.is_empty() || id == "." || id == ".." || id.contains('/') || id.contains('\0') {
            return Err(ModuleError::InvalidId(id));
        }

        let module_dir = modules_root.as_ref().join(&id);
        Ok(Self { id, module_dir })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Directory the bridge should expose
    pub fn webroot(&self) -> PathBuf {
        self.module_dir.join(WEBROOT_DIR)
    }

    /// Confirm the module is enabled, settled and ships a web UI
    ///
    /// The markers live in the module directory, which usually only the
    /// privileged side can read, so every check goes through `channel`.
    pub async fn check_servable(
        &self,
        channel: &dyn PrivilegedChannel,
    ) -> Result<(), ModuleError> {
        let id = || self.id.clone();
        if self.exists(channel, &self.module_dir.join(DISABLE_MARKER)).await? {
            return Err(ModuleError::Disabled { id: id() });
        }
        if self.exists(channel, &self.module_dir.join(REMOVE_MARKER)).await? {
            return Err(ModuleError::PendingRemoval { id: id() });
        }
        if self.exists(channel, &self.module_dir.join(UPDATE_MARKER)).await? {
            return Err(ModuleError::PendingUpdate { id: id() });
        }

        let entry = self.webroot().join(ENTRY_FILE);
        if !self.exists(channel, &entry).await? {
            return Err(ModuleError::NoWebUi { id: id(), entry });
        }

        tracing::debug!(module = %self.id, "Module webroot is servable");
        Ok(())
    }

    async fn exists(
        &self,
        channel: &dyn PrivilegedChannel,
        path: &Path,
    ) -> Result<bool, ModuleError> {
        match channel.open_for_read(path).await {
            Ok(_stream) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(source) => Err(ModuleError::Inspection {
                id: self.id.clone(),
                source,
            }),
        }
    }
}
