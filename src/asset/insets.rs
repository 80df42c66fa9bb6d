//! Window insets exposed to the renderer as CSS variables

use std::str::FromStr;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Reserved request path for the insets stylesheet
pub const INSETS_PATH: &str = "internal/insets.css";

/// Safe-area insets in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Insets {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Insets {
    pub fn new(top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Stylesheet declaring the insets on `:root`
    pub fn css(&self) -> String {
        let mut css = String::from(":root {\n");
        css.push_str(&format!("\t--safe-area-inset-top: {}px;\n", self.top));
        css.push_str(&format!("\t--safe-area-inset-right: {}px;\n", self.right));
        css.push_str(&format!("\t--safe-area-inset-bottom: {}px;\n", self.bottom));
        css.push_str(&format!("\t--safe-area-inset-left: {}px;\n", self.left));
        for side in ["top", "bottom", "left", "right"] {
            css.push_str(&format!(
                "\t--window-inset-{side}: var(--safe-area-inset-{side}, 0px);\n"
            ));
        }
        for side in ["top", "bottom", "left", "right"] {
            css.push_str(&format!(
                "\t--f7-safe-area-{side}: var(--window-inset-{side}, 0px) !important;\n"
            ));
        }
        css.push('}');
        css
    }
}

impl FromStr for Insets {
    type Err = String;

    /// Parse `top,bottom,left,right` in pixels
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Invalid inset value in {:?}: {}", s, e))?;

        match values.as_slice() {
            [top, bottom, left, right] => Ok(Self::new(*top, *bottom, *left, *right)),
            _ => Err(format!(
                "Expected four insets (top,bottom,left,right), got {:?}",
                s
            )),
        }
    }
}

/// Current insets shared between the embedding host and the server
///
/// The renderer picks up a change the next time it loads the stylesheet.
#[derive(Debug, Default)]
pub struct InsetsState {
    current: RwLock<Insets>,
}

impl InsetsState {
    pub fn new(insets: Insets) -> Self {
        Self {
            current: RwLock::new(insets),
        }
    }

    pub fn get(&self) -> Insets {
        *self.current.read()
    }

    pub fn set(&self, insets: Insets) {
        let previous = std::mem::replace(&mut *self.current.write(), insets);
        if previous != insets {
            tracing::debug!(?insets, "Window insets updated");
        }
    }

    /// Stylesheet for the current insets
    pub fn stylesheet(&self) -> String {
        self.get().css()
    }
}
