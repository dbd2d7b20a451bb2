//! Hardware access for configured pins.
//!
//! The registry keeps the logical value of every pin; a [`PinDriver`] is how
//! those values reach and come back from the board.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::gpio::pin::PinId;

/// Register-level read/write of digital pins.
pub trait PinDriver: Send + Sync + fmt::Debug {
    /// Current level of `id`, or `None` when the pin cannot be read.
    fn is_high(&self, id: PinId) -> Option<bool>;

    /// Drive `id` high or low.
    fn set_state(&self, id: PinId, high: bool) -> io::Result<()>;
}

/// Pins exposed through the Linux sysfs GPIO interface
/// (`<root>/gpio<N>/value`), the host stand-in for the board's registers.
///
/// A pin whose value file is missing reads as `None`, so its registry value
/// stays where it was.
#[derive(Debug, Clone)]
pub struct SysfsPins {
    root: PathBuf,
}

impl SysfsPins {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn value_path(&self, id: PinId) -> PathBuf {
        self.root.join(format!("gpio{}", id)).join("value")
    }
}

impl PinDriver for SysfsPins {
    fn is_high(&self, id: PinId) -> Option<bool> {
        let text = std::fs::read_to_string(self.value_path(id)).ok()?;
        match text.trim() {
            "0" => Some(false),
            "1" => Some(true),
            other => {
                tracing::debug!(pin = id, value = other, "Unreadable pin value");
                None
            }
        }
    }

    fn set_state(&self, id: PinId, high: bool) -> io::Result<()> {
        std::fs::write(self.value_path(id), if high { "1" } else { "0" })
    }
}
