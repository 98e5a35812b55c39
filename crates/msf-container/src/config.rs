//! Options for opening and writing containers

use crate::error::{MsfError, Result};
use serde::{Deserialize, Serialize};

/// Options for opening and writing containers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MsfConfig {
    /// Reject page lists that point past the end of the file when opening
    pub check_page_bounds: bool,

    /// Free page map copy (1 or 2) the header marks as active on commit
    pub active_fpm_block: u32,

    /// Write the bitmap into both free page map copies on commit
    pub mirror_free_page_map: bool,
}

impl Default for MsfConfig {
    fn default() -> Self {
        Self {
            check_page_bounds: true,
            active_fpm_block: 1,
            mirror_free_page_map: true,
        }
    }
}

impl MsfConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable page bound checks on open
    #[must_use]
    pub const fn with_page_bounds_check(mut self, enable: bool) -> Self {
        self.check_page_bounds = enable;
        self
    }

    /// Set the active free page map copy
    #[must_use]
    pub const fn with_active_fpm_block(mut self, block: u32) -> Self {
        self.active_fpm_block = block;
        self
    }

    /// Enable or disable mirroring the bitmap into both copies
    #[must_use]
    pub const fn with_mirrored_free_page_map(mut self, enable: bool) -> Self {
        self.mirror_free_page_map = enable;
        self
    }

    /// The free page map copy that is not active
    pub fn inactive_fpm_block(&self) -> u32 {
        if self.active_fpm_block == 1 { 2 } else { 1 }
    }

    /// Check option values
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.active_fpm_block, 1 | 2) {
            return Err(MsfError::InvalidConfig(format!(
                "active_fpm_block must be 1 or 2, got {}",
                self.active_fpm_block
            )));
        }
        Ok(())
    }
}
