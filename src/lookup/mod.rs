//! Precomputed lookup tables consumed by the blending weight stage.
//!
//! Both tables are generated once (or loaded from PNG files) and shared
//! read-only between every view and frame.

pub mod area;
pub mod search;

pub use area::{AreaImage, AreaTexture};
pub use search::{SearchTexture, SearchWindow};

use crate::error::{LookupKind, SmaaError};
use std::path::Path;
use std::sync::Arc;

/// File name of the area table written by `smaa lookup`.
pub const AREA_FILE_NAME: &str = "area.png";
/// File name of the search table written by `smaa lookup`.
pub const SEARCH_FILE_NAME: &str = "search.png";

/// Shared handles to both lookup tables.
///
/// A missing table is not an error until a frame needs it; the pipeline
/// then passes the frame through unchanged.
#[derive(Debug, Clone, Default)]
pub struct LookupTextures {
    pub area: Option<Arc<AreaTexture>>,
    pub search: Option<Arc<SearchTexture>>,
}

impl LookupTextures {
    pub fn new(area: AreaTexture, search: SearchTexture) -> Self {
        Self { area: Some(Arc::new(area)), search: Some(Arc::new(search)) }
    }

    /// Generate both tables in memory.
    pub fn generate() -> Self {
        Self::new(AreaTexture::generate(), SearchTexture::generate())
    }

    /// Load both tables from PNG files.
    pub fn load(area: &Path, search: &Path) -> Result<Self, SmaaError> {
        Ok(Self::new(AreaTexture::load(area)?, SearchTexture::load(search)?))
    }

    /// Write both tables into `dir` as `area.png` and `search.png`.
    pub fn save_to_dir(&self, dir: &Path) -> Result<(), SmaaError> {
        let (area, search) = self.resolve()?;
        std::fs::create_dir_all(dir)?;
        area.save(&dir.join(AREA_FILE_NAME))?;
        search.save(&dir.join(SEARCH_FILE_NAME))?;
        Ok(())
    }

    /// Both tables, or the first one that is missing.
    pub fn resolve(&self) -> Result<(&AreaTexture, &SearchTexture), SmaaError> {
        let area = self.area.as_deref().ok_or(SmaaError::MissingLookup(LookupKind::Area))?;
        let search = self.search.as_deref().ok_or(SmaaError::MissingLookup(LookupKind::Search))?;
        Ok((area, search))
    }
}
