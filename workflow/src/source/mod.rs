//! Where image collections come from.

mod catalog;
mod elevation;
mod synthetic;

pub use self::{
    catalog::{CatalogSource, CATALOG_FILE},
    elevation::{NasademSource, TileMode, ELEVATION_BAND},
    synthetic::SyntheticSource,
};
use crate::{ImageCollection, WorkflowError};

/// Looks up image collections by dataset id.
pub trait LayerSource: Send + Sync {
    /// Returns every image of collection `id`, or
    /// [`WorkflowError::UnknownCollection`] if this source doesn't
    /// serve it.
    fn collection(&self, id: &str) -> Result<ImageCollection, WorkflowError>;
}

/// Tries each source in order, skipping those that don't know a
/// collection.
#[derive(Default)]
pub struct SourceChain {
    sources: Vec<Box<dyn LayerSource>>,
}

impl SourceChain {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with<S: LayerSource + 'static>(mut self, source: S) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl LayerSource for SourceChain {
    fn collection(&self, id: &str) -> Result<ImageCollection, WorkflowError> {
        for source in &self.sources {
            match source.collection(id) {
                Err(WorkflowError::UnknownCollection(_)) => continue,
                result => return result,
            }
        }
        Err(WorkflowError::UnknownCollection(id.to_string()))
    }
}
