pub mod cell_editor;
pub mod conversion;
pub mod extraction;
pub mod hierarchy;
pub mod labels;
pub mod overlay;
pub mod resolver;

pub use crate::domain::model::{CellAddress, ExtractionResult, Record, Value};
pub use crate::domain::ports::{ConversionBackend, Storage};
pub use crate::utils::error::Result;
