pub mod config;
pub mod docx;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod translator;

pub use docx::extract::{extract_paragraph_model, parse_document};
pub use docx::model::{ParagraphModel, TranslationModel};
pub use docx::reconstruct::{reconstruct, reconstruct_package, ReconstructOptions, ReconstructReport};
pub use error::{Result, ReviewError};
