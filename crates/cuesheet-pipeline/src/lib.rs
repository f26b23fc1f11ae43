pub mod aggregate;
pub mod assemble;
pub mod columns;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod precedence;
pub mod record;
pub mod sectioned;
pub mod simple;
pub mod table;
pub mod value;

pub use crate::config::ConvertOptions;
pub use crate::convert::{convert_bytes, convert_table};
pub use crate::document::{ConversionOutput, CountryPayload, MultiCountryDocument, SimpleDocument};
pub use crate::error::ConvertError;
pub use crate::sectioned::{SectionedMultiDocument, SectionedOutput, SectionedPayload};
pub use crate::pipeline::{load_conversion, run_pipeline, PipelineOptions, PipelineReport};
