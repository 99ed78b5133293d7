pub mod api;
pub mod buffers;
pub mod callbacks;
pub mod classes;
pub mod config;
pub mod decl;
pub mod error;
pub mod exceptions;
pub mod ingest;
pub mod ir;
pub mod naming;
pub mod overrides;
pub mod pipeline;
pub mod properties;
pub mod serialization;

pub use api::{convert, convert_json, ConversionResult};
pub use config::PipelineConfig;
pub use decl::DeclarationSet;
pub use error::IrError;
