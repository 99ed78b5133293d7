use crate::config::PipelineConfig;
use crate::decl::DeclarationSet;
use crate::error::IrError;
use crate::ir::Forest;
use crate::pipeline::Pipeline;
use crate::serialization::{to_document, IrDocument};
use serde::{Serialize, Serializer};
use std::io::Write;
use std::path::Path;

/// The result of a successful conversion.
/// Holds the finished forest for inspection and the document rendered from
/// it, which is what the binding generator consumes.
pub struct ConversionResult {
    pub forest: Forest,
    pub document: IrDocument,
}

impl Serialize for ConversionResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.document.serialize(serializer)
    }
}

impl ConversionResult {
    /// Serializes the document into a pretty-printed JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// Serializes the document into a single-line JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json_compact(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self)
    }

    /// Serializes the document into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }

    /// Writes the pretty JSON document to `path`. The file is replaced
    /// atomically, so a failed run never leaves a partial document behind.
    ///
    /// # Errors
    /// Returns an `IrError` if encoding fails or the file cannot be written.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), IrError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        file.persist(path).map_err(|err| err.error)?;
        log::info!("Wrote IR document to `{}`", path.display());
        Ok(())
    }
}

/// Converts a parsed declaration set into the object-oriented IR.
///
/// Headers are processed in the order given, all into one forest. Either the
/// whole conversion succeeds or nothing is returned.
///
/// # Errors
///
/// Returns an `IrError` if a header is unsupported or a header breaks one of
/// the naming conventions the passes rely on.
pub fn convert(
    decls: &DeclarationSet,
    config: &PipelineConfig,
) -> Result<ConversionResult, IrError> {
    Pipeline::check_headers(decls, config)?;

    let mut pipeline = Pipeline::new(config);
    for header in &decls.headers {
        pipeline.process_header(header)?;
    }

    let forest = pipeline.into_forest();
    let violations = forest.ownership_violations();
    if !violations.is_empty() {
        log::warn!("{} functions have no single owner", violations.len());
    }

    let document = to_document(&forest, config);
    Ok(ConversionResult { forest, document })
}

/// Parses a JSON declaration set and converts it.
///
/// # Errors
///
/// Returns an `IrError` if the source is not a valid declaration set or the
/// conversion fails.
pub fn convert_json(source: &str, config: &PipelineConfig) -> Result<ConversionResult, IrError> {
    let decls = DeclarationSet::from_json_str(source)?;
    convert(&decls, config)
}
