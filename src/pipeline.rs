//! Runs the passes over one header at a time, in dependency order, into a
//! single shared forest.

use crate::buffers::resolve_buffers;
use crate::callbacks::extract_callbacks;
use crate::classes::{convert_leftover_number_params, extract_classes};
use crate::config::PipelineConfig;
use crate::decl::{DeclarationSet, HeaderDecls};
use crate::error::{InputError, IrError};
use crate::exceptions::{convert_error_params, derive_exceptions};
use crate::ingest::{ingest_enums, ingest_functions};
use crate::ir::Forest;
use crate::overrides::{apply_renames, extract_default_initializers, retype_number_handle_returns};
use crate::properties::synthesize_properties;

pub struct Pipeline<'c> {
    config: &'c PipelineConfig,
    forest: Forest,
}

impl<'c> Pipeline<'c> {
    pub fn new(config: &'c PipelineConfig) -> Self {
        Pipeline {
            config,
            forest: Forest::new(),
        }
    }

    /// Rejects the whole set if any header has no configured root class.
    pub fn check_headers(
        decls: &DeclarationSet,
        config: &PipelineConfig,
    ) -> Result<(), InputError> {
        if decls.headers.is_empty() {
            return Err(InputError::NoHeaders);
        }
        match decls
            .headers
            .iter()
            .find(|header| config.root_class_for(&header.file).is_none())
        {
            Some(unsupported) => Err(InputError::UnsupportedHeader {
                header: unsupported.file.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Ingests one header and runs every pass over the forest. Later headers
    /// may refer to classes created by earlier ones.
    pub fn process_header(&mut self, header: &HeaderDecls) -> Result<(), IrError> {
        let config = self.config;
        let root_class = config
            .root_class_for(&header.file)
            .ok_or_else(|| InputError::UnsupportedHeader {
                header: header.file.clone(),
            })?;
        log::info!("Processing `{}` into root class `{root_class}`", header.file);
        let forest = &mut self.forest;

        let enums = ingest_enums(&header.enums, config);
        forest.exceptions.extend(derive_exceptions(&enums, config));
        forest.enums.extend(enums);

        for function in ingest_functions(&header.functions, config) {
            let id = forest.alloc_function(function);
            forest.free.push(id);
        }
        convert_error_params(forest, config)?;

        extract_classes(forest, &header.structs, root_class, config);
        extract_callbacks(forest, &header.types, config);
        convert_leftover_number_params(forest, config);

        resolve_buffers(forest, config)?;

        retype_number_handle_returns(forest, config);
        extract_default_initializers(forest, config);
        synthesize_properties(forest, config);
        apply_renames(forest, config);

        log::info!(
            "`{}` done: {} classes, {} enums, {} exceptions",
            header.file,
            forest.all_classes().len(),
            forest.enums.len(),
            forest.exceptions.len()
        );
        Ok(())
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn into_forest(self) -> Forest {
        self.forest
    }
}
