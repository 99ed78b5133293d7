//! Error enums become exceptions; `error` out-parameters become `throws`.

use crate::config::PipelineConfig;
use crate::error::ConventionError;
use crate::ir::{Enum, Exception, Forest, Param};

/// One exception per enum carrying the error prefix, e.g. `ToxErrNew` -> `ToxNew`.
pub fn derive_exceptions(enums: &[Enum], config: &PipelineConfig) -> Vec<Exception> {
    enums
        .iter()
        .filter(|ir_enum| ir_enum.name.starts_with(config.error_enum_prefix.as_str()))
        .map(|ir_enum| Exception {
            name: ir_enum.name.replacen(
                config.error_enum_prefix.as_str(),
                config.exception_prefix.as_str(),
                1,
            ),
            enum_name: ir_enum.name.clone(),
        })
        .collect()
}

/// Drops the error parameter of every free function and records the matching
/// exception as thrown.
pub fn convert_error_params(
    forest: &mut Forest,
    config: &PipelineConfig,
) -> Result<(), ConventionError> {
    let error_param = config.markers.error_param.as_str();

    for id in forest.free.clone() {
        let Some(position) = forest
            .function(id)
            .params
            .iter()
            .position(|param| param.name() == error_param)
        else {
            continue;
        };

        let enum_name = match &forest.function(id).params[position] {
            Param::Plain(param) => param.ty.name().to_string(),
            Param::Buffer(buffer) => buffer.data.ty.name().to_string(),
        };
        let exception = forest
            .exceptions
            .iter()
            .find(|exception| exception.enum_name == enum_name)
            .map(|exception| exception.name.clone())
            .ok_or_else(|| ConventionError::MissingException {
                enum_name: enum_name.clone(),
                function: forest.function(id).name.clone(),
            })?;

        let function = forest.function_mut(id);
        function.params.remove(position);
        log::debug!("`{}` throws `{}`", function.name, exception);
        function.throws = Some(exception);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CType, EnumValue, Function, IrType, TypeKind};

    fn error_enum(name: &str) -> Enum {
        Enum {
            name: name.into(),
            cname: name.into(),
            values: vec![EnumValue {
                name: "OK".into(),
                cname: "OK".into(),
                ordinal: 0,
            }],
        }
    }

    fn enum_param(name: &str, enum_name: &str) -> Param {
        Param::plain(
            name,
            IrType::new(
                TypeKind::Class(enum_name.into()),
                true,
                false,
                CType::new(enum_name, true),
            ),
        )
    }

    #[test]
    fn test_derive_exceptions() {
        let config = PipelineConfig::default();
        let enums = vec![error_enum("ToxErrNew"), error_enum("ToxUserStatus")];
        let exceptions = derive_exceptions(&enums, &config);
        assert_eq!(
            exceptions,
            vec![Exception {
                name: "ToxNew".into(),
                enum_name: "ToxErrNew".into(),
            }]
        );
    }

    #[test]
    fn test_error_param_becomes_throws() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        forest.exceptions = derive_exceptions(&[error_enum("ToxErrBootstrap")], &config);
        let id = forest.alloc_function(Function::new(
            "tox_bootstrap",
            IrType::void(),
            vec![enum_param("port", "Port"), enum_param("error", "ToxErrBootstrap")],
        ));
        forest.free.push(id);

        convert_error_params(&mut forest, &config).unwrap();
        let function = forest.function(id);
        assert_eq!(function.throws.as_deref(), Some("ToxBootstrap"));
        assert_eq!(function.params.len(), 1);
        assert_eq!(function.params[0].name(), "port");
    }

    #[test]
    fn test_missing_exception_is_fatal() {
        let config = PipelineConfig::default();
        let mut forest = Forest::new();
        let id = forest.alloc_function(Function::new(
            "tox_new",
            IrType::void(),
            vec![enum_param("error", "ToxErrUnknown")],
        ));
        forest.free.push(id);

        let err = convert_error_params(&mut forest, &config).unwrap_err();
        assert_eq!(
            err,
            ConventionError::MissingException {
                enum_name: "ToxErrUnknown".into(),
                function: "tox_new".into(),
            }
        );
    }
}
