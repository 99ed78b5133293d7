//! Maps raw C declarations onto the initial IR objects.

use crate::config::PipelineConfig;
use crate::decl::{EnumDecl, FunctionDecl, TypeSpec};
use crate::ir::{CType, Enum, EnumValue, Function, IrType, Param, ScalarKind, TypeKind};
use crate::naming::{pascal_to_snake, snake_to_pascal, strip_struct_qualifier};

/// Converts a C type into its IR type. Unknown names are struct or typedef
/// references and become PascalCase class references.
pub fn ingest_type(spec: &TypeSpec) -> IrType {
    let ctype = CType::new(spec.name.clone(), spec.pointer);
    let mutable = !spec.is_const;
    let base = strip_struct_qualifier(&spec.name);

    match ScalarKind::from_c_name(base) {
        Some(ScalarKind::Void) => {
            IrType::new(TypeKind::Scalar(ScalarKind::Void), mutable, false, ctype)
        }
        Some(kind) => IrType::new(TypeKind::Scalar(kind), mutable, spec.pointer, ctype),
        None => IrType::new(TypeKind::Class(snake_to_pascal(base)), mutable, false, ctype),
    }
}

/// Converts one C function. A `(void)` parameter list yields no parameters.
pub fn ingest_function(decl: &FunctionDecl, config: &PipelineConfig) -> Function {
    let explicitly_empty = decl.params.first().is_some_and(|p| p.is_void_marker());

    let params = if explicitly_empty {
        Vec::new()
    } else {
        decl.params
            .iter()
            .map(|param| {
                let mut ty = ingest_type(&param.ty);
                ty.acts_as_string = is_text_param(&param.name, &ty, config);
                Param::plain(param.name.clone(), ty)
            })
            .collect()
    };

    Function::new(decl.name.clone(), ingest_type(&decl.return_type), params)
}

/// Byte buffers whose name reads like text (`name`, `status_message`, ...).
fn is_text_param(name: &str, ty: &IrType, config: &PipelineConfig) -> bool {
    ty.ctype.name == "uint8_t"
        && ty.is_array
        && config
            .markers
            .text
            .iter()
            .any(|marker| name.contains(marker.as_str()))
}

/// Ingests all functions of a header, dropping the excluded ones.
pub fn ingest_functions(decls: &[FunctionDecl], config: &PipelineConfig) -> Vec<Function> {
    decls
        .iter()
        .filter(|decl| {
            let excluded = config
                .excluded_function_markers
                .iter()
                .any(|marker| decl.name.contains(marker.as_str()));
            if excluded {
                log::debug!("Skipping excluded function `{}`", decl.name);
            }
            !excluded
        })
        .map(|decl| ingest_function(decl, config))
        .collect()
}

/// Converts one C enum, or `None` for the parser's artifact enums.
pub fn ingest_enum(decl: &EnumDecl, config: &PipelineConfig) -> Option<Enum> {
    if config.skipped_enums.iter().any(|name| *name == decl.name) {
        log::debug!("Skipping artifact enum `{}`", decl.name);
        return None;
    }

    let prefix = value_prefix(&decl.name);
    let values = decl
        .values
        .iter()
        .map(|value| EnumValue {
            name: value
                .name
                .strip_prefix(prefix.as_str())
                .filter(|bare| !bare.is_empty())
                .unwrap_or(&value.name)
                .to_string(),
            cname: value.name.clone(),
            ordinal: value.ordinal,
        })
        .collect();

    Some(Enum {
        name: decl.name.replace('_', ""),
        cname: decl.name.clone(),
        values,
    })
}

/// `Tox_Err_New` values look like `TOX_ERR_NEW_OK`; so do `ToxErrNew` values.
fn value_prefix(enum_name: &str) -> String {
    let snake = if enum_name.contains('_') {
        enum_name.to_string()
    } else {
        pascal_to_snake(enum_name)
    };
    format!("{}_", snake.to_uppercase())
}

pub fn ingest_enums(decls: &[EnumDecl], config: &PipelineConfig) -> Vec<Enum> {
    decls
        .iter()
        .filter_map(|decl| ingest_enum(decl, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{EnumValueDecl, ParamDecl};

    #[test]
    fn test_scalar_mapping() {
        let ty = ingest_type(&TypeSpec::pointer("uint8_t").constant());
        assert!(ty.is_scalar(ScalarKind::Byte));
        assert!(ty.is_array);
        assert!(!ty.mutable);

        let ty = ingest_type(&TypeSpec::new("size_t"));
        assert!(ty.is_scalar(ScalarKind::ULong));
        assert!(!ty.is_array);
    }

    #[test]
    fn test_void_pointer_is_not_an_array() {
        let ty = ingest_type(&TypeSpec::pointer("void"));
        assert!(ty.is_scalar(ScalarKind::Void));
        assert!(!ty.is_array);
        assert!(ty.ctype.is_pointer);
    }

    #[test]
    fn test_struct_reference() {
        let ty = ingest_type(&TypeSpec::pointer("struct Tox_Options"));
        assert_eq!(ty.kind, TypeKind::Class("ToxOptions".into()));
        assert!(!ty.is_array);
        assert_eq!(ty.ctype.name, "struct Tox_Options");
    }

    #[test]
    fn test_explicitly_empty_parameter_list() {
        let decl = FunctionDecl {
            name: "tox_version_major".into(),
            return_type: TypeSpec::new("uint32_t"),
            params: vec![ParamDecl::new("", TypeSpec::new("void"))],
        };
        let function = ingest_function(&decl, &PipelineConfig::default());
        assert!(function.params.is_empty());
        assert_eq!(function.cname, "tox_version_major");
    }

    #[test]
    fn test_text_params() {
        let decl = FunctionDecl {
            name: "tox_self_set_name".into(),
            return_type: TypeSpec::new("bool"),
            params: vec![
                ParamDecl::new("name", TypeSpec::pointer("uint8_t").constant()),
                ParamDecl::new("length", TypeSpec::new("size_t")),
                ParamDecl::new("public_key", TypeSpec::pointer("uint8_t")),
            ],
        };
        let function = ingest_function(&decl, &PipelineConfig::default());
        let flags: Vec<bool> = function
            .plain_params()
            .map(|p| p.ty.acts_as_string)
            .collect();
        assert_eq!(flags, vec![true, false, false]);
    }

    #[test]
    fn test_excluded_functions() {
        let decls = vec![
            FunctionDecl {
                name: "tox_options_get_operating_system".into(),
                return_type: TypeSpec::pointer("void"),
                params: vec![],
            },
            FunctionDecl {
                name: "tox_iterate".into(),
                return_type: TypeSpec::new("void"),
                params: vec![],
            },
        ];
        let functions = ingest_functions(&decls, &PipelineConfig::default());
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].name, "tox_iterate");
    }

    #[test]
    fn test_enum_prefix_stripping() {
        let decl = EnumDecl {
            name: "Tox_Err_New".into(),
            values: vec![
                EnumValueDecl {
                    name: "TOX_ERR_NEW_OK".into(),
                    ordinal: 0,
                },
                EnumValueDecl {
                    name: "TOX_ERR_NEW_NULL".into(),
                    ordinal: 7,
                },
            ],
        };
        let ir_enum = ingest_enum(&decl, &PipelineConfig::default()).unwrap();
        assert_eq!(ir_enum.name, "ToxErrNew");
        assert_eq!(ir_enum.cname, "Tox_Err_New");
        assert_eq!(ir_enum.values[0].name, "OK");
        assert_eq!(ir_enum.values[1].name, "NULL");
        assert_eq!(ir_enum.values[1].ordinal, 7);
    }

    #[test]
    fn test_pascal_enum_prefix_stripping() {
        let decl = EnumDecl {
            name: "WidgetErrCreate".into(),
            values: vec![EnumValueDecl {
                name: "WIDGET_ERR_CREATE_FAIL".into(),
                ordinal: 1,
            }],
        };
        let ir_enum = ingest_enum(&decl, &PipelineConfig::default()).unwrap();
        assert_eq!(ir_enum.values[0].name, "FAIL");
    }

    #[test]
    fn test_artifact_enum_is_skipped() {
        let decl = EnumDecl { name: "T".into(), values: vec![] };
        assert!(ingest_enum(&decl, &PipelineConfig::default()).is_none());
    }
}
