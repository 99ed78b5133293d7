//! The declaration set produced by the C header parser.
//!
//! Everything is kept in ordered lists so function order and enum ordinals
//! survive deserialization unchanged.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeclarationSet {
    pub headers: Vec<HeaderDecls>,
}

/// All declarations extracted from a single header file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HeaderDecls {
    pub file: String,
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
    #[serde(default)]
    pub enums: Vec<EnumDecl>,
    #[serde(default)]
    pub structs: Vec<String>,
    #[serde(default)]
    pub types: Vec<TypedefDecl>,
}

/// A C type as spelled in the header, e.g. `const struct Tox *`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub name: String,
    #[serde(default)]
    pub pointer: bool,
    #[serde(default, rename = "const")]
    pub is_const: bool,
}

impl TypeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pointer: false,
            is_const: false,
        }
    }

    pub fn pointer(name: impl Into<String>) -> Self {
        Self {
            pointer: true,
            ..Self::new(name)
        }
    }

    pub fn constant(mut self) -> Self {
        self.is_const = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeSpec,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, ty: TypeSpec) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// The single unnamed `void` parameter of a `f(void)` declaration.
    pub fn is_void_marker(&self) -> bool {
        self.name.is_empty() && self.ty.name == "void" && !self.ty.pointer
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub return_type: TypeSpec,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    #[serde(default)]
    pub values: Vec<EnumValueDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValueDecl {
    pub name: String,
    pub ordinal: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedefDecl {
    pub name: String,
    pub target: TypedefTarget,
}

/// What a typedef names: a plain type or a function signature (callbacks).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypedefTarget {
    Type(TypeSpec),
    Function {
        return_type: TypeSpec,
        #[serde(default)]
        params: Vec<ParamDecl>,
    },
}

impl TypedefDecl {
    /// Views a function-typed typedef as a function declaration named after the typedef.
    pub fn as_function(&self) -> Option<FunctionDecl> {
        match &self.target {
            TypedefTarget::Function {
                return_type,
                params,
            } => Some(FunctionDecl {
                name: self.name.clone(),
                return_type: return_type.clone(),
                params: params.clone(),
            }),
            TypedefTarget::Type(_) => None,
        }
    }
}

impl DeclarationSet {
    pub fn from_json_str(source: &str) -> Result<Self, crate::error::InputError> {
        serde_json::from_str(source).map_err(crate::error::InputError::Json)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, crate::error::InputError> {
        serde_yaml::from_str(source).map_err(crate::error::InputError::Yaml)
    }
}
