//! The versioned document handed to the binding generator.
//!
//! Field names here are the contract with the downstream generator.

use crate::config::PipelineConfig;
use crate::ir::{
    ClassId, Forest, FunctionId, Handle, IrType, Param, Parameter, SizeAccessor, Slot,
};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrDocument {
    pub ir_version: String,
    pub library_version: String,
    pub enums: Vec<EnumDoc>,
    pub exceptions: Vec<ExceptionDoc>,
    pub classes: Vec<ClassDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDoc {
    pub name: String,
    pub cname: String,
    pub values: Vec<EnumValueDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValueDoc {
    pub name: String,
    pub cname: String,
    pub ordinal: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceptionDoc {
    pub name: String,
    pub enum_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDoc {
    pub name: String,
    pub is_callback: bool,
    pub handle: HandleDoc,
    pub default_init: Option<FunctionDoc>,
    pub properties: Vec<PropertyDoc>,
    pub functions: Vec<FunctionDoc>,
    pub inner_classes: Vec<ClassDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandleDoc {
    Native {
        alloc_func: Option<FunctionDoc>,
        dealloc_func: Option<FunctionDoc>,
    },
    Number {
        #[serde(rename = "type")]
        ty: TypeDoc,
    },
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyDoc {
    pub name: String,
    pub is_static: bool,
    pub getter: FunctionDoc,
    pub setter: Option<FunctionDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDoc {
    pub name: String,
    pub cname: String,
    pub return_type: ReturnDoc,
    pub params: Vec<ParamDoc>,
    pub throws: Option<String>,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnDoc {
    #[serde(rename = "type")]
    pub ty: TypeDoc,
    pub replaced: Option<TypeDoc>,
    pub param_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamDoc {
    Param {
        name: String,
        #[serde(rename = "type")]
        ty: TypeDoc,
    },
    BufferWrapper {
        buffer_param: PlainParamDoc,
        length_param: PlainParamDoc,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlainParamDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDoc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDoc {
    pub name: String,
    pub mutable: bool,
    pub is_array: bool,
    pub acts_as_string: bool,
    pub contains_number_handle: bool,
    pub ctype: CTypeDoc,
    pub size_getter: Option<Box<SizeAccessorDoc>>,
    pub size_setter: Option<Box<SizeAccessorDoc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CTypeDoc {
    pub name: String,
    pub is_pointer: bool,
}

/// Where a buffer's size comes from. `function` is the accessor itself, with
/// its own accessors left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeAccessorDoc {
    /// Qualified name of the class the accessor belongs (or belonged) to.
    pub class: Option<String>,
    /// Set when the accessor is a property getter.
    pub property: Option<String>,
    /// The accessor was taken off its class and only serves as a size provider.
    pub detached: bool,
    pub function: FunctionDoc,
}

struct DocumentBuilder<'a> {
    forest: &'a Forest,
    owners: HashMap<FunctionId, Slot>,
}

impl<'a> DocumentBuilder<'a> {
    fn new(forest: &'a Forest) -> Self {
        let mut owners = HashMap::new();
        for (id, slot) in forest.owners() {
            owners.entry(id).or_insert(slot);
        }
        Self { forest, owners }
    }

    fn class(&self, id: ClassId) -> ClassDoc {
        let class = self.forest.class(id);
        let handle = match &class.handle {
            Some(Handle::Native(native)) => HandleDoc::Native {
                alloc_func: native.alloc.map(|f| self.function(f, true)),
                dealloc_func: native.dealloc.map(|f| self.function(f, true)),
            },
            Some(Handle::Number(number)) => HandleDoc::Number {
                ty: self.ty(&number.ty, true),
            },
            None => HandleDoc::None,
        };

        ClassDoc {
            name: class.name.clone(),
            is_callback: class.is_callback,
            handle,
            default_init: class.default_init.map(|f| self.function(f, true)),
            properties: class
                .properties
                .iter()
                .map(|property| PropertyDoc {
                    name: property.name.clone(),
                    is_static: property.is_static,
                    getter: self.function(property.getter, true),
                    setter: property.setter.map(|f| self.function(f, true)),
                })
                .collect(),
            functions: class.methods.iter().map(|&f| self.function(f, true)).collect(),
            inner_classes: class.inner.iter().map(|&inner| self.class(inner)).collect(),
        }
    }

    fn function(&self, id: FunctionId, with_accessors: bool) -> FunctionDoc {
        let function = self.forest.function(id);
        FunctionDoc {
            name: function.name.clone(),
            cname: function.cname.clone(),
            return_type: ReturnDoc {
                ty: self.ty(&function.ret.ty, with_accessors),
                replaced: function.ret.replaced.as_ref().map(|ty| self.ty(ty, with_accessors)),
                param_index: function.ret.param_index,
            },
            params: function
                .params
                .iter()
                .map(|param| match param {
                    Param::Plain(plain) => ParamDoc::Param {
                        name: plain.name.clone(),
                        ty: self.ty(&plain.ty, with_accessors),
                    },
                    Param::Buffer(buffer) => ParamDoc::BufferWrapper {
                        buffer_param: self.plain(&buffer.data, with_accessors),
                        length_param: self.plain(&buffer.length, with_accessors),
                    },
                })
                .collect(),
            throws: function.throws.clone(),
            is_static: function.is_static,
        }
    }

    fn plain(&self, param: &Parameter, with_accessors: bool) -> PlainParamDoc {
        PlainParamDoc {
            name: param.name.clone(),
            ty: self.ty(&param.ty, with_accessors),
        }
    }

    fn ty(&self, ty: &IrType, with_accessors: bool) -> TypeDoc {
        let accessor = |wanted: fn(SizeAccessor) -> Option<FunctionId>| {
            ty.size_accessor
                .and_then(wanted)
                .filter(|_| with_accessors)
                .map(|id| Box::new(self.size_accessor(id)))
        };
        TypeDoc {
            name: ty.name().to_string(),
            mutable: ty.mutable,
            is_array: ty.is_array,
            acts_as_string: ty.acts_as_string,
            contains_number_handle: ty.contains_number_handle,
            ctype: CTypeDoc {
                name: ty.ctype.name.clone(),
                is_pointer: ty.ctype.is_pointer,
            },
            size_getter: accessor(|a| match a {
                SizeAccessor::Getter(id) => Some(id),
                SizeAccessor::Setter(_) => None,
            }),
            size_setter: accessor(|a| match a {
                SizeAccessor::Setter(id) => Some(id),
                SizeAccessor::Getter(_) => None,
            }),
        }
    }

    fn size_accessor(&self, id: FunctionId) -> SizeAccessorDoc {
        let (class, property, detached) = match self.owners.get(&id) {
            Some(Slot::Detached(class)) => (Some(*class), None, true),
            Some(Slot::Getter(class, property)) | Some(Slot::Setter(class, property)) => {
                (Some(*class), Some(property.clone()), false)
            }
            Some(
                Slot::Method(class)
                | Slot::Alloc(class)
                | Slot::Dealloc(class)
                | Slot::DefaultInit(class),
            ) => (Some(*class), None, false),
            Some(Slot::Free) | None => (None, None, false),
        };
        SizeAccessorDoc {
            class: class.map(|class| self.forest.qualified_name(class)),
            property,
            detached,
            function: self.function(id, false),
        }
    }
}

/// Renders the finished forest.
pub fn to_document(forest: &Forest, config: &PipelineConfig) -> IrDocument {
    let builder = DocumentBuilder::new(forest);
    IrDocument {
        ir_version: config.ir_version.clone(),
        library_version: config.library_version.clone(),
        enums: forest
            .enums
            .iter()
            .map(|ir_enum| EnumDoc {
                name: ir_enum.name.clone(),
                cname: ir_enum.cname.clone(),
                values: ir_enum
                    .values
                    .iter()
                    .map(|value| EnumValueDoc {
                        name: value.name.clone(),
                        cname: value.cname.clone(),
                        ordinal: value.ordinal,
                    })
                    .collect(),
            })
            .collect(),
        exceptions: forest
            .exceptions
            .iter()
            .map(|exception| ExceptionDoc {
                name: exception.name.clone(),
                enum_name: exception.enum_name.clone(),
            })
            .collect(),
        classes: forest.roots.iter().map(|&root| builder.class(root)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CType, Function, NativeHandle, ScalarKind, TypeKind};

    #[test]
    fn test_handle_and_param_tags() {
        let mut forest = Forest::new();
        let tox = forest.require_class(None, "Tox");
        let kill =
            forest.alloc_function(Function::new("deallocate_native", IrType::void(), vec![]));
        forest.class_mut(tox).handle = Some(Handle::Native(NativeHandle {
            alloc: None,
            dealloc: Some(kill),
        }));
        let bytes = IrType::new(
            TypeKind::Scalar(ScalarKind::Byte),
            false,
            true,
            CType::new("uint8_t", true),
        );
        let send = forest.alloc_function(Function::new(
            "send",
            IrType::void(),
            vec![Param::plain("data", bytes)],
        ));
        forest.class_mut(tox).methods.push(send);

        let document = to_document(&forest, &PipelineConfig::default());
        let json = serde_json::to_value(&document).unwrap();

        assert_eq!(json["ir_version"], "0.1.0");
        assert_eq!(json["library_version"], "0.2.18");
        let class = &json["classes"][0];
        assert_eq!(class["handle"]["kind"], "native");
        assert!(class["handle"]["alloc_func"].is_null());
        assert_eq!(class["handle"]["dealloc_func"]["name"], "deallocate_native");
        let param = &class["functions"][0]["params"][0];
        assert_eq!(param["kind"], "param");
        assert_eq!(param["type"]["name"], "byte");
        assert_eq!(param["type"]["ctype"]["name"], "uint8_t");
        assert!(param["type"]["size_getter"].is_null());
        assert_eq!(class["inner_classes"], serde_json::json!([]));
    }

    #[test]
    fn test_size_accessor_reference() {
        let mut forest = Forest::new();
        let tox = forest.require_class(None, "Tox");
        let size =
            forest.alloc_function(Function::new("self_get_name_size", IrType::void(), vec![]));
        forest.detached.push((size, tox));
        let mut ret = IrType::new(
            TypeKind::Scalar(ScalarKind::Byte),
            true,
            true,
            CType::new("uint8_t", true),
        );
        ret.size_accessor = Some(SizeAccessor::Getter(size));
        let getter = forest.alloc_function(Function::new("self_get_name", ret, vec![]));
        forest.class_mut(tox).methods.push(getter);

        let document = to_document(&forest, &PipelineConfig::default());
        let accessor = document.classes[0].functions[0]
            .return_type
            .ty
            .size_getter
            .as_ref()
            .unwrap();
        assert!(accessor.detached);
        assert_eq!(accessor.class.as_deref(), Some("Tox"));
        assert_eq!(accessor.function.name, "self_get_name_size");
        assert!(document.classes[0].functions[0].return_type.ty.size_setter.is_none());
    }
}
