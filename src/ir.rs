//! The object-oriented IR forest.
//!
//! Functions and classes live in arenas owned by [`Forest`] and are addressed
//! by [`FunctionId`] and [`ClassId`]. Moving a function between the free list,
//! a class and a property only moves its id. Size accessors are ids too, so
//! they never own the function they point at.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(u32);

impl FunctionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ClassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The fixed set of scalar types C primitives map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Byte,
    UShort,
    UInt,
    ULong,
    Char,
    Bool,
    Void,
}

impl ScalarKind {
    /// Maps a C primitive name onto its scalar kind.
    pub fn from_c_name(name: &str) -> Option<Self> {
        match name {
            "uint8_t" => Some(Self::Byte),
            "uint16_t" => Some(Self::UShort),
            "uint32_t" => Some(Self::UInt),
            "uint64_t" | "size_t" => Some(Self::ULong),
            "char" => Some(Self::Char),
            "bool" => Some(Self::Bool),
            "void" => Some(Self::Void),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::UShort => "ushort",
            Self::UInt => "uint",
            Self::ULong => "ulong",
            Self::Char => "char",
            Self::Bool => "bool",
            Self::Void => "void",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Scalar(ScalarKind),
    /// A struct, enum or typedef referenced by its PascalCase name.
    Class(String),
}

impl TypeKind {
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(kind) => kind.as_str(),
            Self::Class(name) => name,
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The C spelling a type came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CType {
    pub name: String,
    pub is_pointer: bool,
}

impl CType {
    pub fn new(name: impl Into<String>, is_pointer: bool) -> Self {
        Self {
            name: name.into(),
            is_pointer,
        }
    }
}

/// Where the length of a buffer-typed value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeAccessor {
    Getter(FunctionId),
    Setter(FunctionId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrType {
    pub kind: TypeKind,
    pub mutable: bool,
    /// A variable-length buffer rather than a single value.
    pub is_array: bool,
    pub ctype: CType,
    pub acts_as_string: bool,
    pub contains_number_handle: bool,
    pub size_accessor: Option<SizeAccessor>,
}

impl IrType {
    pub fn new(kind: TypeKind, mutable: bool, is_array: bool, ctype: CType) -> Self {
        Self {
            kind,
            mutable,
            is_array,
            ctype,
            acts_as_string: false,
            contains_number_handle: false,
            size_accessor: None,
        }
    }

    pub fn void() -> Self {
        Self::new(
            TypeKind::Scalar(ScalarKind::Void),
            true,
            false,
            CType::new("void", false),
        )
    }

    pub fn name(&self) -> &str {
        self.kind.name()
    }

    pub fn is_scalar(&self, kind: ScalarKind) -> bool {
        self.kind == TypeKind::Scalar(kind)
    }

    /// `char*` buffers are text and already carry their own terminator.
    pub fn is_text(&self) -> bool {
        self.is_scalar(ScalarKind::Char) && self.is_array
    }

    pub fn size_getter(&self) -> Option<FunctionId> {
        match self.size_accessor {
            Some(SizeAccessor::Getter(id)) => Some(id),
            _ => None,
        }
    }

    pub fn size_setter(&self) -> Option<FunctionId> {
        match self.size_accessor {
            Some(SizeAccessor::Setter(id)) => Some(id),
            _ => None,
        }
    }

    /// Turns the type into a reference to the class wrapping a numeric handle.
    pub fn retype_as_number_handle(&mut self, class_name: impl Into<String>) {
        self.kind = TypeKind::Class(class_name.into());
        self.contains_number_handle = true;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: IrType,
}

/// A `(data, length)` parameter pair passed as one buffer argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferWrapper {
    pub data: Parameter,
    pub length: Parameter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Plain(Parameter),
    Buffer(BufferWrapper),
}

impl Param {
    pub fn plain(name: impl Into<String>, ty: IrType) -> Self {
        Self::Plain(Parameter {
            name: name.into(),
            ty,
        })
    }

    /// The parameter name, or the data half's name for a buffer wrapper.
    pub fn name(&self) -> &str {
        match self {
            Self::Plain(param) => &param.name,
            Self::Buffer(buffer) => &buffer.data.name,
        }
    }

    pub fn as_plain(&self) -> Option<&Parameter> {
        match self {
            Self::Plain(param) => Some(param),
            Self::Buffer(_) => None,
        }
    }

    pub fn as_plain_mut(&mut self) -> Option<&mut Parameter> {
        match self {
            Self::Plain(param) => Some(param),
            Self::Buffer(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnDescriptor {
    pub ty: IrType,
    /// The original return type when it was supplanted.
    pub replaced: Option<IrType>,
    /// Position of the out-parameter promoted to the return value.
    pub param_index: Option<usize>,
}

impl ReturnDescriptor {
    pub fn new(ty: IrType) -> Self {
        Self {
            ty,
            replaced: None,
            param_index: None,
        }
    }

    /// Makes `ty` the return type, keeping the current one as `replaced`.
    pub fn replace(&mut self, ty: IrType) {
        let previous = std::mem::replace(&mut self.ty, ty);
        self.replaced = Some(previous);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub cname: String,
    pub ret: ReturnDescriptor,
    pub params: Vec<Param>,
    pub throws: Option<String>,
    pub is_static: bool,
}

impl Function {
    pub fn new(name: impl Into<String>, ret: IrType, params: Vec<Param>) -> Self {
        let name = name.into();
        Self {
            cname: name.clone(),
            name,
            ret: ReturnDescriptor::new(ret),
            params,
            throws: None,
            is_static: false,
        }
    }

    pub fn plain_params(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter_map(Param::as_plain)
    }
}

/// A getter and optional setter exposed as one named value. The getter is mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub getter: FunctionId,
    pub setter: Option<FunctionId>,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub cname: String,
    pub ordinal: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    pub name: String,
    pub cname: String,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    pub name: String,
    pub enum_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeHandle {
    pub alloc: Option<FunctionId>,
    pub dealloc: Option<FunctionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberHandle {
    pub ty: IrType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handle {
    Native(NativeHandle),
    Number(NumberHandle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    pub name: String,
    pub is_callback: bool,
    pub handle: Option<Handle>,
    pub default_init: Option<FunctionId>,
    pub properties: Vec<Property>,
    pub methods: Vec<FunctionId>,
    pub inner: Vec<ClassId>,
}

impl Class {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_callback: false,
            handle: None,
            default_init: None,
            properties: Vec::new(),
            methods: Vec::new(),
            inner: Vec::new(),
        }
    }

    /// The native handle, created when the class has no handle yet.
    /// `None` when the class already wraps a numeric handle.
    pub fn native_handle_mut(&mut self) -> Option<&mut NativeHandle> {
        let handle = self
            .handle
            .get_or_insert_with(|| Handle::Native(NativeHandle::default()));
        match handle {
            Handle::Native(native) => Some(native),
            Handle::Number(_) => None,
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Every place a function can be owned from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Free,
    Method(ClassId),
    Getter(ClassId, String),
    Setter(ClassId, String),
    Alloc(ClassId),
    Dealloc(ClassId),
    DefaultInit(ClassId),
    /// Removed from `ClassId`'s surface to serve purely as a size accessor.
    Detached(ClassId),
}

#[derive(Debug, Clone, Default)]
pub struct Forest {
    functions: Vec<Function>,
    classes: Vec<Class>,
    pub roots: Vec<ClassId>,
    pub free: Vec<FunctionId>,
    pub detached: Vec<(FunctionId, ClassId)>,
    pub enums: Vec<Enum>,
    pub exceptions: Vec<Exception>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a function in the arena without giving it an owner.
    pub fn alloc_function(&mut self, function: Function) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(function);
        id
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.index()]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.index()]
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut Class {
        &mut self.classes[id.index()]
    }

    /// Finds the class called `name` among the roots (`parent == None`) or
    /// among `parent`'s inner classes, creating it there when missing.
    pub fn require_class(&mut self, parent: Option<ClassId>, name: &str) -> ClassId {
        let scope = match parent {
            Some(parent) => &self.class(parent).inner,
            None => &self.roots,
        };
        if let Some(&existing) = scope.iter().find(|&&id| self.class(id).name == name) {
            return existing;
        }

        let id = ClassId(self.classes.len() as u32);
        self.classes.push(Class::new(name));
        match parent {
            Some(parent) => self.class_mut(parent).inner.push(id),
            None => self.roots.push(id),
        }
        log::debug!("Created class `{}`", self.qualified_name(id));
        id
    }

    /// Roots first, then each root's inner classes depth-first.
    pub fn all_classes(&self) -> Vec<ClassId> {
        let mut out = Vec::new();
        self.collect_classes(&self.roots, &mut out);
        out
    }

    fn collect_classes(&self, ids: &[ClassId], out: &mut Vec<ClassId>) {
        out.extend_from_slice(ids);
        for &id in ids {
            self.collect_classes(&self.class(id).inner, out);
        }
    }

    /// First class with the given simple name, searching in [`Forest::all_classes`] order.
    pub fn find_class(&self, name: &str) -> Option<ClassId> {
        self.all_classes()
            .into_iter()
            .find(|&id| self.class(id).name == name)
    }

    /// The class's name prefixed by its ancestors, e.g. `Tox.Friend.File`.
    pub fn qualified_name(&self, id: ClassId) -> String {
        match self.parent_of(id) {
            Some(parent) => format!("{}.{}", self.qualified_name(parent), self.class(id).name),
            None => self.class(id).name.clone(),
        }
    }

    pub fn parent_of(&self, id: ClassId) -> Option<ClassId> {
        self.classes
            .iter()
            .position(|class| class.inner.contains(&id))
            .map(|index| ClassId(index as u32))
    }

    pub fn find_method(&self, class: ClassId, name: &str) -> Option<FunctionId> {
        self.class(class)
            .methods
            .iter()
            .copied()
            .find(|&id| self.function(id).name == name)
    }

    /// Removes `function` from the class's method list. Returns whether it was there.
    pub fn remove_method(&mut self, class: ClassId, function: FunctionId) -> bool {
        let methods = &mut self.class_mut(class).methods;
        match methods.iter().position(|&id| id == function) {
            Some(index) => {
                methods.remove(index);
                true
            }
            None => false,
        }
    }

    /// Moves a method from one class to the end of another's method list.
    pub fn move_method(&mut self, from: ClassId, to: ClassId, function: FunctionId) {
        if self.remove_method(from, function) {
            self.class_mut(to).methods.push(function);
        }
    }

    /// Every (function, slot) ownership edge in the forest.
    pub fn owners(&self) -> Vec<(FunctionId, Slot)> {
        let mut out: Vec<(FunctionId, Slot)> =
            self.free.iter().map(|&id| (id, Slot::Free)).collect();
        out.extend(
            self.detached
                .iter()
                .map(|&(id, class)| (id, Slot::Detached(class))),
        );

        for class_id in self.all_classes() {
            let class = self.class(class_id);
            if let Some(Handle::Native(native)) = &class.handle {
                out.extend(native.alloc.map(|id| (id, Slot::Alloc(class_id))));
                out.extend(native.dealloc.map(|id| (id, Slot::Dealloc(class_id))));
            }
            out.extend(class.default_init.map(|id| (id, Slot::DefaultInit(class_id))));
            for property in &class.properties {
                out.push((property.getter, Slot::Getter(class_id, property.name.clone())));
                if let Some(setter) = property.setter {
                    out.push((setter, Slot::Setter(class_id, property.name.clone())));
                }
            }
            out.extend(class.methods.iter().map(|&id| (id, Slot::Method(class_id))));
        }
        out
    }

    /// Functions owned by zero or several slots. Empty for a well-formed forest.
    pub fn ownership_violations(&self) -> Vec<FunctionId> {
        let mut counts = vec![0usize; self.functions.len()];
        for (id, _) in self.owners() {
            counts[id.index()] += 1;
        }
        counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count != 1)
            .map(|(index, _)| FunctionId(index as u32))
            .collect()
    }
}
