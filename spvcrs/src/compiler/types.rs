//! Flattened type descriptions

use super::Compiler;
use crate::ir::{ConstantValue, TypeDecl};
use crate::{Error, Result};
use spirv::{Dim, StorageClass};

const MAX_TYPE_DEPTH: u32 = 64;

/// Fundamental kind of a type, with arrays, vectors, matrices and pointers
/// stripped.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Unknown = 0,
    Void = 1,
    Boolean = 2,
    SByte = 3,
    UByte = 4,
    Short = 5,
    UShort = 6,
    Int = 7,
    UInt = 8,
    Int64 = 9,
    UInt64 = 10,
    AtomicCounter = 11,
    Half = 12,
    Float = 13,
    Double = 14,
    Struct = 15,
    Image = 16,
    SampledImage = 17,
    Sampler = 18,
    AccelerationStructure = 19,
    RayQuery = 20,
}

/// Image properties of an image or sampled image type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    /// Id of the sampled component type
    pub type_id: u32,
    pub dim: Dim,
    pub depth: bool,
    pub arrayed: bool,
    pub multisampled: bool,
    pub sampled: u32,
    pub format: u32,
    pub access: u32,
}

/// A type with its arrays and pointers folded into one description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub base_type: BaseType,
    /// The declaration this type resolves to once arrays and pointers are
    /// stripped; struct member decorations are looked up on this id
    pub self_id: u32,
    /// Bit width of scalar components
    pub width: u32,
    pub vector_size: u32,
    pub columns: u32,
    /// Array dimensions, innermost first. An entry is a literal length,
    /// 0 for a runtime array, or the id of a specialization constant.
    pub array: Vec<u32>,
    pub array_size_literal: Vec<bool>,
    pub pointer: bool,
    /// Storage class of a pointer, `Generic` otherwise
    pub storage: StorageClass,
    pub member_types: Vec<u32>,
    pub image: Option<ImageInfo>,
    /// Type one level down (element, component, pointee), 0 at the bottom
    pub parent_type: u32,
}

impl TypeInfo {
    fn scalar(self_id: u32, base_type: BaseType, width: u32) -> Self {
        TypeInfo {
            base_type,
            self_id,
            width,
            vector_size: 1,
            columns: 1,
            array: Vec::new(),
            array_size_literal: Vec::new(),
            pointer: false,
            storage: StorageClass::Generic,
            member_types: Vec::new(),
            image: None,
            parent_type: 0,
        }
    }
}

impl Compiler {
    /// Describes the type declared with result id `id`.
    pub fn get_type(&self, id: u32) -> Result<TypeInfo> {
        self.flatten(id, 0)
    }

    /// Describes the (pointer) type of variable `id`.
    pub fn get_type_from_variable(&self, id: u32) -> Result<TypeInfo> {
        let type_id = self.variable(id)?.type_id;
        self.get_type(type_id)
    }

    /// Strips one level of pointer from `type_id`.
    pub fn get_non_pointer_type_id(&self, type_id: u32) -> Result<u32> {
        let info = self.get_type(type_id)?;
        Ok(if info.pointer { info.parent_type } else { type_id })
    }

    pub fn get_non_pointer_type(&self, type_id: u32) -> Result<TypeInfo> {
        self.get_type(self.get_non_pointer_type_id(type_id)?)
    }

    /// Storage class of variable `id`, `Generic` for anything else.
    pub fn get_storage_class(&self, id: u32) -> StorageClass {
        self.module
            .variables
            .get(&id)
            .map_or(StorageClass::Generic, |var| var.storage)
    }

    fn flatten(&self, id: u32, depth: u32) -> Result<TypeInfo> {
        if depth > MAX_TYPE_DEPTH {
            return Err(Error::Reflection(format!("Type {id} is nested too deeply.")));
        }
        let decl = self
            .module
            .types
            .get(&id)
            .ok_or_else(|| Error::invalid_id(id, "not a type"))?;
        let info = match decl {
            TypeDecl::Void => TypeInfo::scalar(id, BaseType::Void, 0),
            TypeDecl::Bool => TypeInfo::scalar(id, BaseType::Boolean, 1),
            &TypeDecl::Int { width, signed } => {
                let base = match (width, signed) {
                    (8, true) => BaseType::SByte,
                    (8, false) => BaseType::UByte,
                    (16, true) => BaseType::Short,
                    (16, false) => BaseType::UShort,
                    (32, true) => BaseType::Int,
                    (32, false) => BaseType::UInt,
                    (64, true) => BaseType::Int64,
                    (64, false) => BaseType::UInt64,
                    _ => BaseType::Unknown,
                };
                TypeInfo::scalar(id, base, width)
            }
            &TypeDecl::Float { width } => {
                let base = match width {
                    16 => BaseType::Half,
                    32 => BaseType::Float,
                    64 => BaseType::Double,
                    _ => BaseType::Unknown,
                };
                TypeInfo::scalar(id, base, width)
            }
            &TypeDecl::Vector { component, count } => TypeInfo {
                vector_size: count,
                self_id: id,
                parent_type: component,
                ..self.flatten(component, depth + 1)?
            },
            &TypeDecl::Matrix { column, count } => TypeInfo {
                columns: count,
                self_id: id,
                parent_type: column,
                ..self.flatten(column, depth + 1)?
            },
            TypeDecl::Image(image) => TypeInfo {
                image: Some(ImageInfo {
                    type_id: image.sampled_type,
                    dim: image.dim,
                    depth: image.depth == 1,
                    arrayed: image.arrayed,
                    multisampled: image.multisampled,
                    sampled: image.sampled,
                    format: image.format,
                    access: image.access.unwrap_or(0),
                }),
                ..TypeInfo::scalar(id, BaseType::Image, 0)
            },
            TypeDecl::Sampler => TypeInfo::scalar(id, BaseType::Sampler, 0),
            &TypeDecl::SampledImage { image } => TypeInfo {
                base_type: BaseType::SampledImage,
                self_id: id,
                ..self.flatten(image, depth + 1)?
            },
            &TypeDecl::Array { element, length } => {
                let mut info = self.flatten(element, depth + 1)?;
                let constant = self.module.constants.get(&length);
                match constant {
                    Some(c) if !c.specialization => {
                        info.array.push(c.scalar().unwrap_or(0));
                        info.array_size_literal.push(true);
                    }
                    _ => {
                        info.array.push(length);
                        info.array_size_literal.push(false);
                    }
                }
                info.parent_type = element;
                info
            }
            &TypeDecl::RuntimeArray { element } => {
                let mut info = self.flatten(element, depth + 1)?;
                info.array.push(0);
                info.array_size_literal.push(true);
                info.parent_type = element;
                info
            }
            TypeDecl::Struct { members } => TypeInfo {
                member_types: members.clone(),
                ..TypeInfo::scalar(id, BaseType::Struct, 0)
            },
            &TypeDecl::Pointer { storage, pointee } => {
                let mut info = self.flatten(pointee, depth + 1)?;
                info.pointer = true;
                info.storage = storage;
                info.parent_type = pointee;
                if storage == StorageClass::AtomicCounter {
                    info.base_type = BaseType::AtomicCounter;
                }
                info
            }
            TypeDecl::AccelerationStructure => {
                TypeInfo::scalar(id, BaseType::AccelerationStructure, 0)
            }
            TypeDecl::RayQuery => TypeInfo::scalar(id, BaseType::RayQuery, 0),
            TypeDecl::Function { .. } | TypeDecl::Opaque => {
                TypeInfo::scalar(id, BaseType::Unknown, 0)
            }
        };
        Ok(info)
    }

    /// Evaluates a constant used as an array length.
    pub(crate) fn array_length(&self, info: &TypeInfo) -> Result<u32> {
        let (Some(&size), Some(&literal)) = (info.array.last(), info.array_size_literal.last())
        else {
            return Ok(1);
        };
        if literal {
            return Ok(size);
        }
        let constant = self
            .module
            .constants
            .get(&size)
            .ok_or_else(|| Error::invalid_id(size, "not a constant"))?;
        match &constant.value {
            ConstantValue::Operation => Err(Error::Reflection(
                "Cannot evaluate a specialization constant operation as an array length.".into(),
            )),
            _ => constant
                .scalar()
                .ok_or_else(|| Error::invalid_id(size, "not a scalar constant")),
        }
    }
}
