//! Declarations recorded while parsing the global section

use spirv::{Dim, ExecutionModel, StorageClass};

/// Operands of an `OpTypeImage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDecl {
    pub sampled_type: u32,
    pub dim: Dim,
    pub depth: u32,
    pub arrayed: bool,
    pub multisampled: bool,
    /// 0 = known at run time, 1 = used with a sampler, 2 = storage image
    pub sampled: u32,
    pub format: u32,
    pub access: Option<u32>,
}

/// A type declaration. Ids refer to other declarations in the same module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDecl {
    Void,
    Bool,
    Int { width: u32, signed: bool },
    Float { width: u32 },
    Vector { component: u32, count: u32 },
    Matrix { column: u32, count: u32 },
    Image(ImageDecl),
    Sampler,
    SampledImage { image: u32 },
    /// `length` is the id of the constant holding the element count
    Array { element: u32, length: u32 },
    RuntimeArray { element: u32 },
    Struct { members: Vec<u32> },
    Pointer { storage: StorageClass, pointee: u32 },
    Function { result: u32, parameters: Vec<u32> },
    AccelerationStructure,
    RayQuery,
    /// Any other type the reflection layer has no use for
    Opaque,
}

/// Value of a constant or specialization constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantValue {
    /// Literal words, low-order word first
    Scalar(Vec<u32>),
    Bool(bool),
    Composite(Vec<u32>),
    Null,
    /// `OpSpecConstantOp`, evaluated only by backends
    Operation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantDecl {
    pub type_id: u32,
    pub value: ConstantValue,
    pub specialization: bool,
}

impl ConstantDecl {
    /// Returns the low word of a scalar constant.
    pub fn scalar(&self) -> Option<u32> {
        match &self.value {
            ConstantValue::Scalar(words) => words.first().copied(),
            ConstantValue::Bool(value) => Some(u32::from(*value)),
            ConstantValue::Null => Some(0),
            ConstantValue::Composite(_) | ConstantValue::Operation => None,
        }
    }
}

/// An `OpVariable`, global or function local.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableDecl {
    pub id: u32,
    /// Pointer type of the variable
    pub type_id: u32,
    pub storage: StorageClass,
    pub initializer: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPointDecl {
    pub model: ExecutionModel,
    pub function: u32,
    pub name: String,
    pub interface: Vec<u32>,
}

/// An `OpExecutionMode` or `OpExecutionModeId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionModeDecl {
    pub function: u32,
    pub mode: u32,
    pub operands: Vec<u32>,
    /// Operands are ids rather than literals
    pub uses_ids: bool,
}

/// Operand of a decoration, as it is written back out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecorationValue {
    Literals(Vec<u32>),
    Ids(Vec<u32>),
    String(String),
}

impl DecorationValue {
    /// First numeric operand, or 1 for decorations that are plain flags.
    pub fn as_u32(&self) -> u32 {
        match self {
            DecorationValue::Literals(words) | DecorationValue::Ids(words) => {
                words.first().copied().unwrap_or(1)
            }
            DecorationValue::String(_) => 1,
        }
    }
}
