//! Hand-assembled SPIR-V modules used by tests.
//!
//! Each module is written in the order [`Module::assemble`](crate::ir::Module::assemble)
//! produces, so parsing and re-assembling one gives back the same words.

use crate::ir::{encode_string, Instruction};
use spirv::Op;

/// Storage buffer variable of [`compute_shader`]
pub const COMPUTE_BUFFER: u32 = 8;
/// `GlobalInvocationId` input of [`compute_shader`]
pub const COMPUTE_INVOCATION_ID: u32 = 12;
/// Buffer block struct of [`compute_shader`]
pub const COMPUTE_BLOCK: u32 = 6;

/// Uniform buffer variable of [`fragment_shader`]
pub const FRAGMENT_UBO: u32 = 12;
/// Uniform block struct of [`fragment_shader`]
pub const FRAGMENT_UBO_BLOCK: u32 = 10;
/// `float[4]` array type inside the uniform block
pub const FRAGMENT_ARRAY_TYPE: u32 = 9;
/// Push constant variable of [`fragment_shader`]
pub const FRAGMENT_PUSH_CONSTANTS: u32 = 15;
/// Separate image variable of [`fragment_shader`]
pub const FRAGMENT_IMAGE: u32 = 18;
/// Separate sampler variable of [`fragment_shader`]
pub const FRAGMENT_SAMPLER: u32 = 21;
/// Stage input at location 1
pub const FRAGMENT_INPUT: u32 = 25;
/// Stage output at location 0
pub const FRAGMENT_OUTPUT: u32 = 27;
/// Specialization constant with `SpecId` 7
pub const FRAGMENT_SPEC_CONSTANT: u32 = 28;
/// Storage image variable of [`fragment_shader`]
pub const FRAGMENT_STORAGE_IMAGE: u32 = 46;
/// `FragCoord` built-in input
pub const FRAGMENT_FRAG_COORD: u32 = 48;

/// `Position` built-in output of [`vertex_shader`]
pub const VERTEX_POSITION: u32 = 9;

struct Builder {
    words: Vec<u32>,
}

impl Builder {
    fn new(version: u32, bound: u32) -> Self {
        Builder {
            words: vec![spirv::MAGIC_NUMBER, version, 0, bound, 0],
        }
    }

    fn op(&mut self, op: Op, operands: &[u32]) -> &mut Self {
        Instruction::new(op, operands.to_vec()).encode_into(&mut self.words);
        self
    }

    /// Emits `op` with a literal string between `before` and `after`.
    fn op_str(&mut self, op: Op, before: &[u32], string: &str, after: &[u32]) -> &mut Self {
        let mut operands = before.to_vec();
        operands.extend(encode_string(string));
        operands.extend_from_slice(after);
        self.op(op, &operands)
    }

    fn finish(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.words)
    }
}

// Enumerant values used below
const SHADER: u32 = 1;
const IMAGE_QUERY: u32 = 50;
const LOGICAL: u32 = 0;
const GLSL450: u32 = 1;
const VERTEX: u32 = 0;
const GL_COMPUTE: u32 = 5;
const FRAGMENT: u32 = 4;
const LOCAL_SIZE: u32 = 17;
const LOCAL_SIZE_ID: u32 = 38;
const ORIGIN_UPPER_LEFT: u32 = 7;
const SOURCE_GLSL: u32 = 2;

const BLOCK: u32 = 2;
const COL_MAJOR: u32 = 5;
const ARRAY_STRIDE: u32 = 6;
const MATRIX_STRIDE: u32 = 7;
const BUILT_IN: u32 = 11;
const SPEC_ID: u32 = 1;
const LOCATION: u32 = 30;
const BINDING: u32 = 33;
const DESCRIPTOR_SET: u32 = 34;
const OFFSET: u32 = 35;

const UNIFORM_CONSTANT: u32 = 0;
const INPUT: u32 = 1;
const UNIFORM: u32 = 2;
const OUTPUT: u32 = 3;
const PUSH_CONSTANT: u32 = 9;
const STORAGE_BUFFER: u32 = 12;

const POSITION: u32 = 0;
const GLOBAL_INVOCATION_ID: u32 = 28;
const FRAG_COORD: u32 = 15;
const WORKGROUP_SIZE: u32 = 25;

/// A compute shader with an 8x4x1 workgroup that doubles every float of a
/// storage buffer at set 0, binding 1.
///
/// ```text
/// layout(local_size_x = 8, local_size_y = 4) in;
/// layout(set = 0, binding = 1) buffer Buf { float data[]; } buf;
/// void main() { buf.data[gl_GlobalInvocationID.x] *= 2.0; }
/// ```
pub fn compute_shader() -> Vec<u32> {
    Builder::new(0x10000, 23)
        .op(Op::Capability, &[SHADER])
        .op_str(Op::Extension, &[], "SPV_KHR_storage_buffer_storage_class", &[])
        .op(Op::MemoryModel, &[LOGICAL, GLSL450])
        .op_str(Op::EntryPoint, &[GL_COMPUTE, 1], "main", &[12])
        .op(Op::ExecutionMode, &[1, LOCAL_SIZE, 8, 4, 1])
        .op(Op::Source, &[SOURCE_GLSL, 450])
        .op_str(Op::Name, &[1], "main", &[])
        .op_str(Op::Name, &[6], "Buf", &[])
        .op_str(Op::Name, &[8], "buf", &[])
        .op_str(Op::MemberName, &[6, 0], "data", &[])
        .op(Op::Decorate, &[5, ARRAY_STRIDE, 4])
        .op(Op::Decorate, &[6, BLOCK])
        .op(Op::Decorate, &[8, BINDING, 1])
        .op(Op::Decorate, &[8, DESCRIPTOR_SET, 0])
        .op(Op::Decorate, &[12, BUILT_IN, GLOBAL_INVOCATION_ID])
        .op(Op::MemberDecorate, &[6, 0, OFFSET, 0])
        .op(Op::TypeVoid, &[2])
        .op(Op::TypeFunction, &[3, 2])
        .op(Op::TypeFloat, &[4, 32])
        .op(Op::TypeRuntimeArray, &[5, 4])
        .op(Op::TypeStruct, &[6, 5])
        .op(Op::TypePointer, &[7, STORAGE_BUFFER, 6])
        .op(Op::Variable, &[7, 8, STORAGE_BUFFER])
        .op(Op::TypeInt, &[9, 32, 0])
        .op(Op::TypeVector, &[10, 9, 3])
        .op(Op::TypePointer, &[11, INPUT, 10])
        .op(Op::Variable, &[11, 12, INPUT])
        .op(Op::TypeInt, &[13, 32, 1])
        .op(Op::Constant, &[13, 14, 0])
        .op(Op::TypePointer, &[15, STORAGE_BUFFER, 4])
        .op(Op::Constant, &[4, 16, 0x4000_0000])
        .op(Op::Function, &[2, 1, 0, 3])
        .op(Op::Label, &[17])
        .op(Op::Load, &[10, 18, 12])
        .op(Op::CompositeExtract, &[9, 19, 18, 0])
        .op(Op::AccessChain, &[15, 20, 8, 14, 19])
        .op(Op::Load, &[4, 21, 20])
        .op(Op::FMul, &[4, 22, 21, 16])
        .op(Op::Store, &[20, 22])
        .op(Op::Return, &[])
        .op(Op::FunctionEnd, &[])
        .finish()
}

/// A fragment shader touching one resource of most categories.
///
/// The uniform block is `{ vec4 tint; mat4 transform; float weights[4]; }`
/// at offsets 0, 16 and 80; its `tint` and `weights` members are accessed.
/// A separate image and sampler are combined with `OpSampledImage`, and
/// the image's mip levels are queried directly.
pub fn fragment_shader() -> Vec<u32> {
    Builder::new(0x10000, 50)
        .op(Op::Capability, &[SHADER])
        .op(Op::Capability, &[IMAGE_QUERY])
        .op(Op::MemoryModel, &[LOGICAL, GLSL450])
        .op_str(Op::EntryPoint, &[FRAGMENT, 1], "main", &[25, 27, 48])
        .op(Op::ExecutionMode, &[1, ORIGIN_UPPER_LEFT])
        .op_str(Op::Name, &[1], "main", &[])
        .op_str(Op::Name, &[10], "UBO", &[])
        .op_str(Op::Name, &[12], "ubo", &[])
        .op_str(Op::Name, &[13], "Push", &[])
        .op_str(Op::Name, &[15], "pc", &[])
        .op_str(Op::Name, &[18], "tex", &[])
        .op_str(Op::Name, &[21], "samp", &[])
        .op_str(Op::Name, &[25], "uv", &[])
        .op_str(Op::Name, &[27], "color", &[])
        .op_str(Op::Name, &[28], "scale", &[])
        .op_str(Op::Name, &[46], "storage", &[])
        .op_str(Op::MemberName, &[10, 0], "tint", &[])
        .op_str(Op::MemberName, &[10, 1], "transform", &[])
        .op_str(Op::MemberName, &[10, 2], "weights", &[])
        .op_str(Op::MemberName, &[13, 0], "exposure", &[])
        .op(Op::Decorate, &[9, ARRAY_STRIDE, 16])
        .op(Op::Decorate, &[10, BLOCK])
        .op(Op::Decorate, &[12, BINDING, 0])
        .op(Op::Decorate, &[12, DESCRIPTOR_SET, 0])
        .op(Op::Decorate, &[13, BLOCK])
        .op(Op::Decorate, &[18, BINDING, 1])
        .op(Op::Decorate, &[18, DESCRIPTOR_SET, 0])
        .op(Op::Decorate, &[21, BINDING, 2])
        .op(Op::Decorate, &[21, DESCRIPTOR_SET, 0])
        .op(Op::Decorate, &[25, LOCATION, 1])
        .op(Op::Decorate, &[27, LOCATION, 0])
        .op(Op::Decorate, &[28, SPEC_ID, 7])
        .op(Op::Decorate, &[46, BINDING, 3])
        .op(Op::Decorate, &[46, DESCRIPTOR_SET, 0])
        .op(Op::Decorate, &[48, BUILT_IN, FRAG_COORD])
        .op(Op::MemberDecorate, &[10, 0, OFFSET, 0])
        .op(Op::MemberDecorate, &[10, 1, COL_MAJOR])
        .op(Op::MemberDecorate, &[10, 1, MATRIX_STRIDE, 16])
        .op(Op::MemberDecorate, &[10, 1, OFFSET, 16])
        .op(Op::MemberDecorate, &[10, 2, OFFSET, 80])
        .op(Op::MemberDecorate, &[13, 0, OFFSET, 0])
        .op(Op::TypeVoid, &[2])
        .op(Op::TypeFunction, &[3, 2])
        .op(Op::TypeFloat, &[4, 32])
        .op(Op::TypeVector, &[5, 4, 4])
        .op(Op::TypeMatrix, &[6, 5, 4])
        .op(Op::TypeInt, &[7, 32, 0])
        .op(Op::Constant, &[7, 8, 4])
        .op(Op::TypeArray, &[9, 4, 8])
        .op(Op::TypeStruct, &[10, 5, 6, 9])
        .op(Op::TypePointer, &[11, UNIFORM, 10])
        .op(Op::Variable, &[11, 12, UNIFORM])
        .op(Op::TypeStruct, &[13, 4])
        .op(Op::TypePointer, &[14, PUSH_CONSTANT, 13])
        .op(Op::Variable, &[14, 15, PUSH_CONSTANT])
        .op(Op::TypeImage, &[16, 4, 1, 0, 0, 0, 1, 0])
        .op(Op::TypePointer, &[17, UNIFORM_CONSTANT, 16])
        .op(Op::Variable, &[17, 18, UNIFORM_CONSTANT])
        .op(Op::TypeSampler, &[19])
        .op(Op::TypePointer, &[20, UNIFORM_CONSTANT, 19])
        .op(Op::Variable, &[20, 21, UNIFORM_CONSTANT])
        .op(Op::TypeSampledImage, &[22, 16])
        .op(Op::TypeVector, &[23, 4, 2])
        .op(Op::TypePointer, &[24, INPUT, 23])
        .op(Op::Variable, &[24, 25, INPUT])
        .op(Op::TypePointer, &[26, OUTPUT, 5])
        .op(Op::Variable, &[26, 27, OUTPUT])
        .op(Op::SpecConstant, &[7, 28, 1])
        .op(Op::TypeInt, &[35, 32, 1])
        .op(Op::Constant, &[35, 36, 0])
        .op(Op::Constant, &[35, 37, 2])
        .op(Op::TypePointer, &[38, UNIFORM, 5])
        .op(Op::TypePointer, &[39, UNIFORM, 9])
        .op(Op::TypeImage, &[44, 4, 1, 0, 0, 0, 2, 4])
        .op(Op::TypePointer, &[45, UNIFORM_CONSTANT, 44])
        .op(Op::Variable, &[45, 46, UNIFORM_CONSTANT])
        .op(Op::TypePointer, &[47, INPUT, 5])
        .op(Op::Variable, &[47, 48, INPUT])
        .op(Op::Function, &[2, 1, 0, 3])
        .op(Op::Label, &[29])
        .op(Op::Load, &[16, 30, 18])
        .op(Op::Load, &[19, 31, 21])
        .op(Op::SampledImage, &[22, 32, 30, 31])
        .op(Op::Load, &[23, 33, 25])
        .op(Op::ImageSampleImplicitLod, &[5, 34, 32, 33])
        .op(Op::AccessChain, &[38, 40, 12, 36])
        .op(Op::Load, &[5, 41, 40])
        .op(Op::AccessChain, &[39, 42, 12, 37])
        .op(Op::ImageQueryLevels, &[35, 49, 30])
        .op(Op::FAdd, &[5, 43, 34, 41])
        .op(Op::Store, &[27, 43])
        .op(Op::Return, &[])
        .op(Op::FunctionEnd, &[])
        .finish()
}

/// A vertex shader passing its location 0 input straight to `gl_Position`.
pub fn vertex_shader() -> Vec<u32> {
    Builder::new(0x10000, 12)
        .op(Op::Capability, &[SHADER])
        .op(Op::MemoryModel, &[LOGICAL, GLSL450])
        .op_str(Op::EntryPoint, &[VERTEX, 1], "main", &[7, 9])
        .op_str(Op::Name, &[1], "main", &[])
        .op_str(Op::Name, &[7], "position", &[])
        .op(Op::Decorate, &[7, LOCATION, 0])
        .op(Op::Decorate, &[9, BUILT_IN, POSITION])
        .op(Op::TypeVoid, &[2])
        .op(Op::TypeFunction, &[3, 2])
        .op(Op::TypeFloat, &[4, 32])
        .op(Op::TypeVector, &[5, 4, 4])
        .op(Op::TypePointer, &[6, INPUT, 5])
        .op(Op::Variable, &[6, 7, INPUT])
        .op(Op::TypePointer, &[8, OUTPUT, 5])
        .op(Op::Variable, &[8, 9, OUTPUT])
        .op(Op::Function, &[2, 1, 0, 3])
        .op(Op::Label, &[10])
        .op(Op::Load, &[5, 11, 7])
        .op(Op::Store, &[9, 11])
        .op(Op::Return, &[])
        .op(Op::FunctionEnd, &[])
        .finish()
}

/// A compute shader whose workgroup size comes from a `WorkgroupSize`
/// built-in made of spec constants 0 and 1 (defaults 16 and 2) and a plain 1.
pub fn workgroup_builtin_shader() -> Vec<u32> {
    Builder::new(0x10000, 11)
        .op(Op::Capability, &[SHADER])
        .op(Op::MemoryModel, &[LOGICAL, GLSL450])
        .op_str(Op::EntryPoint, &[GL_COMPUTE, 1], "main", &[])
        .op(Op::ExecutionMode, &[1, LOCAL_SIZE, 1, 1, 1])
        .op(Op::Decorate, &[5, SPEC_ID, 0])
        .op(Op::Decorate, &[6, SPEC_ID, 1])
        .op(Op::Decorate, &[8, BUILT_IN, WORKGROUP_SIZE])
        .op(Op::TypeVoid, &[2])
        .op(Op::TypeFunction, &[3, 2])
        .op(Op::TypeInt, &[4, 32, 0])
        .op(Op::SpecConstant, &[4, 5, 16])
        .op(Op::SpecConstant, &[4, 6, 2])
        .op(Op::Constant, &[4, 7, 1])
        .op(Op::TypeVector, &[9, 4, 3])
        .op(Op::SpecConstantComposite, &[9, 8, 5, 6, 7])
        .op(Op::Function, &[2, 1, 0, 3])
        .op(Op::Label, &[10])
        .op(Op::Return, &[])
        .op(Op::FunctionEnd, &[])
        .finish()
}

/// A compute shader sized by `LocalSizeId` as `(1, 8 + 1, 1)`, where the Y
/// dimension is an `OpSpecConstantOp` over spec constant 0.
pub fn local_size_id_shader() -> Vec<u32> {
    const IADD: u32 = 128;
    Builder::new(0x10200, 9)
        .op(Op::Capability, &[SHADER])
        .op(Op::MemoryModel, &[LOGICAL, GLSL450])
        .op_str(Op::EntryPoint, &[GL_COMPUTE, 1], "main", &[])
        .op(Op::ExecutionModeId, &[1, LOCAL_SIZE_ID, 5, 7, 5])
        .op(Op::Decorate, &[6, SPEC_ID, 0])
        .op(Op::TypeVoid, &[2])
        .op(Op::TypeFunction, &[3, 2])
        .op(Op::TypeInt, &[4, 32, 0])
        .op(Op::Constant, &[4, 5, 1])
        .op(Op::SpecConstant, &[4, 6, 8])
        .op(Op::SpecConstantOp, &[4, 7, IADD, 6, 5])
        .op(Op::Function, &[2, 1, 0, 3])
        .op(Op::Label, &[8])
        .op(Op::Return, &[])
        .op(Op::FunctionEnd, &[])
        .finish()
}

/// Two samplers at binding 3 through a decoration group.
pub fn decoration_group_shader() -> Vec<u32> {
    Builder::new(0x10000, 6)
        .op(Op::Capability, &[SHADER])
        .op(Op::MemoryModel, &[LOGICAL, GLSL450])
        .op(Op::Decorate, &[1, BINDING, 3])
        .op(Op::DecorationGroup, &[1])
        .op(Op::GroupDecorate, &[1, 4, 5])
        .op(Op::TypeSampler, &[2])
        .op(Op::TypePointer, &[3, UNIFORM_CONSTANT, 2])
        .op(Op::Variable, &[3, 4, UNIFORM_CONSTANT])
        .op(Op::Variable, &[3, 5, UNIFORM_CONSTANT])
        .finish()
}

/// Little-endian bytes of `words`.
pub fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}
