//! `#[repr(C)]` mirrors of the backend options and their compile inputs

#[cfg(any(feature = "glsl", feature = "hlsl", feature = "msl"))]
use crate::{Error, Result};
use std::mem::size_of;

#[cfg(feature = "glsl")]
use spvcrs::{GlslFragmentOptions, GlslOptions, GlslVertexOptions, Precision};
#[cfg(feature = "hlsl")]
use spvcrs::{HlslOptions, RootConstant};
#[cfg(feature = "msl")]
use crate::exports::execution_model;
#[cfg(feature = "msl")]
use spvcrs::{MslOptions, MslResourceBinding, MslVertexAttr};

/// Default precision codes of [`ScGlslFragmentOptions`]
pub const SC_PRECISION_DONT_CARE: u32 = 0;
pub const SC_PRECISION_LOWP: u32 = 1;
pub const SC_PRECISION_MEDIUMP: u32 = 2;
pub const SC_PRECISION_HIGHP: u32 = 3;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScGlslVertexOptions {
    pub fixup_clipspace: bool,
    pub flip_vert_y: bool,
    pub support_nonzero_base_instance: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScGlslFragmentOptions {
    pub default_float_precision: u32,
    pub default_int_precision: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScOptionsGlsl {
    pub version: u32,
    pub es: bool,
    pub force_temporary: bool,
    pub vulkan_semantics: bool,
    pub separate_shader_objects: bool,
    pub flatten_multidimensional_arrays: bool,
    pub enable_420pack_extension: bool,
    pub vertex: ScGlslVertexOptions,
    pub fragment: ScGlslFragmentOptions,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScOptionsHlsl {
    pub shader_model: u32,
    pub vertex_transform_clip_space: bool,
    pub vertex_invert_y: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScHlslRootConstant {
    pub start: u32,
    pub end: u32,
    pub binding: u32,
    pub space: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScOptionsMsl {
    pub version_major: u32,
    pub version_minor: u32,
    pub vertex_transform_clip_space: bool,
    pub vertex_invert_y: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScMslVertexAttr {
    pub location: u32,
    pub msl_buffer: u32,
    pub msl_offset: u32,
    pub msl_stride: u32,
    pub per_instance: bool,
    /// Written back by `sc_compiler_msl_compile`
    pub used_by_shader: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScMslResourceBinding {
    /// SPIR-V `ExecutionModel` code
    pub stage: u32,
    pub desc_set: u32,
    pub binding: u32,
    pub msl_buffer: u32,
    pub msl_texture: u32,
    pub msl_sampler: u32,
    /// Written back by `sc_compiler_msl_compile`
    pub used_by_shader: bool,
}

const _: () = {
    assert!(size_of::<ScGlslVertexOptions>() == 3);
    assert!(size_of::<ScGlslFragmentOptions>() == 8);
    assert!(size_of::<ScOptionsGlsl>() == 24);
    assert!(size_of::<ScOptionsHlsl>() == 8);
    assert!(size_of::<ScHlslRootConstant>() == 16);
    assert!(size_of::<ScOptionsMsl>() == 12);
    assert!(size_of::<ScMslVertexAttr>() == 20);
    assert!(size_of::<ScMslResourceBinding>() == 28);
};

#[cfg(feature = "glsl")]
fn precision_code(precision: Precision) -> u32 {
    match precision {
        Precision::DontCare => SC_PRECISION_DONT_CARE,
        Precision::Low => SC_PRECISION_LOWP,
        Precision::Medium => SC_PRECISION_MEDIUMP,
        Precision::High => SC_PRECISION_HIGHP,
    }
}

#[cfg(feature = "glsl")]
fn precision(code: u32) -> Result<Precision> {
    match code {
        SC_PRECISION_DONT_CARE => Ok(Precision::DontCare),
        SC_PRECISION_LOWP => Ok(Precision::Low),
        SC_PRECISION_MEDIUMP => Ok(Precision::Medium),
        SC_PRECISION_HIGHP => Ok(Precision::High),
        code => Err(Error::InvalidCode {
            kind: "precision",
            code,
        }),
    }
}

#[cfg(feature = "glsl")]
impl From<&GlslOptions> for ScOptionsGlsl {
    fn from(options: &GlslOptions) -> Self {
        let GlslOptions {
            version,
            es,
            force_temporary,
            vulkan_semantics,
            separate_shader_objects,
            flatten_multidimensional_arrays,
            enable_420pack_extension,
            vertex:
                GlslVertexOptions {
                    fixup_clipspace,
                    flip_vert_y,
                    support_nonzero_base_instance,
                },
            fragment:
                GlslFragmentOptions {
                    default_float_precision,
                    default_int_precision,
                },
            force_point_size: _,
        } = options;
        ScOptionsGlsl {
            version: *version,
            es: *es,
            force_temporary: *force_temporary,
            vulkan_semantics: *vulkan_semantics,
            separate_shader_objects: *separate_shader_objects,
            flatten_multidimensional_arrays: *flatten_multidimensional_arrays,
            enable_420pack_extension: *enable_420pack_extension,
            vertex: ScGlslVertexOptions {
                fixup_clipspace: *fixup_clipspace,
                flip_vert_y: *flip_vert_y,
                support_nonzero_base_instance: *support_nonzero_base_instance,
            },
            fragment: ScGlslFragmentOptions {
                default_float_precision: precision_code(*default_float_precision),
                default_int_precision: precision_code(*default_int_precision),
            },
        }
    }
}

#[cfg(feature = "glsl")]
impl ScOptionsGlsl {
    /// Writes every mirrored field over `native`.
    pub(crate) fn apply(&self, native: &mut GlslOptions) -> Result<()> {
        let ScOptionsGlsl {
            version,
            es,
            force_temporary,
            vulkan_semantics,
            separate_shader_objects,
            flatten_multidimensional_arrays,
            enable_420pack_extension,
            vertex:
                ScGlslVertexOptions {
                    fixup_clipspace,
                    flip_vert_y,
                    support_nonzero_base_instance,
                },
            fragment:
                ScGlslFragmentOptions {
                    default_float_precision,
                    default_int_precision,
                },
        } = *self;
        let default_float_precision = precision(default_float_precision)?;
        let default_int_precision = precision(default_int_precision)?;
        native.version = version;
        native.es = es;
        native.force_temporary = force_temporary;
        native.vulkan_semantics = vulkan_semantics;
        native.separate_shader_objects = separate_shader_objects;
        native.flatten_multidimensional_arrays = flatten_multidimensional_arrays;
        native.enable_420pack_extension = enable_420pack_extension;
        native.vertex = GlslVertexOptions {
            fixup_clipspace,
            flip_vert_y,
            support_nonzero_base_instance,
        };
        native.fragment = GlslFragmentOptions {
            default_float_precision,
            default_int_precision,
        };
        Ok(())
    }
}

#[cfg(feature = "hlsl")]
impl From<&HlslOptions> for ScOptionsHlsl {
    fn from(options: &HlslOptions) -> Self {
        let HlslOptions {
            shader_model,
            vertex_transform_clip_space,
            vertex_invert_y,
            fake_missing_bindings: _,
        } = *options;
        ScOptionsHlsl {
            shader_model,
            vertex_transform_clip_space,
            vertex_invert_y,
        }
    }
}

#[cfg(feature = "hlsl")]
impl ScOptionsHlsl {
    pub(crate) fn apply(&self, native: &mut HlslOptions) {
        let ScOptionsHlsl {
            shader_model,
            vertex_transform_clip_space,
            vertex_invert_y,
        } = *self;
        native.shader_model = shader_model;
        native.vertex_transform_clip_space = vertex_transform_clip_space;
        native.vertex_invert_y = vertex_invert_y;
    }
}

#[cfg(feature = "hlsl")]
impl From<&ScHlslRootConstant> for RootConstant {
    fn from(root: &ScHlslRootConstant) -> Self {
        let ScHlslRootConstant {
            start,
            end,
            binding,
            space,
        } = *root;
        RootConstant {
            start,
            end,
            binding,
            space,
        }
    }
}

#[cfg(feature = "msl")]
impl From<&MslOptions> for ScOptionsMsl {
    fn from(options: &MslOptions) -> Self {
        let MslOptions {
            version_major,
            version_minor,
            vertex_transform_clip_space,
            vertex_invert_y,
            fake_missing_bindings: _,
        } = *options;
        ScOptionsMsl {
            version_major,
            version_minor,
            vertex_transform_clip_space,
            vertex_invert_y,
        }
    }
}

#[cfg(feature = "msl")]
impl ScOptionsMsl {
    pub(crate) fn apply(&self, native: &mut MslOptions) {
        let ScOptionsMsl {
            version_major,
            version_minor,
            vertex_transform_clip_space,
            vertex_invert_y,
        } = *self;
        native.version_major = version_major;
        native.version_minor = version_minor;
        native.vertex_transform_clip_space = vertex_transform_clip_space;
        native.vertex_invert_y = vertex_invert_y;
    }
}

#[cfg(feature = "msl")]
impl From<&ScMslVertexAttr> for MslVertexAttr {
    fn from(attr: &ScMslVertexAttr) -> Self {
        let ScMslVertexAttr {
            location,
            msl_buffer,
            msl_offset,
            msl_stride,
            per_instance,
            used_by_shader,
        } = *attr;
        MslVertexAttr {
            location,
            msl_buffer,
            msl_offset,
            msl_stride,
            per_instance,
            used_by_shader,
        }
    }
}

#[cfg(feature = "msl")]
impl ScMslResourceBinding {
    pub(crate) fn to_native(&self) -> Result<MslResourceBinding> {
        let ScMslResourceBinding {
            stage,
            desc_set,
            binding,
            msl_buffer,
            msl_texture,
            msl_sampler,
            used_by_shader,
        } = *self;
        Ok(MslResourceBinding {
            stage: execution_model(stage)?,
            desc_set,
            binding,
            msl_buffer,
            msl_texture,
            msl_sampler,
            used_by_shader,
        })
    }
}
