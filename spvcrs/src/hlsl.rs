//! HLSL emission

use crate::compiler::Compiler;
use crate::lower::ClipSpace;
use crate::{Error, Result};
use naga::back::hlsl;
use spirv::Decoration;
use std::ops::{Deref, DerefMut};

/// Options of the HLSL backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlslOptions {
    /// Shader model times ten, e.g. 50 for 5.0
    pub shader_model: u32,
    /// Not supported by this backend; setting it fails the compile
    pub vertex_transform_clip_space: bool,
    pub vertex_invert_y: bool,
    /// Give resources without a binding a made-up register instead of
    /// failing
    pub fake_missing_bindings: bool,
}

impl Default for HlslOptions {
    fn default() -> Self {
        HlslOptions {
            shader_model: 50,
            vertex_transform_clip_space: false,
            vertex_invert_y: false,
            fake_missing_bindings: true,
        }
    }
}

/// Byte range of the push constant block placed in one root constant
/// register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RootConstant {
    pub start: u32,
    pub end: u32,
    pub binding: u32,
    pub space: u32,
}

fn shader_model(code: u32) -> Result<hlsl::ShaderModel> {
    use hlsl::ShaderModel::*;
    Ok(match code {
        50 => V5_0,
        51 => V5_1,
        60 => V6_0,
        61 => V6_1,
        62 => V6_2,
        63 => V6_3,
        64 => V6_4,
        65 => V6_5,
        66 => V6_6,
        67 => V6_7,
        other => return Err(Error::Unsupported(format!("HLSL shader model {other}"))),
    })
}

/// Compiles SPIR-V to HLSL.
#[derive(Debug, Clone)]
pub struct HlslCompiler {
    compiler: Compiler,
    options: HlslOptions,
    root_constants: Vec<RootConstant>,
}

impl Deref for HlslCompiler {
    type Target = Compiler;

    fn deref(&self) -> &Compiler {
        &self.compiler
    }
}

impl DerefMut for HlslCompiler {
    fn deref_mut(&mut self) -> &mut Compiler {
        &mut self.compiler
    }
}

impl HlslCompiler {
    pub fn new(words: &[u32]) -> Result<Self> {
        Ok(Self::from_compiler(Compiler::new(words)?))
    }

    pub fn from_compiler(compiler: Compiler) -> Self {
        HlslCompiler {
            compiler,
            options: HlslOptions::default(),
            root_constants: Vec::new(),
        }
    }

    pub fn options(&self) -> &HlslOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: HlslOptions) {
        self.options = options;
    }

    /// Places the push constant block in root constants. At most one range
    /// is supported.
    pub fn set_root_constant_layout(&mut self, layout: Vec<RootConstant>) {
        self.root_constants = layout;
    }

    pub fn root_constant_layout(&self) -> &[RootConstant] {
        &self.root_constants
    }

    pub fn compile(&mut self) -> Result<String> {
        let options = self.options.clone();
        let shader_model = shader_model(options.shader_model)?;
        let module = self.compiler.backend_module()?;
        let lowered = self.compiler.lower(
            &module,
            ClipSpace {
                invert_y: options.vertex_invert_y,
                remap_depth: options.vertex_transform_clip_space,
            },
        )?;

        let has_push_constants = lowered
            .module
            .global_variables
            .iter()
            .any(|(_, var)| var.space == naga::AddressSpace::PushConstant);
        let push_constants_target = if has_push_constants {
            Some(self.push_constants_target()?)
        } else {
            None
        };
        let hlsl_options = hlsl::Options {
            shader_model,
            fake_missing_bindings: options.fake_missing_bindings,
            push_constants_target,
            ..Default::default()
        };

        let emit = |e: hlsl::Error| Error::Emit {
            dialect: "HLSL",
            message: e.to_string(),
        };
        let mut source = String::new();
        let reflection = hlsl::Writer::new(&mut source, &hlsl_options)
            .write(&lowered.module, &lowered.info)
            .map_err(emit)?;
        if let Some(Ok(name)) = reflection.entry_point_names.into_iter().next() {
            self.compiler
                .set_cleansed_name(&lowered.entry_point, lowered.model, name);
        }
        log::debug!("emitted {} bytes of HLSL", source.len());
        Ok(source)
    }

    /// The register the push constant block is bound to: the root constant
    /// range if one was given, otherwise the first constant buffer register
    /// after the uniform buffers of descriptor set 0.
    fn push_constants_target(&self) -> Result<hlsl::BindTarget> {
        match self.root_constants.as_slice() {
            [] => {
                let resources = self.compiler.get_shader_resources()?;
                let register = resources
                    .uniform_buffers
                    .iter()
                    .filter(|r| self.get_decoration(r.id, Decoration::DescriptorSet as u32) == 0)
                    .map(|r| self.get_decoration(r.id, Decoration::Binding as u32) + 1)
                    .max()
                    .unwrap_or(0);
                Ok(hlsl::BindTarget {
                    space: 0,
                    register,
                    binding_array_size: None,
                })
            }
            [root] => {
                let space = u8::try_from(root.space).map_err(|_| {
                    Error::Unsupported(format!("root constant space {}", root.space))
                })?;
                Ok(hlsl::BindTarget {
                    space,
                    register: root.binding,
                    binding_array_size: None,
                })
            }
            _ => Err(Error::Unsupported(
                "more than one root constant range".into(),
            )),
        }
    }
}
