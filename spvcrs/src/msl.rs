//! MSL emission

use crate::compiler::Compiler;
use crate::lower::ClipSpace;
use crate::{Error, Result};
use naga::back::msl;
use spirv::{Decoration, ExecutionModel, StorageClass};
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

/// Options of the MSL backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MslOptions {
    pub version_major: u32,
    pub version_minor: u32,
    /// Not supported by this backend; setting it fails the compile
    pub vertex_transform_clip_space: bool,
    pub vertex_invert_y: bool,
    /// Give resources without a slot a made-up one instead of failing
    pub fake_missing_bindings: bool,
}

impl Default for MslOptions {
    fn default() -> Self {
        MslOptions {
            version_major: 1,
            version_minor: 2,
            vertex_transform_clip_space: false,
            vertex_invert_y: false,
            fake_missing_bindings: true,
        }
    }
}

/// A vertex attribute the pipeline provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MslVertexAttr {
    pub location: u32,
    pub msl_buffer: u32,
    pub msl_offset: u32,
    pub msl_stride: u32,
    pub per_instance: bool,
    /// Set by [`MslCompiler::compile_with`] when a stage input reads it
    pub used_by_shader: bool,
}

/// Metal slots for the resource at a descriptor set and binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MslResourceBinding {
    pub stage: ExecutionModel,
    pub desc_set: u32,
    pub binding: u32,
    pub msl_buffer: u32,
    pub msl_texture: u32,
    pub msl_sampler: u32,
    /// Set by [`MslCompiler::compile_with`] when the entry point uses it
    pub used_by_shader: bool,
}

/// Compiles SPIR-V to MSL.
#[derive(Debug, Clone)]
pub struct MslCompiler {
    compiler: Compiler,
    options: MslOptions,
}

impl Deref for MslCompiler {
    type Target = Compiler;

    fn deref(&self) -> &Compiler {
        &self.compiler
    }
}

impl DerefMut for MslCompiler {
    fn deref_mut(&mut self) -> &mut Compiler {
        &mut self.compiler
    }
}

fn slot(value: u32, what: &str) -> Result<u8> {
    u8::try_from(value).map_err(|_| Error::Unsupported(format!("Metal {what} slot {value}")))
}

impl MslCompiler {
    pub fn new(words: &[u32]) -> Result<Self> {
        Ok(Self::from_compiler(Compiler::new(words)?))
    }

    pub fn from_compiler(compiler: Compiler) -> Self {
        MslCompiler {
            compiler,
            options: MslOptions::default(),
        }
    }

    pub fn options(&self) -> &MslOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: MslOptions) {
        self.options = options;
    }

    pub fn compile(&mut self) -> Result<String> {
        self.compile_with(&mut [], &mut [])
    }

    /// Compiles with explicit Metal slots for the resources in
    /// `resource_bindings` that belong to the current stage. Both lists get
    /// their `used_by_shader` flags updated.
    pub fn compile_with(
        &mut self,
        vertex_attrs: &mut [MslVertexAttr],
        resource_bindings: &mut [MslResourceBinding],
    ) -> Result<String> {
        let options = self.options.clone();
        let lang_version = (
            slot(options.version_major, "language version")?,
            slot(options.version_minor, "language version")?,
        );
        let model = self.compiler.execution_model()?;
        self.mark_used(model, vertex_attrs, resource_bindings)?;

        let mut resources = BTreeMap::new();
        for binding in resource_bindings.iter().filter(|b| b.stage == model) {
            let target = msl::BindTarget {
                buffer: Some(slot(binding.msl_buffer, "buffer")?),
                texture: Some(slot(binding.msl_texture, "texture")?),
                sampler: Some(msl::BindSamplerTarget::Resource(slot(
                    binding.msl_sampler,
                    "sampler",
                )?)),
                ..Default::default()
            };
            let key = naga::ResourceBinding {
                group: binding.desc_set,
                binding: binding.binding,
            };
            resources.insert(key, target);
        }

        let module = self.compiler.backend_module()?;
        let lowered = self.compiler.lower(
            &module,
            ClipSpace {
                invert_y: options.vertex_invert_y,
                remap_depth: options.vertex_transform_clip_space,
            },
        )?;
        let mut per_entry_point_map = BTreeMap::new();
        per_entry_point_map.insert(
            lowered.entry_point.clone(),
            msl::EntryPointResources {
                resources,
                ..Default::default()
            },
        );
        let msl_options = msl::Options {
            lang_version,
            per_entry_point_map,
            fake_missing_bindings: options.fake_missing_bindings,
            ..Default::default()
        };

        let (source, info) = msl::write_string(
            &lowered.module,
            &lowered.info,
            &msl_options,
            &msl::PipelineOptions::default(),
        )
        .map_err(|e| Error::Emit {
            dialect: "MSL",
            message: e.to_string(),
        })?;
        if let Some(Ok(name)) = info.entry_point_names.into_iter().next() {
            self.compiler
                .set_cleansed_name(&lowered.entry_point, lowered.model, name);
        }
        log::debug!("emitted {} bytes of MSL", source.len());
        Ok(source)
    }

    fn mark_used(
        &self,
        model: ExecutionModel,
        vertex_attrs: &mut [MslVertexAttr],
        resource_bindings: &mut [MslResourceBinding],
    ) -> Result<()> {
        let active = self.compiler.get_active_interface_variables()?;
        let location = Decoration::Location as u32;
        let set = Decoration::DescriptorSet as u32;
        let binding = Decoration::Binding as u32;
        let mut locations = Vec::new();
        let mut bound = Vec::new();
        for &id in &active {
            let Some(var) = self.compiler.module().variables.get(&id) else {
                continue;
            };
            if var.storage == StorageClass::Input && self.has_decoration(id, location) {
                locations.push(self.get_decoration(id, location));
            } else if self.has_decoration(id, binding) {
                bound.push((self.get_decoration(id, set), self.get_decoration(id, binding)));
            }
        }
        for attr in vertex_attrs.iter_mut() {
            attr.used_by_shader =
                model == ExecutionModel::Vertex && locations.contains(&attr.location);
        }
        for res in resource_bindings.iter_mut() {
            res.used_by_shader = res.stage == model && bound.contains(&(res.desc_set, res.binding));
        }
        Ok(())
    }
}
