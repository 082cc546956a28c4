//! Shader resources, interface variables and buffer usage

use super::analysis::{is_interface_storage, pointer_operands, producers};
use super::{BaseType, Compiler, TypeInfo};
use crate::ir::{TypeDecl, VariableDecl};
use crate::{Error, Result};
use spirv::{Decoration, Dim, Op, StorageClass};
use std::collections::{BTreeSet, HashSet};

/// A resource variable as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// The variable
    pub id: u32,
    /// Its pointer type
    pub type_id: u32,
    /// The type it resolves to with arrays and pointers stripped
    pub base_type_id: u32,
    pub name: String,
}

/// Resources of the current entry point, grouped by how they are bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderResources {
    pub uniform_buffers: Vec<Resource>,
    pub storage_buffers: Vec<Resource>,
    pub stage_inputs: Vec<Resource>,
    pub stage_outputs: Vec<Resource>,
    pub subpass_inputs: Vec<Resource>,
    pub storage_images: Vec<Resource>,
    pub sampled_images: Vec<Resource>,
    pub atomic_counters: Vec<Resource>,
    pub push_constant_buffers: Vec<Resource>,
    pub separate_images: Vec<Resource>,
    pub separate_samplers: Vec<Resource>,
}

/// Byte range of one struct member a shader actually accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRange {
    pub index: u32,
    pub offset: usize,
    pub range: usize,
}

/// An image and sampler a backend must combine into one sampled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombinedImageSampler {
    pub combined_id: u32,
    pub image_id: u32,
    pub sampler_id: u32,
}

const DUMMY_SAMPLER_NAME: &str = "SPIRV_Cross_DummySampler";

impl Compiler {
    /// Resources of the current entry point, in declaration order.
    pub fn get_shader_resources(&self) -> Result<ShaderResources> {
        self.shader_resources(None)
    }

    /// Like [`Compiler::get_shader_resources`] but keeps only variables in
    /// `active`.
    pub fn get_shader_resources_for_vars(&self, active: &HashSet<u32>) -> Result<ShaderResources> {
        self.shader_resources(Some(active))
    }

    fn shader_resources(&self, active: Option<&HashSet<u32>>) -> Result<ShaderResources> {
        let mut res = ShaderResources::default();
        for id in &self.module.global_variables {
            let Some(var) = self.module.variables.get(id) else {
                continue;
            };
            let info = self.get_type(var.type_id)?;
            if var.storage == StorageClass::Function || !info.pointer {
                continue;
            }
            if active.is_some_and(|active| !active.contains(id)) {
                continue;
            }
            let io = matches!(var.storage, StorageClass::Input | StorageClass::Output);
            let checked = io || self.module.version() >= 0x10400;
            if checked && !self.interface_variable_exists_in_entry_point(var)? {
                continue;
            }

            let resource = |name: String| Resource {
                id: var.id,
                type_id: var.type_id,
                base_type_id: info.self_id,
                name,
            };
            let is_block = |decoration: Decoration| {
                self.has_decoration(info.self_id, decoration as u32)
            };
            let interface_name = || -> Result<String> {
                if is_block(Decoration::Block) {
                    self.get_remapped_declared_block_name(var.id)
                } else {
                    Ok(self.get_name(var.id))
                }
            };
            let image = info.image.filter(|_| info.base_type == BaseType::Image);
            let uniform_constant = info.storage == StorageClass::UniformConstant;
            if uniform_constant && self.remapped_variables.contains(id) {
                continue;
            }

            match info.storage {
                StorageClass::Input => {
                    if !self.is_builtin_variable(var, &info) {
                        res.stage_inputs.push(resource(interface_name()?));
                    }
                }
                StorageClass::Output => {
                    if !self.is_builtin_variable(var, &info) {
                        res.stage_outputs.push(resource(interface_name()?));
                    }
                }
                _ if uniform_constant && info.image.is_some_and(|i| i.dim == Dim::DimSubpassData) => {
                    res.subpass_inputs.push(resource(self.get_name(var.id)));
                }
                _ if uniform_constant && image.is_some_and(|i| i.sampled == 2) => {
                    res.storage_images.push(resource(self.get_name(var.id)));
                }
                _ if uniform_constant && image.is_some_and(|i| i.sampled == 1) => {
                    res.separate_images.push(resource(self.get_name(var.id)));
                }
                _ if uniform_constant && info.base_type == BaseType::Sampler => {
                    res.separate_samplers.push(resource(self.get_name(var.id)));
                }
                _ if uniform_constant && info.base_type == BaseType::SampledImage => {
                    res.sampled_images.push(resource(self.get_name(var.id)));
                }
                StorageClass::AtomicCounter => {
                    res.atomic_counters.push(resource(self.get_name(var.id)));
                }
                StorageClass::PushConstant => {
                    res.push_constant_buffers.push(resource(self.get_name(var.id)));
                }
                StorageClass::Uniform if is_block(Decoration::Block) => {
                    res.uniform_buffers
                        .push(resource(self.get_remapped_declared_block_name(var.id)?));
                }
                StorageClass::Uniform if is_block(Decoration::BufferBlock) => {
                    res.storage_buffers
                        .push(resource(self.get_remapped_declared_block_name(var.id)?));
                }
                StorageClass::StorageBuffer => {
                    res.storage_buffers
                        .push(resource(self.get_remapped_declared_block_name(var.id)?));
                }
                _ => {}
            }
        }
        Ok(res)
    }

    fn is_builtin_variable(&self, var: &VariableDecl, info: &TypeInfo) -> bool {
        let builtin = Decoration::BuiltIn as u32;
        if self.has_decoration(var.id, builtin) {
            return true;
        }
        info.base_type == BaseType::Struct
            && (0..info.member_types.len() as u32)
                .any(|index| self.has_member_decoration(info.self_id, index, builtin))
    }

    pub(crate) fn interface_variable_exists_in_entry_point(
        &self,
        var: &VariableDecl,
    ) -> Result<bool> {
        if self.module.synthetic.contains(&var.id) {
            return Ok(true);
        }
        if self.module.version() < 0x10400 && self.module.entry_points.len() <= 1 {
            return Ok(true);
        }
        Ok(self.current_entry()?.interface.contains(&var.id))
    }

    /// Interface variables statically used by the current entry point.
    ///
    /// Outputs with an initializer count as used even if never written.
    pub fn get_active_interface_variables(&self) -> Result<HashSet<u32>> {
        let mut variables = HashSet::new();
        for inst in self.reachable_instructions()? {
            for id in pointer_operands(inst) {
                let interface = self
                    .module
                    .variables
                    .get(&id)
                    .is_some_and(|var| is_interface_storage(var.storage));
                if interface {
                    variables.insert(id);
                }
            }
        }
        for id in &self.module.global_variables {
            let Some(var) = self.module.variables.get(id) else {
                continue;
            };
            if var.storage == StorageClass::Output
                && var.initializer.is_some()
                && self.interface_variable_exists_in_entry_point(var)?
            {
                variables.insert(var.id);
            }
        }
        variables.extend(self.dummy_sampler);
        Ok(variables)
    }

    /// Restricts backend output to the stage inputs and outputs in
    /// `variables`. Interface variables outside the set that the entry point
    /// never uses are dropped from the emitted code.
    pub fn set_enabled_interface_variables(&mut self, variables: HashSet<u32>) {
        self.enabled_interface = Some(variables);
    }

    /// Members of block variable `id` that the current entry point accesses,
    /// sorted by member index.
    pub fn get_active_buffer_ranges(&self, id: u32) -> Result<Vec<BufferRange>> {
        let var = self.variable(id)?;
        let info = self.get_type(var.type_id)?;
        if info.base_type != BaseType::Struct || info.member_types.is_empty() {
            return Ok(Vec::new());
        }
        let block = info.self_id;
        let mut seen = BTreeSet::new();
        for inst in self.reachable_instructions()? {
            let index_operand = match inst.op() {
                Some(Op::AccessChain | Op::InBoundsAccessChain) => 3,
                Some(Op::PtrAccessChain | Op::InBoundsPtrAccessChain) => 4,
                _ => continue,
            };
            if inst.operand(2) != Some(id) {
                continue;
            }
            let Some(index) = inst
                .operand(index_operand)
                .and_then(|c| self.module.constants.get(&c))
                .and_then(|c| c.scalar())
            else {
                continue;
            };
            seen.insert(index);
        }

        let mut ranges = Vec::with_capacity(seen.len());
        for index in seen {
            let offset = self.type_struct_member_offset(block, index)? as usize;
            let range = if (index as usize + 1) < info.member_types.len() {
                let next = self.type_struct_member_offset(block, index + 1)? as usize;
                next.saturating_sub(offset)
            } else {
                self.get_declared_struct_member_size(block, index)?
            };
            ranges.push(BufferRange {
                index,
                offset,
                range,
            });
        }
        Ok(ranges)
    }

    /// Image and sampler pairs found by the last
    /// [`Compiler::build_combined_image_samplers`].
    pub fn get_combined_image_samplers(&self) -> &[CombinedImageSampler] {
        &self.combined_image_samplers
    }

    /// Finds every image and sampler the current entry point combines and
    /// assigns each pair a new variable id.
    pub fn build_combined_image_samplers(&mut self) -> Result<()> {
        let pairs = {
            let instructions = self.reachable_instructions()?;
            let producers = producers(&instructions);
            let mut pairs: Vec<(u32, u32, u32)> = Vec::new();
            for inst in &instructions {
                let found = match inst.op() {
                    Some(Op::SampledImage) => {
                        let image = inst.operand(2).and_then(|v| self.backing_variable(&producers, v));
                        let sampler = inst.operand(3).and_then(|v| self.backing_variable(&producers, v));
                        image.zip(sampler).zip(inst.operand(0))
                    }
                    Some(op) if needs_sampler(op) => {
                        let image = inst.operand(2).and_then(|v| self.backing_variable(&producers, v));
                        match (image, self.dummy_sampler) {
                            (Some(image), Some(dummy)) if self.is_separate_image(image) => {
                                Some(((image, dummy), 0))
                            }
                            _ => None,
                        }
                    }
                    _ => None,
                };
                if let Some(((image, sampler), sampled_type)) = found {
                    if !pairs.iter().any(|&(i, s, _)| i == image && s == sampler) {
                        pairs.push((image, sampler, sampled_type));
                    }
                }
            }
            pairs
        };

        self.combined_image_samplers.clear();
        for (image_id, sampler_id, sampled_type) in pairs {
            let sampled_type = match sampled_type {
                0 => self.sampled_image_type_for(image_id)?,
                id => id,
            };
            let type_id = self.module.allocate_ids(2)?;
            let combined_id = type_id + 1;
            self.module.types.insert(
                type_id,
                TypeDecl::Pointer {
                    storage: StorageClass::UniformConstant,
                    pointee: sampled_type,
                },
            );
            self.module.variables.insert(
                combined_id,
                VariableDecl {
                    id: combined_id,
                    type_id,
                    storage: StorageClass::UniformConstant,
                    initializer: None,
                },
            );
            self.module.synthetic.extend([type_id, combined_id]);
            self.combined_image_samplers.push(CombinedImageSampler {
                combined_id,
                image_id,
                sampler_id,
            });
        }
        log::debug!(
            "found {} combined image samplers",
            self.combined_image_samplers.len()
        );
        Ok(())
    }

    /// Creates a sampler variable to pair with images that are fetched or
    /// queried without one. Returns its id, or 0 if no image needs it.
    pub fn build_dummy_sampler_for_combined_images(&mut self) -> Result<u32> {
        let needed = {
            let instructions = self.reachable_instructions()?;
            let producers = producers(&instructions);
            instructions.iter().any(|inst| {
                inst.op().is_some_and(needs_sampler)
                    && inst
                        .operand(2)
                        .and_then(|v| self.backing_variable(&producers, v))
                        .is_some_and(|var| self.is_separate_image(var))
            })
        };
        if !needed {
            return Ok(0);
        }
        if let Some(id) = self.dummy_sampler {
            return Ok(id);
        }

        let sampler_type = match self.find_type(|decl| *decl == TypeDecl::Sampler) {
            Some(id) => id,
            None => self.synthetic_type(TypeDecl::Sampler)?,
        };
        let pointer = TypeDecl::Pointer {
            storage: StorageClass::UniformConstant,
            pointee: sampler_type,
        };
        let pointer_type = match self.find_type(|decl| *decl == pointer) {
            Some(id) => id,
            None => self.synthetic_type(pointer)?,
        };
        let var = self.module.allocate_ids(1)?;
        self.module.variables.insert(
            var,
            VariableDecl {
                id: var,
                type_id: pointer_type,
                storage: StorageClass::UniformConstant,
                initializer: None,
            },
        );
        self.module.global_variables.push(var);
        self.module.synthetic.insert(var);
        self.set_name(var, DUMMY_SAMPLER_NAME);
        self.dummy_sampler = Some(var);
        log::debug!("created dummy sampler {var}");
        Ok(var)
    }

    fn is_separate_image(&self, var: u32) -> bool {
        let Some(var) = self.module.variables.get(&var) else {
            return false;
        };
        self.get_type(var.type_id).is_ok_and(|info| {
            info.base_type == BaseType::Image
                && info
                    .image
                    .is_some_and(|i| i.sampled == 1 && i.dim != Dim::DimBuffer)
        })
    }

    /// Smallest id whose declaration matches, for a stable choice.
    fn find_type(&self, matches: impl Fn(&TypeDecl) -> bool) -> Option<u32> {
        self.module
            .types
            .iter()
            .filter(|(_, decl)| matches(decl))
            .map(|(&id, _)| id)
            .min()
    }

    fn synthetic_type(&mut self, decl: TypeDecl) -> Result<u32> {
        let id = self.module.allocate_ids(1)?;
        self.module.types.insert(id, decl);
        self.module.synthetic.insert(id);
        Ok(id)
    }

    fn sampled_image_type_for(&mut self, image_var: u32) -> Result<u32> {
        let var = self.variable(image_var)?;
        let info = self.get_type(var.type_id)?;
        let image = self.image_type_id(info.self_id)?;
        match self.find_type(|decl| *decl == TypeDecl::SampledImage { image }) {
            Some(id) => Ok(id),
            None => self.synthetic_type(TypeDecl::SampledImage { image }),
        }
    }

    fn image_type_id(&self, id: u32) -> Result<u32> {
        match self.module.types.get(&id) {
            Some(TypeDecl::Image(_)) => Ok(id),
            _ => Err(Error::invalid_id(id, "not an image type")),
        }
    }
}

/// Image instructions that read an image without a sampler.
fn needs_sampler(op: Op) -> bool {
    matches!(
        op,
        Op::ImageFetch
            | Op::ImageQuerySizeLod
            | Op::ImageQuerySize
            | Op::ImageQueryLevels
            | Op::ImageQuerySamples
    )
}
