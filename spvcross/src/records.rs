//! `#[repr(C)]` snapshots of reflection data

use crate::alloc::Allocator;
use crate::array::{ScArray, ScString};
use crate::Result;
use spvcrs::{
    BufferRange, CombinedImageSampler, EntryPoint, ImageInfo, Resource, ShaderResources,
    SpecializationConstant, TypeInfo, WorkgroupSize,
};
use std::mem::{align_of, offset_of, size_of};

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ScResource {
    pub id: u32,
    pub type_id: u32,
    pub base_type_id: u32,
    pub name: ScString,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ScShaderResources {
    pub uniform_buffers: ScArray<ScResource>,
    pub storage_buffers: ScArray<ScResource>,
    pub stage_inputs: ScArray<ScResource>,
    pub stage_outputs: ScArray<ScResource>,
    pub subpass_inputs: ScArray<ScResource>,
    pub storage_images: ScArray<ScResource>,
    pub sampled_images: ScArray<ScResource>,
    pub atomic_counters: ScArray<ScResource>,
    pub push_constant_buffers: ScArray<ScResource>,
    pub separate_images: ScArray<ScResource>,
    pub separate_samplers: ScArray<ScResource>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScWorkgroupSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ScEntryPoint {
    pub name: ScString,
    /// SPIR-V `ExecutionModel` code
    pub execution_model: u32,
    pub workgroup_size: ScWorkgroupSize,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScSpecializationConstant {
    pub id: u32,
    pub constant_id: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScBufferRange {
    pub index: u32,
    pub offset: usize,
    pub range: usize,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScCombinedImageSampler {
    pub combined_id: u32,
    pub image_id: u32,
    pub sampler_id: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScImageType {
    pub type_id: u32,
    /// SPIR-V `Dim` code
    pub dim: u32,
    pub depth: bool,
    pub arrayed: bool,
    pub ms: bool,
    pub sampled: u32,
    /// SPIR-V `ImageFormat` code
    pub format: u32,
    /// SPIR-V `AccessQualifier` code
    pub access: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ScType {
    pub base_type: u32,
    pub self_id: u32,
    pub width: u32,
    pub vecsize: u32,
    pub columns: u32,
    pub member_types: ScArray<u32>,
    pub array: ScArray<u32>,
    pub array_size_literal: ScArray<bool>,
    pub pointer: bool,
    /// SPIR-V `StorageClass` code
    pub storage: u32,
    /// Only meaningful when `has_image` is set
    pub image: ScImageType,
    pub has_image: bool,
    pub parent_type: u32,
}

const _: () = {
    assert!(size_of::<ScString>() == 2 * size_of::<usize>());
    assert!(align_of::<ScString>() == align_of::<usize>());
    assert!(offset_of!(ScResource, name) == 12usize.next_multiple_of(align_of::<usize>()));
    assert!(size_of::<ScResource>() == offset_of!(ScResource, name) + size_of::<ScString>());
    assert!(size_of::<ScShaderResources>() == 11 * size_of::<ScArray<ScResource>>());
    assert!(offset_of!(ScEntryPoint, execution_model) == size_of::<ScString>());
    assert!(size_of::<ScWorkgroupSize>() == 12);
    assert!(size_of::<ScSpecializationConstant>() == 8);
    assert!(size_of::<ScCombinedImageSampler>() == 12);
    assert!(size_of::<ScImageType>() == 24);
    assert!(offset_of!(ScImageType, sampled) == 12);
    assert!(size_of::<ScBufferRange>() == 3 * size_of::<usize>());
};

fn resource(alloc: &Allocator, resource: &Resource) -> Result<ScResource> {
    Ok(ScResource {
        id: resource.id,
        type_id: resource.type_id,
        base_type_id: resource.base_type_id,
        name: alloc.string(&resource.name)?,
    })
}

impl ScShaderResources {
    pub(crate) fn new(alloc: &Allocator, resources: &ShaderResources) -> Result<Self> {
        let ShaderResources {
            uniform_buffers,
            storage_buffers,
            stage_inputs,
            stage_outputs,
            subpass_inputs,
            storage_images,
            sampled_images,
            atomic_counters,
            push_constant_buffers,
            separate_images,
            separate_samplers,
        } = resources;
        let list = |items: &Vec<Resource>| alloc.collect(items, |r| resource(alloc, r));
        Ok(ScShaderResources {
            uniform_buffers: list(uniform_buffers)?,
            storage_buffers: list(storage_buffers)?,
            stage_inputs: list(stage_inputs)?,
            stage_outputs: list(stage_outputs)?,
            subpass_inputs: list(subpass_inputs)?,
            storage_images: list(storage_images)?,
            sampled_images: list(sampled_images)?,
            atomic_counters: list(atomic_counters)?,
            push_constant_buffers: list(push_constant_buffers)?,
            separate_images: list(separate_images)?,
            separate_samplers: list(separate_samplers)?,
        })
    }
}

impl From<WorkgroupSize> for ScWorkgroupSize {
    fn from(WorkgroupSize { x, y, z }: WorkgroupSize) -> Self {
        ScWorkgroupSize { x, y, z }
    }
}

impl ScEntryPoint {
    pub(crate) fn new(alloc: &Allocator, entry: &EntryPoint) -> Result<Self> {
        Ok(ScEntryPoint {
            name: alloc.string(&entry.name)?,
            execution_model: entry.execution_model as u32,
            workgroup_size: entry.workgroup_size.into(),
        })
    }
}

impl From<SpecializationConstant> for ScSpecializationConstant {
    fn from(SpecializationConstant { id, constant_id }: SpecializationConstant) -> Self {
        ScSpecializationConstant { id, constant_id }
    }
}

impl From<&BufferRange> for ScBufferRange {
    fn from(range: &BufferRange) -> Self {
        ScBufferRange {
            index: range.index,
            offset: range.offset,
            range: range.range,
        }
    }
}

impl From<&CombinedImageSampler> for ScCombinedImageSampler {
    fn from(sampler: &CombinedImageSampler) -> Self {
        ScCombinedImageSampler {
            combined_id: sampler.combined_id,
            image_id: sampler.image_id,
            sampler_id: sampler.sampler_id,
        }
    }
}

impl From<&ImageInfo> for ScImageType {
    fn from(image: &ImageInfo) -> Self {
        let ImageInfo {
            type_id,
            dim,
            depth,
            arrayed,
            multisampled,
            sampled,
            format,
            access,
        } = *image;
        ScImageType {
            type_id,
            dim: dim as u32,
            depth,
            arrayed,
            ms: multisampled,
            sampled,
            format,
            access,
        }
    }
}

impl ScType {
    pub(crate) fn new(alloc: &Allocator, info: &TypeInfo) -> Result<Self> {
        let TypeInfo {
            base_type,
            self_id,
            width,
            vector_size,
            columns,
            array,
            array_size_literal,
            pointer,
            storage,
            member_types,
            image,
            parent_type,
        } = info;
        Ok(ScType {
            base_type: *base_type as u32,
            self_id: *self_id,
            width: *width,
            vecsize: *vector_size,
            columns: *columns,
            member_types: alloc.array(member_types)?,
            array: alloc.array(array)?,
            array_size_literal: alloc.array(array_size_literal)?,
            pointer: *pointer,
            storage: *storage as u32,
            image: image.as_ref().map(ScImageType::from).unwrap_or_default(),
            has_image: image.is_some(),
            parent_type: *parent_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::tests::allocator;
    use pretty_assertions::assert_eq;
    use spvcrs::{fixtures, Compiler};

    unsafe fn names(array: ScArray<ScResource>) -> Vec<String> {
        std::slice::from_raw_parts(array.ptr, array.length)
            .iter()
            .map(|r| {
                let bytes = std::slice::from_raw_parts(r.name.ptr, r.name.length);
                String::from_utf8(bytes.to_vec()).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_shader_resources() {
        let compiler = Compiler::new(&fixtures::fragment_shader()).unwrap();
        let resources = compiler.get_shader_resources().unwrap();
        let records = ScShaderResources::new(&allocator(), &resources).unwrap();
        assert_eq!(unsafe { names(records.uniform_buffers) }, vec!["UBO"]);
        assert_eq!(unsafe { names(records.stage_inputs) }, vec!["uv"]);
        assert_eq!(records.storage_buffers.length, 0);
        assert!(records.storage_buffers.ptr.is_null());
        assert_eq!(
            records.separate_images.length,
            resources.separate_images.len()
        );
    }

    #[test]
    fn test_type_record() {
        let compiler = Compiler::new(&fixtures::fragment_shader()).unwrap();
        let info = compiler.get_type(fixtures::FRAGMENT_ARRAY_TYPE).unwrap();
        let record = ScType::new(&allocator(), &info).unwrap();
        assert_eq!(record.base_type, spvcrs::BaseType::Float as u32);
        assert_eq!(record.array.length, 1);
        assert_eq!(unsafe { *record.array.ptr }, 4);
        assert!(unsafe { *record.array_size_literal.ptr });
        assert!(!record.has_image);
        assert_eq!(record.member_types.length, 0);

        let image = compiler.get_type(16).unwrap();
        let record = ScType::new(&allocator(), &image).unwrap();
        assert!(record.has_image);
        assert_eq!(record.image.dim, 1);
        assert_eq!(record.image.sampled, 1);
    }
}
