//! Declared sizes and offsets of buffer block members

use super::{BaseType, Compiler, TypeInfo};
use crate::{Error, Result};
use spirv::{Decoration, StorageClass};

impl Compiler {
    /// Byte offset of member `index` of struct `type_id`.
    pub fn type_struct_member_offset(&self, type_id: u32, index: u32) -> Result<u32> {
        let info = self.struct_type(type_id, index)?;
        self.module
            .member_decoration(info.self_id, index, Decoration::Offset as u32)
            .map(|value| value.as_u32())
            .ok_or_else(|| Error::Reflection("Struct member does not have Offset set.".into()))
    }

    /// `ArrayStride` of the array type used by member `index`.
    pub fn type_struct_member_array_stride(&self, type_id: u32, index: u32) -> Result<u32> {
        let info = self.struct_type(type_id, index)?;
        let member = info.member_types[index as usize];
        self.module
            .decoration(member, Decoration::ArrayStride as u32)
            .map(|value| value.as_u32())
            .ok_or_else(|| {
                Error::Reflection("Struct member does not have ArrayStride set.".into())
            })
    }

    /// `MatrixStride` of member `index`.
    pub fn type_struct_member_matrix_stride(&self, type_id: u32, index: u32) -> Result<u32> {
        let info = self.struct_type(type_id, index)?;
        self.module
            .member_decoration(info.self_id, index, Decoration::MatrixStride as u32)
            .map(|value| value.as_u32())
            .ok_or_else(|| {
                Error::Reflection("Struct member does not have MatrixStride set.".into())
            })
    }

    /// Size of struct `type_id` as laid out in memory, up to the end of its
    /// highest-offset member. A trailing runtime array counts as empty.
    pub fn get_declared_struct_size(&self, type_id: u32) -> Result<usize> {
        let info = self.get_type(type_id)?;
        if info.member_types.is_empty() {
            return Err(Error::Reflection(
                "Declared struct in block cannot be empty.".into(),
            ));
        }
        let mut highest = (0, 0u32);
        for index in 0..info.member_types.len() as u32 {
            let offset = self.type_struct_member_offset(type_id, index)?;
            if offset > highest.1 {
                highest = (index, offset);
            }
        }
        let size = self.get_declared_struct_member_size(type_id, highest.0)?;
        (highest.1 as usize).checked_add(size).ok_or_else(size_overflow)
    }

    /// Struct size with a trailing runtime array of `array_size` elements.
    pub fn get_declared_struct_size_runtime_array(
        &self,
        type_id: u32,
        array_size: usize,
    ) -> Result<usize> {
        let info = self.get_type(type_id)?;
        let size = self.get_declared_struct_size(type_id)?;
        let Some(&last) = info.member_types.last() else {
            return Ok(size);
        };
        let last_info = self.get_type(last)?;
        let runtime = last_info.array.first() == Some(&0)
            && last_info.array_size_literal.first() == Some(&true);
        if runtime {
            let index = info.member_types.len() as u32 - 1;
            let stride = self.type_struct_member_array_stride(type_id, index)?;
            return array_size
                .checked_mul(stride as usize)
                .and_then(|array| size.checked_add(array))
                .ok_or_else(size_overflow);
        }
        Ok(size)
    }

    /// Size of member `index` of struct `type_id`.
    pub fn get_declared_struct_member_size(&self, type_id: u32, index: u32) -> Result<usize> {
        if self.get_type(type_id)?.member_types.is_empty() {
            return Err(Error::Reflection(
                "Declared struct in block cannot be empty.".into(),
            ));
        }
        let info = self.struct_type(type_id, index)?;
        let member = self.get_type(info.member_types[index as usize])?;
        match member.base_type {
            BaseType::Unknown
            | BaseType::Void
            | BaseType::Boolean
            | BaseType::AtomicCounter
            | BaseType::Image
            | BaseType::SampledImage
            | BaseType::Sampler => {
                return Err(Error::Reflection(
                    "Querying size for object with opaque size.".into(),
                ));
            }
            _ => {}
        }

        if member.pointer && member.storage == StorageClass::PhysicalStorageBuffer {
            return Ok(8);
        }
        if !member.array.is_empty() {
            let stride = self.type_struct_member_array_stride(type_id, index)?;
            let length = self.array_length(&member)?;
            return (stride as usize)
                .checked_mul(length as usize)
                .ok_or_else(size_overflow);
        }
        if member.base_type == BaseType::Struct {
            return self.get_declared_struct_size(member.self_id);
        }

        let component_size = (member.width / 8) as usize;
        if member.columns == 1 {
            return Ok(member.vector_size as usize * component_size);
        }
        let stride = self.type_struct_member_matrix_stride(type_id, index)? as usize;
        let has = |decoration: Decoration| {
            self.module
                .member_decoration(info.self_id, index, decoration as u32)
                .is_some()
        };
        if has(Decoration::RowMajor) {
            Ok(stride * member.vector_size as usize)
        } else if has(Decoration::ColMajor) {
            Ok(stride * member.columns as usize)
        } else {
            Err(Error::Reflection(
                "Either row-major or column-major must be declared for matrices.".into(),
            ))
        }
    }

    fn struct_type(&self, type_id: u32, index: u32) -> Result<TypeInfo> {
        let info = self.get_type(type_id)?;
        if info.base_type != BaseType::Struct {
            return Err(Error::invalid_id(type_id, "not a struct type"));
        }
        if index as usize >= info.member_types.len() {
            return Err(Error::Reflection(format!(
                "Member index {index} is out of range for a struct of {} members.",
                info.member_types.len()
            )));
        }
        Ok(info)
    }
}

fn size_overflow() -> Error {
    Error::Reflection("Declared struct size overflows.".into())
}
