//! Decoration queries and edits
//!
//! Unset decorations read as 0 (or an empty string). Decorations without
//! an operand read as 1 once set.

use super::Compiler;
use crate::ir::DecorationValue;
use crate::{Error, Result};
use spirv::Decoration;

/// `CounterBuffer`, also spelled `HlslCounterBufferGOOGLE`
pub const COUNTER_BUFFER: u32 = 5634;
/// `UserSemantic`, also spelled `HlslSemanticGOOGLE`
pub const USER_SEMANTIC: u32 = 5635;
pub const USER_TYPE: u32 = 5636;

/// Operand a decoration takes when it is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    None,
    Literal,
    Id,
    String,
}

/// Decorations with mixed operands, such as `LinkageAttributes`, only have
/// their presence tracked through the single-argument setters.
fn operand(decoration: u32) -> Operand {
    use Decoration::*;
    match Decoration::from_u32(decoration) {
        Some(
            UniformId
            | AlignmentId
            | MaxByteOffsetId
            | CounterBuffer
            | NodeSharesPayloadLimitsWithAMDX
            | NodeMaxPayloadsAMDX
            | AliasScopeINTEL
            | NoAliasINTEL,
        ) => Operand::Id,
        Some(
            UserSemantic
            | UserTypeGOOGLE
            | PayloadNodeNameAMDX
            | ClobberINTEL
            | MemoryINTEL
            | MergeINTEL,
        ) => Operand::String,
        Some(
            SpecId | ArrayStride | MatrixStride | BuiltIn | Stream | Location | Component | Index
            | Binding | DescriptorSet | Offset | XfbBuffer | XfbStride | FuncParamAttr
            | FPRoundingMode | FPFastMathMode | InputAttachmentIndex | Alignment | MaxByteOffset
            | SecondaryViewportRelativeNV
            | SIMTCallINTEL
            | FuncParamIOKindINTEL
            | GlobalVariableOffsetINTEL
            | FunctionRoundingModeINTEL
            | FunctionDenormModeINTEL
            | NumbanksINTEL
            | BankwidthINTEL
            | MaxPrivateCopiesINTEL
            | MaxReplicatesINTEL
            | BankBitsINTEL
            | ForcePow2DepthINTEL
            | CacheSizeINTEL
            | PrefetchINTEL
            | MathOpDSPModeINTEL
            | InitiationIntervalINTEL
            | MaxConcurrencyINTEL
            | PipelineEnableINTEL
            | BufferLocationINTEL
            | IOPipeStorageINTEL
            | FunctionFloatingPointModeINTEL
            | InitModeINTEL
            | ImplementInRegisterMapINTEL
            | FPMaxErrorDecorationINTEL
            | LatencyControlLabelINTEL
            | LatencyControlConstraintINTEL
            | MMHostInterfaceAddressWidthINTEL
            | MMHostInterfaceDataWidthINTEL
            | MMHostInterfaceLatencyINTEL
            | MMHostInterfaceReadWriteModeINTEL
            | MMHostInterfaceMaxBurstINTEL
            | MMHostInterfaceWaitRequestINTEL
            | CacheControlLoadINTEL
            | CacheControlStoreINTEL,
        ) => Operand::Literal,
        _ => Operand::None,
    }
}

fn numeric_value(decoration: u32, argument: u32) -> Result<DecorationValue> {
    Ok(match operand(decoration) {
        Operand::None => DecorationValue::Literals(Vec::new()),
        Operand::Literal => DecorationValue::Literals(vec![argument]),
        Operand::Id => DecorationValue::Ids(vec![argument]),
        Operand::String => {
            return Err(Error::Reflection(format!(
                "Decoration {decoration} takes a string operand."
            )));
        }
    })
}

fn string_value(decoration: u32, argument: &str) -> Result<DecorationValue> {
    if operand(decoration) != Operand::String {
        return Err(Error::Reflection(format!(
            "Decoration {decoration} does not take a string operand."
        )));
    }
    Ok(DecorationValue::String(argument.to_owned()))
}

fn read_string(value: Option<&DecorationValue>) -> String {
    match value {
        Some(DecorationValue::String(s)) => s.clone(),
        _ => String::new(),
    }
}

impl Compiler {
    pub fn set_decoration(&mut self, id: u32, decoration: u32, argument: u32) -> Result<()> {
        let value = numeric_value(decoration, argument)?;
        self.module
            .decorations
            .entry(id)
            .or_default()
            .insert(decoration, value);
        Ok(())
    }

    pub fn set_decoration_string(
        &mut self,
        id: u32,
        decoration: u32,
        argument: &str,
    ) -> Result<()> {
        let value = string_value(decoration, argument)?;
        self.module
            .decorations
            .entry(id)
            .or_default()
            .insert(decoration, value);
        Ok(())
    }

    pub fn has_decoration(&self, id: u32, decoration: u32) -> bool {
        self.module.decoration(id, decoration).is_some()
    }

    pub fn get_decoration(&self, id: u32, decoration: u32) -> u32 {
        self.module
            .decoration(id, decoration)
            .map_or(0, DecorationValue::as_u32)
    }

    pub fn get_decoration_string(&self, id: u32, decoration: u32) -> String {
        read_string(self.module.decoration(id, decoration))
    }

    pub fn unset_decoration(&mut self, id: u32, decoration: u32) {
        if let Some(decorations) = self.module.decorations.get_mut(&id) {
            decorations.remove(&decoration);
            if decorations.is_empty() {
                self.module.decorations.remove(&id);
            }
        }
    }

    pub fn set_member_decoration(
        &mut self,
        id: u32,
        index: u32,
        decoration: u32,
        argument: u32,
    ) -> Result<()> {
        let value = match numeric_value(decoration, argument)? {
            // Members have no id form
            DecorationValue::Ids(ids) => DecorationValue::Literals(ids),
            value => value,
        };
        self.module
            .member_decorations
            .entry((id, index))
            .or_default()
            .insert(decoration, value);
        Ok(())
    }

    pub fn set_member_decoration_string(
        &mut self,
        id: u32,
        index: u32,
        decoration: u32,
        argument: &str,
    ) -> Result<()> {
        let value = string_value(decoration, argument)?;
        self.module
            .member_decorations
            .entry((id, index))
            .or_default()
            .insert(decoration, value);
        Ok(())
    }

    pub fn has_member_decoration(&self, id: u32, index: u32, decoration: u32) -> bool {
        self.module.member_decoration(id, index, decoration).is_some()
    }

    pub fn get_member_decoration(&self, id: u32, index: u32, decoration: u32) -> u32 {
        self.module
            .member_decoration(id, index, decoration)
            .map_or(0, DecorationValue::as_u32)
    }

    pub fn get_member_decoration_string(&self, id: u32, index: u32, decoration: u32) -> String {
        read_string(self.module.member_decoration(id, index, decoration))
    }

    pub fn unset_member_decoration(&mut self, id: u32, index: u32, decoration: u32) {
        let key = (id, index);
        if let Some(decorations) = self.module.member_decorations.get_mut(&key) {
            decorations.remove(&decoration);
            if decorations.is_empty() {
                self.module.member_decorations.remove(&key);
            }
        }
    }

    /// Word offset of the first operand of `decoration` on `id` in the
    /// binary the compiler was created from.
    pub fn get_binary_offset_for_decoration(&self, id: u32, decoration: u32) -> Option<u32> {
        self.module
            .decoration_offsets
            .get(&(id, decoration))
            .copied()
    }

    /// True if another buffer names `id` as its HLSL counter buffer.
    pub fn buffer_is_hlsl_counter_buffer(&self, id: u32) -> bool {
        self.module.decorations.values().any(|decorations| {
            matches!(
                decorations.get(&COUNTER_BUFFER),
                Some(DecorationValue::Ids(ids)) if ids.first() == Some(&id)
            )
        })
    }

    /// The counter buffer attached to buffer `id`, if any.
    pub fn buffer_get_hlsl_counter_buffer(&self, id: u32) -> Option<u32> {
        self.module
            .decoration(id, COUNTER_BUFFER)
            .map(DecorationValue::as_u32)
    }
}
