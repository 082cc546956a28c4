//! Walks over the code reachable from the current entry point

use super::Compiler;
use crate::ir::Instruction;
use crate::{Error, Result};
use spirv::{Op, StorageClass};
use std::collections::{HashMap, HashSet};

impl Compiler {
    /// Every instruction of the current entry point's function and of the
    /// functions it calls, each function visited once.
    pub(crate) fn reachable_instructions(&self) -> Result<Vec<&Instruction>> {
        let entry = self.current_entry()?.function;
        let mut visited = HashSet::new();
        let mut stack = vec![entry];
        let mut out = Vec::new();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let function = self
                .module
                .function(id)
                .ok_or_else(|| Error::invalid_id(id, "not a function"))?;
            for inst in &function.instructions {
                if inst.op() == Some(Op::FunctionCall) {
                    stack.extend(inst.operand(2));
                }
                out.push(inst);
            }
        }
        Ok(out)
    }

    /// Follows loads, copies and access chains from `value` back to the
    /// variable it was read from.
    pub(crate) fn backing_variable(
        &self,
        producers: &HashMap<u32, &Instruction>,
        mut value: u32,
    ) -> Option<u32> {
        for _ in 0..64 {
            if self.module.variables.contains_key(&value) {
                return Some(value);
            }
            let inst = producers.get(&value)?;
            value = match inst.op()? {
                Op::Load
                | Op::CopyObject
                | Op::AccessChain
                | Op::InBoundsAccessChain
                | Op::PtrAccessChain
                | Op::Image => inst.operand(2)?,
                _ => return None,
            };
        }
        None
    }
}

/// Maps result ids to the instructions that produce them.
pub(crate) fn producers<'a>(instructions: &[&'a Instruction]) -> HashMap<u32, &'a Instruction> {
    instructions
        .iter()
        .filter(|inst| inst.op().is_some_and(has_result))
        .filter_map(|&inst| Some((inst.operand(1)?, inst)))
        .collect()
}

/// True for opcodes of the form `<result type> <result id> ...`.
fn has_result(op: Op) -> bool {
    !matches!(
        op,
        Op::Store
            | Op::CopyMemory
            | Op::Label
            | Op::Branch
            | Op::BranchConditional
            | Op::Switch
            | Op::Return
            | Op::ReturnValue
            | Op::Kill
            | Op::Unreachable
            | Op::SelectionMerge
            | Op::LoopMerge
            | Op::FunctionEnd
            | Op::AtomicStore
            | Op::ImageWrite
            | Op::ControlBarrier
            | Op::MemoryBarrier
            | Op::EmitVertex
            | Op::EndPrimitive
            | Op::Line
            | Op::NoLine
    )
}

/// Pointer operands through which an instruction may touch a variable.
pub(crate) fn pointer_operands(inst: &Instruction) -> Vec<u32> {
    let Some(op) = inst.op() else {
        return Vec::new();
    };
    let ops = &inst.operands;
    let at = |i: usize| ops.get(i).copied().into_iter().collect::<Vec<_>>();
    match op {
        Op::Store | Op::AtomicStore => at(0),
        Op::CopyMemory => ops.iter().take(2).copied().collect(),
        Op::Load
        | Op::CopyObject
        | Op::AccessChain
        | Op::InBoundsAccessChain
        | Op::PtrAccessChain
        | Op::ArrayLength
        | Op::ImageTexelPointer
        | Op::AtomicLoad
        | Op::AtomicExchange
        | Op::AtomicCompareExchange
        | Op::AtomicIIncrement
        | Op::AtomicIDecrement
        | Op::AtomicIAdd
        | Op::AtomicISub
        | Op::AtomicSMin
        | Op::AtomicUMin
        | Op::AtomicSMax
        | Op::AtomicUMax
        | Op::AtomicAnd
        | Op::AtomicOr
        | Op::AtomicXor => at(2),
        Op::FunctionCall => inst.tail(3),
        Op::Select => ops.iter().skip(3).take(2).copied().collect(),
        Op::Phi => ops.iter().skip(2).step_by(2).copied().collect(),
        Op::ExtInst => inst.tail(4),
        _ => Vec::new(),
    }
}

/// Storage classes that make up the interface between a shader and the
/// pipeline.
pub(crate) fn is_interface_storage(storage: StorageClass) -> bool {
    matches!(
        storage,
        StorageClass::Input
            | StorageClass::Output
            | StorageClass::Uniform
            | StorageClass::UniformConstant
            | StorageClass::AtomicCounter
            | StorageClass::PushConstant
            | StorageClass::StorageBuffer
    )
}
