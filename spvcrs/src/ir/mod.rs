//! In-memory SPIR-V module: parsing, decoration tables and re-assembly

mod instruction;
mod types;

pub use instruction::{decode_string, encode_string, Instruction};
pub use types::{
    ConstantDecl, ConstantValue, DecorationValue, EntryPointDecl, ExecutionModeDecl, ImageDecl,
    TypeDecl, VariableDecl,
};

use crate::{Error, Result};
use spirv::{Decoration, Dim, ExecutionModel, Op, StorageClass};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Decorations on one id or struct member, keyed by raw decoration code.
pub type Decorations = BTreeMap<u32, DecorationValue>;

const HEADER_WORDS: usize = 5;

/// The five header words of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub generator: u32,
    pub bound: u32,
    pub schema: u32,
}

/// A function body from `OpFunction` through `OpFunctionEnd`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub id: u32,
    pub instructions: Vec<Instruction>,
}

/// Which instructions [`Module::assemble`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assembly {
    /// Everything the module holds
    Full,
    /// Omits string and id decorations and processing notes, which the
    /// naga front end does not accept
    Backend,
}

/// A parsed SPIR-V module.
///
/// Debug names and decorations live in ordered tables so they can be edited
/// and written back; everything else is kept as raw instructions next to
/// lookup tables built at parse time.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub header: Option<Header>,
    pub capabilities: Vec<u32>,
    pub extensions: Vec<String>,
    pub ext_inst_imports: Vec<Instruction>,
    pub memory_model: Option<Instruction>,
    pub entry_points: Vec<EntryPointDecl>,
    pub execution_modes: Vec<ExecutionModeDecl>,
    pub debug: Vec<Instruction>,
    pub processed: Vec<String>,
    pub names: BTreeMap<u32, String>,
    pub member_names: BTreeMap<(u32, u32), String>,
    pub decorations: BTreeMap<u32, Decorations>,
    pub member_decorations: BTreeMap<(u32, u32), Decorations>,
    /// Word offset of the first literal of each `OpDecorate` in the input
    pub decoration_offsets: HashMap<(u32, u32), u32>,
    pub globals: Vec<Instruction>,
    pub functions: Vec<Function>,
    pub types: HashMap<u32, TypeDecl>,
    pub constants: HashMap<u32, ConstantDecl>,
    pub variables: HashMap<u32, VariableDecl>,
    /// Global variables in declaration order
    pub global_variables: Vec<u32>,
    /// Ids that exist only in reflection state and are never written out
    pub synthetic: BTreeSet<u32>,
    global_index: HashMap<u32, usize>,
}

#[derive(Default)]
struct GroupState {
    decorations: HashMap<u32, Decorations>,
}

impl Module {
    /// Parses a module from native-endian words.
    ///
    /// Modules written on a machine of the other endianness are detected by
    /// their magic number and swapped.
    pub fn parse(words: &[u32]) -> Result<Self> {
        if words.len() < HEADER_WORDS {
            return Err(Error::Parse("module is too small".into()));
        }
        let swapped;
        let words = if words[0] == spirv::MAGIC_NUMBER {
            words
        } else if words[0] == spirv::MAGIC_NUMBER.swap_bytes() {
            swapped = words.iter().map(|w| w.swap_bytes()).collect::<Vec<_>>();
            &swapped[..]
        } else {
            return Err(Error::Parse(format!("bad magic number {:#010x}", words[0])));
        };

        let mut module = Module {
            header: Some(Header {
                version: words[1],
                generator: words[2],
                bound: words[3],
                schema: words[4],
            }),
            ..Default::default()
        };
        let mut groups = GroupState::default();
        let mut current: Option<Function> = None;

        let mut offset = HEADER_WORDS;
        while offset < words.len() {
            let leading = words[offset];
            let count = (leading >> 16) as usize;
            if count == 0 {
                return Err(Error::Parse(format!("zero word count at word {offset}")));
            }
            if offset + count > words.len() {
                return Err(Error::Parse(format!(
                    "instruction at word {offset} runs past the end of the module"
                )));
            }
            let inst = Instruction {
                opcode: (leading & 0xffff) as u16,
                operands: words[offset + 1..offset + count].to_vec(),
                offset,
            };
            offset += count;

            if let Some(function) = current.as_mut() {
                let end = inst.op() == Some(Op::FunctionEnd);
                if inst.op() == Some(Op::Variable) {
                    module.record_variable(&inst)?;
                }
                function.instructions.push(inst);
                if end {
                    module.functions.extend(current.take());
                }
                continue;
            }

            module.parse_global(inst, &mut groups, &mut current)?;
        }

        if current.is_some() {
            return Err(Error::Parse("function is missing OpFunctionEnd".into()));
        }

        log::debug!(
            "parsed SPIR-V {:#x}: {} entry points, {} globals, {} functions",
            module.version(),
            module.entry_points.len(),
            module.globals.len(),
            module.functions.len()
        );
        Ok(module)
    }

    fn parse_global(
        &mut self,
        inst: Instruction,
        groups: &mut GroupState,
        current: &mut Option<Function>,
    ) -> Result<()> {
        let Some(op) = inst.op() else {
            self.push_global(inst);
            return Ok(());
        };
        match op {
            Op::Capability => self.capabilities.push(inst.require(0)?),
            Op::Extension => self.extensions.push(inst.string_at(0)?.0),
            Op::ExtInstImport => self.ext_inst_imports.push(inst),
            Op::MemoryModel => self.memory_model = Some(inst),
            Op::EntryPoint => {
                let code = inst.require(0)?;
                let model = ExecutionModel::from_u32(code)
                    .ok_or_else(|| Error::Parse(format!("unknown execution model {code}")))?;
                let (name, next) = inst.string_at(2)?;
                self.entry_points.push(EntryPointDecl {
                    model,
                    function: inst.require(1)?,
                    name,
                    interface: inst.operands.get(next..).unwrap_or(&[]).to_vec(),
                });
            }
            Op::ExecutionMode | Op::ExecutionModeId => self.execution_modes.push(ExecutionModeDecl {
                function: inst.require(0)?,
                mode: inst.require(1)?,
                operands: inst.tail(2),
                uses_ids: op == Op::ExecutionModeId,
            }),
            Op::String | Op::Source | Op::SourceExtension | Op::SourceContinued => {
                self.debug.push(inst)
            }
            Op::ModuleProcessed => self.processed.push(inst.string_at(0)?.0),
            Op::Name => {
                let (name, _) = inst.string_at(1)?;
                self.names.insert(inst.require(0)?, name);
            }
            Op::MemberName => {
                let (name, _) = inst.string_at(2)?;
                self.member_names
                    .insert((inst.require(0)?, inst.require(1)?), name);
            }
            Op::DecorationGroup => {
                // Decorations on a group precede the group declaration
                let id = inst.require(0)?;
                let collected = self.decorations.remove(&id).unwrap_or_default();
                groups.decorations.insert(id, collected);
            }
            Op::Decorate | Op::DecorateId | Op::DecorateString => {
                let target = inst.require(0)?;
                let decoration = inst.require(1)?;
                let value = match op {
                    Op::DecorateString => DecorationValue::String(inst.string_at(2)?.0),
                    Op::DecorateId => DecorationValue::Ids(inst.tail(2)),
                    _ => DecorationValue::Literals(inst.tail(2)),
                };
                if op == Op::Decorate && inst.operands.len() > 2 {
                    self.decoration_offsets
                        .insert((target, decoration), (inst.offset + 3) as u32);
                }
                self.decorations
                    .entry(target)
                    .or_default()
                    .insert(decoration, value);
            }
            Op::MemberDecorate | Op::MemberDecorateString => {
                let key = (inst.require(0)?, inst.require(1)?);
                let decoration = inst.require(2)?;
                let value = if op == Op::MemberDecorateString {
                    DecorationValue::String(inst.string_at(3)?.0)
                } else {
                    DecorationValue::Literals(inst.tail(3))
                };
                self.member_decorations
                    .entry(key)
                    .or_default()
                    .insert(decoration, value);
            }
            Op::GroupDecorate => {
                let group = groups
                    .decorations
                    .get(&inst.require(0)?)
                    .cloned()
                    .unwrap_or_default();
                for target in inst.tail(1) {
                    self.decorations
                        .entry(target)
                        .or_default()
                        .extend(group.clone());
                }
            }
            Op::GroupMemberDecorate => {
                let group = groups
                    .decorations
                    .get(&inst.require(0)?)
                    .cloned()
                    .unwrap_or_default();
                for pair in inst.tail(1).chunks_exact(2) {
                    self.member_decorations
                        .entry((pair[0], pair[1]))
                        .or_default()
                        .extend(group.clone());
                }
            }
            Op::Function => {
                *current = Some(Function {
                    id: inst.require(1)?,
                    instructions: vec![inst],
                });
            }
            _ => {
                self.record_global(&inst)?;
                self.push_global(inst);
            }
        }
        Ok(())
    }

    fn push_global(&mut self, inst: Instruction) {
        if let Some(id) = inst.global_result_id() {
            self.global_index.insert(id, self.globals.len());
        }
        self.globals.push(inst);
    }

    fn record_global(&mut self, inst: &Instruction) -> Result<()> {
        let Some(op) = inst.op() else {
            return Ok(());
        };
        let ty = match op {
            Op::TypeVoid => Some(TypeDecl::Void),
            Op::TypeBool => Some(TypeDecl::Bool),
            Op::TypeInt => Some(TypeDecl::Int {
                width: inst.require(1)?,
                signed: inst.require(2)? != 0,
            }),
            Op::TypeFloat => Some(TypeDecl::Float {
                width: inst.require(1)?,
            }),
            Op::TypeVector => Some(TypeDecl::Vector {
                component: inst.require(1)?,
                count: inst.require(2)?,
            }),
            Op::TypeMatrix => Some(TypeDecl::Matrix {
                column: inst.require(1)?,
                count: inst.require(2)?,
            }),
            Op::TypeImage => {
                let dim = inst.require(2)?;
                Some(TypeDecl::Image(ImageDecl {
                    sampled_type: inst.require(1)?,
                    dim: Dim::from_u32(dim)
                        .ok_or_else(|| Error::Parse(format!("unknown image dimension {dim}")))?,
                    depth: inst.require(3)?,
                    arrayed: inst.require(4)? != 0,
                    multisampled: inst.require(5)? != 0,
                    sampled: inst.require(6)?,
                    format: inst.require(7)?,
                    access: inst.operand(8),
                }))
            }
            Op::TypeSampler => Some(TypeDecl::Sampler),
            Op::TypeSampledImage => Some(TypeDecl::SampledImage {
                image: inst.require(1)?,
            }),
            Op::TypeArray => Some(TypeDecl::Array {
                element: inst.require(1)?,
                length: inst.require(2)?,
            }),
            Op::TypeRuntimeArray => Some(TypeDecl::RuntimeArray {
                element: inst.require(1)?,
            }),
            Op::TypeStruct => Some(TypeDecl::Struct {
                members: inst.tail(1),
            }),
            Op::TypePointer => {
                let class = inst.require(1)?;
                Some(TypeDecl::Pointer {
                    storage: storage_class(class)?,
                    pointee: inst.require(2)?,
                })
            }
            Op::TypeFunction => Some(TypeDecl::Function {
                result: inst.require(1)?,
                parameters: inst.tail(2),
            }),
            Op::TypeAccelerationStructureKHR => Some(TypeDecl::AccelerationStructure),
            Op::TypeRayQueryKHR => Some(TypeDecl::RayQuery),
            Op::TypeOpaque | Op::TypeEvent | Op::TypeDeviceEvent | Op::TypeReserveId
            | Op::TypeQueue | Op::TypePipe => Some(TypeDecl::Opaque),
            _ => None,
        };
        if let Some(ty) = ty {
            self.types.insert(inst.require(0)?, ty);
            return Ok(());
        }

        let constant = |value, specialization| -> Result<(u32, ConstantDecl)> {
            Ok((
                inst.require(1)?,
                ConstantDecl {
                    type_id: inst.require(0)?,
                    value,
                    specialization,
                },
            ))
        };
        let (id, decl) = match op {
            Op::Constant => constant(ConstantValue::Scalar(inst.tail(2)), false)?,
            Op::SpecConstant => constant(ConstantValue::Scalar(inst.tail(2)), true)?,
            Op::ConstantTrue => constant(ConstantValue::Bool(true), false)?,
            Op::ConstantFalse => constant(ConstantValue::Bool(false), false)?,
            Op::SpecConstantTrue => constant(ConstantValue::Bool(true), true)?,
            Op::SpecConstantFalse => constant(ConstantValue::Bool(false), true)?,
            Op::ConstantComposite => {
                constant(ConstantValue::Composite(inst.tail(2)), false)?
            }
            Op::SpecConstantComposite => {
                constant(ConstantValue::Composite(inst.tail(2)), true)?
            }
            Op::ConstantNull => constant(ConstantValue::Null, false)?,
            Op::SpecConstantOp => constant(ConstantValue::Operation, true)?,
            Op::Variable => return self.record_variable(inst),
            _ => return Ok(()),
        };
        self.constants.insert(id, decl);
        Ok(())
    }

    fn record_variable(&mut self, inst: &Instruction) -> Result<()> {
        let id = inst.require(1)?;
        let decl = VariableDecl {
            id,
            type_id: inst.require(0)?,
            storage: storage_class(inst.require(2)?)?,
            initializer: inst.operand(3),
        };
        if decl.storage != StorageClass::Function {
            self.global_variables.push(id);
        }
        self.variables.insert(id, decl);
        Ok(())
    }

    /// The SPIR-V version word, e.g. `0x10000` for 1.0.
    pub fn version(&self) -> u32 {
        self.header.map_or(0, |h| h.version)
    }

    /// One past the largest id in use.
    pub fn bound(&self) -> u32 {
        self.header.map_or(0, |h| h.bound)
    }

    /// Reserves `count` fresh ids and returns the first.
    pub fn allocate_ids(&mut self, count: u32) -> Result<u32> {
        let header = self.header.get_or_insert(Header {
            version: 0x10000,
            generator: 0,
            bound: 1,
            schema: 0,
        });
        let first = header.bound;
        header.bound = first
            .checked_add(count)
            .ok_or_else(|| Error::Reflection("Ran out of ids.".into()))?;
        Ok(first)
    }

    /// Returns the global instruction that defines `id`.
    pub fn global(&self, id: u32) -> Option<&Instruction> {
        self.global_index.get(&id).map(|&i| &self.globals[i])
    }

    pub(crate) fn global_mut(&mut self, id: u32) -> Option<&mut Instruction> {
        let index = *self.global_index.get(&id)?;
        self.globals.get_mut(index)
    }

    /// Returns the function with result id `id`.
    pub fn function(&self, id: u32) -> Option<&Function> {
        self.functions.iter().find(|f| f.id == id)
    }

    pub fn decoration(&self, id: u32, decoration: u32) -> Option<&DecorationValue> {
        self.decorations.get(&id)?.get(&decoration)
    }

    pub fn member_decoration(
        &self,
        id: u32,
        member: u32,
        decoration: u32,
    ) -> Option<&DecorationValue> {
        self.member_decorations.get(&(id, member))?.get(&decoration)
    }

    /// Encodes the module back into words.
    ///
    /// Table-backed sections are written in id order, so two calls on an
    /// unchanged module produce identical output.
    pub fn assemble(&self, assembly: Assembly) -> Vec<u32> {
        let header = self.header.unwrap_or(Header {
            version: 0x10000,
            generator: 0,
            bound: 1,
            schema: 0,
        });
        let mut out = vec![
            spirv::MAGIC_NUMBER,
            header.version,
            header.generator,
            header.bound,
            header.schema,
        ];
        let backend = assembly == Assembly::Backend;

        for &capability in &self.capabilities {
            Instruction::new(Op::Capability, vec![capability]).encode_into(&mut out);
        }
        for extension in &self.extensions {
            Instruction::new(Op::Extension, encode_string(extension)).encode_into(&mut out);
        }
        for inst in &self.ext_inst_imports {
            inst.encode_into(&mut out);
        }
        if let Some(inst) = &self.memory_model {
            inst.encode_into(&mut out);
        }
        for entry in &self.entry_points {
            let mut operands = vec![entry.model as u32, entry.function];
            operands.extend(encode_string(&entry.name));
            operands.extend_from_slice(&entry.interface);
            Instruction::new(Op::EntryPoint, operands).encode_into(&mut out);
        }
        for mode in &self.execution_modes {
            let op = if mode.uses_ids {
                Op::ExecutionModeId
            } else {
                Op::ExecutionMode
            };
            let mut operands = vec![mode.function, mode.mode];
            operands.extend_from_slice(&mode.operands);
            Instruction::new(op, operands).encode_into(&mut out);
        }
        for inst in &self.debug {
            inst.encode_into(&mut out);
        }
        for (&id, name) in &self.names {
            if self.synthetic.contains(&id) {
                continue;
            }
            let mut operands = vec![id];
            operands.extend(encode_string(name));
            Instruction::new(Op::Name, operands).encode_into(&mut out);
        }
        for (&(id, member), name) in &self.member_names {
            if self.synthetic.contains(&id) {
                continue;
            }
            let mut operands = vec![id, member];
            operands.extend(encode_string(name));
            Instruction::new(Op::MemberName, operands).encode_into(&mut out);
        }
        if !backend {
            for processed in &self.processed {
                Instruction::new(Op::ModuleProcessed, encode_string(processed))
                    .encode_into(&mut out);
            }
        }

        for (&id, decorations) in &self.decorations {
            if self.synthetic.contains(&id) {
                continue;
            }
            for (&decoration, value) in decorations {
                if backend && decoration == Decoration::SpecId as u32 {
                    continue;
                }
                let (op, tail) = match value {
                    DecorationValue::Literals(words) => (Op::Decorate, words.clone()),
                    DecorationValue::Ids(_) | DecorationValue::String(_) if backend => continue,
                    DecorationValue::Ids(ids) => (Op::DecorateId, ids.clone()),
                    DecorationValue::String(s) => (Op::DecorateString, encode_string(s)),
                };
                let mut operands = vec![id, decoration];
                operands.extend(tail);
                Instruction::new(op, operands).encode_into(&mut out);
            }
        }
        for (&(id, member), decorations) in &self.member_decorations {
            if self.synthetic.contains(&id) {
                continue;
            }
            for (&decoration, value) in decorations {
                let (op, tail) = match value {
                    DecorationValue::Literals(words) | DecorationValue::Ids(words) => {
                        (Op::MemberDecorate, words.clone())
                    }
                    DecorationValue::String(_) if backend => continue,
                    DecorationValue::String(s) => (Op::MemberDecorateString, encode_string(s)),
                };
                let mut operands = vec![id, member, decoration];
                operands.extend(tail);
                Instruction::new(op, operands).encode_into(&mut out);
            }
        }

        for inst in &self.globals {
            let frozen = if backend {
                inst.op().and_then(freeze_spec_constant)
            } else {
                None
            };
            match frozen {
                Some(op) => Instruction::new(op, inst.operands.clone()).encode_into(&mut out),
                None => inst.encode_into(&mut out),
            }
        }
        for function in &self.functions {
            for inst in &function.instructions {
                inst.encode_into(&mut out);
            }
        }
        out
    }
}

/// The plain constant opcode a specialization constant is emitted as when
/// its default value is final.
fn freeze_spec_constant(op: Op) -> Option<Op> {
    match op {
        Op::SpecConstant => Some(Op::Constant),
        Op::SpecConstantTrue => Some(Op::ConstantTrue),
        Op::SpecConstantFalse => Some(Op::ConstantFalse),
        Op::SpecConstantComposite => Some(Op::ConstantComposite),
        _ => None,
    }
}

pub(crate) fn storage_class(code: u32) -> Result<StorageClass> {
    StorageClass::from_u32(code).ok_or_else(|| Error::Parse(format!("unknown storage class {code}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_too_small() {
        let err = Module::parse(&[spirv::MAGIC_NUMBER, 0x10000]).unwrap_err();
        assert_eq!(err, Error::Parse("module is too small".into()));
    }

    #[test]
    fn test_bad_magic() {
        let err = Module::parse(&[0xdead_beef, 0x10000, 0, 1, 0]).unwrap_err();
        assert!(matches!(err, Error::Parse(ref m) if m.starts_with("bad magic")));
    }

    #[test]
    fn test_header_only() {
        let module = Module::parse(&[spirv::MAGIC_NUMBER, 0x10300, 7, 12, 0]).unwrap();
        assert_eq!(module.version(), 0x10300);
        assert_eq!(module.bound(), 12);
        assert!(module.entry_points.is_empty());
    }

    #[test]
    fn test_allocate_ids_near_bound_limit() {
        let mut module = Module::parse(&[spirv::MAGIC_NUMBER, 0x10000, 0, 12, 0]).unwrap();
        assert_eq!(module.allocate_ids(2).unwrap(), 12);
        assert_eq!(module.bound(), 14);

        if let Some(header) = module.header.as_mut() {
            header.bound = u32::MAX - 1;
        }
        assert_eq!(module.allocate_ids(1).unwrap(), u32::MAX - 1);
        assert_eq!(
            module.allocate_ids(1).unwrap_err(),
            Error::Reflection("Ran out of ids.".into())
        );
        assert_eq!(module.bound(), u32::MAX);
    }

    #[test]
    fn test_byte_swapped_module() {
        let words = fixtures::compute_shader();
        let swapped: Vec<u32> = words.iter().map(|w| w.swap_bytes()).collect();
        let module = Module::parse(&swapped).unwrap();
        assert_eq!(module.entry_points.len(), 1);
        assert_eq!(module.assemble(Assembly::Full), words);
    }

    #[test]
    fn test_truncated_instruction() {
        let mut words = fixtures::compute_shader();
        words.truncate(words.len() - 1);
        assert!(matches!(Module::parse(&words), Err(Error::Parse(_))));
    }

    #[test]
    fn test_zero_word_count() {
        let mut words = vec![spirv::MAGIC_NUMBER, 0x10000, 0, 1, 0];
        words.push(Op::Nop as u32);
        let err = Module::parse(&words).unwrap_err();
        assert_eq!(err, Error::Parse("zero word count at word 5".into()));
    }

    #[test]
    fn test_reassembly_is_identity_for_canonical_modules() {
        let words = fixtures::compute_shader();
        let module = Module::parse(&words).unwrap();
        assert_eq!(module.assemble(Assembly::Full), words);
    }

    #[test]
    fn test_decoration_groups_are_expanded() {
        let words = fixtures::decoration_group_shader();
        let module = Module::parse(&words).unwrap();
        let binding = Decoration::Binding as u32;
        let targets: Vec<u32> = module
            .decorations
            .iter()
            .filter(|(_, d)| d.contains_key(&binding))
            .map(|(&id, _)| id)
            .collect();
        assert_eq!(targets.len(), 2);
        for id in targets {
            assert_eq!(
                module.decoration(id, binding),
                Some(&DecorationValue::Literals(vec![3]))
            );
        }
    }

    #[test]
    fn test_records_decoration_offsets() {
        let words = fixtures::compute_shader();
        let module = Module::parse(&words).unwrap();
        let buffer = fixtures::COMPUTE_BUFFER;
        let offset = module.decoration_offsets[&(buffer, Decoration::Binding as u32)];
        assert_eq!(words[offset as usize], 1);
    }
}
