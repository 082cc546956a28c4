//! Lowering of the current entry point to naga IR for the source backends

use crate::compiler::Compiler;
use crate::ir::{Assembly, Module};
use crate::{Error, Result};
use naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};
use naga::{Arena, BinaryOperator, Expression, Handle, Span, Statement};
use spirv::{ExecutionModel, StorageClass};

/// A validated naga module holding only the current entry point.
pub(crate) struct Lowered {
    pub module: naga::Module,
    pub info: ModuleInfo,
    pub stage: naga::ShaderStage,
    pub entry_point: String,
    pub model: ExecutionModel,
}

/// Clip-space adjustments applied to vertex outputs while lowering.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ClipSpace {
    /// Negates the Y of the position output.
    pub invert_y: bool,
    /// Maps the position's Z from `[-w, w]` to `[0, w]`.
    pub remap_depth: bool,
}

pub(crate) fn shader_stage(model: ExecutionModel) -> Result<naga::ShaderStage> {
    match model {
        ExecutionModel::Vertex => Ok(naga::ShaderStage::Vertex),
        ExecutionModel::Fragment => Ok(naga::ShaderStage::Fragment),
        ExecutionModel::GLCompute => Ok(naga::ShaderStage::Compute),
        other => Err(Error::Unsupported(format!("{other:?} shaders"))),
    }
}

impl Compiler {
    /// A copy of the module reduced to what a backend should see: the
    /// current entry point only, and its interface trimmed to the enabled
    /// stage variables if a set was given.
    pub(crate) fn backend_module(&self) -> Result<Module> {
        let mut entry = self.current_entry()?.clone();
        if let Some(enabled) = self.enabled_interface() {
            let active = self.get_active_interface_variables()?;
            entry.interface.retain(|id| {
                let stage_io = self.module.variables.get(id).is_some_and(|var| {
                    matches!(var.storage, StorageClass::Input | StorageClass::Output)
                });
                !stage_io || enabled.contains(id) || active.contains(id)
            });
        }
        let mut module = self.module.clone();
        module
            .execution_modes
            .retain(|mode| mode.function == entry.function);
        module.entry_points = vec![entry];
        Ok(module)
    }

    /// Parses `module` with naga, applies the `clip_space` adjustments to a
    /// vertex entry point and validates the result.
    pub(crate) fn lower(&self, module: &Module, clip_space: ClipSpace) -> Result<Lowered> {
        let entry = module
            .entry_points
            .first()
            .ok_or_else(|| Error::Reflection("Entry point does not exist.".into()))?;
        let stage = shader_stage(entry.model)?;

        let bytes: Vec<u8> = module
            .assemble(Assembly::Backend)
            .iter()
            .flat_map(|word| word.to_le_bytes())
            .collect();
        let options = naga::front::spv::Options {
            adjust_coordinate_space: clip_space.invert_y,
            ..Default::default()
        };
        let mut lowered = naga::front::spv::parse_u8_slice(&bytes, &options)
            .map_err(|e| Error::Frontend(e.to_string()))?;
        if clip_space.remap_depth && stage == naga::ShaderStage::Vertex {
            remap_clip_depth(&mut lowered);
        }
        let info = Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&lowered)
            .map_err(|e| Error::Validation(e.into_inner().to_string()))?;
        log::debug!(
            "lowered entry point {} ({} functions, {} globals)",
            entry.name,
            lowered.functions.len(),
            lowered.global_variables.len()
        );

        Ok(Lowered {
            module: lowered,
            info,
            stage,
            entry_point: entry.name.clone(),
            model: entry.model,
        })
    }
}

/// Where the position sits in a vertex entry point's result.
enum PositionOutput {
    Whole,
    Member {
        index: u32,
        count: u32,
        ty: Handle<naga::Type>,
    },
}

fn is_position(binding: Option<&naga::Binding>) -> bool {
    matches!(
        binding,
        Some(naga::Binding::BuiltIn(naga::BuiltIn::Position { .. }))
    )
}

/// Rewrites every value the vertex entry point returns so that the
/// position's Z becomes `(z + w) * 0.5`.
fn remap_clip_depth(module: &mut naga::Module) {
    let Some(entry) = module.entry_points.first_mut() else {
        return;
    };
    let Some(result) = entry.function.result.as_ref() else {
        return;
    };
    let (output, position_ty) = if is_position(result.binding.as_ref()) {
        (PositionOutput::Whole, result.ty)
    } else {
        let naga::TypeInner::Struct { ref members, .. } = module.types[result.ty].inner else {
            return;
        };
        let Some(index) = members.iter().position(|m| is_position(m.binding.as_ref())) else {
            return;
        };
        let output = PositionOutput::Member {
            index: index as u32,
            count: members.len() as u32,
            ty: result.ty,
        };
        (output, members[index].ty)
    };

    let function = &mut entry.function;
    let rewriter = DepthRewriter {
        output,
        position_ty,
    };
    rewriter.block(&mut function.body, &mut function.expressions);
    log::debug!("remapped clip space depth of {}", entry.name);
}

struct DepthRewriter {
    output: PositionOutput,
    position_ty: Handle<naga::Type>,
}

impl DepthRewriter {
    fn block(&self, block: &mut naga::Block, expressions: &mut Arena<Expression>) {
        let mut index = 0;
        while index < block.len() {
            let emit = match block[index] {
                Statement::Block(ref mut inner) => {
                    self.block(inner, expressions);
                    None
                }
                Statement::If {
                    ref mut accept,
                    ref mut reject,
                    ..
                } => {
                    self.block(accept, expressions);
                    self.block(reject, expressions);
                    None
                }
                Statement::Switch { ref mut cases, .. } => {
                    for case in cases.iter_mut() {
                        self.block(&mut case.body, expressions);
                    }
                    None
                }
                Statement::Loop {
                    ref mut body,
                    ref mut continuing,
                    ..
                } => {
                    self.block(body, expressions);
                    self.block(continuing, expressions);
                    None
                }
                Statement::Return {
                    value: Some(ref mut value),
                } => {
                    let (emit, rewritten) = self.value(*value, expressions);
                    *value = rewritten;
                    Some(emit)
                }
                _ => None,
            };
            if let Some(emit) = emit {
                let span = block
                    .span_iter()
                    .nth(index)
                    .map_or_else(Span::default, |(_, span)| *span);
                let mut prefix = naga::Block::with_capacity(1);
                prefix.push(emit, span);
                block.splice(index..index, prefix);
                index += 1;
            }
            index += 1;
        }
    }

    /// Appends the expressions recomputing `value` and returns the `Emit`
    /// covering them along with the new value.
    fn value(
        &self,
        value: Handle<Expression>,
        expressions: &mut Arena<Expression>,
    ) -> (Statement, Handle<Expression>) {
        let span = expressions.get_span(value);
        let half = expressions.append(Expression::Literal(naga::Literal::F32(0.5)), span);
        let start = expressions.len();

        let (position, members) = match self.output {
            PositionOutput::Whole => (value, Vec::new()),
            PositionOutput::Member { index, count, .. } => {
                let members: Vec<_> = (0..count)
                    .map(|i| {
                        expressions.append(Expression::AccessIndex { base: value, index: i }, span)
                    })
                    .collect();
                (members[index as usize], members)
            }
        };
        let mut lanes = [position; 4];
        for (i, lane) in lanes.iter_mut().enumerate() {
            *lane = expressions.append(
                Expression::AccessIndex {
                    base: position,
                    index: i as u32,
                },
                span,
            );
        }
        let sum = expressions.append(
            Expression::Binary {
                op: BinaryOperator::Add,
                left: lanes[2],
                right: lanes[3],
            },
            span,
        );
        lanes[2] = expressions.append(
            Expression::Binary {
                op: BinaryOperator::Multiply,
                left: sum,
                right: half,
            },
            span,
        );
        let mut rewritten = expressions.append(
            Expression::Compose {
                ty: self.position_ty,
                components: lanes.to_vec(),
            },
            span,
        );
        if let PositionOutput::Member { index, ty, .. } = self.output {
            let mut components = members;
            components[index as usize] = rewritten;
            rewritten = expressions.append(Expression::Compose { ty, components }, span);
        }

        (Statement::Emit(expressions.range_from(start)), rewritten)
    }
}
