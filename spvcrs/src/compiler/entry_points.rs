//! Entry points, execution modes and workgroup sizes

use super::Compiler;
use crate::ir::{ConstantValue, EntryPointDecl, ExecutionModeDecl};
use crate::{Error, Result};
use spirv::{BuiltIn, Decoration, ExecutionMode, ExecutionModel};

const OUTPUT_PRIMITIVES: u32 = 5270;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkgroupSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: String,
    pub execution_model: ExecutionModel,
    pub workgroup_size: WorkgroupSize,
}

/// A specialization constant and its `SpecId`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecializationConstant {
    pub id: u32,
    pub constant_id: u32,
}

/// Number of literal operands `set_execution_mode` stores for `mode`.
fn mode_operand_count(mode: u32) -> usize {
    if mode == OUTPUT_PRIMITIVES {
        return 1;
    }
    use ExecutionMode::*;
    match ExecutionMode::from_u32(mode) {
        Some(LocalSize | LocalSizeHint) => 3,
        Some(Invocations | OutputVertices | VecTypeHint | SubgroupSize | SubgroupsPerWorkgroup) => 1,
        _ => 0,
    }
}

impl Compiler {
    /// Every entry point in declaration order.
    pub fn get_entry_points(&self) -> Result<Vec<EntryPoint>> {
        self.module
            .entry_points
            .iter()
            .map(|entry| {
                Ok(EntryPoint {
                    name: entry.name.clone(),
                    execution_model: entry.model,
                    workgroup_size: self.workgroup_size(entry)?,
                })
            })
            .collect()
    }

    /// Makes `name` the entry point later queries and compiles refer to.
    pub fn set_entry_point(&mut self, name: &str, model: ExecutionModel) -> Result<()> {
        self.entry_point = self.find_entry_point(name, model)?;
        Ok(())
    }

    pub fn rename_entry_point(
        &mut self,
        old_name: &str,
        new_name: &str,
        model: ExecutionModel,
    ) -> Result<()> {
        let index = self.find_entry_point(old_name, model)?;
        if old_name == new_name {
            return Ok(());
        }
        if self.find_entry_point(new_name, model).is_ok() {
            return Err(Error::Reflection(format!(
                "Entry point name {new_name} is already in use."
            )));
        }
        self.module.entry_points[index].name = new_name.to_owned();
        if let Some(cleansed) = self.cleansed_names.remove(&(old_name.to_owned(), model)) {
            self.cleansed_names.insert((new_name.to_owned(), model), cleansed);
        }
        Ok(())
    }

    /// The name a backend emitted for an entry point in the last compile,
    /// or its declared name before any compile.
    pub fn get_cleansed_entry_point_name(
        &self,
        name: &str,
        model: ExecutionModel,
    ) -> Result<String> {
        self.find_entry_point(name, model)?;
        Ok(self
            .cleansed_names
            .get(&(name.to_owned(), model))
            .cloned()
            .unwrap_or_else(|| name.to_owned()))
    }

    pub fn execution_model(&self) -> Result<ExecutionModel> {
        Ok(self.current_entry()?.model)
    }

    /// Sets `mode` on the current entry point, replacing an earlier value.
    /// Only the arguments `mode` takes are kept.
    pub fn set_execution_mode(&mut self, mode: u32, arguments: [u32; 3]) -> Result<()> {
        let function = self.current_entry()?.function;
        let operands = arguments[..mode_operand_count(mode)].to_vec();
        if mode == ExecutionMode::LocalSize as u32 {
            self.remove_execution_mode(function, ExecutionMode::LocalSizeId as u32);
        }
        let decl = ExecutionModeDecl {
            function,
            mode,
            operands,
            uses_ids: false,
        };
        let existing = self
            .module
            .execution_modes
            .iter_mut()
            .find(|m| m.function == function && m.mode == mode);
        match existing {
            Some(existing) => *existing = decl,
            None => self.module.execution_modes.push(decl),
        }
        Ok(())
    }

    pub fn unset_execution_mode(&mut self, mode: u32) -> Result<()> {
        let function = self.current_entry()?.function;
        self.remove_execution_mode(function, mode);
        Ok(())
    }

    /// Argument `index` of `mode` on the current entry point, 0 if the mode
    /// is not set. `LocalSize` reports the constant values when the size is
    /// given through `LocalSizeId`.
    pub fn get_execution_mode_argument(&self, mode: u32, index: u32) -> Result<u32> {
        let function = self.current_entry()?.function;
        let index = index as usize;
        if mode == ExecutionMode::LocalSize as u32 {
            if let Some(ids) = self.execution_mode(function, ExecutionMode::LocalSizeId as u32) {
                return Ok(ids
                    .operands
                    .get(index)
                    .and_then(|id| self.module.constants.get(id))
                    .and_then(|c| c.scalar())
                    .unwrap_or(0));
            }
        }
        Ok(self
            .execution_mode(function, mode)
            .and_then(|m| m.operands.get(index).copied())
            .unwrap_or(0))
    }

    /// The specialization constants that size the current entry point's
    /// workgroup, plus the id of the `WorkgroupSize` built-in constant
    /// (0 if there is none). Dimensions that are not specializable are
    /// reported as `{0, 0}`.
    pub fn get_work_group_size_specialization_constants(
        &self,
    ) -> Result<([SpecializationConstant; 3], u32)> {
        let function = self.current_entry()?.function;
        let mut out = [SpecializationConstant::default(); 3];
        let spec = |id: u32| -> Option<SpecializationConstant> {
            let constant = self.module.constants.get(&id)?;
            constant.specialization.then(|| SpecializationConstant {
                id,
                constant_id: self.get_decoration(id, Decoration::SpecId as u32),
            })
        };

        if let Some(builtin) = self.workgroup_size_builtin() {
            if let Some(ConstantValue::Composite(components)) =
                self.module.constants.get(&builtin).map(|c| &c.value)
            {
                for (slot, &component) in out.iter_mut().zip(components) {
                    *slot = spec(component).unwrap_or_default();
                }
            }
            return Ok((out, builtin));
        }
        if let Some(ids) = self.execution_mode(function, ExecutionMode::LocalSizeId as u32) {
            for (slot, &id) in out.iter_mut().zip(&ids.operands) {
                *slot = spec(id).unwrap_or_default();
            }
        }
        Ok((out, 0))
    }

    /// Every specialization constant with a `SpecId`, sorted by id.
    pub fn get_specialization_constants(&self) -> Vec<SpecializationConstant> {
        let spec_id = Decoration::SpecId as u32;
        let mut constants: Vec<_> = self
            .module
            .constants
            .iter()
            .filter(|&(&id, ref c)| c.specialization && self.has_decoration(id, spec_id))
            .map(|(&id, _)| SpecializationConstant {
                id,
                constant_id: self.get_decoration(id, spec_id),
            })
            .collect();
        constants.sort_by_key(|c| c.id);
        constants
    }

    fn find_entry_point(&self, name: &str, model: ExecutionModel) -> Result<usize> {
        self.module
            .entry_points
            .iter()
            .position(|e| e.name == name && e.model == model)
            .ok_or_else(|| Error::Reflection("Entry point does not exist.".into()))
    }

    fn execution_mode(&self, function: u32, mode: u32) -> Option<&ExecutionModeDecl> {
        self.module
            .execution_modes
            .iter()
            .find(|m| m.function == function && m.mode == mode)
    }

    fn remove_execution_mode(&mut self, function: u32, mode: u32) {
        self.module
            .execution_modes
            .retain(|m| !(m.function == function && m.mode == mode));
    }

    /// The constant decorated `BuiltIn WorkgroupSize`, if any.
    fn workgroup_size_builtin(&self) -> Option<u32> {
        let builtin = Decoration::BuiltIn as u32;
        let mut ids: Vec<u32> = self
            .module
            .constants
            .keys()
            .copied()
            .filter(|&id| {
                self.has_decoration(id, builtin)
                    && self.get_decoration(id, builtin) == BuiltIn::WorkgroupSize as u32
            })
            .collect();
        ids.sort_unstable();
        ids.first().copied()
    }

    fn workgroup_size(&self, entry: &EntryPointDecl) -> Result<WorkgroupSize> {
        // Sizes computed by OpSpecConstantOp are only known to backends
        let scalar = |id: &u32| {
            self.module
                .constants
                .get(id)
                .map(|c| c.scalar().unwrap_or(0))
                .ok_or_else(|| Error::invalid_id(*id, "not a constant"))
        };
        let mut size = [0u32; 3];
        if let Some(literals) = self.execution_mode(entry.function, ExecutionMode::LocalSize as u32)
        {
            for (slot, &value) in size.iter_mut().zip(&literals.operands) {
                *slot = value;
            }
        }
        if let Some(ids) = self.execution_mode(entry.function, ExecutionMode::LocalSizeId as u32) {
            for (slot, id) in size.iter_mut().zip(&ids.operands) {
                *slot = scalar(id)?;
            }
        }
        if let Some(builtin) = self.workgroup_size_builtin() {
            if let Some(ConstantValue::Composite(components)) =
                self.module.constants.get(&builtin).map(|c| &c.value)
            {
                for (slot, id) in size.iter_mut().zip(components) {
                    *slot = scalar(id)?;
                }
            }
        }
        let [x, y, z] = size;
        Ok(WorkgroupSize { x, y, z })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use pretty_assertions::assert_eq;

    fn compute() -> Compiler {
        Compiler::new(&fixtures::compute_shader()).unwrap()
    }

    #[test]
    fn test_compute_entry_point() {
        let entries = compute().get_entry_points().unwrap();
        assert_eq!(
            entries,
            vec![EntryPoint {
                name: "main".into(),
                execution_model: ExecutionModel::GLCompute,
                workgroup_size: WorkgroupSize { x: 8, y: 4, z: 1 },
            }]
        );
    }

    #[test]
    fn test_fragment_has_no_workgroup() {
        let compiler = Compiler::new(&fixtures::fragment_shader()).unwrap();
        let entries = compiler.get_entry_points().unwrap();
        assert_eq!(entries[0].execution_model, ExecutionModel::Fragment);
        assert_eq!(entries[0].workgroup_size, WorkgroupSize::default());
        assert_eq!(compiler.execution_model().unwrap(), ExecutionModel::Fragment);
    }

    #[test]
    fn test_set_missing_entry_point() {
        let mut compiler = compute();
        let err = compiler
            .set_entry_point("main", ExecutionModel::Vertex)
            .unwrap_err();
        assert_eq!(err, Error::Reflection("Entry point does not exist.".into()));
        compiler
            .set_entry_point("main", ExecutionModel::GLCompute)
            .unwrap();
    }

    #[test]
    fn test_rename_entry_point() {
        let mut compiler = compute();
        compiler
            .rename_entry_point("main", "cs_main", ExecutionModel::GLCompute)
            .unwrap();
        assert_eq!(compiler.get_entry_points().unwrap()[0].name, "cs_main");
        assert_eq!(
            compiler
                .get_cleansed_entry_point_name("cs_main", ExecutionModel::GLCompute)
                .unwrap(),
            "cs_main"
        );
        assert!(compiler
            .rename_entry_point("main", "other", ExecutionModel::GLCompute)
            .is_err());
        assert!(compiler
            .get_cleansed_entry_point_name("main", ExecutionModel::GLCompute)
            .is_err());

        let reparsed = Compiler::new(&compiler.compile()).unwrap();
        assert_eq!(reparsed.get_entry_points().unwrap()[0].name, "cs_main");
    }

    #[test]
    fn test_cleansed_name_after_compile() {
        let mut compiler = compute();
        compiler.set_cleansed_name("main", ExecutionModel::GLCompute, "main0".into());
        assert_eq!(
            compiler
                .get_cleansed_entry_point_name("main", ExecutionModel::GLCompute)
                .unwrap(),
            "main0"
        );
    }

    #[test]
    fn test_execution_mode_arguments() {
        let mut compiler = compute();
        let local_size = ExecutionMode::LocalSize as u32;
        assert_eq!(compiler.get_execution_mode_argument(local_size, 0).unwrap(), 8);
        assert_eq!(compiler.get_execution_mode_argument(local_size, 1).unwrap(), 4);
        assert_eq!(compiler.get_execution_mode_argument(local_size, 3).unwrap(), 0);

        compiler.set_execution_mode(local_size, [64, 1, 1]).unwrap();
        assert_eq!(
            compiler.get_entry_points().unwrap()[0].workgroup_size,
            WorkgroupSize { x: 64, y: 1, z: 1 }
        );

        compiler.unset_execution_mode(local_size).unwrap();
        assert_eq!(compiler.get_execution_mode_argument(local_size, 0).unwrap(), 0);
    }

    #[test]
    fn test_flag_mode_drops_arguments() {
        let mut compiler = compute();
        let mode = ExecutionMode::DepthReplacing as u32;
        compiler.set_execution_mode(mode, [1, 2, 3]).unwrap();
        let decl = compiler
            .module()
            .execution_modes
            .iter()
            .find(|m| m.mode == mode)
            .unwrap();
        assert!(decl.operands.is_empty());
    }

    #[test]
    fn test_local_size_id_with_spec_op() {
        let compiler = Compiler::new(&fixtures::local_size_id_shader()).unwrap();
        assert_eq!(
            compiler.get_entry_points().unwrap()[0].workgroup_size,
            WorkgroupSize { x: 1, y: 0, z: 1 }
        );
    }

    #[test]
    fn test_workgroup_builtin() {
        let compiler = Compiler::new(&fixtures::workgroup_builtin_shader()).unwrap();
        assert_eq!(
            compiler.get_entry_points().unwrap()[0].workgroup_size,
            WorkgroupSize { x: 16, y: 2, z: 1 }
        );
        let (constants, builtin) = compiler
            .get_work_group_size_specialization_constants()
            .unwrap();
        assert_eq!(builtin, 8);
        assert_eq!(
            constants,
            [
                SpecializationConstant { id: 5, constant_id: 0 },
                SpecializationConstant { id: 6, constant_id: 1 },
                SpecializationConstant::default(),
            ]
        );
    }

    #[test]
    fn test_literal_workgroup_is_not_specializable() {
        let (constants, builtin) = compute()
            .get_work_group_size_specialization_constants()
            .unwrap();
        assert_eq!(builtin, 0);
        assert_eq!(constants, [SpecializationConstant::default(); 3]);
    }

    #[test]
    fn test_specialization_constants() {
        let compiler = Compiler::new(&fixtures::fragment_shader()).unwrap();
        assert_eq!(
            compiler.get_specialization_constants(),
            vec![SpecializationConstant {
                id: fixtures::FRAGMENT_SPEC_CONSTANT,
                constant_id: 7
            }]
        );
        let compiler = Compiler::new(&fixtures::workgroup_builtin_shader()).unwrap();
        let ids: Vec<u32> = compiler
            .get_specialization_constants()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![5, 6]);
    }
}
