//! Constant patching and per-variable backend state

use super::Compiler;
use crate::ir::{ConstantValue, TypeDecl};
use crate::{Error, Result};
use spirv::Op;

impl Compiler {
    /// Overwrites the value of scalar constant `id`.
    ///
    /// 64-bit types take the whole value, narrower types its low word, and
    /// booleans test it against zero. The change is written back into the
    /// module, so it shows up in every later compile.
    pub fn set_scalar_constant(&mut self, id: u32, value: u64) -> Result<()> {
        let constant = self
            .module
            .constants
            .get(&id)
            .ok_or_else(|| Error::invalid_id(id, "not a constant"))?;
        let specialization = constant.specialization;
        let type_id = constant.type_id;

        let (new_value, opcode, words) = match constant.value {
            ConstantValue::Scalar(_) => {
                let width = match self.module.types.get(&type_id) {
                    Some(TypeDecl::Int { width, .. } | TypeDecl::Float { width }) => *width,
                    _ => return Err(Error::invalid_id(type_id, "not a scalar type")),
                };
                let words = if width > 32 {
                    vec![value as u32, (value >> 32) as u32]
                } else {
                    vec![value as u32]
                };
                let opcode = if specialization {
                    Op::SpecConstant
                } else {
                    Op::Constant
                };
                (ConstantValue::Scalar(words.clone()), opcode, words)
            }
            ConstantValue::Bool(_) => {
                let on = value != 0;
                let opcode = match (specialization, on) {
                    (true, true) => Op::SpecConstantTrue,
                    (true, false) => Op::SpecConstantFalse,
                    (false, true) => Op::ConstantTrue,
                    (false, false) => Op::ConstantFalse,
                };
                (ConstantValue::Bool(on), opcode, Vec::new())
            }
            ConstantValue::Composite(_) | ConstantValue::Null | ConstantValue::Operation => {
                return Err(Error::Reflection(format!(
                    "Constant {id} is not a scalar constant."
                )));
            }
        };

        if let Some(inst) = self.module.global_mut(id) {
            inst.opcode = opcode as u16;
            inst.operands.truncate(2);
            inst.operands.extend(words);
        }
        if let Some(constant) = self.module.constants.get_mut(&id) {
            constant.value = new_value;
        }
        Ok(())
    }

    /// Marks variable `id` as handled outside normal emission, for example a
    /// subpass input remapped to a framebuffer fetch. Remapped images and
    /// samplers are left out of [`Compiler::get_shader_resources`].
    pub fn set_remapped_variable_state(&mut self, id: u32, remapped: bool) -> Result<()> {
        self.variable(id)?;
        if remapped {
            self.remapped_variables.insert(id);
        } else {
            self.remapped_variables.remove(&id);
        }
        Ok(())
    }

    pub fn get_remapped_variable_state(&self, id: u32) -> Result<bool> {
        self.variable(id)?;
        Ok(self.remapped_variables.contains(&id))
    }

    /// Number of components a remapped subpass input reads.
    pub fn set_subpass_input_remapped_components(&mut self, id: u32, components: u32) -> Result<()> {
        self.variable(id)?;
        self.remapped_components.insert(id, components);
        Ok(())
    }

    pub fn get_subpass_input_remapped_components(&self, id: u32) -> Result<u32> {
        self.variable(id)?;
        Ok(self.remapped_components.get(&id).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use pretty_assertions::assert_eq;

    fn fragment() -> Compiler {
        Compiler::new(&fixtures::fragment_shader()).unwrap()
    }

    #[test]
    fn test_set_spec_constant() {
        let mut compiler = fragment();
        let id = fixtures::FRAGMENT_SPEC_CONSTANT;
        compiler.set_scalar_constant(id, 0x1_0000_0003).unwrap();
        assert_eq!(compiler.module().constants[&id].scalar(), Some(3));

        let reparsed = Compiler::new(&compiler.compile()).unwrap();
        let constant = &reparsed.module().constants[&id];
        assert_eq!(constant.value, ConstantValue::Scalar(vec![3]));
        assert!(constant.specialization);
    }

    #[test]
    fn test_set_float_constant() {
        let mut compiler = Compiler::new(&fixtures::compute_shader()).unwrap();
        compiler
            .set_scalar_constant(16, u64::from(3.0f32.to_bits()))
            .unwrap();
        let inst = compiler.module().global(16).unwrap();
        assert_eq!(inst.operands, vec![4, 16, 3.0f32.to_bits()]);
    }

    #[test]
    fn test_set_non_constant() {
        let mut compiler = fragment();
        let err = compiler
            .set_scalar_constant(fixtures::FRAGMENT_UBO, 1)
            .unwrap_err();
        assert_eq!(err, Error::invalid_id(fixtures::FRAGMENT_UBO, "not a constant"));
    }

    #[test]
    fn test_composite_is_rejected() {
        let mut compiler = Compiler::new(&fixtures::workgroup_builtin_shader()).unwrap();
        assert!(compiler.set_scalar_constant(8, 1).is_err());
    }

    #[test]
    fn test_remapped_state() {
        let mut compiler = fragment();
        let image = fixtures::FRAGMENT_IMAGE;
        assert!(!compiler.get_remapped_variable_state(image).unwrap());
        compiler.set_remapped_variable_state(image, true).unwrap();
        assert!(compiler.get_remapped_variable_state(image).unwrap());
        compiler.set_subpass_input_remapped_components(image, 3).unwrap();
        assert_eq!(compiler.get_subpass_input_remapped_components(image).unwrap(), 3);
        assert!(compiler.set_remapped_variable_state(2, true).is_err());
        assert!(compiler.get_subpass_input_remapped_components(2).is_err());
    }

    #[test]
    fn test_remapped_sampler_is_hidden() {
        let mut compiler = fragment();
        let sampler = fixtures::FRAGMENT_SAMPLER;
        let ids = |compiler: &Compiler| -> Vec<u32> {
            let resources = compiler.get_shader_resources().unwrap();
            resources.separate_samplers.iter().map(|r| r.id).collect()
        };
        assert_eq!(ids(&compiler), vec![sampler]);

        compiler.set_remapped_variable_state(sampler, true).unwrap();
        assert_eq!(ids(&compiler), Vec::<u32>::new());
        let resources = compiler.get_shader_resources().unwrap();
        assert_eq!(resources.separate_images.len(), 1);

        compiler.set_remapped_variable_state(sampler, false).unwrap();
        assert_eq!(ids(&compiler), vec![sampler]);
    }
}
