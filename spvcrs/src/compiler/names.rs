//! Debug names

use super::{BaseType, Compiler, Resource};
use crate::Result;
use spirv::Decoration;

impl Compiler {
    /// The `OpName` of `id`, empty if it has none.
    pub fn get_name(&self, id: u32) -> String {
        self.module.names.get(&id).cloned().unwrap_or_default()
    }

    pub fn set_name(&mut self, id: u32, name: &str) {
        self.module.names.insert(id, name.to_owned());
    }

    /// The name a backend uses for an unnamed id.
    pub fn get_fallback_name(&self, id: u32) -> String {
        format!("_{id}")
    }

    /// The name a backend uses for an unnamed block variable: its own name,
    /// or one derived from its block type and id.
    pub fn get_block_fallback_name(&self, id: u32) -> Result<String> {
        let type_id = self.variable(id)?.type_id;
        let name = self.get_name(id);
        if !name.is_empty() {
            return Ok(name);
        }
        let block = self.get_type(type_id)?.self_id;
        Ok(format!("_{block}_{id}"))
    }

    pub fn get_member_name(&self, id: u32, index: u32) -> String {
        self.module
            .member_names
            .get(&(id, index))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_member_name(&mut self, id: u32, index: u32, name: &str) {
        self.module.member_names.insert((id, index), name.to_owned());
    }

    /// Fully qualified name a backend uses for a flattened struct member.
    /// Qualified names are reflection state only and are not written out.
    pub fn get_member_qualified_name(&self, id: u32, index: u32) -> String {
        self.qualified_names
            .get(&(id, index))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_member_qualified_name(&mut self, id: u32, index: u32, name: &str) {
        self.qualified_names.insert((id, index), name.to_owned());
    }

    /// The block name a backend declares for block variable `id`: the name
    /// of its block type, or the block fallback name if that is empty.
    pub fn get_remapped_declared_block_name(&self, id: u32) -> Result<String> {
        let type_id = self.variable(id)?.type_id;
        let block = self.get_type(type_id)?.self_id;
        let name = self.get_name(block);
        if name.is_empty() {
            self.get_block_fallback_name(id)
        } else {
            Ok(name)
        }
    }

    /// Renames every resource in `resources` that sits at `location`.
    ///
    /// Struct-typed interface blocks get their type and members renamed too
    /// so the names stay consistent across stages.
    pub fn rename_interface_variable(
        &mut self,
        resources: &[Resource],
        location: u32,
        name: &str,
    ) -> Result<()> {
        let decoration = Decoration::Location as u32;
        for resource in resources {
            if !self.has_decoration(resource.id, decoration)
                || self.get_decoration(resource.id, decoration) != location
            {
                continue;
            }
            let info = self.get_type(resource.base_type_id)?;
            if info.base_type == BaseType::Struct {
                self.set_name(
                    resource.base_type_id,
                    &format!("SPIRV_Cross_Interface_Location{location}"),
                );
                for index in 0..info.member_types.len() as u32 {
                    self.set_member_name(
                        resource.base_type_id,
                        index,
                        &format!("InterfaceMember{index}"),
                    );
                }
            }
            self.set_name(resource.id, name);
        }
        Ok(())
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
    fn test_names() {
        let mut compiler = fragment();
        assert_eq!(compiler.get_name(fixtures::FRAGMENT_UBO), "ubo");
        assert_eq!(compiler.get_name(2), "");
        compiler.set_name(2, "void_t");
        assert_eq!(compiler.get_name(2), "void_t");
        assert_eq!(compiler.get_fallback_name(2), "_2");
    }

    #[test]
    fn test_block_names() {
        let mut compiler = fragment();
        let ubo = fixtures::FRAGMENT_UBO;
        assert_eq!(compiler.get_remapped_declared_block_name(ubo).unwrap(), "UBO");
        compiler.set_name(ubo, "");
        assert_eq!(compiler.get_block_fallback_name(ubo).unwrap(), "_10_12");
        compiler.set_name(fixtures::FRAGMENT_UBO_BLOCK, "");
        assert_eq!(compiler.get_remapped_declared_block_name(ubo).unwrap(), "_10_12");
        assert!(compiler.get_block_fallback_name(fixtures::FRAGMENT_UBO_BLOCK).is_err());
    }

    #[test]
    fn test_member_names() {
        let mut compiler = fragment();
        let block = fixtures::FRAGMENT_UBO_BLOCK;
        assert_eq!(compiler.get_member_name(block, 1), "transform");
        compiler.set_member_name(block, 1, "model");
        assert_eq!(compiler.get_member_name(block, 1), "model");
        assert_eq!(compiler.get_member_qualified_name(block, 1), "");
        compiler.set_member_qualified_name(block, 1, "ubo.model");
        assert_eq!(compiler.get_member_qualified_name(block, 1), "ubo.model");
    }

    #[test]
    fn test_rename_interface_variable() {
        let mut compiler = fragment();
        let inputs = compiler.get_shader_resources().unwrap().stage_inputs;
        compiler
            .rename_interface_variable(&inputs, 1, "in_uv")
            .unwrap();
        assert_eq!(compiler.get_name(fixtures::FRAGMENT_INPUT), "in_uv");
        compiler
            .rename_interface_variable(&inputs, 5, "unused")
            .unwrap();
        assert_eq!(compiler.get_name(fixtures::FRAGMENT_INPUT), "in_uv");
    }
}
