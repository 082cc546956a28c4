//! Reflection and mutation over a parsed module
//!
//! [`Compiler`] answers the questions a host asks about a shader before
//! binding it, and records edits (names, decorations, constants, entry
//! points) that are applied when the module is re-assembled or handed to a
//! backend.

mod analysis;
mod decorations;
mod entry_points;
mod layout;
mod names;
mod resources;
mod state;
mod types;

pub use decorations::{COUNTER_BUFFER, USER_SEMANTIC, USER_TYPE};
pub use entry_points::{EntryPoint, SpecializationConstant, WorkgroupSize};
pub use resources::{BufferRange, CombinedImageSampler, Resource, ShaderResources};
pub use types::{BaseType, ImageInfo, TypeInfo};

use crate::ir::{Assembly, EntryPointDecl, Module, VariableDecl};
use crate::{Error, Result};
use spirv::ExecutionModel;
use std::collections::{HashMap, HashSet};

/// A SPIR-V module plus the reflection state built on top of it.
#[derive(Debug, Clone)]
pub struct Compiler {
    pub(crate) module: Module,
    /// Index of the current entry point in `module.entry_points`
    entry_point: usize,
    /// Backend-visible entry point names from the last compile
    cleansed_names: HashMap<(String, ExecutionModel), String>,
    qualified_names: HashMap<(u32, u32), String>,
    remapped_variables: HashSet<u32>,
    remapped_components: HashMap<u32, u32>,
    combined_image_samplers: Vec<CombinedImageSampler>,
    dummy_sampler: Option<u32>,
    enabled_interface: Option<HashSet<u32>>,
}

impl Compiler {
    /// Parses `words` and selects the first entry point.
    pub fn new(words: &[u32]) -> Result<Self> {
        Ok(Self::from_module(Module::parse(words)?))
    }

    pub fn from_module(module: Module) -> Self {
        Compiler {
            module,
            entry_point: 0,
            cleansed_names: HashMap::new(),
            qualified_names: HashMap::new(),
            remapped_variables: HashSet::new(),
            remapped_components: HashMap::new(),
            combined_image_samplers: Vec::new(),
            dummy_sampler: None,
            enabled_interface: None,
        }
    }

    /// The module with every edit made so far.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Re-assembles the module with every edit applied.
    pub fn compile(&self) -> Vec<u32> {
        self.module.assemble(Assembly::Full)
    }

    pub fn current_id_bound(&self) -> u32 {
        self.module.bound()
    }

    /// Capabilities declared with `OpCapability`, in declaration order.
    pub fn declared_capabilities(&self) -> &[u32] {
        &self.module.capabilities
    }

    /// Extensions declared with `OpExtension`, in declaration order.
    pub fn declared_extensions(&self) -> &[String] {
        &self.module.extensions
    }

    pub(crate) fn current_entry(&self) -> Result<&EntryPointDecl> {
        self.module
            .entry_points
            .get(self.entry_point)
            .ok_or_else(|| Error::Reflection("Entry point does not exist.".into()))
    }

    pub(crate) fn current_entry_mut(&mut self) -> Result<&mut EntryPointDecl> {
        self.module
            .entry_points
            .get_mut(self.entry_point)
            .ok_or_else(|| Error::Reflection("Entry point does not exist.".into()))
    }

    pub(crate) fn variable(&self, id: u32) -> Result<&VariableDecl> {
        self.module
            .variables
            .get(&id)
            .ok_or_else(|| Error::invalid_id(id, "not a variable"))
    }

    /// Records the name a backend gave an entry point.
    pub(crate) fn set_cleansed_name(
        &mut self,
        name: &str,
        model: ExecutionModel,
        cleansed: String,
    ) {
        self.cleansed_names
            .insert((name.to_owned(), model), cleansed);
    }

    pub(crate) fn enabled_interface(&self) -> Option<&HashSet<u32>> {
        self.enabled_interface.as_ref()
    }
}
