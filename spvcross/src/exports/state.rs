//! Edits to constants and per-variable compiler state

use super::{getter, setter, with_compiler_mut, write};
use crate::array::ScString;
use crate::handle::ScCompiler;
use crate::ScResult;

setter!(
    /// Replaces the value of scalar constant `id`. Only the low 32 bits are
    /// used for types up to 32 bits wide.
    set_scalar_constant(id: u32, value: u64),
    |c| c.set_scalar_constant(id, value)?
);

setter!(
    set_remapped_variable_state(id: u32, remapped: bool),
    |c| c.set_remapped_variable_state(id, remapped)?
);

getter!(
    get_remapped_variable_state(id: u32) -> bool,
    |c| c.get_remapped_variable_state(id)?
);

setter!(
    set_subpass_input_remapped_components(id: u32, components: u32),
    |c| c.set_subpass_input_remapped_components(id, components)?
);

getter!(
    get_subpass_input_remapped_components(id: u32) -> u32,
    |c| c.get_subpass_input_remapped_components(id)?
);

setter!(build_combined_image_samplers(), |c| c.build_combined_image_samplers()?);

/// Adds a sampler for images that are read without one and stores its id
/// in `*result`, or 0 if no image needs it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_build_dummy_sampler_for_combined_images(
    compiler: *mut ScCompiler,
    result: *mut u32,
    error: *mut ScString,
) -> ScResult {
    with_compiler_mut(compiler, error, |handle| {
        let id = handle.base_mut().build_dummy_sampler_for_combined_images()?;
        write(result, id)
    })
}
