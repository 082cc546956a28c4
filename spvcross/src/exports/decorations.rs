//! Names and decorations

use super::{getter, setter, with_compiler, with_compiler_mut, write};
use crate::array::{ScArray, ScString};
use crate::handle::ScCompiler;
use crate::records::ScResource;
use crate::{Result, ScResult};
use spvcrs::Resource;

getter!(get_name(id: u32) -> ScString, |c, alloc| alloc.string(&c.get_name(id))?);

setter!(set_name(id: u32, name: ScString), |c| c.set_name(id, name.as_str("name")?));

getter!(
    /// `_<id>`
    get_fallback_name(id: u32) -> ScString,
    |c, alloc| alloc.string(&c.get_fallback_name(id))?
);

getter!(
    /// `_<type>_<id>` for block variable `id`
    get_block_fallback_name(id: u32) -> ScString,
    |c, alloc| alloc.string(&c.get_block_fallback_name(id)?)?
);

getter!(
    get_remapped_declared_block_name(id: u32) -> ScString,
    |c, alloc| alloc.string(&c.get_remapped_declared_block_name(id)?)?
);

setter!(
    set_decoration(id: u32, decoration: u32, argument: u32),
    |c| c.set_decoration(id, decoration, argument)?
);

setter!(
    set_decoration_string(id: u32, decoration: u32, argument: ScString),
    |c| c.set_decoration_string(id, decoration, argument.as_str("argument")?)?
);

getter!(has_decoration(id: u32, decoration: u32) -> bool, |c| c.has_decoration(id, decoration));

getter!(
    /// 0 when unset, 1 for a set flag decoration
    get_decoration(id: u32, decoration: u32) -> u32,
    |c| c.get_decoration(id, decoration)
);

getter!(
    get_decoration_string(id: u32, decoration: u32) -> ScString,
    |c, alloc| alloc.string(&c.get_decoration_string(id, decoration))?
);

setter!(unset_decoration(id: u32, decoration: u32), |c| c.unset_decoration(id, decoration));

getter!(
    get_member_name(id: u32, index: u32) -> ScString,
    |c, alloc| alloc.string(&c.get_member_name(id, index))?
);

setter!(
    set_member_name(id: u32, index: u32, name: ScString),
    |c| c.set_member_name(id, index, name.as_str("name")?)
);

getter!(
    get_member_qualified_name(id: u32, index: u32) -> ScString,
    |c, alloc| alloc.string(&c.get_member_qualified_name(id, index))?
);

setter!(
    set_member_qualified_name(id: u32, index: u32, name: ScString),
    |c| c.set_member_qualified_name(id, index, name.as_str("name")?)
);

getter!(
    get_member_decoration(id: u32, index: u32, decoration: u32) -> u32,
    |c| c.get_member_decoration(id, index, decoration)
);

getter!(
    get_member_decoration_string(id: u32, index: u32, decoration: u32) -> ScString,
    |c, alloc| alloc.string(&c.get_member_decoration_string(id, index, decoration))?
);

getter!(
    has_member_decoration(id: u32, index: u32, decoration: u32) -> bool,
    |c| c.has_member_decoration(id, index, decoration)
);

setter!(
    set_member_decoration(id: u32, index: u32, decoration: u32, argument: u32),
    |c| c.set_member_decoration(id, index, decoration, argument)?
);

setter!(
    set_member_decoration_string(id: u32, index: u32, decoration: u32, argument: ScString),
    |c| c.set_member_decoration_string(id, index, decoration, argument.as_str("argument")?)?
);

setter!(
    unset_member_decoration(id: u32, index: u32, decoration: u32),
    |c| c.unset_member_decoration(id, index, decoration)
);

/// Word offset of the operand of `decoration` on `id` in the original
/// binary. `*result` tells whether the decoration was found; `*word_offset`
/// is 0 when it was not.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_get_binary_offset_for_decoration(
    compiler: *const ScCompiler,
    id: u32,
    decoration: u32,
    word_offset: *mut u32,
    result: *mut bool,
    error: *mut ScString,
) -> ScResult {
    with_compiler(compiler, error, |handle| {
        let offset = handle.base().get_binary_offset_for_decoration(id, decoration);
        write(word_offset, offset.unwrap_or(0))?;
        write(result, offset.is_some())
    })
}

getter!(
    buffer_is_hlsl_counter_buffer(id: u32) -> bool,
    |c| c.buffer_is_hlsl_counter_buffer(id)
);

/// The counter buffer of buffer `id`. `*result` tells whether there is one.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_buffer_get_hlsl_counter_buffer(
    compiler: *const ScCompiler,
    id: u32,
    counter_id: *mut u32,
    result: *mut bool,
    error: *mut ScString,
) -> ScResult {
    with_compiler(compiler, error, |handle| {
        let counter = handle.base().buffer_get_hlsl_counter_buffer(id);
        write(counter_id, counter.unwrap_or(0))?;
        write(result, counter.is_some())
    })
}

/// Names every resource in `resources` at `location`, along with the
/// members of struct-typed ones.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sc_compiler_rename_interface_variable(
    compiler: *mut ScCompiler,
    resources: ScArray<ScResource>,
    location: u32,
    name: ScString,
    error: *mut ScString,
) -> ScResult {
    with_compiler_mut(compiler, error, |handle| {
        let resources = resources
            .as_slice("resources")?
            .iter()
            .map(|resource| {
                Ok(Resource {
                    id: resource.id,
                    type_id: resource.type_id,
                    base_type_id: resource.base_type_id,
                    name: resource.name.as_str("resource name")?.to_owned(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        handle
            .base_mut()
            .rename_interface_variable(&resources, location, name.as_str("name")?)?;
        Ok(())
    })
}
