//! The opaque compiler handle

use crate::alloc::Allocator;
use crate::{Error, Result};
use std::fmt;

#[cfg(feature = "glsl")]
use spvcrs::GlslCompiler;
#[cfg(feature = "hlsl")]
use spvcrs::HlslCompiler;
#[cfg(feature = "msl")]
use spvcrs::MslCompiler;

/// The kind of compiler a handle holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Reflection,
    Glsl,
    Hlsl,
    Msl,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dialect::Reflection => "reflection",
            Dialect::Glsl => "GLSL",
            Dialect::Hlsl => "HLSL",
            Dialect::Msl => "MSL",
        })
    }
}

pub(crate) enum Compiler {
    Reflection(spvcrs::Compiler),
    #[cfg(feature = "glsl")]
    Glsl(GlslCompiler),
    #[cfg(feature = "hlsl")]
    Hlsl(HlslCompiler),
    #[cfg(feature = "msl")]
    Msl(MslCompiler),
}

/// A compiler plus the allocator its outputs are made with.
///
/// Created by the `sc_compiler_*_new` functions and destroyed by
/// `sc_compiler_delete`. The host sees only a pointer.
pub struct ScCompiler {
    compiler: Compiler,
    alloc: Allocator,
}

macro_rules! dialect_accessors {
    ($feature:literal, $variant:ident, $ty:ident, $name:ident) => {
        paste::paste! {
            #[cfg(feature = $feature)]
            pub(crate) fn $name(&self) -> Result<&$ty> {
                match &self.compiler {
                    Compiler::$variant(compiler) => Ok(compiler),
                    _ => Err(Error::WrongDialect {
                        expected: Dialect::$variant,
                        actual: self.dialect(),
                    }),
                }
            }

            #[cfg(feature = $feature)]
            pub(crate) fn [<$name _mut>](&mut self) -> Result<&mut $ty> {
                let actual = self.dialect();
                match &mut self.compiler {
                    Compiler::$variant(compiler) => Ok(compiler),
                    _ => Err(Error::WrongDialect {
                        expected: Dialect::$variant,
                        actual,
                    }),
                }
            }
        }
    };
}

impl ScCompiler {
    pub(crate) fn new(compiler: Compiler, alloc: Allocator) -> Self {
        ScCompiler { compiler, alloc }
    }

    pub fn dialect(&self) -> Dialect {
        match self.compiler {
            Compiler::Reflection(_) => Dialect::Reflection,
            #[cfg(feature = "glsl")]
            Compiler::Glsl(_) => Dialect::Glsl,
            #[cfg(feature = "hlsl")]
            Compiler::Hlsl(_) => Dialect::Hlsl,
            #[cfg(feature = "msl")]
            Compiler::Msl(_) => Dialect::Msl,
        }
    }

    /// The reflection state every dialect shares.
    pub(crate) fn base(&self) -> &spvcrs::Compiler {
        match &self.compiler {
            Compiler::Reflection(compiler) => compiler,
            #[cfg(feature = "glsl")]
            Compiler::Glsl(compiler) => compiler,
            #[cfg(feature = "hlsl")]
            Compiler::Hlsl(compiler) => compiler,
            #[cfg(feature = "msl")]
            Compiler::Msl(compiler) => compiler,
        }
    }

    pub(crate) fn base_mut(&mut self) -> &mut spvcrs::Compiler {
        match &mut self.compiler {
            Compiler::Reflection(compiler) => compiler,
            #[cfg(feature = "glsl")]
            Compiler::Glsl(compiler) => compiler,
            #[cfg(feature = "hlsl")]
            Compiler::Hlsl(compiler) => compiler,
            #[cfg(feature = "msl")]
            Compiler::Msl(compiler) => compiler,
        }
    }

    pub(crate) fn compiler_mut(&mut self) -> &mut Compiler {
        &mut self.compiler
    }

    pub(crate) fn allocator(&self) -> Allocator {
        self.alloc
    }

    dialect_accessors!("glsl", Glsl, GlslCompiler, glsl);
    dialect_accessors!("hlsl", Hlsl, HlslCompiler, hlsl);
    dialect_accessors!("msl", Msl, MslCompiler, msl);

    /// Borrows the handle behind `ptr`.
    pub(crate) unsafe fn from_ptr<'a>(ptr: *const ScCompiler) -> Result<&'a ScCompiler> {
        ptr.as_ref().ok_or(Error::NullPointer("compiler"))
    }

    pub(crate) unsafe fn from_mut_ptr<'a>(ptr: *mut ScCompiler) -> Result<&'a mut ScCompiler> {
        ptr.as_mut().ok_or(Error::NullPointer("compiler"))
    }

    /// The allocator of the handle behind `ptr`, if there is one.
    pub(crate) unsafe fn allocator_of(ptr: *const ScCompiler) -> Option<Allocator> {
        ptr.as_ref().map(ScCompiler::allocator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::tests::allocator;
    use pretty_assertions::assert_eq;
    use spvcrs::fixtures;

    fn reflection() -> ScCompiler {
        let compiler = spvcrs::Compiler::new(&fixtures::compute_shader()).unwrap();
        ScCompiler::new(Compiler::Reflection(compiler), allocator())
    }

    #[test]
    fn test_base_is_shared() {
        let mut handle = reflection();
        assert_eq!(handle.dialect(), Dialect::Reflection);
        handle.base_mut().set_name(fixtures::COMPUTE_BUFFER, "renamed");
        assert_eq!(handle.base().get_name(fixtures::COMPUTE_BUFFER), "renamed");
    }

    #[cfg(feature = "glsl")]
    #[test]
    fn test_wrong_dialect() {
        let mut handle = reflection();
        assert!(matches!(
            handle.glsl(),
            Err(Error::WrongDialect {
                expected: Dialect::Glsl,
                actual: Dialect::Reflection,
            })
        ));
        assert!(handle.glsl_mut().is_err());

        let glsl = GlslCompiler::new(&fixtures::compute_shader()).unwrap();
        let handle = ScCompiler::new(Compiler::Glsl(glsl), allocator());
        assert_eq!(handle.dialect(), Dialect::Glsl);
        assert!(handle.glsl().is_ok());
    }

    #[test]
    fn test_null_handle() {
        assert!(matches!(
            unsafe { ScCompiler::from_ptr(std::ptr::null()) },
            Err(Error::NullPointer("compiler"))
        ));
        assert!(unsafe { ScCompiler::allocator_of(std::ptr::null()) }.is_none());
    }
}
