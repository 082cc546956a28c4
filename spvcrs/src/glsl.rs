//! GLSL emission

use crate::compiler::Compiler;
use crate::lower::ClipSpace;
use crate::{Error, Result};
use naga::back::glsl;
use std::ops::{Deref, DerefMut};

/// Default precision qualifier declared for ES shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    /// No default precision statement is written
    DontCare,
    Low,
    Medium,
    High,
}

impl Precision {
    fn keyword(self) -> Option<&'static str> {
        match self {
            Precision::DontCare => None,
            Precision::Low => Some("lowp"),
            Precision::Medium => Some("mediump"),
            Precision::High => Some("highp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlslVertexOptions {
    /// Remap clip-space depth from [0, 1] to [-1, 1] and flip Y
    pub fixup_clipspace: bool,
    pub flip_vert_y: bool,
    /// Honour a non-zero base instance through draw parameters
    pub support_nonzero_base_instance: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlslFragmentOptions {
    pub default_float_precision: Precision,
    pub default_int_precision: Precision,
}

/// Options of the GLSL backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlslOptions {
    pub version: u32,
    pub es: bool,
    /// Accepted for compatibility; every expression is already emitted
    /// through a temporary where the backend needs one
    pub force_temporary: bool,
    /// Vulkan GLSL is not produced; setting this fails the compile
    pub vulkan_semantics: bool,
    pub separate_shader_objects: bool,
    /// Accepted for compatibility; arrays keep their declared shape
    pub flatten_multidimensional_arrays: bool,
    pub enable_420pack_extension: bool,
    pub vertex: GlslVertexOptions,
    pub fragment: GlslFragmentOptions,
    /// Always write `gl_PointSize` from vertex shaders
    pub force_point_size: bool,
}

impl Default for GlslOptions {
    fn default() -> Self {
        GlslOptions {
            version: 450,
            es: false,
            force_temporary: false,
            vulkan_semantics: false,
            separate_shader_objects: false,
            flatten_multidimensional_arrays: false,
            enable_420pack_extension: true,
            vertex: GlslVertexOptions {
                fixup_clipspace: false,
                flip_vert_y: false,
                support_nonzero_base_instance: true,
            },
            fragment: GlslFragmentOptions {
                default_float_precision: Precision::Medium,
                default_int_precision: Precision::High,
            },
            force_point_size: false,
        }
    }
}

/// Compiles SPIR-V to GLSL.
#[derive(Debug, Clone)]
pub struct GlslCompiler {
    compiler: Compiler,
    options: GlslOptions,
    header_lines: Vec<String>,
    extensions: Vec<String>,
    partial_source: String,
}

impl Deref for GlslCompiler {
    type Target = Compiler;

    fn deref(&self) -> &Compiler {
        &self.compiler
    }
}

impl DerefMut for GlslCompiler {
    fn deref_mut(&mut self) -> &mut Compiler {
        &mut self.compiler
    }
}

impl GlslCompiler {
    pub fn new(words: &[u32]) -> Result<Self> {
        Ok(Self::from_compiler(Compiler::new(words)?))
    }

    pub fn from_compiler(compiler: Compiler) -> Self {
        GlslCompiler {
            compiler,
            options: GlslOptions::default(),
            header_lines: Vec::new(),
            extensions: Vec::new(),
            partial_source: String::new(),
        }
    }

    pub fn options(&self) -> &GlslOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: GlslOptions) {
        self.options = options;
    }

    /// Adds a line written verbatim after the `#version` and `#extension`
    /// lines.
    pub fn add_header_line(&mut self, line: &str) {
        self.header_lines.push(line.to_owned());
    }

    /// Adds `#extension <name> : require` to the output.
    pub fn require_extension(&mut self, name: &str) {
        if !self.extensions.iter().any(|e| e == name) {
            self.extensions.push(name.to_owned());
        }
    }

    /// Source written by the last successful [`GlslCompiler::compile`].
    pub fn get_partial_source(&self) -> &str {
        &self.partial_source
    }

    pub fn compile(&mut self) -> Result<String> {
        let options = self.options.clone();
        if options.vulkan_semantics {
            return Err(Error::Unsupported("Vulkan GLSL output".into()));
        }
        let version = u16::try_from(options.version)
            .map_err(|_| Error::Unsupported(format!("GLSL version {}", options.version)))?;
        let version = if options.es {
            glsl::Version::Embedded {
                version,
                is_webgl: false,
            }
        } else {
            glsl::Version::Desktop(version)
        };

        // The writer flips Y itself when fixing up clip space
        let flip = options.vertex.flip_vert_y ^ options.vertex.fixup_clipspace;
        let module = self.compiler.backend_module()?;
        let lowered = self.compiler.lower(
            &module,
            ClipSpace {
                invert_y: flip,
                remap_depth: false,
            },
        )?;

        let mut writer_flags = glsl::WriterFlags::empty();
        writer_flags.set(
            glsl::WriterFlags::ADJUST_COORDINATE_SPACE,
            options.vertex.fixup_clipspace,
        );
        writer_flags.set(
            glsl::WriterFlags::DRAW_PARAMETERS,
            options.vertex.support_nonzero_base_instance,
        );
        writer_flags.set(glsl::WriterFlags::FORCE_POINT_SIZE, options.force_point_size);
        let glsl_options = glsl::Options {
            version,
            writer_flags,
            ..Default::default()
        };
        let pipeline = glsl::PipelineOptions {
            shader_stage: lowered.stage,
            entry_point: lowered.entry_point.clone(),
            multiview: None,
        };

        let emit = |e: glsl::Error| Error::Emit {
            dialect: "GLSL",
            message: e.to_string(),
        };
        let mut source = String::new();
        glsl::Writer::new(
            &mut source,
            &lowered.module,
            &lowered.info,
            &glsl_options,
            &pipeline,
            naga::proc::BoundsCheckPolicies::default(),
        )
        .map_err(emit)?
        .write()
        .map_err(emit)?;

        let source = self.finish_source(&source, &options);
        log::debug!("emitted {} bytes of GLSL", source.len());
        self.compiler
            .set_cleansed_name(&lowered.entry_point, lowered.model, "main".into());
        self.partial_source = source.clone();
        Ok(source)
    }

    /// Inserts extension and header lines after `#version` and applies the
    /// default ES precisions.
    fn finish_source(&self, source: &str, options: &GlslOptions) -> String {
        let mut preamble: Vec<String> = self
            .extensions
            .iter()
            .map(|name| format!("#extension {name} : require"))
            .collect();
        if !options.es {
            if options.separate_shader_objects && options.version < 410 {
                preamble.push("#extension GL_ARB_separate_shader_objects : require".into());
            }
            if options.enable_420pack_extension && options.version < 420 {
                preamble.push("#ifdef GL_ARB_shading_language_420pack".into());
                preamble.push("#extension GL_ARB_shading_language_420pack : require".into());
                preamble.push("#endif".into());
            }
        }
        preamble.extend(self.header_lines.iter().cloned());

        let mut out = String::with_capacity(source.len() + 64 * preamble.len());
        let mut lines = source.split_inclusive('\n');
        if let Some(first) = lines.next() {
            out.push_str(first);
            if !first.ends_with('\n') {
                out.push('\n');
            }
        }
        for line in &preamble {
            out.push_str(line);
            out.push('\n');
        }
        for line in lines {
            let precision = match line.trim_end() {
                "precision highp float;" => Some(("float", options.fragment.default_float_precision)),
                "precision highp int;" => Some(("int", options.fragment.default_int_precision)),
                _ => None,
            };
            match precision {
                Some((kind, precision)) => {
                    if let Some(keyword) = precision.keyword() {
                        out.push_str(&format!("precision {keyword} {kind};\n"));
                    }
                }
                None => out.push_str(line),
            }
        }
        out
    }
}
