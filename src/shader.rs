//! Named shader programs and the registry that compiles them.
//!
//! The GL work itself is behind the [`ShaderCompiler`] seam: the registry
//! only tracks names, sources, and handles, so it can be driven by whatever
//! loader the application links — or by an in-memory fake in tests. Programs
//! keep their GLSL sources only until they compile; after that the registry
//! holds just the handle.

use crate::VrKitError;

/// Handle to a compiled program, as issued by the [`ShaderCompiler`].
/// GL program ids fit here directly; zero is never a valid handle.
pub type ProgramHandle = u32;

/// The compilation service the registry drives. Implementations wrap the
/// actual GL calls (compile both stages, link, read the info log on error).
pub trait ShaderCompiler {
    /// Compile and link a program from a vertex/fragment source pair.
    /// `name` is for diagnostics only.
    fn compile(
        &mut self,
        name: &str,
        vertex: &str,
        fragment: &str,
    ) -> Result<ProgramHandle, VrKitError>;

    /// Release a previously compiled program.
    fn delete(&mut self, handle: ProgramHandle);
}

/// A named vertex/fragment source pair and, once compiled, its handle.
pub struct ShaderProgram {
    name: String,
    vertex_src: String,
    fragment_src: String,
    handle: Option<ProgramHandle>,
}

impl ShaderProgram {
    pub fn new(name: &str, vertex_src: &str, fragment_src: &str) -> ShaderProgram {
        ShaderProgram {
            name: name.to_owned(),
            vertex_src: vertex_src.to_owned(),
            fragment_src: fragment_src.to_owned(),
            handle: None,
        }
    }

    /// Stock program: every vertex gets one uniform color.
    pub fn solid() -> ShaderProgram {
        ShaderProgram::new("solid", SOLID_VERTEX, SOLID_FRAGMENT)
    }

    /// Stock program: textured geometry with per-vertex UVs.
    pub fn textured() -> ShaderProgram {
        ShaderProgram::new("textured", TEXTURED_VERTEX, TEXTURED_FRAGMENT)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The compiled handle, if `compile` has succeeded for this program.
    pub fn handle(&self) -> Option<ProgramHandle> {
        self.handle
    }

    /// Compile through the given service and store the handle. The retained
    /// sources are dropped on success. No-op if already compiled.
    pub fn compile(&mut self, compiler: &mut dyn ShaderCompiler) -> Result<(), VrKitError> {
        if self.handle.is_some() {
            return Ok(());
        }

        let handle = compiler.compile(&self.name, &self.vertex_src, &self.fragment_src)?;
        self.handle = Some(handle);
        self.vertex_src = String::new();
        self.fragment_src = String::new();

        log::debug!("compiled shader program `{}`", self.name);
        Ok(())
    }

    /// Release the compiled program, if any, through the given service.
    pub fn cleanup(&mut self, compiler: &mut dyn ShaderCompiler) {
        if let Some(handle) = self.handle.take() {
            compiler.delete(handle);
        }
    }
}

/// Ordered registry of shader programs, compiled and released as a unit.
///
/// ```
/// use vrkit::shader::{ProgramHandle, ShaderCollection, ShaderCompiler, ShaderProgram};
/// use vrkit::VrKitError;
///
/// struct FakeGl(ProgramHandle);
///
/// impl ShaderCompiler for FakeGl {
///     fn compile(&mut self, _: &str, _: &str, _: &str) -> Result<ProgramHandle, VrKitError> {
///         self.0 += 1;
///         Ok(self.0)
///     }
///     fn delete(&mut self, _: ProgramHandle) {}
/// }
///
/// let mut gl = FakeGl(0);
/// let mut shaders = ShaderCollection::new();
/// shaders.register(ShaderProgram::solid()).unwrap();
/// shaders.register(ShaderProgram::textured()).unwrap();
/// shaders.compile_all(&mut gl).unwrap();
/// assert_eq!(shaders.handle("solid"), Some(1));
/// shaders.cleanup(&mut gl);
/// ```
pub struct ShaderCollection {
    programs: Vec<ShaderProgram>,
}

impl ShaderCollection {
    pub fn new() -> ShaderCollection {
        ShaderCollection { programs: Vec::new() }
    }

    /// Add a program to the registry. Names are unique; a duplicate is
    /// rejected rather than shadowing the earlier registration.
    pub fn register(&mut self, program: ShaderProgram) -> Result<(), VrKitError> {
        if self.get(program.name()).is_some() {
            return Err(VrKitError::ShaderRegistry(format!(
                "duplicate program name `{}`",
                program.name()
            )));
        }
        self.programs.push(program);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ShaderProgram> {
        self.programs.iter().find(|p| p.name() == name)
    }

    /// Handle of a compiled program, by name.
    pub fn handle(&self, name: &str) -> Option<ProgramHandle> {
        self.get(name).and_then(ShaderProgram::handle)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Compile every registered program, in registration order. The first
    /// failure aborts and is returned; earlier programs stay compiled.
    pub fn compile_all(&mut self, compiler: &mut dyn ShaderCompiler) -> Result<(), VrKitError> {
        for program in &mut self.programs {
            program.compile(compiler)?;
        }
        Ok(())
    }

    /// Release every compiled program. Registrations are kept, but their
    /// sources were dropped at compile time, so a released program cannot
    /// be compiled again.
    pub fn cleanup(&mut self, compiler: &mut dyn ShaderCompiler) {
        for program in &mut self.programs {
            program.cleanup(compiler);
        }
    }
}

impl Default for ShaderCollection {
    fn default() -> ShaderCollection {
        ShaderCollection::new()
    }
}

const SOLID_VERTEX: &str = "\
#version 410
uniform mat4 matrix;
layout(location = 0) in vec4 position;
void main() {
    gl_Position = matrix * position;
}
";

const SOLID_FRAGMENT: &str = "\
#version 410
uniform vec4 color;
out vec4 frag_color;
void main() {
    frag_color = color;
}
";

const TEXTURED_VERTEX: &str = "\
#version 410
uniform mat4 matrix;
layout(location = 0) in vec4 position;
layout(location = 1) in vec2 uv;
out vec2 frag_uv;
void main() {
    frag_uv = uv;
    gl_Position = matrix * position;
}
";

const TEXTURED_FRAGMENT: &str = "\
#version 410
uniform sampler2D tex0;
in vec2 frag_uv;
out vec4 frag_color;
void main() {
    frag_color = texture(tex0, frag_uv);
}
";
