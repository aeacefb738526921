pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod index;
pub mod model;
pub mod overrides;
pub mod render;
pub mod resolver;
pub mod scanner;
pub mod stub;

pub use config::{GenerateSpec, SELF_OWNER_QUALIFIER, THIS_MODULE_QUALIFIER};
pub use context::GeneratorContext;
pub use error::WeaveError;
pub use render::generate;
pub use resolver::{MapResolver, ModuleSetResolver, SymbolResolver, SELF_MODULE};
pub use stub::Recorder;

use model::Module;

/// Parses one source unit and generates a composite against `spec`, with the
/// unit itself registered as the self module for callee resolution. Returns
/// the generated text and the match count; a zero count comes with an empty
/// string.
pub fn generate_unit(source: &str, spec: &GenerateSpec) -> Result<(String, usize), WeaveError> {
    let module = scanner::parse_module(source)?;
    generate_module(&module, spec)
}

/// Same as [`generate_unit`] for an already-scanned (possibly merged) module.
pub fn generate_module(
    module: &Module,
    spec: &GenerateSpec,
) -> Result<(String, usize), WeaveError> {
    let mut resolver = ModuleSetResolver::new();
    resolver.register(SELF_MODULE, module);
    let mut ctx = GeneratorContext::new();
    let mut sink = Vec::new();
    let count = generate(
        module,
        spec,
        &mut ctx,
        &resolver,
        &Recorder::default(),
        &mut sink,
    )?;
    Ok((String::from_utf8_lossy(&sink).into_owned(), count))
}
