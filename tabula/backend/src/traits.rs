use tabula_ir as ir;
use tabula_utils::{OutputFile, TabulaResult};

/// All backends must implement this trait.
/// `Backend::name` returns the name of this backend.
/// `Backend::validate` should return `Ok(())` if the
/// design is in the expected form and `Err(...)` otherwise.
/// `Backend::link_externs` writes files the output depends on but does not
/// generate.
/// `Backend::emit` writes the design to the output.
/// `Backend::run` is the composition of these functions.
pub trait Backend {
    fn name(&self) -> &'static str;
    fn validate(design: &ir::Design) -> TabulaResult<()>;
    fn link_externs(
        design: &ir::Design,
        file: &mut OutputFile,
    ) -> TabulaResult<()>;
    fn emit(design: &ir::Design, file: &mut OutputFile) -> TabulaResult<()>;
    fn run(&self, design: &ir::Design, mut file: OutputFile) -> TabulaResult<()>
    where
        Self: Sized,
    {
        Self::validate(design)?;
        Self::emit(design, &mut file)?;
        Self::link_externs(design, &mut file)
    }
}
