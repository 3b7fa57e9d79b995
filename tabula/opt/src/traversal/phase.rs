//! Passes that rewrite a design one table at a time.
use super::{ConstructPass, Named};
use itertools::Itertools;
use tabula_ir as ir;
use tabula_utils::TabulaResult;

/// A pass over every table of a design. Implementations override
/// [apply_for_table](Phase::apply_for_table) and optionally the design level
/// hooks.
pub trait Phase {
    /// Precondition for this pass to run on the design. If this returns
    /// `Some(msg)`, the pass is skipped and `msg` is logged.
    fn precondition(_design: &ir::Design) -> Option<String>
    where
        Self: Sized,
    {
        None
    }

    /// Executed before any table is visited.
    fn start_design(&mut self, _design: &mut ir::Design) -> TabulaResult<()> {
        Ok(())
    }

    /// Rewrite one table.
    fn apply_for_table(
        &mut self,
        table: ir::TableIdx,
        design: &mut ir::Design,
    ) -> TabulaResult<()>;

    /// Executed after every table has been visited.
    fn finish_design(&mut self, _design: &mut ir::Design) -> TabulaResult<()> {
        Ok(())
    }

    /// Run the pass on every table of every module, in module order.
    fn do_pass(&mut self, design: &mut ir::Design) -> TabulaResult<()>
    where
        Self: Sized + ConstructPass + Named,
    {
        if let Some(msg) = Self::precondition(design) {
            log::info!("Skipping `{}': {msg}", Self::name());
            return Ok(());
        }
        self.start_design(design)?;
        let tables = design
            .modules
            .values()
            .flat_map(|m| m.tables.iter().copied())
            .collect_vec();
        for table in tables {
            self.apply_for_table(table, design)?;
            self.clear_data();
        }
        self.finish_design(design)
    }

    /// Build the pass with [ConstructPass::from] and call
    /// [Phase::do_pass] using it.
    #[inline(always)]
    fn do_pass_default(design: &mut ir::Design) -> TabulaResult<Self>
    where
        Self: ConstructPass + Sized + Named,
    {
        let mut pass = Self::from(&*design)?;
        pass.do_pass(design)?;
        Ok(pass)
    }
}
