//! Writes the design back in the S-expression exchange format.
use crate::traits::Backend;
use std::io::Write;
use std::time::Instant;
use tabula_ir::{self as ir, UNASSIGNED_ID};
use tabula_utils::{Error, OutputFile, TabulaResult};

#[derive(Default)]
pub struct ExpBackend;

/// The printer refers to objects by id, so every object must have one.
fn check_ids(design: &ir::Design) -> TabulaResult<()> {
    let missing = |what: &str| {
        Err(Error::malformed_design(format!(
            "{what} without an id; ids are assigned by validate_ids"
        )))
    };
    if design.modules.values().any(|m| m.id == UNASSIGNED_ID) {
        return missing("module");
    }
    for (t, table) in design.tables.iter() {
        let label = design.table_label(t);
        if table.id == UNASSIGNED_ID {
            return missing("table");
        }
        if table.states.iter().any(|s| design.states[*s].id == UNASSIGNED_ID)
        {
            return missing(&format!("{label}: state"));
        }
        if table
            .registers
            .iter()
            .any(|r| design.registers[*r].id == UNASSIGNED_ID)
        {
            return missing(&format!("{label}: register"));
        }
        if table
            .resources
            .iter()
            .any(|r| design.resources[*r].id == UNASSIGNED_ID)
        {
            return missing(&format!("{label}: resource"));
        }
    }
    Ok(())
}

impl Backend for ExpBackend {
    fn name(&self) -> &'static str {
        "exp"
    }

    fn validate(design: &ir::Design) -> TabulaResult<()> {
        design.check_references()?;
        check_ids(design)
    }

    fn link_externs(
        _design: &ir::Design,
        _file: &mut OutputFile,
    ) -> TabulaResult<()> {
        Ok(())
    }

    fn emit(design: &ir::Design, file: &mut OutputFile) -> TabulaResult<()> {
        let time = Instant::now();
        let mut w = file.get_write()?;
        ir::Printer::write_design(design, &mut w)?;
        w.flush()?;
        log::info!("Generated exp in {:?}", time.elapsed());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ir::Builder;

    #[test]
    fn rejects_unnumbered_design() {
        let mut d = ir::Design::new();
        let m = d.add_module("top");
        let t = d.add_table(m);
        Builder::new(&mut d).alloc_state(t);
        assert!(matches!(
            ExpBackend::validate(&d),
            Err(Error::MalformedDesign(_))
        ));
        ir::validate_ids(&mut d);
        assert!(ExpBackend::validate(&d).is_ok());
    }
}
