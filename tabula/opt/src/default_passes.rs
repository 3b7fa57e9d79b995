//! Defines the default passes available to [PassManager].
use crate::passes::{
    BBScheduler, CleanEmptyState, CleanUnreachableState, CleanUnusedRegister, WellFormed,
};
use crate::traversal::Named;
use crate::{pass_manager::PassManager, register_alias};
use tabula_utils::TabulaResult;

impl PassManager {
    pub fn default_passes() -> TabulaResult<Self> {
        // Construct the pass manager and register all passes.
        let mut pm = PassManager::default();

        // Validation passes
        pm.register_pass::<WellFormed>()?;

        // Cleaning passes
        pm.register_pass::<CleanUnreachableState>()?;
        pm.register_pass::<CleanEmptyState>()?;
        pm.register_pass::<CleanUnusedRegister>()?;

        // Scheduling
        pm.register_pass::<BBScheduler>()?;

        register_alias!(pm, "none", []);
        register_alias!(pm, "validate", [WellFormed]);
        register_alias!(
            pm,
            "clean",
            [CleanUnreachableState, CleanEmptyState, CleanUnusedRegister]
        );
        register_alias!(pm, "all", [WellFormed, "clean", BBScheduler, "clean"]);

        Ok(pm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn aliases_expand() {
        let pm = PassManager::default_passes().unwrap();
        let (plan, _) = pm.create_plan(&strs(&["all"]), &[], &[]).unwrap();
        assert_eq!(
            plan,
            strs(&[
                "well-formed",
                "clean-unreachable-state",
                "clean-empty-state",
                "clean-unused-register",
                "sched",
                "clean-unreachable-state",
                "clean-empty-state",
                "clean-unused-register",
            ])
        );
        assert!(pm.specific_help("clean").unwrap().contains("- clean-empty-state"));
        assert!(pm.complete_help().contains("max-delay"));
    }

    #[test]
    fn exclusions_and_insertions() {
        let pm = PassManager::default_passes().unwrap();
        let (plan, excl) = pm
            .create_plan(
                &strs(&["sched", "well-formed"]),
                &strs(&["clean"]),
                &strs(&["well-formed:sched"]),
            )
            .unwrap();
        assert_eq!(plan, strs(&["well-formed", "sched"]));
        assert!(excl.contains("clean-empty-state"));

        let err = pm.create_plan(&strs(&["nope"]), &[], &[]).unwrap_err();
        assert_eq!(err, tabula_utils::Error::unknown_pass("nope"));
    }

    #[test]
    fn executes_plan() {
        let pm = PassManager::default_passes().unwrap();
        let mut d = tabula_ir::Design::new();
        let m = d.add_module("m");
        d.add_table(m);
        pm.execute_plan(&mut d, &strs(&["all"]), &[], &[], false)
            .unwrap();
    }
}
