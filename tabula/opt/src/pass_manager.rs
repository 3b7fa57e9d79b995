//! Registry of passes and aliases, and the runner for pass plans.
use crate::traversal;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use std::time::Instant;
use tabula_ir as ir;
use tabula_utils::{Error, TabulaResult};

/// A pass, erased to a function over the whole design.
pub type PassClosure = Box<dyn Fn(&mut ir::Design) -> TabulaResult<()>>;

struct PassEntry {
    run: PassClosure,
    /// `- name: description` followed by one line per option.
    help: String,
}

/// Passes and aliases known to the driver, ordered by name.
#[derive(Default)]
pub struct PassManager {
    passes: BTreeMap<String, PassEntry>,
    /// Aliases are stored fully expanded to pass names.
    aliases: BTreeMap<String, Vec<String>>,
}

impl PassManager {
    /// Registers `Pass` under its name. Names must be unique.
    pub fn register_pass<Pass>(&mut self) -> TabulaResult<()>
    where
        Pass: traversal::Phase + traversal::ConstructPass + traversal::Named,
    {
        let name = Pass::name();
        if self.passes.contains_key(name) {
            return Err(Error::misc(format!("pass `{name}' is registered twice")));
        }
        let mut help = format!("- {name}: {}", Pass::description());
        for opt in Pass::opts() {
            write!(
                help,
                "\n  * {}: {} (default: {})",
                opt.name(),
                opt.description(),
                opt.default()
            )?;
        }
        let run: PassClosure = Box::new(|design: &mut ir::Design| {
            Pass::do_pass_default(design)?;
            Ok(())
        });
        self.passes.insert(name.to_string(), PassEntry { run, help });
        Ok(())
    }

    /// Defines `name` as a sequence of passes and previously defined
    /// aliases, run in the given order.
    pub fn add_alias(&mut self, name: String, passes: Vec<String>) -> TabulaResult<()> {
        if self.aliases.contains_key(&name) || self.passes.contains_key(&name) {
            return Err(Error::misc(format!("alias `{name}' is already defined")));
        }
        let mut expanded = Vec::with_capacity(passes.len());
        for p in passes {
            match self.aliases.get(&p) {
                Some(inner) => expanded.extend(inner.iter().cloned()),
                None if self.passes.contains_key(&p) => expanded.push(p),
                None => return Err(Error::unknown_pass(p)),
            }
        }
        self.aliases.insert(name, expanded);
        Ok(())
    }

    /// Help of one pass, or the pipeline of an alias.
    pub fn specific_help(&self, pass: &str) -> Option<String> {
        if let Some(entry) = self.passes.get(pass) {
            return Some(entry.help.clone());
        }
        self.aliases.get(pass).map(|passes| {
            let lines = passes.iter().map(|p| format!("- {p}")).collect::<Vec<_>>();
            format!("`{pass}' is an alias for pass pipeline:\n{}", lines.join("\n"))
        })
    }

    /// Help for every pass followed by every alias.
    pub fn complete_help(&self) -> String {
        let mut out = String::from("Passes:\n");
        for entry in self.passes.values() {
            out.push_str(&entry.help);
            out.push('\n');
        }
        out.push_str("\nAliases:\n");
        for (alias, passes) in &self.aliases {
            out.push_str(&format!("- {alias}: {}\n", passes.join(", ")));
        }
        out
    }

    /// Pass names `name` stands for.
    fn expand(&self, name: &str) -> Vec<String> {
        match self.aliases.get(name) {
            Some(passes) => passes.clone(),
            None => vec![name.to_string()],
        }
    }

    /// Builds the list of passes to run from included and excluded names
    /// (passes or aliases). `insns` are `before:after` pairs forcing `after`
    /// to run right after `before`. Returns the plan and the excluded set.
    pub fn create_plan(
        &self,
        incls: &[String],
        excls: &[String],
        insns: &[String],
    ) -> TabulaResult<(Vec<String>, HashSet<String>)> {
        let mut plan = incls.iter().flat_map(|n| self.expand(n)).collect::<Vec<_>>();
        let excluded = excls
            .iter()
            .flat_map(|n| self.expand(n))
            .collect::<HashSet<_>>();
        let mut moves = Vec::new();
        for insn in insns {
            match insn.split_once(':') {
                Some((before, after)) => moves.push((before.to_string(), after.to_string())),
                None => log::warn!("`{insn}' is not of the form before:after; ignored"),
            }
        }

        let unknown = plan
            .iter()
            .chain(excluded.iter())
            .chain(moves.iter().flat_map(|(b, a)| [b, a]))
            .find(|p| !self.passes.contains_key(p.as_str()));
        if let Some(p) = unknown {
            return Err(Error::unknown_pass(p));
        }

        for (before, after) in moves {
            let runs = |p: &String| plan.contains(p) && !excluded.contains(p);
            if !runs(&before) || !runs(&after) {
                log::warn!("`{before}:{after}' names a pass that does not run; ignored");
                continue;
            }
            let b = plan.iter().position(|p| *p == before);
            let a = plan.iter().position(|p| *p == after);
            if let (Some(b), Some(a)) = (b, a) {
                if b > a {
                    plan.insert(b + 1, after);
                    plan.remove(a);
                }
            }
        }
        Ok((plan, excluded))
    }

    /// Runs the plan built from `incl`, `excl` and `insn` over `design`.
    /// With `dump_ir` the design is printed after each pass.
    pub fn execute_plan(
        &self,
        design: &mut ir::Design,
        incl: &[String],
        excl: &[String],
        insn: &[String],
        dump_ir: bool,
    ) -> TabulaResult<()> {
        let (plan, excluded) = self.create_plan(incl, excl, insn)?;
        for name in plan {
            if excluded.contains(&name) {
                log::info!("{name}: skipped");
                continue;
            }
            let Some(entry) = self.passes.get(&name) else {
                return Err(Error::unknown_pass(name));
            };
            let start = Instant::now();
            (entry.run)(design)?;
            let ms = start.elapsed().as_millis();
            if ms > 5000 {
                log::warn!("{name}: {ms}ms");
            } else {
                log::info!("{name}: {ms}ms");
            }
            if dump_ir {
                ir::validate_ids(design);
                ir::Printer::write_design(design, &mut std::io::stdout())?;
            }
        }
        Ok(())
    }
}

/// Simple macro to register an alias with a pass manager.
///
/// ## Example
/// ```ignore
/// let mut pm = PassManager::default();
/// register_alias!(pm, "clean", [CleanUnreachableState, CleanEmptyState]);
/// ```
#[macro_export]
macro_rules! register_alias {
    (@unwrap_name $pass:ident) => {
        $pass::name().to_string()
    };

    (@unwrap_name $pass:literal) => {
        $pass.to_string()
    };

    ($manager:expr, $alias:literal, [ $($pass:tt),* $(,)? ]) => {
        $manager.add_alias($alias.to_string(), vec![
            $(register_alias!(@unwrap_name $pass)),*
        ])?;
    };
}
