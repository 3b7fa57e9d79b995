//! Command line parsing for the Tabula driver.
use argh::FromArgs;
use itertools::Itertools;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tabula_backend::{Backend, ExpBackend, ResourcesBackend, VerilogBackend};
use tabula_ir as ir;
use tabula_utils::{OutputFile, TabulaResult};

#[derive(FromArgs)]
/// Options passed to the Tabula driver.
pub struct Opts {
    /// input design; standard input when omitted
    #[argh(positional, from_str_fn(read_path))]
    pub file: Option<PathBuf>,

    /// output file, default is stdout
    #[argh(option, short = 'o', default = "OutputFile::Stdout")]
    pub output: OutputFile,

    /// select a backend
    #[argh(option, short = 'b', default = "BackendOpt::default()")]
    pub backend: BackendOpt,

    /// run this pass during execution
    #[argh(option, short = 'p', default = "vec![\"none\".into()]")]
    pub pass: Vec<String>,

    /// disable pass during execution
    #[argh(option, short = 'd', long = "disable-pass")]
    pub disable_pass: Vec<String>,

    /// run `after` right after `before`, given as `before:after`
    #[argh(option, short = 'i', long = "insert")]
    pub insert: Vec<String>,

    /// extra options passed to the passes, given as `pass:opt=value`
    #[argh(option, short = 'x', long = "extra-opt")]
    pub extra_opts: Vec<String>,

    /// prefix added to the name of every generated module
    #[argh(option, long = "module-prefix")]
    pub module_prefix: Option<String>,

    /// print the design after every pass
    #[argh(switch, long = "dump-ir")]
    pub dump_ir: bool,

    /// list all the available passes and aliases
    #[argh(switch, long = "list-passes")]
    pub list_passes: bool,

    /// logging level
    #[argh(option, long = "log-level", default = "log::LevelFilter::Warn")]
    pub log_level: log::LevelFilter,
}

fn read_path(path: &str) -> Result<PathBuf, String> {
    Ok(Path::new(path).into())
}

/// Output format of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendOpt {
    #[default]
    Exp,
    Verilog,
    Resources,
    None,
}

/// Names of the backends and their options.
fn backends() -> Vec<(&'static str, BackendOpt)> {
    vec![
        ("exp", BackendOpt::Exp),
        ("verilog", BackendOpt::Verilog),
        ("resources", BackendOpt::Resources),
        ("none", BackendOpt::None),
    ]
}

impl FromStr for BackendOpt {
    type Err = String;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let backends = backends();
        if let Some((_, opt)) = backends.iter().find(|(name, _)| *name == input) {
            return Ok(*opt);
        }
        let names = backends.iter().map(|(name, _)| name).join(", ");
        Err(format!(
            "`{input}` is not a valid backend.\nValid backends: {names}"
        ))
    }
}

impl Display for BackendOpt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = backends()
            .into_iter()
            .find(|(_, opt)| opt == self)
            .map_or("", |(name, _)| name);
        write!(f, "{name}")
    }
}

impl Opts {
    /// Parses the process arguments.
    pub fn get_opts() -> Opts {
        argh::from_env()
    }

    /// Writes `design` with the selected backend.
    pub fn run_backend(self, design: &ir::Design) -> TabulaResult<()> {
        match self.backend {
            BackendOpt::Exp => ExpBackend.run(design, self.output),
            BackendOpt::Verilog => VerilogBackend.run(design, self.output),
            BackendOpt::Resources => ResourcesBackend.run(design, self.output),
            BackendOpt::None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names() {
        assert_eq!("verilog".parse::<BackendOpt>(), Ok(BackendOpt::Verilog));
        assert_eq!(BackendOpt::Resources.to_string(), "resources");
        let err = "vhdl".parse::<BackendOpt>().unwrap_err();
        assert!(err.contains("exp, verilog, resources, none"), "{err}");
    }

    #[test]
    fn parse_args() {
        let opts = Opts::from_args(
            &["tabula"],
            &["design.tab", "-b", "verilog", "-p", "all", "-x", "sched:max-delay=500"],
        )
        .unwrap();
        assert_eq!(opts.file, Some(PathBuf::from("design.tab")));
        assert_eq!(opts.backend, BackendOpt::Verilog);
        assert_eq!(opts.pass, vec!["all".to_string()]);
        assert_eq!(opts.extra_opts, vec!["sched:max-delay=500".to_string()]);
        assert_eq!(opts.log_level, log::LevelFilter::Warn);
        assert!(!opts.dump_ir);
    }
}
