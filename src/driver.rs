//! Driver for the Tabula toolkit.
use crate::cmdline::Opts;
use std::time::Instant;
use tabula_frontend::DesignBuilder;
use tabula_ir as ir;
use tabula_opt::pass_manager::PassManager;
use tabula_utils::TabulaResult;

/// Run the driver from the command line.
pub fn run_tabula() -> TabulaResult<()> {
    // parse the command line arguments into Opts struct
    let opts = Opts::get_opts();

    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(opts.log_level)
        .target(env_logger::Target::Stderr)
        .init();

    let pm = PassManager::default_passes()?;

    // list all the available pass options when flag --list-passes is enabled
    if opts.list_passes {
        println!("{}", pm.complete_help());
        return Ok(());
    }

    let start = Instant::now();
    let mut design = match &opts.file {
        Some(path) => DesignBuilder::read_file(path)?,
        None => DesignBuilder::read(std::io::stdin().lock())?,
    };
    log::info!("parse: {}ms", start.elapsed().as_millis());

    run_passes(&pm, &mut design, &opts)?;
    opts.run_backend(&design)
}

/// Configures `design` from the options and runs the pass plan.
pub fn run_passes(
    pm: &PassManager,
    design: &mut ir::Design,
    opts: &Opts,
) -> TabulaResult<()> {
    if let Some(prefix) = &opts.module_prefix {
        design.params.set_module_name_prefix(prefix);
    }
    design.extra_opts = opts.extra_opts.clone();
    ir::validate_ids(design);
    pm.execute_plan(
        design,
        &opts.pass,
        &opts.disable_pass,
        &opts.insert,
        opts.dump_ir,
    )?;
    ir::validate_ids(design);
    Ok(())
}
