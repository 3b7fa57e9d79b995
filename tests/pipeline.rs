//! Parse, run passes and emit designs the way the driver does.
use tabula::cmdline::{BackendOpt, Opts};
use tabula::driver::run_passes;
use tabula_backend::generate_verilog;
use tabula_frontend::DesignBuilder;
use tabula_ir as ir;
use tabula_opt::pass_manager::PassManager;
use tabula_utils::Error;

/// Reads `a`, adds one and writes `o`. State 4 can not be reached and
/// register 4 is never used.
const ADDER: &str = r#"
(MODULE 1 top
  (TABLE 1 (NAME main)
    (REGISTERS
      (REGISTER 1 x REG (UINT 8) ())
      (REGISTER 2 y REG (UINT 8) ())
      (REGISTER 3 "" CONST (UINT 8) 1)
      (REGISTER 4 unused REG (UINT 8) ()))
    (RESOURCES
      (RESOURCE 1 tr () () (PARAMS))
      (RESOURCE 2 ext-input () ((UINT 8)) (PARAMS (INPUT a) (WIDTH 8)))
      (RESOURCE 3 add ((UINT 8) (UINT 8)) ((UINT 8)) (PARAMS))
      (RESOURCE 4 ext-output ((UINT 8)) () (PARAMS (OUTPUT o) (WIDTH 8))))
    (INITIAL 1)
    (STATE 1
      (INSN 1 ext-input 2 () () () (1))
      (INSN 2 tr 1 () (2) () ()))
    (STATE 2
      (INSN 3 add 3 () () (1 3) (2))
      (INSN 4 tr 1 () (3) () ()))
    (STATE 3
      (INSN 5 ext-output 4 () () (2) ())
      (INSN 6 tr 1 () (1) () ()))
    (STATE 4
      (INSN 7 tr 1 () (1) () ()))))
"#;

fn print(design: &ir::Design) -> String {
    let mut out = Vec::new();
    ir::Printer::write_design(design, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn opts(args: &[&str]) -> Opts {
    argh::FromArgs::from_args(&["tabula"], args).unwrap()
}

fn table(design: &ir::Design) -> &ir::Table {
    design.tables.values().next().unwrap()
}

#[test]
fn printed_design_reads_back() {
    let design = DesignBuilder::read_str(ADDER).unwrap();
    let text = print(&design);
    let again = DesignBuilder::read_str(&text).unwrap();
    assert_eq!(print(&again), text);
}

#[test]
fn clean_removes_dead_states_and_registers() {
    let pm = PassManager::default_passes().unwrap();
    let mut design = DesignBuilder::read_str(ADDER).unwrap();
    run_passes(&pm, &mut design, &opts(&["-p", "clean"])).unwrap();
    assert_eq!(table(&design).states.len(), 3);
    assert_eq!(table(&design).registers.len(), 3);
    assert!(!print(&design).contains("unused"));
}

#[test]
fn disabled_pass_is_skipped() {
    let pm = PassManager::default_passes().unwrap();
    let mut design = DesignBuilder::read_str(ADDER).unwrap();
    let o = opts(&[
        "-p",
        "clean",
        "-d",
        "clean-unreachable-state",
        "-d",
        "clean-empty-state",
    ]);
    run_passes(&pm, &mut design, &o).unwrap();
    assert_eq!(table(&design).states.len(), 4);
    assert_eq!(table(&design).registers.len(), 3);
}

#[test]
fn unknown_pass() {
    let pm = PassManager::default_passes().unwrap();
    let mut design = DesignBuilder::read_str(ADDER).unwrap();
    assert!(matches!(
        run_passes(&pm, &mut design, &opts(&["-p", "unroll"])),
        Err(Error::UnknownPass(_))
    ));
}

#[test]
fn verilog_after_all_passes() {
    let pm = PassManager::default_passes().unwrap();
    let mut design = DesignBuilder::read_str(ADDER).unwrap();
    let o = opts(&["-p", "all", "-b", "verilog", "--module-prefix", "p_"]);
    assert_eq!(o.backend, BackendOpt::Verilog);
    run_passes(&pm, &mut design, &o).unwrap();
    let text = generate_verilog(&design).unwrap();
    assert!(text.contains("module p_top("), "{text}");
    assert!(text.contains("  input [7:0] a;"), "{text}");
    assert!(text.contains("  output reg [7:0] o;"), "{text}");
    assert!(text.contains("endmodule"), "{text}");
}

#[test]
fn resources_backend_to_null_output() {
    let mut design = DesignBuilder::read_str(ADDER).unwrap();
    ir::validate_ids(&mut design);
    let o = opts(&["-b", "resources", "-o", "<null>"]);
    assert_eq!(o.backend, BackendOpt::Resources);
    o.run_backend(&design).unwrap();
}
