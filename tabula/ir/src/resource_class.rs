//! Names of the resource classes every design knows about, and predicates
//! over them.

pub const SET: &str = "set";
pub const PHI: &str = "phi";
pub const PSEUDO: &str = "pseudo";
pub const SELECT: &str = "select";
pub const PRINT: &str = "print";
pub const ASSERT: &str = "assert";
pub const MAPPED: &str = "mapped";
pub const SUB_MODULE_TASK: &str = "sub-module-task";
pub const SUB_MODULE_TASK_CALL: &str = "sub-module-task-call";
pub const TRANSITION: &str = "tr";
pub const EMBEDDED: &str = "embedded";
pub const FOREIGN_REG: &str = "foreign-reg";
pub const EXT_INPUT: &str = "ext-input";
pub const EXT_OUTPUT: &str = "ext-output";
pub const SHARED_REG: &str = "shared-reg";
pub const SHARED_REG_READER: &str = "shared-reg-reader";
pub const SHARED_REG_WRITER: &str = "shared-reg-writer";
pub const SHARED_MEMORY: &str = "shared-memory";
pub const SHARED_MEMORY_READER: &str = "shared-memory-reader";
pub const SHARED_MEMORY_WRITER: &str = "shared-memory-writer";
pub const ARRAY: &str = "array";
pub const GT: &str = "gt";
pub const GTE: &str = "gte";
pub const EQ: &str = "eq";
pub const ADD: &str = "add";
pub const SUB: &str = "sub";
pub const MUL: &str = "mul";
pub const AXI_MASTER_PORT: &str = "axi-master-port";
pub const AXI_SLAVE_PORT: &str = "axi-slave-port";
pub const FIFO: &str = "fifo";
pub const FIFO_READER: &str = "fifo-reader";
pub const FIFO_WRITER: &str = "fifo-writer";
pub const TICKER: &str = "ticker";
pub const EXT_TASK: &str = "ext-task";
pub const EXT_TASK_CALL: &str = "ext-task-call";
pub const EXT_TASK_WAIT: &str = "ext-task-wait";
pub const EXT_TASK_DONE: &str = "ext-task-done";
pub const EXT_FLOW_CALL: &str = "ext-flow-call";
pub const EXT_FLOW_RESULT: &str = "ext-flow-result";
pub const BIT_AND: &str = "bit-and";
pub const BIT_OR: &str = "bit-or";
pub const BIT_XOR: &str = "bit-xor";
pub const BIT_INV: &str = "bit-inv";
pub const SHIFT: &str = "shift";
pub const BIT_SEL: &str = "bit-sel";
pub const BIT_CONCAT: &str = "bit-concat";
pub const DATAFLOW_IN: &str = "dataflow-in";

/// Classes installed into every design, with their exclusiveness.
pub const BUILTIN_CLASSES: &[(&str, bool)] = &[
    (SET, false),
    (PHI, false),
    (PSEUDO, false),
    (SELECT, false),
    (PRINT, false),
    (ASSERT, false),
    (MAPPED, true),
    (SUB_MODULE_TASK, true),
    (SUB_MODULE_TASK_CALL, true),
    (TRANSITION, true),
    (EMBEDDED, true),
    (FOREIGN_REG, true),
    (EXT_INPUT, true),
    (EXT_OUTPUT, true),
    (SHARED_REG, true),
    (SHARED_REG_READER, true),
    (SHARED_REG_WRITER, true),
    (SHARED_MEMORY, true),
    (SHARED_MEMORY_READER, true),
    (SHARED_MEMORY_WRITER, true),
    (ARRAY, true),
    (GT, true),
    (GTE, true),
    (EQ, true),
    (ADD, true),
    (SUB, true),
    (MUL, true),
    (AXI_MASTER_PORT, true),
    (AXI_SLAVE_PORT, true),
    (FIFO, true),
    (FIFO_READER, true),
    (FIFO_WRITER, true),
    (TICKER, true),
    (EXT_TASK, true),
    (EXT_TASK_CALL, true),
    (EXT_TASK_WAIT, true),
    (EXT_TASK_DONE, true),
    (EXT_FLOW_CALL, true),
    (EXT_FLOW_RESULT, true),
    (BIT_AND, false),
    (BIT_OR, false),
    (BIT_XOR, false),
    (BIT_INV, false),
    (SHIFT, false),
    (BIT_SEL, false),
    (BIT_CONCAT, false),
    (DATAFLOW_IN, false),
];

/// A kind of resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceClass {
    pub name: String,
    /// At most one insn per state may use an exclusive resource.
    pub is_exclusive: bool,
}

pub fn is_num_to_num_bin_op(name: &str) -> bool {
    matches!(name, ADD | SUB | MUL)
}

pub fn is_num_to_bool_bin_op(name: &str) -> bool {
    matches!(name, GT | GTE | EQ)
}

/// Exclusive arithmetic and comparison operators.
pub fn is_exclusive_bin_op(name: &str) -> bool {
    is_num_to_num_bin_op(name) || is_num_to_bool_bin_op(name)
}

pub fn is_light_bin_op(name: &str) -> bool {
    matches!(name, BIT_AND | BIT_OR | BIT_XOR)
}

pub fn is_light_uni_op(name: &str) -> bool {
    name == BIT_INV
}

pub fn is_bit_arrange_op(name: &str) -> bool {
    matches!(name, SHIFT | BIT_SEL | BIT_CONCAT)
}

pub fn is_transition(name: &str) -> bool {
    name == TRANSITION
}

pub fn is_shared_reg(name: &str) -> bool {
    name == SHARED_REG
}

pub fn is_shared_reg_accessor(name: &str) -> bool {
    matches!(name, SHARED_REG_READER | SHARED_REG_WRITER)
}

pub fn is_shared_memory(name: &str) -> bool {
    name == SHARED_MEMORY
}

pub fn is_shared_memory_accessor(name: &str) -> bool {
    matches!(name, SHARED_MEMORY_READER | SHARED_MEMORY_WRITER)
}

pub fn is_axi_port(name: &str) -> bool {
    matches!(name, AXI_MASTER_PORT | AXI_SLAVE_PORT)
}

pub fn is_ext_io(name: &str) -> bool {
    matches!(name, EXT_INPUT | EXT_OUTPUT)
}

/// Classes whose insns may hold their state for several cycles.
pub fn is_multi_cycle(name: &str) -> bool {
    matches!(
        name,
        ARRAY
            | SHARED_MEMORY
            | SHARED_MEMORY_READER
            | SHARED_MEMORY_WRITER
            | AXI_MASTER_PORT
            | AXI_SLAVE_PORT
    )
}

/// Classes whose insns have effects beyond writing their output registers.
pub fn has_side_effect(name: &str) -> bool {
    matches!(
        name,
        PRINT
            | ASSERT
            | EXT_OUTPUT
            | SHARED_REG
            | SHARED_REG_WRITER
            | EMBEDDED
            | SUB_MODULE_TASK_CALL
            | EXT_TASK_CALL
            | EXT_TASK_DONE
            | EXT_FLOW_CALL
            | FIFO_WRITER
    ) || is_multi_cycle(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn unique_builtins() {
        let names: HashSet<_> = BUILTIN_CLASSES.iter().map(|(n, _)| *n).collect();
        assert_eq!(names.len(), BUILTIN_CLASSES.len());
    }

    #[test]
    fn predicates() {
        assert!(is_exclusive_bin_op(ADD));
        assert!(is_exclusive_bin_op(GTE));
        assert!(!is_exclusive_bin_op(BIT_AND));
        assert!(is_light_bin_op(BIT_XOR));
        assert!(is_light_uni_op(BIT_INV));
        assert!(is_bit_arrange_op(BIT_CONCAT));
        assert!(is_multi_cycle(SHARED_MEMORY_READER));
        assert!(has_side_effect(PRINT));
        assert!(!has_side_effect(ADD));
    }
}
