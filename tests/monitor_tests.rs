//! End-to-end monitor scenarios: expressions and watchpoints evaluated
//! against a live machine, the way the shell and step loop drive them.

use pretty_assertions::assert_eq;
use rvmon::expr::{evaluate, evaluate_expression, ExprError};
use rvmon::machine::{Cpu, Machine};
use rvmon::watch::{WatchError, WatchpointPool, NR_WATCHPOINTS};

#[test]
fn test_print_command_expressions() {
    let mut cpu = Cpu::new();
    cpu.write_register(10, 0x100); // $a0
    cpu.write_register(11, 4); // $a1
    cpu.write_memory_u32(0x100, 1000);
    cpu.write_memory_u32(0x104, 2000);

    // The kinds of expressions a user types at the (rvmon) prompt.
    assert_eq!(evaluate_expression(&cpu, "$a0"), (0x100, true));
    assert_eq!(evaluate_expression(&cpu, "*$a0"), (0, false)); // deref wants a literal address
    assert_eq!(evaluate_expression(&cpu, "*0x100"), (1000, true));
    assert_eq!(evaluate_expression(&cpu, "*0x104 - *0x100"), (1000, true));
    assert_eq!(evaluate_expression(&cpu, "$a0 + $a1*4 == 0x110"), (1, true));
    assert_eq!(evaluate_expression(&cpu, "!($a1 <= 3)"), (0, false)); // '!' wants a number
    assert_eq!(evaluate_expression(&cpu, "$a1 <= 3"), (0, true));
}

#[test]
fn test_division_diagnostics_are_per_call() {
    let cpu = Cpu::new();

    let eval = evaluate(&cpu, "5/0").unwrap();
    assert_eq!(eval.value, 0);
    assert!(eval.division_by_zero());

    // The next call starts clean.
    let eval = evaluate(&cpu, "10/2").unwrap();
    assert_eq!(eval.value, 5);
    assert!(!eval.division_by_zero());
}

#[test]
fn test_malformed_input_does_not_poison_later_calls() {
    let mut cpu = Cpu::new();
    cpu.write_register(1, 7); // $ra

    for bad in ["(((", "1 ++", "@", "$nope", "0xg", "*"] {
        assert_eq!(
            evaluate_expression(&cpu, bad),
            (0, false),
            "input: {}",
            bad
        );
        assert_eq!(evaluate_expression(&cpu, "$ra+1"), (8, true));
    }
}

#[test]
fn test_watchpoint_halts_on_memory_write() {
    let mut cpu = Cpu::new();
    cpu.write_memory_u32(0x2000, 5);
    let mut pool = WatchpointPool::new();
    let id = pool.create(&cpu, "*0x2000 == 5").unwrap();

    // Steps that leave the watched condition alone do not halt.
    cpu.write_register(10, 1);
    assert!(pool.step_check(&cpu).is_empty());
    cpu.write_memory_u32(0x2000, 6);
    let hits = pool.step_check(&cpu);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, id);
    assert_eq!(hits[0].old_value, 1);
    assert_eq!(hits[0].new_value, 0);
}

#[test]
fn test_watchpoints_over_a_simulated_run() {
    let mut cpu = Cpu::new();
    let mut pool = WatchpointPool::new();
    let sp_watch = pool.create(&cpu, "$sp").unwrap();
    let sum_watch = pool.create(&cpu, "$a0+$a1").unwrap();

    // "Execute" a few instructions, checking after each one as the step
    // loop does.
    cpu.write_register(2, 0x8000_0000); // addi sp, ...
    let hits = pool.step_check(&cpu);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, sp_watch);

    cpu.write_register(10, 3); // li a0, 3
    cpu.write_register(11, 4); // li a1, 4
    let hits = pool.step_check(&cpu);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, sum_watch);
    assert_eq!(hits[0].new_value, 7);

    // Quiescent machine, quiescent watchpoints.
    assert!(pool.step_check(&cpu).is_empty());
}

#[test]
fn test_pool_lifecycle_through_the_shell() {
    let cpu = Cpu::new();
    let mut pool = WatchpointPool::new();

    let ids: Vec<u32> = (0..NR_WATCHPOINTS)
        .map(|_| pool.create(&cpu, "$t0").unwrap())
        .collect();
    assert_eq!(
        pool.create(&cpu, "$t0").unwrap_err(),
        WatchError::PoolExhausted
    );

    // Delete two, list shrinks, and the freed ids come back.
    pool.delete(ids[3]).unwrap();
    pool.delete(ids[7]).unwrap();
    assert_eq!(pool.list().len(), NR_WATCHPOINTS - 2);
    let reused = pool.create(&cpu, "$t1").unwrap();
    assert!(reused == ids[3] || reused == ids[7]);

    assert_eq!(
        pool.delete(ids[3]),
        if reused == ids[3] {
            Ok(())
        } else {
            Err(WatchError::NotFound(ids[3]))
        }
    );
}

#[test]
fn test_expression_errors_surface_through_create() {
    let cpu = Cpu::new();
    let mut pool = WatchpointPool::new();
    match pool.create(&cpu, "2+3)") {
        Err(WatchError::Expr(ExprError::UnbalancedParens)) => {}
        other => panic!("expected unbalanced-paren error, got {:?}", other),
    }
    assert!(pool.is_empty());
}

#[test]
fn test_machine_trait_object_safety() {
    // The evaluator is generic, but the seam stays usable behind a &dyn.
    fn read_pc_relative(machine: &dyn Machine) -> u32 {
        machine.read_register(1).wrapping_add(4)
    }
    let mut cpu = Cpu::new();
    cpu.write_register(1, 100);
    assert_eq!(read_pc_relative(&cpu), 104);
}
