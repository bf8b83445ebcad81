//! End-to-end coverage of spec.md's S1-S6 scenarios, driven through the
//! composition root with real loader-produced register state (RB, RX, SP,
//! RL) rather than hand-set registers, complementing the unit-level S1-S6
//! tests in `lucario-cpu::execute`'s test module.
//!
//! S2 (overflow wrap) is omitted here: its scenario seeds AC with
//! 9_999_999 directly, a value no single instruction's 5-digit operand
//! field can express, so it is only meaningfully exercised at the
//! `Cpu::step` level (see `lucario_cpu::cpu::tests::s2_overflow_wraps_then_exits_cleanly`).

use std::io::Write;

use lucario_core::Mode;
use lucario_cpu::HaltReason;
use lucario_machine::Machine;

fn program_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn s1_addition_and_overflow_free_exit() {
    // SYSCALL's exit condition is `word_to_int(AC) == 0` at dispatch time,
    // not the SVC instruction's own operand digit, so the sum is stashed
    // to memory and AC is cleared before the exit SVC.
    let program = "\
_start 1
.NumeroPalabras 5
.NombreProg ADDER
4100007
100005
5000050
4100000
13000000
";
    let file = program_file(program);
    let mut machine = Machine::new();
    machine.load_program(file.path()).unwrap();

    let reason = machine.run();

    assert_eq!(reason, HaltReason::SyscallExit);
    assert_eq!(lucario_core::word_to_int(machine.cpu().registers.ac), 0);
    assert_eq!(machine.memory().read(350, Mode::Kernel, 0, 0).unwrap(), 12);
}

#[test]
fn s3_protection_fault_halts_cpu_and_leaves_ram_untouched() {
    // A one-word program: the loader's RB/RL for it sit far below 500, so
    // `STR Direct 500` targets an address well outside [RB, RL] in user mode.
    let program = "\
_start 1
.NumeroPalabras 1
.NombreProg FAULTER
5000500
";
    let file = program_file(program);
    let mut machine = Machine::new();
    machine.load_program(file.path()).unwrap();

    let reason = machine.run();

    assert_eq!(reason, HaltReason::InvalidAddress);
    assert_eq!(machine.memory().read(500, Mode::Kernel, 0, 0).unwrap(), 0);
}

#[test]
fn s4_stack_push_pop_round_trip_with_loader_placed_sp() {
    // A loader-produced program's initial SP translates to exactly RL;
    // this exercises that PSH still succeeds on a program's very first
    // stack operation instead of spuriously protection-faulting against
    // the general [RB, RL] partition check.
    let program = "\
_start 1
.NumeroPalabras 7
.NombreProg STACKER
4100123
25000000
4100000
26000000
5000050
4100000
13000000
";
    let file = program_file(program);
    let mut machine = Machine::new();
    machine.load_program(file.path()).unwrap();

    let reason = machine.run();

    assert_eq!(reason, HaltReason::SyscallExit);
    // RAM[RB + 50] holds the value POP restored into AC before it was
    // overwritten and the program exited.
    assert_eq!(machine.memory().read(350, Mode::Kernel, 0, 0).unwrap(), 123);
}

#[test]
fn s5_conditional_branch_does_not_mutate_condition_code() {
    // STR writes M[SP] = 50 directly at the loader's initial SP (104, for
    // this 4-word program); LOAD sets AC = 40; JMPLT Immediate 90 then
    // compares 40 < 50 and must jump without touching PSW.cc. The target
    // is 90, not spec.md's illustrative 200, because this program's own
    // partition only spans logical offsets [0, RX + stack) = [0, 104) —
    // 200 would translate outside [RB, RL] and protection-fault instead.
    let program = "\
_start 1
.NumeroPalabras 4
.NombreProg BRANCHER
4100050
5000104
4100040
11100090
";
    let file = program_file(program);
    let mut machine = Machine::new();
    machine.load_program(file.path()).unwrap();

    machine.step(); // LOAD Immediate 50
    machine.step(); // STR Direct 104 (M[SP] = 50)
    machine.step(); // LOAD Immediate 40
    let cc_before_branch = machine.cpu().registers.psw.cc;
    machine.step(); // JMPLT Immediate 90

    assert_eq!(machine.cpu().registers.psw.pc, 90);
    assert_eq!(machine.cpu().registers.psw.cc, cc_before_branch);
}

#[test]
fn s6_dma_write_back_raises_io_done_exactly_once() {
    let program = "\
_start 1
.NumeroPalabras 8
.NombreProg DMAWRITER
28100001
29100002
30100003
31100001
32100005
33000000
4100000
13000000
";
    let file = program_file(program);
    let mut machine = Machine::new();
    machine.load_program(file.path()).unwrap();

    // Seed RAM[RB + 5] = 1_234_567, the word the RAM->Disk transfer moves.
    machine.memory().write(305, 1_234_567, Mode::Kernel, 0, 0).unwrap();

    let reason = machine.run();

    assert_eq!(reason, HaltReason::SyscallExit);

    let snapshot = machine.memory().dma_snapshot();
    assert!(!snapshot.pending);
    assert!(!snapshot.active);

    let disk = machine.disk();
    let disk = disk.lock().unwrap();
    assert_eq!(disk.read_sector(1, 2, 3).unwrap(), 1_234_567);
}
