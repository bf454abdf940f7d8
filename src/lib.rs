//! # Introduction
//!
//! rvmon is the expression-evaluation subsystem of an interactive debug
//! monitor for a RISC-V CPU emulator.  It evaluates arithmetic/logical
//! expressions that mix decimal and hexadecimal literals, `$`-prefixed
//! architectural register names, and memory dereferences, against live
//! emulated machine state.  Two monitor features sit on top of it: a one-shot
//! "print expression" command, and conditional watchpoints that are
//! re-evaluated after every emulated instruction.
//!
//! ## Evaluation pipeline
//!
//! ```text
//! Expression text → Lexer → Normalizer → Expression tree → u32 result
//! ```
//!
//! 1. [`expr`] — tokenises the expression, folds the unary/dereference
//!    ambiguities away, builds an expression tree, and evaluates it.
//! 2. [`machine`] — the seam to the emulator: the [`machine::Machine`] trait
//!    for register and memory reads, the fixed register name table, and
//!    [`machine::Cpu`], a simple concrete machine state.
//! 3. [`watch`] — the fixed-capacity watchpoint pool the step loop consults
//!    after each instruction.
//!
//! ## Expression language
//!
//! Operands: decimal literals, `0x` hex literals, `$ra`-style register names,
//! `*expr` memory reads.  Binary operators, weakest to strongest binding:
//! `||`, `&&`, `==` `!=`, `<=`, `+` `-`, `*` `/`, plus unary `-` and `!`.
//! All arithmetic is wrapping 32-bit; division by zero yields 0 for the
//! offending subterm and a diagnostic rather than aborting the evaluation.
//!
//! The shell that reads command lines, the instruction decoder, and image
//! loading all live outside this crate; they talk to it through
//! [`expr::evaluate_expression`] and [`watch::WatchpointPool`].

pub mod expr;
pub mod machine;
pub mod watch;
