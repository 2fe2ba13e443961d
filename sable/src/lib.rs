//! Sable: runtime for a statically-typed object-oriented language.
//!
//! The language has classes, structs and interfaces (CSIs) with single
//! inheritance, properties with getters and setters, first-class delegates,
//! enums, exceptions with `with`/`except`/`finally`, and arbitrary-precision
//! integers. This crate is the execution engine only: it consumes the fully
//! type-checked, ancestry-resolved tree produced by the front end (shipped
//! separately) and walks it directly.
//!
//! Entry points: deserialize or build an [`ast::Program`], optionally run
//! [`interp::builtin::install`] to add the builtin classes, then drive an
//! [`interp::Run`] via `run_program`, `call_named` or `run_stat`.

pub mod ast;
pub mod interp;

pub use ast::{Program, Span, Spanned};
pub use interp::{Bailout, FatalError, Run, RunResult, Value};
