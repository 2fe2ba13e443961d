//! Statement executor.
//!
//! `Ok(())` is plain completion; every non-local transfer travels as the
//! error arm and `?` does the short-circuiting. Each construct catches
//! exactly the transfers addressed to it: `while` catches Break, the
//! procedure boundary catches Return, `with`/`except` catches matching
//! exceptions. Everything else passes through untouched.

use crate::ast::{Block, ExceptClause, Spanned, Stat};
use crate::interp::error::{Bailout, ExcPayload, FatalError, RunResult};
use crate::interp::frame::ProcAr;
use crate::interp::value::{Value, VarNode};
use crate::interp::Run;
use tracing::warn;

impl Run<'_> {
    pub(crate) fn frame_mut(&mut self) -> RunResult<&mut ProcAr> {
        self.thread_ar
            .current_mut()
            .ok_or_else(|| FatalError::NoFrame.bail())
    }

    pub(crate) fn run_block(&mut self, block: &Block) -> RunResult<()> {
        self.run_block_with(block, Vec::new())
    }

    /// Run a block in a fresh block AR, optionally pre-binding locals
    /// (used to bind the payload variable of an `except` clause).
    pub(crate) fn run_block_with(
        &mut self,
        block: &Block,
        bindings: Vec<(String, Value)>,
    ) -> RunResult<()> {
        self.frame_mut()?.push_block();
        let res = self.run_block_inner(block, bindings);
        if let Ok(ar) = self.frame_mut() {
            ar.pop_block();
        }
        res
    }

    fn run_block_inner(
        &mut self,
        block: &Block,
        bindings: Vec<(String, Value)>,
    ) -> RunResult<()> {
        for (name, val) in bindings {
            self.frame_mut()?.bind(&name, val)?;
        }
        for stat in &block.stats {
            self.exec_stat(stat)?;
        }
        Ok(())
    }

    pub(crate) fn exec_stat(&mut self, stat: &Spanned<Stat>) -> RunResult<()> {
        match &stat.node {
            Stat::Exps(e) => {
                if self.eval(e)?.is_some() {
                    warn!(span = %e.span, "value of expression statement ignored");
                }
                Ok(())
            }

            Stat::Vdecl { name, ty } => {
                let default = Value::new(VarNode::default_for(ty));
                self.frame_mut()?
                    .bind(name, default)
                    .map_err(|b| b.with_span(stat.span))
            }

            Stat::If {
                branches,
                else_block,
            } => {
                for (cond, block) in branches {
                    if self.eval_bool(cond)? {
                        return self.run_block(block);
                    }
                }
                match else_block {
                    Some(block) => self.run_block(block),
                    None => Ok(()),
                }
            }

            Stat::While { cond, body } => {
                loop {
                    if !self.eval_bool(cond)? {
                        break;
                    }
                    match self.run_block(body) {
                        Ok(()) => {}
                        // break terminates the loop without re-testing
                        // the condition
                        Err(Bailout::Break) => break,
                        Err(other) => return Err(other),
                    }
                }
                Ok(())
            }

            Stat::Break => Err(Bailout::Break),

            Stat::Return(expr) => {
                let val = match expr {
                    Some(e) => Some(self.eval_value(e)?),
                    None => None,
                };
                self.frame_mut()?.retval = val;
                Err(Bailout::Return)
            }

            Stat::Raise(expr) => {
                let value = self.eval_value(expr)?;
                Err(Bailout::Exception(ExcPayload {
                    value,
                    span: Some(expr.span),
                }))
            }

            Stat::Wef {
                with_block,
                excepts,
                finally_block,
            } => self.exec_wef(with_block, excepts, finally_block.as_ref()),
        }
    }

    /// `with`/`except`/`finally`. The finally block runs exactly once, also
    /// on the normal path; an exception pending from the with-block is
    /// parked while it runs and restored afterwards, unless finally itself
    /// bailed out, in which case the new transfer supersedes the parked one.
    /// Break/Return/Fatal leaving the with-block propagate immediately.
    fn exec_wef(
        &mut self,
        with_block: &Block,
        excepts: &[ExceptClause],
        finally_block: Option<&Block>,
    ) -> RunResult<()> {
        let pending: RunResult<()> = match self.run_block(with_block) {
            Ok(()) => Ok(()),
            Err(Bailout::Exception(payload)) => match self.match_except(&payload, excepts)? {
                Some(clause) => {
                    let bound = payload.value.clone();
                    self.run_block_with(&clause.block, vec![(clause.var.clone(), bound)])
                }
                None => Err(Bailout::Exception(payload)),
            },
            Err(other) => return Err(other),
        };

        match finally_block {
            Some(fin) => match self.run_block(fin) {
                Ok(()) => pending,
                Err(superseding) => Err(superseding),
            },
            None => pending,
        }
    }

    /// First clause whose declared class is the payload's class or an
    /// ancestor of it. A payload that is not a reference to an object is
    /// fatal.
    fn match_except<'a>(
        &self,
        payload: &ExcPayload,
        excepts: &'a [ExceptClause],
    ) -> RunResult<Option<&'a ExceptClause>> {
        let target = payload
            .value
            .ref_target()
            .ok_or_else(|| FatalError::BadExcPayload.bail())?;
        let csi = match &*target.borrow() {
            VarNode::Object(o) => o.csi,
            _ => return Err(FatalError::BadExcPayload.bail()),
        };
        Ok(excepts
            .iter()
            .find(|c| self.program.is_derived_or_equal(csi, c.csi)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, Expr, Literal, Program, Span, TypeRef};
    use num_bigint::BigInt;

    fn sp() -> Span {
        Span::new(0, 0)
    }

    fn e(expr: Expr) -> Spanned<Expr> {
        Spanned::new(expr, sp())
    }

    fn s(stat: Stat) -> Spanned<Stat> {
        Spanned::new(stat, sp())
    }

    fn int(n: i64) -> Spanned<Expr> {
        e(Expr::Literal(Literal::Int(BigInt::from(n))))
    }

    fn name(n: &str) -> Spanned<Expr> {
        e(Expr::Nameref(n.into()))
    }

    fn assign(dest: Spanned<Expr>, src: Spanned<Expr>) -> Spanned<Stat> {
        s(Stat::Exps(e(Expr::Assign {
            dest: Box::new(dest),
            src: Box::new(src),
        })))
    }

    fn binop(op: BinOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
        e(Expr::Binop {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn local_i64(run: &Run<'_>, name: &str) -> i64 {
        let var = run.lookup_local(name).unwrap();
        Value::read(&var).as_i64().unwrap()
    }

    #[test]
    fn test_vdecl_default_and_assign() {
        let program = Program::default();
        let mut run = Run::new(&program);
        run.run_stat(&s(Stat::Vdecl {
            name: "x".into(),
            ty: TypeRef::Int,
        }))
        .unwrap();
        assert_eq!(local_i64(&run, "x"), 0);

        run.run_stat(&assign(name("x"), int(5))).unwrap();
        assert_eq!(local_i64(&run, "x"), 5);
    }

    #[test]
    fn test_duplicate_vdecl_is_fatal() {
        let program = Program::default();
        let mut run = Run::new(&program);
        let decl = s(Stat::Vdecl {
            name: "x".into(),
            ty: TypeRef::Bool,
        });
        run.run_stat(&decl).unwrap();
        assert!(matches!(run.run_stat(&decl), Err(Bailout::Fatal(_))));
    }

    #[test]
    fn test_if_else_picks_branch() {
        let program = Program::default();
        let mut run = Run::new(&program);
        run.run_stat(&s(Stat::Vdecl {
            name: "x".into(),
            ty: TypeRef::Int,
        }))
        .unwrap();
        run.run_stat(&s(Stat::If {
            branches: vec![(
                e(Expr::Literal(Literal::Bool(false))),
                Block {
                    stats: vec![assign(name("x"), int(1))],
                },
            )],
            else_block: Some(Block {
                stats: vec![assign(name("x"), int(2))],
            }),
        }))
        .unwrap();
        assert_eq!(local_i64(&run, "x"), 2);
    }

    #[test]
    fn test_while_counts_down() {
        let program = Program::default();
        let mut run = Run::new(&program);
        run.run_stat(&s(Stat::Vdecl {
            name: "x".into(),
            ty: TypeRef::Int,
        }))
        .unwrap();
        run.run_stat(&assign(name("x"), int(3))).unwrap();
        run.run_stat(&s(Stat::While {
            cond: binop(BinOp::Gt, name("x"), int(0)),
            body: Block {
                stats: vec![assign(name("x"), binop(BinOp::Minus, name("x"), int(1)))],
            },
        }))
        .unwrap();
        assert_eq!(local_i64(&run, "x"), 0);
    }

    #[test]
    fn test_break_terminates_infinite_loop() {
        let program = Program::default();
        let mut run = Run::new(&program);
        run.run_stat(&s(Stat::While {
            cond: e(Expr::Literal(Literal::Bool(true))),
            body: Block {
                stats: vec![s(Stat::Break)],
            },
        }))
        .unwrap();
    }

    #[test]
    fn test_fatal_statement_sets_error_flag() {
        let program = Program::default();
        let mut run = Run::new(&program);
        assert!(!run.errored());
        let res = run.run_stat(&s(Stat::Exps(name("nope"))));
        assert!(matches!(res, Err(Bailout::Fatal(_))));
        assert!(run.errored());
    }

    #[test]
    fn test_non_bool_condition_is_fatal() {
        let program = Program::default();
        let mut run = Run::new(&program);
        let res = run.run_stat(&s(Stat::While {
            cond: int(1),
            body: Block::default(),
        }));
        assert!(matches!(res, Err(Bailout::Fatal(_))));
    }
}
