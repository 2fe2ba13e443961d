//! Activation records.
//!
//! Three levels: a block AR holds the locals of one lexical block, a proc AR
//! holds one procedure invocation (receiver, procedure, block ARs, parked
//! return Value), and the thread AR is the call stack itself plus a sticky
//! error flag. Push and pop are strictly LIFO; local lookup walks the block
//! ARs of the current proc AR innermost to outermost and never crosses the
//! procedure boundary.

use crate::ast::{ProcDef, ProcRef, TypeRef};
use crate::interp::error::{FatalError, RunResult};
use crate::interp::value::{ArrayVal, Value, VarNode, VarRef};
use std::collections::HashMap;

/// Locals of one lexical block.
#[derive(Debug, Default)]
pub struct BlockAr {
    vars: HashMap<String, VarRef>,
}

impl BlockAr {
    pub fn new() -> Self {
        BlockAr::default()
    }

    /// Define a variable. Returns false when the name already exists in
    /// this block.
    pub fn define(&mut self, name: &str, var: VarRef) -> bool {
        if self.vars.contains_key(name) {
            return false;
        }
        self.vars.insert(name.to_string(), var);
        true
    }

    pub fn get(&self, name: &str) -> Option<VarRef> {
        self.vars.get(name).cloned()
    }
}

/// One procedure invocation.
#[derive(Debug)]
pub struct ProcAr {
    /// Receiver object var, when invoked on an instance or as an accessor.
    pub obj: Option<VarRef>,
    /// Invoked procedure; `None` for accessor routines and the synthetic
    /// interactive frame.
    pub proc: Option<ProcRef>,
    /// Block ARs, outermost first. Index 0 holds the parameters.
    pub blocks: Vec<BlockAr>,
    /// Return Value parked by `return`, consumed at the proc boundary.
    pub retval: Option<Value>,
}

impl ProcAr {
    /// New proc AR with one initial block AR for the parameters.
    pub fn new(obj: Option<VarRef>, proc: Option<ProcRef>) -> Self {
        ProcAr {
            obj,
            proc,
            blocks: vec![BlockAr::new()],
            retval: None,
        }
    }

    /// Bind a name in the innermost block, taking ownership of the Value.
    pub fn bind(&mut self, name: &str, val: Value) -> RunResult<()> {
        let block = self
            .blocks
            .last_mut()
            .expect("proc AR always has a block AR");
        if !block.define(name, val.into_var()) {
            return Err(FatalError::DuplicateVar(name.to_string()).bail());
        }
        Ok(())
    }

    pub fn push_block(&mut self) {
        self.blocks.push(BlockAr::new());
    }

    pub fn pop_block(&mut self) {
        self.blocks.pop();
        debug_assert!(!self.blocks.is_empty());
    }

    /// Look a name up across the block ARs, innermost to outermost.
    pub fn lookup(&self, name: &str) -> Option<VarRef> {
        self.blocks.iter().rev().find_map(|b| b.get(name))
    }
}

/// One logical call stack.
#[derive(Debug, Default)]
pub struct ThreadAr {
    pub proc_ars: Vec<ProcAr>,
    /// Sticky: set once any fatal error or unhandled exception occurred.
    pub error: bool,
}

impl ThreadAr {
    pub fn new() -> Self {
        ThreadAr::default()
    }

    pub fn current(&self) -> Option<&ProcAr> {
        self.proc_ars.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut ProcAr> {
        self.proc_ars.last_mut()
    }
}

/// Bind actual arguments in declaration order. A declared trailing variadic
/// parameter receives the remaining actuals packed into a fresh rank-1 array
/// behind a reference; without one, leftover actuals are fatal, as are
/// missing ones.
pub(crate) fn set_args(
    ar: &mut ProcAr,
    def: &ProcDef,
    fqn: &str,
    args: Vec<Value>,
) -> RunResult<()> {
    let mut actuals = args.into_iter();
    for param in &def.params {
        let val = actuals
            .next()
            .ok_or_else(|| FatalError::TooFewArgs(fqn.to_string()).bail())?;
        ar.bind(&param.name, val)?;
    }
    match &def.varg {
        Some(vp) => {
            let base = match &vp.ty {
                TypeRef::Array { base, .. } => (**base).clone(),
                other => other.clone(),
            };
            let elems: Vec<VarRef> = actuals.map(Value::into_var).collect();
            let arr = VarNode::Array(ArrayVal {
                base,
                extents: vec![elems.len()],
                elems,
            })
            .into_ref();
            ar.bind(&vp.name, Value::new(VarNode::Ref(Some(arr))))?;
        }
        None => {
            if actuals.next().is_some() {
                return Err(FatalError::TooManyArgs(fqn.to_string()).bail());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Param, Span};
    use crate::interp::error::Bailout;
    use num_bigint::BigInt;

    fn int_val(n: i64) -> Value {
        Value::new(VarNode::Int(BigInt::from(n)))
    }

    fn proc_def(params: &[&str], varg: Option<&str>) -> ProcDef {
        ProcDef {
            name: "f".into(),
            is_static: true,
            params: params
                .iter()
                .map(|n| Param {
                    name: (*n).into(),
                    ty: TypeRef::Int,
                })
                .collect(),
            varg: varg.map(|n| Param {
                name: n.into(),
                ty: TypeRef::Array {
                    base: Box::new(TypeRef::Int),
                    rank: 1,
                },
            }),
            body: None,
            span: Span::new(0, 0),
        }
    }

    #[test]
    fn test_block_lookup_shadowing() {
        let mut ar = ProcAr::new(None, None);
        ar.bind("x", int_val(1)).unwrap();
        ar.push_block();
        ar.blocks
            .last_mut()
            .unwrap()
            .define("x", VarNode::Int(BigInt::from(2)).into_ref());

        let inner = ar.lookup("x").unwrap();
        assert!(matches!(&*inner.borrow(), VarNode::Int(i) if *i == BigInt::from(2)));

        ar.pop_block();
        let outer = ar.lookup("x").unwrap();
        assert!(matches!(&*outer.borrow(), VarNode::Int(i) if *i == BigInt::from(1)));
    }

    #[test]
    fn test_duplicate_binding_is_fatal() {
        let mut ar = ProcAr::new(None, None);
        ar.bind("x", int_val(1)).unwrap();
        assert!(matches!(
            ar.bind("x", int_val(2)),
            Err(Bailout::Fatal(_))
        ));
    }

    #[test]
    fn test_set_args_exact() {
        let def = proc_def(&["a", "b"], None);
        let mut ar = ProcAr::new(None, None);
        set_args(&mut ar, &def, "T.f", vec![int_val(1), int_val(2)]).unwrap();
        assert!(ar.lookup("a").is_some());
        assert!(ar.lookup("b").is_some());
    }

    #[test]
    fn test_set_args_arity_mismatch_fatal() {
        let def = proc_def(&["a", "b"], None);

        let mut ar = ProcAr::new(None, None);
        let too_few = set_args(&mut ar, &def, "T.f", vec![int_val(1)]);
        assert!(matches!(too_few, Err(Bailout::Fatal(_))));

        let mut ar = ProcAr::new(None, None);
        let too_many = set_args(&mut ar, &def, "T.f", vec![int_val(1), int_val(2), int_val(3)]);
        assert!(matches!(too_many, Err(Bailout::Fatal(_))));
    }

    #[test]
    fn test_variadic_packs_rest_into_array() {
        let def = proc_def(&["a"], Some("rest"));
        let mut ar = ProcAr::new(None, None);
        set_args(
            &mut ar,
            &def,
            "T.f",
            vec![int_val(1), int_val(2), int_val(3)],
        )
        .unwrap();

        let a = ar.lookup("a").unwrap();
        assert!(matches!(&*a.borrow(), VarNode::Int(i) if *i == BigInt::from(1)));

        let rest = ar.lookup("rest").unwrap();
        let target = match &*rest.borrow() {
            VarNode::Ref(Some(t)) => t.clone(),
            other => panic!("expected reference, got {other:?}"),
        };
        match &*target.borrow() {
            VarNode::Array(arr) => {
                assert_eq!(arr.extents, vec![2]);
                assert!(
                    matches!(&*arr.elems[0].borrow(), VarNode::Int(i) if *i == BigInt::from(2))
                );
                assert!(
                    matches!(&*arr.elems[1].borrow(), VarNode::Int(i) if *i == BigInt::from(3))
                );
            }
            other => panic!("expected array, got {other:?}"),
        };
    }

    #[test]
    fn test_variadic_accepts_empty_rest() {
        let def = proc_def(&[], Some("rest"));
        let mut ar = ProcAr::new(None, None);
        set_args(&mut ar, &def, "T.f", vec![]).unwrap();
        let rest = ar.lookup("rest").unwrap();
        let target = match &*rest.borrow() {
            VarNode::Ref(Some(t)) => t.clone(),
            other => panic!("expected reference, got {other:?}"),
        };
        assert!(matches!(&*target.borrow(), VarNode::Array(a) if a.elems.is_empty()));
    }
}
