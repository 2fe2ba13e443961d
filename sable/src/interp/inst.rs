//! Instantiation: objects, arrays, boxed primitives, and the exceptions
//! the engine raises on its own behalf.

use crate::ast::{CsiId, Expr, Span, Spanned, TypeRef, BOX_FIELD, CTOR_NAME};
use crate::interp::error::{Bailout, ExcPayload, FatalError, RunResult};
use crate::interp::item::Item;
use crate::interp::value::{ArrayVal, ObjectVal, Value, VarNode, VarRef};
use crate::interp::Run;
use std::rc::Rc;

impl Run<'_> {
    /// Allocate an instance: one flat field map over the whole ancestry,
    /// every field at its static default. No constructor involvement.
    pub(crate) fn alloc_object(&mut self, csi: CsiId) -> VarRef {
        let fields = self
            .program
            .collect_fields(csi, false)
            .into_iter()
            .map(|(name, ty)| (name, VarNode::default_for(&ty).into_ref()))
            .collect();
        VarNode::Object(ObjectVal {
            csi,
            is_static: false,
            fields,
        })
        .into_ref()
    }

    /// `new C(args)`: allocate, then run a constructor declared directly on
    /// the most-derived class, if it has one. Base constructors are never
    /// chained implicitly.
    pub(crate) fn new_object(
        &mut self,
        csi: CsiId,
        args: Vec<Value>,
        span: Span,
    ) -> RunResult<Item> {
        let obj = self.alloc_object(csi);
        let prog = self.program;
        match prog.find_proc(csi, CTOR_NAME) {
            Some(ctor) => {
                self.call_proc(Some(Rc::clone(&obj)), ctor, args)?;
            }
            None if !args.is_empty() => {
                return Err(FatalError::NoConstructor(prog.csi(csi).name.clone()).at(span));
            }
            None => {}
        }
        Ok(Item::from_value(Value::new(VarNode::Ref(Some(obj)))))
    }

    /// `new T[extents]`: every extent must be a non-negative integer and
    /// the element count must fit the address space. Failures here are
    /// fatal, unlike the catchable bounds check when indexing.
    pub(crate) fn new_array(
        &mut self,
        base: &TypeRef,
        rank: usize,
        extents: &[Spanned<Expr>],
        span: Span,
    ) -> RunResult<Item> {
        if extents.len() != rank {
            return Err(FatalError::IndexRankMismatch.at(span));
        }
        let mut dims = Vec::with_capacity(extents.len());
        for ext in extents {
            let v = self.eval_value(ext)?;
            let n = v
                .as_int()
                .and_then(|i| num_traits::ToPrimitive::to_usize(&i))
                .ok_or_else(|| FatalError::BadExtent.at(ext.span))?;
            dims.push(n);
        }
        let mut total = 1usize;
        for d in &dims {
            total = total
                .checked_mul(*d)
                .ok_or_else(|| FatalError::BadExtent.at(span))?;
        }
        let elems = (0..total)
            .map(|_| VarNode::default_for(base).into_ref())
            .collect();
        let arr = VarNode::Array(ArrayVal {
            base: base.clone(),
            extents: dims,
            elems,
        })
        .into_ref();
        Ok(Item::from_value(Value::new(VarNode::Ref(Some(arr)))))
    }

    /// Wrap a primitive Value into an instance of its boxed class, stored
    /// in the class's single payload field.
    pub(crate) fn box_value(&mut self, val: Value, span: Span) -> RunResult<Item> {
        let b = self.program.builtin;
        let (csi, which) = match val.tag() {
            "bool" => (b.boxed_bool, "BoxedBool"),
            "char" => (b.boxed_char, "BoxedChar"),
            "int" => (b.boxed_int, "BoxedInt"),
            "string" => (b.boxed_string, "BoxedString"),
            other => return Err(FatalError::NotBoxable(other).at(span)),
        };
        let csi = csi.ok_or_else(|| FatalError::MissingBuiltinClass(which).at(span))?;
        let obj = self.alloc_object(csi);
        let field = match &*obj.borrow() {
            VarNode::Object(o) => o.fields.get(BOX_FIELD).cloned(),
            _ => None,
        }
        .ok_or_else(|| {
            FatalError::NoSuchMember(which.to_string(), BOX_FIELD.to_string()).at(span)
        })?;
        val.write_to(&field);
        Ok(Item::from_value(Value::new(VarNode::Ref(Some(obj)))))
    }

    fn raise_builtin(&mut self, csi: Option<CsiId>, which: &'static str, span: Span) -> Bailout {
        let Some(csi) = csi else {
            return FatalError::MissingBuiltinClass(which).at(span);
        };
        let obj = self.alloc_object(csi);
        Bailout::Exception(ExcPayload {
            value: Value::new(VarNode::Ref(Some(obj))),
            span: Some(span),
        })
    }

    /// Catchable exception for a nil dereference.
    pub(crate) fn raise_nil_reference(&mut self, span: Span) -> Bailout {
        let id = self.program.builtin.error_nil_reference;
        self.raise_builtin(id, "Error.NilReference", span)
    }

    /// Catchable exception for an index outside its extent.
    pub(crate) fn raise_out_of_bounds(&mut self, span: Span) -> Bailout {
        let id = self.program.builtin.error_out_of_bounds;
        self.raise_builtin(id, "Error.OutOfBounds", span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CsiDef, CsiKind, FieldDef, Literal, Program};
    use num_bigint::BigInt;

    fn sp() -> Span {
        Span::new(0, 0)
    }

    fn int_lit(n: i64) -> Spanned<Expr> {
        Spanned::new(Expr::Literal(Literal::Int(BigInt::from(n))), sp())
    }

    fn program_with_hierarchy() -> Program {
        Program {
            csis: vec![
                CsiDef {
                    name: "Base".into(),
                    kind: CsiKind::Class,
                    base: None,
                    fields: vec![FieldDef {
                        name: "a".into(),
                        ty: TypeRef::Int,
                        is_static: false,
                    }],
                    procs: vec![],
                    props: vec![],
                },
                CsiDef {
                    name: "Derived".into(),
                    kind: CsiKind::Class,
                    base: Some(CsiId(0)),
                    fields: vec![FieldDef {
                        name: "s".into(),
                        ty: TypeRef::String,
                        is_static: false,
                    }],
                    procs: vec![],
                    props: vec![],
                },
            ],
            ..Program::default()
        }
    }

    #[test]
    fn test_alloc_object_flattens_and_defaults() {
        let program = program_with_hierarchy();
        let mut run = Run::new(&program);
        let obj = run.alloc_object(CsiId(1));
        match &*obj.borrow() {
            VarNode::Object(o) => {
                assert_eq!(o.fields.len(), 2);
                assert!(
                    matches!(&*o.fields["a"].borrow(), VarNode::Int(i) if *i == BigInt::from(0))
                );
                assert!(matches!(&*o.fields["s"].borrow(), VarNode::String(s) if s.is_empty()));
            }
            other => panic!("expected object, got {other:?}"),
        };
    }

    #[test]
    fn test_ctor_args_without_ctor_are_fatal() {
        let program = program_with_hierarchy();
        let mut run = Run::new(&program);
        let res = run.new_object(
            CsiId(0),
            vec![Value::new(VarNode::Int(BigInt::from(1)))],
            sp(),
        );
        assert!(matches!(res, Err(Bailout::Fatal(_))));
    }

    #[test]
    fn test_new_array_defaults() {
        let program = Program::default();
        let mut run = Run::new(&program);
        let item = run
            .new_array(&TypeRef::Int, 2, &[int_lit(2), int_lit(3)], sp())
            .unwrap();
        let Item::Value(v) = item else {
            panic!("expected value item");
        };
        let arr = v.ref_target().unwrap();
        match &*arr.borrow() {
            VarNode::Array(a) => {
                assert_eq!(a.extents, vec![2, 3]);
                assert_eq!(a.elems.len(), 6);
                assert!(a
                    .elems
                    .iter()
                    .all(|e| matches!(&*e.borrow(), VarNode::Int(i) if *i == BigInt::from(0))));
            }
            other => panic!("expected array, got {other:?}"),
        };
    }

    #[test]
    fn test_negative_extent_is_fatal() {
        let program = Program::default();
        let mut run = Run::new(&program);
        let res = run.new_array(&TypeRef::Int, 1, &[int_lit(-1)], sp());
        assert!(matches!(res, Err(Bailout::Fatal(_))));
    }

    #[test]
    fn test_zero_extent_is_empty_not_fatal() {
        let program = Program::default();
        let mut run = Run::new(&program);
        let item = run.new_array(&TypeRef::Bool, 1, &[int_lit(0)], sp()).unwrap();
        let Item::Value(v) = item else {
            panic!("expected value item");
        };
        let arr = v.ref_target().unwrap();
        assert!(matches!(&*arr.borrow(), VarNode::Array(a) if a.elems.is_empty()));
    }

    #[test]
    fn test_raise_without_builtin_class_is_fatal() {
        let program = Program::default();
        let mut run = Run::new(&program);
        assert!(matches!(
            run.raise_out_of_bounds(sp()),
            Bailout::Fatal(_)
        ));
    }
}
