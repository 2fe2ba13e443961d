//! Expression evaluator.
//!
//! Expressions yield `Option<Item>`: an Address for lvalues, a Value for
//! rvalues, `None` for expressions that legitimately produce nothing
//! (assignment, a call to a procedure without a return value). Using `.` or
//! indexing through a reference dereferences it implicitly; dereferencing
//! nil raises the catchable NilReference exception.

use crate::ast::{
    BinOp, CsiId, EnumId, Expr, ProcRef, PropRef, Span, Spanned, TypeRef, UnOp, INDEXER_NAME,
};
use crate::interp::error::{FatalError, RunResult};
use crate::interp::item::{Address, Item, PropAddr};
use crate::interp::value::{Deleg, SymbolRef, Value, VarNode, VarRef};
use crate::interp::Run;
use num_bigint::{BigInt, Sign};
use num_traits::{ToPrimitive, Zero};
use std::rc::Rc;

// Grow the host stack under deeply nested expressions instead of crashing.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// A member found in a class ancestry.
enum Member {
    Field { is_static: bool },
    Proc(ProcRef, bool),
    Prop(PropRef),
}

/// A member resolved against a concrete object.
enum ObjectMember {
    Field(VarRef),
    Deleg(Value),
    Prop(PropAddr),
}

impl Run<'_> {
    pub(crate) fn eval(&mut self, expr: &Spanned<Expr>) -> RunResult<Option<Item>> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(expr))
    }

    /// Evaluate, requiring some item.
    pub(crate) fn eval_item(&mut self, expr: &Spanned<Expr>) -> RunResult<Item> {
        self.eval(expr)?
            .ok_or_else(|| FatalError::NoValue.at(expr.span))
    }

    /// Evaluate to a Value, reading through an address if needed.
    pub(crate) fn eval_value(&mut self, expr: &Spanned<Expr>) -> RunResult<Value> {
        let mut item = self.eval_item(expr)?;
        self.item_to_value(&mut item)
    }

    /// Evaluate to a bool, for conditions.
    pub(crate) fn eval_bool(&mut self, expr: &Spanned<Expr>) -> RunResult<bool> {
        let v = self.eval_value(expr)?;
        v.as_bool()
            .ok_or_else(|| FatalError::BoolExpected(v.tag()).at(expr.span))
    }

    fn eval_inner(&mut self, expr: &Spanned<Expr>) -> RunResult<Option<Item>> {
        let span = expr.span;
        match &expr.node {
            Expr::Nameref(name) => self.eval_nameref(name, span),

            Expr::Literal(lit) => {
                let node = match lit {
                    crate::ast::Literal::Bool(b) => VarNode::Bool(*b),
                    crate::ast::Literal::Char(c) => VarNode::Char(*c),
                    crate::ast::Literal::Int(i) => VarNode::Int(i.clone()),
                    crate::ast::Literal::String(s) => VarNode::String(s.clone()),
                    crate::ast::Literal::Nil => VarNode::Ref(None),
                };
                Ok(Some(Item::from_value(Value::new(node))))
            }

            Expr::SelfRef => {
                let obj = self
                    .current_obj()
                    .ok_or_else(|| FatalError::NoReceiver.at(span))?;
                Ok(Some(Item::from_value(Value::new(VarNode::Ref(Some(obj))))))
            }

            Expr::Binop { op, lhs, rhs } => {
                let a = self.eval_value(lhs)?;
                let b = self.eval_value(rhs)?;
                let res = self.binop_values(*op, &a, &b, span)?;
                Ok(Some(Item::from_value(res)))
            }

            Expr::Unop { op, arg } => self.eval_unop(*op, arg, span),

            Expr::New { ty, extents, args } => match ty {
                TypeRef::Array { base, rank } => {
                    self.new_array(base, *rank, extents, span).map(Some)
                }
                TypeRef::Object(csi) => {
                    let mut vals = Vec::with_capacity(args.len());
                    for a in args {
                        vals.push(self.eval_value(a)?);
                    }
                    self.new_object(*csi, vals, span).map(Some)
                }
                _ => Err(FatalError::BadNewType.at(span)),
            },

            Expr::Access { base, member } => {
                let item = self.eval_item(base)?;
                self.access_item(item, member, span).map(Some)
            }

            Expr::Call { callee, args } => self.eval_call(callee, args, span),

            Expr::Index { base, args } => self.eval_index(base, args, span),

            Expr::Assign { dest, src } => {
                let dest_item = self.eval_item(dest)?;
                let src_val = self.eval_value(src)?;
                let mut addr = match dest_item {
                    Item::Address(a) => a,
                    Item::Value(_) => return Err(FatalError::NotAnAddress.at(dest.span)),
                };
                self.address_write(&mut addr, src_val)?;
                Ok(None)
            }

            Expr::As { arg, csi } => self.eval_as(arg, *csi, span),

            Expr::Boxing { arg } => {
                let v = self.eval_value(arg)?;
                self.box_value(v, span).map(Some)
            }
        }
    }

    // ---- name resolution ----

    /// Unqualified name: local variable, then member of the surrounding
    /// class scope, then a program-level CSI/enum symbol.
    fn eval_nameref(&mut self, name: &str, span: Span) -> RunResult<Option<Item>> {
        if let Some(var) = self.lookup_local(name) {
            return Ok(Some(Item::from_var(var)));
        }

        if let Some(csi) = self.context_csi() {
            if let Some(m) = self.find_member(csi, name) {
                let obj = self.current_obj();
                return self.member_item(csi, obj, m, name, span).map(Some);
            }
        }

        let prog = self.program;
        if let Some(id) = prog.find_csi(name) {
            return Ok(Some(Item::from_value(Value::new(VarNode::Symbol(
                SymbolRef::Csi(id),
            )))));
        }
        if let Some(id) = prog.find_enum(name) {
            return Ok(Some(Item::from_value(Value::new(VarNode::Symbol(
                SymbolRef::Enum(id),
            )))));
        }
        Err(FatalError::UndefinedName(name.to_string()).at(span))
    }

    /// Class scope surrounding the current frame: the receiver's runtime
    /// class if there is one, otherwise the class owning the running proc.
    fn context_csi(&self) -> Option<CsiId> {
        if let Some(obj) = self.current_obj() {
            if let VarNode::Object(o) = &*obj.borrow() {
                return Some(o.csi);
            }
        }
        self.current_proc().map(|p| p.csi)
    }

    /// Search a class ancestry for a member, most-derived first.
    fn find_member(&self, csi: CsiId, name: &str) -> Option<Member> {
        let prog = self.program;
        for c in prog.ancestry(csi) {
            let def = prog.csi(c);
            if let Some(f) = def.fields.iter().find(|f| f.name == name) {
                return Some(Member::Field {
                    is_static: f.is_static,
                });
            }
            if let Some(i) = def.procs.iter().position(|p| p.name == name) {
                return Some(Member::Proc(ProcRef { csi: c, proc: i }, def.procs[i].is_static));
            }
            if let Some(i) = def.props.iter().position(|p| p.name == name) {
                return Some(Member::Prop(PropRef { csi: c, prop: i }));
            }
        }
        None
    }

    /// Item for a member named without qualification.
    fn member_item(
        &mut self,
        csi: CsiId,
        obj: Option<VarRef>,
        m: Member,
        name: &str,
        span: Span,
    ) -> RunResult<Item> {
        match m {
            Member::Field { is_static: true } => {
                let sobj = self.static_object(csi);
                let field = object_field(&sobj, name)
                    .ok_or_else(|| FatalError::UndefinedName(name.to_string()).at(span))?;
                Ok(Item::from_var(field))
            }
            Member::Field { is_static: false } => {
                let obj = obj.ok_or_else(|| FatalError::NoReceiver.at(span))?;
                let field = object_field(&obj, name)
                    .ok_or_else(|| FatalError::UndefinedName(name.to_string()).at(span))?;
                Ok(Item::from_var(field))
            }
            Member::Proc(pr, is_static) => {
                let bound = if is_static {
                    None
                } else {
                    Some(obj.ok_or_else(|| FatalError::NoReceiver.at(span))?)
                };
                Ok(Item::from_value(Value::new(VarNode::Deleg(Deleg {
                    obj: bound,
                    proc: pr,
                }))))
            }
            Member::Prop(pr) => {
                let obj = obj.ok_or_else(|| FatalError::NoReceiver.at(span))?;
                Ok(Item::Address(Address::Prop(Box::new(PropAddr::new(
                    obj, pr,
                )))))
            }
        }
    }

    // ---- member access ----

    /// `.member` on an item. A property address reads through its prefetch
    /// cache; afterwards a sub-field keeps the same address with `tpos`
    /// moved, so the getter never runs twice within one evaluation.
    fn access_item(&mut self, item: Item, member: &str, span: Span) -> RunResult<Item> {
        match item {
            Item::Address(Address::Prop(mut pa)) => {
                self.prop_read(&mut pa)?;
                let pos = pa
                    .tpos
                    .clone()
                    .ok_or_else(|| FatalError::NoValue.at(span))?;
                let target = self.deref_var(&pos, span)?;
                match self.resolve_object_member(&target, member, span)? {
                    ObjectMember::Field(field) => {
                        pa.tpos = Some(field);
                        Ok(Item::Address(Address::Prop(pa)))
                    }
                    ObjectMember::Deleg(v) => Ok(Item::from_value(v)),
                    ObjectMember::Prop(np) => Ok(Item::Address(Address::Prop(Box::new(np)))),
                }
            }
            Item::Value(v) => {
                let var = Rc::clone(v.var());
                self.access_plain(var, member, span)
            }
            Item::Address(Address::Var(var)) => self.access_plain(var, member, span),
        }
    }

    fn access_plain(&mut self, var: VarRef, member: &str, span: Span) -> RunResult<Item> {
        let target = self.deref_var(&var, span)?;
        let sym = match &*target.borrow() {
            VarNode::Object(_) => None,
            VarNode::Symbol(s) => Some(*s),
            other => return Err(FatalError::BadAccessBase(other.tag()).at(span)),
        };
        match sym {
            None => match self.resolve_object_member(&target, member, span)? {
                ObjectMember::Field(field) => Ok(Item::from_var(field)),
                ObjectMember::Deleg(v) => Ok(Item::from_value(v)),
                ObjectMember::Prop(pa) => Ok(Item::Address(Address::Prop(Box::new(pa)))),
            },
            Some(SymbolRef::Csi(id)) => self.access_csi_symbol(id, member, span),
            Some(SymbolRef::Enum(id)) => self.access_enum_symbol(id, member, span),
        }
    }

    /// Member of a concrete object var.
    fn resolve_object_member(
        &mut self,
        obj: &VarRef,
        member: &str,
        span: Span,
    ) -> RunResult<ObjectMember> {
        let (csi, obj_is_static) = match &*obj.borrow() {
            VarNode::Object(o) => (o.csi, o.is_static),
            other => return Err(FatalError::BadAccessBase(other.tag()).at(span)),
        };
        let class_name = self.program.csi(csi).name.clone();
        match self.find_member(csi, member) {
            Some(Member::Field { is_static }) => {
                let holder = if is_static && !obj_is_static {
                    self.static_object(csi)
                } else {
                    Rc::clone(obj)
                };
                let field = object_field(&holder, member).ok_or_else(|| {
                    FatalError::NoSuchMember(class_name, member.to_string()).at(span)
                })?;
                Ok(ObjectMember::Field(field))
            }
            Some(Member::Proc(pr, is_static)) => {
                let bound = if is_static { None } else { Some(Rc::clone(obj)) };
                Ok(ObjectMember::Deleg(Value::new(VarNode::Deleg(Deleg {
                    obj: bound,
                    proc: pr,
                }))))
            }
            Some(Member::Prop(pr)) => Ok(ObjectMember::Prop(PropAddr::new(Rc::clone(obj), pr))),
            None => Err(FatalError::NoSuchMember(class_name, member.to_string()).at(span)),
        }
    }

    /// `C.member` through a class symbol: static members only.
    fn access_csi_symbol(&mut self, id: CsiId, member: &str, span: Span) -> RunResult<Item> {
        let class_name = self.program.csi(id).name.clone();
        match self.find_member(id, member) {
            Some(Member::Field { is_static: true }) => {
                let sobj = self.static_object(id);
                let field = object_field(&sobj, member).ok_or_else(|| {
                    FatalError::NoSuchMember(class_name, member.to_string()).at(span)
                })?;
                Ok(Item::from_var(field))
            }
            Some(Member::Proc(pr, true)) => Ok(Item::from_value(Value::new(VarNode::Deleg(
                Deleg { obj: None, proc: pr },
            )))),
            Some(Member::Field { is_static: false })
            | Some(Member::Proc(_, false))
            | Some(Member::Prop(_)) => Err(FatalError::NoReceiver.at(span)),
            None => Err(FatalError::NoSuchMember(class_name, member.to_string()).at(span)),
        }
    }

    /// `E.member` through an enum symbol yields the member value.
    fn access_enum_symbol(&mut self, id: EnumId, member: &str, span: Span) -> RunResult<Item> {
        let def = self.program.enum_def(id);
        let ordinal = def
            .members
            .iter()
            .position(|m| m == member)
            .ok_or_else(|| {
                FatalError::NoSuchMember(def.name.clone(), member.to_string()).at(span)
            })?;
        Ok(Item::from_value(Value::new(VarNode::EnumVal(
            crate::interp::value::EnumVal {
                enum_id: id,
                ordinal,
            },
        ))))
    }

    /// Implicit dereference: through a non-nil reference to its target,
    /// identity for anything that is not a reference. Nil raises.
    pub(crate) fn deref_var(&mut self, var: &VarRef, span: Span) -> RunResult<VarRef> {
        let target = match &*var.borrow() {
            VarNode::Ref(Some(t)) => Some(Rc::clone(t)),
            VarNode::Ref(None) => None,
            _ => return Ok(Rc::clone(var)),
        };
        match target {
            Some(t) => Ok(t),
            None => Err(self.raise_nil_reference(span)),
        }
    }

    // ---- calls ----

    fn eval_call(
        &mut self,
        callee: &Spanned<Expr>,
        args: &[Spanned<Expr>],
        span: Span,
    ) -> RunResult<Option<Item>> {
        let cv = self.eval_value(callee)?;
        let deleg = match &*cv.var().borrow() {
            VarNode::Deleg(d) => d.clone(),
            _ => return Err(FatalError::NotCallable.at(span)),
        };
        let mut vals = Vec::with_capacity(args.len());
        for a in args {
            vals.push(self.eval_value(a)?);
        }
        let ret = self.call_proc(deleg.obj, deleg.proc, vals)?;
        Ok(ret.map(Item::from_value))
    }

    // ---- indexing ----

    fn eval_index(
        &mut self,
        base: &Spanned<Expr>,
        args: &[Spanned<Expr>],
        span: Span,
    ) -> RunResult<Option<Item>> {
        let base_item = self.eval_item(base)?;
        let mut idx = Vec::with_capacity(args.len());
        for a in args {
            idx.push(self.eval_value(a)?);
        }
        match base_item {
            Item::Value(v) => {
                let var = v.into_var();
                self.index_var(var, idx, span)
            }
            Item::Address(Address::Var(var)) => self.index_var(var, idx, span),
            Item::Address(Address::Prop(mut pa)) => {
                let v = self.prop_read(&mut pa)?;
                self.index_var(v.into_var(), idx, span)
            }
        }
    }

    fn index_var(
        &mut self,
        var: VarRef,
        args: Vec<Value>,
        span: Span,
    ) -> RunResult<Option<Item>> {
        let target = self.deref_var(&var, span)?;
        let tag = target.borrow().tag();
        match tag {
            "array" => self.index_array(&target, args, span),
            "object" => self.index_object(target, args, span),
            "string" => self.index_string(&target, args, span),
            other => Err(FatalError::BadIndexBase(other).at(span)),
        }
    }

    /// Row-major element lookup with a per-dimension bounds check; any
    /// index outside its extent raises the catchable OutOfBounds.
    fn index_array(
        &mut self,
        arr: &VarRef,
        args: Vec<Value>,
        span: Span,
    ) -> RunResult<Option<Item>> {
        let extents = match &*arr.borrow() {
            VarNode::Array(a) => a.extents.clone(),
            other => return Err(FatalError::BadIndexBase(other.tag()).at(span)),
        };
        if args.len() != extents.len() {
            return Err(FatalError::IndexRankMismatch.at(span));
        }

        let mut linear = 0usize;
        for (v, ext) in args.iter().zip(&extents) {
            let idx = v.as_int().ok_or_else(|| FatalError::NonIntIndex.at(span))?;
            let idx = match idx.to_usize() {
                Some(u) if u < *ext => u,
                _ => return Err(self.raise_out_of_bounds(span)),
            };
            linear = linear * ext + idx;
        }

        let elem = match &*arr.borrow() {
            VarNode::Array(a) => Rc::clone(&a.elems[linear]),
            other => return Err(FatalError::BadIndexBase(other.tag()).at(span)),
        };
        Ok(Some(Item::from_var(elem)))
    }

    /// `obj[args]` addresses the class's indexer property.
    fn index_object(
        &mut self,
        obj: VarRef,
        args: Vec<Value>,
        span: Span,
    ) -> RunResult<Option<Item>> {
        let csi = match &*obj.borrow() {
            VarNode::Object(o) => o.csi,
            other => return Err(FatalError::BadIndexBase(other.tag()).at(span)),
        };
        let class_name = self.program.csi(csi).name.clone();
        let pr = match self.find_member(csi, INDEXER_NAME) {
            Some(Member::Prop(pr)) => pr,
            _ => return Err(FatalError::NoIndexer(class_name).at(span)),
        };
        if self.program.prop(pr).params.len() != args.len() {
            return Err(FatalError::IndexRankMismatch.at(span));
        }
        Ok(Some(Item::Address(Address::Prop(Box::new(
            PropAddr::indexed(obj, pr, args),
        )))))
    }

    /// `s[i]` extracts a single character.
    fn index_string(
        &mut self,
        svar: &VarRef,
        args: Vec<Value>,
        span: Span,
    ) -> RunResult<Option<Item>> {
        if args.len() != 1 {
            return Err(FatalError::IndexRankMismatch.at(span));
        }
        let idx = args[0]
            .as_int()
            .ok_or_else(|| FatalError::NonIntIndex.at(span))?;
        let s = match &*svar.borrow() {
            VarNode::String(s) => s.clone(),
            other => return Err(FatalError::BadIndexBase(other.tag()).at(span)),
        };
        match idx.to_usize().and_then(|i| s.chars().nth(i)) {
            Some(c) => Ok(Some(Item::from_value(Value::new(VarNode::Char(c))))),
            None => Err(self.raise_out_of_bounds(span)),
        }
    }

    // ---- conversions ----

    fn eval_as(
        &mut self,
        arg: &Spanned<Expr>,
        csi: CsiId,
        span: Span,
    ) -> RunResult<Option<Item>> {
        let v = self.eval_value(arg)?;
        if v.is_nil() {
            return Ok(Some(Item::from_value(v)));
        }
        let to = self.program.csi(csi).name.clone();
        let target = v.ref_target().ok_or_else(|| {
            FatalError::TypeConversion {
                from: v.tag().to_string(),
                to: to.clone(),
            }
            .at(span)
        })?;
        let actual = match &*target.borrow() {
            VarNode::Object(o) => o.csi,
            other => {
                return Err(FatalError::TypeConversion {
                    from: other.tag().to_string(),
                    to,
                }
                .at(span))
            }
        };
        if self.program.is_derived_or_equal(actual, csi) {
            Ok(Some(Item::from_value(v)))
        } else {
            Err(FatalError::TypeConversion {
                from: self.program.csi(actual).name.clone(),
                to,
            }
            .at(span))
        }
    }

    // ---- operators ----

    fn eval_unop(
        &mut self,
        op: UnOp,
        arg: &Spanned<Expr>,
        span: Span,
    ) -> RunResult<Option<Item>> {
        let v = self.eval_value(arg)?;
        let node = match (&*v.var().borrow(), op) {
            (VarNode::Int(i), UnOp::Plus) => VarNode::Int(i.clone()),
            (VarNode::Int(i), UnOp::Minus) => VarNode::Int(-i),
            (VarNode::Bool(b), UnOp::Not) => VarNode::Bool(!b),
            (n, _) => {
                return Err(FatalError::OperatorType {
                    op: op.symbol(),
                    tag: n.tag(),
                }
                .at(span))
            }
        };
        Ok(Some(Item::from_value(Value::new(node))))
    }

    /// Operand tags must match exactly; each tag then has its own table.
    fn binop_values(&self, op: BinOp, a: &Value, b: &Value, span: Span) -> RunResult<Value> {
        let an = a.var().borrow();
        let bn = b.var().borrow();
        let node = match (&*an, &*bn) {
            (VarNode::Bool(x), VarNode::Bool(y)) => binop_bool(op, *x, *y),
            (VarNode::Char(x), VarNode::Char(y)) => binop_char(op, *x, *y),
            (VarNode::Int(x), VarNode::Int(y)) => binop_int(op, x, y),
            (VarNode::String(x), VarNode::String(y)) => binop_string(op, x, y),
            (VarNode::Ref(x), VarNode::Ref(y)) => binop_ref(op, x, y),
            (VarNode::EnumVal(x), VarNode::EnumVal(y)) => binop_enum(op, *x, *y),
            (x, y) if x.tag() == y.tag() => Err(FatalError::OperatorType {
                op: op.symbol(),
                tag: x.tag(),
            }),
            (x, y) => Err(FatalError::OperandMismatch {
                lhs: x.tag(),
                rhs: y.tag(),
            }),
        };
        node.map(Value::new).map_err(|e| e.at(span))
    }
}

fn object_field(obj: &VarRef, name: &str) -> Option<VarRef> {
    match &*obj.borrow() {
        VarNode::Object(o) => o.fields.get(name).cloned(),
        _ => None,
    }
}

/// Relational outcome from the zero/negative flags of `lhs - rhs`.
fn rel_from_flags(op: BinOp, zf: bool, nf: bool) -> Option<bool> {
    Some(match op {
        BinOp::Eq => zf,
        BinOp::NotEq => !zf,
        BinOp::Lt => !zf && nf,
        BinOp::Gt => !zf && !nf,
        BinOp::LtEq => zf || nf,
        BinOp::GtEq => zf || !nf,
        _ => return None,
    })
}

fn binop_bool(op: BinOp, a: bool, b: bool) -> Result<VarNode, FatalError> {
    match op {
        BinOp::And => Ok(VarNode::Bool(a && b)),
        BinOp::Or => Ok(VarNode::Bool(a || b)),
        // false orders before true
        _ => rel_from_flags(op, a == b, !a && b)
            .map(VarNode::Bool)
            .ok_or(FatalError::OperatorType {
                op: op.symbol(),
                tag: "bool",
            }),
    }
}

fn binop_char(op: BinOp, a: char, b: char) -> Result<VarNode, FatalError> {
    let (x, y) = (a as u32, b as u32);
    match op {
        BinOp::Plus | BinOp::Minus | BinOp::Mult => {
            let r = match op {
                BinOp::Plus => x.checked_add(y),
                BinOp::Minus => x.checked_sub(y),
                _ => x.checked_mul(y),
            };
            r.and_then(char::from_u32)
                .map(VarNode::Char)
                .ok_or(FatalError::CharRange)
        }
        _ => rel_from_flags(op, x == y, x < y)
            .map(VarNode::Bool)
            .ok_or(FatalError::OperatorType {
                op: op.symbol(),
                tag: "char",
            }),
    }
}

fn binop_int(op: BinOp, a: &BigInt, b: &BigInt) -> Result<VarNode, FatalError> {
    match op {
        BinOp::Plus => Ok(VarNode::Int(a + b)),
        BinOp::Minus => Ok(VarNode::Int(a - b)),
        BinOp::Mult => Ok(VarNode::Int(a * b)),
        _ => {
            let diff = a - b;
            let zf = diff.is_zero();
            let nf = diff.sign() == Sign::Minus;
            rel_from_flags(op, zf, nf)
                .map(VarNode::Bool)
                .ok_or(FatalError::OperatorType {
                    op: op.symbol(),
                    tag: "int",
                })
        }
    }
}

fn binop_string(op: BinOp, a: &str, b: &str) -> Result<VarNode, FatalError> {
    match op {
        BinOp::Plus => Ok(VarNode::String(format!("{a}{b}"))),
        BinOp::Eq => Ok(VarNode::Bool(a == b)),
        BinOp::NotEq => Ok(VarNode::Bool(a != b)),
        _ => Err(FatalError::OperatorType {
            op: op.symbol(),
            tag: "string",
        }),
    }
}

/// References compare by identity only.
fn binop_ref(
    op: BinOp,
    a: &Option<VarRef>,
    b: &Option<VarRef>,
) -> Result<VarNode, FatalError> {
    let same = match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => Rc::ptr_eq(x, y),
        _ => false,
    };
    match op {
        BinOp::Eq => Ok(VarNode::Bool(same)),
        BinOp::NotEq => Ok(VarNode::Bool(!same)),
        _ => Err(FatalError::OperatorType {
            op: op.symbol(),
            tag: "reference",
        }),
    }
}

fn binop_enum(
    op: BinOp,
    a: crate::interp::value::EnumVal,
    b: crate::interp::value::EnumVal,
) -> Result<VarNode, FatalError> {
    match op {
        BinOp::Eq => Ok(VarNode::Bool(a == b)),
        BinOp::NotEq => Ok(VarNode::Bool(a != b)),
        _ => Err(FatalError::OperatorType {
            op: op.symbol(),
            tag: "enum",
        }),
    }
}
