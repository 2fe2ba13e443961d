//! Run-time data: var nodes and owned Values.
//!
//! Every piece of program data is a var node. Containers (local slots, array
//! elements, object fields, Values) hold the owning `VarRef` handle;
//! `reference` and `delegate` nodes hold non-owning aliases. Copying is deep
//! for every tag except `reference`/`delegate`, which copy the pointer.

use crate::ast::{CsiId, EnumId, ProcRef, TypeRef};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a var node. The container that created the node keeps
/// the owning handle; aliases held by references and delegates keep the node
/// alive but are semantically non-owning.
pub type VarRef = Rc<RefCell<VarNode>>;

/// The tagged union at the heart of the runtime.
pub enum VarNode {
    Bool(bool),
    Char(char),
    Int(BigInt),
    String(String),
    /// Nilable pointer to an object or array var.
    Ref(Option<VarRef>),
    Deleg(Deleg),
    EnumVal(EnumVal),
    Array(ArrayVal),
    Object(ObjectVal),
    /// Opaque handle owned by native code.
    Resource(Option<u64>),
    /// First-class mention of a CSI or enum symbol.
    Symbol(SymbolRef),
}

/// A procedure bound to an optional receiver.
#[derive(Debug, Clone)]
pub struct Deleg {
    pub obj: Option<VarRef>,
    pub proc: ProcRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumVal {
    pub enum_id: EnumId,
    pub ordinal: usize,
}

/// Flat row-major array of `extents.iter().product()` element vars.
pub struct ArrayVal {
    pub base: TypeRef,
    pub extents: Vec<usize>,
    pub elems: Vec<VarRef>,
}

impl ArrayVal {
    pub fn rank(&self) -> usize {
        self.extents.len()
    }
}

/// An object instance: class plus one flat field map covering the whole
/// ancestry. Static objects carry the static fields instead.
pub struct ObjectVal {
    pub csi: CsiId,
    pub is_static: bool,
    pub fields: HashMap<String, VarRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolRef {
    Csi(CsiId),
    Enum(EnumId),
}

impl VarNode {
    /// Tag name for diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            VarNode::Bool(_) => "bool",
            VarNode::Char(_) => "char",
            VarNode::Int(_) => "int",
            VarNode::String(_) => "string",
            VarNode::Ref(_) => "reference",
            VarNode::Deleg(_) => "delegate",
            VarNode::EnumVal(_) => "enum",
            VarNode::Array(_) => "array",
            VarNode::Object(_) => "object",
            VarNode::Resource(_) => "resource",
            VarNode::Symbol(_) => "symbol",
        }
    }

    /// Default content for a variable of static type `ty`.
    pub fn default_for(ty: &TypeRef) -> VarNode {
        match ty {
            TypeRef::Bool => VarNode::Bool(false),
            TypeRef::Char => VarNode::Char('\0'),
            TypeRef::Int => VarNode::Int(BigInt::from(0)),
            TypeRef::String => VarNode::String(String::new()),
            TypeRef::Resource => VarNode::Resource(None),
            TypeRef::Object(_) | TypeRef::Array { .. } | TypeRef::Deleg => VarNode::Ref(None),
            TypeRef::Enum(id) => VarNode::EnumVal(EnumVal {
                enum_id: *id,
                ordinal: 0,
            }),
        }
    }

    /// Value-semantics copy. References and delegates copy the pointer and
    /// keep aliasing their target; everything else is copied node by node.
    pub fn deep_copy(&self) -> VarNode {
        match self {
            VarNode::Bool(b) => VarNode::Bool(*b),
            VarNode::Char(c) => VarNode::Char(*c),
            VarNode::Int(i) => VarNode::Int(i.clone()),
            VarNode::String(s) => VarNode::String(s.clone()),
            VarNode::Ref(t) => VarNode::Ref(t.clone()),
            VarNode::Deleg(d) => VarNode::Deleg(d.clone()),
            VarNode::EnumVal(e) => VarNode::EnumVal(*e),
            VarNode::Array(a) => VarNode::Array(ArrayVal {
                base: a.base.clone(),
                extents: a.extents.clone(),
                elems: a
                    .elems
                    .iter()
                    .map(|e| e.borrow().deep_copy().into_ref())
                    .collect(),
            }),
            VarNode::Object(o) => VarNode::Object(ObjectVal {
                csi: o.csi,
                is_static: o.is_static,
                fields: o
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.borrow().deep_copy().into_ref()))
                    .collect(),
            }),
            VarNode::Resource(r) => VarNode::Resource(*r),
            VarNode::Symbol(s) => VarNode::Symbol(*s),
        }
    }

    pub fn into_ref(self) -> VarRef {
        Rc::new(RefCell::new(self))
    }
}

// Shallow at reference hops so that cyclic structures terminate.
impl fmt::Debug for VarNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarNode::Bool(b) => write!(f, "Bool({b})"),
            VarNode::Char(c) => write!(f, "Char({c:?})"),
            VarNode::Int(i) => write!(f, "Int({i})"),
            VarNode::String(s) => write!(f, "String({s:?})"),
            VarNode::Ref(None) => write!(f, "Ref(nil)"),
            VarNode::Ref(Some(t)) => write!(f, "Ref({})", t.borrow().tag()),
            VarNode::Deleg(d) => write!(
                f,
                "Deleg({}.{}, bound: {})",
                d.proc.csi.0,
                d.proc.proc,
                d.obj.is_some()
            ),
            VarNode::EnumVal(e) => write!(f, "EnumVal({}#{})", e.enum_id.0, e.ordinal),
            VarNode::Array(a) => write!(f, "Array(extents: {:?})", a.extents),
            VarNode::Object(o) => {
                let mut names: Vec<&str> = o.fields.keys().map(|k| k.as_str()).collect();
                names.sort_unstable();
                write!(f, "Object(csi: {}, fields: {names:?})", o.csi.0)
            }
            VarNode::Resource(r) => write!(f, "Resource({r:?})"),
            VarNode::Symbol(s) => write!(f, "Symbol({s:?})"),
        }
    }
}

impl fmt::Display for VarNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarNode::Bool(b) => write!(f, "{b}"),
            VarNode::Char(c) => write!(f, "{c}"),
            VarNode::Int(i) => write!(f, "{i}"),
            VarNode::String(s) => write!(f, "{s}"),
            VarNode::Ref(None) => write!(f, "nil"),
            VarNode::Ref(Some(t)) => write!(f, "{}", t.borrow()),
            VarNode::Deleg(_) => write!(f, "delegate"),
            VarNode::EnumVal(_) => write!(f, "enum"),
            VarNode::Array(_) => write!(f, "array"),
            VarNode::Object(_) => write!(f, "object"),
            VarNode::Resource(_) => write!(f, "resource"),
            VarNode::Symbol(_) => write!(f, "symbol"),
        }
    }
}

/// An owned run-time value: exactly one var node graph.
#[derive(Debug)]
pub struct Value {
    var: VarRef,
}

impl Value {
    pub fn new(node: VarNode) -> Self {
        Value {
            var: node.into_ref(),
        }
    }

    /// Copy the content of a variable address into a fresh Value.
    pub fn read(var: &VarRef) -> Self {
        Value::new(var.borrow().deep_copy())
    }

    /// Handle to the owned var node.
    pub fn var(&self) -> &VarRef {
        &self.var
    }

    /// Give up ownership of the var node, e.g. to move it into a local slot.
    pub fn into_var(self) -> VarRef {
        self.var
    }

    /// Replace the content of `dest` in place with this Value's content.
    /// Aliases of `dest` observe the update; the node graph is adopted
    /// without copying when this Value is its sole owner.
    pub fn write_to(self, dest: &VarRef) {
        let node = match Rc::try_unwrap(self.var) {
            Ok(cell) => cell.into_inner(),
            Err(shared) => shared.borrow().deep_copy(),
        };
        *dest.borrow_mut() = node;
    }

    pub fn tag(&self) -> &'static str {
        self.var.borrow().tag()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &*self.var.borrow() {
            VarNode::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_char(&self) -> Option<char> {
        match &*self.var.borrow() {
            VarNode::Char(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<BigInt> {
        match &*self.var.borrow() {
            VarNode::Int(i) => Some(i.clone()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match &*self.var.borrow() {
            VarNode::Int(i) => i.to_i64(),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match &*self.var.borrow() {
            VarNode::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// True for a nil reference.
    pub fn is_nil(&self) -> bool {
        matches!(&*self.var.borrow(), VarNode::Ref(None))
    }

    /// Target of a reference Value, if it is a non-nil reference.
    pub fn ref_target(&self) -> Option<VarRef> {
        match &*self.var.borrow() {
            VarNode::Ref(Some(t)) => Some(Rc::clone(t)),
            _ => None,
        }
    }
}

// Copy-on-read semantics: cloning a Value clones the node graph.
impl Clone for Value {
    fn clone(&self) -> Self {
        Value::read(&self.var)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.var.borrow())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert!(matches!(
            VarNode::default_for(&TypeRef::Bool),
            VarNode::Bool(false)
        ));
        assert!(matches!(
            VarNode::default_for(&TypeRef::Char),
            VarNode::Char('\0')
        ));
        match VarNode::default_for(&TypeRef::Int) {
            VarNode::Int(i) => assert_eq!(i, BigInt::from(0)),
            other => panic!("expected int, got {other:?}"),
        }
        assert!(matches!(
            VarNode::default_for(&TypeRef::Object(CsiId(0))),
            VarNode::Ref(None)
        ));
        match VarNode::default_for(&TypeRef::Enum(EnumId(3))) {
            VarNode::EnumVal(e) => {
                assert_eq!(e.enum_id, EnumId(3));
                assert_eq!(e.ordinal, 0);
            }
            other => panic!("expected enum, got {other:?}"),
        }
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let arr = VarNode::Array(ArrayVal {
            base: TypeRef::Int,
            extents: vec![2],
            elems: vec![
                VarNode::Int(BigInt::from(1)).into_ref(),
                VarNode::Int(BigInt::from(2)).into_ref(),
            ],
        });
        let copy = arr.deep_copy();

        // Mutate the original; the copy must not change.
        if let VarNode::Array(a) = &arr {
            *a.elems[0].borrow_mut() = VarNode::Int(BigInt::from(99));
        }
        if let VarNode::Array(a) = &copy {
            match &*a.elems[0].borrow() {
                VarNode::Int(i) => assert_eq!(*i, BigInt::from(1)),
                other => panic!("expected int, got {other:?}"),
            }
        } else {
            panic!("expected array copy");
        }
    }

    #[test]
    fn test_reference_copy_aliases_target() {
        let target = VarNode::Int(BigInt::from(7)).into_ref();
        let r = VarNode::Ref(Some(Rc::clone(&target)));
        let copy = r.deep_copy();

        *target.borrow_mut() = VarNode::Int(BigInt::from(8));
        if let VarNode::Ref(Some(t)) = &copy {
            match &*t.borrow() {
                VarNode::Int(i) => assert_eq!(*i, BigInt::from(8)),
                other => panic!("expected int, got {other:?}"),
            }
        } else {
            panic!("expected reference copy");
        }
    }

    #[test]
    fn test_write_to_updates_in_place() {
        let dest = VarNode::Int(BigInt::from(1)).into_ref();
        let alias = Rc::clone(&dest);
        Value::new(VarNode::Int(BigInt::from(5))).write_to(&dest);
        match &*alias.borrow() {
            VarNode::Int(i) => assert_eq!(*i, BigInt::from(5)),
            other => panic!("expected int, got {other:?}"),
        };
    }

    #[test]
    fn test_value_clone_is_deep() {
        let v = Value::new(VarNode::String("abc".into()));
        let w = v.clone();
        *v.var().borrow_mut() = VarNode::String("xyz".into());
        assert_eq!(w.as_string().as_deref(), Some("abc"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::new(VarNode::Bool(true)).to_string(), "true");
        assert_eq!(
            Value::new(VarNode::Int(BigInt::from(-12))).to_string(),
            "-12"
        );
        assert_eq!(Value::new(VarNode::Ref(None)).to_string(), "nil");
    }
}
