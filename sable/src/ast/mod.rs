//! Typed syntax tree consumed by the runtime.
//!
//! The front end (lexer, parser, static typer, ancestry resolver) lives in a
//! separate tool; it emits a fully resolved [`Program`] in which every name
//! that can be bound statically already is. CSIs (classes, structs,
//! interfaces) and enums are referenced by index, member access carries plain
//! member names, and typer-inserted nodes such as boxing conversions are
//! explicit. The whole tree derives serde so it can travel as JSON.

mod span;

pub use span::{Span, Spanned};

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the program entry procedure.
pub const ENTRY_POINT: &str = "Main";

/// Name of a constructor procedure.
pub const CTOR_NAME: &str = "new";

/// Reserved name of the indexer property of a class.
pub const INDEXER_NAME: &str = "$index";

/// Name of the single payload field of the boxed primitive classes.
pub const BOX_FIELD: &str = "value";

/// Index of a CSI definition within [`Program::csis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CsiId(pub usize);

/// Index of an enum definition within [`Program::enums`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumId(pub usize);

/// Resolved reference to a procedure: owning CSI plus index into its procs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcRef {
    pub csi: CsiId,
    pub proc: usize,
}

/// Resolved reference to a property: owning CSI plus index into its props.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropRef {
    pub csi: CsiId,
    pub prop: usize,
}

/// A complete, type-checked program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub csis: Vec<CsiDef>,
    pub enums: Vec<EnumDef>,
    /// Classes the runtime itself needs to instantiate.
    #[serde(default)]
    pub builtin: BuiltinRefs,
    /// Original source text, when the front end chose to embed it.
    #[serde(default)]
    pub source: Option<SourceInfo>,
}

/// Well-known classes the runtime instantiates on its own: error payloads
/// for runtime-raised exceptions and the boxed forms of the primitives.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BuiltinRefs {
    pub error_out_of_bounds: Option<CsiId>,
    pub error_nil_reference: Option<CsiId>,
    pub boxed_bool: Option<CsiId>,
    pub boxed_char: Option<CsiId>,
    pub boxed_int: Option<CsiId>,
    pub boxed_string: Option<CsiId>,
}

/// Source file name and text, for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CsiKind {
    Class,
    Struct,
    Interface,
}

/// A class, struct or interface definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsiDef {
    pub name: String,
    pub kind: CsiKind,
    /// Direct base CSI, already resolved by the front end.
    pub base: Option<CsiId>,
    pub fields: Vec<FieldDef>,
    pub procs: Vec<ProcDef>,
    pub props: Vec<PropDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
    pub is_static: bool,
}

/// A procedure (method or function member).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcDef {
    pub name: String,
    pub is_static: bool,
    pub params: Vec<Param>,
    /// Trailing variadic parameter; receives the remaining actuals packed
    /// into a rank-1 array.
    pub varg: Option<Param>,
    /// `None` marks a builtin procedure backed by a native handler.
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
}

/// A property. Named properties have no index params; the indexer property
/// of a class is named [`INDEXER_NAME`] and declares one param per index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropDef {
    pub name: String,
    pub ty: TypeRef,
    pub params: Vec<Param>,
    pub getter: Option<Block>,
    pub setter: Option<Setter>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setter {
    /// Name the incoming value is bound to inside the body.
    pub param: String,
    pub body: Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    pub members: Vec<String>,
}

/// A static type annotation, as resolved by the typer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeRef {
    Bool,
    Char,
    Int,
    String,
    Resource,
    Object(CsiId),
    Enum(EnumId),
    Array { base: Box<TypeRef>, rank: usize },
    Deleg,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub stats: Vec<Spanned<Stat>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stat {
    /// Expression statement; a produced value is discarded with a warning.
    Exps(Spanned<Expr>),
    /// Local variable declaration, default-initialized.
    Vdecl { name: String, ty: TypeRef },
    /// `if`/`elif` chain with optional `else`.
    If {
        branches: Vec<(Spanned<Expr>, Block)>,
        else_block: Option<Block>,
    },
    While { cond: Spanned<Expr>, body: Block },
    Break,
    Return(Option<Spanned<Expr>>),
    Raise(Spanned<Expr>),
    /// `with`/`except`/`finally`.
    Wef {
        with_block: Block,
        excepts: Vec<ExceptClause>,
        finally_block: Option<Block>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptClause {
    /// Variable the payload is bound to inside the clause.
    pub var: String,
    /// Matches payloads whose class is this CSI or derived from it.
    pub csi: CsiId,
    pub block: Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Unqualified name, resolved at run time against the activation stack
    /// and the surrounding class scope.
    Nameref(String),
    Literal(Literal),
    SelfRef,
    Binop {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    Unop {
        op: UnOp,
        arg: Box<Spanned<Expr>>,
    },
    /// `new T(args)` or `new T[extents]`.
    New {
        ty: TypeRef,
        extents: Vec<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },
    Access {
        base: Box<Spanned<Expr>>,
        member: String,
    },
    Call {
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },
    Index {
        base: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },
    Assign {
        dest: Box<Spanned<Expr>>,
        src: Box<Spanned<Expr>>,
    },
    /// Runtime type narrowing `expr as C`.
    As {
        arg: Box<Spanned<Expr>>,
        csi: CsiId,
    },
    /// Typer-inserted boxing of a primitive into its boxed class.
    Boxing { arg: Box<Spanned<Expr>> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Bool(bool),
    Char(char),
    Int(BigInt),
    String(String),
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Plus,
    Minus,
    Mult,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Plus => "+",
            BinOp::Minus => "-",
            BinOp::Mult => "*",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::LtEq => "<=",
            BinOp::GtEq => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    Plus,
    Minus,
    Not,
}

impl UnOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnOp::Plus => "+",
            UnOp::Minus => "-",
            UnOp::Not => "not",
        }
    }
}

impl Program {
    pub fn csi(&self, id: CsiId) -> &CsiDef {
        &self.csis[id.0]
    }

    pub fn enum_def(&self, id: EnumId) -> &EnumDef {
        &self.enums[id.0]
    }

    pub fn proc(&self, r: ProcRef) -> &ProcDef {
        &self.csis[r.csi.0].procs[r.proc]
    }

    pub fn prop(&self, r: PropRef) -> &PropDef {
        &self.csis[r.csi.0].props[r.prop]
    }

    pub fn find_csi(&self, name: &str) -> Option<CsiId> {
        self.csis.iter().position(|c| c.name == name).map(CsiId)
    }

    pub fn find_enum(&self, name: &str) -> Option<EnumId> {
        self.enums.iter().position(|e| e.name == name).map(EnumId)
    }

    pub fn find_proc(&self, csi: CsiId, name: &str) -> Option<ProcRef> {
        self.csi(csi)
            .procs
            .iter()
            .position(|p| p.name == name)
            .map(|proc| ProcRef { csi, proc })
    }

    pub fn find_prop(&self, csi: CsiId, name: &str) -> Option<PropRef> {
        self.csi(csi)
            .props
            .iter()
            .position(|p| p.name == name)
            .map(|prop| PropRef { csi, prop })
    }

    /// Ancestry of `id`, most-derived first, `id` included.
    pub fn ancestry(&self, id: CsiId) -> Vec<CsiId> {
        let mut out = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            out.push(c);
            cur = self.csi(c).base;
        }
        out
    }

    /// True when `sub` is `sup` or transitively derived from it.
    pub fn is_derived_or_equal(&self, sub: CsiId, sup: CsiId) -> bool {
        let mut cur = Some(sub);
        while let Some(c) = cur {
            if c == sup {
                return true;
            }
            cur = self.csi(c).base;
        }
        false
    }

    /// Fully-qualified procedure name, used as the builtin-handler key.
    pub fn proc_fqn(&self, r: ProcRef) -> String {
        format!("{}.{}", self.csi(r.csi).name, self.proc(r).name)
    }

    /// Instance (or static) fields across the whole ancestry, base-most
    /// first, as one flat name-to-type map. Shadowing is rejected by the
    /// typer so plain insertion is fine.
    pub fn collect_fields(&self, id: CsiId, is_static: bool) -> HashMap<String, TypeRef> {
        let mut fields = HashMap::new();
        for csi in self.ancestry(id).into_iter().rev() {
            for f in &self.csi(csi).fields {
                if f.is_static == is_static {
                    fields.insert(f.name.clone(), f.ty.clone());
                }
            }
        }
        fields
    }
}
