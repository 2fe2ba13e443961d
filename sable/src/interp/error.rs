//! Execution outcomes that are not plain completion.
//!
//! Statement and expression evaluation return `RunResult<T>`: `Ok` is normal
//! completion, `Err(Bailout)` is any non-local transfer. Encoding `break`,
//! `return` and raised exceptions as the error arm lets `?` do the
//! short-circuit bookkeeping at every sub-evaluation; the construct that a
//! given transfer terminates at (the loop, the procedure boundary, the
//! `except` clause) catches its own variant and lets the rest pass.

use crate::ast::Span;
use crate::interp::value::Value;
use thiserror::Error;

pub type RunResult<T> = Result<T, Bailout>;

/// A non-local control transfer in flight.
#[derive(Debug)]
pub enum Bailout {
    /// `break`; caught by the innermost enclosing `while`.
    Break,
    /// `return`; the return Value is parked in the current Proc AR.
    Return,
    /// A raised exception travelling up to a matching `except` clause.
    Exception(ExcPayload),
    /// Unrecoverable; terminates the whole run.
    Fatal(FatalDiag),
}

/// Payload of an exception in flight: the raised Value (a reference to the
/// exception object) and the source position of the `raise`.
#[derive(Debug)]
pub struct ExcPayload {
    pub value: Value,
    pub span: Option<Span>,
}

/// A fatal error with an optional source position.
#[derive(Debug)]
pub struct FatalDiag {
    pub error: FatalError,
    pub span: Option<Span>,
}

/// Conditions the program cannot catch.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("program has no static procedure '{0}'")]
    MissingEntryPoint(String),
    #[error("program has multiple procedures named '{0}'")]
    AmbiguousEntryPoint(String),
    #[error("too few arguments in call to '{0}'")]
    TooFewArgs(String),
    #[error("too many arguments in call to '{0}'")]
    TooManyArgs(String),
    #[error("duplicate variable '{0}' in block")]
    DuplicateVar(String),
    #[error("undefined name '{0}'")]
    UndefinedName(String),
    #[error("expression has no value")]
    NoValue,
    #[error("boolean value expected, got {0}")]
    BoolExpected(&'static str),
    #[error("left side of assignment is not an address")]
    NotAnAddress,
    #[error("called value is not a delegate")]
    NotCallable,
    #[error("operator '{op}' is not defined on {tag} operands")]
    OperatorType { op: &'static str, tag: &'static str },
    #[error("operand types differ: {lhs} and {rhs}")]
    OperandMismatch {
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("array extent is not a valid non-negative integer")]
    BadExtent,
    #[error("array index count does not match array rank")]
    IndexRankMismatch,
    #[error("array index is not an integer")]
    NonIntIndex,
    #[error("this type cannot be instantiated with 'new'")]
    BadNewType,
    #[error("a {0} value has no boxed form")]
    NotBoxable(&'static str),
    #[error("member access on a value of type {0}")]
    BadAccessBase(&'static str),
    #[error("indexing a value of type {0}")]
    BadIndexBase(&'static str),
    #[error("'{1}' is not a member of '{0}'")]
    NoSuchMember(String, String),
    #[error("class '{0}' has no indexer")]
    NoIndexer(String),
    #[error("constructor arguments given but class '{0}' declares no constructor")]
    NoConstructor(String),
    #[error("property '{0}' has no getter")]
    MissingGetter(String),
    #[error("property '{0}' has no setter")]
    MissingSetter(String),
    #[error("cannot write through a prefetched property value")]
    UnsupportedPropertyWrite,
    #[error("conversion failed: '{from}' is not derived from '{to}'")]
    TypeConversion { from: String, to: String },
    #[error("raised value is not an exception object")]
    BadExcPayload,
    #[error("'self' referenced outside of a method")]
    NoReceiver,
    #[error("misplaced 'break'")]
    MisplacedBreak,
    #[error("no native handler registered for builtin '{0}'")]
    MissingBuiltin(String),
    #[error("builtin class '{0}' is not installed in the program")]
    MissingBuiltinClass(&'static str),
    #[error("char value out of range")]
    CharRange,
    #[error("unhandled exception of class '{0}'")]
    UnhandledException(String),
    #[error("no active frame")]
    NoFrame,
}

impl Bailout {
    /// Attach a source position to a fatal error that lacks one.
    pub fn with_span(self, span: Span) -> Bailout {
        match self {
            Bailout::Fatal(mut d) => {
                d.span.get_or_insert(span);
                Bailout::Fatal(d)
            }
            other => other,
        }
    }
}

impl FatalError {
    /// Into a bailout without a source position.
    pub fn bail(self) -> Bailout {
        Bailout::Fatal(FatalDiag {
            error: self,
            span: None,
        })
    }

    /// Into a bailout pointing at `span`.
    pub fn at(self, span: Span) -> Bailout {
        Bailout::Fatal(FatalDiag {
            error: self,
            span: Some(span),
        })
    }
}

impl From<FatalError> for Bailout {
    fn from(error: FatalError) -> Self {
        error.bail()
    }
}
