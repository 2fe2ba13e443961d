//! The execution engine.
//!
//! A [`Run`] owns everything one program execution needs: the thread AR
//! (the call stack), the native-handler table for builtin procedures, and
//! the lazily created static objects. The program itself is borrowed, fully
//! typed and ancestry-resolved; the engine walks its tree directly.

mod error;
mod eval;
mod exec;
mod frame;
mod inst;
mod item;
mod value;

pub mod builtin;

pub use error::{Bailout, ExcPayload, FatalDiag, FatalError, RunResult};
pub use frame::{BlockAr, ProcAr, ThreadAr};
pub use item::{Address, Item, PropAddr};
pub use value::{ArrayVal, Deleg, EnumVal, ObjectVal, SymbolRef, Value, VarNode, VarRef};

use crate::ast::{Block, CsiId, ProcRef, Program, Spanned, Stat, ENTRY_POINT};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

/// Native handler backing a body-less (builtin) procedure. Reads its bound
/// arguments via [`Run::builtin_arg`] and may set a return Value via
/// [`Run::set_return`].
pub type BuiltinFn = fn(&mut Run<'_>) -> RunResult<()>;

/// One program execution.
pub struct Run<'p> {
    program: &'p Program,
    thread_ar: ThreadAr,
    builtins: HashMap<String, BuiltinFn>,
    /// Per-class static objects, created on first use. The map is the owning
    /// root; there are no file-scope statics anywhere in the engine.
    statics: HashMap<CsiId, VarRef>,
}

impl<'p> Run<'p> {
    pub fn new(program: &'p Program) -> Self {
        let mut builtins = HashMap::new();
        builtin::register_default(&mut builtins);
        Run {
            program,
            thread_ar: ThreadAr::new(),
            builtins,
            statics: HashMap::new(),
        }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// Register (or override) a native handler under a fully-qualified
    /// procedure name such as `"Console.write_line"`.
    pub fn register_builtin(&mut self, fqn: &str, f: BuiltinFn) {
        self.builtins.insert(fqn.to_string(), f);
    }

    /// True once any fatal error or unhandled exception occurred.
    pub fn errored(&self) -> bool {
        self.thread_ar.error
    }

    /// Locate the single static entry procedure and run it. An exception
    /// escaping the entry procedure is promoted to a fatal error.
    pub fn run_program(&mut self) -> RunResult<()> {
        match self.run_entry() {
            Ok(_) => Ok(()),
            Err(Bailout::Exception(p)) => {
                self.thread_ar.error = true;
                let class = self.payload_class_name(&p.value);
                let fatal = FatalError::UnhandledException(class);
                Err(match p.span {
                    Some(span) => fatal.at(span),
                    None => fatal.bail(),
                })
            }
            Err(other) => {
                self.thread_ar.error = true;
                Err(other)
            }
        }
    }

    fn run_entry(&mut self) -> RunResult<Option<Value>> {
        let prog = self.program;
        let mut entry = None;
        for (ci, csi) in prog.csis.iter().enumerate() {
            for (pi, p) in csi.procs.iter().enumerate() {
                if p.name == ENTRY_POINT && p.is_static {
                    if entry.is_some() {
                        return Err(FatalError::AmbiguousEntryPoint(ENTRY_POINT.into()).bail());
                    }
                    entry = Some(ProcRef {
                        csi: CsiId(ci),
                        proc: pi,
                    });
                }
            }
        }
        let entry = entry.ok_or_else(|| FatalError::MissingEntryPoint(ENTRY_POINT.into()).bail())?;
        self.call_proc(None, entry, Vec::new())
    }

    /// Invoke a procedure: create its AR, bind arguments, run the body or
    /// dispatch to the native handler. Catches `return` at the boundary and
    /// yields the parked return Value.
    pub fn call_proc(
        &mut self,
        obj: Option<VarRef>,
        proc: ProcRef,
        args: Vec<Value>,
    ) -> RunResult<Option<Value>> {
        let prog = self.program;
        let def = prog.proc(proc);
        let fqn = prog.proc_fqn(proc);
        trace!(%fqn, args = args.len(), "call");

        let mut ar = ProcAr::new(obj, Some(proc));
        frame::set_args(&mut ar, def, &fqn, args)?;

        self.thread_ar.proc_ars.push(ar);
        let res = match &def.body {
            Some(body) => self.run_block(body),
            None => self.call_builtin(&fqn),
        };
        let res = Self::catch_return(res);
        let mut ar = self
            .thread_ar
            .proc_ars
            .pop()
            .expect("proc AR pushed above");
        self.note_fatal(res)?;
        Ok(ar.retval.take())
    }

    /// Invoke a static procedure by name. Embedder/test convenience.
    pub fn call_named(
        &mut self,
        csi: &str,
        proc: &str,
        args: Vec<Value>,
    ) -> RunResult<Option<Value>> {
        let prog = self.program;
        let csi_id = prog
            .find_csi(csi)
            .ok_or_else(|| FatalError::UndefinedName(csi.to_string()).bail())?;
        let proc_ref = prog
            .find_proc(csi_id, proc)
            .ok_or_else(|| FatalError::UndefinedName(format!("{csi}.{proc}")).bail())?;
        self.call_proc(None, proc_ref, args)
    }

    /// Run an accessor routine (getter/setter body) in a pre-bound AR.
    pub(crate) fn run_routine(&mut self, ar: ProcAr, body: &Block) -> RunResult<Option<Value>> {
        self.thread_ar.proc_ars.push(ar);
        let res = Self::catch_return(self.run_block(body));
        let mut ar = self
            .thread_ar
            .proc_ars
            .pop()
            .expect("routine AR pushed above");
        res?;
        Ok(ar.retval.take())
    }

    /// `return` terminates here; a `break` that made it this far has no
    /// enclosing loop and is misplaced.
    fn catch_return(res: RunResult<()>) -> RunResult<()> {
        match res {
            Err(Bailout::Return) => Ok(()),
            Err(Bailout::Break) => Err(FatalError::MisplacedBreak.bail()),
            other => other,
        }
    }

    fn call_builtin(&mut self, fqn: &str) -> RunResult<()> {
        let f = *self
            .builtins
            .get(fqn)
            .ok_or_else(|| FatalError::MissingBuiltin(fqn.to_string()).bail())?;
        f(self)
    }

    /// Execute one statement in a synthetic interactive frame. Hook for
    /// embedders driving the engine statement by statement.
    pub fn run_stat(&mut self, stat: &Spanned<Stat>) -> RunResult<()> {
        if self.thread_ar.proc_ars.is_empty() {
            self.thread_ar.proc_ars.push(ProcAr::new(None, None));
        }
        let res = self.exec_stat(stat);
        self.note_fatal(res)
    }

    /// Record a fatal bailout in the sticky error flag.
    fn note_fatal<T>(&mut self, res: RunResult<T>) -> RunResult<T> {
        if matches!(res, Err(Bailout::Fatal(_))) {
            self.thread_ar.error = true;
        }
        res
    }

    // Frame accessors used throughout the evaluator.

    pub(crate) fn current_obj(&self) -> Option<VarRef> {
        self.thread_ar.current().and_then(|ar| ar.obj.clone())
    }

    pub(crate) fn current_proc(&self) -> Option<ProcRef> {
        self.thread_ar.current().and_then(|ar| ar.proc)
    }

    pub(crate) fn lookup_local(&self, name: &str) -> Option<VarRef> {
        self.thread_ar.current().and_then(|ar| ar.lookup(name))
    }

    /// Read a bound argument from the current frame. For native handlers.
    pub fn builtin_arg(&self, name: &str) -> RunResult<Value> {
        self.thread_ar
            .current()
            .and_then(|ar| ar.lookup(name))
            .map(|v| Value::read(&v))
            .ok_or_else(|| FatalError::UndefinedName(name.to_string()).bail())
    }

    /// Park a return Value in the current frame. For native handlers.
    pub fn set_return(&mut self, val: Value) {
        if let Some(ar) = self.thread_ar.current_mut() {
            ar.retval = Some(val);
        }
    }

    /// Class name of an exception payload, for diagnostics.
    fn payload_class_name(&self, value: &Value) -> String {
        let Some(target) = value.ref_target() else {
            return format!("<{}>", value.tag());
        };
        let node = target.borrow();
        match &*node {
            VarNode::Object(o) => self.program.csi(o.csi).name.clone(),
            other => format!("<{}>", other.tag()),
        }
    }

    /// The static object of `csi`: one flat container for every static
    /// field across the hierarchy, created on first use.
    pub(crate) fn static_object(&mut self, csi: CsiId) -> VarRef {
        if let Some(v) = self.statics.get(&csi) {
            return Rc::clone(v);
        }
        let prog = self.program;
        let fields = prog
            .collect_fields(csi, true)
            .into_iter()
            .map(|(name, ty)| (name, VarNode::default_for(&ty).into_ref()))
            .collect();
        let var = VarNode::Object(ObjectVal {
            csi,
            is_static: true,
            fields,
        })
        .into_ref();
        self.statics.insert(csi, Rc::clone(&var));
        var
    }
}
