//! Builtin procedures and the classes the runtime itself depends on.
//!
//! A builtin procedure is an ordinary [`ProcDef`] without a body; invoking
//! one dispatches to a native handler registered under the fully-qualified
//! name. Handlers read their bound arguments by name from the frame and may
//! park a return Value. [`install`] adds the class definitions the engine
//! needs (error payloads, boxed primitives, the console) to a program whose
//! front end did not already provide them.

use crate::ast::{
    CsiDef, CsiId, CsiKind, FieldDef, Param, ProcDef, Program, Span, TypeRef, BOX_FIELD,
};
use crate::interp::error::RunResult;
use crate::interp::{BuiltinFn, Run};
use std::collections::HashMap;

/// Default native handlers.
pub fn register_default(map: &mut HashMap<String, BuiltinFn>) {
    map.insert("Console.write".into(), console_write as BuiltinFn);
    map.insert("Console.write_line".into(), console_write_line as BuiltinFn);
}

fn console_write(run: &mut Run<'_>) -> RunResult<()> {
    let v = run.builtin_arg("text")?;
    print!("{v}");
    Ok(())
}

fn console_write_line(run: &mut Run<'_>) -> RunResult<()> {
    let v = run.builtin_arg("text")?;
    println!("{v}");
    Ok(())
}

/// Install the builtin classes into `program` and record their ids in
/// [`Program::builtin`]. Does nothing when they are already present.
pub fn install(program: &mut Program) {
    if program.builtin.error_out_of_bounds.is_some() {
        return;
    }

    let error = push_class(program, "Error", None, vec![]);
    program.builtin.error_out_of_bounds =
        Some(push_class(program, "OutOfBounds", Some(error), vec![]));
    program.builtin.error_nil_reference =
        Some(push_class(program, "NilReference", Some(error), vec![]));

    program.builtin.boxed_bool = Some(push_boxed(program, "BoxedBool", TypeRef::Bool));
    program.builtin.boxed_char = Some(push_boxed(program, "BoxedChar", TypeRef::Char));
    program.builtin.boxed_int = Some(push_boxed(program, "BoxedInt", TypeRef::Int));
    program.builtin.boxed_string = Some(push_boxed(program, "BoxedString", TypeRef::String));

    let console = CsiDef {
        name: "Console".into(),
        kind: CsiKind::Class,
        base: None,
        fields: vec![],
        procs: vec![native_proc("write"), native_proc("write_line")],
        props: vec![],
    };
    program.csis.push(console);
}

fn push_class(
    program: &mut Program,
    name: &str,
    base: Option<CsiId>,
    fields: Vec<FieldDef>,
) -> CsiId {
    program.csis.push(CsiDef {
        name: name.into(),
        kind: CsiKind::Class,
        base,
        fields,
        procs: vec![],
        props: vec![],
    });
    CsiId(program.csis.len() - 1)
}

fn push_boxed(program: &mut Program, name: &str, ty: TypeRef) -> CsiId {
    push_class(
        program,
        name,
        None,
        vec![FieldDef {
            name: BOX_FIELD.into(),
            ty,
            is_static: false,
        }],
    )
}

fn native_proc(name: &str) -> ProcDef {
    ProcDef {
        name: name.into(),
        is_static: true,
        params: vec![Param {
            name: "text".into(),
            ty: TypeRef::String,
        }],
        varg: None,
        body: None,
        span: Span::new(0, 0),
    }
}
