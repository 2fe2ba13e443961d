//! Items: the results of expression evaluation.
//!
//! An expression yields either a Value (an rvalue the evaluator owns) or an
//! Address (an lvalue that can be read or written). Addresses come in two
//! flavors: a plain variable address, and a property address that binds a
//! receiver, a property and optional index arguments. Reading a property
//! address runs the getter at most once per evaluation; the result is kept
//! in the address's prefetch cache (`tvalue`) together with the position
//! (`tpos`) addressed inside it, so that sub-field reads of the same address
//! are served from the cache. Writing through a populated cache is a defined
//! fatal condition.

use crate::ast::PropRef;
use crate::interp::error::{FatalError, RunResult};
use crate::interp::frame::ProcAr;
use crate::interp::value::{Value, VarRef};
use crate::interp::Run;
use std::rc::Rc;

#[derive(Debug)]
pub enum Item {
    Value(Value),
    Address(Address),
}

#[derive(Debug)]
pub enum Address {
    /// Directly addressed variable (local, field, array element).
    Var(VarRef),
    /// Property of an object, accessed through its getter/setter.
    Prop(Box<PropAddr>),
}

#[derive(Debug)]
pub struct PropAddr {
    /// Receiver object var.
    pub obj: VarRef,
    pub prop: PropRef,
    /// Index arguments, for the indexer property; empty for named props.
    pub index_args: Vec<Value>,
    /// Getter result, cached on first read.
    pub tvalue: Option<Value>,
    /// Position addressed inside `tvalue` (the whole value, or a sub-field).
    pub tpos: Option<VarRef>,
}

impl PropAddr {
    pub fn new(obj: VarRef, prop: PropRef) -> Self {
        PropAddr {
            obj,
            prop,
            index_args: Vec::new(),
            tvalue: None,
            tpos: None,
        }
    }

    pub fn indexed(obj: VarRef, prop: PropRef, index_args: Vec<Value>) -> Self {
        PropAddr {
            obj,
            prop,
            index_args,
            tvalue: None,
            tpos: None,
        }
    }
}

impl Item {
    pub fn from_value(v: Value) -> Self {
        Item::Value(v)
    }

    pub fn from_var(var: VarRef) -> Self {
        Item::Address(Address::Var(var))
    }
}

impl Run<'_> {
    /// Convert an item to a Value: copy out of an address, clone a Value.
    /// May run a getter for a property address.
    pub(crate) fn item_to_value(&mut self, item: &mut Item) -> RunResult<Value> {
        match item {
            Item::Value(v) => Ok(v.clone()),
            Item::Address(addr) => self.address_read(addr),
        }
    }

    pub(crate) fn address_read(&mut self, addr: &mut Address) -> RunResult<Value> {
        match addr {
            Address::Var(var) => Ok(Value::read(var)),
            Address::Prop(pa) => self.prop_read(pa),
        }
    }

    pub(crate) fn address_write(&mut self, addr: &mut Address, val: Value) -> RunResult<()> {
        match addr {
            Address::Var(var) => {
                val.write_to(var);
                Ok(())
            }
            Address::Prop(pa) => self.prop_write(pa, val),
        }
    }

    /// Read through a property address. The getter runs only if the cache
    /// is empty; afterwards the addressed position is served from it.
    pub(crate) fn prop_read(&mut self, pa: &mut PropAddr) -> RunResult<Value> {
        if let Some(pos) = &pa.tpos {
            return Ok(Value::read(pos));
        }

        let prog = self.program();
        let def = prog.prop(pa.prop);
        let getter = def
            .getter
            .as_ref()
            .ok_or_else(|| FatalError::MissingGetter(def.name.clone()).bail())?;

        let mut ar = ProcAr::new(Some(Rc::clone(&pa.obj)), None);
        for (param, val) in def.params.iter().zip(&pa.index_args) {
            ar.bind(&param.name, val.clone())?;
        }
        let ret = self.run_routine(ar, getter)?;
        let val = ret.ok_or_else(|| FatalError::NoValue.bail())?;

        let pos = Rc::clone(val.var());
        pa.tvalue = Some(val);
        pa.tpos = Some(Rc::clone(&pos));
        Ok(Value::read(&pos))
    }

    fn prop_write(&mut self, pa: &mut PropAddr, val: Value) -> RunResult<()> {
        if pa.tvalue.is_some() {
            return Err(FatalError::UnsupportedPropertyWrite.bail());
        }

        let prog = self.program();
        let def = prog.prop(pa.prop);
        let setter = def
            .setter
            .as_ref()
            .ok_or_else(|| FatalError::MissingSetter(def.name.clone()).bail())?;

        let mut ar = ProcAr::new(Some(Rc::clone(&pa.obj)), None);
        for (param, v) in def.params.iter().zip(&pa.index_args) {
            ar.bind(&param.name, v.clone())?;
        }
        ar.bind(&setter.param, val)?;
        self.run_routine(ar, &setter.body)?;
        Ok(())
    }
}
