use crate::{
    namespace::Handle,
    object::{Object, Reference, WrappedObject},
};
use alloc::vec::Vec;
use core::{fmt, iter::Rev, slice};

/// An entry on the operand stack: either a direct handle to a named object in the namespace, or
/// an object produced while evaluating the opcode's arguments.
#[derive(Clone, Debug)]
pub enum Operand {
    Named(Handle),
    Object(WrappedObject),
}

impl Operand {
    pub fn object(&self) -> Option<&WrappedObject> {
        match self {
            Operand::Object(object) => Some(object),
            Operand::Named(_) => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        self.object().and_then(|object| object.as_reference())
    }
}

impl From<Object> for Operand {
    fn from(object: Object) -> Self {
        Operand::Object(object.wrap())
    }
}

impl From<WrappedObject> for Operand {
    fn from(object: WrappedObject) -> Self {
        Operand::Object(object)
    }
}

impl From<Handle> for Operand {
    fn from(node: Handle) -> Self {
        Operand::Named(node)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Named(node) => write!(f, "Named({node:?})"),
            Operand::Object(object) => write!(f, "{}", **object),
        }
    }
}

/// The operands of the opcode being executed. The last slot is the top of the stack, and holds
/// the operand that was evaluated (and pushed) last. A slot can be empty if the interpreter has
/// not filled it, which operand resolution treats as an internal error.
#[derive(Clone, Debug, Default)]
pub struct OperandStack {
    slots: Vec<Option<Operand>>,
}

impl OperandStack {
    pub fn new() -> OperandStack {
        OperandStack { slots: Vec::new() }
    }

    pub fn from_slots(slots: Vec<Option<Operand>>) -> OperandStack {
        OperandStack { slots }
    }

    pub fn push(&mut self, operand: impl Into<Operand>) {
        self.slots.push(Some(operand.into()));
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Get the slot `depth` entries below the top of the stack. The top is at depth `0`.
    pub fn get(&self, depth: usize) -> Option<&Operand> {
        self.slots.iter().rev().nth(depth)?.as_ref()
    }

    /// Walk the slots from the top of the stack downwards.
    pub fn top_down_mut(&mut self) -> Rev<slice::IterMut<'_, Option<Operand>>> {
        self.slots.iter_mut().rev()
    }
}
