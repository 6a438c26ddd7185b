//! Operand resolution for an AML interpreter.
//!
//! Before the interpreter executes an opcode, it evaluates each of the opcode's arguments and
//! pushes the results onto an operand stack. Those results are not always usable directly: they
//! may be references to locals or arguments, references to named objects, elements of a package,
//! or handles to objects in the namespace. [`resolve_operands`] walks the opcode's runtime
//! argument list against the stack, checks each operand has (or can be resolved to) the kind the
//! opcode's semantic action requires, and replaces it in place with the resolved operand.
//!
//! Resolution does not roll back on failure: if the third operand of an opcode cannot be
//! resolved, the first two are left in their resolved state. The interpreter is expected to
//! abandon the current method when resolution fails, at which point the state of the stack no
//! longer matters.

#![no_std]

#[cfg(test)]
extern crate std;

extern crate alloc;

pub mod namespace;
pub mod object;
pub mod op_info;
pub mod opcode;
pub mod operand;
pub mod resolve;
pub mod store;

#[cfg(test)]
mod test_utils;

pub use namespace::{AmlName, Handle, Namespace};
pub use object::{Object, ObjectType, Reference, ReferenceTarget, WrappedObject};
pub use op_info::{lookup_opcode_info, ArgKind, ArgList, OpInfo};
pub use opcode::Opcode;
pub use operand::{Operand, OperandStack};
pub use resolve::resolve_operands;
pub use store::{MethodContext, NamespaceStore, ObjectStore};

use spinning_top::Spinlock;

pub struct Interpreter {
    pub namespace: Spinlock<Namespace>,
    debug_verbosity: DebugVerbosity,
}

impl Interpreter {
    pub fn new(debug_verbosity: DebugVerbosity) -> Interpreter {
        Interpreter { namespace: Spinlock::new(Namespace::new()), debug_verbosity }
    }

    pub fn with_namespace(namespace: Namespace, debug_verbosity: DebugVerbosity) -> Interpreter {
        Interpreter { namespace: Spinlock::new(namespace), debug_verbosity }
    }

    pub fn debug_verbosity(&self) -> DebugVerbosity {
        self.debug_verbosity
    }

    /// Resolve the operands of `opcode` in the context of the executing `method`. The namespace
    /// is locked for the duration of the resolution.
    pub fn resolve_operands(
        &self,
        method: &mut MethodContext,
        opcode: u16,
        stack: &mut OperandStack,
    ) -> Result<(), AmlError> {
        let namespace = self.namespace.lock();
        let mut store = NamespaceStore::new(&namespace, method, self.debug_verbosity);
        resolve_operands(&mut store, opcode, stack)
    }
}

/// Controls how much of operand resolution is logged, through the `log` facade.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub enum DebugVerbosity {
    /// Log nothing.
    #[default]
    None,
    /// Log operands that fail to resolve.
    Failures,
    /// Log every operand as it is resolved.
    All,
}

/// Broad classification of an [`AmlError`], used to decide how the interpreter should react to
/// it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    /// The opcode has no entry in the opcode table.
    BadOpcode,
    /// The interpreter's own state is inconsistent (e.g. the operand stack is shorter than the
    /// opcode requires). Indicates a bug in the interpreter, not in the AML.
    Internal,
    /// An operand is not, and cannot be converted to, the type the opcode requires. Indicates
    /// malformed or buggy AML.
    OperandType,
    Other,
}

#[derive(Clone, PartialEq, Debug)]
pub enum AmlError {
    BadOpcode(u16),

    NoRuntimeArgs(Opcode),
    OperandStackUnderflow { required: usize, available: usize },
    EmptyStackSlot(usize),
    ReferenceWithoutTarget(Opcode),

    UnknownNode(Handle),
    IllegalReferenceOpcode(Opcode),
    OperandTypeMismatch { required: ArgKind, got: ObjectType },
    /// A `SizeOf` operand resolved to a reference that is not bound to a named object.
    UnboundReference,

    ObjectNotOfExpectedType { expected: ObjectType, got: ObjectType },
    UninitializedLocal(u8),
    UninitializedArg(u8),
    InvalidLocalAccess(u8),
    InvalidArgAccess(u8),
    MethodArgCountIncorrect,
    IndexOutOfBounds { index: usize, length: usize },
    InvalidIndexTarget(ObjectType),

    InvalidNameSeg([u8; 4]),
    InvalidNormalizedName(AmlName),
    NameNotAbsolute(AmlName),
    EmptyNamesAreInvalid,
    ObjectDoesNotExist(AmlName),
    InvalidHandle(Handle),
}

impl AmlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AmlError::BadOpcode(_) => ErrorKind::BadOpcode,

            AmlError::NoRuntimeArgs(_)
            | AmlError::OperandStackUnderflow { .. }
            | AmlError::EmptyStackSlot(_)
            | AmlError::ReferenceWithoutTarget(_) => ErrorKind::Internal,

            AmlError::UnknownNode(_)
            | AmlError::IllegalReferenceOpcode(_)
            | AmlError::OperandTypeMismatch { .. }
            | AmlError::UnboundReference => ErrorKind::OperandType,

            _ => ErrorKind::Other,
        }
    }
}
