use crate::{
    namespace::{Handle, Namespace},
    object::{Object, ObjectType, Reference, ReferenceTarget, WrappedObject},
    opcode::Opcode,
    operand::Operand,
    AmlError,
    DebugVerbosity,
};
use alloc::vec::Vec;
use log::trace;

/// The services operand resolution needs from the rest of the interpreter.
pub trait ObjectStore {
    /// The type of the object attached to `node`, or `None` if `node` does not refer to a node
    /// in the namespace (e.g. it has been removed).
    fn node_type(&self, node: Handle) -> Option<ObjectType>;

    /// Resolve `operand` in place to the value it stands for, following references to locals,
    /// arguments, package elements and named objects. Operands that are already values are left
    /// alone. On error, `operand` is left unchanged.
    fn resolve_to_value(&mut self, operand: &mut Operand) -> Result<(), AmlError>;

    /// Give up the resolver's handle to a reference object that has been replaced on the stack.
    fn release(&mut self, reference: WrappedObject);

    fn debug_verbosity(&self) -> DebugVerbosity {
        DebugVerbosity::None
    }
}

/// The per-invocation state of the control method being executed.
#[derive(Clone, Debug)]
pub struct MethodContext {
    locals: [Option<WrappedObject>; 8],
    args: [Option<WrappedObject>; 7],
}

impl MethodContext {
    pub fn new() -> MethodContext {
        MethodContext { locals: core::array::from_fn(|_| None), args: core::array::from_fn(|_| None) }
    }

    pub fn with_args(args: Vec<WrappedObject>) -> Result<MethodContext, AmlError> {
        if args.len() > 7 {
            return Err(AmlError::MethodArgCountIncorrect);
        }

        let mut context = MethodContext::new();
        for (slot, arg) in context.args.iter_mut().zip(args) {
            *slot = Some(arg);
        }
        Ok(context)
    }

    pub fn local(&self, local: u8) -> Result<&WrappedObject, AmlError> {
        self.locals
            .get(local as usize)
            .ok_or(AmlError::InvalidLocalAccess(local))?
            .as_ref()
            .ok_or(AmlError::UninitializedLocal(local))
    }

    pub fn set_local(&mut self, local: u8, object: WrappedObject) -> Result<(), AmlError> {
        let slot = self.locals.get_mut(local as usize).ok_or(AmlError::InvalidLocalAccess(local))?;
        *slot = Some(object);
        Ok(())
    }

    pub fn arg(&self, arg: u8) -> Result<&WrappedObject, AmlError> {
        self.args
            .get(arg as usize)
            .ok_or(AmlError::InvalidArgAccess(arg))?
            .as_ref()
            .ok_or(AmlError::UninitializedArg(arg))
    }

    pub fn set_arg(&mut self, arg: u8, object: WrappedObject) -> Result<(), AmlError> {
        let slot = self.args.get_mut(arg as usize).ok_or(AmlError::InvalidArgAccess(arg))?;
        *slot = Some(object);
        Ok(())
    }
}

impl Default for MethodContext {
    fn default() -> Self {
        Self::new()
    }
}

/// An [`ObjectStore`] backed by a [`Namespace`] and the context of the executing method.
pub struct NamespaceStore<'a> {
    namespace: &'a Namespace,
    method: &'a mut MethodContext,
    debug_verbosity: DebugVerbosity,
}

impl<'a> NamespaceStore<'a> {
    pub fn new(
        namespace: &'a Namespace,
        method: &'a mut MethodContext,
        debug_verbosity: DebugVerbosity,
    ) -> NamespaceStore<'a> {
        NamespaceStore { namespace, method, debug_verbosity }
    }

    /// Follow a single level of `reference`. Returns `None` if the reference is already a value
    /// in its own right.
    fn resolve_reference(&self, reference: &Reference) -> Result<Option<Operand>, AmlError> {
        match reference.op {
            Opcode::Zero => Ok(Some(Object::Integer(0).into())),
            Opcode::One => Ok(Some(Object::Integer(1).into())),
            Opcode::Ones => Ok(Some(Object::Integer(u64::MAX).into())),
            Opcode::Debug => Ok(None),

            /*
             * The object held by a local or argument is the value, even if it is itself a
             * reference. Locals and args are not dereferenced any further.
             */
            Opcode::Local(local) => Ok(Some(Operand::Object(self.method.local(local)?.clone()))),
            Opcode::Arg(arg) => Ok(Some(Operand::Object(self.method.arg(arg)?.clone()))),

            Opcode::Name => match reference.target {
                ReferenceTarget::Node(node) => Ok(Some(Operand::Named(node))),
                _ => Err(AmlError::ReferenceWithoutTarget(Opcode::Name)),
            },
            Opcode::Index => match reference.target {
                ReferenceTarget::Element { ref container, index } => {
                    Ok(Some(Operand::Object(Self::resolve_element(container, index)?)))
                }
                _ => Err(AmlError::ReferenceWithoutTarget(Opcode::Index)),
            },

            other => Err(AmlError::IllegalReferenceOpcode(other)),
        }
    }

    fn resolve_element(container: &WrappedObject, index: usize) -> Result<WrappedObject, AmlError> {
        match **container {
            Object::Package(ref elements) => elements
                .get(index)
                .cloned()
                .ok_or(AmlError::IndexOutOfBounds { index, length: elements.len() }),
            Object::Buffer(ref bytes) => bytes
                .get(index)
                .map(|byte| Object::Integer(*byte as u64).wrap())
                .ok_or(AmlError::IndexOutOfBounds { index, length: bytes.len() }),
            Object::String(ref string) => string
                .as_bytes()
                .get(index)
                .map(|byte| Object::Integer(*byte as u64).wrap())
                .ok_or(AmlError::IndexOutOfBounds { index, length: string.len() }),
            ref other => Err(AmlError::InvalidIndexTarget(other.typ())),
        }
    }

    /// Get the value of a named object. Returns `None` for objects that have no value of their
    /// own, which stay as named operands.
    fn resolve_node(&self, node: Handle) -> Result<Option<WrappedObject>, AmlError> {
        let object = self.namespace.get(node).map_err(|_| AmlError::UnknownNode(node))?;
        match **object {
            Object::Device
            | Object::Processor { .. }
            | Object::ThermalZone
            | Object::PowerResource { .. }
            | Object::Method { .. } => Ok(None),
            Object::BufferField { .. } => Ok(Some(object.read_buffer_field()?.wrap())),
            _ => Ok(Some(object.clone())),
        }
    }
}

impl ObjectStore for NamespaceStore<'_> {
    fn node_type(&self, node: Handle) -> Option<ObjectType> {
        self.namespace.node_type(node)
    }

    fn resolve_to_value(&mut self, operand: &mut Operand) -> Result<(), AmlError> {
        let mut resolved = match operand.as_reference() {
            Some(reference) => self.resolve_reference(reference)?,
            None => None,
        };

        let node = match resolved {
            Some(Operand::Named(node)) => Some(node),
            None => match *operand {
                Operand::Named(node) => Some(node),
                Operand::Object(_) => None,
            },
            Some(Operand::Object(_)) => None,
        };
        if let Some(node) = node {
            if let Some(value) = self.resolve_node(node)? {
                resolved = Some(Operand::Object(value));
            }
        }

        if let Some(resolved) = resolved {
            if self.debug_verbosity == DebugVerbosity::All {
                trace!("Resolved {} to {}", operand, resolved);
            }
            *operand = resolved;
        }
        Ok(())
    }

    fn release(&mut self, reference: WrappedObject) {
        if self.debug_verbosity == DebugVerbosity::All {
            trace!("Releasing {} ({} handles left)", *reference, reference.strong_count() - 1);
        }
    }

    fn debug_verbosity(&self) -> DebugVerbosity {
        self.debug_verbosity
    }
}
