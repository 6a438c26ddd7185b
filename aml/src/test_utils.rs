use crate::{
    namespace::{AmlName, Handle, Namespace},
    object::{Object, ObjectType, ReferenceTarget, WrappedObject},
    opcode::Opcode,
    operand::{Operand, OperandStack},
    store::ObjectStore,
    AmlError,
    DebugVerbosity,
};
use alloc::vec::Vec;
use core::str::FromStr;
use log::{Log, Metadata, Record};
use std::println;

pub(crate) struct TestLogger;

static LOGGER: TestLogger = TestLogger;

impl TestLogger {
    /// Install the logger. Tests run in parallel, so every test that wants output calls this and
    /// all but the first call lose the race to install it.
    pub(crate) fn init() {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Trace);
    }
}

impl Log for TestLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        println!("[{:<5}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

/// A minimal object store. It resolves just enough kinds of reference to exercise the resolver,
/// and records every call the resolver makes into it.
pub(crate) struct FakeStore {
    pub namespace: Namespace,
    pub locals: [Option<WrappedObject>; 8],
    pub released: Vec<WrappedObject>,
    pub resolutions: usize,
}

impl FakeStore {
    pub(crate) fn new() -> FakeStore {
        TestLogger::init();
        FakeStore { namespace: Namespace::new(), locals: Default::default(), released: Vec::new(), resolutions: 0 }
    }

    pub(crate) fn add_node(&mut self, path: &str, object: Object) -> Handle {
        self.namespace.insert(AmlName::from_str(path).unwrap(), object.wrap()).unwrap()
    }
}

impl ObjectStore for FakeStore {
    fn node_type(&self, node: Handle) -> Option<ObjectType> {
        self.namespace.node_type(node)
    }

    fn resolve_to_value(&mut self, operand: &mut Operand) -> Result<(), AmlError> {
        self.resolutions += 1;

        let Some(reference) = operand.as_reference() else {
            return Ok(());
        };
        let resolved = match (reference.op, &reference.target) {
            (Opcode::Zero, _) => Operand::from(Object::Integer(0)),
            (Opcode::Debug, _) => return Ok(()),
            (Opcode::Local(n), _) => {
                Operand::Object(self.locals[n as usize].clone().ok_or(AmlError::UninitializedLocal(n))?)
            }
            (Opcode::Name, ReferenceTarget::Node(node)) => Operand::Named(*node),
            (op, _) => return Err(AmlError::ReferenceWithoutTarget(op)),
        };
        *operand = resolved;
        Ok(())
    }

    fn release(&mut self, reference: WrappedObject) {
        self.released.push(reference);
    }

    fn debug_verbosity(&self) -> DebugVerbosity {
        DebugVerbosity::All
    }
}

pub(crate) fn stack_of(operands: impl IntoIterator<Item = Operand>) -> OperandStack {
    OperandStack::from_slots(operands.into_iter().map(Some).collect())
}

/// Whether two operands are the same operand: the same node, or a handle to the same object.
pub(crate) fn same_operand(a: &Operand, b: &Operand) -> bool {
    match (a, b) {
        (Operand::Named(a), Operand::Named(b)) => a == b,
        (Operand::Object(a), Operand::Object(b)) => a.ptr_eq(b),
        _ => false,
    }
}
