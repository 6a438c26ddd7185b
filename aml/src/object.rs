use crate::{namespace::Handle, opcode::Opcode, AmlError};
use alloc::{string::String, sync::Arc, vec::Vec};
use bit_field::BitField;
use core::{fmt, ops};

#[derive(Clone, Debug)]
pub enum Object {
    Uninitialized,
    Integer(u64),
    String(String),
    Buffer(Vec<u8>),
    Package(Vec<WrappedObject>),
    BufferField { buffer: WrappedObject, offset: usize, length: usize },
    Device,
    Event,
    Mutex { sync_level: u8 },
    OpRegion(OpRegion),
    Method { code: Vec<u8>, flags: MethodFlags },
    PowerResource { system_level: u8, resource_order: u16 },
    Processor { proc_id: u8, pblk_address: u32, pblk_length: u8 },
    ThermalZone,
    Debug,
    Reference(Reference),
    /// Pushed by the interpreter when it enters an `If` block, so that a following `Else` can
    /// find out whether its predicate was taken.
    IfContext { predicate: bool },
}

impl Object {
    pub fn wrap(self) -> WrappedObject {
        WrappedObject::new(self)
    }

    /// Returns the `ObjectType` of this object. Unlike the conversion rules, a `Reference` is
    /// reported as a `Reference`, not as the type of the object it refers to.
    pub fn typ(&self) -> ObjectType {
        match self {
            Object::Uninitialized => ObjectType::Uninitialized,
            Object::Integer(_) => ObjectType::Integer,
            Object::String(_) => ObjectType::String,
            Object::Buffer(_) => ObjectType::Buffer,
            Object::Package(_) => ObjectType::Package,
            Object::BufferField { .. } => ObjectType::BufferField,
            Object::Device => ObjectType::Device,
            Object::Event => ObjectType::Event,
            Object::Mutex { .. } => ObjectType::Mutex,
            Object::OpRegion(_) => ObjectType::OpRegion,
            Object::Method { .. } => ObjectType::Method,
            Object::PowerResource { .. } => ObjectType::PowerResource,
            Object::Processor { .. } => ObjectType::Processor,
            Object::ThermalZone => ObjectType::ThermalZone,
            Object::Debug => ObjectType::Debug,
            Object::Reference(_) => ObjectType::Reference,
            Object::IfContext { .. } => ObjectType::IfContext,
        }
    }

    pub fn as_integer(&self) -> Result<u64, AmlError> {
        if let Object::Integer(value) = self {
            Ok(*value)
        } else {
            Err(AmlError::ObjectNotOfExpectedType { expected: ObjectType::Integer, got: self.typ() })
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        if let Object::Reference(reference) = self {
            Some(reference)
        } else {
            None
        }
    }

    /// Read the contents of a `BufferField`. Fields of up to 64 bits are read as an `Integer`,
    /// and longer ones as a `Buffer`. Bits past the end of the underlying buffer read as zero.
    pub fn read_buffer_field(&self) -> Result<Object, AmlError> {
        let Object::BufferField { buffer, offset, length } = self else {
            return Err(AmlError::ObjectNotOfExpectedType { expected: ObjectType::BufferField, got: self.typ() });
        };
        let source = match **buffer {
            Object::Buffer(ref bytes) => bytes.as_slice(),
            Object::String(ref string) => string.as_bytes(),
            ref other => {
                return Err(AmlError::ObjectNotOfExpectedType { expected: ObjectType::Buffer, got: other.typ() })
            }
        };

        if *length <= 64 {
            let mut bytes = [0u8; 8];
            copy_bits(source, *offset, &mut bytes, 0, *length);
            Ok(Object::Integer(u64::from_le_bytes(bytes)))
        } else {
            let mut bytes = alloc::vec![0u8; length.div_ceil(8)];
            copy_bits(source, *offset, &mut bytes, 0, *length);
            Ok(Object::Buffer(bytes))
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Uninitialized => write!(f, "[Uninitialized]"),
            Object::Integer(value) => write!(f, "Integer({value})"),
            Object::String(value) => write!(f, "String({value:?})"),
            Object::Buffer(bytes) => write!(f, "Buffer({bytes:x?})"),
            Object::Package(elements) => write!(f, "Package({} elements)", elements.len()),
            Object::BufferField { offset, length, .. } => {
                write!(f, "BufferField {{ offset: {offset}, length: {length} }}")
            }
            Object::Device => write!(f, "Device"),
            Object::Event => write!(f, "Event"),
            Object::Mutex { sync_level } => write!(f, "Mutex(sync_level = {sync_level})"),
            Object::OpRegion(region) => write!(f, "{region:?}"),
            Object::Method { flags, .. } => write!(f, "Method(args = {})", flags.arg_count()),
            Object::PowerResource { .. } => write!(f, "PowerResource"),
            Object::Processor { proc_id, .. } => write!(f, "Processor({proc_id})"),
            Object::ThermalZone => write!(f, "ThermalZone"),
            Object::Debug => write!(f, "Debug"),
            Object::Reference(reference) => write!(f, "Reference({})", reference.op),
            Object::IfContext { predicate } => write!(f, "IfContext({predicate})"),
        }
    }
}

/// A reference-counted handle to an [`Object`]. Operands and namespace nodes share objects
/// through these.
#[derive(Clone, Debug)]
pub struct WrappedObject(Arc<Object>);

impl WrappedObject {
    pub fn new(object: Object) -> WrappedObject {
        WrappedObject(Arc::new(object))
    }

    /// Whether two `WrappedObject`s are handles to the same object.
    pub fn ptr_eq(&self, other: &WrappedObject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl ops::Deref for WrappedObject {
    type Target = Object;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A deferred indirection, recording which opcode produced it.
#[derive(Clone, Debug)]
pub struct Reference {
    pub op: Opcode,
    pub target: ReferenceTarget,
}

#[derive(Clone, Debug)]
pub enum ReferenceTarget {
    /// The reference doesn't point anywhere else: the producing opcode is enough to resolve it
    /// (e.g. `Local2`, `Ones` or `Debug`).
    None,
    Node(Handle),
    Element { container: WrappedObject, index: usize },
}

impl Reference {
    pub fn new(op: Opcode) -> Reference {
        Reference { op, target: ReferenceTarget::None }
    }

    pub fn to_node(node: Handle) -> Reference {
        Reference { op: Opcode::Name, target: ReferenceTarget::Node(node) }
    }

    pub fn to_element(container: WrappedObject, index: usize) -> Reference {
        Reference { op: Opcode::Index, target: ReferenceTarget::Element { container, index } }
    }

    /// The named object this reference is bound to, if any.
    pub fn node(&self) -> Option<Handle> {
        match self.target {
            ReferenceTarget::Node(node) => Some(node),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OpRegion {
    pub space: RegionSpace,
    pub base: u64,
    pub length: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegionSpace {
    SystemMemory,
    SystemIO,
    PciConfig,
    EmbeddedControl,
    SmBus,
    SystemCmos,
    PciBarTarget,
    Ipmi,
    GeneralPurposeIo,
    GenericSerialBus,
    Pcc,
    Oem(u8),
}

#[derive(Clone, Copy, Debug)]
pub struct MethodFlags(pub u8);

impl MethodFlags {
    pub fn arg_count(&self) -> usize {
        self.0.get_bits(0..3) as usize
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ObjectType {
    Uninitialized,
    Integer,
    String,
    Buffer,
    Package,
    BufferField,
    Device,
    Event,
    Mutex,
    OpRegion,
    Method,
    PowerResource,
    Processor,
    ThermalZone,
    Debug,
    Reference,
    IfContext,
}

/// Copy an arbitrary bit range of `src` to an arbitrary bit range of `dst`. Data is
/// zero-extended if `src` does not cover `length` bits, matching the expected behaviour for buffer
/// fields.
pub(crate) fn copy_bits(
    src: &[u8],
    mut src_index: usize,
    dst: &mut [u8],
    mut dst_index: usize,
    mut length: usize,
) {
    while length > 0 {
        let src_shift = src_index & 7;
        let mut src_bits = src.get(src_index / 8).unwrap_or(&0x00) >> src_shift;
        if src_shift > 0 && length > (8 - src_shift) {
            src_bits |= src.get(src_index / 8 + 1).unwrap_or(&0x00) << (8 - src_shift);
        }

        if length < 8 {
            src_bits &= (1 << length) - 1;
        }

        let dst_shift = dst_index & 7;
        let mut dst_mask: u16 = if length < 8 { ((1 << length) - 1) as u16 } else { 0xff_u16 } << dst_shift;
        dst[dst_index / 8] =
            (dst[dst_index / 8] & !(dst_mask as u8)) | ((src_bits << dst_shift) & (dst_mask as u8));

        if dst_shift > 0 && length > (8 - dst_shift) {
            dst_mask >>= 8;
            dst[dst_index / 8 + 1] &= !(dst_mask as u8);
            dst[dst_index / 8 + 1] |= (src_bits >> (8 - dst_shift)) & (dst_mask as u8);
        }

        if length < 8 {
            length = 0;
        } else {
            length -= 8;
            src_index += 8;
            dst_index += 8;
        }
    }
}
