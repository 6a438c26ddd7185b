//! The runtime-argument table. For each opcode, this records the kinds of operand its semantic
//! action expects to find on the operand stack once all of its arguments have been evaluated.

use crate::opcode::Opcode;
use core::slice;

/// The kind of operand an opcode requires in a given argument position.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ArgKind {
    /// A reference to an object (a `SuperName`), e.g. the operand of `Increment`.
    Reference,
    /// The target an opcode stores its result into.
    TargetRef,
    Number,
    /// A `String`, or a `Buffer`, which is accepted wherever a string is.
    String,
    Buffer,
    Mutex,
    Event,
    Region,
    Package,
    /// Any object, resolved to its value.
    AnyType,
    /// An object with a meaningful size: a `Buffer`, `String`, `Package`, or a reference to a
    /// named object. Only used by `SizeOf`.
    DataObject,
    /// An object that can be indexed into: a `Buffer` or `Package`.
    ComplexObject,
    /// The predicate context left on the stack by an `If`.
    ConditionalExpr,
}

/// No opcode takes more operands than this.
pub const MAX_ARGS: usize = 6;

/// An ordered list of the operand kinds an opcode requires. Kinds are stored in the order the
/// operands appear in the bytecode, which means the last kind describes the operand on the top of
/// the stack.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ArgList {
    kinds: [ArgKind; MAX_ARGS],
    len: u8,
}

impl ArgList {
    pub const NONE: ArgList = ArgList::new(&[]);

    pub const fn new(kinds: &[ArgKind]) -> ArgList {
        assert!(kinds.len() <= MAX_ARGS);

        let mut list = [ArgKind::AnyType; MAX_ARGS];
        let mut i = 0;
        while i < kinds.len() {
            list[i] = kinds[i];
            i += 1;
        }
        ArgList { kinds: list, len: kinds.len() as u8 }
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[ArgKind] {
        &self.kinds[..self.len()]
    }

    /// Iterate the kinds in the order operands are resolved in: the operand on the top of the
    /// stack (the last one pushed) comes first.
    pub fn resolution_order(&self) -> core::iter::Copied<core::iter::Rev<slice::Iter<'_, ArgKind>>> {
        self.as_slice().iter().rev().copied()
    }
}

impl core::fmt::Debug for ArgList {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct OpInfo {
    pub opcode: Opcode,
    /// The operands this opcode requires at execution time. `None` if the opcode never reaches
    /// operand resolution (e.g. it defines a namespace object, and is handled entirely by the
    /// parser).
    pub runtime_args: Option<ArgList>,
}

/// Look up the runtime information for a raw opcode value. Returns `None` if the value does not
/// encode an opcode.
pub fn lookup_opcode_info(raw: u16) -> Option<OpInfo> {
    let opcode = Opcode::decode(raw)?;
    Some(OpInfo { opcode, runtime_args: runtime_args(opcode) })
}

macro_rules! args {
    ($($kind:ident),*) => {{
        const ARGS: ArgList = ArgList::new(&[$(ArgKind::$kind),*]);
        Some(ARGS)
    }};
}

fn runtime_args(opcode: Opcode) -> Option<ArgList> {
    match opcode {
        Opcode::Zero | Opcode::One | Opcode::Ones => args![],
        Opcode::Revision | Opcode::Debug | Opcode::Timer => args![],
        Opcode::Local(_) | Opcode::Arg(_) => args![],
        Opcode::Noop | Opcode::Break | Opcode::Breakpoint | Opcode::Continue => args![],
        Opcode::If | Opcode::While => args![],

        Opcode::Alias
        | Opcode::Name
        | Opcode::BytePrefix
        | Opcode::WordPrefix
        | Opcode::DWordPrefix
        | Opcode::StringPrefix
        | Opcode::QWordPrefix
        | Opcode::Scope
        | Opcode::Buffer
        | Opcode::Package
        | Opcode::VarPackage
        | Opcode::Method
        | Opcode::External
        | Opcode::Mutex
        | Opcode::Event
        | Opcode::OpRegion
        | Opcode::Field
        | Opcode::Device
        | Opcode::Processor
        | Opcode::PowerRes
        | Opcode::ThermalZone
        | Opcode::IndexField
        | Opcode::BankField => None,

        /*
         * These are decoded by the parser as an `LNot` applied to the result of the inner
         * comparison, so never execute as a single opcode.
         */
        Opcode::LNotEqual | Opcode::LLessEqual | Opcode::LGreaterEqual => None,

        Opcode::Store => args![AnyType, TargetRef],
        Opcode::CopyObject => args![AnyType, TargetRef],
        Opcode::RefOf | Opcode::DerefOf => args![Reference],
        Opcode::CondRefOf => args![Reference, TargetRef],
        Opcode::Increment | Opcode::Decrement => args![Reference],

        Opcode::Add
        | Opcode::Subtract
        | Opcode::Multiply
        | Opcode::ShiftLeft
        | Opcode::ShiftRight
        | Opcode::And
        | Opcode::Nand
        | Opcode::Or
        | Opcode::Nor
        | Opcode::Xor
        | Opcode::Mod => args![Number, Number, TargetRef],
        Opcode::Divide => args![Number, Number, TargetRef, TargetRef],
        Opcode::Not | Opcode::FindSetLeftBit | Opcode::FindSetRightBit => args![Number, TargetRef],
        Opcode::FromBCD | Opcode::ToBCD => args![Number, TargetRef],

        Opcode::Concat => args![String, String, TargetRef],
        Opcode::ConcatRes => args![Buffer, Buffer, TargetRef],
        Opcode::Mid => args![String, Number, Number, TargetRef],
        Opcode::ToBuffer | Opcode::ToDecimalString | Opcode::ToHexString | Opcode::ToInteger => {
            args![AnyType, TargetRef]
        }
        Opcode::ToString => args![Buffer, Number, TargetRef],

        Opcode::LAnd | Opcode::LOr | Opcode::LEqual | Opcode::LGreater | Opcode::LLess => args![Number, Number],
        Opcode::LNot => args![Number],

        Opcode::SizeOf => args![DataObject],
        Opcode::Index => args![ComplexObject, Number, TargetRef],
        Opcode::Match => args![Package, Number, Number, Number, Number, Number],
        Opcode::ObjectType => args![AnyType],

        Opcode::CreateBitField
        | Opcode::CreateByteField
        | Opcode::CreateWordField
        | Opcode::CreateDWordField
        | Opcode::CreateQWordField => args![Buffer, Number, Reference],
        Opcode::CreateField => args![Buffer, Number, Number, Reference],
        Opcode::DataRegion => args![String, String, String],

        Opcode::Notify => args![Reference, Number],
        Opcode::Stall | Opcode::Sleep => args![Number],
        Opcode::Acquire => args![Mutex, Number],
        Opcode::Release => args![Mutex],
        Opcode::Signal | Opcode::Reset => args![Event],
        Opcode::Wait => args![Event, Number],
        Opcode::Fatal => args![Number, Number, Number],

        Opcode::Load => args![Region, TargetRef],
        Opcode::LoadTable => args![String, String, String, String, String, AnyType],
        Opcode::Unload => args![Reference],

        Opcode::Else => args![ConditionalExpr],
        Opcode::Return => args![AnyType],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn unknown_opcodes() {
        assert_eq!(lookup_opcode_info(0x41), None);
        assert_eq!(lookup_opcode_info(0x5bff), None);
    }

    #[test]
    fn definition_opcodes_have_no_runtime_args() {
        assert_eq!(lookup_opcode_info(0x10).unwrap().runtime_args, None);
        assert_eq!(lookup_opcode_info(0x5b82).unwrap().runtime_args, None);
        assert_eq!(lookup_opcode_info(0x9293).unwrap().runtime_args, None);
    }

    #[test]
    fn store_resolves_target_first() {
        let info = lookup_opcode_info(0x70).unwrap();
        assert_eq!(info.opcode, Opcode::Store);

        let args = info.runtime_args.unwrap();
        assert_eq!(args.as_slice(), &[ArgKind::AnyType, ArgKind::TargetRef]);
        assert_eq!(args.resolution_order().collect::<Vec<_>>(), [ArgKind::TargetRef, ArgKind::AnyType]);
    }

    #[test]
    fn longest_lists_fit() {
        assert_eq!(runtime_args(Opcode::Match).unwrap().len(), MAX_ARGS);
        assert_eq!(runtime_args(Opcode::LoadTable).unwrap().len(), MAX_ARGS);
    }

    #[test]
    fn constants_take_no_operands() {
        for opcode in [Opcode::Zero, Opcode::Ones, Opcode::Local(4), Opcode::Arg(0), Opcode::Noop] {
            assert!(runtime_args(opcode).unwrap().is_empty());
        }
        assert_eq!(ArgList::NONE, ArgList::new(&[]));
    }
}
