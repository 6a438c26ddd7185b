use bit_field::BitField;
use core::fmt;

pub const EXT_OPCODE_PREFIX: u8 = 0x5b;
pub const LNOT_OPCODE_PREFIX: u8 = 0x92;

/// An AML opcode. Extended opcodes (those prefixed by `0x5b` in the bytecode) and the composite
/// `LNot*` comparisons (prefixed by `0x92`) are encoded as 16-bit values, with the prefix in the
/// upper byte, e.g. `0x5b23` for `Acquire`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Opcode {
    Zero,
    One,
    Alias,
    Name,
    BytePrefix,
    WordPrefix,
    DWordPrefix,
    StringPrefix,
    QWordPrefix,
    Scope,
    Buffer,
    Package,
    VarPackage,
    Method,
    External,
    Mutex,
    Event,
    CondRefOf,
    CreateField,
    LoadTable,
    Load,
    Stall,
    Sleep,
    Acquire,
    Signal,
    Wait,
    Reset,
    Release,
    FromBCD,
    ToBCD,
    Unload,
    Revision,
    Debug,
    Fatal,
    Timer,
    OpRegion,
    Field,
    Device,
    Processor,
    PowerRes,
    ThermalZone,
    IndexField,
    BankField,
    DataRegion,
    Local(u8),
    Arg(u8),
    Store,
    RefOf,
    Add,
    Concat,
    Subtract,
    Increment,
    Decrement,
    Multiply,
    Divide,
    ShiftLeft,
    ShiftRight,
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Not,
    FindSetLeftBit,
    FindSetRightBit,
    DerefOf,
    ConcatRes,
    Mod,
    Notify,
    SizeOf,
    Index,
    Match,
    CreateDWordField,
    CreateWordField,
    CreateByteField,
    CreateBitField,
    ObjectType,
    CreateQWordField,
    LAnd,
    LOr,
    LNot,
    LNotEqual,
    LLessEqual,
    LGreaterEqual,
    LEqual,
    LGreater,
    LLess,
    ToBuffer,
    ToDecimalString,
    ToHexString,
    ToInteger,
    ToString,
    CopyObject,
    Mid,
    Continue,
    If,
    Else,
    While,
    Noop,
    Return,
    Break,
    Breakpoint,
    Ones,
}

impl Opcode {
    /// Decode a raw opcode value. Returns `None` for values that do not encode an opcode, which
    /// includes name characters, digits, and the name prefixes (`\`, `^`, `.`, `/`).
    pub fn decode(raw: u16) -> Option<Opcode> {
        let opcode = match raw {
            0x00 => Opcode::Zero,
            0x01 => Opcode::One,
            0x06 => Opcode::Alias,
            0x08 => Opcode::Name,
            0x0a => Opcode::BytePrefix,
            0x0b => Opcode::WordPrefix,
            0x0c => Opcode::DWordPrefix,
            0x0d => Opcode::StringPrefix,
            0x0e => Opcode::QWordPrefix,
            0x10 => Opcode::Scope,
            0x11 => Opcode::Buffer,
            0x12 => Opcode::Package,
            0x13 => Opcode::VarPackage,
            0x14 => Opcode::Method,
            0x15 => Opcode::External,
            0x5b01 => Opcode::Mutex,
            0x5b02 => Opcode::Event,
            0x5b12 => Opcode::CondRefOf,
            0x5b13 => Opcode::CreateField,
            0x5b1f => Opcode::LoadTable,
            0x5b20 => Opcode::Load,
            0x5b21 => Opcode::Stall,
            0x5b22 => Opcode::Sleep,
            0x5b23 => Opcode::Acquire,
            0x5b24 => Opcode::Signal,
            0x5b25 => Opcode::Wait,
            0x5b26 => Opcode::Reset,
            0x5b27 => Opcode::Release,
            0x5b28 => Opcode::FromBCD,
            0x5b29 => Opcode::ToBCD,
            0x5b2a => Opcode::Unload,
            0x5b30 => Opcode::Revision,
            0x5b31 => Opcode::Debug,
            0x5b32 => Opcode::Fatal,
            0x5b33 => Opcode::Timer,
            0x5b80 => Opcode::OpRegion,
            0x5b81 => Opcode::Field,
            0x5b82 => Opcode::Device,
            0x5b83 => Opcode::Processor,
            0x5b84 => Opcode::PowerRes,
            0x5b85 => Opcode::ThermalZone,
            0x5b86 => Opcode::IndexField,
            0x5b87 => Opcode::BankField,
            0x5b88 => Opcode::DataRegion,
            0x60..=0x67 => Opcode::Local(raw as u8 - 0x60),
            0x68..=0x6e => Opcode::Arg(raw as u8 - 0x68),
            0x70 => Opcode::Store,
            0x71 => Opcode::RefOf,
            0x72 => Opcode::Add,
            0x73 => Opcode::Concat,
            0x74 => Opcode::Subtract,
            0x75 => Opcode::Increment,
            0x76 => Opcode::Decrement,
            0x77 => Opcode::Multiply,
            0x78 => Opcode::Divide,
            0x79 => Opcode::ShiftLeft,
            0x7a => Opcode::ShiftRight,
            0x7b => Opcode::And,
            0x7c => Opcode::Nand,
            0x7d => Opcode::Or,
            0x7e => Opcode::Nor,
            0x7f => Opcode::Xor,
            0x80 => Opcode::Not,
            0x81 => Opcode::FindSetLeftBit,
            0x82 => Opcode::FindSetRightBit,
            0x83 => Opcode::DerefOf,
            0x84 => Opcode::ConcatRes,
            0x85 => Opcode::Mod,
            0x86 => Opcode::Notify,
            0x87 => Opcode::SizeOf,
            0x88 => Opcode::Index,
            0x89 => Opcode::Match,
            0x8a => Opcode::CreateDWordField,
            0x8b => Opcode::CreateWordField,
            0x8c => Opcode::CreateByteField,
            0x8d => Opcode::CreateBitField,
            0x8e => Opcode::ObjectType,
            0x8f => Opcode::CreateQWordField,
            0x90 => Opcode::LAnd,
            0x91 => Opcode::LOr,
            0x92 => Opcode::LNot,
            /*
             * `0x92` followed by `0x93..=0x95` negates the comparison that follows it. The
             * decoder hands us the pair as a single value.
             */
            0x9293 => Opcode::LNotEqual,
            0x9294 => Opcode::LLessEqual,
            0x9295 => Opcode::LGreaterEqual,
            0x93 => Opcode::LEqual,
            0x94 => Opcode::LGreater,
            0x95 => Opcode::LLess,
            0x96 => Opcode::ToBuffer,
            0x97 => Opcode::ToDecimalString,
            0x98 => Opcode::ToHexString,
            0x99 => Opcode::ToInteger,
            0x9c => Opcode::ToString,
            0x9d => Opcode::CopyObject,
            0x9e => Opcode::Mid,
            0x9f => Opcode::Continue,
            0xa0 => Opcode::If,
            0xa1 => Opcode::Else,
            0xa2 => Opcode::While,
            0xa3 => Opcode::Noop,
            0xa4 => Opcode::Return,
            0xa5 => Opcode::Break,
            0xcc => Opcode::Breakpoint,
            0xff => Opcode::Ones,
            _ => return None,
        };
        Some(opcode)
    }

    pub fn encode(self) -> u16 {
        match self {
            Opcode::Zero => 0x00,
            Opcode::One => 0x01,
            Opcode::Alias => 0x06,
            Opcode::Name => 0x08,
            Opcode::BytePrefix => 0x0a,
            Opcode::WordPrefix => 0x0b,
            Opcode::DWordPrefix => 0x0c,
            Opcode::StringPrefix => 0x0d,
            Opcode::QWordPrefix => 0x0e,
            Opcode::Scope => 0x10,
            Opcode::Buffer => 0x11,
            Opcode::Package => 0x12,
            Opcode::VarPackage => 0x13,
            Opcode::Method => 0x14,
            Opcode::External => 0x15,
            Opcode::Mutex => 0x5b01,
            Opcode::Event => 0x5b02,
            Opcode::CondRefOf => 0x5b12,
            Opcode::CreateField => 0x5b13,
            Opcode::LoadTable => 0x5b1f,
            Opcode::Load => 0x5b20,
            Opcode::Stall => 0x5b21,
            Opcode::Sleep => 0x5b22,
            Opcode::Acquire => 0x5b23,
            Opcode::Signal => 0x5b24,
            Opcode::Wait => 0x5b25,
            Opcode::Reset => 0x5b26,
            Opcode::Release => 0x5b27,
            Opcode::FromBCD => 0x5b28,
            Opcode::ToBCD => 0x5b29,
            Opcode::Unload => 0x5b2a,
            Opcode::Revision => 0x5b30,
            Opcode::Debug => 0x5b31,
            Opcode::Fatal => 0x5b32,
            Opcode::Timer => 0x5b33,
            Opcode::OpRegion => 0x5b80,
            Opcode::Field => 0x5b81,
            Opcode::Device => 0x5b82,
            Opcode::Processor => 0x5b83,
            Opcode::PowerRes => 0x5b84,
            Opcode::ThermalZone => 0x5b85,
            Opcode::IndexField => 0x5b86,
            Opcode::BankField => 0x5b87,
            Opcode::DataRegion => 0x5b88,
            Opcode::Local(local) => 0x60 + local as u16,
            Opcode::Arg(arg) => 0x68 + arg as u16,
            Opcode::Store => 0x70,
            Opcode::RefOf => 0x71,
            Opcode::Add => 0x72,
            Opcode::Concat => 0x73,
            Opcode::Subtract => 0x74,
            Opcode::Increment => 0x75,
            Opcode::Decrement => 0x76,
            Opcode::Multiply => 0x77,
            Opcode::Divide => 0x78,
            Opcode::ShiftLeft => 0x79,
            Opcode::ShiftRight => 0x7a,
            Opcode::And => 0x7b,
            Opcode::Nand => 0x7c,
            Opcode::Or => 0x7d,
            Opcode::Nor => 0x7e,
            Opcode::Xor => 0x7f,
            Opcode::Not => 0x80,
            Opcode::FindSetLeftBit => 0x81,
            Opcode::FindSetRightBit => 0x82,
            Opcode::DerefOf => 0x83,
            Opcode::ConcatRes => 0x84,
            Opcode::Mod => 0x85,
            Opcode::Notify => 0x86,
            Opcode::SizeOf => 0x87,
            Opcode::Index => 0x88,
            Opcode::Match => 0x89,
            Opcode::CreateDWordField => 0x8a,
            Opcode::CreateWordField => 0x8b,
            Opcode::CreateByteField => 0x8c,
            Opcode::CreateBitField => 0x8d,
            Opcode::ObjectType => 0x8e,
            Opcode::CreateQWordField => 0x8f,
            Opcode::LAnd => 0x90,
            Opcode::LOr => 0x91,
            Opcode::LNot => 0x92,
            Opcode::LNotEqual => 0x9293,
            Opcode::LLessEqual => 0x9294,
            Opcode::LGreaterEqual => 0x9295,
            Opcode::LEqual => 0x93,
            Opcode::LGreater => 0x94,
            Opcode::LLess => 0x95,
            Opcode::ToBuffer => 0x96,
            Opcode::ToDecimalString => 0x97,
            Opcode::ToHexString => 0x98,
            Opcode::ToInteger => 0x99,
            Opcode::ToString => 0x9c,
            Opcode::CopyObject => 0x9d,
            Opcode::Mid => 0x9e,
            Opcode::Continue => 0x9f,
            Opcode::If => 0xa0,
            Opcode::Else => 0xa1,
            Opcode::While => 0xa2,
            Opcode::Noop => 0xa3,
            Opcode::Return => 0xa4,
            Opcode::Break => 0xa5,
            Opcode::Breakpoint => 0xcc,
            Opcode::Ones => 0xff,
        }
    }

    /// Whether this opcode is allowed to have produced a `Reference` that reaches operand
    /// resolution. References created by any other opcode (e.g. `RefOf`) are not operands.
    pub fn produces_operand_reference(self) -> bool {
        matches!(
            self,
            Opcode::Zero
                | Opcode::One
                | Opcode::Ones
                | Opcode::Debug
                | Opcode::Name
                | Opcode::Index
                | Opcode::Arg(_)
                | Opcode::Local(_)
        )
    }

    /// Whether this opcode is preceded by a prefix byte in the bytecode.
    pub fn is_prefixed(self) -> bool {
        let prefix = self.encode().get_bits(8..16) as u8;
        prefix == EXT_OPCODE_PREFIX || prefix == LNOT_OPCODE_PREFIX
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_prefixed() {
            write!(f, "{:?}({:#06x})", self, self.encode())
        } else {
            write!(f, "{:?}({:#04x})", self, self.encode())
        }
    }
}
