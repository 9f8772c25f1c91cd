//! The decoded instruction model.
//!
//! An [`Instruction`] is one decoded JVM bytecode operation inside a specific method. Its
//! identity is the triple `(class name, method name, index)` - equality and hashing use
//! only that triple, never the payload, so two references to the same position in the same
//! method always compare equal even if one was decoded with richer metadata.
//!
//! The [`Payload`] enum carries the decoded operand of the instruction where one exists:
//! local slots, constants, field and method references, jump targets, switch tables. All
//! branch and switch targets are *instruction indices*, not bytecode offsets - resolving
//! offsets to indices is the decoder's job, which is outside this crate.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::bytecode::descriptor::MethodDescriptor;
use crate::bytecode::opcode::{self, OpcodeCategory};
use crate::Result;

/// A symbolic reference to a field (`getfield Foo.bar : I`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Internal name of the declaring class, e.g. `com/example/Foo`.
    pub owner: String,
    /// Field name.
    pub name: String,
    /// Field type descriptor, e.g. `I` or `Ljava/lang/String;`.
    pub descriptor: String,
}

impl FieldRef {
    /// Creates a field reference.
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        FieldRef {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

/// A symbolic reference to an invoked method, with its descriptor pre-parsed.
///
/// The parsed descriptor is what the arity table and the frame simulator consult for
/// argument counts and return-value presence, so parsing happens once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    /// Internal name of the declaring class.
    pub owner: String,
    /// Method name.
    pub name: String,
    /// Parsed method descriptor.
    pub descriptor: MethodDescriptor,
}

impl MethodRef {
    /// Creates a method reference, parsing the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] when the descriptor string is invalid.
    pub fn new(owner: impl Into<String>, name: impl Into<String>, descriptor: &str) -> Result<Self> {
        Ok(MethodRef {
            owner: owner.into(),
            name: name.into(),
            descriptor: MethodDescriptor::parse(descriptor)?,
        })
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

/// A constant pushed by `ldc`/`ldc2_w` or the short constant forms.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// `aconst_null`.
    Null,
    /// `iconst_*`, `bipush`, `sipush`, or an int `ldc`.
    Int(i32),
    /// `lconst_*` or a long `ldc2_w`.
    Long(i64),
    /// `fconst_*` or a float `ldc`.
    Float(f32),
    /// `dconst_*` or a double `ldc2_w`.
    Double(f64),
    /// A string `ldc`.
    String(String),
    /// A class-literal `ldc` carrying the internal class name.
    Class(String),
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Null => f.write_str("null"),
            ConstValue::Int(v) => write!(f, "{}", v),
            ConstValue::Long(v) => write!(f, "{}L", v),
            ConstValue::Float(v) => write!(f, "{}f", v),
            ConstValue::Double(v) => write!(f, "{}d", v),
            ConstValue::String(v) => write!(f, "{:?}", v),
            ConstValue::Class(v) => write!(f, "{}.class", v),
        }
    }
}

/// Decoded `tableswitch`/`lookupswitch` targets, as instruction indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchTable {
    /// `(case key, target index)` pairs in decoded order.
    pub cases: Vec<(i32, u32)>,
    /// Target index of the default branch.
    pub default: u32,
}

/// The decoded operand of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No operand.
    None,
    /// Explicit local-variable index (`iload 4`, `astore 2`, `ret 1`).
    Local {
        /// Local slot index.
        slot: u16,
    },
    /// `iinc` slot and increment.
    Iinc {
        /// Local slot index.
        slot: u16,
        /// Signed increment.
        increment: i16,
    },
    /// Constant operand of the push family.
    Const(ConstValue),
    /// Field reference of a `get*`/`put*`.
    Field(FieldRef),
    /// Method reference of an invocation.
    Method(MethodRef),
    /// Type operand of `new`, `anewarray`, `checkcast`, `instanceof`, `newarray`.
    Type(String),
    /// Branch target of a jump, as an instruction index.
    Jump {
        /// Target instruction index.
        target: u32,
    },
    /// Decoded switch targets.
    Switch(SwitchTable),
    /// `multianewarray` operand.
    MultiArray {
        /// Array type descriptor.
        descriptor: String,
        /// Number of dimension lengths popped from the stack.
        dimensions: u8,
    },
}

/// One decoded bytecode instruction inside a specific method.
///
/// # Identity
///
/// `PartialEq`, `Eq`, and `Hash` consider only `(class_name, method_name, index)`. The
/// payload, offset, and line number are attributes, not identity.
#[derive(Debug, Clone)]
pub struct Instruction {
    class_name: Arc<str>,
    method_name: Arc<str>,
    index: u32,
    offset: u32,
    opcode: u8,
    payload: Payload,
    line: Option<u32>,
}

impl Instruction {
    /// Creates an instruction.
    ///
    /// `index` is the position within the method's instruction sequence; `offset` the
    /// original bytecode offset (kept for display only).
    #[must_use]
    pub fn new(
        class_name: impl Into<Arc<str>>,
        method_name: impl Into<Arc<str>>,
        index: u32,
        offset: u32,
        opcode: u8,
        payload: Payload,
    ) -> Self {
        Instruction {
            class_name: class_name.into(),
            method_name: method_name.into(),
            index,
            offset,
            opcode,
            payload,
            line: None,
        }
    }

    /// Attaches a source line number.
    #[must_use]
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// Internal name of the class declaring the enclosing method.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Name of the enclosing method.
    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Position within the method's instruction sequence.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Original bytecode offset.
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// The opcode byte.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// The decoded operand.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Source line, when debug information was available.
    #[must_use]
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// Behavioral category of the opcode.
    #[must_use]
    pub fn category(&self) -> OpcodeCategory {
        opcode::category(self.opcode)
    }

    /// JVM mnemonic of the opcode.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        opcode::mnemonic(self.opcode)
    }

    /// `true` for conditional jumps (`if*`, `if_icmp*`, `if_acmp*`, `ifnull`, `ifnonnull`).
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(self.category(), OpcodeCategory::If | OpcodeCategory::IfCmp)
    }

    /// `true` for `goto`/`goto_w`.
    #[must_use]
    pub fn is_goto(&self) -> bool {
        self.category() == OpcodeCategory::Goto
    }

    /// `true` for `tableswitch`/`lookupswitch`.
    #[must_use]
    pub fn is_switch(&self) -> bool {
        self.category() == OpcodeCategory::Switch
    }

    /// `true` for the six return opcodes.
    #[must_use]
    pub fn is_return(&self) -> bool {
        self.category() == OpcodeCategory::Return
    }

    /// `true` for `athrow`.
    #[must_use]
    pub fn is_throw(&self) -> bool {
        self.category() == OpcodeCategory::Throw
    }

    /// `true` when this instruction never falls through to its successor.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        matches!(
            self.category(),
            OpcodeCategory::Goto
                | OpcodeCategory::Return
                | OpcodeCategory::Throw
                | OpcodeCategory::Switch
                | OpcodeCategory::Ret
        )
    }

    /// `true` for the five invocation opcodes.
    #[must_use]
    pub fn is_invoke(&self) -> bool {
        self.category() == OpcodeCategory::Invoke
    }

    /// `true` for invocations that take no receiver from the stack.
    #[must_use]
    pub fn is_receiverless_invoke(&self) -> bool {
        matches!(self.opcode, opcode::INVOKESTATIC | opcode::INVOKEDYNAMIC)
    }

    /// `true` for `getstatic`, `putstatic`, `getfield`, `putfield`.
    #[must_use]
    pub fn is_field_access(&self) -> bool {
        self.category() == OpcodeCategory::FieldAccess
    }

    /// `true` for `getstatic`/`getfield`.
    #[must_use]
    pub fn is_field_read(&self) -> bool {
        matches!(self.opcode, opcode::GETSTATIC | opcode::GETFIELD)
    }

    /// `true` for local-variable loads, explicit or short form.
    #[must_use]
    pub fn is_local_load(&self) -> bool {
        self.category() == OpcodeCategory::Load
    }

    /// `true` for local-variable stores, explicit or short form.
    #[must_use]
    pub fn is_local_store(&self) -> bool {
        self.category() == OpcodeCategory::Store
    }

    /// `true` for the constant-push family.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.category() == OpcodeCategory::Constant
    }

    /// The local slot this instruction reads or writes, decoding the short `_n` forms.
    ///
    /// Covers loads, stores, `iinc`, and `ret`; `None` for everything else.
    #[must_use]
    pub fn local_slot(&self) -> Option<u16> {
        match self.payload {
            Payload::Local { slot } | Payload::Iinc { slot, .. } => return Some(slot),
            Payload::None => {}
            _ => return None,
        }
        match self.opcode {
            opcode::ILOAD_0..=opcode::ALOAD_3 => Some(u16::from((self.opcode - opcode::ILOAD_0) % 4)),
            opcode::ISTORE_0..=opcode::ASTORE_3 => Some(u16::from((self.opcode - opcode::ISTORE_0) % 4)),
            _ => None,
        }
    }

    /// Human-readable operation summary, mnemonic plus payload.
    #[must_use]
    pub fn explain(&self) -> String {
        match &self.payload {
            Payload::None => match self.local_slot() {
                Some(slot) => format!("{} {}", self.mnemonic(), slot),
                None => self.mnemonic().to_string(),
            },
            Payload::Local { slot } => format!("{} {}", self.mnemonic(), slot),
            Payload::Iinc { slot, increment } => format!("iinc {} {:+}", slot, increment),
            Payload::Const(value) => format!("{} {}", self.mnemonic(), value),
            Payload::Field(field) => format!("{} {}", self.mnemonic(), field),
            Payload::Method(method) => format!("{} {}", self.mnemonic(), method),
            Payload::Type(name) => format!("{} {}", self.mnemonic(), name),
            Payload::Jump { target } => format!("{} -> I{}", self.mnemonic(), target),
            Payload::Switch(table) => {
                format!("{} [{} cases, default -> I{}]", self.mnemonic(), table.cases.len(), table.default)
            }
            Payload::MultiArray { descriptor, dimensions } => {
                format!("multianewarray {} dims={}", descriptor, dimensions)
            }
        }
    }
}

impl PartialEq for Instruction {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.class_name == other.class_name
            && self.method_name == other.method_name
    }
}

impl Eq for Instruction {}

impl Hash for Instruction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class_name.hash(state);
        self.method_name.hash(state);
        self.index.hash(state);
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{} ({}) {}", self.index, self.offset, self.explain())?;
        if let Some(line) = self.line {
            write!(f, " l{}", line)?;
        }
        Ok(())
    }
}
