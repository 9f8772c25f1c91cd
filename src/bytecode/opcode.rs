//! JVM opcode constants and the static opcode descriptor table.
//!
//! Every opcode byte maps to an [`OpcodeInfo`] entry carrying its mnemonic and its
//! [`OpcodeCategory`]. The category is what the rest of the engine dispatches on: the frame
//! simulator, the arity table, and the CFG builder all branch on categories (and on the raw
//! byte for the few opcodes that need individual treatment, such as the `dup` family).
//!
//! Reserved and future opcode bytes resolve to the [`OpcodeCategory::Unknown`] entry instead
//! of failing, so a method containing an unrecognized byte degrades gracefully rather than
//! aborting the whole analysis.

// The opcode constants are their own documentation.
#![allow(missing_docs)]

use strum::Display;

// Constants
pub const NOP: u8 = 0x00;
pub const ACONST_NULL: u8 = 0x01;
pub const ICONST_M1: u8 = 0x02;
pub const ICONST_0: u8 = 0x03;
pub const ICONST_1: u8 = 0x04;
pub const ICONST_2: u8 = 0x05;
pub const ICONST_3: u8 = 0x06;
pub const ICONST_4: u8 = 0x07;
pub const ICONST_5: u8 = 0x08;
pub const LCONST_0: u8 = 0x09;
pub const LCONST_1: u8 = 0x0a;
pub const FCONST_0: u8 = 0x0b;
pub const FCONST_1: u8 = 0x0c;
pub const FCONST_2: u8 = 0x0d;
pub const DCONST_0: u8 = 0x0e;
pub const DCONST_1: u8 = 0x0f;
pub const BIPUSH: u8 = 0x10;
pub const SIPUSH: u8 = 0x11;
pub const LDC: u8 = 0x12;
pub const LDC_W: u8 = 0x13;
pub const LDC2_W: u8 = 0x14;

// Loads
pub const ILOAD: u8 = 0x15;
pub const LLOAD: u8 = 0x16;
pub const FLOAD: u8 = 0x17;
pub const DLOAD: u8 = 0x18;
pub const ALOAD: u8 = 0x19;
pub const ILOAD_0: u8 = 0x1a;
pub const ILOAD_1: u8 = 0x1b;
pub const ILOAD_2: u8 = 0x1c;
pub const ILOAD_3: u8 = 0x1d;
pub const LLOAD_0: u8 = 0x1e;
pub const LLOAD_1: u8 = 0x1f;
pub const LLOAD_2: u8 = 0x20;
pub const LLOAD_3: u8 = 0x21;
pub const FLOAD_0: u8 = 0x22;
pub const FLOAD_1: u8 = 0x23;
pub const FLOAD_2: u8 = 0x24;
pub const FLOAD_3: u8 = 0x25;
pub const DLOAD_0: u8 = 0x26;
pub const DLOAD_1: u8 = 0x27;
pub const DLOAD_2: u8 = 0x28;
pub const DLOAD_3: u8 = 0x29;
pub const ALOAD_0: u8 = 0x2a;
pub const ALOAD_1: u8 = 0x2b;
pub const ALOAD_2: u8 = 0x2c;
pub const ALOAD_3: u8 = 0x2d;
pub const IALOAD: u8 = 0x2e;
pub const LALOAD: u8 = 0x2f;
pub const FALOAD: u8 = 0x30;
pub const DALOAD: u8 = 0x31;
pub const AALOAD: u8 = 0x32;
pub const BALOAD: u8 = 0x33;
pub const CALOAD: u8 = 0x34;
pub const SALOAD: u8 = 0x35;

// Stores
pub const ISTORE: u8 = 0x36;
pub const LSTORE: u8 = 0x37;
pub const FSTORE: u8 = 0x38;
pub const DSTORE: u8 = 0x39;
pub const ASTORE: u8 = 0x3a;
pub const ISTORE_0: u8 = 0x3b;
pub const ISTORE_1: u8 = 0x3c;
pub const ISTORE_2: u8 = 0x3d;
pub const ISTORE_3: u8 = 0x3e;
pub const LSTORE_0: u8 = 0x3f;
pub const LSTORE_1: u8 = 0x40;
pub const LSTORE_2: u8 = 0x41;
pub const LSTORE_3: u8 = 0x42;
pub const FSTORE_0: u8 = 0x43;
pub const FSTORE_1: u8 = 0x44;
pub const FSTORE_2: u8 = 0x45;
pub const FSTORE_3: u8 = 0x46;
pub const DSTORE_0: u8 = 0x47;
pub const DSTORE_1: u8 = 0x48;
pub const DSTORE_2: u8 = 0x49;
pub const DSTORE_3: u8 = 0x4a;
pub const ASTORE_0: u8 = 0x4b;
pub const ASTORE_1: u8 = 0x4c;
pub const ASTORE_2: u8 = 0x4d;
pub const ASTORE_3: u8 = 0x4e;
pub const IASTORE: u8 = 0x4f;
pub const LASTORE: u8 = 0x50;
pub const FASTORE: u8 = 0x51;
pub const DASTORE: u8 = 0x52;
pub const AASTORE: u8 = 0x53;
pub const BASTORE: u8 = 0x54;
pub const CASTORE: u8 = 0x55;
pub const SASTORE: u8 = 0x56;

// Stack manipulation
pub const POP: u8 = 0x57;
pub const POP2: u8 = 0x58;
pub const DUP: u8 = 0x59;
pub const DUP_X1: u8 = 0x5a;
pub const DUP_X2: u8 = 0x5b;
pub const DUP2: u8 = 0x5c;
pub const DUP2_X1: u8 = 0x5d;
pub const DUP2_X2: u8 = 0x5e;
pub const SWAP: u8 = 0x5f;

// Arithmetic
pub const IADD: u8 = 0x60;
pub const LADD: u8 = 0x61;
pub const FADD: u8 = 0x62;
pub const DADD: u8 = 0x63;
pub const ISUB: u8 = 0x64;
pub const LSUB: u8 = 0x65;
pub const FSUB: u8 = 0x66;
pub const DSUB: u8 = 0x67;
pub const IMUL: u8 = 0x68;
pub const LMUL: u8 = 0x69;
pub const FMUL: u8 = 0x6a;
pub const DMUL: u8 = 0x6b;
pub const IDIV: u8 = 0x6c;
pub const LDIV: u8 = 0x6d;
pub const FDIV: u8 = 0x6e;
pub const DDIV: u8 = 0x6f;
pub const IREM: u8 = 0x70;
pub const LREM: u8 = 0x71;
pub const FREM: u8 = 0x72;
pub const DREM: u8 = 0x73;
pub const INEG: u8 = 0x74;
pub const LNEG: u8 = 0x75;
pub const FNEG: u8 = 0x76;
pub const DNEG: u8 = 0x77;
pub const ISHL: u8 = 0x78;
pub const LSHL: u8 = 0x79;
pub const ISHR: u8 = 0x7a;
pub const LSHR: u8 = 0x7b;
pub const IUSHR: u8 = 0x7c;
pub const LUSHR: u8 = 0x7d;
pub const IAND: u8 = 0x7e;
pub const LAND: u8 = 0x7f;
pub const IOR: u8 = 0x80;
pub const LOR: u8 = 0x81;
pub const IXOR: u8 = 0x82;
pub const LXOR: u8 = 0x83;
pub const IINC: u8 = 0x84;

// Conversions
pub const I2L: u8 = 0x85;
pub const I2F: u8 = 0x86;
pub const I2D: u8 = 0x87;
pub const L2I: u8 = 0x88;
pub const L2F: u8 = 0x89;
pub const L2D: u8 = 0x8a;
pub const F2I: u8 = 0x8b;
pub const F2L: u8 = 0x8c;
pub const F2D: u8 = 0x8d;
pub const D2I: u8 = 0x8e;
pub const D2L: u8 = 0x8f;
pub const D2F: u8 = 0x90;
pub const I2B: u8 = 0x91;
pub const I2C: u8 = 0x92;
pub const I2S: u8 = 0x93;

// Comparisons and branches
pub const LCMP: u8 = 0x94;
pub const FCMPL: u8 = 0x95;
pub const FCMPG: u8 = 0x96;
pub const DCMPL: u8 = 0x97;
pub const DCMPG: u8 = 0x98;
pub const IFEQ: u8 = 0x99;
pub const IFNE: u8 = 0x9a;
pub const IFLT: u8 = 0x9b;
pub const IFGE: u8 = 0x9c;
pub const IFGT: u8 = 0x9d;
pub const IFLE: u8 = 0x9e;
pub const IF_ICMPEQ: u8 = 0x9f;
pub const IF_ICMPNE: u8 = 0xa0;
pub const IF_ICMPLT: u8 = 0xa1;
pub const IF_ICMPGE: u8 = 0xa2;
pub const IF_ICMPGT: u8 = 0xa3;
pub const IF_ICMPLE: u8 = 0xa4;
pub const IF_ACMPEQ: u8 = 0xa5;
pub const IF_ACMPNE: u8 = 0xa6;
pub const GOTO: u8 = 0xa7;
pub const JSR: u8 = 0xa8;
pub const RET: u8 = 0xa9;
pub const TABLESWITCH: u8 = 0xaa;
pub const LOOKUPSWITCH: u8 = 0xab;
pub const IRETURN: u8 = 0xac;
pub const LRETURN: u8 = 0xad;
pub const FRETURN: u8 = 0xae;
pub const DRETURN: u8 = 0xaf;
pub const ARETURN: u8 = 0xb0;
pub const RETURN: u8 = 0xb1;

// Field and method access
pub const GETSTATIC: u8 = 0xb2;
pub const PUTSTATIC: u8 = 0xb3;
pub const GETFIELD: u8 = 0xb4;
pub const PUTFIELD: u8 = 0xb5;
pub const INVOKEVIRTUAL: u8 = 0xb6;
pub const INVOKESPECIAL: u8 = 0xb7;
pub const INVOKESTATIC: u8 = 0xb8;
pub const INVOKEINTERFACE: u8 = 0xb9;
pub const INVOKEDYNAMIC: u8 = 0xba;

// Objects, arrays, and the rest
pub const NEW: u8 = 0xbb;
pub const NEWARRAY: u8 = 0xbc;
pub const ANEWARRAY: u8 = 0xbd;
pub const ARRAYLENGTH: u8 = 0xbe;
pub const ATHROW: u8 = 0xbf;
pub const CHECKCAST: u8 = 0xc0;
pub const INSTANCEOF: u8 = 0xc1;
pub const MONITORENTER: u8 = 0xc2;
pub const MONITOREXIT: u8 = 0xc3;
pub const WIDE: u8 = 0xc4;
pub const MULTIANEWARRAY: u8 = 0xc5;
pub const IFNULL: u8 = 0xc6;
pub const IFNONNULL: u8 = 0xc7;
pub const GOTO_W: u8 = 0xc8;
pub const JSR_W: u8 = 0xc9;

/// Broad behavioral class of an opcode.
///
/// The engine dispatches on categories wherever the exact opcode does not matter: all
/// binary arithmetic transfers the same way, all unary conditional jumps consume one
/// value, and so on. Individual opcodes are only consulted for the `dup`/`pop`/`swap`
/// family and for a handful of special cases (`multianewarray`, `invokestatic`).
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeCategory {
    /// `nop` - no effect on the frame.
    Nop,
    /// Pushes a constant (`aconst_null` through `ldc2_w`, `bipush`, `sipush`).
    Constant,
    /// Loads a local variable onto the stack.
    Load,
    /// Pops the stack into a local variable.
    Store,
    /// Loads an element from an array reference and index.
    ArrayLoad,
    /// Stores a value into an array element.
    ArrayStore,
    /// Untyped stack shuffling (`pop`, `pop2`, `dup` family, `swap`).
    Stack,
    /// Binary arithmetic, shift, and bitwise operations.
    Arithmetic,
    /// Unary negation (`ineg` through `dneg`).
    Negate,
    /// In-place local increment; touches no stack slots.
    Iinc,
    /// Primitive widening/narrowing conversions.
    Conversion,
    /// Two-operand comparison producing an int (`lcmp`, `fcmpl`, ...).
    Compare,
    /// Conditional jump consuming one value (`ifeq` ... `ifle`, `ifnull`, `ifnonnull`).
    If,
    /// Conditional jump consuming two values (`if_icmp*`, `if_acmp*`).
    IfCmp,
    /// Unconditional jump (`goto`, `goto_w`).
    Goto,
    /// Subroutine call (`jsr`, `jsr_w`); legacy, treated as a branch pushing an address.
    Jsr,
    /// Subroutine return; legacy, treated as a method terminator.
    Ret,
    /// `tableswitch` / `lookupswitch`.
    Switch,
    /// Method return, with or without a value.
    Return,
    /// `getstatic`, `putstatic`, `getfield`, `putfield`.
    FieldAccess,
    /// All five invocation opcodes.
    Invoke,
    /// `new` - pushes an uninitialized reference.
    New,
    /// `newarray` / `anewarray` - pops a length, pushes a reference.
    NewArray,
    /// `arraylength`.
    ArrayLength,
    /// `athrow` - abrupt method terminator.
    Throw,
    /// `checkcast` / `instanceof` - consume and produce one value.
    TypeCheck,
    /// `monitorenter` / `monitorexit`.
    Monitor,
    /// `wide` prefix; never appears in a decoded stream (widened forms are pre-resolved).
    Wide,
    /// `multianewarray` - pops one length per dimension.
    MultiNewArray,
    /// Reserved or unassigned opcode byte.
    Unknown,
}

/// Static metadata for one opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    /// Lower-case JVM mnemonic, `"unknown"` for reserved bytes.
    pub mnemonic: &'static str,
    /// Behavioral class the engine dispatches on.
    pub category: OpcodeCategory,
}

use OpcodeCategory as C;

const fn op(mnemonic: &'static str, category: OpcodeCategory) -> OpcodeInfo {
    OpcodeInfo { mnemonic, category }
}

const fn range(table: &mut [OpcodeInfo; 256], first: u8, mnemonics: &[&'static str], category: OpcodeCategory) {
    let mut i = 0;
    while i < mnemonics.len() {
        table[first as usize + i] = op(mnemonics[i], category);
        i += 1;
    }
}

const fn build_table() -> [OpcodeInfo; 256] {
    let mut t = [op("unknown", C::Unknown); 256];

    t[NOP as usize] = op("nop", C::Nop);
    range(
        &mut t,
        ACONST_NULL,
        &[
            "aconst_null",
            "iconst_m1",
            "iconst_0",
            "iconst_1",
            "iconst_2",
            "iconst_3",
            "iconst_4",
            "iconst_5",
            "lconst_0",
            "lconst_1",
            "fconst_0",
            "fconst_1",
            "fconst_2",
            "dconst_0",
            "dconst_1",
            "bipush",
            "sipush",
            "ldc",
            "ldc_w",
            "ldc2_w",
        ],
        C::Constant,
    );
    range(
        &mut t,
        ILOAD,
        &[
            "iload", "lload", "fload", "dload", "aload", "iload_0", "iload_1", "iload_2",
            "iload_3", "lload_0", "lload_1", "lload_2", "lload_3", "fload_0", "fload_1",
            "fload_2", "fload_3", "dload_0", "dload_1", "dload_2", "dload_3", "aload_0",
            "aload_1", "aload_2", "aload_3",
        ],
        C::Load,
    );
    range(
        &mut t,
        IALOAD,
        &["iaload", "laload", "faload", "daload", "aaload", "baload", "caload", "saload"],
        C::ArrayLoad,
    );
    range(
        &mut t,
        ISTORE,
        &[
            "istore", "lstore", "fstore", "dstore", "astore", "istore_0", "istore_1",
            "istore_2", "istore_3", "lstore_0", "lstore_1", "lstore_2", "lstore_3", "fstore_0",
            "fstore_1", "fstore_2", "fstore_3", "dstore_0", "dstore_1", "dstore_2", "dstore_3",
            "astore_0", "astore_1", "astore_2", "astore_3",
        ],
        C::Store,
    );
    range(
        &mut t,
        IASTORE,
        &["iastore", "lastore", "fastore", "dastore", "aastore", "bastore", "castore", "sastore"],
        C::ArrayStore,
    );
    range(
        &mut t,
        POP,
        &["pop", "pop2", "dup", "dup_x1", "dup_x2", "dup2", "dup2_x1", "dup2_x2", "swap"],
        C::Stack,
    );
    range(
        &mut t,
        IADD,
        &[
            "iadd", "ladd", "fadd", "dadd", "isub", "lsub", "fsub", "dsub", "imul", "lmul",
            "fmul", "dmul", "idiv", "ldiv", "fdiv", "ddiv", "irem", "lrem", "frem", "drem",
        ],
        C::Arithmetic,
    );
    range(&mut t, INEG, &["ineg", "lneg", "fneg", "dneg"], C::Negate);
    range(
        &mut t,
        ISHL,
        &[
            "ishl", "lshl", "ishr", "lshr", "iushr", "lushr", "iand", "land", "ior", "lor",
            "ixor", "lxor",
        ],
        C::Arithmetic,
    );
    t[IINC as usize] = op("iinc", C::Iinc);
    range(
        &mut t,
        I2L,
        &[
            "i2l", "i2f", "i2d", "l2i", "l2f", "l2d", "f2i", "f2l", "f2d", "d2i", "d2l", "d2f",
            "i2b", "i2c", "i2s",
        ],
        C::Conversion,
    );
    range(&mut t, LCMP, &["lcmp", "fcmpl", "fcmpg", "dcmpl", "dcmpg"], C::Compare);
    range(&mut t, IFEQ, &["ifeq", "ifne", "iflt", "ifge", "ifgt", "ifle"], C::If);
    range(
        &mut t,
        IF_ICMPEQ,
        &[
            "if_icmpeq", "if_icmpne", "if_icmplt", "if_icmpge", "if_icmpgt", "if_icmple",
            "if_acmpeq", "if_acmpne",
        ],
        C::IfCmp,
    );
    t[GOTO as usize] = op("goto", C::Goto);
    t[JSR as usize] = op("jsr", C::Jsr);
    t[RET as usize] = op("ret", C::Ret);
    t[TABLESWITCH as usize] = op("tableswitch", C::Switch);
    t[LOOKUPSWITCH as usize] = op("lookupswitch", C::Switch);
    range(
        &mut t,
        IRETURN,
        &["ireturn", "lreturn", "freturn", "dreturn", "areturn", "return"],
        C::Return,
    );
    range(&mut t, GETSTATIC, &["getstatic", "putstatic", "getfield", "putfield"], C::FieldAccess);
    range(
        &mut t,
        INVOKEVIRTUAL,
        &["invokevirtual", "invokespecial", "invokestatic", "invokeinterface", "invokedynamic"],
        C::Invoke,
    );
    t[NEW as usize] = op("new", C::New);
    t[NEWARRAY as usize] = op("newarray", C::NewArray);
    t[ANEWARRAY as usize] = op("anewarray", C::NewArray);
    t[ARRAYLENGTH as usize] = op("arraylength", C::ArrayLength);
    t[ATHROW as usize] = op("athrow", C::Throw);
    t[CHECKCAST as usize] = op("checkcast", C::TypeCheck);
    t[INSTANCEOF as usize] = op("instanceof", C::TypeCheck);
    t[MONITORENTER as usize] = op("monitorenter", C::Monitor);
    t[MONITOREXIT as usize] = op("monitorexit", C::Monitor);
    t[WIDE as usize] = op("wide", C::Wide);
    t[MULTIANEWARRAY as usize] = op("multianewarray", C::MultiNewArray);
    t[IFNULL as usize] = op("ifnull", C::If);
    t[IFNONNULL as usize] = op("ifnonnull", C::If);
    t[GOTO_W as usize] = op("goto_w", C::Goto);
    t[JSR_W as usize] = op("jsr_w", C::Jsr);
    t[0xca] = op("breakpoint", C::Unknown);
    t[0xfe] = op("impdep1", C::Unknown);
    t[0xff] = op("impdep2", C::Unknown);

    t
}

/// Descriptor table for all 256 opcode bytes. Reserved bytes carry the `Unknown` entry.
pub static OPCODES: [OpcodeInfo; 256] = build_table();

/// Look up the descriptor for an opcode byte.
///
/// Never fails; reserved bytes resolve to the `Unknown` entry.
#[must_use]
pub fn info(opcode: u8) -> &'static OpcodeInfo {
    &OPCODES[opcode as usize]
}

/// Mnemonic for an opcode byte, `"unknown"` for reserved bytes.
#[must_use]
pub fn mnemonic(opcode: u8) -> &'static str {
    OPCODES[opcode as usize].mnemonic
}

/// Behavioral category for an opcode byte.
#[must_use]
pub fn category(opcode: u8) -> OpcodeCategory {
    OPCODES[opcode as usize].category
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_known_opcodes() {
        assert_eq!(mnemonic(NOP), "nop");
        assert_eq!(mnemonic(ALOAD_0), "aload_0");
        assert_eq!(mnemonic(GETFIELD), "getfield");
        assert_eq!(mnemonic(MULTIANEWARRAY), "multianewarray");
        assert_eq!(mnemonic(JSR_W), "jsr_w");
    }

    #[test]
    fn reserved_bytes_are_unknown() {
        assert_eq!(category(0xcb), OpcodeCategory::Unknown);
        assert_eq!(category(0xfd), OpcodeCategory::Unknown);
        assert_eq!(mnemonic(0xca), "breakpoint");
    }

    #[test]
    fn categories_match_opcode_families() {
        assert_eq!(category(ICONST_3), OpcodeCategory::Constant);
        assert_eq!(category(DLOAD_2), OpcodeCategory::Load);
        assert_eq!(category(ASTORE_1), OpcodeCategory::Store);
        assert_eq!(category(DUP2_X2), OpcodeCategory::Stack);
        assert_eq!(category(LXOR), OpcodeCategory::Arithmetic);
        assert_eq!(category(DNEG), OpcodeCategory::Negate);
        assert_eq!(category(FCMPG), OpcodeCategory::Compare);
        assert_eq!(category(IFNONNULL), OpcodeCategory::If);
        assert_eq!(category(IF_ACMPNE), OpcodeCategory::IfCmp);
        assert_eq!(category(LOOKUPSWITCH), OpcodeCategory::Switch);
        assert_eq!(category(ARETURN), OpcodeCategory::Return);
        assert_eq!(category(INVOKEDYNAMIC), OpcodeCategory::Invoke);
    }

    #[test]
    fn every_byte_has_an_entry() {
        for b in 0..=255u8 {
            assert!(!info(b).mnemonic.is_empty());
        }
    }
}
