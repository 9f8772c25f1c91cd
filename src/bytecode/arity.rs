//! The static stack-effect model: how many operand values each instruction consumes and
//! whether it produces one.
//!
//! Both the frame simulator and the operand resolver dispatch through this table, so the
//! two always agree on what an instruction pops. `multianewarray` is the one instruction
//! whose consumption is not a fixed property of the opcode: the simulator resolves it from
//! the payload's dimension count, while the resolver probes the recorded frame instead
//! (see [`crate::analysis::MethodAnalysis::operand_count`]).

use log::debug;

use crate::bytecode::instruction::{Instruction, Payload};
use crate::bytecode::opcode::{self, OpcodeCategory};

/// Number of stack values an instruction consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackDemand {
    /// The instruction pops exactly this many values.
    Fixed(u8),
    /// `multianewarray`: consumption depends on the dimension operand, so resolver-side
    /// queries probe the frame instead of trusting a fixed count.
    ProbeStack,
}

/// The stack demand of an instruction.
///
/// Unrecognized opcodes demand nothing; the degradation is logged at debug level so a
/// stream containing reserved bytes still analyzes.
#[must_use]
pub fn stack_demand(insn: &Instruction) -> StackDemand {
    use OpcodeCategory as C;
    let fixed = match insn.category() {
        C::Nop | C::Constant | C::Load | C::Iinc | C::New | C::Goto | C::Jsr | C::Ret | C::Wide => 0,
        C::Store | C::Negate | C::Conversion | C::If | C::Switch | C::NewArray | C::ArrayLength
        | C::Throw | C::TypeCheck | C::Monitor => 1,
        C::ArrayLoad | C::Arithmetic | C::Compare | C::IfCmp => 2,
        C::ArrayStore => 3,
        C::Stack => match insn.opcode() {
            opcode::POP | opcode::DUP => 1,
            opcode::POP2 | opcode::DUP_X1 | opcode::DUP2 | opcode::SWAP => 2,
            opcode::DUP_X2 | opcode::DUP2_X1 => 3,
            opcode::DUP2_X2 => 4,
            _ => unreachable!("stack category covers exactly nine opcodes"),
        },
        C::Return => {
            if insn.opcode() == opcode::RETURN {
                0
            } else {
                1
            }
        }
        C::FieldAccess => match insn.opcode() {
            opcode::GETSTATIC => 0,
            opcode::PUTSTATIC | opcode::GETFIELD => 1,
            opcode::PUTFIELD => 2,
            _ => unreachable!("field-access category covers exactly four opcodes"),
        },
        C::Invoke => match insn.payload() {
            Payload::Method(m) => {
                let args = m.descriptor.param_count();
                let receiver = usize::from(!insn.is_receiverless_invoke());
                (args + receiver) as u8
            }
            _ => {
                debug!("invoke at {} carries no method reference, assuming zero operands", insn);
                0
            }
        },
        C::MultiNewArray => return StackDemand::ProbeStack,
        C::Unknown => {
            debug!("unrecognized opcode 0x{:02x} at {}, assuming zero operands", insn.opcode(), insn);
            0
        }
    };
    StackDemand::Fixed(fixed)
}

/// `true` when the instruction leaves a value on the stack.
///
/// The `dup`/`swap` family is excluded: its effect is a reshuffle, handled structurally by
/// the simulator rather than as pop-then-push.
#[must_use]
pub fn pushes_value(insn: &Instruction) -> bool {
    use OpcodeCategory as C;
    match insn.category() {
        C::Constant | C::Load | C::ArrayLoad | C::Arithmetic | C::Negate | C::Conversion
        | C::Compare | C::New | C::NewArray | C::ArrayLength | C::TypeCheck | C::MultiNewArray
        | C::Jsr => true,
        C::FieldAccess => insn.is_field_read(),
        C::Invoke => match insn.payload() {
            Payload::Method(m) => m.descriptor.returns_value(),
            _ => false,
        },
        _ => false,
    }
}

/// `true` when the value the instruction pushes is a `long` or `double`, occupying two
/// stack slots.
///
/// Only meaningful for instructions where [`pushes_value`] holds; anything else answers
/// `false`.
#[must_use]
pub fn pushes_wide(insn: &Instruction) -> bool {
    match insn.opcode() {
        opcode::LCONST_0 | opcode::LCONST_1 | opcode::DCONST_0 | opcode::DCONST_1
        | opcode::LDC2_W
        | opcode::LLOAD | opcode::DLOAD
        | opcode::LLOAD_0..=opcode::LLOAD_3
        | opcode::DLOAD_0..=opcode::DLOAD_3
        | opcode::LALOAD | opcode::DALOAD
        | opcode::LADD | opcode::DADD | opcode::LSUB | opcode::DSUB
        | opcode::LMUL | opcode::DMUL | opcode::LDIV | opcode::DDIV
        | opcode::LREM | opcode::DREM | opcode::LNEG | opcode::DNEG
        | opcode::LSHL | opcode::LSHR | opcode::LUSHR
        | opcode::LAND | opcode::LOR | opcode::LXOR
        | opcode::I2L | opcode::I2D | opcode::L2D
        | opcode::F2L | opcode::F2D | opcode::D2L => true,
        opcode::GETSTATIC | opcode::GETFIELD => matches!(
            insn.payload(),
            Payload::Field(f) if matches!(f.descriptor.as_str(), "J" | "D")
        ),
        _ if insn.is_invoke() => matches!(
            insn.payload(),
            Payload::Method(m) if matches!(m.descriptor.return_descriptor(), "J" | "D")
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::instruction::{FieldRef, MethodRef};
    use crate::bytecode::opcode::*;

    fn insn(op: u8, payload: Payload) -> Instruction {
        Instruction::new("Demo", "m", 0, 0, op, payload)
    }

    fn fixed(op: u8) -> u8 {
        match stack_demand(&insn(op, Payload::None)) {
            StackDemand::Fixed(n) => n,
            StackDemand::ProbeStack => panic!("expected fixed demand"),
        }
    }

    #[test]
    fn field_access_arity() {
        assert_eq!(fixed(GETSTATIC), 0);
        assert_eq!(fixed(PUTSTATIC), 1);
        assert_eq!(fixed(GETFIELD), 1);
        assert_eq!(fixed(PUTFIELD), 2);
    }

    #[test]
    fn dup_family_arity() {
        assert_eq!(fixed(DUP), 1);
        assert_eq!(fixed(DUP_X1), 2);
        assert_eq!(fixed(DUP_X2), 3);
        assert_eq!(fixed(DUP2), 2);
        assert_eq!(fixed(DUP2_X1), 3);
        assert_eq!(fixed(DUP2_X2), 4);
        assert_eq!(fixed(SWAP), 2);
        assert_eq!(fixed(POP2), 2);
    }

    #[test]
    fn jumps_and_switches() {
        assert_eq!(fixed(IFNULL), 1);
        assert_eq!(fixed(IFLE), 1);
        assert_eq!(fixed(IF_ICMPEQ), 2);
        assert_eq!(fixed(TABLESWITCH), 1);
        assert_eq!(fixed(GOTO), 0);
    }

    #[test]
    fn array_and_misc() {
        assert_eq!(fixed(IALOAD), 2);
        assert_eq!(fixed(AASTORE), 3);
        assert_eq!(fixed(LCMP), 2);
        assert_eq!(fixed(INEG), 1);
        assert_eq!(fixed(ARRAYLENGTH), 1);
        assert_eq!(fixed(ATHROW), 1);
        assert_eq!(fixed(MONITORENTER), 1);
        assert_eq!(fixed(RETURN), 0);
        assert_eq!(fixed(DRETURN), 1);
    }

    #[test]
    fn invoke_counts_receiver() {
        let virt = insn(
            INVOKEVIRTUAL,
            Payload::Method(MethodRef::new("Demo", "f", "(II)V").unwrap()),
        );
        assert_eq!(stack_demand(&virt), StackDemand::Fixed(3));

        let stat = insn(
            INVOKESTATIC,
            Payload::Method(MethodRef::new("Demo", "g", "(II)V").unwrap()),
        );
        assert_eq!(stack_demand(&stat), StackDemand::Fixed(2));
    }

    #[test]
    fn multianewarray_probes() {
        let m = insn(
            MULTIANEWARRAY,
            Payload::MultiArray { descriptor: "[[I".into(), dimensions: 2 },
        );
        assert_eq!(stack_demand(&m), StackDemand::ProbeStack);
    }

    #[test]
    fn unknown_opcode_degrades() {
        assert_eq!(stack_demand(&insn(0xcb, Payload::None)), StackDemand::Fixed(0));
    }

    #[test]
    fn width_model() {
        assert!(pushes_wide(&insn(LCONST_0, Payload::None)));
        assert!(pushes_wide(&insn(DLOAD_2, Payload::None)));
        assert!(pushes_wide(&insn(LDC2_W, Payload::None)));
        assert!(pushes_wide(&insn(LADD, Payload::None)));
        assert!(pushes_wide(&insn(I2L, Payload::None)));
        assert!(!pushes_wide(&insn(ICONST_0, Payload::None)));
        assert!(!pushes_wide(&insn(L2I, Payload::None)));
        assert!(!pushes_wide(&insn(LCMP, Payload::None)));

        let long_field = Payload::Field(FieldRef::new("Demo", "t", "J"));
        assert!(pushes_wide(&insn(GETFIELD, long_field)));
        let int_field = Payload::Field(FieldRef::new("Demo", "n", "I"));
        assert!(!pushes_wide(&insn(GETSTATIC, int_field)));

        let long_call = insn(
            INVOKESTATIC,
            Payload::Method(MethodRef::new("Demo", "now", "()J").unwrap()),
        );
        assert!(pushes_wide(&long_call));
        let int_call = insn(
            INVOKESTATIC,
            Payload::Method(MethodRef::new("Demo", "g", "()I").unwrap()),
        );
        assert!(!pushes_wide(&int_call));
    }

    #[test]
    fn push_model() {
        assert!(pushes_value(&insn(GETFIELD, Payload::None)));
        assert!(!pushes_value(&insn(PUTFIELD, Payload::None)));
        assert!(pushes_value(&insn(LDC, Payload::None)));
        assert!(!pushes_value(&insn(GOTO, Payload::None)));
        let void_call = insn(
            INVOKEVIRTUAL,
            Payload::Method(MethodRef::new("Demo", "f", "(I)V").unwrap()),
        );
        assert!(!pushes_value(&void_call));
        let int_call = insn(
            INVOKESTATIC,
            Payload::Method(MethodRef::new("Demo", "g", "()I").unwrap()),
        );
        assert!(pushes_value(&int_call));
    }
}
