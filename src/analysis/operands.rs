//! Operand resolution: mapping consumed stack values back to producing instructions.
//!
//! All queries are conservative. A value with more than one possible producer resolves to
//! no *exact* source (callers that can handle ambiguity use the list variants), a depth
//! past the modeled stack resolves to nothing with a diagnostic, and a query against an
//! unreachable instruction resolves to nothing. None of these degrade into errors; the
//! fatal cases were already rejected during simulation.

use log::warn;

use crate::analysis::method::MethodAnalysis;
use crate::bytecode::{
    arity::{stack_demand, StackDemand},
    Instruction,
};

impl MethodAnalysis {
    /// The unique producer of the stack value `depth` positions below the top, as seen by
    /// instruction `index` before it executes.
    ///
    /// Returns `None` when the value has zero or several possible producers (ambiguity is
    /// resolved conservatively), when `depth` is negative or underruns the modeled stack
    /// (logged as a diagnostic), or when the instruction is unreachable.
    #[must_use]
    pub fn stack_source(&self, index: u32, depth: i32) -> Option<&Instruction> {
        if depth < 0 {
            warn!(
                "negative stack depth {} queried at instruction {} of {}",
                depth,
                index,
                self.body().key()
            );
            return None;
        }
        let frame = self.frame(index)?;
        let Some(sources) = frame.value_from_top(depth as usize) else {
            warn!(
                "stack depth {} underruns the {}-deep stack at instruction {} of {}",
                depth,
                frame.stack_depth(),
                index,
                self.body().key()
            );
            return None;
        };
        let producer = sources.single()?;
        self.body().instruction(producer)
    }

    /// Every possible producer of the stack value `depth` positions below the top.
    ///
    /// Empty under the same conditions where [`MethodAnalysis::stack_source`] returns
    /// `None`, except ambiguity: all aliases are listed.
    #[must_use]
    pub fn stack_sources(&self, index: u32, depth: i32) -> Vec<&Instruction> {
        if depth < 0 {
            warn!(
                "negative stack depth {} queried at instruction {} of {}",
                depth,
                index,
                self.body().key()
            );
            return Vec::new();
        }
        let Some(frame) = self.frame(index) else {
            return Vec::new();
        };
        let Some(sources) = frame.value_from_top(depth as usize) else {
            return Vec::new();
        };
        sources.iter().filter_map(|i| self.body().instruction(i)).collect()
    }

    /// All producers of all values instruction `index` consumes, deduplicated in
    /// first-seen order (top of stack first).
    #[must_use]
    pub fn operands(&self, index: u32) -> Vec<&Instruction> {
        let count = self.operand_count(index);
        let mut result: Vec<&Instruction> = Vec::new();
        for depth in 0..count {
            for source in self.stack_sources(index, depth as i32) {
                if !result.iter().any(|i| i.index() == source.index()) {
                    result.push(source);
                }
            }
        }
        result
    }

    /// How many stack values instruction `index` consumes.
    ///
    /// Fixed per opcode for everything except `multianewarray`, whose count is probed
    /// from the recorded frame by walking down until no exact source resolves - an
    /// ambiguous dimension value therefore stops the probe early.
    #[must_use]
    pub fn operand_count(&self, index: u32) -> usize {
        let Some(insn) = self.body().instruction(index) else {
            return 0;
        };
        match stack_demand(insn) {
            StackDemand::Fixed(n) => usize::from(n),
            StackDemand::ProbeStack => {
                let mut depth = 0usize;
                while self.stack_source(index, depth as i32).is_some() {
                    depth += 1;
                }
                depth
            }
        }
    }

    /// The unique producer of the receiver of the invocation at `index`.
    ///
    /// The receiver sits below the arguments, so the query depth is the argument count.
    /// `None` for receiverless invocations and non-invocations.
    #[must_use]
    pub fn invocation_receiver_source(&self, index: u32) -> Option<&Instruction> {
        let insn = self.body().instruction(index)?;
        if !insn.is_invoke() || insn.is_receiverless_invoke() {
            return None;
        }
        let argc = match insn.payload() {
            crate::bytecode::Payload::Method(m) => m.descriptor.param_count(),
            _ => return None,
        };
        self.stack_source(index, argc as i32)
    }

    /// The unique producer of the array reference consumed by the array access at
    /// `index`: two below the top for stores (ref, index, value), one below for loads.
    #[must_use]
    pub fn array_reference_source(&self, index: u32) -> Option<&Instruction> {
        use crate::bytecode::OpcodeCategory;
        let insn = self.body().instruction(index)?;
        match insn.category() {
            OpcodeCategory::ArrayLoad => self.stack_source(index, 1),
            OpcodeCategory::ArrayStore => self.stack_source(index, 2),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::analysis::MethodAnalysis;
    use crate::bytecode::{opcode::*, AccessFlags, Instruction, MethodBody, MethodRef, Payload};

    fn analyze(descriptor: &str, max_locals: u16, ops: Vec<(u8, Payload)>) -> MethodAnalysis {
        let insns = ops
            .into_iter()
            .enumerate()
            .map(|(i, (op, payload))| Instruction::new("Demo", "m", i as u32, i as u32, op, payload))
            .collect();
        let body =
            MethodBody::new("Demo", "m", descriptor, AccessFlags::ACC_STATIC, max_locals, insns, vec![])
                .unwrap();
        MethodAnalysis::analyze(body).unwrap()
    }

    #[test]
    fn exact_source_of_unambiguous_value() {
        let a = analyze(
            "(II)I",
            2,
            vec![
                (ILOAD_0, Payload::None),
                (ILOAD_1, Payload::None),
                (IADD, Payload::None),
                (IRETURN, Payload::None),
            ],
        );
        assert_eq!(a.stack_source(2, 0).map(Instruction::index), Some(1));
        assert_eq!(a.stack_source(2, 1).map(Instruction::index), Some(0));
        assert_eq!(a.stack_source(3, 0).map(Instruction::index), Some(2));
    }

    #[test]
    fn ambiguity_resolves_to_none_but_lists_aliases() {
        let a = analyze(
            "()V",
            0,
            vec![
                (ICONST_0, Payload::None),
                (IFEQ, Payload::Jump { target: 4 }),
                (ICONST_1, Payload::None),
                (GOTO, Payload::Jump { target: 5 }),
                (ICONST_2, Payload::None),
                (POP, Payload::None),
                (RETURN, Payload::None),
            ],
        );
        assert_eq!(a.stack_source(5, 0), None);
        let aliases: Vec<u32> = a.stack_sources(5, 0).iter().map(|i| i.index()).collect();
        assert_eq!(aliases, vec![2, 4]);
    }

    #[test]
    fn invalid_depths_resolve_to_nothing() {
        let a = analyze("()V", 0, vec![(ICONST_0, Payload::None), (POP, Payload::None), (RETURN, Payload::None)]);
        assert_eq!(a.stack_source(1, -1), None);
        assert_eq!(a.stack_source(1, 5), None);
        assert!(a.stack_sources(1, 5).is_empty());
    }

    #[test]
    fn unreachable_instructions_resolve_to_nothing() {
        let a = analyze(
            "()V",
            0,
            vec![
                (GOTO, Payload::Jump { target: 2 }),
                (POP, Payload::None), // dead
                (RETURN, Payload::None),
            ],
        );
        assert_eq!(a.stack_source(1, 0), None);
        assert_eq!(a.operands(1), Vec::<&Instruction>::new());
    }

    #[test]
    fn operands_of_a_call() {
        let call = Payload::Method(MethodRef::new("Demo", "f", "(II)I").unwrap());
        let a = analyze(
            "()I",
            0,
            vec![
                (ICONST_1, Payload::None),
                (ICONST_2, Payload::None),
                (INVOKESTATIC, call),
                (IRETURN, Payload::None),
            ],
        );
        assert_eq!(a.operand_count(2), 2);
        let ops: Vec<u32> = a.operands(2).iter().map(|i| i.index()).collect();
        assert_eq!(ops, vec![1, 0]); // top of stack first
    }

    #[test]
    fn receiver_sits_below_the_arguments() {
        let call = Payload::Method(MethodRef::new("Demo", "f", "(I)V").unwrap());
        let a = analyze(
            "()V",
            1,
            vec![
                (ACONST_NULL, Payload::None), // stand-in receiver
                (ICONST_1, Payload::None),
                (INVOKEVIRTUAL, call),
                (RETURN, Payload::None),
            ],
        );
        assert_eq!(a.invocation_receiver_source(2).map(Instruction::index), Some(0));
        assert_eq!(a.invocation_receiver_source(1), None);
    }

    #[test]
    fn multianewarray_probes_the_frame() {
        let a = analyze(
            "()V",
            0,
            vec![
                (ICONST_1, Payload::None),
                (ICONST_2, Payload::None),
                (
                    MULTIANEWARRAY,
                    Payload::MultiArray { descriptor: "[[I".into(), dimensions: 2 },
                ),
                (POP, Payload::None),
                (RETURN, Payload::None),
            ],
        );
        assert_eq!(a.operand_count(2), 2);
        let ops: Vec<u32> = a.operands(2).iter().map(|i| i.index()).collect();
        assert_eq!(ops, vec![1, 0]);
    }

    #[test]
    fn array_reference_sources() {
        // arr[0] = 1 with arr coming from a fresh anewarray
        let a = analyze(
            "()V",
            0,
            vec![
                (ICONST_1, Payload::None),
                (ANEWARRAY, Payload::Type("java/lang/Object".into())),
                (ICONST_0, Payload::None),
                (ACONST_NULL, Payload::None),
                (AASTORE, Payload::None),
                (RETURN, Payload::None),
            ],
        );
        assert_eq!(a.array_reference_source(4).map(Instruction::index), Some(1));
    }
}
