//! Method bodies - the unit of analysis.
//!
//! A [`MethodBody`] bundles everything the engine needs to know about one method: its
//! identity, parsed descriptor, access flags, local-variable capacity, the decoded
//! instruction sequence, and the exception-handler table. Construction validates the
//! structural invariants once (non-empty sequence, contiguous indices, in-range branch and
//! handler targets) so every later pass can index without re-checking.

use std::fmt;
use std::sync::Arc;

use crate::bytecode::descriptor::{AccessFlags, MethodDescriptor};
use crate::bytecode::instruction::{Instruction, Payload};
use crate::Result;

/// One entry of a method's exception-handler table.
///
/// The protected range is `[start, end)` in instruction indices; `handler` is the index of
/// the first instruction of the catch block. `catch_type` is `None` for catch-all entries
/// (`finally` blocks).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// First protected instruction index (inclusive).
    pub start: u32,
    /// End of the protected range (exclusive).
    pub end: u32,
    /// Index of the handler's first instruction.
    pub handler: u32,
    /// Internal name of the caught class, `None` for catch-all.
    pub catch_type: Option<String>,
}

/// Cache key identifying a method: class, name, and descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    /// Internal name of the declaring class.
    pub class_name: Arc<str>,
    /// Method name.
    pub method_name: Arc<str>,
    /// Raw method descriptor.
    pub descriptor: String,
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.class_name, self.method_name, self.descriptor)
    }
}

/// A decoded method body, validated and ready for analysis.
///
/// # Examples
///
/// ```rust
/// use classflow::bytecode::{opcode, AccessFlags, Instruction, MethodBody, Payload};
///
/// let insns = vec![
///     Instruction::new("Demo", "zero", 0, 0, opcode::ICONST_0, Payload::None),
///     Instruction::new("Demo", "zero", 1, 1, opcode::IRETURN, Payload::None),
/// ];
/// let body = MethodBody::new("Demo", "zero", "()I", AccessFlags::ACC_STATIC, 1, insns, vec![])
///     .unwrap();
/// assert_eq!(body.len(), 2);
/// assert!(body.is_static());
/// ```
#[derive(Debug, Clone)]
pub struct MethodBody {
    class_name: Arc<str>,
    method_name: Arc<str>,
    descriptor: MethodDescriptor,
    flags: AccessFlags,
    max_locals: u16,
    instructions: Vec<Instruction>,
    handlers: Vec<ExceptionHandler>,
}

impl MethodBody {
    /// Creates a method body, validating its structure.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] when:
    /// - the descriptor does not parse,
    /// - the instruction sequence is empty or its indices are not `0..len`,
    /// - a jump, switch, or handler target lies outside the sequence,
    /// - a handler's protected range is empty or out of range,
    /// - `max_locals` cannot hold the receiver and declared parameters.
    pub fn new(
        class_name: impl Into<Arc<str>>,
        method_name: impl Into<Arc<str>>,
        descriptor: &str,
        flags: AccessFlags,
        max_locals: u16,
        instructions: Vec<Instruction>,
        handlers: Vec<ExceptionHandler>,
    ) -> Result<Self> {
        let class_name = class_name.into();
        let method_name = method_name.into();
        let descriptor = MethodDescriptor::parse(descriptor)?;

        if instructions.is_empty() {
            return Err(malformed_error!("method {}.{} has an empty body", class_name, method_name));
        }

        let len = u32::try_from(instructions.len())
            .map_err(|_| malformed_error!("method {}.{} exceeds the instruction limit", class_name, method_name))?;

        let entry_slots = descriptor.param_slots() + usize::from(!flags.is_static());
        if usize::from(max_locals) < entry_slots {
            return Err(malformed_error!(
                "method {}.{}: max_locals {} cannot hold {} entry slots",
                class_name,
                method_name,
                max_locals,
                entry_slots
            ));
        }

        for (i, insn) in instructions.iter().enumerate() {
            if insn.index() != i as u32 {
                return Err(malformed_error!(
                    "method {}.{}: instruction at position {} carries index {}",
                    class_name,
                    method_name,
                    i,
                    insn.index()
                ));
            }
            match insn.payload() {
                Payload::Jump { target } if *target >= len => {
                    return Err(malformed_error!(
                        "method {}.{}: jump target I{} out of range at I{}",
                        class_name,
                        method_name,
                        target,
                        i
                    ));
                }
                Payload::Switch(table) => {
                    let bad = table
                        .cases
                        .iter()
                        .map(|(_, t)| *t)
                        .chain(std::iter::once(table.default))
                        .find(|t| *t >= len);
                    if let Some(target) = bad {
                        return Err(malformed_error!(
                            "method {}.{}: switch target I{} out of range at I{}",
                            class_name,
                            method_name,
                            target,
                            i
                        ));
                    }
                }
                _ => {}
            }
        }

        for h in &handlers {
            if h.start >= h.end || h.end > len || h.handler >= len {
                return Err(malformed_error!(
                    "method {}.{}: invalid exception handler [{}, {}) -> I{}",
                    class_name,
                    method_name,
                    h.start,
                    h.end,
                    h.handler
                ));
            }
        }

        Ok(MethodBody {
            class_name,
            method_name,
            descriptor,
            flags,
            max_locals,
            instructions,
            handlers,
        })
    }

    /// Internal name of the declaring class.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Method name.
    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// The parsed method descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    /// Method access flags.
    #[must_use]
    pub fn flags(&self) -> AccessFlags {
        self.flags
    }

    /// `true` when local slot 0 does not hold a receiver.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.is_static()
    }

    /// Size of the local-variable array.
    #[must_use]
    pub fn max_locals(&self) -> u16 {
        self.max_locals
    }

    /// The decoded instruction sequence.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The exception-handler table.
    #[must_use]
    pub fn handlers(&self) -> &[ExceptionHandler] {
        &self.handlers
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Always `false`; bodies are validated non-empty. Kept for the conventional pair.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instruction at `index`, if in range.
    #[must_use]
    pub fn instruction(&self, index: u32) -> Option<&Instruction> {
        self.instructions.get(index as usize)
    }

    /// The instruction preceding `index` in the sequence.
    #[must_use]
    pub fn previous_instruction(&self, index: u32) -> Option<&Instruction> {
        index.checked_sub(1).and_then(|i| self.instruction(i))
    }

    /// The instruction following `index` in the sequence.
    #[must_use]
    pub fn next_instruction(&self, index: u32) -> Option<&Instruction> {
        self.instruction(index.checked_add(1)?)
    }

    /// The cache key identifying this method.
    #[must_use]
    pub fn key(&self) -> MethodKey {
        MethodKey {
            class_name: Arc::clone(&self.class_name),
            method_name: Arc::clone(&self.method_name),
            descriptor: self.descriptor.raw().to_string(),
        }
    }

    /// Maps a local slot to the 0-based declared-parameter order, receiver excluded.
    #[must_use]
    pub fn param_for_slot(&self, slot: u16) -> Option<usize> {
        self.descriptor.param_for_slot(slot, self.is_static())
    }

    /// `true` when `aload_0`-style access to `slot` reads the receiver.
    #[must_use]
    pub fn slot_is_receiver(&self, slot: u16) -> bool {
        slot == 0 && !self.is_static()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::instruction::SwitchTable;
    use crate::bytecode::opcode::*;

    fn insns(ops: &[u8]) -> Vec<Instruction> {
        ops.iter()
            .enumerate()
            .map(|(i, &op)| Instruction::new("Demo", "m", i as u32, i as u32, op, Payload::None))
            .collect()
    }

    #[test]
    fn rejects_empty_body() {
        let err = MethodBody::new("Demo", "m", "()V", AccessFlags::ACC_STATIC, 0, vec![], vec![]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_out_of_range_jump() {
        let body = vec![
            Instruction::new("Demo", "m", 0, 0, GOTO, Payload::Jump { target: 5 }),
            Instruction::new("Demo", "m", 1, 1, RETURN, Payload::None),
        ];
        assert!(MethodBody::new("Demo", "m", "()V", AccessFlags::ACC_STATIC, 0, body, vec![]).is_err());
    }

    #[test]
    fn rejects_out_of_range_switch_target() {
        let table = SwitchTable { cases: vec![(0, 1), (1, 9)], default: 1 };
        let body = vec![
            Instruction::new("Demo", "m", 0, 0, LOOKUPSWITCH, Payload::Switch(table)),
            Instruction::new("Demo", "m", 1, 1, RETURN, Payload::None),
        ];
        assert!(MethodBody::new("Demo", "m", "()V", AccessFlags::ACC_STATIC, 1, body, vec![]).is_err());
    }

    #[test]
    fn rejects_bad_handler_range() {
        let handler = ExceptionHandler { start: 1, end: 1, handler: 0, catch_type: None };
        let body = insns(&[NOP, RETURN]);
        assert!(MethodBody::new("Demo", "m", "()V", AccessFlags::ACC_STATIC, 0, body, vec![handler]).is_err());
    }

    #[test]
    fn rejects_undersized_locals() {
        let body = insns(&[RETURN]);
        // instance method with (II)V needs 3 slots
        let err = MethodBody::new("Demo", "m", "(II)V", AccessFlags::empty(), 2, body, vec![]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_misnumbered_indices() {
        let body = vec![
            Instruction::new("Demo", "m", 0, 0, NOP, Payload::None),
            Instruction::new("Demo", "m", 5, 5, RETURN, Payload::None),
        ];
        assert!(MethodBody::new("Demo", "m", "()V", AccessFlags::ACC_STATIC, 0, body, vec![]).is_err());
    }

    #[test]
    fn navigation_and_key() {
        let body = MethodBody::new("Demo", "m", "()V", AccessFlags::ACC_STATIC, 0, insns(&[NOP, NOP, RETURN]), vec![])
            .unwrap();
        assert_eq!(body.previous_instruction(0), None);
        assert_eq!(body.next_instruction(1).map(Instruction::index), Some(2));
        assert_eq!(body.next_instruction(2), None);
        assert_eq!(body.key().to_string(), "Demo.m()V");
    }

    #[test]
    fn parameter_slots_instance() {
        let body = MethodBody::new("Demo", "add", "(II)I", AccessFlags::ACC_PUBLIC, 3, insns(&[RETURN]), vec![])
            .unwrap();
        assert!(body.slot_is_receiver(0));
        assert_eq!(body.param_for_slot(1), Some(0));
        assert_eq!(body.param_for_slot(2), Some(1));
        assert_eq!(body.param_for_slot(0), None);
    }
}
