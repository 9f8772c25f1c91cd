//! The abstract stack/locals simulator.
//!
//! For every reachable instruction the simulator computes a [`Frame`]: the state of the
//! operand stack and local-variable array *before* the instruction executes. Values are
//! untyped [`SourceSet`]s - the set of instruction indices that may have pushed or stored
//! the value. A load pushes the load's own index (the load is the producer its consumers
//! see), a store overwrites its slot with the store's index, and control-flow joins take
//! the per-slot set union. Sets therefore grow beyond one element only where distinct
//! paths meet.
//!
//! A `long` or `double` occupies a single stack entry, tagged as wide. The tag is what the
//! `pop2`/`dup2` family dispatches on: those opcodes count slots, not values, so `pop2`
//! removes either one wide entry or two narrow ones, and the `dup2` shuffles pick the
//! matching form the same way.
//!
//! Three conditions are fatal for a method: popping more values than the modeled stack
//! holds, two paths meeting with different stack depths, and two paths meeting with
//! different value widths in the same position. All mean the instruction stream and the
//! stack-effect model disagree, so no frame fact can be trusted.

use std::collections::BTreeSet;

use crate::bytecode::{
    arity::{pushes_value, pushes_wide, stack_demand, StackDemand},
    opcode, MethodBody, OpcodeCategory, Payload,
};
use crate::Result;

/// Set of instruction indices that may have produced a value.
///
/// Ordered internally so iteration, display, and comparisons are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceSet(BTreeSet<u32>);

impl SourceSet {
    /// The empty set; entry-frame slots carry this (no producing instruction exists).
    #[must_use]
    pub fn empty() -> Self {
        SourceSet(BTreeSet::new())
    }

    /// Singleton set.
    #[must_use]
    pub fn of(index: u32) -> Self {
        SourceSet(BTreeSet::from([index]))
    }

    /// Number of possible producers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when no producer is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` when `index` is a possible producer.
    #[must_use]
    pub fn contains(&self, index: u32) -> bool {
        self.0.contains(&index)
    }

    /// The unique producer, when exactly one exists.
    #[must_use]
    pub fn single(&self) -> Option<u32> {
        if self.0.len() == 1 {
            self.0.iter().next().copied()
        } else {
            None
        }
    }

    /// Producers in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    /// Unions `other` into `self`, reporting whether anything was added.
    pub fn union_with(&mut self, other: &SourceSet) -> bool {
        let before = self.0.len();
        self.0.extend(other.0.iter().copied());
        self.0.len() != before
    }
}

impl FromIterator<u32> for SourceSet {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        SourceSet(iter.into_iter().collect())
    }
}

/// One modeled stack entry: the producer set plus the value's slot width.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StackValue {
    sources: SourceSet,
    wide: bool,
}

impl StackValue {
    fn narrow(sources: SourceSet) -> Self {
        StackValue { sources, wide: false }
    }
}

/// The modeled machine state before one instruction executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    locals: Vec<SourceSet>,
    stack: Vec<StackValue>,
}

impl Frame {
    /// The method entry state: parameter slots hold empty sets, the stack is empty.
    #[must_use]
    pub fn entry(body: &MethodBody) -> Self {
        Frame {
            locals: vec![SourceSet::empty(); usize::from(body.max_locals())],
            stack: Vec::new(),
        }
    }

    /// The sources of local slot `slot`.
    #[must_use]
    pub fn local(&self, slot: u16) -> Option<&SourceSet> {
        self.locals.get(usize::from(slot))
    }

    /// Current operand-stack depth, counted in values (a wide value is one).
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// The stack value `depth` positions below the top (0 = top of stack).
    #[must_use]
    pub fn value_from_top(&self, depth: usize) -> Option<&SourceSet> {
        self.stack.len().checked_sub(depth + 1).map(|i| &self.stack[i].sources)
    }

    /// Whether the stack value `depth` positions below the top occupies two slots.
    #[must_use]
    pub fn value_is_wide(&self, depth: usize) -> Option<bool> {
        self.stack.len().checked_sub(depth + 1).map(|i| self.stack[i].wide)
    }

    /// The stack values, bottom first.
    pub fn stack(&self) -> impl Iterator<Item = &SourceSet> + '_ {
        self.stack.iter().map(|v| &v.sources)
    }

    /// Merges `other` into `self`, unioning every slot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Consistency`] when the two stacks differ in depth or in
    /// the width of any value.
    pub fn merge(&mut self, other: &Frame) -> Result<bool> {
        if self.stack.len() != other.stack.len() {
            return Err(consistency_error!(
                "stack depth mismatch at merge: {} vs {}",
                self.stack.len(),
                other.stack.len()
            ));
        }
        let mut changed = false;
        for (mine, theirs) in self.locals.iter_mut().zip(&other.locals) {
            changed |= mine.union_with(theirs);
        }
        for (mine, theirs) in self.stack.iter_mut().zip(&other.stack) {
            if mine.wide != theirs.wide {
                return Err(consistency_error!("stack value width mismatch at merge"));
            }
            changed |= mine.sources.union_with(&theirs.sources);
        }
        Ok(changed)
    }

    /// The frame an exception handler sees when thrown to from this state: same locals,
    /// stack replaced by the single caught-exception value (which has no producing
    /// instruction in this method).
    #[must_use]
    fn handler_entry(&self) -> Frame {
        Frame {
            locals: self.locals.clone(),
            stack: vec![StackValue::narrow(SourceSet::empty())],
        }
    }

    fn pop(&mut self, index: u32, needed: usize) -> Result<StackValue> {
        self.stack.pop().ok_or(crate::Error::StackUnderflow {
            index,
            needed,
            depth: 0,
        })
    }
}

/// Simulates `body`, returning the pre-state frame of every instruction.
///
/// Unreachable instructions have no frame (`None`). Exception handlers are entered from
/// every instruction inside their protected range, with the locals at that point and a
/// one-value stack.
///
/// # Errors
///
/// Returns [`crate::Error::StackUnderflow`] or [`crate::Error::Consistency`] when the
/// instruction stream and the stack model disagree.
pub fn simulate(body: &MethodBody) -> Result<Vec<Option<Frame>>> {
    let len = body.len();
    let mut frames: Vec<Option<Frame>> = vec![None; len];
    frames[0] = Some(Frame::entry(body));

    let mut worklist: Vec<u32> = vec![0];
    while let Some(index) = worklist.pop() {
        let insn = &body.instructions()[index as usize];
        let pre = frames[index as usize].clone().unwrap_or_else(|| Frame::entry(body));

        // Handler entries merge the pre-state of every covered instruction.
        for h in body.handlers() {
            if h.start <= index && index < h.end {
                merge_into(&mut frames, &mut worklist, h.handler, pre.handler_entry())?;
            }
        }

        let post = execute(body, index, insn, pre)?;
        for succ in successors(body, index, insn)? {
            merge_into(&mut frames, &mut worklist, succ, post.clone())?;
        }
    }

    Ok(frames)
}

fn merge_into(
    frames: &mut [Option<Frame>],
    worklist: &mut Vec<u32>,
    target: u32,
    frame: Frame,
) -> Result<()> {
    match &mut frames[target as usize] {
        slot @ None => {
            *slot = Some(frame);
            worklist.push(target);
        }
        Some(existing) => {
            if existing.merge(&frame)? {
                worklist.push(target);
            }
        }
    }
    Ok(())
}

/// Instruction-level successor indices.
fn successors(
    body: &MethodBody,
    index: u32,
    insn: &crate::bytecode::Instruction,
) -> Result<Vec<u32>> {
    let next = || -> Result<u32> {
        let next = index + 1;
        if (next as usize) < body.len() {
            Ok(next)
        } else {
            Err(consistency_error!("control falls off the end after {}", insn))
        }
    };
    Ok(match insn.category() {
        OpcodeCategory::Return | OpcodeCategory::Throw | OpcodeCategory::Ret => Vec::new(),
        OpcodeCategory::Goto => match insn.payload() {
            Payload::Jump { target } => vec![*target],
            _ => Vec::new(),
        },
        OpcodeCategory::If | OpcodeCategory::IfCmp | OpcodeCategory::Jsr => match insn.payload() {
            Payload::Jump { target } => vec![*target, next()?],
            _ => vec![next()?],
        },
        OpcodeCategory::Switch => match insn.payload() {
            Payload::Switch(table) => {
                let mut targets: Vec<u32> = table.cases.iter().map(|(_, t)| *t).collect();
                targets.push(table.default);
                targets.dedup();
                targets
            }
            _ => Vec::new(),
        },
        _ => vec![next()?],
    })
}

/// Applies one instruction to a frame.
fn execute(
    body: &MethodBody,
    index: u32,
    insn: &crate::bytecode::Instruction,
    mut frame: Frame,
) -> Result<Frame> {
    // The dup/pop/swap family reshuffles values structurally instead of pop-then-push.
    if insn.category() == OpcodeCategory::Stack {
        return execute_stack_op(index, insn.opcode(), frame);
    }

    if insn.category() == OpcodeCategory::Store || insn.category() == OpcodeCategory::Iinc {
        if insn.category() == OpcodeCategory::Store {
            check_depth(&frame, index, 1)?;
            frame.stack.pop();
        }
        if let Some(slot) = insn.local_slot() {
            if let Some(local) = frame.locals.get_mut(usize::from(slot)) {
                *local = SourceSet::of(index);
            }
        }
        return Ok(frame);
    }

    let pops = match stack_demand(insn) {
        StackDemand::Fixed(n) => usize::from(n),
        StackDemand::ProbeStack => match insn.payload() {
            Payload::MultiArray { dimensions, .. } => usize::from(*dimensions),
            _ => 0,
        },
    };
    check_depth(&frame, index, pops)?;
    frame.stack.truncate(frame.stack.len() - pops);

    if pushes_value(insn) {
        frame.stack.push(StackValue {
            sources: SourceSet::of(index),
            wide: pushes_wide(insn),
        });
    }
    debug_assert!(frame.locals.len() == usize::from(body.max_locals()));
    Ok(frame)
}

fn check_depth(frame: &Frame, index: u32, needed: usize) -> Result<()> {
    if frame.stack.len() < needed {
        return Err(crate::Error::StackUnderflow {
            index,
            needed,
            depth: frame.stack.len(),
        });
    }
    Ok(())
}

/// The `dup`/`pop`/`swap` family. Slot-counted opcodes pick their form from the width of
/// the values actually on the stack, per JVM category-1/category-2 semantics.
fn execute_stack_op(index: u32, op: u8, mut frame: Frame) -> Result<Frame> {
    let copy = |wide: bool| StackValue { sources: SourceSet::of(index), wide };
    match op {
        opcode::POP => {
            frame.pop(index, 1)?;
        }
        opcode::POP2 => {
            // one wide value or two narrow ones
            let v1 = frame.pop(index, 2)?;
            if !v1.wide {
                frame.pop(index, 2)?;
            }
        }
        opcode::DUP => {
            let v1 = frame.pop(index, 1)?;
            frame.stack.push(v1);
            frame.stack.push(copy(false));
        }
        opcode::DUP_X1 => {
            check_depth(&frame, index, 2)?;
            let v1 = frame.pop(index, 2)?;
            let v2 = frame.pop(index, 2)?;
            frame.stack.push(copy(false));
            frame.stack.push(v2);
            frame.stack.push(v1);
        }
        opcode::DUP_X2 => {
            check_depth(&frame, index, 2)?;
            let v1 = frame.pop(index, 3)?;
            let v2 = frame.pop(index, 3)?;
            if v2.wide {
                frame.stack.push(copy(false));
            } else {
                let v3 = frame.pop(index, 3)?;
                frame.stack.push(copy(false));
                frame.stack.push(v3);
            }
            frame.stack.push(v2);
            frame.stack.push(v1);
        }
        opcode::DUP2 => {
            let v1 = frame.pop(index, 2)?;
            if v1.wide {
                frame.stack.push(v1);
                frame.stack.push(copy(true));
            } else {
                let v2 = frame.pop(index, 2)?;
                frame.stack.push(v2);
                frame.stack.push(v1);
                frame.stack.push(copy(false));
                frame.stack.push(copy(false));
            }
        }
        opcode::DUP2_X1 => {
            check_depth(&frame, index, 2)?;
            let v1 = frame.pop(index, 3)?;
            let v2 = frame.pop(index, 3)?;
            if v1.wide {
                frame.stack.push(copy(true));
            } else {
                let v3 = frame.pop(index, 3)?;
                frame.stack.push(copy(false));
                frame.stack.push(copy(false));
                frame.stack.push(v3);
            }
            frame.stack.push(v2);
            frame.stack.push(v1);
        }
        opcode::DUP2_X2 => {
            check_depth(&frame, index, 2)?;
            let v1 = frame.pop(index, 4)?;
            let v2 = frame.pop(index, 4)?;
            if v1.wide && v2.wide {
                frame.stack.push(copy(true));
            } else if v1.wide {
                let v3 = frame.pop(index, 4)?;
                frame.stack.push(copy(true));
                frame.stack.push(v3);
            } else {
                let v3 = frame.pop(index, 4)?;
                if v3.wide {
                    frame.stack.push(copy(false));
                    frame.stack.push(copy(false));
                } else {
                    let v4 = frame.pop(index, 4)?;
                    frame.stack.push(copy(false));
                    frame.stack.push(copy(false));
                    frame.stack.push(v4);
                }
                frame.stack.push(v3);
            }
            frame.stack.push(v2);
            frame.stack.push(v1);
        }
        opcode::SWAP => {
            check_depth(&frame, index, 2)?;
            frame.pop(index, 2)?;
            frame.pop(index, 2)?;
            frame.stack.push(copy(false));
            frame.stack.push(copy(false));
        }
        _ => unreachable!("stack category covers exactly nine opcodes"),
    }
    Ok(frame)
}
