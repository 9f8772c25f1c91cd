//! The variable-dependency graph.
//!
//! Classifies variable-producing instructions and records how values derive from one
//! another: reading `this.y` produces an instance-field variable derived from the receiver
//! variable, `a + b` produces nothing but links both parameter variables into whatever
//! consumes the sum. Nodes live in an arena indexed by [`VarId`]; relation lists hold ids,
//! so cyclic derivations are representable without interior mutability.
//!
//! Edges are kept in both directions and always mutually: a forward edge runs from
//! producer to derived value, the matching reverse edge from derived value back to its
//! producer. The relation kind is classified by the *derived* instruction: derivations
//! consumed by a field access are [`RelationKind::Field`], everything else is
//! [`RelationKind::Other`]. Root resolution walks reverse field edges toward the receiver
//! or a parameter; path discovery walks forward edges.

use std::collections::HashMap;

use log::warn;
use strum::Display;

use crate::analysis::frames::Frame;
use crate::bytecode::{
    arity::{stack_demand, StackDemand},
    opcode, Instruction, MethodBody, Payload,
};

/// What kind of variable an instruction produces.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// A load of a declared-parameter slot.
    Parameter,
    /// A `getstatic`/`putstatic` field access.
    StaticField,
    /// A `getfield`/`putfield` field access.
    InstanceField,
    /// A load of the receiver slot in an instance method.
    This,
    /// Any other value-producing instruction.
    Other,
}

/// How one variable derives from another.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// The derived value is a field access on the producer.
    Field,
    /// Every other derivation (arithmetic, calls, array access, ...).
    Other,
}

/// Arena index of a [`DepVariable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub usize);

impl VarId {
    /// The underlying index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One variable node: a classified instruction plus its derivation edges.
///
/// Identity is the underlying instruction; the display name is presentation only.
#[derive(Debug, Clone)]
pub struct DepVariable {
    instruction: u32,
    name: String,
    kind: VariableKind,
    param_order: Option<usize>,
    relations: HashMap<RelationKind, Vec<VarId>>,
    reverse: HashMap<RelationKind, Vec<VarId>>,
}

impl DepVariable {
    /// Index of the underlying instruction.
    #[must_use]
    pub fn instruction(&self) -> u32 {
        self.instruction
    }

    /// Display name: `this`, `LV_<slot>`, `<owner>.<field>`, or the mnemonic.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variable's classification.
    #[must_use]
    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    /// Forward edges of `kind`: variables derived from this one.
    #[must_use]
    pub fn relations(&self, kind: RelationKind) -> &[VarId] {
        self.relations.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Reverse edges of `kind`: variables this one was derived from.
    #[must_use]
    pub fn reverse_relations(&self, kind: RelationKind) -> &[VarId] {
        self.reverse.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// All forward edges, any kind.
    pub fn all_relations(&self) -> impl Iterator<Item = VarId> + '_ {
        self.relations.values().flatten().copied()
    }
}

/// The variable-dependency graph of one method.
pub struct DependencyGraph {
    nodes: Vec<DepVariable>,
    by_instruction: HashMap<u32, VarId>,
}

impl DependencyGraph {
    /// Builds the graph from simulated frames: every consumed stack value links its
    /// producers into its consumer.
    #[must_use]
    pub fn build(body: &MethodBody, frames: &[Option<Frame>]) -> Self {
        let mut graph = DependencyGraph { nodes: Vec::new(), by_instruction: HashMap::new() };

        for (index, insn) in body.instructions().iter().enumerate() {
            let index = index as u32;
            let Some(frame) = frames.get(index as usize).and_then(Option::as_ref) else {
                continue;
            };
            let pops = match stack_demand(insn) {
                StackDemand::Fixed(n) => usize::from(n),
                StackDemand::ProbeStack => match insn.payload() {
                    Payload::MultiArray { dimensions, .. } => usize::from(*dimensions),
                    _ => 0,
                },
            };
            if pops == 0 {
                continue;
            }
            // Bottom-most consumed value first, so a field write records its object
            // reference before the stored value and root walks hit the receiver first.
            for depth in (0..pops).rev() {
                let Some(sources) = frame.value_from_top(depth) else {
                    warn!("operand {} of {} missing from the recorded frame", depth, insn);
                    continue;
                };
                for source in sources.iter() {
                    let producer = graph.intern(body, source);
                    let consumer = graph.intern(body, index);
                    graph.link(producer, consumer, body);
                }
            }
        }

        graph
    }

    /// Classification of an instruction as a variable.
    #[must_use]
    pub fn classify(body: &MethodBody, insn: &Instruction) -> VariableKind {
        match insn.opcode() {
            opcode::GETSTATIC | opcode::PUTSTATIC => return VariableKind::StaticField,
            opcode::GETFIELD | opcode::PUTFIELD => return VariableKind::InstanceField,
            _ => {}
        }
        if insn.is_local_load() {
            if let Some(slot) = insn.local_slot() {
                if body.slot_is_receiver(slot) {
                    return VariableKind::This;
                }
                if body.param_for_slot(slot).is_some() {
                    return VariableKind::Parameter;
                }
            }
        }
        VariableKind::Other
    }

    fn intern(&mut self, body: &MethodBody, index: u32) -> VarId {
        if let Some(&id) = self.by_instruction.get(&index) {
            return id;
        }
        let insn = &body.instructions()[index as usize];
        let kind = Self::classify(body, insn);
        let name = match (kind, insn.payload()) {
            (VariableKind::This, _) => "this".to_string(),
            (VariableKind::StaticField | VariableKind::InstanceField, Payload::Field(field)) => {
                field.to_string()
            }
            _ => match insn.local_slot() {
                Some(slot) if insn.is_local_load() => format!("LV_{}", slot),
                _ => insn.mnemonic().to_string(),
            },
        };
        let param_order = if kind == VariableKind::Parameter {
            insn.local_slot().and_then(|slot| body.param_for_slot(slot))
        } else {
            None
        };
        let id = VarId(self.nodes.len());
        self.nodes.push(DepVariable {
            instruction: index,
            name,
            kind,
            param_order,
            relations: HashMap::new(),
            reverse: HashMap::new(),
        });
        self.by_instruction.insert(index, id);
        id
    }

    /// Records a derivation edge, forward and reverse mutually, deduplicated.
    fn link(&mut self, producer: VarId, consumer: VarId, body: &MethodBody) {
        let consumer_insn = &body.instructions()[self.nodes[consumer.index()].instruction as usize];
        let kind = if consumer_insn.is_field_access() {
            RelationKind::Field
        } else {
            RelationKind::Other
        };

        let forward = self.nodes[producer.index()].relations.entry(kind).or_default();
        if !forward.contains(&consumer) {
            forward.push(consumer);
        }
        let reverse = self.nodes[consumer.index()].reverse.entry(kind).or_default();
        if !reverse.contains(&producer) {
            reverse.push(producer);
        }
    }

    /// Number of variable nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when no instruction consumed any operand.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node with the given id.
    #[must_use]
    pub fn node(&self, id: VarId) -> &DepVariable {
        &self.nodes[id.index()]
    }

    /// The variable node of an instruction, when it participates in any derivation.
    #[must_use]
    pub fn var_of_instruction(&self, index: u32) -> Option<VarId> {
        self.by_instruction.get(&index).copied()
    }

    /// Iterator over all nodes.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, &DepVariable)> {
        self.nodes.iter().enumerate().map(|(i, node)| (VarId(i), node))
    }

    /// Resolves the object root of a field-access chain.
    ///
    /// Follows the first reverse field edge hop by hop until a receiver or parameter
    /// variable is reached. Returns `None` when a hop has no reverse field edge or the
    /// walk revisits a node (cyclic relations). The result is always `This` or
    /// `Parameter`, never a field or intermediate value; a start node that is itself a
    /// receiver or parameter resolves to itself.
    #[must_use]
    pub fn resolve_root(&self, start: VarId) -> Option<VarId> {
        let mut visited = vec![false; self.nodes.len()];
        let mut current = start;
        loop {
            let node = &self.nodes[current.index()];
            match node.kind() {
                VariableKind::This | VariableKind::Parameter => return Some(current),
                _ => {}
            }
            if visited[current.index()] {
                return None;
            }
            visited[current.index()] = true;
            current = *node.reverse_relations(RelationKind::Field).first()?;
        }
    }

    /// Finds a derivation path from `start` to `target` along forward edges.
    ///
    /// Depth-first; a node never appears twice in the returned path. The path includes
    /// both endpoints. `None` when no path exists.
    #[must_use]
    pub fn find_path(&self, start: VarId, target: VarId) -> Option<Vec<VarId>> {
        let mut path = vec![start];
        if self.dfs_path(start, target, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn dfs_path(&self, current: VarId, target: VarId, path: &mut Vec<VarId>) -> bool {
        if current == target {
            return true;
        }
        for next in self.nodes[current.index()].all_relations() {
            if path.contains(&next) {
                continue;
            }
            path.push(next);
            if self.dfs_path(next, target, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    /// The 0-based declared-argument order of a parameter variable.
    ///
    /// Derived from the descriptor slot walk (wide parameters occupy two slots, the
    /// receiver none). `None` for non-parameter variables.
    #[must_use]
    pub fn parameter_order(&self, id: VarId) -> Option<usize> {
        self.nodes[id.index()].param_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::frames::simulate;
    use crate::bytecode::{opcode::*, AccessFlags, FieldRef, Instruction, MethodBody};

    fn build_graph(descriptor: &str, flags: AccessFlags, max_locals: u16, ops: Vec<(u8, Payload)>) -> (MethodBody, DependencyGraph) {
        let insns = ops
            .into_iter()
            .enumerate()
            .map(|(i, (op, payload))| Instruction::new("Demo", "m", i as u32, i as u32, op, payload))
            .collect();
        let body = MethodBody::new("Demo", "m", descriptor, flags, max_locals, insns, vec![]).unwrap();
        let frames = simulate(&body).unwrap();
        let graph = DependencyGraph::build(&body, &frames);
        (body, graph)
    }

    fn field(name: &str) -> Payload {
        Payload::Field(FieldRef::new("Demo", name, "I"))
    }

    #[test]
    fn parameters_classify_with_orders() {
        // instance int add(int a, int b) { return a + b; }
        let (_, graph) = build_graph(
            "(II)I",
            AccessFlags::ACC_PUBLIC,
            3,
            vec![
                (ILOAD_1, Payload::None),
                (ILOAD_2, Payload::None),
                (IADD, Payload::None),
                (IRETURN, Payload::None),
            ],
        );
        let a = graph.var_of_instruction(0).unwrap();
        let b = graph.var_of_instruction(1).unwrap();
        assert_eq!(graph.node(a).kind(), VariableKind::Parameter);
        assert_eq!(graph.node(a).name(), "LV_1");
        assert_eq!(graph.parameter_order(a), Some(0));
        assert_eq!(graph.parameter_order(b), Some(1));
    }

    #[test]
    fn field_copy_links_through_this() {
        // this.x = this.y
        let (_, graph) = build_graph(
            "()V",
            AccessFlags::ACC_PUBLIC,
            1,
            vec![
                (ALOAD_0, Payload::None),   // receiver for putfield
                (ALOAD_0, Payload::None),   // receiver for getfield
                (GETFIELD, field("y")),
                (PUTFIELD, field("x")),
                (RETURN, Payload::None),
            ],
        );

        let this_for_read = graph.var_of_instruction(1).unwrap();
        let y_read = graph.var_of_instruction(2).unwrap();
        let x_write = graph.var_of_instruction(3).unwrap();

        assert_eq!(graph.node(this_for_read).kind(), VariableKind::This);
        assert_eq!(graph.node(y_read).kind(), VariableKind::InstanceField);
        assert_eq!(graph.node(y_read).name(), "Demo.y");
        assert_eq!(graph.node(x_write).kind(), VariableKind::InstanceField);

        // exactly one reverse field edge from the read, straight to the receiver
        assert_eq!(graph.node(y_read).reverse_relations(RelationKind::Field), &[this_for_read]);
        // forward edge is the mutual mirror
        assert_eq!(graph.node(this_for_read).relations(RelationKind::Field), &[y_read]);
    }

    #[test]
    fn resolve_root_walks_field_chain() {
        let (_, graph) = build_graph(
            "()V",
            AccessFlags::ACC_PUBLIC,
            1,
            vec![
                (ALOAD_0, Payload::None),
                (ALOAD_0, Payload::None),
                (GETFIELD, field("y")),
                (PUTFIELD, field("x")),
                (RETURN, Payload::None),
            ],
        );
        let y_read = graph.var_of_instruction(2).unwrap();
        let root = graph.resolve_root(y_read).unwrap();
        assert_eq!(graph.node(root).kind(), VariableKind::This);

        let x_write = graph.var_of_instruction(3).unwrap();
        let root = graph.resolve_root(x_write).unwrap();
        assert_eq!(graph.node(root).kind(), VariableKind::This);
    }

    #[test]
    fn resolve_root_of_a_receiver_is_itself() {
        let (_, graph) = build_graph(
            "()V",
            AccessFlags::ACC_PUBLIC,
            1,
            vec![
                (ALOAD_0, Payload::None),
                (ALOAD_0, Payload::None),
                (GETFIELD, field("y")),
                (PUTFIELD, field("x")),
                (RETURN, Payload::None),
            ],
        );
        let this_var = graph.var_of_instruction(1).unwrap();
        assert_eq!(graph.node(this_var).kind(), VariableKind::This);
        assert_eq!(graph.resolve_root(this_var), Some(this_var));
    }

    #[test]
    fn resolve_root_fails_without_field_parents() {
        let (_, graph) = build_graph(
            "(I)I",
            AccessFlags::ACC_STATIC,
            1,
            vec![
                (GETSTATIC, field("counter")),
                (IRETURN, Payload::None),
            ],
        );
        let counter = graph.var_of_instruction(0).unwrap();
        assert_eq!(graph.node(counter).kind(), VariableKind::StaticField);
        assert_eq!(graph.resolve_root(counter), None);
    }

    #[test]
    fn find_path_follows_forward_edges() {
        let (_, graph) = build_graph(
            "()V",
            AccessFlags::ACC_PUBLIC,
            1,
            vec![
                (ALOAD_0, Payload::None),
                (ALOAD_0, Payload::None),
                (GETFIELD, field("y")),
                (PUTFIELD, field("x")),
                (RETURN, Payload::None),
            ],
        );
        let this_var = graph.var_of_instruction(1).unwrap();
        let x_write = graph.var_of_instruction(3).unwrap();

        let path = graph.find_path(this_var, x_write).unwrap();
        assert_eq!(path.first(), Some(&this_var));
        assert_eq!(path.last(), Some(&x_write));
        // no node repeats
        for (i, id) in path.iter().enumerate() {
            assert!(!path[i + 1..].contains(id));
        }

        assert_eq!(graph.find_path(x_write, this_var), None);
    }

    #[test]
    fn relations_are_mutual() {
        let (_, graph) = build_graph(
            "(II)I",
            AccessFlags::ACC_STATIC,
            2,
            vec![
                (ILOAD_0, Payload::None),
                (ILOAD_1, Payload::None),
                (IADD, Payload::None),
                (IRETURN, Payload::None),
            ],
        );
        for (id, node) in graph.iter() {
            for kind in [RelationKind::Field, RelationKind::Other] {
                for &derived in node.relations(kind) {
                    assert!(graph.node(derived).reverse_relations(kind).contains(&id));
                }
                for &producer in node.reverse_relations(kind) {
                    assert!(graph.node(producer).relations(kind).contains(&id));
                }
            }
        }
    }

    #[test]
    fn unreachable_code_contributes_nothing() {
        let (_, graph) = build_graph(
            "()V",
            AccessFlags::ACC_STATIC,
            1,
            vec![
                (GOTO, Payload::Jump { target: 3 }),
                (ICONST_0, Payload::None), // dead
                (ISTORE_0, Payload::None), // dead
                (RETURN, Payload::None),
            ],
        );
        assert!(graph.var_of_instruction(1).is_none());
        assert!(graph.var_of_instruction(2).is_none());
    }
}
