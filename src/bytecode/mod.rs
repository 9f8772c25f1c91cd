//! The instruction model: decoded instructions, method bodies, descriptors, and the static
//! stack-effect table.
//!
//! This module is the input boundary of the crate. A decoder (class-file parser,
//! instrumentation agent, test fixture) produces [`MethodBody`] values; everything in
//! [`crate::analysis`] consumes them read-only. Branch and switch targets are instruction
//! indices - offset resolution belongs to the decoder.

pub mod arity;
pub mod descriptor;
pub mod instruction;
pub mod method;
pub mod opcode;

pub use arity::{pushes_value, pushes_wide, stack_demand, StackDemand};
pub use descriptor::{AccessFlags, MethodDescriptor, ParamType};
pub use instruction::{ConstValue, FieldRef, Instruction, MethodRef, Payload, SwitchTable};
pub use method::{ExceptionHandler, MethodBody, MethodKey};
pub use opcode::OpcodeCategory;
