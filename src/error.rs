use thiserror::Error;

macro_rules! consistency_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Consistency {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Consistency {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! malformed_error {
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all failure modes of method analysis: malformed input bodies, internal
/// consistency violations detected while simulating or partitioning a method, and graph
/// construction failures. Each variant provides specific context about the failure mode to
/// enable appropriate error handling.
///
/// Recoverable conditions are deliberately *not* errors: an ambiguous operand source, a
/// stack-depth query past the modeled stack, or an unrecognized opcode all degrade to
/// `None`/empty results with a diagnostic log entry, because a partial analysis is still
/// useful to callers.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - The method body itself is invalid (empty, branch target out of
///   range)
///
/// ## Analysis Errors
/// - [`Error::Consistency`] - An internal invariant was violated (frames attached twice,
///   block-partition conflict, stack-depth mismatch at a merge point)
/// - [`Error::StackUnderflow`] - An instruction popped more values than the modeled stack
///   holds, meaning the arity model and the instruction stream disagree
/// - [`Error::GraphError`] - Control-flow or control-dependence graph construction failed
///
/// # Examples
///
/// ```rust,no_run
/// use classflow::{AnalysisSession, Error};
/// use classflow::bytecode::MethodBody;
///
/// fn report(session: &AnalysisSession, body: MethodBody) {
///     match session.analyze(body) {
///         Ok(analysis) => println!("{} blocks", analysis.cfg().block_count()),
///         Err(Error::Malformed { message, file, line }) => {
///             eprintln!("bad method body: {} ({}:{})", message, file, line);
///         }
///         Err(e) => eprintln!("analysis failed: {}", e),
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The method body is invalid and cannot be analyzed.
    ///
    /// Raised during [`crate::bytecode::MethodBody`] construction when the instruction
    /// sequence is empty, a branch or switch target points outside the sequence, or an
    /// exception-table entry references an instruction that does not exist.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An internal analysis invariant was violated.
    ///
    /// This covers the fatal consistency conditions of the engine: attaching frames to a
    /// method analysis more than once, an instruction claimed by two basic blocks, or two
    /// control-flow paths meeting with different stack depths.
    #[error("Consistency violation - {file}:{line}: {message}")]
    Consistency {
        /// The message to be printed for the Consistency error
        message: String,
        /// The source file in which this error was detected
        file: &'static str,
        /// The source line in which this error was detected
        line: u32,
    },

    /// An instruction consumed more stack values than the modeled stack holds.
    ///
    /// The frame simulator tracks the operand stack per instruction; if an instruction's
    /// pop count exceeds the current modeled depth, the instruction stream and the arity
    /// model disagree and the method cannot be analyzed.
    #[error("Stack underflow at instruction {index}: need {needed} values, stack holds {depth}")]
    StackUnderflow {
        /// Index of the offending instruction within the method
        index: u32,
        /// Number of values the instruction pops
        needed: usize,
        /// Modeled stack depth before the instruction
        depth: usize,
    },

    /// Control-flow or control-dependence graph construction failed.
    #[error("{0}")]
    GraphError(String),
}
