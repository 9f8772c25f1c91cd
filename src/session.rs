//! The analysis session: a concurrent, build-once cache of method analyses.
//!
//! Sessions replace any notion of a global analysis cache. Each session owns a
//! [`DashMap`] keyed by [`MethodKey`]; the entry API guarantees a method is analyzed at
//! most once per session even under concurrent `analyze` calls, and every caller shares
//! the same immutable [`MethodAnalysis`] through an `Arc`. Batch analysis fans out over
//! rayon and isolates per-method failures - one malformed method never aborts its
//! siblings.

use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use log::debug;
use rayon::prelude::*;

use crate::analysis::MethodAnalysis;
use crate::bytecode::{MethodBody, MethodKey};
use crate::Result;

/// A concurrent cache of method analyses.
///
/// # Examples
///
/// ```rust
/// use classflow::AnalysisSession;
/// use classflow::bytecode::{opcode, AccessFlags, Instruction, MethodBody, Payload};
///
/// let session = AnalysisSession::new();
/// let insns = vec![
///     Instruction::new("Demo", "id", 0, 0, opcode::ILOAD_0, Payload::None),
///     Instruction::new("Demo", "id", 1, 1, opcode::IRETURN, Payload::None),
/// ];
/// let body = MethodBody::new("Demo", "id", "(I)I", AccessFlags::ACC_STATIC, 1, insns, vec![])
///     .unwrap();
///
/// let first = session.analyze(body.clone()).unwrap();
/// let second = session.analyze(body).unwrap();
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// ```
#[derive(Default)]
pub struct AnalysisSession {
    cache: DashMap<MethodKey, Arc<MethodAnalysis>>,
}

impl AnalysisSession {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        AnalysisSession { cache: DashMap::new() }
    }

    /// Analyzes `body`, or returns the cached analysis of the same method.
    ///
    /// Concurrent calls for the same key block on one entry; exactly one performs the
    /// analysis. Failed analyses are not cached, so a later corrected body can succeed.
    ///
    /// # Errors
    ///
    /// Propagates any [`crate::Error`] from the analysis pipeline.
    pub fn analyze(&self, body: MethodBody) -> Result<Arc<MethodAnalysis>> {
        let key = body.key();
        match self.cache.entry(key) {
            Entry::Occupied(entry) => {
                debug!("analysis cache hit for {}", entry.key());
                Ok(Arc::clone(entry.get()))
            }
            Entry::Vacant(entry) => {
                let analysis = Arc::new(MethodAnalysis::analyze(body)?);
                entry.insert(Arc::clone(&analysis));
                Ok(analysis)
            }
        }
    }

    /// The cached analysis for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &MethodKey) -> Option<Arc<MethodAnalysis>> {
        self.cache.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Analyzes a batch of independent methods in parallel.
    ///
    /// Results come back in input order; each method's failure is isolated in its own
    /// slot.
    pub fn analyze_all(&self, bodies: Vec<MethodBody>) -> Vec<Result<Arc<MethodAnalysis>>> {
        bodies.into_par_iter().map(|body| self.analyze(body)).collect()
    }

    /// Number of cached analyses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// `true` when nothing has been analyzed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drops all cached analyses.
    pub fn clear(&self) {
        self.cache.clear();
    }
}
