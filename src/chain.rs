//! Error chain analysis.
//!
//! # Responsibilities
//! - Walk an error's causes from outermost to root
//! - Collect each link's message and, where the link is operation-tagged,
//!   its operation label
//! - Stay bounded: a hop cap, plus message-equality cycle detection for
//!   generic links
//!
//! # Design Decisions
//! - Operation tagging is a capability ([`OperationError`]) found through
//!   registered matchers, not a type switch inside the walker
//! - Generic links fall back to `Error::source`
//! - The walk is iterative; no recursion on the error depth

use std::borrow::Cow;
use std::collections::HashSet;
use std::error::Error as StdError;
use std::fmt;

/// Maximum number of links followed.
pub const MAX_CHAIN_HOPS: usize = 50;

/// An error that names the operation that failed and exposes its cause.
pub trait OperationError: StdError {
    /// Short subsystem/action label, e.g. `db.Connect`.
    fn operation(&self) -> &str;

    /// The underlying error, if any.
    fn op_source(&self) -> Option<&(dyn StdError + 'static)>;
}

/// Recognises an error as operation-tagged.
pub type OperationMatcher =
    for<'a> fn(&'a (dyn StdError + 'static)) -> Option<&'a dyn OperationError>;

/// Result of walking one error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorChain {
    /// Messages, outermost first.
    pub chain: Vec<String>,
    /// Operation labels aligned with `chain`; empty for generic links.
    pub ops: Vec<String>,
    /// Innermost message.
    pub root: String,
    /// Innermost label (possibly empty).
    pub root_op: String,
}

impl ErrorChain {
    /// `outer -> ... -> inner`.
    pub fn history(&self) -> String {
        self.chain.join(" -> ")
    }
}

/// Error chain walker with a set of operation matchers.
#[derive(Clone)]
pub struct ChainAnalyzer {
    matchers: Vec<OperationMatcher>,
    max_hops: usize,
}

impl fmt::Debug for ChainAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainAnalyzer")
            .field("matchers", &self.matchers.len())
            .field("max_hops", &self.max_hops)
            .finish()
    }
}

impl Default for ChainAnalyzer {
    fn default() -> Self {
        Self {
            matchers: vec![match_op_error as OperationMatcher],
            max_hops: MAX_CHAIN_HOPS,
        }
    }
}

impl ChainAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register another way of recognising operation-tagged errors.
    pub fn with_matcher(mut self, matcher: OperationMatcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    fn as_operation<'a>(
        &self,
        err: &'a (dyn StdError + 'static),
    ) -> Option<&'a dyn OperationError> {
        self.matchers.iter().find_map(|matcher| matcher(err))
    }

    /// Walk `err` from the outside in.
    pub fn analyze(&self, err: &(dyn StdError + 'static)) -> ErrorChain {
        let mut out = ErrorChain::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut current = Some(err);
        let mut hops = 0;

        while let Some(e) = current {
            if hops >= self.max_hops {
                break;
            }
            hops += 1;

            if let Some(tagged) = self.as_operation(e) {
                out.chain.push(tagged.to_string());
                out.ops.push(tagged.operation().to_string());
                current = tagged.op_source();
                continue;
            }

            let message = e.to_string();
            if !seen.insert(message.clone()) {
                break;
            }
            out.chain.push(message);
            out.ops.push(String::new());
            current = e.source();
        }

        out.root = out.chain.last().cloned().unwrap_or_default();
        out.root_op = out.ops.last().cloned().unwrap_or_default();
        out
    }
}

/// Walk `err` with the default analyzer.
pub fn analyze(err: &(dyn StdError + 'static)) -> ErrorChain {
    ChainAnalyzer::default().analyze(err)
}

fn match_op_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a dyn OperationError> {
    err.downcast_ref::<OpError>()
        .map(|e| e as &dyn OperationError)
}

/// Operation-tagged error.
///
/// Displays only its own message; the cause is reachable through
/// [`OperationError::op_source`] and `Error::source`.
#[derive(Debug)]
pub struct OpError {
    op: Cow<'static, str>,
    message: String,
    cause: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl OpError {
    pub fn new(op: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the underlying error.
    pub fn with_cause(mut self, cause: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn op(&self) -> &str {
        &self.op
    }
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for OpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

impl OperationError for OpError {
    fn operation(&self) -> &str {
        &self.op
    }

    fn op_source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source()
    }
}
