//! Error types for graph construction.

use std::fmt;

use thiserror::Error;

use crate::graph::NodeId;

/// Error type returned by factories and work functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, GraphError>;

/// Everything that can stop a graph from being produced.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The engine was used in a way its state does not allow, such as
    /// submitting work after completion was requested.
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    /// A recorded reference points at a key that was never discovered.
    #[error("reference to undiscovered key {key}")]
    KeyNotFound { key: String },

    /// The graph contains a cycle. `path` starts and ends at the same node.
    #[error("there is a circular dependency involving the following nodes: {}", path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    /// One or more discovery tasks failed.
    #[error("{} discovery task(s) failed: {}", failures.len(), Failures(failures))]
    Discovery { failures: Vec<TaskFailure> },

    #[error("graph construction was cancelled")]
    Cancelled,

    #[error("no edge recorded from {from} to {to}")]
    EdgeNotFound { from: NodeId, to: NodeId },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to spawn worker thread: {0}")]
    SpawnWorker(#[source] std::io::Error),
}

impl GraphError {
    pub(crate) fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// The failures behind a `Discovery` error, empty for every other variant.
    pub fn failures(&self) -> &[TaskFailure] {
        match self {
            Self::Discovery { failures } => failures,
            _ => &[],
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// A single work item that failed, with the key it was registered under.
#[derive(Debug, Error)]
#[error("{key}: {error}")]
pub struct TaskFailure {
    pub key: String,
    #[source]
    pub error: BoxError,
}

/// Raised in place of a work function that panicked.
#[derive(Debug, Error)]
#[error("work function panicked: {message}")]
pub struct PanicError {
    pub message: String,
}

struct Failures<'a>(&'a [TaskFailure]);

impl fmt::Display for Failures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_path() {
        let err = GraphError::CycleDetected {
            path: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(
            err.to_string(),
            "there is a circular dependency involving the following nodes: A -> B -> A"
        );
    }

    #[test]
    fn discovery_message_joins_failures() {
        let err = GraphError::Discovery {
            failures: vec![
                TaskFailure {
                    key: "\"a\"".into(),
                    error: "boom".into(),
                },
                TaskFailure {
                    key: "\"b\"".into(),
                    error: "bang".into(),
                },
            ],
        };
        assert_eq!(err.failures().len(), 2);
        assert_eq!(
            err.to_string(),
            "2 discovery task(s) failed: \"a\": boom; \"b\": bang"
        );
    }
}
