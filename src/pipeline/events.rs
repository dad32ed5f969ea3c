//! Status updates emitted while a question runs.

use crate::pipeline::retry::RetryState;
use crate::types::{Answer, AskError, ExecutableQuery};
use std::net::SocketAddr;

/// One visible step of a question.
#[derive(Debug)]
pub enum PipelineEvent<'a> {
    /// Blank input; nothing was run
    EmptyQuestion,
    TunnelOpened {
        local: SocketAddr,
        remote: &'a str,
    },
    SqlGenerated {
        state: RetryState,
        sql: &'a ExecutableQuery,
    },
    /// First execution failed (retry may follow)
    ExecutionFailed {
        message: &'a str,
    },
    TunnelClosed,
    Succeeded {
        answer: &'a Answer,
    },
    Failed {
        error: &'a AskError,
    },
}

impl PipelineEvent<'_> {
    /// User-facing text for this event.
    pub fn message(&self) -> String {
        match self {
            PipelineEvent::EmptyQuestion => "Please enter a question.".to_string(),
            PipelineEvent::TunnelOpened { local, remote } => {
                format!("SSH tunnel established: {} → {}", local, remote)
            }
            PipelineEvent::SqlGenerated { sql, .. } => sql.to_string(),
            PipelineEvent::ExecutionFailed { message } => {
                format!("SQL Execution Error: {}", message)
            }
            PipelineEvent::TunnelClosed => "SSH tunnel closed.".to_string(),
            PipelineEvent::Succeeded { .. } => "Query executed successfully!".to_string(),
            PipelineEvent::Failed { error } => format!("Error: {}", error),
        }
    }
}

/// Receives status updates. The presentation layer implements this.
pub trait Reporter: Send + Sync {
    fn report(&self, event: &PipelineEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _event: &PipelineEvent<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let local: SocketAddr = "127.0.0.1:3307".parse().unwrap();
        let opened = PipelineEvent::TunnelOpened {
            local,
            remote: "bastion:3306",
        };
        assert_eq!(
            opened.message(),
            "SSH tunnel established: 127.0.0.1:3307 → bastion:3306"
        );

        let sql = ExecutableQuery::new("SELECT 1");
        let generated = PipelineEvent::SqlGenerated {
            state: RetryState::Initial,
            sql: &sql,
        };
        assert_eq!(generated.message(), "SELECT 1;");

        let error = AskError::execution("boom");
        assert_eq!(PipelineEvent::Failed { error: &error }.message(), "Error: boom");
        assert_eq!(PipelineEvent::TunnelClosed.message(), "SSH tunnel closed.");
    }
}
