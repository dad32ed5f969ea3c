//! Terminal status lines for pipeline events.
//!
//! Status goes to stderr so stdout carries only result rows and can be
//! piped. Color follows `colored`'s global switch (`NO_COLOR`, `--no-color`).

use crate::pipeline::{PipelineEvent, Reporter, RetryState};
use colored::*;

/// Prints pipeline events to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only failures are printed.
    pub fn quiet() -> Self {
        Self { quiet: true }
    }

    /// Line(s) printed for an event, `None` when suppressed.
    pub fn line(&self, event: &PipelineEvent<'_>) -> Option<String> {
        let message = event.message();
        let line = match event {
            PipelineEvent::Failed { .. } => format!("{} {}", "✗".red(), message.red()),
            PipelineEvent::ExecutionFailed { .. } => {
                format!("{} {}", "✗".red(), message.red())
            }
            _ if self.quiet => return None,
            PipelineEvent::EmptyQuestion => format!("{}", message.yellow()),
            PipelineEvent::TunnelOpened { .. } => format!("{} {}", "✓".green(), message),
            PipelineEvent::SqlGenerated { state, .. } => {
                let title = match state {
                    RetryState::Initial => "Generated SQL:",
                    RetryState::Retried => "Retried with SQL:",
                };
                format!("{} {}\n{}", "→".cyan(), title.bold(), message.bright_white())
            }
            PipelineEvent::Succeeded { .. } => format!("{} {}", "✓".green(), message.green()),
            PipelineEvent::TunnelClosed => format!("{}", message.dimmed()),
        };
        Some(line)
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, event: &PipelineEvent<'_>) {
        if let Some(line) = self.line(event) {
            eprintln!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AskError, ExecutableQuery};

    #[test]
    fn test_retry_title() {
        let sql = ExecutableQuery::new("SELECT name FROM customers");
        let line = ConsoleReporter::new()
            .line(&PipelineEvent::SqlGenerated {
                state: RetryState::Retried,
                sql: &sql,
            })
            .unwrap();
        assert!(line.contains("Retried with SQL:"));
        assert!(line.contains("SELECT name FROM customers;"));
    }

    #[test]
    fn test_quiet_keeps_failures() {
        let reporter = ConsoleReporter::quiet();
        assert!(reporter.line(&PipelineEvent::TunnelClosed).is_none());

        let error = AskError::execution("Table 'shop.x' doesn't exist");
        let line = reporter.line(&PipelineEvent::Failed { error: &error }).unwrap();
        assert!(line.contains("Error: Table 'shop.x' doesn't exist"));
    }
}
