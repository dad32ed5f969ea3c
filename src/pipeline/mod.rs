//! Question → tunnel → schema → SQL → rows.
//!
//! Strictly sequential per question. The tunnel is opened once and closed
//! exactly once on every path after a successful open, including failures
//! in schema fetch, synthesis and execution.

pub mod events;
pub mod retry;

use crate::db::{execute, Connector, SchemaInspector, SqlSession};
use crate::llm::prompt::follow_up_question;
use crate::llm::{QuerySynthesizer, SqlGenerator};
use crate::otel::spans::question_span;
use crate::tunnel::{ActiveTunnel, TunnelProvider};
use crate::types::{Answer, Result, SynthesisRequest};
use tracing::Instrument;
use uuid::Uuid;

pub use events::{NullReporter, PipelineEvent, Reporter};
pub use retry::{classify, FailureClass, RetryState, Transition, RETRY_MARKERS};

/// The whole question-answering flow, generic over its three collaborators.
pub struct Pipeline<T, C, G> {
    tunnels: T,
    connector: C,
    synthesizer: QuerySynthesizer<G>,
    inspector: SchemaInspector,
}

impl<T, C, G> Pipeline<T, C, G>
where
    T: TunnelProvider,
    C: Connector,
    G: SqlGenerator,
{
    pub fn new(tunnels: T, connector: C, generator: G, inspector: SchemaInspector) -> Self {
        Self {
            tunnels,
            connector,
            synthesizer: QuerySynthesizer::new(generator),
            inspector,
        }
    }

    /// Answer a question, reporting every step and every failure.
    ///
    /// Never returns an error: failures are reported through `reporter`
    /// and yield `None`.
    pub async fn ask(&self, question: &str, reporter: &dyn Reporter) -> Option<Answer> {
        if question.trim().is_empty() {
            reporter.report(&PipelineEvent::EmptyQuestion);
            return None;
        }

        match self.run(question, reporter).await {
            Ok(answer) => {
                reporter.report(&PipelineEvent::Succeeded { answer: &answer });
                Some(answer)
            }
            Err(error) => {
                tracing::error!(error = %error, "Question failed");
                reporter.report(&PipelineEvent::Failed { error: &error });
                None
            }
        }
    }

    /// Answer a question, returning the first unrecovered error.
    ///
    /// # Errors
    ///
    /// - `TunnelError`: the tunnel never opened, so nothing is closed
    /// - `ConnectionError` / `SchemaFetchError` / `LlmError`
    /// - `ExecutionError`: fatal on first attempt, or the retry also failed
    pub async fn run(&self, question: &str, reporter: &dyn Reporter) -> Result<Answer> {
        let question_id = Uuid::new_v4().to_string();
        let span = question_span(&question_id);

        async {
            let tunnel = self.tunnels.open().await?;
            reporter.report(&PipelineEvent::TunnelOpened {
                local: tunnel.local_addr(),
                remote: &self.tunnels.describe_remote(),
            });

            let outcome = self.through_tunnel(&tunnel, question, reporter).await;

            match tunnel.close().await {
                Ok(()) => reporter.report(&PipelineEvent::TunnelClosed),
                Err(e) => tracing::warn!(error = %e, "Tunnel did not close cleanly"),
            }

            outcome
        }
        .instrument(span)
        .await
    }

    async fn through_tunnel(
        &self,
        tunnel: &T::Tunnel,
        question: &str,
        reporter: &dyn Reporter,
    ) -> Result<Answer> {
        let mut session = self.connector.connect(tunnel.local_addr()).await?;
        let outcome = self.answer(&mut session, question, reporter).await;

        if let Err(e) = session.close().await {
            tracing::debug!(error = %e, "Database session did not close cleanly");
        }

        outcome
    }

    async fn answer(
        &self,
        session: &mut C::Session,
        question: &str,
        reporter: &dyn Reporter,
    ) -> Result<Answer> {
        let schema = self.inspector.snapshot(session).await?;
        let namespace = Some(self.connector.database());

        let mut state = RetryState::Initial;
        let mut request = SynthesisRequest::new(question, &schema);
        let mut attempts = Vec::with_capacity(2);

        loop {
            let synthesis = self.synthesizer.synthesize(&request).await?;
            tracing::info!(attempt = state.attempt(), sql = %synthesis.query, "SQL synthesized");
            reporter.report(&PipelineEvent::SqlGenerated {
                state,
                sql: &synthesis.query,
            });
            attempts.push(synthesis.query.clone());

            let error = match execute(session, &synthesis.query, namespace).await {
                Ok(rows) => {
                    return Ok(Answer {
                        question: question.to_string(),
                        attempts,
                        rows,
                    })
                }
                Err(error) => error,
            };

            if state == RetryState::Initial {
                if let Some(message) = error.execution_message() {
                    reporter.report(&PipelineEvent::ExecutionFailed { message });
                }
            }

            match state.on_failure(&error) {
                Transition::Retry { message } => {
                    tracing::info!(error = %message, "Retrying with error context");
                    tracing::Span::current().record("question.retried", true);
                    state = RetryState::Retried;
                    request = SynthesisRequest::new(
                        follow_up_question(&message, &schema.table_info, question),
                        &schema,
                    );
                }
                Transition::Fail => return Err(error),
            }
        }
    }
}
