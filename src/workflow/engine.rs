use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::{EngineSettings, LeadSettings};
use crate::error::{Error, Result};
use crate::llm::Message;
use crate::store::ThreadStore;
use crate::telemetry::{add_metric, set_error_on_current_span};

use super::agent::AgentStep;
use super::email::{EmailSender, LogEmailSender};
use super::signal::{Decision, ResumeSignal, ReviewDecision};
use super::state::{Checkpoint, LeadState, SuspensionPoint, ThreadStatus};
use super::step::{lead_website_url, revision_request, route_after_agent, seed_message, Step, Transition};

/// Configuration for the lead workflow engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Steps one invocation may run before it is abandoned
    pub max_steps: usize,

    /// First domain labels of consumer mail providers
    pub consumer_providers: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: EngineSettings::default().max_steps,
            consumer_providers: crate::config::default_consumer_providers(),
        }
    }
}

impl EngineConfig {
    /// Build from the engine and lead settings sections
    pub fn from_settings(engine: &EngineSettings, lead: &LeadSettings) -> Self {
        Self {
            max_steps: engine.max_steps,
            consumer_providers: lead.consumer_providers.clone(),
        }
    }

    /// Set the step budget
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// Where an invocation left a thread
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Waiting for a human decision
    Suspended(Checkpoint),
    /// Reached the terminal node
    Ended(Checkpoint),
}

impl RunOutcome {
    fn from_checkpoint(checkpoint: Checkpoint) -> Self {
        if checkpoint.is_suspended() {
            RunOutcome::Suspended(checkpoint)
        } else {
            RunOutcome::Ended(checkpoint)
        }
    }

    /// The committed checkpoint
    pub fn checkpoint(&self) -> &Checkpoint {
        match self {
            RunOutcome::Suspended(c) | RunOutcome::Ended(c) => c,
        }
    }

    /// Take the committed checkpoint
    pub fn into_checkpoint(self) -> Checkpoint {
        match self {
            RunOutcome::Suspended(c) | RunOutcome::Ended(c) => c,
        }
    }

    /// Whether the thread waits for a human decision
    pub fn is_suspended(&self) -> bool {
        matches!(self, RunOutcome::Suspended(_))
    }
}

/// The sales-outreach state machine with persisted, resumable review.
///
/// Each call runs one step sequence of a thread, to completion or to the next
/// suspension, under a per-thread lock. The checkpoint is saved once at the
/// end with the version it was loaded at; a failed step saves nothing.
#[derive(Debug)]
pub struct LeadWorkflow {
    /// Model bound to the sales tools
    agent: AgentStep,
    /// Checkpoint persistence
    store: Arc<dyn ThreadStore>,
    /// Delivery of approved emails
    email_sender: Arc<dyn EmailSender>,
    /// Engine configuration
    config: EngineConfig,
    /// One lock per thread id
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LeadWorkflow {
    /// Create a new workflow with the default configuration
    pub fn new(agent: AgentStep, store: Arc<dyn ThreadStore>) -> Self {
        Self {
            agent,
            store,
            email_sender: Arc::new(LogEmailSender),
            config: EngineConfig::default(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Use a different email sender
    pub fn with_email_sender(mut self, email_sender: Arc<dyn EmailSender>) -> Self {
        self.email_sender = email_sender;
        self
    }

    /// Use a different configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Latest committed checkpoint of a thread
    pub async fn checkpoint(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        self.store.load(thread_id).await
    }

    async fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(thread_id.to_string()).or_default().clone()
    }

    /// Start a thread for a new lead.
    ///
    /// An existing thread restarts at `extract_domain` with the new address;
    /// its message log is kept and any pending review is dropped.
    #[instrument(skip_all, fields(thread_id = %thread_id))]
    pub async fn start(&self, thread_id: &str, email: &str) -> Result<RunOutcome> {
        let lock = self.thread_lock(thread_id).await;
        let _guard = lock.lock().await;

        let (checkpoint, expected) = match self.store.load(thread_id).await? {
            Some(mut checkpoint) => {
                info!("Restarting thread {} (status {})", thread_id, checkpoint.status);
                let expected = Some(checkpoint.version);
                checkpoint.state.email_address = email.to_string();
                checkpoint.state.lead_website_url = None;
                checkpoint.state.email_to_send = None;
                checkpoint.next_step = Some(Step::ExtractDomain);
                checkpoint.suspension = None;
                checkpoint.last_decision = None;
                checkpoint.status = ThreadStatus::Running;
                (checkpoint, expected)
            }
            None => {
                info!("Starting thread {}", thread_id);
                (Checkpoint::new(thread_id, email), None)
            }
        };

        self.run(checkpoint, expected, None).await
    }

    /// Resume a suspended thread with a reviewer's decision.
    ///
    /// Duplicate deliveries are no-ops returning the current outcome: a signal
    /// for another suspension point, a signal for a thread that is not
    /// suspended, or (without an interrupt id) a retry whose echoed draft is
    /// not the draft under review.
    #[instrument(skip_all, fields(thread_id = %thread_id, decision = %signal.decision.decision))]
    pub async fn resume(&self, thread_id: &str, signal: ResumeSignal) -> Result<RunOutcome> {
        let lock = self.thread_lock(thread_id).await;
        let _guard = lock.lock().await;

        let mut checkpoint = self
            .store
            .load(thread_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("thread {}", thread_id)))?;

        if !self.accepts(&checkpoint, &signal) {
            add_metric("review_duplicate_total", 1.0, &[("thread_id", thread_id.to_string())]);
            return Ok(RunOutcome::from_checkpoint(checkpoint));
        }

        let expected = Some(checkpoint.version);
        checkpoint.last_decision = Some(signal.decision.clone());
        checkpoint.suspension = None;
        checkpoint.status = ThreadStatus::Running;
        self.run(checkpoint, expected, Some(signal.decision)).await
    }

    fn accepts(&self, checkpoint: &Checkpoint, signal: &ResumeSignal) -> bool {
        let Some(suspension) = checkpoint.suspension.as_ref().filter(|_| checkpoint.is_suspended()) else {
            info!("Thread {} is not suspended, ignoring review", checkpoint.thread_id);
            return false;
        };

        match signal.interrupt_id.as_deref() {
            Some(id) if id != suspension.id => {
                info!("Review for stale suspension {} ignored", id);
                false
            }
            Some(_) => true,
            None => {
                // approvals may carry an edited draft
                let stale = signal.decision.decision == Decision::Retry
                    && signal
                        .decision
                        .reviewed_content
                        .as_deref()
                        .is_some_and(|echoed| Some(echoed) != suspension.email_draft());
                if stale {
                    info!("Retry for a previous draft ignored");
                }
                !stale
            }
        }
    }

    /// Store the review link of the active suspension.
    ///
    /// A link for a suspension that is no longer active is dropped.
    #[instrument(skip_all, fields(thread_id = %thread_id))]
    pub async fn attach_review_link(&self, thread_id: &str, interrupt_id: &str, link: &str) -> Result<Checkpoint> {
        let lock = self.thread_lock(thread_id).await;
        let _guard = lock.lock().await;

        let checkpoint = self
            .store
            .load(thread_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("thread {}", thread_id)))?;
        self.store_review_link(checkpoint, interrupt_id, link).await
    }

    /// Make sure the active suspension of a thread has a review link.
    ///
    /// Runs under the thread lock: when no link is stored yet, `request` is
    /// called once with the current checkpoint and its link is saved, so
    /// concurrent callers share one review. Returns the latest checkpoint,
    /// unchanged when the thread is not suspended or already has a link.
    #[instrument(skip_all, fields(thread_id = %thread_id))]
    pub async fn ensure_review_link<F, Fut>(&self, thread_id: &str, request: F) -> Result<Checkpoint>
    where
        F: FnOnce(Checkpoint) -> Fut + Send,
        Fut: Future<Output = Result<String>> + Send,
    {
        let lock = self.thread_lock(thread_id).await;
        let _guard = lock.lock().await;

        let checkpoint = self
            .store
            .load(thread_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("thread {}", thread_id)))?;

        let interrupt_id = match checkpoint.suspension.as_ref() {
            Some(suspension) if checkpoint.is_suspended() && suspension.review_link.is_none() => {
                suspension.id.clone()
            }
            _ => return Ok(checkpoint),
        };

        let link = request(checkpoint.clone()).await?;
        self.store_review_link(checkpoint, &interrupt_id, &link).await
    }

    async fn store_review_link(&self, mut checkpoint: Checkpoint, interrupt_id: &str, link: &str) -> Result<Checkpoint> {
        match checkpoint.suspension.as_mut() {
            Some(suspension) if suspension.id == interrupt_id => {
                suspension.review_link = Some(link.to_string());
            }
            _ => {
                warn!("Suspension {} is no longer active, link not stored", interrupt_id);
                return Ok(checkpoint);
            }
        }

        let expected = Some(checkpoint.version);
        checkpoint.touch();
        checkpoint.version = self.store.save(&checkpoint, expected).await?;
        Ok(checkpoint)
    }

    async fn run(
        &self,
        mut checkpoint: Checkpoint,
        expected: Option<u64>,
        mut decision: Option<ReviewDecision>,
    ) -> Result<RunOutcome> {
        let mut steps = 0;

        while let Some(step) = checkpoint.next_step {
            if steps >= self.config.max_steps {
                let err = Error::StepLimitExceeded(self.config.max_steps);
                set_error_on_current_span(&err);
                return Err(err);
            }
            steps += 1;

            let start = Instant::now();
            let result = self.execute(step, &mut checkpoint.state, decision.take()).await;
            add_metric(
                "workflow_step_duration_ms",
                start.elapsed().as_millis() as f64,
                &[("step", step.to_string()), ("success", result.is_ok().to_string())],
            );

            let transition = match result {
                Ok(transition) => transition,
                Err(e) => {
                    warn!("Step {} failed on thread {}: {}", step, checkpoint.thread_id, e);
                    set_error_on_current_span(&e);
                    return Err(e);
                }
            };

            match transition {
                Transition::Goto(next) => {
                    debug!("{} -> {}", step, next);
                    checkpoint.next_step = Some(next);
                }
                Transition::Suspend(point) => {
                    info!("Thread {} suspended at {}", checkpoint.thread_id, point.step);
                    checkpoint.next_step = Some(point.step);
                    checkpoint.suspension = Some(point);
                    checkpoint.status = ThreadStatus::Suspended;
                    break;
                }
                Transition::End => {
                    checkpoint.next_step = None;
                }
            }
        }

        if checkpoint.next_step.is_none() {
            info!("Thread {} completed", checkpoint.thread_id);
            checkpoint.suspension = None;
            checkpoint.status = ThreadStatus::Completed;
        }

        checkpoint.touch();
        checkpoint.version = self.store.save(&checkpoint, expected).await?;
        add_metric("workflow_steps_per_invocation", steps as f64, &[("status", checkpoint.status.to_string())]);
        Ok(RunOutcome::from_checkpoint(checkpoint))
    }

    async fn execute(&self, step: Step, state: &mut LeadState, decision: Option<ReviewDecision>) -> Result<Transition> {
        match step {
            Step::ExtractDomain => {
                let url = lead_website_url(&state.email_address, &self.config.consumer_providers);
                match &url {
                    Some(url) => info!("Lead website: {}", url),
                    None => info!("No company website for {}", state.email_address),
                }
                state.push(Message::user(seed_message(&state.email_address, url.as_deref())));
                state.lead_website_url = url;
                Ok(Transition::Goto(Step::Agent))
            }
            Step::Agent => {
                let message = self.agent.respond(&state.messages).await?;
                state.push(message);
                Ok(Transition::Goto(route_after_agent(&state.messages)?))
            }
            Step::Tools => {
                let request = state
                    .last_message()
                    .filter(|m| m.has_tool_calls())
                    .cloned()
                    .ok_or_else(|| Error::contract("tools step without pending tool calls"))?;
                for result in self.agent.execute_tool_calls(&request).await? {
                    state.push(result);
                }
                Ok(Transition::Goto(Step::Agent))
            }
            Step::AskHuman => match decision {
                None => {
                    let draft = state
                        .last_assistant_message()
                        .ok_or_else(|| Error::contract("no draft to review"))?;
                    Ok(Transition::Suspend(SuspensionPoint::ask_human(&draft.content)))
                }
                Some(decision) => Ok(self.apply_decision(state, decision)),
            },
            Step::SendEmail => {
                let body = state
                    .email_to_send
                    .clone()
                    .ok_or_else(|| Error::contract("send_email without an approved email"))?;
                self.email_sender.send(&state.email_address, &body).await?;
                state.push(Message::assistant(format!("Email sent to {}", state.email_address)));
                Ok(Transition::End)
            }
        }
    }

    fn apply_decision(&self, state: &mut LeadState, decision: ReviewDecision) -> Transition {
        match decision.decision {
            Decision::Retry => {
                let comment = decision.comment.unwrap_or_default();
                state.push(Message::user(revision_request(&comment)));
                Transition::Goto(Step::Agent)
            }
            Decision::Approve => {
                state.email_to_send = Some(decision.reviewed_content.unwrap_or_default());
                Transition::Goto(Step::SendEmail)
            }
            Decision::Abort => {
                info!("Review aborted the thread");
                Transition::End
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Completion, CompletionRequest, LlmClient, ModelSettings};
    use crate::store::MemoryStore;
    use crate::tools::ToolRegistry;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct FixedLlm(&'static str);

    #[async_trait]
    impl LlmClient for FixedLlm {
        async fn complete(&self, _request: CompletionRequest) -> Result<Completion> {
            Ok(Completion::from_message(Message::assistant(self.0)))
        }
    }

    fn workflow(store: Arc<MemoryStore>) -> LeadWorkflow {
        let agent = AgentStep::new(
            Arc::new(FixedLlm("Hi there")),
            Arc::new(ToolRegistry::new()),
            ModelSettings::new("gpt-4o"),
        );
        LeadWorkflow::new(agent, store)
    }

    #[tokio::test]
    async fn test_draft_suspends_for_review() {
        let store = Arc::new(MemoryStore::new());
        let outcome = workflow(store.clone()).start("t-1", "jane@gmail.com").await.unwrap();

        assert!(outcome.is_suspended());
        let checkpoint = outcome.checkpoint();
        assert_eq!(checkpoint.version, 1);
        assert_eq!(checkpoint.next_step, Some(Step::AskHuman));
        assert_eq!(checkpoint.state.lead_website_url, None);
        assert_eq!(
            checkpoint.suspension.as_ref().and_then(|s| s.email_draft()),
            Some("Hi there")
        );
        assert_eq!(store.load("t-1").await.unwrap().as_ref(), Some(checkpoint));
    }

    #[tokio::test]
    async fn test_step_budget() {
        let store = Arc::new(MemoryStore::new());
        let workflow = workflow(store.clone()).with_config(EngineConfig::default().with_max_steps(1));

        let err = workflow.start("t-1", "jane@initech.com").await.unwrap_err();
        assert!(matches!(err, Error::StepLimitExceeded(1)));
        assert!(store.load("t-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ask_human_without_draft_is_a_contract_violation() {
        let workflow = workflow(Arc::new(MemoryStore::new()));
        let mut state = LeadState::new("jane@initech.com");
        state.push(Message::user("seed"));

        let err = workflow.execute(Step::AskHuman, &mut state, None).await.unwrap_err();
        assert!(matches!(err, Error::Contract(_)));
    }

    #[tokio::test]
    async fn test_resume_unknown_thread() {
        let workflow = workflow(Arc::new(MemoryStore::new()));
        let err = workflow
            .resume("missing", ResumeSignal::new(ReviewDecision::abort()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
