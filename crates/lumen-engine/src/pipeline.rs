//! The turn pipeline.
//!
//! One call runs a full conversation turn:
//!
//! 1. validate the inbound message;
//! 2. classify it for crisis indicators;
//! 3. pre-flight access check — denied users never trigger a model call;
//! 4. load memory context and compose the system prompt;
//! 5. stream the completion through the marker filter to the client;
//! 6. settle: deduct usage, persist the exchange, kick summarization,
//!    record learning signals.
//!
//! Billing is by content actually delivered. An upstream failure before the
//! stream completes aborts the turn with no deduction and no memory writes.
//! A client disconnect mid-stream stops the upstream pull and settles the
//! turn against what the client received before it went away.

use std::sync::Arc;

use lumen_core::ids::{ConversationId, UserId};
use lumen_core::messages::ChatMessage;
use lumen_core::text::estimate_tokens;
use lumen_ledger::{LedgerConfig, UsageLedger};
use lumen_memory::{MemoryConfig, MemoryManager, Summarizer};
use lumen_safety::{classify, CrisisSignal};
use lumen_settings::LumenSettings;
use lumen_signals::{extract, RecorderConfig, SignalRecorder};
use lumen_store::ConnectionPool;
use lumen_stream::MarkerFilter;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, info};

use crate::composer::{CoachComposer, PromptComposer};
use crate::errors::{Result, TurnError};
use crate::http::{HttpProvider, ProviderConfig};
use crate::provider::{ChatRequest, ModelProvider, ProviderError};
use crate::summarizer::ModelSummarizer;

/// Pipeline knobs.
#[derive(Clone, Copy, Debug)]
pub struct PipelineConfig {
    /// Maximum accepted inbound message length (characters).
    pub max_message_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_message_chars: lumen_core::constants::MAX_MESSAGE_CHARS,
        }
    }
}

/// What a completed turn settled to.
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    /// Safety classification of the inbound message.
    pub crisis: CrisisSignal,
    /// Clean assistant text delivered to the client.
    pub assistant_text: String,
    /// Estimated prompt-side tokens charged.
    pub input_tokens: i64,
    /// Estimated delivered-output tokens charged.
    pub output_tokens: i64,
    /// Whether the client went away before the stream finished.
    pub disconnected: bool,
}

/// Runs conversation turns end to end.
pub struct TurnPipeline<S: Summarizer> {
    provider: Arc<dyn ModelProvider>,
    composer: Arc<dyn PromptComposer>,
    ledger: UsageLedger,
    memory: MemoryManager<S>,
    recorder: SignalRecorder,
    config: PipelineConfig,
}

impl TurnPipeline<ModelSummarizer> {
    /// Wire a production pipeline from settings over an already-migrated
    /// pool. The summarizer shares the turn provider.
    pub fn from_settings(
        settings: &LumenSettings,
        pool: ConnectionPool,
    ) -> std::result::Result<Self, ProviderError> {
        let provider: Arc<dyn ModelProvider> =
            Arc::new(HttpProvider::new(ProviderConfig::from(&settings.model))?);

        let ledger_config = LedgerConfig {
            monthly_allowance: settings.ledger.monthly_allowance,
            tokens_per_credit: settings.ledger.tokens_per_credit,
            ..LedgerConfig::default()
        };
        let memory_config = MemoryConfig {
            active_window_size: i64::try_from(settings.memory.active_window_size)
                .unwrap_or(i64::MAX),
            summarization_threshold: i64::try_from(settings.memory.summarization_threshold)
                .unwrap_or(i64::MAX),
        };
        let recorder_config = RecorderConfig {
            feedback_window_secs: settings.signals.feedback_window_secs,
            ..RecorderConfig::default()
        };

        Ok(Self {
            provider: Arc::clone(&provider),
            composer: Arc::new(CoachComposer::default()),
            ledger: UsageLedger::new(pool.clone(), ledger_config),
            memory: MemoryManager::new(
                pool.clone(),
                ModelSummarizer::new(provider),
                memory_config,
            ),
            recorder: SignalRecorder::new(pool, recorder_config),
            config: PipelineConfig {
                max_message_chars: settings.model.max_message_chars,
            },
        })
    }
}

impl<S: Summarizer> TurnPipeline<S> {
    /// Assemble a pipeline from its parts.
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        composer: Arc<dyn PromptComposer>,
        ledger: UsageLedger,
        memory: MemoryManager<S>,
        recorder: SignalRecorder,
        config: PipelineConfig,
    ) -> Self {
        Self {
            provider,
            composer,
            ledger,
            memory,
            recorder,
            config,
        }
    }

    /// Run one conversation turn, streaming clean fragments to `client`.
    pub async fn run(
        &self,
        user: &UserId,
        conversation: &ConversationId,
        text: &str,
        client: &mpsc::Sender<String>,
    ) -> Result<TurnOutcome> {
        if text.trim().is_empty() {
            return Err(TurnError::Validation("message is empty".into()));
        }
        if text.chars().count() > self.config.max_message_chars {
            return Err(TurnError::Validation(format!(
                "message exceeds {} characters",
                self.config.max_message_chars
            )));
        }

        let crisis = classify(text);

        // The cost of an unbillable model call cannot be recovered, so the
        // check comes before anything paid.
        let access = self.ledger.check_access(user)?;
        if !access.allowed {
            return Err(TurnError::AccessDenied {
                balance: access.balance,
            });
        }

        let context = self.memory.get_context(conversation)?;
        let system_prompt = self.composer.compose(&crisis, &context);

        let mut messages = context.active_messages;
        messages.push(ChatMessage::user(text));
        let request = ChatRequest {
            system_prompt,
            messages,
        };
        let input_tokens = estimate_tokens(&request.system_prompt)
            + request
                .messages
                .iter()
                .map(|m| estimate_tokens(&m.content))
                .sum::<i64>();

        let mut stream = self.provider.stream_completion(&request).await?;

        let mut filter = MarkerFilter::new();
        let mut sent = String::new();
        let mut disconnected = false;

        'pump: while let Some(item) = stream.next().await {
            let delta = item?;
            for fragment in filter.feed(&delta) {
                if client.send(fragment.clone()).await.is_err() {
                    debug!(user = %user, "client went away, stopping upstream pull");
                    disconnected = true;
                    break 'pump;
                }
                sent.push_str(&fragment);
            }
        }
        drop(stream);

        if !disconnected {
            if let Some(tail) = filter.finish() {
                if client.send(tail.clone()).await.is_err() {
                    disconnected = true;
                } else {
                    sent.push_str(&tail);
                }
            }
        }

        // Settlement. Only content the client actually received is billed
        // and persisted; undelivered output costs the user nothing.
        let output_tokens = estimate_tokens(&sent);
        self.ledger
            .deduct(user, Some(conversation), input_tokens, output_tokens)?;

        self.memory
            .append(conversation, user, &ChatMessage::user(text))?;
        if !sent.is_empty() {
            self.memory
                .append(conversation, user, &ChatMessage::assistant(sent.clone()))?;
        }
        let _ = self.memory.maybe_summarize(conversation).await;

        self.recorder.record(user, &extract(text));

        info!(user = %user, conversation = %conversation, input_tokens, output_tokens,
            severity = %crisis.severity, disconnected, "turn settled");

        Ok(TurnOutcome {
            crisis,
            assistant_text: sent,
            input_tokens,
            output_tokens,
            disconnected,
        })
    }
}

impl<S: Summarizer> std::fmt::Debug for TurnPipeline<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use lumen_core::constants::MONTHLY_ALLOWANCE_TOKENS;
    use lumen_memory::MemoryContext;
    use lumen_safety::Severity;
    use lumen_store::{new_file, run_migrations, ConnectionConfig, ConversationRepo, SignalRepo};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ── test doubles ─────────────────────────────────────────────────────

    /// Provider that plays back a scripted delta sequence once.
    struct MockProvider {
        items: Mutex<Vec<std::result::Result<String, ProviderError>>>,
        start_error: Mutex<Option<ProviderError>>,
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn streaming(deltas: &[&str]) -> Self {
            Self {
                items: Mutex::new(deltas.iter().map(|d| Ok((*d).to_owned())).collect()),
                start_error: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }

        fn with_items(items: Vec<std::result::Result<String, ProviderError>>) -> Self {
            Self {
                items: Mutex::new(items),
                start_error: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing_to_start(error: ProviderError) -> Self {
            Self {
                items: Mutex::new(Vec::new()),
                start_error: Mutex::new(Some(error)),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelProvider for MockProvider {
        async fn stream_completion(
            &self,
            _request: &ChatRequest,
        ) -> std::result::Result<crate::provider::DeltaStream, ProviderError> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(e) = self.start_error.lock().unwrap().take() {
                return Err(e);
            }
            let items = std::mem::take(&mut *self.items.lock().unwrap());
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    /// Composer that records the directive it was handed.
    struct RecordingComposer {
        last_directive: Mutex<String>,
    }

    impl RecordingComposer {
        fn new() -> Self {
            Self {
                last_directive: Mutex::new(String::new()),
            }
        }
    }

    impl PromptComposer for RecordingComposer {
        fn compose(&self, signal: &CrisisSignal, _context: &MemoryContext) -> String {
            *self.last_directive.lock().unwrap() = signal.prompt_directive.clone();
            "test stance".to_owned()
        }
    }

    /// Summarizer that never fires in these short conversations.
    struct InertSummarizer;

    #[async_trait]
    impl Summarizer for InertSummarizer {
        async fn summarize(&self, _messages: &[ChatMessage]) -> lumen_memory::Result<String> {
            Ok(r#"{"text":"unused"}"#.to_owned())
        }
    }

    // ── fixture ──────────────────────────────────────────────────────────

    struct Fixture {
        pipeline: TurnPipeline<InertSummarizer>,
        provider: Arc<MockProvider>,
        composer: Arc<RecordingComposer>,
        ledger: UsageLedger,
        pool: ConnectionPool,
        _dir: tempfile::TempDir,
    }

    fn fixture(provider: MockProvider) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turns.db");
        let pool = new_file(path.to_str().unwrap(), &ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
        }

        let provider = Arc::new(provider);
        let composer = Arc::new(RecordingComposer::new());
        let ledger = UsageLedger::new(pool.clone(), LedgerConfig::default());
        let pipeline = TurnPipeline::new(
            Arc::clone(&provider) as Arc<dyn ModelProvider>,
            Arc::clone(&composer) as Arc<dyn PromptComposer>,
            ledger.clone(),
            MemoryManager::new(pool.clone(), InertSummarizer, MemoryConfig::default()),
            SignalRecorder::new(pool.clone(), RecorderConfig::default()),
            PipelineConfig::default(),
        );

        Fixture {
            pipeline,
            provider,
            composer,
            ledger,
            pool,
            _dir: dir,
        }
    }

    fn funded_user(fix: &Fixture, name: &str) -> UserId {
        let user = UserId::from(name);
        fix.ledger.rollover(&user).unwrap();
        user
    }

    async fn drain(rx: &mut mpsc::Receiver<String>) -> String {
        let mut out = String::new();
        while let Ok(fragment) = rx.try_recv() {
            out.push_str(&fragment);
        }
        out
    }

    // ── validation ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let fix = fixture(MockProvider::streaming(&["never reached"]));
        let user = funded_user(&fix, "u1");
        let (tx, _rx) = mpsc::channel(8);

        let err = fix
            .pipeline
            .run(&user, &ConversationId::from("c1"), "   \n ", &tx)
            .await
            .unwrap_err();
        assert_matches!(err, TurnError::Validation(_));
        assert_eq!(fix.provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oversized_message_is_rejected() {
        let fix = fixture(MockProvider::streaming(&["never reached"]));
        let user = funded_user(&fix, "u1");
        let (tx, _rx) = mpsc::channel(8);
        let huge = "x".repeat(lumen_core::constants::MAX_MESSAGE_CHARS + 1);

        let err = fix
            .pipeline
            .run(&user, &ConversationId::from("c1"), &huge, &tx)
            .await
            .unwrap_err();
        assert_matches!(err, TurnError::Validation(_));
    }

    // ── access control ───────────────────────────────────────────────────

    #[tokio::test]
    async fn exhausted_user_is_denied_before_the_model_call() {
        let fix = fixture(MockProvider::streaming(&["never reached"]));
        let user = UserId::from("broke"); // no rollover, no balance
        let (tx, _rx) = mpsc::channel(8);

        let err = fix
            .pipeline
            .run(&user, &ConversationId::from("c1"), "hello", &tx)
            .await
            .unwrap_err();
        assert_matches!(err, TurnError::AccessDenied { balance: 0 });
        assert_eq!(fix.provider.calls.load(Ordering::SeqCst), 0);
    }

    // ── the happy path ───────────────────────────────────────────────────

    #[tokio::test]
    async fn completed_turn_streams_settles_and_persists() {
        let fix = fixture(MockProvider::streaming(&[
            "Hel",
            "lo <coach-",
            "notes>plan a follow-up",
            "</coach-notes>",
            " world",
        ]));
        let user = funded_user(&fix, "u1");
        let conv = ConversationId::from("c1");
        let (tx, mut rx) = mpsc::channel(64);

        let outcome = fix
            .pipeline
            .run(&user, &conv, "help me plan my week", &tx)
            .await
            .unwrap();
        drop(tx);

        // The client saw exactly the marker-free text.
        assert_eq!(drain(&mut rx).await, "Hello  world");
        assert_eq!(outcome.assistant_text, "Hello  world");
        assert!(!outcome.disconnected);
        assert_eq!(outcome.crisis.severity, Severity::None);

        // Billing: system prompt + user message in, delivered text out.
        let expected_input =
            estimate_tokens("test stance") + estimate_tokens("help me plan my week");
        assert_eq!(outcome.input_tokens, expected_input);
        assert_eq!(outcome.output_tokens, estimate_tokens("Hello  world"));

        let acct = fix.ledger.account(&user).unwrap().unwrap();
        assert_eq!(
            acct.total_balance,
            MONTHLY_ALLOWANCE_TOKENS - expected_input - outcome.output_tokens
        );

        // Memory holds the exchange, notes stripped.
        let conn = fix.pool.get().unwrap();
        let rows = ConversationRepo::messages_from(&conn, "c1", 0).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].role, "user");
        assert_eq!(rows[0].content, "help me plan my week");
        assert_eq!(rows[1].role, "assistant");
        assert_eq!(rows[1].content, "Hello  world");
    }

    #[tokio::test]
    async fn turn_records_learning_signals() {
        let fix = fixture(MockProvider::streaming(&["Let's look at that together."]));
        let user = funded_user(&fix, "u1");
        let (tx, _rx) = mpsc::channel(64);

        let _ = fix
            .pipeline
            .run(
                &user,
                &ConversationId::from("c1"),
                "my boss keeps piling on deadlines",
                &tx,
            )
            .await
            .unwrap();

        let conn = fix.pool.get().unwrap();
        let triggers = SignalRepo::triggers_for(&conn, "u1").unwrap();
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].trigger_label, "work stress");
    }

    #[tokio::test]
    async fn crisis_message_carries_the_directive_into_composition() {
        let fix = fixture(MockProvider::streaming(&["I'm really glad you told me."]));
        let user = funded_user(&fix, "u1");
        let (tx, _rx) = mpsc::channel(64);

        let outcome = fix
            .pipeline
            .run(&user, &ConversationId::from("c1"), "I want to end my life", &tx)
            .await
            .unwrap();

        assert_eq!(outcome.crisis.severity, Severity::Critical);
        assert!(!outcome.crisis.resources.is_empty());
        assert!(!fix.composer.last_directive.lock().unwrap().is_empty());
    }

    // ── upstream failure: no charge, no partial memory ───────────────────

    #[tokio::test]
    async fn mid_stream_failure_charges_and_persists_nothing() {
        let fix = fixture(MockProvider::with_items(vec![
            Ok("Hi ".to_owned()),
            Err(ProviderError::Api {
                status: 502,
                message: "bad gateway".into(),
            }),
        ]));
        let user = funded_user(&fix, "u1");
        let (tx, _rx) = mpsc::channel(64);

        let err = fix
            .pipeline
            .run(&user, &ConversationId::from("c1"), "hello", &tx)
            .await
            .unwrap_err();
        assert_matches!(err, TurnError::Upstream(_));

        let acct = fix.ledger.account(&user).unwrap().unwrap();
        assert_eq!(acct.total_balance, MONTHLY_ALLOWANCE_TOKENS);

        let conn = fix.pool.get().unwrap();
        assert!(ConversationRepo::get(&conn, "c1").unwrap().is_none());
    }

    #[tokio::test]
    async fn timeout_at_start_surfaces_without_charge() {
        let fix = fixture(MockProvider::failing_to_start(ProviderError::Timeout));
        let user = funded_user(&fix, "u1");
        let (tx, _rx) = mpsc::channel(64);

        let err = fix
            .pipeline
            .run(&user, &ConversationId::from("c1"), "hello", &tx)
            .await
            .unwrap_err();
        assert_matches!(err, TurnError::UpstreamTimeout);

        let acct = fix.ledger.account(&user).unwrap().unwrap();
        assert_eq!(acct.total_balance, MONTHLY_ALLOWANCE_TOKENS);
    }

    // ── client disconnect: settle against what was delivered ─────────────

    #[tokio::test]
    async fn disconnect_before_any_delivery_bills_input_only() {
        let fix = fixture(MockProvider::streaming(&[
            "This is a long opening that the filter will flush immediately.",
        ]));
        let user = funded_user(&fix, "u1");
        let conv = ConversationId::from("c1");
        let (tx, rx) = mpsc::channel(8);
        drop(rx); // client is already gone

        let outcome = fix.pipeline.run(&user, &conv, "hello", &tx).await.unwrap();

        assert!(outcome.disconnected);
        assert_eq!(outcome.output_tokens, 0);
        assert!(outcome.assistant_text.is_empty());

        let acct = fix.ledger.account(&user).unwrap().unwrap();
        assert_eq!(
            acct.total_balance,
            MONTHLY_ALLOWANCE_TOKENS - outcome.input_tokens
        );

        // The user message still lands in memory; no assistant row.
        let conn = fix.pool.get().unwrap();
        let rows = ConversationRepo::messages_from(&conn, "c1", 0).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].role, "user");
    }

    #[tokio::test]
    async fn active_window_feeds_the_next_request() {
        // First turn writes the exchange; the second turn's request should
        // carry it. The mock cannot inspect the request, so read memory
        // directly after the first turn instead.
        let fix = fixture(MockProvider::streaming(&["Noted. What matters most?"]));
        let user = funded_user(&fix, "u1");
        let conv = ConversationId::from("c1");
        let (tx, _rx) = mpsc::channel(64);

        let _ = fix
            .pipeline
            .run(&user, &conv, "I keep procrastinating", &tx)
            .await
            .unwrap();

        let context = fix.pipeline.memory.get_context(&conv).unwrap();
        assert_eq!(context.active_messages.len(), 2);
        assert_eq!(context.active_messages[0].content, "I keep procrastinating");
        assert_eq!(
            context.active_messages[1].content,
            "Noted. What matters most?"
        );
    }
}
