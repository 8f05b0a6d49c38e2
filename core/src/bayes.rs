// Distributed spam/ham learning pipeline.
//
// Learning events travel in two stages. A module that classifies a message
// publishes a compact id-only report on the broadcast bus; every instance's
// report consumer tries to resolve the id against its own message cache and,
// on a hit, feeds the local corpus and re-broadcasts the fully expanded
// message. Every instance's learn consumer then fans the expanded message
// out to each enabled module's learning hook. Full bodies are only shipped
// once some instance has resolved them locally.
//
// Every fallible step fails by dropping that one item with a log entry.
// There is no retry and no dead-letter path: learning is best-effort
// reinforcement, not a correctness-critical operation.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::bus::{broadcast_channel, Transport};
use crate::cache::MessageCache;
use crate::config::Config;
use crate::envelope::{Envelope, LearnMessage, ReportMessageId};
use crate::module::{Module, ModuleBuilder, ModuleRegistry};
use crate::supervisor::spawn_supervised;
use crate::{CluegetterError, Result};

/// Bus operation carrying id-only reports.
pub const REPORT_OPERATION: &str = "bayes!reportMessageId";
/// Bus operation carrying expanded messages.
pub const LEARN_OPERATION: &str = "bayes!learn";

/// Corpus update boundary, supplied by the statistical learning module.
///
/// The algorithm itself lives outside this crate.
#[async_trait]
pub trait CorpusLearner: Send + Sync {
    async fn add_to_corpus(
        &self,
        is_spam: bool,
        message: &[u8],
        message_id: &str,
        host: &str,
        reporter: &str,
        reason: &str,
    );
}

struct NoopCorpusLearner;

#[async_trait]
impl CorpusLearner for NoopCorpusLearner {
    async fn add_to_corpus(&self, _: bool, _: &[u8], _: &str, _: &str, _: &str, _: &str) {}
}

/// The learning pipeline engine.
///
/// Owns the consumer side of both bus operations and the public
/// [`report`](Bayes::report) entry point other modules call when they
/// observe a classification.
pub struct Bayes {
    registry: Arc<ModuleRegistry>,
    transport: Arc<dyn Transport>,
    cache: Arc<dyn MessageCache>,
    corpus: Arc<dyn CorpusLearner>,
    config: Config,
}

impl Bayes {
    pub fn new(
        registry: Arc<ModuleRegistry>,
        transport: Arc<dyn Transport>,
        cache: Arc<dyn MessageCache>,
        corpus: Option<Arc<dyn CorpusLearner>>,
        config: Config,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            transport,
            cache,
            corpus: corpus.unwrap_or_else(|| Arc::new(NoopCorpusLearner)),
            config,
        })
    }

    /// Produces the pipeline's module registration.
    ///
    /// The init hook starts both always-running consumer loops; the
    /// dispatcher feeds the declared queues from the bus.
    pub fn module(self: Arc<Self>) -> crate::module::BuiltModule {
        let queue_size = self.config.bayes.queue_size;
        let enabled = self.config.bayes.enabled;
        let (report_tx, report_rx) = mpsc::channel(queue_size);
        let (learn_tx, learn_rx) = mpsc::channel(queue_size);

        let bayes = self;
        ModuleBuilder::new("bayes")
            .enable(move || enabled)
            .on_init(move || {
                spawn_supervised(
                    "bayes.reportMessageId",
                    Arc::clone(&bayes).run_report_queue(report_rx),
                );
                spawn_supervised("bayes.learn", bayes.run_learn_queue(learn_rx));
                Ok(())
            })
            .rpc_queue(REPORT_OPERATION, report_tx)
            .rpc_queue(LEARN_OPERATION, learn_tx)
            // TODO: HTTP interface to report ham/spam
            .build()
    }

    /// Announces a locally observed classification to all instances.
    ///
    /// Discarded when learning is disabled. Publish failures are logged;
    /// there is no synchronous caller to notify.
    pub async fn report(&self, is_spam: bool, message_id: &str, reporter: &str, reason: &str) {
        if !self.config.bayes.enabled {
            return;
        }

        let envelope = Envelope::ReportMessageId(ReportMessageId {
            is_spam,
            message_id: message_id.to_string(),
            host: self.config.hostname.clone(),
            reporter: reporter.to_string(),
            reason: reason.to_string(),
        });
        let payload = match envelope.encode() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Could not encode report for {}: {}", message_id, e);
                return;
            }
        };
        if let Err(e) = self
            .transport
            .publish(&broadcast_channel(REPORT_OPERATION), payload)
            .await
        {
            tracing::error!("Error while reporting message id {}: {}", message_id, e);
        }
    }

    async fn run_report_queue(self: Arc<Self>, mut queue: mpsc::Receiver<Vec<u8>>) -> Result<()> {
        while let Some(item) = queue.recv().await {
            let bayes = Arc::clone(&self);
            spawn_supervised("bayes.reportMessageId", async move {
                bayes.handle_report(item).await
            });
        }
        Ok(())
    }

    async fn run_learn_queue(self: Arc<Self>, mut queue: mpsc::Receiver<Vec<u8>>) -> Result<()> {
        while let Some(item) = queue.recv().await {
            let bayes = Arc::clone(&self);
            spawn_supervised("bayes.learn", async move { bayes.handle_learn(item).await });
        }
        Ok(())
    }

    /// Resolves one id-only report and re-broadcasts the expanded message.
    async fn handle_report(&self, item: Vec<u8>) -> Result<()> {
        let report = match Envelope::decode(&item)? {
            Envelope::ReportMessageId(report) => report,
            other => {
                return Err(CluegetterError::Decode(format!(
                    "expected ReportMessageId envelope, got {}",
                    other.variant_name()
                )))
            }
        };

        let message = self
            .cache
            .get_by_message_id(&report.message_id)
            .await
            .ok_or_else(|| CluegetterError::CacheMiss(report.message_id.clone()))?;

        self.corpus
            .add_to_corpus(
                report.is_spam,
                &message,
                &report.message_id,
                &report.host,
                &report.reporter,
                &report.reason,
            )
            .await;

        let lesson = Envelope::LearnMessage(LearnMessage {
            is_spam: report.is_spam,
            message,
            host: report.host,
            reporter: report.reporter,
            reason: report.reason,
        });
        self.transport
            .publish(&broadcast_channel(LEARN_OPERATION), lesson.encode()?)
            .await?;
        Ok(())
    }

    /// Fans one expanded message out to every enabled learning hook.
    async fn handle_learn(&self, item: Vec<u8>) -> Result<()> {
        let lesson = match Envelope::decode(&item)? {
            Envelope::LearnMessage(lesson) => lesson,
            other => {
                return Err(CluegetterError::Decode(format!(
                    "expected LearnMessage envelope, got {}",
                    other.variant_name()
                )))
            }
        };

        let message: Arc<[u8]> = lesson.message.into();
        for module in self.registry.modules() {
            if module.as_bayes_learner().is_none() {
                continue;
            }
            let module: Arc<dyn Module> = Arc::clone(&module);
            let message = Arc::clone(&message);
            let is_spam = lesson.is_spam;
            spawn_supervised(format!("bayes.learn.{}", module.name()), async move {
                if let Some(learner) = module.as_bayes_learner() {
                    learner.bayes_learn(&message, is_spam).await;
                }
                Ok(())
            });
        }
        Ok(())
    }
}
