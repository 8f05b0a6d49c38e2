// Cluegetter Core Library
// Distributed mail filtering gateway runtime

pub mod bayes;
pub mod bus;
pub mod cache;
pub mod config;
pub mod envelope;
pub mod module;
pub mod supervisor;
pub mod telemetry;
pub mod types;

// Export core types
pub use bayes::{Bayes, CorpusLearner};
pub use bus::{Delivery, Dispatcher, LocalTransport, Transport};
pub use cache::{InMemoryMessageCache, MessageCache};
pub use config::{BayesConfig, Config};
pub use envelope::{Envelope, LearnMessage, ReportMessageId};
pub use module::{Module, ModuleBuilder, ModuleRegistry};

use std::sync::Arc;

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CluegetterError {
    #[error("module name must not be empty")]
    ModuleNameMissing,

    #[error("module registered twice: {0}")]
    DuplicateModule(String),

    #[error("ipc handler registered twice: {0}")]
    DuplicateIpcHandler(String),

    #[error("module {caller} requires module {dependency} but it was not found or not enabled")]
    DependencyMissing { caller: String, dependency: String },

    #[error("envelope decode error: {0}")]
    Decode(String),

    #[error("message not found in cache: {0}")]
    CacheMiss(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CluegetterError>;

/// Process context owning the core subsystems.
///
/// The registry is an explicit object injected where needed, never ambient
/// state; module registration happens between [`new`](Cluegetter::new) and
/// [`start`](Cluegetter::start).
pub struct Cluegetter {
    pub config: Config,
    pub registry: Arc<ModuleRegistry>,
    pub transport: Arc<dyn Transport>,
    pub message_cache: Arc<dyn MessageCache>,
    dispatcher: Dispatcher,
}

impl Cluegetter {
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        message_cache: Arc<dyn MessageCache>,
    ) -> Self {
        let dispatcher = Dispatcher::new(Arc::clone(&transport), config.instance);
        Self {
            config,
            registry: Arc::new(ModuleRegistry::new()),
            transport,
            message_cache,
            dispatcher,
        }
    }

    /// Registers a module. Fails on any startup invariant violation.
    pub fn register(&self, module: Arc<dyn Module>) -> Result<()> {
        self.registry.register(module)
    }

    /// Binds bus subscriptions and initialises every enabled module.
    ///
    /// An init failure aborts the start; post-startup processing never
    /// does.
    pub async fn start(&self) -> Result<()> {
        tracing::info!("Starting cluegetter core...");

        self.dispatcher.start(&self.registry).await?;
        for module in self.registry.modules() {
            module.init()?;
            tracing::info!("Initialised module {}", module.name());
        }

        tracing::info!("Cluegetter core started");
        Ok(())
    }

    pub fn stop(&self) {
        tracing::info!("Stopping cluegetter core...");
        for module in self.registry.modules() {
            module.stop();
        }
        tracing::info!("Cluegetter core stopped");
    }
}
