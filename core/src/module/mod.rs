// Module capability contract.
//
// A module needs a name and an enable flag; everything else is either a
// defaulted lifecycle hook or an optional capability the registry discovers
// through the `as_*` accessors. Concrete policy modules implement the traits
// directly; handler-style registrations go through `ModuleBuilder`.

mod builder;
mod registry;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::{Address, CheckResult, DmarcReport, HttpRequest, HttpResponse, Message, MilterSession, Verdict};
use crate::Result;

pub use builder::{BuiltModule, ModuleBuilder};
pub use registry::ModuleRegistry;

/// Callback behind a named IPC command. The argument is the raw command
/// payload as received from the external command dispatcher.
pub type IpcHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Callback behind a module-registered HTTP path, exposed verbatim to the
/// external HTTP front-end.
pub type HttpHandler = Arc<dyn Fn(HttpRequest) -> HttpResponse + Send + Sync>;

/// A pluggable policy module.
///
/// Modules are constructed once at process start and live for the process
/// lifetime. `enable()` is consulted on every query and must never be
/// cached by the implementation's callers.
pub trait Module: Send + Sync {
    fn name(&self) -> &str;
    fn enable(&self) -> bool;

    /// Runs once during gateway start. A failure here is fatal.
    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn stop(&self) {}

    fn as_session_observer(&self) -> Option<&dyn SessionObserver> {
        None
    }

    fn as_message_checker(&self) -> Option<&dyn MessageChecker> {
        None
    }

    fn as_recipient_checker(&self) -> Option<&dyn RecipientChecker> {
        None
    }

    fn as_bayes_learner(&self) -> Option<&dyn BayesLearner> {
        None
    }

    fn as_dmarc_observer(&self) -> Option<&dyn DmarcReportObserver> {
        None
    }

    /// IPC command handlers. Names share one global namespace across all
    /// modules; a collision is a registration-time invariant violation.
    fn ipc_handlers(&self) -> HashMap<String, IpcHandler> {
        HashMap::new()
    }

    /// Inbound bus queues, keyed by `module!operation`. The dispatcher
    /// pushes raw payloads onto these; the module drains them.
    fn rpc_queues(&self) -> HashMap<String, mpsc::Sender<Vec<u8>>> {
        HashMap::new()
    }

    fn http_handlers(&self) -> HashMap<String, HttpHandler> {
        HashMap::new()
    }
}

/// Observes milter session lifecycle transitions.
pub trait SessionObserver: Send + Sync {
    fn connect(&self, _session: &MilterSession) {}
    fn configure(&self, _session: &MilterSession) {}
    fn disconnect(&self, _session: &MilterSession) {}
}

/// Evaluates a message during the check pipeline.
#[async_trait]
pub trait MessageChecker: Send + Sync {
    async fn message_check(&self, message: &Message) -> Option<CheckResult>;
}

/// Evaluates an envelope recipient before the body is accepted.
pub trait RecipientChecker: Send + Sync {
    fn recipient_check(&self, recipient: &Address) -> (Verdict, String);
}

/// Consumes a resolved message for statistical learning.
#[async_trait]
pub trait BayesLearner: Send + Sync {
    async fn bayes_learn(&self, message: &[u8], is_spam: bool);
}

/// Persists aggregated DMARC feedback reports.
pub trait DmarcReportObserver: Send + Sync {
    fn persist_report(&self, report: &DmarcReport);
}
