// Handler-style module assembly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    BayesLearner, HttpHandler, IpcHandler, MessageChecker, Module, RecipientChecker,
    SessionObserver,
};
use crate::types::{Address, CheckResult, HttpRequest, HttpResponse, Message, MilterSession, Verdict};
use crate::Result;

type EnableFn = Box<dyn Fn() -> bool + Send + Sync>;
type InitFn = Box<dyn FnOnce() -> Result<()> + Send>;
type StopFn = Box<dyn Fn() + Send + Sync>;
type SessionConfigureFn = Box<dyn Fn(&MilterSession) + Send + Sync>;
type MessageCheckFn = Box<dyn Fn(&Message) -> Option<CheckResult> + Send + Sync>;
type RecipientCheckFn = Box<dyn Fn(&Address) -> (Verdict, String) + Send + Sync>;
type BayesLearnFn = Box<dyn Fn(&[u8], bool) + Send + Sync>;

/// Assembles a module value from supplied handlers.
///
/// A capability is exposed if and only if a handler for it was supplied;
/// callers discover it through the usual `as_*` accessors, with no runtime
/// indirection for absent hooks. Modules with nontrivial state implement
/// [`Module`] directly instead.
pub struct ModuleBuilder {
    name: String,
    enable: Option<EnableFn>,
    init: Option<InitFn>,
    stop: Option<StopFn>,
    session_configure: Option<SessionConfigureFn>,
    message_check: Option<MessageCheckFn>,
    recipient_check: Option<RecipientCheckFn>,
    bayes_learn: Option<BayesLearnFn>,
    ipc: HashMap<String, IpcHandler>,
    rpc: HashMap<String, mpsc::Sender<Vec<u8>>>,
    http: HashMap<String, HttpHandler>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enable: None,
            init: None,
            stop: None,
            session_configure: None,
            message_check: None,
            recipient_check: None,
            bayes_learn: None,
            ipc: HashMap::new(),
            rpc: HashMap::new(),
            http: HashMap::new(),
        }
    }

    /// Enable flag, re-evaluated on every query. A module built without one
    /// stays disabled.
    pub fn enable(mut self, f: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.enable = Some(Box::new(f));
        self
    }

    /// Startup hook; runs at most once.
    pub fn on_init(mut self, f: impl FnOnce() -> Result<()> + Send + 'static) -> Self {
        self.init = Some(Box::new(f));
        self
    }

    pub fn on_stop(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.stop = Some(Box::new(f));
        self
    }

    pub fn session_configure(mut self, f: impl Fn(&MilterSession) + Send + Sync + 'static) -> Self {
        self.session_configure = Some(Box::new(f));
        self
    }

    pub fn message_check(
        mut self,
        f: impl Fn(&Message) -> Option<CheckResult> + Send + Sync + 'static,
    ) -> Self {
        self.message_check = Some(Box::new(f));
        self
    }

    pub fn recipient_check(
        mut self,
        f: impl Fn(&Address) -> (Verdict, String) + Send + Sync + 'static,
    ) -> Self {
        self.recipient_check = Some(Box::new(f));
        self
    }

    pub fn bayes_learn(mut self, f: impl Fn(&[u8], bool) + Send + Sync + 'static) -> Self {
        self.bayes_learn = Some(Box::new(f));
        self
    }

    pub fn ipc_handler(mut self, name: impl Into<String>, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.ipc.insert(name.into(), Arc::new(f));
        self
    }

    /// Declares an inbound bus queue under the `module!operation` key.
    pub fn rpc_queue(mut self, operation: impl Into<String>, queue: mpsc::Sender<Vec<u8>>) -> Self {
        self.rpc.insert(operation.into(), queue);
        self
    }

    pub fn http_handler(
        mut self,
        path: impl Into<String>,
        f: impl Fn(HttpRequest) -> HttpResponse + Send + Sync + 'static,
    ) -> Self {
        self.http.insert(path.into(), Arc::new(f));
        self
    }

    pub fn build(self) -> BuiltModule {
        BuiltModule {
            name: self.name,
            enable: self.enable,
            init: Mutex::new(self.init),
            stop: self.stop,
            session_configure: self.session_configure,
            message_check: self.message_check,
            recipient_check: self.recipient_check,
            bayes_learn: self.bayes_learn,
            ipc: self.ipc,
            rpc: self.rpc,
            http: self.http,
        }
    }
}

/// Module value produced by [`ModuleBuilder`].
pub struct BuiltModule {
    name: String,
    enable: Option<EnableFn>,
    init: Mutex<Option<InitFn>>,
    stop: Option<StopFn>,
    session_configure: Option<SessionConfigureFn>,
    message_check: Option<MessageCheckFn>,
    recipient_check: Option<RecipientCheckFn>,
    bayes_learn: Option<BayesLearnFn>,
    ipc: HashMap<String, IpcHandler>,
    rpc: HashMap<String, mpsc::Sender<Vec<u8>>>,
    http: HashMap<String, HttpHandler>,
}

impl Module for BuiltModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn enable(&self) -> bool {
        match &self.enable {
            Some(f) => f(),
            None => false,
        }
    }

    fn init(&self) -> Result<()> {
        let hook = self
            .init
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match hook {
            Some(f) => f(),
            None => Ok(()),
        }
    }

    fn stop(&self) {
        if let Some(f) = &self.stop {
            f();
        }
    }

    fn as_session_observer(&self) -> Option<&dyn SessionObserver> {
        self.session_configure.as_ref().map(|_| self as &dyn SessionObserver)
    }

    fn as_message_checker(&self) -> Option<&dyn MessageChecker> {
        self.message_check.as_ref().map(|_| self as &dyn MessageChecker)
    }

    fn as_recipient_checker(&self) -> Option<&dyn RecipientChecker> {
        self.recipient_check.as_ref().map(|_| self as &dyn RecipientChecker)
    }

    fn as_bayes_learner(&self) -> Option<&dyn BayesLearner> {
        self.bayes_learn.as_ref().map(|_| self as &dyn BayesLearner)
    }

    fn ipc_handlers(&self) -> HashMap<String, IpcHandler> {
        self.ipc.clone()
    }

    fn rpc_queues(&self) -> HashMap<String, mpsc::Sender<Vec<u8>>> {
        self.rpc.clone()
    }

    fn http_handlers(&self) -> HashMap<String, HttpHandler> {
        self.http.clone()
    }
}

impl SessionObserver for BuiltModule {
    fn configure(&self, session: &MilterSession) {
        if let Some(f) = &self.session_configure {
            f(session);
        }
    }
}

#[async_trait]
impl MessageChecker for BuiltModule {
    async fn message_check(&self, message: &Message) -> Option<CheckResult> {
        self.message_check.as_ref().and_then(|f| f(message))
    }
}

impl RecipientChecker for BuiltModule {
    fn recipient_check(&self, recipient: &Address) -> (Verdict, String) {
        match &self.recipient_check {
            Some(f) => f(recipient),
            None => (Verdict::Permit, String::new()),
        }
    }
}

#[async_trait]
impl BayesLearner for BuiltModule {
    async fn bayes_learn(&self, message: &[u8], is_spam: bool) {
        if let Some(f) = &self.bayes_learn {
            f(message, is_spam);
        }
    }
}
