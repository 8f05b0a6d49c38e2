use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cluegetter_core::module::{
    DmarcReportObserver, Module, ModuleBuilder, ModuleRegistry,
};
use cluegetter_core::types::{Address, DmarcReport, HttpResponse, Message, MilterSession, Verdict};
use cluegetter_core::CluegetterError;

fn enabled(name: &str) -> Arc<dyn Module> {
    Arc::new(ModuleBuilder::new(name).enable(|| true).build())
}

fn disabled(name: &str) -> Arc<dyn Module> {
    Arc::new(ModuleBuilder::new(name).build())
}

#[test]
fn registration_keeps_order_and_filters_disabled() {
    let registry = ModuleRegistry::new();
    registry.register(enabled("greylist")).expect("register");
    registry.register(disabled("clamav")).expect("register");
    registry.register(enabled("spamassassin")).expect("register");

    let names: Vec<String> = registry
        .modules()
        .iter()
        .map(|m| m.name().to_string())
        .collect();
    assert_eq!(names, vec!["greylist", "spamassassin"]);
}

#[test]
fn enable_is_reevaluated_on_every_query() {
    let registry = ModuleRegistry::new();
    let flag = Arc::new(AtomicBool::new(false));
    let probe = Arc::clone(&flag);
    registry
        .register(Arc::new(
            ModuleBuilder::new("quotas")
                .enable(move || probe.load(Ordering::SeqCst))
                .build(),
        ))
        .expect("register");

    assert!(registry.modules().is_empty());
    flag.store(true, Ordering::SeqCst);
    assert_eq!(registry.modules().len(), 1);
    flag.store(false, Ordering::SeqCst);
    assert!(registry.get("quotas").is_none());
}

#[test]
fn duplicate_name_is_rejected_and_registry_unchanged() {
    let registry = ModuleRegistry::new();
    registry.register(enabled("greylist")).expect("register");

    match registry.register(enabled("greylist")) {
        Err(CluegetterError::DuplicateModule(name)) => assert_eq!(name, "greylist"),
        other => panic!("expected duplicate module error, got {other:?}"),
    }
    assert_eq!(registry.modules().len(), 1);
}

#[test]
fn empty_name_is_rejected() {
    let registry = ModuleRegistry::new();
    assert!(matches!(
        registry.register(enabled("")),
        Err(CluegetterError::ModuleNameMissing)
    ));
    assert!(registry.modules().is_empty());
}

#[test]
fn duplicate_ipc_key_fails_the_second_registration() {
    let registry = ModuleRegistry::new();
    registry
        .register(Arc::new(
            ModuleBuilder::new("quotas")
                .enable(|| true)
                .ipc_handler("quotas!dump", |_| {})
                .build(),
        ))
        .expect("register");

    let second = registry.register(Arc::new(
        ModuleBuilder::new("reports")
            .enable(|| true)
            .ipc_handler("quotas!dump", |_| {})
            .build(),
    ));
    match second {
        Err(CluegetterError::DuplicateIpcHandler(key)) => assert_eq!(key, "quotas!dump"),
        other => panic!("expected duplicate ipc error, got {other:?}"),
    }
    assert!(registry.get("reports").is_none());
    assert!(registry.ipc_handler("quotas!dump").is_some());
}

#[test]
fn ipc_handlers_share_one_global_namespace() {
    let registry = ModuleRegistry::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    registry
        .register(Arc::new(
            ModuleBuilder::new("quotas")
                .enable(|| true)
                .ipc_handler("quotas!sync", move |arg| {
                    sink.lock().unwrap().push(arg.to_string());
                })
                .build(),
        ))
        .expect("register");

    let handler = registry.ipc_handler("quotas!sync").expect("handler");
    handler("refresh");
    assert_eq!(seen.lock().unwrap().as_slice(), ["refresh".to_string()]);
    assert!(registry.ipc_handler("quotas!drop").is_none());
    assert_eq!(registry.ipc_handlers().len(), 1);
}

#[test]
fn lookup_without_caller_is_a_plain_miss() {
    let registry = ModuleRegistry::new();
    assert!(registry.get("srs").is_none());
    assert!(registry.modules().is_empty());
}

#[test]
fn missing_dependency_names_both_parties() {
    let registry = ModuleRegistry::new();
    match registry.require("srs", "bounce-handler") {
        Err(CluegetterError::DependencyMissing { caller, dependency }) => {
            assert_eq!(caller, "bounce-handler");
            assert_eq!(dependency, "srs");
        }
        other => panic!("expected dependency error, got {:?}", other.is_ok()),
    }
}

#[test]
fn disabled_module_counts_as_missing_dependency() {
    let registry = ModuleRegistry::new();
    registry.register(disabled("srs")).expect("register");
    assert!(registry.get("srs").is_none());
    assert!(registry.require("srs", "bounce-handler").is_err());
}

#[tokio::test]
async fn builder_exposes_exactly_the_supplied_capabilities() {
    let configured = Arc::new(AtomicUsize::new(0));
    let touched = Arc::clone(&configured);
    let module = ModuleBuilder::new("blocklist")
        .enable(|| true)
        .session_configure(move |_| {
            touched.fetch_add(1, Ordering::SeqCst);
        })
        .recipient_check(|rcpt| {
            if rcpt.domain == "spam.example" {
                (Verdict::Reject, "listed domain".to_string())
            } else {
                (Verdict::Permit, String::new())
            }
        })
        .build();

    assert!(module.as_bayes_learner().is_none());
    assert!(module.as_message_checker().is_none());

    let observer = module.as_session_observer().expect("capability");
    observer.configure(&MilterSession::default());
    assert_eq!(configured.load(Ordering::SeqCst), 1);

    let checker = module.as_recipient_checker().expect("capability");
    let (verdict, reason) = checker.recipient_check(&Address::new("x", "spam.example"));
    assert_eq!(verdict, Verdict::Reject);
    assert_eq!(reason, "listed domain");
    let (verdict, _) = checker.recipient_check(&Address::new("x", "ok.example"));
    assert_eq!(verdict, Verdict::Permit);
}

#[tokio::test]
async fn builder_message_check_runs_the_supplied_hook() {
    let module = ModuleBuilder::new("keywords")
        .enable(|| true)
        .message_check(|message| {
            std::str::from_utf8(&message.body)
                .ok()
                .filter(|body| body.contains("viagra"))
                .map(|_| cluegetter_core::types::CheckResult {
                    verdict: Verdict::Reject,
                    message: "keyword match".to_string(),
                    score: 10.0,
                })
        })
        .build();

    let checker = module.as_message_checker().expect("capability");
    let spam = Message {
        queue_id: "q1".into(),
        body: b"buy viagra now".to_vec(),
    };
    assert!(checker.message_check(&spam).await.is_some());
    assert!(checker.message_check(&Message::default()).await.is_none());
}

struct DmarcAudit {
    reports: Mutex<Vec<String>>,
}

impl Module for DmarcAudit {
    fn name(&self) -> &str {
        "dmarc-audit"
    }

    fn enable(&self) -> bool {
        true
    }

    fn as_dmarc_observer(&self) -> Option<&dyn DmarcReportObserver> {
        Some(self)
    }
}

impl DmarcReportObserver for DmarcAudit {
    fn persist_report(&self, report: &DmarcReport) {
        self.reports.lock().unwrap().push(report.domain.clone());
    }
}

#[test]
fn concrete_modules_expose_capabilities_directly() {
    let registry = ModuleRegistry::new();
    let audit = Arc::new(DmarcAudit {
        reports: Mutex::new(Vec::new()),
    });
    registry.register(audit.clone()).expect("register");

    let module = registry.get("dmarc-audit").expect("module");
    let observer = module.as_dmarc_observer().expect("capability");
    observer.persist_report(&DmarcReport {
        org_name: "example org".into(),
        domain: "example.net".into(),
        raw: Vec::new(),
    });
    assert_eq!(audit.reports.lock().unwrap().as_slice(), ["example.net"]);
}

#[test]
fn http_handlers_are_merged_across_enabled_modules() {
    let registry = ModuleRegistry::new();
    registry
        .register(Arc::new(
            ModuleBuilder::new("reports")
                .enable(|| true)
                .http_handler("/reports/summary", |_req| HttpResponse {
                    status: 200,
                    body: b"ok".to_vec(),
                })
                .build(),
        ))
        .expect("register");
    registry.register(disabled("hidden")).expect("register");

    let handlers = registry.http_handlers();
    assert_eq!(handlers.len(), 1);
    let response = handlers["/reports/summary"](Default::default());
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"ok".to_vec());
}
