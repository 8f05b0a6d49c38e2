// Boundary types shared with the milter session layer.
//
// The session protocol, the message-check pipeline and the DMARC report
// parser live outside this crate; these types only carry what the module
// capability contract needs to reference.

use std::collections::HashMap;

/// One SMTP session as seen by the milter front-end.
#[derive(Debug, Clone, Default)]
pub struct MilterSession {
    pub id: u64,
    pub client_addr: String,
    pub client_hostname: String,
}

/// One mail message under evaluation.
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub queue_id: String,
    pub body: Vec<u8>,
}

/// An envelope recipient or sender address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub local: String,
    pub domain: String,
}

impl Address {
    pub fn new(local: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            domain: domain.into(),
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.local, self.domain)
    }
}

/// Verdict returned by message and recipient checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Permit,
    TempFail,
    Reject,
    Error,
}

/// Outcome of one module's message check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub verdict: Verdict,
    pub message: String,
    pub score: f64,
}

/// An aggregated DMARC feedback report, parsed upstream.
#[derive(Debug, Clone, Default)]
pub struct DmarcReport {
    pub org_name: String,
    pub domain: String,
    pub raw: Vec<u8>,
}

/// Request handed to a module-registered HTTP handler.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Response produced by a module-registered HTTP handler.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status: 200,
            body: Vec::new(),
        }
    }
}
