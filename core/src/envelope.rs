use serde::{Deserialize, Serialize};

use crate::{CluegetterError, Result};

/// Compact id-only spam/ham announcement.
///
/// Published by the instance that observed the classification. Other
/// instances resolve `message_id` against their own message cache, so the
/// full body is never shipped until one instance has expanded it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMessageId {
    pub is_spam: bool,
    pub message_id: String,
    pub host: String,
    pub reporter: String,
    pub reason: String,
}

/// Fully expanded spam/ham announcement carrying the message body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnMessage {
    pub is_spam: bool,
    pub message: Vec<u8>,
    pub host: String,
    pub reporter: String,
    pub reason: String,
}

/// Self-describing cross-instance message.
///
/// On the wire this is a JSON object with a `name` discriminator and exactly
/// one populated payload field. Decoding validates that the discriminator is
/// known and that the matching payload — and only that payload — is present;
/// anything else is a decode error, never a value. Envelopes carry no
/// identity beyond a single transmission.
///
/// # Examples
///
/// ```
/// use cluegetter_core::envelope::{Envelope, ReportMessageId};
///
/// let envelope = Envelope::ReportMessageId(ReportMessageId {
///     is_spam: true,
///     message_id: "20260806.1@mx1".into(),
///     host: "mx1.example.net".into(),
///     reporter: "postmaster".into(),
///     reason: "user report".into(),
/// });
///
/// let bytes = envelope.encode().unwrap();
/// let decoded = Envelope::decode(&bytes).unwrap();
/// assert_eq!(decoded, envelope);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    ReportMessageId(ReportMessageId),
    LearnMessage(LearnMessage),
}

/// Wire form: discriminator plus one optional field per known variant.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Wire {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    report_message_id: Option<ReportMessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    learn_message: Option<LearnMessage>,
}

const REPORT_MESSAGE_ID: &str = "ReportMessageId";
const LEARN_MESSAGE: &str = "LearnMessage";

impl Envelope {
    /// The discriminator string written to the wire for this variant.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Envelope::ReportMessageId(_) => REPORT_MESSAGE_ID,
            Envelope::LearnMessage(_) => LEARN_MESSAGE,
        }
    }

    /// Serializes the envelope to its wire form.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let wire = match self {
            Envelope::ReportMessageId(report) => Wire {
                name: REPORT_MESSAGE_ID.to_string(),
                report_message_id: Some(report.clone()),
                ..Wire::default()
            },
            Envelope::LearnMessage(lesson) => Wire {
                name: LEARN_MESSAGE.to_string(),
                learn_message: Some(lesson.clone()),
                ..Wire::default()
            },
        };
        Ok(serde_json::to_vec(&wire)?)
    }

    /// Decodes an envelope from its wire form.
    ///
    /// Fails when the discriminator is unknown, when the payload named by
    /// the discriminator is absent, or when a foreign payload is populated
    /// alongside it.
    pub fn decode(bytes: &[u8]) -> Result<Envelope> {
        let wire: Wire = serde_json::from_slice(bytes)?;
        match wire.name.as_str() {
            REPORT_MESSAGE_ID => match (wire.report_message_id, wire.learn_message) {
                (Some(report), None) => Ok(Envelope::ReportMessageId(report)),
                _ => Err(CluegetterError::Decode(format!(
                    "envelope tagged {} does not carry exactly that payload",
                    REPORT_MESSAGE_ID
                ))),
            },
            LEARN_MESSAGE => match (wire.learn_message, wire.report_message_id) {
                (Some(lesson), None) => Ok(Envelope::LearnMessage(lesson)),
                _ => Err(CluegetterError::Decode(format!(
                    "envelope tagged {} does not carry exactly that payload",
                    LEARN_MESSAGE
                ))),
            },
            other => Err(CluegetterError::Decode(format!(
                "unknown envelope discriminator: {other:?}"
            ))),
        }
    }
}
