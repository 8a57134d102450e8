//! The outbound mail tuple

use crate::address::EmailAddress;
use serde::{Deserialize, Serialize};

/// Everything the mail transport needs for one send: a from/to/bcc/subject/
/// body tuple. Plain text only; formatting beyond that is out of scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Sender address.
    pub from: EmailAddress,
    /// Primary recipients.
    pub to: Vec<EmailAddress>,
    /// Blind-copy recipients (the reply-capture address goes here).
    pub bcc: Vec<EmailAddress>,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}
