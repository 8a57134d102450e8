//! Digest message composition
//!
//! Body layout follows the original plain-text digest convention: edits by
//! one and the same contributor are joined with a bare `==` rule, anything
//! involving several contributors gets a `== From:` attribution line.

use wavemail_domain::traits::AddressResolver;
use wavemail_domain::{EditRecord, EmailAddress, OutboundMessage, ParticipantId, WaveletState};

/// Subject used when the wavelet has no title yet.
pub const EMPTY_SUBJECT_PLACEHOLDER: &str = "(no subject)";

/// The digest subject for a wavelet.
pub fn digest_subject(wavelet: &WaveletState) -> &str {
    if wavelet.title.is_empty() {
        EMPTY_SUBJECT_PLACEHOLDER
    } else {
        &wavelet.title
    }
}

/// Compose the digest for one recipient from that recipient's sendable
/// edits.
///
/// Sender selection: if every grouped edit shares exactly one contributor,
/// the mail comes from that person's personal outgoing address; any mix of
/// contributors sends from the wavelet's shared group address. The
/// reply-capture address rides along as a blind copy so an emailed reply
/// can be correlated back to the wavelet.
pub fn compose_digest<R: AddressResolver>(
    resolver: &R,
    wavelet: &WaveletState,
    edits: &[&EditRecord],
    recipient: &EmailAddress,
    capture: &EmailAddress,
) -> OutboundMessage {
    // Distinct contributors across the whole digest, in first-touch order.
    let mut contributors: Vec<&ParticipantId> = Vec::new();
    for edit in edits {
        for contributor in &edit.contributors {
            if !contributors.contains(&contributor) {
                contributors.push(contributor);
            }
        }
    }

    let from = if let [single] = contributors.as_slice() {
        resolver.personal_sender_address(*single)
    } else {
        resolver.group_sender_address(&wavelet.address_token)
    };

    let mut body = String::new();
    for (i, edit) in edits.iter().enumerate() {
        if edit.contributors.len() == 1 && contributors.len() == 1 {
            if i > 0 {
                body.push_str("==\n");
            }
        } else {
            body.push_str("== From: ");
            let names: Vec<&str> = edit.contributors.iter().map(|c| c.as_str()).collect();
            body.push_str(&names.join(", "));
            body.push('\n');
        }
        body.push_str(&edit.content);
        body.push('\n');
    }

    OutboundMessage {
        from,
        to: vec![recipient.clone()],
        bcc: vec![capture.clone()],
        subject: digest_subject(wavelet).to_string(),
        body,
    }
}
