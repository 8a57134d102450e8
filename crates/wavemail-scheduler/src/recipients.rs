//! Recipient resolution for digest emails

use std::collections::BTreeSet;
use wavemail_domain::traits::AddressResolver;
use wavemail_domain::{EmailAddress, ParticipantId};

/// The email recipients interested in a change made by `author`: every
/// other participant that resolves to an email address.
///
/// Pure in-system collaborators (no email behind them) are skipped. The
/// result is a set: order-independent, duplicates collapsed.
pub fn interested_recipients<R: AddressResolver>(
    resolver: &R,
    author: &ParticipantId,
    participants: &[ParticipantId],
) -> BTreeSet<EmailAddress> {
    let mut recipients = BTreeSet::new();
    for participant in participants {
        if participant == author {
            continue;
        }
        if let Some(email) = resolver.recipient_email(participant) {
            recipients.insert(email);
        }
    }
    recipients
}
