//! Expansion of recipients into email addresses.

use std::collections::HashSet;

use crate::error::{AlertingResult, ValidationError};

use super::documents::Recipient;
use super::indexer::ConfigIndexer;

/// Expands `recipients` into addresses, looking groups up in `indexer`.
///
/// Output keeps first-seen order and drops repeats. A missing group or a
/// reference to a non-group document is an error.
pub fn resolve_recipients(indexer: &ConfigIndexer, recipients: &[Recipient]) -> AlertingResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for recipient in recipients {
        match recipient {
            Recipient::Email(address) => {
                if !crate::destination::is_valid_email(address) {
                    return Err(ValidationError::InvalidEmailAddress {
                        address: address.clone(),
                    }
                    .into());
                }
                if seen.insert(address.clone()) {
                    out.push(address.clone());
                }
            }
            Recipient::EmailGroup(id) => {
                let group = indexer.get_email_group(id)?;
                tracing::debug!(group = %group.name, members = group.emails.len(), "expanding email group");
                for address in group.emails {
                    if seen.insert(address.clone()) {
                        out.push(address);
                    }
                }
            }
        }
    }

    Ok(out)
}
