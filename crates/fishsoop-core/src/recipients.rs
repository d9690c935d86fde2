// crates/fishsoop-core/src/recipients.rs

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::record::{attrs, SensorRecord};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$")
        .expect("email pattern is valid")
});

pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_PATTERN.is_match(candidate)
}

/// Splits a comma-separated address list, keeping well-formed entries in order.
pub fn parse_address_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|candidate| is_valid_email(candidate))
        .map(str::to_string)
        .collect()
}

/// Configured recipients win; otherwise the vessel's own addresses, otherwise the defaults.
pub fn recipients_for(
    configured: &[String],
    record: &SensorRecord,
    default_recipients: &[String],
) -> Vec<String> {
    if !configured.is_empty() {
        return configured.to_vec();
    }
    match record.attribute(attrs::VESSEL_EMAIL) {
        Some(raw) => {
            let addresses = parse_address_list(raw);
            info!(source = %record.source, recipients = ?addresses, "resolved vessel recipients");
            addresses
        }
        None => {
            warn!(source = %record.source, "record has no vessel email, using default recipients");
            default_recipients.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_valid_addresses_in_order() {
        assert_eq!(
            parse_address_list("a@x.com, not-an-email, b@y.com"),
            vec!["a@x.com", "b@y.com"]
        );
        assert_eq!(
            parse_address_list(" skipper+nrt@boat.co.nz ,"),
            vec!["skipper+nrt@boat.co.nz"]
        );
        assert!(parse_address_list("NA").is_empty());
    }

    #[test]
    fn pattern_requires_domain_dot() {
        assert!(is_valid_email("crew@vessel.example.com"));
        assert!(!is_valid_email("crew@localhost"));
        assert!(!is_valid_email("two words@x.com"));
    }
}
