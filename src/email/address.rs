//! Address validation

use lettre::Address;
use lettre::message::Mailbox;

use crate::email::error::{EmailError, EmailLimits};

/// Validate an address and wrap it in a mailbox with an optional display name
pub fn parse_mailbox(address: &str, name: Option<&str>) -> Result<Mailbox, EmailError> {
    let address = parse_address(address)?;
    let name = name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned);
    Ok(Mailbox::new(name, address))
}

/// Validate an address of the form `local@domain`
pub fn parse_address(addr: &str) -> Result<Address, EmailError> {
    let addr = addr.trim();
    let invalid = |reason: &str| EmailError::InvalidAddress {
        address: addr.to_owned(),
        reason: reason.to_owned(),
    };

    if addr.len() > EmailLimits::PATH_MAX_LENGTH {
        return Err(invalid(&format!(
            "address too long (max {} characters)",
            EmailLimits::PATH_MAX_LENGTH
        )));
    }

    let Some(at_pos) = addr.rfind('@') else {
        return Err(invalid("address must contain @ symbol"));
    };

    let user_part = &addr[..at_pos];
    let domain_part = &addr[at_pos + 1..];

    if user_part.is_empty() || domain_part.is_empty() {
        return Err(invalid("address must have a local part and a domain"));
    }

    if user_part.len() > EmailLimits::USER_MAX_LENGTH {
        return Err(invalid(&format!(
            "local part too long (max {} characters)",
            EmailLimits::USER_MAX_LENGTH
        )));
    }

    if domain_part.len() > EmailLimits::DOMAIN_MAX_LENGTH {
        return Err(invalid(&format!(
            "domain too long (max {} characters)",
            EmailLimits::DOMAIN_MAX_LENGTH
        )));
    }

    addr.parse::<Address>()
        .map_err(|err| invalid(&err.to_string()))
}

/// Validate every address of a batch before any of them is used
pub fn parse_mailboxes<I, S>(addresses: I) -> Result<Vec<Mailbox>, EmailError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    addresses
        .into_iter()
        .map(|addr| parse_mailbox(addr.as_ref(), None))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_addresses() {
        for addr in [
            "ab@bc.com",
            "a.b@c.org",
            "abcdefghijklmnopqrst@abcdefghijklmnopqrst.com.bd",
        ] {
            let parsed = parse_address(addr).unwrap();
            assert_eq!(parsed.to_string(), addr);
        }
    }

    #[test]
    fn test_address_is_trimmed() {
        let parsed = parse_address("  user@example.com ").unwrap();
        assert_eq!(parsed.user(), "user");
        assert_eq!(parsed.domain(), "example.com");
    }

    #[test]
    fn test_missing_at_symbol() {
        let result = parse_address("not-an-address");
        assert!(matches!(result, Err(EmailError::InvalidAddress { .. })));
    }

    #[test]
    fn test_missing_parts() {
        assert!(parse_address("@example.com").is_err());
        assert!(parse_address("user@").is_err());
        assert!(parse_address("").is_err());
    }

    #[test]
    fn test_local_part_too_long() {
        let addr = format!("{}@example.com", "a".repeat(EmailLimits::USER_MAX_LENGTH + 1));
        match parse_address(&addr) {
            Err(EmailError::InvalidAddress { reason, .. }) => {
                assert!(reason.contains("local part too long"))
            }
            other => panic!("expected InvalidAddress, got {other:?}"),
        }
    }

    #[test]
    fn test_rejected_by_syntax_check() {
        assert!(parse_address("two words@example.com").is_err());
    }

    #[test]
    fn test_mailbox_keeps_display_name() {
        let mailbox = parse_mailbox("reply@gmail.com", Some("Reply Name")).unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("Reply Name"));
        assert_eq!(mailbox.email.to_string(), "reply@gmail.com");

        let unnamed = parse_mailbox("reply@gmail.com", Some("  ")).unwrap();
        assert!(unnamed.name.is_none());
    }

    #[test]
    fn test_batch_fails_as_a_whole() {
        let result = parse_mailboxes(["good@example.com", "bad"]);
        assert!(result.is_err());

        let mailboxes = parse_mailboxes(["one@example.com", "two@example.com"]).unwrap();
        assert_eq!(mailboxes.len(), 2);
    }
}
