// mask-store/src/address.rs
//! Syntactic checks for forwarding targets.
//!
//! Deliberately pragmatic rather than a full RFC 5321 grammar: the real
//! address is operator input destined for a relay handoff, so we accept
//! the common mailbox shapes and reject anything a relay would bounce on
//! sight. Dotless domains (`user@localhost`) are rejected because a
//! forwarding target must be publicly routable.

use thiserror::Error;

/// Maximum length of the local part (RFC 5321 section 4.5.3.1.1)
pub const LOCAL_MAX_LENGTH: usize = 64;

/// Maximum length of the domain (RFC 5321 section 4.5.3.1.2)
pub const DOMAIN_MAX_LENGTH: usize = 255;

/// Why an address failed validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address must contain exactly one '@'")]
    MissingAt,
    #[error("address local part is empty")]
    EmptyLocal,
    #[error("address domain is empty")]
    EmptyDomain,
    #[error("address local part exceeds {max} characters")]
    LocalTooLong { max: usize },
    #[error("address domain exceeds {max} characters")]
    DomainTooLong { max: usize },
    #[error("address local part contains an illegal character")]
    IllegalLocalCharacter,
    #[error("address local part has a leading, trailing or doubled dot")]
    BadDotPlacement,
    #[error("address domain must be dot-separated labels of letters, digits and hyphens")]
    BadDomain,
}

/// Validate a real address before it is bound to a masked one.
pub fn validate(addr: &str) -> Result<(), AddressError> {
    let mut parts = addr.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(AddressError::MissingAt),
    };

    if local.is_empty() {
        return Err(AddressError::EmptyLocal);
    }
    if local.len() > LOCAL_MAX_LENGTH {
        return Err(AddressError::LocalTooLong {
            max: LOCAL_MAX_LENGTH,
        });
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err(AddressError::BadDotPlacement);
    }
    if !local.chars().all(is_atext_or_dot) {
        return Err(AddressError::IllegalLocalCharacter);
    }

    if domain.is_empty() {
        return Err(AddressError::EmptyDomain);
    }
    if domain.len() > DOMAIN_MAX_LENGTH {
        return Err(AddressError::DomainTooLong {
            max: DOMAIN_MAX_LENGTH,
        });
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || !labels.iter().all(|label| is_valid_label(label)) {
        return Err(AddressError::BadDomain);
    }

    Ok(())
}

// RFC 5322 atext plus the dot handled separately above.
fn is_atext_or_dot(c: char) -> bool {
    c.is_ascii_alphanumeric() || ".!#$%&'*+/=?^_`{|}~-".contains(c)
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
