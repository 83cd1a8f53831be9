//! Error types for email composition

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Invalid email address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Message content cannot be null or empty.")]
    EmptyMessage,

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("From address required")]
    MissingSender,

    #[error("At least one receiver address required")]
    MissingRecipient,

    #[error("The MimeMessage is already built.")]
    AlreadyBuilt,

    #[error("MimeMessage has not been created yet")]
    NotBuilt,

    #[error("Cannot find valid hostname for mail session")]
    MissingHostName,

    #[error("Address List provided was invalid")]
    EmptyAddressList,

    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    #[error("Invalid charset: {0}")]
    InvalidCharset(String),

    #[error("Message assembly failed: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

impl EmailError {
    /// Whether the error comes from the build state machine rather than
    /// from validating a single field.
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            EmailError::MissingSender
                | EmailError::MissingRecipient
                | EmailError::AlreadyBuilt
                | EmailError::NotBuilt
        )
    }
}

/// Size limits applied while composing a message (RFC 5321 / RFC 5322)
pub struct EmailLimits;

impl EmailLimits {
    /// Maximum length of the local part of an address
    pub const USER_MAX_LENGTH: usize = 64;

    /// Maximum length of the domain part of an address
    pub const DOMAIN_MAX_LENGTH: usize = 255;

    /// Maximum length of a complete address
    pub const PATH_MAX_LENGTH: usize = 256;

    /// Maximum length of a header name, so it fits an unfolded line
    pub const HEADER_NAME_MAX_LENGTH: usize = 76;

    /// Maximum length of a header line, excluding CRLF
    pub const HEADER_LINE_MAX_LENGTH: usize = 998;
}
