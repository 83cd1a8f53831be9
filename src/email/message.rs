//! The immutable message produced by a successful build

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use lettre::Message;
use lettre::message::Mailbox;
use lettre::message::header::{ContentType, HeaderName, HeaderValue};

use crate::email::error::EmailError;

/// Which recipient list to inspect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientType {
    To,
    Cc,
    Bcc,
}

/// A finalized, transport-ready message.
///
/// Created only by [`Email::build`](crate::Email::build); there is no way to
/// mutate it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MimeMessage {
    pub(crate) message_id: String,
    pub(crate) from: Mailbox,
    pub(crate) to: Vec<Mailbox>,
    pub(crate) cc: Vec<Mailbox>,
    pub(crate) bcc: Vec<Mailbox>,
    pub(crate) reply_to: Vec<Mailbox>,
    pub(crate) subject: Option<String>,
    pub(crate) content: String,
    pub(crate) content_type: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) sent_date: DateTime<Utc>,
}

impl MimeMessage {
    /// The `Message-ID` assigned at build time, including angle brackets
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn from(&self) -> &Mailbox {
        &self.from
    }

    /// Recipients of one category, in the order they were added
    pub fn recipients(&self, kind: RecipientType) -> &[Mailbox] {
        match kind {
            RecipientType::To => &self.to,
            RecipientType::Cc => &self.cc,
            RecipientType::Bcc => &self.bcc,
        }
    }

    /// Every envelope recipient: to, then cc, then bcc
    pub fn all_recipients(&self) -> impl Iterator<Item = &Mailbox> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }

    pub fn reply_to(&self) -> &[Mailbox] {
        &self.reply_to
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// The body text; empty when no body was set
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Returns the value of a custom header (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn sent_date(&self) -> DateTime<Utc> {
        self.sent_date
    }

    /// Check if this message is addressed to a specific recipient in any category
    pub fn has_recipient(&self, address: &str) -> bool {
        self.all_recipients()
            .any(|mailbox| mailbox.email.to_string().eq_ignore_ascii_case(address))
    }

    /// Convert into a `lettre` message ready for a lettre transport.
    ///
    /// Bcc recipients end up in the envelope only; lettre strips the header
    /// from the formatted output.
    pub fn to_lettre(&self) -> Result<Message, EmailError> {
        let mut builder = Message::builder()
            .message_id(Some(self.message_id.clone()))
            .from(self.from.clone())
            .date(SystemTime::from(self.sent_date));

        for mailbox in &self.to {
            builder = builder.to(mailbox.clone());
        }
        for mailbox in &self.cc {
            builder = builder.cc(mailbox.clone());
        }
        for mailbox in &self.bcc {
            builder = builder.bcc(mailbox.clone());
        }
        for mailbox in &self.reply_to {
            builder = builder.reply_to(mailbox.clone());
        }
        if let Some(subject) = &self.subject {
            builder = builder.subject(subject.clone());
        }
        for (name, value) in &self.headers {
            let name = HeaderName::new_from_ascii(name.clone())
                .map_err(|_| EmailError::InvalidHeader(format!("invalid header name '{name}'")))?;
            builder = builder.raw_header(HeaderValue::new(name, value.clone()));
        }

        let content_type = ContentType::parse(&self.content_type)
            .map_err(|_| EmailError::InvalidContentType(self.content_type.clone()))?;

        Ok(builder.header(content_type).body(self.content.clone())?)
    }

    /// Render the message as RFC 5322 bytes
    pub fn formatted(&self) -> Result<Vec<u8>, EmailError> {
        Ok(self.to_lettre()?.formatted())
    }
}
