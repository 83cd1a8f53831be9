//! Message composition and the build state machine

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lettre::message::Mailbox;
use lettre::message::header::{ContentType, HeaderName};
use tracing::debug;
use uuid::Uuid;

use crate::email::address::{parse_mailbox, parse_mailboxes};
use crate::email::clock::{Clock, SystemClock};
use crate::email::error::{EmailError, EmailLimits};
use crate::email::message::MimeMessage;
use crate::email::session::{
    Credentials, MailSession, SessionConfig, SessionFactory, SmtpSessionFactory,
};
use crate::email::transport::Transport;

/// Media type used when no other content type was set
pub const TEXT_PLAIN: &str = "text/plain";

/// Headers derived from the composition itself; `add_header` refuses them
const RESERVED_HEADERS: [&str; 12] = [
    "From",
    "Sender",
    "To",
    "Cc",
    "Bcc",
    "Reply-To",
    "Subject",
    "Date",
    "Message-ID",
    "MIME-Version",
    "Content-Type",
    "Content-Transfer-Encoding",
];

/// Lifecycle of an [`Email`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailState {
    /// Composition may still change
    Open,
    /// A message was built; terminal
    Built,
}

/// Accumulates sender, recipients, body and headers, then builds an
/// immutable [`MimeMessage`] exactly once.
///
/// Composition setters fail with [`EmailError::AlreadyBuilt`] once the
/// message is built. Session settings (host, ports, timeouts, credentials)
/// stay writable because they never touch the built message.
pub struct Email {
    from: Option<Mailbox>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    reply_to: Vec<Mailbox>,
    subject: Option<String>,
    content: Option<String>,
    content_type: Option<String>,
    charset: Option<String>,
    headers: Vec<(String, String)>,
    sent_date: Option<DateTime<Utc>>,
    session: SessionConfig,
    clock: Box<dyn Clock>,
    message: Option<MimeMessage>,
}

impl Email {
    /// Create an empty email using the system clock
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Create an empty email reading "now" from the given clock
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            from: None,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            reply_to: Vec::new(),
            subject: None,
            content: None,
            content_type: None,
            charset: None,
            headers: Vec::new(),
            sent_date: None,
            session: SessionConfig::default(),
            clock: Box::new(clock),
            message: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> EmailState {
        if self.message.is_some() {
            EmailState::Built
        } else {
            EmailState::Open
        }
    }

    pub fn is_built(&self) -> bool {
        self.state() == EmailState::Built
    }

    fn ensure_open(&self) -> Result<(), EmailError> {
        match self.state() {
            EmailState::Open => Ok(()),
            EmailState::Built => Err(EmailError::AlreadyBuilt),
        }
    }

    /// Set the sender address
    pub fn set_from(&mut self, address: &str) -> Result<&mut Self, EmailError> {
        self.ensure_open()?;
        self.from = Some(parse_mailbox(address, None)?);
        Ok(self)
    }

    /// Set the sender address with a display name
    pub fn set_from_named(&mut self, address: &str, name: &str) -> Result<&mut Self, EmailError> {
        self.ensure_open()?;
        self.from = Some(parse_mailbox(address, Some(name))?);
        Ok(self)
    }

    /// Append one or more `To` recipients.
    ///
    /// The whole batch is validated first; on error nothing is appended.
    pub fn add_to<I, S>(&mut self, addresses: I) -> Result<&mut Self, EmailError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_open()?;
        let parsed = parse_mailboxes(addresses)?;
        self.to.extend(parsed);
        Ok(self)
    }

    /// Append one or more `Cc` recipients
    pub fn add_cc<I, S>(&mut self, addresses: I) -> Result<&mut Self, EmailError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_open()?;
        let parsed = parse_mailboxes(addresses)?;
        self.cc.extend(parsed);
        Ok(self)
    }

    /// Append one or more `Bcc` recipients
    pub fn add_bcc<I, S>(&mut self, addresses: I) -> Result<&mut Self, EmailError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_open()?;
        let parsed = parse_mailboxes(addresses)?;
        self.bcc.extend(parsed);
        Ok(self)
    }

    pub fn add_to_named(&mut self, address: &str, name: &str) -> Result<&mut Self, EmailError> {
        self.ensure_open()?;
        self.to.push(parse_mailbox(address, Some(name))?);
        Ok(self)
    }

    pub fn add_cc_named(&mut self, address: &str, name: &str) -> Result<&mut Self, EmailError> {
        self.ensure_open()?;
        self.cc.push(parse_mailbox(address, Some(name))?);
        Ok(self)
    }

    pub fn add_bcc_named(&mut self, address: &str, name: &str) -> Result<&mut Self, EmailError> {
        self.ensure_open()?;
        self.bcc.push(parse_mailbox(address, Some(name))?);
        Ok(self)
    }

    /// Replace the `To` list; an empty list is rejected
    pub fn set_to<I, S>(&mut self, addresses: I) -> Result<&mut Self, EmailError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_open()?;
        self.to = replacement_list(addresses)?;
        Ok(self)
    }

    /// Replace the `Cc` list; an empty list is rejected
    pub fn set_cc<I, S>(&mut self, addresses: I) -> Result<&mut Self, EmailError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_open()?;
        self.cc = replacement_list(addresses)?;
        Ok(self)
    }

    /// Replace the `Bcc` list; an empty list is rejected
    pub fn set_bcc<I, S>(&mut self, addresses: I) -> Result<&mut Self, EmailError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_open()?;
        self.bcc = replacement_list(addresses)?;
        Ok(self)
    }

    /// Append a `Reply-To` address with an optional display name
    pub fn add_reply_to(
        &mut self,
        address: &str,
        name: Option<&str>,
    ) -> Result<&mut Self, EmailError> {
        self.ensure_open()?;
        self.reply_to.push(parse_mailbox(address, name)?);
        Ok(self)
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) -> Result<&mut Self, EmailError> {
        self.ensure_open()?;
        self.subject = Some(subject.into());
        Ok(self)
    }

    /// Set a plain-text body.
    ///
    /// Blank text (empty after trimming) is rejected and leaves the current
    /// body untouched.
    pub fn set_msg(&mut self, msg: &str) -> Result<&mut Self, EmailError> {
        self.ensure_open()?;
        if msg.trim().is_empty() {
            return Err(EmailError::EmptyMessage);
        }

        self.content = Some(msg.to_owned());
        self.content_type = Some(TEXT_PLAIN.to_owned());
        Ok(self)
    }

    /// Set a single-part body with an explicit media type
    pub fn set_content(
        &mut self,
        content: impl Into<String>,
        content_type: &str,
    ) -> Result<&mut Self, EmailError> {
        self.ensure_open()?;
        let content_type = content_type.trim();
        ContentType::parse(content_type)
            .map_err(|_| EmailError::InvalidContentType(content_type.to_owned()))?;

        self.content = Some(content.into());
        self.content_type = Some(content_type.to_owned());
        Ok(self)
    }

    /// Set the charset appended to `text/*` content types
    pub fn set_charset(&mut self, charset: &str) -> Result<&mut Self, EmailError> {
        self.ensure_open()?;
        let valid = !charset.is_empty()
            && charset
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
            && ContentType::parse(&format!("{TEXT_PLAIN}; charset={charset}")).is_ok();
        if !valid {
            return Err(EmailError::InvalidCharset(charset.to_owned()));
        }

        self.charset = Some(charset.to_owned());
        Ok(self)
    }

    /// Add a custom header, replacing any header with the same name
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<&mut Self, EmailError> {
        self.ensure_open()?;
        validate_header(name, value)?;

        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_owned(),
            None => self.headers.push((name.to_owned(), value.to_owned())),
        }
        Ok(self)
    }

    /// Replace all custom headers; nothing changes if any pair is invalid
    pub fn set_headers<I, K, V>(&mut self, headers: I) -> Result<&mut Self, EmailError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.ensure_open()?;
        let mut replaced: Vec<(String, String)> = Vec::new();
        for (name, value) in headers {
            let (name, value) = (name.as_ref(), value.as_ref());
            validate_header(name, value)?;
            replaced.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
            replaced.push((name.to_owned(), value.to_owned()));
        }

        self.headers = replaced;
        Ok(self)
    }

    pub fn set_sent_date(&mut self, date: DateTime<Utc>) -> Result<&mut Self, EmailError> {
        self.ensure_open()?;
        self.sent_date = Some(date);
        Ok(self)
    }

    /// The explicit sent date, or the clock's current time if none was set
    pub fn sent_date(&self) -> DateTime<Utc> {
        self.sent_date.unwrap_or_else(|| self.clock.now())
    }

    pub fn set_host_name(&mut self, host_name: impl Into<String>) -> &mut Self {
        self.session.host_name = Some(host_name.into());
        self
    }

    pub fn host_name(&self) -> Option<&str> {
        self.session.host_name.as_deref()
    }

    pub fn set_smtp_port(&mut self, port: u16) -> &mut Self {
        self.session.smtp_port = port;
        self
    }

    pub fn smtp_port(&self) -> u16 {
        self.session.smtp_port
    }

    pub fn set_ssl_smtp_port(&mut self, port: u16) -> &mut Self {
        self.session.ssl_smtp_port = port;
        self
    }

    pub fn set_socket_connection_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.session.socket_connection_timeout = timeout;
        self
    }

    pub fn socket_connection_timeout(&self) -> Duration {
        self.session.socket_connection_timeout
    }

    pub fn set_socket_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.session.socket_timeout = timeout;
        self
    }

    pub fn socket_timeout(&self) -> Duration {
        self.session.socket_timeout
    }

    pub fn set_authentication(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> &mut Self {
        self.session.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Envelope sender used for bounces, when it differs from `From`
    pub fn set_bounce_address(&mut self, address: &str) -> Result<&mut Self, EmailError> {
        let address = parse_mailbox(address, None)?;
        self.session.bounce_address = Some(address.email.to_string());
        Ok(self)
    }

    pub fn set_start_tls_enabled(&mut self, enabled: bool) -> &mut Self {
        self.session.start_tls_enabled = enabled;
        self
    }

    pub fn set_start_tls_required(&mut self, required: bool) -> &mut Self {
        self.session.start_tls_required = required;
        self
    }

    pub fn set_ssl_on_connect(&mut self, ssl: bool) -> &mut Self {
        self.session.ssl_on_connect = ssl;
        self
    }

    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.session.debug = debug;
        self
    }

    /// Replace every session setting at once, e.g. with [`SessionConfig::from_env`]
    pub fn set_session_config(&mut self, config: SessionConfig) -> &mut Self {
        self.session = config;
        self
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session
    }

    pub fn from_address(&self) -> Option<&Mailbox> {
        self.from.as_ref()
    }

    pub fn to_addresses(&self) -> &[Mailbox] {
        &self.to
    }

    pub fn cc_addresses(&self) -> &[Mailbox] {
        &self.cc
    }

    pub fn bcc_addresses(&self) -> &[Mailbox] {
        &self.bcc
    }

    pub fn reply_to_addresses(&self) -> &[Mailbox] {
        &self.reply_to
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// The body as set, `None` if no body was ever set
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// The content type as set, `None` if no body was ever set
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the value of a custom header (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The built message, if [`build`](Self::build) has succeeded
    pub fn mime_message(&self) -> Option<&MimeMessage> {
        self.message.as_ref()
    }

    fn effective_content_type(&self) -> String {
        let base = self.content_type.as_deref().unwrap_or(TEXT_PLAIN);
        match &self.charset {
            Some(charset)
                if base.to_ascii_lowercase().starts_with("text/")
                    && !base.to_ascii_lowercase().contains("charset=") =>
            {
                format!("{base}; charset={charset}")
            }
            _ => base.to_owned(),
        }
    }

    /// Validate the composition and build the message.
    ///
    /// Succeeds at most once. On failure the email stays open and unchanged.
    pub fn build(&mut self) -> Result<&MimeMessage, EmailError> {
        self.ensure_open()?;

        let from = self.from.clone().ok_or(EmailError::MissingSender)?;

        if self.to.is_empty() && self.cc.is_empty() && self.bcc.is_empty() {
            return Err(EmailError::MissingRecipient);
        }

        let sent_date = self.sent_date();
        let message_id = format!("<{}@{}>", Uuid::new_v4().simple(), from.email.domain());

        let message = MimeMessage {
            message_id,
            from,
            to: self.to.clone(),
            cc: self.cc.clone(),
            bcc: self.bcc.clone(),
            reply_to: self.reply_to.clone(),
            subject: self.subject.clone(),
            content: self.content.clone().unwrap_or_default(),
            content_type: self.effective_content_type(),
            headers: self.headers.clone(),
            sent_date,
        };

        debug!(
            message_id = message.message_id(),
            to = self.to.len(),
            cc = self.cc.len(),
            bcc = self.bcc.len(),
            "built message"
        );

        Ok(&*self.message.insert(message))
    }

    /// Derive a mail session with the default SMTP factory
    pub fn mail_session(&self) -> Result<MailSession, EmailError> {
        self.mail_session_with(&SmtpSessionFactory)
    }

    pub fn mail_session_with(
        &self,
        factory: &dyn SessionFactory,
    ) -> Result<MailSession, EmailError> {
        factory.create(&self.session)
    }

    /// Build the message and hand it to `transport`, returning its Message-ID.
    ///
    /// The session is derived before building, so a missing host name
    /// leaves the email open.
    pub fn send(&mut self, transport: &dyn Transport) -> Result<String, EmailError> {
        self.ensure_open()?;
        let session = self.mail_session()?;
        let message = self.build()?;

        transport.deliver(&session, message)?;
        Ok(message.message_id().to_owned())
    }

    /// Deliver an already built message again, e.g. after a failed delivery
    pub fn send_mime_message(&self, transport: &dyn Transport) -> Result<String, EmailError> {
        let message = self.message.as_ref().ok_or(EmailError::NotBuilt)?;
        let session = self.mail_session()?;

        transport.deliver(&session, message)?;
        Ok(message.message_id().to_owned())
    }
}

impl Default for Email {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Email")
            .field("state", &self.state())
            .field("from", &self.from)
            .field("to", &self.to)
            .field("cc", &self.cc)
            .field("bcc", &self.bcc.len())
            .field("subject", &self.subject)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

fn replacement_list<I, S>(addresses: I) -> Result<Vec<Mailbox>, EmailError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parsed = parse_mailboxes(addresses)?;
    if parsed.is_empty() {
        return Err(EmailError::EmptyAddressList);
    }
    Ok(parsed)
}

fn validate_header(name: &str, value: &str) -> Result<(), EmailError> {
    if name.is_empty() {
        return Err(EmailError::InvalidHeader(
            "name can not be null or empty".to_string(),
        ));
    }

    if value.is_empty() {
        return Err(EmailError::InvalidHeader(
            "value can not be null or empty".to_string(),
        ));
    }

    if !name.bytes().all(|b| b.is_ascii_graphic() && b != b':') {
        return Err(EmailError::InvalidHeader(format!(
            "name '{name}' must be printable ASCII without ':'"
        )));
    }

    if RESERVED_HEADERS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        return Err(EmailError::InvalidHeader(format!(
            "'{name}' is set from the message itself"
        )));
    }

    if name.len() > EmailLimits::HEADER_NAME_MAX_LENGTH {
        return Err(EmailError::InvalidHeader(format!(
            "name too long (max {} characters)",
            EmailLimits::HEADER_NAME_MAX_LENGTH
        )));
    }

    HeaderName::new_from_ascii(name.to_owned())
        .map_err(|_| EmailError::InvalidHeader(format!("invalid header name '{name}'")))?;

    if value.contains(['\r', '\n']) {
        return Err(EmailError::InvalidHeader(format!(
            "value of '{name}' must not contain line breaks"
        )));
    }

    if name.len() + 2 + value.len() > EmailLimits::HEADER_LINE_MAX_LENGTH {
        return Err(EmailError::InvalidHeader(format!(
            "header line too long (max {} characters)",
            EmailLimits::HEADER_LINE_MAX_LENGTH
        )));
    }

    Ok(())
}
