//! # Mailwright
//!
//! Mailwright composes email messages and builds them exactly once.
//!
//! It sits on top of [`lettre`] for address parsing and message rendering,
//! and keeps composition errors explicit and recoverable.
//!
//! ## Quick Start
//!
//! ```rust
//! use mailwright::{ChannelTransport, Email, RecipientType};
//! use std::time::Duration;
//!
//! let mut email = Email::new();
//! email
//!     .set_from("a@x.com")?
//!     .add_to(["b@x.com"])?
//!     .set_subject("S")?
//!     .set_msg("body")?;
//!
//! let message = email.build()?;
//! assert_eq!(message.recipients(RecipientType::To).len(), 1);
//! assert!(message.content_type().contains("text/plain"));
//!
//! // A second build is rejected
//! assert!(email.build().is_err());
//!
//! // Delivery goes through a transport
//! let (transport, rx) = ChannelTransport::channel();
//! let mut email = Email::new();
//! email.set_from("a@x.com")?.add_to(["b@x.com"])?;
//! email.set_host_name("smtp.example.com");
//! email.send(&transport)?;
//! assert!(rx.recv_timeout(Duration::from_millis(100)).is_ok());
//! # Ok::<(), mailwright::EmailError>(())
//! ```
//!
//! ## Build rules
//!
//! - A sender is required (`From address required`)
//! - At least one `To`, `Cc` or `Bcc` recipient is required
//! - The body defaults to an empty `text/plain` part
//! - The sent date defaults to the clock's "now" at build time
//! - A failed build leaves the composition untouched
//! - After a successful build, composition setters return
//!   [`EmailError::AlreadyBuilt`]
//!
//! ## Sessions
//!
//! [`Email::mail_session`] derives the `mail.smtp.*` properties a transport
//! needs. It fails with [`EmailError::MissingHostName`] until a host name is
//! configured, either with [`Email::set_host_name`] or through
//! [`SessionConfig::from_env`].

mod email;

pub use email::{
    ChannelTransport, Clock, Credentials, Email, EmailError, EmailLimits, EmailState, FixedClock,
    MailSession, MimeMessage, RecipientType, SessionConfig, SessionFactory, SmtpSessionFactory,
    SystemClock, TEXT_PLAIN, Transport,
};
pub use email::session;
