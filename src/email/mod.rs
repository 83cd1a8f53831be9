//! Email composition

pub mod address;
pub mod builder;
pub mod clock;
pub mod error;
pub mod message;
pub mod session;
pub mod transport;

pub use builder::{Email, EmailState, TEXT_PLAIN};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{EmailError, EmailLimits};
pub use message::{MimeMessage, RecipientType};
pub use session::{
    Credentials, MailSession, SessionConfig, SessionFactory, SmtpSessionFactory,
};
pub use transport::{ChannelTransport, Transport};
