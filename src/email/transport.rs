//! Delivery seam for built messages

use std::sync::mpsc;

use tracing::debug;

use crate::email::error::EmailError;
use crate::email::message::MimeMessage;
use crate::email::session::MailSession;

/// Hands a built message to whatever actually delivers it
pub trait Transport {
    fn deliver(&self, session: &MailSession, message: &MimeMessage) -> Result<(), EmailError>;
}

/// Delivers messages to an in-process channel
///
/// Handy for tests: keep the receiver and use `recv_timeout()` to check
/// what was sent.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: mpsc::Sender<MimeMessage>,
}

impl ChannelTransport {
    pub fn new(sender: mpsc::Sender<MimeMessage>) -> Self {
        Self { sender }
    }

    /// Create a transport together with the receiving end of its channel
    pub fn channel() -> (Self, mpsc::Receiver<MimeMessage>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }
}

impl Transport for ChannelTransport {
    fn deliver(&self, session: &MailSession, message: &MimeMessage) -> Result<(), EmailError> {
        self.sender
            .send(message.clone())
            .map_err(|_| EmailError::Delivery("receiver disconnected".to_string()))?;

        debug!(
            host = session.host().unwrap_or_default(),
            message_id = message.message_id(),
            "message handed to channel"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::builder::Email;
    use std::time::Duration;

    fn sendable_email() -> Email {
        let mut email = Email::new();
        email
            .set_from("sender@example.com")
            .unwrap()
            .add_to(["recipient@example.com"])
            .unwrap()
            .set_msg("Hello")
            .unwrap();
        email.set_host_name("smtp.example.com");
        email
    }

    #[test]
    fn test_send_delivers_once() {
        let (transport, rx) = ChannelTransport::channel();
        let mut email = sendable_email();

        let message_id = email.send(&transport).unwrap();
        let delivered = rx.recv_timeout(Duration::from_millis(100)).unwrap();

        assert_eq!(delivered.message_id(), message_id);
        assert_eq!(delivered.content(), "Hello");
        assert!(matches!(email.send(&transport), Err(EmailError::AlreadyBuilt)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_without_host_keeps_email_open() {
        let (transport, rx) = ChannelTransport::channel();
        let mut email = Email::new();
        email
            .set_from("sender@example.com")
            .unwrap()
            .add_to(["recipient@example.com"])
            .unwrap();

        assert!(matches!(email.send(&transport), Err(EmailError::MissingHostName)));
        assert!(!email.is_built());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_disconnected_receiver() {
        let (transport, rx) = ChannelTransport::channel();
        drop(rx);
        let mut email = sendable_email();

        assert!(matches!(email.send(&transport), Err(EmailError::Delivery(_))));
        assert!(email.is_built());
    }

    #[test]
    fn test_resend_built_message() {
        let (broken, rx) = ChannelTransport::channel();
        drop(rx);
        let mut email = sendable_email();
        assert!(email.send(&broken).is_err());

        let (transport, rx) = ChannelTransport::channel();
        let message_id = email.send_mime_message(&transport).unwrap();
        assert_eq!(rx.recv().unwrap().message_id(), message_id);
    }

    #[test]
    fn test_resend_requires_built_message() {
        let (transport, _rx) = ChannelTransport::channel();
        let email = sendable_email();

        assert!(matches!(
            email.send_mime_message(&transport),
            Err(EmailError::NotBuilt)
        ));
    }
}
