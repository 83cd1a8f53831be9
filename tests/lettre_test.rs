use lettre::Address;
use mailwright::Email;
use std::error::Error;

#[test]
fn built_message_converts_to_lettre() -> Result<(), Box<dyn Error>> {
    let mut email = Email::new();
    email
        .set_from_named("hanako@example.com", "花子")?
        .add_to_named("tarou@example.com", "太郎")?
        .add_cc(["cc@example.com"])?
        .add_bcc(["bcc@example.com"])?
        .add_reply_to("reply@example.com", None)?
        .set_subject("件名")?
        .set_msg("本文")?
        .add_header("X-Mailer", "mailwright")?;

    let message = email.build()?.to_lettre()?;
    let envelope = message.envelope();

    assert_eq!(
        envelope.from(),
        Some(&"hanako@example.com".parse::<Address>()?)
    );
    assert_eq!(envelope.to().len(), 3);
    assert!(envelope.to().contains(&"bcc@example.com".parse::<Address>()?));

    let raw = String::from_utf8(message.formatted())?;
    assert!(raw.contains("X-Mailer: mailwright\r\n"));
    assert!(raw.contains("Reply-To: reply@example.com\r\n"));
    assert!(!raw.contains("bcc@example.com"));

    Ok(())
}

#[test]
fn formatted_message_matches_lettre_output() -> Result<(), Box<dyn Error>> {
    let mut email = Email::new();
    email
        .set_from("a@x.com")?
        .add_to(["b@x.com"])?
        .set_subject("S")?
        .set_msg("body")?;

    let message = email.build()?;
    assert_eq!(message.formatted()?, message.to_lettre()?.formatted());

    Ok(())
}
