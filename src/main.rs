use mailwright::{Email, EmailError, SessionConfig};
use std::env;
use std::io::{self, Write};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 4 {
        let program = args.first().map(String::as_str).unwrap_or("mailwright");
        eprintln!("Usage: {program} <from> <to[,to...]> <subject> [body]");
        std::process::exit(2);
    }

    let body = args.get(4).map(String::as_str);

    if let Err(e) = run(&args[1], &args[2], &args[3], body) {
        eprintln!("Failed to compose message: {e}");
        std::process::exit(1);
    }
}

fn run(from: &str, to: &str, subject: &str, body: Option<&str>) -> Result<(), EmailError> {
    let mut email = Email::new();
    email
        .set_from(from)?
        .add_to(to.split(',').filter(|addr| !addr.trim().is_empty()))?
        .set_subject(subject)?;

    if let Some(body) = body {
        email.set_msg(body)?;
    }

    email.set_session_config(SessionConfig::from_env());
    match email.mail_session() {
        Ok(session) => eprintln!(
            "Session: {}:{}",
            session.host().unwrap_or_default(),
            session.port().unwrap_or_default()
        ),
        Err(e) => eprintln!("No mail session ({e}); set MAIL_SMTP_HOST to configure one"),
    }

    let raw = email.build()?.formatted()?;

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(&raw)
        .and_then(|_| stdout.write_all(b"\r\n"))
        .map_err(|e| EmailError::Delivery(e.to_string()))?;
    Ok(())
}
