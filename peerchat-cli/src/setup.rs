//! Interactive setup used when no subcommand is given.
//!
//! Mirrors the host/join dialogs: pick a role, then a port (host) or a
//! host and port with defaults (join).

use std::io::{self, BufRead, Write};

use peerchat_core::{parse_port, CoreError};
use peerchat_transport::ConnectConfig;

/// Default host offered when joining.
pub const DEFAULT_HOST: &str = "localhost";

/// Default port offered when joining.
pub const DEFAULT_PORT: u16 = 5000;

/// Outcome of the setup prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum Setup {
    /// Start a session with this configuration.
    Start(ConnectConfig),
    /// User backed out (empty answer or end of input).
    Cancelled,
    /// User typed something that is not a port.
    Invalid(CoreError),
}

/// Ask the user how to connect.
pub fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<Setup> {
    let Some(choice) = ask(input, output, "How do you want to connect? [h]ost / [j]oin: ")? else {
        return Ok(Setup::Cancelled);
    };

    match choice.to_ascii_lowercase().as_str() {
        "h" | "host" => {
            let Some(port) = ask(input, output, "Enter port to host on: ")? else {
                return Ok(Setup::Cancelled);
            };
            Ok(match parse_port(&port) {
                Ok(port) => Setup::Start(ConnectConfig::host(port)),
                Err(e) => Setup::Invalid(e),
            })
        }
        "j" | "join" => {
            let host = ask(input, output, &format!("Host IP [{DEFAULT_HOST}]: "))?
                .unwrap_or_else(|| DEFAULT_HOST.to_string());
            let port = match ask(input, output, &format!("Port [{DEFAULT_PORT}]: "))? {
                Some(text) => match parse_port(&text) {
                    Ok(port) => port,
                    Err(e) => return Ok(Setup::Invalid(e)),
                },
                None => DEFAULT_PORT,
            };
            Ok(Setup::Start(ConnectConfig::join(host, port)))
        }
        _ => Ok(Setup::Cancelled),
    }
}

/// Print `question`, read one line. `None` for an empty answer or EOF.
fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> io::Result<Option<String>> {
    write!(output, "{question}")?;
    output.flush()?;

    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        return Ok(None);
    }
    let answer = answer.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}
