use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ring::digest::{digest, SHA256};
use std::io::{self, Write};

pub const MAX_ATTEMPTS: usize = 3;

/// Compares SHA-256 digests so the comparison length never depends on the input.
pub fn password_matches(entered: &str, expected: &str) -> bool {
    let a = digest(&SHA256, entered.as_bytes());
    let b = digest(&SHA256, expected.as_bytes());
    a.as_ref()
        .iter()
        .zip(b.as_ref())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Ask for the dashboard password until it matches or attempts run out.
/// `read` supplies one entered password per call.
pub fn gate<F>(expected: &str, mut read: F) -> Result<()>
where
    F: FnMut(usize) -> Result<String>,
{
    for attempt in 1..=MAX_ATTEMPTS {
        let entered = read(attempt)?;
        if password_matches(&entered, expected) {
            tracing::info!(attempt, "operator authenticated");
            return Ok(());
        }
        tracing::warn!(attempt, "password rejected");
        println!("  Password incorrect");
    }
    anyhow::bail!("Password incorrect ({} attempts)", MAX_ATTEMPTS)
}

/// Read a password from the terminal, echoing `*` per character.
pub fn read_masked(label: &str) -> Result<String> {
    print!("  {} > ", label);
    io::stdout().flush()?;
    enable_raw_mode()?;
    let result = read_masked_raw();
    disable_raw_mode()?;
    println!();
    result
}

fn read_masked_raw() -> Result<String> {
    let mut buf = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Enter => return Ok(buf),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    anyhow::bail!("password entry cancelled");
                }
                KeyCode::Esc => anyhow::bail!("password entry cancelled"),
                KeyCode::Backspace => {
                    if buf.pop().is_some() {
                        print!("\u{8} \u{8}");
                        io::stdout().flush()?;
                    }
                }
                KeyCode::Char(c) => {
                    buf.push(c);
                    print!("*");
                    io::stdout().flush()?;
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_matches() {
        assert!(password_matches("hunter2", "hunter2"));
        assert!(!password_matches("hunter", "hunter2"));
        assert!(!password_matches("", "hunter2"));
    }

    #[test]
    fn test_gate_accepts_on_second_attempt() {
        let mut tries = vec!["wrong".to_string(), "open sesame".to_string()].into_iter();
        let result = gate("open sesame", |_| Ok(tries.next().unwrap()));
        assert!(result.is_ok());
    }

    #[test]
    fn test_gate_gives_up_after_max_attempts() {
        let mut calls = 0;
        let result = gate("right", |_| {
            calls += 1;
            Ok("wrong".to_string())
        });
        assert!(result.is_err());
        assert_eq!(calls, MAX_ATTEMPTS);
    }

    #[test]
    fn test_gate_propagates_read_errors() {
        let result = gate("right", |_| anyhow::bail!("stdin closed"));
        assert_eq!(result.unwrap_err().to_string(), "stdin closed");
    }
}
