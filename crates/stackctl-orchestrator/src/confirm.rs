//! Confirmation gates for destructive modes

use async_trait::async_trait;
use stackctl_network::Interrupt;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Operator go-ahead for a destructive action
///
/// Anything but an explicit yes is a decline.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;

    /// True when the answer comes from a non-interactive force flag
    fn is_forced(&self) -> bool {
        false
    }
}

type Input = Arc<Mutex<Box<dyn BufRead + Send>>>;

/// Asks on the terminal and reads one line
///
/// The read runs on the blocking pool so an interrupt can end the prompt.
pub struct InteractiveGate {
    input: Input,
    interrupt: Interrupt,
}

impl InteractiveGate {
    /// Gate reading from stdin
    pub fn new() -> Self {
        Self::with_input(BufReader::new(io::stdin()))
    }

    /// Gate reading answers from `input`
    pub fn with_input(input: impl BufRead + Send + 'static) -> Self {
        Self {
            input: Arc::new(Mutex::new(Box::new(input))),
            interrupt: Interrupt::never(),
        }
    }

    /// Decline as soon as `interrupt` fires, even while waiting for an answer
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }
}

impl Default for InteractiveGate {
    fn default() -> Self {
        Self::new()
    }
}

/// One line of input, `None` on end of input or a read error
fn read_answer(input: &Input) -> Option<String> {
    let mut input = input.lock().ok()?;
    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(answer),
    }
}

#[async_trait]
impl ConfirmationGate for InteractiveGate {
    async fn confirm(&self, prompt: &str) -> bool {
        if self.interrupt.is_triggered() {
            return false;
        }
        eprint!("{} [y/N] ", prompt);
        io::stderr().flush().ok();

        let input = self.input.clone();
        let read = tokio::task::spawn_blocking(move || read_answer(&input));
        tokio::select! {
            answer = read => match answer {
                Ok(Some(answer)) => is_affirmative(&answer),
                _ => {
                    debug!("No answer on input, declining");
                    false
                }
            },
            _ = self.interrupt.triggered() => {
                eprintln!();
                warn!("Interrupted while waiting for confirmation, declining");
                false
            }
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// Always confirms; used for `--yes`
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

#[async_trait]
impl ConfirmationGate for AutoConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }

    fn is_forced(&self) -> bool {
        true
    }
}

/// Always declines
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoDecline;

#[async_trait]
impl ConfirmationGate for AutoDecline {
    async fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}
