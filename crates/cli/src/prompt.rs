use anyhow::{Context, Result};
use dialoguer::{Input, Password};

/// Source of user answers for the interactive commands.
pub trait Prompt {
    fn input(&mut self, label: &str) -> Result<String>;
    fn secret(&mut self, label: &str) -> Result<String>;
}

/// Reads from the terminal.
pub struct Terminal;

impl Prompt for Terminal {
    fn input(&mut self, label: &str) -> Result<String> {
        Input::<String>::new()
            .with_prompt(label)
            .allow_empty(true)
            .interact_text()
            .with_context(|| format!("Failed to read {label}"))
    }

    fn secret(&mut self, label: &str) -> Result<String> {
        Password::new()
            .with_prompt(label)
            .allow_empty_password(true)
            .interact()
            .with_context(|| format!("Failed to read {label}"))
    }
}

/// Canned answers, consumed in order.
#[cfg(test)]
pub struct Scripted(pub std::collections::VecDeque<String>);

#[cfg(test)]
impl Scripted {
    pub fn new(answers: &[&str]) -> Self {
        Self(answers.iter().map(|a| a.to_string()).collect())
    }

    fn next(&mut self, label: &str) -> Result<String> {
        self.0
            .pop_front()
            .with_context(|| format!("no scripted answer for {label}"))
    }
}

#[cfg(test)]
impl Prompt for Scripted {
    fn input(&mut self, label: &str) -> Result<String> {
        self.next(label)
    }

    fn secret(&mut self, label: &str) -> Result<String> {
        self.next(label)
    }
}
