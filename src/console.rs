use std::collections::VecDeque;
use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::core::cancel::Cancellation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A trimmed line of user input.
    Line(String),
    /// Ctrl-C while waiting.
    Interrupted,
    /// End of the input stream.
    Closed,
}

#[allow(async_fn_in_trait)]
pub trait Console {
    fn show(&mut self, text: &str);
    fn clear(&mut self);
    async fn ask(&mut self, prompt: &str) -> Input;
}

impl<C: Console> Console for &mut C {
    fn show(&mut self, text: &str) {
        (**self).show(text)
    }

    fn clear(&mut self) {
        (**self).clear()
    }

    async fn ask(&mut self, prompt: &str) -> Input {
        (**self).ask(prompt).await
    }
}

/// Interactive stdin/stdout console.
pub struct Terminal {
    lines: Lines<BufReader<Stdin>>,
    cancel: Cancellation,
}

impl Terminal {
    pub fn new(cancel: Cancellation) -> Self {
        Terminal {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            cancel,
        }
    }
}

impl Console for Terminal {
    fn show(&mut self, text: &str) {
        println!("{}", text);
    }

    fn clear(&mut self) {
        print!("\x1B[2J\x1B[1;1H");
        let _ = io::stdout().flush();
    }

    async fn ask(&mut self, prompt: &str) -> Input {
        print!("{} ", prompt);
        let _ = io::stdout().flush();
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Input::Interrupted,
            line = self.lines.next_line() => match line {
                Ok(Some(line)) => Input::Line(line.trim().to_string()),
                Ok(None) => Input::Closed,
                Err(e) => {
                    tracing::warn!("failed to read input: {}", e);
                    Input::Closed
                }
            },
        }
    }
}

/// Replays a fixed script of answers and records everything shown.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    script: VecDeque<Input>,
    pub transcript: String,
}

impl ScriptedConsole {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedConsole {
            script: lines
                .into_iter()
                .map(|line| Input::Line(line.into().trim().to_string()))
                .collect(),
            transcript: String::new(),
        }
    }

    pub fn from_inputs(inputs: impl IntoIterator<Item = Input>) -> Self {
        ScriptedConsole {
            script: inputs.into_iter().collect(),
            transcript: String::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Console for ScriptedConsole {
    fn show(&mut self, text: &str) {
        self.transcript.push_str(text);
        self.transcript.push('\n');
    }

    fn clear(&mut self) {
        self.transcript.push_str("\n[clear]\n");
    }

    async fn ask(&mut self, prompt: &str) -> Input {
        let input = self.script.pop_front().unwrap_or(Input::Closed);
        self.transcript.push_str(prompt);
        if let Input::Line(line) = &input {
            self.transcript.push(' ');
            self.transcript.push_str(line);
        }
        self.transcript.push('\n');
        input
    }
}
