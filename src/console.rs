//! The interactive console: line splitting, help, prompting and printing.

use std::future::Future;
use std::io::{self, BufRead, Write};

use clap::error::ErrorKind;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::command::{Line, Outcome};
use crate::dispatch::{self, Context};

pub const PROMPT: &str = ">>> ";
pub const INTRO: &str = "Welcome to the Instrument Console. Type help or ? to list commands.\n\
Use 'devicelist' to find resources and 'deviceselect' to connect.";

/// Split a console line into words. Single and double quotes group words
/// and are removed; there are no escapes.
pub fn split_line(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if let Some(q) = quote {
        return Err(format!("unterminated {q} quote"));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Lines typed at the prompt.
///
/// Reads happen on a dedicated thread and arrive over a channel. A blocking
/// stdin read cannot be cancelled, so it must never be something the
/// runtime waits on when the console exits.
pub struct Input {
    rx: mpsc::Receiver<io::Result<String>>,
}

impl Input {
    pub fn stdin() -> io::Result<Self> {
        Self::from_reader(io::BufReader::new(io::stdin()))
    }

    pub fn from_reader<R>(reader: R) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, input) = Self::channel();
        std::thread::Builder::new()
            .name("console-input".into())
            .spawn(move || {
                for line in reader.lines() {
                    let failed = line.is_err();
                    if tx.blocking_send(line).is_err() || failed {
                        break;
                    }
                }
            })?;
        Ok(input)
    }

    /// Input fed by hand. Dropping the sender is end of input.
    pub fn channel() -> (mpsc::Sender<io::Result<String>>, Self) {
        let (tx, rx) = mpsc::channel(1);
        (tx, Self { rx })
    }

    async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.rx.recv().await.transpose()
    }
}

/// What the caller should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// The line failed; the console itself is still usable.
    Failed,
    Exit,
}

pub struct Console<W> {
    ctx: Context,
    out: W,
}

impl<W: Write> Console<W> {
    pub fn new(ctx: Context, out: W) -> Self {
        Self { ctx, out }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Parse and run one line, printing its outcome or error.
    pub async fn run_line(&mut self, line: &str) -> io::Result<Step> {
        let mut words = match split_line(line) {
            Ok(words) => words,
            Err(e) => {
                writeln!(self.out, "Error: {e}")?;
                return Ok(Step::Failed);
            }
        };
        match words.first().map(String::as_str) {
            None => return Ok(Step::Continue),
            Some("?") => words[0] = "help".into(),
            Some(_) => {}
        }

        let command = match Line::parse_words(&words) {
            Ok(command) => command,
            Err(e) => {
                write!(self.out, "{}", e.render())?;
                let shown_help = matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion);
                return Ok(if shown_help { Step::Continue } else { Step::Failed });
            }
        };
        debug!("dispatching {command:?}");

        match dispatch::execute(&mut self.ctx, &command).await {
            Ok(Outcome::Exit) => Ok(Step::Exit),
            Ok(outcome) => {
                writeln!(self.out, "{outcome}")?;
                Ok(Step::Continue)
            }
            Err(e) => {
                writeln!(self.out, "Error: {e}")?;
                Ok(Step::Failed)
            }
        }
    }

    /// Run lines in order, stopping at the first failure or `exit`.
    pub async fn run_script<I, S>(&mut self, lines: I) -> io::Result<Step>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            match self.run_line(line.as_ref()).await? {
                Step::Continue => {}
                stop => return Ok(stop),
            }
        }
        Ok(Step::Continue)
    }

    /// Select `resource` before any other command. On failure the console
    /// is shut down and `Step::Failed` returned.
    pub async fn select_at_start(&mut self, resource: &str) -> io::Result<Step> {
        let step = self.run_line(&format!("deviceselect \"{resource}\"")).await?;
        if step == Step::Failed {
            self.shutdown().await?;
        }
        Ok(step)
    }

    /// Run console lines given up front, then close the session.
    pub async fn run_batch<I, S>(&mut self, lines: I) -> io::Result<Step>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let step = self.run_script(lines).await?;
        self.shutdown().await?;
        Ok(step)
    }

    /// Prompt for lines from `input` until `exit`, end of input or
    /// `interrupt` completes (Ctrl+C in the binary). Every entered line is
    /// recorded in the history.
    pub async fn interactive<F>(&mut self, mut input: Input, interrupt: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);
        writeln!(self.out, "{INTRO}")?;
        loop {
            write!(self.out, "{PROMPT}")?;
            self.out.flush()?;

            let line = tokio::select! {
                line = input.next_line() => {
                    let line = line?;
                    if line.is_none() {
                        writeln!(self.out)?;
                    }
                    line
                }
                () = &mut interrupt => {
                    writeln!(self.out, "\nCtrl+C detected.")?;
                    None
                }
            };
            let Some(line) = line else {
                break;
            };

            self.ctx.history.record(&line);
            if self.run_line(&line).await? == Step::Exit {
                break;
            }
        }
        self.shutdown().await?;
        writeln!(self.out, "{}", Outcome::Exit)
    }

    /// Close the selected session, if any.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        if let Some(address) = self.ctx.registry.selected() {
            writeln!(self.out, "Closing connection to {address}...")?;
        }
        if let Err(e) = self.ctx.registry.close().await {
            warn!("closing session failed: {e}");
        }
        Ok(())
    }
}
