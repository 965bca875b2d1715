//! Interactive terminal prompts
//!
//! Prompts read from any `BufRead` and write to any `Write`. Invalid answers
//! are re-asked; end of input is an error.

use std::io::{BufRead, Write};

use thiserror::Error;

use crate::config::PatchCounts;
use crate::platform::argyll::DisplayInfo;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Input closed before an answer was given")]
    EndOfInput,
    #[error("No display devices found")]
    NoDisplays,
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

const GRAY_QUESTION: &str = "Enter the number of grayscale patches (e.g., 64, or 0 to skip): ";
const COLOR_QUESTION: &str =
    "Enter the number of single-channel color patches per channel (e.g., 64, or 0 to skip): ";

pub struct Prompter<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Prints `question` and returns the trimmed answer
    pub fn ask(&mut self, question: &str) -> Result<String, PromptError> {
        write!(self.output, "{question}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PromptError::EndOfInput);
        }
        Ok(line.trim().to_string())
    }

    fn say(&mut self, message: &str) -> Result<(), PromptError> {
        writeln!(self.output, "{message}")?;
        Ok(())
    }

    /// Asks for a calibration base name until a non-empty one is given
    pub fn base_name(&mut self) -> Result<String, PromptError> {
        loop {
            let name =
                self.ask("Enter a base name for the calibration files (e.g., 'calibration'): ")?;
            if !name.is_empty() {
                return Ok(name);
            }
            self.say("Base name cannot be empty.")?;
        }
    }

    /// Lists displays and returns the display number the user picked
    pub fn select_display(&mut self, displays: &[DisplayInfo]) -> Result<usize, PromptError> {
        if displays.is_empty() {
            return Err(PromptError::NoDisplays);
        }

        self.say("\nAvailable Display Devices:")?;
        for (idx, display) in displays.iter().enumerate() {
            self.say(&format!(
                "{}: Display {}: {}",
                idx + 1,
                display.number,
                display.description
            ))?;
        }

        loop {
            let answer = self.ask("Select the display device by entering its number: ")?;
            match answer.parse::<usize>() {
                Ok(choice) if (1..=displays.len()).contains(&choice) => {
                    return Ok(displays[choice - 1].number);
                }
                Ok(_) => self.say("Invalid selection. Please try again.")?,
                Err(_) => self.say("Invalid input. Please enter a number.")?,
            }
        }
    }

    /// Asks for whichever of the grey and per-channel patch counts is missing
    ///
    /// Counts that were supplied are kept unless together they select no
    /// patches, in which case both are asked for.
    pub fn patch_counts(
        &mut self,
        gray: Option<u32>,
        color: Option<u32>,
    ) -> Result<PatchCounts, PromptError> {
        let (gray, color) = match (gray, color) {
            (Some(g), Some(c)) if PatchCounts::new(g, c).is_err() => (None, None),
            given => given,
        };

        loop {
            let Some(g) = self.count(gray, GRAY_QUESTION)? else {
                continue;
            };
            let Some(c) = self.count(color, COLOR_QUESTION)? else {
                continue;
            };

            match PatchCounts::new(g, c) {
                Ok(counts) => return Ok(counts),
                Err(err) => self.say(&format!("{err}."))?,
            }
        }
    }

    fn count(&mut self, known: Option<u32>, question: &str) -> Result<Option<u32>, PromptError> {
        if known.is_some() {
            return Ok(known);
        }
        match self.ask(question)?.parse::<u32>() {
            Ok(count) => Ok(Some(count)),
            Err(_) => {
                self.say("Invalid input. Please enter a non-negative integer.")?;
                Ok(None)
            }
        }
    }

    /// Blocks until the user presses Enter
    pub fn wait_for_enter(&mut self, message: &str) -> Result<(), PromptError> {
        self.ask(message).map(|_| ())
    }
}
