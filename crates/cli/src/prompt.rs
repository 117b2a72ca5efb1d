//! Line-based input and output for the interactive shell.
//!
//! Every question is asked again until the answer parses, so a typo never aborts a half
//! entered record. End of input surfaces as [`PromptError::EndOfInput`].

use chrono::NaiveDate;
use his_core::HisResult;
use std::fmt::Display;
use std::io::{self, BufRead, Write};

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("end of input")]
    EndOfInput,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type PromptResult<T> = Result<T, PromptError>;

/// ISO date as typed by the user.
pub fn parse_date(input: &str) -> HisResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        his_core::HisError::InvalidInput(
            "Date could not be parsed, please use ISO-format (YYYY-MM-DD)".into(),
        )
    })
}

pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn print(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.output, "{text}")
    }

    /// Shows `prompt` and reads one line without its line ending.
    pub fn line(&mut self, prompt: &str) -> PromptResult<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PromptError::EndOfInput);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Non-blank answer.
    pub fn required(&mut self, prompt: &str) -> PromptResult<String> {
        loop {
            let answer = self.line(prompt)?;
            if !answer.trim().is_empty() {
                return Ok(answer.trim().to_string());
            }
            self.print("This field is required.")?;
        }
    }

    /// `None` for a blank answer.
    pub fn optional(&mut self, prompt: &str) -> PromptResult<Option<String>> {
        let answer = self.line(prompt)?;
        let answer = answer.trim();
        Ok((!answer.is_empty()).then(|| answer.to_string()))
    }

    pub fn yes_no(&mut self, question: &str) -> PromptResult<bool> {
        let prompt = format!("{question} (y/n): ");
        loop {
            match self.line(&prompt)?.trim().to_lowercase().as_str() {
                "y" => return Ok(true),
                "n" => return Ok(false),
                _ => self.print("Not a valid answer")?,
            }
        }
    }

    /// Asks until `parse` accepts the answer, printing each rejection.
    pub fn parsed<T>(
        &mut self,
        prompt: &str,
        parse: impl Fn(&str) -> HisResult<T>,
    ) -> PromptResult<T> {
        loop {
            let answer = self.line(prompt)?;
            match parse(answer.trim()) {
                Ok(value) => return Ok(value),
                Err(e) => self.print(e)?,
            }
        }
    }

    /// Like [`Terminal::parsed`], but a blank answer gives `None`.
    pub fn optional_parsed<T>(
        &mut self,
        prompt: &str,
        parse: impl Fn(&str) -> HisResult<T>,
    ) -> PromptResult<Option<T>> {
        loop {
            let answer = self.line(prompt)?;
            let answer = answer.trim();
            if answer.is_empty() {
                return Ok(None);
            }
            match parse(answer) {
                Ok(value) => return Ok(Some(value)),
                Err(e) => self.print(e)?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn terminal(input: &str) -> Terminal<Cursor<Vec<u8>>, Vec<u8>> {
        Terminal::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn output(term: Terminal<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(term.into_output()).unwrap()
    }

    #[test]
    fn dates_are_asked_again_until_valid() {
        let mut term = terminal("1.7.1891\n\n1891-07-01\n");
        let date = term
            .optional_parsed("Date of birth: ", parse_date)
            .unwrap();
        assert_eq!(date, None);

        let date = term.parsed("Date of birth: ", parse_date).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(1891, 7, 1).unwrap());
        let out = output(term);
        assert!(out.contains("Date could not be parsed"));
    }

    #[test]
    fn yes_no_insists() {
        let mut term = terminal("maybe\nY\n");
        assert!(term.yes_no("Staging necessary?").unwrap());
        let out = output(term);
        assert!(out.contains("Staging necessary? (y/n): Not a valid answer"));
    }

    #[test]
    fn end_of_input_is_reported() {
        let mut term = terminal("");
        assert!(matches!(
            term.required("First Name: "),
            Err(PromptError::EndOfInput)
        ));

        let mut term = terminal("  \nAda\n");
        assert_eq!(term.required("First Name: ").unwrap(), "Ada");
    }
}
