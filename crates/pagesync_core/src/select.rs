use std::io::{BufRead, Write};

use crate::error::{Result, SyncError};
use crate::store::PageIndex;

pub const SELECT_PROMPT: &str = "Select a page: ";
pub const RETRY_PROMPT: &str = "Enter a number: ";

/// Writes the numbered listing (1-based) of `index` to `output`.
pub fn print_listing<W: Write>(index: &PageIndex, output: &mut W) -> std::io::Result<()> {
    for (position, (id, entry)) in index.iter().enumerate() {
        writeln!(
            output,
            "{}: \n  {id}: {}\n  summary: {}",
            position + 1,
            entry.title,
            entry.summary.as_deref().unwrap_or("")
        )?;
    }
    Ok(())
}

/// Lists the index, then reads choices from `input` until one is made of
/// digits only and resolves it to a page id.
///
/// Non-numeric input re-prompts. A numeric choice outside the listing is an
/// error rather than a re-prompt.
pub fn select_page<R: BufRead, W: Write>(
    index: &PageIndex,
    input: &mut R,
    output: &mut W,
) -> Result<String> {
    print_listing(index, output).map_err(stdout_err)?;

    let mut prompt = SELECT_PROMPT;
    let choice = loop {
        write!(output, "{prompt}").map_err(stdout_err)?;
        output.flush().map_err(stdout_err)?;

        let mut line = String::new();
        let read = input.read_line(&mut line).map_err(stdin_err)?;
        if read == 0 {
            return Err(SyncError::InputClosed);
        }

        let candidate = line.trim_end_matches(['\r', '\n']);
        if let Some(digits) = normalize_digits(candidate) {
            break digits;
        }
        tracing::debug!("rejected non-numeric selection {candidate:?}");
        prompt = RETRY_PROMPT;
    };

    resolve_choice(index, &choice)
}

fn resolve_choice(index: &PageIndex, choice: &str) -> Result<String> {
    let out_of_range = || SyncError::SelectionOutOfRange {
        choice: choice.to_string(),
        len: index.len(),
    };
    let position = choice
        .parse::<usize>()
        .ok()
        .and_then(|number| number.checked_sub(1))
        .ok_or_else(out_of_range)?;
    index
        .id_at(position)
        .map(str::to_string)
        .ok_or_else(out_of_range)
}

/// ASCII form of `value` when it is made only of ASCII or full-width
/// (U+FF10..U+FF19, as typed through a CJK input method) digits.
fn normalize_digits(value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    value
        .chars()
        .map(|ch| match ch {
            '0'..='9' => Some(ch),
            '\u{FF10}'..='\u{FF19}' => char::from_digit(u32::from(ch) - 0xFF10, 10),
            _ => None,
        })
        .collect()
}

fn stdout_err(source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: "<stdout>".into(),
        source,
    }
}

fn stdin_err(source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: "<stdin>".into(),
        source,
    }
}
