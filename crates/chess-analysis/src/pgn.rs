//! PGN (Portable Game Notation) reading.
//!
//! [`read_game`] extracts the tag pairs and the mainline move tokens of the
//! first game in a PGN document. It does not interpret moves; replaying them
//! against a board is the job of [`crate::position`].
//!
//! Skipped on the way: move numbers (`12.`, `12...`), comments (`{...}` and
//! `; ...`), `%` escape lines, NAGs (`$1`), annotation glyphs (`!?`) and
//! recursive variations. A termination marker (`1-0`, `0-1`, `1/2-1/2`, `*`)
//! or the tag section of a following game ends the read.

use thiserror::Error;

/// Errors produced while reading a PGN document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PgnError {
    /// The document holds no tags and no movetext.
    #[error("Empty game record")]
    Empty,
    /// A tag pair is not of the form `[Name "value"]`.
    #[error("Malformed tag pair on line {line}: {reason}")]
    MalformedTag { line: usize, reason: String },
    /// A `{` comment is never closed.
    #[error("Unterminated comment starting on line {line}")]
    UnterminatedComment { line: usize },
    /// Parentheses of recursive variations do not balance.
    #[error("Unbalanced variation on line {line}")]
    UnbalancedVariation { line: usize },
    /// A closing bracket or brace without its opening counterpart.
    #[error("Unexpected '{found}' on line {line}")]
    UnexpectedChar { line: usize, found: char },
}

/// The first game of a PGN document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameRecord {
    /// Tag pairs in document order.
    pub tags: Vec<(String, String)>,
    /// Mainline move tokens, annotation glyphs removed.
    pub moves: Vec<String>,
    /// Termination marker, if the game had one.
    pub result: Option<String>,
}

impl GameRecord {
    /// Value of the first tag named `name`.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

const RESULTS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// Characters that end a movetext symbol.
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '{' | '}' | '(' | ')' | '[' | ']' | ';' | '$')
}

struct Reader<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    at_line_start: bool,
}

impl<'a> Reader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
            at_line_start: true,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.at_line_start = true;
        } else {
            self.at_line_start = false;
        }
        Some(c)
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace() && c != '\n') {
            self.bump();
        }
    }

    fn read_symbol(&mut self) -> String {
        let mut symbol = String::new();
        while let Some(c) = self.peek() {
            if is_delimiter(c) {
                break;
            }
            symbol.push(c);
            self.bump();
        }
        symbol
    }

    /// Read `[Name "value"]`, the opening bracket already consumed.
    fn read_tag(&mut self) -> Result<(String, String), PgnError> {
        let line = self.line;
        let malformed = |reason: &str| PgnError::MalformedTag {
            line,
            reason: reason.to_string(),
        };

        self.skip_inline_whitespace();
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(malformed("missing tag name"));
        }

        self.skip_inline_whitespace();
        if self.bump() != Some('"') {
            return Err(malformed("expected quoted tag value"));
        }

        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some(c @ ('"' | '\\')) => value.push(c),
                    Some(c) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => return Err(malformed("unterminated tag value")),
                },
                Some('\n') | None => return Err(malformed("unterminated tag value")),
                Some(c) => value.push(c),
            }
        }

        self.skip_inline_whitespace();
        if self.bump() != Some(']') {
            return Err(malformed("expected closing bracket"));
        }

        Ok((name, value))
    }

    fn skip_comment(&mut self) -> Result<(), PgnError> {
        let line = self.line;
        loop {
            match self.bump() {
                Some('}') => return Ok(()),
                Some(_) => {}
                None => return Err(PgnError::UnterminatedComment { line }),
            }
        }
    }
}

/// Split a movetext symbol into its move part, dropping a leading move
/// number (`12.`, `12...`), trailing annotation glyphs (`!`, `?`) and an
/// en passant marker (`e.p.`), whether attached or standalone.
fn move_part(symbol: &str) -> Option<&str> {
    let rest = symbol.trim_start_matches(|c: char| c.is_ascii_digit());
    let rest = if rest.len() < symbol.len() && rest.starts_with('.') {
        rest.trim_start_matches('.')
    } else if rest.is_empty() {
        // A bare number without dots, e.g. a stray "12".
        ""
    } else {
        symbol
    };
    let rest = rest.trim_end_matches(['!', '?']);
    let rest = rest.strip_suffix("e.p.").unwrap_or(rest);
    (!rest.is_empty()).then_some(rest)
}

/// Read the first game of a PGN document.
///
/// # Errors
///
/// - [`PgnError::Empty`] if there are neither tags nor movetext
/// - [`PgnError::MalformedTag`] for a corrupt tag section
/// - [`PgnError::UnterminatedComment`] / [`PgnError::UnbalancedVariation`]
///   for broken movetext structure
pub fn read_game(text: &str) -> Result<GameRecord, PgnError> {
    let mut reader = Reader::new(text);
    let mut game = GameRecord::default();
    let mut in_movetext = false;
    let mut variation_depth: usize = 0;

    while let Some(c) = reader.peek() {
        match c {
            '%' if reader.at_line_start => reader.skip_line(),
            c if c.is_whitespace() => {
                reader.bump();
            }
            '[' => {
                if in_movetext {
                    // Tag section of the next game.
                    break;
                }
                reader.bump();
                let tag = reader.read_tag()?;
                game.tags.push(tag);
            }
            '{' => {
                reader.bump();
                reader.skip_comment()?;
            }
            ';' => reader.skip_line(),
            '(' => {
                reader.bump();
                in_movetext = true;
                variation_depth += 1;
            }
            ')' => {
                reader.bump();
                variation_depth = variation_depth
                    .checked_sub(1)
                    .ok_or(PgnError::UnbalancedVariation { line: reader.line })?;
            }
            '$' => {
                reader.bump();
                while matches!(reader.peek(), Some(d) if d.is_ascii_digit()) {
                    reader.bump();
                }
            }
            ']' | '}' => {
                return Err(PgnError::UnexpectedChar {
                    line: reader.line,
                    found: c,
                });
            }
            _ => {
                let symbol = reader.read_symbol();
                in_movetext = true;
                if variation_depth > 0 {
                    continue;
                }
                if RESULTS.contains(&symbol.as_str()) {
                    game.result = Some(symbol);
                    break;
                }
                if let Some(mv) = move_part(&symbol) {
                    game.moves.push(mv.to_string());
                }
            }
        }
    }

    if variation_depth > 0 {
        return Err(PgnError::UnbalancedVariation { line: reader.line });
    }
    if game.tags.is_empty() && game.moves.is_empty() && game.result.is_none() {
        return Err(PgnError::Empty);
    }

    Ok(game)
}
