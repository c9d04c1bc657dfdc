//! Minimal BibTeX reader.
//!
//! Purpose
//! - Extract `(key, type, fields)` records from the paper's bibliography so the
//!   citation fetcher can find each entry's DOI and year.
//!
//! Model
//! - Text outside `@...` blocks is ignored.
//! - `@comment` and `@preamble` blocks are skipped; `@string` blocks define
//!   macros usable in later bare values.
//! - Field values may be `{...}` (nested braces allowed), `"..."`, numbers or
//!   macro names, joined with `#`.
//! - Field names and entry types are lower-cased; values have braces removed
//!   and whitespace collapsed.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BibEntry {
    pub key: String,
    pub entry_type: String,
    pub fields: BTreeMap<String, String>,
}

impl BibEntry {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// DOI without any resolver prefix.
    pub fn doi(&self) -> Option<&str> {
        let raw = self.field("doi")?;
        let stripped = ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "doi:"]
            .iter()
            .find_map(|p| raw.strip_prefix(p))
            .unwrap_or(raw);
        Some(stripped.trim()).filter(|s| !s.is_empty())
    }

    /// Leading digits of the `year` field (`"2004a"` → 2004).
    pub fn year(&self) -> Option<i64> {
        let raw = self.field("year")?;
        let digits: String = raw.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    }
}

#[derive(Debug)]
pub enum BibError {
    Syntax { line: usize, message: String },
    Io(std::io::Error),
}

impl BibError {
    fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for BibError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax { line, message } => write!(f, "bibtex line {line}: {message}"),
            Self::Io(e) => write!(f, "reading bibliography: {e}"),
        }
    }
}

impl std::error::Error for BibError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Syntax { .. } => None,
        }
    }
}

impl From<std::io::Error> for BibError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

pub fn read_bibtex<P: AsRef<Path>>(path: P) -> Result<Vec<BibEntry>, BibError> {
    let text = std::fs::read_to_string(path)?;
    parse_bibtex(&text)
}

/// Parse all entries in file order.
pub fn parse_bibtex(src: &str) -> Result<Vec<BibEntry>, BibError> {
    Parser::new(src).entries()
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    macros: HashMap<String, String>,
}

impl Parser {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
            macros: HashMap::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> Result<(), BibError> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(BibError::syntax(self.line, format!("expected '{want}', found '{c}'"))),
            None => Err(BibError::syntax(self.line, format!("expected '{want}', found end of input"))),
        }
    }

    fn ident(&mut self) -> Result<String, BibError> {
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || "_-:.+/".contains(c))
        {
            self.bump();
        }
        if self.pos == start {
            let found = self.peek().map_or("end of input".to_string(), |c| format!("'{c}'"));
            return Err(BibError::syntax(self.line, format!("expected identifier, found {found}")));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn entries(mut self) -> Result<Vec<BibEntry>, BibError> {
        let mut out = Vec::new();
        loop {
            while self.peek().is_some_and(|c| c != '@') {
                self.bump();
            }
            if self.bump().is_none() {
                return Ok(out);
            }
            let entry_type = self.ident()?.to_ascii_lowercase();
            self.skip_ws();
            let close = match self.bump() {
                Some('{') => '}',
                Some('(') => ')',
                _ => return Err(BibError::syntax(self.line, format!("@{entry_type} without body"))),
            };
            match entry_type.as_str() {
                "comment" => self.skip_block(close)?,
                "preamble" => {
                    self.value()?;
                    self.expect(close)?;
                }
                "string" => {
                    let name = self.ident()?.to_ascii_lowercase();
                    self.expect('=')?;
                    let value = self.value()?;
                    self.expect(close)?;
                    self.macros.insert(name, value);
                }
                _ => out.push(self.entry(entry_type, close)?),
            }
        }
    }

    fn skip_block(&mut self, close: char) -> Result<(), BibError> {
        let open = if close == '}' { '{' } else { '(' };
        let start_line = self.line;
        let mut depth = 1usize;
        while let Some(c) = self.bump() {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
        Err(BibError::syntax(start_line, "unterminated block"))
    }

    fn entry(&mut self, entry_type: String, close: char) -> Result<BibEntry, BibError> {
        self.skip_ws();
        let start = self.pos;
        while self.peek().is_some_and(|c| c != ',' && c != close) {
            self.bump();
        }
        let key: String = self.chars[start..self.pos].iter().collect::<String>().trim().to_string();
        let mut fields = BTreeMap::new();
        match self.bump() {
            Some(c) if c == close => {
                return Ok(BibEntry {
                    key,
                    entry_type,
                    fields,
                })
            }
            Some(',') => {}
            _ => return Err(BibError::syntax(self.line, format!("unterminated entry '{key}'"))),
        }
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                break;
            }
            let name = self.ident()?.to_ascii_lowercase();
            self.expect('=')?;
            let value = self.value()?;
            fields.insert(name, value);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => break,
                Some(c) => {
                    return Err(BibError::syntax(
                        self.line,
                        format!("expected ',' or '{close}' after field, found '{c}'"),
                    ))
                }
                None => return Err(BibError::syntax(self.line, format!("unterminated entry '{key}'"))),
            }
        }
        Ok(BibEntry {
            key,
            entry_type,
            fields,
        })
    }

    /// One field value: pieces joined with `#`, normalised.
    fn value(&mut self) -> Result<String, BibError> {
        let mut raw = String::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some('{') => {
                    self.bump();
                    raw.push_str(&self.delimited('}')?);
                }
                Some('"') => {
                    self.bump();
                    raw.push_str(&self.delimited('"')?);
                }
                Some(c) if c.is_alphanumeric() => {
                    let word = self.ident()?;
                    let expanded = self.macros.get(&word.to_ascii_lowercase()).cloned();
                    raw.push_str(&expanded.unwrap_or(word));
                }
                _ => return Err(BibError::syntax(self.line, "expected field value")),
            }
            self.skip_ws();
            if self.peek() == Some('#') {
                self.bump();
            } else {
                break;
            }
        }
        Ok(normalize(&raw))
    }

    /// Text up to the matching terminator at brace depth zero. The opening
    /// delimiter has already been consumed.
    fn delimited(&mut self, end: char) -> Result<String, BibError> {
        let start_line = self.line;
        let mut depth = 0usize;
        let mut out = String::new();
        while let Some(c) = self.bump() {
            match c {
                '{' => depth += 1,
                '}' if depth > 0 => depth -= 1,
                c if c == end && depth == 0 => return Ok(out),
                '}' => return Err(BibError::syntax(self.line, "unbalanced '}'")),
                _ => {}
            }
            out.push(c);
        }
        Err(BibError::syntax(start_line, "unterminated value"))
    }
}

fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|&c| c != '{' && c != '}')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE: &str = r#"
Some free text that is not an entry.

@string{ sig = "SIGGRAPH" }

@Article{perlin85,
  Title   = {An {Image} Synthesizer},
  author  = "Ken Perlin",
  journal = sig # " Comput. Graph.",
  year    = 1985,
  DOI     = {https://doi.org/10.1145/325165.325247},
}

@comment{ ignored { nested } text }

@inproceedings(nodoi,
  title = {No identifier here},
  year = {2001}
)

@misc{empty}
"#;

    #[test]
    fn parses_fields_types_and_macros() {
        let entries = parse_bibtex(SAMPLE).unwrap();
        assert_eq!(entries.len(), 3);
        let p = &entries[0];
        assert_eq!(p.key, "perlin85");
        assert_eq!(p.entry_type, "article");
        assert_eq!(p.field("title"), Some("An Image Synthesizer"));
        assert_eq!(p.field("Author"), Some("Ken Perlin"));
        assert_eq!(p.field("journal"), Some("SIGGRAPH Comput. Graph."));
        assert_eq!(p.doi(), Some("10.1145/325165.325247"));
        assert_eq!(p.year(), Some(1985));

        assert_eq!(entries[1].entry_type, "inproceedings");
        assert_eq!(entries[1].doi(), None);
        assert_eq!(entries[1].year(), Some(2001));
        assert!(entries[2].fields.is_empty());
    }

    #[test]
    fn year_takes_leading_digits() {
        let e = &parse_bibtex("@book{a, year = {2004a}}").unwrap()[0];
        assert_eq!(e.year(), Some(2004));
        let e = &parse_bibtex("@book{a, year = {n.d.}}").unwrap()[0];
        assert_eq!(e.year(), None);
    }

    #[test]
    fn syntax_errors_report_line() {
        let err = parse_bibtex("@article{k,\n  title = {x},\n  year 1999\n}").unwrap_err();
        match err {
            BibError::Syntax { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_bibtex("@article{k, title = {open").is_err());
    }

    #[test]
    fn shipped_bibliography_parses() {
        let entries = parse_bibtex(include_str!("../../../data/references.bib")).unwrap();
        assert_eq!(entries.len(), 6);
        let with_ids = entries
            .iter()
            .filter(|e| e.doi().is_some() && e.year().is_some())
            .count();
        assert_eq!(with_ids, 5);
    }

    proptest! {
        #[test]
        fn braced_values_round_trip(
            words in proptest::collection::vec("[A-Za-z0-9.]{1,8}", 1..6),
            key in "[a-z][a-z0-9]{0,10}",
        ) {
            let value = words.join(" ");
            let src = format!("@article{{{key},\n  note = {{{value}}},\n}}\n");
            let parsed = parse_bibtex(&src).unwrap();
            prop_assert_eq!(parsed.len(), 1);
            prop_assert_eq!(&parsed[0].key, &key);
            prop_assert_eq!(parsed[0].field("note"), Some(value.as_str()));
        }

        #[test]
        fn never_panics_on_noise(src in "[@{}(),=#\"a-z0-9 \n]{0,80}") {
            let _ = parse_bibtex(&src);
        }
    }
}
