use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::inputter::{InputResult, Inputter};
use crate::record::Record;

/// Byte length of `needle` matched at the start of `haystack`, compared
/// without case one character at a time. Only used to place highlights.
fn match_len_at(haystack: &str, needle: &str) -> Option<usize> {
    let mut hay = haystack.char_indices();
    for nc in needle.chars() {
        let (_, hc) = hay.next()?;
        if !hc.to_lowercase().eq(nc.to_lowercase()) {
            return None;
        }
    }
    Some(hay.next().map(|(idx, _)| idx).unwrap_or(haystack.len()))
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Filter predicate of a single column. Records without a value never match.
pub fn matches(record: &Record, key: &str, term: &str) -> bool {
    record
        .present(key)
        .is_some_and(|value| contains_ignore_case(&value.as_text(), term))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub highlighted: bool,
}

/// Splits `text` into plain and highlighted parts, one highlighted part per
/// match of `term`.
pub fn highlight_segments<'a>(text: &'a str, term: &str) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    if term.is_empty() {
        if !text.is_empty() {
            segments.push(Segment {
                text,
                highlighted: false,
            });
        }
        return segments;
    }

    let mut plain_start = 0;
    let mut pos = 0;
    while pos < text.len() {
        if let Some(len) = match_len_at(&text[pos..], term) {
            if plain_start < pos {
                segments.push(Segment {
                    text: &text[plain_start..pos],
                    highlighted: false,
                });
            }
            segments.push(Segment {
                text: &text[pos..pos + len],
                highlighted: true,
            });
            pos += len;
            plain_start = pos;
        } else {
            pos += text[pos..].chars().next().map(char::len_utf8).unwrap_or(1);
        }
    }
    if plain_start < text.len() {
        segments.push(Segment {
            text: &text[plain_start..],
            highlighted: false,
        });
    }
    segments
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFilter {
    /// Text typed into the dropdown, not applied yet.
    pub draft: String,
    /// Applied term, `None` while the column is unfiltered.
    pub term: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub column: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct FilterMap {
    filters: BTreeMap<String, ColumnFilter>,
    highlight: Option<Highlight>,
}

impl FilterMap {
    pub fn draft(&self, key: &str) -> &str {
        self.filters.get(key).map(|f| f.draft.as_str()).unwrap_or("")
    }

    pub fn set_draft(&mut self, key: &str, text: &str) {
        self.filters.entry(key.to_string()).or_default().draft = text.to_string();
    }

    /// Applies the draft of `key` and makes it the highlighted column.
    pub fn search(&mut self, key: &str) {
        let entry = self.filters.entry(key.to_string()).or_default();
        entry.term = if entry.draft.is_empty() {
            None
        } else {
            Some(entry.draft.clone())
        };
        debug!("Search {key}: {:?}", entry.term);
        self.highlight = Some(Highlight {
            column: key.to_string(),
            text: entry.draft.clone(),
        });
        if entry.term.is_none() {
            self.filters.remove(key);
        }
    }

    /// Drops the filter of `key`. Other columns keep theirs.
    pub fn reset(&mut self, key: &str) {
        debug!("Reset filter {key}");
        self.filters.remove(key);
        self.highlight = Some(Highlight {
            column: key.to_string(),
            text: String::new(),
        });
    }

    pub fn reset_all(&mut self) {
        self.filters.clear();
        self.highlight = None;
    }

    pub fn term(&self, key: &str) -> Option<&str> {
        self.filters.get(key).and_then(|f| f.term.as_deref())
    }

    pub fn is_filtered(&self, key: &str) -> bool {
        self.term(key).is_some()
    }

    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters
            .iter()
            .filter_map(|(key, f)| f.term.as_deref().map(|term| (key.as_str(), term)))
    }

    pub fn is_empty(&self) -> bool {
        self.active().next().is_none()
    }

    pub fn retains(&self, record: &Record) -> bool {
        self.active().all(|(key, term)| matches(record, key, term))
    }

    pub fn highlight(&self) -> Option<&Highlight> {
        self.highlight.as_ref()
    }

    /// Search text to highlight in cells of `key`, if `key` is the
    /// highlighted column.
    pub fn highlight_for(&self, key: &str) -> Option<&str> {
        self.highlight
            .as_ref()
            .filter(|h| h.column == key)
            .map(|h| h.text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropdownAction {
    None,
    Edit(String),
    Search,
    Reset,
    Close,
}

/// Open filter dropdown of one column.
///
/// Opening only requests focus. The request is granted by
/// [`FilterDropdown::after_render`], which the owner calls once the
/// dropdown was drawn; until then key presses are not taken as input.
#[derive(Debug)]
pub struct FilterDropdown {
    column: String,
    placeholder: String,
    input: Inputter,
    focus_requested: bool,
    focused: bool,
}

impl FilterDropdown {
    pub fn open(column: &str, placeholder: &str, draft: &str) -> Self {
        let mut input = Inputter::default();
        input.set(draft);
        trace!("Open filter dropdown for {column}");
        Self {
            column: column.to_string(),
            placeholder: placeholder.to_string(),
            input,
            focus_requested: true,
            focused: false,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn input(&self) -> InputResult {
        self.input.get()
    }

    pub fn after_render(&mut self) {
        if self.focus_requested {
            self.focus_requested = false;
            self.focused = true;
            trace!("Focus filter input of {}", self.column);
        }
    }

    pub fn read(&mut self, key: KeyEvent) -> DropdownAction {
        if key.code == KeyCode::Esc {
            return DropdownAction::Close;
        }
        if !self.focused {
            trace!("Dropdown not focused yet, dropping {key:?}");
            return DropdownAction::None;
        }
        if key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.input.clear();
            return DropdownAction::Reset;
        }
        let before = self.input.get().input;
        let res = self.input.read(key);
        if res.finished {
            DropdownAction::Search
        } else if res.input != before {
            DropdownAction::Edit(res.input)
        } else {
            DropdownAction::None
        }
    }
}
