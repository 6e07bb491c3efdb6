use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use std::io;
use thiserror::Error;

pub const PAGE_SIZE_OPTIONS: [usize; 3] = [100, 250, 500];
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum TVError {
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("malformed result object: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("unknown file type")]
    UnknownFileType,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct TVConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub page_size: usize,
}

impl Default for TVConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            max_column_width: 40,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TVConfig {
    pub fn validate(self) -> Result<Self, TVError> {
        if !PAGE_SIZE_OPTIONS.contains(&self.page_size) {
            return Err(TVError::InvalidConfig(format!(
                "page size {} is not one of {:?}",
                self.page_size, PAGE_SIZE_OPTIONS
            )));
        }
        if self.max_column_width < 5 {
            return Err(TVError::InvalidConfig(format!(
                "max column width {} is too small",
                self.max_column_width
            )));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MoveBeginning,
    MoveEnd,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    CyclePageSize,
    OpenFilter,
    ResetFilter,
    ResetAllFilters,
    Sort,
    CopyCell,
    CopyRow,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
Navigation
  Arrows / hjkl      move the cursor
  g / G              first / last row of the page
  n / p              next / previous page
  N / P              last / first page
  z                  cycle page size (100, 250, 500)

Columns
  /  or f            open the filter of the current column
  r                  reset the filter of the current column
  R                  reset all filters
  s                  sort current column (asc, desc, none)

Filter dropdown
  Enter              search
  Ctrl+r             reset
  Esc                close

Other
  c / C              copy cell / row
  ?                  help
  Esc                close popup
  q                  quit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = TVConfig::default().validate().unwrap();
        assert_eq!(cfg.page_size, 100);
    }

    #[test]
    fn rejects_page_size_outside_options() {
        let cfg = TVConfig::default().with_page_size(42);
        assert!(matches!(cfg.validate(), Err(TVError::InvalidConfig(_))));
    }

    #[test]
    fn accepts_all_page_size_options() {
        for size in PAGE_SIZE_OPTIONS {
            assert!(TVConfig::default().with_page_size(size).validate().is_ok());
        }
    }
}
