use std::path::PathBuf;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://swapi.dev/api/planets/";

pub const HELP_TEXT: &str = "\
Filters
  /          filter by name (live, case sensitive)
  c / C      next / previous numeric column
  o          next comparison
  v          edit numeric value
  a          apply numeric filter

Table
  arrows     move (or h j k l)
  PgUp PgDn  page up / down
  g / G      first / last row
  y / Y      copy cell / row
  r          reload planets
  ?          help
  Esc        close popup / clear name input
  q          quit";

#[derive(Debug, Error)]
pub enum PVError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog answered with status {0}")]
    HttpStatus(u16),
    #[error("malformed catalog payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dataset file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("cannot expand path '{0}'")]
    PathExpansion(String),
    #[error("invalid threshold '{0}'")]
    InvalidThreshold(String),
    #[error("unknown numeric column '{0}'")]
    UnknownColumn(String),
    #[error("unknown comparison '{0}'")]
    UnknownComparison(String),
    #[error("clipboard unavailable: {0}")]
    Clipboard(#[from] arboard::Error),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    NameFilter,
    NumericValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    FilterByName,
    EditValue,
    NextColumn,
    PreviousColumn,
    NextComparison,
    ApplyNumericFilter,
    CopyCell,
    CopyRow,
    Reload,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct PVConfig {
    pub endpoint: String,
    pub dataset_file: Option<PathBuf>,
    pub event_poll_time: u64,
    pub max_column_width: usize,
}

impl Default for PVConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            dataset_file: None,
            event_poll_time: 100,
            max_column_width: 40,
        }
    }
}
