use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use std::io::Error;

#[derive(Debug)]
pub enum CedError {
    IoError(Error),
    PolarsError(PolarsError),
    CsvError(csv::Error),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    OutOfRange { index: usize, rows: usize },
    UnknownColumn(String),
    EmptyTable,
}

impl From<Error> for CedError {
    fn from(err: Error) -> Self {
        CedError::IoError(err)
    }
}

impl From<PolarsError> for CedError {
    fn from(err: PolarsError) -> Self {
        CedError::PolarsError(err)
    }
}

impl From<csv::Error> for CedError {
    fn from(err: csv::Error) -> Self {
        CedError::CsvError(err)
    }
}

#[derive(Debug, Clone, Setters)]
pub struct CedConfig {
    pub event_poll_time: u64,
    pub mouse_capture: bool,
}

impl Default for CedConfig {
    fn default() -> Self {
        CedConfig {
            event_poll_time: 100,
            mouse_capture: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    Quit,
    Exit,
    Enter,
    Help,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    MoveToFirstColumn,
    MoveToLastColumn,
    OpenFile,
    Export,
    CopyCell,
    CopyRow,
    ToggleIndex,
    TogglePreview,
    WidenColumn,
    NarrowColumn,
    GrowPanel,
    ShrinkPanel,
    Resize(u16, u16),
    RawKey(KeyEvent),
    MouseDown(u16, u16),
    MouseDrag(u16, u16),
    MouseUp(u16, u16),
}

pub const HELP_TEXT: &str = "\
ced - csv preview and editor

Navigation
  arrows / hjkl     move cell cursor
  PgUp / PgDn       move one page
  g / G             first / last row
  Home / End        first / last column

Editing
  Enter             edit the selected cell
  Esc               cancel edit / close panel
  y / Y             copy cell / copy row as csv

Layout
  < / >             narrow / widen column
  { / }             shrink / grow panel
  i                 toggle row index
  mouse drag        resize columns (header edge) and panel (left handle)

Files
  o                 open another csv file
  w                 write edited csv
  p                 toggle preview panel
  ?                 this help
  q                 quit
";
