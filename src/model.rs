use arboard::Clipboard;
use polars::prelude::*;
use rayon::prelude::*;
use std::cmp::{max, min};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, trace};

use crate::domain::{CedError, HELP_TEXT, Message};
use crate::editor::LineEditor;
use crate::export;
use crate::layout::{ColumnLayout, DEFAULT_COLUMN_WIDTH};
use crate::table::{Column, Table};
use crate::ui::{
    CELL_PX, CMDLINE_HEIGHT, FOOTER_HEIGHT, MIN_COLUMN_CELLS, PANEL_HANDLE_WIDTH,
    PANEL_TITLE_HEIGHT, SCROLLBAR_WIDTH, TABLE_HEADER_HEIGHT,
};

// The surface renders and edits at most this many rows. Export is never
// capped, it always walks the full table.
pub const RENDER_ROW_CAP: usize = 1000;

const PANEL_STEP_PERCENT: i32 = 2;

#[derive(Debug, PartialEq)]
pub enum Status {
    Ready,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Browse,
    EditCell,
    OpenFile,
    Popup,
}

// Transient result of the pre-load metadata checks.
#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
}

// A vertical slice of one visible column, ready for rendering.
#[derive(Clone, Debug)]
pub struct ColumnView {
    pub name: String,
    pub width: u16,
    pub data: Vec<String>,
}

impl ColumnView {
    fn empty() -> Self {
        ColumnView {
            name: String::new(),
            width: 0,
            data: Vec::new(),
        }
    }
}

// Absolute terminal x-range of one rendered column, x1 exclusive. The ui
// paints from these and the mouse handler hit-tests against them, so both
// always agree on geometry.
#[derive(Clone, Debug)]
pub struct ColumnSpan {
    pub name: String,
    pub x0: u16,
    pub x1: u16,
}

#[derive(Clone, Debug, Default)]
pub struct UILayout {
    pub width: u16,
    pub height: u16,
    pub panel_x: u16,
    pub panel_width: u16,
    pub handle_x: u16,
    pub title_y: u16,
    pub header_y: u16,
    pub table_x: u16,
    pub table_y: u16,
    pub table_width: u16,
    pub table_height: u16,
    pub index_x: u16,
    pub index_width: u16,
    pub footer_y: u16,
    pub statusline_y: u16,
    pub scrollbar_x: u16,
}

impl UILayout {
    pub fn from_values(width: u16, height: u16, panel_percent: u16, index_width: u16) -> Self {
        let panel_width = ((width as u32 * panel_percent as u32) / 100) as u16;
        let panel_x = width.saturating_sub(panel_width);
        let header_y = PANEL_TITLE_HEIGHT;
        let table_y = header_y + TABLE_HEADER_HEIGHT;
        let chrome = PANEL_TITLE_HEIGHT + TABLE_HEADER_HEIGHT + FOOTER_HEIGHT + CMDLINE_HEIGHT;
        let table_height = height.saturating_sub(chrome);
        let index_x = panel_x.saturating_add(PANEL_HANDLE_WIDTH);
        let table_x = index_x.saturating_add(index_width);
        let scrollbar_x = width.saturating_sub(SCROLLBAR_WIDTH);
        let layout = UILayout {
            width,
            height,
            panel_x,
            panel_width,
            handle_x: panel_x,
            title_y: 0,
            header_y,
            table_x,
            table_y,
            table_width: scrollbar_x.saturating_sub(table_x),
            table_height,
            index_x,
            index_width,
            footer_y: height.saturating_sub(FOOTER_HEIGHT + CMDLINE_HEIGHT),
            statusline_y: height.saturating_sub(CMDLINE_HEIGHT),
            scrollbar_x,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

// The edit prompt rendered in the status line while a cell edit or the
// open-file prompt is active.
#[derive(Clone, Debug)]
pub struct EditPrompt {
    pub label: String,
    pub input: String,
    pub cursor: usize,
}

pub struct UIData {
    pub file_name: String,
    pub dirty: bool,
    pub panel_open: bool,
    pub columns: Vec<ColumnView>,
    pub index: ColumnView,
    pub show_index: bool,
    pub total_rows: usize,
    pub total_columns: usize,
    pub rendered_rows: usize,
    pub truncated: bool,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub offset_row: usize,
    pub column_spans: Vec<ColumnSpan>,
    pub resizing_column: Option<String>,
    pub panel_percent: u16,
    pub show_popup: bool,
    pub popup_message: String,
    pub edit: Option<EditPrompt>,
    pub status_message: String,
    pub layout: UILayout,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            file_name: String::new(),
            dirty: false,
            panel_open: false,
            columns: Vec::new(),
            index: ColumnView::empty(),
            show_index: false,
            total_rows: 0,
            total_columns: 0,
            rendered_rows: 0,
            truncated: false,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            offset_row: 0,
            column_spans: Vec::new(),
            resizing_column: None,
            panel_percent: 0,
            show_popup: false,
            popup_message: String::new(),
            edit: None,
            status_message: String::new(),
            layout: UILayout::default(),
        }
    }
}

pub struct Model {
    pub status: Status,
    mode: Mode,
    previous_mode: Mode,
    file_name: String,
    table: Table,
    layout: ColumnLayout,
    cursor_row: usize,
    cursor_column: usize,
    offset_row: usize,
    offset_column: usize,
    visible_columns: Vec<usize>,
    panel_open: bool,
    show_index: bool,
    edit_target: Option<(usize, String)>,
    editor: LineEditor,
    clipboard: Option<Clipboard>,
    uilayout: UILayout,
    uidata: UIData,
    status_message: String,
}

impl Model {
    pub fn init(ui_width: u16, ui_height: u16) -> Self {
        let clipboard = match Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                debug!("Clipboard unavailable: {e:?}");
                None
            }
        };
        let mut model = Self {
            status: Status::Ready,
            mode: Mode::Browse,
            previous_mode: Mode::Browse,
            file_name: String::new(),
            table: Table::empty(),
            layout: ColumnLayout::new(),
            cursor_row: 0,
            cursor_column: 0,
            offset_row: 0,
            offset_column: 0,
            visible_columns: Vec::new(),
            panel_open: false,
            show_index: true,
            edit_target: None,
            editor: LineEditor::default(),
            clipboard,
            uilayout: UILayout::from_values(ui_width, ui_height, 0, 0),
            uidata: UIData::empty(),
            status_message: "Started ced".to_string(),
        };
        model.update_table_data();
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn raw_keyevents(&self) -> bool {
        matches!(self.mode, Mode::EditCell | Mode::OpenFile)
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    // ----------------------- Data loading --------------------------- //

    pub fn load_data_file(&mut self, path: &Path) -> Result<(), CedError> {
        let file_info = Self::get_file_info(path)?;
        let start_time = Instant::now();

        // A zero byte file is not an error, it is an empty table.
        let table = if file_info.file_size == 0 {
            Table::empty()
        } else {
            let frame = Self::scan_csv(&file_info.path)?;
            let df = Arc::new(frame.collect()?);
            let columns: Result<Vec<Column>, PolarsError> = df
                .get_column_names()
                .par_iter()
                .map(|name| Self::load_column(&df, name.as_str()))
                .collect();
            Table::load(columns?)?
        };

        let duration = start_time.elapsed().as_millis();
        info!(
            "Loaded {} rows x {} columns from {} in {duration}ms",
            table.row_count(),
            table.column_count(),
            file_info.path.display()
        );

        let file_name = file_info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        self.install_table(table, file_name);
        self.set_status_message(format!("Loaded {} in {duration}ms", self.file_name));
        Ok(())
    }

    // Replaces table, file name and column widths wholesale, resets the
    // cursor and opens the panel. The previous table and its widths are
    // discarded, prior edits included.
    fn install_table(&mut self, table: Table, file_name: String) {
        {
            let names = table.column_names();
            self.layout.initialize(&names);
        }
        self.table = table;
        self.file_name = file_name;
        self.cursor_row = 0;
        self.cursor_column = 0;
        self.offset_row = 0;
        self.offset_column = 0;
        self.edit_target = None;
        self.mode = Mode::Browse;
        self.panel_open = true;
        self.update_table_data();
    }

    fn get_file_info(path: &Path) -> Result<FileInfo, CedError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CedError::FileNotFound,
            ErrorKind::PermissionDenied => CedError::PermissionDenied,
            _ => CedError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(CedError::LoadingFailed("Not a file!".into()));
        }
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => {}
            _ => return Err(CedError::UnknownFileType),
        }
        Ok(FileInfo {
            path: path.to_path_buf(),
            file_size: metadata.len(),
        })
    }

    // Schema inference is disabled so every column arrives as a string and
    // values like 007 survive verbatim.
    fn scan_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()
    }

    fn load_column(df: &DataFrame, col_name: &str) -> Result<Column, PolarsError> {
        let col = df.column(col_name)?.cast(&DataType::String)?;
        let series = col.str()?;
        let mut data = Vec::with_capacity(series.len());
        for value in series.into_iter() {
            // Missing values load as empty strings. Cell text is stored
            // verbatim, newlines are sanitized in the render path only.
            data.push(value.map(|s| s.to_string()).unwrap_or_default());
        }
        Ok(Column::new(col_name, data))
    }

    // ----------------------- Message dispatch ----------------------- //

    pub fn update(&mut self, message: Message) -> Result<(), CedError> {
        trace!("Update: mode {:?}, message {:?}", self.mode, message);
        match self.mode {
            Mode::Browse => match message {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_selection_down(1),
                Message::MoveUp => self.move_selection_up(1),
                Message::MoveLeft => self.move_selection_left(),
                Message::MoveRight => self.move_selection_right(),
                Message::MovePageUp => {
                    self.move_selection_up(self.uilayout.table_height as usize + 1)
                }
                Message::MovePageDown => {
                    self.move_selection_down(self.uilayout.table_height as usize + 1)
                }
                Message::MoveBeginning => self.move_selection_beginning(),
                Message::MoveEnd => self.move_selection_end(),
                Message::MoveToFirstColumn => self.select_column(0),
                Message::MoveToLastColumn => {
                    let columns = self.table.column_count();
                    if columns > 0 {
                        self.select_column(columns - 1);
                    }
                }
                Message::Enter => self.begin_cell_edit(),
                Message::OpenFile => self.begin_open_prompt(),
                Message::Export => self.export(),
                Message::CopyCell => self.copy_cell(),
                Message::CopyRow => self.copy_row(),
                Message::ToggleIndex => self.toggle_index(),
                Message::TogglePreview => self.toggle_preview(),
                Message::Help => self.show_help(),
                Message::Exit => self.close_preview(),
                Message::WidenColumn => self.nudge_column(CELL_PX),
                Message::NarrowColumn => self.nudge_column(-CELL_PX),
                Message::GrowPanel => self.nudge_panel(PANEL_STEP_PERCENT),
                Message::ShrinkPanel => self.nudge_panel(-PANEL_STEP_PERCENT),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::MouseDown(x, y) => self.mouse_down(x, y),
                Message::MouseDrag(x, _) => self.mouse_drag(x),
                Message::MouseUp(x, _) => self.mouse_up(x),
                Message::RawKey(_) => {}
            },
            Mode::EditCell | Mode::OpenFile => match message {
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => {}
            },
            Mode::Popup => match message {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help | Message::Enter => self.close_popup(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => {}
            },
        }
        Ok(())
    }

    // ----------------------- Editing -------------------------------- //

    // The selected cell as (absolute row, column name, value).
    fn current_cell(&self) -> Result<(usize, String, String), CedError> {
        if self.table.is_empty() {
            return Err(CedError::EmptyTable);
        }
        let row = self.offset_row + self.cursor_row;
        let column = self
            .visible_columns
            .get(self.cursor_column)
            .and_then(|&idx| self.table.columns().get(idx))
            .map(|c| c.name.clone())
            .ok_or(CedError::EmptyTable)?;
        let value = self.table.cell(row, &column)?.to_string();
        Ok((row, column, value))
    }

    fn begin_cell_edit(&mut self) {
        match self.current_cell() {
            Ok((row, column, value)) => {
                self.editor.open(&value);
                self.edit_target = Some((row, column));
                self.previous_mode = self.mode;
                self.mode = Mode::EditCell;
                self.refresh_prompt();
            }
            Err(e) => {
                debug!("Nothing to edit: {e:?}");
                self.set_status_message("Nothing to edit");
            }
        }
    }

    fn begin_open_prompt(&mut self) {
        self.editor.open("");
        self.previous_mode = self.mode;
        self.mode = Mode::OpenFile;
        self.refresh_prompt();
    }

    fn raw_input(&mut self, key: ratatui::crossterm::event::KeyEvent) {
        let result = self.editor.read(key);
        if !result.finished {
            self.refresh_prompt();
            return;
        }
        match self.mode {
            Mode::EditCell => self.commit_cell_edit(result.canceled, result.input),
            Mode::OpenFile => self.commit_open(result.canceled, result.input),
            _ => {}
        }
    }

    fn commit_cell_edit(&mut self, canceled: bool, input: String) {
        self.mode = Mode::Browse;
        let target = self.edit_target.take();
        if canceled {
            self.set_status_message("Edit canceled");
            self.update_table_data();
            return;
        }
        if let Some((row, column)) = target {
            // The surface only offers rendered cells for editing, so a
            // rejection here means a logic error, not user error.
            match self.table.set_cell(row, &column, input) {
                Ok(()) => self.set_status_message(format!("Updated {column}[{}]", row + 1)),
                Err(e) => {
                    error!("Rejected cell edit at {column}[{row}]: {e:?}");
                    self.set_status_message("Edit rejected");
                }
            }
        }
        self.update_table_data();
    }

    fn commit_open(&mut self, canceled: bool, input: String) {
        self.mode = Mode::Browse;
        if canceled || input.is_empty() {
            self.set_status_message("Open canceled");
            self.update_table_data();
            return;
        }
        match shellexpand::full(&input) {
            Ok(expanded) => {
                let path = PathBuf::from(expanded.into_owned());
                if let Err(e) = self.load_data_file(&path) {
                    error!("Failed to open {}: {e:?}", path.display());
                    self.set_status_message(format!("Failed to open {}", path.display()));
                    self.update_table_data();
                }
            }
            Err(e) => {
                self.set_status_message(format!("Bad path: {e}"));
                self.update_table_data();
            }
        }
    }

    // ----------------------- Export and clipboard ------------------- //

    fn export(&mut self) {
        if self.table.column_count() == 0 {
            self.set_status_message("Nothing to export");
            return;
        }
        let file_name = export::export_file_name(Some(&self.file_name));
        let result = export::serialize(&self.table)
            .and_then(|text| export::write_download(Path::new("."), &file_name, &text));
        match result {
            Ok(path) => self.set_status_message(format!("Wrote {}", path.display())),
            Err(e) => {
                error!("Export failed: {e:?}");
                self.set_status_message("Export failed");
            }
        }
    }

    fn copy_cell(&mut self) {
        match self.current_cell() {
            Ok((_, _, value)) => self.clipboard_set(value),
            Err(_) => self.set_status_message("Nothing to copy"),
        }
    }

    fn copy_row(&mut self) {
        if self.table.is_empty() {
            self.set_status_message("Nothing to copy");
            return;
        }
        let row = self.offset_row + self.cursor_row;
        match self
            .table
            .record(row)
            .and_then(|values| export::csv_line(&values))
        {
            Ok(line) => self.clipboard_set(line),
            Err(e) => {
                error!("Row copy failed: {e:?}");
                self.set_status_message("Copy failed");
            }
        }
    }

    fn clipboard_set(&mut self, text: String) {
        let Some(clipboard) = self.clipboard.as_mut() else {
            self.set_status_message("Clipboard unavailable");
            return;
        };
        match clipboard.set_text(text) {
            Ok(_) => self.set_status_message("Copied to clipboard"),
            Err(e) => {
                trace!("Error copying to clipboard: {e:?}");
                self.set_status_message("Clipboard unavailable");
            }
        }
    }

    // ----------------------- Panel and popup ------------------------ //

    fn toggle_preview(&mut self) {
        self.panel_open = !self.panel_open;
        self.update_table_data();
    }

    // Explicit dismissal. The table and its edits stay, reopening shows
    // them again.
    fn close_preview(&mut self) {
        if self.panel_open {
            self.panel_open = false;
            self.update_table_data();
        }
    }

    fn show_help(&mut self) {
        self.previous_mode = self.mode;
        self.mode = Mode::Popup;
        self.uidata.show_popup = true;
        self.uidata.popup_message = HELP_TEXT.to_string();
    }

    fn close_popup(&mut self) {
        self.mode = self.previous_mode;
        self.previous_mode = Mode::Popup;
        self.uidata.show_popup = false;
        self.uidata.popup_message = String::new();
    }

    fn toggle_index(&mut self) {
        self.show_index = !self.show_index;
        self.update_table_data();
    }

    fn ui_resize(&mut self, width: u16, height: u16) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout.width = width;
        self.uilayout.height = height;
        self.update_table_data();
    }

    // ----------------------- Resize gestures ------------------------ //

    fn current_column_name(&self) -> Option<String> {
        self.visible_columns
            .get(self.cursor_column)
            .and_then(|&idx| self.table.columns().get(idx))
            .map(|c| c.name.clone())
    }

    // Keyboard resize rides the same gesture state machine the mouse uses,
    // as one synthetic begin/update/end sequence.
    fn nudge_column(&mut self, delta_px: i32) {
        let Some(name) = self.current_column_name() else {
            return;
        };
        if self.layout.begin_column_resize(&name, 0).is_ok() {
            self.layout.update_column_resize(delta_px);
            self.layout.end_column_resize();
            self.update_table_data();
        }
    }

    fn nudge_panel(&mut self, delta_percent: i32) {
        let viewport = self.uilayout.width as i32 * CELL_PX;
        self.layout.begin_panel_resize(0);
        self.layout
            .update_panel_resize(-(viewport * delta_percent) / 100, viewport);
        self.layout.end_panel_resize();
        self.update_table_data();
    }

    fn to_px(x: u16) -> i32 {
        x as i32 * CELL_PX
    }

    fn mouse_down(&mut self, x: u16, y: u16) {
        if !self.panel_open {
            return;
        }
        // The panel's left handle drives the panel gesture.
        if x == self.uilayout.handle_x {
            self.layout.begin_panel_resize(Self::to_px(x));
            return;
        }
        // The right edge of a header cell drives that column's gesture.
        if y == self.uilayout.header_y {
            let edge = self
                .uidata
                .column_spans
                .iter()
                .find(|s| x + 1 == s.x1 || x == s.x1)
                .cloned();
            if let Some(span) = edge {
                if let Err(e) = self.layout.begin_column_resize(&span.name, Self::to_px(x)) {
                    debug!("Resize rejected: {e:?}");
                }
                return;
            }
        }
        // Anywhere in the data area selects the cell under the pointer.
        if y >= self.uilayout.table_y && y < self.uilayout.table_y + self.uilayout.table_height {
            let row = self.offset_row + (y - self.uilayout.table_y) as usize;
            let hit = self
                .uidata
                .column_spans
                .iter()
                .find(|s| x >= s.x0 && x < s.x1)
                .cloned();
            if row < self.rendered_row_count()
                && let Some(span) = hit
                && let Some(column) = self
                    .table
                    .column_names()
                    .iter()
                    .position(|n| *n == span.name)
            {
                self.select_cell(row, column);
            }
        }
    }

    fn mouse_drag(&mut self, x: u16) {
        if self.layout.resizing_column().is_some() {
            self.layout.update_column_resize(Self::to_px(x));
            self.update_table_data();
        } else if self.layout.is_resizing() {
            let viewport = self.uilayout.width as i32 * CELL_PX;
            self.layout.update_panel_resize(Self::to_px(x), viewport);
            self.update_table_data();
        }
    }

    fn mouse_up(&mut self, x: u16) {
        if self.layout.is_resizing() {
            self.mouse_drag(x);
            self.layout.end_column_resize();
            self.layout.end_panel_resize();
            self.update_table_data();
        }
    }

    // ----------------------- Selection movement --------------------- //

    // Rows the surface may show and edit. Everything past the cap is
    // reachable only through export.
    fn rendered_row_count(&self) -> usize {
        min(self.table.row_count(), RENDER_ROW_CAP)
    }

    fn select_cell(&mut self, row: usize, column: usize) {
        trace!("Select cell {row}:{column}");
        if self.visible_columns.contains(&column) {
            self.cursor_column = self
                .visible_columns
                .iter()
                .position(|&c| c == column)
                .unwrap_or(0);
        } else {
            self.offset_column = column;
            self.cursor_column = 0;
        }

        let height = self.uilayout.table_height as usize;
        if row >= self.offset_row && row < self.offset_row + height {
            self.cursor_row = row - self.offset_row;
        } else {
            self.cursor_row = 0;
            self.offset_row = row;
        }
        self.update_table_data();
    }

    fn select_column(&mut self, column: usize) {
        let row = self.offset_row + self.cursor_row;
        self.select_cell(row, column);
    }

    fn move_selection_beginning(&mut self) {
        self.cursor_row = 0;
        self.offset_row = 0;
        self.update_table_data();
    }

    fn move_selection_end(&mut self) {
        let rows = self.rendered_row_count();
        let height = self.uilayout.table_height as usize;
        if rows == 0 || height == 0 {
            return;
        }
        if rows < height {
            self.offset_row = 0;
            self.cursor_row = rows - 1;
        } else {
            self.offset_row = rows - height;
            self.cursor_row = height - 1;
        }
        self.update_table_data();
    }

    fn move_selection_up(&mut self, size: usize) {
        if self.cursor_row > 0 {
            self.cursor_row = self.cursor_row.saturating_sub(size);
        } else if self.offset_row > 0 {
            self.offset_row = self.offset_row.saturating_sub(size);
        }
        self.update_table_data();
    }

    fn move_selection_down(&mut self, size: usize) {
        let rows = self.rendered_row_count();
        let height = self.uilayout.table_height as usize;
        if rows == 0 || height == 0 {
            return;
        }
        if self.cursor_row + self.offset_row < rows - 1 {
            if self.cursor_row < height - 1 {
                let visible_rows = min(height, rows - self.offset_row);
                self.cursor_row = min(self.cursor_row + size, visible_rows - 1);
            } else {
                self.offset_row = min(self.offset_row + size, rows - 1);
                self.cursor_row = min(height - 1, rows - self.offset_row - 1);
            }
            self.update_table_data();
        }
    }

    fn move_selection_left(&mut self) {
        if self.cursor_column > 0 {
            self.cursor_column = self.cursor_column.saturating_sub(1);
        } else if self.offset_column > 0 {
            self.offset_column = self.offset_column.saturating_sub(1);
        }
        self.update_table_data();
    }

    fn move_selection_right(&mut self) {
        let columns = self.table.column_count();
        if columns == 0 {
            return;
        }
        if self.cursor_column + self.offset_column < columns - 1 {
            if self.cursor_column < self.visible_columns.len().saturating_sub(1) {
                self.cursor_column += 1;
            } else {
                self.offset_column += 1;
            }
            self.update_table_data();
        }
    }

    // ----------------------- View refresh --------------------------- //

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
    }

    fn refresh_prompt(&mut self) {
        self.uidata.edit = self.edit_prompt();
    }

    fn edit_prompt(&self) -> Option<EditPrompt> {
        match self.mode {
            Mode::EditCell => {
                let result = self.editor.get();
                let label = match &self.edit_target {
                    Some((row, column)) => format!("{column}[{}]", row + 1),
                    None => "cell".to_string(),
                };
                Some(EditPrompt {
                    label,
                    input: result.input,
                    cursor: result.cursor,
                })
            }
            Mode::OpenFile => {
                let result = self.editor.get();
                Some(EditPrompt {
                    label: "open".to_string(),
                    input: result.input,
                    cursor: result.cursor,
                })
            }
            _ => None,
        }
    }

    fn display_value(value: &str) -> String {
        if value.contains('\n') || value.contains('\r') {
            value.replace("\r\n", " ↵ ").replace('\n', " ↵ ")
        } else {
            value.to_string()
        }
    }

    fn visible_name(name: &str, width: usize) -> String {
        if width < 3 {
            return String::new();
        }
        if name.chars().count() > width {
            let mut reduced: String = name.chars().take(width - 3).collect();
            reduced.push_str("...");
            reduced
        } else {
            name.to_string()
        }
    }

    // Recomputes geometry, visible columns and the UIData snapshot the ui
    // renders from. Called after every state change that can move cells.
    fn update_table_data(&mut self) {
        let rows = self.rendered_row_count();
        let index_width = if self.show_index && rows > 0 {
            rows.to_string().len() as u16 + 1
        } else {
            0
        };
        self.uilayout = UILayout::from_values(
            self.uilayout.width,
            self.uilayout.height,
            self.layout.panel_percent(),
            index_width,
        );

        let height = self.uilayout.table_height as usize;

        // Clamp scroll state to the rendered subset.
        if rows == 0 {
            self.offset_row = 0;
            self.cursor_row = 0;
        } else {
            self.offset_row = min(self.offset_row, rows - 1);
            let visible_rows = min(height, rows - self.offset_row);
            self.cursor_row = min(self.cursor_row, visible_rows.saturating_sub(1));
        }
        let rbegin = self.offset_row;
        let rend = min(rbegin + height, rows);

        // Fit columns into the table area: full columns as long as they
        // fit, then at most one partial column.
        let names: Vec<String> = self
            .table
            .column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        self.offset_column = min(self.offset_column, names.len().saturating_sub(1));

        let table_width = self.uilayout.table_width as usize;
        let mut views: Vec<ColumnView> = Vec::new();
        let mut spans: Vec<ColumnSpan> = Vec::new();
        self.visible_columns = Vec::new();
        let mut used_width = 0usize;

        for (cidx, name) in names.iter().enumerate().skip(self.offset_column) {
            let px = self.layout.width(name).unwrap_or(DEFAULT_COLUMN_WIDTH);
            let mut cells = max(MIN_COLUMN_CELLS as usize, px as usize / CELL_PX as usize);
            let mut last = false;
            if used_width + cells + 1 > table_width {
                if used_width >= table_width {
                    break;
                }
                // Partially visible rightmost column.
                cells = table_width - used_width;
                last = true;
            }

            let x0 = self.uilayout.table_x + used_width as u16;
            spans.push(ColumnSpan {
                name: name.clone(),
                x0,
                x1: x0 + cells as u16,
            });
            let column = &self.table.columns()[cidx];
            let data = column.data[rbegin..rend]
                .iter()
                .map(|v| Self::display_value(v))
                .collect();
            views.push(ColumnView {
                name: Self::visible_name(name, cells),
                width: cells as u16,
                data,
            });
            self.visible_columns.push(cidx);
            used_width += cells + 1;
            if last {
                break;
            }
        }

        // Growing columns can shrink the visible set, keep the cursor on it.
        if self.visible_columns.is_empty() {
            self.cursor_column = 0;
        } else {
            self.cursor_column = min(self.cursor_column, self.visible_columns.len() - 1);
        }

        let index = if index_width > 0 {
            ColumnView {
                name: String::new(),
                width: index_width,
                data: (rbegin..rend).map(|i| (i + 1).to_string()).collect(),
            }
        } else {
            ColumnView::empty()
        };

        let total_rows = self.table.row_count();
        self.uidata = UIData {
            file_name: self.file_name.clone(),
            dirty: self.table.dirty(),
            panel_open: self.panel_open,
            columns: views,
            index,
            show_index: index_width > 0,
            total_rows,
            total_columns: self.table.column_count(),
            rendered_rows: rows,
            truncated: total_rows > RENDER_ROW_CAP,
            selected_row: self.cursor_row,
            selected_column: self.cursor_column,
            abs_selected_row: self.offset_row + self.cursor_row,
            offset_row: self.offset_row,
            column_spans: spans,
            resizing_column: self.layout.resizing_column().map(|s| s.to_string()),
            panel_percent: self.layout.panel_percent(),
            show_popup: self.mode == Mode::Popup,
            popup_message: if self.mode == Mode::Popup {
                HELP_TEXT.to_string()
            } else {
                String::new()
            },
            edit: self.edit_prompt(),
            status_message: self.status_message.clone(),
            layout: self.uilayout.clone(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{PANEL_MAX_PERCENT, PANEL_MIN_PERCENT};
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::io::Write;

    fn key(model: &mut Model, code: KeyCode) {
        model
            .update(Message::RawKey(KeyEvent::new(code, KeyModifiers::NONE)))
            .unwrap();
    }

    fn sample_table() -> Table {
        Table::load(vec![
            Column::new("name", vec!["Al".into(), "Bo".into(), "Cy".into()]),
            Column::new("age", vec!["30".into(), "25".into(), "40".into()]),
        ])
        .unwrap()
    }

    fn tall_table(rows: usize) -> Table {
        Table::load(vec![
            Column::new("id", (0..rows).map(|i| i.to_string()).collect()),
            Column::new("value", (0..rows).map(|i| format!("v{i}")).collect()),
        ])
        .unwrap()
    }

    fn test_model(table: Table) -> Model {
        let mut model = Model::init(120, 40);
        model.install_table(table, "people.csv".to_string());
        model
    }

    #[test]
    fn edit_through_messages_updates_the_true_row() {
        let mut model = test_model(sample_table());
        model.update(Message::MoveDown).unwrap();
        model.update(Message::MoveRight).unwrap();
        model.update(Message::Enter).unwrap();
        assert!(model.raw_keyevents());

        key(&mut model, KeyCode::Backspace);
        key(&mut model, KeyCode::Backspace);
        key(&mut model, KeyCode::Char('2'));
        key(&mut model, KeyCode::Char('6'));
        key(&mut model, KeyCode::Enter);

        assert!(!model.raw_keyevents());
        assert_eq!(model.table().cell(1, "age").unwrap(), "26");
        let text = export::serialize(model.table()).unwrap();
        assert_eq!(text, "name,age\nAl,30\nBo,26\nCy,40\n");
    }

    #[test]
    fn canceled_edit_leaves_the_cell_alone() {
        let mut model = test_model(sample_table());
        model.update(Message::Enter).unwrap();
        key(&mut model, KeyCode::Char('x'));
        key(&mut model, KeyCode::Esc);
        assert_eq!(model.table().cell(0, "name").unwrap(), "Al");
        assert!(!model.table().dirty());
    }

    #[test]
    fn render_cap_bounds_cursor_but_not_export() {
        let mut model = test_model(tall_table(1500));
        let uidata = model.get_uidata();
        assert_eq!(uidata.total_rows, 1500);
        assert_eq!(uidata.rendered_rows, RENDER_ROW_CAP);
        assert!(uidata.truncated);

        model.update(Message::MoveEnd).unwrap();
        assert_eq!(model.get_uidata().abs_selected_row, RENDER_ROW_CAP - 1);

        let text = export::serialize(model.table()).unwrap();
        assert_eq!(text.lines().count(), 1501);
        assert!(text.ends_with("1499,v1499\n"));
    }

    #[test]
    fn closing_the_panel_keeps_edits() {
        let mut model = test_model(sample_table());
        model.update(Message::Enter).unwrap();
        key(&mut model, KeyCode::Char('!'));
        key(&mut model, KeyCode::Enter);
        assert_eq!(model.table().cell(0, "name").unwrap(), "Al!");

        model.update(Message::Exit).unwrap();
        assert!(!model.get_uidata().panel_open);
        model.update(Message::TogglePreview).unwrap();
        assert!(model.get_uidata().panel_open);
        assert_eq!(model.table().cell(0, "name").unwrap(), "Al!");
    }

    #[test]
    fn mouse_drag_resizes_the_column_under_the_header_edge() {
        let mut model = test_model(sample_table());
        let span = model.get_uidata().column_spans[0].clone();
        assert_eq!(span.name, "name");
        assert_eq!(model.get_uidata().columns[0].width, 20);

        let header_y = model.get_uidata().layout.header_y;
        let edge = span.x1 - 1;
        model.update(Message::MouseDown(edge, header_y)).unwrap();
        model
            .update(Message::MouseDrag(edge + 3, header_y))
            .unwrap();
        model.update(Message::MouseUp(edge + 3, header_y)).unwrap();

        // 3 cells of drag are 30 px on top of the 200 px default.
        assert_eq!(model.get_uidata().columns[0].width, 23);
    }

    #[test]
    fn panel_nudges_stay_clamped() {
        let mut model = test_model(sample_table());
        for _ in 0..40 {
            model.update(Message::GrowPanel).unwrap();
        }
        assert_eq!(model.get_uidata().panel_percent, PANEL_MAX_PERCENT);
        for _ in 0..40 {
            model.update(Message::ShrinkPanel).unwrap();
        }
        assert_eq!(model.get_uidata().panel_percent, PANEL_MIN_PERCENT);
    }

    #[test]
    fn reload_resets_widths_and_cursor() {
        let mut model = test_model(sample_table());
        model.update(Message::WidenColumn).unwrap();
        assert_eq!(model.get_uidata().columns[0].width, 21);

        model.install_table(sample_table(), "people.csv".to_string());
        assert_eq!(model.get_uidata().columns[0].width, 20);
        assert_eq!(model.get_uidata().abs_selected_row, 0);
    }

    #[test]
    fn loads_fixture_without_type_coercion() {
        let mut model = Model::init(120, 40);
        model
            .load_data_file(Path::new("tests/fixtures/testdata_01.csv"))
            .unwrap();
        assert_eq!(model.table().column_names(), vec!["name", "age", "note"]);
        assert_eq!(model.table().row_count(), 3);
        assert_eq!(model.table().cell(2, "age").unwrap(), "007");
        assert_eq!(model.table().cell(0, "note").unwrap(), "likes, commas");
        assert!(model.get_uidata().panel_open);
    }

    #[test]
    fn rejects_non_csv_files() {
        let mut model = Model::init(120, 40);
        let err = model.load_data_file(Path::new("Cargo.toml")).unwrap_err();
        assert!(matches!(err, CedError::UnknownFileType));
        let err = model
            .load_data_file(Path::new("no/such/file.csv"))
            .unwrap_err();
        assert!(matches!(err, CedError::FileNotFound));
    }

    #[test]
    fn empty_file_loads_as_empty_table() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.flush().unwrap();
        let mut model = Model::init(120, 40);
        model.load_data_file(file.path()).unwrap();
        assert_eq!(model.table().row_count(), 0);
        assert_eq!(model.table().column_count(), 0);
        assert_eq!(export::serialize(model.table()).unwrap(), "");
    }
}
