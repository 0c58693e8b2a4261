use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::Instant;
use tracing::{debug, error, info, trace};

use crate::domain::{CMDMode, HELP_TEXT, Message, PVConfig, PVError};
use crate::fetch::PlanetSource;
use crate::inputter::{InputResult, Inputter};
use crate::planet::{Column, Planet};
use crate::ui::{
    CMDLINE_HEIGH, COLUMN_WIDTH_MARGIN, FILTERBAR_HEIGHT, SCROLLBAR_WIDTH, TABLE_HEADER_HEIGHT,
};
use crate::view::{NumericFilterState, PlanetView};

#[derive(Debug, PartialEq)]
pub enum Status {
    EMPTY,
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

/// Text of the filter controls as shown above the table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterBar {
    pub name_query: String,
    pub column: String,
    pub comparison: String,
    pub value: String,
    pub numeric_state: String,
}

impl FilterBar {
    fn from_view(view: &PlanetView) -> Self {
        let controls = view.controls();
        let numeric_state = match view.numeric_state() {
            NumericFilterState::Unset => "not applied".to_string(),
            NumericFilterState::Pending { previous: None } => "not applied, press a".to_string(),
            NumericFilterState::Pending {
                previous: Some(filter),
            } => format!("active: {filter} (edited, press a)"),
            NumericFilterState::Applied(filter) => format!("active: {filter}"),
        };
        FilterBar {
            name_query: view.name_query().to_string(),
            column: controls.column.to_string(),
            comparison: controls.comparison.to_string(),
            value: controls.value.clone(),
            numeric_state,
        }
    }
}

pub struct UIData {
    pub name: String,
    pub table: Vec<ColumnView>,
    pub nrows: usize, // Rows passing the filters
    pub total_rows: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub show_popup: bool,
    pub popup_message: String,
    pub filters: FilterBar,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            table: Vec::new(),
            nrows: 0,
            total_rows: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            show_popup: false,
            popup_message: String::new(),
            filters: FilterBar::default(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let table_width = ui_width.saturating_sub(SCROLLBAR_WIDTH);
        let table_height = ui_height
            .saturating_sub(FILTERBAR_HEIGHT + CMDLINE_HEIGH + TABLE_HEADER_HEIGHT)
            .max(1);

        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width,
            table_height,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: PVConfig,
    source: Option<Box<dyn PlanetSource>>,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    view: PlanetView,
    columns: Vec<Column>,
    column_widths: Vec<usize>,
    visible_columns: Vec<usize>, // Idx into columns of what fits on screen
    cursor_row: usize,
    cursor_column: usize,
    offset_row: usize,
    offset_column: usize,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &PVConfig, ui_width: usize, ui_height: usize) -> Result<Self, PVError> {
        let view = PlanetView::empty();
        let columns = view.columns();
        let mut model = Self {
            config: config.clone(),
            source: None,
            status: Status::EMPTY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            view,
            column_widths: columns
                .iter()
                .map(|c| c.as_str().len() + COLUMN_WIDTH_MARGIN)
                .collect(),
            columns,
            visible_columns: Vec::new(),
            cursor_row: 0,
            cursor_column: 0,
            offset_row: 0,
            offset_column: 0,
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: "Loading ...".to_string(),
            last_status_message_update: Instant::now(),
        };
        model.update_table_data();
        Ok(model)
    }

    /// Fetches the planets from `source`. A failing fetch leaves an empty
    /// table and reports the error in the status line.
    pub fn load(&mut self, source: Box<dyn PlanetSource>) {
        self.source = Some(source);
        self.reload();
    }

    fn reload(&mut self) {
        let start_time = Instant::now();
        let (result, origin) = match &self.source {
            Some(source) => (source.fetch(), source.describe()),
            None => {
                self.set_status_message("Nothing to reload");
                return;
            }
        };
        self.uidata.name = origin.clone();
        match result {
            Ok(planets) => {
                let nplanets = planets.len();
                self.set_dataset(planets);
                self.set_status_message(format!(
                    "Loaded {} planets in {}ms ...",
                    nplanets,
                    start_time.elapsed().as_millis()
                ));
            }
            Err(e) => {
                error!("Loading planets from {origin} failed: {e}");
                self.set_status_message(format!("Loading failed: {e}"));
                self.update_table_data();
            }
        }
    }

    pub fn set_dataset(&mut self, planets: Vec<Planet>) {
        self.view.replace_dataset(planets);
        self.columns = self.view.columns();
        self.column_widths = self
            .columns
            .iter()
            .map(|&c| self.calculate_column_width(c))
            .collect();
        for (column, width) in self.columns.iter().zip(self.column_widths.iter()) {
            debug!("Column: {column}, render width {width}");
        }
        self.status = if self.view.dataset().is_empty() {
            Status::EMPTY
        } else {
            Status::READY
        };
        self.cursor_row = 0;
        self.offset_row = 0;
        self.update_table_data();
    }

    /// Runs `configure` against the filters and refreshes the table, also
    /// when `configure` fails half way.
    pub fn configure_filters<F>(&mut self, configure: F) -> Result<(), PVError>
    where
        F: FnOnce(&mut PlanetView) -> Result<(), PVError>,
    {
        let result = configure(&mut self.view);
        self.update_table_data();
        result
    }

    pub fn view(&self) -> &PlanetView {
        &self.view
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn calculate_column_width(&self, column: Column) -> usize {
        let widest = self
            .view
            .dataset()
            .iter()
            .map(|p| p.cell(column).chars().count())
            .max()
            .unwrap_or(0);
        let width = std::cmp::max(column.as_str().len(), widest);
        std::cmp::min(width, self.config.max_column_width) + COLUMN_WIDTH_MARGIN
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_status_message_update = self.last_status_message_update;
    }

    fn update_table_data(&mut self) {
        let nrows = self.view.rows().len();
        if nrows == 0 {
            self.cursor_row = 0;
            self.offset_row = 0;
        } else if self.offset_row + self.cursor_row >= nrows {
            self.select_row(nrows - 1);
        }

        // Fit as many columns as possible, the last one may be cut.
        self.visible_columns.clear();
        let mut visible_width = 0;
        let table_width = self.uilayout.table_width;
        let mut render_widths = Vec::new();
        for (cidx, &width) in self.column_widths.iter().enumerate().skip(self.offset_column) {
            if visible_width + width <= table_width {
                self.visible_columns.push(cidx);
                render_widths.push(width);
                visible_width += width;
            } else {
                if visible_width < table_width {
                    self.visible_columns.push(cidx);
                    render_widths.push(table_width - visible_width);
                }
                break;
            }
        }
        self.cursor_column = std::cmp::min(
            self.cursor_column,
            self.visible_columns.len().saturating_sub(1),
        );

        let rbegin = self.offset_row;
        let rend = std::cmp::min(rbegin + self.uilayout.table_height, nrows);
        trace!(
            "Table: Cr {}, Cc {}, Or {}, Oc {}, Rb {}, Re {}, columns {:?}",
            self.cursor_row,
            self.cursor_column,
            self.offset_row,
            self.offset_column,
            rbegin,
            rend,
            self.visible_columns
        );

        let table: Vec<ColumnView> = self
            .visible_columns
            .iter()
            .zip(render_widths)
            .map(|(&cidx, width)| {
                let column = self.columns[cidx];
                let data = (rbegin..rend)
                    .filter_map(|row| self.view.planet(row))
                    .map(|p| p.cell(column).replace("\r\n", " ↵ ").replace('\n', " ↵ "))
                    .collect();
                ColumnView {
                    name: column.as_str().to_string(),
                    width,
                    data,
                }
            })
            .collect();

        self.uidata.table = table;
        self.update_uidata_for_table();
    }

    fn update_uidata_for_table(&mut self) {
        self.uidata.nrows = self.view.rows().len();
        self.uidata.total_rows = self.view.dataset().len();
        self.uidata.selected_row = self.cursor_row;
        self.uidata.selected_column = self.cursor_column;
        self.uidata.abs_selected_row = self.offset_row + self.cursor_row;
        self.uidata.filters = FilterBar::from_view(&self.view);
        self.uidata.cmdinput = self.last_input.clone();
        self.uidata.cmd_mode = self.cmd_mode;
        self.uidata.active_cmdinput = self.active_cmdinput;
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_status_message_update = self.last_status_message_update;
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        let abs_row = self.offset_row + self.cursor_row;
        self.offset_row = 0;
        self.cursor_row = 0;
        self.select_row(abs_row);
        self.update_table_data();
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), PVError> {
        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_table_selection_down(1),
                    Message::MoveUp => self.move_table_selection_up(1),
                    Message::MoveLeft => self.move_table_selection_left(),
                    Message::MoveRight => self.move_table_selection_right(),
                    Message::MovePageUp => {
                        self.move_table_selection_up(self.uilayout.table_height)
                    }
                    Message::MovePageDown => {
                        self.move_table_selection_down(self.uilayout.table_height)
                    }
                    Message::MoveBeginning => self.move_table_selection_beginning(),
                    Message::MoveEnd => self.move_table_selection_end(),
                    Message::FilterByName => self.enter_cmd_mode(CMDMode::NameFilter),
                    Message::EditValue => self.enter_cmd_mode(CMDMode::NumericValue),
                    Message::NextColumn => {
                        self.view.next_column();
                        self.update_uidata_for_table();
                    }
                    Message::PreviousColumn => {
                        self.view.previous_column();
                        self.update_uidata_for_table();
                    }
                    Message::NextComparison => {
                        self.view.next_comparison();
                        self.update_uidata_for_table();
                    }
                    Message::ApplyNumericFilter => self.apply_numeric_filter(),
                    Message::CopyCell => self.copy_table_cell(),
                    Message::CopyRow => self.copy_table_row(),
                    Message::Reload => self.reload(),
                    Message::Help => self.show_help(),
                    Message::Exit => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::RawKey(_) => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Exit => self.exit(),
                    _ => (),
                },
                Modus::CMDINPUT => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        match self.modus {
            Modus::TABLE => {
                // Esc on the table drops the name filter, the numeric one has no reset
                if !self.view.name_query().is_empty() {
                    self.apply_name_query("");
                }
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
                self.uidata.show_popup = false;
            }
            Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {:?} ...", mode);
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;

        match mode {
            CMDMode::NameFilter => self.input.set(self.view.name_query()),
            CMDMode::NumericValue => self.input.set(&self.view.controls().value),
        }
        self.last_input = self.input.get();
        self.update_uidata_for_table();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if !self.active_cmdinput {
            return;
        }
        self.last_input = self.input.read(key);
        // The name filter follows every keystroke
        if self.cmd_mode == Some(CMDMode::NameFilter) && self.last_input.changed {
            let query = self.last_input.input.clone();
            self.apply_name_query(&query);
        }
        if self.last_input.finished {
            self.handle_cmd_input();
        }
        self.update_uidata_for_table();
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {:?}", self.last_input);

        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let cmd_input = self.last_input.input.clone();
        match self.cmd_mode {
            Some(CMDMode::NameFilter) => {
                if self.last_input.canceled {
                    info!("Name filter cleared");
                }
            }
            Some(CMDMode::NumericValue) => {
                if self.last_input.canceled {
                    self.set_status_message("Value edit discarded");
                } else {
                    self.view.set_value_text(&cmd_input);
                    self.set_status_message(format!("Value set to '{cmd_input}', press a to apply"));
                }
            }
            None => {
                info!("Cmd mode is none!")
            }
        }

        self.cmd_mode = None;
        self.last_input = InputResult::default();
    }

    fn apply_name_query(&mut self, query: &str) {
        self.view.set_name_query(query);
        self.offset_row = 0;
        self.cursor_row = 0;
        self.set_status_message(format!(
            "{} of {} planets match",
            self.view.rows().len(),
            self.view.dataset().len()
        ));
        self.update_table_data();
    }

    fn apply_numeric_filter(&mut self) {
        match self.view.apply_numeric_filter() {
            Ok(filter) => {
                info!("Applied numeric filter {filter}");
                self.offset_row = 0;
                self.cursor_row = 0;
                self.set_status_message(format!(
                    "Filter {filter}: {} of {} planets match",
                    self.view.rows().len(),
                    self.view.dataset().len()
                ));
            }
            Err(e) => self.set_status_message(format!("Filter not applied: {e}")),
        }
        self.update_table_data();
    }

    fn selected_planet(&self) -> Option<&Planet> {
        self.view.planet(self.offset_row + self.cursor_row)
    }

    fn clipboard(&mut self) -> Result<&mut Clipboard, PVError> {
        let clipboard = match self.clipboard.take() {
            Some(clipboard) => clipboard,
            None => Clipboard::new()?,
        };
        Ok(self.clipboard.insert(clipboard))
    }

    fn copy_to_clipboard(&mut self, content: String, what: &str) {
        let result = self
            .clipboard()
            .and_then(|clipboard| clipboard.set_text(content).map_err(PVError::from));
        match result {
            Ok(_) => {
                trace!("Copied {what} to clipboard.");
                self.set_status_message(format!("Copied {what}"));
            }
            Err(e) => {
                trace!("Error copying to clipboard: {:?}", e);
                self.set_status_message(format!("Copy failed: {e}"));
            }
        }
    }

    fn copy_table_cell(&mut self) {
        let Some(&cidx) = self.visible_columns.get(self.cursor_column) else {
            return;
        };
        let column = self.columns[cidx];
        let Some(cell) = self.selected_planet().map(|p| p.cell(column).into_owned()) else {
            return;
        };
        trace!("Cell content: {}", cell);
        self.copy_to_clipboard(cell, "cell");
    }

    fn copy_table_row(&mut self) {
        let Some(planet) = self.selected_planet() else {
            return;
        };
        let row_content = csv_row(planet, &self.columns);
        self.copy_to_clipboard(row_content, "row");
    }

    fn select_row(&mut self, row: usize) {
        let height = self.uilayout.table_height.max(1);
        if row >= self.offset_row && row < self.offset_row + height {
            self.cursor_row = row - self.offset_row;
        } else if row < self.offset_row {
            self.offset_row = row;
            self.cursor_row = 0;
        } else {
            self.offset_row = row + 1 - height;
            self.cursor_row = height - 1;
        }
    }

    fn move_table_selection_beginning(&mut self) {
        self.offset_row = 0;
        self.cursor_row = 0;
        self.update_table_data();
    }

    fn move_table_selection_end(&mut self) {
        let nrows = self.view.rows().len();
        if nrows > 0 {
            self.select_row(nrows - 1);
        }
        self.update_table_data();
    }

    fn move_table_selection_up(&mut self, size: usize) {
        let row = (self.offset_row + self.cursor_row).saturating_sub(size);
        self.select_row(row);
        self.update_table_data();
    }

    fn move_table_selection_down(&mut self, size: usize) {
        let nrows = self.view.rows().len();
        if nrows == 0 {
            return;
        }
        let row = std::cmp::min(self.offset_row + self.cursor_row + size, nrows - 1);
        self.select_row(row);
        self.update_table_data();
    }

    fn move_table_selection_left(&mut self) {
        if self.cursor_column > 0 {
            self.cursor_column -= 1;
        } else if self.offset_column > 0 {
            self.offset_column -= 1;
        }
        self.update_table_data();
    }

    fn move_table_selection_right(&mut self) {
        let last_visible = self.visible_columns.len().saturating_sub(1);
        let more_columns = self.offset_column + self.visible_columns.len() < self.columns.len();
        let last_is_cut = self
            .uidata
            .table
            .last()
            .zip(self.visible_columns.last())
            .is_some_and(|(view, &cidx)| view.width < self.column_widths[cidx]);

        if self.cursor_column < last_visible {
            self.cursor_column += 1;
        } else if more_columns || last_is_cut {
            // Scroll so the selected column moves fully into view
            self.offset_column += 1;
            self.cursor_column = last_visible;
        }
        self.update_table_data();
    }
}

/// Comma separated values of a record, quoting where needed.
pub fn csv_row(planet: &Planet, columns: &[Column]) -> String {
    columns
        .iter()
        .map(|&c| wrap_cell_content(&planet.cell(c)))
        .collect::<Vec<String>>()
        .join(",")
}

fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',' || c == '"');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}
