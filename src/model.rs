use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::domain::{HELP_TEXT, Message, TVConfig};
use crate::filter::{DropdownAction, FilterDropdown};
use crate::inputter::InputResult;
use crate::record::{Record, ResultSet};
use crate::sort::SortOrder;
use crate::ui::{
    COLUMN_HEADER_DECORATION, COLUMN_SEPARATOR_WIDTH, COLUMN_WIDTH_MARGIN, PAGINATION_HEIGHT,
    STATUSLINE_HEIGHT, TABLE_BORDER_WIDTH, TABLE_HEADER_HEIGHT,
};
use crate::view::{DisplaySink, TableView};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    FILTER,
    POPUP,
}

#[derive(Clone, Debug)]
pub struct ColumnView {
    pub key: String,
    pub title: String,
    pub width: usize,
    pub data: Vec<String>,
    pub sort: Option<SortOrder>,
    pub filtered: bool,
    /// Search text to mark in the cells, set for the highlighted column.
    pub highlight: Option<String>,
}

#[derive(Clone, Debug)]
pub struct DropdownView {
    /// Position of the filtered column in `UIData::table`.
    pub column: Option<usize>,
    pub title: String,
    pub placeholder: String,
    pub input: InputResult,
    pub focused: bool,
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.saturating_sub(TABLE_BORDER_WIDTH),
            table_height: ui_height.saturating_sub(
                2 * PAGINATION_HEIGHT + STATUSLINE_HEIGHT + TABLE_HEADER_HEIGHT + TABLE_BORDER_WIDTH,
            ),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct UIData {
    pub name: String,
    pub table: Vec<ColumnView>,
    pub nrows: usize, // Rows on the current page
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub total: usize,
    pub nrecords: usize,
    pub show_popup: bool,
    pub popup_message: String,
    pub dropdown: Option<DropdownView>,
    pub layout: UILayout,
    pub status_message: String,
    pub last_status_message_update: Instant,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            table: Vec::new(),
            nrows: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            page: 1,
            page_count: 1,
            page_size: 0,
            total: 0,
            nrecords: 0,
            show_popup: false,
            popup_message: String::new(),
            dropdown: None,
            layout: UILayout::default(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
            last_update: Instant::now(),
        }
    }
}

pub struct Model {
    config: TVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    view: TableView,
    column_widths: Vec<usize>,
    dropdown: Option<FilterDropdown>,
    visible_columns: Vec<(usize, usize)>, // (column idx, render width) of columns on screen
    visible_width: usize,
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
    offset_column: usize,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &TVConfig, result: ResultSet, ui_width: usize, ui_height: usize) -> Self {
        let view = TableView::new(result, config.page_size);
        let clipboard = Clipboard::new()
            .map_err(|e| warn!("Clipboard not available: {e:?}"))
            .ok();
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            column_widths: Vec::new(),
            view,
            dropdown: None,
            visible_columns: Vec::new(),
            visible_width: 0,
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
            offset_column: 0,
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        model.column_widths = model.calculate_column_widths();
        let message = if model.view.records().is_empty() {
            "No records".to_string()
        } else {
            format!("Loaded {} records", model.view.records().len())
        };
        model.set_status_message(message);
        model.update_table_data();
        model
    }

    pub fn set_display_sink(&mut self, sink: Box<dyn DisplaySink>) {
        self.view.set_display_sink(sink);
    }

    pub fn view(&self) -> &TableView {
        &self.view
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    /// Keys go straight to the filter input while a dropdown is open.
    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::FILTER
    }

    /// Called once a frame was drawn. Grants a pending focus request of the
    /// filter dropdown, if one is still open.
    pub fn after_render(&mut self) {
        if let Some(dropdown) = self.dropdown.as_mut() {
            dropdown.after_render();
            if let Some(view) = self.uidata.dropdown.as_mut() {
                view.focused = dropdown.is_focused();
            }
        }
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) {
        if let Some(msg) = message {
            trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_table_selection_down(1),
                    Message::MoveUp => self.move_table_selection_up(1),
                    Message::MoveLeft => self.move_table_selection_left(),
                    Message::MoveRight => self.move_table_selection_right(),
                    Message::MoveBeginning => self.move_table_selection_beginning(),
                    Message::MoveEnd => self.move_table_selection_end(),
                    Message::NextPage => self.change_page(|view| view.next_page()),
                    Message::PrevPage => self.change_page(|view| view.prev_page()),
                    Message::FirstPage => self.change_page(|view| view.set_page(1)),
                    Message::LastPage => {
                        self.change_page(|view| view.set_page(view.page_count()))
                    }
                    Message::CyclePageSize => self.change_page(|view| view.cycle_page_size()),
                    Message::OpenFilter => self.open_filter(),
                    Message::ResetFilter => self.reset_current_filter(),
                    Message::ResetAllFilters => self.reset_all_filters(),
                    Message::Sort => self.sort_current_column(),
                    Message::CopyCell => self.copy_table_cell(),
                    Message::CopyRow => self.copy_table_row(),
                    Message::Help => self.show_help(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::FILTER => match msg {
                    Message::RawKey(key) => self.filter_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Help => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }
    }

    // -------------------- Column filter and sort ---------------------- //

    fn current_column_key(&self) -> Option<String> {
        self.visible_columns
            .get(self.curser_column)
            .and_then(|&(idx, _)| self.view.columns().get(idx))
            .map(|c| c.key.clone())
    }

    fn open_filter(&mut self) {
        let Some(column) = self
            .visible_columns
            .get(self.curser_column)
            .and_then(|&(idx, _)| self.view.columns().get(idx))
        else {
            self.set_status_message("No column to filter");
            return;
        };
        let dropdown = FilterDropdown::open(
            &column.key,
            &column.placeholder(),
            self.view.filters().draft(&column.key),
        );
        self.dropdown = Some(dropdown);
        self.previous_modus = self.modus;
        self.modus = Modus::FILTER;
        self.update_uidata_dropdown();
    }

    fn close_filter(&mut self) {
        trace!("Close filter dropdown ...");
        self.dropdown = None;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::FILTER;
        self.update_uidata_dropdown();
    }

    fn filter_input(&mut self, key: KeyEvent) {
        let Some(dropdown) = self.dropdown.as_mut() else {
            error!("Filter input without an open dropdown!");
            self.modus = Modus::TABLE;
            return;
        };
        let column = dropdown.column().to_string();
        match dropdown.read(key) {
            DropdownAction::None => {}
            DropdownAction::Edit(text) => self.view.set_draft(&column, &text),
            DropdownAction::Search => {
                self.view.search(&column);
                self.close_filter();
                self.after_view_change();
                let message = match self.view.filters().term(&column) {
                    Some(term) => format!(
                        "Filter {column} \"{term}\": {} of {} records",
                        self.view.total(),
                        self.view.records().len()
                    ),
                    None => format!("Filter {column} cleared"),
                };
                self.set_status_message(message);
            }
            DropdownAction::Reset => {
                self.view.reset_filter(&column);
                self.close_filter();
                self.after_view_change();
                self.set_status_message(format!("Filter {column} cleared"));
            }
            DropdownAction::Close => self.close_filter(),
        }
        self.update_uidata_dropdown();
    }

    fn reset_current_filter(&mut self) {
        if let Some(key) = self.current_column_key() {
            self.view.reset_filter(&key);
            self.after_view_change();
            self.set_status_message(format!("Filter {key} cleared"));
        }
    }

    fn reset_all_filters(&mut self) {
        self.view.reset_all_filters();
        self.after_view_change();
        self.set_status_message("All filters cleared");
    }

    fn sort_current_column(&mut self) {
        if let Some(key) = self.current_column_key() {
            self.view.toggle_sort(&key);
            self.after_view_change();
            let message = match self.view.sort_order(&key) {
                Some(SortOrder::Ascending) => format!("Sorted by {key} ascending"),
                Some(SortOrder::Descending) => format!("Sorted by {key} descending"),
                None => "Sort cleared".to_string(),
            };
            self.set_status_message(message);
        }
    }

    fn change_page(&mut self, change: impl FnOnce(&mut TableView)) {
        change(&mut self.view);
        self.after_view_change();
    }

    fn after_view_change(&mut self) {
        self.curser_row = 0;
        self.offset_row = 0;
        self.update_table_data();
    }

    // -------------------- View data for the ui ---------------------- //

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_status_message_update = self.last_status_message_update;
        self.uidata.last_update = Instant::now();
        info!("{}", self.status_message);
    }

    fn calculate_column_widths(&self) -> Vec<usize> {
        self.view
            .columns()
            .iter()
            .map(|column| {
                let content_width = self
                    .view
                    .records()
                    .iter()
                    .map(|r| r.text(&column.key).chars().count())
                    .max()
                    .unwrap_or(0);
                let title_width = column.title.chars().count() + COLUMN_HEADER_DECORATION;
                let width = std::cmp::max(title_width, content_width) + COLUMN_WIDTH_MARGIN;
                std::cmp::min(width, self.config.max_column_width)
            })
            .collect()
    }

    fn update_visible_columns(&mut self) {
        let table_width = self.uilayout.table_width;
        self.visible_columns.clear();
        let mut visible_width = 0;

        // Columns that fit, the last one possibly cut
        for (idx, &width) in self.column_widths.iter().enumerate().skip(self.offset_column) {
            if visible_width + width + COLUMN_SEPARATOR_WIDTH <= table_width {
                self.visible_columns.push((idx, width));
                visible_width += width + COLUMN_SEPARATOR_WIDTH;
            } else {
                if visible_width + COLUMN_SEPARATOR_WIDTH < table_width {
                    let remaining = table_width - visible_width - COLUMN_SEPARATOR_WIDTH;
                    self.visible_columns.push((idx, remaining));
                    visible_width = table_width;
                }
                break;
            }
        }
        self.visible_width = visible_width;
        self.curser_column =
            std::cmp::min(self.curser_column, self.visible_columns.len().saturating_sub(1));
    }

    fn update_table_data(&mut self) {
        self.update_visible_columns();

        let rows = self.view.visible_rows();
        let nrows = rows.len();
        let rbegin = std::cmp::min(self.offset_row, nrows);
        let rend = std::cmp::min(rbegin + self.uilayout.table_height, nrows);

        let filters = self.view.filters();
        let table: Vec<ColumnView> = self
            .visible_columns
            .iter()
            .filter_map(|&(idx, width)| {
                let column = self.view.columns().get(idx)?;
                Some(ColumnView {
                    key: column.key.clone(),
                    title: column.title.clone(),
                    width,
                    data: rows[rbegin..rend]
                        .iter()
                        .map(|r| r.text(&column.key))
                        .collect(),
                    sort: self.view.sort_order(&column.key),
                    filtered: filters.is_filtered(&column.key),
                    highlight: filters.highlight_for(&column.key).map(str::to_string),
                })
            })
            .collect();

        let pagination = self.view.pagination();
        trace!(
            "Table: Cr {}, Cc {}, Or {}, Oc {}, Rb {}, Re {}, w {}, columns {}",
            self.curser_row,
            self.curser_column,
            self.offset_row,
            self.offset_column,
            rbegin,
            rend,
            self.visible_width,
            table.len()
        );

        self.uidata.name = self.view.name().to_string();
        self.uidata.table = table;
        self.uidata.nrows = nrows;
        self.uidata.selected_row = self.curser_row;
        self.uidata.selected_column = self.curser_column;
        self.uidata.abs_selected_row = self.offset_row + self.curser_row;
        self.uidata.page = pagination.current;
        self.uidata.page_count = self.view.page_count();
        self.uidata.page_size = pagination.page_size;
        self.uidata.total = self.view.total();
        self.uidata.nrecords = self.view.records().len();
        self.uidata.layout = self.uilayout.clone();
        self.uidata.last_update = Instant::now();
        self.update_uidata_dropdown();
    }

    fn update_uidata_dropdown(&mut self) {
        self.uidata.dropdown = self.dropdown.as_ref().map(|dropdown| {
            let column = self
                .uidata
                .table
                .iter()
                .position(|c| c.key == dropdown.column());
            let title = self
                .view
                .columns()
                .iter()
                .find(|c| c.key == dropdown.column())
                .map(|c| c.title.clone())
                .unwrap_or_default();
            DropdownView {
                column,
                title,
                placeholder: dropdown.placeholder().to_string(),
                input: dropdown.input(),
                focused: dropdown.is_focused(),
            }
        });
        self.uidata.last_update = Instant::now();
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        // Keep the cursor row on screen
        let max_row = self.uilayout.table_height.saturating_sub(1);
        if self.curser_row > max_row {
            self.offset_row += self.curser_row - max_row;
            self.curser_row = max_row;
        }
        self.update_table_data();
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
        self.uidata.last_update = Instant::now();
    }

    fn exit(&mut self) {
        if self.modus == Modus::POPUP {
            trace!("Close popup ...");
            self.modus = self.previous_modus;
            self.previous_modus = Modus::POPUP;
            self.uidata.show_popup = false;
            self.uidata.last_update = Instant::now();
        }
    }

    // -------------------- Clipboard ---------------------- //

    fn selected_record(&self) -> Option<&Record> {
        self.view
            .visible_rows()
            .get(self.offset_row + self.curser_row)
            .copied()
    }

    fn copy_to_clipboard(&mut self, content: String) {
        match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(content) {
                Ok(_) => {
                    trace!("Copied content to clipboard.");
                    self.set_status_message("Copied to clipboard");
                }
                Err(e) => {
                    debug!("Error copying to clipboard: {:?}", e);
                    self.set_status_message("Copying to clipboard failed");
                }
            },
            None => self.set_status_message("No clipboard available"),
        }
    }

    fn copy_table_cell(&mut self) {
        let cell = match (self.selected_record(), self.current_column_key()) {
            (Some(record), Some(key)) => record.text(&key),
            _ => return,
        };
        trace!("Cell content: {}", cell);
        self.copy_to_clipboard(cell);
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping || needs_escaping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn copy_table_row(&mut self) {
        let Some(record) = self.selected_record() else {
            return;
        };
        let row_content = self
            .view
            .columns()
            .iter()
            .map(|c| Model::wrap_cell_content(&record.text(&c.key)))
            .collect::<Vec<String>>()
            .join(",");
        self.copy_to_clipboard(row_content);
    }

    // -------------------- Cursor movement ---------------------- //

    fn move_table_selection_beginning(&mut self) {
        self.curser_row = 0;
        self.offset_row = 0;
        self.update_table_data();
    }

    fn move_table_selection_end(&mut self) {
        let nrows = self.uidata.nrows;
        if nrows == 0 {
            return;
        }
        let height = self.uilayout.table_height.max(1);
        if nrows < height {
            self.offset_row = 0;
            self.curser_row = nrows - 1;
        } else {
            self.offset_row = nrows - height;
            self.curser_row = height - 1;
        }
        self.update_table_data();
    }

    fn move_table_selection_up(&mut self, size: usize) {
        if self.curser_row > 0 {
            self.curser_row = self.curser_row.saturating_sub(size);
        } else if self.offset_row > 0 {
            // Curser at the top, shift table up
            self.offset_row = self.offset_row.saturating_sub(size);
        }
        self.update_table_data();
    }

    fn move_table_selection_down(&mut self, size: usize) {
        let nrows = self.uidata.nrows;
        let height = self.uilayout.table_height.max(1);
        if self.curser_row + self.offset_row + 1 < nrows {
            if self.curser_row + 1 < height {
                // Somewhere in the middle of the table
                self.curser_row = std::cmp::min(self.curser_row + size, nrows - self.offset_row - 1);
            } else {
                // At the bottom of the table, shift table down
                self.offset_row = std::cmp::min(self.offset_row + size, nrows - 1);
                self.curser_row = std::cmp::min(height - 1, nrows - self.offset_row - 1);
            }
            self.update_table_data();
        }
    }

    fn move_table_selection_left(&mut self) {
        let current = self.offset_column + self.curser_column;
        if current > 0 {
            self.select_column(current - 1);
        }
    }

    fn move_table_selection_right(&mut self) {
        let current = self.offset_column + self.curser_column;
        if current + 1 < self.column_widths.len() {
            self.select_column(current + 1);
        }
    }

    /// Moves the curser to column `target`, scrolling until it is fully on
    /// screen or the left most column.
    fn select_column(&mut self, target: usize) {
        if target < self.offset_column {
            self.offset_column = target;
        }
        loop {
            self.update_visible_columns();
            let rel = target - self.offset_column;
            if self.visible_columns.is_empty() || rel == 0 || self.column_fully_visible(rel) {
                self.curser_column = rel;
                break;
            }
            self.offset_column += 1;
        }
        self.update_table_data();
    }

    fn column_fully_visible(&self, visible_idx: usize) -> bool {
        self.visible_columns
            .get(visible_idx)
            .is_some_and(|&(idx, width)| self.column_widths.get(idx) == Some(&width))
    }
}
