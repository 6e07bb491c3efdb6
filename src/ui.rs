use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, Wrap},
};
use tracing::trace;

use crate::filter::highlight_segments;
use crate::model::{ColumnView, DropdownView, Model, UIData};

pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const TABLE_BORDER_WIDTH: usize = 2;
pub const PAGINATION_HEIGHT: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;
pub const COLUMN_SEPARATOR_WIDTH: usize = 1;
// Room for the sort arrow and the filter icon behind a title
pub const COLUMN_HEADER_DECORATION: usize = 4;

const DROPDOWN_WIDTH: u16 = 36;
const DROPDOWN_HEIGHT: u16 = 4;
const FILTER_ICON: &str = "⌕";
const FILTER_ACTIVE_COLOR: Color = Color::Rgb(0x18, 0x90, 0xff);
const HIGHLIGHT_COLOR: Color = Color::Rgb(0xff, 0xc0, 0x69);

#[derive(Debug, Default)]
pub struct TableUI;

impl TableUI {
    pub fn new() -> Self {
        Self
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [top, table, bottom, status] = Layout::vertical([
            Constraint::Length(PAGINATION_HEIGHT as u16),
            Constraint::Fill(1),
            Constraint::Length(PAGINATION_HEIGHT as u16),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        self.render_pagination(uidata, frame, top);
        self.render_table(uidata, frame, table);
        self.render_pagination(uidata, frame, bottom);
        self.render_statusline(uidata, frame, status);

        if let Some(dropdown) = &uidata.dropdown {
            self.render_dropdown(uidata, dropdown, frame, table);
        }
        if uidata.show_popup {
            self.render_popup(uidata, frame);
        }
    }

    fn render_pagination(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let enabled = Style::default().fg(Color::Cyan).bold();
        let disabled = Style::default().fg(Color::DarkGray);
        let prev_style = if uidata.page > 1 { enabled } else { disabled };
        let next_style = if uidata.page < uidata.page_count {
            enabled
        } else {
            disabled
        };
        let line = Line::from(vec![
            Span::styled("‹ prev", prev_style),
            format!("  {} / {}  ", uidata.page, uidata.page_count).into(),
            Span::styled("next ›", next_style),
            format!("   {} / page", uidata.page_size).into(),
            format!("   {} of {} records ", uidata.total, uidata.nrecords).dark_gray(),
        ]);
        frame.render_widget(Paragraph::new(line).alignment(Alignment::Right), area);
    }

    fn header_cell(column: &ColumnView) -> Cell<'static> {
        let sort = column.sort.map(|s| s.symbol()).unwrap_or(" ");
        let icon_style = if column.filtered {
            Style::default().fg(FILTER_ACTIVE_COLOR).bold()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let title_width = column.width.saturating_sub(COLUMN_HEADER_DECORATION);
        Cell::from(Line::from(vec![
            Span::raw(truncate(&column.title, title_width)),
            Span::raw(" "),
            Span::raw(sort),
            Span::raw(" "),
            Span::styled(FILTER_ICON, icon_style),
        ]))
        .style(Style::default().bold())
    }

    fn body_cell(column: &ColumnView, text: &str) -> Cell<'static> {
        let text = truncate(text, column.width);
        match column.highlight.as_deref() {
            Some(term) => {
                let highlight = Style::default().bg(HIGHLIGHT_COLOR).fg(Color::Black);
                let spans: Vec<Span> = highlight_segments(&text, term)
                    .into_iter()
                    .map(|segment| {
                        if segment.highlighted {
                            Span::styled(segment.text.to_string(), highlight)
                        } else {
                            Span::raw(segment.text.to_string())
                        }
                    })
                    .collect();
                Cell::from(Line::from(spans))
            }
            None => Cell::from(text),
        }
    }

    fn separator() -> Cell<'static> {
        Cell::from("│").style(Style::default().fg(Color::DarkGray))
    }

    fn render_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let block = Block::bordered().title(Line::from(format!(" {} ", uidata.name).bold()));

        if uidata.table.is_empty() {
            let empty = Paragraph::new("No data".dark_gray())
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let mut widths = Vec::with_capacity(uidata.table.len() * 2);
        let mut header = Vec::with_capacity(uidata.table.len() * 2);
        for column in uidata.table.iter() {
            widths.push(Constraint::Length(column.width as u16));
            widths.push(Constraint::Length(COLUMN_SEPARATOR_WIDTH as u16));
            header.push(Self::header_cell(column));
            header.push(Self::separator());
        }

        let nrows = uidata.table[0].data.len();
        let rows: Vec<Row> = (0..nrows)
            .map(|ridx| {
                let mut cells = Vec::with_capacity(uidata.table.len() * 2);
                for (cidx, column) in uidata.table.iter().enumerate() {
                    let mut cell = Self::body_cell(column, &column.data[ridx]);
                    if ridx == uidata.selected_row && cidx == uidata.selected_column {
                        cell = cell.style(Style::default().add_modifier(Modifier::REVERSED));
                    }
                    cells.push(cell);
                    cells.push(Self::separator());
                }
                let row = Row::new(cells);
                if ridx == uidata.selected_row {
                    row.style(Style::default().bg(Color::Rgb(0x30, 0x30, 0x30)))
                } else {
                    row
                }
            })
            .collect();

        let table = Table::new(rows, widths)
            .header(Row::new(header).height(TABLE_HEADER_HEIGHT as u16))
            .column_spacing(0)
            .block(block);
        frame.render_widget(table, area);
    }

    fn render_statusline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let position = if uidata.nrows > 0 {
            format!(
                "row {}/{} ",
                uidata.abs_selected_row + 1,
                uidata.nrows
            )
        } else {
            String::new()
        };
        let [left, right] =
            Layout::horizontal([Constraint::Fill(1), Constraint::Length(position.len() as u16)])
                .areas(area);
        frame.render_widget(
            Paragraph::new(uidata.status_message.as_str().yellow()),
            left,
        );
        frame.render_widget(Paragraph::new(position).alignment(Alignment::Right), right);
    }

    fn render_dropdown(&self, uidata: &UIData, dropdown: &DropdownView, frame: &mut Frame, table: Rect) {
        // Below the header of the filtered column
        let column_x: usize = match dropdown.column {
            Some(idx) => uidata.table[..idx]
                .iter()
                .map(|c| c.width + COLUMN_SEPARATOR_WIDTH)
                .sum(),
            None => 0,
        };
        let frame_area = frame.area();
        let width = DROPDOWN_WIDTH.min(frame_area.width);
        let height = DROPDOWN_HEIGHT.min(frame_area.height);
        let x = (table.x + 1 + column_x as u16).min(frame_area.right().saturating_sub(width));
        let y = (table.y + 1 + TABLE_HEADER_HEIGHT as u16).min(frame_area.bottom().saturating_sub(height));
        let area = Rect::new(x, y, width, height);
        trace!("Dropdown area {:?}", area);

        let input_line = if dropdown.input.input.is_empty() {
            Line::from(dropdown.placeholder.as_str().dark_gray())
        } else {
            Line::from(dropdown.input.input.as_str())
        };
        let buttons = Line::from(vec![
            Span::styled(
                format!(" {FILTER_ICON} Search "),
                Style::default().bg(FILTER_ACTIVE_COLOR).fg(Color::White),
            ),
            " Enter  ".dark_gray(),
            Span::styled(" Reset ", Style::default().reversed()),
            " Ctrl+r".dark_gray(),
        ]);
        let block = Block::bordered().title(format!(" Filter {} ", dropdown.title));
        let inner = block.inner(area);

        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(vec![input_line, buttons]).block(block), area);

        if dropdown.focused {
            let cursor_x = inner.x + dropdown.input.curser_pos as u16;
            frame.set_cursor_position(Position::new(cursor_x.min(inner.right()), inner.y));
        }
    }

    fn render_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let area = centered_rect(60, 70, frame.area());
        let popup = Paragraph::new(Text::from(uidata.popup_message.as_str()))
            .wrap(Wrap { trim: false })
            .block(Block::bordered().title(" Help ".bold()).title_bottom(" Esc to close "));
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

/// Cuts `text` to `width` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let [_, vertical, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);
    let [_, horizontal, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(vertical);
    horizontal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, TVConfig};
    use crate::record::{Record, ResultSet, Value};
    use ratatui::{Terminal, backend::TestBackend, buffer::Buffer};
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn model() -> Model {
        let result = ResultSet {
            name: "sample.json".into(),
            records: vec![
                Record::from_pairs(0, [("title", Value::from("Alpha")), ("year", Value::from(2001i64))]),
                Record::from_pairs(1, [("title", Value::from("beta")), ("year", Value::from(1999i64))]),
            ],
        };
        Model::init(&TVConfig::default(), result, 120, 20)
    }

    fn lines(buffer: &Buffer) -> Vec<String> {
        let area = buffer.area;
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect()
    }

    fn draw(model: &Model) -> Buffer {
        let mut terminal = Terminal::new(TestBackend::new(120, 20)).unwrap();
        let ui = TableUI::new();
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        terminal.backend().buffer().clone()
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("Alpha", 10), "Alpha");
        assert_eq!(truncate("Alphabet", 5), "Alph…");
        assert_eq!(truncate("Alpha", 0), "");
    }

    #[test]
    fn renders_titles_rows_and_pagination() {
        let buffer = draw(&model());
        let lines = lines(&buffer);
        assert!(lines[0].contains("1 / 1"));
        assert!(lines[0].contains("100 / page"));
        assert!(lines[2].contains("Title"));
        assert!(lines[2].contains("Package Name"));
        assert!(lines[3].contains("Alpha"));
        assert!(lines[4].contains("beta"));
        assert!(lines[18].contains("1 / 1"));
    }

    #[test]
    fn renders_empty_table() {
        let model = Model::init(&TVConfig::default(), ResultSet::default(), 120, 20);
        let lines = lines(&draw(&model));
        assert!(lines.iter().any(|l| l.contains("No data")));
    }

    #[test]
    fn highlights_matches_of_searched_column() {
        let mut model = model();
        model.update(Some(Message::OpenFilter));
        model.after_render();
        for c in "alp".chars() {
            model.update(Some(Message::RawKey(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))));
        }
        model.update(Some(Message::RawKey(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))));

        let buffer = draw(&model);
        let lines = lines(&buffer);
        assert!(lines[3].contains("Alpha"));
        assert!(!lines.iter().any(|l| l.contains("beta")));

        // Row 3, first cell starts right of the border
        assert_eq!(buffer[(1, 3)].symbol(), "A");
        assert_eq!(buffer[(1, 3)].bg, HIGHLIGHT_COLOR);
        assert_eq!(buffer[(3, 3)].bg, HIGHLIGHT_COLOR);
        assert_ne!(buffer[(4, 3)].bg, HIGHLIGHT_COLOR);
    }

    #[test]
    fn renders_open_dropdown() {
        let mut model = model();
        model.update(Some(Message::OpenFilter));
        let lines = lines(&draw(&model));
        assert!(lines.iter().any(|l| l.contains("Filter Title")));
        assert!(lines.iter().any(|l| l.contains("Search title")));
    }
}
