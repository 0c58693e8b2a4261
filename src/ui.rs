use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, Cell, Clear, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState,
        Table, TableState, Wrap,
    },
};

use crate::domain::CMDMode;
use crate::model::{Model, UIData};

pub const FILTERBAR_HEIGHT: usize = 3;
pub const CMDLINE_HEIGH: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const SCROLLBAR_WIDTH: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

const STATUS_MESSAGE_FADE: Duration = Duration::from_secs(5);

#[derive(Default)]
pub struct TableUI {
    table_state: TableState,
}

impl TableUI {
    pub fn new() -> Self {
        Self {
            table_state: TableState::default(),
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [filter_area, table_area, status_area] = Layout::vertical([
            Constraint::Length(FILTERBAR_HEIGHT as u16),
            Constraint::Min(1),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(frame.area());
        let [table_area, scroll_area] = Layout::horizontal([
            Constraint::Min(1),
            Constraint::Length(SCROLLBAR_WIDTH as u16),
        ])
        .areas(table_area);

        self.render_filters(uidata, frame, filter_area);
        self.render_table(uidata, frame, table_area);
        Self::render_scrollbar(uidata, frame, scroll_area);
        Self::render_statusline(uidata, frame, status_area);

        if uidata.show_popup {
            Self::render_popup(&uidata.popup_message, frame);
        }
    }

    fn render_filters(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let filters = &uidata.filters;
        let title = Line::from(Span::from(format!(" planetview [{}] ", uidata.name)).bold());
        let editing = |mode: CMDMode| uidata.active_cmdinput && uidata.cmd_mode == Some(mode);
        let field = |text: &str, active: bool| {
            let span = Span::from(format!("{text} "));
            if active {
                span.black().on_yellow()
            } else {
                span.yellow()
            }
        };

        let line = Line::from(vec![
            " Name ".into(),
            field(&filters.name_query, editing(CMDMode::NameFilter)),
            "│ Column ".into(),
            field(&filters.column, false),
            "Comparison ".into(),
            field(&filters.comparison, false),
            "Value ".into(),
            field(&filters.value, editing(CMDMode::NumericValue)),
            "│ ".into(),
            Span::from(filters.numeric_state.clone()).italic(),
        ]);
        frame.render_widget(Paragraph::new(line).block(Block::bordered().title(title)), area);
    }

    fn render_table(&mut self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let header = Row::new(
            uidata
                .table
                .iter()
                .map(|c| Cell::from(get_visible_name(&c.name, c.width))),
        )
        .style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED));

        let nvisible = uidata.table.first().map(|c| c.data.len()).unwrap_or(0);
        let rows = (0..nvisible).map(|ridx| {
            Row::new(
                uidata
                    .table
                    .iter()
                    .map(|c| Cell::from(get_visible_name(&c.data[ridx], c.width))),
            )
        });
        let widths = uidata
            .table
            .iter()
            .map(|c| Constraint::Length(c.width as u16));

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(0)
            .row_highlight_style(Style::default().bg(Color::DarkGray))
            .cell_highlight_style(Style::default().fg(Color::Black).bg(Color::Yellow));

        if nvisible > 0 {
            self.table_state.select(Some(uidata.selected_row));
            self.table_state.select_column(Some(uidata.selected_column));
        } else {
            self.table_state.select(None);
            self.table_state.select_column(None);
        }
        // Scrolling is handled by the model, the widget only sees the window.
        *self.table_state.offset_mut() = 0;
        frame.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn render_scrollbar(uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut state = ScrollbarState::new(uidata.nrows).position(uidata.abs_selected_row);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut state,
        );
    }

    fn render_statusline(uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = match uidata.cmd_mode {
                Some(CMDMode::NameFilter) => "name> ",
                Some(CMDMode::NumericValue) => "value> ",
                None => "> ",
            };
            let line = Line::from(vec![prompt.bold(), uidata.cmdinput.input.clone().into()]);
            frame.render_widget(Paragraph::new(line), area);
            let cursor_x = area.x + (prompt.len() + uidata.cmdinput.cursor_pos) as u16;
            frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(1)), area.y));
            return;
        }

        let counter = format!(" {}/{} rows ", uidata.nrows, uidata.total_rows);
        let [message_area, counter_area] = Layout::horizontal([
            Constraint::Min(1),
            Constraint::Length(counter.len() as u16),
        ])
        .areas(area);

        let message = Span::from(uidata.status_message.clone());
        let message = if uidata.last_status_message_update.elapsed() > STATUS_MESSAGE_FADE {
            message.dark_gray()
        } else {
            message.white()
        };
        frame.render_widget(Paragraph::new(Line::from(message)), message_area);
        frame.render_widget(
            Paragraph::new(Line::from(Span::from(counter).blue().bold()).right_aligned()),
            counter_area,
        );
    }

    fn render_popup(message: &str, frame: &mut Frame) {
        let area = centered(frame.area(), 50, 22);
        frame.render_widget(Clear, area);
        let popup = Paragraph::new(message.to_string())
            .wrap(Wrap { trim: false })
            .block(
                Block::bordered()
                    .title(Line::from(" Help ".bold()).centered())
                    .title_bottom(Line::from(" <Esc> close ".blue()).centered()),
            );
        frame.render_widget(popup, area);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Cuts `name` to fit a column of `width`, leaving room for the margin.
fn get_visible_name(name: &str, width: usize) -> String {
    let room = width.saturating_sub(COLUMN_WIDTH_MARGIN);
    if name.chars().count() <= room {
        return name.to_string();
    }
    if room < 3 {
        return name.chars().take(room).collect();
    }
    let mut reduced_name: String = name.chars().take(room - 3).collect();
    reduced_name.push_str("...");
    reduced_name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, PVConfig, PVError};
    use crate::fetch::PlanetSource;
    use crate::planet::Planet;
    use crate::planet::tests::reference_planets;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    struct FixtureSource;

    impl PlanetSource for FixtureSource {
        fn fetch(&self) -> Result<Vec<Planet>, PVError> {
            Ok(reference_planets())
        }

        fn describe(&self) -> String {
            "fixture".to_string()
        }
    }

    fn buffer_lines(buffer: &Buffer) -> Vec<String> {
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect()
    }

    fn render(model: &Model, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        let mut ui = TableUI::new();
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        buffer_lines(terminal.backend().buffer())
    }

    fn loaded_model(width: u16, height: u16) -> Model {
        let mut model =
            Model::init(&PVConfig::default(), width as usize, height as usize).unwrap();
        model.load(Box::new(FixtureSource));
        model
    }

    #[test]
    fn renders_header_and_one_line_per_planet() {
        let model = loaded_model(320, 20);
        let lines = render(&model, 320, 20);

        let header = &lines[FILTERBAR_HEIGHT];
        for column in [
            "name",
            "rotation_period",
            "orbital_period",
            "diameter",
            "climate",
            "gravity",
            "terrain",
            "surface_water",
            "population",
            "films",
            "created",
            "edited",
            "url",
        ] {
            assert!(header.contains(column), "missing {column} in {header}");
        }
        assert!(!header.contains("residents"));

        let planet_lines = lines
            .iter()
            .filter(|l| l.contains("https://swapi.dev/api/planets/"))
            .count();
        assert_eq!(planet_lines, 10);
        assert!(lines.last().unwrap().contains("10/10 rows"));
    }

    #[test]
    fn filtered_rows_and_controls_are_shown() {
        let mut model = loaded_model(320, 20);
        model.update(Some(Message::FilterByName)).unwrap();
        for chr in "oo".chars() {
            let key = KeyEvent::new(KeyCode::Char(chr), KeyModifiers::NONE);
            model.update(Some(Message::RawKey(key))).unwrap();
        }
        let lines = render(&model, 320, 20);
        let text = lines.join("\n");
        assert!(text.contains("Naboo"));
        assert!(text.contains("Tatooine"));
        assert!(!text.contains("Hoth"));
        assert!(lines.last().unwrap().starts_with("name> oo"));
        assert!(lines[1].contains("population"));
        assert!(lines[1].contains("greater than"));
        assert!(lines[1].contains("not applied"));
    }

    #[test]
    fn help_popup_is_drawn_on_top() {
        let mut model = loaded_model(120, 30);
        model.update(Some(Message::Help)).unwrap();
        let text = render(&model, 120, 30).join("\n");
        assert!(text.contains("Help"));
        assert!(text.contains("apply numeric filter"));
    }

    #[test]
    fn long_values_are_shortened() {
        assert_eq!(get_visible_name("Tatooine", 10), "Tatooine");
        assert_eq!(get_visible_name("grassy hills, swamps", 11), "grassy ...");
        assert_eq!(get_visible_name("Hoth", 3), "Ho");
    }
}
