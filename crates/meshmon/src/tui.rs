use crate::layout::{self, CellLine, FeedLabel, TABLE_HEADERS};
use crate::theme;
use meshmon_core::{DashboardView, RenderError, RenderSink};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};
use std::borrow::Cow;

const BODY_MIN_WIDTH: u16 = 20;
/// Table borders plus the header row and its margin.
const TABLE_CHROME: u16 = 4;

/// Full-screen dashboard drawn through ratatui.
pub struct TuiSink<B: Backend> {
    terminal: Terminal<B>,
    label: FeedLabel,
    /// Index of the first detail row shown.
    scroll: usize,
    row_count: usize,
}

impl<B: Backend> TuiSink<B> {
    pub fn new(terminal: Terminal<B>, label: FeedLabel) -> Self {
        Self {
            terminal,
            label,
            scroll: 0,
            row_count: 0,
        }
    }

    /// Moves the detail table window, clamped to the rows of the last render.
    pub fn scroll_by(&mut self, delta: isize) {
        self.scroll = self
            .scroll
            .saturating_add_signed(delta)
            .min(self.row_count.saturating_sub(1));
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<B> {
        &mut self.terminal
    }
}

impl<B: Backend> RenderSink for TuiSink<B> {
    fn render(&mut self, view: &DashboardView) -> Result<(), RenderError> {
        self.row_count = view.rows.len();
        self.scroll = self.scroll.min(self.row_count.saturating_sub(1));
        let label = &self.label;
        let scroll = self.scroll;
        self.terminal
            .draw(|frame| draw_dashboard(frame, label, view, scroll))?;
        Ok(())
    }
}

fn draw_dashboard(frame: &mut Frame, label: &FeedLabel, view: &DashboardView, scroll: usize) {
    let summary_height = (view.summaries.len() as u16).max(1) + 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(summary_height),
            Constraint::Min(4),
        ])
        .split(frame.size());

    let header = Paragraph::new(Line::from(Span::styled(
        layout::header_text(label, view),
        theme::HEADER_STYLE,
    )))
    .block(panel("meshmon"));
    frame.render_widget(header, chunks[0]);

    draw_summaries(frame, view, chunks[1]);
    draw_rows(frame, view, chunks[2], scroll);
}

fn panel<'a>(title: impl Into<Cow<'a, str>>) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(title, theme::TITLE_STYLE))
        .border_style(theme::BORDER_STYLE)
}

fn draw_summaries(frame: &mut Frame, view: &DashboardView, area: Rect) {
    let lines: Vec<Line> = if view.summaries.is_empty() {
        vec![Line::from(Span::styled(
            "waiting for messages",
            ratatui::style::Style::new().fg(theme::MUTED),
        ))]
    } else {
        view.summaries
            .iter()
            .map(|summary| styled_line(&layout::summary_line(summary)))
            .collect()
    };
    frame.render_widget(Paragraph::new(lines).block(panel("Nodes")), area);
}

fn draw_rows(frame: &mut Frame, view: &DashboardView, area: Rect, scroll: usize) {
    let cells: Vec<[layout::Cell; 4]> = view.rows.iter().map(layout::row_cells).collect();

    let mut widths: [u16; 4] = TABLE_HEADERS.map(|title| title.chars().count() as u16);
    for row in &cells {
        for (idx, cell) in row.iter().enumerate() {
            let width = cell.iter().map(layout::line_width).max().unwrap_or(0) as u16;
            widths[idx] = widths[idx].max(width);
        }
    }

    let start = scroll.min(cells.len().saturating_sub(1));
    let end = visible_end(&cells, start, area.height.saturating_sub(TABLE_CHROME));
    let title = if start > 0 || end < cells.len() {
        format!(
            "Messages {}-{} of {} (↑/↓ PgUp/PgDn to scroll)",
            start + 1,
            end,
            cells.len()
        )
    } else {
        "Messages".to_string()
    };

    let rows: Vec<Row> = cells[start..end]
        .iter()
        .map(|row| {
            Row::new(row.iter().map(|cell| {
                Cell::from(Text::from(
                    cell.iter().map(styled_line).collect::<Vec<_>>(),
                ))
            }))
            .height(row_height(row))
            .bottom_margin(1)
        })
        .collect();

    let constraints = [
        Constraint::Length(widths[0]),
        Constraint::Length(widths[1]),
        Constraint::Min(widths[2].min(BODY_MIN_WIDTH)),
        Constraint::Length(widths[3]),
    ];
    let table = Table::new(rows, constraints)
        .header(
            Row::new(TABLE_HEADERS)
                .style(theme::HEADER_STYLE)
                .bottom_margin(1),
        )
        .column_spacing(2)
        .block(panel(title));
    frame.render_widget(table, area);
}

fn row_height(row: &[layout::Cell; 4]) -> u16 {
    row.iter().map(Vec::len).max().unwrap_or(1).max(1) as u16
}

/// End (exclusive) of the rows starting at `start` that fit in `height`.
/// At least one row is shown so a tall row never hides everything.
fn visible_end(cells: &[[layout::Cell; 4]], start: usize, height: u16) -> usize {
    let mut used = 0u16;
    let mut end = start;
    for row in cells.iter().skip(start) {
        let needed = row_height(row).saturating_add(1);
        if end > start && used.saturating_add(needed) > height {
            break;
        }
        used = used.saturating_add(needed);
        end += 1;
    }
    end
}

fn styled_line(line: &CellLine) -> Line<'static> {
    Line::from(
        line.iter()
            .map(|segment| Span::styled(segment.text.clone(), theme::tone_style(&segment.tone)))
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use meshmon_core::{DisplayConfig, ManualClock, RenderDriver};
    use ratatui::backend::TestBackend;

    fn sink() -> TuiSink<TestBackend> {
        let terminal = Terminal::new(TestBackend::new(120, 30)).expect("terminal");
        TuiSink::new(
            terminal,
            FeedLabel {
                topic: "msh/#".to_string(),
                endpoint: "localhost:1883".to_string(),
            },
        )
    }

    fn screen(sink: &mut TuiSink<TestBackend>) -> Vec<String> {
        let buffer = sink.terminal_mut().backend().buffer().clone();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect()
    }

    #[test]
    fn empty_view_shows_header_placeholder() {
        let mut sink = sink();
        sink.render(&DashboardView::default()).expect("render");
        let lines = screen(&mut sink);
        assert!(lines
            .iter()
            .any(|line| line.contains("MQTT Topic: msh/# | Broker: localhost:1883 | Last Update: N/A")));
        assert!(lines.iter().any(|line| line.contains("waiting for messages")));
        assert!(lines.iter().any(|line| line.contains("Received Time")));
    }

    #[test]
    fn rows_beyond_the_screen_can_be_scrolled_into_view() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut driver = RenderDriver::with_clock(DisplayConfig::default(), ManualClock::new(start));
        let mut sink = sink();
        for idx in 0..6 {
            let raw = format!(r#"{{"type":"status","sender":"n{idx}"}}"#);
            driver.ingest(raw.as_bytes(), &mut sink).expect("ingest");
        }
        let has = |sink: &mut TuiSink<TestBackend>, needle: &str| {
            screen(sink).iter().any(|line| line.contains(needle))
        };
        assert!(has(&mut sink, "Messages 1-3 of 6"));

        sink.scroll_by(1);
        driver.redraw(&mut sink).expect("redraw");
        assert!(has(&mut sink, "Messages 2-4 of 6"));

        sink.scroll_by(100);
        driver.redraw(&mut sink).expect("redraw");
        assert!(has(&mut sink, "Messages 6-6 of 6"));

        sink.scroll_by(-100);
        driver.redraw(&mut sink).expect("redraw");
        assert!(has(&mut sink, "Messages 1-3 of 6"));
    }

    #[test]
    fn ingested_message_appears_in_summary_and_table() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut driver = RenderDriver::with_clock(DisplayConfig::default(), ManualClock::new(start));
        let mut sink = sink();
        driver
            .ingest(
                br#"{"type":"status","sender":"!a1b2","battery":80,"channel":0}"#,
                &mut sink,
            )
            .expect("ingest");

        let lines = screen(&mut sink);
        assert!(lines.iter().any(|line| line.contains("!a1b2: ● 0s ago")));
        assert!(lines.iter().any(|line| line.contains("STATUS")));
        assert!(lines.iter().any(|line| line.contains("#0")));
        assert!(lines.iter().any(|line| line.contains("battery: 80")));
        assert!(!lines.iter().any(|line| line.contains("waiting for messages")));
    }
}
