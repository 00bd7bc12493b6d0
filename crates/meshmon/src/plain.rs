//! Clear-and-print renderer for terminals where the full-screen UI is unwanted.

use crate::layout::{self, Cell, CellLine, FeedLabel, TABLE_HEADERS};
use crate::theme;
use crossterm::{
    cursor::MoveTo,
    queue,
    style::Stylize,
    terminal::{Clear, ClearType},
};
use meshmon_core::{DashboardView, RenderError, RenderSink};
use std::fmt::Write as _;
use std::io::Write;

pub struct PlainSink<W: Write> {
    out: W,
    label: FeedLabel,
    styled: bool,
}

impl<W: Write> PlainSink<W> {
    pub fn new(out: W, label: FeedLabel, styled: bool) -> Self {
        Self { out, label, styled }
    }
}

impl<W: Write> RenderSink for PlainSink<W> {
    fn render(&mut self, view: &DashboardView) -> Result<(), RenderError> {
        let text = render_text(view, &self.label, self.styled);
        if self.styled {
            queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        }
        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

pub fn render_text(view: &DashboardView, label: &FeedLabel, styled: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", layout::header_text(label, view));
    out.push('\n');
    for summary in &view.summaries {
        push_line(&mut out, &layout::summary_line(summary), styled);
        out.push('\n');
    }
    out.push_str("\n\n\n");

    let header: Vec<Cell> = TABLE_HEADERS
        .iter()
        .map(|title| vec![vec![layout::Segment::plain(*title)]])
        .collect();
    let rows: Vec<Vec<Cell>> = view
        .rows
        .iter()
        .map(|row| layout::row_cells(row).to_vec())
        .collect();
    push_grid(&mut out, &header, &rows, styled);
    out
}

fn push_line(out: &mut String, line: &CellLine, styled: bool) {
    for segment in line {
        match theme::tone_color(&segment.tone).filter(|_| styled) {
            Some(color) => {
                let _ = write!(
                    out,
                    "{}",
                    segment.text.as_str().with(theme::term_color(color))
                );
            }
            None => out.push_str(&segment.text),
        }
    }
}

fn push_grid(out: &mut String, header: &[Cell], rows: &[Vec<Cell>], styled: bool) {
    let mut widths: Vec<usize> = header.iter().map(cell_width).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(cell_width(cell));
        }
    }

    push_rule(out, &widths, ('┌', '┬', '┐'));
    push_cells(out, &widths, header, styled);
    for row in rows {
        push_rule(out, &widths, ('├', '┼', '┤'));
        push_cells(out, &widths, row, styled);
    }
    push_rule(out, &widths, ('└', '┴', '┘'));
}

fn cell_width(cell: &Cell) -> usize {
    cell.iter().map(layout::line_width).max().unwrap_or(0)
}

fn push_rule(out: &mut String, widths: &[usize], (left, mid, right): (char, char, char)) {
    out.push(left);
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            out.push(mid);
        }
        out.push_str(&"─".repeat(width + 2));
    }
    out.push(right);
    out.push('\n');
}

fn push_cells(out: &mut String, widths: &[usize], cells: &[Cell], styled: bool) {
    let height = cells.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let empty = CellLine::new();
    for line_idx in 0..height {
        for (idx, width) in widths.iter().enumerate() {
            let line = cells
                .get(idx)
                .and_then(|cell| cell.get(line_idx))
                .unwrap_or(&empty);
            out.push_str("│ ");
            push_line(out, line, styled);
            out.push_str(&" ".repeat(width - layout::line_width(line) + 1));
        }
        out.push_str("│\n");
    }
}
