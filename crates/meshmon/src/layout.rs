//! Sink-neutral cell model shared by the TUI and plain renderers.

use meshmon_core::view::URGENCY_MARKER;
use meshmon_core::{DashboardView, DetailRow, NodeSummary, Urgency};

pub const TABLE_HEADERS: [&str; 4] = [
    "Nodes",
    "Message Type / Channel",
    "Last Message",
    "Received Time",
];
const SENDER_ARROW: &str = "  ↑";
const CONTINUATION_INDENT: &str = "    ";

/// What the header says about the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLabel {
    pub topic: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Muted,
    /// Color token from the display config.
    Node(String),
    Urgency(Urgency),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub tone: Tone,
}

impl Segment {
    fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Plain)
    }
}

pub type CellLine = Vec<Segment>;
pub type Cell = Vec<CellLine>;

pub fn line_width(line: &CellLine) -> usize {
    line.iter().map(|segment| segment.text.chars().count()).sum()
}

/// One cell line per line of `text`; continuation lines are indented.
fn text_lines(text: &str) -> Vec<CellLine> {
    text.lines()
        .enumerate()
        .map(|(idx, part)| {
            let part = if idx == 0 {
                part.to_string()
            } else {
                format!("{CONTINUATION_INDENT}{part}")
            };
            vec![Segment::new(part, Tone::Plain)]
        })
        .collect()
}

/// Collapses line breaks so single-line cells stay single-line.
fn single_line(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join(" ")
}

pub fn header_text(label: &FeedLabel, view: &DashboardView) -> String {
    format!(
        "MQTT Topic: {} | Broker: {} | Last Update: {}",
        label.topic,
        label.endpoint,
        view.last_update_label()
    )
}

pub fn summary_line(summary: &NodeSummary) -> CellLine {
    vec![
        Segment::new(
            single_line(&summary.display_name),
            Tone::Node(summary.color.clone()),
        ),
        Segment::new(": ", Tone::Plain),
        Segment::new(URGENCY_MARKER, Tone::Urgency(summary.age.urgency)),
        Segment::new(format!(" {}", summary.age.label()), Tone::Plain),
    ]
}

pub fn row_cells(row: &DetailRow) -> [Cell; 4] {
    let node_tone = Tone::Node(row.color.clone());
    let node = vec![
        vec![Segment::new(single_line(&row.display_name), node_tone.clone())],
        vec![Segment::new(SENDER_ARROW, Tone::Muted)],
        vec![Segment::new(single_line(&row.sender_label), node_tone)],
    ];

    let channel = if row.channel.is_empty() {
        String::new()
    } else {
        format!("  #{}", single_line(&row.channel))
    };
    let kind = vec![
        vec![Segment::new(row.kind_label.clone(), Tone::Plain)],
        Vec::new(),
        vec![Segment::new(channel, Tone::Muted)],
    ];

    let body = row
        .body
        .iter()
        .flat_map(|line| text_lines(&line.to_string()))
        .collect();

    let received = vec![
        vec![Segment::new(row.received_label(), Tone::Plain)],
        vec![
            Segment::new(URGENCY_MARKER, Tone::Urgency(row.age.urgency)),
            Segment::new(format!(" {}", row.age.label()), Tone::Plain),
        ],
    ];

    [node, kind, body, received]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use meshmon_core::{Age, BodyLine};

    fn row(channel: &str, sender_label: &str) -> DetailRow {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        DetailRow {
            node_id: "!a1b2".to_string(),
            display_name: "Base".to_string(),
            color: "cyan".to_string(),
            sender_label: sender_label.to_string(),
            kind_label: "TEXT".to_string(),
            channel: channel.to_string(),
            body: vec![BodyLine {
                key: "text".to_string(),
                value: "hi".to_string(),
                nested: true,
            }],
            received_at: at,
            age: Age::between(at, at + chrono::Duration::seconds(75)),
        }
    }

    #[test]
    fn row_cells_keep_placeholders_for_missing_sender_and_channel() {
        let [node, kind, _, _] = row_cells(&row("", ""));
        assert_eq!(node.len(), 3);
        assert_eq!(line_width(&node[2]), 0);
        assert_eq!(kind.len(), 3);
        assert_eq!(line_width(&kind[2]), 0);
    }

    #[test]
    fn multi_line_values_become_separate_cell_lines() {
        let mut row = row("line\nbreak", "Base");
        row.body[0].value = "line one\r\nline two\nline three".to_string();
        let [node, kind, body, _] = row_cells(&row);

        let texts: Vec<&str> = body.iter().map(|line| line[0].text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["  - text: line one", "    line two", "    line three"]
        );
        assert_eq!(kind[2][0].text, "  #line break");
        assert_eq!(node.len(), 3);
    }

    #[test]
    fn row_cells_mark_channel_and_urgency() {
        let [_, kind, body, received] = row_cells(&row("2", "Base"));
        assert_eq!(kind[2][0].text, "  #2");
        assert_eq!(body[0][0].text, "  - text: hi");
        assert_eq!(received[1][0].tone, Tone::Urgency(Urgency::Fresh2));
        assert_eq!(received[1][1].text, " 75s ago");
    }
}
