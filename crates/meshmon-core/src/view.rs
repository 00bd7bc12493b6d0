use crate::config::DisplayConfig;
use crate::record::{FieldValue, Record};
use crate::staleness::{classify, Urgency};
use crate::store::{NodeEntry, StoreSnapshot};
use chrono::{DateTime, Local, Utc};
use std::fmt;

pub const URGENCY_MARKER: &str = "●";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Fields shown in the type column instead of the body; first match wins.
const CHANNEL_KEYS: [&str; 2] = ["channel", "topic"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Age {
    pub elapsed_secs: i64,
    pub urgency: Urgency,
}

impl Age {
    pub fn between(arrival: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let elapsed_secs = (now - arrival).num_seconds();
        Self {
            elapsed_secs,
            urgency: classify(elapsed_secs),
        }
    }

    pub fn label(&self) -> String {
        format!("{}s ago", self.elapsed_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummary {
    pub node_id: String,
    pub display_name: String,
    pub color: String,
    pub latest_kind: String,
    pub age: Age,
}

impl NodeSummary {
    pub fn text(&self) -> String {
        format!(
            "{}: {} {}",
            self.display_name,
            URGENCY_MARKER,
            self.age.label()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyLine {
    pub key: String,
    pub value: String,
    /// Sub-key of a flattened nested map.
    pub nested: bool,
}

impl fmt::Display for BodyLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nested {
            write!(f, "  - {}: {}", self.key, self.value)
        } else {
            write!(f, "{}: {}", self.key, self.value)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub node_id: String,
    pub display_name: String,
    pub color: String,
    /// Aliased payload sender; empty when the payload carried none.
    pub sender_label: String,
    pub kind_label: String,
    /// Channel or topic value; empty when absent.
    pub channel: String,
    pub body: Vec<BodyLine>,
    pub received_at: DateTime<Utc>,
    pub age: Age,
}

impl DetailRow {
    pub fn body_text(&self) -> String {
        self.body
            .iter()
            .map(BodyLine::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn received_label(&self) -> String {
        format_timestamp(self.received_at)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardView {
    pub last_update: Option<DateTime<Utc>>,
    pub summaries: Vec<NodeSummary>,
    pub rows: Vec<DetailRow>,
}

impl DashboardView {
    pub fn last_update_label(&self) -> String {
        self.last_update
            .map(format_timestamp)
            .unwrap_or_else(|| "N/A".to_string())
    }
}

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value
        .with_timezone(&Local)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

pub fn build_view(
    snapshot: &StoreSnapshot,
    now: DateTime<Utc>,
    display: &DisplayConfig,
) -> DashboardView {
    let mut nodes: Vec<(&str, &NodeEntry)> = snapshot
        .nodes
        .iter()
        .map(|node| (display.display_name(node.sender()), node))
        .collect();
    nodes.sort_by(|(left_name, left), (right_name, right)| {
        left_name
            .cmp(right_name)
            .then_with(|| left.sender().cmp(right.sender()))
    });

    let mut view = DashboardView {
        last_update: snapshot.last_update,
        summaries: Vec::with_capacity(nodes.len()),
        rows: Vec::new(),
    };

    for (display_name, node) in nodes {
        let color = display.color_for(display_name).to_string();
        if let Some(latest) = node.latest() {
            view.summaries.push(NodeSummary {
                node_id: node.sender().to_string(),
                display_name: display_name.to_string(),
                color: color.clone(),
                latest_kind: latest.kind.clone(),
                age: Age::between(latest.arrival_time, now),
            });
        }
        for record in node.records() {
            view.rows
                .push(detail_row(record, display_name, &color, now, display));
        }
    }

    view
}

fn detail_row(
    record: &Record,
    display_name: &str,
    color: &str,
    now: DateTime<Utc>,
    display: &DisplayConfig,
) -> DetailRow {
    let channel_key = CHANNEL_KEYS
        .iter()
        .copied()
        .find(|key| record.field(key).is_some());
    let channel = channel_key
        .and_then(|key| record.field(key))
        .map(FieldValue::to_string)
        .unwrap_or_default();

    let mut body = Vec::new();
    for (key, value) in record.fields.iter() {
        if Some(key) == channel_key || display.is_ignored(key) {
            continue;
        }
        match value {
            FieldValue::Map(nested) => {
                for (sub_key, sub_value) in nested.iter() {
                    if display.is_ignored(sub_key) {
                        continue;
                    }
                    body.push(BodyLine {
                        key: sub_key.to_string(),
                        value: sub_value.to_string(),
                        nested: true,
                    });
                }
            }
            other => body.push(BodyLine {
                key: key.to_string(),
                value: other.to_string(),
                nested: false,
            }),
        }
    }

    DetailRow {
        node_id: record.sender.clone(),
        display_name: display_name.to_string(),
        color: color.to_string(),
        sender_label: record
            .reported_sender
            .as_deref()
            .map(|sender| display.display_name(sender).to_string())
            .unwrap_or_default(),
        kind_label: record.kind.to_uppercase(),
        channel,
        body,
        received_at: record.arrival_time,
        age: Age::between(record.arrival_time, now),
    }
}
