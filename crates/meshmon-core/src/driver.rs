use crate::clock::{Clock, SystemClock};
use crate::config::DisplayConfig;
use crate::error::{IngestError, RenderError};
use crate::record::decode;
use crate::store::AggregationStore;
use crate::view::{build_view, DashboardView};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Output device for a finished dashboard view.
pub trait RenderSink {
    fn render(&mut self, view: &DashboardView) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// No message processed yet.
    Idle,
    Active,
}

/// Runs decode -> upsert -> snapshot -> build -> render for each message.
pub struct RenderDriver<C: Clock = SystemClock> {
    store: AggregationStore,
    display: DisplayConfig,
    clock: C,
    state: DriverState,
}

impl RenderDriver<SystemClock> {
    pub fn new(display: DisplayConfig) -> Self {
        Self::with_clock(display, SystemClock)
    }
}

impl<C: Clock> RenderDriver<C> {
    pub fn with_clock(display: DisplayConfig, clock: C) -> Self {
        Self {
            store: AggregationStore::new(),
            display,
            clock,
            state: DriverState::Idle,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn store(&self) -> &AggregationStore {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Processes one raw message. Bad input leaves state untouched and skips
    /// the render; a failed render keeps the upserted record.
    pub fn ingest<S>(&mut self, raw: &[u8], sink: &mut S) -> Result<(), IngestError>
    where
        S: RenderSink + ?Sized,
    {
        let now = self.clock.now();
        let record = match decode(raw, &self.display.ignore_fields, now) {
            Ok(record) => record,
            Err(err) => {
                warn!(event = "decode_error", error = %err, bytes = raw.len());
                return Err(err.into());
            }
        };
        debug!(
            event = "record_ingested",
            sender = %record.sender,
            kind = %record.kind,
            fields = record.fields.len()
        );
        self.store.upsert(record, now);
        self.state = DriverState::Active;
        self.render_at(now, sink)?;
        Ok(())
    }

    /// Re-renders current state without touching the store. No-op while idle.
    pub fn redraw<S>(&self, sink: &mut S) -> Result<(), RenderError>
    where
        S: RenderSink + ?Sized,
    {
        if self.state == DriverState::Idle {
            return Ok(());
        }
        self.render_at(self.clock.now(), sink)
    }

    pub fn view(&self) -> DashboardView {
        build_view(&self.store.snapshot(), self.clock.now(), &self.display)
    }

    fn render_at<S>(&self, now: DateTime<Utc>, sink: &mut S) -> Result<(), RenderError>
    where
        S: RenderSink + ?Sized,
    {
        let snapshot = self.store.snapshot();
        let view = build_view(&snapshot, now, &self.display);
        sink.render(&view).map_err(|err| {
            warn!(event = "render_error", error = %err);
            err
        })
    }
}
