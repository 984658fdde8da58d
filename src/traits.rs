use serde::Serialize;

use crate::class::EventClass;
use crate::event::Event;

/// A progress indicator
pub trait Progress {
    fn inc(&self, i: u64);

    fn finish(&self);
}

/// A row in a CSV output file
pub trait CsvRecord: Serialize {
    /// What a row describes, used in default file names
    const KIND: &'static str;

    /// Column names in the order in which fields are serialised
    const HEADER: &'static [&'static str];
}

/// Rows extracted from a single event
#[derive(Clone, Debug, PartialEq)]
pub struct Extraction<R> {
    pub rows: Vec<R>,
    /// Number of degenerate quantities encountered
    pub degenerate: u64,
}

impl<R> Default for Extraction<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            degenerate: 0,
        }
    }
}

/// Extract output rows from generated events
pub trait Extract {
    type Row: CsvRecord;

    /// Extract rows from the event with the given index within its phase
    fn extract(
        &mut self,
        index: u64,
        class: EventClass,
        event: &Event,
    ) -> Extraction<Self::Row>;
}

impl<X: Extract + ?Sized> Extract for &mut X {
    type Row = X::Row;

    fn extract(
        &mut self,
        index: u64,
        class: EventClass,
        event: &Event,
    ) -> Extraction<Self::Row> {
        (**self).extract(index, class, event)
    }
}
