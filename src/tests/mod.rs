mod countdown;
mod marketplace;

use crate::event::Event;
use crate::event_log::SharedReader;
use anyhow::Result;
use std::time::Duration;

/// Drain everything written to the log so far.
fn written_events(reader: &SharedReader) -> Result<Vec<Event>> {
    let read = reader.read(reader.get_start_offset()?, 64, Some(Duration::from_secs(0)))?;
    Ok(read.data.into_iter().map(|e| e.details).collect())
}
