use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::event::Event;

mod in_memory;

pub use self::in_memory::*;

pub type Offset = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub offset: Offset,
    pub details: Event,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithOffset<T> {
    pub offset: Offset,
    pub data: T,
}

pub trait Reader: Send + Sync {
    /// Read up to `limit` events starting at `offset`, blocking up to
    /// `timeout` when the log end has been reached. Returns the offset
    /// to continue from.
    fn read(
        &self,
        offset: Offset,
        limit: usize,
        timeout: Option<Duration>,
    ) -> Result<WithOffset<Vec<LogEvent>>>;

    fn get_start_offset(&self) -> Result<Offset>;
}

pub trait Writer: Send + Sync {
    /// Append events; returns the offset just past the written batch.
    fn write(&self, events: &[Event]) -> Result<Offset>;
}

pub type SharedReader = Arc<dyn Reader + 'static>;
pub type SharedWriter = Arc<dyn Writer + 'static>;
