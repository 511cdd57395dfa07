use super::*;
use crate::event::Event;
use anyhow::{format_err, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
pub struct InMemoryLog {
    inner: Mutex<Vec<Event>>,
    condvar: Condvar,
}

impl InMemoryLog {
    fn write_events(&self, events: &[Event]) -> Result<Offset> {
        let mut write = self.inner.lock();

        write.extend_from_slice(events);
        self.condvar.notify_all();

        Ok(u64::try_from(write.len())?)
    }
}

impl Reader for InMemoryLog {
    fn read(
        &self,
        offset: Offset,
        limit: usize,
        timeout: Option<Duration>,
    ) -> Result<WithOffset<Vec<LogEvent>>> {
        let offset_usize = usize::try_from(offset)?;

        let mut read = self.inner.lock();

        if read.len() == offset_usize {
            if let Some(timeout) = timeout {
                self.condvar.wait_for(&mut read, timeout);
            } else {
                self.condvar.wait(&mut read);
            }
        }

        let data: Vec<_> = read
            .get(offset_usize..)
            .ok_or_else(|| format_err!("offset out of bounds: {offset}"))?
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, e)| LogEvent {
                offset: offset + u64::try_from(i).expect("no fail"),
                details: e.clone(),
            })
            .collect();

        Ok(WithOffset {
            offset: offset + u64::try_from(data.len()).expect("no fail"),
            data,
        })
    }

    fn get_start_offset(&self) -> Result<Offset> {
        Ok(0)
    }
}

impl Writer for InMemoryLog {
    fn write(&self, events: &[Event]) -> Result<Offset> {
        self.write_events(events)
    }
}

pub fn new_in_memory_shared() -> (SharedWriter, SharedReader) {
    let log = Arc::new(InMemoryLog::default());
    (log.clone(), log)
}
