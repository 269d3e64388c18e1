//! Live-mode feed that tails a growing bar CSV.
//!
//! Some external collector appends one row per closed bar. Each poll reads
//! only the bytes past the last complete line seen; an incomplete trailing
//! line is left for the next poll. A file that shrinks below what was already
//! consumed (truncated or rotated) is a data error. The feed ends after
//! `max_idle_polls` consecutive empty polls, or as soon as the cancel token is
//! set and nothing new is buffered.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

use crate::adapters::csv_feed::read_bars;
use crate::domain::bar::Bar;
use crate::domain::error::TraderError;
use crate::domain::runner::CancelToken;
use crate::ports::market_data_port::MarketDataPort;

pub struct PollingCsvFeed {
    path: PathBuf,
    poll_interval: Duration,
    max_idle_polls: usize,
    cancel: CancelToken,
    offset: u64,
    header: Option<Vec<u8>>,
    buffer: VecDeque<Bar>,
}

impl PollingCsvFeed {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration, max_idle_polls: usize) -> Self {
        PollingCsvFeed {
            path: path.into(),
            poll_interval,
            max_idle_polls,
            cancel: CancelToken::new(),
            offset: 0,
            header: None,
            buffer: VecDeque::new(),
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Complete rows appended since the previous poll.
    fn poll(&mut self) -> Result<usize, TraderError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(path = %self.path.display(), "bar file not there yet");
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata()?.len();
        if len < self.offset {
            return Err(TraderError::Data {
                reason: format!(
                    "{} shrank from {} to {} bytes",
                    self.path.display(),
                    self.offset,
                    len
                ),
            });
        }
        if len == self.offset {
            return Ok(0);
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let mut tail = Vec::new();
        file.read_to_end(&mut tail)?;
        let Some(end) = tail.iter().rposition(|&b| b == b'\n') else {
            return Ok(0);
        };
        let chunk = &tail[..=end];
        self.offset += chunk.len() as u64;

        let bars = if self.header.is_none() {
            let header_end = chunk.iter().position(|&b| b == b'\n').unwrap_or(end);
            self.header = Some(chunk[..=header_end].to_vec());
            read_bars(chunk)?
        } else {
            let header = self.header.as_deref().unwrap_or_default();
            read_bars(header.chain(chunk))?
        };
        let fresh = bars.len();
        self.buffer.extend(bars);
        Ok(fresh)
    }
}

impl MarketDataPort for PollingCsvFeed {
    fn next_bar(&mut self) -> Result<Option<Bar>, TraderError> {
        let mut idle = 0;
        loop {
            if let Some(bar) = self.buffer.pop_front() {
                return Ok(Some(bar));
            }
            let fresh = self.poll()?;
            if fresh > 0 {
                debug!(path = %self.path.display(), fresh, "new bars");
                continue;
            }
            if self.cancel.is_cancelled() {
                return Ok(None);
            }
            idle += 1;
            if idle >= self.max_idle_polls {
                debug!(idle, "feed idle, closing");
                return Ok(None);
            }
            thread::sleep(self.poll_interval);
        }
    }
}
