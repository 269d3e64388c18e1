//! Historical bars from a CSV file.
//!
//! Expected header: `timestamp,open,high,low,close,volume`. Timestamps are
//! naive (exchange-local) and accepted as `YYYY-MM-DD HH:MM:SS` or
//! `YYYY-MM-DDTHH:MM:SS`. Rows are served in file order; ordering and gaps
//! are the runner's concern.

use std::fs;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::domain::bar::Bar;
use crate::domain::error::TraderError;
use crate::ports::market_data_port::MarketDataPort;

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Debug, Deserialize)]
struct BarRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, TraderError> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| TraderError::Data {
            reason: format!("invalid timestamp '{}'", raw),
        })
}

impl BarRow {
    fn into_bar(self, line: usize) -> Result<Bar, TraderError> {
        let bar = Bar {
            timestamp: parse_timestamp(&self.timestamp)?,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        };
        let prices = [bar.open, bar.high, bar.low, bar.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0)
            || !bar.volume.is_finite()
            || bar.volume < 0.0
        {
            return Err(TraderError::Data {
                reason: format!("row {}: prices must be positive and volume non-negative", line),
            });
        }
        if bar.high < bar.low {
            return Err(TraderError::Data {
                reason: format!("row {}: high {} below low {}", line, bar.high, bar.low),
            });
        }
        Ok(bar)
    }
}

/// Parse every row of a bar CSV.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, TraderError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    rdr.deserialize::<BarRow>()
        .enumerate()
        .map(|(i, row)| {
            let row = row.map_err(|e| TraderError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            row.into_bar(i + 1)
        })
        .collect()
}

pub struct CsvBarFeed {
    bars: Vec<Bar>,
    cursor: usize,
}

impl CsvBarFeed {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TraderError> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|e| TraderError::Data {
            reason: format!("failed to open {}: {}", path.display(), e),
        })?;
        Ok(Self::from_bars(read_bars(file)?))
    }

    pub fn from_bars(bars: Vec<Bar>) -> Self {
        CsvBarFeed { bars, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }
}

impl MarketDataPort for CsvBarFeed {
    fn next_bar(&mut self) -> Result<Option<Bar>, TraderError> {
        let bar = self.bars.get(self.cursor).copied();
        if bar.is_some() {
            self.cursor += 1;
        }
        Ok(bar)
    }

    fn rewind(&mut self) -> Result<(), TraderError> {
        self.cursor = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
timestamp,open,high,low,close,volume
2024-01-01 00:00:00,100.0,101.0,99.0,100.5,12.5
2024-01-01T00:15:00,100.5,102.0,100.0,101.0,8
2024-01-01 00:30,101.0,101.5,100.2,100.8,9.25
";

    #[test]
    fn reads_all_timestamp_spellings() {
        let bars = read_bars(SAMPLE.as_bytes()).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[1].timestamp, parse_timestamp("2024-01-01 00:15:00").unwrap());
        assert_eq!(bars[2].timestamp, parse_timestamp("2024-01-01 00:30:00").unwrap());
        assert_eq!(bars[0].volume, 12.5);
    }

    #[test]
    fn feed_is_finite_and_rewindable() {
        let mut feed = CsvBarFeed::from_bars(read_bars(SAMPLE.as_bytes()).unwrap());
        let mut seen = 0;
        while feed.next_bar().unwrap().is_some() {
            seen += 1;
        }
        assert_eq!(seen, 3);
        assert!(feed.next_bar().unwrap().is_none());

        feed.rewind().unwrap();
        assert_eq!(feed.next_bar().unwrap(), Some(feed.bars()[0]));
    }

    #[test]
    fn from_path_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", SAMPLE).unwrap();
        let feed = CsvBarFeed::from_path(file.path()).unwrap();
        assert_eq!(feed.len(), 3);
    }

    #[test]
    fn missing_file_is_data_error() {
        let err = CsvBarFeed::from_path("/nonexistent/bars.csv").err().unwrap();
        assert!(matches!(err, TraderError::Data { .. }));
    }

    #[test]
    fn rejects_bad_rows() {
        let bad_ts = "timestamp,open,high,low,close,volume\nyesterday,1,1,1,1,1\n";
        assert!(read_bars(bad_ts.as_bytes()).is_err());

        let bad_num = "timestamp,open,high,low,close,volume\n2024-01-01 00:00:00,abc,1,1,1,1\n";
        assert!(read_bars(bad_num.as_bytes()).is_err());

        let inverted = "timestamp,open,high,low,close,volume\n2024-01-01 00:00:00,10,9,11,10,1\n";
        let err = read_bars(inverted.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("below low"));
    }
}
