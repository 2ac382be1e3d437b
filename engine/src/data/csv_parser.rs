use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use shared::models::Candle;

use crate::error::{EngineError, Result};

// Number and timestamp formats accepted in candle files
pub mod candle_format {
    use anyhow::{anyhow, Context, Result};
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

    /// Parses a decimal. With `decimal_comma`, "1.234,56" reads as 1234.56.
    pub fn parse_decimal(s: &str, decimal_comma: bool) -> Result<f64> {
        let trimmed = s.trim();
        let normalized = if decimal_comma {
            trimmed.replace('.', "").replace(',', ".")
        } else {
            trimmed.to_string()
        };
        normalized
            .parse::<f64>()
            .with_context(|| format!("Failed to parse decimal '{}'", s))
    }

    /// Shortest digit run read as epoch milliseconds (1970-04-26 onwards).
    const MIN_EPOCH_MILLIS_DIGITS: usize = 10;

    /// RFC 3339, epoch milliseconds, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD` or
    /// compact `YYYYMMDD`. Naive forms are read as UTC.
    pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        let s = s.trim();
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            return parse_numeric_timestamp(s);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Failed to parse timestamp '{}'", s))?;
        date.and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .ok_or_else(|| anyhow!("Invalid midnight for date '{}'", s))
    }

    fn parse_numeric_timestamp(s: &str) -> Result<DateTime<Utc>> {
        if s.len() == 8 {
            let date = NaiveDate::parse_from_str(s, "%Y%m%d").with_context(|| format!("Failed to parse date '{}'", s))?;
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| naive.and_utc())
                .ok_or_else(|| anyhow!("Invalid midnight for date '{}'", s));
        }
        if s.len() < MIN_EPOCH_MILLIS_DIGITS {
            return Err(anyhow!("Ambiguous numeric timestamp '{}'", s));
        }
        let millis: i64 = s.parse().with_context(|| format!("Failed to parse epoch millis '{}'", s))?;
        DateTime::from_timestamp_millis(millis).ok_or_else(|| anyhow!("Epoch millis out of range: {}", s))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::{TimeZone, Timelike};

        #[test]
        fn test_parse_decimal_plain() {
            assert_eq!(parse_decimal(" 123.45 ", false).unwrap(), 123.45);
            assert!(parse_decimal("123,45", false).is_err());
        }

        #[test]
        fn test_parse_decimal_comma() {
            assert_eq!(parse_decimal("123,45", true).unwrap(), 123.45);
            assert_eq!(parse_decimal("600.822.115,84", true).unwrap(), 600822115.84);
        }

        #[test]
        fn test_parse_timestamp_formats() {
            let expected = Utc.with_ymd_and_hms(2024, 12, 30, 18, 20, 0).unwrap();
            assert_eq!(parse_timestamp("2024-12-30T18:20:00Z").unwrap(), expected);
            assert_eq!(parse_timestamp("2024-12-30T15:20:00-03:00").unwrap(), expected);
            assert_eq!(parse_timestamp("2024-12-30 18:20:00").unwrap(), expected);
            assert_eq!(parse_timestamp(&expected.timestamp_millis().to_string()).unwrap(), expected);
            assert_eq!(parse_timestamp("2024-12-30").unwrap().hour(), 0);
        }

        #[test]
        fn test_parse_timestamp_invalid() {
            assert!(parse_timestamp("30/12/2024").is_err());
            assert!(parse_timestamp("").is_err());
            assert!(parse_timestamp("2024-13-01").is_err());
        }

        #[test]
        fn test_parse_timestamp_compact_date_is_not_epoch() {
            let expected = Utc.with_ymd_and_hms(2024, 12, 30, 0, 0, 0).unwrap();
            assert_eq!(parse_timestamp("20241230").unwrap(), expected);
            assert!(parse_timestamp("20241341").is_err());
            assert!(parse_timestamp("1735").is_err());
            assert!(parse_timestamp("173560").is_err());
            assert_eq!(parse_timestamp("1735581600000").unwrap(), Utc.with_ymd_and_hms(2024, 12, 30, 18, 0, 0).unwrap());
        }
    }
}

/// Reads OHLCV candles from delimited text with a
/// `timestamp,open,high,low,close,volume` header. Columns are matched by
/// name, case-insensitively, so extra or reordered columns are fine.
#[derive(Debug, Clone, Copy)]
pub struct CsvCandleLoader {
    delimiter: u8,
    decimal_comma: bool,
}

impl Default for CsvCandleLoader {
    fn default() -> Self {
        Self { delimiter: b',', decimal_comma: false }
    }
}

impl CsvCandleLoader {
    pub fn new(delimiter: u8, decimal_comma: bool) -> Self {
        Self { delimiter, decimal_comma }
    }

    pub fn load_candles_from_csv(&self, file_path: impl AsRef<Path>) -> Result<Vec<Candle>> {
        let path = file_path.as_ref();
        let file = File::open(path)?;
        tracing::debug!(path = %path.display(), "Reading candle file");
        self.read_candles(BufReader::new(file))
    }

    pub fn read_candles<R: Read>(&self, reader: R) -> Result<Vec<Candle>> {
        let mut rdr = ReaderBuilder::new().delimiter(self.delimiter).has_headers(true).trim(csv::Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();

        let mut candles = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            let line = idx + 2;
            let record = result?;
            candles.push(self.parse_record(&record, &headers, line)?);
        }
        Ok(candles)
    }

    fn parse_record(&self, record: &StringRecord, headers: &StringRecord, line: usize) -> Result<Candle> {
        let timestamp_str = Self::required_field(record, headers, "timestamp", line)?;
        let timestamp = candle_format::parse_timestamp(timestamp_str)
            .map_err(|e| EngineError::CsvDataFormatError(format!("Error parsing 'timestamp' at line {}: {:#}", line, e)))?;

        let number = |name: &str| -> Result<f64> {
            let raw = Self::required_field(record, headers, name, line)?;
            candle_format::parse_decimal(raw, self.decimal_comma)
                .map_err(|e| EngineError::CsvDataFormatError(format!("Error parsing '{}' at line {}: {:#}", name, line, e)))
        };

        let candle = Candle::new(timestamp, number("open")?, number("high")?, number("low")?, number("close")?, number("volume")?);
        if let Some(defect) = candle.defect() {
            return Err(EngineError::CsvDataFormatError(format!("Malformed candle at line {}: {}", line, defect)));
        }
        Ok(candle)
    }

    fn required_field<'a>(record: &'a StringRecord, headers: &StringRecord, name: &str, line: usize) -> Result<&'a str> {
        Self::get_field(record, headers, name)
            .ok_or_else(|| EngineError::CsvDataFormatError(format!("Missing '{}' field in CSV record at line {}", name, line)))
    }

    fn get_field<'a>(record: &'a StringRecord, headers: &StringRecord, name: &str) -> Option<&'a str> {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
            .and_then(|pos| record.get(pos))
    }
}
