//! Append-only JSONL output.
//!
//! Each record becomes one line of ASCII-only JSON (non-ASCII characters are
//! written as `\uXXXX` escapes, surrogate pairs beyond the BMP) in
//! `{root}/{country}/{outlet_id}.jsonl`, where the country is passed through
//! [`safe_dir_name`]. Files are opened in append mode and never truncated.

use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use super::RecordSink;
use crate::error::SinkError;
use crate::models::ArticleRecord;
use crate::utils::safe_dir_name;

/// JSON formatter that escapes every non-ASCII character.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

/// Serialize `value` as one line of ASCII-only JSON, newline included.
pub fn to_ascii_line<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut line = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut line, AsciiFormatter);
    value.serialize(&mut serializer)?;
    line.push(b'\n');
    Ok(line)
}

/// Append `line` to `path`, creating parent directories and the file as needed.
pub async fn append_line(path: &Path, line: &[u8]) -> Result<(), SinkError> {
    let io_err = |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(io_err)?;
    file.write_all(line).await.map_err(io_err)?;
    file.flush().await.map_err(io_err)?;
    Ok(())
}

/// Per-outlet JSONL files under a root directory.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    root: PathBuf,
}

impl JsonlSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File that records of `outlet_id` in `country` are appended to.
    pub fn path_for(&self, country: &str, outlet_id: &str) -> PathBuf {
        self.root
            .join(safe_dir_name(country))
            .join(format!("{outlet_id}.jsonl"))
    }
}

impl RecordSink for JsonlSink {
    #[instrument(level = "debug", skip_all, fields(url = %record.url))]
    async fn append(&mut self, record: &ArticleRecord) -> Result<(), SinkError> {
        let path = self.path_for(&record.country, &record.outlet_id);
        let line = to_ascii_line(record)?;
        append_line(&path, &line).await?;
        debug!(path = %path.display(), "Appended record");
        Ok(())
    }

    fn destination(&self) -> String {
        self.root.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeedItem, Outlet};

    fn record(url: &str, title: &str) -> ArticleRecord {
        let outlet = Outlet {
            id: "rte".to_string(),
            name: "RTÉ News".to_string(),
            homepage: String::new(),
            feeds: vec![],
            country: "Ireland (Éire)".to_string(),
        };
        let item = FeedItem {
            title: Some(title.to_string()),
            url: Some(url.to_string()),
            ..Default::default()
        };
        ArticleRecord::from_item(&item, &outlet, "https://example.com/rss", Some("Body".to_string()))
    }

    #[test]
    fn test_ascii_line_escapes_non_ascii() {
        let line = to_ascii_line(&serde_json::json!({"t": "Café 😀 \"q\"\n"})).unwrap();
        let text = String::from_utf8(line).unwrap();
        assert_eq!(text, "{\"t\":\"Caf\\u00e9 \\ud83d\\ude00 \\\"q\\\"\\n\"}\n");
        assert!(text.is_ascii());
    }

    #[test]
    fn test_ascii_line_round_trips_through_serde() {
        let original = record("https://example.com/ü", "Überschrift");
        let line = to_ascii_line(&original).unwrap();
        let parsed: ArticleRecord = serde_json::from_slice(&line).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_path_for_uses_safe_country_dir() {
        let sink = JsonlSink::new("/data/raw");
        assert_eq!(
            sink.path_for("Ireland (Éire)", "rte"),
            PathBuf::from("/data/raw/Ireland-Éire/rte.jsonl")
        );
    }

    #[tokio::test]
    async fn test_append_only_never_truncates() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = JsonlSink::new(tmp.path());

        sink.append(&record("https://example.com/1", "One")).await.unwrap();
        let mut second = JsonlSink::new(tmp.path());
        second.append(&record("https://example.com/2", "Two")).await.unwrap();

        let path = sink.path_for("Ireland (Éire)", "rte");
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(content.is_ascii());
        assert!(lines[0].contains("https://example.com/1"));
        assert!(lines[1].contains("https://example.com/2"));
        assert!(lines[1].contains("RT\\u00c9 News"));
    }
}
