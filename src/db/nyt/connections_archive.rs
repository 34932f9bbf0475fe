use std::path::{Path, PathBuf};

use jiff::{civil::Date, Timestamp};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::{
    clock::{format_utc, puzzle_date, time_zone, Clock},
    storage::Storage,
};

use super::lib_nyt::{ConnectionsError, NytConfig, PuzzleSource};

/// Number of tiles on the Connections board
pub const WORD_COUNT: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleRecord {
    pub date: Date,
    pub words: Vec<String>,
    #[serde(rename = "updated_at_utc")]
    pub updated_at: String,
}

/// Archive of the daily NYT Connections boards, one json file per day plus
/// a `connections-latest.json` copy of the most recent one.
pub struct ConnectionsArchive {
    pub base_dir: PathBuf,
}

impl ConnectionsArchive {
    /// Path to the json file for a given day.  Does not check if the file exists.
    pub fn filename(&self, date: &Date) -> PathBuf {
        self.base_dir.join(format!("connections-{}.json", date))
    }

    pub fn latest_filename(&self) -> PathBuf {
        self.base_dir.join("connections-latest.json")
    }

    /// Assemble the record for the day, fails if the payload doesn't have
    /// enough words.
    pub fn build_record(
        &self,
        payload: &Value,
        date: &Date,
        now: Timestamp,
    ) -> Result<PuzzleRecord, ConnectionsError> {
        Ok(PuzzleRecord {
            date: *date,
            words: extract_words(payload)?,
            updated_at: format_utc(now),
        })
    }

    /// Write the record to the dated file first, then to the latest file.
    /// Stops at the first failure.
    pub fn write_record(
        &self,
        record: &PuzzleRecord,
        storage: &dyn Storage,
    ) -> Result<(PathBuf, PathBuf), ConnectionsError> {
        let mut contents = serde_json::to_string_pretty(record)?;
        contents.push('\n');

        storage
            .create_dir_all(&self.base_dir)
            .map_err(|source| ConnectionsError::Io {
                path: self.base_dir.clone(),
                source,
            })?;

        let dated = self.filename(&record.date);
        let latest = self.latest_filename();
        for path in [&dated, &latest] {
            write(storage, path, contents.as_bytes())?;
            info!("Wrote {}", path.display());
        }
        Ok((dated, latest))
    }

    /// Read a record back from the archive.
    pub fn read_file(
        &self,
        path: &Path,
        storage: &dyn Storage,
    ) -> Result<PuzzleRecord, ConnectionsError> {
        let bytes = storage.read(path).map_err(|source| ConnectionsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Get today's board and save it.  Nothing is written unless the payload
    /// validates.  Returns the paths of the dated and the latest file.
    pub fn update(
        &self,
        config: &NytConfig,
        clock: &dyn Clock,
        source: &dyn PuzzleSource,
        storage: &dyn Storage,
    ) -> Result<(PathBuf, PathBuf), ConnectionsError> {
        let tz = time_zone(&config.time_zone)?;
        let now = clock.now();
        let date = puzzle_date(now, &tz);
        let payload = source.fetch(&date)?;
        let record = self.build_record(&payload, &date, now)?;
        info!("Extracted {} words for {}", record.words.len(), date);
        self.write_record(&record, storage)
    }
}

fn write(storage: &dyn Storage, path: &Path, contents: &[u8]) -> Result<(), ConnectionsError> {
    storage
        .write(path, contents)
        .map_err(|source| ConnectionsError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Pull the board words out of the payload.  The `words` array comes first,
/// followed by the `members` of each entry in `cards`, in order.  Blank
/// entries are dropped and only the first [WORD_COUNT] are kept.
pub fn extract_words(payload: &Value) -> Result<Vec<String>, ConnectionsError> {
    let mut words: Vec<String> = Vec::new();

    if let Some(Value::Array(xs)) = payload.get("words") {
        words.extend(xs.iter().map(normalize));
    }

    if let Some(Value::Array(cards)) = payload.get("cards") {
        for card in cards {
            // non-object cards have no members
            if let Some(Value::Array(members)) = card.get("members") {
                words.extend(members.iter().map(normalize));
            }
        }
    }

    words.retain(|w| !w.is_empty());
    if words.len() < WORD_COUNT {
        return Err(ConnectionsError::InsufficientWords {
            expected: WORD_COUNT,
            found: words.len(),
        });
    }
    words.truncate(WORD_COUNT);
    Ok(words)
}

/// Trimmed and upper-cased text of a board entry.
fn normalize(v: &Value) -> String {
    py_str(v)
        .trim_matches(is_py_whitespace)
        .to_uppercase()
}

/// Besides unicode whitespace, the file/group/record/unit separators
/// U+001C..U+001F count as blank.
fn is_py_whitespace(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// Text of a json value the way the upstream scripts print it: strings as is,
/// `None`/`True`/`False` for the literals, lists and dicts in python notation.
fn py_str(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        _ => py_repr(v),
    }
}

fn py_repr(v: &Value) -> String {
    match v {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => py_quote(s),
        Value::Array(xs) => format!(
            "[{}]",
            xs.iter().map(py_repr).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, x)| format!("{}: {}", py_quote(k), py_repr(x)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Single quotes, unless the string has a single quote and no double quote.
fn py_quote(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32))
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
