//! Object-store persistence layer.
//!
//! RULE: Stages talk to storage only through the ObjectStore trait.
//! Every artifact is one newline-delimited JSON body written in a single
//! call, so a reader sees either the whole batch or nothing.

use crate::{
    error::{PipelineError, PipelineResult},
    types::ObjectKey,
};
use serde::{de::DeserializeOwned, Serialize};

pub mod fs;
pub mod layout;
pub mod sqlite;

pub use fs::FsObjectStore;
pub use sqlite::SqliteObjectStore;

/// The transport contract the pipeline relies on.
pub trait ObjectStore {
    /// Name of the bucket this store writes into.
    fn bucket(&self) -> &str;

    /// Write `body` under `key`, replacing any existing object.
    fn put(&self, key: &str, body: &[u8]) -> PipelineResult<()>;

    /// Write `body` under `key` only if nothing is there yet.
    /// Returns false, leaving the existing object untouched, otherwise.
    fn put_if_absent(&self, key: &str, body: &[u8]) -> PipelineResult<bool>;

    fn get(&self, key: &str) -> PipelineResult<Option<Vec<u8>>>;

    /// All keys starting with `prefix`, in lexical order.
    fn list(&self, prefix: &str) -> PipelineResult<Vec<ObjectKey>>;

    fn exists(&self, key: &str) -> PipelineResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Serialize records one JSON object per line, no trailing newline.
pub fn encode_json_lines<T: Serialize>(records: &[T]) -> PipelineResult<Vec<u8>> {
    let mut body = Vec::new();
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            body.push(b'\n');
        }
        serde_json::to_writer(&mut body, record)?;
    }
    Ok(body)
}

/// Parse every line of an artifact. An empty body is an empty batch; any
/// other line that fails to parse, blank lines included, fails the whole
/// artifact.
pub fn decode_json_lines<T: DeserializeOwned>(key: &str, body: &[u8]) -> PipelineResult<Vec<T>> {
    let text = std::str::from_utf8(body).map_err(|e| PipelineError::MalformedRecord {
        key: key.to_string(),
        line: 0,
        source: serde::de::Error::custom(format!("body is not UTF-8: {e}")),
    })?;

    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            return Err(PipelineError::MalformedRecord {
                key: key.to_string(),
                line: idx + 1,
                source: serde::de::Error::custom("blank line"),
            });
        }
        let record = serde_json::from_str(line).map_err(|source| PipelineError::MalformedRecord {
            key: key.to_string(),
            line: idx + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Reject keys that could escape a bucket or address nothing.
pub(crate) fn validate_key(key: &str) -> PipelineResult<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.ends_with('/')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(PipelineError::InvalidKey { key: key.to_string() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: u32,
        note: Option<String>,
    }

    #[test]
    fn lines_are_newline_joined_without_trailer() {
        let rows = vec![Row { id: 1, note: None }, Row { id: 2, note: Some("x".into()) }];
        let body = encode_json_lines(&rows).unwrap();
        assert_eq!(
            String::from_utf8(body.clone()).unwrap(),
            "{\"id\":1,\"note\":null}\n{\"id\":2,\"note\":\"x\"}"
        );
        let back: Vec<Row> = decode_json_lines("k", &body).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn empty_batch_is_empty_body() {
        let body = encode_json_lines::<Row>(&[]).unwrap();
        assert!(body.is_empty());
        let back: Vec<Row> = decode_json_lines("k", &body).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn malformed_line_reports_position() {
        let body = b"{\"id\":1,\"note\":null}\nnot json\n{\"id\":3,\"note\":null}";
        let err = decode_json_lines::<Row>("raw/x.json", body).unwrap_err();
        match err {
            PipelineError::MalformedRecord { key, line, .. } => {
                assert_eq!(key, "raw/x.json");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_interior_line_is_malformed() {
        let bodies: [&[u8]; 2] = [
            b"{\"id\":1,\"note\":null}\n\n{\"id\":2,\"note\":null}",
            b"{\"id\":1,\"note\":null}\n   \n",
        ];
        for body in bodies {
            match decode_json_lines::<Row>("raw/x.json", body).unwrap_err() {
                PipelineError::MalformedRecord { line, .. } => assert_eq!(line, 2),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn key_validation() {
        assert!(validate_key("raw/fnol_events/fnol_1.json").is_ok());
        for bad in ["", "/abs", "raw/", "raw//x", "raw/../x", "./x"] {
            assert!(validate_key(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
