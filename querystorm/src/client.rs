use std::fs;
use std::path::PathBuf;

use log::debug;

use crate::Result;

/// Channel to the target server.
///
/// Submitting a statement is the only blocking operation in the harness.
/// `Ok(false)` means the server rejected the statement, which is an expected
/// outcome, not an error; `Err` is reserved for transport failures. When a
/// statement carries `INTO OUTFILE`, a successful return implies the server
/// has materialized the output file.
pub trait SqlClient {
    fn execute(&mut self, sql: &str) -> Result<bool>;
}

/// Offline stand-in for a server, used by tests and dry runs.
///
/// Accepts every statement (unless told otherwise), records the stream, and
/// writes a fixed payload to any `INTO OUTFILE` target so oracle digests are
/// reproducible.
pub struct MockClient {
    pub executed: Vec<String>,
    /// Substrings that cause a statement to be rejected.
    pub reject_containing: Vec<String>,
    payload: Vec<u8>,
}

impl MockClient {
    pub fn new() -> MockClient {
        MockClient {
            executed: Vec::new(),
            reject_containing: Vec::new(),
            payload: b"1\n".to_vec(),
        }
    }

    pub fn with_payload(payload: impl Into<Vec<u8>>) -> MockClient {
        MockClient {
            executed: Vec::new(),
            reject_containing: Vec::new(),
            payload: payload.into(),
        }
    }

    fn outfile_target(sql: &str) -> Option<PathBuf> {
        let start = sql.find("INTO OUTFILE '")? + "INTO OUTFILE '".len();
        let end = sql[start..].find('\'')?;
        Some(PathBuf::from(&sql[start..start + end]))
    }
}

impl Default for MockClient {
    fn default() -> Self {
        MockClient::new()
    }
}

impl SqlClient for MockClient {
    fn execute(&mut self, sql: &str) -> Result<bool> {
        self.executed.push(sql.to_string());
        if self.reject_containing.iter().any(|s| sql.contains(s)) {
            debug!("mock rejecting: {sql}");
            return Ok(false);
        }
        if let Some(path) = Self::outfile_target(sql) {
            fs::write(path, &self.payload)?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_writes_outfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("query.data");
        let mut client = MockClient::new();
        let ok = client
            .execute(&format!(
                "SELECT 1 INTO OUTFILE '{}' TRUNCATE FORMAT CSV",
                path.display()
            ))
            .unwrap();
        assert!(ok);
        assert_eq!(std::fs::read(&path).unwrap(), b"1\n");
    }

    #[test]
    fn test_mock_rejection() {
        let mut client = MockClient::new();
        client.reject_containing.push("DROP".to_string());
        assert!(!client.execute("DROP TABLE d0.t0").unwrap());
        assert!(client.execute("SELECT 1").unwrap());
        assert_eq!(client.executed.len(), 2);
    }
}
