//! Helpers for reading lookup keys and parsing durations.

use crate::error::FanOutError;
use crate::types::LookupKey;
use std::path::Path;
use std::time::Duration;

/// Turn raw inputs into lookup keys, preserving order and duplicates.
///
/// Any empty entry rejects the whole list, since silently dropping a key
/// would change the shape of the aggregate.
pub fn parse_keys<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<LookupKey>, FanOutError> {
    inputs.iter().map(LookupKey::new).collect()
}

/// Parse a key list with one key per line.
///
/// Blank lines and lines starting with `#` are skipped, and anything after
/// an inline `#` is treated as a comment.
pub fn parse_key_lines(content: &str) -> Result<Vec<LookupKey>, FanOutError> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(LookupKey::new)
        .collect()
}

/// Read a key list file (see [`parse_key_lines`]).
pub async fn read_keys_file<P: AsRef<Path>>(path: P) -> Result<Vec<LookupKey>, FanOutError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        FanOutError::file(
            path.to_string_lossy(),
            format!("Failed to read key file: {}", e),
        )
    })?;

    let keys = parse_key_lines(&content)?;
    if keys.is_empty() {
        return Err(FanOutError::file(
            path.to_string_lossy(),
            "No lookup keys found in file",
        ));
    }
    Ok(keys)
}

/// Parse a duration string like "250ms", "5s" or "2m".
///
/// A bare number is read as seconds.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();

    if let Some(ms) = input.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = input.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = input.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        input.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_duration(" 1000MS "), Some(Duration::from_millis(1000)));
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("999999999999999999m"), None);
        assert_eq!(parse_duration("99999999999999999999s"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_parse_keys_keeps_order_and_duplicates() {
        let keys = parse_keys(&["b", "a", "b"]).unwrap();
        let names: Vec<&str> = keys.iter().map(LookupKey::as_str).collect();
        assert_eq!(names, vec!["b", "a", "b"]);

        assert!(parse_keys(&["ok", " "]).is_err());
    }

    #[test]
    fn test_parse_key_lines_skips_comments() {
        let content = "# orgs to check\nPivotalSoftware\n\nCloudFoundry  # inline\n   \nSpring-Projects\n";
        let keys = parse_key_lines(content).unwrap();
        let names: Vec<&str> = keys.iter().map(LookupKey::as_str).collect();
        assert_eq!(names, vec!["PivotalSoftware", "CloudFoundry", "Spring-Projects"]);
    }

    #[tokio::test]
    async fn test_read_keys_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "octocat\nrust-lang").unwrap();
        file.flush().unwrap();

        let keys = read_keys_file(file.path()).await.unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn test_read_keys_file_rejects_empty_and_missing() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# nothing here").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            read_keys_file(file.path()).await,
            Err(FanOutError::File { .. })
        ));
        assert!(read_keys_file("/definitely/not/here.txt").await.is_err());
    }
}
