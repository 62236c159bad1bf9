//! Flows file loader.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::Result;
use crate::ReachId;

/// Reads a two-column `reach_id,discharge` file into a map.
///
/// Lines with the wrong field count or unparsable fields are skipped, which
/// also drops a header row if one is present.
///
/// # Errors
///
/// Returns an error when the file cannot be opened or read.
pub fn read_flows<P: AsRef<Path>>(path: P) -> Result<HashMap<ReachId, f64>> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);

    let mut flows = HashMap::new();
    for line in reader.lines() {
        let line = line?;
        let mut parts = line.split(',');
        let (Some(id), Some(flow), None) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        let Ok(id) = id.trim().parse::<ReachId>() else {
            continue;
        };
        let Ok(flow) = flow.trim().parse::<f64>() else {
            continue;
        };
        flows.insert(id, flow);
    }

    if flows.is_empty() {
        tracing::debug!(path = %path.as_ref().display(), "no flow rows parsed");
    }
    Ok(flows)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_two_column_lines() {
        let file = write_temp("8489318,1560.5\n8490370,130\n");
        let flows = read_flows(file.path()).unwrap();
        assert_eq!(flows.len(), 2);
        assert_eq!(flows[&8489318], 1560.5);
        assert_eq!(flows[&8490370], 130.0);
    }

    #[test]
    fn header_row_is_dropped_by_parse_failure() {
        let file = write_temp("feature_id,discharge\n10,42.0\n");
        let flows = read_flows(file.path()).unwrap();
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[&10], 42.0);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let file = write_temp("10,1.0\nnot-a-line\n11,two\n12,3.0,extra\n13,4.0\n");
        let flows = read_flows(file.path()).unwrap();
        assert_eq!(flows.len(), 2);
        assert_eq!(flows[&10], 1.0);
        assert_eq!(flows[&13], 4.0);
    }

    #[test]
    fn empty_file_yields_empty_map() {
        let file = write_temp("");
        let flows = read_flows(file.path()).unwrap();
        assert!(flows.is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_flows("/no/such/flows.csv").is_err());
    }
}
