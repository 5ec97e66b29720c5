//! Job list loading from the configuration sheet

use crate::store::TabularStore;
use pagetrack_core::{JobDescriptor, PagetrackError, Result};
use tracing::{info, warn};

/// Range holding the jobs: URL, folder id, log sheet name (row 1 is the header)
pub const JOB_CELLS: &str = "A2:C";

// First data row of JOB_CELLS
const FIRST_JOB_ROW: usize = 2;

/// Turn raw rows into job descriptors, skipping incomplete rows
pub fn parse_job_rows(rows: &[Vec<String>]) -> Vec<JobDescriptor> {
    rows.iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let row_number = i + FIRST_JOB_ROW;
            if row.len() < 3 {
                warn!("Skipping row {}: expected 3 columns, found {}", row_number, row.len());
                return None;
            }
            let job = JobDescriptor::new(&row[0], &row[1], &row[2]);
            if !job.is_valid() {
                warn!("Skipping row {}: empty URL, folder id or sheet name", row_number);
                return None;
            }
            Some(job)
        })
        .collect()
}

/// Read the job list from `config_sheet`
pub async fn fetch_jobs(store: &dyn TabularStore, spreadsheet_id: &str, config_sheet: &str) -> Result<Vec<JobDescriptor>> {
    info!("Reading jobs from sheet '{}'", config_sheet);
    let rows = store
        .read_rows(spreadsheet_id, config_sheet, JOB_CELLS)
        .await
        .map_err(|e| {
            let hint = match e.status() {
                Some(404) => " (spreadsheet not found; check source.spreadsheet_id)",
                Some(403) => " (permission denied; share the spreadsheet with the account)",
                Some(400) => " (check that the configuration sheet exists)",
                _ => "",
            };
            PagetrackError::JobSource(format!("Cannot read '{}'!{}: {}{}", config_sheet, JOB_CELLS, e, hint))
        })?;

    let jobs = parse_job_rows(&rows);
    info!("Found {} valid jobs in {} rows", jobs.len(), rows.len());
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockTabularStore;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_skips_incomplete_rows() {
        let rows = vec![
            row(&["https://a.example", "F1", "Sheet1"]),
            row(&["https://b.example", "F2"]),
            row(&["", "F3", "Sheet3"]),
            row(&[" https://d.example ", " F4 ", " Log "]),
        ];

        let jobs = parse_job_rows(&rows);

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].url, "https://a.example");
        assert_eq!(jobs[1].target_container_id, "F4");
        assert_eq!(jobs[1].target_log_name, "Log");
    }

    #[tokio::test]
    async fn test_fetch_jobs_skips_header_row() {
        let store = MockTabularStore::new().with_sheet(
            "CONFIG",
            vec![
                vec!["URL", "Folder", "Sheet"],
                vec!["https://a.example", "F1", "Sheet1"],
            ],
        );

        let jobs = fetch_jobs(&store, "S", "CONFIG").await.unwrap();

        assert_eq!(jobs, vec![JobDescriptor::new("https://a.example", "F1", "Sheet1")]);
    }

    #[tokio::test]
    async fn test_missing_config_sheet_is_job_source_error() {
        let store = MockTabularStore::new();

        let err = fetch_jobs(&store, "S", "CONFIG").await.unwrap_err();

        assert!(matches!(err, PagetrackError::JobSource(_)));
        assert!(err.to_string().contains("configuration sheet"));
    }
}
