//! `year,count1,count2` CSV through polars.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use super::{CitationError, CitationRecord};

const YEAR: &str = "year";
const COUNT1: &str = "count1";
const COUNT2: &str = "count2";

pub fn read_cache(path: &Path) -> Result<Vec<CitationRecord>, CitationError> {
    if !path.is_file() {
        return Err(CitationError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .finish()?
        .collect()?;

    let years = int_column(&df, YEAR)?;
    let c1 = int_column(&df, COUNT1)?;
    let c2 = int_column(&df, COUNT2)?;
    let mut out = Vec::with_capacity(df.height());
    for ((year, count1), count2) in years.into_iter().zip(c1).zip(c2) {
        let year = year.ok_or_else(|| {
            PolarsError::ComputeError("null year in citation cache".into())
        })?;
        out.push(CitationRecord {
            year,
            count1,
            count2,
        });
    }
    Ok(out)
}

fn int_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
    let series = df.column(name)?.cast(&DataType::Int64)?;
    Ok(series.i64()?.into_iter().collect())
}

/// Overwrite `path`, creating parent directories.
pub fn write_cache(path: &Path, records: &[CitationRecord]) -> Result<(), CitationError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let years: Vec<i64> = records.iter().map(|r| r.year).collect();
    let c1: Vec<Option<i64>> = records.iter().map(|r| r.count1).collect();
    let c2: Vec<Option<i64>> = records.iter().map(|r| r.count2).collect();
    let mut df = df!(YEAR => years, COUNT1 => c1, COUNT2 => c2)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_fields_read_back_as_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.csv");
        std::fs::write(&path, "year,count1,count2\n1985,120,\n2004,,7\n").unwrap();
        let rows = read_cache(&path).unwrap();
        assert_eq!(
            rows,
            vec![
                CitationRecord { year: 1985, count1: Some(120), count2: None },
                CitationRecord { year: 2004, count1: None, count2: Some(7) },
            ]
        );
    }

    #[test]
    fn write_then_read_preserves_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("c.csv");
        let rows = vec![
            CitationRecord { year: 1992, count1: Some(3), count2: Some(4) },
            CitationRecord { year: 1995, count1: None, count2: Some(0) },
        ];
        write_cache(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("year,count1,count2\n"));
        assert_eq!(read_cache(&path).unwrap(), rows);
    }

    #[test]
    fn missing_file_and_wrong_header_fail() {
        let dir = tempdir().unwrap();
        assert!(read_cache(&dir.path().join("absent.csv")).is_err());
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        assert!(read_cache(&path).is_err());
    }
}
