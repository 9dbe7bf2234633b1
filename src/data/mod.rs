pub mod cleaner;
pub mod dataset;
pub mod stats;

pub use cleaner::{clean, CleaningPolicy, CleaningReport};
pub use dataset::{Column, ColumnData, Dataset};

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{error, info};

use crate::error::CleaningError;

pub fn load_csv(path: &Path) -> Result<Dataset, CleaningError> {
    let file = File::open(path).map_err(|source| CleaningError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let dataset = Dataset::from_csv_reader(BufReader::new(file))?;
    if dataset.column_count() == 0 {
        return Err(CleaningError::EmptyInput(path.to_path_buf()));
    }
    Ok(dataset)
}

/// Writes through a temporary file in the destination directory, then renames it into place.
pub fn save_csv(dataset: &Dataset, path: &Path) -> Result<(), CleaningError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |source| CleaningError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        dataset.write_csv(&mut writer)?;
    }

    tmp.persist(path).map_err(|e| CleaningError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Loads `input`, cleans it and writes the result to `output`.
///
/// Any failure aborts the run before `output` is touched.
pub fn preprocess(input: &Path, output: &Path, policy: &CleaningPolicy) -> Result<CleaningReport, CleaningError> {
    let run = || -> Result<CleaningReport, CleaningError> {
        info!("Loading data from {}...", input.display());
        let dataset = load_csv(input)?;
        info!("Data loaded: {:?}", dataset.shape());

        let (cleaned, report) = clean(&dataset, policy);

        save_csv(&cleaned, output)?;
        info!("Cleaned data saved: {}", output.display());
        info!("Final shape: {:?}", cleaned.shape());
        Ok(report)
    };

    run().map_err(|e| {
        error!("Preprocessing failed: {}", e);
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn preprocess_writes_cleaned_csv() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("data.csv");
        let output = dir.path().join("clean_data.csv");
        fs::write(
            &input,
            "price,sqft,alley,city\n\
             100,1,,kent\n\
             200,2,,\n\
             300,3,paved,kent\n\
             400,4,,renton\n\
             500,100,,renton\n",
        )
        .unwrap();

        let report = preprocess(&input, &output, &CleaningPolicy::default()).unwrap();
        assert_eq!(report.dropped_columns, vec!["alley".to_string()]);
        assert_eq!(report.output_shape, (4, 3));

        // kent appears first in sort order among the tied modes
        let written = fs::read_to_string(&output).unwrap();
        assert_eq!(written, "price,sqft,city\n100,1,0\n200,2,0\n300,3,0\n400,4,1\n");
    }

    #[test]
    fn failed_run_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.csv");
        let output = dir.path().join("clean_data.csv");
        fs::write(&input, "price,sqft\n1,2\n3\n").unwrap();

        assert!(preprocess(&input, &output, &CleaningPolicy::default()).is_err());
        assert!(!output.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = preprocess(
            &dir.path().join("nope.csv"),
            &dir.path().join("out.csv"),
            &CleaningPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CleaningError::Io { .. }));
    }
}
