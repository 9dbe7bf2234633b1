use std::collections::HashSet;
use std::io::{Read, Write};

use csv::{ReaderBuilder, WriterBuilder};

use crate::error::CleaningError;

/// Cell values read as missing, besides the empty string.
const NA_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A", "#NA", "<NA>",
];

fn is_missing(raw: &str) -> bool {
    raw.is_empty() || NA_TOKENS.contains(&raw)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// `integral` is true while every value is a whole number written without a decimal point.
    Numeric { values: Vec<Option<f64>>, integral: bool },
    Categorical(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric { values, .. } => values.len(),
            ColumnData::Categorical(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn missing_count(&self) -> usize {
        match self {
            ColumnData::Numeric { values, .. } => values.iter().filter(|v| v.is_none()).count(),
            ColumnData::Categorical(values) => values.iter().filter(|v| v.is_none()).count(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnData::Numeric { .. })
    }

    fn retain_rows(&mut self, keep: &[bool]) {
        match self {
            ColumnData::Numeric { values, .. } => retain_by_mask(values, keep),
            ColumnData::Categorical(values) => retain_by_mask(values, keep),
        }
    }

    fn format_cell(&self, row: usize) -> String {
        match self {
            ColumnData::Numeric { values, integral } => match values[row] {
                None => String::new(),
                Some(v) if *integral => format!("{}", v as i64),
                Some(v) => format_float(v),
            },
            ColumnData::Categorical(values) => values[row].clone().unwrap_or_default(),
        }
    }
}

fn retain_by_mask<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut idx = 0;
    values.retain(|_| {
        let kept = keep[idx];
        idx += 1;
        kept
    });
}

/// Floats keep a decimal point so the column reads back as floating point.
fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        let integral = values.iter().all(|v| v.is_some_and(|x| x.fract() == 0.0));
        Self {
            name: name.into(),
            data: ColumnData::Numeric { values, integral },
        }
    }

    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(values),
        }
    }

    /// Fraction of missing cells; an empty column counts as fully present.
    pub fn missing_fraction(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.missing_count() as f64 / self.data.len() as f64
    }

    fn from_raw(name: String, raw: Vec<String>) -> Self {
        let numeric = raw
            .iter()
            .filter(|cell| !is_missing(cell))
            .all(|cell| cell.parse::<f64>().is_ok());

        if !numeric {
            let values = raw
                .into_iter()
                .map(|cell| if is_missing(&cell) { None } else { Some(cell) })
                .collect();
            return Self::categorical(name, values);
        }

        let mut integral = true;
        let values = raw
            .iter()
            .map(|cell| {
                if is_missing(cell) {
                    integral = false;
                    return None;
                }
                if cell.parse::<i64>().is_err() {
                    integral = false;
                }
                cell.parse::<f64>().ok()
            })
            .collect();

        Self {
            name,
            data: ColumnData::Numeric { values, integral },
        }
    }
}

/// Column-oriented table loaded from CSV.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub columns: Vec<Column>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// (rows, columns), the way the cleaning logs report it.
    pub fn shape(&self) -> (usize, usize) {
        (self.row_count(), self.column_count())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Drops every row whose mask entry is false, across all columns.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        for column in &mut self.columns {
            column.data.retain_rows(keep);
        }
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, CleaningError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = dedupe_headers(reader.headers()?.iter());
        let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

        for (i, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() != headers.len() {
                return Err(CleaningError::RaggedRow {
                    row: i + 2,
                    expected: headers.len(),
                    found: record.len(),
                });
            }
            for (cells, field) in raw.iter_mut().zip(record.iter()) {
                cells.push(field.to_string());
            }
        }

        let columns = headers
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| Column::from_raw(name, cells))
            .collect();

        Ok(Self { columns })
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), CleaningError> {
        let mut writer = WriterBuilder::new().from_writer(writer);

        writer.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        for row in 0..self.row_count() {
            writer.write_record(self.columns.iter().map(|c| c.data.format_cell(row)))?;
        }

        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

/// Repeated header names get a `.N` suffix so every column stays addressable by name.
fn dedupe_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let headers: Vec<&str> = headers.collect();
    let mut taken: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(headers.len());

    for header in headers {
        let mut name = header.to_string();
        let mut suffix = 1;
        while taken.contains(&name) {
            name = format!("{}.{}", header, suffix);
            suffix += 1;
        }
        taken.insert(name.clone());
        names.push(name);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "price,bedrooms,sqft,city,condition\n\
                       300000,3,1500.5,Seattle,NA\n\
                       450000,,2100,Kent,\n\
                       525000,4,2500,Seattle,good\n";

    #[test]
    fn infers_column_types_and_missing_cells() {
        let ds = Dataset::from_csv_reader(RAW.as_bytes()).unwrap();
        assert_eq!(ds.shape(), (3, 5));

        let bedrooms = ds.column("bedrooms").unwrap();
        assert_eq!(
            bedrooms.data,
            ColumnData::Numeric { values: vec![Some(3.0), None, Some(4.0)], integral: false }
        );
        assert!(matches!(ds.column("price").unwrap().data, ColumnData::Numeric { integral: true, .. }));
        assert!(!ds.column("city").unwrap().data.is_numeric());
        assert_eq!(ds.column("condition").unwrap().data.missing_count(), 2);
    }

    #[test]
    fn all_missing_column_is_numeric() {
        let ds = Dataset::from_csv_reader("a,b\n1,\n2,NaN\n".as_bytes()).unwrap();
        let b = ds.column("b").unwrap();
        assert!(b.data.is_numeric());
        assert_eq!(b.missing_fraction(), 1.0);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Dataset::from_csv_reader("a,b\n1,2\n3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, CleaningError::RaggedRow { row: 3, expected: 2, found: 1 }));
    }

    #[test]
    fn whitespace_is_kept_in_values() {
        let ds = Dataset::from_csv_reader("city,price\n Seattle,1\nSeattle,2\n".as_bytes()).unwrap();
        assert_eq!(
            ds.column("city").unwrap().data,
            ColumnData::Categorical(vec![Some(" Seattle".to_string()), Some("Seattle".to_string())])
        );
    }

    #[test]
    fn repeated_headers_are_suffixed() {
        let ds = Dataset::from_csv_reader("a,a,b,a\n1,2,3,4\n".as_bytes()).unwrap();
        assert_eq!(ds.column_names(), vec!["a", "a.1", "b", "a.2"]);
        assert_eq!(
            ds.column("a.1").unwrap().data,
            ColumnData::Numeric { values: vec![Some(2.0)], integral: true }
        );
    }

    #[test]
    fn writes_integers_floats_and_blanks() {
        let ds = Dataset::new(vec![
            Column::numeric("price", vec![Some(100.0), Some(250.0)]),
            Column::numeric("baths", vec![Some(2.0), Some(1.5)]),
            Column::categorical("city", vec![Some("Kent".to_string()), None]),
        ]);

        let mut out = Vec::new();
        ds.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "price,baths,city\n100,2.0,Kent\n250,1.5,\n"
        );
    }
}
