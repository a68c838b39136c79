//! CSV reading and writing.

use super::{is_missing_token, Column, Dataset, DatasetError};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::path::Path;

impl Dataset {
    /// Read a CSV file with a header row, inferring column kinds.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|source| DatasetError::Csv {
                origin: origin.clone(),
                source,
            })?;
        Self::from_csv_reader(reader, &origin)
    }

    /// Parse CSV text held in memory.
    pub fn from_csv_str(text: &str) -> Result<Self, DatasetError> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(text.as_bytes());
        Self::from_csv_reader(reader, "<memory>")
    }

    fn from_csv_reader<R: std::io::Read>(
        mut reader: csv::Reader<R>,
        origin: &str,
    ) -> Result<Self, DatasetError> {
        let csv_err = |source| DatasetError::Csv {
            origin: origin.to_string(),
            source,
        };

        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(str::to_string)
            .collect();

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            for (col, field) in record.iter().enumerate() {
                let cell = if is_missing_token(field) {
                    None
                } else {
                    Some(field.to_string())
                };
                cells[col].push(cell);
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| Column::infer(name, raw))
            .collect();
        Dataset::new(columns)
    }

    /// Write the table as CSV with a header row, creating parent directories.
    ///
    /// Missing cells are written as empty fields.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), DatasetError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| DatasetError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let csv_err = |source| DatasetError::Csv {
            origin: path.display().to_string(),
            source,
        };

        let mut writer = WriterBuilder::new().from_path(path).map_err(csv_err)?;
        writer.write_record(self.column_names()).map_err(csv_err)?;
        for row in 0..self.n_rows() {
            let record: Vec<String> = self
                .columns()
                .iter()
                .map(|c| c.render(row).unwrap_or_default())
                .collect();
            writer.write_record(&record).map_err(csv_err)?;
        }
        writer.flush().map_err(|source| DatasetError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
