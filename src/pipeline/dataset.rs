use crate::pipeline::validate::{Schema, ValidatedRecord};
use crate::types::Record;

/// Rows ready for serialization, either schema-typed or as scraped.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Validated {
        columns: Vec<&'static str>,
        records: Vec<ValidatedRecord>,
    },
    Raw {
        header: Vec<String>,
        records: Vec<Record>,
    },
}

impl Dataset {
    pub fn validated(schema: &Schema, records: Vec<ValidatedRecord>) -> Self {
        Dataset::Validated {
            columns: schema.field_names(),
            records,
        }
    }

    /// Rows as scraped, under the table's own header.
    pub fn raw(header: Vec<String>, records: Vec<Record>) -> Self {
        Dataset::Raw { header, records }
    }

    pub fn len(&self) -> usize {
        match self {
            Dataset::Validated { records, .. } => records.len(),
            Dataset::Raw { records, .. } => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn invalid_count(&self) -> usize {
        match self {
            Dataset::Validated { records, .. } => records.iter().filter(|r| !r.is_valid()).count(),
            Dataset::Raw { .. } => 0,
        }
    }

    /// Schema order for typed rows, page order for raw rows.
    pub fn header(&self) -> Vec<String> {
        match self {
            Dataset::Validated { columns, .. } => columns.iter().map(|c| c.to_string()).collect(),
            Dataset::Raw { header, .. } => header.clone(),
        }
    }

    /// Header row first, even with no records. Unset values become empty cells.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let header = self.header();
        if header.is_empty() {
            return Ok(Vec::new());
        }

        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(&header)?;
        match self {
            Dataset::Validated { columns, records } => {
                for record in records {
                    wtr.write_record(columns.iter().map(|c| {
                        record.get(c).map(|v| v.to_string()).unwrap_or_default()
                    }))?;
                }
            }
            // by position: page headers may repeat
            Dataset::Raw { records, .. } => {
                for record in records {
                    wtr.write_record(record.iter().map(|(_, v)| v))?;
                }
            }
        }
        wtr.into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}

/// Reads CSV produced by [`Dataset::to_csv`] back into records.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<Record>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(Record::from_pairs(headers.iter().zip(row.iter())));
    }
    Ok(records)
}
