use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::debug;

use crate::error::ExtractionError;
use crate::types::Record;

/// Header row plus data rows, all the same width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub header_source: HeaderSource,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One record per data row, keys in header order.
    pub fn into_records(self) -> Vec<Record> {
        let header = self.header;
        self.rows
            .into_iter()
            .map(|row| Record::from_pairs(header.iter().cloned().zip(row)))
            .collect()
    }
}

/// Where the header row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeaderSource {
    HeaderCells,
    HeaderSection,
    FirstRow,
}

/// An unextracted `<table>` element within a parsed document.
#[derive(Debug, Clone, Copy)]
pub struct TableHandle<'a> {
    pub index: usize,
    element: ElementRef<'a>,
}

struct Cell {
    text: String,
    is_header: bool,
}

struct TableRow {
    /// Position among all of the table's rows, skipped ones included.
    index: usize,
    in_thead: bool,
    cells: Vec<Cell>,
}

type HeaderStrategy = fn(&[TableRow]) -> Option<usize>;

// Tried in order; the first one that finds a row wins.
const HEADER_STRATEGIES: &[(HeaderSource, HeaderStrategy)] = &[
    (HeaderSource::HeaderCells, header_cell_row),
    (HeaderSource::HeaderSection, header_section_row),
    (HeaderSource::FirstRow, first_row),
];

fn header_cell_row(rows: &[TableRow]) -> Option<usize> {
    rows.iter()
        .position(|r| !r.cells.is_empty() && r.cells.iter().all(|c| c.is_header))
}

fn header_section_row(rows: &[TableRow]) -> Option<usize> {
    rows.iter().position(|r| r.in_thead)
}

fn first_row(rows: &[TableRow]) -> Option<usize> {
    if rows.is_empty() {
        None
    } else {
        Some(0)
    }
}

/// Every `<table>` in document order, nested ones included.
pub fn find_tables(document: &Html) -> Vec<TableHandle<'_>> {
    let selector = Selector::parse("table").expect("table selector should parse");
    document
        .select(&selector)
        .enumerate()
        .map(|(index, element)| TableHandle { index, element })
        .collect()
}

pub fn extract(handle: &TableHandle<'_>) -> Result<RawTable, ExtractionError> {
    let rows: Vec<TableRow> = collect_rows(handle.element)
        .into_iter()
        .filter(|r| r.cells.iter().any(|c| !c.text.is_empty()))
        .collect();

    let (header_source, header_pos) = HEADER_STRATEGIES
        .iter()
        .find_map(|(source, strategy)| strategy(&rows).map(|pos| (*source, pos)))
        .ok_or(ExtractionError::EmptyTable)?;

    let header: Vec<String> = rows[header_pos]
        .cells
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if c.text.is_empty() {
                format!("Column_{}", i + 1)
            } else {
                c.text.clone()
            }
        })
        .collect();

    let mut data = Vec::with_capacity(rows.len().saturating_sub(1));
    for (pos, row) in rows.into_iter().enumerate() {
        if pos == header_pos {
            continue;
        }
        if row.cells.len() != header.len() {
            return Err(ExtractionError::RowShapeMismatch {
                row_index: row.index,
                expected: header.len(),
                found: row.cells.len(),
            });
        }
        data.push(row.cells.into_iter().map(|c| c.text).collect());
    }

    debug!(
        table = handle.index,
        columns = header.len(),
        rows = data.len(),
        ?header_source,
        "Extracted table"
    );
    Ok(RawTable {
        header,
        rows: data,
        header_source,
    })
}

/// Parses `html` and extracts the table at `index`.
pub fn extract_table(html: &str, index: usize) -> Result<RawTable, ExtractionError> {
    let document = Html::parse_document(html);
    let tables = find_tables(&document);
    if tables.is_empty() {
        return Err(ExtractionError::NoTables);
    }
    let handle = tables.get(index).ok_or(ExtractionError::TableIndexOutOfRange {
        index,
        found: tables.len(),
    })?;
    extract(handle)
}

/// Shape of one table, as reported by `inspect`.
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub index: usize,
    pub header: Vec<String>,
    pub rows: usize,
    pub error: Option<String>,
}

pub fn summarize_tables(html: &str) -> Vec<TableSummary> {
    let document = Html::parse_document(html);
    find_tables(&document)
        .iter()
        .map(|handle| match extract(handle) {
            Ok(table) => TableSummary {
                index: handle.index,
                rows: table.len(),
                header: table.header,
                error: None,
            },
            Err(e) => TableSummary {
                index: handle.index,
                header: Vec::new(),
                rows: 0,
                error: Some(e.to_string()),
            },
        })
        .collect()
}

// Rows owned by this table only; rows of nested tables are not descended into.
fn collect_rows(table: ElementRef<'_>) -> Vec<TableRow> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push((child, false)),
            section @ ("thead" | "tbody" | "tfoot") => {
                let in_thead = section == "thead";
                rows.extend(
                    child
                        .children()
                        .filter_map(ElementRef::wrap)
                        .filter(|e| e.value().name() == "tr")
                        .map(|tr| (tr, in_thead)),
                );
            }
            _ => {}
        }
    }

    rows.into_iter()
        .enumerate()
        .map(|(index, (tr, in_thead))| TableRow {
            index,
            in_thead,
            cells: tr
                .children()
                .filter_map(ElementRef::wrap)
                .filter_map(|cell| {
                    let is_header = match cell.value().name() {
                        "th" => true,
                        "td" => false,
                        _ => return None,
                    };
                    Some(Cell {
                        text: cell_text(cell),
                        is_header,
                    })
                })
                .collect(),
        })
        .collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
