mod common;

use common::{MISMATCHED_HTML, RANKINGS_HTML};
use table_scraper::error::ExtractionError;
use table_scraper::pipeline::extract::{extract_table, summarize_tables, HeaderSource};

fn table_with_rows(n: usize) -> String {
    let mut html = String::from("<table><tr><th>Rank</th><th>Model</th><th>Price</th></tr>");
    for i in 0..n {
        html.push_str(&format!("<tr><td>B</td><td>Model {i}</td><td>{i}</td></tr>"));
    }
    html.push_str("</table>");
    html
}

#[test]
fn test_one_record_per_data_row() {
    for n in [0, 1, 7, 50] {
        let table = extract_table(&table_with_rows(n), 0).unwrap();
        let records = table.into_records();
        assert_eq!(records.len(), n);
        for (i, record) in records.iter().enumerate() {
            let columns: Vec<_> = record.columns().collect();
            assert_eq!(columns, vec!["Rank", "Model", "Price"]);
            assert_eq!(record.get("Model"), Some(format!("Model {i}").as_str()));
        }
    }
}

#[test]
fn test_rankings_table_keeps_header_order() {
    let table = extract_table(RANKINGS_HTML, 0).unwrap();
    assert_eq!(table.header_source, HeaderSource::HeaderCells);
    assert_eq!(
        table.header,
        vec!["Rank", "Value Rating", "Model", "Price (MSRP)", "Signature"]
    );
    assert_eq!(table.len(), 3);

    let records = table.into_records();
    assert_eq!(records[1].get("Value Rating"), Some(""));
    assert_eq!(records[2].get("Rank"), Some("A++"));
}

#[test]
fn test_shape_mismatch_yields_no_records() {
    let err = extract_table(MISMATCHED_HTML, 0).unwrap_err();
    assert_eq!(
        err,
        ExtractionError::RowShapeMismatch {
            row_index: 2,
            expected: 2,
            found: 1,
        }
    );
}

#[test]
fn test_page_without_tables() {
    let err = extract_table("<html><body><p>No data today</p></body></html>", 0).unwrap_err();
    assert_eq!(err, ExtractionError::NoTables);
}

#[test]
fn test_table_index_selects_later_table() {
    let html = format!("{}{}", table_with_rows(1), table_with_rows(4));
    assert_eq!(extract_table(&html, 1).unwrap().len(), 4);
    assert_eq!(
        extract_table(&html, 2).unwrap_err(),
        ExtractionError::TableIndexOutOfRange { index: 2, found: 2 }
    );
}

#[test]
fn test_summaries_report_broken_tables() {
    let html = format!("{}{}", RANKINGS_HTML, MISMATCHED_HTML);
    let summaries = summarize_tables(&html);

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].rows, 3);
    assert!(summaries[0].error.is_none());
    assert_eq!(summaries[1].rows, 0);
    assert!(summaries[1].error.is_some());
}
