use std::fs;
use std::io;
use std::path::Path;

use chrono::Local;
use thiserror::Error;
use tracing::debug;

use crate::model::{DetailFields, ExtractionResult, ListingRecord};

const BASE_COLUMNS: [&str; 7] = ["index", "name", "url", "title", "price", "location", "date"];
const DETAIL_COLUMNS: [&str; 5] = [
    "location_detail",
    "details",
    "price_list",
    "description",
    "additional",
];
const SELLER_COLUMNS: [&str; 2] = ["seller_name", "seller_rating"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no product data to save")]
    Empty,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Detail columns are only present when some record went through the
/// detail pass.
pub fn header(with_details: bool) -> Vec<&'static str> {
    let mut cols = BASE_COLUMNS.to_vec();
    if with_details {
        cols.extend(DETAIL_COLUMNS);
    }
    cols.extend(SELLER_COLUMNS);
    cols
}

/// Write `result` as CSV, one row per product with the seller repeated on
/// each. An empty result is rejected before anything touches the disk.
pub fn save_csv(result: &ExtractionResult, path: &Path) -> Result<usize, ExportError> {
    if result.products.is_empty() {
        return Err(ExportError::Empty);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut wtr = csv::Writer::from_path(path)?;
    let rows = write_rows(&mut wtr, result)?;
    wtr.flush()?;

    debug!("Wrote {} rows to {}", rows, path.display());
    Ok(rows)
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, result: &ExtractionResult) -> Result<usize, ExportError> {
    let with_details = result.has_details();
    wtr.write_record(header(with_details))?;

    let seller = &result.seller_info;
    for record in &result.products {
        let mut row = base_fields(record);
        if with_details {
            let empty = DetailFields::default();
            let d = record.detail.as_ref().unwrap_or(&empty);
            row.extend([
                d.location_detail.as_str(),
                d.details.as_str(),
                d.price_list.as_str(),
                d.description.as_str(),
                d.additional.as_str(),
            ]
            .map(String::from));
        }
        row.push(seller.name.clone());
        row.push(seller.rating.clone());
        wtr.write_record(&row)?;
    }

    Ok(result.products.len())
}

fn base_fields(record: &ListingRecord) -> Vec<String> {
    vec![
        record.index.to_string(),
        record.name.clone(),
        record.url.clone(),
        record.title.clone(),
        record.price.clone(),
        record.location.clone(),
        record.date.clone(),
    ]
}

pub fn default_filename() -> String {
    format!("avito_products_{}.csv", Local::now().format("%Y%m%d_%H%M%S"))
}
