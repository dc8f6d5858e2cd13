use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use url::Url;

/// Read seller URLs from a links file. `.csv` files go through the csv
/// reader; anything else is taken as one URL per line.
pub fn load_links(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read links file {}", path.display()))?;

    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let links = if is_csv {
        parse_csv_links(&text)
            .with_context(|| format!("Failed to parse CSV links file {}", path.display()))?
    } else {
        parse_links(&text)
    };

    info!("Loaded {} links from {}", links.len(), path.display());
    Ok(links)
}

/// One URL per line. Blank lines, `#` comments, non-URLs and repeats are
/// skipped; order is kept.
pub fn parse_links(text: &str) -> Vec<String> {
    let candidates = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| http_url(line.trim_matches('"')));
    dedup(candidates)
}

/// First http(s) field of every CSV record. The delimiter (`,` `;` or tab)
/// is taken from the first data line; quoted fields keep their delimiters.
pub fn parse_csv_links(text: &str) -> Result<Vec<String>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .delimiter(sniff_delimiter(text))
        .from_reader(text.as_bytes());

    let mut urls = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(url) = record.iter().find_map(http_url) {
            urls.push(url);
        }
    }
    Ok(dedup(urls))
}

fn sniff_delimiter(text: &str) -> u8 {
    let first = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .unwrap_or_default();
    if first.contains('\t') {
        b'\t'
    } else if first.contains(';') && !first.contains(',') {
        b';'
    } else {
        b','
    }
}

fn http_url(field: &str) -> Option<String> {
    let parsed = Url::parse(field).ok()?;
    matches!(parsed.scheme(), "http" | "https").then(|| field.to_string())
}

fn dedup(urls: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter().filter(|url| seen.insert(url.clone())).collect()
}
