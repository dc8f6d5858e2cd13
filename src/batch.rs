use std::time::Instant;

use tracing::{info, warn};

use crate::browser::{DriverError, ListingSource};
use crate::model::ExtractionResult;
use crate::parser;

/// Batch progress after one URL finished, successfully or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

impl Progress {
    fn new(completed: usize, total: usize) -> Self {
        let percent = if total == 0 { 100 } else { completed * 100 / total };
        Self { completed, total, percent: percent.min(100) as u8 }
    }
}

pub struct BatchReport {
    pub result: ExtractionResult,
    pub failures: Vec<(String, DriverError)>,
}

/// Render and extract each URL strictly in order, then merge. A driver error
/// is recorded and the batch moves on, unless `fail_fast` is set.
pub(crate) async fn run_batch<S, F>(
    source: &S,
    urls: &[String],
    fail_fast: bool,
    mut on_progress: F,
) -> Result<BatchReport, DriverError>
where
    S: ListingSource,
    F: FnMut(Progress),
{
    let total = urls.len();
    let mut results = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (i, url) in urls.iter().enumerate() {
        let t0 = Instant::now();
        info!("Processing {} / {} : {}", i + 1, total, url);

        match source.render(url).await {
            Ok(html) => {
                let result = parser::extract_from_html(&html);
                info!(
                    "{}: {} products in {:.1}s",
                    url,
                    result.total_products,
                    t0.elapsed().as_secs_f64()
                );
                results.push(result);
            }
            Err(e) if fail_fast => return Err(e),
            Err(e) => {
                warn!("Failed {}: {}", url, e);
                failures.push((url.clone(), e));
            }
        }

        on_progress(Progress::new(i + 1, total));
    }

    Ok(BatchReport {
        result: ExtractionResult::merge(results),
        failures,
    })
}
