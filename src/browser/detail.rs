use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{click_all, BrowserSession, DriverError, RenderConfig};
use crate::model::ListingRecord;
use crate::parser;

/// Collapsed sections on an item page, clicked best-effort in this order.
const EXPAND_SELECTORS: &[&str] = &[
    r#"a[data-marker="expand-text"]"#,
    r#"[data-marker="item-view/item-params"] button"#,
    r#"[data-marker="item-view/price-list"] button"#,
    r#"[data-marker="item-view/additional-services"] button"#,
];

#[derive(Debug, Clone)]
pub struct DetailConfig {
    pub settle: Duration,
    pub scroll_steps: u32,
    pub scroll_step_px: u32,
    pub scroll_pause: Duration,
    pub click_pause: Duration,
    /// Bounds of the randomized pause between two item pages.
    pub delay_min: Duration,
    pub delay_max: Duration,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(1),
            scroll_steps: 4,
            scroll_step_px: 800,
            scroll_pause: Duration::from_millis(400),
            click_pause: Duration::from_millis(500),
            delay_min: Duration::from_secs(2),
            delay_max: Duration::from_secs(5),
        }
    }
}

/// Loads one item page and returns its markup with collapsed blocks opened.
pub(crate) trait ItemPageSource {
    async fn fetch_item(&mut self, url: &str) -> Result<String, DriverError>;
}

/// One browser session reused for every item page of a batch.
pub struct DetailSession {
    session: BrowserSession,
    config: DetailConfig,
}

impl DetailSession {
    pub async fn open(render: &RenderConfig, config: DetailConfig) -> Result<Self, DriverError> {
        let session = BrowserSession::launch(render).await?;
        Ok(Self { session, config })
    }

    pub async fn close(self) {
        self.session.close().await;
    }
}

impl ItemPageSource for DetailSession {
    async fn fetch_item(&mut self, url: &str) -> Result<String, DriverError> {
        self.session.goto(url).await?;
        sleep(self.config.settle).await;

        let page = self.session.page();
        let step = format!("window.scrollBy(0, {})", self.config.scroll_step_px);
        for _ in 0..self.config.scroll_steps {
            if let Err(e) = page.evaluate(step.as_str()).await {
                debug!("Item scroll failed on {}: {}", url, e);
            }
            sleep(self.config.scroll_pause).await;
        }

        for selector in EXPAND_SELECTORS {
            click_all(page, selector, self.config.click_pause).await;
        }

        self.session.html().await
    }
}

/// Visit each record's page in order and attach its detail fields. A failed
/// page leaves that record's detail unset. Returns how many were enriched.
pub(crate) async fn enrich<S: ItemPageSource>(
    source: &mut S,
    records: &mut [ListingRecord],
    config: &DetailConfig,
) -> usize {
    let total = records.len();
    let mut enriched = 0;

    for (i, record) in records.iter_mut().enumerate() {
        if i > 0 {
            let delay = random_delay(config);
            debug!("Waiting {:.1}s before next item", delay.as_secs_f64());
            sleep(delay).await;
        }

        info!("Details {}/{}: {}", i + 1, total, record.url);
        match source.fetch_item(&record.url).await {
            Ok(html) => {
                record.apply_details(parser::extract_details(&html));
                enriched += 1;
            }
            Err(e) => warn!("Skipping details for {}: {}", record.url, e),
        }
    }

    enriched
}

/// Run the detail pass over `records` with a dedicated browser session that
/// is closed before returning.
pub async fn enrich_with_browser(
    records: &mut [ListingRecord],
    render: &RenderConfig,
    config: &DetailConfig,
) -> Result<usize, DriverError> {
    let mut session = DetailSession::open(render, config.clone()).await?;
    let enriched = enrich(&mut session, records, config).await;
    session.close().await;
    Ok(enriched)
}

fn random_delay(config: &DetailConfig) -> Duration {
    let min = config.delay_min.as_millis() as u64;
    let max = config.delay_max.as_millis() as u64;
    if max <= min {
        return config.delay_min;
    }
    Duration::from_millis(rand::thread_rng().gen_range(min..=max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    struct FakeItems {
        html: String,
        visited: Vec<String>,
    }

    impl ItemPageSource for FakeItems {
        async fn fetch_item(&mut self, url: &str) -> Result<String, DriverError> {
            self.visited.push(url.to_string());
            if url.contains("broken") {
                return Err(DriverError::Navigation {
                    url: url.to_string(),
                    reason: "net::ERR_CONNECTION_RESET".into(),
                });
            }
            Ok(self.html.clone())
        }
    }

    fn record(index: usize, url: &str) -> ListingRecord {
        ListingRecord {
            index,
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_item_does_not_abort_batch() {
        let mut source = FakeItems {
            html: std::fs::read_to_string("tests/fixtures/item_page.html").unwrap(),
            visited: Vec::new(),
        };
        let mut records = vec![
            record(1, "https://www.avito.ru/a_1"),
            record(2, "https://www.avito.ru/broken_2"),
            record(3, "https://www.avito.ru/c_3"),
        ];

        let n = enrich(&mut source, &mut records, &DetailConfig::default()).await;

        assert_eq!(n, 2);
        assert_eq!(source.visited.len(), 3);
        assert!(records[1].detail.is_none());
        let d = records[0].detail.as_ref().unwrap();
        assert_eq!(d.description, "Крепкий стул из массива. Самовывоз или доставка.");
        assert_eq!(d.additional, "");
        assert_eq!(records[2].detail, records[0].detail);
    }

    #[tokio::test(start_paused = true)]
    async fn items_are_paced() {
        let mut source = FakeItems { html: String::new(), visited: Vec::new() };
        let mut records = vec![record(1, "u1"), record(2, "u2"), record(3, "u3")];
        let config = DetailConfig::default();

        let started = Instant::now();
        enrich(&mut source, &mut records, &config).await;
        let elapsed = started.elapsed();

        assert!(elapsed >= config.delay_min * 2);
        assert!(elapsed <= config.delay_max * 2);
    }

    #[test]
    fn delay_within_bounds() {
        let config = DetailConfig::default();
        for _ in 0..50 {
            let d = random_delay(&config);
            assert!(d >= config.delay_min && d <= config.delay_max);
        }
    }

    #[test]
    fn degenerate_delay_range() {
        let config = DetailConfig {
            delay_min: Duration::from_secs(3),
            delay_max: Duration::from_secs(1),
            ..Default::default()
        };
        assert_eq!(random_delay(&config), Duration::from_secs(3));
    }
}
