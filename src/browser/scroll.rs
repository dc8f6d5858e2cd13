use std::time::Duration;

use anyhow::Result;
use chromiumoxide::Page;
use serde::Deserialize;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::parser::extract::listing::ITEM_SELECTOR;

pub const SCROLL_PAUSE: Duration = Duration::from_millis(500);
pub const MAX_ATTEMPTS: u32 = 50;
pub const STABLE_THRESHOLD: u32 = 3;
pub const WALL_CLOCK_CEILING: Duration = Duration::from_secs(90);
pub const NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables of the scroll-and-measure loop.
#[derive(Debug, Clone)]
pub struct ScrollPolicy {
    pub pause: Duration,
    pub max_attempts: u32,
    pub stable_threshold: u32,
    pub ceiling: Duration,
    pub network_idle_timeout: Duration,
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self {
            pause: SCROLL_PAUSE,
            max_attempts: MAX_ATTEMPTS,
            stable_threshold: STABLE_THRESHOLD,
            ceiling: WALL_CLOCK_CEILING,
            network_idle_timeout: NETWORK_IDLE_TIMEOUT,
        }
    }
}

/// What one measurement sees: rendered cards and document height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Signals {
    pub items: u64,
    pub height: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Settled,
    Ceiling,
    AttemptsExhausted,
}

#[derive(Debug, Clone, Copy)]
pub struct ScrollOutcome {
    pub reason: StopReason,
    pub cycles: u32,
    pub signals: Signals,
}

/// Something that can be scrolled and measured. Implemented by the live
/// Chromium page.
pub(crate) trait ScrollSurface {
    async fn scroll_to_bottom(&self) -> Result<()>;
    async fn measure(&self) -> Result<Signals>;
    async fn wait_network_idle(&self, limit: Duration) -> Result<()>;
}

/// Scroll until item count and height stay unchanged for
/// `stable_threshold` cycles and survive a network-idle recheck, or until
/// the attempt budget or wall-clock ceiling runs out.
pub(crate) async fn stabilize<S: ScrollSurface>(surface: &S, policy: &ScrollPolicy) -> ScrollOutcome {
    let started = Instant::now();
    let mut baseline = match surface.measure().await {
        Ok(s) => s,
        Err(e) => {
            debug!("Initial measure failed: {}", e);
            Signals::default()
        }
    };
    let mut stable = 0u32;
    let mut cycles = 0u32;

    while cycles < policy.max_attempts {
        if started.elapsed() >= policy.ceiling {
            warn!(
                "Scroll ceiling of {:.0}s reached after {} cycles ({} items)",
                policy.ceiling.as_secs_f64(),
                cycles,
                baseline.items
            );
            return ScrollOutcome { reason: StopReason::Ceiling, cycles, signals: baseline };
        }
        cycles += 1;

        if let Err(e) = surface.scroll_to_bottom().await {
            debug!("Scroll cycle {} failed: {}", cycles, e);
        }
        sleep(policy.pause).await;

        let current = match surface.measure().await {
            Ok(s) => s,
            Err(e) => {
                debug!("Measure in cycle {} failed, treating as unchanged: {}", cycles, e);
                baseline
            }
        };

        if current == baseline {
            stable += 1;
        } else {
            stable = 0;
            baseline = current;
        }
        debug!(
            "Cycle {}: {} items, height {}, stable {}/{}",
            cycles, baseline.items, baseline.height, stable, policy.stable_threshold
        );

        if stable >= policy.stable_threshold {
            match timeout(policy.network_idle_timeout, surface.wait_network_idle(policy.network_idle_timeout)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("Network-idle wait failed: {}", e),
                Err(_) => debug!("Network-idle wait timed out"),
            }

            let recheck = surface.measure().await.unwrap_or(baseline);
            if recheck == baseline {
                info!("Listing settled after {} cycles: {} items", cycles, baseline.items);
                return ScrollOutcome { reason: StopReason::Settled, cycles, signals: baseline };
            }
            debug!("Late batch arrived during recheck ({} -> {} items)", baseline.items, recheck.items);
            stable = 0;
            baseline = recheck;
        }
    }

    warn!("Scroll attempts exhausted ({}), {} items loaded", cycles, baseline.items);
    ScrollOutcome { reason: StopReason::AttemptsExhausted, cycles, signals: baseline }
}

fn measure_script() -> String {
    format!(
        "(() => ({{ items: document.querySelectorAll('{}').length, \
         height: document.body ? document.body.scrollHeight : 0 }}))()",
        ITEM_SELECTOR
    )
}

/// Resource-count heuristic: idle once no new resource entries appear for 1s.
fn network_idle_script(limit: Duration) -> String {
    let limit_ms = limit.as_millis().min(u128::from(u64::MAX)) as u64;
    format!(
        r#"(async () => {{
            const timeoutMs = {limit_ms};
            const idleMs = 1000;
            const interval = 250;
            const start = Date.now();
            const count = () => {{
                try {{ return performance.getEntriesByType('resource').length; }} catch (_) {{ return 0; }}
            }};
            let last = count();
            let quiet = 0;
            while (Date.now() - start < timeoutMs) {{
                await new Promise(r => setTimeout(r, interval));
                const cur = count();
                if (cur === last && document.readyState === 'complete') {{
                    quiet += interval;
                    if (quiet >= idleMs) return true;
                }} else {{
                    quiet = 0;
                }}
                last = cur;
            }}
            return false;
        }})()"#
    )
}

impl ScrollSurface for Page {
    async fn scroll_to_bottom(&self) -> Result<()> {
        self.evaluate("window.scrollTo(0, document.body.scrollHeight)").await?;
        Ok(())
    }

    async fn measure(&self) -> Result<Signals> {
        let signals = self.evaluate(measure_script()).await?.into_value::<Signals>()?;
        Ok(signals)
    }

    async fn wait_network_idle(&self, limit: Duration) -> Result<()> {
        let idle: bool = self.evaluate(network_idle_script(limit)).await?.into_value()?;
        if !idle {
            anyhow::bail!("network still busy after {:?}", limit);
        }
        Ok(())
    }
}
