use chromiumoxide::cdp::browser_protocol::emulation::{
    SetLocaleOverrideParams, SetTimezoneOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use rand::seq::SliceRandom;
use tracing::debug;

pub const LOCALE: &str = "ru-RU";
pub const TIMEZONE: &str = "Europe/Moscow";
pub const ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7";

pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36 Edg/122.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
];

/// Runs before any page script: hide the automation flag and present a
/// Russian desktop profile.
const INIT_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'languages', { get: () => ['ru-RU', 'ru', 'en-US', 'en'] });
window.chrome = window.chrome || { runtime: {} };
"#;

pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Must run before the first navigation of `page`.
pub async fn apply(page: &Page, user_agent: &str) -> Result<(), CdpError> {
    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(INIT_SCRIPT))
        .await?;

    let mut ua = SetUserAgentOverrideParams::new(user_agent);
    ua.accept_language = Some(ACCEPT_LANGUAGE.to_string());
    page.execute(ua).await?;

    page.execute(SetTimezoneOverrideParams::new(TIMEZONE)).await?;
    page.execute(SetLocaleOverrideParams {
        locale: Some(LOCALE.to_string()),
    })
    .await?;

    debug!("Stealth profile applied (ua: {})", user_agent);
    Ok(())
}
