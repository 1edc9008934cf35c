//! CAPTCHA page detection

use super::selector;
use crate::error::ParseError;
use scraper::{Html, Selector};

/// Markers of a CAPTCHA interstitial
pub const CAPTCHA_SELECTORS: [&str; 5] = [
    r#"iframe[src*="captcha"]"#,
    r#"iframe[src*="recaptcha"]"#,
    "div.g-recaptcha",
    "#captcha",
    r#"[class*="captcha"]"#,
];

pub struct CaptchaDetector {
    selectors: Vec<Selector>,
}

impl CaptchaDetector {
    pub fn new() -> Result<Self, ParseError> {
        let selectors = CAPTCHA_SELECTORS
            .iter()
            .map(|css| selector(css))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { selectors })
    }

    /// True if any CAPTCHA marker is present in `html`
    pub fn is_captcha(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        self.selectors
            .iter()
            .any(|sel| document.select(sel).next().is_some())
    }
}
