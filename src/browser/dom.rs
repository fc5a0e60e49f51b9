use super::cdp_client::CdpPage;
use crate::error::{AppError, Result};
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

/// Read-only DOM access: the value of one element property for every element that
/// matches a CSS selector, in document order. No match is an empty list, not an error.
#[allow(async_fn_in_trait)]
pub trait DomQuery {
    async fn property_values(&self, selector: &str, property: &str) -> Result<Vec<String>>;
}

impl DomQuery for CdpPage {
    async fn property_values(&self, selector: &str, property: &str) -> Result<Vec<String>> {
        let script = format!(
            r#"Array.from(document.querySelectorAll({selector}), el => {{
                const value = el[{property}];
                return value === null || value === undefined ? "" : String(value);
            }})"#,
            selector = serde_json::to_string(selector)?,
            property = serde_json::to_string(property)?,
        );

        let value: Value = self
            .inner()
            .evaluate(script.as_str())
            .await?
            .into_value()
            .map_err(|e| AppError::Browser(format!("Failed to read {}: {}", property, e)))?;

        strings_from_json(value)
    }
}

/// Flattens the JSON array returned by an in-page query into strings.
pub(crate) fn strings_from_json(value: Value) -> Result<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect()),
        other => Err(AppError::Browser(format!(
            "expected an array of values, got {}",
            other
        ))),
    }
}

/// A parsed HTML document standing in for a rendered page. Used for offline
/// fixtures; `href` values are resolved against the base URL like a browser would.
pub struct HtmlPage {
    document: Html,
    base_url: Option<Url>,
}

impl HtmlPage {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base: &str) -> Result<Self> {
        let url = Url::parse(base)
            .map_err(|e| AppError::Parse(format!("invalid base URL {}: {}", base, e)))?;
        self.base_url = Some(url);
        Ok(self)
    }

    fn resolve(&self, href: &str) -> String {
        match &self.base_url {
            Some(base) => base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }
}

impl DomQuery for HtmlPage {
    async fn property_values(&self, selector: &str, property: &str) -> Result<Vec<String>> {
        let parsed = Selector::parse(selector)
            .map_err(|e| AppError::Parse(format!("invalid selector {}: {}", selector, e)))?;

        let values = self
            .document
            .select(&parsed)
            .map(|element| match property {
                "textContent" => element.text().collect::<String>(),
                "href" => element
                    .value()
                    .attr("href")
                    .map(|href| self.resolve(href))
                    .unwrap_or_default(),
                other => element.value().attr(other).unwrap_or_default().to_string(),
            })
            .collect();

        Ok(values)
    }
}
