use super::dom::DomQuery;
use crate::error::Result;

/// Text content of every element matching `selector`, whitespace-trimmed, in DOM order.
pub async fn extract_texts<P: DomQuery>(page: &P, selector: &str) -> Result<Vec<String>> {
    let values = page.property_values(selector, "textContent").await?;
    tracing::debug!("for selector {}, found {} elements", selector, values.len());
    Ok(values.into_iter().map(|v| v.trim().to_string()).collect())
}

/// Absolute `href` of every element matching `selector`, in DOM order.
pub async fn extract_hrefs<P: DomQuery>(page: &P, selector: &str) -> Result<Vec<String>> {
    let values = page.property_values(selector, "href").await?;
    tracing::debug!("for selector {}, found {} links", selector, values.len());
    Ok(values)
}
