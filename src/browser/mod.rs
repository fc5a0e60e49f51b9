mod cdp_client;
mod dom;
mod extractor;
mod navigator;
mod page;
#[cfg(test)]
pub(crate) mod testing;

pub use cdp_client::{CdpPage, ChromeSession};
pub use dom::{DomQuery, HtmlPage};
pub use extractor::{extract_hrefs, extract_texts};
pub use navigator::{pair_detail_links, DetailCapture, SessionNavigator, SessionState};
pub use page::{BrowserPage, PageSource};
