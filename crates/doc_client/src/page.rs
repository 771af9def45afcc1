//! Which page the document shows for a given URL state.
//!
//! Resolution is a pure function of the URL state and the views table; it re-runs on
//! every URL change.

use shared::{
    cursor::UrlState,
    domain::{DocPage, PageToken, SpecialPage, ViewId, DOC_TOUR_TABLE},
};

use crate::model::DocModel;

/// Classification of the URL page token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageResolution {
    /// No token: the default view applies.
    Unresolved,
    Special(SpecialPage),
    /// The tour marker, resolved through the view named after it.
    Tour,
    View(i64),
}

pub fn classify_page(token: Option<PageToken>) -> PageResolution {
    match token {
        None => PageResolution::Unresolved,
        Some(PageToken::Special(SpecialPage::GristDocTour)) => PageResolution::Tour,
        Some(PageToken::Special(page)) => PageResolution::Special(page),
        Some(PageToken::View(view_id)) => PageResolution::View(view_id),
    }
}

/// Resolves the active page; `None` only when nothing resolves and the doc has no default view.
pub async fn resolve_active_view(state: &UrlState, model: &dyn DocModel) -> Option<DocPage> {
    let found = match classify_page(state.doc_page) {
        PageResolution::Special(page) => return Some(DocPage::Special(page)),
        PageResolution::Tour => model.find_view_by_name(DOC_TOUR_TABLE).await,
        PageResolution::View(view_id) => {
            let view_id = ViewId(view_id);
            if model.view_exists(view_id).await {
                Some(view_id)
            } else {
                None
            }
        }
        PageResolution::Unresolved => None,
    };
    match found {
        Some(view_id) => Some(DocPage::View(view_id)),
        None => model.default_view_id().await.map(DocPage::View),
    }
}

/// Name shown for the page: the view name, or the special page token.
pub async fn current_page_name(page: Option<DocPage>, model: &dyn DocModel) -> String {
    match page {
        Some(DocPage::View(view_id)) => model
            .view(view_id)
            .await
            .map(|view| view.name)
            .unwrap_or_default(),
        Some(DocPage::Special(page)) => page.token().to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
#[path = "tests/page_tests.rs"]
mod tests;
