//! Cursor positions and the URL-level locator that drives navigation.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::domain::{ColRef, PageToken, RowId, SectionId, ViewId};

const ANCHOR_PREFIX: &str = "a1";
const WELCOME_TOUR_FRAGMENT: &str = "repeat-welcome-tour";
const DOC_TOUR_FRAGMENT: &str = "repeat-doc-tour";

/// The addressed cell: a section, a row in it, and optionally a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPos {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<SectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_id: Option<RowId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_index: Option<usize>,
}

impl CursorPos {
    pub fn new(section_id: SectionId, row_id: RowId) -> Self {
        Self {
            section_id: Some(section_id),
            row_id: Some(row_id),
            field_index: None,
        }
    }

    pub fn with_field(mut self, field_index: usize) -> Self {
        self.field_index = Some(field_index);
        self
    }
}

/// A cursor position tagged with the view it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewCursorPos {
    pub view_id: ViewId,
    pub pos: CursorPos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_id: Option<RowId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col_ref: Option<ColRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<SectionId>,
}

impl HashLink {
    pub fn is_empty(&self) -> bool {
        self.row_id.is_none() && self.col_ref.is_none() && self.section_id.is_none()
    }

    /// `a1.s<section>.r<row>.c<col>`; missing parts are left out.
    pub fn to_fragment(&self) -> String {
        let mut fragment = String::from(ANCHOR_PREFIX);
        if let Some(section_id) = self.section_id {
            fragment.push_str(&format!(".s{section_id}"));
        }
        if let Some(row_id) = self.row_id {
            fragment.push_str(&format!(".r{row_id}"));
        }
        if let Some(col_ref) = self.col_ref {
            fragment.push_str(&format!(".c{col_ref}"));
        }
        fragment
    }

    fn parse_fragment(fragment: &str) -> Option<Self> {
        let mut parts = fragment.split('.');
        if parts.next()? != ANCHOR_PREFIX {
            return None;
        }
        let mut link = HashLink::default();
        for part in parts {
            let Some(kind) = part.chars().next() else {
                continue;
            };
            let Ok(id) = part[kind.len_utf8()..].parse::<i64>() else {
                continue;
            };
            match kind {
                's' => link.section_id = Some(SectionId(id)),
                'r' => link.row_id = Some(RowId(id)),
                'c' => link.col_ref = Some(ColRef(id)),
                _ => {}
            }
        }
        Some(link)
    }
}

#[derive(Debug, Error)]
pub enum UrlStateError {
    #[error("invalid document url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("invalid page token: {0}")]
    InvalidPage(String),
}

/// URL-level navigation state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlState {
    pub doc_page: Option<PageToken>,
    pub hash: Option<HashLink>,
    pub doc_tour: bool,
    pub welcome_tour: bool,
}

/// Partial update of `UrlState`; `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlUpdate {
    pub doc_page: Option<Option<PageToken>>,
    pub hash: Option<Option<HashLink>>,
    pub doc_tour: Option<bool>,
    pub welcome_tour: Option<bool>,
}

impl UrlUpdate {
    pub fn page(page: PageToken) -> Self {
        Self {
            doc_page: Some(Some(page)),
            ..Self::default()
        }
    }

    pub fn clear_page() -> Self {
        Self {
            doc_page: Some(None),
            ..Self::default()
        }
    }

    pub fn clear_hash() -> Self {
        Self {
            hash: Some(None),
            ..Self::default()
        }
    }

    pub fn clear_tours() -> Self {
        Self {
            doc_tour: Some(false),
            welcome_tour: Some(false),
            ..Self::default()
        }
    }
}

impl UrlState {
    /// Parses a document URL such as `/doc/abc/p/5#a1.s7.r12.c3`. Relative paths are accepted.
    pub fn parse(input: &str) -> Result<Self, UrlStateError> {
        let url = match Url::parse(input) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse("http://localhost/")?.join(input)?
            }
            Err(err) => return Err(err.into()),
        };

        let mut state = UrlState::default();
        if let Some(mut segments) = url.path_segments() {
            while let Some(segment) = segments.next() {
                if segment == "p" {
                    if let Some(page) = segments.next() {
                        state.doc_page = Some(
                            PageToken::parse(page)
                                .ok_or_else(|| UrlStateError::InvalidPage(page.to_string()))?,
                        );
                    }
                    break;
                }
            }
        }

        match url.fragment() {
            Some(WELCOME_TOUR_FRAGMENT) => state.welcome_tour = true,
            Some(DOC_TOUR_FRAGMENT) => state.doc_tour = true,
            Some(fragment) => state.hash = HashLink::parse_fragment(fragment),
            None => {}
        }
        Ok(state)
    }

    pub fn apply(&mut self, update: &UrlUpdate) {
        if let Some(doc_page) = update.doc_page {
            self.doc_page = doc_page;
        }
        if let Some(hash) = update.hash {
            self.hash = hash.filter(|link| !link.is_empty());
        }
        if let Some(doc_tour) = update.doc_tour {
            self.doc_tour = doc_tour;
        }
        if let Some(welcome_tour) = update.welcome_tour {
            self.welcome_tour = welcome_tour;
        }
    }

    /// Whether the document performs its own navigation from an anchor link.
    pub fn has_custom_nav(&self) -> bool {
        self.hash.is_some_and(|hash| !hash.is_empty())
    }
}

#[cfg(test)]
#[path = "tests/cursor_tests.rs"]
mod tests;
