use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(RowId);
id_newtype!(SectionId);
id_newtype!(ViewId);
id_newtype!(TableRef);
id_newtype!(ColRef);
id_newtype!(ActionNum);

/// Name of the hidden table (and view) that holds a document tour.
pub const DOC_TOUR_TABLE: &str = "GristDocTour";

/// Pages that are not backed by a row of the views table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialPage {
    #[serde(rename = "code")]
    Code,
    #[serde(rename = "acl")]
    Acl,
    #[serde(rename = "data")]
    Data,
    #[serde(rename = "GristDocTour")]
    GristDocTour,
}

impl SpecialPage {
    pub fn token(self) -> &'static str {
        match self {
            SpecialPage::Code => "code",
            SpecialPage::Acl => "acl",
            SpecialPage::Data => "data",
            SpecialPage::GristDocTour => DOC_TOUR_TABLE,
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "code" => Some(SpecialPage::Code),
            "acl" => Some(SpecialPage::Acl),
            "data" => Some(SpecialPage::Data),
            DOC_TOUR_TABLE => Some(SpecialPage::GristDocTour),
            _ => None,
        }
    }
}

/// The page token as it appears in a URL, before it is checked against the views table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageToken {
    Special(SpecialPage),
    View(i64),
}

impl PageToken {
    pub fn parse(token: &str) -> Option<Self> {
        if let Some(special) = SpecialPage::from_token(token) {
            return Some(PageToken::Special(special));
        }
        token.parse::<i64>().ok().map(PageToken::View)
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageToken::Special(page) => f.write_str(page.token()),
            PageToken::View(id) => write!(f, "{id}"),
        }
    }
}

/// A resolved document page: either a special page or an existing view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocPage {
    Special(SpecialPage),
    View(ViewId),
}

impl DocPage {
    pub fn view_id(self) -> Option<ViewId> {
        match self {
            DocPage::View(view_id) => Some(view_id),
            DocPage::Special(_) => None,
        }
    }

    /// Pages that render view sections (and therefore have cursors).
    pub fn is_view_page(self) -> bool {
        matches!(self, DocPage::View(_) | DocPage::Special(SpecialPage::Data))
    }

    pub fn to_token(self) -> PageToken {
        match self {
            DocPage::Special(page) => PageToken::Special(page),
            DocPage::View(view_id) => PageToken::View(view_id.0),
        }
    }
}

/// Content of the right-hand side panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RightPanelTool {
    #[default]
    None,
    DocHistory,
    Validations,
}
