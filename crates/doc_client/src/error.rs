use shared::{
    domain::{RowId, SectionId},
    error::{ApiError, ErrorCode},
    value::ValueError,
};
use thiserror::Error;

/// User-facing message for any failed cell lookup.
pub const CELL_NOT_FOUND_MESSAGE: &str = "There was a problem finding the desired cell.";

/// Why a navigation request could not be carried out.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("sectionId required")]
    MissingSectionId,
    #[error("rowId required")]
    MissingRowId,
    #[error("unknown section {0}")]
    UnknownSection(SectionId),
    #[error("cannot trace rowId {row_id} of section {section_id} to its link source")]
    UnresolvedLink {
        section_id: SectionId,
        row_id: RowId,
    },
    #[error("link chain revisits section {0}")]
    LinkCycle(SectionId),
    #[error("view for section {0} never became ready")]
    ViewNotReady(SectionId),
    #[error("invalid link value: {0}")]
    InvalidValue(#[from] ValueError),
    #[error("{0}")]
    Model(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum DocControllerError {
    #[error("There was a problem finding the desired cell.")]
    CellNotFound {
        #[source]
        cause: NavigationError,
    },
    #[error("server reported an error for an action broadcast: {0}")]
    Broadcast(String),
    #[error("nothing to {0}")]
    NothingToReplay(&'static str),
    #[error("no view page is active")]
    NoActiveView,
    #[error("unexpected result from {action}: {detail}")]
    UnexpectedResult { action: &'static str, detail: String },
    #[error("document channel error: {0}")]
    Channel(#[source] anyhow::Error),
    #[error("view error: {0}")]
    View(#[source] anyhow::Error),
}

impl DocControllerError {
    pub fn to_api_error(&self) -> ApiError {
        match self {
            DocControllerError::CellNotFound { .. } => {
                ApiError::new(ErrorCode::CellNotFound, CELL_NOT_FOUND_MESSAGE)
            }
            DocControllerError::Broadcast(message) => ApiError::from_broadcast(message.clone()),
            DocControllerError::NothingToReplay(_) | DocControllerError::NoActiveView => {
                ApiError::new(ErrorCode::Validation, self.to_string())
            }
            DocControllerError::UnexpectedResult { .. } => {
                ApiError::new(ErrorCode::Internal, self.to_string())
            }
            DocControllerError::Channel(err) | DocControllerError::View(err) => {
                ApiError::new(ErrorCode::Internal, err.to_string())
            }
        }
    }
}
