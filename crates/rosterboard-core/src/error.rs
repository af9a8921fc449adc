//! Domain errors surfaced to callers.

use crate::model::{BankType, ZoneId};
use thiserror::Error;

/// Errors raised by board operations that the caller must handle.
///
/// Unknown ids are not errors: mutators ignore them and report "not
/// applied" through their return value instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// Required banks are missing even after repair; the board must be reset.
    #[error("Board needs recovery: missing banks {missing:?}")]
    NeedsRecovery { missing: Vec<BankType> },
    /// A container would end up accepting no tile type.
    #[error("Container {0} must accept at least one tile type")]
    NoAcceptedType(ZoneId),
    #[error("Unknown container: {0}")]
    UnknownContainer(ZoneId),
}

/// Result type for board operations.
pub type BoardResult<T> = Result<T, BoardError>;
