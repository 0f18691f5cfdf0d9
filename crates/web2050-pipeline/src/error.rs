//! Pipeline error type.

use web2050_store::StoreError;

use crate::generator::GenerationError;
use crate::path::PathError;

/// Errors from resolving or deleting a page.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid path: {0}")]
    Path(#[from] PathError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl PipelineError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Path(e) => e.status_code(),
            Self::Store(_) | Self::Generation(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use web2050_store::StoreErrorKind;

    #[test]
    fn test_status_codes() {
        assert_eq!(PipelineError::from(PathError::TooLong { len: 99 }).status_code(), 414);
        assert_eq!(PipelineError::from(PathError::Empty).status_code(), 404);
        assert_eq!(
            PipelineError::from(StoreError::new(StoreErrorKind::Timeout)).status_code(),
            500
        );
        assert_eq!(
            PipelineError::from(GenerationError::Empty {
                key: "a.com/index.html".to_owned()
            })
            .status_code(),
            500
        );
    }
}
