//! Canvas errors

use thiserror::Error;
use vellum_text::TextError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CanvasError {
    /// A frame arena could not grow; the frame has to be discarded
    #[error("Out of memory growing the {arena} arena")]
    CapacityExhausted { arena: &'static str },

    #[error(transparent)]
    Text(#[from] TextError),

    #[error("Font atlas lock was poisoned by a panicking thread")]
    AtlasPoisoned,
}

pub type Result<T> = std::result::Result<T, CanvasError>;

/// Make room for `additional` more elements or report which arena ran out
pub(crate) fn reserve<T>(vec: &mut Vec<T>, additional: usize, arena: &'static str) -> Result<()> {
    vec.try_reserve(additional)
        .map_err(|_| CanvasError::CapacityExhausted { arena })
}
