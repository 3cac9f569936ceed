//! Error type shared by the crate.
//!
//! Almost every operation here is an idempotent no-op when redundant, so the
//! only failures are the ones the platform raises while constructing its
//! observer, plus parsing a box size from its string spelling.

use thiserror::Error;

/// Errors surfaced by [`Registry`](crate::registry::Registry) and
/// [`BoxSize`](crate::box_size::BoxSize) parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  /// The platform refused to construct a resize observer, for example
  /// because the environment has no `ResizeObserver` and no polyfill was
  /// registered.
  #[error("failed to construct platform resize observer: {0}")]
  Platform(String),

  /// A string did not name one of the three box sizes.
  #[error("unknown resize observer box size `{0}`")]
  UnknownBoxSize(String),
}

pub type Result<T> = std::result::Result<T, Error>;
