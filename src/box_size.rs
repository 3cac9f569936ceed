use std::{fmt, str::FromStr};

use crate::error::Error;

/// Which box metric a shared observer asks the platform to report on.
///
/// Every [`SharedResizeObserver`](crate::shared_observer::SharedResizeObserver)
/// is bound to exactly one of these for its whole life.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoxSize {
  #[default]
  BorderBox,
  ContentBox,
  DevicePixelContentBox,
}

impl BoxSize {
  pub const ALL: [BoxSize; 3] =
    [BoxSize::BorderBox, BoxSize::ContentBox, BoxSize::DevicePixelContentBox];

  /// The platform spelling, as passed in `{ box: ... }`.
  pub const fn as_str(self) -> &'static str {
    match self {
      BoxSize::BorderBox => "border-box",
      BoxSize::ContentBox => "content-box",
      BoxSize::DevicePixelContentBox => "device-pixel-content-box",
    }
  }

  #[inline]
  pub(crate) const fn index(self) -> usize { self as usize }
}

impl fmt::Display for BoxSize {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for BoxSize {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    BoxSize::ALL
      .into_iter()
      .find(|b| b.as_str() == s)
      .ok_or_else(|| Error::UnknownBoxSize(s.to_owned()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[shared_resize_macro::test]
  fn default_is_border_box() {
    assert_eq!(BoxSize::default(), BoxSize::BorderBox);
  }

  #[shared_resize_macro::test]
  fn parses_platform_spelling() {
    for b in BoxSize::ALL {
      assert_eq!(b.to_string().parse::<BoxSize>(), Ok(b));
    }
    assert_eq!(
      "padding-box".parse::<BoxSize>(),
      Err(Error::UnknownBoxSize("padding-box".to_owned()))
    );
  }

  #[shared_resize_macro::test]
  fn indices_are_dense() {
    let idx: Vec<_> = BoxSize::ALL.iter().map(|b| b.index()).collect();
    assert_eq!(idx, vec![0, 1, 2]);
  }
}
