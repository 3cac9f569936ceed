//! Change notification records.
//!
//! The platform hands these over in batches; the shared observer routes each
//! one to the handlers of its target, narrowing `target` to the handle type the
//! handler subscribed with.

use smallvec::SmallVec;

use crate::box_size::BoxSize;

/// Size of one box fragment, in the element's writing mode.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ResizeObserverSize {
  pub inline_size: f64,
  pub block_size: f64,
}

impl ResizeObserverSize {
  pub const fn new(inline_size: f64, block_size: f64) -> Self { Self { inline_size, block_size } }
}

/// The content rectangle reported alongside the box sizes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DomRect {
  pub x: f64,
  pub y: f64,
  pub width: f64,
  pub height: f64,
}

impl DomRect {
  pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self { Self { x, y, width, height } }
}

pub type Fragments = SmallVec<[ResizeObserverSize; 1]>;

/// One element's new size, as computed by the platform.
#[derive(Clone, Debug)]
pub struct ResizeObserverEntry<T> {
  pub target: T,
  pub content_rect: DomRect,
  pub border_box_size: Fragments,
  pub content_box_size: Fragments,
  pub device_pixel_content_box_size: Fragments,
}

impl<T> ResizeObserverEntry<T> {
  #[inline]
  pub fn target(&self) -> &T { &self.target }

  #[inline]
  pub fn content_rect(&self) -> DomRect { self.content_rect }

  /// Every fragment reported for `box_size`.
  pub fn fragments(&self, box_size: BoxSize) -> &[ResizeObserverSize] {
    match box_size {
      BoxSize::BorderBox => &self.border_box_size,
      BoxSize::ContentBox => &self.content_box_size,
      BoxSize::DevicePixelContentBox => &self.device_pixel_content_box_size,
    }
  }

  /// The first fragment for `box_size`. Elements that are not fragmented
  /// (everything outside multi-column layout) only ever have one.
  pub fn size(&self, box_size: BoxSize) -> Option<ResizeObserverSize> {
    self.fragments(box_size).first().copied()
  }

  /// Rebuild the entry around a different view of the same target.
  pub fn map_target<U>(&self, f: impl FnOnce(&T) -> U) -> ResizeObserverEntry<U> {
    ResizeObserverEntry {
      target: f(&self.target),
      content_rect: self.content_rect,
      border_box_size: self.border_box_size.clone(),
      content_box_size: self.content_box_size.clone(),
      device_pixel_content_box_size: self.device_pixel_content_box_size.clone(),
    }
  }
}
