//! Element identity and typed target handles.

/// Stable identity token for an observed element.
///
/// The shared observer keys its handler map by this token instead of by the
/// element itself, so subscribing never extends an element's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementKey(pub u64);

/// A platform element that can be registered with a platform observer.
pub trait ObservedElement: Clone + 'static {
  /// Returns the same key for as long as the element exists, and distinct
  /// keys for distinct elements.
  fn element_key(&self) -> ElementKey;
}

/// A caller-side handle to a platform element `E`.
///
/// Handlers receive their entry's target as the same `T` they subscribed
/// with, e.g. a `web_sys::HtmlCanvasElement` instead of a bare `Element`.
pub trait TargetCast<E: ObservedElement>: Clone + 'static {
  fn upcast(&self) -> E;

  /// Recover the handle from a platform element. Only called with elements
  /// that were produced by `upcast` on a value of this type.
  fn downcast(element: &E) -> Self;
}
