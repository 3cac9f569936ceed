use std::{
  fmt,
  rc::Rc,
  sync::atomic::{AtomicU64, Ordering},
};

use crate::entry::ResizeObserverEntry;

/// A resize callback with identity.
///
/// Two `ResizeHandler`s are the same handler when one is a clone of the
/// other. Subscribing the same handler to the same element twice is a no-op,
/// so keep a clone around if you want to `unobserve` it later.
///
/// ```rust
/// use shared_resize_observer::handler::ResizeHandler;
///
/// let a = ResizeHandler::<u32>::new(|_| {});
/// let b = a.clone();
/// assert_eq!(a, b);
/// assert_ne!(a, ResizeHandler::new(|_| {}));
/// ```
pub struct ResizeHandler<T> {
  id: HandlerId,
  f: Rc<dyn Fn(&ResizeObserverEntry<T>)>,
}

/// Identity of a handler, independent of its target type. Never reused, so a
/// stale subscription cannot name a handler created after it was removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct HandlerId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl<T> ResizeHandler<T> {
  pub fn new(f: impl Fn(&ResizeObserverEntry<T>) + 'static) -> Self {
    Self { id: HandlerId(NEXT_ID.fetch_add(1, Ordering::Relaxed)), f: Rc::new(f) }
  }

  #[inline]
  pub fn call(&self, entry: &ResizeObserverEntry<T>) { (self.f)(entry) }

  #[inline]
  pub(crate) fn id(&self) -> HandlerId { self.id }
}

impl<T> Clone for ResizeHandler<T> {
  fn clone(&self) -> Self { Self { id: self.id, f: self.f.clone() } }
}

impl<T> PartialEq for ResizeHandler<T> {
  fn eq(&self, other: &Self) -> bool { self.id() == other.id() }
}

impl<T> Eq for ResizeHandler<T> {}

impl<T> fmt::Debug for ResizeHandler<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("ResizeHandler").field(&self.id.0).finish()
  }
}

impl<T, F> From<F> for ResizeHandler<T>
where
  F: Fn(&ResizeObserverEntry<T>) + 'static,
{
  fn from(f: F) -> Self { Self::new(f) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[shared_resize_macro::test]
  fn ids_are_not_reused_after_drop() {
    let first = ResizeHandler::<()>::new(|_| {});
    let id = first.id();
    assert_eq!(first.clone().id(), id);
    drop(first);
    for _ in 0..16 {
      assert_ne!(ResizeHandler::<()>::new(|_| {}).id(), id);
    }
  }
}
