use std::rc::Rc;

use smallvec::SmallVec;

use crate::{entry::ResizeObserverEntry, handler::HandlerId};

/// A handler with its target type erased, ready to receive platform entries.
pub(crate) type ErasedHandler<E> = Rc<dyn Fn(&ResizeObserverEntry<E>)>;

/// The handlers interested in one element.
///
/// Semantically a set keyed by [`HandlerId`]: inserting a handler that is
/// already present changes nothing, so a handler subscribed twice is still
/// called once per notification. Most elements have a single handler, hence
/// the inline capacity.
pub(crate) struct Subscribers<E> {
  inner: SmallVec<[(HandlerId, ErasedHandler<E>); 1]>,
}

impl<E> Subscribers<E> {
  pub(crate) fn with(id: HandlerId, handler: ErasedHandler<E>) -> Self {
    let mut inner = SmallVec::new();
    inner.push((id, handler));
    Self { inner }
  }

  /// Returns `false` when the handler was already subscribed.
  pub(crate) fn insert(&mut self, id: HandlerId, handler: ErasedHandler<E>) -> bool {
    if self.contains(id) {
      return false;
    }
    self.inner.push((id, handler));
    true
  }

  pub(crate) fn remove(&mut self, id: HandlerId) -> Option<ErasedHandler<E>> {
    self.inner.iter().position(|(i, _)| *i == id).map(|pos| self.inner.remove(pos).1)
  }

  #[inline]
  pub(crate) fn contains(&self, id: HandlerId) -> bool { self.inner.iter().any(|(i, _)| *i == id) }

  #[inline]
  pub(crate) fn len(&self) -> usize { self.inner.len() }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool { self.inner.is_empty() }

  /// Copy out the current handlers so they can be called without holding a
  /// borrow of the observer state.
  pub(crate) fn snapshot(&self) -> SmallVec<[(HandlerId, ErasedHandler<E>); 2]> {
    self.inner.iter().map(|(id, h)| (*id, h.clone())).collect()
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use super::*;
  use crate::handler::ResizeHandler;

  fn erased(h: &ResizeHandler<()>) -> ErasedHandler<()> {
    let h = h.clone();
    Rc::new(move |e: &ResizeObserverEntry<()>| h.call(e))
  }

  #[shared_resize_macro::test]
  fn insert_is_idempotent() {
    let h = ResizeHandler::new(|_| {});
    let mut subs = Subscribers::with(h.id(), erased(&h));
    assert!(!subs.insert(h.id(), erased(&h)));
    assert_eq!(subs.len(), 1);

    let other = ResizeHandler::new(|_| {});
    assert!(subs.insert(other.id(), erased(&other)));
    assert_eq!(subs.len(), 2);
  }

  #[shared_resize_macro::test]
  fn remove_only_the_given_handler() {
    let hit = Rc::new(Cell::new(0));
    let a = ResizeHandler::new(|_| {});
    let b = {
      let hit = hit.clone();
      ResizeHandler::new(move |_| hit.set(hit.get() + 1))
    };
    let mut subs = Subscribers::with(a.id(), erased(&a));
    subs.insert(b.id(), erased(&b));

    assert!(subs.remove(a.id()).is_some());
    assert!(subs.remove(a.id()).is_none());
    assert!(!subs.contains(a.id()));
    assert!(subs.contains(b.id()));
    assert_eq!(subs.snapshot().len(), 1);

    assert!(subs.remove(b.id()).is_some());
    assert!(subs.is_empty());
    assert_eq!(hit.get(), 0);
  }
}
