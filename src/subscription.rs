use std::fmt;

use crate::{
  element::ObservedElement,
  handler::HandlerId,
  shared_observer::WeakResizeObserver,
};

/// A handle to cancel something that was started.
pub trait Subscription {
  /// Cancel. Calling this on an already closed subscription does nothing.
  fn unsubscribe(self);

  fn is_closed(&self) -> bool;

  /// Activates "RAII" behavior for this subscription. That means
  /// `unsubscribe()` will be called automatically as soon as the returned
  /// value goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately, which is probably not what you
  /// want!
  fn unsubscribe_when_dropped(self) -> SubscriptionGuard<Self>
  where
    Self: Sized,
  {
    SubscriptionGuard::new(self)
  }
}

/// The `(element, handler)` pair returned by
/// [`SharedResizeObserver::observe`](crate::shared_observer::SharedResizeObserver::observe).
///
/// Holds the element and a weak reference to the observer. Dropping it does
/// *not* unsubscribe; use [`Subscription::unsubscribe_when_dropped`] for that.
pub struct ResizeSubscription<E: ObservedElement> {
  observer: WeakResizeObserver<E>,
  element: E,
  handler: HandlerId,
}

impl<E: ObservedElement> ResizeSubscription<E> {
  pub(crate) fn new(observer: WeakResizeObserver<E>, element: E, handler: HandlerId) -> Self {
    Self { observer, element, handler }
  }

  #[inline]
  pub fn element(&self) -> &E { &self.element }
}

impl<E: ObservedElement> Subscription for ResizeSubscription<E> {
  fn unsubscribe(self) {
    if let Some(observer) = self.observer.upgrade() {
      observer.remove(&self.element, Some(self.handler));
    }
  }

  /// Closed once the pair was removed by any path: this handle, `unobserve`,
  /// `disconnect`, or the observer going away.
  fn is_closed(&self) -> bool {
    self
      .observer
      .upgrade()
      .map_or(true, |o| !o.is_subscribed(self.element.element_key(), self.handler))
  }
}

impl<E: ObservedElement> fmt::Debug for ResizeSubscription<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ResizeSubscription")
      .field("element", &self.element.element_key())
      .field("is_closed", &self.is_closed())
      .finish()
  }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope.
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard<T: Subscription>(Option<T>);

impl<T: Subscription> SubscriptionGuard<T> {
  /// Wraps an existing subscription with a guard to enable RAII behavior for
  /// it.
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(Some(subscription)) }

  pub fn is_closed(&self) -> bool { self.0.as_ref().map_or(true, Subscription::is_closed) }
}

impl<T: Subscription> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) {
    if let Some(subscription) = self.0.take() {
      subscription.unsubscribe();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    box_size::BoxSize,
    fake::{FakeElement, FakePlatform},
    handler::ResizeHandler,
    shared_observer::SharedResizeObserver,
  };

  #[shared_resize_macro::test]
  fn guard_unsubscribes_on_drop() {
    let platform = FakePlatform::default();
    let ro = SharedResizeObserver::new(BoxSize::BorderBox, &platform.implementation()).unwrap();
    let element = FakeElement::new(5., 5.);
    {
      let guard = ro.observe(&element, ResizeHandler::new(|_| {})).unsubscribe_when_dropped();
      assert!(!guard.is_closed());
      assert!(ro.is_observing(&element));
    }
    assert!(!ro.is_observing(&element));
    assert!(!platform.is_observed(&element));
  }

  #[shared_resize_macro::test]
  fn unsubscribe_twice_is_harmless() {
    let platform = FakePlatform::default();
    let ro = SharedResizeObserver::new(BoxSize::BorderBox, &platform.implementation()).unwrap();
    let element = FakeElement::new(5., 5.);
    let h = ResizeHandler::new(|_| {});
    let first = ro.observe(&element, h.clone());
    let second = ro.observe(&element, h);
    assert_eq!(first.element().element_key(), element.element_key());

    first.unsubscribe();
    assert!(second.is_closed());
    second.unsubscribe();
    assert_eq!(platform.stats().unobserve_calls, 1);
  }
}
