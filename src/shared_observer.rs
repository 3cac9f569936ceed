//! One platform observer multiplexed across many `(element, handler)` pairs.
//!
//! A [`SharedResizeObserver`] registers an element with its platform observer
//! when the first handler for that element arrives and releases it when the
//! last one leaves. Platform notifications are fanned out to every handler of
//! the affected element.
//!
//! # Example
//!
//! ```rust
//! use shared_resize_observer::prelude::*;
//!
//! let platform = FakePlatform::default();
//! let registry = Registry::new(platform.implementation());
//! let observer = registry.get_instance(BoxSize::BorderBox).unwrap();
//!
//! let element = FakeElement::new(200., 100.);
//! let _guard = observer
//!   .observe(&element, ResizeHandler::new(|entry| println!("{:?}", entry.content_rect)))
//!   .unsubscribe_when_dropped();
//!
//! platform.resize(&element, 200., 110.);
//! platform.flush();
//! ```

use std::{collections::HashMap, fmt, rc::Rc};

use tracing::{debug, trace, warn};

use crate::{
  box_size::BoxSize,
  element::{ElementKey, ObservedElement, TargetCast},
  entry::ResizeObserverEntry,
  error::Result,
  handler::{HandlerId, ResizeHandler},
  platform::{Implementation, RawObserver},
  rc::{MutRc, RcDeref, RcDerefMut, WeakMutRc},
  stream::ResizeStream,
  subscribers::{ErasedHandler, Subscribers},
  subscription::ResizeSubscription,
};

struct State<E: ObservedElement> {
  /// Elements present here are exactly the elements registered with
  /// `platform`.
  handlers: HashMap<ElementKey, Subscribers<E>>,
  /// `None` once disconnected.
  platform: Option<Rc<dyn RawObserver<E>>>,
}

impl<E: ObservedElement> Drop for State<E> {
  fn drop(&mut self) {
    if let Some(platform) = self.platform.take() {
      platform.disconnect();
    }
  }
}

/// A shared, reference-counted resize observer for one [`BoxSize`].
///
/// Clones refer to the same observer; compare with [`ptr_eq`](Self::ptr_eq)
/// or `==`. Usually obtained from a
/// [`Registry`](crate::registry::Registry).
pub struct SharedResizeObserver<E: ObservedElement> {
  box_size: BoxSize,
  state: MutRc<State<E>>,
}

/// Non-owning handle held by subscriptions and by the platform callback.
pub(crate) struct WeakResizeObserver<E: ObservedElement> {
  box_size: BoxSize,
  state: WeakMutRc<State<E>>,
}

impl<E: ObservedElement> SharedResizeObserver<E> {
  /// Construct the platform observer through `implementation` and wrap it.
  ///
  /// Fails only if the platform constructor fails.
  pub fn new(box_size: BoxSize, implementation: &Implementation<E>) -> Result<Self> {
    let state = MutRc::own(State { handlers: HashMap::new(), platform: None });
    let weak = WeakResizeObserver { box_size, state: state.downgrade() };
    let platform = implementation.construct(Box::new(move |entries| dispatch(&weak, entries)))?;
    state.rc_deref_mut().platform = Some(Rc::from(platform));
    debug!(box_size = %box_size, implementation = implementation.name(), "shared resize observer created");
    Ok(Self { box_size, state })
  }

  #[inline]
  pub fn box_size(&self) -> BoxSize { self.box_size }

  /// Subscribe `handler` to size changes of `target`.
  ///
  /// The first handler for an element registers it with the platform
  /// observer, which then reports the element's current size at least once.
  /// Subscribing a handler that is already subscribed to `target` is a no-op
  /// and the handler keeps being called once per notification.
  ///
  /// The returned subscription removes exactly this `(target, handler)` pair.
  /// It does not keep the observer alive. On a disconnected observer nothing
  /// is registered and the subscription is already closed.
  pub fn observe<T>(&self, target: &T, handler: ResizeHandler<T>) -> ResizeSubscription<E>
  where
    T: TargetCast<E>,
  {
    let element = target.upcast();
    let key = element.element_key();
    let id = handler.id();

    let first = {
      let mut state = self.state.rc_deref_mut();
      let Some(platform) = state.platform.clone() else {
        warn!(box_size = %self.box_size, element = ?key, "observe on a disconnected resize observer");
        return ResizeSubscription::new(WeakResizeObserver::dangling(self.box_size), element, id);
      };
      match state.handlers.get_mut(&key) {
        Some(subscribers) if subscribers.contains(id) => None,
        Some(subscribers) => {
          subscribers.insert(id, erase(handler));
          None
        }
        None => {
          state.handlers.insert(key, Subscribers::with(id, erase(handler)));
          Some(platform)
        }
      }
    };

    if let Some(platform) = first {
      debug!(box_size = %self.box_size, element = ?key, "element registered with platform observer");
      platform.observe(&element, self.box_size);
    }

    ResizeSubscription::new(self.downgrade(), element, id)
  }

  /// Remove `handler` from `target`. Releases the platform observation when
  /// it was the last handler. Unknown pairs are ignored.
  pub fn unobserve<T>(&self, target: &T, handler: &ResizeHandler<T>)
  where
    T: TargetCast<E>,
  {
    self.remove(&target.upcast(), Some(handler.id()));
  }

  /// Remove every handler of `target` and release its platform observation.
  ///
  /// Call this when an element is taken out of the document for good and the
  /// individual subscriptions are not at hand.
  pub fn unobserve_all<T>(&self, target: &T)
  where
    T: TargetCast<E>,
  {
    self.remove(&target.upcast(), None);
  }

  /// Subscribe to `target` and receive its entries as a stream. Dropping the
  /// stream unsubscribes; disconnecting the observer ends the stream.
  pub fn observe_stream<T>(&self, target: &T) -> ResizeStream<T, E>
  where
    T: TargetCast<E>,
  {
    ResizeStream::new(self, target)
  }

  pub fn is_observing<T>(&self, target: &T) -> bool
  where
    T: TargetCast<E>,
  {
    self.handler_count(target) > 0
  }

  /// Number of distinct handlers currently subscribed to `target`.
  pub fn handler_count<T>(&self, target: &T) -> usize
  where
    T: TargetCast<E>,
  {
    let key = target.upcast().element_key();
    self.state.rc_deref().handlers.get(&key).map_or(0, Subscribers::len)
  }

  /// Number of elements registered with the platform observer.
  pub fn observed_len(&self) -> usize { self.state.rc_deref().handlers.len() }

  pub fn is_disconnected(&self) -> bool { self.state.rc_deref().platform.is_none() }

  /// Stop observing everything and release the platform observer.
  ///
  /// Irreversible: a disconnected observer ignores further `observe` calls.
  /// Get a fresh one from the registry after disposing this one.
  pub fn disconnect(&self) {
    let (platform, _handlers) = {
      let mut state = self.state.rc_deref_mut();
      (state.platform.take(), std::mem::take(&mut state.handlers))
    };
    // A dispatch in progress holds its own reference, so the platform
    // observer is dropped once that dispatch returns.
    if let Some(platform) = platform {
      debug!(box_size = %self.box_size, "shared resize observer disconnected");
      platform.disconnect();
    }
  }

  /// Disconnect automatically when the returned guard goes out of scope.
  ///
  /// **Attention:** binding the guard to `_` drops it, and disconnects,
  /// immediately.
  pub fn disconnect_when_dropped(self) -> DisconnectGuard<E> { DisconnectGuard(self) }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { self.state.ptr_eq(&other.state) }

  pub(crate) fn downgrade(&self) -> WeakResizeObserver<E> {
    WeakResizeObserver { box_size: self.box_size, state: self.state.downgrade() }
  }

  pub(crate) fn is_subscribed(&self, key: ElementKey, id: HandlerId) -> bool {
    self.state.rc_deref().handlers.get(&key).is_some_and(|s| s.contains(id))
  }

  /// Drop one handler (or all of them with `None`) from `element`.
  pub(crate) fn remove(&self, element: &E, id: Option<HandlerId>) {
    let key = element.element_key();
    // Handlers are dropped only after the borrow ends, their captures may
    // call back into this observer.
    let _removed;
    let _emptied;
    let released = {
      let mut state = self.state.rc_deref_mut();
      let Some(subscribers) = state.handlers.get_mut(&key) else {
        return;
      };
      if let Some(id) = id {
        _removed = subscribers.remove(id);
        if !subscribers.is_empty() {
          return;
        }
      }
      _emptied = state.handlers.remove(&key);
      state.platform.clone()
    };

    if let Some(platform) = released {
      debug!(box_size = %self.box_size, element = ?key, "element released from platform observer");
      platform.unobserve(element);
    }
  }
}

impl<E: ObservedElement> WeakResizeObserver<E> {
  /// A handle that never upgrades.
  pub(crate) fn dangling(box_size: BoxSize) -> Self { Self { box_size, state: WeakMutRc::new() } }

  pub(crate) fn upgrade(&self) -> Option<SharedResizeObserver<E>> {
    self.state.upgrade().map(|state| SharedResizeObserver { box_size: self.box_size, state })
  }
}

fn erase<E, T>(handler: ResizeHandler<T>) -> ErasedHandler<E>
where
  E: ObservedElement,
  T: TargetCast<E>,
{
  Rc::new(move |entry: &ResizeObserverEntry<E>| handler.call(&entry.map_target(T::downcast)))
}

/// Route one platform batch to the subscribed handlers.
fn dispatch<E: ObservedElement>(weak: &WeakResizeObserver<E>, entries: Vec<ResizeObserverEntry<E>>) {
  let Some(observer) = weak.upgrade() else {
    return;
  };
  trace!(box_size = %observer.box_size, entries = entries.len(), "resize batch");

  for entry in entries {
    let key = entry.target.element_key();
    let (platform, handlers) = {
      let state = observer.state.rc_deref();
      let Some(platform) = state.platform.clone() else {
        return;
      };
      (platform, state.handlers.get(&key).map(Subscribers::snapshot))
    };

    let Some(handlers) = handlers else {
      // The platform may still deliver an entry queued before the element
      // was released.
      debug!(box_size = %observer.box_size, element = ?key, "notification for unobserved element");
      platform.unobserve(&entry.target);
      continue;
    };

    for (id, handler) in handlers {
      // A handler earlier in this batch may have removed this one.
      if observer.is_subscribed(key, id) {
        handler(&entry);
      }
    }
  }
}

impl<E: ObservedElement> Clone for SharedResizeObserver<E> {
  fn clone(&self) -> Self { Self { box_size: self.box_size, state: self.state.clone() } }
}

impl<E: ObservedElement> PartialEq for SharedResizeObserver<E> {
  fn eq(&self, other: &Self) -> bool { self.ptr_eq(other) }
}

impl<E: ObservedElement> Eq for SharedResizeObserver<E> {}

impl<E: ObservedElement> fmt::Debug for SharedResizeObserver<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SharedResizeObserver")
      .field("box_size", &self.box_size)
      .field("observed", &self.observed_len())
      .field("disconnected", &self.is_disconnected())
      .finish()
  }
}

/// Disconnects its observer when dropped. See
/// [`SharedResizeObserver::disconnect_when_dropped`].
#[derive(Debug)]
#[must_use]
pub struct DisconnectGuard<E: ObservedElement>(SharedResizeObserver<E>);

impl<E: ObservedElement> std::ops::Deref for DisconnectGuard<E> {
  type Target = SharedResizeObserver<E>;

  fn deref(&self) -> &Self::Target { &self.0 }
}

impl<E: ObservedElement> Drop for DisconnectGuard<E> {
  fn drop(&mut self) { self.0.disconnect() }
}

#[cfg(test)]
mod tests {
  use std::cell::{Cell, RefCell};

  use float_cmp::approx_eq;

  use super::*;
  use crate::{
    fake::{FakeElement, FakePlatform},
    subscription::Subscription,
  };

  fn observer(platform: &FakePlatform, box_size: BoxSize) -> SharedResizeObserver<FakeElement> {
    SharedResizeObserver::new(box_size, &platform.implementation()).unwrap()
  }

  fn counter() -> (Rc<Cell<usize>>, ResizeHandler<FakeElement>) {
    let count = Rc::new(Cell::new(0));
    let c = count.clone();
    (count, ResizeHandler::new(move |_| c.set(c.get() + 1)))
  }

  /// Observe, then swallow the initial notification.
  fn settle(platform: &FakePlatform, counts: &[&Rc<Cell<usize>>]) {
    platform.flush();
    for c in counts {
      assert!(c.get() > 0, "initial notification missing");
      c.set(0);
    }
  }

  #[shared_resize_macro::test]
  fn handler_receives_new_size() {
    let platform = FakePlatform::default();
    let ro = observer(&platform, BoxSize::BorderBox);
    let element = FakeElement::new(200., 100.);
    let heights = Rc::new(RefCell::new(vec![]));
    let h = heights.clone();
    let _sub = ro.observe(
      &element,
      ResizeHandler::new(move |e| h.borrow_mut().push(e.size(BoxSize::BorderBox).unwrap().block_size)),
    );

    platform.flush();
    platform.resize(&element, 200., 110.);
    platform.flush();

    let heights = heights.borrow();
    assert_eq!(heights.len(), 2);
    assert!(approx_eq!(f64, heights[1], 110., ulps = 2));
  }

  #[shared_resize_macro::test]
  fn first_handler_registers_last_handler_releases() {
    let platform = FakePlatform::default();
    let ro = observer(&platform, BoxSize::ContentBox);
    let element = FakeElement::new(10., 10.);
    let (_, a) = counter();
    let (_, b) = counter();

    ro.observe(&element, a.clone());
    ro.observe(&element, b.clone());
    assert_eq!(platform.stats().observe_calls, 1);
    assert!(platform.is_observed(&element));
    assert_eq!(ro.handler_count(&element), 2);

    ro.unobserve(&element, &a);
    assert_eq!(platform.stats().unobserve_calls, 0);
    assert!(ro.is_observing(&element));

    ro.unobserve(&element, &b);
    assert_eq!(platform.stats().unobserve_calls, 1);
    assert!(!platform.is_observed(&element));
    assert_eq!(ro.observed_len(), 0);

    // over-unsubscription is tolerated
    ro.unobserve(&element, &b);
    assert_eq!(platform.stats().unobserve_calls, 1);
  }

  #[shared_resize_macro::test]
  fn duplicate_subscription_delivers_once() {
    let platform = FakePlatform::default();
    let ro = observer(&platform, BoxSize::BorderBox);
    let element = FakeElement::new(200., 100.);
    let (count, h) = counter();

    ro.observe(&element, h.clone());
    ro.observe(&element, h.clone());
    settle(&platform, &[&count]);
    assert_eq!(count.get(), 0);

    platform.resize(&element, 200., 110.);
    platform.flush();
    assert_eq!(count.get(), 1);

    // one unobserve removes the pair, however often it was subscribed
    ro.unobserve(&element, &h);
    assert!(!ro.is_observing(&element));
  }

  #[shared_resize_macro::test]
  fn subscription_removes_its_pair() {
    let platform = FakePlatform::default();
    let ro = observer(&platform, BoxSize::BorderBox);
    let element = FakeElement::new(200., 100.);
    let (c1, h1) = counter();
    let (c2, h2) = counter();

    let s1 = ro.observe(&element, h1);
    let s2 = ro.observe(&element, h2);
    settle(&platform, &[&c1, &c2]);

    s1.unsubscribe();
    assert!(!s2.is_closed());
    platform.resize(&element, 200., 110.);
    platform.flush();
    assert_eq!((c1.get(), c2.get()), (0, 1));
  }

  #[shared_resize_macro::test]
  fn handler_removed_mid_batch_is_skipped() {
    let platform = FakePlatform::default();
    let ro = observer(&platform, BoxSize::BorderBox);
    let element = FakeElement::new(1., 1.);
    let (count, victim) = counter();

    let first = {
      let ro = ro.clone();
      let victim = victim.clone();
      ResizeHandler::new(move |e: &ResizeObserverEntry<FakeElement>| ro.unobserve(e.target(), &victim))
    };
    ro.observe(&element, first);
    ro.observe(&element, victim);

    platform.flush();
    assert_eq!(count.get(), 0);
    assert_eq!(ro.handler_count(&element), 1);
  }

  #[shared_resize_macro::test]
  fn stale_notification_is_unobserved_again() {
    let platform = FakePlatform::default();
    let ro = observer(&platform, BoxSize::BorderBox);
    let element = FakeElement::new(1., 1.);
    let (count, h) = counter();

    ro.observe(&element, h).unsubscribe();
    assert_eq!(platform.stats().unobserve_calls, 1);

    platform.deliver_stale(&element);
    assert_eq!(count.get(), 0);
    assert_eq!(platform.stats().unobserve_calls, 2);
  }

  #[shared_resize_macro::test]
  fn disconnect_is_final() {
    let platform = FakePlatform::default();
    let ro = observer(&platform, BoxSize::BorderBox);
    let element = FakeElement::new(200., 100.);
    let (count, h) = counter();
    let sub = ro.observe(&element, h.clone());
    settle(&platform, &[&count]);

    ro.disconnect();
    assert!(ro.is_disconnected());
    assert!(sub.is_closed());
    assert_eq!(platform.stats().disconnect_calls, 1);

    platform.resize(&element, 200., 110.);
    platform.flush();
    assert_eq!(count.get(), 0);

    let late = ro.observe(&element, h);
    assert!(late.is_closed());
    assert_eq!(ro.observed_len(), 0);
    assert_eq!(platform.stats().observe_calls, 1);

    ro.disconnect();
    assert_eq!(platform.stats().disconnect_calls, 1);
  }

  #[shared_resize_macro::test]
  fn disconnect_from_inside_a_handler() {
    let platform = FakePlatform::default();
    let ro = observer(&platform, BoxSize::BorderBox);
    let (a, b) = (FakeElement::new(1., 1.), FakeElement::new(2., 2.));
    let (count, h) = counter();
    let stop = {
      let ro = ro.clone();
      ResizeHandler::new(move |_| ro.disconnect())
    };
    ro.observe(&a, stop);
    ro.observe(&b, h);

    platform.flush();
    assert!(ro.is_disconnected());
    assert_eq!(count.get(), 0);
  }

  #[shared_resize_macro::test]
  fn guard_disconnects_on_scope_exit() {
    let platform = FakePlatform::default();
    let ro = observer(&platform, BoxSize::BorderBox);
    {
      let guard = ro.clone().disconnect_when_dropped();
      guard.observe(&FakeElement::new(1., 1.), ResizeHandler::new(|_| {}));
      assert_eq!(ro.observed_len(), 1);
    }
    assert!(ro.is_disconnected());
  }

  #[shared_resize_macro::test]
  fn dropping_last_handle_disconnects_platform() {
    let platform = FakePlatform::default();
    let ro = observer(&platform, BoxSize::BorderBox);
    let element = FakeElement::new(1., 1.);
    let sub = ro.observe(&element, ResizeHandler::new(|_| {}));

    drop(ro);
    assert_eq!(platform.stats().disconnect_calls, 1);
    assert!(sub.is_closed());
    sub.unsubscribe();
  }

  #[shared_resize_macro::test]
  fn unobserve_all_releases_element() {
    let platform = FakePlatform::default();
    let ro = observer(&platform, BoxSize::BorderBox);
    let element = FakeElement::new(1., 1.);
    ro.observe(&element, ResizeHandler::new(|_| {}));
    ro.observe(&element, ResizeHandler::new(|_| {}));

    ro.unobserve_all(&element);
    assert!(!ro.is_observing(&element));
    assert!(!platform.is_observed(&element));
    assert_eq!(platform.stats().unobserve_calls, 1);
  }

  #[shared_resize_macro::test]
  fn stale_subscription_leaves_a_later_handler_alone() {
    let platform = FakePlatform::default();
    let ro = observer(&platform, BoxSize::BorderBox);
    let element = FakeElement::new(200., 100.);

    let stale = {
      let (_, old) = counter();
      let sub = ro.observe(&element, old);
      ro.unobserve_all(&element);
      sub
    };
    assert!(stale.is_closed());

    // the removed handler is gone; a new one may reuse its allocation
    let (count, fresh) = counter();
    let current = ro.observe(&element, fresh);
    settle(&platform, &[&count]);
    assert!(stale.is_closed());

    stale.unsubscribe();
    assert!(!current.is_closed());
    assert!(ro.is_observing(&element));
    assert!(platform.is_observed(&element));
    assert_eq!(platform.stats().unobserve_calls, 1);

    platform.resize(&element, 200., 120.);
    platform.flush();
    assert_eq!(count.get(), 1);
  }
}
