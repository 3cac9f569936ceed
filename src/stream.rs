//! Resize notifications as a `futures::Stream`.
//!
//! ```rust
//! use futures::{executor::block_on, StreamExt};
//! use shared_resize_observer::prelude::*;
//!
//! let platform = FakePlatform::default();
//! let registry = Registry::new(platform.implementation());
//! let observer = registry.get_instance(BoxSize::ContentBox).unwrap();
//!
//! let element = FakeElement::new(320., 200.);
//! let mut sizes = observer.observe_stream(&element);
//! platform.flush();
//!
//! let entry = block_on(sizes.next()).unwrap();
//! assert_eq!(entry.size(BoxSize::ContentBox).unwrap().inline_size, 320.);
//! ```

use std::{
  pin::Pin,
  task::{Context, Poll},
};

use futures::{
  channel::mpsc::{unbounded, UnboundedReceiver},
  Stream,
};
use pin_project_lite::pin_project;

use crate::{
  element::{ObservedElement, TargetCast},
  entry::ResizeObserverEntry,
  handler::ResizeHandler,
  shared_observer::SharedResizeObserver,
  subscription::{ResizeSubscription, Subscription, SubscriptionGuard},
};

pin_project! {
  /// Entries for one element, in delivery order.
  ///
  /// Created by
  /// [`SharedResizeObserver::observe_stream`](crate::shared_observer::SharedResizeObserver::observe_stream).
  /// Ends when the observer disconnects. Entries are buffered without bound
  /// until polled.
  pub struct ResizeStream<T, E: ObservedElement> {
    #[pin]
    receiver: UnboundedReceiver<ResizeObserverEntry<T>>,
    subscription: SubscriptionGuard<ResizeSubscription<E>>,
  }
}

impl<T, E> ResizeStream<T, E>
where
  E: ObservedElement,
  T: TargetCast<E>,
{
  pub(crate) fn new(observer: &SharedResizeObserver<E>, target: &T) -> Self {
    let (sender, receiver) = unbounded();
    // Each stream gets its own handler, so two streams on one element are
    // two subscriptions.
    let handler = ResizeHandler::new(move |entry: &ResizeObserverEntry<T>| {
      // The receiver only goes away together with the subscription.
      let _ = sender.unbounded_send(entry.clone());
    });
    let subscription = observer.observe(target, handler).unsubscribe_when_dropped();
    Self { receiver, subscription }
  }

  pub fn is_closed(&self) -> bool { self.subscription.is_closed() }
}

impl<T, E: ObservedElement> Stream for ResizeStream<T, E> {
  type Item = ResizeObserverEntry<T>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    self.project().receiver.poll_next(cx)
  }

  fn size_hint(&self) -> (usize, Option<usize>) { self.receiver.size_hint() }
}

#[cfg(test)]
mod tests {
  use futures::{executor::block_on, StreamExt};

  use super::*;
  use crate::{
    box_size::BoxSize,
    fake::{FakeElement, FakePlatform},
  };

  #[shared_resize_macro::test]
  fn yields_entries_and_ends_on_disconnect() {
    let platform = FakePlatform::default();
    let ro = SharedResizeObserver::new(BoxSize::BorderBox, &platform.implementation()).unwrap();
    let element = FakeElement::new(100., 50.);
    let mut stream = ro.observe_stream(&element);

    platform.flush();
    platform.resize(&element, 120., 50.);
    platform.flush();
    ro.disconnect();

    let widths: Vec<_> = block_on(
      stream.by_ref().map(|e| e.size(BoxSize::BorderBox).unwrap().inline_size).collect::<Vec<_>>(),
    );
    assert_eq!(widths, vec![100., 120.]);
    assert!(stream.is_closed());
  }

  #[shared_resize_macro::test]
  fn dropping_the_stream_unsubscribes() {
    let platform = FakePlatform::default();
    let ro = SharedResizeObserver::new(BoxSize::BorderBox, &platform.implementation()).unwrap();
    let element = FakeElement::new(100., 50.);
    let stream = ro.observe_stream(&element);
    assert!(ro.is_observing(&element));

    drop(stream);
    assert!(!ro.is_observing(&element));
    assert!(!platform.is_observed(&element));
  }
}
