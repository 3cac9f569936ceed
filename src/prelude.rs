//! Prelude module for convenient imports

pub use crate::{
  box_size::BoxSize,
  element::{ElementKey, ObservedElement, TargetCast},
  entry::{DomRect, ResizeObserverEntry, ResizeObserverSize},
  error::{Error, Result},
  fake::{FakeElement, FakePlatform, FakeStats},
  handler::ResizeHandler,
  platform::{Implementation, RawObserver, ResizeCallback},
  registry::Registry,
  shared_observer::{DisconnectGuard, SharedResizeObserver},
  stream::ResizeStream,
  subscription::{ResizeSubscription, Subscription, SubscriptionGuard},
};
