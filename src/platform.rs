//! The contract a platform resize observer has to meet.
//!
//! A native browser `ResizeObserver`, a polyfill and the in-memory
//! [`fake`](crate::fake) backend all plug in through [`Implementation`].

use std::{fmt, rc::Rc};

use crate::{box_size::BoxSize, element::ObservedElement, entry::ResizeObserverEntry, error::Result};

/// Batched notification callback handed to the platform at construction.
pub type ResizeCallback<E> = Box<dyn FnMut(Vec<ResizeObserverEntry<E>>)>;

/// One platform observer instance.
///
/// Faults raised by the platform (e.g. an invalid element) are not caught
/// here; they indicate programmer error and surface however the platform
/// surfaces them.
pub trait RawObserver<E: ObservedElement> {
  fn observe(&self, target: &E, box_size: BoxSize);

  fn unobserve(&self, target: &E);

  fn disconnect(&self);
}

type Construct<E> = dyn Fn(ResizeCallback<E>) -> Result<Box<dyn RawObserver<E>>>;

/// A platform observer constructor.
///
/// Cloning shares the constructor. A registry reads its current
/// implementation once per shared observer it builds.
pub struct Implementation<E: ObservedElement> {
  name: &'static str,
  construct: Rc<Construct<E>>,
}

impl<E: ObservedElement> Implementation<E> {
  pub fn new<F>(name: &'static str, construct: F) -> Self
  where
    F: Fn(ResizeCallback<E>) -> Result<Box<dyn RawObserver<E>>> + 'static,
  {
    Self { name, construct: Rc::new(construct) }
  }

  #[inline]
  pub fn name(&self) -> &'static str { self.name }

  pub fn construct(&self, callback: ResizeCallback<E>) -> Result<Box<dyn RawObserver<E>>> {
    (self.construct)(callback)
  }
}

impl<E: ObservedElement> Clone for Implementation<E> {
  fn clone(&self) -> Self { Self { name: self.name, construct: self.construct.clone() } }
}

impl<E: ObservedElement> fmt::Debug for Implementation<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Implementation").field("name", &self.name).finish()
  }
}
