//! At most one shared observer per box size.
//!
//! A [`Registry`] is the piece unrelated call sites share: each asks it for
//! the observer of the box size it needs and gets the same instance back until
//! that box size is disposed.
//!
//! The registry is plain state with an owner rather than a hidden global, so
//! tests can build one per case. On the web there is also a thread-local
//! instance over the native `ResizeObserver`, see `web::with_singleton`.

use std::cell::RefCell;

use tracing::debug;

use crate::{
  box_size::BoxSize,
  element::ObservedElement,
  error::Result,
  platform::Implementation,
  shared_observer::SharedResizeObserver,
};

type Slots<E> = [Option<SharedResizeObserver<E>>; 3];

pub struct Registry<E: ObservedElement> {
  native: Implementation<E>,
  /// Polyfill override, read when an observer is constructed.
  implementation: RefCell<Option<Implementation<E>>>,
  instances: RefCell<Slots<E>>,
}

impl<E: ObservedElement> Registry<E> {
  /// A registry that builds its observers with `native` unless an override
  /// is registered.
  pub fn new(native: Implementation<E>) -> Self {
    Self { native, implementation: RefCell::new(None), instances: RefCell::new([None, None, None]) }
  }

  /// The observer for `box_size`, constructed on first use.
  ///
  /// Repeated calls without a [`dispose`](Self::dispose) in between return
  /// the same instance. Fails only if the platform constructor fails, in
  /// which case the slot stays empty.
  pub fn get_instance(&self, box_size: BoxSize) -> Result<SharedResizeObserver<E>> {
    if let Some(observer) = self.instance(box_size) {
      return Ok(observer);
    }

    let implementation = self.current_implementation();
    let observer = SharedResizeObserver::new(box_size, &implementation)?;

    let mut instances = self.instances.borrow_mut();
    let slot = &mut instances[box_size.index()];
    // The platform constructor may have re-entered the registry.
    if let Some(existing) = slot.clone() {
      drop(instances);
      observer.disconnect();
      return Ok(existing);
    }
    *slot = Some(observer.clone());
    Ok(observer)
  }

  /// [`get_instance`](Self::get_instance) for the default box size,
  /// [`BoxSize::BorderBox`].
  #[inline]
  pub fn get_default_instance(&self) -> Result<SharedResizeObserver<E>> {
    self.get_instance(BoxSize::default())
  }

  /// The live observer for `box_size`, without constructing one.
  pub fn instance(&self, box_size: BoxSize) -> Option<SharedResizeObserver<E>> {
    self.instances.borrow()[box_size.index()].clone()
  }

  /// Number of box sizes with a live observer.
  pub fn live_count(&self) -> usize { self.instances.borrow().iter().flatten().count() }

  /// Disconnect and forget the observer for `box_size`, or for every box
  /// size with `None`. Empty slots are ignored.
  ///
  /// Handles that callers still hold stay disconnected; the next
  /// `get_instance` builds a fresh observer.
  pub fn dispose(&self, box_size: Option<BoxSize>) {
    let disposed: Vec<_> = {
      let mut instances = self.instances.borrow_mut();
      match box_size {
        Some(box_size) => instances[box_size.index()].take().into_iter().collect(),
        None => instances.iter_mut().filter_map(Option::take).collect(),
      }
    };
    for observer in disposed {
      debug!(box_size = %observer.box_size(), "shared resize observer disposed");
      observer.disconnect();
    }
  }

  /// Set or clear the implementation used for observers constructed from now
  /// on. Observers that already exist keep the implementation they were
  /// built with.
  pub fn register_implementation(&self, implementation: Option<Implementation<E>>) {
    debug!(
      implementation = implementation.as_ref().map_or(self.native.name(), Implementation::name),
      "resize observer implementation registered"
    );
    *self.implementation.borrow_mut() = implementation;
  }

  /// The implementation the next constructed observer will use.
  pub fn current_implementation(&self) -> Implementation<E> {
    self.implementation.borrow().clone().unwrap_or_else(|| self.native.clone())
  }
}

impl<E: ObservedElement> Drop for Registry<E> {
  fn drop(&mut self) { self.dispose(None) }
}
