//! An in-memory platform for tests and non-browser hosts.
//!
//! [`FakePlatform`] behaves like a browser `ResizeObserver` whose layout
//! passes only happen when you call [`FakePlatform::flush`]:
//!
//! - registering an element queues its initial notification;
//! - [`FakePlatform::resize`] queues a notification for every observer
//!   watching the element;
//! - `flush` delivers each observer's queue as one batch, skipping elements
//!   whose size in the observed box did not change since they were last
//!   reported.
//!
//! Every call the shared observer makes into the platform is counted in
//! [`FakeStats`], so tests can check that an element is registered exactly
//! once and released exactly once.

use std::{
  cell::Cell,
  fmt,
  rc::Rc,
  sync::atomic::{AtomicU64, Ordering},
};

use smallvec::smallvec;

use crate::{
  box_size::BoxSize,
  element::{ElementKey, ObservedElement, TargetCast},
  entry::{DomRect, ResizeObserverEntry, ResizeObserverSize},
  platform::{Implementation, RawObserver, ResizeCallback},
  rc::{MutRc, RcDeref, RcDerefMut, WeakMutRc},
};

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// A fake element with a border box size and uniform padding.
///
/// Clones are the same element.
#[derive(Clone)]
pub struct FakeElement(Rc<ElementInner>);

struct ElementInner {
  key: ElementKey,
  size: Cell<(f64, f64)>,
  padding: Cell<f64>,
}

impl FakeElement {
  pub fn new(width: f64, height: f64) -> Self {
    Self(Rc::new(ElementInner {
      key: ElementKey(NEXT_KEY.fetch_add(1, Ordering::Relaxed)),
      size: Cell::new((width, height)),
      padding: Cell::new(0.),
    }))
  }

  pub fn with_padding(self, padding: f64) -> Self {
    self.0.padding.set(padding);
    self
  }

  pub fn width(&self) -> f64 { self.0.size.get().0 }

  pub fn height(&self) -> f64 { self.0.size.get().1 }

  pub fn padding(&self) -> f64 { self.0.padding.get() }

  /// Change the size without notifying anyone. Use
  /// [`FakePlatform::resize`] to get notifications.
  pub fn set_size(&self, width: f64, height: f64) { self.0.size.set((width, height)) }

  pub fn border_box(&self) -> ResizeObserverSize { ResizeObserverSize::new(self.width(), self.height()) }

  pub fn content_box(&self) -> ResizeObserverSize {
    let p = 2. * self.padding();
    ResizeObserverSize::new((self.width() - p).max(0.), (self.height() - p).max(0.))
  }
}

impl ObservedElement for FakeElement {
  fn element_key(&self) -> ElementKey { self.0.key }
}

impl TargetCast<FakeElement> for FakeElement {
  fn upcast(&self) -> FakeElement { self.clone() }

  fn downcast(element: &FakeElement) -> Self { element.clone() }
}

impl PartialEq for FakeElement {
  fn eq(&self, other: &Self) -> bool { self.0.key == other.0.key }
}

impl Eq for FakeElement {}

impl fmt::Debug for FakeElement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FakeElement")
      .field("key", &self.0.key.0)
      .field("width", &self.width())
      .field("height", &self.height())
      .finish()
  }
}

/// Calls made into a [`FakePlatform`], summed over all its observers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FakeStats {
  pub constructed: usize,
  pub observe_calls: usize,
  pub unobserve_calls: usize,
  pub disconnect_calls: usize,
}

/// Factory and driver for fake platform observers. Clones share state.
#[derive(Clone)]
pub struct FakePlatform(MutRc<PlatformState>);

struct PlatformState {
  observers: Vec<WeakMutRc<ObserverState>>,
  stats: FakeStats,
  device_pixel_ratio: f64,
}

struct Observation {
  element: FakeElement,
  box_size: BoxSize,
  last_reported: Option<ResizeObserverSize>,
}

struct ObserverState {
  /// Taken out while it runs.
  callback: Option<ResizeCallback<FakeElement>>,
  observations: Vec<Observation>,
  pending: Vec<ElementKey>,
}

struct FakeObserver {
  state: MutRc<ObserverState>,
  platform: FakePlatform,
}

impl Default for FakePlatform {
  fn default() -> Self {
    Self(MutRc::own(PlatformState {
      observers: vec![],
      stats: FakeStats::default(),
      device_pixel_ratio: 1.,
    }))
  }
}

impl FakePlatform {
  /// Scale factor between content box and device-pixel content box.
  pub fn with_device_pixel_ratio(self, ratio: f64) -> Self {
    self.0.rc_deref_mut().device_pixel_ratio = ratio;
    self
  }

  /// A constructor producing observers driven by this platform.
  pub fn implementation(&self) -> Implementation<FakeElement> {
    let platform = self.clone();
    Implementation::new("fake", move |callback| {
      let state = MutRc::own(ObserverState {
        callback: Some(callback),
        observations: vec![],
        pending: vec![],
      });
      {
        let mut inner = platform.0.rc_deref_mut();
        inner.stats.constructed += 1;
        inner.observers.retain(|o| o.upgrade().is_some());
        inner.observers.push(state.downgrade());
      }
      let observer: Box<dyn RawObserver<FakeElement>> =
        Box::new(FakeObserver { state, platform: platform.clone() });
      Ok(observer)
    })
  }

  /// Resize `element` and queue a notification for every observer watching
  /// it.
  pub fn resize(&self, element: &FakeElement, width: f64, height: f64) {
    element.set_size(width, height);
    let key = element.element_key();
    for observer in self.live_observers() {
      let mut state = observer.rc_deref_mut();
      if state.observations.iter().any(|o| o.element.element_key() == key) {
        queue(&mut state.pending, key);
      }
    }
  }

  /// Run one layout pass: every observer receives its queued notifications
  /// as one batch. Notifications queued by handlers during the pass wait for
  /// the next `flush`. Returns the number of entries delivered.
  pub fn flush(&self) -> usize {
    let ratio = self.device_pixel_ratio();
    self.live_observers().into_iter().map(|observer| deliver(&observer, ratio)).sum()
  }

  /// Deliver a notification for `element` to every live observer whether or
  /// not it still watches the element, like an entry the browser queued just
  /// before the element was unobserved.
  pub fn deliver_stale(&self, element: &FakeElement) {
    let ratio = self.device_pixel_ratio();
    for observer in self.live_observers() {
      invoke(&observer, vec![entry_for(element, ratio)]);
    }
  }

  pub fn stats(&self) -> FakeStats { self.0.rc_deref().stats }

  /// Whether any live observer currently watches `element`.
  pub fn is_observed(&self, element: &FakeElement) -> bool {
    let key = element.element_key();
    self
      .live_observers()
      .iter()
      .any(|o| o.rc_deref().observations.iter().any(|obs| obs.element.element_key() == key))
  }

  pub fn device_pixel_ratio(&self) -> f64 { self.0.rc_deref().device_pixel_ratio }

  fn live_observers(&self) -> Vec<MutRc<ObserverState>> {
    self.0.rc_deref().observers.iter().filter_map(WeakMutRc::upgrade).collect()
  }

  fn record(&self, f: impl FnOnce(&mut FakeStats)) { f(&mut self.0.rc_deref_mut().stats) }
}

impl RawObserver<FakeElement> for FakeObserver {
  fn observe(&self, target: &FakeElement, box_size: BoxSize) {
    self.platform.record(|s| s.observe_calls += 1);
    let key = target.element_key();
    let mut state = self.state.rc_deref_mut();
    match state.observations.iter_mut().find(|o| o.element.element_key() == key) {
      Some(existing) => existing.box_size = box_size,
      None => state.observations.push(Observation {
        element: target.clone(),
        box_size,
        last_reported: None,
      }),
    }
    queue(&mut state.pending, key);
  }

  fn unobserve(&self, target: &FakeElement) {
    self.platform.record(|s| s.unobserve_calls += 1);
    let key = target.element_key();
    let mut state = self.state.rc_deref_mut();
    state.observations.retain(|o| o.element.element_key() != key);
    state.pending.retain(|k| *k != key);
  }

  fn disconnect(&self) {
    self.platform.record(|s| s.disconnect_calls += 1);
    let mut state = self.state.rc_deref_mut();
    state.observations.clear();
    state.pending.clear();
  }
}

fn queue(pending: &mut Vec<ElementKey>, key: ElementKey) {
  if !pending.contains(&key) {
    pending.push(key);
  }
}

fn deliver(observer: &MutRc<ObserverState>, ratio: f64) -> usize {
  let entries: Vec<_> = {
    let mut state = observer.rc_deref_mut();
    let pending = std::mem::take(&mut state.pending);
    pending
      .into_iter()
      .filter_map(|key| {
        let obs = state.observations.iter_mut().find(|o| o.element.element_key() == key)?;
        let entry = entry_for(&obs.element, ratio);
        let size = entry.size(obs.box_size);
        if obs.last_reported == size {
          return None;
        }
        obs.last_reported = size;
        Some(entry)
      })
      .collect()
  };
  if entries.is_empty() {
    return 0;
  }
  invoke(observer, entries)
}

/// Call the observer's callback without holding a borrow of its state, so
/// handlers can observe and unobserve freely.
fn invoke(observer: &MutRc<ObserverState>, entries: Vec<ResizeObserverEntry<FakeElement>>) -> usize {
  // `None` means a handler is flushing from inside this observer's callback.
  let Some(mut callback) = observer.rc_deref_mut().callback.take() else {
    return 0;
  };
  let delivered = entries.len();
  callback(entries);
  observer.rc_deref_mut().callback = Some(callback);
  delivered
}

fn entry_for(element: &FakeElement, ratio: f64) -> ResizeObserverEntry<FakeElement> {
  let content = element.content_box();
  let device = ResizeObserverSize::new(
    (content.inline_size * ratio).round(),
    (content.block_size * ratio).round(),
  );
  ResizeObserverEntry {
    target: element.clone(),
    content_rect: DomRect::new(
      element.padding(),
      element.padding(),
      content.inline_size,
      content.block_size,
    ),
    border_box_size: smallvec![element.border_box()],
    content_box_size: smallvec![content],
    device_pixel_content_box_size: smallvec![device],
  }
}
