//! Browser backend over `web_sys::ResizeObserver`.
//!
//! ```rust,ignore
//! use shared_resize_observer::{prelude::*, web};
//! use web_sys::HtmlCanvasElement;
//!
//! let observer = web::with_singleton(|r| r.get_instance(BoxSize::DevicePixelContentBox))?;
//! let _guard = observer
//!   .observe(&canvas, ResizeHandler::new(|entry: &ResizeObserverEntry<HtmlCanvasElement>| {
//!     let size = entry.size(BoxSize::DevicePixelContentBox).unwrap_or_default();
//!     entry.target().set_width(size.inline_size as u32);
//!     entry.target().set_height(size.block_size as u32);
//!   }))
//!   .unsubscribe_when_dropped();
//! ```

use std::cell::Cell;

use js_sys::{Array, Function, Reflect, WeakMap};
use smallvec::SmallVec;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Element, ResizeObserverBoxOptions, ResizeObserverOptions};

use crate::{
  box_size::BoxSize,
  element::{ElementKey, ObservedElement, TargetCast},
  entry::{DomRect, Fragments, ResizeObserverEntry, ResizeObserverSize},
  error::{Error, Result},
  platform::{Implementation, RawObserver, ResizeCallback},
  registry::Registry,
};

thread_local! {
  /// Identity tokens, held weakly so they never keep an element alive.
  static ELEMENT_KEYS: WeakMap = WeakMap::new();
  static NEXT_KEY: Cell<u64> = const { Cell::new(1) };
  static SINGLETON: Registry<Element> = Registry::new(native());
}

impl ObservedElement for Element {
  fn element_key(&self) -> ElementKey {
    ELEMENT_KEYS.with(|keys| {
      if let Some(key) = keys.get(self).as_f64() {
        return ElementKey(key as u64);
      }
      let key = NEXT_KEY.with(|next| next.replace(next.get() + 1));
      keys.set(self, &JsValue::from_f64(key as f64));
      ElementKey(key)
    })
  }
}

impl<T> TargetCast<Element> for T
where
  T: JsCast + AsRef<Element> + Clone + 'static,
{
  fn upcast(&self) -> Element { self.as_ref().clone() }

  fn downcast(element: &Element) -> Self { element.clone().unchecked_into() }
}

/// Run `f` with this thread's registry over the native `ResizeObserver`.
pub fn with_singleton<R>(f: impl FnOnce(&Registry<Element>) -> R) -> R { SINGLETON.with(f) }

/// Install a polyfill constructor for observers the singleton builds from
/// now on, or go back to the native one with `None`. Must run before the
/// first `get_instance` to affect every box size.
pub fn register_implementation(constructor: Option<Function>) {
  with_singleton(|registry| registry.register_implementation(constructor.map(polyfill)));
}

/// The browser's own `ResizeObserver`.
pub fn native() -> Implementation<Element> {
  Implementation::new("native", |callback| {
    let closure = closure(callback);
    let observer = web_sys::ResizeObserver::new(closure.as_ref().unchecked_ref()).map_err(js_error)?;
    Ok(Box::new(WebObserver { observer, _closure: closure }) as Box<dyn RawObserver<Element>>)
  })
}

/// A JS class with the `ResizeObserver` shape, e.g. a polyfill.
pub fn polyfill(constructor: Function) -> Implementation<Element> {
  Implementation::new("polyfill", move |callback| {
    let closure = closure(callback);
    let observer = Reflect::construct(&constructor, &Array::of1(closure.as_ref()))
      .map_err(js_error)?
      .unchecked_into::<web_sys::ResizeObserver>();
    Ok(Box::new(WebObserver { observer, _closure: closure }) as Box<dyn RawObserver<Element>>)
  })
}

type JsCallback = Closure<dyn FnMut(Array)>;

struct WebObserver {
  observer: web_sys::ResizeObserver,
  _closure: JsCallback,
}

impl RawObserver<Element> for WebObserver {
  fn observe(&self, target: &Element, box_size: BoxSize) {
    let options = ResizeObserverOptions::new();
    options.set_box(box_options(box_size));
    self.observer.observe_with_options(target, &options);
  }

  fn unobserve(&self, target: &Element) { self.observer.unobserve(target) }

  fn disconnect(&self) { self.observer.disconnect() }
}

impl Drop for WebObserver {
  fn drop(&mut self) { self.observer.disconnect() }
}

fn closure(mut callback: ResizeCallback<Element>) -> JsCallback {
  Closure::new(move |entries: Array| {
    callback(
      entries.iter().map(|entry| convert(entry.unchecked_into::<web_sys::ResizeObserverEntry>())).collect(),
    )
  })
}

fn box_options(box_size: BoxSize) -> ResizeObserverBoxOptions {
  match box_size {
    BoxSize::BorderBox => ResizeObserverBoxOptions::BorderBox,
    BoxSize::ContentBox => ResizeObserverBoxOptions::ContentBox,
    BoxSize::DevicePixelContentBox => ResizeObserverBoxOptions::DevicePixelContentBox,
  }
}

fn convert(entry: web_sys::ResizeObserverEntry) -> ResizeObserverEntry<Element> {
  let rect = entry.content_rect();
  ResizeObserverEntry {
    target: entry.target(),
    content_rect: DomRect::new(rect.x(), rect.y(), rect.width(), rect.height()),
    border_box_size: fragments(entry.border_box_size()),
    content_box_size: fragments(entry.content_box_size()),
    device_pixel_content_box_size: fragments(entry.device_pixel_content_box_size()),
  }
}

// Older engines and some polyfills leave the size lists undefined.
fn fragments(sizes: Array) -> Fragments {
  if sizes.is_undefined() || sizes.is_null() {
    return SmallVec::new();
  }
  sizes
    .iter()
    .map(|size| {
      let size = size.unchecked_into::<web_sys::ResizeObserverSize>();
      ResizeObserverSize::new(size.inline_size(), size.block_size())
    })
    .collect()
}

fn js_error(err: JsValue) -> Error {
  Error::Platform(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}
