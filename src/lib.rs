//! # shared-resize-observer
//!
//! One platform `ResizeObserver` per box size, multiplexed across every
//! element and handler that needs it.
//!
//! Creating a `ResizeObserver` per component is expensive. This crate keeps
//! a [`Registry`] with at most one [`SharedResizeObserver`] per [`BoxSize`];
//! each shared observer registers an element with the platform once, when
//! its first handler arrives, and releases it when the last one leaves.
//!
//! ## Quick Start
//!
//! ```rust
//! use shared_resize_observer::prelude::*;
//!
//! // A deterministic in-memory platform; in the browser use `web::with_singleton`.
//! let platform = FakePlatform::default();
//! let registry = Registry::new(platform.implementation());
//!
//! let observer = registry.get_instance(BoxSize::BorderBox).unwrap();
//! assert!(observer.ptr_eq(&registry.get_instance(BoxSize::BorderBox).unwrap()));
//!
//! let element = FakeElement::new(200., 100.);
//! let subscription = observer.observe(
//!   &element,
//!   ResizeHandler::new(|entry| println!("now {:?}", entry.size(BoxSize::BorderBox))),
//! );
//!
//! platform.resize(&element, 200., 110.);
//! platform.flush();
//! subscription.unsubscribe();
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Registry`] | Keeps at most one shared observer per box size |
//! | [`SharedResizeObserver`] | One platform observer fanned out to many handlers |
//! | [`ResizeHandler`] | A callback with identity; the same handler is deduplicated |
//! | [`ResizeSubscription`] | Removes exactly one `(element, handler)` pair |
//! | [`Implementation`] | A platform observer constructor (native, polyfill, fake) |
//!
//! ## Feature Flags
//!
//! - **`web`** (default): the `web` module over `web_sys::ResizeObserver`,
//!   compiled on `wasm32` only.
//!
//! [`Registry`]: registry::Registry
//! [`SharedResizeObserver`]: shared_observer::SharedResizeObserver
//! [`BoxSize`]: box_size::BoxSize
//! [`ResizeHandler`]: handler::ResizeHandler
//! [`ResizeSubscription`]: subscription::ResizeSubscription
//! [`Implementation`]: platform::Implementation

pub mod box_size;
pub mod element;
pub mod entry;
pub mod error;
pub mod fake;
pub mod handler;
pub mod platform;
pub mod prelude;
pub mod rc;
pub mod registry;
pub mod shared_observer;
pub mod stream;
mod subscribers;
pub mod subscription;
#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub mod web;

pub use prelude::*;
