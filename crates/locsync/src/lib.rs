//! Location selection and nearest-branch detection engine.
//!
//! `SelectionStore` owns the current location; `DisplaySynchronizer` keeps
//! every registered page target in line with it; `ProximityDetector` offers
//! the nearest branch through a `NotificationChannel`.  `App` wires them into
//! one event loop.

pub mod action;
pub mod app;
pub mod coalesce;
pub mod display;
pub mod geolocation;
pub mod notify;
pub mod proximity;
pub mod selection;
pub mod viewport;
