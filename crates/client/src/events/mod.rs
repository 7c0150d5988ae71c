//! Host event hooks that do not touch the cache.
//!
//! Each hook turns a host event into a directive the host renders or acts on:
//! a notification to show, a window to open, a sync task to run.

pub mod notification;
pub mod push;
pub mod sync;

pub use notification::{ClickDirective, ENTRY_DOCUMENT, route_click};
pub use push::{NotificationAction, NotificationData, NotificationDirective, NotificationOptions, build_notification};
pub use sync::{BACKGROUND_SYNC_TAG, LoggingSyncHandler, SyncHandler, SyncOutcome, dispatch};
