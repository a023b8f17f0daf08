//! # blockbox-runtime
//!
//! Client-side behaviors for containers rendered by `blockbox-core`:
//! collapse/expand with persisted state, copy-to-clipboard, and screenshots.
//!
//! Browser facilities (storage, clipboard, capture libraries, downloads,
//! toasts) are reached through traits so hosts can plug in their own
//! bindings and tests can use in-memory fakes.

pub mod binder;
pub mod busy;
pub mod clipboard;
pub mod collapse;
pub mod config;
pub mod error;
pub mod runtime;
pub mod screenshot;
pub mod storage;
pub mod toast;

pub use binder::{bind_all, ContainerBinding};
pub use busy::{BusyAction, BusyGuard, BusySet};
pub use clipboard::{Blob, Clipboard, ClipboardImage, CopyAction, CopyOutcome, LegacyCopy};
pub use collapse::{ClickPath, CollapseController, SlideAnimation, SlideDirection};
pub use config::RuntimeConfig;
pub use error::{RuntimeError, RuntimeResult};
pub use runtime::{BlockboxRuntime, RuntimeHost};
pub use screenshot::{
    CanvasHost, CaptureLibraryHost, CaptureStrategy, Downloader, ElementMetrics, ForeignObjectStrategy,
    LibraryStrategy, Platform, ScreenshotAction, ScreenshotOutcome, StrategyKind,
};
pub use storage::{KeyValueStore, MemoryStore};
pub use toast::{Notifier, Toast, ToastKind, ToastLog};
