//! Thread-local capture of backend-reported failures.
//!
//! The runtime is driven without unwinding across the FFI boundary: instead
//! of raising, a failing backend call hands its message and code to
//! [`report`]. An [`ErrorScope`] is the single receiver for those reports on
//! the current thread while it is alive, and only the first report it sees is
//! kept.
//!
//! ```
//! use gdort_onnx::{report, ErrorScope};
//!
//! let scope = ErrorScope::new();
//! report("bad shape", 7);
//! report("also bad", 9);
//! assert_eq!(scope.code(), Some(7));
//! assert_eq!(scope.message().as_deref(), Some("bad shape"));
//! ```

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::OnnxError;

/// One captured backend failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub message: String,
    pub code: i32,
}

type Slot = Rc<RefCell<Option<ErrorInfo>>>;

struct Receiver {
    id: u64,
    slot: Slot,
}

thread_local! {
    static ACTIVE: RefCell<Option<Receiver>> = const { RefCell::new(None) };
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Scoped receiver for backend failures on the calling thread.
///
/// Creating a scope replaces whatever receiver was active. Dropping a scope
/// that is no longer the active receiver is a sequencing bug and panics.
pub struct ErrorScope {
    id: u64,
    slot: Slot,
    // Bound to the thread whose receiver slot it occupies.
    _not_send: PhantomData<*const ()>,
}

impl ErrorScope {
    /// Installs a new receiver for the current thread.
    pub fn new() -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let slot: Slot = Rc::new(RefCell::new(None));
        ACTIVE.with(|active| {
            *active.borrow_mut() = Some(Receiver {
                id,
                slot: Rc::clone(&slot),
            });
        });
        Self {
            id,
            slot,
            _not_send: PhantomData,
        }
    }

    pub fn has_error(&self) -> bool {
        self.slot.borrow().is_some()
    }

    pub fn message(&self) -> Option<String> {
        self.slot.borrow().as_ref().map(|e| e.message.clone())
    }

    pub fn code(&self) -> Option<i32> {
        self.slot.borrow().as_ref().map(|e| e.code)
    }

    /// Returns the captured failure, if any.
    pub fn error(&self) -> Option<ErrorInfo> {
        self.slot.borrow().clone()
    }

    /// True while this scope is the thread's active receiver.
    pub fn is_active(&self) -> bool {
        ACTIVE.with(|active| matches!(active.borrow().as_ref(), Some(r) if r.id == self.id))
    }
}

impl Default for ErrorScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ErrorScope {
    fn drop(&mut self) {
        let was_active = ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            let ours = matches!(active.as_ref(), Some(r) if r.id == self.id);
            if ours {
                *active = None;
            }
            ours
        });
        if !was_active && !std::thread::panicking() {
            panic!(
                "error scope {} dropped while not the active receiver (nested or interleaved scopes)",
                self.id
            );
        }
    }
}

/// Reports a backend failure to the thread's active receiver.
///
/// Returns `true` if the report was recorded; `false` if there is no active
/// receiver or it already holds an error.
pub fn report(message: &str, code: i32) -> bool {
    let recorded = ACTIVE.with(|active| {
        let active = active.borrow();
        let Some(receiver) = active.as_ref() else {
            return None;
        };
        let mut slot = receiver.slot.borrow_mut();
        if slot.is_some() {
            return Some(false);
        }
        *slot = Some(ErrorInfo {
            message: message.to_string(),
            code,
        });
        Some(true)
    });
    match recorded {
        Some(recorded) => recorded,
        None => {
            tracing::warn!(code, "onnx: backend error with no active receiver: {message}");
            false
        }
    }
}

/// Runs `f` inside a fresh [`ErrorScope`].
///
/// A report captured by the scope wins over whatever `f` returned.
pub(crate) fn guarded<T>(
    context: &'static str,
    f: impl FnOnce() -> Result<T, OnnxError>,
) -> Result<T, OnnxError> {
    let scope = ErrorScope::new();
    let result = f();
    match scope.error() {
        Some(ErrorInfo { message, code }) => Err(OnnxError::Backend {
            context,
            message,
            code,
        }),
        None => result,
    }
}
