//! Stack capture for internal failures.
//!
//! # Responsibilities
//! - Record raw frames where an internal failure is created, or at the panic
//!   site for panicking handlers (cheap, unresolved)
//! - Resolve and format frames later, on a log worker
//! - Trim the walk to the frames between the failure and the dispatcher
//!
//! # Design Decisions
//! - Frames belonging to the capture machinery or to panic recovery are skipped
//! - The walk stops at the dispatcher's handler-invocation frame; without it,
//!   the walk runs to the outermost frame
//! - Frames without debug info still render, with `??` as file
//! - Panics inside a guarded handler are recorded by a chained panic hook
//!   and not reported by the previous hook; other panics pass through

use std::cell::{Cell, RefCell};
use std::sync::Once;

use backtrace::Backtrace;

use crate::observability::error_log::fill_template;

/// Frames containing any of these are left out of the rendered stack.
const SKIP_MARKERS: &[&str] = &[
    "backtrace::",
    "StackTrace::capture",
    "std::panicking",
    "core::panicking",
    "std::panic::catch_unwind",
    "__rust_try",
    "__rust_end_short_backtrace",
    "rust_begin_unwind",
    "core::ops::function::",
    "InternalError::new",
    "InternalError::with_status",
    "InternalError::from_display",
    "Context::internal_error",
    "ResultExt",
    "core::result::",
    "stack::install_panic_hook",
];

/// The walk ends at the first frame containing this marker.
pub const DISPATCH_MARKER: &str = "Dispatcher::invoke_handler";

/// Default frame template: file, line and program counter.
pub const DEFAULT_FRAME_FORMAT: &str = "{file}:{line}(0x{pc});";

/// Call stack recorded where an internal failure is raised.
#[derive(Debug, Clone)]
pub struct StackTrace {
    frames: Backtrace,
}

impl StackTrace {
    /// Record the current call stack without resolving symbols.
    #[inline(never)]
    pub fn capture() -> Self {
        Self {
            frames: Backtrace::new_unresolved(),
        }
    }

    /// Resolve symbols and format every frame below the dispatch boundary.
    pub fn render(&mut self, frame_format: &str) -> String {
        self.frames.resolve();

        let mut rendered = String::new();
        'walk: for frame in self.frames.frames() {
            let pc = frame.ip() as usize;
            let symbols = frame.symbols();
            if symbols.is_empty() {
                rendered.push_str(&format_frame(frame_format, "??", 0, pc));
                continue;
            }
            for symbol in symbols {
                let name = symbol
                    .name()
                    .map(|n| format!("{:#}", n))
                    .unwrap_or_default();
                let file = symbol
                    .filename()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();

                if matches_marker(&name, &file, &[DISPATCH_MARKER]) {
                    break 'walk;
                }
                if matches_marker(&name, &file, SKIP_MARKERS) {
                    continue;
                }

                let file = if file.is_empty() { "??" } else { file.as_str() };
                let line = symbol.lineno().unwrap_or(0);
                rendered.push_str(&format_frame(frame_format, file, line, pc));
            }
        }
        rendered
    }
}

thread_local! {
    static GUARDED: Cell<bool> = const { Cell::new(false) };
    static PANIC_STACK: RefCell<Option<StackTrace>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Chain a panic hook that records the stack of panics raised while a
/// [`PanicGuard`] is active on the panicking thread.
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if GUARDED.with(Cell::get) {
                let stack = StackTrace::capture();
                PANIC_STACK.with(|slot| *slot.borrow_mut() = Some(stack));
                return;
            }
            previous_hook(info);
        }));
    });
}

/// Marks the current thread as running a handler until dropped.
#[derive(Debug)]
pub struct PanicGuard {
    previous: bool,
}

impl PanicGuard {
    pub fn enter() -> Self {
        PANIC_STACK.with(|slot| slot.borrow_mut().take());
        Self {
            previous: GUARDED.with(|g| g.replace(true)),
        }
    }

    /// Stack recorded by the most recent guarded panic on this thread.
    pub fn take_stack(&self) -> Option<StackTrace> {
        PANIC_STACK.with(|slot| slot.borrow_mut().take())
    }
}

impl Drop for PanicGuard {
    fn drop(&mut self) {
        GUARDED.with(|g| g.set(self.previous));
    }
}

fn matches_marker(name: &str, file: &str, markers: &[&str]) -> bool {
    markers
        .iter()
        .any(|marker| name.contains(marker) || file.contains(marker))
}

fn format_frame(frame_format: &str, file: &str, line: u32, pc: usize) -> String {
    fill_template(frame_format, |field| match field {
        "file" => Some(file.to_string()),
        "line" => Some(line.to_string()),
        "pc" => Some(format!("{:x}", pc)),
        _ => None,
    })
}
