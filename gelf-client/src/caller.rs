//! Caller resolution.
//!
//! Walks the stack to find the first frame that belongs to the code calling
//! into this crate. Resolution is best effort: when frames carry no debug
//! info, or the requested depth runs past the end of the stack, the sentinel
//! `("???", 0)` is returned. [`locate`] adds a fallback on the compiler's
//! `#[track_caller]` location, which survives builds without debug info.

use std::fmt;
use std::panic::Location;
use std::path::Path;

/// Source file and line of a log call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Caller {
    pub file: String,
    pub line: u32,
}

impl Caller {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// The sentinel used when resolution fails.
    pub fn unknown() -> Self {
        Self::new("???", 0)
    }

    pub fn is_unknown(&self) -> bool {
        self.line == 0 && self.file == "???"
    }

    /// Captures the location of the caller of the function this is used in.
    #[track_caller]
    pub fn here() -> Self {
        let location = Location::caller();
        Self::new(location.file(), location.line())
    }
}

impl Default for Caller {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    /// Inside this crate.
    Library,
    /// Rust runtime and standard library glue.
    Runtime,
    /// Anything else.
    Caller,
}

fn library_dir() -> &'static Path {
    Path::new(file!()).parent().unwrap_or_else(|| Path::new(""))
}

fn classify(file: &Path) -> FrameKind {
    if file
        .parent()
        .is_some_and(|dir| dir.ends_with(library_dir()))
    {
        return FrameKind::Library;
    }

    let path = file.to_string_lossy();
    if path.starts_with("/rustc/")
        || path.contains("/library/std/")
        || path.contains("/library/core/")
        || path.contains("/library/alloc/")
    {
        return FrameKind::Runtime;
    }

    FrameKind::Caller
}

/// Returns the caller `skip` frames above the first frame outside this crate.
///
/// `skip == 0` yields the code that called into the library. Frames without
/// file/line information and standard library frames are not counted.
pub fn resolve(skip: usize) -> Caller {
    let mut remaining = skip;
    let mut seen_library = false;
    let mut found: Option<Caller> = None;

    backtrace::trace(|frame| {
        backtrace::resolve_frame(frame, |symbol| {
            if found.is_some() {
                return;
            }
            let (Some(file), Some(line)) = (symbol.filename(), symbol.lineno()) else {
                return;
            };
            match classify(file) {
                FrameKind::Library => seen_library = true,
                FrameKind::Runtime => {}
                // Frames inside the backtrace machinery come before ours.
                FrameKind::Caller if !seen_library => {}
                FrameKind::Caller => {
                    if remaining == 0 {
                        found = Some(Caller::new(file.to_string_lossy(), line));
                    } else {
                        remaining -= 1;
                    }
                }
            }
        });
        found.is_none()
    });

    found.unwrap_or_else(|| {
        tracing::trace!(skip, "caller resolution ran past the stack");
        Caller::unknown()
    })
}

/// Resolves the code that called into the library, falling back to
/// `location` when the stack walk finds nothing.
///
/// A `location` inside this crate is not a call site and yields the sentinel.
pub fn locate(location: &Location<'_>) -> Caller {
    let caller = resolve(0);
    if !caller.is_unknown() {
        return caller;
    }
    from_location(location)
}

fn from_location(location: &Location<'_>) -> Caller {
    match classify(Path::new(location.file())) {
        FrameKind::Caller => Caller::new(location.file(), location.line()),
        FrameKind::Library | FrameKind::Runtime => Caller::unknown(),
    }
}
