use std::fmt;

use crate::context::BlockKind;

/// An entry on the block stack of an [`Output`].
#[derive(Debug)]
pub(crate) enum Frame {
    /// Captures everything written into a slot.
    Capture {
        slot: String,
        kind: BlockKind,
        buf: String,
    },
    /// Drops everything written (the default body of a claimed block).
    Discard,
    /// Writes through to the frame below (an unclaimed block rendering
    /// its default body).
    Passthrough,
}

/// The output a unit renders into.
///
/// Rendering always goes into an in-memory buffer first.  On top of that
/// buffer sits a stack of block frames which redirect or drop whatever is
/// written while a block is open.
///
/// This is primarily used internally by the engine but it is also what
/// the escaping helpers write into.
#[derive(Debug, Default)]
pub struct Output {
    root: String,
    discard_root: bool,
    frames: Vec<Frame>,
}

impl Output {
    /// Creates a new empty output.
    pub(crate) fn new() -> Self {
        Output::default()
    }

    /// Opens a block frame.
    pub(crate) fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Closes the innermost block frame.
    pub(crate) fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// Returns the number of open block frames.
    pub(crate) fn open_frames(&self) -> usize {
        self.frames.len()
    }

    /// From now on text outside of blocks is dropped.
    ///
    /// Used by templates that extend another one: only their blocks matter.
    pub(crate) fn discard_root(&mut self) {
        self.discard_root = true;
    }

    /// Returns the rendered text.
    pub(crate) fn into_string(self) -> String {
        self.root
    }

    fn target(&mut self) -> Option<&mut String> {
        for frame in self.frames.iter_mut().rev() {
            match frame {
                Frame::Capture { buf, .. } => return Some(buf),
                Frame::Discard => return None,
                Frame::Passthrough => {}
            }
        }
        if self.discard_root {
            None
        } else {
            Some(&mut self.root)
        }
    }

    /// Writes some data into the current target of this output.
    #[inline]
    pub fn write_str(&mut self, s: &str) -> fmt::Result {
        if let Some(target) = self.target() {
            target.push_str(s);
        }
        Ok(())
    }

    /// Writes some formatted information into this instance.
    #[inline]
    pub fn write_fmt(&mut self, a: fmt::Arguments<'_>) -> fmt::Result {
        match self.target() {
            Some(target) => fmt::Write::write_fmt(target, a),
            None => Ok(()),
        }
    }
}

impl fmt::Write for Output {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Output::write_str(self, s)
    }

    #[inline]
    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        Output::write_fmt(self, args)
    }
}
