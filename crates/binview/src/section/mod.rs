//! Section stack
//!
//! The bottom of the stack is the base stream and is never popped. Every
//! entered section pushes an in-memory buffer on top; all primitive reads and
//! writes go to whatever is on top (the [`ActiveCursor`]). Leaving a section
//! pops it and the previous cursor resumes exactly where it was, which is what
//! makes nested sections work.

mod cursor;

pub use cursor::ActiveCursor;

use crate::error::{BinViewError, BinViewResult};
use crate::stream::MemoryStream;
use std::fmt;
use tracing::trace;

/// What a stack entry was pushed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    /// Length-prefixed deflate section
    Deflate,
    /// Unframed compression of the rest of the stream
    WholeStream,
}

impl SectionKind {
    /// Short name used in errors and logs
    pub const fn name(self) -> &'static str {
        match self {
            Self::Deflate => "deflate section",
            Self::WholeStream => "whole-stream compression",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata attached to a stack entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionTag {
    /// Reason for the entry
    pub kind: SectionKind,
    /// Parent cursor position when the entry was pushed
    pub origin: u64,
}

impl SectionTag {
    /// New tag
    pub const fn new(kind: SectionKind, origin: u64) -> Self {
        Self { kind, origin }
    }
}

/// One pushed stream with its ownership flag and metadata
#[derive(Debug)]
pub struct StackEntry {
    stream: MemoryStream,
    closable: bool,
    tag: Option<SectionTag>,
}

impl StackEntry {
    /// Entry over `stream`
    ///
    /// A closable entry has its buffer released when disposed; a
    /// non-closable one keeps it for whoever holds the entry.
    pub fn new(stream: MemoryStream, closable: bool, tag: Option<SectionTag>) -> Self {
        Self {
            stream,
            closable,
            tag,
        }
    }

    /// The entry's stream
    pub fn stream(&self) -> &MemoryStream {
        &self.stream
    }

    /// The entry's stream, mutably
    pub fn stream_mut(&mut self) -> &mut MemoryStream {
        &mut self.stream
    }

    /// Whether disposing the entry releases its stream
    pub fn is_closable(&self) -> bool {
        self.closable
    }

    /// Metadata attached at push time
    pub fn tag(&self) -> Option<&SectionTag> {
        self.tag.as_ref()
    }

    /// Take the stream out of the entry
    pub fn into_stream(self) -> MemoryStream {
        self.stream
    }

    /// Release the stream if the entry owns it; repeated calls are no-ops
    pub fn dispose(&mut self) {
        if self.closable {
            self.stream.release();
        }
    }
}

/// Direction of a stack-top change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackChange {
    /// An entry was pushed
    Pushed,
    /// An entry was popped
    Popped,
}

/// Notification sent to observers whenever the top of the stack changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEvent {
    /// Push or pop
    pub change: StackChange,
    /// Stack depth after the change, base included
    pub depth: usize,
    /// Tag of the new top; `None` when the base is on top
    pub top: Option<SectionTag>,
}

/// Callback invoked on every stack-top change
pub type StackObserver = Box<dyn FnMut(&StackEvent) + Send>;

/// Pushed entries, released innermost first on drop
#[derive(Debug, Default)]
struct Entries(Vec<StackEntry>);

impl Entries {
    fn unwind(&mut self) -> usize {
        let mut count = 0;
        while let Some(mut entry) = self.0.pop() {
            entry.dispose();
            count += 1;
        }
        count
    }
}

impl Drop for Entries {
    fn drop(&mut self) {
        self.unwind();
    }
}

/// Stack of active streams over a permanent base stream
pub struct SectionStack<S> {
    base: S,
    entries: Entries,
    observers: Vec<StackObserver>,
}

impl<S> SectionStack<S> {
    /// Stack holding only the base stream
    pub fn new(base: S) -> Self {
        Self {
            base,
            entries: Entries::default(),
            observers: Vec::new(),
        }
    }

    /// Number of streams on the stack, base included
    pub fn depth(&self) -> usize {
        self.entries.0.len() + 1
    }

    /// Whether only the base stream remains
    pub fn is_base(&self) -> bool {
        self.entries.0.is_empty()
    }

    /// Push an entry and make it the active cursor
    pub fn push(&mut self, entry: StackEntry) {
        trace!(depth = self.depth() + 1, tag = ?entry.tag, "section stack push");
        self.entries.0.push(entry);
        self.notify(StackChange::Pushed);
    }

    /// Push a fresh, closable in-memory buffer
    pub fn push_buffer(&mut self, tag: SectionTag) -> &mut StackEntry {
        self.push(StackEntry::new(MemoryStream::new(), true, Some(tag)));
        let last = self.entries.0.len() - 1;
        &mut self.entries.0[last]
    }

    /// Remove the top entry and hand it to the caller without disposing it
    pub fn pop(&mut self) -> BinViewResult<StackEntry> {
        let entry = self.entries.0.pop().ok_or(BinViewError::Underflow)?;
        trace!(depth = self.depth(), tag = ?entry.tag, "section stack pop");
        self.notify(StackChange::Popped);
        Ok(entry)
    }

    /// Pop the top entry and dispose it
    pub fn dispose_top(&mut self) -> BinViewResult<()> {
        let mut entry = self.pop()?;
        entry.dispose();
        Ok(())
    }

    /// Pop every entry above the base, innermost first, disposing each
    ///
    /// Returns the number of entries removed.
    pub fn unwind(&mut self) -> usize {
        self.unwind_to(1)
    }

    /// Pop and dispose entries until the stack is `depth` deep
    ///
    /// The base is never removed, so a `depth` below 1 stops at the base.
    /// Returns the number of entries removed.
    pub fn unwind_to(&mut self, depth: usize) -> usize {
        let mut count = 0;
        while self.depth() > depth.max(1) && self.dispose_top().is_ok() {
            count += 1;
        }
        count
    }

    /// Tag of the top entry; `None` when the base is on top
    pub fn top_tag(&self) -> Option<&SectionTag> {
        self.entries.0.last().and_then(StackEntry::tag)
    }

    /// Tag of the top entry, which must be of `kind`
    pub fn expect_top(&self, kind: SectionKind) -> BinViewResult<SectionTag> {
        match self.entries.0.last() {
            None => Err(BinViewError::Underflow),
            Some(entry) => match entry.tag {
                Some(tag) if tag.kind == kind => Ok(tag),
                Some(tag) => Err(BinViewError::SectionMismatch {
                    expected: kind.name(),
                    found: tag.kind.name(),
                }),
                None => Err(BinViewError::SectionMismatch {
                    expected: kind.name(),
                    found: "untagged entry",
                }),
            },
        }
    }

    /// Number of pushed entries of `kind`
    pub fn count_kind(&self, kind: SectionKind) -> usize {
        self.tags()
            .filter(|tag| tag.is_some_and(|tag| tag.kind == kind))
            .count()
    }

    /// Tags of all pushed entries, bottom first
    pub fn tags(&self) -> impl Iterator<Item = Option<&SectionTag>> {
        self.entries.0.iter().map(StackEntry::tag)
    }

    /// The stream every primitive operation currently acts on
    pub fn top_mut(&mut self) -> ActiveCursor<'_, S> {
        match self.entries.0.last_mut() {
            Some(entry) => ActiveCursor::Section(&mut entry.stream),
            None => ActiveCursor::Base(&mut self.base),
        }
    }

    /// The base stream
    pub fn base(&self) -> &S {
        &self.base
    }

    /// The base stream, mutably
    pub fn base_mut(&mut self) -> &mut S {
        &mut self.base
    }

    /// Release every pushed entry and return the base stream
    pub fn into_base(self) -> S {
        let Self {
            base, mut entries, ..
        } = self;
        entries.unwind();
        base
    }

    /// Register an observer for stack-top changes
    pub fn subscribe(&mut self, observer: StackObserver) {
        self.observers.push(observer);
    }

    fn notify(&mut self, change: StackChange) {
        if self.observers.is_empty() {
            return;
        }
        let event = StackEvent {
            change,
            depth: self.depth(),
            top: self.top_tag().copied(),
        };
        for observer in &mut self.observers {
            observer(&event);
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for SectionStack<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionStack")
            .field("base", &self.base)
            .field("entries", &self.entries.0)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    fn tag(origin: u64) -> SectionTag {
        SectionTag::new(SectionKind::Deflate, origin)
    }

    #[test]
    fn test_base_is_never_popped() {
        let mut stack = SectionStack::new(MemoryStream::new());
        assert_eq!(stack.depth(), 1);
        assert!(matches!(stack.pop(), Err(BinViewError::Underflow)));
        assert!(matches!(stack.dispose_top(), Err(BinViewError::Underflow)));
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_top_follows_push_and_pop() {
        let mut stack = SectionStack::new(MemoryStream::new());
        stack.top_mut().write_all(b"base").expect("Operation should succeed");

        stack.push_buffer(tag(4));
        stack.top_mut().write_all(b"inner").expect("Operation should succeed");
        assert_eq!(stack.top_tag(), Some(&tag(4)));

        let entry = stack.pop().expect("Operation should succeed");
        assert_eq!(entry.stream().as_slice(), b"inner");
        assert!(stack.top_tag().is_none());

        stack.top_mut().write_all(b"!").expect("Operation should succeed");
        assert_eq!(stack.base().as_slice(), b"base!");
    }

    #[test]
    fn test_dispose_respects_closable_flag() {
        let mut owned = StackEntry::new(MemoryStream::from(vec![1, 2, 3]), true, None);
        owned.dispose();
        owned.dispose();
        assert!(owned.stream().is_empty());

        let mut borrowed = StackEntry::new(MemoryStream::from(vec![1, 2, 3]), false, None);
        borrowed.dispose();
        assert_eq!(borrowed.stream().len(), 3);
    }

    #[test]
    fn test_unwind_is_lifo() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        let mut stack = SectionStack::new(MemoryStream::new());
        stack.push_buffer(tag(1));
        stack.push_buffer(tag(2));
        stack.push_buffer(tag(3));
        stack.subscribe(Box::new(move |event: &StackEvent| {
            sink.lock().expect("lock").push(*event);
        }));

        assert_eq!(stack.unwind(), 3);
        assert_eq!(stack.unwind(), 0);
        assert!(stack.is_base());

        let events = events.lock().expect("lock");
        let tops: Vec<_> = events.iter().map(|event| event.top).collect();
        assert_eq!(tops, vec![Some(tag(2)), Some(tag(1)), None]);
        assert!(events.iter().all(|event| event.change == StackChange::Popped));
        assert_eq!(events.last().map(|event| event.depth), Some(1));
    }

    #[test]
    fn test_observer_sees_push() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut stack = SectionStack::new(MemoryStream::new());
        stack.subscribe(Box::new(move |event: &StackEvent| {
            sink.lock().expect("lock").push(*event);
        }));

        stack.push_buffer(tag(0));
        let events = events.lock().expect("lock");
        assert_eq!(
            events.as_slice(),
            &[StackEvent {
                change: StackChange::Pushed,
                depth: 2,
                top: Some(tag(0)),
            }]
        );
    }

    #[test]
    fn test_expect_top() {
        let mut stack = SectionStack::new(MemoryStream::new());
        assert!(matches!(
            stack.expect_top(SectionKind::Deflate),
            Err(BinViewError::Underflow)
        ));

        stack.push_buffer(SectionTag::new(SectionKind::WholeStream, 0));
        stack.push_buffer(tag(9));
        assert_eq!(stack.expect_top(SectionKind::Deflate).expect("deflate on top"), tag(9));
        assert_eq!(stack.count_kind(SectionKind::Deflate), 1);
        assert_eq!(stack.count_kind(SectionKind::WholeStream), 1);

        stack.dispose_top().expect("Operation should succeed");
        assert!(matches!(
            stack.expect_top(SectionKind::Deflate),
            Err(BinViewError::SectionMismatch {
                expected: "deflate section",
                found: "whole-stream compression"
            })
        ));
    }

    #[test]
    fn test_unwind_to_depth() {
        let mut stack = SectionStack::new(MemoryStream::new());
        stack.push_buffer(tag(1));
        stack.push_buffer(tag(2));
        stack.push_buffer(tag(3));

        assert_eq!(stack.unwind_to(2), 2);
        assert_eq!(stack.top_tag(), Some(&tag(1)));
        assert_eq!(stack.unwind_to(5), 0);
        assert_eq!(stack.unwind_to(0), 1);
        assert!(stack.is_base());
    }

    #[test]
    fn test_into_base_releases_entries() {
        let mut stack = SectionStack::new(MemoryStream::from(vec![7]));
        stack.push_buffer(tag(0));
        stack.push_buffer(tag(0));
        let base = stack.into_base();
        assert_eq!(base.as_slice(), &[7]);
    }
}
