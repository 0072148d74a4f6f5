//! Reader callbacks

use crate::error::EmberResult;
use crate::types::Tag;
use ember_core::Value;

/// Callbacks invoked by [`AsyncBerReader`](super::AsyncBerReader)
///
/// `tag` is the outer (context or application) tag of the element and
/// `type_tag` the inner type tag of a container. An error returned from a
/// callback aborts the current feed and resets the reader.
pub trait ReaderHandler {
    /// A container's header has been read; its children follow
    fn on_new_container(&mut self, tag: Tag, type_tag: Tag) -> EmberResult<()>;

    /// A primitive item has been read completely
    fn on_item_ready(&mut self, tag: Tag, value: Value) -> EmberResult<()>;

    /// The innermost open container has been closed
    fn on_container_ready(&mut self, tag: Tag, type_tag: Tag) -> EmberResult<()>;
}

/// Event reported by the streaming reader
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderEvent {
    NewContainer { tag: Tag, type_tag: Tag },
    ItemReady { tag: Tag, value: Value },
    ContainerReady { tag: Tag, type_tag: Tag },
}

/// Handler that records every event in order
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<ReaderEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far
    pub fn events(&self) -> &[ReaderEvent] {
        &self.events
    }

    /// Take the recorded events, leaving the collector empty
    pub fn take_events(&mut self) -> Vec<ReaderEvent> {
        std::mem::take(&mut self.events)
    }
}

impl ReaderHandler for EventCollector {
    fn on_new_container(&mut self, tag: Tag, type_tag: Tag) -> EmberResult<()> {
        self.events.push(ReaderEvent::NewContainer { tag, type_tag });
        Ok(())
    }

    fn on_item_ready(&mut self, tag: Tag, value: Value) -> EmberResult<()> {
        self.events.push(ReaderEvent::ItemReady { tag, value });
        Ok(())
    }

    fn on_container_ready(&mut self, tag: Tag, type_tag: Tag) -> EmberResult<()> {
        self.events.push(ReaderEvent::ContainerReady { tag, type_tag });
        Ok(())
    }
}
