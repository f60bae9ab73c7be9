// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Publish/subscribe for typed notifications.

use std::fmt;

use floorview_core::Floor;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle returned by [`EventBus::subscribe`].
    pub struct ListenerKey;
}

/// Notifications emitted by the floor selector.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorEvent {
    /// A different floor (or `None` for all floors) has been selected.
    SelectedFloorChanged { floor: Option<usize> },
    /// The floor list has been replaced.
    FloorDataChanged { floors: Vec<Floor> },
}

/// Notifications emitted by the levels extension.
#[derive(Debug, Clone, PartialEq)]
pub enum LevelsEvent {
    /// The camera has moved onto a different level.
    LevelChanged { level: Floor },
}

type Listener<E> = Box<dyn FnMut(&E)>;

/// Listener registry dispatching events synchronously in subscription order.
pub struct EventBus<E> {
    listeners: SlotMap<ListenerKey, Listener<E>>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            listeners: SlotMap::with_key(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> ListenerKey {
        self.listeners.insert(Box::new(listener))
    }

    /// Returns false if the listener was already gone.
    pub fn unsubscribe(&mut self, key: ListenerKey) -> bool {
        self.listeners.remove(key).is_some()
    }

    pub fn emit(&mut self, event: &E) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
