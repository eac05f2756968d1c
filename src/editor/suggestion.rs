//! Trigger-character suggestions for parameter tags.
//!
//! [`find_match`] detects an active `@query` before the cursor. While a match
//! exists the editor keeps one [`SuggestionState`], driven through its
//! lifecycle callbacks: `on_start` when a match appears, `on_update` while it
//! changes, `on_key_down` for navigation keys, and `on_exit` once the match is
//! gone. The state owns its scroll subscription, so ending the state is the
//! only way the listener goes away.

use super::document::{Document, LEAF_PLACEHOLDER};
use super::listeners::{Phase, ScrollListeners, ScrollSubscription};
use super::placement::{place_popup, Placement, Rect, Size};
use crate::params::Parameter;
use std::cell::Cell;
use std::ops::Range;
use std::rc::Rc;

/// Character that opens the suggestion popup.
pub const TRIGGER_CHAR: char = '@';

/// Shown in place of items when nothing matches.
pub const EMPTY_MESSAGE: &str = "No parameters available";

/// Only this much text before the cursor is searched for a trigger.
const MAX_LOOKBEHIND: usize = 500;

/// An active trigger: the range covering the trigger and the query, and the
/// query itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionMatch {
    pub range: Range<usize>,
    pub query: String,
}

/// Find the trigger match ending at `cursor`.
///
/// The trigger must start its text block or follow a space, and the query
/// runs up to the cursor without whitespace or tags.
pub fn find_match(doc: &Document, cursor: usize, trigger: char) -> Option<SuggestionMatch> {
    let cursor = cursor.min(doc.len());
    let block_start = doc.block_start(cursor);
    let from = block_start.max(cursor.saturating_sub(MAX_LOOKBEHIND));
    let chars: Vec<char> = doc.text_between(from, cursor).chars().collect();

    let mut index = chars.len();
    loop {
        if index == 0 {
            return None;
        }
        index -= 1;
        let c = chars[index];
        if c == trigger {
            break;
        }
        if c.is_whitespace() || c == LEAF_PLACEHOLDER {
            return None;
        }
    }

    // The character before the trigger may sit just outside the window
    let preceded_by_space = if index > 0 {
        chars[index - 1] == ' '
    } else if from > block_start {
        doc.text_between(from - 1, from) == " "
    } else {
        true
    };
    if !preceded_by_space {
        return None;
    }

    Some(SuggestionMatch {
        range: from + index..cursor,
        query: chars[index + 1..].iter().collect(),
    })
}

/// Keys the popup reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Tab,
    Escape,
    Other,
}

/// What the editor should do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not handled; the editor processes the key normally
    Ignored,
    /// Handled by the popup
    Handled,
    /// Replace the match range with this parameter
    Commit(Parameter),
    /// Close the popup for this trigger
    Dismiss,
}

/// Input to `on_start` and `on_update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionProps {
    pub range: Range<usize>,
    pub query: String,
    pub items: Vec<Parameter>,
}

/// One rendered popup row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupLine {
    Item { label: String, selected: bool },
    Empty(&'static str),
}

/// Popup state for one active trigger.
#[derive(Debug)]
pub struct SuggestionState {
    range: Range<usize>,
    query: String,
    items: Vec<Parameter>,
    selected_index: usize,
    placement: Option<Placement>,
    // Set whenever a layout pass is due on the next animation frame
    layout_pending: Rc<Cell<bool>>,
    _scroll: ScrollSubscription,
}

impl SuggestionState {
    /// Open the popup and attach its scroll listener.
    pub fn on_start(props: SuggestionProps, listeners: &ScrollListeners) -> Self {
        let layout_pending = Rc::new(Cell::new(true));
        let pending = Rc::clone(&layout_pending);
        let subscription = listeners.subscribe(Phase::Capture, move || pending.set(true));

        Self {
            range: props.range,
            query: props.query,
            items: props.items,
            selected_index: 0,
            placement: None,
            layout_pending,
            _scroll: subscription,
        }
    }

    /// New query or items for the same trigger. Selection restarts at the
    /// first item.
    pub fn on_update(&mut self, props: SuggestionProps) {
        self.range = props.range;
        self.query = props.query;
        self.items = props.items;
        self.selected_index = 0;
        self.layout_pending.set(true);
    }

    pub fn on_key_down(&mut self, key: Key) -> KeyOutcome {
        let count = self.items.len();
        match key {
            Key::ArrowDown => {
                if count > 0 {
                    self.selected_index = (self.selected_index + 1) % count;
                }
                KeyOutcome::Handled
            }
            Key::ArrowUp => {
                if count > 0 {
                    self.selected_index = (self.selected_index + count - 1) % count;
                }
                KeyOutcome::Handled
            }
            Key::Enter | Key::Tab => match self.items.get(self.selected_index) {
                Some(item) => KeyOutcome::Commit(item.clone()),
                None => KeyOutcome::Handled,
            },
            Key::Escape => KeyOutcome::Dismiss,
            Key::Other => KeyOutcome::Ignored,
        }
    }

    /// Close the popup. Its scroll listener is detached before this returns.
    pub fn on_exit(self) {}

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn items(&self) -> &[Parameter] {
        &self.items
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn selected(&self) -> Option<&Parameter> {
        self.items.get(self.selected_index)
    }

    /// Rows as the popup displays them.
    pub fn lines(&self) -> Vec<PopupLine> {
        if self.items.is_empty() {
            return vec![PopupLine::Empty(EMPTY_MESSAGE)];
        }
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| PopupLine::Item {
                label: item.to_string(),
                selected: index == self.selected_index,
            })
            .collect()
    }

    pub fn layout_pending(&self) -> bool {
        self.layout_pending.get()
    }

    /// Place the popup for the current frame. Without an anchor rectangle
    /// the previous position is kept.
    pub fn layout(&mut self, anchor: Option<Rect>, measured: Size, viewport: Size) {
        self.layout_pending.set(false);
        if let Some(anchor) = anchor {
            self.placement = Some(place_popup(anchor, measured, viewport));
        }
    }

    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }
}
