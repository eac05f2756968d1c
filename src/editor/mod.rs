//! Rich-text description editor with inline parameter tags.
//!
//! The [`Editor`] owns a [`Document`] and a cursor and wires the `@`
//! suggestion popup into text input. Anything that needs screen geometry
//! goes through a [`LayoutHost`], so the editor itself stays headless.

pub mod document;
pub mod html;
pub mod listeners;
pub mod placement;
pub mod suggestion;

pub use document::{Atom, Document, Inline, ParameterTag};
pub use listeners::{ScrollListeners, ScrollOrigin};
pub use placement::{Placement, Point, Rect, Side, Size};
pub use suggestion::{Key, PopupLine, SuggestionState, EMPTY_MESSAGE, TRIGGER_CHAR};

use crate::params::{filter_parameters, Parameter};
use std::ops::Range;
use suggestion::{find_match, KeyOutcome, SuggestionProps};

/// Screen geometry supplied by whatever renders the editor.
pub trait LayoutHost {
    fn viewport(&self) -> Size;

    /// Screen rectangle of a document range, if it is rendered.
    fn client_rect(&self, range: Range<usize>) -> Option<Rect>;

    /// Measured popup size for the given rows; zero if not laid out yet.
    fn measure_popup(&self, lines: &[PopupLine]) -> Size;
}

/// Update tags whose key has a different current value.
///
/// The first parameter with a tag's key wins. Tags whose key is not among
/// `params` are left as they are. Returns how many tags changed.
pub fn sync_parameter_tags(doc: &mut Document, params: &[Parameter]) -> usize {
    let updates: Vec<(usize, String)> = doc
        .tags()
        .filter_map(|(pos, tag)| {
            params
                .iter()
                .find(|p| p.key == tag.key)
                .filter(|p| p.value != tag.value)
                .map(|p| (pos, p.value.clone()))
        })
        .collect();

    updates
        .iter()
        .filter(|(pos, value)| doc.set_tag_value(*pos, value))
        .count()
}

/// Same as [`sync_parameter_tags`] over stored HTML.
pub fn sync_parameter_tags_html(html: &str, params: &[Parameter]) -> (String, usize) {
    let mut doc = html::from_html(html);
    let updated = sync_parameter_tags(&mut doc, params);
    if updated == 0 {
        return (html.to_string(), 0);
    }
    (html::to_html(&doc), updated)
}

#[derive(Debug)]
pub struct Editor {
    doc: Document,
    cursor: usize,
    mounted: bool,
    trigger: char,
    params: Vec<Parameter>,
    listeners: ScrollListeners,
    suggestion: Option<SuggestionState>,
    // Trigger position closed with Escape; stays closed until the match goes away
    dismissed_at: Option<usize>,
}

impl Editor {
    /// Create a mounted, empty editor attached to a document's scroll
    /// listeners.
    pub fn new(listeners: ScrollListeners) -> Self {
        Self {
            doc: Document::new(),
            cursor: 0,
            mounted: true,
            trigger: TRIGGER_CHAR,
            params: Vec::new(),
            listeners,
            suggestion: None,
            dismissed_at: None,
        }
    }

    /// Create an editor with HTML content, cursor at the end.
    pub fn with_html(listeners: ScrollListeners, content: &str) -> Self {
        let mut editor = Self::new(listeners);
        editor.set_html(content);
        editor
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn mount(&mut self) {
        self.mounted = true;
    }

    /// Detach from the view. The popup closes and input is ignored until
    /// mounted again.
    pub fn unmount(&mut self) {
        self.exit_suggestion();
        self.dismissed_at = None;
        self.mounted = false;
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn html(&self) -> String {
        html::to_html(&self.doc)
    }

    /// Replace the content. Any open popup closes.
    pub fn set_html(&mut self, content: &str) {
        self.exit_suggestion();
        self.dismissed_at = None;
        self.doc = html::from_html(content);
        self.cursor = self.doc.len();
    }

    /// Parameters offered by the popup from the next update on.
    pub fn set_parameters(&mut self, params: Vec<Parameter>) {
        self.params = params;
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    pub fn listeners(&self) -> &ScrollListeners {
        &self.listeners
    }

    pub fn suggestion(&self) -> Option<&SuggestionState> {
        self.suggestion.as_ref()
    }

    pub fn set_cursor(&mut self, pos: usize) {
        if !self.mounted {
            return;
        }
        self.cursor = pos.min(self.doc.len());
        self.refresh_suggestion();
    }

    /// Type text at the cursor, one character at a time.
    pub fn type_text(&mut self, text: &str) {
        if !self.mounted {
            return;
        }
        let mut buf = [0u8; 4];
        for c in text.chars() {
            let inserted = self.doc.insert_text(self.cursor, c.encode_utf8(&mut buf));
            self.cursor += inserted;
            self.refresh_suggestion();
        }
    }

    pub fn backspace(&mut self) {
        if !self.mounted || self.cursor == 0 {
            return;
        }
        self.doc.delete_range(self.cursor - 1..self.cursor);
        self.cursor -= 1;
        self.refresh_suggestion();
    }

    /// Insert a tag at the cursor without going through the popup.
    pub fn insert_tag(&mut self, tag: ParameterTag) {
        if !self.mounted {
            return;
        }
        self.doc.insert_atom(self.cursor, Atom::Tag(tag));
        self.cursor += 1;
        self.refresh_suggestion();
    }

    /// Offer a key to the popup. Returns true if the popup consumed it.
    pub fn key_down(&mut self, key: Key) -> bool {
        if !self.mounted {
            return false;
        }
        let Some(state) = self.suggestion.as_mut() else {
            return false;
        };
        let range = state.range();

        match state.on_key_down(key) {
            KeyOutcome::Ignored => false,
            KeyOutcome::Handled => true,
            KeyOutcome::Commit(param) => {
                self.commit(range, param);
                true
            }
            KeyOutcome::Dismiss => {
                self.dismissed_at = Some(range.start);
                self.exit_suggestion();
                true
            }
        }
    }

    /// Commit the popup row at `index`, as a click does.
    pub fn click_item(&mut self, index: usize) -> bool {
        if !self.mounted {
            return false;
        }
        let Some(state) = self.suggestion.as_ref() else {
            return false;
        };
        let Some(param) = state.items().get(index).cloned() else {
            return false;
        };
        let range = state.range();
        self.commit(range, param);
        true
    }

    /// Run the deferred popup layout, if one is due.
    pub fn animation_frame(&mut self, host: &dyn LayoutHost) {
        if !self.mounted {
            return;
        }
        if let Some(state) = self.suggestion.as_mut() {
            if state.layout_pending() {
                let anchor = host.client_rect(state.range());
                let measured = host.measure_popup(&state.lines());
                state.layout(anchor, measured, host.viewport());
            }
        }
    }

    /// Refresh tag values from the current parameters. See
    /// [`sync_parameter_tags`].
    pub fn sync_parameter_tags(&mut self, params: &[Parameter]) -> usize {
        if !self.mounted {
            return 0;
        }
        sync_parameter_tags(&mut self.doc, params)
    }

    fn commit(&mut self, range: Range<usize>, param: Parameter) {
        self.exit_suggestion();
        self.doc
            .replace_range_with_tag(range.clone(), ParameterTag::new(param.key, param.value));
        self.cursor = range.start + 1;
        self.refresh_suggestion();
    }

    fn exit_suggestion(&mut self) {
        if let Some(state) = self.suggestion.take() {
            state.on_exit();
        }
    }

    fn refresh_suggestion(&mut self) {
        let Some(found) = find_match(&self.doc, self.cursor, self.trigger) else {
            self.dismissed_at = None;
            self.exit_suggestion();
            return;
        };

        if self.dismissed_at == Some(found.range.start) {
            return;
        }
        self.dismissed_at = None;

        let props = SuggestionProps {
            items: filter_parameters(&self.params, &found.query),
            range: found.range,
            query: found.query,
        };
        match self.suggestion.as_mut() {
            Some(state) if state.range().start == props.range.start => state.on_update(props),
            _ => {
                self.exit_suggestion();
                self.suggestion = Some(SuggestionState::on_start(props, &self.listeners));
            }
        }
    }
}
