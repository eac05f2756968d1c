//! Popup placement relative to the trigger character.
//!
//! All coordinates are viewport coordinates in pixels with the origin at the
//! top-left corner.

/// Maximum popup height; taller content scrolls inside the popup.
pub const POPUP_MAX_HEIGHT: f64 = 300.0;
/// Minimum popup width.
pub const POPUP_MIN_WIDTH: f64 = 220.0;
/// Distance kept between the popup and the viewport edges.
pub const VIEWPORT_MARGIN: f64 = 10.0;
/// Gap between the anchor and the popup.
pub const ANCHOR_GAP: f64 = 5.0;

/// 2D point
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle given by its edges.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle from an origin and a size.
    pub fn from_origin(origin: Point, size: Size) -> Self {
        Self::new(
            origin.x,
            origin.y,
            origin.x + size.width,
            origin.y + size.height,
        )
    }

    /// Whether the whole rectangle lies inside a viewport.
    pub fn is_within(&self, viewport: Size) -> bool {
        self.top >= 0.0
            && self.bottom <= viewport.height
            && self.left >= 0.0
            && self.right <= viewport.width
    }
}

/// Which rule decided the vertical position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Directly below the anchor
    Below,
    /// Directly above the anchor
    Above,
    /// Pinned to the top of the viewport
    ViewportTop,
    /// Pinned to the bottom of the viewport
    ViewportBottom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Top-left corner of the popup
    pub origin: Point,
    pub side: Side,
}

/// Effective popup size from the measured one.
///
/// A zero measurement (not laid out yet) counts as the maximum height and
/// the minimum width.
pub fn popup_size(measured: Size) -> Size {
    let height = if measured.height > 0.0 {
        measured.height.min(POPUP_MAX_HEIGHT)
    } else {
        POPUP_MAX_HEIGHT
    };
    let width = if measured.width > 0.0 {
        measured.width.max(POPUP_MIN_WIDTH)
    } else {
        POPUP_MIN_WIDTH
    };
    Size::new(width, height)
}

/// Compute where the popup goes for a given anchor rectangle.
pub fn place_popup(anchor: Rect, measured: Size, viewport: Size) -> Placement {
    let popup = popup_size(measured);

    let mut left = anchor.left;
    if left + popup.width > viewport.width {
        left = viewport.width - popup.width - VIEWPORT_MARGIN;
    }
    if left < VIEWPORT_MARGIN {
        left = VIEWPORT_MARGIN;
    }

    let pinned_top = VIEWPORT_MARGIN;
    let pinned_bottom = viewport.height - popup.height - VIEWPORT_MARGIN;

    let (mut top, side) = if anchor.is_within(viewport) {
        let space_below = viewport.height - anchor.bottom;
        let space_above = anchor.top;

        if space_below >= popup.height + ANCHOR_GAP {
            (anchor.bottom + ANCHOR_GAP, Side::Below)
        } else if space_above >= popup.height + ANCHOR_GAP {
            (anchor.top - popup.height - ANCHOR_GAP, Side::Above)
        } else if space_below > space_above {
            (pinned_bottom, Side::ViewportBottom)
        } else {
            (pinned_top, Side::ViewportTop)
        }
    } else if anchor.top < 0.0 {
        // Anchor scrolled out above
        (pinned_top, Side::ViewportTop)
    } else {
        (pinned_bottom, Side::ViewportBottom)
    };

    if top < VIEWPORT_MARGIN {
        top = VIEWPORT_MARGIN;
    }
    if top + popup.height > viewport.height - VIEWPORT_MARGIN {
        top = pinned_bottom;
    }

    Placement {
        origin: Point::new(left, top),
        side,
    }
}
