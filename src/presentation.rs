//! Mapping from segments to paint rules and display text.
//!
//! The paint tables are pure data. Every table has an explicit default
//! colour, so every input has an output.

use crate::{AttributeSchema, Segment, SegmentKind, SidebarEntry};
use std::fmt;

/// Hex colour as understood by the rendering engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub &'static str);

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Highlight for features whose `selected` feature-state is true.
pub const SELECTED_COLOR: Color = Color("#00FF00");

/// Attribute value → colour lookup with a default entry.
#[derive(Debug, Clone, Copy)]
pub struct PaintTable {
    pub entries: &'static [(&'static str, Color)],
    pub default: Color,
}

impl PaintTable {
    /// Colour for an attribute value. Keys match case-insensitively.
    pub fn color_for(&self, key: Option<&str>) -> Color {
        key.map(str::trim)
            .and_then(|key| {
                self.entries
                    .iter()
                    .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
                    .map(|&(_, color)| color)
            })
            .unwrap_or(self.default)
    }
}

/// Trails, keyed by difficulty classification.
pub const TRAIL_PAINT: PaintTable = PaintTable {
    entries: &[
        ("Easy", Color("#2ECC71")),
        ("Moderate", Color("#F39C12")),
        ("Difficult", Color("#C0392B")),
    ],
    default: Color("#FF5733"),
};

/// Roads carry no classification.
pub const ROAD_PAINT: PaintTable = PaintTable {
    entries: &[],
    default: Color("#FFA500"),
};

/// Trailheads and points of interest, keyed by site subtype.
pub const POI_PAINT: PaintTable = PaintTable {
    entries: &[
        ("TRAILHEAD", Color("#2ECC71")),
        ("CAMPGROUND", Color("#8E44AD")),
        ("PICNIC SITE", Color("#F1C40F")),
        ("OBSERVATION SITE", Color("#1ABC9C")),
        ("BOATING SITE", Color("#2980B9")),
    ],
    default: Color("#3498DB"),
};

/// Line or circle styling for one feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaintRule {
    Line { color: Color, selected_color: Color, width: f32 },
    Circle { color: Color, radius: f32, stroke: Color },
}

pub fn table_for(kind: SegmentKind) -> &'static PaintTable {
    match kind {
        SegmentKind::Trail => &TRAIL_PAINT,
        SegmentKind::Road => &ROAD_PAINT,
        SegmentKind::Poi => &POI_PAINT,
    }
}

/// Paint rule for a segment.
pub fn paint_rule(segment: &Segment, schema: &AttributeSchema) -> PaintRule {
    let key = schema.paint_key(&segment.attributes, segment.kind);
    let color = table_for(segment.kind).color_for(key);

    match segment.kind {
        SegmentKind::Trail => PaintRule::Line { color, selected_color: SELECTED_COLOR, width: 4.0 },
        SegmentKind::Road => PaintRule::Line { color, selected_color: SELECTED_COLOR, width: 3.0 },
        SegmentKind::Poi => PaintRule::Circle { color, radius: 6.0, stroke: Color("#000000") },
    }
}

/// Hover popup text.
pub fn popup_text(segment: &Segment) -> String {
    match segment.kind {
        SegmentKind::Poi => format!("{}: {}", segment.kind, segment.display_name),
        _ => format!(
            "{}: {}\nDistance: {:.2} miles",
            segment.kind, segment.display_name, segment.distance
        ),
    }
}

/// One sidebar list item, e.g. `Ridge Trail - 3.20 mi`.
pub fn sidebar_line(entry: &SidebarEntry) -> String {
    format!("{} - {:.2} mi", entry.display_name, entry.distance)
}

/// Total distance as shown under the sidebar list.
pub fn format_total(total_distance: f64) -> String {
    format!("{:.2}", total_distance)
}
