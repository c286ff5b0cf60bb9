//! Board model boundary.
//!
//! The engine never talks to a concrete PCB editor. Everything it reads or
//! mutates goes through [`Board`], whose items are plain value types that can
//! be cloned, transformed and re-inserted.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::geometry::{normalize_angle, Bounded, BoundingBox, Coord, Point};

/// Host handle of a board item. Stable for the lifetime of the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Typed handle, used for removal and in the replication log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemRef {
    Footprint(ItemId),
    Track(ItemId),
    Zone(ItemId),
    Text(ItemId),
    Drawing(ItemId),
}

impl ItemRef {
    pub fn id(&self) -> ItemId {
        match *self {
            ItemRef::Footprint(id)
            | ItemRef::Track(id)
            | ItemRef::Zone(id)
            | ItemRef::Text(id)
            | ItemRef::Drawing(id) => id,
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ItemRef::Footprint(_) => "footprint",
            ItemRef::Track(_) => "track",
            ItemRef::Zone(_) => "zone",
            ItemRef::Text(_) => "text",
            ItemRef::Drawing(_) => "drawing",
        };
        write!(f, "{kind} {}", self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Net {
    pub code: u32,
    pub name: String,
}

impl Net {
    pub fn new(code: u32, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
        }
    }

    /// Net code 0, the host's "no net".
    pub fn unconnected() -> Self {
        Self::new(0, "")
    }

    pub fn is_unconnected(&self) -> bool {
        self.name.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pad {
    /// Pad number as printed in the footprint ("1", "A3", "EP").
    pub name: String,
    pub net: Net,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextKind {
    Reference,
    Value,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSize {
    pub width: Coord,
    pub height: Coord,
}

/// Text owned by a footprint. Position is absolute board coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintText {
    pub kind: TextKind,
    pub text: String,
    pub position: Point,
    pub angle: f64,
    pub layer: String,
    pub size: TextSize,
    pub thickness: Coord,
    pub italic: bool,
    pub visible: bool,
    pub keep_upright: bool,
}

impl FootprintText {
    /// Mirror to the other board side about the owning footprint's position.
    pub fn flip(&mut self, center: Point) {
        self.position = self.position.mirrored_y(center);
        self.angle = normalize_angle(-self.angle);
        self.layer = flipped_layer(&self.layer);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneConnection {
    Inherited,
    None,
    ThermalRelief,
    Full,
}

/// Per-footprint overrides of the board's clearance rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalMargins {
    pub clearance: Coord,
    pub solder_mask_margin: Coord,
    pub solder_paste_margin: Coord,
    pub solder_paste_ratio: f64,
    pub zone_connection: Option<ZoneConnection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub id: ItemId,
    pub reference: String,
    /// Hierarchical path token, `/sheet/.../identity`. Empty when the
    /// footprint has no schematic symbol.
    pub path: String,
    pub position: Point,
    pub orientation: f64,
    pub flipped: bool,
    pub locked: bool,
    /// Body extents relative to `position`, unrotated.
    pub extents: BoundingBox,
    pub pads: Vec<Pad>,
    pub texts: Vec<FootprintText>,
    pub margins: LocalMargins,
}

impl Footprint {
    pub fn nets(&self) -> impl Iterator<Item = &Net> {
        self.pads.iter().map(|pad| &pad.net)
    }
}

impl Bounded for Footprint {
    fn bounding_box(&self) -> BoundingBox {
        if self.extents.is_empty() {
            return BoundingBox::from_points(self.position, self.position);
        }
        let rotate = |corner: Point| {
            (self.position + corner).rotated_about(self.position, self.orientation)
        };
        BoundingBox::around(self.extents.corners().into_iter().map(rotate))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Segment,
    Via { drill: Coord },
}

/// A copper segment or a via (`start == end`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: ItemId,
    pub kind: TrackKind,
    pub start: Point,
    pub end: Point,
    pub width: Coord,
    pub layer: String,
    pub net: Net,
}

impl Bounded for Track {
    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.start, self.end).inflated(self.width / 2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ItemId,
    pub layer: String,
    pub net: Net,
    pub outline: Vec<Point>,
    pub keepout: bool,
    pub priority: u32,
}

impl Zone {
    pub fn is_on_copper_layer(&self) -> bool {
        is_copper_layer(&self.layer)
    }
}

impl Bounded for Zone {
    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::around(self.outline.iter().copied())
    }
}

/// Free text on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardText {
    pub id: ItemId,
    pub text: String,
    pub position: Point,
    pub angle: f64,
    pub layer: String,
    pub size: TextSize,
    pub thickness: Coord,
}

impl Bounded for BoardText {
    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.position, self.position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Segment { start: Point, end: Point },
    Rect { start: Point, end: Point },
    Circle { center: Point, radius: Coord },
    /// `angle` degrees swept from `start` about `center`.
    Arc { center: Point, start: Point, angle: f64 },
    Polygon { points: Vec<Point> },
}

/// Graphic line, shape or polygon that is not part of a footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub id: ItemId,
    pub shape: Shape,
    pub width: Coord,
    pub layer: String,
}

pub const EDGE_CUTS: &str = "Edge.Cuts";

impl Drawing {
    pub fn is_board_outline(&self) -> bool {
        self.layer == EDGE_CUTS
    }
}

impl Bounded for Drawing {
    fn bounding_box(&self) -> BoundingBox {
        let bbox = match &self.shape {
            Shape::Segment { start, end } | Shape::Rect { start, end } => {
                BoundingBox::from_points(*start, *end)
            }
            Shape::Circle { center, radius } => {
                BoundingBox::from_points(*center, *center).inflated(*radius)
            }
            // Full circle: conservative, but never misses the swept part
            Shape::Arc { center, start, .. } => {
                let d = *start - *center;
                let radius = (d.x as f64).hypot(d.y as f64).ceil() as Coord;
                BoundingBox::from_points(*center, *center).inflated(radius)
            }
            Shape::Polygon { points } => BoundingBox::around(points.iter().copied()),
        };
        bbox.inflated(self.width / 2)
    }
}

/// `F.Cu`, `B.Cu`, `In1.Cu`, ...
pub fn is_copper_layer(layer: &str) -> bool {
    layer.ends_with(".Cu")
}

/// Opposite-side layer name: `F.*` <-> `B.*`. Inner and non-sided layers are
/// returned unchanged.
pub fn flipped_layer(layer: &str) -> String {
    if let Some(rest) = layer.strip_prefix("F.") {
        format!("B.{rest}")
    } else if let Some(rest) = layer.strip_prefix("B.") {
        format!("F.{rest}")
    } else {
        layer.to_string()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("No {0} on the board")]
    UnknownItem(ItemRef),

    #[error("Footprint {footprint} has no text item {index}")]
    UnknownText { footprint: ItemId, index: usize },
}

/// What the engine needs from a PCB.
///
/// Queries return snapshots; mutations take handles. Added items get a fresh
/// [`ItemId`] from the board, whatever `id` the passed value carried.
pub trait Board {
    fn footprints(&self) -> Vec<Footprint>;
    fn footprint(&self, id: ItemId) -> Option<Footprint>;
    fn tracks(&self) -> Vec<Track>;
    fn zones(&self) -> Vec<Zone>;
    fn texts(&self) -> Vec<BoardText>;
    fn drawings(&self) -> Vec<Drawing>;

    fn add_track(&mut self, track: Track) -> ItemId;
    fn add_zone(&mut self, zone: Zone) -> ItemId;
    fn add_text(&mut self, text: BoardText) -> ItemId;
    fn add_drawing(&mut self, drawing: Drawing) -> ItemId;

    /// Remove an item. Returns `false` if it was not on the board.
    fn remove(&mut self, item: ItemRef) -> bool;

    /// Move a footprint and everything it owns.
    fn set_footprint_position(&mut self, id: ItemId, position: Point) -> Result<(), BoardError>;

    /// Rotate a footprint about its own position.
    fn set_footprint_orientation(&mut self, id: ItemId, orientation: f64)
        -> Result<(), BoardError>;

    /// Move a footprint to the other side, keeping its position.
    fn flip_footprint(&mut self, id: ItemId) -> Result<(), BoardError>;

    fn set_footprint_text(
        &mut self,
        id: ItemId,
        index: usize,
        text: FootprintText,
    ) -> Result<(), BoardError>;

    fn set_footprint_margins(&mut self, id: ItemId, margins: LocalMargins)
        -> Result<(), BoardError>;
}
