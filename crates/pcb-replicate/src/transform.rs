//! Rigid transforms carrying pivot geometry onto a target sheet.

use crate::board::{BoardText, Drawing, Footprint, FootprintText, Shape, Track, Zone};
use crate::geometry::{normalize_angle, BoundingBox, Point};

/// Value-level move and rotate.
///
/// `rotate` turns points about `center` with the board's convention (see
/// [`Point::rotated_about`]) and adds `angle` to any orientation the item has.
pub trait Transformable {
    fn translate(&mut self, delta: Point);
    fn rotate(&mut self, center: Point, angle: f64);
}

impl Transformable for Track {
    fn translate(&mut self, delta: Point) {
        self.start = self.start + delta;
        self.end = self.end + delta;
    }

    fn rotate(&mut self, center: Point, angle: f64) {
        self.start = self.start.rotated_about(center, angle);
        self.end = self.end.rotated_about(center, angle);
    }
}

impl Transformable for Zone {
    fn translate(&mut self, delta: Point) {
        for p in &mut self.outline {
            *p = *p + delta;
        }
    }

    fn rotate(&mut self, center: Point, angle: f64) {
        for p in &mut self.outline {
            *p = p.rotated_about(center, angle);
        }
    }
}

impl Transformable for BoardText {
    fn translate(&mut self, delta: Point) {
        self.position = self.position + delta;
    }

    fn rotate(&mut self, center: Point, angle: f64) {
        self.position = self.position.rotated_about(center, angle);
        self.angle = normalize_angle(self.angle + angle);
    }
}

impl Transformable for FootprintText {
    fn translate(&mut self, delta: Point) {
        self.position = self.position + delta;
    }

    fn rotate(&mut self, center: Point, angle: f64) {
        self.position = self.position.rotated_about(center, angle);
        self.angle = normalize_angle(self.angle + angle);
    }
}

impl Transformable for Drawing {
    fn translate(&mut self, delta: Point) {
        match &mut self.shape {
            Shape::Segment { start, end } | Shape::Rect { start, end } => {
                *start = *start + delta;
                *end = *end + delta;
            }
            Shape::Circle { center, .. } => *center = *center + delta,
            Shape::Arc { center, start, .. } => {
                *center = *center + delta;
                *start = *start + delta;
            }
            Shape::Polygon { points } => {
                for p in points {
                    *p = *p + delta;
                }
            }
        }
    }

    fn rotate(&mut self, center: Point, angle: f64) {
        let rot = |p: Point| p.rotated_about(center, angle);
        self.shape = match &self.shape {
            Shape::Segment { start, end } => Shape::Segment {
                start: rot(*start),
                end: rot(*end),
            },
            Shape::Rect { start, end } if normalize_angle(angle) % 90.0 == 0.0 => Shape::Rect {
                start: rot(*start),
                end: rot(*end),
            },
            // A rectangle is axis-aligned by definition
            Shape::Rect { start, end } => Shape::Polygon {
                points: BoundingBox::from_points(*start, *end)
                    .corners()
                    .into_iter()
                    .map(rot)
                    .collect(),
            },
            Shape::Circle { center: c, radius } => Shape::Circle {
                center: rot(*c),
                radius: *radius,
            },
            Shape::Arc {
                center: c,
                start,
                angle: sweep,
            } => Shape::Arc {
                center: rot(*c),
                start: rot(*start),
                angle: *sweep,
            },
            Shape::Polygon { points } => Shape::Polygon {
                points: points.iter().copied().map(rot).collect(),
            },
        };
    }
}

/// Pivot-anchor to target-anchor transform.
///
/// A point `p` of the pivot lands at `target + (p - pivot)`, rotated about
/// `target` by the anchors' orientation difference. Angles shift by the same
/// amount, so footprints keep their pose relative to the anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorTransform {
    pub pivot_anchor: Point,
    pub target_anchor: Point,
    /// Pivot anchor orientation minus target anchor orientation, degrees.
    pub rotation_delta: f64,
    pivot_anchor_flipped: bool,
    target_anchor_flipped: bool,
}

impl AnchorTransform {
    pub fn new(pivot_anchor: &Footprint, target_anchor: &Footprint) -> Self {
        Self {
            pivot_anchor: pivot_anchor.position,
            target_anchor: target_anchor.position,
            rotation_delta: pivot_anchor.orientation - target_anchor.orientation,
            pivot_anchor_flipped: pivot_anchor.flipped,
            target_anchor_flipped: target_anchor.flipped,
        }
    }

    pub fn translation(&self) -> Point {
        self.target_anchor - self.pivot_anchor
    }

    pub fn apply_point(&self, p: Point) -> Point {
        (p + self.translation()).rotated_about(self.target_anchor, -self.rotation_delta)
    }

    pub fn apply_angle(&self, angle: f64) -> f64 {
        normalize_angle(angle - self.rotation_delta)
    }

    pub fn apply<T: Transformable>(&self, item: &mut T) {
        item.translate(self.translation());
        item.rotate(self.target_anchor, -self.rotation_delta);
    }

    /// Whether the target footprint must change side so that it sits on the
    /// same side relative to its anchor as the pivot footprint does.
    pub fn needs_flip(&self, pivot_flipped: bool, target_flipped: bool) -> bool {
        (pivot_flipped != self.pivot_anchor_flipped)
            != (target_flipped != self.target_anchor_flipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{ItemId, LocalMargins, Net, TrackKind};

    fn anchor(x: f64, y: f64, orientation: f64, flipped: bool) -> Footprint {
        Footprint {
            id: ItemId(1),
            reference: "U1".into(),
            path: "/s/u".into(),
            position: Point::from_mm(x, y),
            orientation,
            flipped,
            locked: false,
            extents: BoundingBox::empty(),
            pads: vec![],
            texts: vec![],
            margins: LocalMargins::default(),
        }
    }

    fn track(start: Point, end: Point) -> Track {
        Track {
            id: ItemId(9),
            kind: TrackKind::Segment,
            start,
            end,
            width: 250_000,
            layer: "F.Cu".into(),
            net: Net::new(3, "SIG"),
        }
    }

    #[test]
    fn test_pure_translation_is_exact() {
        let t = AnchorTransform::new(
            &anchor(10.0, 10.0, 0.0, false),
            &anchor(60.0, 10.0, 0.0, false),
        );
        let mut tr = track(Point::from_mm(12.345678, 9.87654), Point::from_mm(15.0, 9.87654));
        let before = tr.clone();
        t.apply(&mut tr);

        let offset = Point::from_mm(50.0, 0.0);
        assert_eq!(tr.start, before.start + offset);
        assert_eq!(tr.end, before.end + offset);
        assert_eq!(t.apply_angle(45.0), 45.0);
    }

    #[test]
    fn test_quarter_turn_keeps_relative_pose() {
        // Target anchor is turned a quarter turn counter-clockwise
        let t = AnchorTransform::new(
            &anchor(0.0, 0.0, 0.0, false),
            &anchor(100.0, 0.0, 90.0, false),
        );
        assert_eq!(t.rotation_delta, -90.0);

        // 5 mm right of the pivot anchor ends up 5 mm above the target anchor
        assert_eq!(t.apply_point(Point::from_mm(5.0, 0.0)), Point::from_mm(100.0, -5.0));
        assert_eq!(t.apply_angle(0.0), 90.0);
        assert_eq!(t.apply_angle(300.0), 30.0);
    }

    #[test]
    fn test_rect_becomes_polygon_off_axis() {
        let mut drawing = Drawing {
            id: ItemId(2),
            shape: Shape::Rect {
                start: Point::new(0, 0),
                end: Point::new(1_000, 1_000),
            },
            width: 100,
            layer: "F.SilkS".into(),
        };
        drawing.rotate(Point::new(0, 0), 90.0);
        assert!(matches!(drawing.shape, Shape::Rect { .. }));
        drawing.rotate(Point::new(0, 0), 45.0);
        assert!(matches!(drawing.shape, Shape::Polygon { ref points } if points.len() == 4));
    }

    #[test]
    fn test_flip_rule() {
        let t = AnchorTransform::new(
            &anchor(0.0, 0.0, 0.0, false),
            &anchor(10.0, 0.0, 0.0, true),
        );
        // Same side as its anchor in the pivot; target anchor is on the back
        assert!(t.needs_flip(false, false));
        assert!(!t.needs_flip(false, true));
        // Opposite side to its anchor in the pivot
        assert!(!t.needs_flip(true, false));
        assert!(t.needs_flip(true, true));
    }
}
