use serde::{Deserialize, Serialize};

use crate::board::{
    Board, BoardError, BoardText, Drawing, Footprint, FootprintText, ItemId, ItemRef,
    LocalMargins, Track, Zone,
};
use crate::geometry::{normalize_angle, Point};
use crate::transform::Transformable;

/// In-memory [`Board`].
///
/// Backs the working copy of a saved layout and doubles as the test board.
/// Serializes to JSON as-is, ids included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryBoard {
    footprints: Vec<Footprint>,
    tracks: Vec<Track>,
    zones: Vec<Zone>,
    texts: Vec<BoardText>,
    drawings: Vec<Drawing>,
    next_id: u64,
}

impl MemoryBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every item of `board`, keeping its ids.
    pub fn from_board(board: &impl Board) -> Self {
        let mut copy = MemoryBoard {
            footprints: board.footprints(),
            tracks: board.tracks(),
            zones: board.zones(),
            texts: board.texts(),
            drawings: board.drawings(),
            next_id: 0,
        };
        copy.next_id = copy.max_id().map_or(0, |id| id.0);
        copy
    }

    fn max_id(&self) -> Option<ItemId> {
        self.footprints
            .iter()
            .map(|i| i.id)
            .chain(self.tracks.iter().map(|i| i.id))
            .chain(self.zones.iter().map(|i| i.id))
            .chain(self.texts.iter().map(|i| i.id))
            .chain(self.drawings.iter().map(|i| i.id))
            .max()
    }

    fn allocate(&mut self) -> ItemId {
        self.next_id += 1;
        ItemId(self.next_id)
    }

    pub fn add_footprint(&mut self, mut footprint: Footprint) -> ItemId {
        footprint.id = self.allocate();
        let id = footprint.id;
        self.footprints.push(footprint);
        id
    }

    pub fn footprint_by_reference(&self, reference: &str) -> Option<&Footprint> {
        self.footprints.iter().find(|fp| fp.reference == reference)
    }

    /// Drop everything except the listed items.
    pub fn retain(&mut self, keep: &[ItemRef]) {
        self.footprints
            .retain(|i| keep.contains(&ItemRef::Footprint(i.id)));
        self.tracks.retain(|i| keep.contains(&ItemRef::Track(i.id)));
        self.zones.retain(|i| keep.contains(&ItemRef::Zone(i.id)));
        self.texts.retain(|i| keep.contains(&ItemRef::Text(i.id)));
        self.drawings
            .retain(|i| keep.contains(&ItemRef::Drawing(i.id)));
    }

    fn footprint_mut(&mut self, id: ItemId) -> Result<&mut Footprint, BoardError> {
        self.footprints
            .iter_mut()
            .find(|fp| fp.id == id)
            .ok_or(BoardError::UnknownItem(ItemRef::Footprint(id)))
    }
}

impl Board for MemoryBoard {
    fn footprints(&self) -> Vec<Footprint> {
        self.footprints.clone()
    }

    fn footprint(&self, id: ItemId) -> Option<Footprint> {
        self.footprints.iter().find(|fp| fp.id == id).cloned()
    }

    fn tracks(&self) -> Vec<Track> {
        self.tracks.clone()
    }

    fn zones(&self) -> Vec<Zone> {
        self.zones.clone()
    }

    fn texts(&self) -> Vec<BoardText> {
        self.texts.clone()
    }

    fn drawings(&self) -> Vec<Drawing> {
        self.drawings.clone()
    }

    fn add_track(&mut self, mut track: Track) -> ItemId {
        track.id = self.allocate();
        let id = track.id;
        self.tracks.push(track);
        id
    }

    fn add_zone(&mut self, mut zone: Zone) -> ItemId {
        zone.id = self.allocate();
        let id = zone.id;
        self.zones.push(zone);
        id
    }

    fn add_text(&mut self, mut text: BoardText) -> ItemId {
        text.id = self.allocate();
        let id = text.id;
        self.texts.push(text);
        id
    }

    fn add_drawing(&mut self, mut drawing: Drawing) -> ItemId {
        drawing.id = self.allocate();
        let id = drawing.id;
        self.drawings.push(drawing);
        id
    }

    fn remove(&mut self, item: ItemRef) -> bool {
        fn take<T>(items: &mut Vec<T>, id: ItemId, item_id: impl Fn(&T) -> ItemId) -> bool {
            let before = items.len();
            items.retain(|i| item_id(i) != id);
            items.len() != before
        }

        match item {
            ItemRef::Footprint(id) => take(&mut self.footprints, id, |i| i.id),
            ItemRef::Track(id) => take(&mut self.tracks, id, |i| i.id),
            ItemRef::Zone(id) => take(&mut self.zones, id, |i| i.id),
            ItemRef::Text(id) => take(&mut self.texts, id, |i| i.id),
            ItemRef::Drawing(id) => take(&mut self.drawings, id, |i| i.id),
        }
    }

    fn set_footprint_position(&mut self, id: ItemId, position: Point) -> Result<(), BoardError> {
        let fp = self.footprint_mut(id)?;
        let delta = position - fp.position;
        fp.position = position;
        for text in &mut fp.texts {
            text.translate(delta);
        }
        Ok(())
    }

    fn set_footprint_orientation(
        &mut self,
        id: ItemId,
        orientation: f64,
    ) -> Result<(), BoardError> {
        let fp = self.footprint_mut(id)?;
        let delta = orientation - fp.orientation;
        fp.orientation = normalize_angle(orientation);
        let center = fp.position;
        for text in &mut fp.texts {
            text.rotate(center, delta);
        }
        Ok(())
    }

    fn flip_footprint(&mut self, id: ItemId) -> Result<(), BoardError> {
        let fp = self.footprint_mut(id)?;
        fp.flipped = !fp.flipped;
        fp.orientation = normalize_angle(-fp.orientation);
        let center = fp.position;
        for text in &mut fp.texts {
            text.flip(center);
        }
        Ok(())
    }

    fn set_footprint_text(
        &mut self,
        id: ItemId,
        index: usize,
        text: FootprintText,
    ) -> Result<(), BoardError> {
        let fp = self.footprint_mut(id)?;
        let slot = fp
            .texts
            .get_mut(index)
            .ok_or(BoardError::UnknownText {
                footprint: id,
                index,
            })?;
        *slot = text;
        Ok(())
    }

    fn set_footprint_margins(
        &mut self,
        id: ItemId,
        margins: LocalMargins,
    ) -> Result<(), BoardError> {
        self.footprint_mut(id)?.margins = margins;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Net, TextKind, TextSize, TrackKind};
    use crate::geometry::BoundingBox;

    fn footprint() -> Footprint {
        Footprint {
            id: ItemId(0),
            reference: "U1".into(),
            path: "/a/b".into(),
            position: Point::new(1_000, 1_000),
            orientation: 0.0,
            flipped: false,
            locked: false,
            extents: BoundingBox::from_points(Point::new(-100, -100), Point::new(100, 100)),
            pads: vec![],
            texts: vec![FootprintText {
                kind: TextKind::Reference,
                text: "U1".into(),
                position: Point::new(1_000, 800),
                angle: 0.0,
                layer: "F.SilkS".into(),
                size: TextSize {
                    width: 1_000,
                    height: 1_000,
                },
                thickness: 150,
                italic: false,
                visible: true,
                keep_upright: true,
            }],
            margins: LocalMargins::default(),
        }
    }

    #[test]
    fn test_ids_are_fresh() {
        let mut board = MemoryBoard::new();
        let fp = board.add_footprint(footprint());
        let track = board.add_track(Track {
            id: fp,
            kind: TrackKind::Segment,
            start: Point::new(0, 0),
            end: Point::new(10, 0),
            width: 2,
            layer: "F.Cu".into(),
            net: Net::new(1, "GND"),
        });
        assert_ne!(fp, track);
        assert!(board.remove(ItemRef::Track(track)));
        assert!(!board.remove(ItemRef::Track(track)));

        let mut copy = MemoryBoard::from_board(&board);
        assert_eq!(copy.footprints(), board.footprints());
        let added = copy.add_footprint(footprint());
        assert!(added > fp);
    }

    #[test]
    fn test_footprint_texts_follow_moves() {
        let mut board = MemoryBoard::new();
        let id = board.add_footprint(footprint());

        board
            .set_footprint_position(id, Point::new(2_000, 1_000))
            .unwrap();
        board.set_footprint_orientation(id, 90.0).unwrap();

        let fp = board.footprint(id).unwrap();
        assert_eq!(fp.orientation, 90.0);
        // (2000, 800) rotated a quarter turn about (2000, 1000)
        assert_eq!(fp.texts[0].position, Point::new(1_800, 1_000));
        assert_eq!(fp.texts[0].angle, 90.0);
    }

    #[test]
    fn test_flip_mirrors_texts() {
        let mut board = MemoryBoard::new();
        let id = board.add_footprint(footprint());
        board.set_footprint_orientation(id, 30.0).unwrap();
        board.flip_footprint(id).unwrap();

        let fp = board.footprint(id).unwrap();
        assert!(fp.flipped);
        assert_eq!(fp.orientation, 330.0);
        assert_eq!(fp.texts[0].layer, "B.SilkS");
        assert_eq!(fp.position, Point::new(1_000, 1_000));
    }

    #[test]
    fn test_unknown_footprint() {
        let mut board = MemoryBoard::new();
        let err = board.flip_footprint(ItemId(42)).unwrap_err();
        assert_eq!(err, BoardError::UnknownItem(ItemRef::Footprint(ItemId(42))));
    }
}
