use anyhow::Result;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use pcb_replicate::board::{Board, Drawing, Shape};
use pcb_replicate::geometry::{BoundingBox, Point};
use pcb_replicate::selection::LocalGeometry;
use pcb_replicate::{
    sheets_to_replicate, ComponentIndex, ContainmentPolicy, ItemId, ItemRef, MemoryBoard,
    NoProgress, ReplicateOptions, Replicator, SelectionError,
};
use pcb_sch_legacy::parse_hierarchy;
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

mod helpers;
use helpers::*;

const CHANNEL_A: &str = "5C000001";
const CHANNEL_B: &str = "5C000002";
const STAGE_1: &str = "5D000001";
const STAGE_2: &str = "5D000002";

/// top -> channel.sch x2 -> stage.sch x2, one resistor per stage.
fn nested_project(temp: &TempDir) -> Result<PathBuf> {
    temp.child("top.sch").write_str(&document(&[
        sheet_block(CHANNEL_A, "Channel A", "channel.sch"),
        sheet_block(CHANNEL_B, "Channel B", "channel.sch"),
    ]))?;
    temp.child("channel.sch").write_str(&document(&[
        sheet_block(STAGE_1, "Stage 1", "stage.sch"),
        sheet_block(STAGE_2, "Stage 2", "stage.sch"),
    ]))?;
    temp.child("stage.sch")
        .write_str(&document(&[component_block("Device:R", "R1", R_KEY, "1k")]))?;
    Ok(temp.path().join("top.sch"))
}

fn nested_board() -> MemoryBoard {
    let mut board = MemoryBoard::new();
    let stages = [
        ("R10", CHANNEL_A, STAGE_1, 10.0, 10.0),
        ("R11", CHANNEL_A, STAGE_2, 15.0, 10.0),
        ("R12", CHANNEL_B, STAGE_1, 50.0, 10.0),
        ("R13", CHANNEL_B, STAGE_2, 90.0, 90.0),
    ];
    for (reference, channel, stage, x, y) in stages {
        board.add_footprint(footprint(
            reference,
            &format!("/{channel}/{stage}/{R_KEY}"),
            x,
            y,
            &[("1", "GND")],
        ));
    }
    board
}

fn sheet(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_sheets_at_each_level() -> Result<()> {
    init_logger();
    let temp = TempDir::new()?;
    let root = nested_project(&temp)?;
    let board = nested_board();
    let index = ComponentIndex::build(&board, &parse_hierarchy(&root)?)?;

    let stage = temp.path().join("stage.sch");
    let channel = temp.path().join("channel.sch");

    assert_eq!(
        sheets_to_replicate(&index, "R10", &stage)?,
        vec![
            sheet(&[CHANNEL_A, STAGE_2]),
            sheet(&[CHANNEL_B, STAGE_1]),
            sheet(&[CHANNEL_B, STAGE_2]),
        ]
    );
    assert_eq!(
        sheets_to_replicate(&index, "R10", &channel)?,
        vec![sheet(&[CHANNEL_B])]
    );
    assert_eq!(
        sheets_to_replicate(&index, "R10", &root),
        Err(SelectionError::LevelNotInPath {
            reference: "R10".into(),
            level: root.clone(),
        })
    );
    assert_eq!(
        sheets_to_replicate(&index, "R99", &stage),
        Err(SelectionError::UnknownReference("R99".into()))
    );

    assert_eq!(
        index.levels("R13"),
        Some(vec![
            ("Channel B".to_string(), channel),
            ("Stage 2".to_string(), stage),
        ])
    );
    Ok(())
}

#[test]
fn test_nested_instances_pair_by_path() -> Result<()> {
    init_logger();
    let temp = TempDir::new()?;
    let root = nested_project(&temp)?;
    let mut board = nested_board();
    let channel = temp.path().join("channel.sch");

    // All four resistors share one identity key; the sheet path decides
    Replicator::from_root_sheet(&mut board, &root)?.replicate(
        "R10",
        &channel,
        &ReplicateOptions::default(),
        NoProgress,
    )?;

    let at = |reference: &str| board.footprint_by_reference(reference).unwrap().position;
    assert_eq!(at("R12"), Point::from_mm(50.0, 10.0));
    assert_eq!(at("R13"), Point::from_mm(55.0, 10.0));
    Ok(())
}

#[test]
fn test_local_geometry_capture() {
    init_logger();
    let mut board = MemoryBoard::new();
    let region = BoundingBox::from_points(Point::from_mm(0.0, 0.0), Point::from_mm(10.0, 10.0));
    let local: BTreeSet<String> = ["L".to_string()].into();

    let far_local = board.add_track(track(20.0, 20.0, 25.0, 25.0, "L"));
    let far_shared = board.add_track(track(20.0, 20.0, 25.0, 25.0, "G"));
    let near_shared = board.add_track(track(1.0, 1.0, 2.0, 2.0, "G"));
    let straddling = board.add_track(track(8.0, 8.0, 12.0, 12.0, "G"));

    let line = |layer: &str| Drawing {
        id: ItemId(0),
        shape: Shape::Segment {
            start: Point::from_mm(1.0, 1.0),
            end: Point::from_mm(9.0, 1.0),
        },
        width: 100_000,
        layer: layer.into(),
    };
    let outline = board.add_drawing(line("Edge.Cuts"));
    let silk = board.add_drawing(line("F.SilkS"));

    let none = HashSet::new();
    let containing =
        LocalGeometry::capture(&board, &region, &local, ContainmentPolicy::Containing, &none);
    let tracks: Vec<_> = containing.tracks.iter().map(|t| t.id).collect();
    assert!(tracks.contains(&far_local));
    assert!(tracks.contains(&near_shared));
    assert!(!tracks.contains(&far_shared));
    assert!(!tracks.contains(&straddling));

    let drawings: Vec<_> = containing.drawings.iter().map(|d| d.id).collect();
    assert_eq!(drawings, vec![silk]);
    assert!(!drawings.contains(&outline));

    let intersecting =
        LocalGeometry::capture(&board, &region, &local, ContainmentPolicy::Intersecting, &none);
    assert!(intersecting.tracks.iter().any(|t| t.id == straddling));

    let excluded: HashSet<ItemRef> = [ItemRef::Track(near_shared)].into();
    let without =
        LocalGeometry::capture(&board, &region, &local, ContainmentPolicy::Containing, &excluded);
    assert!(without.tracks.iter().all(|t| t.id != near_shared));
    assert!(!without.is_empty());
}

#[test]
fn test_nets_shared_with_outside_are_not_local() {
    let inside = amp_footprints(SHEET_A, "Amp A", 1, (10.0, 10.0), (12.0, 10.0), (10.0, 13.0));
    let outside = vec![connector()];
    let nets = pcb_replicate::selection::local_nets(&inside, &outside);
    let expected: BTreeSet<String> = ["/Amp A/MID".into(), "/Amp A/OUT".into()].into();
    assert_eq!(nets, expected);
}
