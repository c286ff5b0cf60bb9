use anyhow::Result;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use pcb_replicate::board::{
    BoardText, Drawing, Footprint, FootprintText, LocalMargins, Net, Pad, Shape, TextKind,
    TextSize, Track, TrackKind, Zone,
};
use pcb_replicate::geometry::{BoundingBox, Point};
use pcb_replicate::ItemId;
use pcb_test_utils::legacy_sch::annotated_component_block;
use std::path::PathBuf;

#[allow(unused)]
pub use pcb_test_utils::init_logger;
#[allow(unused)]
pub use pcb_test_utils::legacy_sch::{document, sheet_block};

#[allow(unused)]
pub const SHEET_A: &str = "5C000001";
#[allow(unused)]
pub const SHEET_B: &str = "5C000002";
#[allow(unused)]
pub const U_KEY: &str = "5E000003";
#[allow(unused)]
pub const R_KEY: &str = "5E000001";
#[allow(unused)]
pub const C_KEY: &str = "5E000002";
#[allow(unused)]
pub const J_KEY: &str = "5F000001";

/// A component of the "Amp A" instance, annotated with its sheet path.
#[allow(unused)]
pub fn component_block(lib: &str, reference: &str, timestamp: &str, value: &str) -> String {
    let path = format!("/{SHEET_A}/{timestamp}");
    annotated_component_block(lib, reference, timestamp, &path, value)
}

/// Amplifier page with one op-amp, one resistor and one capacitor.
#[allow(unused)]
pub fn amp_page(resistor: &str, resistor_value: &str) -> String {
    document(&[
        component_block("Device:R", resistor, R_KEY, resistor_value),
        component_block("Device:C", "C5", C_KEY, "100n"),
        component_block("Amplifier:OPA", "U5", U_KEY, "OPA333"),
    ])
}

/// `top.sch` instantiating `amp.sch` as "Amp A" and "Amp B".
/// Returns the root sheet path.
#[allow(unused)]
pub fn amp_project(temp: &TempDir) -> Result<PathBuf> {
    temp.child("top.sch").write_str(&document(&[
        sheet_block(SHEET_A, "Amp A", "amp.sch"),
        sheet_block(SHEET_B, "Amp B", "amp.sch"),
        component_block("Connector:Conn", "J1", J_KEY, "CONN"),
    ]))?;
    temp.child("amp.sch").write_str(&amp_page("R5", "10k"))?;
    Ok(temp.path().join("top.sch"))
}

/// Stable code per net name.
#[allow(unused)]
pub fn net(name: &str) -> Net {
    Net::new(name.bytes().map(u32::from).sum(), name)
}

#[allow(unused)]
pub fn text(kind: TextKind, text: &str, x: f64, y: f64) -> FootprintText {
    FootprintText {
        kind,
        text: text.into(),
        position: Point::from_mm(x, y),
        angle: 0.0,
        layer: "F.SilkS".into(),
        size: TextSize {
            width: 1_000_000,
            height: 1_000_000,
        },
        thickness: 150_000,
        italic: false,
        visible: true,
        keep_upright: true,
    }
}

/// A 2x2 mm footprint with reference text above and value text below.
#[allow(unused)]
pub fn footprint(reference: &str, path: &str, x: f64, y: f64, pads: &[(&str, &str)]) -> Footprint {
    Footprint {
        id: ItemId(0),
        reference: reference.into(),
        path: path.into(),
        position: Point::from_mm(x, y),
        orientation: 0.0,
        flipped: false,
        locked: false,
        extents: BoundingBox::from_points(Point::from_mm(-1.0, -1.0), Point::from_mm(1.0, 1.0)),
        pads: pads
            .iter()
            .map(|(name, n)| Pad {
                name: name.to_string(),
                net: net(n),
            })
            .collect(),
        texts: vec![
            text(TextKind::Reference, reference, x, y - 1.5),
            text(TextKind::Value, "value", x, y + 1.5),
        ],
        margins: LocalMargins::default(),
    }
}

/// Footprints `[U, R, C]` of one amplifier instance.
#[allow(unused)]
pub fn amp_footprints(
    sheet_id: &str,
    sheet_name: &str,
    suffix: u32,
    u_at: (f64, f64),
    r_at: (f64, f64),
    c_at: (f64, f64),
) -> Vec<Footprint> {
    let n = |local: &str| format!("/{sheet_name}/{local}");
    let (input, output, mid) = (n("IN"), n("OUT"), n("MID"));
    let (input, output, mid) = (input.as_str(), output.as_str(), mid.as_str());
    vec![
        footprint(
            &format!("U{suffix}"),
            &format!("/{sheet_id}/{U_KEY}"),
            u_at.0,
            u_at.1,
            &[("1", input), ("2", output), ("3", "GND")],
        ),
        footprint(
            &format!("R{suffix}"),
            &format!("/{sheet_id}/{R_KEY}"),
            r_at.0,
            r_at.1,
            &[("1", input), ("2", mid)],
        ),
        footprint(
            &format!("C{suffix}"),
            &format!("/{sheet_id}/{C_KEY}"),
            c_at.0,
            c_at.1,
            &[("1", mid), ("2", output)],
        ),
    ]
}

/// Root-level connector sharing both inputs and ground.
#[allow(unused)]
pub fn connector() -> Footprint {
    footprint(
        "J1",
        &format!("/{J_KEY}"),
        40.0,
        50.0,
        &[("1", "/Amp A/IN"), ("2", "/Amp B/IN"), ("3", "GND")],
    )
}

#[allow(unused)]
pub fn track(x1: f64, y1: f64, x2: f64, y2: f64, net_name: &str) -> Track {
    Track {
        id: ItemId(0),
        kind: TrackKind::Segment,
        start: Point::from_mm(x1, y1),
        end: Point::from_mm(x2, y2),
        width: 200_000,
        layer: "F.Cu".into(),
        net: net(net_name),
    }
}

/// Rectangular zone with corners `(x1, y1)` and `(x2, y2)`.
#[allow(unused)]
pub fn zone(layer: &str, net_name: &str, x1: f64, y1: f64, x2: f64, y2: f64) -> Zone {
    Zone {
        id: ItemId(0),
        layer: layer.into(),
        net: net(net_name),
        outline: vec![
            Point::from_mm(x1, y1),
            Point::from_mm(x2, y1),
            Point::from_mm(x2, y2),
            Point::from_mm(x1, y2),
        ],
        keepout: false,
        priority: 0,
    }
}

#[allow(unused)]
pub fn board_text(text: &str, x: f64, y: f64) -> BoardText {
    BoardText {
        id: ItemId(0),
        text: text.into(),
        position: Point::from_mm(x, y),
        angle: 0.0,
        layer: "F.SilkS".into(),
        size: TextSize {
            width: 1_000_000,
            height: 1_000_000,
        },
        thickness: 150_000,
    }
}

#[allow(unused)]
pub fn segment(layer: &str, x1: f64, y1: f64, x2: f64, y2: f64) -> Drawing {
    Drawing {
        id: ItemId(0),
        shape: Shape::Segment {
            start: Point::from_mm(x1, y1),
            end: Point::from_mm(x2, y2),
        },
        width: 100_000,
        layer: layer.into(),
    }
}
