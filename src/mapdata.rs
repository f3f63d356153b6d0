//! External map-description input.
//!
//! This stands in for the WAD/lump reader the real engine would hand the
//! builder — out of scope here (see crate root docs) — with a plain JSON
//! format carrying the same four tables: vertices, linedefs, sidedefs and
//! sectors. `MapDescription::load` is the one way a caller gets data into
//! [`crate::builder::NodeBuilder`].
//!
//! Validation here is purely structural (do the indices stay in range); the
//! builder itself is responsible for geometric validation such as
//! zero-length linedefs, since that's where those invariants actually live.

use std::path::Path;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::BspError;

bitflags! {
    /// Linedef behaviour flags. Opaque to the builder except `TWO_SIDED`,
    /// which is cross-checked against whether a back sidedef is present.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct LinedefFlags: u16 {
        const IMPASSABLE     = 0x0001;
        const BLOCK_MONSTERS = 0x0002;
        const TWO_SIDED      = 0x0004;
        const UPPER_UNPEGGED = 0x0010;
        const LOWER_UNPEGGED = 0x0020;
        const SECRET         = 0x0040;
        const BLOCK_SOUND    = 0x0080;
        const NOT_ON_MAP     = 0x0200;
    }
}

/// A map-space point. Doubles are used to avoid T-junction drift across
/// repeated splits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

/// Authored edge of the map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineDef {
    pub v1: usize,
    pub v2: usize,
    pub flags: LinedefFlags,
    /// Opaque to the builder; carried through to the output for the
    /// renderer and the archived cache.
    pub special: u16,
    pub tag: u16,
    pub front_sidedef: Option<usize>,
    pub back_sidedef: Option<usize>,
}

impl LineDef {
    pub fn is_two_sided(&self) -> bool {
        self.front_sidedef.is_some() && self.back_sidedef.is_some()
    }
}

/// One side's adjacency record: which sector it faces and its (opaque)
/// texture references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideDef {
    pub sector: usize,
    pub x_offset: i32,
    pub y_offset: i32,
    pub upper_texture: String,
    pub lower_texture: String,
    pub middle_texture: String,
}

/// A region of uniform floor/ceiling/lighting, opaque to the builder beyond
/// `BuildState`'s own indexing use of it. The builder never mutates a
/// `Sector`; an unclosed or mismatched sector is reported through
/// `BuiltMap::diagnostics` instead (see `DESIGN.md`'s resolution of the
/// "unclosed sector flag" open question).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sector {
    pub floor_height: i32,
    pub ceiling_height: i32,
    pub floor_texture: String,
    pub ceiling_texture: String,
    pub light_level: i32,
    pub special: i32,
    pub tag: i32,
}

/// The full input to a build: everything the external map-loader
/// collaborator would otherwise hand the builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDescription {
    pub vertices: Vec<Vertex>,
    pub linedefs: Vec<LineDef>,
    pub sidedefs: Vec<SideDef>,
    pub sectors: Vec<Sector>,
}

impl MapDescription {
    /// Load and structurally validate a map description from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BspError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let map: MapDescription =
            serde_json::from_str(&text).map_err(|source| BspError::LoadMap {
                path: path.to_path_buf(),
                source,
            })?;
        map.validate()?;
        Ok(map)
    }

    /// Check that every index into another table stays in range. Does not
    /// check geometry; that's the builder's job.
    pub fn validate(&self) -> Result<(), BspError> {
        for (i, ld) in self.linedefs.iter().enumerate() {
            if ld.v1 >= self.vertices.len() {
                return Err(BspError::VertexIndexOutOfRange { linedef: i, vertex: ld.v1 });
            }
            if ld.v2 >= self.vertices.len() {
                return Err(BspError::VertexIndexOutOfRange { linedef: i, vertex: ld.v2 });
            }
            if let Some(s) = ld.front_sidedef {
                if s >= self.sidedefs.len() {
                    return Err(BspError::SidedefIndexOutOfRange { linedef: i, sidedef: s });
                }
            }
            if let Some(s) = ld.back_sidedef {
                if s >= self.sidedefs.len() {
                    return Err(BspError::SidedefIndexOutOfRange { linedef: i, sidedef: s });
                }
            }
            if ld.front_sidedef.is_none() && ld.back_sidedef.is_none() {
                return Err(BspError::NoSidedefs { linedef: i });
            }
        }
        for (i, sd) in self.sidedefs.iter().enumerate() {
            if sd.sector >= self.sectors.len() {
                return Err(BspError::SectorIndexOutOfRange { sidedef: i, sector: sd.sector });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_room() -> MapDescription {
        MapDescription {
            vertices: vec![
                Vertex { x: 0.0, y: 0.0 },
                Vertex { x: 256.0, y: 0.0 },
                Vertex { x: 256.0, y: 256.0 },
                Vertex { x: 0.0, y: 256.0 },
            ],
            linedefs: (0..4)
                .map(|i| LineDef {
                    v1: i,
                    v2: (i + 1) % 4,
                    flags: LinedefFlags::IMPASSABLE,
                    special: 0,
                    tag: 0,
                    front_sidedef: Some(i),
                    back_sidedef: None,
                })
                .collect(),
            sidedefs: (0..4)
                .map(|_| SideDef {
                    sector: 0,
                    x_offset: 0,
                    y_offset: 0,
                    upper_texture: String::new(),
                    lower_texture: String::new(),
                    middle_texture: "WALL".into(),
                })
                .collect(),
            sectors: vec![Sector {
                floor_height: 0,
                ceiling_height: 128,
                floor_texture: "FLOOR".into(),
                ceiling_texture: "CEIL".into(),
                light_level: 192,
                special: 0,
                tag: 0,
            }],
        }
    }

    #[test]
    fn square_room_validates() {
        square_room().validate().unwrap();
    }

    #[test]
    fn round_trips_through_json() {
        let map = square_room();
        let json = serde_json::to_string(&map).unwrap();
        let back: MapDescription = serde_json::from_str(&json).unwrap();
        assert_eq!(back.vertices.len(), map.vertices.len());
        assert_eq!(back.linedefs.len(), map.linedefs.len());
    }

    #[test]
    fn rejects_out_of_range_vertex() {
        let mut map = square_room();
        map.linedefs[0].v2 = 99;
        assert!(matches!(
            map.validate(),
            Err(BspError::VertexIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_sidedef_less_linedef() {
        let mut map = square_room();
        map.linedefs[0].front_sidedef = None;
        assert!(matches!(map.validate(), Err(BspError::NoSidedefs { .. })));
    }
}
