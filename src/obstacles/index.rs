//! Obstacle index (C2): rivers + controlled-access highways, R-tree backed.
//!
//! An `rstar::RTree` keyed by bounding-box envelopes over polylines
//! resolved from an on-disk source, built once and read-only thereafter.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};

use rstar::{RTree, RTreeObject, AABB};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::geometry::{Point, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleKind {
    River,
    Highway,
}

/// A resolved polyline of at least two points, classified by kind.
struct Polyline {
    kind: ObstacleKind,
    points: Vec<Point>,
}

struct IndexedPolyline {
    envelope: AABB<[f64; 2]>,
    polyline_idx: usize,
}

impl RTreeObject for IndexedPolyline {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Outcome of a crossing query against the index.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossingResult {
    pub crosses_river: bool,
    pub crosses_highway: bool,
}

impl CrossingResult {
    pub fn crosses_any(&self) -> bool {
        self.crosses_river || self.crosses_highway
    }
}

/// Read-only, process-wide obstacle index. Built once (§4.2 singleton
/// semantics); after construction every query is lock-free.
pub struct ObstacleIndex {
    polylines: Vec<Polyline>,
    tree: RTree<IndexedPolyline>,
}

static MISSING_DATA_WARNING: Once = Once::new();

impl ObstacleIndex {
    /// Build an obstacle index from a pair of OSM-style JSON documents.
    /// A missing file degrades to an empty sub-index (queries for that
    /// kind return no crossing) with a warning surfaced once per process.
    pub fn load(rivers_path: &Path, highways_path: &Path) -> Result<Self> {
        let mut polylines = Vec::new();

        match load_filtered_ways(rivers_path, ObstacleKind::River) {
            Ok(mut rivers) => polylines.append(&mut rivers),
            Err(e) => warn_once_missing("rivers", rivers_path, &e),
        }
        match load_filtered_ways(highways_path, ObstacleKind::Highway) {
            Ok(mut highways) => polylines.append(&mut highways),
            Err(e) => warn_once_missing("highways", highways_path, &e),
        }

        let indexed: Vec<IndexedPolyline> = polylines
            .iter()
            .enumerate()
            .map(|(idx, poly)| IndexedPolyline {
                envelope: envelope_of(&poly.points),
                polyline_idx: idx,
            })
            .collect();
        let tree = RTree::bulk_load(indexed);

        Ok(ObstacleIndex { polylines, tree })
    }

    /// An empty index — used when no obstacle data is configured at all.
    pub fn empty() -> Self {
        ObstacleIndex {
            polylines: Vec::new(),
            tree: RTree::new(),
        }
    }

    /// Process-wide singleton accessor (§4.2, §5). The first caller for a
    /// given (rivers_path, highways_path) pair builds the index; concurrent
    /// first-use requests serialize on `OnceLock`'s built-in one-shot
    /// initializer, and every subsequent access is lock-free.
    pub fn singleton(rivers_path: &Path, highways_path: &Path) -> &'static ObstacleIndex {
        static REGISTRY: OnceLock<std::sync::Mutex<HashMap<(PathBuf, PathBuf), &'static ObstacleIndex>>> =
            OnceLock::new();
        let registry = REGISTRY.get_or_init(|| std::sync::Mutex::new(HashMap::new()));

        let key = (rivers_path.to_path_buf(), highways_path.to_path_buf());
        let mut guard = registry.lock().unwrap();
        if let Some(existing) = guard.get(&key) {
            return existing;
        }
        let built = ObstacleIndex::load(rivers_path, highways_path).unwrap_or_else(|e| {
            log::warn!("failed to build obstacle index: {e}; using empty index");
            ObstacleIndex::empty()
        });
        let leaked: &'static ObstacleIndex = Box::leak(Box::new(built));
        guard.insert(key, leaked);
        leaked
    }

    pub fn polyline_count(&self) -> usize {
        self.polylines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polylines.is_empty()
    }

    /// Query whether the segment (P, Q) crosses any indexed river and/or
    /// highway. Candidate polylines are narrowed via the R-tree envelope
    /// test (O(log N + k)); each candidate is then checked with an exact
    /// segment-polyline intersection, never an envelope-only approximation.
    pub fn query(&self, p: Point, q: Point, check_highways: bool) -> CrossingResult {
        if self.polylines.is_empty() {
            return CrossingResult::default();
        }

        let seg = Segment::new(p, q);
        let seg_envelope = envelope_of(&[p, q]);

        let mut result = CrossingResult::default();
        for candidate in self.tree.locate_in_envelope_intersecting(&seg_envelope) {
            let poly = &self.polylines[candidate.polyline_idx];
            if poly.kind == ObstacleKind::Highway && !check_highways {
                continue;
            }
            if result.crosses_river && (result.crosses_highway || !check_highways) {
                break;
            }
            if polyline_intersects(&seg, &poly.points) {
                match poly.kind {
                    ObstacleKind::River => result.crosses_river = true,
                    ObstacleKind::Highway => result.crosses_highway = true,
                }
            }
        }
        result
    }

    /// Exhaustive linear scan, used only to validate the R-tree query in
    /// tests (§8 "R-tree crossing query" algorithmic property).
    #[cfg(test)]
    fn query_exhaustive(&self, p: Point, q: Point, check_highways: bool) -> CrossingResult {
        let seg = Segment::new(p, q);
        let mut result = CrossingResult::default();
        for poly in &self.polylines {
            if poly.kind == ObstacleKind::Highway && !check_highways {
                continue;
            }
            if polyline_intersects(&seg, &poly.points) {
                match poly.kind {
                    ObstacleKind::River => result.crosses_river = true,
                    ObstacleKind::Highway => result.crosses_highway = true,
                }
            }
        }
        result
    }
}

fn warn_once_missing(label: &str, path: &Path, err: &Error) {
    MISSING_DATA_WARNING.call_once(|| {
        log::warn!(
            "obstacle data unavailable ({label}, {}): {err}; treating as empty",
            path.display()
        );
    });
}

fn polyline_intersects(seg: &Segment, points: &[Point]) -> bool {
    points
        .windows(2)
        .any(|w| seg.intersects(&Segment::new(w[0], w[1])))
}

fn envelope_of(points: &[Point]) -> AABB<[f64; 2]> {
    let mut min = [f64::INFINITY, f64::INFINITY];
    let mut max = [f64::NEG_INFINITY, f64::NEG_INFINITY];
    for p in points {
        min[0] = min[0].min(p.lon);
        min[1] = min[1].min(p.lat);
        max[0] = max[0].max(p.lon);
        max[1] = max[1].max(p.lat);
    }
    AABB::from_corners(min, max)
}

// --- OSM-style raw document parsing ---------------------------------------

#[derive(Deserialize)]
struct OsmDocument {
    elements: Vec<OsmElement>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum OsmElement {
    Node {
        id: u64,
        lat: f64,
        lon: f64,
    },
    Way {
        #[serde(default)]
        nodes: Vec<u64>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    #[serde(other)]
    Other,
}

const RIVER_TAGS: [&str; 3] = ["river", "stream", "canal"];
const HIGHWAY_TAGS: [&str; 3] = ["motorway", "trunk", "motorway_link"];

fn load_filtered_ways(path: &Path, kind: ObstacleKind) -> Result<Vec<Polyline>> {
    let text = std::fs::read_to_string(path)?;
    let doc: OsmDocument = serde_json::from_str(&text)?;

    let mut nodes: HashMap<u64, Point> = HashMap::new();
    for el in &doc.elements {
        if let OsmElement::Node { id, lat, lon } = el {
            nodes.insert(*id, Point::new(*lat, *lon));
        }
    }

    let wanted_tags: &[&str] = match kind {
        ObstacleKind::River => &RIVER_TAGS,
        ObstacleKind::Highway => &HIGHWAY_TAGS,
    };
    let tag_key = match kind {
        ObstacleKind::River => "waterway",
        ObstacleKind::Highway => "highway",
    };

    let mut polylines = Vec::new();
    for el in &doc.elements {
        if let OsmElement::Way { nodes: node_ids, tags } = el {
            let matches = tags
                .get(tag_key)
                .map(|v| wanted_tags.contains(&v.as_str()))
                .unwrap_or(false);
            if !matches {
                continue;
            }
            let points: Vec<Point> = node_ids.iter().filter_map(|id| nodes.get(id).copied()).collect();
            if points.len() >= 2 {
                polylines.push(Polyline { kind, points });
            }
        }
    }
    Ok(polylines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_DIR_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn test_scratch_dir() -> std::path::PathBuf {
        let n = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("lastmile_router_obstacle_index_test_{n}"));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_doc(dir: &std::path::Path, name: &str, json: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(json.as_bytes()).unwrap();
        path
    }

    #[test]
    fn missing_files_degrade_to_empty() {
        let idx = ObstacleIndex::load(
            Path::new("/nonexistent/rivers.json"),
            Path::new("/nonexistent/highways.json"),
        )
        .unwrap();
        assert!(idx.is_empty());
        let res = idx.query(Point::new(0.0, -1.0), Point::new(0.0, 1.0), true);
        assert!(!res.crosses_any());
    }

    #[test]
    fn rtree_query_matches_exhaustive_scan() {
        let rivers = r#"{"elements":[
            {"type":"node","id":1,"lat":0.0,"lon":-1.0},
            {"type":"node","id":2,"lat":0.0,"lon":1.0},
            {"type":"way","id":10,"nodes":[1,2],"tags":{"waterway":"river"}}
        ]}"#;
        let highways = r#"{"elements":[]}"#;

        let dir = test_scratch_dir();
        let rivers_path = write_doc(&dir, "rivers.json", rivers);
        let highways_path = write_doc(&dir, "highways.json", highways);

        let idx = ObstacleIndex::load(&rivers_path, &highways_path).unwrap();
        assert_eq!(idx.polyline_count(), 1);

        let probes = [
            (Point::new(-1.0, 0.0), Point::new(1.0, 0.0)),
            (Point::new(5.0, 5.0), Point::new(6.0, 6.0)),
            (Point::new(0.5, -0.5), Point::new(0.5, 0.5)),
        ];
        for (p, q) in probes {
            let fast = idx.query(p, q, false);
            let slow = idx.query_exhaustive(p, q, false);
            assert_eq!(fast.crosses_river, slow.crosses_river);
        }
    }
}
