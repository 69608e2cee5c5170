//! Segment registry
//!
//! The stream network comes from DEM preprocessing as a JSON file:
//!
//! ```json
//! { "segments": [
//!     { "id": 12, "length": 842.5, "slope_class": 2,
//!       "course": [[512300.0, 4620110.0], [512310.0, 4620090.0]] }
//! ] }
//! ```
//!
//! Records keep file order; each carries its position as `sequence`, so
//! logs and output layers line up with the input without relying on map
//! iteration order.

use crate::error::RunError;
use geo_types::{Coord, LineString};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSegment {
    id: i64,
    #[serde(default)]
    length: Option<f64>,
    slope_class: i64,
    course: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct RawRegistry {
    segments: Vec<RawSegment>,
}

/// One stream segment as delivered by preprocessing
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRecord {
    /// Position in the registry file
    pub sequence: usize,
    pub id: i64,
    /// Reach length in map units; checked when the segment is processed
    pub length: Option<f64>,
    /// Gradient class, 1 (low) to 3 (high)
    pub slope_class: i64,
    /// Stream course, upstream to downstream
    pub course: LineString<f64>,
}

/// Ordered, id-unique set of segments
#[derive(Debug, Clone, Default)]
pub struct SegmentRegistry {
    records: Vec<SegmentRecord>,
}

impl SegmentRegistry {
    pub fn from_records(records: Vec<SegmentRecord>) -> Result<Self, RunError> {
        let mut seen = HashSet::new();
        for r in &records {
            if !seen.insert(r.id) {
                return Err(RunError::Registry(format!("duplicate segment id {}", r.id)));
            }
        }
        Ok(Self { records })
    }

    pub fn from_json_str(text: &str) -> Result<Self, RunError> {
        let raw: RawRegistry =
            serde_json::from_str(text).map_err(|e| RunError::Registry(e.to_string()))?;

        let records = raw
            .segments
            .into_iter()
            .enumerate()
            .map(|(sequence, s)| {
                if s.course.is_empty() {
                    return Err(RunError::Registry(format!(
                        "segment {} has an empty course",
                        s.id
                    )));
                }
                let coords: Vec<Coord<f64>> =
                    s.course.iter().map(|&[x, y]| Coord { x, y }).collect();
                Ok(SegmentRecord {
                    sequence,
                    id: s.id,
                    length: s.length,
                    slope_class: s.slope_class,
                    course: LineString::new(coords),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_records(records)
    }

    pub fn load(path: &Path) -> Result<Self, RunError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn records(&self) -> &[SegmentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&SegmentRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Records from the first one with `id >= start_id`, at most `limit` of them
    pub fn select(&self, start_id: i64, limit: Option<usize>) -> &[SegmentRecord] {
        let start = self
            .records
            .iter()
            .position(|r| r.id >= start_id)
            .unwrap_or(self.records.len());
        let rest = &self.records[start..];
        match limit {
            Some(n) => &rest[..n.min(rest.len())],
            None => rest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"{ "segments": [
        { "id": 3, "length": 120.0, "slope_class": 1, "course": [[0, 0], [0, 120]] },
        { "id": 1, "slope_class": 3, "course": [[5, 5]] },
        { "id": 7, "length": 80.0, "slope_class": 2, "course": [[1, 1], [2, 2]] }
    ] }"#;

    #[test]
    fn test_file_order_and_sequence() {
        let reg = SegmentRegistry::from_json_str(REGISTRY).unwrap();
        let ids: Vec<i64> = reg.records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1, 7]);
        assert_eq!(reg.get(7).unwrap().sequence, 2);
        assert_eq!(reg.get(1).unwrap().length, None);
        assert_eq!(reg.get(3).unwrap().course.0.len(), 2);
    }

    #[test]
    fn test_select_start_and_limit() {
        let reg = SegmentRegistry::from_json_str(REGISTRY).unwrap();
        assert_eq!(reg.select(0, None).len(), 3);
        assert_eq!(reg.select(0, Some(2)).len(), 2);
        let from_seven = reg.select(5, None);
        assert_eq!(from_seven.len(), 1);
        assert_eq!(from_seven[0].id, 7);
        assert!(reg.select(100, None).is_empty());
    }

    #[test]
    fn test_duplicates_and_empty_course_rejected() {
        let dup = r#"{ "segments": [
            { "id": 1, "slope_class": 1, "course": [[0, 0]] },
            { "id": 1, "slope_class": 2, "course": [[0, 0]] } ] }"#;
        assert!(matches!(
            SegmentRegistry::from_json_str(dup),
            Err(RunError::Registry(_))
        ));

        let empty = r#"{ "segments": [ { "id": 1, "slope_class": 1, "course": [] } ] }"#;
        assert!(SegmentRegistry::from_json_str(empty).is_err());
    }
}
