//! JSON description of a navigation graph.

use crate::error::AppError;
use crate::model::{CoreData, Direction, Edge, Sequence, SpatialData};
use crate::types::{CameraType, CaptureId, ImageSize, LngLat, SequenceId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use url::Url;

/// A whole graph: sequences, capture metadata and spatial edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphFixture {
    #[serde(default)]
    pub sequences: Vec<SequenceRecord>,
    #[serde(default)]
    pub captures: Vec<CaptureRecord>,
    #[serde(default)]
    pub spatial_edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub id: SequenceId,
    pub image_ids: Vec<CaptureId>,
}

/// Flat capture metadata as stored in a fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub id: CaptureId,
    pub sequence_id: SequenceId,
    pub lng_lat: LngLat,
    #[serde(default)]
    pub computed_lng_lat: Option<LngLat>,
    pub camera_type: CameraType,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub computed_rotation: [f64; 3],
    #[serde(default)]
    pub merged: bool,
    pub captured_at: DateTime<Utc>,
    pub image_url: Url,
    #[serde(default)]
    pub thumbnails: BTreeMap<ImageSize, Url>,
    #[serde(default)]
    pub mesh_url: Option<Url>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: CaptureId,
    pub target: CaptureId,
    pub direction: Direction,
    #[serde(default)]
    pub motion_azimuth: f64,
}

impl GraphFixture {
    /// Reads and validates a fixture file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)?;
        let fixture: GraphFixture =
            serde_json::from_str(&text).map_err(|source| AppError::JsonParseError {
                path: path.to_path_buf(),
                source,
            })?;
        fixture.validate()?;
        log::debug!(
            "Loaded fixture {}: {} sequences, {} captures, {} spatial edges",
            path.display(),
            fixture.sequences.len(),
            fixture.captures.len(),
            fixture.spatial_edges.len()
        );
        Ok(fixture)
    }

    /// Every capture belongs to a known sequence and every spatial edge joins
    /// known captures. Sequential directions are derived, not stored.
    pub fn validate(&self) -> Result<(), AppError> {
        let sequences: HashSet<&SequenceId> = self.sequences.iter().map(|s| &s.id).collect();
        let captures: HashSet<&CaptureId> = self.captures.iter().map(|c| &c.id).collect();

        if let Some(record) = self
            .captures
            .iter()
            .find(|c| !sequences.contains(&c.sequence_id))
        {
            return Err(AppError::SequenceNotFound(record.sequence_id.clone()));
        }

        for edge in &self.spatial_edges {
            for end in [&edge.source, &edge.target] {
                if !captures.contains(end) {
                    return Err(AppError::CaptureNotFound(end.clone()));
                }
            }
            if edge.direction.is_sequential() {
                return Err(ValidationError::Malformed {
                    field: "spatial edge direction",
                    input: format!("{} -> {} ({})", edge.source, edge.target, edge.direction),
                }
                .into());
            }
        }
        Ok(())
    }
}

impl SequenceRecord {
    pub fn to_sequence(&self) -> Sequence {
        Sequence::new(self.id.clone(), self.image_ids.clone())
    }
}

impl CaptureRecord {
    pub fn core(&self) -> CoreData {
        CoreData {
            sequence_id: self.sequence_id.clone(),
            original_lng_lat: self.lng_lat,
            computed_lng_lat: self.computed_lng_lat,
        }
    }

    pub fn spatial(&self) -> SpatialData {
        SpatialData {
            camera_type: self.camera_type,
            width: self.width,
            height: self.height,
            quality_score: self.quality_score,
            computed_rotation: self.computed_rotation,
            merged: self.merged,
            captured_at: self.captured_at,
            image_url: self.image_url.clone(),
            thumbnails: self.thumbnails.clone(),
            mesh_url: self.mesh_url.clone(),
        }
    }
}

impl EdgeRecord {
    pub fn to_edge(&self) -> Edge {
        Edge::new(self.source.clone(), self.target.clone(), self.direction)
            .with_motion_azimuth(self.motion_azimuth)
    }
}
