use crate::geo::bearing::{resolve_bearing, Bearing};
use crate::geo::triangulation::Ray;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

pub type PanoId = String;
pub type DetectionId = String;
pub type ObjectId = String;
pub type ObservationId = String;

/// Observation lists keyed by owning object.
pub type ObservationMap = BTreeMap<ObjectId, Vec<Observation>>;

/// Axis-aligned detection box in panorama pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn center_x(&self) -> f64 {
        0.5 * (self.xmin + self.xmax)
    }
}

/// Panorama pose as delivered by the ingestion layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panorama {
    pub id: PanoId,
    pub lat: f64,
    pub lng: f64,
    /// Compass heading of the image center column (degrees).
    pub heading_deg: f64,
    pub image_width: u32,
    pub image_height: u32,
}

/// Bounding box found in one panorama.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub id: DetectionId,
    pub pano_id: PanoId,
    #[serde(flatten)]
    pub bbox: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Detection {
    /// Builds a detection whose id is derived from its geometric fields.
    pub fn new(pano_id: impl Into<PanoId>, bbox: BoundingBox, score: Option<f64>) -> Self {
        let pano_id = pano_id.into();
        Self {
            id: detection_id(&pano_id, &bbox, score),
            pano_id,
            bbox,
            score,
        }
    }
}

/// Deterministic detection identity: re-parsing the same source row yields
/// the same id.
pub fn detection_id(pano_id: &str, bbox: &BoundingBox, score: Option<f64>) -> DetectionId {
    let score = score.map(|s| s.to_string()).unwrap_or_default();
    format!(
        "{}_{}_{}_{}_{}_{}",
        pano_id, bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax, score
    )
}

/// Observation id for a detection bound to an object.
pub fn observation_id(object_id: &str, detection_id: &str) -> ObservationId {
    format!("obs_{object_id}_{detection_id}")
}

/// Detection resolved into bearing form and bound to one object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: ObservationId,
    pub object_id: ObjectId,
    pub detection_id: DetectionId,
    pub pano_id: PanoId,
    #[serde(flatten)]
    pub bbox: BoundingBox,
    pub center_x: f64,
    pub bearing_deg: f64,
    pub pano_lat: f64,
    pub pano_lng: f64,
    pub created_at_ms: u64,
}

impl Observation {
    /// Resolves `detection` against its panorama and binds it to `object_id`.
    pub fn resolve(
        object_id: &str,
        detection: &Detection,
        pano: &Panorama,
        created_at_ms: u64,
    ) -> Result<Self> {
        let bearing = resolve_bearing(&detection.bbox, pano)?;
        Ok(Self::from_bearing(
            object_id,
            detection,
            pano,
            bearing,
            created_at_ms,
        ))
    }

    /// Builds an observation from an already resolved bearing.
    pub fn from_bearing(
        object_id: &str,
        detection: &Detection,
        pano: &Panorama,
        bearing: Bearing,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id: observation_id(object_id, &detection.id),
            object_id: object_id.to_string(),
            detection_id: detection.id.clone(),
            pano_id: detection.pano_id.clone(),
            bbox: detection.bbox,
            center_x: bearing.center_x,
            bearing_deg: bearing.bearing_deg,
            pano_lat: pano.lat,
            pano_lng: pano.lng,
            created_at_ms,
        }
    }

    pub fn ray(&self) -> Ray {
        Ray {
            lat: self.pano_lat,
            lng: self.pano_lng,
            bearing_deg: self.bearing_deg,
        }
    }
}

/// Wall-clock time in unix milliseconds.
pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_id_is_stable_across_reparse() {
        let bbox = BoundingBox::new(10.0, 20.5, 30.0, 40.0);
        let a = Detection::new("pano_a", bbox, Some(0.9));
        let b = Detection::new("pano_a".to_string(), bbox, Some(0.9));
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, "pano_a_10_20.5_30_40_0.9");
    }

    #[test]
    fn detection_id_without_score_has_empty_suffix() {
        let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(detection_id("p", &bbox, None), "p_1_2_3_4_");
    }

    #[test]
    fn detection_serializes_flat_box() {
        let det = Detection::new("p", BoundingBox::new(1.0, 2.0, 3.0, 4.0), None);
        let json = serde_json::to_value(&det).expect("serialize");
        assert_eq!(json["panoId"], "p");
        assert_eq!(json["xmax"], 3.0);
        assert!(json.get("score").is_none());
    }
}
