//! JSON scene files: panoramas, detections and an optional saved
//! observation map.
//!
//! Detection records may omit `id`; it is then derived from the geometric
//! fields, so re-loading the same file yields the same ids.

use crate::io::read_json_file;
use crate::scene::Scene;
use crate::types::{detection_id, BoundingBox, Detection, ObservationMap, Panorama};
use serde::Deserialize;
use std::path::Path;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub pano_id: String,
    #[serde(flatten)]
    pub bbox: BoundingBox,
    #[serde(default)]
    pub score: Option<f64>,
}

impl DetectionRecord {
    pub fn into_detection(self) -> Detection {
        let id = self
            .id
            .unwrap_or_else(|| detection_id(&self.pano_id, &self.bbox, self.score));
        Detection {
            id,
            pano_id: self.pano_id,
            bbox: self.bbox,
            score: self.score,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneFile {
    pub panoramas: Vec<Panorama>,
    pub detections: Vec<DetectionRecord>,
    #[serde(default)]
    pub observations: ObservationMap,
}

impl SceneFile {
    /// Splits the file into a validated scene and its observation map.
    pub fn into_scene(self) -> Result<(Scene, ObservationMap), String> {
        let detections = self
            .detections
            .into_iter()
            .map(DetectionRecord::into_detection)
            .collect();
        let scene = Scene::new(self.panoramas, detections).map_err(|e| e.to_string())?;
        scene
            .check_observations(&self.observations)
            .map_err(|e| e.to_string())?;
        Ok((scene, self.observations))
    }
}

pub fn load_scene(path: &Path) -> Result<(Scene, ObservationMap), String> {
    let file: SceneFile = read_json_file(path, "scene")?;
    file.into_scene()
        .map_err(|e| format!("Invalid scene {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ids_are_derived() {
        let json = r#"{
            "panoramas": [
                {"id": "p1", "lat": 1.0, "lng": 2.0, "headingDeg": 90.0,
                 "imageWidth": 4000, "imageHeight": 2000}
            ],
            "detections": [
                {"panoId": "p1", "xmin": 10, "ymin": 20, "xmax": 30, "ymax": 40, "score": 0.5},
                {"id": "custom", "panoId": "p1", "xmin": 1, "ymin": 2, "xmax": 3, "ymax": 4}
            ]
        }"#;
        let file: SceneFile = serde_json::from_str(json).expect("parse");
        let (scene, observations) = file.into_scene().expect("scene");
        assert!(observations.is_empty());
        assert_eq!(scene.detections()[0].id, "p1_10_20_30_40_0.5");
        assert_eq!(scene.detections()[1].id, "custom");
    }

    #[test]
    fn dangling_panorama_is_reported() {
        let json = r#"{
            "panoramas": [],
            "detections": [{"panoId": "nope", "xmin": 0, "ymin": 0, "xmax": 1, "ymax": 1}]
        }"#;
        let file: SceneFile = serde_json::from_str(json).expect("parse");
        let err = file.into_scene().err().expect("error");
        assert!(err.contains("nope"), "{err}");
    }
}
