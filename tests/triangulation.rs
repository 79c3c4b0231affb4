mod common;

use common::synthetic_scene::{aimed, at_bearing, bearing_to, corner_panos, pano, LAMP_POST};
use pano_locate::geo::triangulation::distance_to_ray;
use pano_locate::{triangulate, AssignParams, Observation, Scene};

fn observations(scene: &Scene) -> Vec<Observation> {
    scene
        .detections()
        .iter()
        .map(|d| {
            let (det, pano) = scene.resolve(&d.id).expect("resolve");
            Observation::resolve("obj", det, pano, 0).expect("observation")
        })
        .collect()
}

#[test]
fn two_crossing_bearings_meet_on_both_rays() {
    let panos = corner_panos();
    let detections = vec![aimed(&panos[0], LAMP_POST), aimed(&panos[1], LAMP_POST)];
    let scene = Scene::new(panos, detections).expect("scene");
    let rays: Vec<_> = observations(&scene).iter().map(Observation::ray).collect();
    let fix = triangulate(&rays).expect("fix");
    assert!(fix.rms < 1e-6, "rms={}", fix.rms);
    for ray in &rays {
        assert!(distance_to_ray(fix.lat, fix.lng, ray) < 1e-3);
    }
}

#[test]
fn collinear_views_need_a_crossing_third_panorama() {
    // B stands on A's line of sight; both look due north.
    let a = pano("a", 0.0, 0.0, 0.0);
    let b = pano("b", 0.001, 0.0, 0.0);
    let c = pano("c", 0.0005, 0.0005, 0.0);
    let target = (0.0005, 0.0);
    let detections = vec![at_bearing(&a, 0.0), at_bearing(&b, 0.0)];
    let scene = Scene::new(vec![a.clone(), b.clone()], detections.clone()).expect("scene");
    let rays: Vec<_> = observations(&scene).iter().map(Observation::ray).collect();
    assert!(triangulate(&rays).is_none());

    let mut with_third = detections;
    with_third.push(at_bearing(&c, bearing_to(&c, target)));
    let scene = Scene::new(vec![a, b, c], with_third).expect("scene");
    let rays: Vec<_> = observations(&scene).iter().map(Observation::ray).collect();
    let fix = triangulate(&rays).expect("fix");
    assert!(fix.rms < AssignParams::default().rms_max);
    assert!(fix.rms < 1e-3);
    assert!((fix.lat - target.0).abs() < 1e-7);
}

#[test]
fn opposite_bearings_are_parallel() {
    let a = pano("a", 0.0, 0.0, 0.0);
    let b = pano("b", 0.0, 0.001, 0.0);
    let scene = Scene::new(
        vec![a.clone(), b.clone()],
        vec![at_bearing(&a, 30.0), at_bearing(&b, 210.0)],
    )
    .expect("scene");
    let rays: Vec<_> = observations(&scene).iter().map(Observation::ray).collect();
    assert!(triangulate(&rays).is_none());
}

#[test]
fn consistent_third_view_keeps_rms_at_noise_level() {
    let panos = corner_panos();
    let noisy = bearing_to(&panos[2], LAMP_POST) + 0.2;
    let detections = vec![
        aimed(&panos[0], LAMP_POST),
        aimed(&panos[1], LAMP_POST),
        at_bearing(&panos[2], noisy),
    ];
    let scene = Scene::new(panos, detections).expect("scene");
    let obs = observations(&scene);
    let rays: Vec<_> = obs.iter().map(Observation::ray).collect();
    let pair = triangulate(&rays[..2]).expect("pair");
    let triple = triangulate(&rays).expect("triple");
    // 0.2° at ~22 m is under 8 cm of lateral error.
    let noise_m = 22.5 * 0.2_f64.to_radians();
    assert!(pair.rms < 1e-6);
    assert!(triple.rms <= noise_m, "rms={}", triple.rms);
}
