use pano_locate::config;
use pano_locate::config::scene::load_scene;
use pano_locate::io::write_json_file;
use pano_locate::AutoAssigner;
use std::env;
use std::path::Path;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = config::load_config(Path::new(&config_path))?;
    let (scene, observations) = load_scene(&config.scene_path)?;

    let assigner =
        AutoAssigner::new(&scene, observations, config.params.clone()).map_err(|e| e.to_string())?;
    let clusters = assigner.preview();

    println!(
        "{} clusters (link distance {:.1} m)",
        clusters.len(),
        config.params.cluster_distance_m
    );
    for (i, cluster) in clusters.iter().enumerate() {
        println!(
            "  #{:<3} score={:<4} panos={:<3} detections={}",
            i,
            cluster.score,
            cluster.pano_ids.len(),
            cluster.detection_ids.len()
        );
    }

    if let Some(path) = &config.output.clusters_json {
        write_json_file(path, &clusters)?;
        println!("JSON clusters written to {}", path.display());
    }
    Ok(())
}

fn usage() -> String {
    "Usage: cluster_preview_demo <config.json>".to_string()
}
