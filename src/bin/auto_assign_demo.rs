use pano_locate::config;
use pano_locate::config::scene::load_scene;
use pano_locate::io::write_json_file;
use pano_locate::project::{ObjectSummary, ProjectState};
use pano_locate::{ObservationMap, RunReport};
use serde::Serialize;
use std::env;
use std::ops::ControlFlow;
use std::path::Path;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AutoAssignDemoOutput<'a> {
    report: &'a RunReport,
    objects: Vec<&'a ObjectSummary>,
    observations: &'a ObservationMap,
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = config::load_config(Path::new(&config_path))?;
    let (scene, observations) = load_scene(&config.scene_path)?;

    let mut project = ProjectState::with_observations(scene, config.params.clone(), observations)
        .map_err(|e| e.to_string())?;
    let mut object_ids = if config.objects.is_empty() {
        project.object_ids().to_vec()
    } else {
        config.objects.clone()
    };
    for _ in 0..config.new_objects {
        object_ids.push(project.add_object());
    }
    if object_ids.is_empty() {
        return Err("No objects to assign: list `objects` or set `new_objects`".to_string());
    }

    let report = project
        .auto_assign_progressive(&object_ids, config.strategy, |p| {
            eprintln!("[{}/{}] {}", p.current, p.total, p.object_id);
            ControlFlow::Continue(())
        })
        .map_err(|e| e.to_string())?;

    println!("Auto-assign summary ({:?})", report.strategy);
    for line in report.summary_lines() {
        println!("  {line}");
    }
    println!(
        "  consumed {} of {} free detections in {:.2} ms",
        report.consumed(),
        report.free_detections_before,
        report.timings.total_ms
    );

    if let Some(path) = &config.output.result_json {
        let output = AutoAssignDemoOutput {
            report: &report,
            objects: project.objects(),
            observations: project.observations(),
        };
        write_json_file(path, &output)?;
        println!("JSON report written to {}", path.display());
    }
    Ok(())
}

fn usage() -> String {
    "Usage: auto_assign_demo <config.json>".to_string()
}
