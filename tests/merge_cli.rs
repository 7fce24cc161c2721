use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const ROADS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [4.35, 50.85]}, "properties": {"name": "a", "lanes": 2, "surface": "asphalt"}},
    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [4.36, 50.86]}, "properties": {"name": "b", "lanes": 1}},
    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [4.37, 50.87]}, "properties": {"surface": "gravel"}}
  ]
}"#;

const SHOPS: &str = concat!(
    r#"{"type": "Feature", "geometry": {"type": "MultiPoint", "coordinates": [[4.1, 50.1], [4.2, 50.2]]}, "properties": {"shop": "bakery", "opening_hours": "Mo-Fr"}}"#,
    "\n",
    r#"{"type": "Feature", "geometry": {"type": "Point", "coordinates": [4.3, 50.3]}, "properties": {"shop": "butcher"}}"#,
    "\n",
);

const RIVERS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}, "properties": {"waterway": "river"}},
    {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[5, 5]]}, "properties": {"waterway": "broken"}}
  ]
}"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

fn run_juicer(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_juicer"))
        .args(args)
        .env_remove("JUICER_OUTPUT")
        .output()
        .expect("run juicer")
}

fn read_json(path: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path).expect("read output");
    serde_json::from_str(&content).expect("output is valid JSON")
}

fn str_path(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

#[test]
fn merges_layers_into_one_collection() {
    let dir = tempfile::tempdir().unwrap();
    let roads = write(dir.path(), "roads.geojson", ROADS);
    let shops = write(dir.path(), "shops.geojsonl", SHOPS);
    let output = dir.path().join("combined.geojson");

    let result = run_juicer(&[str_path(&roads), str_path(&shops), "-o", str_path(&output)]);
    assert!(
        result.status.success(),
        "juicer failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("bulk-merge-to-file"), "{stdout}");
    assert!(stdout.contains("Found 2 vector layers:"), "{stdout}");
    assert!(stdout.contains("  - roads (3 features, 3 fields)"), "{stdout}");
    assert!(stdout.contains("5 features, 5 fields"), "{stdout}");

    let parsed = read_json(&output);
    assert_eq!(parsed["type"], "FeatureCollection");
    let features = parsed["features"].as_array().unwrap();
    assert_eq!(features.len(), 5);

    // 3 fields + 2 fields, no overlap
    for feature in features {
        let properties = feature["properties"].as_object().unwrap();
        let mut names: Vec<&str> = properties.keys().map(String::as_str).collect();
        names.sort();
        assert_eq!(names, vec!["lanes", "name", "opening_hours", "shop", "surface"]);
    }

    assert_eq!(features[0]["properties"]["lanes"], "2");
    assert_eq!(features[2]["properties"]["name"], serde_json::Value::Null);
    assert_eq!(
        features[3]["geometry"],
        serde_json::json!({"type": "MultiPoint", "coordinates": [[4.1, 50.1], [4.2, 50.2]]})
    );
}

#[test]
fn mixed_geometry_falls_back_to_manual_copy() {
    let dir = tempfile::tempdir().unwrap();
    let roads = write(dir.path(), "roads.geojson", ROADS);
    let rivers = write(dir.path(), "rivers.geojson", RIVERS);
    let output = dir.path().join("combined.geojson");

    let result = run_juicer(&[
        str_path(&roads),
        str_path(&rivers),
        "-o",
        str_path(&output),
        "--source-field",
        "layer",
    ]);
    assert!(result.status.success());
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("manual-copy"), "{stdout}");
    assert!(stdout.contains("1 features were skipped"), "{stdout}");

    let parsed = read_json(&output);
    let features = parsed["features"].as_array().unwrap();
    assert_eq!(features.len(), 4);
    assert_eq!(features[3]["properties"]["layer"], "rivers");
    assert_eq!(features[3]["geometry"]["type"], "LineString");
}

#[test]
fn abort_policy_exhausts_all_methods_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let rivers = write(dir.path(), "rivers.geojson", RIVERS);
    let output = dir.path().join("combined.geojson");

    let result = run_juicer(&[
        str_path(&rivers),
        "-o",
        str_path(&output),
        "--on-feature-error",
        "abort",
    ]);

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("All 3 merge methods failed"), "{stderr}");
    assert!(!output.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn no_vector_layers_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let raster = write(dir.path(), "dem.tif", "raster bytes");
    let output = dir.path().join("combined.geojson");

    let result = run_juicer(&[str_path(&raster), "-o", str_path(&output)]);

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("No vector layers found"), "{stderr}");
    assert!(!output.exists());
}

#[test]
fn rerun_overwrites_with_identical_content() {
    let dir = tempfile::tempdir().unwrap();
    let roads = write(dir.path(), "roads.geojson", ROADS);
    let shops = write(dir.path(), "shops.geojsonl", SHOPS);
    let output = dir.path().join("combined.geojson");
    let args = [str_path(&roads), str_path(&shops), "-o", str_path(&output)];

    assert!(run_juicer(&args).status.success());
    let first = std::fs::read(&output).unwrap();
    assert!(run_juicer(&args).status.success());
    let second = std::fs::read(&output).unwrap();

    assert_eq!(first, second);
}

#[test]
fn project_file_registers_combined_layer_once() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "roads.geojson", ROADS);
    write(dir.path(), "shops.geojsonl", SHOPS);
    write(dir.path(), "dem.tif", "raster bytes");
    let manifest = write(
        dir.path(),
        "project.yaml",
        concat!(
            "layers:\n",
            "  - path: roads.geojson\n",
            "  - path: shops.geojsonl\n",
            "  - path: dem.tif\n",
            "merge:\n",
            "  output: combined.geojson\n",
            "  write_bbox: true\n",
        ),
    );

    for _ in 0..2 {
        let result = run_juicer(&["--project", str_path(&manifest)]);
        assert!(
            result.status.success(),
            "juicer failed: {}",
            String::from_utf8_lossy(&result.stderr)
        );
    }

    let parsed = read_json(&dir.path().join("combined.geojson"));
    assert_eq!(parsed["features"].as_array().unwrap().len(), 5);
    assert!(parsed["bbox"].is_array());

    let saved: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(&manifest).unwrap()).unwrap();
    let layers = saved["layers"].as_sequence().unwrap();
    assert_eq!(layers.len(), 4);
    let registered: Vec<&serde_yaml::Value> = layers
        .iter()
        .filter(|layer| layer["name"].as_str() == Some("Combined_All_Layers"))
        .collect();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0]["path"].as_str(), Some("combined.geojson"));
}
