use std::path::PathBuf;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_sunlapse")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "sunlapse.exe"
            } else {
                "sunlapse"
            });
            p
        })
}

fn write_config(dir: &std::path::Path) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join("config.json");
    let cfg = serde_json::json!({
        "dates": ["2018-03-19", "2018-03-20", "2018-03-21"],
        "latitude": 51.4779,
        "longitude": -0.0015,
        "timezone": "Europe/London",
        "frames_per_day": 96,
        "work_dir": dir.join("work"),
        "heatmap_out": dir.join("timeline.png"),
    });
    std::fs::write(&path, serde_json::to_vec_pretty(&cfg).unwrap()).unwrap();
    path
}

#[test]
fn cli_offsets_prints_one_line_per_date() {
    let dir = PathBuf::from("target").join("cli_smoke_offsets");
    let cfg = write_config(&dir);

    let output = std::process::Command::new(exe())
        .args(["--quiet", "offsets", "--config"])
        .arg(&cfg)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1]["date"], "2018-03-20");
    assert_eq!(lines[1]["day"]["kind"], "cycle");

    // Greenwich near the equinox: solar noon within a few minutes of 12:00 GMT (frame 48).
    let noon = lines[1]["day"]["noon"].as_f64().unwrap();
    assert!((47.0..49.0).contains(&noon), "noon {noon}");
}

#[test]
fn cli_heatmap_writes_dates_by_frames_png() {
    let dir = PathBuf::from("target").join("cli_smoke_heatmap");
    let cfg = write_config(&dir);
    let out = dir.join("custom.png");
    let _ = std::fs::remove_file(&out);

    let status = std::process::Command::new(exe())
        .args(["heatmap", "--config"])
        .arg(&cfg)
        .arg("--out")
        .arg(&out)
        .status()
        .unwrap();

    assert!(status.success());
    let img = image::open(&out).unwrap().to_luma8();
    assert_eq!(img.dimensions(), (3, 96));
    assert_eq!(img.get_pixel(0, 0).0, [255]);
    assert!(!dir.join("work").exists());
}

#[test]
fn cli_rejects_bad_config() {
    let dir = PathBuf::from("target").join("cli_smoke_bad");
    std::fs::create_dir_all(&dir).unwrap();
    let cfg = dir.join("config.json");
    std::fs::write(&cfg, br#"{"dates": ["2018-01-02", "2018-01-01"], "latitude": 0, "longitude": 0, "timezone": "UTC"}"#).unwrap();

    let status = std::process::Command::new(exe())
        .args(["--quiet", "offsets", "--config"])
        .arg(&cfg)
        .status()
        .unwrap();
    assert!(!status.success());
}
