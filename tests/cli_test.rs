// CLI entry point tests

use std::process::Command;

fn cargo_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_drawtrace"))
}

// ============================================================
// 1. No arguments shows usage and exits with failure
// ============================================================

#[test]
fn test_main_no_args_shows_usage() {
    let output = cargo_bin().output().expect("failed to execute binary");

    assert!(
        !output.status.success(),
        "should exit with failure when no args given"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Usage"),
        "stderr should contain 'Usage', got: {stderr}"
    );
}

// ============================================================
// 2. --help flag shows usage and exits with success
// ============================================================

#[test]
fn test_main_help_flag() {
    let output = cargo_bin()
        .arg("--help")
        .output()
        .expect("failed to execute binary");

    assert!(
        output.status.success(),
        "should exit with success for --help"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Usage"),
        "stderr should contain 'Usage', got: {stderr}"
    );
}

// ============================================================
// 3. --version flag shows version and exits with success
// ============================================================

#[test]
fn test_main_version_flag() {
    let output = cargo_bin()
        .arg("--version")
        .output()
        .expect("failed to execute binary");

    assert!(
        output.status.success(),
        "should exit with success for --version"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    let version = env!("CARGO_PKG_VERSION");
    assert!(
        stderr.contains(version),
        "stderr should contain version '{version}', got: {stderr}"
    );
}

// ============================================================
// 4. Nonexistent job file produces error
// ============================================================

#[test]
fn test_main_nonexistent_job_file() {
    let unique_path = std::env::temp_dir().join(format!(
        "nonexistent_job_file_{}.yaml",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock error")
            .as_nanos()
    ));
    let output = cargo_bin()
        .arg(unique_path.as_os_str())
        .output()
        .expect("failed to execute binary");

    assert!(
        !output.status.success(),
        "should exit with failure for nonexistent file"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("ERROR") || stderr.contains("error") || stderr.contains("Error"),
        "stderr should contain error message, got: {stderr}"
    );
}

// ============================================================
// 5. A job file traces its image and writes the SVG
// ============================================================

fn write_page(path: &std::path::Path) {
    let mut img = image::RgbImage::from_pixel(400, 300, image::Rgb([255, 255, 255]));
    for y in 100..200 {
        for x in 100..300 {
            img.put_pixel(x, y, image::Rgb([0, 0, 0]));
        }
    }
    img.save(path).expect("save png");
}

#[test]
fn test_main_runs_job_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_page(&dir.path().join("page.png"));
    std::fs::write(dir.path().join("settings.yaml"), "cache_dir: cache\n").unwrap();
    std::fs::write(
        dir.path().join("jobs.yaml"),
        "jobs:\n  - input: page.png\n    output: page.svg\n",
    )
    .unwrap();

    let output = cargo_bin()
        .arg(dir.path().join("jobs.yaml"))
        .output()
        .expect("failed to execute binary");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "job should succeed, got: {stderr}");
    assert!(
        stderr.contains("OK:") && stderr.contains("(1 paths, px)"),
        "stderr should report the traced job, got: {stderr}"
    );
    assert!(
        stderr.contains("WARNING"),
        "missing markers should be reported, got: {stderr}"
    );

    let svg = std::fs::read_to_string(dir.path().join("page.svg")).expect("svg written");
    assert!(svg.contains("<svg"));
    assert!(svg.contains("px\""));
    assert!(dir.path().join("cache").is_dir());
}

// ============================================================
// 6. One failing job fails the run but the others still complete
// ============================================================

#[test]
fn test_main_reports_failed_job() {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_page(&dir.path().join("good.png"));
    std::fs::write(
        dir.path().join("jobs.yaml"),
        "jobs:\n  - input: good.png\n    output: good.svg\n  - input: missing.png\n    output: missing.svg\n",
    )
    .unwrap();

    let output = cargo_bin()
        .arg(dir.path().join("jobs.yaml"))
        .output()
        .expect("failed to execute binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR"), "got: {stderr}");
    assert!(dir.path().join("good.svg").exists());
}
