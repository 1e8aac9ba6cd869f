use std::{
    env, fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

const SERIAL_OUTPUT: &str = "3 4 4.000000 1.000000\n\
    [0.500000,0.500000,1.000000,0.000000],[1.500000,0.500000,0.000000,1.000000],[2.500000,3.500000,-0.707107,0.707107],[3.500000,2.500000,0.707107,-0.707107],\n\
    [1.500000,0.500000,1.000000,0.000000],[1.500000,1.500000,0.000000,1.000000],[1.792893,0.207107,-0.707107,0.707107],[0.207107,1.792893,0.707107,-0.707107],\n\
    [2.500000,0.500000,1.000000,0.000000],[1.500000,2.500000,0.000000,1.000000],[1.085786,0.914214,-0.707107,0.707107],[0.914214,1.085786,0.707107,-0.707107],\n\
    Time Taken: 0.000042";

fn test_dir(name: &str) -> PathBuf {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");
    test_dir
}

fn run_bin(args: &[&str]) -> Output {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_flocktrace"));
    Command::new(bin)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute command")
}

fn run_bin_ok(args: &[&str]) -> String {
    let output = run_bin(args);

    let stdout_str =
        std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
    let stderr_str =
        std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );

    stderr_str.to_owned()
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("failed to convert path to string")
}

/// Same birds as the serial output, listed in another order, as a parallel
/// run writes them.
fn parallel_output() -> String {
    SERIAL_OUTPUT
        .lines()
        .map(|line| {
            if line.starts_with("Time") {
                return "Time Taken for 4 Threads: 0.000031".to_owned();
            }
            if !line.starts_with('[') {
                return line.to_owned();
            }
            let mut birds: Vec<&str> = line.split("],").filter(|bird| !bird.is_empty()).collect();
            birds.reverse();
            birds.iter().map(|bird| format!("{bird}],")).collect()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn animate_workflow() {
    let test_dir = test_dir("animate_workflow");
    let input = test_dir.join("res");
    let output = test_dir.join("activematter.png");
    let animation = test_dir.join("activematter.gif");
    let frames_dir = test_dir.join("frames");
    fs::write(&input, SERIAL_OUTPUT).expect("failed to write input file");

    let stderr = run_bin_ok(&[
        "animate",
        "--input",
        path_str(&input),
        "--output",
        path_str(&output),
        "--animation",
        path_str(&animation),
        "--frames-dir",
        path_str(&frames_dir),
        "--no-pace",
    ]);

    assert!(stderr.contains("Time Taken: 0.000042"));
    assert!(stderr.contains("animated 3 timesteps into 3 frames"));
    assert!(!stderr.contains("header counts"));
    assert!(output.is_file());
    let bytes = fs::read(&animation).expect("failed to read animation");
    assert_eq!(&bytes[..6], b"GIF89a");
    for i_step in 0..3 {
        assert!(frames_dir.join(format!("frame-{i_step:04}.png")).is_file());
    }

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn animate_reads_config_file() {
    let test_dir = test_dir("animate_reads_config_file");
    let input = test_dir.join("res");
    fs::write(&input, SERIAL_OUTPUT).expect("failed to write input file");

    let config_path = test_dir.join("config.toml");
    let config_contents = String::new()
        + "[animate]\n"
        + &format!("input_path = {:?}\n", path_str(&input))
        + &format!("output_image_path = {:?}\n", path_str(&test_dir.join("final.png")))
        + &format!("animation_path = {:?}\n", path_str(&test_dir.join("flock.gif")))
        + "speedup = 1000.0\n"
        + "final_size = 200\n";
    fs::write(&config_path, config_contents).expect("failed to write config file");

    run_bin_ok(&["--config", path_str(&config_path), "animate"]);

    let bytes = fs::read(test_dir.join("final.png")).expect("failed to read final frame");
    assert_eq!(&bytes[16..24], &[0, 0, 0, 200, 0, 0, 0, 200]);
    assert!(test_dir.join("flock.gif").is_file());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn verify_workflow() {
    let test_dir = test_dir("verify_workflow");
    let serial = test_dir.join("res_verify_serial");
    let parallel = test_dir.join("res_verify");
    let report = test_dir.join("report.json");
    fs::write(&serial, SERIAL_OUTPUT).expect("failed to write serial output");
    fs::write(&parallel, parallel_output()).expect("failed to write parallel output");

    let stderr = run_bin_ok(&[
        "verify",
        "--file-a",
        path_str(&serial),
        "--file-b",
        path_str(&parallel),
        "--report",
        path_str(&report),
        "--fail-on-mismatch",
    ]);

    assert!(!stderr.contains("not in"));
    assert!(!stderr.contains("wrong headers"));
    assert!(stderr.contains("Time Taken for 4 Threads: 0.000031"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).expect("failed to read report"))
            .expect("failed to parse report");
    assert_eq!(report["timesteps"], 3);
    assert_eq!(report["headers_match"], true);
    assert_eq!(report["mismatches"].as_array().map(Vec::len), Some(0));

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn verify_reports_mismatches() {
    let test_dir = test_dir("verify_reports_mismatches");
    let serial = test_dir.join("res_verify_serial");
    let parallel = test_dir.join("res_verify");
    fs::write(&serial, SERIAL_OUTPUT).expect("failed to write serial output");
    let drifted = parallel_output()
        .replacen("4 4.000000", "4 4.0", 1)
        .replacen("[1.792893,0.207107,", "[1.792894,0.207107,", 1);
    fs::write(&parallel, drifted).expect("failed to write parallel output");

    let args = [
        "verify",
        "--file-a",
        path_str(&serial),
        "--file-b",
        path_str(&parallel),
    ];
    let stderr = run_bin_ok(&args);

    assert!(stderr.contains("wrong headers"));
    let serial_str = path_str(&serial);
    let parallel_str = path_str(&parallel);
    assert!(stderr.contains(&format!("Bird 2 from {serial_str} not in {parallel_str}.")));
    assert!(stderr.contains(&format!("Bird 1 from {parallel_str} not in {serial_str}.")));

    let output = run_bin(&[&args[..], &["--fail-on-mismatch"]].concat());
    assert!(!output.status.success());

    let output = run_bin(&[&args[..], &["--tolerance", "1e-5", "--fail-on-mismatch"]].concat());
    assert!(output.status.success());

    let output = run_bin(&[&args[..], &["--strict-headers"]].concat());
    assert!(!output.status.success());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn truncated_output_fails() {
    let test_dir = test_dir("truncated_output_fails");
    let serial = test_dir.join("res_verify_serial");
    let parallel = test_dir.join("res_verify");
    fs::write(&serial, SERIAL_OUTPUT).expect("failed to write serial output");
    let truncated: Vec<&str> = SERIAL_OUTPUT.lines().take(3).collect();
    fs::write(&parallel, truncated.join("\n")).expect("failed to write parallel output");

    let output = run_bin(&[
        "verify",
        "--file-a",
        path_str(&serial),
        "--file-b",
        path_str(&parallel),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("DesyncError"));

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn malformed_output_fails() {
    let test_dir = test_dir("malformed_output_fails");
    let input = test_dir.join("res");
    fs::write(&input, "3 4 4.0\n[0.5,0.5,1.0,0.0],\n").expect("failed to write input file");

    let output = run_bin(&[
        "animate",
        "--input",
        path_str(&input),
        "--output",
        path_str(&test_dir.join("final.png")),
        "--no-animation",
        "--no-pace",
    ]);
    assert!(!output.status.success());
    assert!(!test_dir.join("final.png").exists());

    fs::write(&input, "1 2 4.0 1.0\n[0.5,0.5],[1.0,0.0],\n").expect("failed to write input file");
    let output = run_bin(&[
        "animate",
        "--input",
        path_str(&input),
        "--output",
        path_str(&test_dir.join("final.png")),
        "--no-animation",
        "--no-pace",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GroupSize"));
    assert!(!test_dir.join("final.png").exists());

    fs::remove_dir_all(&test_dir).ok();
}
