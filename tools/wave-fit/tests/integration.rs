/// Integration tests for the wave-fit CLI.
///
/// Each test builds a capture directory in a temp dir from a rendered
/// table, so no sampled chip data is needed:
/// 1. A preset rendered to a table scores 0 against itself
/// 2. Seeded fits are reproducible and print reusable parameter blocks
/// 3. Bad waveform codes, chip letters, data paths and time limits fail
///    before searching
/// 4. A fit ends on its own once its output is closed
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const PRESET_E6: &str = "bias = 0.879145\n\
                         pulse_strength = 1.30156\n\
                         top_bit = 0.0\n\
                         distance = 0.006426161\n\
                         st_mix = 0.0\n";

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "wave-fit", "--"]);
    cmd
}

fn run(args: &[&str], extra: &[&Path]) -> Output {
    let mut cmd = cargo_bin();
    cmd.args(args);
    for p in extra {
        cmd.arg(p);
    }
    cmd.output().expect("failed to run wave-fit")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Render chip E's wave-6 preset into `dir/WAVE6.CSV` (as chip column A).
fn write_capture(dir: &Path) {
    let output = run(&["table", "--wave", "6", "--chip", "E", "--output"], &[&dir.join("WAVE6.CSV")]);
    assert!(output.status.success(), "table failed: {}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn test_table_has_4096_rows() {
    let dir = tempfile::tempdir().unwrap();
    write_capture(dir.path());
    let text = std::fs::read_to_string(dir.path().join("WAVE6.CSV")).unwrap();
    let rows: Vec<u8> = text.lines().map(|l| l.parse().unwrap()).collect();
    assert_eq!(rows.len(), 4096);
    assert!(rows.iter().any(|&v| v != 0), "pulse+saw table should not be silent");
}

#[test]
fn test_preset_scores_zero_on_own_table() {
    let dir = tempfile::tempdir().unwrap();
    write_capture(dir.path());
    let params = dir.path().join("e6.txt");
    std::fs::write(&params, PRESET_E6).unwrap();

    let output = run(
        &["score", "--wave", "6", "--chip", "A", "--dump", "--data"],
        &[dir.path()],
    );
    // No preset for chip A: the all-zero seed is scored.
    assert!(output.status.success());
    let text = stdout(&output);
    assert_eq!(text.lines().filter(|l| !l.starts_with("//") && !l.contains('=')).count(), 4096);

    let mut cmd = cargo_bin();
    cmd.args(["score", "--wave", "6", "--chip", "A", "--data"])
        .arg(dir.path())
        .arg("--params")
        .arg(&params);
    let output = cmd.output().unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("// score 0\n"), "got: {}", stdout(&output));
}

#[test]
fn test_seeded_fit_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    write_capture(dir.path());
    let params = dir.path().join("seed.txt");
    std::fs::write(&params, "bias = 0.8\npulse_strength = 1.6\ntop_bit = 0.1\ndistance = 0.02\nst_mix = 0.0\n").unwrap();

    let fit = || {
        let mut cmd = cargo_bin();
        cmd.args(["fit", "--wave", "6", "--chip", "A", "--seed", "17", "--iterations", "200", "--data"])
            .arg(dir.path())
            .arg("--params")
            .arg(&params);
        let output = cmd.output().unwrap();
        assert!(output.status.success(), "fit failed: {}", String::from_utf8_lossy(&output.stderr));
        stdout(&output)
    };

    let first = fit();
    assert_eq!(first, fit(), "same seed should print the same improvements");
    assert!(first.starts_with("// initial score "));
    assert!(first.contains("// current score"), "no improvement in 200 iterations:\n{first}");

    // The last printed block is a valid seed for the next run.
    let last_block = first.rsplit("// current score").next().unwrap();
    let reparsed: sidwave_dsp::ParameterSet = last_block
        .lines()
        .skip(1)
        .collect::<Vec<_>>()
        .join("\n")
        .parse()
        .expect("emitted block should parse");
    assert!(reparsed.bias > 0.0);
}

#[test]
fn test_rejects_bad_inputs() {
    let dir = tempfile::tempdir().unwrap();
    write_capture(dir.path());

    let bad_wave = run(&["score", "--wave", "4", "--chip", "A", "--data"], &[dir.path()]);
    assert!(!bad_wave.status.success(), "wave 4 should be rejected");

    let bad_chip = run(&["score", "--wave", "6", "--chip", "a", "--data"], &[dir.path()]);
    assert!(!bad_chip.status.success(), "lowercase chip should be rejected");

    let missing_column = run(&["score", "--wave", "6", "--chip", "B", "--data"], &[dir.path()]);
    assert!(!missing_column.status.success(), "single-column capture has no chip B");

    let missing_file = run(&["fit", "--wave", "7", "--chip", "A", "--iterations", "1", "--data"], &[dir.path()]);
    assert!(!missing_file.status.success(), "WAVE7.CSV does not exist");
    assert!(stdout(&missing_file).is_empty(), "no search output before validation");
}

#[test]
fn test_rejects_unusable_time_limit() {
    let dir = tempfile::tempdir().unwrap();
    write_capture(dir.path());

    for secs in ["inf", "NaN", "-1", "1e300"] {
        let flag = format!("--seconds={secs}");
        let output = run(&["fit", "--wave", "6", "--chip", "A", &flag, "--data"], &[dir.path()]);
        assert!(!output.status.success(), "--seconds {secs} should be rejected");
        assert!(stdout(&output).is_empty(), "--seconds {secs}: no search output expected");
    }
}

#[test]
fn test_fit_exits_when_output_closes() {
    let dir = tempfile::tempdir().unwrap();
    write_capture(dir.path());

    // The all-zero seed is a fixed point: every candidate ties and is printed,
    // so without a limit the search writes forever.
    let mut child = cargo_bin()
        .args(["fit", "--wave", "6", "--chip", "A", "--zero", "--data"])
        .arg(dir.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start wave-fit");

    let mut reader = BufReader::new(child.stdout.take().unwrap());
    let mut first = String::new();
    reader.read_line(&mut first).unwrap();
    assert!(first.starts_with("// initial score "), "got: {first}");
    drop(reader);

    let deadline = Instant::now() + Duration::from_secs(120);
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            assert!(status.success(), "fit should stop cleanly, got {status}");
            break;
        }
        if Instant::now() > deadline {
            child.kill().ok();
            panic!("fit kept running after its output was closed");
        }
        thread::sleep(Duration::from_millis(50));
    }
}

#[test]
fn test_presets_listing() {
    let output = run(&["presets"], &[]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert_eq!(text.lines().count(), 21);
    assert!(text.lines().any(|l| l.starts_with('E') && l.contains("0.879145")));
}
