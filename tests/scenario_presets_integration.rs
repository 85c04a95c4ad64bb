use std::process::Command;

#[derive(Debug)]
struct Report {
    base_kwh: f64,
    controllable_kwh: f64,
    total_charge: f64,
}

#[test]
fn scenario_presets_run_via_cli_and_produce_distinct_results() {
    let baseline = run_and_parse_report("baseline");
    let smart = run_and_parse_report("smart_village");
    let cold = run_and_parse_report("cold_snap");

    for (name, report) in [
        ("baseline", &baseline),
        ("smart_village", &smart),
        ("cold_snap", &cold),
    ] {
        assert!(report.base_kwh > 0.0, "{name}: no base energy");
        assert!(report.controllable_kwh > 0.0, "{name}: no controllable energy");
        assert!(report.total_charge > 0.0, "{name}: nothing billed");
    }

    assert!(
        (baseline.total_charge - cold.total_charge).abs() > 0.01,
        "expected baseline and cold_snap charges to differ: baseline={:.3}, cold_snap={:.3}",
        baseline.total_charge,
        cold.total_charge
    );
    assert!(
        (baseline.base_kwh - smart.base_kwh).abs() > 0.01,
        "expected baseline and smart_village energy to differ: baseline={:.3}, smart_village={:.3}",
        baseline.base_kwh,
        smart.base_kwh
    );
}

#[test]
fn unknown_preset_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_household-sim"))
        .args(["--preset", "heatwave"])
        .output()
        .expect("household-sim process should run");
    assert!(!output.status.success());
}

fn run_and_parse_report(preset: &str) -> Report {
    let output = Command::new(env!("CARGO_BIN_EXE_household-sim"))
        .args(["--preset", preset])
        .output()
        .expect("household-sim process should run");

    assert!(
        output.status.success(),
        "preset run failed for {preset}: stderr={} ",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    Report {
        base_kwh: parse_metric(&stdout, "Base energy:", "kWh"),
        controllable_kwh: parse_metric(&stdout, "Controllable energy:", "kWh"),
        total_charge: parse_metric(&stdout, "Total charge:", ""),
    }
}

fn parse_metric(stdout: &str, label: &str, unit: &str) -> f64 {
    let line = stdout
        .lines()
        .find(|line| line.trim_start().starts_with(label))
        .unwrap_or_else(|| panic!("missing report line `{label}` in output: {stdout}"));

    let raw = line
        .split_once(':')
        .map(|(_, right)| right.trim())
        .unwrap_or_else(|| panic!("invalid report format for line `{line}`"));

    // "Controllable energy" carries a trailing percentage
    let raw = raw.split_whitespace().next().unwrap_or(raw);
    let numeric = raw.strip_suffix(unit).unwrap_or(raw).trim();
    numeric
        .parse::<f64>()
        .unwrap_or_else(|_| panic!("failed parsing `{numeric}` from report line `{line}`"))
}
