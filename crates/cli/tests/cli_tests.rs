// Integration tests for the segmenter binary: exit codes, archive output and
// the --json stdout contract.
//
// Run with: cargo test -p segmenter-cli --test cli_tests -- --nocapture

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use calamine::{open_workbook_auto_from_rs, Reader};
use rust_xlsxwriter::{Workbook, Worksheet};
use zip::ZipArchive;

fn segmenter(config_home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_segmenter"));
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env_remove("SEGMENTER_VARIANT")
        .env_remove("SEGMENTER_LOG");
    cmd
}

fn run(dir: &Path, args: &[&str]) -> Output {
    segmenter(dir).current_dir(dir).args(args).output().expect("segmenter")
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn write_rows(ws: &mut Worksheet, rows: &[&[&str]]) {
    for (r, row) in rows.iter().enumerate() {
        for (c, v) in row.iter().enumerate() {
            match v.parse::<f64>() {
                Ok(n) if c > 1 => ws.write_number(r as u32, c as u16, n).unwrap(),
                _ => ws.write_string(r as u32, c as u16, *v).unwrap(),
            };
        }
    }
}

/// Lima-shaped workbook: ACME reconciles, ANDES TEL does not.
fn lima_workbook(dir: &Path, boundary: &str) -> PathBuf {
    let mut wb = Workbook::new();
    let summary = wb.add_worksheet().set_name("Reporte CORTE 1").unwrap();
    write_rows(
        summary,
        &[
            &["AGENCIA", "RUC", "ALTAS", "TOTAL A PAGAR"],
            &["ACME", "2001", "2", "150"],
            &["ANDES TEL", "2002", "3", "90"],
        ],
    );
    let base = wb.add_worksheet().set_name("BASE").unwrap();
    write_rows(
        base,
        &[
            &["COD_PEDIDO", "DNI_CLIENTE", "ASESOR", boundary],
            &["P1", "1", "ACME", "SI"],
            &["P2", "2", "ACME", "SI"],
            &["P3", "3", "ANDES TEL", "SI"],
        ],
    );
    let path = dir.join("consolidado.xlsx");
    wb.save(&path).unwrap();
    path
}

/// Provincia-shaped workbook: Summary names carry a department suffix.
fn provincia_workbook(dir: &Path) -> PathBuf {
    let mut wb = Workbook::new();
    let summary = wb.add_worksheet().set_name("Reporte CORTE 1").unwrap();
    write_rows(
        summary,
        &[
            &["AGENCIA", "RUC", "ALTAS"],
            &["ACME PIURA", "2001", "1"],
            &["ANDES TEL CUSCO", "2002", "2"],
        ],
    );
    let base = wb.add_worksheet().set_name("BASE").unwrap();
    write_rows(
        base,
        &[
            &["COD_PEDIDO", "ASESOR", "ZONA", "DEPARTAMENTO", "RECIBO1_PAGADO"],
            &["P1", "ACME", "NORTE", "PIURA", "SI"],
            &["P2", "ANDES TEL", "SUR", "CUSCO", "SI"],
            &["P3", "ANDES TEL", "sur ", "CUSCO", "SI"],
        ],
    );
    let path = dir.join("provincia.xlsx");
    wb.save(&path).unwrap();
    path
}

fn zip_names(path: &Path) -> Vec<String> {
    let bytes = std::fs::read(path).unwrap();
    let zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
    zip.file_names().map(str::to_string).collect::<Vec<_>>()
}

fn zip_entry(path: &Path, name: &str) -> Vec<u8> {
    let bytes = std::fs::read(path).unwrap();
    let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = zip.by_name(name).unwrap();
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).unwrap();
    buf
}

// ===========================================================================
// segmenter run
// ===========================================================================

#[test]
fn run_writes_archive_and_logs_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let input = lima_workbook(dir.path(), "RECIBO1_PAGADO");
    let archive = dir.path().join("out.zip");

    let out = run(
        dir.path(),
        &["run", input.to_str().unwrap(), "--variant", "lima", "-o", archive.to_str().unwrap()],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let err = stderr(&out);
    assert!(err.contains("SUCCESS | ACME | ALTAS:2 | Detail rows:2 | OK"), "{err}");
    assert!(err.contains("MISMATCH | ANDES TEL | ALTAS:3 | Detail rows:1 | REVIEW"), "{err}");
    assert!(err.contains("2 agencies: 1 matched, 1 mismatched"), "{err}");
    assert!(out.stdout.is_empty());

    let mut names = zip_names(&archive);
    names.sort();
    assert_eq!(names, ["Reporte ACME.xlsx", "Reporte ANDES TEL.xlsx"]);

    let mut wb = open_workbook_auto_from_rs(Cursor::new(zip_entry(&archive, "Reporte ACME.xlsx"))).unwrap();
    assert_eq!(wb.sheet_names(), ["Reporte Agencia", "BASE"]);
    assert_eq!(wb.worksheet_range("BASE").unwrap().get_size(), (3, 4));
}

#[test]
fn run_into_directory_uses_timestamped_name() {
    let dir = tempfile::tempdir().unwrap();
    let input = lima_workbook(dir.path(), "RECIBO1_PAGADO");
    let out_dir = dir.path().join("reportes");
    std::fs::create_dir(&out_dir).unwrap();

    let out = run(
        dir.path(),
        &["run", input.to_str().unwrap(), "--variant", "lima", "-o", out_dir.to_str().unwrap(), "-q"],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let files: Vec<String> = std::fs::read_dir(&out_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("Reportes_Lima_Segmentados_"), "{files:?}");
    assert!(files[0].ends_with(".zip"));
    assert!(!stderr(&out).contains("SUCCESS |"), "quiet run still printed the log");
}

#[test]
fn run_writes_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = lima_workbook(dir.path(), "RECIBO1_PAGADO");
    let log = dir.path().join("run.log");

    let out = run(
        dir.path(),
        &[
            "run",
            input.to_str().unwrap(),
            "--variant",
            "lima",
            "-o",
            "out.zip",
            "--log",
            log.to_str().unwrap(),
        ],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let text = std::fs::read_to_string(&log).unwrap();
    assert!(text.starts_with("INFO | --- START: lima ---"), "{text}");
    assert!(text.ends_with("INFO | --- END ---\n"), "{text}");
}

#[test]
fn fail_on_review_exits_5() {
    let dir = tempfile::tempdir().unwrap();
    let input = lima_workbook(dir.path(), "RECIBO1_PAGADO");

    let out = run(
        dir.path(),
        &["run", input.to_str().unwrap(), "--variant", "lima", "-o", "out.zip", "--fail-on-review"],
    );
    assert_eq!(out.status.code(), Some(5), "stderr: {}", stderr(&out));
    // The archive is still written.
    assert!(dir.path().join("out.zip").is_file());
}

#[test]
fn missing_boundary_column_exits_4_without_archive() {
    let dir = tempfile::tempdir().unwrap();
    let input = lima_workbook(dir.path(), "RECIBO_PAGADO");

    let out = run(dir.path(), &["run", input.to_str().unwrap(), "--variant", "lima", "-o", "out.zip"]);
    assert_eq!(out.status.code(), Some(4), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("ALERT |"));
    assert!(stderr(&out).contains("RECIBO1_PAGADO"));
    assert!(!dir.path().join("out.zip").exists());
}

#[test]
fn unknown_variant_exits_2_with_hint() {
    let dir = tempfile::tempdir().unwrap();
    let input = lima_workbook(dir.path(), "RECIBO1_PAGADO");

    let out = run(dir.path(), &["run", input.to_str().unwrap(), "--variant", "callao"]);
    assert_eq!(out.status.code(), Some(2));
    let err = stderr(&out);
    assert!(err.contains("unknown variant 'callao'"), "{err}");
    assert!(err.contains("hint:"), "{err}");
}

#[test]
fn zone_variant_without_zone_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let input = provincia_workbook(dir.path());

    let out = run(dir.path(), &["run", input.to_str().unwrap(), "--variant", "provincia"]);
    assert_eq!(out.status.code(), Some(2), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("needs --zone"));
}

#[test]
fn unreadable_input_exits_4() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.xlsx");
    std::fs::write(&bogus, b"not a workbook").unwrap();

    let out = run(dir.path(), &["run", bogus.to_str().unwrap(), "--variant", "lima"]);
    assert_eq!(out.status.code(), Some(4), "stderr: {}", stderr(&out));
}

#[test]
fn provincia_zone_run_names_archive_after_zone() {
    let dir = tempfile::tempdir().unwrap();
    let input = provincia_workbook(dir.path());

    let out = run(
        dir.path(),
        &["run", input.to_str().unwrap(), "--variant", "provincia", "--zone", "SUR", "-o", "."],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let archive = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.extension().is_some_and(|e| e == "zip"))
        .expect("archive written");
    let name = archive.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("Reportes_Provincia_SUR_"), "{name}");
    assert_eq!(zip_names(&archive), ["Reporte ANDES TEL.xlsx"]);
    assert!(stderr(&out).contains("SUCCESS | ANDES TEL | ALTAS:2 | Detail rows:2 | OK"));
}

// ===========================================================================
// --config
// ===========================================================================

#[test]
fn invalid_config_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let input = lima_workbook(dir.path(), "RECIBO1_PAGADO");
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "name = \"bad\"\nzone_filter = true\n").unwrap();

    let out = run(dir.path(), &["run", input.to_str().unwrap(), "--config", config.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(3), "stderr: {}", stderr(&out));
}

#[test]
fn shown_preset_works_as_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = lima_workbook(dir.path(), "RECIBO1_PAGADO");

    let shown = run(dir.path(), &["variants", "--show", "lima"]);
    assert!(shown.status.success());
    let config = dir.path().join("lima.toml");
    std::fs::write(&config, &shown.stdout).unwrap();

    let out = run(
        dir.path(),
        &["check", input.to_str().unwrap(), "--config", config.to_str().unwrap()],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("SUCCESS | ACME"));
}

#[test]
fn user_variant_directory_is_searched() {
    let dir = tempfile::tempdir().unwrap();
    let input = lima_workbook(dir.path(), "RECIBO1_PAGADO");
    let variants = dir.path().join("segmenter").join("variants");
    std::fs::create_dir_all(&variants).unwrap();
    std::fs::write(
        variants.join("acme-only.toml"),
        "name = \"acme-only\"\nlabel = \"Acme\"\nagencies = [\"ACME\"]\n",
    )
    .unwrap();

    let listed = run(dir.path(), &["variants"]);
    assert!(String::from_utf8_lossy(&listed.stdout).contains("acme-only"));

    let out = run(dir.path(), &["check", input.to_str().unwrap(), "--variant", "acme-only"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let err = stderr(&out);
    assert!(err.contains("SUCCESS | ACME"), "{err}");
    assert!(!err.contains("ANDES TEL |"), "{err}");
}

// ===========================================================================
// check / zones / variants
// ===========================================================================

#[test]
fn check_json_is_a_single_value() {
    let dir = tempfile::tempdir().unwrap();
    let input = lima_workbook(dir.path(), "RECIBO1_PAGADO");

    let out = run(dir.path(), &["check", input.to_str().unwrap(), "--variant", "lima", "--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let val: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(val["variant"], "lima");
    assert_eq!(val["summary"]["agencies"], 2);
    assert_eq!(val["summary"]["matched"], 1);
    assert_eq!(val["summary"]["mismatched"], 1);
    assert!(val.get("archive").is_none());

    let outcomes = val["log"]["outcomes"].as_array().unwrap();
    assert_eq!(outcomes[0]["agency"], "ACME");
    assert_eq!(outcomes[0]["kind"], "match");
    assert_eq!(outcomes[1]["kind"], "mismatch");
    assert_eq!(outcomes[1]["expected"], 3);
    assert_eq!(outcomes[1]["observed"], 1);

    // Nothing was written.
    assert!(!std::fs::read_dir(dir.path())
        .unwrap()
        .any(|e| e.unwrap().path().extension().is_some_and(|x| x == "zip")));
}

#[test]
fn run_json_reports_entries_and_error() {
    let dir = tempfile::tempdir().unwrap();
    let good = lima_workbook(dir.path(), "RECIBO1_PAGADO");

    let out = run(
        dir.path(),
        &["run", good.to_str().unwrap(), "--variant", "lima", "-o", "out.zip", "--json"],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let val: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(val["entries"].as_array().unwrap().len(), 2);
    assert_eq!(val["entries"][0]["agency"], "ACME");
    assert!(val["archive"].as_str().unwrap().ends_with("out.zip"));

    let bad_dir = tempfile::tempdir().unwrap();
    let bad = lima_workbook(bad_dir.path(), "RECIBO_PAGADO");
    let out = run(bad_dir.path(), &["run", bad.to_str().unwrap(), "--variant", "lima", "--json"]);
    assert_eq!(out.status.code(), Some(4));
    let val: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert!(val["error"].as_str().unwrap().contains("RECIBO1_PAGADO"));
    assert_eq!(val["log"]["lines"].as_array().unwrap().last().unwrap()["level"], "ALERT");
}

#[test]
fn zones_lists_distinct_zones() {
    let dir = tempfile::tempdir().unwrap();
    let input = provincia_workbook(dir.path());

    let out = run(dir.path(), &["zones", input.to_str().unwrap(), "--variant", "provincia"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "NORTE\nSUR\n");

    let out = run(dir.path(), &["zones", input.to_str().unwrap(), "--variant", "provincia", "--json"]);
    let val: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(val, serde_json::json!(["NORTE", "SUR"]));
}

#[test]
fn variants_lists_presets() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(dir.path(), &["variants"]);
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    for name in ["lima", "provincia", "lima-corte-2", "provincia-corte-2"] {
        assert!(stdout.lines().any(|l| l.starts_with(name)), "missing {name}:\n{stdout}");
    }
    assert!(stdout.contains("needs --zone"));
}
