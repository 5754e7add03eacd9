use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;

fn pixie_to_curl() -> Command {
    cargo_bin_cmd!()
}

fn convert(fixture: &str) -> Command {
    let mut cmd = pixie_to_curl();
    cmd.args([
        "px-api-test",
        "cluster-1",
        "orders",
        "http://svc.local",
        "--input",
        fixture,
    ]);
    cmd
}

fn stdout_lines(output: &[u8]) -> Vec<Vec<String>> {
    String::from_utf8(output.to_vec())
        .unwrap()
        .lines()
        .map(|line| shlex::split(line).expect("line should be shell-splittable"))
        .collect()
}

fn has_pair(words: &[String], flag: &str, value: &str) -> bool {
    words.windows(2).any(|w| w[0] == flag && w[1] == value)
}

#[test]
fn test_help() {
    pixie_to_curl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("curl commands"))
        .stdout(predicate::str::contains("DESTINATION_FILTER"));
}

#[test]
fn test_version() {
    pixie_to_curl()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pixie-to-curl"));
}

#[test]
fn test_missing_arguments_print_full_usage() {
    pixie_to_curl()
        .args(["px-api-test", "cluster-1"])
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Usage"))
        .stderr(predicate::str::contains("Examples:"));
}

#[test]
fn test_invalid_base_url() {
    pixie_to_curl()
        .args(["px-api-test", "cluster-1", "orders", "not a url"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("BASE_URL"));
}

#[test]
fn test_print_query() {
    pixie_to_curl()
        .args([
            "px-api-test",
            "cluster-1",
            "payments",
            "http://payment.local",
            "--print-query",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("start_time='-5m'"))
        .stdout(predicate::str::contains(
            "px.contains(df.destination, 'payments')",
        ))
        .stdout(predicate::str::contains("df.head(2000)"));
}

#[test]
fn test_print_query_with_overrides() {
    pixie_to_curl()
        .args([
            "px-api-test",
            "cluster-1",
            "payments",
            "http://payment.local",
            "--print-query",
            "--max-rows",
            "10",
            "--start-time",
            "-1h",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("start_time='-1h'"))
        .stdout(predicate::str::contains("df.head(10)"));
}

#[test]
fn test_zero_max_rows_is_rejected() {
    pixie_to_curl()
        .args([
            "px-api-test",
            "cluster-1",
            "payments",
            "http://payment.local",
            "--max-rows",
            "0",
            "--input",
            "tests/fixtures/http_rows.json",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("--max-rows"));
}

#[test]
fn test_convert_exported_rows() {
    let output = convert("tests/fixtures/http_rows.json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);

    let post = &lines[0];
    assert_eq!(post[0], "curl");
    assert!(has_pair(post, "-X", "POST"));
    assert!(has_pair(post, "-H", "Content-Type: application/json"));
    assert!(has_pair(post, "-H", "X-Request-Id: r-1"));
    assert!(has_pair(post, "-d", r#"{"id":1}"#));
    assert!(post.iter().any(|w| w == "http://svc.local/orders"));
    assert_eq!(post.last().map(String::as_str), Some("--fail"));

    let get = &lines[1];
    assert!(has_pair(get, "-X", "GET"));
    assert!(has_pair(get, "-H", "Accept: */*"));
    assert!(!get.iter().any(|w| w == "-d" || w == "--data-raw"));
    assert!(!get.iter().any(|w| w == "--fail"));
    assert_eq!(get.last().map(String::as_str), Some("http://svc.local/orders/1"));
}

#[test]
fn test_base_path_is_a_prefix() {
    let output = pixie_to_curl()
        .args([
            "px-api-test",
            "cluster-1",
            "orders",
            "http://svc.local:8080/api/v1",
            "--input",
            "tests/fixtures/http_rows.json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let lines = stdout_lines(&output);
    assert!(lines[0]
        .iter()
        .any(|w| w == "http://svc.local:8080/api/v1/orders"));
}

#[test]
fn test_convert_from_stdin() {
    let rows = std::fs::read_to_string("tests/fixtures/http_rows.json").unwrap();
    let output = convert("-")
        .write_stdin(rows)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(stdout_lines(&output).len(), 2);
}

#[test]
fn test_short_row_halts_run() {
    let output = convert("tests/fixtures/short_row.json")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not enough columns"))
        .get_output()
        .stdout
        .clone();

    let text = String::from_utf8(output).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(!text.contains("/never"));
}

#[test]
fn test_multi_line_body_prints_one_line_per_row() {
    let tmp = tempfile::TempDir::new().unwrap();
    let rows = tmp.path().join("rows.json");
    std::fs::write(
        &rows,
        concat!(
            r#"{"req_path":"/orders","remote_addr":"10.0.0.5","req_method":"POST","req_headers":"{}","req_body":"{\n  \"id\": 1\n}","resp_status":201,"major_version":1,"destination":"orders"}"#,
            "\n",
            r#"{"req_path":"/orders/1","remote_addr":"10.0.0.5","req_method":"GET","req_headers":"{}","req_body":"","resp_status":200,"major_version":1,"destination":"orders"}"#,
            "\n",
        ),
    )
    .unwrap();

    let output = convert(rows.to_str().unwrap())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(r#"-d $'{\n  "id": 1\n}'"#));
    assert!(lines[1].ends_with("--fail"));
}

#[test]
fn test_bad_headers_halt_run() {
    convert("tests/fixtures/bad_headers.json")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("failed to unmarshal headers JSON"));
}

#[test]
fn test_missing_input_file() {
    convert("tests/fixtures/does_not_exist.json")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to open input"));
}

#[test]
fn test_missing_px_binary() {
    pixie_to_curl()
        .args([
            "px-api-test",
            "cluster-1",
            "orders",
            "http://svc.local",
            "--px-binary",
            "/nonexistent/px",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("failed to connect to backend"));
}

#[cfg(unix)]
mod fake_px {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_script(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("px");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn run_with(px: &PathBuf) -> Command {
        let mut cmd = pixie_to_curl();
        cmd.args(["px-api-test", "cluster-1", "orders", "http://svc.local", "--px-binary"])
            .arg(px);
        cmd
    }

    #[test]
    fn test_streams_rows_from_px() {
        let tmp = TempDir::new().unwrap();
        let fixture = fs::canonicalize("tests/fixtures/http_rows.json").unwrap();
        let px = write_script(
            &tmp,
            &format!(
                "[ \"$PX_API_KEY\" = px-api-test ] || exit 3\n[ \"$1\" = run ] || exit 4\ncat '{}'",
                fixture.display()
            ),
        );

        let output = run_with(&px)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        assert_eq!(stdout_lines(&output).len(), 2);
    }

    #[test]
    fn test_compilation_error_is_reported_distinctly() {
        let tmp = TempDir::new().unwrap();
        let px = write_script(
            &tmp,
            "echo 'Script compilation failed: L3 name dff is not defined' >&2\nexit 1",
        );

        run_with(&px)
            .assert()
            .failure()
            .code(1)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("query compilation failed"));
    }

    #[test]
    fn test_mid_stream_error_is_reported() {
        let tmp = TempDir::new().unwrap();
        let fixture = fs::canonicalize("tests/fixtures/http_rows.json").unwrap();
        let px = write_script(
            &tmp,
            &format!(
                "head -n 1 '{}'\necho 'rpc error: stream reset' >&2\nexit 1",
                fixture.display()
            ),
        );

        let output = run_with(&px)
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("error while streaming results"))
            .get_output()
            .stdout
            .clone();
        assert_eq!(stdout_lines(&output).len(), 1);
    }
}
