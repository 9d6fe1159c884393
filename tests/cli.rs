//! End-to-end tests for the obdresource binary
//!
//! Successful runs print the summary lines on stdout; failures print exactly
//! one `error:` line on stderr and exit with status 1.

use ed25519_dalek::SigningKey;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn obdresource(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_obdresource"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn stderr(output: &Output) -> String {
    String::from_utf8(output.stderr.clone()).unwrap()
}

fn workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    let work = temp.path().join("work");
    fs::create_dir_all(work.join("data")).unwrap();
    fs::create_dir_all(work.join("licenses")).unwrap();
    fs::write(
        work.join("manifest.json"),
        r#"{"packageId":"dtc-ford","version":"1.0.0"}"#,
    )
    .unwrap();
    fs::write(work.join("data/dtc_FORD.json"), r#"[{"code":"P0420"}]"#).unwrap();
    fs::write(work.join("licenses/FORD.txt"), "Attribution").unwrap();

    let key = SigningKey::from_bytes(&[31u8; 32]);
    fs::write(temp.path().join("private.key"), key.to_bytes()).unwrap();
    fs::write(temp.path().join("public.key"), key.verifying_key().to_bytes()).unwrap();
    temp
}

fn sign(dir: &Path) -> Output {
    obdresource(
        dir,
        &[
            "sign",
            "--input",
            "work",
            "--key",
            "private.key",
            "--output",
            "dist/ford.obdresource",
        ],
    )
}

#[test]
fn test_sign_verify_check_log() {
    let temp = workspace();
    let dir = temp.path();

    let signed = sign(dir);
    assert!(signed.status.success(), "{}", stderr(&signed));
    let out = stdout(&signed);
    assert!(out.contains("Package ID: dtc-ford"));
    assert!(out.contains("Version: 1.0.0"));
    assert!(out.contains("Records: 1"));
    assert!(out.contains("Checksum: "));
    assert!(dir.join("dist/ford.obdresource.sig").exists());
    assert!(dir.join("logs/signing.log").exists());

    let verified = obdresource(
        dir,
        &[
            "verify",
            "--input",
            "dist/ford.obdresource",
            "--signature",
            "dist/ford.obdresource.sig",
            "--key",
            "public.key",
            "--expected-key-id",
            "primary",
        ],
    );
    assert!(verified.status.success(), "{}", stderr(&verified));
    let lines: Vec<String> = stdout(&verified).lines().map(str::to_string).collect();
    assert_eq!(lines[0], "Signature OK");
    assert!(lines.contains(&"Records: 1".to_string()));
    assert!(lines.contains(&"keyId: primary".to_string()));

    let checked = obdresource(dir, &["check-log"]);
    assert!(checked.status.success(), "{}", stderr(&checked));
    assert!(stdout(&checked).starts_with("Validated 1 signing entries"));
}

#[test]
fn test_refused_overwrite_exits_one() {
    let temp = workspace();
    assert!(sign(temp.path()).status.success());

    let again = sign(temp.path());
    assert_eq!(again.status.code(), Some(1));
    let err = stderr(&again);
    assert_eq!(err.lines().count(), 1, "{err}");
    assert!(err.starts_with("error: Refusing to overwrite"));
}

#[test]
fn test_verify_failure_single_diagnostic() {
    let temp = workspace();
    let dir = temp.path();
    assert!(sign(dir).status.success());

    let mut archive = fs::read(dir.join("dist/ford.obdresource")).unwrap();
    archive[20] ^= 0xff;
    fs::write(dir.join("dist/ford.obdresource"), archive).unwrap();

    let verified = obdresource(
        dir,
        &[
            "verify",
            "--input",
            "dist/ford.obdresource",
            "--signature",
            "dist/ford.obdresource.sig",
            "--key",
            "public.key",
        ],
    );
    assert_eq!(verified.status.code(), Some(1));
    assert!(stdout(&verified).is_empty());
    let err = stderr(&verified);
    assert_eq!(err.lines().count(), 1, "{err}");
    assert!(err.starts_with("error: Signature verification failed"));
}

#[test]
fn test_check_log_missing() {
    let temp = TempDir::new().unwrap();
    let checked = obdresource(temp.path(), &["check-log", "--log", "nope.log"]);
    assert_eq!(checked.status.code(), Some(1));
    assert!(stderr(&checked).starts_with("error: Log not found"));
}

#[test]
fn test_verify_missing_signature_names_file() {
    let temp = workspace();
    let dir = temp.path();
    assert!(sign(dir).status.success());

    let verified = obdresource(
        dir,
        &[
            "verify",
            "--input",
            "dist/ford.obdresource",
            "--signature",
            "dist/absent.sig",
            "--key",
            "public.key",
        ],
    );
    assert_eq!(verified.status.code(), Some(1));
    let err = stderr(&verified);
    assert_eq!(err.lines().count(), 1, "{err}");
    assert!(err.starts_with("error: Failed to read dist/absent.sig: "), "{err}");
}
