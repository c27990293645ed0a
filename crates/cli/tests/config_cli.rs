use std::path::Path;
use std::process::{Command, Output};

fn make_home() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}

fn run(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_clubhouse"))
        .args(args)
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("CLUBHOUSE_CONFIG")
        .env_remove("CLUBHOUSE_BACKEND_URL")
        .env_remove("CLUBHOUSE_ANON_KEY")
        .env_remove("BASE_URL")
        .output()
        .expect("run clubhouse")
}

#[test]
fn config_set_persists_to_home() {
    let home = make_home();
    let out = run(
        home.path(),
        &[
            "config",
            "--backend-url",
            "https://club.supabase.co/",
            "--anon-key",
            "anon-key-1234567890",
            "--site-url",
            "https://club.example",
        ],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let path = home.path().join(".config/clubhouse/clubhouse.toml");
    let written = std::fs::read_to_string(&path).expect("config written");
    assert!(written.contains("url = \"https://club.supabase.co\""));
    assert!(written.contains("base_url = \"https://club.example\""));

    let out = run(home.path(), &["config"]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("anon_key = anon-key..."));
    assert!(!stdout.contains("anon-key-1234567890"));
}

#[test]
fn remote_commands_need_a_backend() {
    let home = make_home();
    let out = run(home.path(), &["projects"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("backend not configured"), "{stderr}");
}

#[test]
fn reset_password_requires_token_flag() {
    let home = make_home();
    let out = run(home.path(), &["reset-password"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("--token"));
}
