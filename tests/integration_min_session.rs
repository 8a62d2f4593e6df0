// Drives the compiled binary through a PTY to exercise the real event loop
// and crossterm input handling.
//
// Requires a TTY; expectrl allocates a pseudo terminal. Ignored by default.
// Run manually via: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn minimal_session_completes_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let bin = assert_cmd::cargo::cargo_bin("keyra");
    let cmd = format!("{} -m words -p hi --no-sound", bin.display());

    let mut p = spawn(cmd)?;

    // Let the app enter the alternate screen
    std::thread::sleep(Duration::from_millis(200));

    p.send("hi")?;
    std::thread::sleep(Duration::from_millis(200));

    // ESC quits from both typing and results
    p.send("\x1b")?;

    p.expect(Eof)?;
    Ok(())
}

#[test]
fn refuses_to_run_without_tty() {
    assert_cmd::Command::cargo_bin("keyra")
        .unwrap()
        .args(["-p", "hi"])
        .write_stdin("")
        .assert()
        .failure();
}
