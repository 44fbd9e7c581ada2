//! End-to-end checks of the `buddha` binary: parse arguments, run the
//! queue-and-worker pipeline, write a real PNG.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn renders_a_small_mandelbrot_png() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("mandel.png");

    Command::cargo_bin("buddha")
        .unwrap()
        .args(&[
            "--type",
            "mandelbrot",
            "--size",
            "64x48",
            "--iterations",
            "64",
            "--output",
        ])
        .arg(&output)
        .assert()
        .success();

    let image = image::open(&output).unwrap().to_rgb();
    assert_eq!(image.dimensions(), (64, 48));
}

#[test]
fn renders_a_small_grayscale_buddhabrot_png() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("buddha.png");

    Command::cargo_bin("buddha")
        .unwrap()
        .args(&[
            "--size",
            "32x32",
            "--iterations",
            "64",
            "--sample-iterations",
            "32",
            "--samples",
            "1000",
            "--grayscale",
            "--output",
        ])
        .arg(&output)
        .assert()
        .success();

    let image = image::open(&output).unwrap().to_rgb();
    assert_eq!(image.dimensions(), (32, 32));
}

#[test]
fn rejects_an_unparseable_size() {
    Command::cargo_bin("buddha")
        .unwrap()
        .args(&["--size", "64by48", "--output", "/tmp/unused.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not parse output image size"));
}
