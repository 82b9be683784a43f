use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

#[test]
fn command_build_help() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("quartree")?;
    cmd.arg("build").arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Hill-climbing search"))
        .stdout(predicate::str::contains("tests/data/eight.phy"));
    assert!(std::path::Path::new("tests/data/eight.phy").exists());

    Ok(())
}

#[test]
fn command_build() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let outdir = temp.path().join("tree");

    let mut cmd = Command::cargo_bin("quartree")?;
    let output = cmd
        .arg("build")
        .arg("tests/data/six.tsv")
        .arg("-o")
        .arg(&outdir)
        .arg("--trees")
        .arg("50")
        .arg("--seed")
        .arg("42")
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout.lines().count(), 1);
    let score: f64 = stdout.trim().parse()?;
    assert!((0.0..=1.0).contains(&score));

    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("Initial tree score"));

    assert!(outdir.join("inner_node_dict.txt").is_file());
    let leaves = std::fs::read_to_string(outdir.join("leaf_dict.txt"))?;
    assert_eq!(leaves.lines().count(), 6);
    let inner = std::fs::read_to_string(outdir.join("inner_node_dict.txt"))?;
    assert_eq!(inner.lines().count(), 4);

    Ok(())
}

#[test]
fn command_build_same_seed() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let mut dicts = vec![];

    for name in ["one", "two"] {
        let outdir = temp.path().join(name);
        let mut cmd = Command::cargo_bin("quartree")?;
        cmd.arg("build")
            .arg("tests/data/eight.phy")
            .arg("-o")
            .arg(&outdir)
            .arg("--trees")
            .arg("30")
            .arg("--seed")
            .arg("7")
            .arg("--parallel")
            .arg("2")
            .assert()
            .success();
        dicts.push((
            std::fs::read_to_string(outdir.join("inner_node_dict.txt"))?,
            std::fs::read_to_string(outdir.join("leaf_dict.txt"))?,
        ));
    }
    assert_eq!(dicts[0], dicts[1]);

    Ok(())
}

#[test]
fn command_build_resume() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let first = temp.path().join("first");
    let second = temp.path().join("second");

    let mut cmd = Command::cargo_bin("quartree")?;
    cmd.arg("build")
        .arg("tests/data/eight.phy")
        .arg("-o")
        .arg(&first)
        .arg("--trees")
        .arg("10")
        .arg("--seed")
        .arg("1")
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("quartree")?;
    cmd.arg("build")
        .arg("tests/data/eight.phy")
        .arg("--resume")
        .arg(&first)
        .arg("-o")
        .arg(&second)
        .arg("--trees")
        .arg("10")
        .arg("--seed")
        .arg("2")
        .assert()
        .success()
        .stderr(predicate::str::contains("Resume from"));

    assert!(second.join("leaf_dict.txt").is_file());

    Ok(())
}

#[test]
fn command_build_too_few() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let mut cmd = Command::cargo_bin("quartree")?;
    cmd.arg("build")
        .arg("tests/data/five.tsv")
        .arg("-o")
        .arg(temp.path().join("tree"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least six objects"));

    Ok(())
}
