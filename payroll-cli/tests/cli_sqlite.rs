//! End-to-end runs of parsed commands against a SQLite file.

use std::path::PathBuf;

use clap::Parser;
use payroll_cli::app;
use payroll_cli::cli::Cli;
use payroll_cli::config::AppConfig;
use pretty_assertions::assert_eq;

struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("payroll-cli-{}-{}", name, std::process::id()));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        let config = format!(
            "[database]\nbackend = \"sqlite\"\nconnection = \"{}\"\n",
            dir.join("ledger.db").display()
        );
        std::fs::write(dir.join("payroll.toml"), config).unwrap();
        Self { dir }
    }

    /// Parses `args` as the command line and runs it with a fresh ledger.
    async fn run(
        &self,
        args: &[&str],
    ) -> anyhow::Result<String> {
        let config = self.dir.join("payroll.toml");
        let mut argv = vec!["payroll", "--config", config.to_str().unwrap()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv)?;

        let config = AppConfig::resolve(&cli)?;
        let ledger = app::open_ledger(&config).await?;
        app::execute(&ledger, cli.command).await
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

#[tokio::test]
async fn entries_persist_between_runs() {
    let ws = Workspace::new("persist");

    ws.run(&["add", "--week-start", "2024-01-08", "--gross", "1000"])
        .await
        .unwrap();
    ws.run(&["add", "--week-start", "2024-01-01", "--gross", "800", "--notes", "first"])
        .await
        .unwrap();

    let listed = ws.run(&["list"]).await.unwrap();
    let rows: Vec<_> = listed.lines().skip(1).collect();
    assert_eq!(rows.len(), 2, "{listed}");
    assert!(rows[0].contains("2024-01-08"), "{listed}");

    let ytd = ws.run(&["ytd", "2024"]).await.unwrap();
    assert!(ytd.contains("Gross pay:              1800"), "{ytd}");
}

#[tokio::test]
async fn backdated_add_leaves_year_consistent() {
    let ws = Workspace::new("recalc");

    ws.run(&["add", "--week-start", "2024-01-08", "--gross", "900"])
        .await
        .unwrap();
    ws.run(&["add", "--week-start", "2024-01-01", "--gross", "900"])
        .await
        .unwrap();

    let recalc = ws.run(&["recalc", "2024"]).await.unwrap();
    assert_eq!(recalc, "Recomputed 2024: 2 entries walked, 0 updated");
}

#[tokio::test]
async fn overlapping_week_is_rejected() {
    let ws = Workspace::new("overlap");
    ws.run(&["add", "--week-start", "2024-01-01", "--gross", "800"])
        .await
        .unwrap();

    let err = ws
        .run(&["add", "--week-start", "2024-01-05", "--gross", "800"])
        .await
        .unwrap_err();

    assert!(format!("{err}").contains("overlaps entry 1"), "{err}");
}

#[tokio::test]
async fn flag_overrides_config_backend() {
    let ws = Workspace::new("override");

    ws.run(&[
        "--backend",
        "memory",
        "add",
        "--week-start",
        "2024-01-01",
        "--gross",
        "800",
    ])
    .await
    .unwrap();

    // The memory backend wrote nothing to the configured SQLite file.
    let listed = ws.run(&["list"]).await.unwrap();
    assert_eq!(listed, "No pay entries found.");
}
