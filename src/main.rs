use anyhow::Result;
use dvfprep::{
    config::PipelineConfig,
    quality::{year_coverage, QualityReport},
    selection::Selection,
    session::Session,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let cfg = PipelineConfig::from_env()?;
    info!(
        data_dir = %cfg.data_dir.display(),
        pattern = %cfg.pattern,
        use_cache = cfg.use_cache,
        force_rebuild = cfg.force_rebuild,
        "configured"
    );

    // ─── 3) source coverage ──────────────────────────────────────────
    let coverage = year_coverage(&cfg.data_dir, &cfg.pattern, &cfg.expected_years)?;
    info!(
        "{}/{} expected years present",
        cfg.expected_years.len() - coverage.missing.len(),
        cfg.expected_years.len()
    );

    // ─── 4) raw → clean ──────────────────────────────────────────────
    let session = Session::new(cfg);
    let raw = session.load_raw()?;
    let cleaned = session.clean(&raw)?;
    for stage in &cleaned.report.stages {
        info!(
            stage = stage.stage,
            removed = stage.rows_removed(),
            "{} → {}",
            stage.rows_in,
            stage.rows_out
        );
    }

    // ─── 5) report ───────────────────────────────────────────────────
    let quality = QualityReport::build(&raw, &cleaned.table)?;
    let selection = Selection::defaults_for(&cleaned.table)?;
    let selected = selection.apply(&cleaned.table)?;
    if selected.num_rows() == 0 {
        warn!("default selection is empty");
    }

    let summary = serde_json::json!({
        "coverage": coverage,
        "quality": quality,
        "clean_report": cleaned.report.as_ref(),
        "default_selection": selection,
        "selected_rows": selected.num_rows(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    info!("done");
    Ok(())
}
