use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use scoregrid_rules::{BalancerSettings, BuildHistory, StaticBuildHistory};

pub fn check(path: &str) -> anyhow::Result<()> {
    let settings = BalancerSettings::from_file(Path::new(path))
        .with_context(|| format!("loading balancer settings from {path}"))?;

    // An empty history is enough to validate build_result parameters.
    let history: Arc<dyn BuildHistory> = Arc::new(StaticBuildHistory::new());
    let config = settings
        .build(Some(&history))
        .with_context(|| format!("invalid balancer settings in {path}"))?;

    println!("✓ {path}");
    println!("  enabled:       {}", config.enabled);
    println!("  report_scores: {}", config.report_scores);
    if config.throttle.enabled {
        println!("  throttle:      {} ms", config.throttle.min_interval_ms);
    } else {
        println!("  throttle:      off");
    }
    if config.policies.is_empty() {
        println!("  policies:      none (every chunk scores 0)");
    } else {
        let names: Vec<&str> = config.policies.iter().map(|p| p.name()).collect();
        println!("  policies:      {}", names.join(" → "));
    }
    Ok(())
}
