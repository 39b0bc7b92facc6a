use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::debug;

use scoregrid_placement::{
    Decision, FallbackReason, FirstFitBalancer, LoadBalancer, MemorySink, PlacementPlan,
    ScoreReport, ScoringBalancer,
};
use scoregrid_rules::{BalancerSettings, BuildHistory};

use crate::scenario::Scenario;

pub struct PlanArgs<'a> {
    pub config: &'a str,
    pub worksheet: &'a str,
    pub format: &'a str,
    pub repeat: usize,
    pub seed: Option<u64>,
    pub fallback: bool,
}

/// One decision as printed by `scoregrid plan`.
#[derive(Debug, Serialize)]
pub struct AttemptOutcome {
    pub attempt: usize,
    pub outcome: &'static str,
    pub reason: Option<String>,
    pub plan: Option<PlacementPlan>,
    pub reports: Vec<ScoreReport>,
}

impl AttemptOutcome {
    fn new(attempt: usize, decision: Decision, reports: Vec<ScoreReport>) -> Self {
        let outcome = match &decision {
            Decision::Placed(_) => "placed",
            Decision::Delegated { .. } => "delegated",
            Decision::Deferred => "deferred",
            Decision::Undecided { .. } => "undecided",
        };
        let reason = decision.fallback_reason().map(describe);
        Self {
            attempt,
            outcome,
            reason,
            plan: decision.into_plan(),
            reports,
        }
    }

    fn render(&self) -> String {
        let mut lines = Vec::new();
        for report in &self.reports {
            lines.push(report.render());
        }
        match &self.reason {
            Some(reason) => lines.push(format!("attempt {}: {} ({reason})", self.attempt, self.outcome)),
            None => lines.push(format!("attempt {}: {}", self.attempt, self.outcome)),
        }
        if let Some(plan) = &self.plan {
            for p in &plan.placements {
                lines.push(format!(
                    "  chunk {} [{}] → {} ({})",
                    p.chunk,
                    p.subtasks.join(","),
                    p.slot_name,
                    p.node
                ));
            }
        }
        lines.join("\n")
    }
}

fn describe(reason: &FallbackReason) -> String {
    match reason {
        FallbackReason::Disabled => "scoring disabled".to_string(),
        FallbackReason::PolicyFailure(err) => format!("{err}"),
        FallbackReason::NoAssignmentFound => "no valid assignment".to_string(),
    }
}

pub fn plan(args: &PlanArgs<'_>) -> anyhow::Result<()> {
    let outcomes = run(args)?;

    match args.format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&outcomes)?);
        }
        _ => {
            for outcome in &outcomes {
                println!("{}", outcome.render());
            }
        }
    }

    Ok(())
}

pub fn run(args: &PlanArgs<'_>) -> anyhow::Result<Vec<AttemptOutcome>> {
    let settings = BalancerSettings::from_file(Path::new(args.config))
        .with_context(|| format!("loading balancer settings from {}", args.config))?;
    let scenario = Scenario::from_file(Path::new(args.worksheet))?;

    let history: Arc<dyn BuildHistory> = Arc::new(scenario.build_history());
    let config = settings.build(Some(&history))?;

    let previous: Option<Arc<dyn LoadBalancer>> = if args.fallback {
        Some(Arc::new(FirstFitBalancer))
    } else {
        None
    };
    let sink = Arc::new(MemorySink::new());
    let balancer = ScoringBalancer::new(config, previous).with_report_sink(sink.clone());

    let task = scenario.task();
    let worksheet = scenario.worksheet()?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let outcomes = (1..=args.repeat)
        .map(|attempt| {
            let decision = balancer.decide_with_rng(&task, &worksheet, &mut rng);
            let outcome = AttemptOutcome::new(attempt, decision, sink.take());
            debug!(
                task = %task.id,
                attempt,
                outcome = outcome.outcome,
                reports = outcome.reports.len(),
                "planning attempt finished"
            );
            outcome
        })
        .collect();
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    const SCENARIO: &str = r#"
[task]
id = "build-7"

[[slots]]
id = "a0"
node = "agent-a"
capacity = 2

[[slots]]
id = "b0"
node = "agent-b"
capacity = 2

[[chunks]]
subtasks = [{ name = "compile", project = "app" }]

[[history]]
project = "app"
node = "agent-b"
outcome = "success"
"#;

    fn file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn args<'a>(config: &'a NamedTempFile, scenario: &'a NamedTempFile) -> PlanArgs<'a> {
        PlanArgs {
            config: config.path().to_str().unwrap(),
            worksheet: scenario.path().to_str().unwrap(),
            format: "json",
            repeat: 1,
            seed: Some(7),
            fallback: true,
        }
    }

    #[test]
    fn history_steers_the_plan() {
        let config = file("report_scores = true\n\n[[policies]]\nkind = \"build_result\"\n");
        let scenario = file(SCENARIO);

        let outcomes = run(&args(&config, &scenario)).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].outcome, "placed");
        assert_eq!(outcomes[0].plan.as_ref().unwrap().node_for(0), Some("agent-b"));
        assert_eq!(outcomes[0].reports.len(), 1);
        assert!(outcomes[0].render().contains("chunk 0 [compile] → b0 (agent-b)"));
    }

    #[test]
    fn throttled_repeats_are_deferred() {
        let config = file("[throttle]\nenabled = true\nmin_interval_ms = 60000\n");
        let scenario = file(SCENARIO);
        let mut args = args(&config, &scenario);
        args.repeat = 3;

        let outcomes = run(&args).unwrap();
        let kinds: Vec<&str> = outcomes.iter().map(|o| o.outcome).collect();
        assert_eq!(kinds, vec!["placed", "deferred", "deferred"]);
    }

    #[test]
    fn disabled_without_fallback_is_undecided() {
        let config = file("enabled = false\n");
        let scenario = file(SCENARIO);
        let mut args = args(&config, &scenario);
        args.fallback = false;

        let outcomes = run(&args).unwrap();
        assert_eq!(outcomes[0].outcome, "undecided");
        assert_eq!(outcomes[0].reason.as_deref(), Some("scoring disabled"));
        assert!(outcomes[0].plan.is_none());
    }

    #[test]
    fn disabled_with_fallback_uses_first_fit() {
        let config = file("enabled = false\n");
        let scenario = file(SCENARIO);

        let outcomes = run(&args(&config, &scenario)).unwrap();
        assert_eq!(outcomes[0].outcome, "delegated");
        assert_eq!(outcomes[0].plan.as_ref().unwrap().node_for(0), Some("agent-a"));
    }

    #[test]
    fn missing_config_is_reported() {
        let scenario = file(SCENARIO);
        let args = PlanArgs {
            config: "/nonexistent/scoregrid.toml",
            worksheet: scenario.path().to_str().unwrap(),
            format: "text",
            repeat: 1,
            seed: None,
            fallback: true,
        };
        let err = run(&args).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/scoregrid.toml"));
    }
}
