//! Built-in rules driven through a full `ScoringBalancer`.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use scoregrid_placement::{
    Decision, ExecutionSlot, FirstFitBalancer, Occupancy, ScoringBalancer, SlotId, SubTask, Task,
    Worksheet,
};
use scoregrid_rules::{BalancerSettings, BuildHistory, BuildOutcome, StaticBuildHistory};

fn two_slot_worksheet(chunks: usize) -> Worksheet {
    let mut ws = Worksheet::new(vec![
        ExecutionSlot::new("agent-a", "agent-a", 2),
        ExecutionSlot::new("agent-b", "agent-b", 2),
    ]);
    for i in 0..chunks {
        ws.add_chunk(
            vec![SubTask::for_project(format!("shard-{i}"), "monorepo")],
            vec![SlotId(0), SlotId(1)],
            None,
        )
        .unwrap();
    }
    ws
}

#[test]
fn node_load_spreads_chunks_of_one_task() {
    let settings = BalancerSettings::from_toml_str(
        r#"
[[policies]]
kind = "node_load"
"#,
    )
    .unwrap();
    let balancer = ScoringBalancer::new(settings.build(None).unwrap(), None);
    let ws = two_slot_worksheet(2);

    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let decision = balancer.decide_with_rng(&Task::new("t", "t"), &ws, &mut rng);
        let plan = decision.plan().unwrap();
        assert_ne!(plan.slot_for(0), plan.slot_for(1), "seed {seed}");
    }
}

#[test]
fn node_load_prefers_the_idle_agent() {
    let settings = BalancerSettings::from_toml_str("[[policies]]\nkind = \"node_load\"\n").unwrap();
    let balancer = ScoringBalancer::new(settings.build(None).unwrap(), None);

    let busy = Occupancy::new(0);
    let mut ws = Worksheet::new(vec![
        ExecutionSlot::new("agent-a", "agent-a", 4).with_occupancy(busy.clone()),
        ExecutionSlot::new("agent-b", "agent-b", 4),
    ]);
    ws.add_chunk(vec![SubTask::new("only")], vec![SlotId(0), SlotId(1)], None).unwrap();

    busy.set(3);
    let decision = balancer.decide(&Task::new("t", "t"), &ws);
    assert_eq!(decision.plan().unwrap().node_for(0), Some("agent-b"));
}

#[test]
fn history_outweighs_load_when_configured() {
    let settings = BalancerSettings::from_toml_str(
        r#"
[[policies]]
kind = "node_load"
scale = 1

[[policies]]
kind = "build_result"
scale = 100
"#,
    )
    .unwrap();
    let history: Arc<dyn BuildHistory> = Arc::new(
        StaticBuildHistory::new()
            .with_build("monorepo", "agent-a", BuildOutcome::Failure)
            .with_build("monorepo", "agent-b", BuildOutcome::Success),
    );
    let balancer = ScoringBalancer::new(settings.build(Some(&history)).unwrap(), None);
    let ws = two_slot_worksheet(1);

    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        let decision = balancer.decide_with_rng(&Task::new("t", "t"), &ws, &mut rng);
        assert_eq!(decision.plan().unwrap().node_for(0), Some("agent-b"));
    }
}

#[test]
fn disabled_settings_delegate_to_previous_balancer() {
    let settings = BalancerSettings::from_toml_str(
        r#"
enabled = false

[[policies]]
kind = "node_preference"
[policies.node_preferences]
agent-b = 10
"#,
    )
    .unwrap();
    let balancer = ScoringBalancer::install(
        Some(Arc::new(FirstFitBalancer)),
        settings.build(None).unwrap(),
    );

    let decision = balancer.decide(&Task::new("t", "t"), &two_slot_worksheet(1));
    assert!(matches!(decision, Decision::Delegated { .. }));
    assert_eq!(decision.plan().unwrap().node_for(0), Some("agent-a"));
}
