use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use hair_physics::{
    BodyPose, CollisionSet, PhysicsSolver, ScalpParams, SimulationState, SnapshotExchange, SolverConfig,
    StepInput, StrandTopology, TopologyAsset, Vec3,
};

#[test]
fn held_snapshot_is_unaffected_by_concurrent_steps() {
    let topology = Arc::new(
        StrandTopology::from_asset(&TopologyAsset::scalp(&ScalpParams {
            strand_count: 32,
            ..ScalpParams::default()
        }))
        .unwrap(),
    );
    let pose = BodyPose::identity(1);
    let mut collisions = CollisionSet::new(Vec::new());
    collisions.update(&pose);
    let solver = PhysicsSolver::new(topology.clone(), SolverConfig::default());
    let mut state = SimulationState::from_rest_pose(&topology, &pose);

    let exchange = SnapshotExchange::new();
    exchange.publish(state.snapshot(topology.clone()));
    let done = AtomicBool::new(false);
    let published = AtomicU64::new(0);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            let input = StepInput {
                wind: Vec3::new(2.0, 0.0, 0.0),
                ..StepInput::default()
            };
            while !done.load(Ordering::Acquire) {
                solver.step(&mut state, &input, &collisions);
                exchange.publish(state.snapshot(topology.clone()));
                published.fetch_add(1, Ordering::Release);
            }
        });

        // Readers repeatedly take a snapshot, copy it, and verify it again
        // after the writer has published several newer ones.
        for _ in 0..20 {
            let held = exchange.latest().unwrap();
            let copy: Vec<Vec3> = held.positions().to_vec();
            let step = held.step();

            let seen = published.load(Ordering::Acquire);
            while published.load(Ordering::Acquire) < seen + 3 {
                std::thread::yield_now();
            }

            assert_eq!(held.step(), step);
            assert_eq!(held.positions(), copy.as_slice());
            assert!(exchange.latest().unwrap().step() > step);
        }
        done.store(true, Ordering::Release);
    });
}
