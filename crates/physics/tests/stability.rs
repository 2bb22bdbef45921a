use std::sync::Arc;

use hair_physics::{
    Affine3A, BodyPose, CollisionSet, PhysicsError, PhysicsSolver, SimulationState, SolverConfig,
    StepInput, StrandAsset, StrandMaterial, StrandTopology, TopologyAsset, Vec3,
};

fn strand(x: f32, damping: f32) -> StrandAsset {
    StrandAsset {
        root_bone: 0,
        rest_positions: (0..4).map(|i| [x, -0.1 * i as f32, 0.0]).collect(),
        material: StrandMaterial {
            damping,
            ..StrandMaterial::default()
        },
    }
}

fn topology(strands: Vec<StrandAsset>) -> Arc<StrandTopology> {
    Arc::new(StrandTopology::from_asset(&TopologyAsset { strands }).unwrap())
}

#[test]
fn teleported_root_converges_without_instability() {
    let topology = topology(vec![strand(0.0, 0.1)]);
    let mut pose = BodyPose::identity(1);
    let mut collisions = CollisionSet::new(Vec::new());
    collisions.update(&pose);
    let solver = PhysicsSolver::new(
        topology.clone(),
        SolverConfig {
            iterations: 12,
            ..SolverConfig::default()
        },
    );
    let mut state = SimulationState::from_rest_pose(&topology, &pose);
    for _ in 0..10 {
        solver.step(&mut state, &StepInput::default(), &collisions);
    }

    pose.set_bone(0, Affine3A::from_translation(Vec3::new(1.0, 0.0, 0.0)));
    collisions.update(&pose);

    let tip_after_teleport = {
        let report = solver.step(&mut state, &StepInput::default(), &collisions);
        assert_eq!(report.instability_count(), 0);
        state.positions()[3]
    };
    // The tip lags behind the root on the first step.
    assert!(tip_after_teleport.x < 1.0);

    for step in 0..300 {
        let report = solver.step(&mut state, &StepInput::default(), &collisions);
        assert_eq!(report.instability_count(), 0, "instability at step {step}");
    }

    let rest_tip = Vec3::new(1.0, -0.3, 0.0);
    let tip = state.positions()[3];
    assert!(tip.distance(rest_tip) < 0.01, "tip at {tip}");
}

#[test]
fn short_strands_follow_a_teleport_without_instability() {
    for segment in [0.1_f32, 0.02, 0.01, 0.005] {
        let topology = topology(vec![StrandAsset {
            root_bone: 0,
            rest_positions: (0..4).map(|i| [0.0, -segment * i as f32, 0.0]).collect(),
            material: StrandMaterial::default(),
        }]);
        let mut pose = BodyPose::identity(1);
        let mut collisions = CollisionSet::new(Vec::new());
        collisions.update(&pose);
        let solver = PhysicsSolver::new(topology.clone(), SolverConfig::default());
        let mut state = SimulationState::from_rest_pose(&topology, &pose);
        for _ in 0..10 {
            solver.step(&mut state, &StepInput::default(), &collisions);
        }

        pose.set_bone(0, Affine3A::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        collisions.update(&pose);
        for step in 0..120 {
            let report = solver.step(&mut state, &StepInput::default(), &collisions);
            assert_eq!(report.instability_count(), 0, "segment {segment}, step {step}");
        }
        assert_eq!(state.positions()[0], Vec3::new(1.0, 0.0, 0.0));
        assert!(state.positions().iter().all(|p| p.is_finite()));
    }
}

#[test]
fn non_finite_forces_reset_strands_to_rest() {
    let topology = topology(vec![strand(0.0, 0.05), strand(0.2, 0.05)]);
    let pose = BodyPose::new(vec![Affine3A::from_translation(Vec3::new(0.0, 1.0, 0.0))]);
    let mut collisions = CollisionSet::new(Vec::new());
    collisions.update(&pose);
    let solver = PhysicsSolver::new(topology.clone(), SolverConfig::default());
    let mut state = SimulationState::from_rest_pose(&topology, &pose);

    let input = StepInput {
        wind: Vec3::new(f32::NAN, 0.0, 0.0),
        ..StepInput::default()
    };
    let report = solver.step(&mut state, &input, &collisions);

    assert!(report.committed);
    assert_eq!(report.instability_count(), 2);
    assert_eq!(report.reset_strands, vec![0, 1]);
    assert_eq!(
        report.errors[1],
        PhysicsError::NumericalInstability {
            strand: 1,
            particle: 5
        }
    );
    for (i, p) in state.positions().iter().enumerate() {
        let rest = topology.rest_local()[i] + Vec3::new(0.0, 1.0, 0.0);
        assert!(p.distance(rest) < 1e-6, "particle {i} at {p}");
    }
    assert!(state.velocities().iter().all(|v| *v == Vec3::ZERO));

    // The next step with sane input proceeds normally.
    let report = solver.step(&mut state, &StepInput::default(), &collisions);
    assert!(report.errors.is_empty());
}

#[test]
fn runaway_particle_is_caught_by_divergence_bound() {
    let topology = topology(vec![strand(0.0, 0.0)]);
    let pose = BodyPose::identity(1);
    let mut collisions = CollisionSet::new(Vec::new());
    collisions.update(&pose);
    let solver = PhysicsSolver::new(
        topology.clone(),
        SolverConfig {
            iterations: 1,
            divergence_factor: 1.5,
            ..SolverConfig::default()
        },
    );
    let mut state = SimulationState::from_rest_pose(&topology, &pose);

    // A gale strong enough to fling the tip far past the strand length.
    let input = StepInput {
        wind: Vec3::new(1.0e6, 0.0, 0.0),
        ..StepInput::default()
    };
    let report = solver.step(&mut state, &input, &collisions);
    assert_eq!(report.instability_count(), 1);
    assert_eq!(state.positions()[3], topology.rest_local()[3]);
}

#[test]
fn invalid_timestep_abandons_the_step() {
    let topology = topology(vec![strand(0.0, 0.05)]);
    let pose = BodyPose::identity(1);
    let mut collisions = CollisionSet::new(Vec::new());
    collisions.update(&pose);
    let solver = PhysicsSolver::new(topology.clone(), SolverConfig::default());
    let mut state = SimulationState::from_rest_pose(&topology, &pose);
    let before = state.positions().to_vec();

    for dt in [0.0, -1.0 / 60.0, f32::NAN, f32::INFINITY] {
        let report = solver.step(&mut state, &StepInput { dt, ..StepInput::default() }, &collisions);
        assert!(!report.committed);
        assert!(matches!(report.errors[0], PhysicsError::InvalidTimestep(_)));
    }
    assert_eq!(state.step_count(), 0);
    assert_eq!(state.positions(), before.as_slice());
}

#[test]
fn state_from_another_topology_is_rejected() {
    let small = topology(vec![strand(0.0, 0.05)]);
    let large = topology(vec![strand(0.0, 0.05), strand(0.1, 0.05)]);
    let pose = BodyPose::identity(1);
    let mut collisions = CollisionSet::new(Vec::new());
    collisions.update(&pose);

    let solver = PhysicsSolver::new(large, SolverConfig::default());
    let mut state = SimulationState::from_rest_pose(&small, &pose);
    let report = solver.step(&mut state, &StepInput::default(), &collisions);
    assert!(!report.committed);
    assert_eq!(
        report.errors,
        vec![PhysicsError::StateMismatch {
            expected: 8,
            found: 4
        }]
    );
}
