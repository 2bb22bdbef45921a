use std::sync::Arc;

use hair_physics::{
    BodyPose, CollisionProxy, CollisionSet, PhysicsError, PhysicsSolver, SimulationState, SolverConfig,
    StepInput, StrandAsset, StrandMaterial, StrandTopology, TopologyAsset, Vec3,
};

const TOLERANCE: f32 = 1e-4;

/// Strands hanging from above into the space occupied by the proxies.
fn curtain() -> Arc<StrandTopology> {
    let asset = TopologyAsset {
        strands: [-0.08_f32, -0.03, 0.03, 0.08]
            .iter()
            .map(|&x| StrandAsset {
                root_bone: 0,
                rest_positions: (0..7).map(|i| [x, 0.5 - 0.1 * i as f32, 0.0]).collect(),
                material: StrandMaterial::default(),
            })
            .collect(),
    };
    Arc::new(StrandTopology::from_asset(&asset).unwrap())
}

fn check_no_penetration(topology: &StrandTopology, set: &CollisionSet, positions: &[Vec3], radius: f32) {
    for strand in topology.strands() {
        for i in strand.particles().skip(1) {
            let distance = set.signed_distance(positions[i]).unwrap();
            assert!(
                distance >= radius - TOLERANCE,
                "particle {i} penetrates by {}",
                radius - distance
            );
        }
    }
}

#[test]
fn particles_stay_outside_sphere() {
    let topology = curtain();
    let pose = BodyPose::identity(1);
    let mut set = CollisionSet::new(vec![CollisionProxy::Sphere {
        bone: 0,
        center: Vec3::ZERO,
        radius: 0.2,
    }]);
    assert!(set.update(&pose).is_empty());

    let config = SolverConfig::default();
    let radius = config.particle_radius;
    let solver = PhysicsSolver::new(topology.clone(), config);
    let mut state = SimulationState::from_rest_pose(&topology, &pose);

    let mut touched = false;
    for _ in 0..120 {
        let report = solver.step(&mut state, &StepInput::default(), &set);
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        touched |= report.contacts > 0;
        check_no_penetration(&topology, &set, state.positions(), radius);
    }
    assert!(touched);
}

#[test]
fn particles_stay_outside_capsule() {
    let topology = curtain();
    let pose = BodyPose::identity(1);
    let mut set = CollisionSet::new(vec![CollisionProxy::Capsule {
        bone: 0,
        a: Vec3::new(-0.3, 0.0, 0.0),
        b: Vec3::new(0.3, 0.05, 0.0),
        radius: 0.08,
    }]);
    set.update(&pose);

    let config = SolverConfig::default();
    let radius = config.particle_radius;
    let solver = PhysicsSolver::new(topology.clone(), config);
    let mut state = SimulationState::from_rest_pose(&topology, &pose);

    for _ in 0..120 {
        solver.step(&mut state, &StepInput::default(), &set);
        check_no_penetration(&topology, &set, state.positions(), radius);
    }
}

#[test]
fn unposed_proxies_are_reported_and_ignored() {
    let topology = curtain();
    let pose = BodyPose::identity(1);
    let set = CollisionSet::new(vec![CollisionProxy::Sphere {
        bone: 0,
        center: Vec3::ZERO,
        radius: 0.2,
    }]);
    let solver = PhysicsSolver::new(topology.clone(), SolverConfig::default());
    let mut state = SimulationState::from_rest_pose(&topology, &pose);

    let report = solver.step(&mut state, &StepInput::default(), &set);
    assert!(report.committed);
    assert_eq!(report.contacts, 0);
    assert_eq!(
        report.errors,
        vec![PhysicsError::CollisionProxyMissing { proxy: 0, bone: 0 }]
    );
    assert_eq!(report.missing_proxy_count(), 1);
}

#[test]
fn proxy_on_missing_bone_is_skipped() {
    let topology = curtain();
    let pose = BodyPose::identity(1);
    let mut set = CollisionSet::new(vec![CollisionProxy::Sphere {
        bone: 3,
        center: Vec3::ZERO,
        radius: 0.2,
    }]);
    let missing = set.update(&pose);
    assert_eq!(
        missing,
        vec![PhysicsError::CollisionProxyMissing { proxy: 0, bone: 3 }]
    );

    let solver = PhysicsSolver::new(topology.clone(), SolverConfig::default());
    let mut state = SimulationState::from_rest_pose(&topology, &pose);
    let report = solver.step(&mut state, &StepInput::default(), &set);
    assert!(report.committed);
    assert_eq!(report.contacts, 0);
}
