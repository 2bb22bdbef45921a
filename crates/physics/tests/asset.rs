use hair_physics::{
    CollisionProxy, StrandMaterial, StrandTopology, TopologyAsset, TopologyLoadError, Vec3,
};

#[test]
fn topology_asset_parses_from_json() -> anyhow::Result<()> {
    let json = r#"{
        "strands": [
            { "root_bone": 0, "rest_positions": [[0, 0, 0], [0, -0.1, 0], [0, -0.2, 0]] },
            {
                "root_bone": 2,
                "rest_positions": [[0.1, 0, 0], [0.1, -0.1, 0]],
                "material": { "bend_stiffness": 0.9 }
            }
        ]
    }"#;
    let asset: TopologyAsset = serde_json::from_str(json)?;
    assert_eq!(asset.strands[0].material, StrandMaterial::default());
    assert!((asset.strands[1].material.bend_stiffness - 0.9).abs() < f32::EPSILON);
    assert!((asset.strands[1].material.damping - StrandMaterial::default().damping).abs() < f32::EPSILON);

    let topology = StrandTopology::from_asset(&asset)?;
    assert_eq!(topology.strand_count(), 2);
    assert_eq!(topology.particle_count(), 5);
    assert!((topology.strands()[0].rest_length() - 0.2).abs() < 1e-6);
    assert_eq!(
        topology.validate_bones(2),
        Err(TopologyLoadError::UnknownBone {
            strand: 1,
            bone: 2,
            bone_count: 2
        })
    );
    Ok(())
}

#[test]
fn collision_proxies_parse_from_json() -> anyhow::Result<()> {
    let json = r#"[
        { "shape": "sphere", "bone": 1, "center": [0, 0.1, 0], "radius": 0.1 },
        { "shape": "capsule", "bone": 0, "a": [0, -0.2, 0], "b": [0, 0, 0], "radius": 0.05 }
    ]"#;
    let proxies: Vec<CollisionProxy> = serde_json::from_str(json)?;
    assert_eq!(
        proxies[0],
        CollisionProxy::Sphere {
            bone: 1,
            center: Vec3::new(0.0, 0.1, 0.0),
            radius: 0.1
        }
    );
    assert_eq!(proxies[1].bone(), 0);
    Ok(())
}

#[test]
fn load_errors_are_descriptive() {
    let err = StrandTopology::from_asset(&TopologyAsset::default()).unwrap_err();
    assert_eq!(err.to_string(), "topology contains no strands");
}
