//! Build, export and re-measure complete parts

use approx::assert_relative_eq;
use pk_cad::{CadEngine, DerivedGeometry, Direction, EngineKind, Fidelity};
use pk_core::{Solid, SolidConfig, VolumeCheck, analyze_stl};

#[test]
fn test_rods_have_expected_bounds() {
    let temp = tempfile::tempdir().unwrap();
    for direction in Direction::ALL {
        let config = SolidConfig::new(format!("rod-{}", direction.name()))
            .with_output_dir(temp.path());
        let mut rod = Solid::from_fn(config, move |engine| {
            engine.cylinder_rounded(30.0, 5.0, 1.0, direction)
        });

        let summary = rod.export().unwrap();
        let stats = analyze_stl(&summary.meshes[0]).unwrap();
        let size = stats.bounds.size();
        let mut expected = glam::DVec3::splat(10.0);
        expected[direction.index()] = 30.0;
        assert_relative_eq!(size.x, expected.x, epsilon = 1e-3);
        assert_relative_eq!(size.y, expected.y, epsilon = 1e-3);
        assert_relative_eq!(size.z, expected.z, epsilon = 1e-3);
    }
}

#[test]
fn test_box_volume_survives_export() {
    let temp = tempfile::tempdir().unwrap();
    let config = SolidConfig::new("box")
        .with_output_dir(temp.path())
        .with_reference_volume(6000.0);
    let mut solid = Solid::from_fn(config, |engine| engine.cuboid(10.0, 20.0, 30.0));

    let summary = solid.export().unwrap();
    let stats = analyze_stl(&summary.meshes[0]).unwrap();
    assert_relative_eq!(stats.volume, 6000.0, max_relative = 0.1);
    assert_relative_eq!(stats.hull_volume, 6000.0, max_relative = 0.1);
    assert!(matches!(summary.report.volume, VolumeCheck::Passed { .. }));
}

#[test]
fn test_parent_with_two_children_writes_three_meshes() {
    let temp = tempfile::tempdir().unwrap();
    let parent_config = SolidConfig::new("body")
        .with_output_dir(temp.path())
        .with_fidelity(Fidelity::Low);

    let mut body = Solid::from_fn(parent_config.clone(), |engine| {
        engine.cuboid(20.0, 10.0, 5.0)
    });
    body.add_part(Solid::from_fn(parent_config.child("wheel"), |engine| {
        engine.cylinder_y(2.0, 4.0)
    }));
    body.add_part(Solid::from_fn(parent_config.child("axle"), |engine| {
        engine.cylinder_rounded_x(24.0, 1.0, 0.5)
    }));

    let summary = body.export().unwrap();
    assert_eq!(summary.meshes.len(), 3);
    for mesh in &summary.meshes {
        assert!(mesh.exists(), "{} missing", mesh.display());
        assert_eq!(mesh.parent(), Some(temp.path()));
    }
    // report and argument dump per part
    assert_eq!(summary.reports.len(), 6);
}

#[test]
fn test_nested_parts_share_run_dir() {
    let temp = tempfile::tempdir().unwrap();
    let mut config = SolidConfig::new("robot").with_output_dir(temp.path());
    config.timestamp_dir = true;
    config.write_report = false;

    let mut arm = Solid::from_fn(config.child("arm"), |engine| engine.cuboid(2.0, 2.0, 8.0));
    arm.add_part(Solid::from_fn(config.child("gripper"), |engine| {
        let base = engine.cuboid(2.0, 1.0, 1.0)?;
        engine.mirror_join(&engine.move_by(&base, 0.0, 1.0, 0.0)?)
    }));

    let mut robot = Solid::from_fn(config, |engine| engine.sphere(3.0));
    robot.add_part(arm);

    let summary = robot.export().unwrap();
    let names: Vec<String> = summary
        .meshes
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["robot.stl", "arm.stl", "gripper.stl"]);
    assert!(summary.meshes.iter().all(|p| p.parent() == Some(summary.run_dir.as_path())));
}

#[test]
fn test_null_engine_parts_fail_cleanly() {
    let temp = tempfile::tempdir().unwrap();
    let config = SolidConfig::new("nothing")
        .with_output_dir(temp.path())
        .with_engine(EngineKind::Null);
    let mut solid = Solid::from_fn(config, |engine| engine.cuboid(1.0, 1.0, 1.0));
    assert!(solid.export().is_err());
    assert!(!temp.path().join("nothing.stl").exists());
}
