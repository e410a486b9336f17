mod common;

use common::*;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use nfs_workload::{encode_name, WorkloadOptions, WorkloadSpec};

#[test]
fn test_callback_pod_with_bindings_and_memory() {
    let config = test_config();
    let options = WorkloadOptions::default()
        .with_env("MODE=callback")
        .with_env("BROKEN")
        .with_env("URL=http://host/?a=b")
        .with_memory("512Mi");
    let bind_paths = ["proj/1", "/workspace", "proj/1/../1/out", "/output"];

    let spec = nfs_workload::WorkloadBuilder::new(&config).callback_pod(
        "callback-1",
        vec!["/app/run".to_string(), "--serve".to_string()],
        &options,
        &bind_paths,
    );
    let WorkloadSpec::Pod(pod) = spec else {
        panic!("expected a pod");
    };

    assert_eq!(pod.metadata.name.as_deref(), Some("callback-1"));
    assert_eq!(pod.metadata.namespace.as_deref(), Some("default"));
    let pod_spec = pod.spec.as_ref().unwrap();
    assert_eq!(pod_spec.restart_policy.as_deref(), Some("Always"));
    assert_eq!(pod_spec.image_pull_secrets.as_ref().unwrap()[0].name, "regcred");

    let volumes = pod_spec.volumes.as_ref().unwrap();
    assert_eq!(volumes.len(), 2);
    assert_eq!(volumes[0].name, "mhfjz--xie-jwfvk--volume");
    assert_eq!(volumes[1].name, "ffctuhhzffbchcsim-volume");
    assert_eq!(volumes[0].name, format!("{}-volume", encode_name("/workspace")));

    let nfs = volumes[0].nfs.as_ref().unwrap();
    assert_eq!(nfs.server, NFS_SERVER);
    assert_eq!(nfs.path, "/exports/workspace/proj/1");
    assert_eq!(
        volumes[1].nfs.as_ref().unwrap().path,
        "/exports/workspace/proj/1/out"
    );

    let container = &pod_spec.containers[0];
    assert_eq!(container.name, "callback-1");
    assert_eq!(
        container.image.as_deref(),
        Some("registry.local:5000/callback-a")
    );
    assert_eq!(
        container.command.as_deref(),
        Some(&["/app/run".to_string(), "--serve".to_string()][..])
    );

    let mounts = container.volume_mounts.as_ref().unwrap();
    assert_eq!(mounts.len(), 2);
    for (mount, volume) in mounts.iter().zip(volumes) {
        assert_eq!(mount.name, volume.name);
        assert_eq!(mount.read_only, Some(false));
    }
    assert_eq!(mounts[0].mount_path, "/workspace");
    assert_eq!(mounts[1].mount_path, "/output");

    let env: Vec<(&str, Option<&str>)> = container
        .env
        .as_ref()
        .unwrap()
        .iter()
        .map(|var| (var.name.as_str(), var.value.as_deref()))
        .collect();
    assert_eq!(env, vec![("MODE", Some("callback"))]);

    let resources = container.resources.as_ref().unwrap();
    let limits = resources.limits.as_ref().unwrap();
    assert_eq!(limits.get("cpu"), Some(&Quantity("2000m".to_string())));
    assert_eq!(limits.get("memory"), Some(&Quantity("512Mi".to_string())));
    assert!(resources.requests.is_none());
}

#[test]
fn test_names_are_stable_across_builds() {
    let config = test_config();
    let builder = nfs_workload::WorkloadBuilder::new(&config);
    let bind_paths = ["a", "/data"];

    let names = |spec: WorkloadSpec| match spec {
        WorkloadSpec::Pod(pod) => pod
            .spec
            .unwrap()
            .volumes
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect::<Vec<_>>(),
        WorkloadSpec::Job(_) => unreachable!(),
    };

    let first = names(builder.callback_pod("x", vec![], &WorkloadOptions::default(), &bind_paths));
    let second = names(builder.callback_pod("y", vec![], &WorkloadOptions::default(), &bind_paths));
    assert_eq!(first, second);
    assert_eq!(first, vec!["impuxrmycmvkxfxhi-volume".to_string()]);
}

#[test]
fn test_unparseable_memory_is_dropped() {
    let config = test_config();
    let no_paths: [&str; 0] = [];
    let spec = nfs_workload::WorkloadBuilder::new(&config).callback_pod(
        "cb",
        vec![],
        &WorkloadOptions::default().with_memory("lots"),
        &no_paths,
    );
    let WorkloadSpec::Pod(pod) = spec else {
        panic!("expected a pod");
    };

    let container = &pod.spec.as_ref().unwrap().containers[0];
    let limits = container.resources.as_ref().unwrap().limits.as_ref().unwrap();
    assert!(limits.get("memory").is_none());
    assert_eq!(limits.get("cpu"), Some(&Quantity("2000m".to_string())));
    assert!(container.command.is_none());
}

#[test]
fn test_volume_names_are_dns_labels() {
    let config = test_config();
    let spec = nfs_workload::WorkloadBuilder::new(&config).callback_pod(
        "cb",
        vec![],
        &WorkloadOptions::default(),
        &["h", "/mnt/data16"],
    );
    let WorkloadSpec::Pod(pod) = spec else {
        panic!("expected a pod");
    };

    let pod_spec = pod.spec.as_ref().unwrap();
    let volume = &pod_spec.volumes.as_ref().unwrap()[0];
    assert_eq!(volume.name, "tjesojhbpsgwwiuc-volume");
    assert!(volume.name.len() <= 63);
    assert!(volume
        .name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    assert_eq!(
        pod_spec.containers[0].volume_mounts.as_ref().unwrap()[0].name,
        volume.name
    );
}
