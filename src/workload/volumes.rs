//! NFS volume mapping for bind-style (host path, container path) pairs.

use k8s_openapi::api::core::v1::{NFSVolumeSource, Volume, VolumeMount};

use crate::config::NfsExport;
use crate::naming::encode_name;

const VOLUME_SUFFIX: &str = "-volume";

/// Prefix used when a token has nothing left after dropping leading `-`.
const FALLBACK_TOKEN: &str = "v";

/// Volume name for a container mount path. Depends on nothing else.
///
/// Leading `-` is dropped from the token so the name is a valid DNS-1123
/// label.
pub fn volume_name(container_path: &str) -> String {
    let token = encode_name(container_path);
    let token = match token.trim_start_matches('-') {
        "" => FALLBACK_TOKEN,
        trimmed => trimmed,
    };
    format!("{}{}", token, VOLUME_SUFFIX)
}

/// Map alternating `host, container, host, container, ...` entries to mounts
/// and NFS volumes, in input order.
///
/// Host paths are taken relative to the export's base path. A trailing host
/// path without a container path is ignored.
pub fn build_volumes<S: AsRef<str>>(
    export: &NfsExport,
    bind_paths: &[S],
) -> (Vec<VolumeMount>, Vec<Volume>) {
    let pairs = bind_paths.chunks_exact(2);
    let mut mounts = Vec::with_capacity(pairs.len());
    let mut volumes = Vec::with_capacity(pairs.len());

    for pair in pairs {
        let (host_path, container_path) = (pair[0].as_ref(), pair[1].as_ref());
        let (mount, volume) = nfs_volume(
            export,
            volume_name(container_path),
            host_path,
            container_path,
        );
        mounts.push(mount);
        volumes.push(volume);
    }

    (mounts, volumes)
}

/// One read-write NFS volume and its mount.
pub fn nfs_volume(
    export: &NfsExport,
    name: String,
    host_path: &str,
    container_path: &str,
) -> (VolumeMount, Volume) {
    let mount = VolumeMount {
        name: name.clone(),
        mount_path: container_path.to_string(),
        read_only: Some(false),
        ..Default::default()
    };

    let volume = Volume {
        name,
        nfs: Some(NFSVolumeSource {
            server: export.server.clone(),
            path: join_path(&export.path, host_path),
            read_only: None,
        }),
        ..Default::default()
    };

    (mount, volume)
}

/// Join `rel` under `base` and clean the result: `.` segments and repeated
/// slashes are dropped, `..` pops a segment and never climbs above the root.
pub fn join_path(base: &str, rel: &str) -> String {
    let rooted = base.starts_with('/') || (base.is_empty() && rel.starts_with('/'));

    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(rel.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(segments.last(), Some(last) if *last != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}
