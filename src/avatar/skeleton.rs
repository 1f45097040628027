//! Avatar skeleton: the named bone nodes the binder drives.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::error::{AvatarError, MirrorError};

/// Euler rotation in radians, XYZ order
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Rotation {
    /// Neutral orientation
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Rig bones driven by tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bone {
    Head,
    Neck,
    LeftShoulder,
    LeftArm,
    LeftForeArm,
    RightShoulder,
    RightArm,
    RightForeArm,
}

impl Bone {
    pub const COUNT: usize = 8;

    pub const ALL: [Bone; Bone::COUNT] = [
        Bone::Head,
        Bone::Neck,
        Bone::LeftShoulder,
        Bone::LeftArm,
        Bone::LeftForeArm,
        Bone::RightShoulder,
        Bone::RightArm,
        Bone::RightForeArm,
    ];

    /// Node name in the avatar asset
    pub fn node_name(self) -> &'static str {
        match self {
            Bone::Head => "Head",
            Bone::Neck => "Neck",
            Bone::LeftShoulder => "LeftShoulder",
            Bone::LeftArm => "LeftArm",
            Bone::LeftForeArm => "LeftForeArm",
            Bone::RightShoulder => "RightShoulder",
            Bone::RightArm => "RightArm",
            Bone::RightForeArm => "RightForeArm",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Bone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.node_name())
    }
}

/// The tracked bones of a loaded avatar
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    rotations: [Rotation; Bone::COUNT],
}

impl Skeleton {
    /// Load an avatar asset (glTF or GLB) and resolve every tracked bone by
    /// node name.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MirrorError> {
        let path = path.as_ref();
        let gltf = gltf::Gltf::open(path)
            .map_err(|e| AvatarError::Load(format!("{}: {}", path.display(), e)))?;

        let names: Vec<String> = gltf
            .document
            .nodes()
            .map(|n| n.name().unwrap_or_default().to_string())
            .collect();

        let skeleton = Self::from_node_names(names.iter().map(String::as_str))?;
        tracing::info!(
            "Loaded avatar {} ({} nodes, {} tracked bones)",
            path.display(),
            names.len(),
            Bone::COUNT
        );
        Ok(skeleton)
    }

    /// Check that every tracked bone has a node among `names`.
    pub fn from_node_names<'a, I>(names: I) -> Result<Self, MirrorError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let present: HashSet<&str> = names.into_iter().collect();

        if let Some(missing) = Bone::ALL.iter().find(|b| !present.contains(b.node_name())) {
            return Err(AvatarError::MissingBone(missing.node_name().to_string()).into());
        }

        Ok(Self {
            rotations: [Rotation::ZERO; Bone::COUNT],
        })
    }

    pub fn rotation(&self, bone: Bone) -> Rotation {
        self.rotations[bone.slot()]
    }

    /// Overwrite all three axes of a bone's rotation
    pub fn set_rotation(&mut self, bone: Bone, rotation: Rotation) {
        self.rotations[bone.slot()] = rotation;
    }

    /// Return a bone to neutral
    pub fn reset(&mut self, bone: Bone) {
        self.set_rotation(bone, Rotation::ZERO);
    }

    /// Snapshot of every bone for publishing
    pub fn pose(&self, frame: u64, face_tracked: bool, body_tracked: bool) -> SkeletonPose {
        let bones = Bone::ALL
            .iter()
            .map(|&bone| (bone.node_name().to_string(), self.rotation(bone).to_array()))
            .collect();

        SkeletonPose {
            frame,
            face_tracked,
            body_tracked,
            bones,
        }
    }
}

/// Serializable bone rotations for one tick
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SkeletonPose {
    /// Driver frame index that produced this pose
    pub frame: u64,
    pub face_tracked: bool,
    pub body_tracked: bool,
    /// Node name -> [x, y, z] Euler radians
    pub bones: BTreeMap<String, [f32; 3]>,
}

impl SkeletonPose {
    /// Same bone rotations and tracking flags, ignoring the frame index
    pub fn same_pose(&self, other: &SkeletonPose) -> bool {
        self.face_tracked == other.face_tracked
            && self.body_tracked == other.body_tracked
            && self.bones == other.bones
    }
}

#[cfg(test)]
pub(crate) fn test_skeleton() -> Skeleton {
    let names = ["Armature", "Hips", "Spine"]
        .into_iter()
        .chain(Bone::ALL.iter().map(|b| b.node_name()));
    Skeleton::from_node_names(names).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_starts_neutral() {
        let skeleton = test_skeleton();
        assert!(Bone::ALL.iter().all(|&b| skeleton.rotation(b).is_neutral()));
    }

    #[test]
    fn test_duplicate_node_names() {
        let names = Bone::ALL
            .iter()
            .chain(Bone::ALL.iter())
            .map(|b| b.node_name());
        assert!(Skeleton::from_node_names(names).is_ok());
    }

    #[test]
    fn test_missing_bone() {
        let err = Skeleton::from_node_names(["Head", "Neck"]).unwrap_err();
        match err {
            MirrorError::Avatar(AvatarError::MissingBone(name)) => {
                assert_eq!(name, "LeftShoulder")
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_set_and_reset() {
        let mut skeleton = test_skeleton();
        skeleton.set_rotation(Bone::LeftArm, Rotation::new(0.1, 0.2, 0.3));
        assert_eq!(skeleton.rotation(Bone::LeftArm), Rotation::new(0.1, 0.2, 0.3));

        skeleton.reset(Bone::LeftArm);
        assert_eq!(skeleton.rotation(Bone::LeftArm), Rotation::ZERO);
    }

    #[test]
    fn test_pose_snapshot() {
        let mut skeleton = test_skeleton();
        skeleton.set_rotation(Bone::Neck, Rotation::new(0.5, 0.0, 0.0));

        let pose = skeleton.pose(7, true, false);
        assert_eq!(pose.frame, 7);
        assert_eq!(pose.bones.len(), Bone::COUNT);
        assert_eq!(pose.bones["Neck"], [0.5, 0.0, 0.0]);

        let later = skeleton.pose(8, true, false);
        assert!(pose.same_pose(&later));
        assert_ne!(pose, later);
    }

    #[test]
    fn test_load_gltf() {
        let nodes: Vec<_> = ["Hips"]
            .into_iter()
            .chain(Bone::ALL.iter().map(|b| b.node_name()))
            .map(|name| serde_json::json!({ "name": name }))
            .collect();
        let doc = serde_json::json!({
            "asset": { "version": "2.0" },
            "nodes": nodes,
        });

        let mut file = tempfile::Builder::new().suffix(".gltf").tempfile().unwrap();
        file.write_all(doc.to_string().as_bytes()).unwrap();

        let skeleton = Skeleton::load(file.path()).unwrap();
        assert_eq!(skeleton.rotation(Bone::Head), Rotation::ZERO);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Skeleton::load("/nonexistent/Model.glb").unwrap_err();
        assert!(matches!(err, MirrorError::Avatar(AvatarError::Load(_))));
    }
}
