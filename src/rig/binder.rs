//! Applies the latest detection snapshot to the avatar skeleton.

use crate::avatar::{Bone, Rotation, Skeleton};
use crate::config::{BinderConfig, BindingProfile};
use crate::driver::DetectionSnapshot;
use crate::rig::mapper;
use crate::tracking::{PoseJoints, PoseLandmark};

/// One bone driven by the segment between two pose landmarks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimbBinding {
    pub bone: Bone,
    pub proximal: PoseLandmark,
    pub distal: PoseLandmark,
}

impl LimbBinding {
    const fn new(bone: Bone, proximal: PoseLandmark, distal: PoseLandmark) -> Self {
        Self {
            bone,
            proximal,
            distal,
        }
    }
}

const ARM_CHAIN_LIMBS: &[LimbBinding] = &[
    LimbBinding::new(Bone::RightArm, PoseLandmark::RightShoulder, PoseLandmark::RightElbow),
    LimbBinding::new(Bone::RightForeArm, PoseLandmark::RightElbow, PoseLandmark::RightWrist),
    LimbBinding::new(Bone::LeftArm, PoseLandmark::LeftShoulder, PoseLandmark::LeftElbow),
    LimbBinding::new(Bone::LeftForeArm, PoseLandmark::LeftElbow, PoseLandmark::LeftWrist),
];

const ARM_CHAIN_RESET: &[Bone] = &[Bone::RightArm, Bone::RightForeArm, Bone::LeftArm, Bone::LeftForeArm];

// The right forearm follows the shoulder-elbow segment here, and the reset
// set covers shoulders instead of forearms.
const CLASSIC_LIMBS: &[LimbBinding] = &[
    LimbBinding::new(Bone::RightShoulder, PoseLandmark::RightShoulder, PoseLandmark::RightElbow),
    LimbBinding::new(Bone::RightForeArm, PoseLandmark::RightShoulder, PoseLandmark::RightElbow),
    LimbBinding::new(Bone::LeftArm, PoseLandmark::LeftShoulder, PoseLandmark::LeftElbow),
    LimbBinding::new(Bone::LeftForeArm, PoseLandmark::LeftElbow, PoseLandmark::LeftWrist),
];

const CLASSIC_RESET: &[Bone] = &[Bone::RightShoulder, Bone::RightArm, Bone::LeftArm, Bone::LeftShoulder];

impl BindingProfile {
    /// Limb segments driven while a body is tracked, in application order
    pub fn limbs(self) -> &'static [LimbBinding] {
        match self {
            Self::ArmChain => ARM_CHAIN_LIMBS,
            Self::Classic => CLASSIC_LIMBS,
        }
    }

    /// Bones returned to neutral while no body is tracked
    pub fn reset_set(self) -> &'static [Bone] {
        match self {
            Self::ArmChain => ARM_CHAIN_RESET,
            Self::Classic => CLASSIC_RESET,
        }
    }
}

/// What one `apply` call did to each bone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindReport {
    /// Bones set from tracking
    pub driven: Vec<Bone>,
    /// Bones set to neutral
    pub reset: Vec<Bone>,
    /// Bones left untouched because their segment had no direction
    pub held: Vec<Bone>,
}

/// Writes detection-derived rotations onto the skeleton every render tick.
#[derive(Debug, Clone)]
pub struct AvatarBinder {
    profile: BindingProfile,
    visibility_threshold: f32,
}

impl AvatarBinder {
    pub fn new(config: &BinderConfig) -> Self {
        Self {
            profile: config.profile,
            visibility_threshold: config.visibility_threshold,
        }
    }

    pub fn profile(&self) -> BindingProfile {
        self.profile
    }

    /// Apply `snapshot` to `skeleton`.
    ///
    /// The face rotation goes to head and neck unchanged. With a body tracked,
    /// each limb bone follows its segment when both joints are visible and is
    /// reset otherwise; without a body the profile's reset set goes neutral.
    pub fn apply(&self, snapshot: &DetectionSnapshot, skeleton: &mut Skeleton) -> BindReport {
        let mut report = BindReport::default();

        if let Some(face) = snapshot.face_rotation {
            for bone in [Bone::Head, Bone::Neck] {
                skeleton.set_rotation(bone, face);
                report.driven.push(bone);
            }
        }

        match &snapshot.body {
            Some(body) => {
                for limb in self.profile.limbs() {
                    match self.limb_rotation(body, limb) {
                        LimbSignal::Rotation(rotation) => {
                            skeleton.set_rotation(limb.bone, rotation);
                            report.driven.push(limb.bone);
                        }
                        LimbSignal::Degenerate => report.held.push(limb.bone),
                        LimbSignal::Lost => {
                            skeleton.reset(limb.bone);
                            report.reset.push(limb.bone);
                        }
                    }
                }
            }
            None => {
                for &bone in self.profile.reset_set() {
                    skeleton.reset(bone);
                    report.reset.push(bone);
                }
            }
        }

        report
    }

    fn limb_rotation(&self, body: &PoseJoints, limb: &LimbBinding) -> LimbSignal {
        let (proximal, distal) = match (body.get(limb.proximal), body.get(limb.distal)) {
            (Some(p), Some(d)) => (p, d),
            _ => return LimbSignal::Lost,
        };

        if !proximal.is_visible(self.visibility_threshold)
            || !distal.is_visible(self.visibility_threshold)
        {
            return LimbSignal::Lost;
        }

        match mapper::joint_rotation(proximal, distal) {
            Some(rotation) => LimbSignal::Rotation(rotation),
            None => {
                tracing::trace!("{} segment has zero length, holding rotation", limb.bone);
                LimbSignal::Degenerate
            }
        }
    }
}

enum LimbSignal {
    Rotation(Rotation),
    Degenerate,
    Lost,
}
