use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    Step,
    Linear,
    CubicSpline,
}

/// Node property driven by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetProperty {
    Translation,
    Rotation,
    Scale,
}

/// Values a keyframe track can interpolate.
pub trait Keyframe: Copy {
    fn interpolate(a: Self, b: Self, t: f32) -> Self;

    /// Cubic Hermite segment in glTF form: `dt` is the segment length in
    /// seconds, tangents are per second.
    fn hermite(v0: Self, out_tangent: Self, v1: Self, in_tangent: Self, t: f32, dt: f32) -> Self;
}

impl Keyframe for Vec3 {
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }

    fn hermite(v0: Self, out_tangent: Self, v1: Self, in_tangent: Self, t: f32, dt: f32) -> Self {
        let (h00, h10, h01, h11) = hermite_basis(t);
        v0 * h00 + out_tangent * (h10 * dt) + v1 * h01 + in_tangent * (h11 * dt)
    }
}

impl Keyframe for Quat {
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        a.slerp(b, t)
    }

    fn hermite(v0: Self, out_tangent: Self, v1: Self, in_tangent: Self, t: f32, dt: f32) -> Self {
        let (h00, h10, h01, h11) = hermite_basis(t);
        (v0 * h00 + out_tangent * (h10 * dt) + v1 * h01 + in_tangent * (h11 * dt)).normalize()
    }
}

fn hermite_basis(t: f32) -> (f32, f32, f32, f32) {
    let t2 = t * t;
    let t3 = t2 * t;
    (
        2.0 * t3 - 3.0 * t2 + 1.0,
        t3 - 2.0 * t2 + t,
        -2.0 * t3 + 3.0 * t2,
        t3 - t2,
    )
}

/// Keyframes for one property. For `CubicSpline` the values are stored as
/// (in-tangent, value, out-tangent) triplets, as glTF lays them out.
#[derive(Debug, Clone)]
pub struct KeyframeTrack<T: Keyframe> {
    times: Vec<f32>,
    values: Vec<T>,
    interpolation: InterpolationMode,
}

impl<T: Keyframe> KeyframeTrack<T> {
    /// Returns `None` for an empty track or when the value count does not
    /// match the keyframe count.
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: InterpolationMode) -> Option<Self> {
        let per_key = match interpolation {
            InterpolationMode::CubicSpline => 3,
            _ => 1,
        };
        if times.is_empty() || values.len() != times.len() * per_key {
            return None;
        }
        Some(Self {
            times,
            values,
            interpolation,
        })
    }

    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    pub fn interpolation(&self) -> InterpolationMode {
        self.interpolation
    }

    /// Sample at `time`, clamping to the first/last keyframe outside the
    /// keyframe range.
    pub fn sample(&self, time: f32) -> T {
        let Some((i0, i1, t)) = find_keyframe_index(&self.times, time) else {
            return self.value_at(0);
        };

        match self.interpolation {
            InterpolationMode::Step => self.value_at(i0),
            InterpolationMode::Linear => T::interpolate(self.value_at(i0), self.value_at(i1), t),
            InterpolationMode::CubicSpline => {
                if i0 == i1 {
                    return self.value_at(i0);
                }
                let dt = self.times[i1] - self.times[i0];
                T::hermite(
                    self.value_at(i0),
                    self.values[i0 * 3 + 2],
                    self.value_at(i1),
                    self.values[i1 * 3],
                    t,
                    dt,
                )
            }
        }
    }

    fn value_at(&self, index: usize) -> T {
        match self.interpolation {
            InterpolationMode::CubicSpline => self.values[index * 3 + 1],
            _ => self.values[index],
        }
    }
}

/// Binary search for the keyframe interval containing `time`.
/// Returns (index0, index1, interpolation_factor) or None.
fn find_keyframe_index(times: &[f32], time: f32) -> Option<(usize, usize, f32)> {
    if times.is_empty() {
        return None;
    }
    if times.len() == 1 || time <= times[0] {
        return Some((0, 0, 0.0));
    }
    let last = times.len() - 1;
    if time >= times[last] {
        return Some((last, last, 0.0));
    }

    let mut lo = 0;
    let mut hi = last;
    while lo < hi - 1 {
        let mid = (lo + hi) / 2;
        if times[mid] <= time {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let t0 = times[lo];
    let t1 = times[hi];
    let factor = if (t1 - t0).abs() < 1e-8 {
        0.0
    } else {
        (time - t0) / (t1 - t0)
    };

    Some((lo, hi, factor))
}

#[derive(Debug, Clone)]
pub enum TrackData {
    Vector3(KeyframeTrack<Vec3>),
    Quaternion(KeyframeTrack<Quat>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackValue {
    Vector3(Vec3),
    Quaternion(Quat),
}

/// One animated property of one node (index into the model's node array).
#[derive(Debug, Clone)]
pub struct Track {
    pub node: usize,
    pub property: TargetProperty,
    pub data: TrackData,
}

impl Track {
    pub fn sample(&self, time: f32) -> TrackValue {
        match &self.data {
            TrackData::Vector3(track) => TrackValue::Vector3(track.sample(time)),
            TrackData::Quaternion(track) => TrackValue::Quaternion(track.sample(time)),
        }
    }

    fn end_time(&self) -> f32 {
        match &self.data {
            TrackData::Vector3(track) => track.end_time(),
            TrackData::Quaternion(track) => track.end_time(),
        }
    }
}

/// A named, time-bounded animation authored into a model.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<Track>,
}

impl AnimationClip {
    /// Duration is the latest keyframe across all tracks.
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks.iter().map(Track::end_time).fold(0.0_f32, f32::max);
        Self {
            name: name.into(),
            duration,
            tracks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn vec_track(mode: InterpolationMode) -> KeyframeTrack<Vec3> {
        KeyframeTrack::new(
            vec![0.0, 1.0, 2.0],
            vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), Vec3::new(10.0, 20.0, 0.0)],
            mode,
        )
        .unwrap()
    }

    // ── construction ──

    #[test]
    fn test_track_rejects_mismatched_lengths() {
        assert!(KeyframeTrack::new(vec![0.0, 1.0], vec![Vec3::ZERO], InterpolationMode::Linear).is_none());
        assert!(KeyframeTrack::<Vec3>::new(vec![], vec![], InterpolationMode::Step).is_none());
        assert!(KeyframeTrack::new(vec![0.0], vec![Vec3::ZERO], InterpolationMode::CubicSpline).is_none());
    }

    // ── linear ──

    #[test]
    fn test_linear_midpoint() {
        let track = vec_track(InterpolationMode::Linear);
        let v = track.sample(0.5);
        assert!(approx_eq(v.x, 5.0), "got {v}");
        let v = track.sample(1.5);
        assert!(approx_eq(v.x, 10.0) && approx_eq(v.y, 10.0), "got {v}");
    }

    #[test]
    fn test_linear_clamps_outside_range() {
        let track = vec_track(InterpolationMode::Linear);
        assert_eq!(track.sample(-3.0), Vec3::ZERO);
        assert_eq!(track.sample(99.0), Vec3::new(10.0, 20.0, 0.0));
    }

    #[test]
    fn test_linear_exact_keyframes() {
        let track = vec_track(InterpolationMode::Linear);
        assert!(approx_eq(track.sample(1.0).x, 10.0));
        assert!(approx_eq(track.sample(2.0).y, 20.0));
    }

    // ── step ──

    #[test]
    fn test_step_holds_previous_key() {
        let track = vec_track(InterpolationMode::Step);
        assert_eq!(track.sample(0.99), Vec3::ZERO);
        assert_eq!(track.sample(1.0), Vec3::new(10.0, 0.0, 0.0));
    }

    // ── cubic spline ──

    #[test]
    fn test_cubic_with_zero_tangents() {
        let zero = Vec3::ZERO;
        let track = KeyframeTrack::new(
            vec![0.0, 2.0],
            vec![zero, Vec3::ZERO, zero, zero, Vec3::new(4.0, 0.0, 0.0), zero],
            InterpolationMode::CubicSpline,
        )
        .unwrap();
        assert!(approx_eq(track.sample(0.0).x, 0.0));
        assert!(approx_eq(track.sample(1.0).x, 2.0));
        assert!(approx_eq(track.sample(2.0).x, 4.0));
    }

    #[test]
    fn test_cubic_tangent_bends_curve() {
        let zero = Vec3::ZERO;
        let track = KeyframeTrack::new(
            vec![0.0, 1.0],
            vec![zero, zero, Vec3::new(0.0, 4.0, 0.0), zero, zero, zero],
            InterpolationMode::CubicSpline,
        )
        .unwrap();
        // h10(0.5) = 0.125, dt = 1
        assert!(approx_eq(track.sample(0.5).y, 0.5));
    }

    // ── rotation ──

    #[test]
    fn test_quat_slerp_midpoint() {
        let track = KeyframeTrack::new(
            vec![0.0, 1.0],
            vec![Quat::IDENTITY, Quat::from_rotation_y(FRAC_PI_2)],
            InterpolationMode::Linear,
        )
        .unwrap();
        let q = track.sample(0.5);
        let expected = Quat::from_rotation_y(FRAC_PI_2 / 2.0);
        assert!(q.angle_between(expected) < 1e-4);
    }

    // ── clip ──

    #[test]
    fn test_clip_duration_is_latest_keyframe() {
        let clip = AnimationClip::new(
            "wave",
            vec![
                Track {
                    node: 0,
                    property: TargetProperty::Translation,
                    data: TrackData::Vector3(vec_track(InterpolationMode::Linear)),
                },
                Track {
                    node: 1,
                    property: TargetProperty::Rotation,
                    data: TrackData::Quaternion(
                        KeyframeTrack::new(vec![0.0, 3.5], vec![Quat::IDENTITY; 2], InterpolationMode::Step)
                            .unwrap(),
                    ),
                },
            ],
        );
        assert!(approx_eq(clip.duration, 3.5));
        assert_eq!(clip.name, "wave");
    }

    #[test]
    fn test_empty_clip_has_zero_duration() {
        assert_eq!(AnimationClip::new("idle", vec![]).duration, 0.0);
    }
}
