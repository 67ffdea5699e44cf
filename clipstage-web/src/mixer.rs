use std::collections::HashMap;

use crate::animation::{AnimationClip, TargetProperty, TrackValue};
use crate::scene::SceneNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Play to the end and stop.
    Once,
    /// Wrap around at the end.
    Loop,
}

/// Playback state of one clip inside a model's mixer.
#[derive(Debug, Clone)]
pub struct AnimationAction {
    clip: AnimationClip,

    pub time: f32,
    pub time_scale: f32,
    pub weight: f32,
    pub loop_mode: LoopMode,
    /// With `LoopMode::Once`, hold the last frame instead of releasing the pose.
    pub clamp_when_finished: bool,

    running: bool,
    finished: bool,
}

impl AnimationAction {
    pub fn new(clip: AnimationClip) -> Self {
        Self {
            clip,
            time: 0.0,
            time_scale: 1.0,
            weight: 1.0,
            loop_mode: LoopMode::Loop,
            clamp_when_finished: false,
            running: false,
            finished: false,
        }
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    /// Rewind to time zero and clear the finished state.
    pub fn reset(&mut self) -> &mut Self {
        self.time = 0.0;
        self.finished = false;
        self
    }

    pub fn play(&mut self) -> &mut Self {
        self.running = true;
        self
    }

    pub fn stop(&mut self) -> &mut Self {
        self.running = false;
        self.finished = false;
        self.time = 0.0;
        self
    }

    /// Still advancing time.
    pub fn is_running(&self) -> bool {
        self.running && !self.finished
    }

    /// Contributes to the pose this frame (running, or clamped on its last frame).
    pub fn is_active(&self) -> bool {
        self.running && (!self.finished || self.clamp_when_finished) && self.weight > 0.0
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance time by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if !self.is_running() {
            return;
        }

        let duration = self.clip.duration;
        self.time += dt * self.time_scale;

        match self.loop_mode {
            LoopMode::Once => {
                if self.time >= duration {
                    self.time = duration;
                    self.finish();
                } else if self.time < 0.0 {
                    self.time = 0.0;
                    self.finish();
                }
            }
            LoopMode::Loop => {
                if duration <= 0.0 {
                    self.time = 0.0;
                } else {
                    self.time = self.time.rem_euclid(duration);
                }
            }
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        if !self.clamp_when_finished {
            self.running = false;
        }
    }
}

/// Per-(node, property) blend accumulator.
struct Accumulator {
    value: TrackValue,
    weight: f32,
}

impl Accumulator {
    fn add(&mut self, incoming: TrackValue, weight: f32) {
        self.weight += weight;
        let t = weight / self.weight;
        self.value = match (self.value, incoming) {
            (TrackValue::Vector3(a), TrackValue::Vector3(b)) => TrackValue::Vector3(a.lerp(b, t)),
            (TrackValue::Quaternion(a), TrackValue::Quaternion(b)) => TrackValue::Quaternion(a.slerp(b, t)),
            (current, _) => current,
        };
    }
}

/// Drives the node transforms of one model from its actions.
///
/// Every frame the animated properties are rebuilt from the rest pose: active
/// actions are blended by weight, and when the total weight is below one the
/// remainder comes from the rest pose. A property with no active action
/// returns to rest.
pub struct AnimationMixer {
    actions: Vec<AnimationAction>,
    targets: Vec<(usize, TargetProperty)>,
    was_active: bool,
}

impl AnimationMixer {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            targets: Vec::new(),
            was_active: false,
        }
    }

    /// Add an action, returning its index.
    pub fn add_action(&mut self, action: AnimationAction) -> usize {
        for track in &action.clip().tracks {
            let key = (track.node, track.property);
            if !self.targets.contains(&key) {
                self.targets.push(key);
            }
        }
        self.actions.push(action);
        self.actions.len() - 1
    }

    pub fn actions(&self) -> &[AnimationAction] {
        &self.actions
    }

    pub fn action(&self, index: usize) -> Option<&AnimationAction> {
        self.actions.get(index)
    }

    pub fn action_mut(&mut self, index: usize) -> Option<&mut AnimationAction> {
        self.actions.get_mut(index)
    }

    pub fn update(&mut self, dt: f32, nodes: &mut [SceneNode]) {
        for action in &mut self.actions {
            action.update(dt);
        }

        let any_active = self.actions.iter().any(AnimationAction::is_active);
        if !any_active && !self.was_active {
            return;
        }
        self.was_active = any_active;

        let mut accumulators: HashMap<(usize, TargetProperty), Accumulator> = HashMap::new();
        for action in self.actions.iter().filter(|a| a.is_active()) {
            for track in &action.clip().tracks {
                if track.node >= nodes.len() {
                    continue;
                }
                let value = track.sample(action.time);
                accumulators
                    .entry((track.node, track.property))
                    .and_modify(|acc| acc.add(value, action.weight))
                    .or_insert(Accumulator {
                        value,
                        weight: action.weight,
                    });
            }
        }

        for &(node_index, property) in &self.targets {
            let Some(node) = nodes.get_mut(node_index) else {
                continue;
            };
            let rest = node.rest;
            let accumulated = accumulators.get(&(node_index, property));
            let blend = accumulated.map_or(0.0, |acc| acc.weight.min(1.0));

            match (property, accumulated.map(|acc| acc.value)) {
                (TargetProperty::Translation, Some(TrackValue::Vector3(v))) => {
                    node.local.translation = rest.translation.lerp(v, blend);
                }
                (TargetProperty::Scale, Some(TrackValue::Vector3(v))) => {
                    node.local.scale = rest.scale.lerp(v, blend);
                }
                (TargetProperty::Rotation, Some(TrackValue::Quaternion(q))) => {
                    node.local.rotation = rest.rotation.slerp(q, blend);
                }
                (TargetProperty::Translation, _) => node.local.translation = rest.translation,
                (TargetProperty::Scale, _) => node.local.scale = rest.scale,
                (TargetProperty::Rotation, _) => node.local.rotation = rest.rotation,
            }
        }
    }
}

impl Default for AnimationMixer {
    fn default() -> Self {
        Self::new()
    }
}
