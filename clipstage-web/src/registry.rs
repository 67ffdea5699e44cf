use std::collections::BTreeMap;
use std::fmt;

use crate::mixer::{AnimationMixer, LoopMode};

/// Which of the two stage models a clip belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelId {
    Primary,
    Secondary,
}

impl ModelId {
    pub fn label(self) -> &'static str {
        match self {
            ModelId::Primary => "primary model",
            ModelId::Secondary => "secondary model",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A playable clip: where it lives and how it plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipHandle {
    /// Registry key (lowercase).
    pub name: String,
    pub model: ModelId,
    /// Index of the action inside the owning model's mixer.
    pub action: usize,
    pub loop_mode: LoopMode,
    pub clamp_when_finished: bool,
}

/// Clip name to handle, for one loaded model. Built once, read-only after.
#[derive(Debug, Clone, Default)]
pub struct AnimationRegistry {
    clips: BTreeMap<String, ClipHandle>,
}

impl AnimationRegistry {
    /// Index every action in `mixer` under its lowercased clip name.
    /// When two clips normalize to the same key, the first one is kept.
    pub fn build(model: ModelId, mixer: &AnimationMixer) -> Self {
        let mut clips = BTreeMap::new();

        for (index, action) in mixer.actions().iter().enumerate() {
            let name = action.clip().name.trim().to_lowercase();
            if clips.contains_key(&name) {
                log::warn!(
                    "{model}: clip \"{}\" shadows an earlier clip with the same name; ignoring it",
                    action.clip().name
                );
                continue;
            }
            clips.insert(
                name.clone(),
                ClipHandle {
                    name,
                    model,
                    action: index,
                    loop_mode: action.loop_mode,
                    clamp_when_finished: action.clamp_when_finished,
                },
            );
        }

        Self { clips }
    }

    /// `name` must already be normalized.
    pub fn get(&self, name: &str) -> Option<&ClipHandle> {
        self.clips.get(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.clips.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}
