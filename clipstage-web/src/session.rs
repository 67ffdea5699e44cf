use clipstage_gpu_shared::math::Frustum;
use clipstage_wgpu::DrawItem;

use crate::registry::{AnimationRegistry, ClipHandle, ModelId};
use crate::scene::{GpuUploader, ModelInstance};

pub enum SlotState {
    /// Load still in flight (or never started).
    Pending,
    Loaded(Box<ModelInstance>),
    /// Load failed; the slot stays empty for the rest of the session.
    Failed(String),
}

pub struct ModelSlot {
    pub id: ModelId,
    pub state: SlotState,
}

impl ModelSlot {
    fn new(id: ModelId) -> Self {
        Self {
            id,
            state: SlotState::Pending,
        }
    }

    pub fn model(&self) -> Option<&ModelInstance> {
        match &self.state {
            SlotState::Loaded(model) => Some(model.as_ref()),
            _ => None,
        }
    }

    pub fn model_mut(&mut self) -> Option<&mut ModelInstance> {
        match &mut self.state {
            SlotState::Loaded(model) => Some(model.as_mut()),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SlotState::Pending)
    }
}

/// Owner of the two model slots. Each slot is empty until its load
/// completes and is never replaced afterwards.
pub struct Session {
    slots: [ModelSlot; 2],
}

impl Session {
    pub fn new() -> Self {
        Self {
            slots: [ModelSlot::new(ModelId::Primary), ModelSlot::new(ModelId::Secondary)],
        }
    }

    fn index(id: ModelId) -> usize {
        match id {
            ModelId::Primary => 0,
            ModelId::Secondary => 1,
        }
    }

    pub fn slot(&self, id: ModelId) -> &ModelSlot {
        &self.slots[Self::index(id)]
    }

    fn slot_mut(&mut self, id: ModelId) -> &mut ModelSlot {
        &mut self.slots[Self::index(id)]
    }

    /// The registry of a loaded model; `None` while pending or after failure.
    pub fn registry(&self, id: ModelId) -> Option<&AnimationRegistry> {
        self.slot(id).model().map(|m| &m.registry)
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelInstance> {
        self.slots.iter().filter_map(ModelSlot::model)
    }

    /// Fill a pending slot. Returns false (and drops `model`) if the slot
    /// was already settled.
    pub fn install(&mut self, id: ModelId, model: ModelInstance) -> bool {
        if !self.slot(id).is_pending() {
            log::warn!("{id} slot already settled; ignoring a second load");
            return false;
        }

        let names: Vec<&str> = model.registry.names().collect();
        log::info!("{id} loaded: {} clips [{}]", names.len(), names.join(", "));

        for other in self.models() {
            for name in model.registry.names().filter(|n| other.registry.get(n).is_some()) {
                let (winner, shadowed) = match id {
                    ModelId::Primary => (id, other.id),
                    ModelId::Secondary => (other.id, id),
                };
                log::warn!("Clip \"{name}\" exists on both models; {winner} wins, {shadowed} copy is unreachable");
            }
        }

        self.slot_mut(id).state = SlotState::Loaded(Box::new(model));
        true
    }

    pub fn mark_failed(&mut self, id: ModelId, reason: impl Into<String>) {
        let slot = self.slot_mut(id);
        if slot.is_pending() {
            slot.state = SlotState::Failed(reason.into());
        }
    }

    /// Reset the clip's action to time zero and play it.
    pub fn restart_clip(&mut self, clip: &ClipHandle) -> bool {
        self.slot_mut(clip.model)
            .model_mut()
            .is_some_and(|model| model.restart_action(clip.action))
    }

    /// Advance every loaded model by `dt` seconds. Pending slots are skipped.
    pub fn update(&mut self, dt: f32) {
        for slot in &mut self.slots {
            if let Some(model) = slot.model_mut() {
                model.update(dt);
            }
        }
    }

    pub fn upload_skinned(&self, uploader: &mut impl GpuUploader) {
        for model in self.models() {
            model.upload_skinned(uploader);
        }
    }

    pub fn draw_list(&self, frustum: &Frustum) -> Vec<DrawItem> {
        let mut draws = Vec::new();
        for model in self.models() {
            model.collect_draws(frustum, &mut draws);
        }
        draws
    }

    /// Every reachable clip name, primary first.
    pub fn clip_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for model in self.models() {
            for name in model.registry.names() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
