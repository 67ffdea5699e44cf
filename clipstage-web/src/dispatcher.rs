//! Text commands to clip playback.
//!
//! A submitted line is trimmed and lowercased, then looked up in each
//! model's registry in dispatch order (primary first). The first match is
//! restarted from time zero; a miss is logged and changes nothing. Models
//! that have not finished loading simply contribute no clips.

use std::mem;

use crate::registry::{ClipHandle, ModelId};
use crate::session::Session;

pub fn normalize_command(input: &str) -> String {
    input.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Played(ClipHandle),
    NotFound { command: String },
}

impl DispatchOutcome {
    pub fn is_played(&self) -> bool {
        matches!(self, DispatchOutcome::Played(_))
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    order: Vec<ModelId>,
}

impl Dispatcher {
    pub fn new(order: Vec<ModelId>) -> Self {
        Self { order }
    }

    pub fn order(&self) -> &[ModelId] {
        &self.order
    }

    /// First clip named `input` (after normalizing) in dispatch order.
    pub fn resolve(&self, session: &Session, input: &str) -> Option<ClipHandle> {
        let command = normalize_command(input);
        self.order
            .iter()
            .filter_map(|&id| session.registry(id))
            .find_map(|registry| registry.get(&command))
            .cloned()
    }

    pub fn dispatch(&self, session: &mut Session, input: &str) -> DispatchOutcome {
        match self.resolve(session, input) {
            Some(clip) if session.restart_clip(&clip) => {
                log::info!("Playing clip {} on {}", clip.name, clip.model);
                DispatchOutcome::Played(clip)
            }
            Some(clip) => {
                log::error!("Clip \"{}\" on {} has no action to play", clip.name, clip.model);
                DispatchOutcome::NotFound {
                    command: normalize_command(input),
                }
            }
            None => {
                let command = normalize_command(input);
                log::error!("Clip \"{command}\" not found");
                DispatchOutcome::NotFound { command }
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(vec![ModelId::Primary, ModelId::Secondary])
    }
}

/// State behind the command text box.
#[derive(Debug, Clone, Default)]
pub struct CommandLine {
    value: String,
    dispatcher: Dispatcher,
}

impl CommandLine {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            value: String::new(),
            dispatcher,
        }
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Dispatch the current value. The field is emptied whatever the outcome.
    pub fn submit(&mut self, session: &mut Session) -> DispatchOutcome {
        let line = mem::take(&mut self.value);
        self.dispatcher.dispatch(session, &line)
    }

    /// Only `Enter` submits; other keys return `None`.
    pub fn handle_key(&mut self, key: &str, session: &mut Session) -> Option<DispatchOutcome> {
        (key == "Enter").then(|| self.submit(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelPlacement;
    use crate::mixer::AnimationMixer;
    use crate::scene::tests::{asset_with_clips, FakeUploader};
    use crate::scene::ModelInstance;

    fn session_with(primary: Option<&[&str]>, secondary: Option<&[&str]>) -> Session {
        let mut gpu = FakeUploader::default();
        let mut session = Session::new();
        if let Some(clips) = primary {
            let model = ModelInstance::instantiate(
                ModelId::Primary,
                asset_with_clips(clips),
                &ModelPlacement::default(),
                &mut gpu,
            );
            session.install(ModelId::Primary, model);
        }
        if let Some(clips) = secondary {
            let model = ModelInstance::instantiate(
                ModelId::Secondary,
                asset_with_clips(clips),
                &ModelPlacement::default(),
                &mut gpu,
            );
            session.install(ModelId::Secondary, model);
        }
        session
    }

    /// (time, running) of every action on every loaded model.
    fn playback_state(session: &Session) -> Vec<(f32, bool)> {
        session
            .models()
            .flat_map(|m| m.mixer.actions().iter().map(|a| (a.time, a.is_running())))
            .collect()
    }

    fn action_time(session: &Session, clip: &ClipHandle) -> f32 {
        session.slot(clip.model).model().unwrap().mixer.action(clip.action).unwrap().time
    }

    // ── normalize ──

    #[test]
    fn test_normalize_trims_and_lowercases() {
        assert_eq!(normalize_command("  Run \t"), "run");
        assert_eq!(normalize_command("JUMP"), "jump");
        assert_eq!(normalize_command(""), "");
    }

    // ── lookup order ──

    #[test]
    fn test_primary_only_clip_resolves_to_primary() {
        let session = session_with(Some(&["run"]), Some(&["wave", "jump"]));
        let clip = Dispatcher::default().resolve(&session, "run").unwrap();
        assert_eq!(clip.model, ModelId::Primary);
    }

    #[test]
    fn test_secondary_clip_found_when_primary_lacks_it() {
        let session = session_with(Some(&["run"]), Some(&["wave"]));
        let clip = Dispatcher::default().resolve(&session, "wave").unwrap();
        assert_eq!(clip.model, ModelId::Secondary);
    }

    #[test]
    fn test_collision_first_model_wins() {
        let session = session_with(Some(&["run"]), Some(&["run"]));
        assert_eq!(Dispatcher::default().resolve(&session, "run").unwrap().model, ModelId::Primary);

        let reversed = Dispatcher::new(vec![ModelId::Secondary, ModelId::Primary]);
        assert_eq!(reversed.resolve(&session, "run").unwrap().model, ModelId::Secondary);
    }

    #[test]
    fn test_case_and_whitespace_variants_dispatch_alike() {
        let session = session_with(Some(&["Run"]), None);
        let dispatcher = Dispatcher::default();
        let expected = dispatcher.resolve(&session, "run");
        assert!(expected.is_some());
        for input in ["Run", " run ", "RUN", "run"] {
            assert_eq!(dispatcher.resolve(&session, input), expected, "input {input:?}");
        }
    }

    // ── not found ──

    #[test]
    fn test_missing_clip_is_not_found_and_changes_nothing() {
        let mut session = session_with(Some(&["run"]), Some(&["wave"]));
        let before = playback_state(&session);
        let outcome = Dispatcher::default().dispatch(&mut session, "Dance");
        assert_eq!(
            outcome,
            DispatchOutcome::NotFound {
                command: "dance".into()
            }
        );
        assert_eq!(playback_state(&session), before);
    }

    #[test]
    fn test_nothing_loaded_is_not_found_for_every_input() {
        let mut session = Session::new();
        let dispatcher = Dispatcher::default();
        for input in ["run", "", "  ", "JUMP"] {
            assert!(!dispatcher.dispatch(&mut session, input).is_played());
        }
    }

    #[test]
    fn test_failed_model_behaves_like_missing() {
        let mut session = session_with(None, Some(&["wave"]));
        session.mark_failed(ModelId::Primary, "HTTP 404");
        let dispatcher = Dispatcher::default();
        assert!(dispatcher.dispatch(&mut session, "wave").is_played());
        assert!(!dispatcher.dispatch(&mut session, "run").is_played());
    }

    #[test]
    fn test_registered_clip_without_action_is_not_played() {
        let mut gpu = FakeUploader::default();
        let mut model = ModelInstance::instantiate(
            ModelId::Primary,
            asset_with_clips(&["run"]),
            &ModelPlacement::default(),
            &mut gpu,
        );
        model.mixer = AnimationMixer::default();
        let mut session = Session::new();
        session.install(ModelId::Primary, model);

        assert!(Dispatcher::default().resolve(&session, "run").is_some());
        let outcome = Dispatcher::default().dispatch(&mut session, "run");
        assert_eq!(outcome, DispatchOutcome::NotFound { command: "run".into() });
        assert!(!outcome.is_played());
    }

    // ── restart ──

    #[test]
    fn test_same_clip_twice_restarts_from_zero() {
        let mut session = session_with(Some(&["lift"]), None);
        let dispatcher = Dispatcher::default();

        let DispatchOutcome::Played(clip) = dispatcher.dispatch(&mut session, "lift") else {
            panic!("lift should play");
        };
        assert_eq!(action_time(&session, &clip), 0.0);
        session.update(0.4);
        assert!((action_time(&session, &clip) - 0.4).abs() < 1e-6);

        assert!(dispatcher.dispatch(&mut session, "LIFT").is_played());
        assert_eq!(action_time(&session, &clip), 0.0);
        session.update(0.1);
        assert!((action_time(&session, &clip) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_restart_after_clip_finished() {
        let mut session = session_with(Some(&["lift"]), None);
        let dispatcher = Dispatcher::default();
        dispatcher.dispatch(&mut session, "lift");
        session.update(5.0);

        let model = session.slot(ModelId::Primary).model().unwrap();
        // Clamped on the last frame
        assert!(model.mixer.action(0).unwrap().is_finished());
        assert!((model.nodes[0].local.translation.y - 1.0).abs() < 1e-6);

        dispatcher.dispatch(&mut session, "lift");
        let model = session.slot(ModelId::Primary).model().unwrap();
        assert!(!model.mixer.action(0).unwrap().is_finished());
        assert_eq!(model.mixer.action(0).unwrap().time, 0.0);
    }

    // ── command line ──

    #[test]
    fn test_submit_clears_input_on_success_and_failure() {
        let mut session = session_with(Some(&["run"]), None);
        let mut line = CommandLine::default();

        line.set_value(" Run ");
        assert!(line.submit(&mut session).is_played());
        assert_eq!(line.value(), "");

        line.set_value("nope");
        assert!(!line.submit(&mut session).is_played());
        assert_eq!(line.value(), "");
    }

    #[test]
    fn test_only_enter_submits() {
        let mut session = session_with(Some(&["run"]), None);
        let mut line = CommandLine::default();
        line.set_value("run");

        assert!(line.handle_key("r", &mut session).is_none());
        assert!(line.handle_key("Shift", &mut session).is_none());
        assert_eq!(line.value(), "run");

        let outcome = line.handle_key("Enter", &mut session);
        assert!(matches!(outcome, Some(DispatchOutcome::Played(_))));
        assert_eq!(line.value(), "");
    }
}
