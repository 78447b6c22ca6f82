use crate::domain::Slot;
use crate::wizard::controller::WizardState;

/// What the wizard tells the UI.
#[derive(Clone, Debug, PartialEq)]
pub enum WizardEvent {
    StateChanged(WizardState),
    /// Inline, per-slot validation message.
    SlotRejected { slot: Slot, reason: String },
    SlotAccepted { slot: Slot, name: String },
    Notice(String),
}

/// Whatever renders the wizard: a page, a terminal, a test recorder.
pub trait UiSurface {
    fn report(&mut self, event: WizardEvent);
}

/// Forwards every event to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSurface;

impl UiSurface for TracingSurface {
    fn report(&mut self, event: WizardEvent) {
        match event {
            WizardEvent::StateChanged(WizardState::Error(failure)) => {
                tracing::warn!(stage = ?failure.stage, "{}", failure.message)
            }
            WizardEvent::StateChanged(state) => tracing::info!(?state, "wizard state"),
            WizardEvent::SlotRejected { slot, reason } => tracing::warn!(%slot, "{reason}"),
            WizardEvent::SlotAccepted { slot, name } => tracing::info!(%slot, %name, "accepted"),
            WizardEvent::Notice(msg) => tracing::info!("{msg}"),
        }
    }
}

/// Keeps every event; handy when a caller wants to inspect the history.
impl UiSurface for Vec<WizardEvent> {
    fn report(&mut self, event: WizardEvent) {
        self.push(event);
    }
}
