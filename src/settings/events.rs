use crossbeam::channel::{self, Receiver, Sender};

use super::FrequencyScale;

/// A committed settings change, carrying the value now in effect.
///
/// The value may differ from what the caller asked for when validation
/// substituted a default, so listeners can echo it back to their inputs.
#[derive(Clone, Debug, PartialEq)]
pub enum SettingsEvent {
    WindowSize(usize),
    /// Hop pinned or unpinned by the user
    HopSize(usize),
    /// Unpinned hop recomputed after the window size or visible time moved
    AutoHopSize(usize),
    MinFrequency(f64),
    MaxFrequency(f64),
    MinTime(f64),
    MaxTime(f64),
    MinAmplitude(f64),
    MaxAmplitude(f64),
    SpectrogramDbFloor(f64),
    FrequencyScale(FrequencyScale),
    MelFilterCount(usize),
    WaveformVisible(bool),
    WaveformVerticalScale(f64),
    SpectrogramVisible(bool),
    SpectrogramVerticalScale(f64),
}

/// How much of the rendered state a change invalidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeKind {
    /// Layout only: visibility, vertical scale
    Display,
    /// Visible window moved: figures are kept and refilled
    Window,
    /// Analysis shape changed: figures are rebuilt
    Destructive,
}

impl SettingsEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            SettingsEvent::WindowSize(_)
            | SettingsEvent::HopSize(_)
            | SettingsEvent::FrequencyScale(_)
            | SettingsEvent::MelFilterCount(_) => ChangeKind::Destructive,
            SettingsEvent::MinFrequency(_)
            | SettingsEvent::MaxFrequency(_)
            | SettingsEvent::MinTime(_)
            | SettingsEvent::MaxTime(_)
            | SettingsEvent::AutoHopSize(_)
            | SettingsEvent::MinAmplitude(_)
            | SettingsEvent::MaxAmplitude(_)
            | SettingsEvent::SpectrogramDbFloor(_) => ChangeKind::Window,
            SettingsEvent::WaveformVisible(_)
            | SettingsEvent::WaveformVerticalScale(_)
            | SettingsEvent::SpectrogramVisible(_)
            | SettingsEvent::SpectrogramVerticalScale(_) => ChangeKind::Display,
        }
    }

    /// Whether the change must invalidate in-flight analysis work.
    pub fn invalidates_analysis(&self) -> bool {
        self.kind() != ChangeKind::Display
    }
}

/// Fan-out of events to any number of subscribers.
pub struct Subscribers<E> {
    senders: Vec<Sender<E>>,
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self { senders: Vec::new() }
    }
}

impl<E: Clone> Subscribers<E> {
    pub fn subscribe(&mut self) -> Receiver<E> {
        let (tx, rx) = channel::unbounded();
        self.senders.push(tx);
        rx
    }

    /// Deliver to every live subscriber; dropped receivers are forgotten.
    pub fn publish(&mut self, event: E) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_changes() {
        assert_eq!(SettingsEvent::WindowSize(2048).kind(), ChangeKind::Destructive);
        assert_eq!(SettingsEvent::MinTime(1.0).kind(), ChangeKind::Window);
        assert_eq!(SettingsEvent::HopSize(512).kind(), ChangeKind::Destructive);
        assert_eq!(SettingsEvent::AutoHopSize(490).kind(), ChangeKind::Window);
        assert_eq!(SettingsEvent::WaveformVisible(false).kind(), ChangeKind::Display);
        assert!(!SettingsEvent::SpectrogramVerticalScale(1.5).invalidates_analysis());
        assert!(SettingsEvent::SpectrogramDbFloor(-60.0).invalidates_analysis());
    }

    #[test]
    fn publish_reaches_every_subscriber() {
        let mut subs = Subscribers::<SettingsEvent>::default();
        let a = subs.subscribe();
        let b = subs.subscribe();
        subs.publish(SettingsEvent::MelFilterCount(64));
        assert_eq!(a.try_recv().unwrap(), SettingsEvent::MelFilterCount(64));
        assert_eq!(b.try_recv().unwrap(), SettingsEvent::MelFilterCount(64));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut subs = Subscribers::<SettingsEvent>::default();
        let keep = subs.subscribe();
        drop(subs.subscribe());
        subs.publish(SettingsEvent::HopSize(512));
        assert_eq!(subs.len(), 1);
        assert!(keep.try_recv().is_ok());
    }
}
