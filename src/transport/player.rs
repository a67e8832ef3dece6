use crossbeam::channel::Receiver;

use super::clock::Clock;
use crate::settings::events::Subscribers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    PlayState(bool),
    /// `seek_value` is the position in percent of the whole file
    Position { position_sec: f64, seek_value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing; nothing was broadcast
    Idle,
    Continue,
    /// Ran past the end, stopped and rewound
    Ended,
}

/// Playback position bookkeeping for one loaded file.
///
/// Audio output itself belongs to the host; this tracks where playback is
/// from a clock anchor and tells subscribers about it.
pub struct PlayerService<C: Clock> {
    clock: C,
    duration: f64,
    state: PlaybackState,
    offset: f64,
    anchor: f64,
    seek_value: f64,
    volume: f64,
    seek_to_play: bool,
    subscribers: Subscribers<TransportEvent>,
}

impl<C: Clock> PlayerService<C> {
    pub fn new(clock: C, duration: f64) -> Self {
        Self {
            clock,
            duration,
            state: PlaybackState::Stopped,
            offset: 0.0,
            anchor: 0.0,
            seek_value: 0.0,
            volume: 1.0,
            seek_to_play: false,
            subscribers: Subscribers::default(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<TransportEvent> {
        self.subscribers.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Current position in seconds.
    pub fn position(&self) -> f64 {
        match self.state {
            PlaybackState::Playing => self.offset + (self.clock.now() - self.anchor),
            PlaybackState::Stopped => self.offset,
        }
    }

    pub fn seek_value(&self) -> f64 {
        self.seek_value
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Values outside `[0, 1]` are ignored.
    pub fn set_volume(&mut self, volume: f64) {
        if volume.is_finite() && (0.0..=1.0).contains(&volume) {
            self.volume = volume;
        } else {
            log::debug!("Ignoring volume {}", volume);
        }
    }

    pub fn seek_to_play(&self) -> bool {
        self.seek_to_play
    }

    /// Start playback after any seek, not only while already playing.
    pub fn set_seek_to_play(&mut self, enabled: bool) {
        self.seek_to_play = enabled;
    }

    pub fn play(&mut self) {
        if self.is_playing() {
            return;
        }
        self.anchor = self.clock.now();
        self.state = PlaybackState::Playing;
        log::debug!("Play from {:.3}s", self.offset);
        self.subscribers.publish(TransportEvent::PlayState(true));
    }

    pub fn pause(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.offset += self.clock.now() - self.anchor;
        self.state = PlaybackState::Stopped;
        log::debug!("Paused at {:.3}s", self.offset);
        self.subscribers.publish(TransportEvent::PlayState(false));
    }

    /// Advance and broadcast the position. Call once per display frame.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_playing() {
            return TickOutcome::Idle;
        }
        let current = self.position();
        self.seek_value = if self.duration > 0.0 {
            100.0 * current / self.duration
        } else {
            0.0
        };
        self.publish_position(current);

        if current > self.duration {
            self.pause();
            self.offset = 0.0;
            self.seek_value = 0.0;
            return TickOutcome::Ended;
        }
        TickOutcome::Continue
    }

    /// Jump to `value` percent of the file. Playback resumes if it was
    /// running or seek-to-play is on.
    pub fn on_seek_input(&mut self, value: f64) {
        let resume = self.is_playing();
        if resume {
            self.pause();
        }

        let value = if value.is_finite() { value } else { 0.0 };
        self.offset = value * self.duration / 100.0;
        self.seek_value = value;
        self.publish_position(self.offset);

        if resume || self.seek_to_play {
            self.play();
        }
    }

    fn publish_position(&mut self, position_sec: f64) {
        self.subscribers.publish(TransportEvent::Position {
            position_sec,
            seek_value: self.seek_value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ManualClock;

    fn player(duration: f64) -> (PlayerService<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (PlayerService::new(clock.clone(), duration), clock)
    }

    #[test]
    fn tick_tracks_elapsed_time() {
        let (mut p, clock) = player(10.0);
        let events = p.subscribe();
        p.play();
        clock.advance(2.5);
        assert_eq!(p.tick(), TickOutcome::Continue);
        assert!((p.position() - 2.5).abs() < 1e-9);
        assert!((p.seek_value() - 25.0).abs() < 1e-9);

        assert_eq!(events.try_recv().unwrap(), TransportEvent::PlayState(true));
        match events.try_recv().unwrap() {
            TransportEvent::Position { position_sec, seek_value } => {
                assert!((position_sec - 2.5).abs() < 1e-9);
                assert!((seek_value - 25.0).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn pause_pins_position() {
        let (mut p, clock) = player(10.0);
        p.play();
        clock.advance(1.0);
        p.pause();
        clock.advance(5.0);
        assert!((p.position() - 1.0).abs() < 1e-9);
        assert_eq!(p.tick(), TickOutcome::Idle);

        p.play();
        clock.advance(0.5);
        assert!((p.position() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn running_past_the_end_stops_and_rewinds() {
        let (mut p, clock) = player(3.0);
        p.play();
        clock.advance(3.2);
        assert_eq!(p.tick(), TickOutcome::Ended);
        assert!(!p.is_playing());
        assert_eq!(p.position(), 0.0);
        assert_eq!(p.seek_value(), 0.0);
    }

    #[test]
    fn seek_while_playing_resumes_from_new_spot() {
        let (mut p, clock) = player(10.0);
        p.play();
        clock.advance(1.0);
        p.on_seek_input(50.0);
        assert!(p.is_playing());
        clock.advance(1.0);
        assert!((p.position() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn seek_while_stopped_honours_seek_to_play() {
        let (mut p, _clock) = player(10.0);
        let events = p.subscribe();
        p.on_seek_input(20.0);
        assert!(!p.is_playing());
        assert!((p.position() - 2.0).abs() < 1e-9);
        assert!(matches!(events.try_recv().unwrap(), TransportEvent::Position { .. }));

        p.set_seek_to_play(true);
        p.on_seek_input(30.0);
        assert!(p.is_playing());
    }

    #[test]
    fn volume_rejects_out_of_range() {
        let (mut p, _clock) = player(1.0);
        p.set_volume(0.4);
        p.set_volume(1.5);
        p.set_volume(f64::NAN);
        p.set_volume(-0.1);
        assert_eq!(p.volume(), 0.4);
    }
}
