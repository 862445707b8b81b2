#[cfg(test)]
mod tests {
    use clicktrackrs::error::PLAYBACK_FAILED;
    use clicktrackrs::sound::{MockSoundOutput, SoundCall, SoundId};
    use clicktrackrs::{
        create_shared_settings, BeatEvent, BeatScheduler, ChannelObserver, Emphasis, ManualClock,
        MeterSpec, MetronomeEvent, Playback, SchedulerConfig, Settings, SharedSettings,
        StartError, TempoChange, TransportClock,
    };
    use crossbeam::channel::{unbounded, Receiver};

    struct Rig {
        clock: ManualClock,
        settings: SharedSettings,
        sound: MockSoundOutput,
        events: Receiver<MetronomeEvent>,
        scheduler: BeatScheduler,
    }

    fn rig_with(settings: Settings, sound: MockSoundOutput, config: SchedulerConfig) -> Rig {
        let clock = ManualClock::new(0.0);
        let settings = create_shared_settings(settings);
        let (tx, events) = unbounded();
        let scheduler = BeatScheduler::new(
            TransportClock::new(clock.clone()),
            settings.clone(),
            sound.clone(),
            ChannelObserver::new(tx),
        )
        .with_config(config);
        Rig {
            clock,
            settings,
            sound,
            events,
            scheduler,
        }
    }

    fn rig(settings: Settings) -> Rig {
        rig_with(settings, MockSoundOutput::new(), SchedulerConfig::default())
    }

    fn in_place() -> SchedulerConfig {
        SchedulerConfig {
            tempo_change: TempoChange::InPlace,
            ..SchedulerConfig::default()
        }
    }

    /// Steps the clock from wake-up to wake-up, the way the engine thread
    /// does, then lands exactly on `until`.
    fn run_until(rig: &mut Rig, until: f64) {
        while let Some(wake) = rig.scheduler.service() {
            if wake > until {
                break;
            }
            rig.clock.set(wake);
        }
        rig.clock.set(until);
        rig.scheduler.service();
    }

    fn drain(rig: &Rig) -> Vec<MetronomeEvent> {
        rig.events.try_iter().collect()
    }

    fn beats_of(events: &[MetronomeEvent]) -> Vec<BeatEvent> {
        events
            .iter()
            .filter_map(|event| match event {
                MetronomeEvent::Beat(beat) => Some(*beat),
                _ => None,
            })
            .collect()
    }

    fn assert_times(beats: &[BeatEvent], expected: &[f64]) {
        let actual: Vec<f64> = beats.iter().map(|b| b.due_time).collect();
        assert_eq!(actual.len(), expected.len(), "due times {:?}", actual);
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "due times {:?}, expected {:?}", actual, expected);
        }
    }

    #[test]
    fn test_ten_seconds_at_120_bpm_plays_twenty_beats_in_order() {
        let mut rig = rig(Settings::new());
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 9.999);
        rig.scheduler.stop();

        let beats = beats_of(&drain(&rig));
        assert_eq!(beats.len(), 20);
        let positions: Vec<u32> = beats.iter().map(|b| b.beat).collect();
        assert_eq!(positions, [1, 2, 3, 4].repeat(5));
        let bars: Vec<u32> = beats.iter().map(|b| b.bar).collect();
        assert!(bars.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(bars.last(), Some(&5));
        for (i, beat) in beats.iter().enumerate() {
            assert_eq!(beat.due_time, i as f64 * 0.5);
        }
        assert_eq!(rig.sound.played().len(), 20);
    }

    #[test]
    fn test_four_four_emphasis() {
        let mut rig = rig(Settings::new());
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 1.9);

        let beats = beats_of(&drain(&rig));
        let pattern: Vec<(u32, Emphasis, bool)> =
            beats.iter().map(|b| (b.beat, b.emphasis, b.accent)).collect();
        assert_eq!(
            pattern,
            vec![
                (1, Emphasis::Strong, true),
                (2, Emphasis::Weak, false),
                (3, Emphasis::Strong, true),
                (4, Emphasis::Weak, false),
            ]
        );
        let played: Vec<Emphasis> = rig.sound.played().iter().map(|p| p.1).collect();
        assert_eq!(
            played,
            vec![Emphasis::Strong, Emphasis::Weak, Emphasis::Strong, Emphasis::Weak]
        );
    }

    #[test]
    fn test_accent_override_replaces_derived_pattern() {
        let mut settings = Settings::new();
        settings.set_accent_beats(vec![2]);
        let mut rig = rig(settings);
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 1.9);

        let accents: Vec<bool> = beats_of(&drain(&rig)).iter().map(|b| b.accent).collect();
        assert_eq!(accents, vec![true, true, false, false]);
    }

    #[test]
    fn test_pause_and_resume_shift_the_grid_by_the_pause() {
        let mut rig = rig(Settings::new());
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 1.45);
        assert_eq!(rig.scheduler.pending_beats(), 1);

        rig.scheduler.pause();
        assert_eq!(rig.scheduler.playback(), Playback::Paused);
        rig.clock.set(2.5);
        assert_eq!(rig.scheduler.service(), None);

        rig.clock.set(3.45);
        rig.scheduler.resume();
        run_until(&mut rig, 3.6);

        let events = drain(&rig);
        let beats = beats_of(&events);
        assert_times(&beats, &[0.0, 0.5, 1.0, 3.5]);
        let positions: Vec<u32> = beats.iter().map(|b| b.beat).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);
        assert_eq!(beats[3].bar, 1);

        let transitions: Vec<&MetronomeEvent> = events
            .iter()
            .filter(|e| !matches!(e, MetronomeEvent::Beat(_)))
            .collect();
        assert_eq!(
            transitions,
            vec![
                &MetronomeEvent::Started,
                &MetronomeEvent::Paused,
                &MetronomeEvent::Resumed
            ]
        );
        assert!((rig.scheduler.state().paused_elapsed_correction - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_double_stop_reports_one_stop() {
        let mut rig = rig(Settings::new());
        rig.scheduler.start().unwrap();
        rig.scheduler.service();
        rig.scheduler.stop();
        rig.scheduler.stop();

        let events = drain(&rig);
        let stops = events
            .iter()
            .filter(|e| **e == MetronomeEvent::Stopped)
            .count();
        assert_eq!(stops, 1);
        assert_eq!(rig.scheduler.playback(), Playback::Idle);
    }

    #[test]
    fn test_stop_from_paused_reports_stop() {
        let mut rig = rig(Settings::new());
        rig.scheduler.start().unwrap();
        rig.scheduler.pause();
        rig.scheduler.stop();

        let events = drain(&rig);
        assert_eq!(events.last(), Some(&MetronomeEvent::Stopped));
        assert!(rig.scheduler.state().is_idle());
    }

    #[test]
    fn test_stop_cancels_pending_beats() {
        let mut rig = rig(Settings::new());
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 1.45);
        assert_eq!(rig.scheduler.pending_beats(), 1);

        rig.scheduler.stop();
        assert_eq!(rig.scheduler.pending_beats(), 0);
        rig.clock.set(2.0);
        assert_eq!(rig.scheduler.service(), None);

        assert_eq!(beats_of(&drain(&rig)).len(), 3);
        assert_eq!(rig.sound.played().len(), 3);
    }

    #[test]
    fn test_restart_while_running_keeps_a_single_grid() {
        let mut rig = rig(Settings::new());
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 1.2);
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 2.3);

        let events = drain(&rig);
        let restart = events
            .iter()
            .position(|e| *e == MetronomeEvent::Stopped)
            .unwrap();
        assert_eq!(events[restart + 1], MetronomeEvent::Started);
        assert_eq!(
            events
                .iter()
                .filter(|e| **e == MetronomeEvent::Started)
                .count(),
            2
        );

        let after = beats_of(&events[restart..]);
        assert_times(&after, &[1.2, 1.7, 2.2]);
        let positions: Vec<u32> = after.iter().map(|b| b.beat).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn test_count_in_precedes_first_bar() {
        let mut settings = Settings::new();
        settings.set_meter(MeterSpec::THREE_FOUR);
        settings.set_count_in(true);
        settings.set_count_in_bars(2);
        let mut rig = rig(settings);
        rig.scheduler.start().unwrap();
        assert!(rig.scheduler.state().counting_in());
        run_until(&mut rig, 3.2);

        let beats = beats_of(&drain(&rig));
        assert_eq!(beats.len(), 7);
        let count_in: Vec<(u32, u32, bool)> =
            beats.iter().map(|b| (b.beat, b.bar, b.count_in)).collect();
        assert_eq!(
            count_in,
            vec![
                (1, 1, true),
                (2, 1, true),
                (3, 1, true),
                (1, 2, true),
                (2, 2, true),
                (3, 2, true),
                (1, 1, false),
            ]
        );
        assert!(!rig.scheduler.state().counting_in());
    }

    #[test]
    fn test_count_in_update_applies_on_next_start() {
        let mut rig = rig(Settings::new());
        rig.scheduler.start().unwrap();
        rig.scheduler.update_count_in(true, 1);
        assert!(!rig.scheduler.state().counting_in());

        rig.scheduler.start().unwrap();
        run_until(&mut rig, 2.1);
        let beats = beats_of(&drain(&rig));
        let flags: Vec<bool> = beats.iter().map(|b| b.count_in).collect();
        assert_eq!(flags, vec![true, true, true, true, false]);
    }

    #[test]
    fn test_sound_change_while_running_loads_the_new_set() {
        let mut rig = rig(Settings::new());
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 0.2);
        rig.scheduler.update_sound(SoundId::Bell);
        rig.scheduler.update_volume(1.5);
        run_until(&mut rig, 0.6);

        let calls = rig.sound.calls();
        assert!(calls.contains(&SoundCall::Load(SoundId::Bell)));
        assert!(calls.contains(&SoundCall::SetVolume(1.0)));
        assert_eq!(rig.sound.played().last(), Some(&(SoundId::Bell, Emphasis::Weak, 1.0)));
    }

    #[test]
    fn test_latency_compensation_moves_the_grid_earlier() {
        let mut settings = Settings::new();
        settings.set_latency_compensation_ms(50.0);
        let mut rig = rig(settings);
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 0.6);

        assert_times(&beats_of(&drain(&rig)), &[-0.05, 0.45]);
    }

    #[test]
    fn test_large_latency_cannot_burst_beats_on_start() {
        let mut settings = Settings::new();
        settings.set_bpm(300.0);
        settings.set_latency_compensation_ms(5_000.0);
        assert_eq!(settings.latency_compensation_ms(), 100.0);

        let mut rig = rig(settings);
        rig.clock.set(100.0);
        rig.scheduler.start().unwrap();
        rig.scheduler.service();

        assert_eq!(rig.scheduler.state().beats_fired, 1);
        assert_eq!(rig.sound.played().len(), 1);
    }

    #[test]
    fn test_meter_change_while_paused_keeps_count_in_length() {
        let mut settings = Settings::new();
        settings.set_count_in(true);
        settings.set_count_in_bars(1);
        let mut rig = rig(settings);
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 0.7);
        rig.scheduler.pause();

        rig.scheduler.update_meter(MeterSpec::TWO_FOUR).unwrap();
        assert_eq!(rig.scheduler.playback(), Playback::Paused);
        rig.clock.set(1.7);
        rig.scheduler.resume();
        run_until(&mut rig, 3.1);

        let events = drain(&rig);
        assert!(!events.contains(&MetronomeEvent::Stopped));
        let beats = beats_of(&events);
        let positions: Vec<(u32, u32, bool)> =
            beats.iter().map(|b| (b.beat, b.bar, b.count_in)).collect();
        assert_eq!(
            positions,
            vec![
                (1, 1, true),
                (2, 1, true),
                (1, 1, true),
                (2, 1, true),
                (1, 1, false),
            ]
        );
        assert_times(&beats, &[0.0, 0.5, 2.0, 2.5, 3.0]);
        assert!(beats[2..].iter().all(|b| b.meter == MeterSpec::TWO_FOUR));
    }

    #[test]
    fn test_tempo_change_while_paused_regrids_from_last_beat() {
        let mut rig = rig(Settings::new());
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 1.2);
        rig.scheduler.pause();

        rig.scheduler.update_tempo(60.0).unwrap();
        assert_eq!(rig.scheduler.playback(), Playback::Paused);
        rig.clock.set(3.2);
        rig.scheduler.resume();
        run_until(&mut rig, 4.1);

        let events = drain(&rig);
        assert!(!events.contains(&MetronomeEvent::Stopped));
        let beats = beats_of(&events);
        // last beat at 1.0, one 60 BPM period, then the 2 s pause
        assert_times(&beats, &[0.0, 0.5, 1.0, 4.0]);
        let positions: Vec<u32> = beats.iter().map(|b| b.beat).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_sound_failure_does_not_stop_the_grid() {
        let mut rig = rig_with(
            Settings::new(),
            MockSoundOutput::new().failing_playback(),
            SchedulerConfig::default(),
        );
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 1.9);

        assert_eq!(beats_of(&drain(&rig)).len(), 4);
        assert!(rig.scheduler.is_playing());
    }

    #[test]
    fn test_start_failure_leaves_scheduler_idle() {
        let mut rig = rig_with(
            Settings::new(),
            MockSoundOutput::new().failing_initialize(),
            SchedulerConfig::default(),
        );

        let err = rig.scheduler.start().unwrap_err();
        assert!(matches!(err, StartError::AudioSession(_)));
        assert_eq!(err.user_message(), PLAYBACK_FAILED);
        assert_eq!(rig.scheduler.playback(), Playback::Idle);
        assert_eq!(rig.scheduler.service(), None);
        assert!(drain(&rig).is_empty());
    }

    #[test]
    fn test_toggle_cycles_through_transport_states() {
        let mut rig = rig(Settings::new());
        rig.scheduler.toggle().unwrap();
        assert_eq!(rig.scheduler.playback(), Playback::Running);
        rig.scheduler.toggle().unwrap();
        assert_eq!(rig.scheduler.playback(), Playback::Paused);
        rig.scheduler.toggle().unwrap();
        assert_eq!(rig.scheduler.playback(), Playback::Running);
    }

    #[test]
    fn test_in_place_tempo_change_continues_from_last_beat() {
        let mut rig = rig_with(Settings::new(), MockSoundOutput::new(), in_place());
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 1.2);
        rig.scheduler.update_tempo(60.0).unwrap();
        run_until(&mut rig, 3.1);

        let events = drain(&rig);
        assert!(!events.contains(&MetronomeEvent::Stopped));
        let beats = beats_of(&events);
        assert_times(&beats, &[0.0, 0.5, 1.0, 2.0, 3.0]);
        let positions: Vec<u32> = beats.iter().map(|b| b.beat).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 1]);
    }

    #[test]
    fn test_in_place_tempo_change_drops_pending_beat() {
        let mut rig = rig_with(Settings::new(), MockSoundOutput::new(), in_place());
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 1.45);
        assert_eq!(rig.scheduler.pending_beats(), 1);

        rig.scheduler.update_tempo(60.0).unwrap();
        run_until(&mut rig, 2.1);

        assert_times(&beats_of(&drain(&rig)), &[0.0, 0.5, 1.0, 2.0]);
    }

    #[test]
    fn test_tempo_change_restarts_by_default() {
        let mut rig = rig(Settings::new());
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 1.2);
        rig.scheduler.update_tempo(60.0).unwrap();
        run_until(&mut rig, 2.3);

        let events = drain(&rig);
        let restart = events
            .iter()
            .position(|e| *e == MetronomeEvent::Stopped)
            .unwrap();
        let after = beats_of(&events[restart..]);
        assert_times(&after, &[1.2, 2.2]);
        assert_eq!(after[0].beat, 1);
        assert_eq!(rig.settings.lock().unwrap().bpm(), 60.0);
    }

    #[test]
    fn test_tempo_is_clamped() {
        let mut rig = rig(Settings::new());
        rig.scheduler.update_tempo(1000.0).unwrap();
        assert_eq!(rig.settings.lock().unwrap().bpm(), 300.0);
        rig.scheduler.update_tempo(1.0).unwrap();
        assert_eq!(rig.settings.lock().unwrap().bpm(), 40.0);
    }

    #[test]
    fn test_meter_change_restarts_on_a_new_bar() {
        let mut rig = rig(Settings::new());
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 1.2);
        rig.scheduler.update_meter(MeterSpec::THREE_FOUR).unwrap();
        run_until(&mut rig, 2.8);

        let events = drain(&rig);
        let restart = events
            .iter()
            .position(|e| *e == MetronomeEvent::Stopped)
            .unwrap();
        let after = beats_of(&events[restart..]);
        let positions: Vec<(u32, u32)> = after.iter().map(|b| (b.beat, b.bar)).collect();
        assert_eq!(positions, vec![(1, 1), (2, 1), (3, 1), (1, 2)]);
        assert!(after.iter().all(|b| b.meter == MeterSpec::THREE_FOUR));
    }

    #[test]
    fn test_same_meter_does_not_restart() {
        let mut rig = rig(Settings::new());
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 0.7);
        rig.scheduler.update_meter(MeterSpec::FOUR_FOUR).unwrap();

        assert!(!drain(&rig).contains(&MetronomeEvent::Stopped));
    }

    #[test]
    fn test_volume_is_read_when_the_beat_fires() {
        let mut rig = rig(Settings::new());
        rig.scheduler.start().unwrap();
        run_until(&mut rig, 0.45);
        assert_eq!(rig.scheduler.pending_beats(), 1);

        rig.settings.lock().unwrap().set_volume(0.3);
        run_until(&mut rig, 0.55);

        let volumes: Vec<f32> = rig.sound.played().iter().map(|p| p.2).collect();
        assert_eq!(volumes, vec![0.7, 0.3]);
    }

    #[test]
    fn test_schedulers_are_independent() {
        let mut first = rig(Settings::new());
        let mut second = rig(Settings::new());
        first.scheduler.start().unwrap();
        run_until(&mut first, 0.6);
        run_until(&mut second, 0.6);

        assert_eq!(beats_of(&drain(&first)).len(), 2);
        assert!(drain(&second).is_empty());
    }
}
