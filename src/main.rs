use clap::Parser;
use clicktrackrs::{
    cli::{validate_output, Args},
    config::AppConfig,
    create_shared_settings,
    input::{map_command, Command, HELP},
    logging,
    settings::SettingsStore,
    sound::{list_output_ports, MidiClickOutput},
    spawn_engine,
    tempo::{preset_for_bpm, TapTempo},
    ui::run_beat_display,
    BeatScheduler, ChannelObserver, EngineError, MetronomeHandle, MonotonicClock, Settings,
    SharedSettings, SilentOutput, SoundOutput, TimeSource, TransportClock,
};
use crossbeam::channel::unbounded;
use dialoguer::{theme::ColorfulTheme, Select};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::PoisonError;
use std::{thread, time::Duration};

fn main() {
    let args = parse_command_line_arguments();
    let config = load_config(&args);
    initialize_logging(&config);

    if args.list_outputs {
        list_available_outputs();
        return;
    }

    let store = settings_store(&config);
    let mut settings = load_settings(&store, &config);
    if let Err(error_msg) = args.apply_to(&mut settings) {
        exit_with_error(&error_msg);
    }
    if args.tap {
        if let Some(bpm) = run_tap_tempo() {
            settings.set_bpm(bpm);
        }
    }

    let sound = choose_sound_output(&args);
    let shared_settings = create_shared_settings(settings);
    run_metronome(&args, &config, sound, shared_settings.clone());

    if !args.no_save {
        save_settings(&store, &shared_settings);
    }
    log::info!("Application finished");
}

fn parse_command_line_arguments() -> Args {
    Args::parse()
}

fn load_config(args: &Args) -> AppConfig {
    match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with_error(&format!("Error loading configuration: {}", e)),
    }
}

fn initialize_logging(config: &AppConfig) {
    if let Err(e) = logging::init_logger(config.level_filter()) {
        eprintln!("Logging disabled: {}", e);
    }
    log::info!("Application starting");
}

fn exit_with_error(error_msg: &str) -> ! {
    log::error!("{}", error_msg);
    eprintln!("{}", error_msg);
    std::process::exit(1);
}

fn available_outputs() -> Vec<String> {
    list_output_ports().unwrap_or_else(|e| {
        log::warn!("Could not list MIDI outputs: {}", e);
        Vec::new()
    })
}

fn list_available_outputs() {
    println!("Available MIDI outputs:");
    for output in available_outputs() {
        println!("  - {}", output);
    }
}

fn settings_store(config: &AppConfig) -> Option<SettingsStore> {
    let path: Option<PathBuf> = config
        .settings_path
        .clone()
        .or_else(|| SettingsStore::default_path().ok());
    path.map(SettingsStore::new)
}

fn load_settings(store: &Option<SettingsStore>, config: &AppConfig) -> Settings {
    let saved = store.as_ref().and_then(|store| match store.load() {
        Ok(saved) => saved,
        Err(e) => {
            log::warn!("Ignoring saved settings: {}", e);
            None
        }
    });
    saved.unwrap_or_else(|| config.defaults.clone())
}

fn save_settings(store: &Option<SettingsStore>, settings: &SharedSettings) {
    let Some(store) = store else {
        return;
    };
    let settings = settings
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    if let Err(e) = store.save(&settings) {
        log::warn!("Could not save settings: {}", e);
        eprintln!("Could not save settings: {}", e);
    }
}

fn run_tap_tempo() -> Option<f64> {
    let clock = MonotonicClock::new();
    let mut tap = TapTempo::default();
    println!("Tap Enter in time, then type 'd' and Enter when done");

    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        if line.trim() == "d" {
            break;
        }
        if let Some(bpm) = tap.tap(clock.now()) {
            match preset_for_bpm(bpm) {
                Some(preset) => println!("{} BPM ({})", bpm, preset.name),
                None => println!("{} BPM", bpm),
            }
        }
    }

    let bpm = tap.bpm();
    log::info!("Tap tempo finished with {:?} BPM", bpm);
    bpm
}

fn choose_sound_output(args: &Args) -> Box<dyn SoundOutput> {
    if args.silent {
        log::info!("Running silent");
        return Box::new(SilentOutput);
    }

    let outputs = available_outputs();
    if args.pick_output {
        return match pick_output(&outputs) {
            Some(name) => Box::new(MidiClickOutput::new(Some(name))),
            None => exit_with_error("No MIDI output selected"),
        };
    }

    if let Some(output_name) = &args.midi_output {
        if let Err(error_msg) = validate_output(output_name, &outputs) {
            exit_with_error(&error_msg);
        }
        return Box::new(MidiClickOutput::new(Some(output_name.clone())));
    }

    if outputs.is_empty() {
        log::warn!("No MIDI outputs found, running silent");
        println!("No MIDI outputs found, running silent");
        Box::new(SilentOutput)
    } else {
        Box::new(MidiClickOutput::new(None))
    }
}

fn pick_output(outputs: &[String]) -> Option<String> {
    if outputs.is_empty() {
        return None;
    }
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select a MIDI output")
        .items(outputs)
        .default(0)
        .interact_opt()
        .unwrap_or_else(|e| {
            log::error!("Output selection failed: {}", e);
            None
        })?;
    outputs.get(selection).cloned()
}

fn run_metronome(
    args: &Args,
    config: &AppConfig,
    sound: Box<dyn SoundOutput>,
    settings: SharedSettings,
) {
    let (event_tx, event_rx) = unbounded();
    let scheduler = BeatScheduler::new(
        TransportClock::monotonic(),
        settings.clone(),
        sound,
        ChannelObserver::new(event_tx),
    )
    .with_config(config.scheduler.scheduler_config());

    let (handle, engine_thread) = spawn_engine(scheduler);
    let display_settings = settings.clone();
    let display_thread = thread::spawn(move || run_beat_display(display_settings, event_rx));

    match handle.start() {
        Ok(()) => {}
        Err(EngineError::Start(e)) => {
            log::error!("{}", e);
            eprintln!("{}", e.user_message());
            let _ = handle.shutdown();
            let _ = engine_thread.join();
            let _ = display_thread.join();
            std::process::exit(1);
        }
        Err(e) => exit_with_error(&e.to_string()),
    }

    match args.duration {
        Some(secs) => thread::sleep(Duration::try_from_secs_f64(secs).unwrap_or_default()),
        None => run_command_loop(&handle),
    }

    let _ = handle.shutdown();
    if engine_thread.join().is_err() {
        log::error!("Engine thread panicked");
    }
    if display_thread.join().is_err() {
        log::error!("Display thread panicked");
    }
}

fn run_command_loop(handle: &MetronomeHandle) {
    log::info!("Application running, reading commands from stdin");
    println!("{}", HELP);
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        match map_command(&line) {
            Some(Command::Quit) => break,
            Some(Command::Engine(message)) => {
                if let Err(e) = handle.dispatch(message) {
                    log::error!("{}", e);
                    break;
                }
            }
            None => println!("{}", HELP),
        }
    }
}
