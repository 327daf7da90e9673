use std::thread;

use clap::Parser;
use notefluxrs::{
    config::{validate_device, Args, Settings},
    dispatch::Dispatcher,
    event_loop::run_event_loop,
    logging,
    midi::{DefaultMidiEngine, MidiEngine, MidirEngine, MidirSink},
    pipeline::build_stages,
};

fn main() {
    initialize_logging();
    let args = Args::parse();

    if args.device_list {
        list_available_devices();
        return;
    }

    let input_name = match &args.bind_to_device {
        Some(name) => name.clone(),
        None => {
            eprintln!("Error: --bind-to-device is required (try --device-list)");
            std::process::exit(1);
        }
    };
    if let Err(error_msg) = validate_device(&input_name, &MidirEngine::list_input_devices()) {
        log::error!("{}", error_msg);
        eprintln!("{}", error_msg);
        std::process::exit(1);
    }

    let settings = match Settings::from_args(&args) {
        Ok(settings) => settings,
        Err(error_msg) => {
            log::error!("{}", error_msg);
            eprintln!("Error: {}", error_msg);
            std::process::exit(1);
        }
    };

    let mut dispatcher = Dispatcher::new(build_stages(&settings));
    connect_output(&mut dispatcher, args.midi_output.as_deref());

    let engine = match DefaultMidiEngine::new(&input_name) {
        Ok(engine) => {
            log::info!("Connected to MIDI input: {}", input_name);
            println!("Connected to MIDI input: {}", input_name);
            engine
        }
        Err(e) => {
            let error_msg = format!("Error connecting to MIDI input: {}", e);
            log::error!("{}", error_msg);
            eprintln!("{}", error_msg);
            std::process::exit(1);
        }
    };

    let rx = spawn_input_bridge(engine);
    log::info!("Engine running. Press Ctrl+C to exit...");
    println!("Listening. Press Ctrl+C to exit...");
    run_event_loop(&mut dispatcher, rx);
}

fn initialize_logging() {
    if let Err(e) = logging::init_logger() {
        eprintln!("Logger initialization failed: {}", e);
        std::process::exit(1);
    }
    log::info!("Application starting");
}

fn list_available_devices() {
    println!("Available MIDI inputs:");
    for device in MidirEngine::list_input_devices() {
        println!("  - {}", device);
    }
    println!("Available MIDI outputs:");
    for device in MidirEngine::list_output_devices() {
        println!("  - {}", device);
    }
}

/// Attaches the output destination if one was requested. A missing or
/// unreachable output is not fatal: the engine still decodes and tracks
/// state, it just has nowhere to send.
fn connect_output(dispatcher: &mut Dispatcher, output_name: Option<&str>) {
    let name = match output_name {
        Some(name) => name,
        None => {
            log::info!("No output device requested; running without destination");
            return;
        }
    };
    match MidirSink::new(name) {
        Ok(sink) => {
            log::info!("Connected to MIDI output: {}", name);
            println!("Connected to MIDI output: {}", name);
            dispatcher.select_destination(Box::new(sink));
        }
        Err(e) => {
            log::warn!("Could not connect output '{}': {}", name, e);
            eprintln!("Warning: could not connect output '{}': {}", name, e);
        }
    }
}

/// Moves the blocking device reads onto their own thread so the event loop
/// can multiplex input against scheduler deadlines.
fn spawn_input_bridge(mut engine: impl MidiEngine + 'static) -> crossbeam::channel::Receiver<Vec<u8>> {
    let (tx, rx) = crossbeam::channel::unbounded();
    thread::spawn(move || loop {
        match engine.recv() {
            Ok(bytes) => {
                if tx.send(bytes).is_err() {
                    break;
                }
            }
            Err(e) => {
                log::warn!("MIDI input ended: {}", e);
                break;
            }
        }
    });
    rx
}
