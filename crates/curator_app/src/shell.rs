use std::io::BufRead;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;

use anyhow::Context;
use chrono::Local;
use curator_core::{update, AppState, JobKind, Msg};
use curator_engine::{
    default_document, default_kwargs, known_plugin, Clock, EngineConfig, EngineHandle,
    LoadOutcome, OptionStore, SourceSettings, KNOWN_PLUGINS,
};
use curator_logging::{curator_info, curator_warn};
use toml::Value;

use crate::effects::EffectRunner;
use crate::render::{self, Screen};

/// Everything the foreground loop reacts to: user input lines and messages
/// pumped back from the engine. The loop is the sole mutator of state.
pub(crate) enum ShellEvent {
    Line(String),
    Msg(Msg),
    Eof,
}

pub(crate) fn run() -> anyhow::Result<()> {
    let root = std::env::current_dir().context("resolve working directory")?;
    let options_path = root.join("options.toml");
    let download_dir = root.join("download");

    let (mut store, outcome) = OptionStore::open(options_path, default_document(&download_dir));
    match &outcome {
        LoadOutcome::Loaded => curator_info!("options loaded from {:?}", store.path()),
        LoadOutcome::DefaultedMissing => {
            curator_info!("no options file yet, defaults written to {:?}", store.path());
        }
        LoadOutcome::DefaultedCorrupt(cause) => {
            curator_warn!(
                "options file {:?} unusable ({}), continuing with defaults",
                store.path(),
                cause
            );
        }
    }

    let (tx, rx) = mpsc::channel::<ShellEvent>();
    let clock: Clock = Arc::new(|| Local::now().format("%H:%M:%S").to_string());

    let mut state = AppState::new();
    let mut screen = Screen::new();
    render::banner();

    let runner = match EngineHandle::new(EngineConfig::new(SourceSettings::from_env(), clock)) {
        Ok(handle) => Some(EffectRunner::new(handle, tx.clone())),
        Err(err) => {
            apply(
                &mut state,
                Msg::SourceUnavailable {
                    reason: err.to_string(),
                },
                None,
                &store,
                &mut screen,
            );
            None
        }
    };

    spawn_stdin_reader(tx.clone());

    while let Ok(event) = rx.recv() {
        match event {
            ShellEvent::Eof => break,
            ShellEvent::Msg(msg) => apply(&mut state, msg, runner.as_ref(), &store, &mut screen),
            ShellEvent::Line(line) => {
                let Some(command) = parse_command(&line) else {
                    continue;
                };
                match command {
                    Command::Quit => break,
                    Command::Help => render::help(),
                    Command::Parse(input) => {
                        submit(&mut state, input, JobKind::Parse, runner.as_ref(), &store, &mut screen)
                    }
                    Command::Download(input) => submit(
                        &mut state,
                        input,
                        JobKind::Download,
                        runner.as_ref(),
                        &store,
                        &mut screen,
                    ),
                    Command::Dir(path) => set_download_dir(&mut store, path),
                    Command::Plugins => list_plugins(&store),
                    Command::PluginOn(name) => enable_plugin(&mut store, &name),
                    Command::PluginOff(name) => disable_plugin(&mut store, &name),
                    Command::Show => show_options(&store),
                    Command::Save => save_options(&store),
                    Command::Unknown(word) => {
                        println!("unknown command {word:?}, type 'help' for commands");
                    }
                }
            }
        }
    }

    Ok(())
}

/// Runs one message through the pure update function, hands effects to the
/// runner, and re-renders when the view changed.
fn apply(
    state: &mut AppState,
    msg: Msg,
    runner: Option<&EffectRunner>,
    store: &OptionStore,
    screen: &mut Screen,
) {
    let (next, effects) = update(std::mem::take(state), msg);
    *state = next;

    if let Some(runner) = runner {
        runner.enqueue(effects, store);
    } else if !effects.is_empty() {
        // Unreachable while submission is disabled, but never drop silently.
        curator_warn!("dropping {} effect(s), engine offline", effects.len());
    }

    if state.consume_dirty() {
        screen.render(&state.view());
    }
}

fn submit(
    state: &mut AppState,
    input: String,
    kind: JobKind,
    runner: Option<&EffectRunner>,
    store: &OptionStore,
    screen: &mut Screen,
) {
    apply(state, Msg::InputChanged(input), runner, store, screen);
    apply(state, Msg::Submitted { kind }, runner, store, screen);
}

fn spawn_stdin_reader(tx: mpsc::Sender<ShellEvent>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(text) => {
                    if tx.send(ShellEvent::Line(text)).is_err() {
                        return;
                    }
                }
                Err(_) => break,
            }
        }
        let _ = tx.send(ShellEvent::Eof);
    });
}

// --- settings surface ---

fn set_download_dir(store: &mut OptionStore, path: String) {
    if path.is_empty() {
        println!("usage: dir <path>");
        return;
    }
    store.set("dir_rule.base_dir", Value::String(path));
    println!("download directory set (save to persist)");
}

fn list_plugins(store: &OptionStore) {
    for plugin in KNOWN_PLUGINS {
        let marker = if plugin_enabled(store, plugin.name) {
            "x"
        } else {
            " "
        };
        println!(
            "  [{marker}] {:<28} {} ({})",
            plugin.name,
            plugin.summary,
            plugin.stage.key()
        );
    }
}

fn plugin_enabled(store: &OptionStore, name: &str) -> bool {
    let Some(plugin) = known_plugin(name) else {
        return false;
    };
    store
        .get(&format!("plugins.{}", plugin.stage.key()))
        .and_then(Value::as_array)
        .is_some_and(|entries| entries.iter().any(|entry| entry_names(entry, name)))
}

fn entry_names(entry: &Value, name: &str) -> bool {
    entry
        .as_table()
        .and_then(|table| table.get("plugin"))
        .and_then(Value::as_str)
        == Some(name)
}

fn enable_plugin(store: &mut OptionStore, name: &str) {
    let Some(plugin) = known_plugin(name) else {
        println!("unknown plugin {name:?}, see 'plugins'");
        return;
    };
    let key = format!("plugins.{}", plugin.stage.key());
    let mut entries = store
        .get(&key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if entries.iter().any(|entry| entry_names(entry, name)) {
        println!("plugin {name} is already enabled");
        return;
    }

    let base_dir = store
        .get("dir_rule.base_dir")
        .and_then(Value::as_str)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("download"));
    let mut entry = toml::Table::new();
    entry.insert("plugin".to_string(), Value::String(name.to_string()));
    if let Some(kwargs) = default_kwargs(name, &base_dir) {
        entry.insert("kwargs".to_string(), Value::Table(kwargs));
    }
    entries.push(Value::Table(entry));
    store.set(&key, Value::Array(entries));
    println!("plugin {name} enabled (save to persist)");
}

fn disable_plugin(store: &mut OptionStore, name: &str) {
    let Some(plugin) = known_plugin(name) else {
        println!("unknown plugin {name:?}, see 'plugins'");
        return;
    };
    let key = format!("plugins.{}", plugin.stage.key());
    let entries = store
        .get(&key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let filtered: Vec<Value> = entries
        .iter()
        .filter(|entry| !entry_names(entry, name))
        .cloned()
        .collect();
    if filtered.len() == entries.len() {
        println!("plugin {name} is not enabled");
        return;
    }
    store.set(&key, Value::Array(filtered));
    println!("plugin {name} disabled (save to persist)");
}

fn show_options(store: &OptionStore) {
    match toml::to_string_pretty(store.document()) {
        Ok(text) => print!("{text}"),
        Err(err) => println!("could not render options: {err}"),
    }
}

fn save_options(store: &OptionStore) {
    // A failed save leaves the in-memory document untouched; the user can
    // fix the path and try again.
    match store.save() {
        Ok(()) => println!("settings saved to {:?}", store.path()),
        Err(err) => println!("could not save settings: {err}"),
    }
}

// --- command parsing ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Parse(String),
    Download(String),
    Dir(String),
    Plugins,
    PluginOn(String),
    PluginOff(String),
    Show,
    Save,
    Help,
    Quit,
    Unknown(String),
}

pub(crate) fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (trimmed, ""),
    };

    let command = match head {
        "parse" => Command::Parse(rest.to_string()),
        "download" | "dl" => Command::Download(rest.to_string()),
        "dir" => Command::Dir(rest.to_string()),
        "plugins" => Command::Plugins,
        "plugin" => match rest.split_once(char::is_whitespace) {
            Some(("on", name)) => Command::PluginOn(name.trim().to_string()),
            Some(("off", name)) => Command::PluginOff(name.trim().to_string()),
            _ => Command::Unknown(format!("plugin {rest}")),
        },
        "show" => Command::Show,
        "save" => Command::Save,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    };
    Some(command)
}
