//! Console command parsing and execution.

use anyhow::{anyhow, bail, Context, Result};
use c4amp_core::{AmpControl, AmplifierServices, GroupOutcome, LogicalInput, ZoneController};

/// Which zones a command applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    Zone(u8),
}

/// Per-output tone and balance settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Balance,
    Bass,
    Treble,
}

/// One console command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    On(Target),
    Off(Target),
    Volume(Target, f64),
    Mute(Target, bool),
    Source(Target, String),
    Adjust(Target, Setting, i32),
    Gain(LogicalInput, i32),
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands (TARGET is a zone number or 'all'):
  on TARGET                 power on, restoring the last input and volume
  off TARGET                power off
  volume TARGET LEVEL       set volume, 0.0 to 1.0
  mute TARGET | unmute TARGET
  source TARGET LABEL       select an input by its label
  balance TARGET VALUE      -10 to 10
  bass TARGET DB            -12 to 12
  treble TARGET DB          -12 to 12
  gain INPUT DB             input gain for logical input 1-6, -6 to 0
  status                    show every zone
  quit";

/// Parses one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "on" => Command::On(target(words.next())?),
        "off" => Command::Off(target(words.next())?),
        "mute" => Command::Mute(target(words.next())?, true),
        "unmute" => Command::Mute(target(words.next())?, false),
        "volume" | "vol" => {
            let target = target(words.next())?;
            let level = number::<f64>(words.next(), "volume level")?;
            Command::Volume(target, level)
        }
        "source" => {
            let target = target(words.next())?;
            let label = words.collect::<Vec<_>>().join(" ");
            if label.is_empty() {
                bail!("missing source label");
            }
            return Ok(Some(Command::Source(target, label)));
        }
        "balance" | "bass" | "treble" => {
            let setting = match verb.to_ascii_lowercase().as_str() {
                "balance" => Setting::Balance,
                "bass" => Setting::Bass,
                _ => Setting::Treble,
            };
            let target = target(words.next())?;
            let value = number::<i32>(words.next(), "level")?;
            Command::Adjust(target, setting, value)
        }
        "gain" => {
            let input = number::<u8>(words.next(), "input")?;
            let gain = number::<i32>(words.next(), "gain")?;
            Command::Gain(LogicalInput(input), gain)
        }
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command '{}', try 'help'", other),
    };

    if let Some(extra) = words.next() {
        bail!("unexpected argument '{}'", extra);
    }
    Ok(Some(command))
}

fn target(word: Option<&str>) -> Result<Target> {
    match word {
        None => bail!("missing zone (number or 'all')"),
        Some(w) if w.eq_ignore_ascii_case("all") => Ok(Target::All),
        Some(w) => w
            .parse()
            .map(Target::Zone)
            .with_context(|| format!("invalid zone '{}'", w)),
    }
}

fn number<T: std::str::FromStr>(word: Option<&str>, what: &str) -> Result<T> {
    let word = word.ok_or_else(|| anyhow!("missing {}", what))?;
    word.parse()
        .map_err(|_| anyhow!("invalid {} '{}'", what, word))
}

/// Whether the console keeps reading after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Runs a command against the amplifier and returns text for the user.
pub async fn execute(services: &AmplifierServices, command: Command) -> Result<(Flow, String)> {
    let zones = &services.zones;
    let text = match command {
        Command::On(Target::All) => outcome("on", zones.turn_on_all().await),
        Command::Off(Target::All) => outcome("off", zones.turn_off_all().await),
        Command::Volume(Target::All, level) => {
            outcome("volume", zones.set_volume_all(level).await)
        }
        Command::Mute(Target::All, mute) => outcome("mute", zones.mute_all(mute).await),
        Command::Source(Target::All, label) => {
            outcome("source", zones.select_source_all(&label).await?)
        }
        Command::On(Target::Zone(n)) => {
            let zone = zone(services, n)?;
            zone.turn_on().await?;
            describe(zone)
        }
        Command::Off(Target::Zone(n)) => {
            let zone = zone(services, n)?;
            zone.turn_off().await?;
            describe(zone)
        }
        Command::Volume(Target::Zone(n), level) => {
            let zone = zone(services, n)?;
            zone.set_volume(level).await?;
            describe(zone)
        }
        Command::Mute(Target::Zone(n), mute) => {
            let zone = zone(services, n)?;
            zone.mute(mute).await?;
            describe(zone)
        }
        Command::Source(Target::Zone(n), label) => {
            let zone = zone(services, n)?;
            zone.select_source(&label).await?;
            describe(zone)
        }
        Command::Adjust(target, setting, value) => {
            let outputs: Vec<u8> = match target {
                Target::All => zones.zones().iter().map(|z| z.output()).collect(),
                Target::Zone(n) => vec![zone(services, n)?.output()],
            };
            for output in &outputs {
                let client = &services.client;
                match setting {
                    Setting::Balance => client.set_balance(*output, value).await?,
                    Setting::Bass => client.set_bass(*output, value).await?,
                    Setting::Treble => client.set_treble(*output, value).await?,
                }
            }
            format!("{:?} {} sent to {} zone(s)", setting, value, outputs.len())
        }
        Command::Gain(input, gain) => {
            services.client.set_logical_input_gain(input, gain).await?;
            format!("input {} gain {} dB", input, gain)
        }
        Command::Status => status(services),
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok((Flow::Quit, String::from("bye"))),
    };
    Ok((Flow::Continue, text))
}

fn zone(services: &AmplifierServices, output: u8) -> Result<&ZoneController> {
    services
        .zone(output)
        .map(|zone| zone.as_ref())
        .ok_or_else(|| anyhow!("zone {} is not configured", output))
}

fn describe(zone: &ZoneController) -> String {
    format!(
        "[{}] {:<20} {:<3} volume {:>3}%{}  source: {}",
        zone.output(),
        zone.name(),
        if zone.is_on() { "on" } else { "off" },
        (zone.volume() * 100.0).round(),
        if zone.is_muted() { " (muted)" } else { "" },
        zone.source().as_deref().unwrap_or("-")
    )
}

fn status(services: &AmplifierServices) -> String {
    let mut lines: Vec<String> = services
        .zones
        .zones()
        .iter()
        .map(|zone| describe(zone))
        .collect();
    lines.push(format!("sources: {}", services.zones.source_list().join(", ")));
    lines.join("\n")
}

fn outcome(action: &str, outcome: GroupOutcome) -> String {
    let mut text = format!("{}: {}/{} zone(s) ok", action, outcome.success, outcome.total);
    for (output, error) in &outcome.failures {
        text.push_str(&format!("\n  zone {}: {}", output, error));
    }
    text
}
