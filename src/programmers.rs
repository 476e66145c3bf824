//! Programmer registration and dispatch
//!
//! Every programmer compiled in is listed here together with the options it
//! accepts. A programmer string is a name optionally followed by options,
//! e.g. `ch341a:index=1` or `dummy:chip=W25Q64,image=fw.bin`.

use spidump_core::chip::ChipDatabase;
use spidump_core::programmer::SpiMaster;

/// A programmer opened for exclusive use by one command
pub type BoxedMaster = Box<dyn SpiMaster + Send>;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "ch341a")]
    programmers.push(ProgrammerInfo {
        name: "ch341a",
        aliases: &["ch341a_spi"],
        description: "CH341A USB SPI programmer (VID:1a86 PID:5512) (index=<n>)",
    });

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory flash emulator (chip=<name>,image=<file>,asleep)",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        help.push_str(&format!("  {:12} - {}\n", p.name, p.description));
    }
    help
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Resolve a name or alias to the primary programmer name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Parse a programmer string into name and options
///
/// Format: "name" or "name:option1=value1,option2". Options without a
/// value are flags and come back with an empty value.
pub fn parse_programmer_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter(|opt| !opt.is_empty())
            .map(|opt| opt.split_once('=').unwrap_or((opt, "")))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

/// Open the programmer named by `programmer`
///
/// `db` is consulted by the dummy programmer to emulate a named chip.
#[allow(unused_variables)]
pub fn open_programmer(
    programmer: &str,
    db: &ChipDatabase,
) -> Result<BoxedMaster, Box<dyn std::error::Error>> {
    let (name, options) = parse_programmer_string(programmer);

    let canonical_name = match find_programmer(name) {
        Some(n) => n,
        None => return Err(unknown_programmer_error(name)),
    };

    match canonical_name {
        #[cfg(feature = "ch341a")]
        "ch341a" => {
            let mut index = 0usize;
            for (key, value) in &options {
                match *key {
                    "index" => {
                        index = value
                            .parse()
                            .map_err(|_| format!("Invalid CH341A index: {}", value))?;
                    }
                    other => log::warn!("Ignoring unknown ch341a option '{}'", other),
                }
            }

            log::info!("Opening CH341A programmer...");
            let master = spidump_ch341a::Ch341a::open_nth(index).map_err(|e| {
                format!(
                    "Failed to open CH341A: {}\nMake sure the device is connected and you have permissions.",
                    e
                )
            })?;
            Ok(Box::new(master))
        }

        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&options, db),

        _ => Err(unknown_programmer_error(name)),
    }
}

#[cfg(feature = "dummy")]
fn open_dummy(
    options: &[(&str, &str)],
    db: &ChipDatabase,
) -> Result<BoxedMaster, Box<dyn std::error::Error>> {
    use spidump_dummy::{DummyConfig, DummyFlash};

    let mut config = DummyConfig::default();
    let mut image = None;
    for (key, value) in options {
        match *key {
            "chip" => {
                let profile = db
                    .find_by_name(value)
                    .ok_or_else(|| format!("Unknown chip for dummy programmer: {}", value))?;
                config = DummyConfig {
                    asleep: config.asleep,
                    ..DummyConfig::from_profile(profile)
                };
            }
            "image" => image = Some(std::fs::read(value)?),
            "asleep" => config.asleep = true,
            other => log::warn!("Ignoring unknown dummy option '{}'", other),
        }
    }

    log::info!(
        "Emulating chip {} ({} bytes)",
        config.jedec_id,
        config.size
    );
    let flash = match image {
        Some(data) => {
            if data.len() != config.size {
                log::warn!(
                    "Dummy image is {} bytes, chip is {} bytes",
                    data.len(),
                    config.size
                );
            }
            DummyFlash::with_data(config, &data)
        }
        None => DummyFlash::new(config),
    };
    Ok(Box::new(flash))
}

fn unknown_programmer_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown programmer: {}\n\n", name);
    msg.push_str(&programmer_help());
    msg.push_str("\nUse 'spidump list-programmers' for more details");
    msg.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_programmer_string() {
        assert_eq!(parse_programmer_string("ch341a"), ("ch341a", vec![]));
        assert_eq!(
            parse_programmer_string("ch341a:index=1"),
            ("ch341a", vec![("index", "1")])
        );
        assert_eq!(
            parse_programmer_string("dummy:chip=W25Q64,asleep,"),
            ("dummy", vec![("chip", "W25Q64"), ("asleep", "")])
        );
    }

    #[cfg(feature = "ch341a")]
    #[test]
    fn test_alias() {
        assert_eq!(find_programmer("ch341a_spi"), Some("ch341a"));
        assert_eq!(find_programmer("nope"), None);
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy_chip() {
        use spidump_core::chip::identify;
        use spidump_core::retry::RetryPolicy;

        let db = ChipDatabase::builtin();
        let mut master = open_programmer("dummy:chip=W25Q32,asleep", &db).unwrap();
        let chip = identify(&mut master, &db, &RetryPolicy::none()).unwrap();
        assert_eq!(chip.name, "W25Q32");
        assert!(open_programmer("dummy:chip=NOPE", &db).is_err());
    }
}
