use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use snafu::{ResultExt, Snafu};
use std::env;
use std::path::Path;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Key Value Splitting Error: {}", msg))]
    Splitting { msg: String },

    #[snafu(display("Setting Config Value Error: {}", source))]
    ConfigValue { source: config::ConfigError },

    #[snafu(display("Config Compilation Error: {}", source))]
    ConfigCompilation { source: config::ConfigError },
}

/// Build a configuration from a configuration directory, a run mode,
/// environment variables and command line overrides.
///
/// * For each sub directory, `default.toml` is read first.
/// * The run mode (the `RUN_MODE` environment variable wins over the argument)
///   selects a second, mandatory file: 'testing' -> `<sub_dir>/testing.toml`.
/// * An optional `local.toml` can override previous values. It shouldn't be
///   checked in.
/// * Environment variables with the given prefix come next, eg
///   `ESDRAIN_SCAN_PREFIX=logs_` sets `scan.prefix`.
/// * Finally the `key=value` overrides given on the command line.
pub fn config_from<'a, R: Into<Option<&'a str>>>(
    config_dir: &Path,
    sub_dirs: &[&str],
    run_mode: R,
    prefix: &str,
    overrides: Vec<String>,
) -> Result<Config, Error> {
    let run_mode = run_mode.into().map(String::from);

    config_builder_from(config_dir, sub_dirs, run_mode, prefix)
        .add_source(config_from_args(overrides)?)
        .build()
        .context(ConfigCompilationSnafu)
}

pub fn config_builder_from(
    config_dir: &Path,
    sub_dirs: &[&str],
    run_mode: Option<String>,
    prefix: &str,
) -> ConfigBuilder<DefaultState> {
    let run_mode = env::var("RUN_MODE").ok().or(run_mode);

    let builder = sub_dirs
        .iter()
        .fold(Config::builder(), |mut builder, sub_dir| {
            let dir_path = config_dir.join(sub_dir);

            let default_path = dir_path.join("default").with_extension("toml");
            builder = builder.add_source(File::from(default_path));

            if let Some(run_mode) = run_mode.as_ref() {
                let run_mode_path = dir_path.join(run_mode).with_extension("toml");
                builder = builder.add_source(File::from(run_mode_path).required(true));
            }

            let local_path = dir_path.join("local").with_extension("toml");
            builder.add_source(File::from(local_path).required(false))
        });

    builder.add_source(Environment::with_prefix(prefix).separator("_"))
}

/// Create a new configuration source from a list of assignments key=value
///
/// The function iterates over the list, and for each element, it tries to
/// (a) identify the key and the value, by searching for the '=' sign.
/// (b) parse the value into one of bool, i64, f64. if not it's a string.
pub fn config_from_args(args: impl IntoIterator<Item = String>) -> Result<Config, Error> {
    let mut config = Config::builder();

    for arg in args {
        let (key, val) = arg.split_once('=').ok_or(Error::Splitting {
            msg: format!("missing '=' in setting override: {}", arg),
        })?;

        config = {
            if let Ok(as_bool) = val.parse::<bool>() {
                config.set_override(key, as_bool).context(ConfigValueSnafu)
            } else if let Ok(as_int) = val.parse::<i64>() {
                config.set_override(key, as_int).context(ConfigValueSnafu)
            } else if let Ok(as_float) = val.parse::<f64>() {
                config.set_override(key, as_float).context(ConfigValueSnafu)
            } else {
                config.set_override(key, val).context(ConfigValueSnafu)
            }
        }?
    }

    config.build().context(ConfigCompilationSnafu)
}
