use clap::Parser;
use snafu::{ResultExt, Snafu};

use esdrain::scan::run;
use esdrain::settings;
use esdrain::utils::launch::{launch_with_runtime, Error as LaunchError};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Settings (Configuration or CLI) Error: {}", source))]
    Settings { source: settings::Error },

    #[snafu(display("{}", source))]
    Execution { source: LaunchError },

    #[snafu(display("Could not print the configuration: {}", source))]
    Serialization { source: serde_json::Error },
}

fn main() -> Result<(), Error> {
    let opts = settings::Opts::parse();
    let settings = settings::Settings::new(&opts).context(SettingsSnafu)?;

    match opts.cmd {
        settings::Command::Run => {
            let log_path = settings.logging.path.clone();
            launch_with_runtime(settings.nb_threads, log_path.as_deref(), run(settings))
                .context(ExecutionSnafu)
        }
        settings::Command::Config => {
            let json = serde_json::to_string_pretty(&settings).context(SerializationSnafu)?;
            println!("{}", json);
            Ok(())
        }
    }
}
