use async_trait::async_trait;
use snafu::Snafu;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Connection Error: {}", details))]
    Connection { details: String },

    #[snafu(display("Invalid Backend Version: {}", details))]
    InvalidVersion { details: String },
}

/// Something we can connect to, given a configuration.
#[async_trait]
pub trait Remote {
    type Conn;
    type Config;

    async fn conn(self, config: Self::Config) -> Result<Self::Conn, Error>;
}
