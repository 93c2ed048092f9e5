pub mod tokens;

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::application::pipeline::DEFAULT_MAX_DIMENSION;
use crate::application::server::{DEFAULT_PORT, Port, ServerConfig};
use crate::infrastructure::image_processing::DEFAULT_JPEG_QUALITY;
use tokens::{DecodeCommand, EncodeCommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Generate thumbnails of remote images on the fly", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve(ServeCommand),

    /// Encode an image URL into a thumbnail token or path
    Encode(EncodeCommand),

    /// Decode a thumbnail token back into its image URL
    Decode(DecodeCommand),
}

#[derive(Debug, Args)]
pub struct ServeCommand {
    #[arg(long, env = "THUMB_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    #[arg(long, env = "THUMB_SERVER_PORT", default_value_t = DEFAULT_PORT.to_string())]
    pub port: String,

    /// Directory containing `not-found.png` and `broken.png` overrides
    #[arg(long, env = "THUMB_SERVER_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Timeout for fetching a source image, in seconds
    #[arg(long, env = "THUMB_SERVER_FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// Largest width or height a thumbnail may be requested at
    #[arg(long, env = "THUMB_SERVER_MAX_DIMENSION", default_value_t = DEFAULT_MAX_DIMENSION)]
    pub max_dimension: u32,

    #[arg(
        long,
        env = "THUMB_SERVER_JPEG_QUALITY",
        default_value_t = DEFAULT_JPEG_QUALITY,
        value_parser = clap::value_parser!(u8).range(1..=100)
    )]
    pub jpeg_quality: u8,
}

impl ServeCommand {
    pub fn into_config(self) -> anyhow::Result<ServerConfig> {
        let port: Port = self.port.parse()?;
        Ok(ServerConfig {
            host: self.host,
            port,
            static_dir: self.static_dir,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            max_dimension: self.max_dimension,
            jpeg_quality: self.jpeg_quality,
        })
    }
}
