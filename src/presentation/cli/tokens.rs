use anyhow::{Context, Result};
use clap::Args;

use crate::application::pipeline::thumbnail_path;
use crate::domain::tokens;

#[derive(Debug, Args)]
pub struct EncodeCommand {
    /// Absolute URL of the source image
    pub url: String,
    /// Thumbnail width; together with --height prints a full thumbnail path
    #[arg(long, requires = "height")]
    pub width: Option<u32>,
    #[arg(long, requires = "width")]
    pub height: Option<u32>,
    /// Prefix for the printed path, e.g. http://localhost:4000
    #[arg(long, env = "THUMB_SERVER_BASE_URL", requires = "width")]
    pub base_url: Option<String>,
}

#[derive(Debug, Args)]
pub struct DecodeCommand {
    pub token: String,
}

pub fn run_encode(command: EncodeCommand) -> Result<()> {
    println!("{}", encode(&command)?);
    Ok(())
}

pub fn run_decode(command: DecodeCommand) -> Result<()> {
    println!("{}", decode(&command)?);
    Ok(())
}

fn encode(command: &EncodeCommand) -> Result<String> {
    tokens::parse_absolute(&command.url)
        .with_context(|| format!("cannot encode {}", command.url))?;

    let (Some(width), Some(height)) = (command.width, command.height) else {
        return Ok(tokens::encode(&command.url));
    };

    let path = thumbnail_path(&command.url, width, height);
    Ok(match &command.base_url {
        Some(base) => format!("{}{path}", base.trim_end_matches('/')),
        None => path,
    })
}

fn decode(command: &DecodeCommand) -> Result<String> {
    tokens::decode(&command.token).with_context(|| format!("cannot decode {}", command.token))
}
