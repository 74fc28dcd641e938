use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};

use rusbit_metainfo::bencode::{decode_bencode_with, encode_bvalue};
use rusbit_metainfo::config::{Config, CONFIG_PATH};
use rusbit_metainfo::torrent::{FileMode, MetaInfo};

#[derive(Debug, Parser)]
#[command(version, about = "Inspect bencoded data and .torrent files", long_about = None)]
struct Cli {
    /// Config file with decode limits (defaults to ./rusbit-metainfo.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode a bencoded string given on the command line
    Decode { value: String },
    /// Print the metainfo of a .torrent file
    Info { path: PathBuf },
    /// Write the default config file
    InitConfig { path: Option<PathBuf> },
}

fn main() {
    env_logger::init();

    if let Err(err) = run(Cli::parse()) {
        error!("{:#}", err);
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load().context("loading config")?,
    };

    match cli.command {
        Commands::Decode { value } => {
            let input = bytes::Bytes::from(value.into_bytes());
            let (_consumed, decoded) = decode_bencode_with(&input, &config.decode_options())
                .context("decoding bencoded value")?;
            println!("{:?}", decoded);
            println!("Canonical length: {}", encode_bvalue(&decoded).len());
        }
        Commands::Info { path } => {
            let torrent = MetaInfo::from_file(&path, &config)
                .with_context(|| format!("reading torrent {}", path.display()))?;
            print_info(&torrent);
        }
        Commands::InitConfig { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(CONFIG_PATH));
            Config::default()
                .save(&path)
                .with_context(|| format!("writing config to {}", path.display()))?;
            info!("Wrote default config to {}", path.display());
        }
    }

    Ok(())
}

fn print_info(torrent: &MetaInfo) {
    println!("Info Hash: {}", torrent.info_hash_hex());
    println!("Tracker URL: {}", torrent.primary_tracker().unwrap_or(""));
    for url in torrent.trackers().iter().skip(1) {
        println!("Backup Tracker: {}", url);
    }
    if let Some(date) = torrent.creation_date {
        println!("Creation Date: {}", date);
    }
    if let Some(comment) = &torrent.comment {
        println!("Comment: {}", comment);
    }
    if let Some(created_by) = &torrent.created_by {
        println!("Created By: {}", created_by);
    }
    println!("Name: {}", torrent.info.name);
    println!("Private: {}", torrent.info.private.unwrap_or(false));
    println!("Length: {}", torrent.info.total_length());
    println!("Piece Length: {}", torrent.info.piece_length);
    println!("Number of Pieces: {}", torrent.info.piece_count());

    if let FileMode::MultiFile { files } = &torrent.info.mode {
        println!("Files:");
        for file in files {
            println!("  {} ({} bytes)", file.relative_path().display(), file.length);
        }
    }

    println!("Piece Hashes:");
    for piece_hash in &torrent.info.pieces {
        println!("{}", hex::encode(piece_hash));
    }
}
