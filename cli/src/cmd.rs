use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{ContextCompat, Result, WrapErr};
use itertools::Itertools;
use multicam_core::Roi;
use std::{path::PathBuf, str::FromStr};

#[derive(Parser)]
#[command(author, version, about, long_about = None, propagate_version = true)]
pub struct CliArgs {
	#[command(subcommand)]
	pub command: CliSubcommands,
}

#[derive(Subcommand)]
pub enum CliSubcommands {
	Run(RunArgs),
	Select(SelectArgs),
}

#[derive(Args)]
pub struct RunArgs {
	/// The camera device numbers to connect.
	#[arg(short, long, num_args = 1..)]
	pub devices: Vec<i32>,
	/// A TOML session file describing streams and default filter settings.
	#[arg(short, long)]
	pub config: Option<PathBuf>,
	/// The requested frame width.
	#[arg(short = 'W', long)]
	pub width: Option<i32>,
	/// The requested frame height.
	#[arg(short = 'H', long)]
	pub height: Option<i32>,
	/// How many frames to buffer between capture and processing.
	#[arg(short, long)]
	pub buffer_size: Option<usize>,
	/// Stall the camera instead of dropping frames when the buffer is full.
	#[arg(long)]
	pub no_drop: bool,
	/// Process all streams in lock-step.
	#[arg(short, long)]
	pub sync: bool,
	/// The bounds of the region of interest (x,y,width,height).
	#[arg(short, long, value_parser = parse_rect)]
	pub roi: Option<Roi>,
}

#[derive(Args)]
pub struct SelectArgs {
	/// The camera device number to grab a frame from.
	#[arg(short, long, default_value = "0")]
	pub device: i32,
	/// The requested frame width.
	#[arg(short = 'W', long)]
	pub width: Option<i32>,
	/// The requested frame height.
	#[arg(short = 'H', long)]
	pub height: Option<i32>,
}

fn parse_rect(arg: &str) -> Result<Roi> {
	let (x, y, width, height) = arg
		.split(',')
		.map(str::trim)
		.map(|thingy| {
			i32::from_str(thingy).wrap_err_with(|| format!("invalid number '{}'", thingy))
		})
		.collect::<Result<Vec<i32>>>()
		.wrap_err("rectangle should be formatted at x,y,width,height")?
		.into_iter()
		.collect_tuple()
		.context("rectangle should be formatted at x,y,width,height")?;

	Ok(Roi::new(x, y, width, height))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_rect() {
		assert_eq!(parse_rect("1, 2,30,40").unwrap(), Roi::new(1, 2, 30, 40));
		assert!(parse_rect("1,2,3").is_err());
		assert!(parse_rect("1,2,3,x").is_err());
	}
}
