pub mod cmd;
pub mod config;
pub mod run;
pub mod select;

use self::cmd::{CliArgs, CliSubcommands};
use clap::Parser;
use color_eyre::eyre::Result;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::from_default_env()
				.add_directive("multicam=info".parse()?)
				.add_directive("multicam_core=info".parse()?),
		)
		.init();
	let args = CliArgs::parse();
	match args.command {
		CliSubcommands::Run(args) => run::run(args),
		CliSubcommands::Select(args) => select::select(args),
	}
}
