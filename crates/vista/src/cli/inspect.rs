//! The `vista inspect` command: print basic statistics for one image.

use clap::Args;
use std::path::PathBuf;

use vista_core::{Config, ImageLoader};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Image file to inspect
    #[arg(required = true)]
    pub image: PathBuf,
}

pub async fn execute(args: InspectArgs, config: Config) -> anyhow::Result<()> {
    let loader = ImageLoader::new(&config);
    let stats = loader.stats(&args.image).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
