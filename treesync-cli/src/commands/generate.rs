//! The `generate` command: produce a hash manifest for a directory tree.

use std::path::PathBuf;

use clap::Args;
use treesync::generate_manifest;
use treesync::updater::DEFAULT_MANIFEST_NAME;

use crate::error::CliError;

/// Arguments for the `generate` command.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Root directory to hash
    #[arg(long, short = 'r', default_value = ".")]
    root: PathBuf,

    /// Output directory for the manifest (defaults to the root)
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,

    /// Output file name for the manifest
    #[arg(long, short = 'n', default_value = DEFAULT_MANIFEST_NAME)]
    name: String,
}

/// Generate a manifest from the tree under `root`.
pub fn run(args: GenerateArgs) -> Result<(), CliError> {
    if !args.root.is_dir() {
        return Err(CliError::InvalidRoot(args.root));
    }

    let out_dir = args.out.unwrap_or_else(|| args.root.clone());
    let out = out_dir.join(&args.name);

    let summary = generate_manifest(&args.root, &out)?;
    println!(
        "Wrote {} entries to {}",
        summary.files_hashed,
        summary.manifest_path.display()
    );
    Ok(())
}
