use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use prokudin_core::io::image_io::load_channel_image;

#[derive(Args)]
pub struct InfoArgs {
    /// Channel image files
    #[arg(required = true, num_args = 1..=3)]
    pub files: Vec<PathBuf>,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    for (index, path) in args.files.iter().enumerate() {
        println!("Channel {index}:   {}", path.display());
        match load_channel_image(path) {
            Ok(image) => {
                println!("  Dimensions:  {}x{}", image.width(), image.height());
                let mode = if image.color.is_some() {
                    "RGB (BT.601 luminance used for alignment)"
                } else {
                    "grayscale"
                };
                println!("  Color mode:  {mode}");
            }
            Err(e) => println!("  Error:       {e}"),
        }
    }
    Ok(())
}
