use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use std::{fs::File, io::Write, path::PathBuf};
use tracing::info;

use super::{open_book, Section};

#[derive(Args)]
pub struct ExtractArgs {
    /// An input MOBI or PalmDOC file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The target file, defaults to the input with a `.rawml` extension
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// The book to extract from combo files
    #[arg(short, long, value_enum, default_value_t)]
    section: Section,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let mut book = open_book(&self.file, self.section)?;
        let raw_ml = book.raw_ml()?;

        let target = self
            .output
            .clone()
            .unwrap_or_else(|| self.file.with_extension("rawml"));
        info!("writing {} bytes to {}", raw_ml.len(), target.display());

        let mut out = if !self.overwrite {
            File::create_new(&target)
                .into_diagnostic()
                .context(format!("creating {}", &target.display()))?
        } else {
            File::create(&target)
                .into_diagnostic()
                .context(format!("creating {}", &target.display()))?
        };

        out.write_all(&raw_ml).into_diagnostic()?;
        Ok(())
    }
}
