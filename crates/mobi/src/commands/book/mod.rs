use clap::ValueEnum;
use miette::{Context, IntoDiagnostic, Result};
use mobi_rawml::{MobiBook, ReaderOptions, SectionChoice};
use std::{fs::File, io::BufReader, path::Path};

pub mod extract;
pub mod info;

#[derive(clap::Subcommand)]
pub enum BookCommands {
    /// Extract the raw markup of a book
    Extract(extract::ExtractArgs),
    /// Show the metadata and layout of a book
    Info(info::InfoArgs),
}

impl BookCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            BookCommands::Extract(extract) => extract.handle(),
            BookCommands::Info(info) => info.handle(),
        }
    }
}

/// Book to read from a combo file
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Section {
    /// The legacy MOBI book
    First,
    /// The KF8 book, or the only book of other files
    #[default]
    Last,
}

impl From<Section> for SectionChoice {
    fn from(section: Section) -> Self {
        match section {
            Section::First => SectionChoice::First,
            Section::Last => SectionChoice::Last,
        }
    }
}

pub(crate) fn open_book(path: &Path, section: Section) -> Result<MobiBook<BufReader<File>>> {
    let f = File::open(path)
        .into_diagnostic()
        .context(format!("path: {}", path.display()))?;

    let options = ReaderOptions::builder().section(section.into()).build();
    Ok(MobiBook::with_options(BufReader::new(f), options)?)
}
