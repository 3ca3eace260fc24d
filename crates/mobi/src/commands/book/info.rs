use clap::Args;
use miette::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;

use super::{open_book, Section};

#[derive(Args)]
pub struct InfoArgs {
    /// An input MOBI or PalmDOC file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The book to describe in combo files
    #[arg(short, long, value_enum, default_value_t)]
    section: Section,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let mut book = open_book(&self.file, self.section)?;
        let metadata = book.metadata()?;

        println!("{}", metadata.title.bold());
        for author in &metadata.authors {
            println!("  by {}", author.green());
        }
        if let Some(publisher) = &metadata.publisher {
            println!("  publisher: {}", publisher);
        }
        if let Some(asin) = &metadata.asin {
            println!("  asin: {}", asin);
        }
        println!("  database: {}", metadata.database_name.dimmed());
        println!("  encoding: {:?}", metadata.text_encoding);
        if let Some(description) = &metadata.description {
            println!("  {}", description.dimmed());
        }

        println!();
        println!("{} records", book.container().len());
        let active = book.active_section().header_record;
        for section in book.sections() {
            let marker = if section.header_record == active { "*" } else { " " };
            let records = section.text_records();
            println!(
                "{} header {}, text records {}..{}, {:?}",
                marker.yellow(),
                section.header_record,
                records.start,
                records.end,
                section.text.compression,
            );
        }

        Ok(())
    }
}
