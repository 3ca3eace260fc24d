pub mod book;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle MOBI and PalmDOC books
    Book {
        #[command(subcommand)]
        command: book::BookCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Book { command } => command.handle(),
        }
    }
}
