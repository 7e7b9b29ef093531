// CLI interface
pub mod commands;

use crate::error::{CardsError, Result};
use crate::models::{Difficulty, Table};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "flashcards")]
#[command(about = "Russian flashcards from the command line", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Address the browser landed on after signing in
    #[arg(long, global = true, env = "FLASHCARDS_PAGE_URL")]
    pub page_url: Option<String>,

    /// Print sign-in URLs instead of opening a browser
    #[arg(long, global = true)]
    pub headless: bool,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in through the browser
    Login,

    /// Sign out and forget cached sessions
    Logout,

    /// Show the signed-in account
    Status {
        /// Output in JSON format for scripting
        #[arg(long)]
        json: bool,
    },

    /// Print an access token for the backend API
    Token,

    /// Show a phrase card by id
    Phrase {
        /// Card id
        id: String,
    },

    /// Count rows in a table
    Count {
        #[arg(long, value_enum, default_value = "examples")]
        table: Table,
    },

    /// Search example phrases
    Search {
        query: String,
    },

    /// Analyze a word in the context of a sentence
    Word {
        word: String,

        /// Sentence containing the word
        #[arg(long)]
        sentence: String,

        /// Skip the stress lookup for the base form
        #[arg(long)]
        no_stress: bool,
    },

    /// Add stress marks to a word or sentence
    Stress {
        text: String,
    },

    /// List inflected forms of a word
    Variations {
        word: String,
    },

    /// Synthesize audio for a sentence
    Synthesize {
        sentence: String,
    },

    /// Find the dictionary form of a phrase within a sentence
    BaseForm {
        #[arg(long)]
        sentence: String,

        /// Words of the phrase, as they appear in the sentence
        #[arg(long)]
        words: String,
    },

    /// Native speaker recordings
    #[command(subcommand)]
    Forvo(ForvoCommand),

    /// Shadowing sentences
    #[command(subcommand)]
    Shadowing(ShadowingCommand),

    /// Minimal pair drills
    #[command(subcommand)]
    MinimalPairs(MinimalPairsCommand),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completion scripts
    ///
    /// INSTALLATION:
    ///
    /// Bash:
    ///   eval "$(flashcards completions bash)"    # Add to ~/.bashrc
    ///
    /// Zsh:
    ///   eval "$(flashcards completions zsh)"     # Add to ~/.zshrc
    ///
    /// Fish:
    ///   flashcards completions fish > ~/.config/fish/completions/flashcards.fish
    Completions {
        /// Shell type to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ForvoCommand {
    /// Search recorded phrases
    Search { phrase: String },
    /// List recordings of a word, Russian speakers first
    Pronunciations { word: String },
}

#[derive(Subcommand, Debug)]
pub enum ShadowingCommand {
    /// Show a shadowing sentence with its recordings
    Get { id: String },
    /// Add a shadowing sentence
    Add {
        sentence: String,
        #[arg(long, value_enum, default_value = "medium")]
        difficulty: Difficulty,
    },
}

#[derive(Subcommand, Debug)]
pub enum MinimalPairsCommand {
    /// Show a minimal pair with recordings of both words
    Get { id: String },
    /// Add a minimal pair, e.g. "мал - мял"
    Add {
        pair: String,
        #[arg(long, value_enum, default_value = "medium")]
        difficulty: Difficulty,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Create a sample config file
    Init,
    /// Show the config file location and effective settings
    Show,
}

#[derive(Debug, Clone, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

pub async fn execute(args: Cli) -> Result<()> {
    let page_url = args.page_url.as_deref();

    let result = match args.command {
        Commands::Login => commands::login::execute(page_url).await,
        Commands::Logout => commands::logout::execute(page_url).await,
        Commands::Status { json } => commands::status::execute(page_url, json).await,
        Commands::Token => commands::token::execute(page_url).await,
        Commands::Config(command) => commands::config::execute(command),
        Commands::Completions { shell } => {
            commands::completions::execute(shell);
            Ok(())
        }
        Commands::Phrase { id } => commands::cards::phrase(page_url, &id).await,
        Commands::Count { table } => commands::cards::count(page_url, table).await,
        Commands::Search { query } => commands::cards::search(page_url, &query).await,
        Commands::Word {
            word,
            sentence,
            no_stress,
        } => commands::cards::word(page_url, &word, &sentence, !no_stress).await,
        Commands::Stress { text } => commands::cards::stress(page_url, &text).await,
        Commands::Variations { word } => commands::cards::variations(page_url, &word).await,
        Commands::Synthesize { sentence } => {
            commands::cards::synthesize(page_url, &sentence).await
        }
        Commands::BaseForm { sentence, words } => {
            commands::cards::base_form(page_url, &sentence, &words).await
        }
        Commands::Forvo(command) => commands::cards::forvo(page_url, command).await,
        Commands::Shadowing(command) => commands::cards::shadowing(page_url, command).await,
        Commands::MinimalPairs(command) => {
            commands::cards::minimal_pairs(page_url, command).await
        }
    };

    match result {
        Err(CardsError::Redirecting) => {
            commands::print_redirect_notice();
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_word_command() {
        let cli = Cli::try_parse_from([
            "flashcards",
            "word",
            "дом",
            "--sentence",
            "Я вижу дом.",
            "--no-stress",
            "--page-url",
            "http://localhost:5173/?code=abc&state=xyz",
        ])
        .unwrap();

        assert_eq!(
            cli.page_url.as_deref(),
            Some("http://localhost:5173/?code=abc&state=xyz")
        );
        match cli.command {
            Commands::Word {
                word,
                sentence,
                no_stress,
            } => {
                assert_eq!(word, "дом");
                assert_eq!(sentence, "Я вижу дом.");
                assert!(no_stress);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_minimal_pairs_add() {
        let cli = Cli::try_parse_from([
            "flashcards",
            "minimal-pairs",
            "add",
            "мал - мял",
            "--difficulty",
            "hard",
        ])
        .unwrap();

        assert!(matches!(
            cli.command,
            Commands::MinimalPairs(MinimalPairsCommand::Add {
                difficulty: Difficulty::Hard,
                ..
            })
        ));
    }

    #[test]
    fn test_count_defaults_to_examples() {
        let cli = Cli::try_parse_from(["flashcards", "count"]).unwrap();
        assert!(matches!(cli.command, Commands::Count { table: Table::Examples }));
    }
}
