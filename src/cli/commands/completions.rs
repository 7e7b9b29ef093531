use crate::cli::{Cli, Shell};
use clap::CommandFactory;
use clap_complete::{generate, Shell as ClapShell};
use std::io;

const BIN_NAME: &str = "flashcards";

impl From<Shell> for ClapShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => ClapShell::Bash,
            Shell::Zsh => ClapShell::Zsh,
            Shell::Fish => ClapShell::Fish,
            Shell::PowerShell => ClapShell::PowerShell,
            Shell::Elvish => ClapShell::Elvish,
        }
    }
}

fn install_hint(shell: &Shell) -> &'static str {
    match shell {
        Shell::Bash => "eval \"$(flashcards completions bash)\"    # in ~/.bashrc",
        Shell::Zsh => "eval \"$(flashcards completions zsh)\"     # in ~/.zshrc",
        Shell::Fish => "flashcards completions fish > ~/.config/fish/completions/flashcards.fish",
        Shell::PowerShell => "flashcards completions powershell | Out-String | Invoke-Expression",
        Shell::Elvish => "eval (flashcards completions elvish | slurp)",
    }
}

pub fn execute(shell: Shell) {
    let hint = install_hint(&shell);
    generate(ClapShell::from(shell), &mut Cli::command(), BIN_NAME, &mut io::stdout());
    // stderr keeps the script on stdout clean for eval
    eprintln!("\n# Install with:\n#   {}", hint);
}
