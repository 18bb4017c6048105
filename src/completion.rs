//! # Shell Completion Module
//!
//! Completion scripts for `vibenav`, generated by clap, plus a fish script
//! that completes `--mood` values by asking the binary itself.
//!
//! ## Usage
//!
//! ```bash
//! vibenav completion bash > ~/.local/share/bash-completion/completions/vibenav
//! vibenav completion-enhanced fish > ~/.config/fish/completions/vibenav.fish
//! ```

use crate::vibe::Vibe;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

/// Fish script with dynamic mood completion
#[must_use]
pub fn enhanced_fish_completion() -> String {
    let mut script = String::from(
        r#"# Enhanced vibenav completion script for Fish shell
# Install with: vibenav completion-enhanced fish > ~/.config/fish/completions/vibenav.fish

function __vibenav_complete_moods
    if command -sq vibenav
        vibenav complete-moods 2>/dev/null
    end
end

complete -c vibenav -e

complete -c vibenav -s h -l help -d 'Print help information'
complete -c vibenav -s V -l version -d 'Print version information'
complete -c vibenav -l config -r -F -d 'Engine config file'

complete -c vibenav -f -n '__fish_use_subcommand' -a 'demo' -d 'Run the scripted demo trip'
complete -c vibenav -f -n '__fish_use_subcommand' -a 'vibe' -d 'Show the vibe a mood becomes'
complete -c vibenav -f -n '__fish_use_subcommand' -a 'feedback' -d 'Append to a feedback log'
complete -c vibenav -f -n '__fish_use_subcommand' -a 'summary' -d 'Print learned preferences'
complete -c vibenav -f -n '__fish_use_subcommand' -a 'traffic' -d 'Derive a traffic level'
complete -c vibenav -f -n '__fish_use_subcommand' -a 'completion' -d 'Generate shell completions'

complete -c vibenav -f -n '__fish_seen_subcommand_from demo vibe' -s m -l mood -a '(__vibenav_complete_moods)' -d 'Declared mood'
complete -c vibenav -f -n '__fish_seen_subcommand_from feedback' -l vibe -a '(__vibenav_complete_moods)' -d 'Vibe that was playing'
complete -c vibenav -f -n '__fish_seen_subcommand_from feedback' -l mood -a '(__vibenav_complete_moods)' -d 'Declared mood'
complete -c vibenav -f -n '__fish_seen_subcommand_from feedback' -a 'track trip'
complete -c vibenav -f -n '__fish_seen_subcommand_from traffic' -a 'low moderate heavy severe unknown'
"#,
    );

    for (shell, label) in [("bash", "Bash"), ("zsh", "Zsh"), ("fish", "Fish"), ("power-shell", "PowerShell"), ("elvish", "Elvish")] {
        script.push_str(&format!(
            "complete -c vibenav -f -n '__fish_seen_subcommand_from completion' -a '{shell}' -d '{label} completions'\n"
        ));
    }
    script
}

/// Print the enhanced fish completion script
pub fn generate_enhanced_fish_completion() {
    print!("{}", enhanced_fish_completion());
}

/// Convert our Shell enum to clap_complete's Shell enum
#[must_use]
pub const fn shell_to_completion_shell(shell: crate::cli::Shell) -> CompletionShell {
    match shell {
        crate::cli::Shell::Bash => CompletionShell::Bash,
        crate::cli::Shell::Zsh => CompletionShell::Zsh,
        crate::cli::Shell::Fish => CompletionShell::Fish,
        crate::cli::Shell::PowerShell => CompletionShell::PowerShell,
        crate::cli::Shell::Elvish => CompletionShell::Elvish,
    }
}

/// Mood names accepted by `--mood`
#[must_use]
pub fn mood_completions() -> Vec<&'static str> {
    Vibe::ALL.iter().map(|v| v.as_str()).collect()
}

/// Print mood names one per line for shell completion scripts
pub fn print_mood_completions() {
    for mood in mood_completions() {
        println!("{mood}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Shell;

    #[test]
    fn test_shell_conversion() {
        assert!(matches!(shell_to_completion_shell(Shell::Bash), CompletionShell::Bash));
        assert!(matches!(shell_to_completion_shell(Shell::Zsh), CompletionShell::Zsh));
        assert!(matches!(shell_to_completion_shell(Shell::Fish), CompletionShell::Fish));
        assert!(matches!(shell_to_completion_shell(Shell::PowerShell), CompletionShell::PowerShell));
        assert!(matches!(shell_to_completion_shell(Shell::Elvish), CompletionShell::Elvish));
    }

    #[test]
    fn test_mood_completions_parse_back() {
        let moods = mood_completions();
        assert_eq!(moods.len(), 8);
        for mood in moods {
            assert!(mood.parse::<Vibe>().is_ok(), "{mood} does not parse");
        }
    }

    #[test]
    fn test_enhanced_fish_script_mentions_commands() {
        let script = enhanced_fish_completion();
        assert!(script.contains("vibenav complete-moods"));
        assert!(script.contains("-a 'demo'"));
        assert!(script.contains("-a 'power-shell'"));
    }
}
