mod opt_common;
mod opt_events;
mod opt_particles;

use std::io::{stdout, Write};

use anyhow::Result;
use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::{generate, shells::*, Generator};
use strum::Display;

#[derive(
    Copy,
    Clone,
    Debug,
    Display,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
enum Shell {
    Bash,
    Elvish,
    Fish,
    #[allow(clippy::enum_variant_names)]
    PowerShell,
    Zsh,
}

/// Write shell completions for all evfeat programs to standard output
#[derive(Debug, Parser)]
struct ShellSelect {
    /// Shell for which to generate completions
    #[clap(value_enum)]
    shell: Shell,
}

fn gen_completion<S: Copy + Generator, W: Write>(shell: S, mut to: W) {
    generate(
        shell,
        &mut opt_events::Opt::command(),
        "evfeat-events",
        &mut to,
    );
    generate(
        shell,
        &mut opt_particles::Opt::command(),
        "evfeat-particles",
        &mut to,
    );
}

fn main() -> Result<()> {
    let shell = ShellSelect::parse().shell;
    eprintln!("Generating {shell} completions");
    let out = stdout().lock();
    match shell {
        Shell::Bash => gen_completion(Bash, out),
        Shell::Elvish => gen_completion(Elvish, out),
        Shell::Fish => gen_completion(Fish, out),
        Shell::PowerShell => gen_completion(PowerShell, out),
        Shell::Zsh => gen_completion(Zsh, out),
    }
    Ok(())
}
