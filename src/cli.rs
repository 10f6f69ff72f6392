use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "padseq", about = "Step sequencer for pad-grid controllers")]
pub struct Cli {
    /// Optional session file (launches the grid emulator)
    pub session: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List available MIDI ports
    #[command(subcommand)]
    Enumerate(EnumerateTarget),
    /// Print the pad map of a session's grid
    Layout(LayoutArgs),
    /// Run a session headless on a hardware grid
    Play(PlayArgs),
}

#[derive(Subcommand)]
pub enum EnumerateTarget {
    /// List available MIDI input and output ports
    Midi,
}

#[derive(clap::Args)]
pub struct LayoutArgs {
    /// Path to session file (.toml)
    pub session: String,

    /// View variant to lay out (default: the session's)
    #[arg(long)]
    pub view: Option<String>,
}

#[derive(clap::Args)]
pub struct PlayArgs {
    /// Path to session file (.toml)
    pub session: String,

    /// MIDI input device name filter (overrides the session)
    #[arg(long)]
    pub midi_device: Option<String>,

    /// MIDI output for pad lights (overrides the session)
    #[arg(long)]
    pub midi_output: Option<String>,
}
