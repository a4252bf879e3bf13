use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::session::SessionState;
use crate::wire::{EditStrength, Mode, ModelVariant, SourceItem};

#[derive(Parser, Debug)]
#[command(name = "draftdesk", version, about = "Editorial assistant: rewrite, copy-edit, fact-check and publish posts")]
pub struct Args {
    /// TOML config file; environment variables still override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = ".draftdesk/session.json")]
    pub session: PathBuf,

    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    /// Write every model request/response under the artifacts directory.
    #[arg(long, global = true, default_value_t = false)]
    pub save_artifacts: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the selected mode over the session's sources.
    Generate(GenerateArgs),
    /// Rewrite the current output following an instruction.
    Revise {
        instructions: String,
    },
    /// Rewrite the current output for search.
    Seo,
    /// Check the current output's claims against the sources.
    FactCheck,
    /// Score how much of the current output is lifted from the sources.
    Score,
    /// Print the session.
    Show(ShowArgs),
    /// Replace the current output with hand-edited HTML.
    Edit(EditArgs),
    /// Start over with an empty session.
    Clear,
    /// Fetch an article through the model and add it as a source.
    Extract {
        url: String,
    },
    /// List today's news river; optionally draft and save a post from one entry.
    River(PickArgs),
    /// List a handful of Wikipedia unusual articles; optionally draft one.
    Wiki(PickArgs),
    /// Start the companion HTTP server.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(ClapArgs, Debug, Default)]
pub struct GenerateArgs {
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    #[arg(long, value_enum)]
    pub strength: Option<EditStrength>,

    #[arg(long, value_enum)]
    pub model: Option<ModelVariant>,

    /// Extra instructions for this run; an empty string clears them.
    #[arg(long)]
    pub instructions: Option<String>,

    /// Source text; repeat for several sources. Replaces the session's sources.
    #[arg(long = "text")]
    pub texts: Vec<String>,

    /// Read a source from a file; repeatable, appended after `--text` sources.
    #[arg(long = "file")]
    pub files: Vec<PathBuf>,

    /// Source URLs, matched to the new sources in order.
    #[arg(long = "url")]
    pub urls: Vec<String>,
}

impl GenerateArgs {
    pub fn replaces_sources(&self) -> bool {
        !self.texts.is_empty() || !self.files.is_empty()
    }

    /// Folds the flags into the session before it runs.
    pub fn apply_to(&self, state: &mut SessionState) -> anyhow::Result<()> {
        if let Some(mode) = self.mode {
            state.set_mode(mode);
        }
        if let Some(strength) = self.strength {
            state.set_edit_strength(strength);
        }
        if let Some(model) = self.model {
            state.set_model(model);
        }
        if let Some(instructions) = &self.instructions {
            state.set_custom_instructions(instructions.as_str());
        }
        if !self.replaces_sources() {
            return Ok(());
        }

        let mut texts = self.texts.clone();
        for path in &self.files {
            let text = fs_err::read_to_string(path).with_context(|| format!("reading source {}", path.display()))?;
            texts.push(text);
        }
        let mut urls = self.urls.iter().cloned();
        state.sources = texts.into_iter().map(|t| SourceItem::from_text(t, urls.next())).collect();
        Ok(())
    }
}

#[derive(ClapArgs, Debug, Default)]
pub struct ShowArgs {
    /// Toggle the copy-edit changes report.
    #[arg(long, default_value_t = false)]
    pub changes: bool,

    /// Toggle the fact-check panel.
    #[arg(long, default_value_t = false)]
    pub facts: bool,

    /// Print the raw model text instead of the HTML.
    #[arg(long, default_value_t = false)]
    pub raw: bool,
}

#[derive(ClapArgs, Debug, Default)]
pub struct EditArgs {
    /// HTML file holding the edited output.
    #[arg(long, conflicts_with_all = ["html", "cancel"])]
    pub file: Option<PathBuf>,

    #[arg(long, conflicts_with = "cancel")]
    pub html: Option<String>,

    #[arg(long, default_value_t = false)]
    pub cancel: bool,
}

#[derive(ClapArgs, Debug, Default)]
pub struct PickArgs {
    /// 1-based entry to draft into a post.
    #[arg(long, conflicts_with = "url")]
    pub draft: Option<usize>,

    /// Draft from this page instead of a listed entry.
    #[arg(long)]
    pub url: Option<String>,

    /// Save the drafted post under this slug (defaults to its headline).
    #[arg(long)]
    pub slug: Option<String>,
}
