use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::client::SupabaseConfig;
use crate::metadata::{PKG_DESCRIPTION, PKG_NAME, PKG_VERSION};

#[derive(Parser, Debug, Clone)]
#[command(name = PKG_NAME)]
#[command(version = PKG_VERSION)]
#[command(about = PKG_DESCRIPTION, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub backend: BackendArguments,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show a user's saved roadmaps and detailed courses
    History(HistoryArguments),
    /// Mark a roadmap chapter complete or incomplete
    Progress(ProgressArguments),
    /// Generate and save the detailed course for a roadmap
    Enhance(EnhanceArguments),
    /// Delete a roadmap and its dependent detailed course
    Delete(DeleteArguments),
    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct BackendArguments {
    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL", default_value = "", global = true)]
    pub supabase_url: String,

    /// Supabase anon key
    #[arg(long, env = "SUPABASE_ANON_KEY", default_value = "", global = true)]
    pub supabase_anon_key: String,

    /// Access token of the signed-in user (anon key is used when absent)
    #[arg(long, env = "SUPABASE_ACCESS_TOKEN", global = true)]
    pub access_token: Option<String>,
}

impl BackendArguments {
    /// Validate CLI/environment-derived backend settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.supabase_url.trim().is_empty() {
            return Err("Set SUPABASE_URL (or pass --supabase-url)".to_string());
        }
        if self.supabase_anon_key.trim().is_empty() {
            return Err("Set SUPABASE_ANON_KEY (or pass --supabase-anon-key)".to_string());
        }
        Ok(())
    }

    pub fn to_config(&self) -> SupabaseConfig {
        let config = SupabaseConfig::new(self.supabase_url.clone(), self.supabase_anon_key.clone());
        match &self.access_token {
            Some(token) => config.with_access_token(token.clone()),
            None => config,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Tab {
    Roadmaps,
    Courses,
}

#[derive(Args, Debug, Clone)]
pub struct HistoryArguments {
    /// User id whose history to load
    #[arg(long)]
    pub user: String,

    /// Which tab to render
    #[arg(long, value_enum, default_value_t = Tab::Roadmaps)]
    pub tab: Tab,

    /// Fire the continue-learning signal for this roadmap after loading
    #[arg(long)]
    pub open: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ProgressArguments {
    /// Roadmap id
    #[arg(long)]
    pub roadmap: String,

    /// Chapter id within the roadmap's chapter list
    #[arg(long)]
    pub chapter: String,

    /// New completion state
    #[arg(long, action = clap::ArgAction::Set)]
    pub completed: bool,
}

#[derive(Args, Debug, Clone)]
pub struct EnhanceArguments {
    /// Owner of the roadmap
    #[arg(long)]
    pub user: String,

    /// Roadmap to generate the detailed course from
    #[arg(long)]
    pub roadmap: String,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArguments {
    /// Roadmap id to delete (cascades to its detailed course)
    #[arg(long)]
    pub roadmap: String,
}
