use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    domain::{conversation::ConversationRef, group::CommunityKind},
    usecases::{
        list_resources::ResourceKind,
        membership::{MembershipAction, MembershipCommand},
    },
};

#[derive(Debug, Parser)]
#[command(name = "studybuddy", about = "StudyBuddy AI terminal client")]
pub struct Cli {
    /// Path to config file (default: $STUDYBUDDY_CONFIG, ./config.toml, then the platform config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Login,
    /// Forget the stored session and cached listings
    Logout,
    /// Show study groups and channels
    Feed {
        /// Ignore cached listings and fetch again
        #[arg(long)]
        refresh: bool,
        /// Filter by name, subject or description
        #[arg(long, value_name = "TERM")]
        search: Option<String>,
        /// Hide a sample entry from this listing (repeatable)
        #[arg(long, value_name = "ID")]
        hide: Vec<String>,
    },
    /// List conversations you can open
    Conversations {
        #[arg(long)]
        refresh: bool,
    },
    /// Show a conversation and optionally post a message to it
    Chat {
        #[command(flatten)]
        target: ChatTarget,
        /// Message to send after the history is shown
        message: Option<String>,
    },
    /// Join, leave or delete a study group
    Group {
        #[command(subcommand)]
        action: MembershipArg,
    },
    /// Join, leave or delete a channel
    Channel {
        #[command(subcommand)]
        action: MembershipArg,
    },
    /// Upload a study document (PDF, TXT, MD) or, with --avatar, a profile picture
    Upload {
        path: PathBuf,
        #[arg(long)]
        avatar: bool,
    },
    /// List your study material
    List {
        #[arg(value_enum)]
        kind: ResourceArg,
    },
}

#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct ChatTarget {
    /// The AI study assistant
    #[arg(long)]
    pub ai: bool,
    #[arg(long, value_name = "ID")]
    pub group: Option<String>,
    #[arg(long, value_name = "ID")]
    pub channel: Option<String>,
}

impl ChatTarget {
    pub fn conversation(&self) -> ConversationRef {
        match (&self.group, &self.channel) {
            (Some(id), _) => ConversationRef::study_group(id.clone()),
            (None, Some(id)) => ConversationRef::channel(id.clone()),
            (None, None) => ConversationRef::ai(),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum MembershipArg {
    Join { id: String },
    Leave { id: String },
    Delete { id: String },
}

impl MembershipArg {
    pub fn into_command(self, kind: CommunityKind) -> MembershipCommand {
        let (action, id) = match self {
            Self::Join { id } => (MembershipAction::Join, id),
            Self::Leave { id } => (MembershipAction::Leave, id),
            Self::Delete { id } => (MembershipAction::Delete, id),
        };
        MembershipCommand { kind, id, action }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResourceArg {
    Notes,
    Quizzes,
    Flashcards,
    Documents,
}

impl From<ResourceArg> for ResourceKind {
    fn from(arg: ResourceArg) -> Self {
        match arg {
            ResourceArg::Notes => Self::Notes,
            ResourceArg::Quizzes => Self::Quizzes,
            ResourceArg::Flashcards => Self::Flashcards,
            ResourceArg::Documents => Self::Documents,
        }
    }
}

impl Cli {
    pub fn command_or_default(&self) -> Command {
        self.command.clone().unwrap_or(Command::Feed {
            refresh: false,
            search: None,
            hide: Vec::new(),
        })
    }
}
