use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.1" for releases, "0.3.1@abc1234 2024-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "readshelf", bin_name = "readshelf", version = get_version())]
#[command(about = "Personal PDF library: folders, categories and reading progress", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file to use instead of the default one
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show folders grouped by category
    #[command(alias = "ls")]
    List,

    /// Show the books of a folder in reading order
    Books {
        /// Folder name or id prefix
        folder: String,
    },

    /// Reading statistics
    Stats,

    /// Manage folders
    #[command(subcommand)]
    Folder(FolderCommand),

    /// Manage categories
    #[command(subcommand, alias = "cat")]
    Category(CategoryCommand),

    /// Manage books
    #[command(subcommand)]
    Book(BookCommand),
}

#[derive(Subcommand, Debug)]
pub enum FolderCommand {
    /// Create a folder
    Add {
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Category to place the folder in
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Rename a folder
    Rename { folder: String, name: String },

    /// Set or clear (with no text) the description
    Describe {
        folder: String,
        description: Option<String>,
    },

    /// Move a folder to a 1-based position
    #[command(alias = "move")]
    Mv {
        folder: String,
        position: usize,

        #[command(flatten)]
        target: FolderTarget,
    },

    /// Delete a folder and its books
    #[command(alias = "delete")]
    Rm { folder: String },
}

#[derive(Args, Debug)]
#[group(multiple = false)]
pub struct FolderTarget {
    /// Move into this category
    #[arg(short, long)]
    pub category: Option<String>,

    /// Move out of any category
    #[arg(short, long)]
    pub uncategorized: bool,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    /// Create a category
    Add { name: String },

    /// Rename a category
    Rename { category: String, name: String },

    /// Move a category to a 1-based position
    #[command(alias = "move")]
    Mv { category: String, position: usize },

    /// Delete a category, keeping its folders unless --cascade is given
    #[command(alias = "delete")]
    Rm {
        category: String,

        /// Also delete every folder in the category
        #[arg(long)]
        cascade: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum BookCommand {
    /// Add PDF files to a folder
    Add {
        folder: String,

        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,

        /// Title for a single file (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Rename a book
    Rename { book: String, title: String },

    /// Mark a book as read
    Read { book: String },

    /// Mark a book as unread
    Unread { book: String },

    /// Record reading progress
    Progress {
        book: String,
        page: u32,

        /// Total page count, if not known yet
        #[arg(long)]
        of: Option<u32>,
    },

    /// Move a book to a 1-based position, optionally in another folder
    #[command(alias = "move")]
    Mv {
        book: String,
        position: usize,

        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Delete a book
    #[command(alias = "delete")]
    Rm { book: String },

    /// Print a URL for opening the book's file
    Url { book: String },
}
