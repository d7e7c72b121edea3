use super::print::{print_books, print_messages, print_sections, print_stats};
use super::setup::{BookCommand, CategoryCommand, Cli, Commands, FolderCommand, FolderTarget};
use clap::Parser;
use readshelf::api::Library;
use readshelf::clock::SystemClock;
use readshelf::commands::delete::CategoryDeleteMode;
use readshelf::commands::Message;
use readshelf::config::ShelfConfig;
use readshelf::error::{Result, ShelfError};
use readshelf::layout::LayoutStore;
use readshelf::model::FolderPatch;
use readshelf::store::fs_backend::FsBackend;
use readshelf::store::local::LocalStore;
use readshelf::store::remote::RemoteStore;
use readshelf::store::{BackendMode, LibraryStore};
use readshelf::upload::UploadFile;
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

type Shelf<S> = Library<S, FsBackend>;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ShelfConfig::load(cli.config.as_deref())?;
    let data_dir = config.data_dir()?;
    debug!(data_dir = %data_dir.display(), "using data directory");

    let layout_store = LayoutStore::new(FsBackend::new(&data_dir));
    let clock = Box::new(SystemClock);
    let command = cli.command.unwrap_or(Commands::List);

    match (config.effective_mode(), config.remote_settings()) {
        (BackendMode::Cloud, Some(settings)) => {
            let lib = Library::open_with(
                RemoteStore::new(settings),
                layout_store,
                clock,
                config.grace_period_ms,
            );
            run_session(lib, command)
        }
        _ => {
            let store = LocalStore::with_backend(FsBackend::new(&data_dir));
            let lib = Library::open_with(store, layout_store, clock, config.grace_period_ms);
            run_session(lib, command)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "readshelf=debug"
    } else {
        "readshelf=warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// One CLI invocation is one session: pending deletions cannot outlive the
/// process, so they are finalized before it exits.
fn run_session<S: LibraryStore>(mut lib: Shelf<S>, command: Commands) -> Result<()> {
    print_messages(&lib.take_messages());
    let result = dispatch(&mut lib, command);
    lib.flush();
    print_messages(&lib.take_messages());
    result
}

fn dispatch<S: LibraryStore>(lib: &mut Shelf<S>, command: Commands) -> Result<()> {
    match command {
        Commands::List => {
            handle_list(lib);
            Ok(())
        }
        Commands::Books { folder } => handle_books(lib, &folder),
        Commands::Stats => {
            print_stats(&lib.stats());
            Ok(())
        }
        Commands::Folder(cmd) => handle_folder(lib, cmd),
        Commands::Category(cmd) => handle_category(lib, cmd),
        Commands::Book(cmd) => handle_book(lib, cmd),
    }
}

fn handle_list<S: LibraryStore>(lib: &Shelf<S>) {
    let sections = lib.sections();
    let books = lib.books();
    print_sections(&sections, |folder| {
        books.iter().filter(|b| b.folder_id == folder.id).count()
    });
}

fn handle_books<S: LibraryStore>(lib: &Shelf<S>, folder: &str) -> Result<()> {
    let id = lib.find_folder(folder)?;
    print_books(&lib.books_in_folder(&id)?);
    Ok(())
}

fn handle_folder<S: LibraryStore>(lib: &mut Shelf<S>, cmd: FolderCommand) -> Result<()> {
    match cmd {
        FolderCommand::Add {
            name,
            description,
            category,
        } => {
            let category_id = category.map(|c| lib.find_category(&c)).transpose()?;
            lib.create_folder(&name, description.as_deref(), category_id)?;
        }
        FolderCommand::Rename { folder, name } => {
            let id = lib.find_folder(&folder)?;
            lib.update_folder(
                &id,
                FolderPatch {
                    name: Some(name),
                    ..Default::default()
                },
            )?;
        }
        FolderCommand::Describe {
            folder,
            description,
        } => {
            let id = lib.find_folder(&folder)?;
            lib.update_folder(
                &id,
                FolderPatch {
                    description: Some(description),
                    ..Default::default()
                },
            )?;
        }
        FolderCommand::Mv {
            folder,
            position,
            target,
        } => {
            let id = lib.find_folder(&folder)?;
            let category_id = folder_target(lib, &id, target)?;
            report_move(lib.move_folder(&id, category_id, to_index(position))?);
        }
        FolderCommand::Rm { folder } => {
            let id = lib.find_folder(&folder)?;
            lib.delete_folder(&id)?;
        }
    }
    Ok(())
}

/// Category a folder move lands in. Without flags the folder stays where it
/// is and only its position changes.
fn folder_target<S: LibraryStore>(
    lib: &Shelf<S>,
    id: &Uuid,
    target: FolderTarget,
) -> Result<Option<Uuid>> {
    if target.uncategorized {
        return Ok(None);
    }
    if let Some(category) = target.category {
        return lib.find_category(&category).map(Some);
    }
    lib.sections()
        .locate_folder(id)
        .map(|(container, _)| container.category_id())
        .ok_or_else(|| ShelfError::Api("Folder is not on the shelf".to_string()))
}

fn handle_category<S: LibraryStore>(lib: &mut Shelf<S>, cmd: CategoryCommand) -> Result<()> {
    match cmd {
        CategoryCommand::Add { name } => {
            lib.create_category(&name)?;
        }
        CategoryCommand::Rename { category, name } => {
            let id = lib.find_category(&category)?;
            lib.rename_category(&id, &name)?;
        }
        CategoryCommand::Mv { category, position } => {
            let id = lib.find_category(&category)?;
            report_move(lib.move_category(&id, to_index(position))?);
        }
        CategoryCommand::Rm { category, cascade } => {
            let id = lib.find_category(&category)?;
            let mode = if cascade {
                CategoryDeleteMode::Cascade
            } else {
                CategoryDeleteMode::MoveToUncategorized
            };
            lib.delete_category(&id, mode)?;
        }
    }
    Ok(())
}

fn handle_book<S: LibraryStore>(lib: &mut Shelf<S>, cmd: BookCommand) -> Result<()> {
    match cmd {
        BookCommand::Add {
            folder,
            files,
            title,
        } => {
            let folder_id = lib.find_folder(&folder)?;
            let uploads = files
                .iter()
                .map(|path| UploadFile::from_path(path))
                .collect::<Result<Vec<_>>>()?;
            match (title, uploads.as_slice()) {
                (Some(title), [file]) => {
                    lib.upload_book(&folder_id, file, &title)?;
                }
                (Some(_), _) => {
                    return Err(ShelfError::Api(
                        "--title only applies to a single file".to_string(),
                    ))
                }
                (None, _) => {
                    lib.upload_books(&folder_id, &uploads)?;
                }
            }
        }
        BookCommand::Rename { book, title } => {
            let id = lib.find_book(&book)?;
            lib.rename_book(&id, &title)?;
        }
        BookCommand::Read { book } => {
            let id = lib.find_book(&book)?;
            lib.set_book_read(&id, true)?;
        }
        BookCommand::Unread { book } => {
            let id = lib.find_book(&book)?;
            lib.set_book_read(&id, false)?;
        }
        BookCommand::Progress { book, page, of } => {
            let id = lib.find_book(&book)?;
            let total = match of {
                Some(total) => total,
                None => lib.book(&id)?.total_pages,
            };
            lib.update_progress(&id, page, total)?;
        }
        BookCommand::Mv {
            book,
            position,
            folder,
        } => {
            let id = lib.find_book(&book)?;
            let folder_id = match folder {
                Some(folder) => lib.find_folder(&folder)?,
                None => lib.book(&id)?.folder_id,
            };
            report_move(lib.move_book(&id, &folder_id, to_index(position))?);
        }
        BookCommand::Rm { book } => {
            let id = lib.find_book(&book)?;
            lib.delete_book(&id)?;
        }
        BookCommand::Url { book } => {
            let id = lib.find_book(&book)?;
            if let Some(url) = lib.resolve_book_url(&id)? {
                println!("{}", url);
            }
        }
    }
    Ok(())
}

/// Positions on the command line are 1-based.
fn to_index(position: usize) -> usize {
    position.saturating_sub(1)
}

fn report_move(moved: bool) {
    if !moved {
        print_messages(&[Message::info("Nothing to move")]);
    }
}
