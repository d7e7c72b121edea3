use chrono::{DateTime, Utc};
use colored::Colorize;
use readshelf::commands::{Message, MessageLevel};
use readshelf::model::{Book, BookState, Folder, LibraryStats};
use readshelf::ordering::Sections;
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const TIME_WIDTH: usize = 14;
const DETAIL_WIDTH: usize = 16;

pub(super) fn print_messages(messages: &[Message]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

/// Folders grouped by category. `book_count` gives the detail column.
pub(super) fn print_sections(sections: &Sections, book_count: impl Fn(&Folder) -> usize) {
    if sections.uncategorized.is_empty() && sections.categories.is_empty() {
        println!("No folders yet.");
        return;
    }

    let has_categories = !sections.categories.is_empty();
    if has_categories && !sections.uncategorized.is_empty() {
        println!("{}", "Uncategorized".bold());
    }
    print_folders(&sections.uncategorized, &book_count);

    for section in &sections.categories {
        println!();
        println!("{}", section.category.name.bold());
        if section.folders.is_empty() {
            println!("    {}", "(empty)".dimmed());
        }
        print_folders(&section.folders, &book_count);
    }
}

fn print_folders(folders: &[Folder], book_count: &impl Fn(&Folder) -> usize) {
    for (i, folder) in folders.iter().enumerate() {
        let count = book_count(folder);
        let detail = if count == 1 {
            "1 book".to_string()
        } else {
            format!("{} books", count)
        };
        let name = match &folder.description {
            Some(description) => format!("{} {}", folder.name, description.dimmed()),
            None => folder.name.clone(),
        };
        print_row(i + 1, &name, detail.normal().to_string(), folder.updated_at);
    }
}

pub(super) fn print_books(books: &[Book]) {
    if books.is_empty() {
        println!("No books in this folder.");
        return;
    }
    for (i, book) in books.iter().enumerate() {
        let detail = match book.state() {
            BookState::Read => "read".green().to_string(),
            BookState::InProgress => format!("{}%", book.progress_percent()).yellow().to_string(),
            BookState::NotStarted => "new".dimmed().to_string(),
        };
        print_row(i + 1, &book.title, detail, book.updated_at);
    }
}

pub(super) fn print_stats(stats: &LibraryStats) {
    println!("{:<14}{}", "Books", stats.total_books);
    println!("{:<14}{}", "  read", stats.read_books.to_string().green());
    println!(
        "{:<14}{}",
        "  in progress",
        stats.in_progress_books.to_string().yellow()
    );
    println!("{:<14}{}", "  unread", stats.unread_books);
    println!("{:<14}{}", "Folders", stats.total_folders);
    println!("{:<14}{}", "Categories", stats.total_categories);
    println!("{:<14}{}%", "Read", stats.read_percentage());
}

/// One numbered line: title padded to the detail and time columns.
fn print_row(index: usize, title: &str, detail: String, timestamp: DateTime<Utc>) {
    let idx_str = format!("{}. ", index);
    let left_prefix = "    ";
    let fixed_width = left_prefix.width() + idx_str.width() + DETAIL_WIDTH + TIME_WIDTH;
    let available = LINE_WIDTH.saturating_sub(fixed_width);

    let title_display = truncate_to_width(title, available);
    let padding = available.saturating_sub(title_display.width());
    let detail_padding = DETAIL_WIDTH.saturating_sub(visible_width(&detail));

    println!(
        "{}{}{}{}{}{}{}",
        left_prefix,
        idx_str,
        title_display,
        " ".repeat(padding),
        " ".repeat(detail_padding),
        detail,
        format_time_ago(timestamp).dimmed()
    );
}

/// Width of a string that may carry ANSI color codes.
fn visible_width(s: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;
    for c in s.chars() {
        match (in_escape, c) {
            (false, '\u{1b}') => in_escape = true,
            (true, 'm') => in_escape = false,
            (true, _) => {}
            (false, c) => width += c.width().unwrap_or(0),
        }
    }
    width
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let formatter = Formatter::new();
    let time_str = formatter.convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}
