use acadrive_app::UiEvent;
use acadrive_contract::{FileRecord, Stats};
use acadrive_format::{escape_html, format_date, human_size, icon_for};

/// One file per line for terminal output.
pub fn files_text(records: &[FileRecord]) -> String {
    if records.is_empty() {
        return "No files found. Try a different search.".to_string();
    }
    records
        .iter()
        .map(file_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn file_line(record: &FileRecord) -> String {
    format!(
        "{} {}  [{}]  {}  {}",
        icon_for(&record.filename),
        record.filename,
        record.subject,
        human_size(record.file_size),
        format_date(record.created_at.as_deref()),
    )
}

/// Escaped HTML cards for embedding in a page. Every server-provided string
/// goes through `escape_html` before insertion.
pub fn files_html(records: &[FileRecord]) -> String {
    if records.is_empty() {
        return r#"<p class="empty-state">No files found. Try a different search.</p>"#.to_string();
    }
    let mut html = String::from("<ul class=\"file-list\">\n");
    for record in records {
        html.push_str(&format!(
            concat!(
                "  <li class=\"file-card\">",
                "<span class=\"file-icon\">{icon}</span>",
                "<a class=\"file-name\" href=\"{url}\">{name}</a>",
                "<span class=\"file-subject\">{subject}</span>",
                "<span class=\"file-meta\">{size} · {date}</span>",
                "</li>\n"
            ),
            icon = icon_for(&record.filename),
            url = escape_html(&record.file_url),
            name = escape_html(&record.filename),
            subject = escape_html(&record.subject),
            size = human_size(record.file_size),
            date = format_date(record.created_at.as_deref()),
        ));
    }
    html.push_str("</ul>");
    html
}

pub fn stats_text(stats: &Stats) -> String {
    format!(
        "files: {}  subjects: {}  active users: {}",
        stats.total_files, stats.total_subjects, stats.active_users
    )
}

/// Terminal line for a bus event; `None` for events this surface ignores.
pub fn event_line(event: &UiEvent) -> Option<String> {
    match event {
        UiEvent::ValidationFailed { message } => Some(format!("! {message}")),
        UiEvent::UploadStarted { filename, .. } => Some(format!("uploading {filename}... 0%")),
        UiEvent::UploadProgress { percent, .. } => Some(format!("uploading... {percent}%")),
        UiEvent::UploadSucceeded { record, .. } => {
            Some(format!("uploaded {} ✓", record.filename))
        }
        UiEvent::UploadFailed { message, .. } => Some(format!("upload failed: {message}")),
        UiEvent::ProgressHidden { .. } => None,
        UiEvent::RecentRefreshStarted => Some("refreshing recent files...".to_string()),
        UiEvent::RecentFilesUpdated { count } => Some(format!("recent files: {count}")),
        UiEvent::RecentFilesFailed { message } => {
            Some(format!("could not load recent files: {message}"))
        }
        UiEvent::StatsUpdated { stats } => Some(stats_text(stats)),
        UiEvent::SearchStarted { query } => Some(format!("searching \"{query}\"...")),
        UiEvent::SearchResultsUpdated { query, count } => {
            Some(format!("{count} result(s) for \"{query}\""))
        }
        UiEvent::SearchFailed { message, .. } => {
            Some(format!("search failed: {message} — try again"))
        }
        UiEvent::SearchCleared => Some("search cleared".to_string()),
    }
}
