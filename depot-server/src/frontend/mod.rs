//! # Web Frontend
//!
//! Server-rendered pages built with askama templates from `templates/`.

pub mod helpers;

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::Html,
    routing::get,
    Router,
};
use chrono::Utc;
use depot_core::{index, Indexer, Store};
use serde::Deserialize;
use tracing::warn;

use crate::db::{crates, CrateRecord};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use helpers::{format_count, humanize_datetime, page_count};

const HOME_LIST_SIZE: i64 = 10;
const PAGE_SIZE: i64 = 15;
/// Highest page number taken from a query string.
const MAX_PAGE: i64 = 100_000;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/crates/{name}", get(crate_page))
        .route("/search", get(search))
        .route("/most-downloaded", get(most_downloaded))
}

/// Instance details shown in every page header.
#[derive(Clone)]
struct Instance {
    title: String,
    description: String,
}

impl Instance {
    fn from_state(state: &AppState) -> Self {
        Self {
            title: state.config.frontend.title.clone(),
            description: state.config.frontend.description.clone(),
        }
    }
}

/// A crate in a listing.
struct CrateSummary {
    name: String,
    description: String,
    downloads: String,
    updated: String,
}

impl CrateSummary {
    fn new(krate: CrateRecord, now: chrono::DateTime<Utc>) -> Self {
        Self {
            name: krate.name,
            description: krate.description.unwrap_or_default(),
            downloads: format_count(krate.downloads),
            updated: humanize_datetime(krate.updated_at, now),
        }
    }
}

/// Links to the neighbouring pages; `0` means there is none.
struct Pagination {
    page: i64,
    pages: i64,
    prev: i64,
    next: i64,
}

/// Requested page, clamped to `1..=MAX_PAGE`, with the offset of its first row.
fn page_window(page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    (page, (page - 1) * PAGE_SIZE)
}

impl Pagination {
    fn new(page: i64, total: i64) -> Self {
        let pages = page_count(total, PAGE_SIZE);
        Self {
            page,
            pages,
            prev: if page > 1 { page - 1 } else { 0 },
            next: if page < pages { page + 1 } else { 0 },
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    instance: Instance,
    crate_count: String,
    total_downloads: String,
    most_downloaded: Vec<CrateSummary>,
    last_updated: Vec<CrateSummary>,
}

#[derive(Template)]
#[template(path = "crate.html")]
struct CrateTemplate {
    instance: Instance,
    name: String,
    description: String,
    documentation: String,
    homepage: String,
    repository: String,
    latest: String,
    downloads: String,
    created: String,
    updated: String,
    versions: Vec<VersionRow>,
    owners: Vec<String>,
    keywords: Vec<String>,
    categories: Vec<String>,
    readme: String,
}

struct VersionRow {
    vers: String,
    yanked: bool,
}

#[derive(Template)]
#[template(path = "search.html")]
struct SearchTemplate {
    instance: Instance,
    query: String,
    total: String,
    results: Vec<CrateSummary>,
    pagination: Pagination,
}

#[derive(Template)]
#[template(path = "most_downloaded.html")]
struct MostDownloadedTemplate {
    instance: Instance,
    results: Vec<CrateSummary>,
    pagination: Pagination,
}

fn render<T: Template>(template: T) -> AppResult<Html<String>> {
    let html = template
        .render()
        .map_err(|e| AppError::InternalError(format!("failed to render template: {e}")))?;
    Ok(Html(html))
}

/// Render the home page with registry statistics
async fn home(State(state): State<AppState>) -> AppResult<Html<String>> {
    let template = state
        .blocking(|state| {
            let conn = state.db.lock();
            let now = Utc::now();
            let summarize = |list: Vec<CrateRecord>| -> Vec<CrateSummary> {
                list.into_iter().map(|k| CrateSummary::new(k, now)).collect()
            };

            Ok(IndexTemplate {
                instance: Instance::from_state(state),
                crate_count: format_count(crates::count(&conn)?),
                total_downloads: format_count(crates::total_downloads(&conn)?),
                most_downloaded: summarize(crates::most_downloaded(&conn, HOME_LIST_SIZE, 0)?),
                last_updated: summarize(crates::recently_updated(&conn, HOME_LIST_SIZE)?),
            })
        })
        .await?;

    render(template)
}

/// Render the details of one crate
async fn crate_page(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Html<String>> {
    let template = state
        .blocking(move |state| {
            let (krate, owners, keywords, categories) = {
                let conn = state.db.lock();
                let krate = crates::find_by_canon_name(&conn, &name)?.ok_or_else(|| {
                    AppError::NotFound(format!("no crate named '{name}' found"))
                })?;
                let owners: Vec<String> = crates::owners(&conn, krate.id)?
                    .into_iter()
                    .map(|author| author.name)
                    .collect();
                let keywords = crates::get_keywords(&conn, krate.id)?;
                let categories = crates::get_categories(&conn, krate.id)?;
                (krate, owners, keywords, categories)
            };

            let mut records = state.index.all_records(&krate.name)?;
            records.sort_by(|a, b| b.vers.cmp(&a.vers));
            let latest = index::select_latest(&krate.name, records.clone())?;

            let readme = match state.storage.get_readme(&krate.name, &latest.vers) {
                Ok(readme) => readme,
                Err(e) if e.is_not_found() => String::new(),
                Err(e) => {
                    warn!(name = %krate.name, error = %e, "Failed to load README");
                    String::new()
                }
            };

            let now = Utc::now();
            Ok(CrateTemplate {
                instance: Instance::from_state(state),
                description: krate.description.unwrap_or_default(),
                documentation: krate.documentation.unwrap_or_default(),
                homepage: krate.homepage.unwrap_or_default(),
                repository: krate.repository.unwrap_or_default(),
                latest: latest.vers.to_string(),
                downloads: format_count(krate.downloads),
                created: humanize_datetime(krate.created_at, now),
                updated: humanize_datetime(krate.updated_at, now),
                versions: records
                    .into_iter()
                    .map(|record| VersionRow {
                        vers: record.vers.to_string(),
                        yanked: record.yanked,
                    })
                    .collect(),
                name: krate.name,
                owners,
                keywords,
                categories,
                readme,
            })
        })
        .await?;

    render(template)
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
    page: Option<i64>,
}

/// Render paginated search results
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Html<String>> {
    let query = params.q.unwrap_or_default().trim().to_string();
    let (page, offset) = page_window(params.page);

    let template = state
        .blocking(move |state| {
            let (found, total) = if query.is_empty() {
                (Vec::new(), 0)
            } else {
                crates::search(&state.db.lock(), &query, PAGE_SIZE, offset)?
            };

            let now = Utc::now();
            Ok(SearchTemplate {
                instance: Instance::from_state(state),
                total: format_count(total),
                results: found.into_iter().map(|k| CrateSummary::new(k, now)).collect(),
                pagination: Pagination::new(page, total),
                query,
            })
        })
        .await?;

    render(template)
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<i64>,
}

/// Render the download ranking
async fn most_downloaded(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> AppResult<Html<String>> {
    let (page, offset) = page_window(params.page);

    let template = state
        .blocking(move |state| {
            let conn = state.db.lock();
            let total = crates::count(&conn)?;
            let found = crates::most_downloaded(&conn, PAGE_SIZE, offset)?;

            let now = Utc::now();
            Ok(MostDownloadedTemplate {
                instance: Instance::from_state(state),
                results: found.into_iter().map(|k| CrateSummary::new(k, now)).collect(),
                pagination: Pagination::new(page, total),
            })
        })
        .await?;

    render(template)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let first = Pagination::new(1, 40);
        assert_eq!((first.pages, first.prev, first.next), (3, 0, 2));

        let last = Pagination::new(3, 40);
        assert_eq!((last.prev, last.next), (2, 0));

        let empty = Pagination::new(1, 0);
        assert_eq!((empty.pages, empty.prev, empty.next), (1, 0, 0));
    }

    #[test]
    fn test_page_window() {
        assert_eq!(page_window(None), (1, 0));
        assert_eq!(page_window(Some(3)), (3, 2 * PAGE_SIZE));
        assert_eq!(page_window(Some(-4)), (1, 0));
        assert_eq!(
            page_window(Some(i64::MAX)),
            (MAX_PAGE, (MAX_PAGE - 1) * PAGE_SIZE)
        );
    }
}
