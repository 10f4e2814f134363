//! The library index: every book behind one atomically swapped snapshot.
//!
//! Readers clone the current `Arc<LibrarySnapshot>` and keep it for the
//! duration of a request; they never lock across I/O and never observe a
//! half-built library. A rescan builds the next snapshot off to the side,
//! reusing unchanged books, then swaps it in.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bc_core::{Book, BookId, Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use walkdir::WalkDir;

use crate::assemble::{BookAssembler, ScanIssue};
use crate::listing::list_directory;

/// What the index remembers about one scanned directory.
#[derive(Debug, Clone)]
struct DirState {
    fingerprint: String,
    /// Files outside the listing folded into `fingerprint`.
    dependencies: Vec<PathBuf>,
    /// `None` when the directory produced no book.
    book: Option<Arc<Book>>,
}

/// An immutable point-in-time view of the library.
#[derive(Debug, Default)]
pub struct LibrarySnapshot {
    books: BTreeMap<BookId, Arc<Book>>,
    dirs: HashMap<PathBuf, DirState>,
    scanned_at: Option<DateTime<Utc>>,
}

impl LibrarySnapshot {
    /// Look up a book by id.
    pub fn book(&self, id: &BookId) -> Option<Arc<Book>> {
        self.books.get(id).cloned()
    }

    /// All books, ordered by id.
    pub fn books(&self) -> impl Iterator<Item = &Arc<Book>> {
        self.books.values()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// When this snapshot was built; `None` before the first scan.
    pub fn scanned_at(&self) -> Option<DateTime<Utc>> {
        self.scanned_at
    }
}

/// Summary of one rescan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RescanReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub books: usize,
    pub issues: Vec<ScanIssue>,
    pub duration_ms: u64,
}

/// Owns the mapping from book id to book for a set of root directories.
pub struct LibraryIndex {
    assembler: BookAssembler,
    roots: Vec<PathBuf>,
    current: RwLock<Arc<LibrarySnapshot>>,
    rescan_lock: Mutex<()>,
}

impl LibraryIndex {
    /// Create an empty index over the roots in the assembler's config.
    /// Call [`LibraryIndex::rescan`] to populate it.
    pub fn new(assembler: BookAssembler) -> Self {
        let roots = assembler.config().roots.clone();
        Self::with_roots(assembler, roots)
    }

    pub fn with_roots(assembler: BookAssembler, roots: Vec<PathBuf>) -> Self {
        Self {
            assembler,
            roots,
            current: RwLock::new(Arc::new(LibrarySnapshot::default())),
            rescan_lock: Mutex::new(()),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// The current snapshot. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<LibrarySnapshot> {
        self.current.read().clone()
    }

    /// Look up a book in the current snapshot.
    pub fn book(&self, id: &BookId) -> Option<Arc<Book>> {
        self.snapshot().book(id)
    }

    /// Whether a rescan is running right now.
    pub fn is_rescanning(&self) -> bool {
        self.rescan_lock.is_locked()
    }

    /// Walk every root and rebuild the library.
    ///
    /// Blocking; run it off the async runtime. Fails with
    /// [`Error::RescanInProgress`] when another rescan holds the lock, so
    /// concurrent requests coalesce into the running one instead of queueing.
    /// Per-directory failures never abort the rescan; they are collected in
    /// [`RescanReport::issues`].
    pub fn rescan(&self) -> Result<RescanReport> {
        let Some(_guard) = self.rescan_lock.try_lock() else {
            tracing::debug!("Rescan already running; coalescing");
            return Err(Error::RescanInProgress);
        };

        let started = Instant::now();
        let previous = self.snapshot();
        let mut report = RescanReport::default();
        let mut next = LibrarySnapshot::default();

        tracing::info!(roots = ?self.roots, "Starting library rescan");

        for dir in self.candidate_dirs(&mut report) {
            let listing = match list_directory(&dir, self.assembler.config()) {
                Ok(listing) => listing,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Cannot list directory");
                    report.issues.push(issue(&dir, &e));
                    continue;
                }
            };
            if listing.is_empty() {
                continue;
            }

            let prior = previous.dirs.get(&dir);
            let reusable = prior
                .filter(|p| listing.fingerprint_with(&p.dependencies) == p.fingerprint);
            if let Some(prior) = reusable {
                report.unchanged += usize::from(prior.book.is_some());
                next.insert(dir, prior.clone());
                continue;
            }

            let mut dependencies = Vec::new();
            let book = match self.assembler.assemble_listing(&listing) {
                Ok(assembly) => {
                    report.issues.extend(assembly.issues);
                    dependencies = assembly.dependencies;
                    if prior.and_then(|p| p.book.as_ref()).is_some() {
                        report.updated += 1;
                    } else {
                        report.added += 1;
                    }
                    Some(Arc::new(assembly.book))
                }
                Err(Error::EmptyDirectory(_)) => {
                    tracing::warn!(dir = %dir.display(), "No readable audio files");
                    report.issues.push(ScanIssue {
                        path: dir.clone(),
                        message: "no readable audio files".into(),
                    });
                    None
                }
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Failed to assemble book");
                    report.issues.push(issue(&dir, &e));
                    None
                }
            };
            let fingerprint = listing.fingerprint_with(&dependencies);
            next.insert(
                dir,
                DirState {
                    fingerprint,
                    dependencies,
                    book,
                },
            );
        }

        report.removed = previous
            .dirs
            .iter()
            .filter(|(dir, state)| {
                state.book.is_some()
                    && next.dirs.get(*dir).and_then(|s| s.book.as_ref()).is_none()
            })
            .count();
        report.books = next.books.len();
        report.duration_ms = started.elapsed().as_millis() as u64;
        next.scanned_at = Some(Utc::now());

        *self.current.write() = Arc::new(next);

        tracing::info!(
            books = report.books,
            added = report.added,
            updated = report.updated,
            unchanged = report.unchanged,
            removed = report.removed,
            issues = report.issues.len(),
            duration_ms = report.duration_ms,
            "Library rescan complete"
        );

        Ok(report)
    }

    /// Every directory under every root, roots included, in walk order.
    /// A directory reachable from several (nested or repeated) roots is
    /// listed once.
    fn candidate_dirs(&self, report: &mut RescanReport) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        let mut seen = HashSet::new();
        for root in &self.roots {
            let walker = WalkDir::new(root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));
            for entry in walker {
                match entry {
                    Ok(entry) if entry.file_type().is_dir() => {
                        let dir = entry.into_path();
                        if seen.insert(dir.clone()) {
                            dirs.push(dir);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let path = e.path().unwrap_or(root.as_path()).to_path_buf();
                        tracing::warn!(path = %path.display(), error = %e, "Walk error");
                        report.issues.push(ScanIssue {
                            path,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
        dirs
    }
}

impl LibrarySnapshot {
    fn insert(&mut self, dir: PathBuf, state: DirState) {
        if let Some(book) = &state.book {
            self.books.insert(book.id.clone(), Arc::clone(book));
        }
        self.dirs.insert(dir, state);
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn issue(path: &Path, err: &Error) -> ScanIssue {
    ScanIssue {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
