//! Projection of book-level chapter marks onto individual files.

use bc_core::ChapterMark;

/// Chapters that apply to the file spanning `[offset, offset + duration)`,
/// with starts made relative to the file.
///
/// When the file begins inside a chapter, that chapter is repeated at 0 so
/// every item opens with a title.
pub fn chapters_for_file(
    chapters: &[ChapterMark],
    offset: f64,
    duration: f64,
) -> Vec<ChapterMark> {
    if duration <= 0.0 {
        return Vec::new();
    }
    let end = offset + duration;

    let mut projected = Vec::new();
    if let Some(open) = chapters.iter().rev().find(|c| c.start <= offset) {
        projected.push(ChapterMark::new(0.0, open.title.clone()));
    }
    for chapter in chapters.iter().filter(|c| c.start > offset && c.start < end) {
        projected.push(ChapterMark::new(chapter.start - offset, chapter.title.clone()));
    }
    projected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marks() -> Vec<ChapterMark> {
        vec![
            ChapterMark::new(0.0, "Intro"),
            ChapterMark::new(50.0, "One"),
            ChapterMark::new(130.0, "Two"),
        ]
    }

    #[test]
    fn first_file() {
        let got = chapters_for_file(&marks(), 0.0, 100.0);
        assert_eq!(
            got,
            vec![ChapterMark::new(0.0, "Intro"), ChapterMark::new(50.0, "One")]
        );
    }

    #[test]
    fn file_starting_mid_chapter() {
        let got = chapters_for_file(&marks(), 100.0, 100.0);
        assert_eq!(
            got,
            vec![ChapterMark::new(0.0, "One"), ChapterMark::new(30.0, "Two")]
        );
    }

    #[test]
    fn chapter_on_file_boundary() {
        let got = chapters_for_file(&marks(), 50.0, 80.0);
        assert_eq!(got, vec![ChapterMark::new(0.0, "One")]);
    }

    #[test]
    fn book_chapters_starting_late() {
        let late = vec![ChapterMark::new(10.0, "Late")];
        assert_eq!(
            chapters_for_file(&late, 0.0, 60.0),
            vec![ChapterMark::new(10.0, "Late")]
        );
    }

    #[test]
    fn zero_length_file() {
        assert!(chapters_for_file(&marks(), 10.0, 0.0).is_empty());
        assert!(chapters_for_file(&[], 0.0, 10.0).is_empty());
    }
}
