//! Intake screening.

use tracing::warn;

use super::types::SourceFile;

/// Result of screening a submission.
#[derive(Debug, Default)]
pub struct Intake {
    pub accepted: Vec<SourceFile>,
    pub rejected: Vec<String>,
    pub dropped_for_capacity: usize,
}

/// Returns true if `name` ends with one of `allowed`, ignoring case.
///
/// Entries without a leading dot are treated as if they had one.
pub fn is_allowed(name: &str, allowed: &[String]) -> bool {
    let name = name.to_lowercase();
    allowed.iter().any(|ext| {
        let ext = ext.trim().to_lowercase();
        if ext.is_empty() {
            return false;
        }
        if ext.starts_with('.') {
            name.ends_with(&ext)
        } else {
            name.ends_with(&format!(".{}", ext))
        }
    })
}

/// Splits a submission into accepted and rejected files and truncates the
/// accepted list to the room left in the batch.
pub fn screen(
    files: Vec<SourceFile>,
    allowed: &[String],
    existing: usize,
    max_jobs: usize,
) -> Intake {
    let mut intake = Intake::default();
    for file in files {
        if is_allowed(&file.name, allowed) {
            intake.accepted.push(file);
        } else {
            warn!(file = %file.name, "Rejected file with unsupported extension");
            intake.rejected.push(file.name);
        }
    }

    let room = max_jobs.saturating_sub(existing);
    if intake.accepted.len() > room {
        intake.dropped_for_capacity = intake.accepted.len() - room;
        intake.accepted.truncate(room);
        warn!(
            dropped = intake.dropped_for_capacity,
            max_jobs, "Batch is full, dropping files"
        );
    }
    intake
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchConfig;

    fn allowed() -> Vec<String> {
        BatchConfig::default().allowed_extensions
    }

    fn files(names: &[&str]) -> Vec<SourceFile> {
        names
            .iter()
            .map(|n| SourceFile::new(*n, vec![0; 4]))
            .collect()
    }

    #[test]
    fn test_is_allowed_case_insensitive() {
        let allowed = allowed();
        assert!(is_allowed("song.mp3", &allowed));
        assert!(is_allowed("SONG.MP3", &allowed));
        assert!(is_allowed("voice.Amr", &allowed));
        assert!(is_allowed("legacy.wma", &allowed));
        assert!(!is_allowed("notes.txt", &allowed));
        assert!(!is_allowed("mp3", &allowed));
        assert!(!is_allowed("song.mp3.zip", &allowed));
    }

    #[test]
    fn test_is_allowed_without_leading_dot() {
        let allowed = vec!["opus".to_string(), "".to_string()];
        assert!(is_allowed("a.OPUS", &allowed));
        assert!(!is_allowed("aopus.txt", &allowed));
    }

    #[test]
    fn test_screen_mixed() {
        let intake = screen(files(&["song.mp3", "notes.txt"]), &allowed(), 0, 15);
        assert_eq!(intake.accepted.len(), 1);
        assert_eq!(intake.accepted[0].name, "song.mp3");
        assert_eq!(intake.rejected, vec!["notes.txt".to_string()]);
        assert_eq!(intake.dropped_for_capacity, 0);
    }

    #[test]
    fn test_screen_truncates_to_room() {
        let names: Vec<String> = (0..20).map(|i| format!("t{}.wav", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let intake = screen(files(&refs), &allowed(), 0, 15);
        assert_eq!(intake.accepted.len(), 15);
        assert_eq!(intake.dropped_for_capacity, 5);
        assert_eq!(intake.accepted.last().unwrap().name, "t14.wav");

        let intake = screen(files(&refs[..4]), &allowed(), 13, 15);
        assert_eq!(intake.accepted.len(), 2);
        assert_eq!(intake.dropped_for_capacity, 2);

        let intake = screen(files(&refs[..4]), &allowed(), 15, 15);
        assert!(intake.accepted.is_empty());
        assert_eq!(intake.dropped_for_capacity, 4);
    }

    #[test]
    fn test_rejections_do_not_count_against_capacity() {
        let intake = screen(files(&["a.txt", "b.doc", "c.mp3"]), &allowed(), 14, 15);
        assert_eq!(intake.accepted.len(), 1);
        assert_eq!(intake.rejected.len(), 2);
        assert_eq!(intake.dropped_for_capacity, 0);
    }
}
