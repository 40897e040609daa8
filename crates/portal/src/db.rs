use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use kv_store::KvStore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;
use uxlab_core_types::ParticipantId;

use crate::errors::PortalError;
use crate::identity::Identity;
use crate::journal::StudyJournal;

pub const DB_KEY: &str = "portal_db_v1";
pub const LAST_SUBMISSION_KEY: &str = "last_submission_id";

const FALLBACK_FILE_NAME: &str = "SampleFile.pdf";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub title: String,
    pub due: DateTime<Utc>,
    pub desc: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub assignment_id: String,
    pub study_id: ParticipantId,
    #[serde(default)]
    pub nickname: String,
    pub file_name: String,
    pub file_size: u64,
    #[serde(default)]
    pub comments: String,
    pub created_at: DateTime<Utc>,
    pub version: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub submission_id: String,
    pub score: u32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Simulated upload captured from the submit form.
#[derive(Clone, Debug)]
pub struct SubmittedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct NewSubmission {
    pub assignment_id: String,
    pub file: Option<SubmittedFile>,
    pub comments: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct DbState {
    assignments: Vec<Assignment>,
    submissions: Vec<Submission>,
    feedbacks: Vec<Feedback>,
}

/// The participant-visible study database: assignments, versioned
/// submissions, and simulated grading feedback, all under one storage key.
#[derive(Clone)]
pub struct PortalDb {
    store: Arc<dyn KvStore>,
    journal: StudyJournal,
}

impl PortalDb {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        let journal = StudyJournal::new(Arc::clone(&store));
        Self { store, journal }
    }

    pub fn journal(&self) -> &StudyJournal {
        &self.journal
    }

    /// Seeds the single homework assignment on first use.
    pub fn seed_if_empty(&self) {
        let mut db = self.load();
        if db.assignments.is_empty() {
            db.assignments.push(Assignment {
                id: "hw1".into(),
                title: "HW1: Basic Programming Exercise".into(),
                due: Utc::now() + Duration::days(7),
                desc: "Upload PDF or ZIP and write instructions in the notes.".into(),
            });
            self.save(&db);
        }
    }

    pub fn assignments(&self) -> Vec<Assignment> {
        self.load().assignments
    }

    pub fn assignment(&self, id: &str) -> Option<Assignment> {
        self.load().assignments.into_iter().find(|a| a.id == id)
    }

    /// Records a submission for the participant, counting a new version per
    /// assignment. The file is optional; only its name and byte size are
    /// retained.
    pub fn create_submission(
        &self,
        identity: &Identity,
        new: NewSubmission,
    ) -> Result<Submission, PortalError> {
        let mut db = self.load();
        if !db.assignments.iter().any(|a| a.id == new.assignment_id) {
            return Err(PortalError::UnknownAssignment(new.assignment_id));
        }
        let version = db
            .submissions
            .iter()
            .filter(|s| s.assignment_id == new.assignment_id && s.study_id == identity.study_id)
            .count() as u32
            + 1;
        let (file_name, file_size) = match new.file {
            Some(file) => (file.name, file.bytes.len() as u64),
            None => (FALLBACK_FILE_NAME.to_string(), 0),
        };
        let submission = Submission {
            id: uid("sub"),
            assignment_id: new.assignment_id,
            study_id: identity.study_id.clone(),
            nickname: identity.nickname.clone(),
            file_name,
            file_size,
            comments: new.comments,
            created_at: Utc::now(),
            version,
        };
        db.submissions.push(submission.clone());
        self.save(&db);
        if let Err(err) = self.store.set(LAST_SUBMISSION_KEY, &submission.id) {
            warn!(%err, "last submission pointer not persisted");
        }
        self.journal.log(
            "submission_succeeded",
            json!({
                "assignment_id": submission.assignment_id,
                "submission_id": submission.id,
                "version": submission.version,
                "file_name": submission.file_name,
            }),
        );
        Ok(submission)
    }

    pub fn submission(&self, id: &str) -> Option<Submission> {
        self.load().submissions.into_iter().find(|s| s.id == id)
    }

    pub fn latest_submission(&self) -> Option<Submission> {
        let id = self.store.get(LAST_SUBMISSION_KEY)?;
        self.submission(&id)
    }

    /// The participant's submissions for one assignment, newest first.
    pub fn submissions_for(
        &self,
        assignment_id: &str,
        study_id: &ParticipantId,
    ) -> Vec<Submission> {
        let mut mine: Vec<Submission> = self
            .load()
            .submissions
            .into_iter()
            .filter(|s| s.assignment_id == assignment_id && &s.study_id == study_id)
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        mine
    }

    /// All of the participant's submissions across assignments, newest first.
    pub fn submissions_by(&self, study_id: &ParticipantId) -> Vec<Submission> {
        let mut mine: Vec<Submission> = self
            .load()
            .submissions
            .into_iter()
            .filter(|s| &s.study_id == study_id)
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        mine
    }

    pub fn feedback_for(&self, submission_id: &str) -> Option<Feedback> {
        self.load()
            .feedbacks
            .into_iter()
            .find(|f| f.submission_id == submission_id)
    }

    /// Simulated grading: deterministic score by assignment title, fixed
    /// marker note, no real assessment. Idempotent per submission.
    pub fn grade(&self, submission_id: &str) -> Result<Feedback, PortalError> {
        if let Some(existing) = self.feedback_for(submission_id) {
            return Ok(existing);
        }
        let mut db = self.load();
        let submission = db
            .submissions
            .iter()
            .find(|s| s.id == submission_id)
            .cloned()
            .ok_or_else(|| PortalError::UnknownSubmission(submission_id.to_string()))?;
        let title = db
            .assignments
            .iter()
            .find(|a| a.id == submission.assignment_id)
            .map(|a| a.title.clone())
            .unwrap_or_default();
        let score = if title.to_lowercase().contains("lab") {
            66
        } else {
            78
        };
        let feedback = Feedback {
            id: uid("fb"),
            submission_id: submission.id.clone(),
            score,
            comment: "Simulated feedback for the study (no real grading).".into(),
            created_at: Utc::now(),
        };
        db.feedbacks.push(feedback.clone());
        self.save(&db);
        self.journal.log(
            "feedback_created",
            json!({
                "submission_id": feedback.submission_id,
                "score": feedback.score,
            }),
        );
        Ok(feedback)
    }

    fn load(&self) -> DbState {
        let raw = match self.store.get(DB_KEY) {
            Some(raw) => raw,
            None => return DbState::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(db) => db,
            Err(err) => {
                warn!(%err, "portal db unreadable; starting empty");
                DbState::default()
            }
        }
    }

    fn save(&self, db: &DbState) {
        match serde_json::to_string(db) {
            Ok(raw) => {
                if let Err(err) = self.store.set(DB_KEY, &raw) {
                    warn!(%err, "portal db persistence failed");
                }
            }
            Err(err) => warn!(%err, "portal db serialization failed"),
        }
    }
}

fn uid(prefix: &str) -> String {
    let tail = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &tail[..7])
}

#[cfg(test)]
mod tests {
    use super::*;

    use kv_store::MemoryStore;
    use crate::identity::IdentityStore;

    fn setup() -> (PortalDb, Identity) {
        let store = MemoryStore::new();
        let db = PortalDb::new(store.clone());
        db.seed_if_empty();
        let identity = IdentityStore::new(store).ensure();
        (db, identity)
    }

    fn submit(db: &PortalDb, identity: &Identity) -> Submission {
        db.create_submission(
            identity,
            NewSubmission {
                assignment_id: "hw1".into(),
                file: Some(SubmittedFile {
                    name: "solution.pdf".into(),
                    bytes: vec![0u8; 2048],
                }),
                comments: "see notes".into(),
            },
        )
        .unwrap()
    }

    #[test]
    fn seed_is_idempotent() {
        let (db, _) = setup();
        db.seed_if_empty();
        assert_eq!(db.assignments().len(), 1);
        assert_eq!(db.assignments()[0].id, "hw1");
    }

    #[test]
    fn versions_count_per_participant_and_assignment() {
        let (db, identity) = setup();
        assert_eq!(submit(&db, &identity).version, 1);
        assert_eq!(submit(&db, &identity).version, 2);

        let other = Identity {
            study_id: ParticipantId("P9998".into()),
            nickname: String::new(),
            created_at: Utc::now(),
        };
        assert_eq!(submit(&db, &other).version, 1);
    }

    #[test]
    fn latest_submission_follows_the_pointer() {
        let (db, identity) = setup();
        submit(&db, &identity);
        let second = submit(&db, &identity);
        assert_eq!(db.latest_submission().unwrap().id, second.id);
    }

    #[test]
    fn missing_file_falls_back_to_sample_name() {
        let (db, identity) = setup();
        let sub = db
            .create_submission(
                &identity,
                NewSubmission {
                    assignment_id: "hw1".into(),
                    file: None,
                    comments: String::new(),
                },
            )
            .unwrap();
        assert_eq!(sub.file_name, FALLBACK_FILE_NAME);
        assert_eq!(sub.file_size, 0);
    }

    #[test]
    fn unknown_assignment_is_rejected() {
        let (db, identity) = setup();
        let err = db
            .create_submission(
                &identity,
                NewSubmission {
                    assignment_id: "hw999".into(),
                    file: None,
                    comments: String::new(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, PortalError::UnknownAssignment(_)));
    }

    #[test]
    fn grading_is_deterministic_and_idempotent() {
        let (db, identity) = setup();
        let sub = submit(&db, &identity);
        let first = db.grade(&sub.id).unwrap();
        assert_eq!(first.score, 78);
        let second = db.grade(&sub.id).unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn lab_assignments_score_lower() {
        let store = MemoryStore::new();
        let db = PortalDb::new(store.clone());
        db.seed_if_empty();
        // Second assignment with a lab title.
        let mut state = db.load();
        state.assignments.push(Assignment {
            id: "lab1".into(),
            title: "Lab 1: Pointers".into(),
            due: Utc::now() + Duration::days(7),
            desc: String::new(),
        });
        db.save(&state);

        let identity = IdentityStore::new(store).ensure();
        let sub = db
            .create_submission(
                &identity,
                NewSubmission {
                    assignment_id: "lab1".into(),
                    file: None,
                    comments: String::new(),
                },
            )
            .unwrap();
        assert_eq!(db.grade(&sub.id).unwrap().score, 66);
    }

    #[test]
    fn submissions_sort_newest_first() {
        let (db, identity) = setup();
        let first = submit(&db, &identity);
        let second = submit(&db, &identity);
        let mine = db.submissions_for("hw1", &identity.study_id);
        assert_eq!(mine.len(), 2);
        // Same-timestamp entries may tie; versions must still both be there.
        let ids: Vec<&str> = mine.iter().map(|s| s.id.as_str()).collect();
        assert!(ids.contains(&first.id.as_str()));
        assert!(ids.contains(&second.id.as_str()));
    }

    #[test]
    fn corrupt_db_reads_as_empty() {
        let store = MemoryStore::new();
        store.set(DB_KEY, "truncated{").unwrap();
        let db = PortalDb::new(store);
        assert!(db.assignments().is_empty());
    }
}
