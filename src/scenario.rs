use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::Utc;
use serde_json::json;
use tracing::info;

use instrument::{Instrumenter, PageProbe, RuntimeClock, RuntimeScheduler};
use kv_store::KvStore;
use page_model::{Page, PageRuntime};
use portal::{Feedback, IdentityStore, NewSubmission, PortalDb, Submission, SubmittedFile, ThemePref};
use telemetry::{extra, PersistPolicy, Recorder, RecorderCfg};
use uxlab_core_types::{SessionId, Variant};

use crate::pages;
use crate::USER_AGENT;

/// Knobs for one scripted participant run.
#[derive(Clone, Debug)]
pub struct StudyOptions {
    pub variant: Variant,
    pub persist: PersistPolicy,
    pub prefers_dark: bool,
    pub nickname: Option<String>,
    pub file_name: String,
    pub export_dir: PathBuf,
}

impl Default for StudyOptions {
    fn default() -> Self {
        Self {
            variant: Variant::Bootstrap,
            persist: PersistPolicy::Immediate,
            prefers_dark: false,
            nickname: None,
            file_name: "solution.pdf".into(),
            export_dir: PathBuf::from("."),
        }
    }
}

/// What the scripted run produced, for the CLI to print.
pub struct StudySummary {
    pub study_id: String,
    pub sessions: Vec<SessionId>,
    pub events_recorded: usize,
    pub submission: Submission,
    pub feedback: Feedback,
    pub journal_entries: usize,
}

struct PageLoad {
    page: Page,
    runtime: PageRuntime,
    recorder: Recorder,
}

/// One simulated page load: fresh page and runtime, recorder created at
/// bootstrap, deferred init run at the first idle point, binder attached.
fn open_page(store: Arc<dyn KvStore>, opts: &StudyOptions, start_ms: u64) -> PageLoad {
    let page = Page::new();
    let runtime = PageRuntime::starting_at(start_ms);

    let theme = ThemePref::new(Arc::clone(&store));
    theme.apply(&page, theme.initial(opts.prefers_dark));

    let cfg = RecorderCfg {
        persist: opts.persist,
        export_dir: opts.export_dir.clone(),
        ..RecorderCfg::default()
    };
    let recorder = Recorder::create(
        cfg,
        RuntimeClock::new(runtime.clone()),
        RuntimeScheduler::new(runtime.clone()),
        PageProbe::new(page.clone(), USER_AGENT),
        Arc::clone(&store),
    );
    recorder.activate();
    // The page keeps the listeners alive; the binder handle itself is only
    // needed by glue that registers forms explicitly.
    Instrumenter::attach(&page, recorder.clone());
    PageLoad {
        page,
        runtime,
        recorder,
    }
}

/// Drives the full login → submit → feedback participant flow over three
/// simulated page loads sharing one store, then grades the submission.
pub fn run_study(store: Arc<dyn KvStore>, opts: &StudyOptions) -> Result<StudySummary> {
    let ids = IdentityStore::new(Arc::clone(&store));
    let db = PortalDb::new(Arc::clone(&store));
    db.seed_if_empty();

    let mut sessions = Vec::new();
    let epoch = Utc::now().timestamp_millis().max(0) as u64;

    // --- Page 1: login -------------------------------------------------
    let load = open_page(Arc::clone(&store), opts, epoch);
    let login = pages::login_page(&load.page, opts.variant);
    portal::bridge::mirror_into_journal(&load.recorder, db.journal().clone());
    load.runtime.run_until_idle();
    sessions.push(load.recorder.session());

    load.runtime.advance(180);
    load.page.focus(login.nickname);
    load.runtime.advance(900);
    if let Some(nickname) = &opts.nickname {
        load.page.set_value(login.nickname, nickname);
    }
    load.page.click(login.continue_btn);
    load.page.submit(login.form);

    let identity = ids.set_nickname(opts.nickname.as_deref().unwrap_or(""));
    db.journal().log(
        "login_succeeded",
        json!({ "study_id": identity.study_id.0 }),
    );
    info!(study_id = %identity.study_id, "participant signed in");
    load.runtime.advance(60);
    load.runtime.teardown();

    // --- Page 2: submit -------------------------------------------------
    let load = open_page(Arc::clone(&store), opts, epoch + 2_000);
    let submit = pages::submit_page(&load.page, opts.variant);
    portal::bridge::mirror_into_journal(&load.recorder, db.journal().clone());
    load.runtime.run_until_idle();
    sessions.push(load.recorder.session());

    load.runtime.advance(240);
    load.page.focus(submit.comments);
    load.runtime.advance(400);
    // First attempt forgets the required notes; native validation logs the
    // failure and keeps the task span open.
    load.page.click(submit.submit_btn);
    load.page.submit(submit.form);

    load.runtime.advance(1_500);
    load.page.set_value(submit.comments, "Instructions are in the PDF.");
    load.page.set_value(submit.file_input, &opts.file_name);
    load.page.click(submit.submit_btn);
    load.page.submit(submit.form);

    let submission = db
        .create_submission(
            &identity,
            NewSubmission {
                assignment_id: "hw1".into(),
                file: Some(SubmittedFile {
                    name: opts.file_name.clone(),
                    bytes: simulated_upload(&opts.file_name),
                }),
                comments: "Instructions are in the PDF.".into(),
            },
        )
        .context("recording the simulated submission")?;
    load.recorder.mark(
        "submission-recorded",
        extra([("version", json!(submission.version))]),
    );
    load.runtime.advance(60);
    load.runtime.teardown();

    // --- Page 3: feedback -----------------------------------------------
    let load = open_page(Arc::clone(&store), opts, epoch + 6_000);
    let feedback_page = pages::feedback_page(&load.page, opts.variant);
    portal::bridge::mirror_into_journal(&load.recorder, db.journal().clone());
    load.runtime.run_until_idle();
    sessions.push(load.recorder.session());

    let feedback = db
        .grade(&submission.id)
        .context("grading the simulated submission")?;

    load.runtime.advance(700);
    load.page.click(feedback_page.theme_btn);
    let theme = ThemePref::new(Arc::clone(&store));
    let switched = theme.toggle(&load.page);
    load.recorder
        .mark("theme-toggled", extra([("theme", json!(switched.as_str()))]));

    load.runtime.advance(300);
    load.page.click(feedback_page.export_btn);

    let events_recorded = load.recorder.events().len();
    load.runtime.advance(60);
    load.runtime.teardown();

    Ok(StudySummary {
        study_id: identity.study_id.0,
        sessions,
        events_recorded,
        submission,
        feedback,
        journal_entries: db.journal().entries().len(),
    })
}

/// Deterministic stand-in bytes for the "uploaded" file.
fn simulated_upload(file_name: &str) -> Vec<u8> {
    let mut bytes = format!("%PDF-1.4\n% simulated upload: {file_name}\n").into_bytes();
    bytes.resize(2_048, b'.');
    bytes
}
