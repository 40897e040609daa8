use std::sync::Arc;

use telemetry::Recorder;

use crate::journal::StudyJournal;

/// Mirrors every telemetry event into the business journal as a `metrics`
/// record, so one export surface can show the full study timeline.
pub fn mirror_into_journal(recorder: &Recorder, journal: StudyJournal) {
    recorder.register_post_hook(Arc::new(move |event| {
        let payload = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
        journal.log("metrics", payload);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    use kv_store::MemoryStore;
    use telemetry::{Extra, InlineScheduler, Recorder, RecorderCfg, SystemClock};

    #[test]
    fn telemetry_events_appear_in_the_journal() {
        let store = MemoryStore::new();
        let recorder = Recorder::create(
            RecorderCfg::default(),
            Arc::new(SystemClock),
            InlineScheduler::new(),
            telemetry::FixedProbe::new(telemetry::Context::default()),
            store.clone(),
        );
        recorder.activate();
        let journal = StudyJournal::new(store);
        mirror_into_journal(&recorder, journal.clone());

        recorder.click("login-continue", Extra::new());
        recorder.mark("nav", Extra::new());

        let mirrored: Vec<_> = journal
            .entries()
            .into_iter()
            .filter(|r| r.event == "metrics")
            .collect();
        assert_eq!(mirrored.len(), 2);
        assert_eq!(mirrored[0].payload["type"], serde_json::json!("click"));
        assert_eq!(mirrored[0].payload["name"], serde_json::json!("login-continue"));
    }
}
