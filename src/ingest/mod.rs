// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::assemble::{Assembler, RunState};
use crate::classify;
use crate::dedup::{self, DedupStore};
use crate::normalize::normalize;
use crate::notify::Publisher;
use crate::refine::{DynRefiner, Refined};
use crate::vocab::Vocab;
use types::{Fragment, FragmentSource, SourceKind};

/// Listing pages repeat themselves across the page; cap how many
/// events one page source may publish per run.
const PAGE_SOURCE_CAP: usize = 5;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "afisha_fragments_total",
            "Raw fragments gathered from all sources."
        );
        describe_counter!(
            "afisha_assembled_total",
            "Events that survived extraction and dedup."
        );
        describe_counter!("afisha_published_total", "Events confirmed sent.");
        describe_counter!("afisha_publish_errors_total", "Failed publish attempts.");
        describe_counter!(
            "afisha_source_errors_total",
            "Source fetch/parse failures."
        );
        describe_gauge!(
            "afisha_last_run_ts",
            "Unix ts when the pipeline last ran."
        );
    });
}

/// Outcome counts for one pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub fragments: usize,
    pub assembled: usize,
    pub published: usize,
    pub publish_errors: usize,
    pub source_errors: usize,
}

/// Fetch all sources concurrently. One failing source never takes the
/// run down with it.
pub async fn gather_fragments(sources: &[Arc<dyn FragmentSource>]) -> (Vec<Fragment>, usize) {
    let mut handles = Vec::with_capacity(sources.len());
    for src in sources {
        let src = Arc::clone(src);
        handles.push(tokio::spawn(async move {
            let name = src.name().to_string();
            (name, src.fetch_fragments().await)
        }));
    }

    let mut out = Vec::new();
    let mut errors = 0usize;
    for h in handles {
        match h.await {
            Ok((name, Ok(mut frags))) => {
                debug!(source = %name, count = frags.len(), "source fetched");
                out.append(&mut frags);
            }
            Ok((name, Err(e))) => {
                warn!(source = %name, error = %e, "source failed");
                counter!("afisha_source_errors_total").increment(1);
                errors += 1;
            }
            Err(e) => {
                warn!(error = %e, "source task panicked");
                counter!("afisha_source_errors_total").increment(1);
                errors += 1;
            }
        }
    }
    (out, errors)
}

/// Each refiner consult is a network call; only ask about fragments
/// that classify as events and are not already published.
fn worth_refining(frag: &Fragment, vocab: &Vocab, store: &DedupStore) -> bool {
    if !classify::is_event(&normalize(&frag.text), vocab) {
        return false;
    }
    match frag.link.as_deref() {
        Some(link) => !store.seen(&dedup::canonicalize(link)),
        None => true,
    }
}

/// Run the pipeline once: gather, extract, publish, persist.
///
/// A dedup key is recorded only after the publisher confirms the send,
/// and the store is flushed after every record so a crash mid-run
/// never forgets what already went out.
pub async fn run_once(
    sources: &[Arc<dyn FragmentSource>],
    vocab: &Vocab,
    today: NaiveDate,
    store: &mut DedupStore,
    publisher: &dyn Publisher,
    refiner: &DynRefiner,
) -> RunReport {
    ensure_metrics_described();

    let (fragments, source_errors) = gather_fragments(sources).await;
    counter!("afisha_fragments_total").increment(fragments.len() as u64);

    let asm = Assembler::new(vocab, today);
    let mut run = RunState::new();
    let mut report = RunReport {
        fragments: fragments.len(),
        source_errors,
        ..Default::default()
    };
    let mut page_published: HashMap<String, usize> = HashMap::new();

    for frag in &fragments {
        let mut events = asm.assemble(frag, &mut run, store);

        // Deterministic title cleaning failed on a plausible fragment:
        // give the optional external cleaner one shot.
        if events.is_empty() && worth_refining(frag, vocab, store) {
            match refiner.refine(frag.title_line()).await {
                Some(Refined::Title(title)) => {
                    if let Some(ev) = asm.assemble_with_title(frag, title, &mut run, store) {
                        debug!(refiner = refiner.name(), "title recovered externally");
                        events.push(ev);
                    }
                }
                Some(Refined::NotAnEvent) | None => {}
            }
        }

        for event in events {
            if frag.kind == SourceKind::Page {
                let n = page_published.entry(frag.source_name.clone()).or_insert(0);
                if *n >= PAGE_SOURCE_CAP {
                    debug!(source = %frag.source_name, "page source cap reached");
                    continue;
                }
            }
            report.assembled += 1;
            counter!("afisha_assembled_total").increment(1);

            match publisher.publish(&event).await {
                Ok(()) => {
                    store.record(&dedup::canonicalize(&event.link));
                    if let Err(e) = store.flush() {
                        error!(error = %e, "dedup snapshot flush failed");
                    }
                    if frag.kind == SourceKind::Page {
                        *page_published.entry(frag.source_name.clone()).or_insert(0) += 1;
                    }
                    report.published += 1;
                    counter!("afisha_published_total").increment(1);
                    info!(title = %event.title, link = %event.link, source = %event.source, "published");
                }
                Err(e) => {
                    report.publish_errors += 1;
                    counter!("afisha_publish_errors_total").increment(1);
                    warn!(error = %e, link = %event.link, "publish failed, will retry next run");
                }
            }
        }
    }

    let now = chrono::Utc::now().timestamp().max(0);
    gauge!("afisha_last_run_ts").set(now as f64);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::Event;
    use crate::refine::{DisabledRefiner, FixedRefiner};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StaticSource {
        name: String,
        frags: Vec<Fragment>,
    }

    #[async_trait]
    impl FragmentSource for StaticSource {
        async fn fetch_fragments(&self) -> Result<Vec<Fragment>> {
            Ok(self.frags.clone())
        }
        fn name(&self) -> &str {
            &self.name
        }
    }

    struct FailingSource;

    #[async_trait]
    impl FragmentSource for FailingSource {
        async fn fetch_fragments(&self) -> Result<Vec<Fragment>> {
            Err(anyhow!("connection refused"))
        }
        fn name(&self) -> &str {
            "broken"
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<Event>>,
        fail: bool,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, event: &Event) -> Result<()> {
            if self.fail {
                return Err(anyhow!("send failed"));
            }
            self.sent.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn channel_frag(text: &str, link: &str) -> Fragment {
        Fragment {
            text: text.to_string(),
            link: Some(link.to_string()),
            image_url: None,
            source_name: "chan".to_string(),
            kind: SourceKind::Channel,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
    }

    fn store() -> (tempfile::TempDir, DedupStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DedupStore::load(dir.path().join("posted.json"));
        (dir, store)
    }

    #[tokio::test]
    async fn publishes_and_records_confirmed_sends() {
        let vocab = crate::vocab::fixture();
        let sources: Vec<Arc<dyn FragmentSource>> = vec![Arc::new(StaticSource {
            name: "chan".into(),
            frags: vec![channel_frag(
                "Митап по Rust в Алматы\n20 февраля в 19:00, MOST Hub",
                "https://t.me/chan/1",
            )],
        })];
        let publisher = RecordingPublisher::default();
        let refiner: DynRefiner = Arc::new(DisabledRefiner);
        let (_dir, mut st) = store();

        let report = run_once(&sources, &vocab, today(), &mut st, &publisher, &refiner).await;
        assert_eq!(report.published, 1);
        assert_eq!(report.publish_errors, 0);
        assert!(st.seen("https://t.me/chan/1"));
        assert_eq!(publisher.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_send_is_not_recorded() {
        let vocab = crate::vocab::fixture();
        let sources: Vec<Arc<dyn FragmentSource>> = vec![Arc::new(StaticSource {
            name: "chan".into(),
            frags: vec![channel_frag(
                "Митап по Rust в Алматы\n20 февраля в 19:00",
                "https://t.me/chan/2",
            )],
        })];
        let publisher = RecordingPublisher {
            fail: true,
            ..Default::default()
        };
        let refiner: DynRefiner = Arc::new(DisabledRefiner);
        let (_dir, mut st) = store();

        let report = run_once(&sources, &vocab, today(), &mut st, &publisher, &refiner).await;
        assert_eq!(report.published, 0);
        assert_eq!(report.publish_errors, 1);
        assert!(!st.seen("https://t.me/chan/2"));
    }

    #[tokio::test]
    async fn failing_source_is_isolated() {
        let vocab = crate::vocab::fixture();
        let sources: Vec<Arc<dyn FragmentSource>> = vec![
            Arc::new(FailingSource),
            Arc::new(StaticSource {
                name: "chan".into(),
                frags: vec![channel_frag(
                    "Хакатон по ML в Астане\n15 марта в 10:00",
                    "https://t.me/chan/3",
                )],
            }),
        ];
        let publisher = RecordingPublisher::default();
        let refiner: DynRefiner = Arc::new(DisabledRefiner);
        let (_dir, mut st) = store();

        let report = run_once(&sources, &vocab, today(), &mut st, &publisher, &refiner).await;
        assert_eq!(report.source_errors, 1);
        assert_eq!(report.published, 1);
    }

    #[tokio::test]
    async fn refiner_verdict_still_passes_gates() {
        let vocab = crate::vocab::fixture();
        // Title too garbled for the deterministic cleaner (all marker,
        // under the length floor after truncation) but the text itself
        // is a dated event.
        let sources: Vec<Arc<dyn FragmentSource>> = vec![Arc::new(StaticSource {
            name: "chan".into(),
            frags: vec![channel_frag(
                "🔥🔥🔥\nМитап 20 февраля в 19:00, регистрация по ссылке",
                "https://t.me/chan/4",
            )],
        })];
        let publisher = RecordingPublisher::default();
        let refiner: DynRefiner = Arc::new(FixedRefiner(Some(Refined::Title(
            "Митап по программированию".to_string(),
        ))));
        let (_dir, mut st) = store();

        let report = run_once(&sources, &vocab, today(), &mut st, &publisher, &refiner).await;
        assert_eq!(report.published, 1);
        let sent = publisher.sent.lock().unwrap();
        assert_eq!(sent[0].title, "Митап по программированию");
    }

    struct CountingRefiner {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl crate::refine::TitleRefiner for CountingRefiner {
        async fn refine(&self, _raw: &str) -> Option<Refined> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            None
        }
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn refiner_is_not_consulted_for_non_events_or_known_links() {
        let vocab = crate::vocab::fixture();
        let counting = Arc::new(CountingRefiner {
            calls: Default::default(),
        });
        let refiner: DynRefiner = counting.clone();
        let publisher = RecordingPublisher::default();
        let (_dir, mut st) = store();
        st.record("https://t.me/chan/77");

        let sources: Vec<Arc<dyn FragmentSource>> = vec![Arc::new(StaticSource {
            name: "chan".into(),
            frags: vec![
                channel_frag(
                    "Курс доллара и решения акимата, подробный обзор",
                    "https://news.example/usd",
                ),
                channel_frag("🔥🔥🔥\nМитап 20 февраля в 19:00", "https://t.me/chan/77"),
            ],
        })];
        run_once(&sources, &vocab, today(), &mut st, &publisher, &refiner).await;
        assert_eq!(counting.calls.load(std::sync::atomic::Ordering::SeqCst), 0);

        // A plausible, unseen fragment does get the consult.
        let sources2: Vec<Arc<dyn FragmentSource>> = vec![Arc::new(StaticSource {
            name: "chan".into(),
            frags: vec![channel_frag(
                "🔥🔥🔥\nМитап 20 февраля в 19:00",
                "https://t.me/chan/78",
            )],
        })];
        run_once(&sources2, &vocab, today(), &mut st, &publisher, &refiner).await;
        assert_eq!(counting.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
