//! Stream controller: drives the read loop and owns the session state machine

pub mod session;

use crate::clients::ByteSource;
use crate::domain::ImageRecord;
use crate::errors::FetchError;
use crate::request::ImageQuery;
use crate::stream::{decode_line, lines, Decoded};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub use session::{status, FailureStage, IngestionSession, Phase, SessionId};

/// What a read loop reports back to the controller
#[derive(Debug)]
pub(crate) enum SessionEvent {
    Opened,
    Line(Decoded),
    Finished,
    Failed(FetchError),
}

/// An event tagged with the session that produced it
#[derive(Debug)]
pub(crate) struct Envelope {
    session: SessionId,
    event: SessionEvent,
}

/// Change applied to the current session, for the view to re-render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// Response accepted; the blocking loading indicator goes away.
    Started,
    /// A record was appended at `index`.
    Record { index: usize },
    /// The server embedded an error object; only the status line changed.
    Notice,
    /// A malformed line was skipped.
    Skipped,
    Completed,
    Failed(FailureStage),
}

/// Owns the current [`IngestionSession`] and applies read-loop events to it.
///
/// Every event carries the id of the session that spawned it and is dropped
/// unless that session is still current and in flight, so a superseded loop
/// can never touch the records of its successor. Must be used from within a
/// Tokio runtime; a current-thread runtime gives the cooperative scheduling
/// the UI expects.
pub struct StreamController {
    source: Arc<dyn ByteSource>,
    session: Option<IngestionSession>,
    last_id: SessionId,
    cancel: Option<CancellationToken>,
    tx: UnboundedSender<Envelope>,
    rx: UnboundedReceiver<Envelope>,
}

impl StreamController {
    pub fn new(source: Arc<dyn ByteSource>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            session: None,
            last_id: 0,
            cancel: None,
            tx,
            rx,
        }
    }

    /// Start ingesting `query`, superseding any session still in flight.
    ///
    /// A repeat of the query already in flight (a double click) is ignored
    /// and returns the running session's id.
    pub fn start_ingestion(&mut self, query: ImageQuery) -> SessionId {
        if let Some(current) = self.session.as_ref() {
            if current.phase.is_active() && current.query == query {
                debug!(session = current.id, "duplicate selection ignored");
                return current.id;
            }
        }

        if let Some(token) = self.cancel.take() {
            token.cancel();
            if let Some(old) = self.session.as_ref().filter(|s| s.phase.is_active()) {
                info!(session = old.id, "session superseded");
            }
        }

        self.last_id += 1;
        let id = self.last_id;
        info!(session = id, endpoint = query.endpoint(), lat = query.location.lat, lng = query.location.lng, "starting ingestion");

        self.session = Some(IngestionSession::new(id, query.clone()));
        let token = CancellationToken::new();
        self.cancel = Some(token.clone());
        tokio::spawn(read_session(
            id,
            Arc::clone(&self.source),
            query,
            self.tx.clone(),
            token,
        ));
        id
    }

    /// Stop the in-flight read. Records received so far stay visible.
    pub fn cancel(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        if let Some(session) = self.session.as_mut().filter(|s| s.phase.is_active()) {
            info!(session = session.id, records = session.records.len(), "session cancelled");
            session.phase = Phase::Idle;
            session.status_text = status::CANCELLED.to_string();
        }
    }

    /// Wait for the next change to the current session.
    ///
    /// Returns `None` once no session is in flight.
    pub async fn next_update(&mut self) -> Option<Update> {
        loop {
            if !self.phase().is_active() {
                return None;
            }
            let envelope = self.rx.recv().await?;
            if let Some(update) = self.apply(envelope) {
                return Some(update);
            }
        }
    }

    /// Apply every event that is already queued, without waiting.
    pub fn drain_ready(&mut self) -> Vec<Update> {
        let mut updates = Vec::new();
        while let Ok(envelope) = self.rx.try_recv() {
            updates.extend(self.apply(envelope));
        }
        updates
    }

    /// Drive the current session until it is no longer in flight
    pub async fn run_to_end(&mut self) -> Phase {
        while self.next_update().await.is_some() {}
        self.phase()
    }

    pub(crate) fn apply(&mut self, envelope: Envelope) -> Option<Update> {
        let Envelope { session: id, event } = envelope;
        let Some(session) = self
            .session
            .as_mut()
            .filter(|s| s.id == id && s.phase.is_active())
        else {
            debug!(session = id, "dropping event from superseded session");
            return None;
        };

        match event {
            SessionEvent::Opened => {
                session.phase = Phase::Streaming;
                session.status_text = status::STREAMING.to_string();
                info!(session = id, "streaming started");
                Some(Update::Started)
            }
            SessionEvent::Line(Decoded::Image(record)) => {
                session.records.push(record);
                let count = session.records.len();
                session.status_text = status::loaded_so_far(count);
                Some(Update::Record { index: count - 1 })
            }
            SessionEvent::Line(Decoded::Notice(notice)) => {
                session.notices += 1;
                session.status_text = status::stream_error(&notice.message);
                Some(Update::Notice)
            }
            SessionEvent::Line(Decoded::Malformed(_)) => {
                session.malformed += 1;
                Some(Update::Skipped)
            }
            SessionEvent::Finished => {
                let count = session.records.len();
                session.phase = Phase::Completed;
                session.status_text = status::all_loaded(count);
                info!(session = id, records = count, malformed = session.malformed, notices = session.notices, "ingestion completed");
                self.cancel = None;
                Some(Update::Completed)
            }
            SessionEvent::Failed(err) => {
                let stage = match session.phase {
                    Phase::Requesting => FailureStage::Request,
                    _ => FailureStage::Stream,
                };
                session.phase = Phase::Failed;
                session.failure = Some(stage);
                session.status_text = status::FAILED.to_string();
                error!(session = id, code = err.code(), stage = ?stage, records = session.records.len(), error = %err, "ingestion failed");
                self.cancel = None;
                Some(Update::Failed(stage))
            }
        }
    }

    pub fn session(&self) -> Option<&IngestionSession> {
        self.session.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.session.as_ref().map_or(Phase::Idle, |s| s.phase)
    }

    pub fn records(&self) -> &[ImageRecord] {
        match &self.session {
            Some(s) => &s.records,
            None => &[],
        }
    }

    pub fn status_text(&self) -> &str {
        self.session.as_ref().map_or("", |s| s.status_text.as_str())
    }

    /// Blocking loading indicator: shown until the response is accepted
    pub fn is_loading(&self) -> bool {
        self.phase() == Phase::Requesting
    }

    pub fn is_streaming(&self) -> bool {
        self.phase().is_active()
    }
}

/// Read loop for one session: open, reassemble, decode, report.
async fn read_session(
    id: SessionId,
    source: Arc<dyn ByteSource>,
    query: ImageQuery,
    tx: UnboundedSender<Envelope>,
    token: CancellationToken,
) {
    let send = |event: SessionEvent| {
        // The controller may be gone; nothing left to report to.
        let _ = tx.send(Envelope { session: id, event });
    };

    let opened = tokio::select! {
        biased;
        _ = token.cancelled() => return,
        res = source.open(&query) => res,
    };
    let body = match opened {
        Ok(body) => body,
        Err(err) => return send(SessionEvent::Failed(err)),
    };
    send(SessionEvent::Opened);

    let mut records = lines(body);
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(session = id, "read loop stopped");
                return;
            }
            next = records.next() => next,
        };
        match next {
            Some(Ok(line)) => send(SessionEvent::Line(decode_line(&line))),
            Some(Err(err)) => return send(SessionEvent::Failed(err)),
            None => return send(SessionEvent::Finished),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ByteStream;
    use crate::domain::{LatLng, RecordId, Source};
    use crate::errors::FetchResult;
    use crate::test_support::CapturedLogs;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream;
    use reqwest::StatusCode;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tracing::Level;

    enum Script {
        Reject(StatusCode),
        Body(Vec<FetchResult<Bytes>>),
        /// Sends the chunks, then never ends.
        Hang(Vec<FetchResult<Bytes>>),
    }

    struct ScriptedSource {
        scripts: Mutex<VecDeque<Script>>,
    }

    impl ScriptedSource {
        fn new(scripts: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts.into()),
            })
        }
    }

    #[async_trait]
    impl ByteSource for ScriptedSource {
        async fn open(&self, _query: &ImageQuery) -> FetchResult<ByteStream> {
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .expect("no script left for this request");
            match script {
                Script::Reject(status) => Err(FetchError::Status(status)),
                Script::Body(chunks) => Ok(stream::iter(chunks).boxed()),
                Script::Hang(chunks) => Ok(stream::iter(chunks).chain(stream::pending()).boxed()),
            }
        }
    }

    fn chunks(parts: &[&'static str]) -> Vec<FetchResult<Bytes>> {
        parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect()
    }

    fn query(lat: f64) -> ImageQuery {
        ImageQuery::new(LatLng::new(lat, 10.0), Some(Source::Sentinel2))
    }

    fn ids(controller: &StreamController) -> Vec<RecordId> {
        controller.records().iter().filter_map(|r| r.id.clone()).collect()
    }

    #[tokio::test]
    async fn split_records_arrive_in_order() {
        let source = ScriptedSource::new(vec![Script::Body(chunks(&[
            r#"{"id":1,"timestamp":100"#,
            "}\n{\"id\":2,\"timestamp\":50}\n",
        ]))]);
        let mut controller = StreamController::new(source);
        controller.start_ingestion(query(1.0));
        assert!(controller.is_loading());

        assert_eq!(controller.run_to_end().await, Phase::Completed);
        // Arrival order, not timestamp order.
        assert_eq!(ids(&controller), vec![RecordId::Int(1), RecordId::Int(2)]);
        assert_eq!(controller.status_text(), "All 2 images loaded.");
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped_and_counted() {
        let source = ScriptedSource::new(vec![Script::Body(chunks(&[
            "{\"id\":1}\nnot json\n{\"id\":2}\n",
            "{\"id\":\n[1]\n{\"id\":3}\n",
        ]))]);
        let (logs, _guard) = CapturedLogs::install();
        let mut controller = StreamController::new(source);
        controller.start_ingestion(query(1.0));
        controller.run_to_end().await;

        let session = controller.session().unwrap();
        assert_eq!(session.phase, Phase::Completed);
        assert_eq!(session.malformed, 3);
        assert_eq!(logs.count(Level::WARN), 3);
        assert_eq!(
            ids(&controller),
            vec![RecordId::Int(1), RecordId::Int(2), RecordId::Int(3)]
        );
    }

    #[tokio::test]
    async fn embedded_error_only_touches_status() {
        let source = ScriptedSource::new(vec![Script::Hang(chunks(&[
            "{\"id\":1}\n{\"error\":\"quota exceeded\"}\n",
        ]))]);
        let mut controller = StreamController::new(source);
        controller.start_ingestion(query(1.0));

        assert_eq!(controller.next_update().await, Some(Update::Started));
        assert!(!controller.is_loading());
        assert_eq!(controller.next_update().await, Some(Update::Record { index: 0 }));
        assert_eq!(controller.next_update().await, Some(Update::Notice));

        assert_eq!(controller.records().len(), 1);
        assert_eq!(controller.status_text(), "Error: quota exceeded");
        assert_eq!(controller.phase(), Phase::Streaming);
        assert_eq!(controller.session().unwrap().notices, 1);
        controller.cancel();
    }

    #[tokio::test]
    async fn empty_response_completes() {
        let source = ScriptedSource::new(vec![Script::Body(Vec::new())]);
        let mut controller = StreamController::new(source);
        controller.start_ingestion(query(1.0));

        assert_eq!(controller.run_to_end().await, Phase::Completed);
        assert!(controller.records().is_empty());
        assert_eq!(controller.status_text(), "All 0 images loaded.");
    }

    #[tokio::test]
    async fn server_error_never_streams() {
        let source = ScriptedSource::new(vec![Script::Reject(StatusCode::INTERNAL_SERVER_ERROR)]);
        let mut controller = StreamController::new(source);
        controller.start_ingestion(query(1.0));

        assert_eq!(
            controller.next_update().await,
            Some(Update::Failed(FailureStage::Request))
        );
        assert_eq!(controller.phase(), Phase::Failed);
        assert!(controller.records().is_empty());
        assert!(!controller.is_loading());
        assert_eq!(controller.status_text(), status::FAILED);
        assert_eq!(controller.next_update().await, None);
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_partial_results() {
        let mut body = chunks(&["{\"id\":1}\n{\"id\":2}\n{\"id\""]);
        body.push(Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset").into()));
        let source = ScriptedSource::new(vec![Script::Body(body)]);
        let mut controller = StreamController::new(source);
        controller.start_ingestion(query(1.0));

        assert_eq!(controller.run_to_end().await, Phase::Failed);
        let session = controller.session().unwrap();
        assert_eq!(session.failure, Some(FailureStage::Stream));
        assert_eq!(session.records.len(), 2);
    }

    #[tokio::test]
    async fn new_session_supersedes_the_old_one() {
        let source = ScriptedSource::new(vec![
            Script::Hang(chunks(&["{\"id\":\"old-1\"}\n"])),
            Script::Body(chunks(&["{\"id\":\"new-1\"}\n{\"id\":\"new-2\"}\n"])),
        ]);
        let mut controller = StreamController::new(source);
        let first = controller.start_ingestion(query(1.0));
        while controller.next_update().await != Some(Update::Record { index: 0 }) {}

        let second = controller.start_ingestion(query(2.0));
        assert!(second > first);
        assert_eq!(controller.phase(), Phase::Requesting);
        assert!(controller.records().is_empty());

        // A straggler from the first session is ignored.
        let stale = Envelope {
            session: first,
            event: SessionEvent::Line(decode_line(r#"{"id":"old-2"}"#)),
        };
        assert_eq!(controller.apply(stale), None);

        assert_eq!(controller.run_to_end().await, Phase::Completed);
        assert_eq!(
            ids(&controller),
            vec![RecordId::Text("new-1".into()), RecordId::Text("new-2".into())]
        );
    }

    #[tokio::test]
    async fn duplicate_selection_is_ignored_while_in_flight() {
        let source = ScriptedSource::new(vec![Script::Hang(Vec::new())]);
        let mut controller = StreamController::new(source);
        let first = controller.start_ingestion(query(1.0));
        let again = controller.start_ingestion(query(1.0));
        assert_eq!(first, again);
        controller.cancel();
    }

    #[tokio::test]
    async fn cancel_stops_reading_and_keeps_records() {
        let source = ScriptedSource::new(vec![Script::Hang(chunks(&["{\"id\":1}\n"]))]);
        let mut controller = StreamController::new(source);
        controller.start_ingestion(query(1.0));
        while controller.next_update().await != Some(Update::Record { index: 0 }) {}

        controller.cancel();
        assert_eq!(controller.phase(), Phase::Idle);
        assert_eq!(controller.records().len(), 1);
        assert_eq!(controller.status_text(), status::CANCELLED);
        assert_eq!(controller.next_update().await, None);
    }

    #[tokio::test]
    async fn drain_ready_applies_queued_events() {
        let source = ScriptedSource::new(vec![Script::Body(chunks(&["{\"id\":1}\n"]))]);
        let mut controller = StreamController::new(source);
        controller.start_ingestion(query(1.0));
        assert!(controller.drain_ready().is_empty());

        tokio::task::yield_now().await;
        let mut updates = controller.drain_ready();
        while controller.phase().is_active() {
            tokio::task::yield_now().await;
            updates.extend(controller.drain_ready());
        }
        assert_eq!(
            updates,
            vec![Update::Started, Update::Record { index: 0 }, Update::Completed]
        );
    }
}
