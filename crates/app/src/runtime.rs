//! Board runtime - the single actor that owns board state
//!
//! Local commands and remote snapshots arrive on one queue and are applied
//! one at a time through the reconciler. Writes go out as independent
//! fire-and-forget tasks: a failed write is logged and dropped, and the
//! next local edit or remote snapshot brings the two sides back together.

use std::sync::Arc;

use seatplan_core::{
    DeleteRefusal, Document, Effect, Event, MoveRejection, PinnedSet, RemoteStore, ResourceKey,
    Side, SnapshotCallback, SyncReconciler, ZoneTopology,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::viewmodel::BoardView;

/// Something the UI should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Board after an applied change
    Board(BoardView),
    MoveRejected {
        name: String,
        rejection: MoveRejection,
    },
    ConfirmationRequired {
        side: Side,
        name: String,
    },
    DeleteRefused {
        name: String,
        reason: DeleteRefusal,
    },
}

enum Input {
    Event(Event),
    Shutdown,
}

/// Sends local commands to a running [`BoardRuntime`]
#[derive(Clone)]
pub struct RuntimeHandle {
    tx: mpsc::UnboundedSender<Input>,
}

impl RuntimeHandle {
    /// Queue an event, false if the runtime has stopped
    pub fn send(&self, event: Event) -> bool {
        self.tx.send(Input::Event(event)).is_ok()
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Input::Shutdown);
    }
}

pub struct BoardRuntime<S: RemoteStore> {
    store: Arc<S>,
    reconciler: SyncReconciler,
    input_tx: mpsc::UnboundedSender<Input>,
    input_rx: mpsc::UnboundedReceiver<Input>,
    notices: mpsc::UnboundedSender<Notice>,
}

impl<S: RemoteStore> BoardRuntime<S> {
    pub fn new(
        store: Arc<S>,
        topology: Arc<ZoneTopology>,
        pinned: PinnedSet,
    ) -> (Self, RuntimeHandle, mpsc::UnboundedReceiver<Notice>) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let handle = RuntimeHandle {
            tx: input_tx.clone(),
        };

        let runtime = Self {
            store,
            reconciler: SyncReconciler::new(topology, pinned),
            input_tx,
            input_rx,
            notices: notice_tx,
        };
        (runtime, handle, notice_rx)
    }

    /// Subscribe to every shared document, then process events until shutdown
    pub async fn run(mut self) -> Result<(), S::Error> {
        for key in ResourceKey::ALL {
            let tx = self.input_tx.clone();
            let callback: SnapshotCallback = Arc::new(move |key, document| {
                let _ = tx.send(Input::Event(Event::from_snapshot(key, document)));
            });
            self.store.subscribe(key, callback).await?;
            debug!(key = %key, "Subscribed");
        }
        info!("Board runtime started");

        while let Some(input) = self.input_rx.recv().await {
            match input {
                Input::Event(event) => self.apply(event),
                Input::Shutdown => break,
            }
        }

        info!("Board runtime stopped");
        Ok(())
    }

    fn apply(&mut self, event: Event) {
        let mut changed = false;
        for effect in self.reconciler.handle(event) {
            match effect {
                Effect::StateChanged => changed = true,
                Effect::MoveRejected { name, rejection } => {
                    self.notify(Notice::MoveRejected { name, rejection });
                }
                Effect::ConfirmationRequired { side, name } => {
                    self.notify(Notice::ConfirmationRequired { side, name });
                }
                Effect::DeleteRefused { name, reason } => {
                    self.notify(Notice::DeleteRefused { name, reason });
                }
                write @ (Effect::WriteRoster { .. } | Effect::WriteSeatingPlan(_)) => {
                    if let Some(document) = write.into_document() {
                        self.spawn_write(document);
                    }
                }
            }
        }

        if changed {
            self.notify(Notice::Board(BoardView::capture(&self.reconciler)));
        }
    }

    fn notify(&self, notice: Notice) {
        if self.notices.send(notice).is_err() {
            debug!("No one is listening for notices");
        }
    }

    /// Write without waiting; later writes may overtake this one
    fn spawn_write(&self, document: Document) {
        let store = self.store.clone();
        let key = document.key();
        tokio::spawn(async move {
            match store.write(document).await {
                Ok(()) => debug!(key = %key, "Remote write completed"),
                Err(e) => warn!(key = %key, error = %e, "Remote write failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatplan_core::{BoardConfig, MemoryStore, SeatingPlan};
    use std::future::Future;
    use std::time::Duration;

    fn topology() -> Arc<ZoneTopology> {
        let config = BoardConfig {
            standard_tables: 2,
            standard_capacity: 2,
            ..BoardConfig::default()
        };
        Arc::new(ZoneTopology::from_config(&config).unwrap())
    }

    fn start(store: &MemoryStore) -> (RuntimeHandle, mpsc::UnboundedReceiver<Notice>) {
        let (runtime, handle, notices) =
            BoardRuntime::new(Arc::new(store.clone()), topology(), PinnedSet::new(["Manal"]));
        tokio::spawn(runtime.run());
        (handle, notices)
    }

    async fn within<F: Future>(f: F) -> F::Output {
        tokio::time::timeout(Duration::from_secs(5), f)
            .await
            .expect("Timed out")
    }

    /// Next board view matching `pred`
    async fn board_where(
        notices: &mut mpsc::UnboundedReceiver<Notice>,
        pred: impl Fn(&BoardView) -> bool,
    ) -> BoardView {
        within(async {
            loop {
                if let Some(Notice::Board(view)) = notices.recv().await {
                    if pred(&view) {
                        return view;
                    }
                }
            }
        })
        .await
    }

    /// Next notice that is not a board view
    async fn next_message(notices: &mut mpsc::UnboundedReceiver<Notice>) -> Notice {
        within(async {
            loop {
                match notices.recv().await {
                    Some(Notice::Board(_)) => continue,
                    Some(notice) => return notice,
                    None => panic!("Runtime stopped"),
                }
            }
        })
        .await
    }

    async fn until(cond: impl Fn() -> bool) {
        within(async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
    }

    fn add(side: Side, name: &str) -> Event {
        Event::AddGuest {
            side,
            name: name.into(),
        }
    }

    fn mv(name: &str, from: &str, to: &str) -> Event {
        Event::MoveGuest {
            name: name.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    fn stored_plan(store: &MemoryStore) -> Option<SeatingPlan> {
        match store.document(ResourceKey::SeatingPlan) {
            Some(Document::SeatingPlan(plan)) => Some(plan),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_local_add_is_written_to_store() {
        let store = MemoryStore::new();
        let (handle, mut notices) = start(&store);

        handle.send(add(Side::Groom, "Alice"));
        let view = board_where(&mut notices, |v| v.locate("Alice").is_some()).await;
        assert_eq!(view.locate("Alice"), Some("groom-guests"));

        until(|| store.document(ResourceKey::Roster(Side::Groom)).is_some()).await;
        until(|| stored_plan(&store).is_some()).await;
        assert_eq!(
            store.document(ResourceKey::Roster(Side::Groom)),
            Some(Document::Roster {
                side: Side::Groom,
                names: vec!["Alice".into()]
            })
        );
        let plan = stored_plan(&store).unwrap();
        assert_eq!(plan["groom-guests"], vec!["Alice".to_string()]);
        assert!(plan["table-1"].is_empty());
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_existing_documents_load_on_start() {
        let store = MemoryStore::new();
        store
            .write_roster(Side::Bride, vec!["Nadia".into(), "Omar".into()])
            .await
            .unwrap();
        let plan: SeatingPlan = [("table-1".to_string(), vec!["Omar".to_string()])]
            .into_iter()
            .collect();
        store.write_seating_plan(plan).await.unwrap();

        let (handle, mut notices) = start(&store);
        let view = board_where(&mut notices, |v| v.counters.total == 2 && v.counters.placed == 1)
            .await;
        assert_eq!(view.locate("Omar"), Some("table-1"));
        assert_eq!(view.locate("Nadia"), Some("bride-guests"));
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_rejected_move_is_reported_without_write() {
        let store = MemoryStore::new();
        let (handle, mut notices) = start(&store);

        handle.send(add(Side::Groom, "Alice"));
        board_where(&mut notices, |v| v.locate("Alice").is_some()).await;
        until(|| stored_plan(&store).is_some()).await;
        let writes = store.write_count();

        handle.send(mv("Alice", "groom-guests", "bride-guests"));
        assert!(matches!(
            next_message(&mut notices).await,
            Notice::MoveRejected {
                rejection: MoveRejection::SideAffinity { .. },
                ..
            }
        ));
        assert_eq!(store.write_count(), writes);
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_pinned_guest_delete_refused() {
        let store = MemoryStore::new();
        let (handle, mut notices) = start(&store);

        handle.send(add(Side::Bride, "Manal"));
        board_where(&mut notices, |v| v.locate("Manal").is_some()).await;
        handle.send(Event::RequestDelete {
            side: Side::Bride,
            name: "Manal".into(),
        });

        assert_eq!(
            next_message(&mut notices).await,
            Notice::DeleteRefused {
                name: "Manal".into(),
                reason: DeleteRefusal::Pinned
            }
        );
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_failed_write_keeps_local_state() {
        let store = MemoryStore::new();
        let (handle, mut notices) = start(&store);
        board_where(&mut notices, |v| v.counters.total == 0).await;

        store.set_fail_writes(true);
        handle.send(add(Side::Groom, "Alice"));
        let view = board_where(&mut notices, |v| v.locate("Alice").is_some()).await;
        assert_eq!(view.counters.total, 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.document(ResourceKey::Roster(Side::Groom)).is_none());
        assert_eq!(store.write_count(), 0);

        // The next edit writes the full state again
        store.set_fail_writes(false);
        handle.send(add(Side::Groom, "Bob"));
        until(|| {
            store.document(ResourceKey::Roster(Side::Groom))
                == Some(Document::Roster {
                    side: Side::Groom,
                    names: vec!["Alice".into(), "Bob".into()],
                })
        })
        .await;
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_remote_edit_reaches_other_board() {
        let store = MemoryStore::new();
        let (a, mut a_notices) = start(&store);
        let (b, mut b_notices) = start(&store);

        a.send(add(Side::Groom, "Alice"));
        board_where(&mut a_notices, |v| v.locate("Alice").is_some()).await;
        board_where(&mut b_notices, |v| v.locate("Alice") == Some("groom-guests")).await;

        a.send(mv("Alice", "groom-guests", "table-1"));
        let seen = board_where(&mut b_notices, |v| v.locate("Alice") == Some("table-1")).await;
        assert_eq!(seen.counters.placed, 1);

        a.shutdown();
        b.shutdown();
    }

    #[tokio::test]
    async fn test_concurrent_boards_converge_on_last_write() {
        let store = MemoryStore::new();
        store
            .write_roster(Side::Groom, vec!["Alice".into(), "Bob".into()])
            .await
            .unwrap();

        let (a, mut a_notices) = start(&store);
        let (b, mut b_notices) = start(&store);
        board_where(&mut a_notices, |v| v.counters.total == 2).await;
        board_where(&mut b_notices, |v| v.counters.total == 2).await;

        // Both edit from the same starting point; one plan clobbers the other
        a.send(mv("Alice", "groom-guests", "table-1"));
        b.send(mv("Bob", "groom-guests", "table-2"));

        until(|| store.write_count() >= 3).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let last = stored_plan(&store).unwrap();

        let a_view = board_where(&mut a_notices, |v| v.plan() == last).await;
        let b_view = board_where(&mut b_notices, |v| v.plan() == last).await;
        assert_eq!(a_view.plan(), b_view.plan());
        a.shutdown();
        b.shutdown();
    }
}
