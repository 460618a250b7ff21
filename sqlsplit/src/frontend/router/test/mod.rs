//! Shared test fixtures and router scenarios.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::backend::{BackendRef, ChannelConnection, StaticTopology};
use crate::classifier::{Classifier, QueryType};
use crate::config::Role;
use crate::net::Statement;

use super::policy::{Policy, Selection};
use super::{RouteTarget, Router};

/// Keyword-based classifier, good enough for test statements.
///
/// Production embeddings bring a real parser; routing only sees the
/// bitmask either way.
#[derive(Debug, Default)]
pub(crate) struct KeywordClassifier;

fn clean_name(token: &str) -> Option<String> {
    let token = token.split('(').next().unwrap_or("");
    let token = token.trim_matches(|c: char| matches!(c, ',' | ';' | ')' | '`' | '\''));
    match token.chars().next() {
        Some(c) if c.is_alphabetic() => Some(token.to_string()),
        _ => None,
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, stmt: &Statement) -> QueryType {
        let text = stmt.text().trim().to_uppercase();
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();

        if compact.starts_with("SETAUTOCOMMIT=0") {
            return QueryType::SESSION_WRITE | QueryType::DISABLE_AUTOCOMMIT;
        }
        if compact.starts_with("SETAUTOCOMMIT=1") {
            return QueryType::SESSION_WRITE | QueryType::ENABLE_AUTOCOMMIT;
        }
        if text.starts_with("SET ") || text.starts_with("USE ") {
            return QueryType::SESSION_WRITE;
        }
        if text.starts_with("CREATE TEMPORARY TABLE") {
            return QueryType::CREATE_TMP_TABLE | QueryType::WRITE;
        }
        if text.starts_with("BEGIN") || text.starts_with("START TRANSACTION") {
            return QueryType::BEGIN_TRX;
        }
        if text.starts_with("COMMIT") {
            return QueryType::COMMIT;
        }
        if text.starts_with("ROLLBACK") {
            return QueryType::ROLLBACK;
        }
        if text.starts_with("SHOW TABLES") {
            return QueryType::SHOW_TABLES;
        }
        if text.starts_with("PREPARE ") {
            return QueryType::PREPARE_NAMED_STMT;
        }
        if text.starts_with("EXECUTE ") {
            return QueryType::EXEC_STMT;
        }
        if text.starts_with("SELECT") {
            let mut qtype = QueryType::READ;
            if text.contains("@@") {
                qtype |= QueryType::SYSVAR_READ;
            } else if text.contains(" @") {
                qtype |= QueryType::USERVAR_READ;
            }
            if text.ends_with("FOR UPDATE") {
                qtype |= QueryType::MASTER_READ;
            }
            return qtype;
        }
        for prefix in [
            "INSERT", "UPDATE", "DELETE", "REPLACE", "CREATE", "DROP", "ALTER", "TRUNCATE",
        ] {
            if text.starts_with(prefix) {
                return QueryType::WRITE;
            }
        }

        QueryType::UNKNOWN
    }

    fn table_names(&self, stmt: &Statement) -> Vec<String> {
        let text = stmt.text();
        let mut names = vec![];
        let mut tokens = text.split_whitespace().peekable();

        while let Some(token) = tokens.next() {
            let keyword = ["FROM", "INTO", "UPDATE", "JOIN", "TABLE"]
                .iter()
                .any(|kw| token.eq_ignore_ascii_case(kw));
            if !keyword {
                continue;
            }
            if let Some(next) = tokens.peek() {
                if let Some(name) = clean_name(next) {
                    names.push(name);
                }
            }
        }

        names
    }

    fn created_table_name(&self, stmt: &Statement) -> Option<String> {
        let text = stmt.text();
        let mut tokens = text.split_whitespace();

        while let Some(token) = tokens.next() {
            if token.eq_ignore_ascii_case("TABLE") {
                return tokens.next().and_then(clean_name);
            }
        }
        None
    }

    fn is_session_command(&self, stmt: &Statement) -> bool {
        self.classify(stmt).intersects(
            QueryType::SESSION_WRITE
                | QueryType::ENABLE_AUTOCOMMIT
                | QueryType::DISABLE_AUTOCOMMIT
                | QueryType::PREPARE_STMT
                | QueryType::PREPARE_NAMED_STMT,
        )
    }

    fn is_begin(&self, stmt: &Statement) -> bool {
        self.classify(stmt).is(QueryType::BEGIN_TRX)
    }

    fn is_drop_table(&self, stmt: &Statement) -> bool {
        let text = stmt.text().trim().to_uppercase();
        text.starts_with("DROP TABLE") || text.starts_with("DROP TEMPORARY TABLE")
    }
}

/// Backend reference whose transport is never read. Writes succeed;
/// the receiver is leaked to keep the channel open.
pub(crate) fn primary(name: &str) -> BackendRef {
    let (conn, rx) = ChannelConnection::pair(name, Role::Primary);
    std::mem::forget(rx);
    BackendRef::new(conn)
}

pub(crate) fn replica(name: &str) -> BackendRef {
    let (conn, rx) = ChannelConnection::pair(name, Role::Replica);
    std::mem::forget(rx);
    BackendRef::new(conn)
}

/// Replica reporting the given replication lag, in seconds.
pub(crate) fn lagging_replica(name: &str, lag: u64) -> BackendRef {
    let (conn, rx) = ChannelConnection::pair(name, Role::Replica);
    std::mem::forget(rx);
    BackendRef::new(conn.with_lag(lag))
}

/// First name becomes the primary, the rest replicas.
pub(crate) fn backend_refs(names: &[&str]) -> Vec<BackendRef> {
    names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            if index == 0 {
                primary(name)
            } else {
                replica(name)
            }
        })
        .collect()
}

/// Selection with no hints, no tables and no open transaction.
pub(crate) fn selection<'a>(target: RouteTarget, backends: &'a [BackendRef]) -> Selection<'a> {
    Selection {
        target,
        backends,
        active_node: None,
        tables: &[],
        hints: &[],
        in_transaction: false,
        default_max_lag: None,
        safe_reads: false,
    }
}

/// A router, one open session and the receiving end of every
/// backend's transport.
pub(crate) struct Harness {
    pub router: Router,
    pub session: Arc<crate::frontend::Session>,
    pub receivers: Vec<UnboundedReceiver<Bytes>>,
    pub topology: Arc<StaticTopology>,
}

/// Register a topology member whose connections all feed one
/// receiving end, so tests observe every session's traffic to it.
pub(crate) fn add_node(
    topology: &StaticTopology,
    name: &str,
    role: Role,
) -> UnboundedReceiver<Bytes> {
    let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
    let node = name.to_owned();
    topology.add(name, role, move || {
        ChannelConnection::from_sender(&node, role, sender.clone())
    });
    receiver
}

pub(crate) fn harness(names: &[&str], policy: Box<dyn Policy>) -> Harness {
    let topology = Arc::new(StaticTopology::new());
    let mut receivers = vec![];

    for (index, name) in names.iter().enumerate() {
        let role = if index == 0 {
            Role::Primary
        } else {
            Role::Replica
        };
        receivers.push(add_node(&topology, name, role));
    }

    let router = Router::with_policy(
        Arc::new(KeywordClassifier),
        topology.clone(),
        policy,
    );
    let session = router.new_session("app").expect("session");

    Harness {
        router,
        session,
        receivers,
        topology,
    }
}

pub(crate) fn drain(rx: &mut UnboundedReceiver<Bytes>) -> Vec<Bytes> {
    let mut buffers = vec![];
    while let Ok(buffer) = rx.try_recv() {
        buffers.push(buffer);
    }
    buffers
}

mod scenarios {
    use super::*;
    use crate::frontend::router::policy::{ConflictAvoiding, ReadWriteSplit};
    use crate::frontend::router::Disposition;
    use crate::net::{BackendError, BackendErrorKind, Reply};
    use crate::stats::RouterStats;

    #[test]
    fn test_session_open_connects_all_backends() {
        let fixture = harness(&["node-0", "node-1", "node-2"], Box::new(ReadWriteSplit));
        assert_eq!(fixture.router.sessions().len(), 1);
        assert_eq!(fixture.session.lock().unwrap().backends.len(), 3);
    }

    #[test]
    fn test_write_routes_to_master() {
        let mut fixture = harness(&["node-0", "node-1"], Box::new(ReadWriteSplit));
        let stmt = Statement::new("INSERT INTO orders VALUES (1)");

        assert!(fixture
            .router
            .on_client_statement(&fixture.session, stmt)
            .unwrap());

        assert_eq!(drain(&mut fixture.receivers[0]).len(), 1);
        assert!(drain(&mut fixture.receivers[1]).is_empty());
        assert_eq!(RouterStats::get(&fixture.router.stats().master), 1);
    }

    #[test]
    fn test_read_routes_to_replica() {
        let mut fixture = harness(&["node-0", "node-1"], Box::new(ReadWriteSplit));
        let stmt = Statement::new("SELECT * FROM orders");

        assert!(fixture
            .router
            .on_client_statement(&fixture.session, stmt)
            .unwrap());

        assert!(drain(&mut fixture.receivers[0]).is_empty());
        assert_eq!(drain(&mut fixture.receivers[1]).len(), 1);
        assert_eq!(RouterStats::get(&fixture.router.stats().slave), 1);
    }

    #[test]
    fn test_read_routing_is_idempotent() {
        let mut fixture = harness(&["node-0", "node-1", "node-2"], Box::new(ReadWriteSplit));
        let stmt = || Statement::new("SELECT * FROM orders");

        assert!(fixture
            .router
            .on_client_statement(&fixture.session, stmt())
            .unwrap());
        let first = (0..fixture.receivers.len())
            .find(|index| !drain(&mut fixture.receivers[*index]).is_empty())
            .unwrap();

        // Unchanged session state and topology: same backend again.
        fixture
            .router
            .on_backend_reply(&fixture.session, &format!("node-{}", first), Reply::new("OK"))
            .unwrap();
        assert!(fixture
            .router
            .on_client_statement(&fixture.session, stmt())
            .unwrap());
        assert_eq!(drain(&mut fixture.receivers[first]).len(), 1);
    }

    #[test]
    fn test_begin_is_queued_until_next_statement() {
        let mut fixture = harness(&["node-0", "node-1"], Box::new(ReadWriteSplit));

        assert!(fixture
            .router
            .on_client_statement(&fixture.session, Statement::new("BEGIN"))
            .unwrap());

        // Nothing on the wire yet.
        assert!(drain(&mut fixture.receivers[0]).is_empty());
        assert!(fixture.session.lock().unwrap().queued.is_some());

        assert!(fixture
            .router
            .on_client_statement(
                &fixture.session,
                Statement::new("INSERT INTO orders VALUES (1)")
            )
            .unwrap());

        // BEGIN rides in front of the statement that picked the node.
        let sent = drain(&mut fixture.receivers[0]);
        assert_eq!(sent, vec![Bytes::from("BEGIN"), Bytes::from("INSERT INTO orders VALUES (1)")]);
        assert_eq!(fixture.session.lock().unwrap().active_node, Some(0));
    }

    #[test]
    fn test_transaction_is_sticky_until_commit() {
        let mut fixture = harness(&["node-0", "node-1"], Box::new(ReadWriteSplit));
        let route = |text: &str| {
            fixture
                .router
                .on_client_statement(&fixture.session, Statement::new(text.to_string()))
                .unwrap()
        };

        assert!(route("BEGIN"));
        assert!(route("INSERT INTO orders VALUES (1)"));
        assert_eq!(fixture.session.lock().unwrap().active_node, Some(0));

        // BEGIN and INSERT acknowledged, transaction still open.
        for _ in 0..2 {
            fixture
                .router
                .on_backend_reply(&fixture.session, "node-0", Reply::new("OK"))
                .unwrap();
        }

        // COMMIT follows the sticky node, then releases it.
        assert!(route("COMMIT"));
        assert_eq!(drain(&mut fixture.receivers[0]).len(), 3);
        assert!(drain(&mut fixture.receivers[1]).is_empty());
        assert_eq!(fixture.session.lock().unwrap().active_node, None);
    }

    #[test]
    fn test_session_command_fans_out_to_live_backends() {
        let mut fixture = harness(&["node-0", "node-1", "node-2"], Box::new(ReadWriteSplit));
        fixture.session.lock().unwrap().backends[1].close();

        assert!(fixture
            .router
            .on_client_statement(&fixture.session, Statement::new("SET NAMES utf8"))
            .unwrap());

        assert_eq!(drain(&mut fixture.receivers[0]).len(), 1);
        assert!(drain(&mut fixture.receivers[1]).is_empty());
        assert_eq!(drain(&mut fixture.receivers[2]).len(), 1);

        let state = fixture.session.lock().unwrap();
        assert_eq!(state.ledger.latest(), 1);
        assert_eq!(state.backends[1].cursor.applied(), 0);
        drop(state);
        assert_eq!(RouterStats::get(&fixture.router.stats().all), 1);
    }

    #[test]
    fn test_session_command_reply_forwarded_once() {
        let fixture = harness(&["node-0", "node-1"], Box::new(ReadWriteSplit));
        fixture
            .router
            .on_client_statement(&fixture.session, Statement::new("SET NAMES utf8"))
            .unwrap();

        let ok = Reply::new("OK").session_command();
        assert!(fixture
            .router
            .on_backend_reply(&fixture.session, "node-0", ok.clone())
            .unwrap());
        assert!(!fixture
            .router
            .on_backend_reply(&fixture.session, "node-1", ok)
            .unwrap());
    }

    #[test]
    fn test_diverged_backend_is_closed() {
        let fixture = harness(&["node-0", "node-1"], Box::new(ReadWriteSplit));
        fixture
            .router
            .on_client_statement(&fixture.session, Statement::new("SET NAMES utf8"))
            .unwrap();

        let ok = Reply::new("OK").session_command();
        let err = Reply::new("ERR").session_command().error();
        assert!(fixture
            .router
            .on_backend_reply(&fixture.session, "node-0", ok)
            .unwrap());
        assert!(!fixture
            .router
            .on_backend_reply(&fixture.session, "node-1", err)
            .unwrap());

        assert!(!fixture.session.lock().unwrap().backends[1].in_use());
    }

    #[test]
    fn test_one_pending_statement_per_backend() {
        let mut fixture = harness(&["node-0"], Box::new(ReadWriteSplit));
        let route = |text: &str| {
            fixture
                .router
                .on_client_statement(&fixture.session, Statement::new(text.to_string()))
                .unwrap()
        };

        assert!(route("SELECT 1 FROM orders"));
        // Reply outstanding: the second statement parks.
        assert!(route("SELECT 2 FROM orders"));
        // A third violates the one-pending invariant and is dropped.
        assert!(!route("SELECT 3 FROM orders"));

        assert_eq!(drain(&mut fixture.receivers[0]).len(), 1);

        // The reply releases the parked statement.
        assert!(fixture
            .router
            .on_backend_reply(&fixture.session, "node-0", Reply::new("OK"))
            .unwrap());
        let sent = drain(&mut fixture.receivers[0]);
        assert_eq!(sent, vec![Bytes::from("SELECT 2 FROM orders")]);
    }

    #[test]
    fn test_write_conflict_is_retried() {
        let mut fixture = harness(&["node-0", "node-1"], Box::new(ConflictAvoiding));
        fixture
            .router
            .on_client_statement(
                &fixture.session,
                Statement::new("INSERT INTO orders VALUES (1)"),
            )
            .unwrap();

        // Find the hash-selected node.
        let target = (0..fixture.receivers.len())
            .find(|index| !drain(&mut fixture.receivers[*index]).is_empty())
            .unwrap();
        let name = format!("node-{}", target);

        let conflict = BackendError::new(BackendErrorKind::WriteConflict(1213), "ERR");
        assert_eq!(
            fixture
                .router
                .on_backend_error(&fixture.session, &name, conflict),
            Disposition::Suppressed
        );

        // Resubmitted to the same node.
        let resent = drain(&mut fixture.receivers[target]);
        assert_eq!(resent, vec![Bytes::from("INSERT INTO orders VALUES (1)")]);
        assert_eq!(
            RouterStats::get(&fixture.router.stats().conflict_retries),
            1
        );
    }

    #[test]
    fn test_conflict_retries_are_bounded() {
        let fixture = harness(&["node-0"], Box::new(ConflictAvoiding));
        fixture
            .router
            .on_client_statement(
                &fixture.session,
                Statement::new("INSERT INTO orders VALUES (1)"),
            )
            .unwrap();

        let conflict = || BackendError::new(BackendErrorKind::WriteConflict(1213), "ERR");
        for _ in 0..3 {
            assert_eq!(
                fixture
                    .router
                    .on_backend_error(&fixture.session, "node-0", conflict()),
                Disposition::Suppressed
            );
        }
        // Retry budget spent; the client gets the error.
        assert_eq!(
            fixture
                .router
                .on_backend_error(&fixture.session, "node-0", conflict()),
            Disposition::Forward
        );
    }

    #[test]
    fn test_unreachable_backend_is_dropped() {
        let mut fixture = harness(&["node-0", "node-1"], Box::new(ReadWriteSplit));
        fixture.topology.set_joined("node-1", false);

        let gone = BackendError::new(BackendErrorKind::Unreachable, "");
        assert_eq!(
            fixture
                .router
                .on_backend_error(&fixture.session, "node-1", gone),
            Disposition::BackendClosed
        );

        // Reads fall back to the primary from here on.
        assert!(fixture
            .router
            .on_client_statement(&fixture.session, Statement::new("SELECT * FROM orders"))
            .unwrap());
        assert_eq!(drain(&mut fixture.receivers[0]).len(), 1);
    }

    #[test]
    fn test_last_backend_gone_closes_session() {
        let fixture = harness(&["node-0"], Box::new(ReadWriteSplit));
        fixture.topology.set_joined("node-0", false);

        let gone = BackendError::new(BackendErrorKind::Unreachable, "");
        assert_eq!(
            fixture
                .router
                .on_backend_error(&fixture.session, "node-0", gone),
            Disposition::SessionClosed
        );

        assert!(fixture.session.is_closed());
        assert!(fixture.router.sessions().is_empty());
    }

    #[test]
    fn test_joining_backend_replays_the_ledger() {
        let mut fixture = harness(&["node-0", "node-1"], Box::new(ReadWriteSplit));
        let route = |text: &str| {
            fixture
                .router
                .on_client_statement(&fixture.session, Statement::new(text.to_string()))
                .unwrap()
        };
        assert!(route("SET NAMES utf8"));
        assert!(route("USE app"));

        // A new member appears, then a failure triggers recovery.
        let mut joined_rx = add_node(&fixture.topology, "node-2", Role::Replica);
        fixture.topology.set_joined("node-1", false);

        let gone = BackendError::new(BackendErrorKind::Unreachable, "");
        assert_eq!(
            fixture
                .router
                .on_backend_error(&fixture.session, "node-1", gone),
            Disposition::BackendClosed
        );

        // Full prefix, in ledger order, before anything else.
        let replayed = drain(&mut joined_rx);
        assert_eq!(
            replayed,
            vec![Bytes::from("SET NAMES utf8"), Bytes::from("USE app")]
        );
    }

    #[test]
    fn test_statement_after_close_is_not_routed() {
        let fixture = harness(&["node-0"], Box::new(ReadWriteSplit));
        fixture.router.on_session_close(&fixture.session);

        assert!(!fixture
            .router
            .on_client_statement(&fixture.session, Statement::new("SELECT 1"))
            .unwrap());
        assert!(!fixture
            .router
            .on_backend_reply(&fixture.session, "node-0", Reply::new("OK"))
            .unwrap());
    }

    #[test]
    fn test_fanout_with_no_backends_fails() {
        let fixture = harness(&["node-0"], Box::new(ReadWriteSplit));
        fixture.session.lock().unwrap().backends[0].close();

        assert!(!fixture
            .router
            .on_client_statement(&fixture.session, Statement::new("SET NAMES utf8"))
            .unwrap());
    }

    #[test]
    fn test_temp_table_read_goes_to_master() {
        let mut fixture = harness(&["node-0", "node-1"], Box::new(ReadWriteSplit));
        let route = |text: &str| {
            fixture
                .router
                .on_client_statement(&fixture.session, Statement::new(text.to_string()))
                .unwrap()
        };

        assert!(route("CREATE TEMPORARY TABLE scratch (id INT)"));
        assert_eq!(drain(&mut fixture.receivers[0]).len(), 1);
        fixture
            .router
            .on_backend_reply(&fixture.session, "node-0", Reply::new("OK"))
            .unwrap();

        // The read targets the primary; the replica never saw the
        // table.
        assert!(route("SELECT * FROM scratch"));
        assert_eq!(drain(&mut fixture.receivers[0]).len(), 1);
        assert!(drain(&mut fixture.receivers[1]).is_empty());
    }

    #[test]
    fn test_queued_begin_follows_parked_statement() {
        let mut fixture = harness(&["node-0"], Box::new(ReadWriteSplit));

        assert!(fixture
            .router
            .on_client_statement(&fixture.session, Statement::new("SELECT * FROM orders"))
            .unwrap());
        assert!(fixture
            .router
            .on_client_statement(&fixture.session, Statement::new("BEGIN"))
            .unwrap());
        // The reply is outstanding, so the statement parks and the
        // BEGIN stays queued behind it.
        assert!(fixture
            .router
            .on_client_statement(
                &fixture.session,
                Statement::new("INSERT INTO orders VALUES (1)")
            )
            .unwrap());
        assert_eq!(
            drain(&mut fixture.receivers[0]),
            vec![Bytes::from("SELECT * FROM orders")]
        );

        // The reply flushes both, BEGIN first.
        assert!(fixture
            .router
            .on_backend_reply(&fixture.session, "node-0", Reply::new("OK"))
            .unwrap());
        assert_eq!(
            drain(&mut fixture.receivers[0]),
            vec![
                Bytes::from("BEGIN"),
                Bytes::from("INSERT INTO orders VALUES (1)")
            ]
        );
        assert_eq!(fixture.session.lock().unwrap().active_node, Some(0));
    }

    #[test]
    fn test_sticky_node_survives_pending_flush() {
        let mut fixture = harness(
            &["node-0", "node-1", "node-2", "node-3"],
            Box::new(ConflictAvoiding),
        );

        assert!(fixture
            .router
            .on_client_statement(
                &fixture.session,
                Statement::new("INSERT INTO orders VALUES (1)")
            )
            .unwrap());
        let hashed = (0..fixture.receivers.len())
            .find(|index| !drain(&mut fixture.receivers[*index]).is_empty())
            .unwrap();
        let name = format!("node-{}", hashed);

        assert!(fixture
            .router
            .on_client_statement(&fixture.session, Statement::new("BEGIN"))
            .unwrap());
        // Same table, same hash node; parks behind the open reply.
        assert!(fixture
            .router
            .on_client_statement(
                &fixture.session,
                Statement::new("INSERT INTO orders VALUES (2)")
            )
            .unwrap());

        assert!(fixture
            .router
            .on_backend_reply(&fixture.session, &name, Reply::new("OK"))
            .unwrap());
        assert_eq!(drain(&mut fixture.receivers[hashed]).len(), 2);
        // The flushed dispatch pinned the transaction to the node.
        assert_eq!(fixture.session.lock().unwrap().active_node, Some(hashed));

        for _ in 0..2 {
            fixture
                .router
                .on_backend_reply(&fixture.session, &name, Reply::new("OK"))
                .unwrap();
        }

        // A different table would hash elsewhere; the sticky node
        // still takes it while the transaction is open.
        assert!(fixture
            .router
            .on_client_statement(
                &fixture.session,
                Statement::new("INSERT INTO users VALUES (1)")
            )
            .unwrap());
        for index in 0..fixture.receivers.len() {
            let sent = drain(&mut fixture.receivers[index]);
            if index == hashed {
                assert_eq!(sent, vec![Bytes::from("INSERT INTO users VALUES (1)")]);
            } else {
                assert!(sent.is_empty());
            }
        }
    }

    #[test]
    fn test_sessions_do_not_share_backend_connections() {
        let mut fixture = harness(&["node-0", "node-1"], Box::new(ReadWriteSplit));
        let other = fixture.router.new_session("app").expect("session");

        // Closing one session must not sever the other's backends.
        fixture.router.on_session_close(&fixture.session);

        assert!(fixture
            .router
            .on_client_statement(&other, Statement::new("INSERT INTO orders VALUES (1)"))
            .unwrap());
        assert_eq!(drain(&mut fixture.receivers[0]).len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_sessions() {
        let topology = Arc::new(StaticTopology::new());
        for (index, name) in ["node-0", "node-1"].iter().enumerate() {
            let role = if index == 0 {
                Role::Primary
            } else {
                Role::Replica
            };
            let rx = add_node(&topology, name, role);
            std::mem::forget(rx);
        }

        let router = Arc::new(Router::with_policy(
            Arc::new(KeywordClassifier),
            topology,
            Box::new(ReadWriteSplit),
        ));

        let mut handles = vec![];
        for _ in 0..4 {
            let router = router.clone();
            handles.push(tokio::spawn(async move {
                let session = router.new_session("app").expect("session");
                assert!(router
                    .on_client_statement(
                        &session,
                        Statement::new("INSERT INTO orders VALUES (1)")
                    )
                    .unwrap());
                router.on_session_close(&session);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(RouterStats::get(&router.stats().queries), 4);
        assert!(router.sessions().is_empty());
    }
}
