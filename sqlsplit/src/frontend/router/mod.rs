//! Statement router.
//!
//! Owns the per-statement pipeline: classification fold-in,
//! transaction and temp-table tracking, session-command fan-out,
//! target resolution, backend selection through the configured
//! policy, dispatch, reply reassembly and failure recovery.

pub mod error;
pub mod hash;
pub mod policy;
pub mod target;

#[cfg(test)]
pub(crate) mod test;

pub use error::Error;
pub use policy::{Policy, Selection};
pub use target::{resolve, RouteTarget};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use crate::backend::{BackendRef, RefState, Topology};
use crate::classifier::{Classifier, QueryType};
use crate::config::config;
use crate::net::{BackendError, BackendErrorKind, Reply, Statement};
use crate::stats::RouterStats;

use super::registry::SessionRegistry;
use super::sescmd::Reconciled;
use super::session::{Session, SessionState};

/// What became of a backend error report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Disposition {
    /// Error goes to the client.
    Forward,
    /// Statement was retried; the client sees nothing.
    Suppressed,
    /// Backend dropped from the session; remaining nodes carry on.
    BackendClosed,
    /// Last backend gone; the session is closed.
    SessionClosed,
}

enum Dispatch {
    /// Written to the backend.
    Sent,
    /// Parked on the reference until its backend is ready.
    Queued,
    /// Invariant violation; statement dropped.
    Dropped,
    /// The backend rejected the write.
    WriteFailed,
}

/// Query router for one service.
pub struct Router {
    classifier: Arc<dyn Classifier>,
    topology: Arc<dyn Topology>,
    policy: Box<dyn Policy>,
    registry: SessionRegistry,
    stats: RouterStats,
    next_session_id: AtomicU64,
}

impl Router {
    /// Create a router with the configured policy.
    pub fn new(classifier: Arc<dyn Classifier>, topology: Arc<dyn Topology>) -> Self {
        let policy = policy::from_config(config().general.policy);
        Self::with_policy(classifier, topology, policy)
    }

    pub fn with_policy(
        classifier: Arc<dyn Classifier>,
        topology: Arc<dyn Topology>,
        policy: Box<dyn Policy>,
    ) -> Self {
        Self {
            classifier,
            topology,
            policy,
            registry: SessionRegistry::new(),
            stats: RouterStats::default(),
            next_session_id: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Create a session and connect it to every joined topology
    /// member.
    pub fn new_session(&self, default_db: &str) -> Result<Arc<Session>, Error> {
        let id = self.next_session_id.fetch_add(1, Ordering::AcqRel) + 1;
        let session = Arc::new(Session::new(id, default_db));

        {
            let mut state = match session.lock() {
                Some(state) => state,
                None => return Err(Error::SessionClosed),
            };

            for descriptor in self.topology.backends() {
                if !descriptor.joined {
                    continue;
                }
                match self.topology.connect(&descriptor.name) {
                    Ok(conn) => state.backends.push(BackendRef::new(conn)),
                    Err(err) => {
                        warn!(backend = descriptor.name.as_str(), %err, "connect failed");
                    }
                }
            }

            if state.live_backends() == 0 {
                return Err(Error::TopologyExhausted);
            }
        }

        debug!(session = session.id(), policy = self.policy.name(), "session open");
        self.registry.insert(session.clone());
        Ok(session)
    }

    /// Route one client statement.
    ///
    /// Returns `Ok(true)` when the statement was dispatched or
    /// queued, `Ok(false)` when no backend could take it while the
    /// session stays open, and an error when the session is gone.
    pub fn on_client_statement(
        &self,
        session: &Session,
        stmt: Statement,
    ) -> Result<bool, Error> {
        let mut state = match session.lock() {
            Some(state) => state,
            None => {
                warn!(session = session.id(), "can't route statement, session is closed");
                return Ok(false);
            }
        };

        let mut qtype = self.classifier.classify(&stmt);
        if qtype.is_unknown() {
            // Safe default: the primary can serve anything.
            warn!("statement could not be classified, routing to master");
        }

        let db = state.default_db.clone();
        qtype = state
            .tmp_tables
            .reclassify(&db, &stmt, qtype, self.classifier.as_ref());
        if qtype.is(QueryType::READ_TMP_TABLE) {
            // Temporary tables only exist on the node that made them.
            qtype |= QueryType::WRITE;
        }

        let was_active = state.trx.active();
        state.trx.update(qtype);

        trace!(
            autocommit = state.trx.autocommit(),
            trx_open = state.trx.active(),
            %qtype,
            "> {}",
            stmt.text()
        );

        let general = config().general.clone();

        if self.classifier.is_session_command(&stmt) {
            let routed = self.route_session_command(&mut state, stmt, general.max_slave_connections);
            if routed {
                RouterStats::incr(&self.stats.queries);
                RouterStats::incr(&self.stats.all);
            }
            return Ok(routed);
        }

        // Hold BEGIN until the next statement reveals what the
        // transaction touches; only then is a backend worth
        // committing to.
        if self.classifier.is_begin(&stmt) && state.active_node.is_none() {
            if let Some(old) = state.queued.replace(stmt) {
                warn!("replacing queued statement: {}", old.text());
            }
            return Ok(true);
        }

        let target = resolve(
            qtype,
            state.trx.active(),
            general.use_sql_variables_in.master_only(),
            stmt.hints(),
        );
        let tables = self.classifier.table_names(&stmt);
        let in_trx = was_active || state.trx.active();

        let index = match self.select(&state, target, &tables, &stmt, in_trx, &general) {
            Ok(index) => index,
            Err(err) => {
                warn!(%target, %err, "no route for statement");
                return Ok(false);
            }
        };

        match self.dispatch_to(&mut state, index, &stmt) {
            Dispatch::Sent => {
                self.finish_dispatch(&mut state, index, &stmt, target);
                Ok(true)
            }
            Dispatch::Queued => Ok(true),
            Dispatch::Dropped => Ok(false),
            Dispatch::WriteFailed => {
                if self.recover(&mut state) == 0 {
                    session.close_with(&mut state);
                    drop(state);
                    self.registry.remove(session.id());
                    return Err(Error::TopologyExhausted);
                }

                // One more attempt on the refreshed backend set.
                let index = match self.select(&state, target, &tables, &stmt, in_trx, &general) {
                    Ok(index) => index,
                    Err(err) => {
                        warn!(%target, %err, "no route after recovery");
                        return Ok(false);
                    }
                };

                match self.dispatch_to(&mut state, index, &stmt) {
                    Dispatch::Sent => {
                        self.finish_dispatch(&mut state, index, &stmt, target);
                        Ok(true)
                    }
                    Dispatch::Queued => Ok(true),
                    _ => Ok(false),
                }
            }
        }
    }

    /// Process a reply from a backend. Returns whether the reply
    /// is forwarded to the client.
    pub fn on_backend_reply(
        &self,
        session: &Session,
        backend: &str,
        reply: Reply,
    ) -> Result<bool, Error> {
        let mut state = match session.lock() {
            Some(state) => state,
            None => {
                trace!(backend, "reply after session close, dropped");
                return Ok(false);
            }
        };

        let SessionState {
            ledger, backends, ..
        } = &mut *state;

        let index = match backends.iter().position(|bref| bref.name() == backend) {
            Some(index) => index,
            None => {
                trace!(backend, "reply from unknown backend, dropped");
                return Ok(false);
            }
        };
        let bref = &mut backends[index];
        let conn = bref.conn().clone();

        let forward = if reply.is_session_command() {
            // Only the first backend's confirmation reaches the
            // client; the rest are duplicates by construction.
            match ledger.reconcile_reply(&mut bref.cursor, &reply) {
                Reconciled::Forward => true,
                Reconciled::Discard => false,
                Reconciled::Diverged => {
                    warn!(backend, "backend diverged on a session command, closing");
                    bref.close();
                    return Ok(false);
                }
            }
        } else if bref.state().is(RefState::QUERY_ACTIVE) {
            bref.replied();
            true
        } else {
            trace!(backend, "unsolicited reply");
            true
        };

        // Catch up on commands appended while this one was in
        // flight.
        if !ledger.advance(&mut bref.cursor, conn.as_ref(), index) {
            bref.close();
            return Ok(forward);
        }

        // A statement may have been parked behind the reply.
        let ready =
            bref.pending.is_some() && !bref.waiting_result() && ledger.caught_up(&bref.cursor);
        if ready {
            if let Some(pending) = state.backends[index].pending.take() {
                self.flush_pending(&mut state, index, &pending);
            }
        }

        Ok(forward)
    }

    /// Dispatch a statement parked on a backend, with the same
    /// bookkeeping as a first-time dispatch: a queued `BEGIN` goes
    /// out first, the sticky node and counters are updated.
    fn flush_pending(&self, state: &mut SessionState, index: usize, stmt: &Statement) {
        let general = config().general.clone();
        let qtype = self.classifier.classify(stmt);
        let target = resolve(
            qtype,
            state.trx.active(),
            general.use_sql_variables_in.master_only(),
            stmt.hints(),
        );

        if let Dispatch::Sent = self.dispatch_to(state, index, stmt) {
            self.finish_dispatch(state, index, stmt, target);
        }
    }

    /// Handle an error reply from a backend.
    pub fn on_backend_error(
        &self,
        session: &Session,
        backend: &str,
        error: BackendError,
    ) -> Disposition {
        let mut state = match session.lock() {
            Some(state) => state,
            None => return Disposition::SessionClosed,
        };

        let index = match state.backends.iter().position(|bref| bref.name() == backend) {
            Some(index) => index,
            None => return Disposition::Forward,
        };

        let general = config().general.clone();

        match error.kind {
            BackendErrorKind::WriteConflict(code)
                if self.policy.retryable_conflict(code)
                    && state.conflict_retries < general.max_write_conflict_retries =>
            {
                if let Some((last_index, stmt)) = state.last_stmt.clone() {
                    let conn = state.backends[index].conn().clone();
                    if last_index == index && conn.write(stmt.buffer()) {
                        state.conflict_retries += 1;
                        RouterStats::incr(&self.stats.conflict_retries);
                        debug!(
                            backend,
                            code,
                            retry = state.conflict_retries,
                            "write conflict, resubmitting statement"
                        );
                        return Disposition::Suppressed;
                    }
                }
                Disposition::Forward
            }
            BackendErrorKind::Unreachable => {
                warn!(backend, "backend unreachable, dropping from session");
                state.backends[index].close();

                if self.recover(&mut state) == 0 {
                    session.close_with(&mut state);
                    drop(state);
                    self.registry.remove(session.id());
                    return Disposition::SessionClosed;
                }
                Disposition::BackendClosed
            }
            _ => {
                state.backends[index].replied();
                Disposition::Forward
            }
        }
    }

    /// Tear the session down: close every backend connection and
    /// unregister it. Replies still in flight are dropped.
    pub fn on_session_close(&self, session: &Session) {
        debug!(session = session.id(), "session close");
        session.close();
        self.registry.remove(session.id());
    }

    /// Fan a session command out to every backend in use, through
    /// each backend's own ledger cursor.
    fn route_session_command(
        &self,
        state: &mut SessionState,
        stmt: Statement,
        failure_tolerance: usize,
    ) -> bool {
        trace!("session write, routing to all servers");

        if state.live_backends() == 0 {
            warn!("session doesn't have any backends in use, routing failed");
            return false;
        }

        let SessionState {
            ledger, backends, ..
        } = &mut *state;

        let seq = ledger.append(stmt);
        let mut succeeded = 0;
        let mut failed = 0;

        for (index, bref) in backends.iter_mut().enumerate() {
            if !bref.in_use() {
                continue;
            }
            let conn = bref.conn().clone();
            if ledger.advance(&mut bref.cursor, conn.as_ref(), index) {
                succeeded += 1;
            } else {
                // Unhealthy for this session; reconnection happens
                // through recovery.
                bref.close();
                failed += 1;
            }
        }

        debug!(seq, succeeded, failed, "session command fanned out");
        succeeded >= 1 && failed <= failure_tolerance
    }

    fn select(
        &self,
        state: &SessionState,
        target: RouteTarget,
        tables: &[String],
        stmt: &Statement,
        in_transaction: bool,
        general: &crate::config::General,
    ) -> Result<usize, Error> {
        let selection = Selection {
            target,
            backends: &state.backends,
            active_node: state.active_node,
            tables,
            hints: stmt.hints(),
            in_transaction,
            default_max_lag: general.max_replication_lag,
            safe_reads: general.safe_reads,
        };
        self.policy.select(&selection)
    }

    /// Write a statement to the chosen backend, replaying any
    /// session commands it hasn't applied first.
    fn dispatch_to(&self, state: &mut SessionState, index: usize, stmt: &Statement) -> Dispatch {
        let SessionState {
            ledger,
            backends,
            queued,
            ..
        } = &mut *state;

        let bref = &mut backends[index];
        let conn = bref.conn().clone();

        if !ledger.advance(&mut bref.cursor, conn.as_ref(), index) {
            bref.close();
            return Dispatch::WriteFailed;
        }

        // One outstanding statement per backend reference; while a
        // reply or a session-command ack is due, the statement
        // parks on the reference.
        if bref.waiting_result() || !ledger.caught_up(&bref.cursor) {
            if bref.pending.is_some() {
                error!(
                    backend = bref.name(),
                    "statement already pending on backend, dropping statement to preserve ordering"
                );
                return Dispatch::Dropped;
            }
            bref.pending = Some(stmt.clone());
            return Dispatch::Queued;
        }

        // A queued BEGIN rides along in front of the statement
        // that chose the backend.
        if let Some(begin) = queued.take() {
            if !conn.write(begin.buffer()) {
                warn!(backend = bref.name(), "routing queued BEGIN failed");
                bref.close();
                return Dispatch::WriteFailed;
            }
            bref.dispatched();
        }

        if !conn.write(stmt.buffer()) {
            warn!(backend = bref.name(), "routing query failed");
            bref.close();
            return Dispatch::WriteFailed;
        }
        bref.dispatched();

        Dispatch::Sent
    }

    fn finish_dispatch(
        &self,
        state: &mut SessionState,
        index: usize,
        stmt: &Statement,
        target: RouteTarget,
    ) {
        let is_primary = {
            let bref = &state.backends[index];
            trace!(
                backend = bref.name(),
                role = if bref.conn().is_primary() { "master" } else { "slave" },
                "route query <"
            );
            bref.conn().is_primary()
        };

        state.last_stmt = Some((index, stmt.clone()));

        if state.trx.active() {
            // Sticky for the rest of the transaction.
            state.active_node = Some(index);
        } else {
            state.active_node = None;
            state.conflict_retries = 0;
        }

        RouterStats::incr(&self.stats.queries);
        if target.is(RouteTarget::SLAVE) && is_primary {
            RouterStats::incr(&self.stats.fallbacks);
        }
        self.count_route(is_primary);
    }

    fn count_route(&self, is_primary: bool) {
        if is_primary {
            RouterStats::incr(&self.stats.master);
        } else {
            RouterStats::incr(&self.stats.slave);
        }
    }

    /// Reconnect to topology members the session lost. New
    /// backends replay the full session-command ledger before
    /// they're trusted with anything else.
    fn recover(&self, state: &mut SessionState) -> usize {
        for descriptor in self.topology.backends() {
            if !descriptor.joined {
                continue;
            }

            let represented = state
                .backends
                .iter()
                .any(|bref| bref.in_use() && bref.name() == descriptor.name);
            if represented {
                continue;
            }

            match self.topology.connect(&descriptor.name) {
                Ok(conn) => {
                    let index = state.backends.len();
                    let mut bref = BackendRef::new(conn.clone());

                    if state.ledger.advance(&mut bref.cursor, conn.as_ref(), index) {
                        info!(backend = descriptor.name.as_str(), "backend joined session");
                        state.backends.push(bref);
                    } else {
                        warn!(
                            backend = descriptor.name.as_str(),
                            "session command replay failed on joining backend"
                        );
                        conn.close();
                    }
                }
                Err(err) => {
                    warn!(backend = descriptor.name.as_str(), %err, "reconnect failed");
                }
            }
        }

        let live = state.live_backends();
        if live == 0 {
            error!("all attempts to connect to backends failed, closing session");
        }
        live
    }
}
