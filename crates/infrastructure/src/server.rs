//! Lifecycle facade for one fake DNS server instance.
//!
//! ```no_run
//! # use fakedns_domain::Settings;
//! # use fakedns_infrastructure::FakeDns;
//! # async fn demo() {
//! let mut server = FakeDns::new(Settings::new(0, "example.com.", "cloud.example.com."))
//!     .add_a_record("www.example.com.", "192.0.2.10".parse().unwrap())
//!     .start()
//!     .await;
//!
//! let result = server
//!     .run_workload(|addr| async move {
//!         // resolve against `addr`
//!         let _ = addr;
//!     })
//!     .await;
//! assert!(result.is_ok());
//! # }
//! ```

use crate::dns::listener::TransportListener;
use crate::dns::probe::ReadinessProbe;
use crate::dns::responder::Responder;
use crate::dns::router::ZoneRouter;
use crate::dns::tsig::TsigKeyring;
use crate::dns::wire::WireName;
use crate::repositories::RecordStore;
use fakedns_application::ports::RecordRepository;
use fakedns_application::use_cases::AnswerQueryUseCase;
use fakedns_domain::{
    FakeDnsError, ResourceRecord, ServerState, Settings, StartOutcome, Transport,
};
use futures::FutureExt;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type ErrorSlot = Arc<OnceLock<FakeDnsError>>;

pub struct FakeDns {
    settings: Settings,
    records: Arc<RecordStore>,
    state: ServerState,
    done: CancellationToken,
    error: ErrorSlot,
    local_addr: Option<SocketAddr>,
    listeners: Vec<JoinHandle<()>>,
    monitor: Option<JoinHandle<()>>,
}

impl FakeDns {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            records: Arc::new(RecordStore::new()),
            state: ServerState::Configured,
            done: CancellationToken::new(),
            error: Arc::new(OnceLock::new()),
            local_addr: None,
            listeners: Vec::new(),
            monitor: None,
        }
    }

    // ── record builders ────────────────────────────────────────────────────

    pub fn add_txt_record<I, S>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_record(ResourceRecord::txt(name, values))
    }

    pub fn add_ns_record(self, name: &str, nameserver: &str) -> Self {
        self.add_record(ResourceRecord::ns(name, nameserver))
    }

    pub fn add_a_record(self, name: &str, address: Ipv4Addr) -> Self {
        self.add_record(ResourceRecord::a(name, address))
    }

    /// AAAA record owned by the answer zone. IPv4 input is stored IPv4-mapped.
    pub fn add_aaaa_record(self, address: IpAddr) -> Self {
        let address = match address {
            IpAddr::V4(v4) => v4.to_ipv6_mapped(),
            IpAddr::V6(v6) => v6,
        };
        let owner = self.settings.answer_zone().to_string();
        self.add_record(ResourceRecord::aaaa(owner, address))
    }

    pub fn add_aaaa_record_for(self, name: &str, address: Ipv6Addr) -> Self {
        self.add_record(ResourceRecord::aaaa(name, address))
    }

    pub fn add_cname_record(self, name: &str, target: &str) -> Self {
        self.add_record(ResourceRecord::cname(name, target))
    }

    pub fn add_mx_record(self, name: &str, preference: u16, exchange: &str) -> Self {
        self.add_record(ResourceRecord::mx(name, preference, exchange))
    }

    pub fn add_srv_record(
        self,
        name: &str,
        priority: u16,
        weight: u16,
        port: u16,
        target: &str,
    ) -> Self {
        self.add_record(ResourceRecord::srv(name, priority, weight, port, target))
    }

    /// Appends `record`; ignored with a warning when the server only reflects clients.
    pub fn add_record(self, record: ResourceRecord) -> Self {
        if self.settings.answer_mode().accepts_static_records() {
            debug!(name = %record.name, record_type = %record.record_type(), "Record added");
            self.records.add(record);
        } else {
            warn!(
                name = %record.name,
                record_type = %record.record_type(),
                "Ignoring static record: server reflects clients only"
            );
        }
        self
    }

    // ── lifecycle ──────────────────────────────────────────────────────────

    /// Binds every configured transport, then waits until the readiness probe
    /// succeeds or the start fails. Inspect `state()` or `error()` afterwards.
    pub async fn start(mut self) -> Self {
        if self.state != ServerState::Configured {
            warn!(state = %self.state, "Start ignored: server was already started");
            return self;
        }

        self.transition(ServerState::Starting);
        info!(
            bind_address = %self.settings.bind_socket_addr(),
            edge_zone = %self.settings.edge_zone(),
            answer_zone = %self.settings.answer_zone(),
            "Starting fake DNS server"
        );

        let outcome = match self.launch() {
            Ok(outcome_rx) => outcome_rx
                .await
                .unwrap_or_else(|_| StartOutcome::Failed(FakeDnsError::ProbeAborted)),
            Err(err) => StartOutcome::Failed(err),
        };

        match outcome {
            StartOutcome::Ready { addr } => {
                self.local_addr = Some(addr);
                self.transition(ServerState::Ready);
            }
            StartOutcome::Failed(err) => {
                error!(error = %err, "Fake DNS server failed to start");
                let _ = self.error.set(err);
                self.shutdown().await;
                self.transition(ServerState::Failed);
            }
        }
        self
    }

    /// Runs `workload` against the live server, then stops it. The workload is
    /// skipped when the start failed. A panicking workload is resumed after the
    /// server stopped.
    pub async fn run_workload<F, Fut>(&mut self, workload: F) -> Result<(), FakeDnsError>
    where
        F: FnOnce(SocketAddr) -> Fut,
        Fut: Future<Output = ()>,
    {
        let addr = match (self.state, self.local_addr) {
            (ServerState::Ready, Some(addr)) => addr,
            _ => {
                return Err(self.error().cloned().unwrap_or_else(|| {
                    FakeDnsError::InvalidState {
                        expected: ServerState::Ready.to_string(),
                        actual: self.state.to_string(),
                    }
                }))
            }
        };

        self.transition(ServerState::Running);
        let result = AssertUnwindSafe(workload(addr)).catch_unwind().await;
        self.stop().await;

        if let Err(panic) = result {
            std::panic::resume_unwind(panic);
        }

        match self.error() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Fires the shutdown signal and waits until every listener released its socket.
    pub async fn stop(&mut self) {
        if self.state.is_terminal() || self.state == ServerState::Configured {
            return;
        }

        self.shutdown().await;
        match self.error() {
            Some(err) => {
                warn!(error = %err, "Fake DNS server stopped after failure");
                self.transition(ServerState::Failed);
            }
            None => {
                info!("Fake DNS server stopped");
                self.transition(ServerState::Stopped);
            }
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// First fatal error: bind, serve or probe.
    pub fn error(&self) -> Option<&FakeDnsError> {
        self.error.get()
    }

    /// Address the server answers on once ready. Reports the resolved port
    /// when configured with port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Level-triggered stop signal shared with every listener task.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.done.clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn records(&self) -> Arc<dyn RecordRepository> {
        self.records.clone()
    }

    // ── internals ──────────────────────────────────────────────────────────

    /// Binds the listeners and spawns them with the monitor. Bind errors
    /// return immediately; everything later arrives on the outcome channel.
    fn launch(&mut self) -> Result<oneshot::Receiver<StartOutcome>, FakeDnsError> {
        let router = Arc::new(self.build_router()?);

        let mut bind_addr = self.settings.bind_socket_addr();
        let mut bound = Vec::new();
        for transport in self.settings.transports().iter().copied() {
            let listener = TransportListener::bind(transport, bind_addr)?;
            bind_addr = listener.local_addr();
            bound.push(listener);
        }

        let probe_transport = if self.settings.serves(Transport::Udp) {
            Transport::Udp
        } else {
            Transport::Tcp
        };
        let target = self.settings.probe_target(bind_addr.port());

        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        for listener in bound {
            self.listeners
                .push(listener.serve(router.clone(), self.done.clone(), errors_tx.clone()));
        }

        let probe = ReadinessProbe::new(
            probe_transport,
            target,
            self.settings.answer_zone(),
            self.settings.probe(),
        );
        let (outcome_tx, outcome_rx) = oneshot::channel();
        self.monitor = Some(tokio::spawn(monitor(
            probe,
            bind_addr,
            self.done.clone(),
            errors_rx,
            self.error.clone(),
            outcome_tx,
        )));

        Ok(outcome_rx)
    }

    fn build_router(&self) -> Result<ZoneRouter, FakeDnsError> {
        let invalid_zone = |zone: &str| FakeDnsError::InvalidZone(zone.to_string());
        let sentinel = self.settings.truncation_sentinel();
        let sentinel = WireName::parse(&sentinel).map_err(|_| invalid_zone(&sentinel))?;
        WireName::parse(self.settings.answer_zone())
            .map_err(|_| invalid_zone(self.settings.answer_zone()))?;

        let keyring = TsigKeyring::from_configs(self.settings.tsig_keys())
            .map_err(|e| FakeDnsError::InvalidTsigKey(e.to_string()))?;

        let answer_query = AnswerQueryUseCase::new(
            self.records.clone(),
            self.settings.answer_mode(),
            self.settings.answer_zone(),
        );
        let responder = Responder::new(answer_query, sentinel, Arc::new(keyring));

        ZoneRouter::new()
            .register(self.settings.edge_zone(), Arc::new(responder))
            .map_err(|_| invalid_zone(self.settings.edge_zone()))
    }

    async fn shutdown(&mut self) {
        self.done.cancel();

        for handle in self.listeners.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "Listener task panicked");
            }
        }
        if let Some(monitor) = self.monitor.take() {
            if let Err(e) = monitor.await {
                error!(error = %e, "Monitor task panicked");
            }
        }
    }

    fn transition(&mut self, next: ServerState) {
        if self.state.can_transition_to(next) {
            debug!(from = %self.state, to = %next, "Server state changed");
            self.state = next;
        } else {
            debug!(from = %self.state, to = %next, "Ignoring invalid state transition");
        }
    }
}

impl Drop for FakeDns {
    fn drop(&mut self) {
        self.done.cancel();
    }
}

/// Races the probe against listener failures, delivers the start outcome once,
/// then records later serve errors until shutdown.
async fn monitor(
    probe: ReadinessProbe,
    addr: SocketAddr,
    done: CancellationToken,
    mut errors: mpsc::UnboundedReceiver<FakeDnsError>,
    slot: ErrorSlot,
    outcome_tx: oneshot::Sender<StartOutcome>,
) {
    let fail = |err: FakeDnsError| {
        let _ = slot.set(err.clone());
        done.cancel();
        StartOutcome::Failed(err)
    };

    let outcome = tokio::select! {
        biased;
        Some(err) = errors.recv() => fail(err),
        ready = probe.wait_ready(&done) => match ready {
            Ok(()) => StartOutcome::Ready { addr },
            Err(err) => fail(err),
        },
    };
    let _ = outcome_tx.send(outcome);

    loop {
        tokio::select! {
            biased;
            received = errors.recv() => match received {
                Some(err) => {
                    let _ = slot.set(err);
                    done.cancel();
                }
                None => break,
            },
            _ = done.cancelled() => break,
        }
    }

    while let Ok(err) = errors.try_recv() {
        let _ = slot.set(err);
    }
}
