//! Engine-level behavior driven through scripted sessions instead of SSH.
//!
//! The mock transport implements the same session traits as the real one, so
//! these tests exercise the runner and orchestrator exactly as production
//! code paths do, including journal records, close accounting and fault
//! isolation.

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use netapply::device::{
    CommandBatch, DeviceDescriptor, DeviceFamily, DevicePlan, DeviceRole, Inventory,
};
use netapply::error::EngineError;
use netapply::journal::EventLog;
use netapply::orchestrator::run_all;
use netapply::report::{AttemptOutcome, ExitPolicy, RunSummary, SessionStatus};
use netapply::runner::{FaultPolicy, RunnerOptions, run_batch};
use netapply::session::{DeviceSession, SessionFactory, TransportPolicy};

/// Scripted reaction to one command.
#[derive(Debug, Clone, Copy)]
enum Reply {
    /// Return this output (commands without a script entry return "").
    Output(&'static str),
    /// Fail with a transport fault.
    Fault,
    /// Never answer (exercises timeout handling).
    Hang,
}

#[derive(Debug, Clone, Default)]
struct DeviceScript {
    replies: HashMap<String, Reply>,
}

struct MockSession {
    script: DeviceScript,
    sent: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

impl MockSession {
    async fn respond(&self, command: &str) -> Result<String, EngineError> {
        match self.script.replies.get(command) {
            Some(Reply::Fault) => Err(EngineError::ChannelDisconnect),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(String::new())
            }
            Some(Reply::Output(output)) => Ok((*output).to_string()),
            None => Ok(String::new()),
        }
    }
}

impl DeviceSession for MockSession {
    async fn apply_command(&mut self, command: &str) -> Result<String, EngineError> {
        self.sent
            .lock()
            .expect("sent commands lock")
            .push(command.to_string());
        self.respond(command).await
    }

    async fn run_read_only(&mut self, command: &str) -> Result<String, EngineError> {
        self.respond(command).await
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct MockFactory {
    scripts: HashMap<String, DeviceScript>,
    unreachable: HashSet<String>,
    sent: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

impl MockFactory {
    fn new() -> Self {
        Self::default()
    }

    fn script(mut self, addr: &str, replies: &[(&str, Reply)]) -> Self {
        let script = DeviceScript {
            replies: replies
                .iter()
                .map(|(cmd, reply)| ((*cmd).to_string(), *reply))
                .collect(),
        };
        self.scripts.insert(addr.to_string(), script);
        self
    }

    fn unreachable(mut self, addr: &str) -> Self {
        self.unreachable.insert(addr.to_string());
        self
    }

    fn sent_commands(&self) -> Vec<String> {
        self.sent.lock().expect("sent commands lock").clone()
    }

    fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl SessionFactory for MockFactory {
    type Session = MockSession;

    async fn open(&self, descriptor: &DeviceDescriptor) -> Result<MockSession, EngineError> {
        if self.unreachable.contains(&descriptor.addr) {
            return Err(EngineError::ConnectionFailed {
                addr: descriptor.endpoint(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(MockSession {
            script: self
                .scripts
                .get(&descriptor.addr)
                .cloned()
                .unwrap_or_default(),
            sent: self.sent.clone(),
            closes: self.closes.clone(),
        })
    }
}

/// Writer handing every byte to a shared buffer the test can inspect.
#[derive(Clone)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().expect("buffer lock").clone())
            .expect("log output should be utf-8")
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn captured_journal() -> (EventLog, SharedBuf) {
    let buf = SharedBuf(Arc::new(Mutex::new(Vec::new())));
    (EventLog::to_writer(buf.clone()), buf)
}

fn cisco(addr: &str) -> DeviceDescriptor {
    DeviceDescriptor {
        family: DeviceFamily::CiscoIos,
        addr: addr.to_string(),
        port: 22,
        username: "netadmin".to_string(),
        password: "pw".to_string(),
        enable_secret: Some("pw".to_string()),
        role: DeviceRole::Secondary,
        transport: TransportPolicy::legacy_compatible(),
    }
}

fn mikrotik(addr: &str, role: DeviceRole) -> DeviceDescriptor {
    DeviceDescriptor {
        family: DeviceFamily::MikrotikRouterOs,
        addr: addr.to_string(),
        port: 22,
        username: "admin".to_string(),
        password: "admin".to_string(),
        enable_secret: None,
        role,
        transport: TransportPolicy::default(),
    }
}

/// Journal lines recording a specific command attempt on a device.
fn command_records(journal: &str, addr: &str, command: &str) -> usize {
    journal
        .lines()
        .filter(|line| line.contains(&format!(" en {addr}: {command} ->")))
        .count()
}

#[tokio::test]
async fn report_counts_and_journal_records_match_batch_length() {
    let factory = MockFactory::new().script(
        "10.0.0.1",
        &[
            ("bad", Reply::Output("% Invalid input detected at '^' marker.")),
            ("drop", Reply::Fault),
        ],
    );
    let (journal, buf) = captured_journal();
    let batch = CommandBatch::from(["vlan 290", "name Ventas", "bad", "drop"].as_slice());

    let report = run_batch(
        &factory,
        &cisco("10.0.0.1"),
        &batch,
        &journal,
        &RunnerOptions::default(),
    )
    .await;

    assert_eq!(report.changes.len(), 2);
    assert_eq!(report.errors.len(), 2);
    assert_eq!(report.command_count(), batch.len());
    assert_eq!(factory.close_count(), 1);

    let contents = buf.contents();
    for command in batch.iter() {
        assert_eq!(
            command_records(&contents, "10.0.0.1", command),
            1,
            "expected exactly one record for {command}"
        );
    }
    assert_eq!(command_records(&contents, "10.0.0.1", "conexión"), 1);
}

#[tokio::test]
async fn end_to_end_cisco_scenario_matches_expected_report() {
    let factory = MockFactory::new().script(
        "10.10.18.57",
        &[(
            "bogus-command",
            Reply::Output("% Invalid input detected at '^' marker."),
        )],
    );
    let (journal, buf) = captured_journal();
    let batch = CommandBatch::from(["vlan 290", "name Ventas", "bogus-command"].as_slice());

    let report = run_batch(
        &factory,
        &cisco("10.10.18.57"),
        &batch,
        &journal,
        &RunnerOptions::default(),
    )
    .await;

    let applied: Vec<&str> = report.changes.iter().map(|r| r.command.as_str()).collect();
    assert_eq!(applied, vec!["vlan 290", "name Ventas"]);

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].command, "bogus-command");
    assert_eq!(report.errors[0].outcome, AttemptOutcome::Rejected);
    assert!(report.errors[0].failure_reason().contains("Invalid input"));

    // Exactly one record per command, session closed exactly once.
    let contents = buf.contents();
    let total: usize = batch
        .iter()
        .map(|cmd| command_records(&contents, "10.10.18.57", cmd))
        .sum();
    assert_eq!(total, 3);
    assert_eq!(factory.close_count(), 1);

    // Verification ran against the same session.
    let verified: Vec<&str> = report
        .verification
        .iter()
        .map(|v| v.command.as_str())
        .collect();
    assert_eq!(verified, vec!["show vlan brief", "show interfaces trunk"]);

    // Rejections fail the strict policy but not the connectivity policy.
    let summary = RunSummary {
        reports: vec![report],
    };
    assert!(summary.succeeded(ExitPolicy::ConnectivityOnly));
    assert!(!summary.succeeded(ExitPolicy::Strict));
}

#[tokio::test]
async fn unreachable_device_is_isolated_and_run_continues() {
    let factory = MockFactory::new().unreachable("10.10.18.57");
    let (journal, buf) = captured_journal();

    let inventory = Inventory {
        switches: vec![DevicePlan {
            descriptor: cisco("10.10.18.57"),
            batch: CommandBatch::from(["vlan 290", "name Ventas"].as_slice()),
        }],
        routers: vec![DevicePlan {
            descriptor: mikrotik("10.10.18.59", DeviceRole::Secondary),
            batch: CommandBatch::from(
                ["/interface vlan add name=Ventas vlan-id=290 interface=ether2"].as_slice(),
            ),
        }],
    };

    let summary = run_all(&factory, &inventory, &journal, &RunnerOptions::default()).await;

    assert_eq!(summary.reports.len(), 2);

    let failed = &summary.reports[0];
    assert!(matches!(
        failed.session,
        SessionStatus::ConnectionFailed { .. }
    ));
    assert_eq!(failed.command_count(), 0);
    assert!(failed.verification.is_empty());

    let completed = &summary.reports[1];
    assert!(completed.completed());
    assert_eq!(completed.command_count(), 1);

    let contents = buf.contents();
    // No command-level records for the unreachable device, exactly one
    // connection error record.
    assert_eq!(command_records(&contents, "10.10.18.57", "vlan 290"), 0);
    assert_eq!(command_records(&contents, "10.10.18.57", "name Ventas"), 0);
    let connection_errors = contents
        .lines()
        .filter(|line| line.contains("ERROR en 10.10.18.57: conexión ->"))
        .count();
    assert_eq!(connection_errors, 1);

    // The whole run is bracketed by markers.
    assert!(contents.contains("=== EJECUCIÓN GENERAL INICIADA ==="));
    assert!(contents.contains("=== EJECUCIÓN GENERAL FINALIZADA ==="));

    assert!(!summary.succeeded(ExitPolicy::ConnectivityOnly));
}

#[tokio::test]
async fn continue_policy_keeps_attempting_after_transport_fault() {
    let factory = MockFactory::new().script("10.0.0.1", &[("first", Reply::Fault)]);
    let (journal, _buf) = captured_journal();
    let batch = CommandBatch::from(["first", "second", "third"].as_slice());

    let report = run_batch(
        &factory,
        &cisco("10.0.0.1"),
        &batch,
        &journal,
        &RunnerOptions::default(),
    )
    .await;

    assert_eq!(factory.sent_commands(), vec!["first", "second", "third"]);
    assert_eq!(report.changes.len(), 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].outcome, AttemptOutcome::Exception);
}

#[tokio::test]
async fn skip_policy_stops_sending_after_transport_fault() {
    let factory = MockFactory::new().script("10.0.0.1", &[("first", Reply::Fault)]);
    let (journal, buf) = captured_journal();
    let batch = CommandBatch::from(["first", "second", "third"].as_slice());
    let options = RunnerOptions {
        fault_policy: FaultPolicy::SkipRemaining,
        command_timeout: None,
    };

    let report = run_batch(&factory, &cisco("10.0.0.1"), &batch, &journal, &options).await;

    // Only the faulting command reached the device.
    assert_eq!(factory.sent_commands(), vec!["first"]);

    assert_eq!(report.command_count(), 3);
    assert_eq!(report.errors[0].outcome, AttemptOutcome::Exception);
    for skipped in &report.errors[1..] {
        assert_eq!(skipped.outcome, AttemptOutcome::Skipped);
        assert!(skipped.failure_reason().contains("skipped"));
    }

    // Skipped commands still get their own journal records.
    let contents = buf.contents();
    assert_eq!(command_records(&contents, "10.0.0.1", "second"), 1);
    assert_eq!(command_records(&contents, "10.0.0.1", "third"), 1);

    // Verification still ran, best-effort, and the session was closed once.
    assert_eq!(report.verification.len(), 2);
    assert_eq!(factory.close_count(), 1);
}

#[tokio::test]
async fn command_timeout_aborts_remaining_batch_for_that_device() {
    let factory = MockFactory::new().script("10.0.0.1", &[("slow", Reply::Hang)]);
    let (journal, buf) = captured_journal();
    let batch = CommandBatch::from(["slow", "after"].as_slice());
    let options = RunnerOptions {
        fault_policy: FaultPolicy::ContinueBatch,
        command_timeout: Some(Duration::from_millis(50)),
    };

    let report = run_batch(&factory, &cisco("10.0.0.1"), &batch, &journal, &options).await;

    assert_eq!(factory.sent_commands(), vec!["slow"]);
    assert_eq!(report.command_count(), 2);

    assert_eq!(report.errors[0].outcome, AttemptOutcome::Exception);
    assert!(report.errors[0].failure_reason().contains("timeout"));
    assert_eq!(report.errors[1].outcome, AttemptOutcome::Skipped);
    assert!(report.errors[1].failure_reason().contains("aborted"));

    let contents = buf.contents();
    assert_eq!(command_records(&contents, "10.0.0.1", "slow"), 1);
    assert_eq!(command_records(&contents, "10.0.0.1", "after"), 1);
    assert_eq!(factory.close_count(), 1);
}

#[tokio::test]
async fn primary_router_verification_includes_nat_table() {
    let factory = MockFactory::new().script(
        "10.10.18.59",
        &[(
            "/ip firewall nat print",
            Reply::Output("0 chain=srcnat action=masquerade src-address=10.10.18.64/27"),
        )],
    );
    let (journal, _buf) = captured_journal();
    let batch = CommandBatch::from(
        ["/interface vlan add name=Ventas vlan-id=290 interface=ether2"].as_slice(),
    );

    let primary = run_batch(
        &factory,
        &mikrotik("10.10.18.59", DeviceRole::Primary),
        &batch,
        &journal,
        &RunnerOptions::default(),
    )
    .await;
    let nat = primary
        .verification
        .iter()
        .find(|entry| entry.command == "/ip firewall nat print")
        .expect("primary router should print its NAT table");
    assert!(nat.output.contains("masquerade"));

    let secondary = run_batch(
        &factory,
        &mikrotik("10.10.18.60", DeviceRole::Secondary),
        &batch,
        &journal,
        &RunnerOptions::default(),
    )
    .await;
    assert!(
        secondary
            .verification
            .iter()
            .all(|entry| entry.command != "/ip firewall nat print")
    );
}
