//! Connectivity status for the alert line.
//!
//! This is display only: nothing in the tracker depends on being online.

use std::fs;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::runtime::TrackEvent;

/// Coarse link quality, named like the browser Network Information API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum EffectiveType {
    #[strum(serialize = "slow-2g")]
    Slow2g,
    #[strum(serialize = "2g")]
    TwoG,
    #[strum(serialize = "3g")]
    ThreeG,
    #[strum(serialize = "4g")]
    FourG,
}

impl EffectiveType {
    /// Classify a round-trip time with the Network Information API thresholds.
    pub fn from_rtt(rtt: Duration) -> Self {
        match rtt.as_millis() {
            ms if ms >= 2000 => EffectiveType::Slow2g,
            ms if ms >= 1400 => EffectiveType::TwoG,
            ms if ms >= 270 => EffectiveType::ThreeG,
            _ => EffectiveType::FourG,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub online: bool,
    pub effective_type: Option<EffectiveType>,
}

impl ConnectionInfo {
    pub fn offline() -> Self {
        Self {
            online: false,
            effective_type: None,
        }
    }

    pub fn online(effective_type: Option<EffectiveType>) -> Self {
        Self {
            online: true,
            effective_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum NetworkCondition {
    Offline,
    #[strum(serialize = "poor-connection")]
    Poor,
    #[default]
    Normal,
}

impl NetworkCondition {
    pub fn classify(info: &ConnectionInfo) -> Self {
        if !info.online {
            NetworkCondition::Offline
        } else if info.effective_type == Some(EffectiveType::Slow2g) {
            NetworkCondition::Poor
        } else {
            NetworkCondition::Normal
        }
    }

    /// Alert text, `None` when the alert is hidden.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            NetworkCondition::Offline => Some("You are offline"),
            NetworkCondition::Poor => Some("Poor network connection detected"),
            NetworkCondition::Normal => None,
        }
    }
}

pub trait ConnectivityProbe: Send + 'static {
    fn probe(&self) -> ConnectionInfo;
}

/// Opens a TCP connection to a well-known endpoint and times the handshake.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

impl ConnectivityProbe for TcpProbe {
    fn probe(&self) -> ConnectionInfo {
        let Some(addr) = self
            .addr
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
        else {
            return ConnectionInfo::offline();
        };

        let started = Instant::now();
        match TcpStream::connect_timeout(&addr, self.timeout) {
            Ok(_) => ConnectionInfo::online(Some(EffectiveType::from_rtt(started.elapsed()))),
            Err(e) => {
                debug!(%addr, "connectivity probe failed: {e}");
                ConnectionInfo::offline()
            }
        }
    }
}

/// Where Linux exposes per-interface `operstate` files.
pub const LINK_STATE_DIR: &str = "/sys/class/net";

/// How often interface states are compared.
pub const LINK_WATCH_PERIOD: Duration = Duration::from_secs(1);

/// Interface name and operational state, e.g. `("wlan0", "up")`.
pub type LinkStates = Vec<(String, String)>;

/// Read `<dir>/<iface>/operstate` for every interface, sorted by name.
/// A missing directory gives an empty list.
pub fn read_link_states(dir: &Path) -> LinkStates {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut states: LinkStates = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let state = fs::read_to_string(entry.path().join("operstate")).ok()?;
            Some((
                entry.file_name().to_string_lossy().into_owned(),
                state.trim().to_string(),
            ))
        })
        .collect();
    states.sort();
    states
}

/// Probes on a fixed period, whenever [`NetworkPoller::notify`] is called,
/// and on interface changes once [`NetworkPoller::watch_links`] is set up.
/// Dropping the poller stops its threads.
pub struct NetworkPoller {
    wake: Sender<()>,
    link_watch: Option<Sender<()>>,
}

impl NetworkPoller {
    pub fn spawn<P: ConnectivityProbe>(probe: P, period: Duration, tx: Sender<TrackEvent>) -> Self {
        let (wake, wake_rx) = mpsc::channel::<()>();

        thread::spawn(move || loop {
            if tx.send(TrackEvent::Network(probe.probe())).is_err() {
                break;
            }
            match wake_rx.recv_timeout(period) {
                Ok(()) | Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        Self {
            wake,
            link_watch: None,
        }
    }

    /// Compare `snapshot` every `period` and re-probe when it changes.
    pub fn watch_links<F>(mut self, period: Duration, mut snapshot: F) -> Self
    where
        F: FnMut() -> LinkStates + Send + 'static,
    {
        let wake = self.wake.clone();
        let (stop, stop_rx) = mpsc::channel::<()>();

        thread::spawn(move || {
            let mut last = snapshot();
            loop {
                match stop_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
                let next = snapshot();
                if next != last {
                    info!(?next, "network interfaces changed");
                    if wake.send(()).is_err() {
                        break;
                    }
                    last = next;
                }
            }
        });

        self.link_watch = Some(stop);
        self
    }

    /// Connectivity may have changed: re-probe without waiting for the period.
    pub fn notify(&self) {
        let _ = self.wake.send(());
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkMonitor {
    condition: NetworkCondition,
}

impl NetworkMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn condition(&self) -> NetworkCondition {
        self.condition
    }

    /// Apply a new reading. Returns true when the visible condition changed.
    pub fn update(&mut self, info: ConnectionInfo) -> bool {
        let next = NetworkCondition::classify(&info);
        if next == self.condition {
            return false;
        }
        info!(from = %self.condition, to = %next, "network condition changed");
        self.condition = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};

    struct FixedProbe(ConnectionInfo);

    impl ConnectivityProbe for FixedProbe {
        fn probe(&self) -> ConnectionInfo {
            self.0
        }
    }

    #[test]
    fn offline_wins_over_quality() {
        for effective_type in [
            None,
            Some(EffectiveType::Slow2g),
            Some(EffectiveType::FourG),
        ] {
            let info = ConnectionInfo {
                online: false,
                effective_type,
            };
            assert_eq!(NetworkCondition::classify(&info), NetworkCondition::Offline);
        }
    }

    #[test]
    fn slow_2g_is_poor() {
        let info = ConnectionInfo::online(Some(EffectiveType::Slow2g));
        assert_eq!(NetworkCondition::classify(&info), NetworkCondition::Poor);
    }

    #[test]
    fn everything_else_is_normal() {
        for effective_type in [
            None,
            Some(EffectiveType::TwoG),
            Some(EffectiveType::ThreeG),
            Some(EffectiveType::FourG),
        ] {
            let info = ConnectionInfo::online(effective_type);
            assert_eq!(NetworkCondition::classify(&info), NetworkCondition::Normal);
        }
    }

    #[test]
    fn messages_match_conditions() {
        assert_eq!(NetworkCondition::Offline.message(), Some("You are offline"));
        assert_eq!(
            NetworkCondition::Poor.message(),
            Some("Poor network connection detected")
        );
        assert_eq!(NetworkCondition::Normal.message(), None);
    }

    #[test]
    fn rtt_thresholds() {
        assert_eq!(EffectiveType::from_rtt(Duration::from_millis(20)), EffectiveType::FourG);
        assert_eq!(EffectiveType::from_rtt(Duration::from_millis(270)), EffectiveType::ThreeG);
        assert_eq!(EffectiveType::from_rtt(Duration::from_millis(1400)), EffectiveType::TwoG);
        assert_eq!(EffectiveType::from_rtt(Duration::from_secs(3)), EffectiveType::Slow2g);
        assert_eq!(EffectiveType::Slow2g.to_string(), "slow-2g");
    }

    #[test]
    fn monitor_reports_changes_only() {
        let mut monitor = NetworkMonitor::new();
        assert_eq!(monitor.condition(), NetworkCondition::Normal);
        assert!(!monitor.update(ConnectionInfo::online(Some(EffectiveType::FourG))));
        assert!(monitor.update(ConnectionInfo::offline()));
        assert!(!monitor.update(ConnectionInfo::offline()));
        assert_eq!(monitor.condition(), NetworkCondition::Offline);
        assert!(monitor.update(ConnectionInfo::online(Some(EffectiveType::Slow2g))));
        assert_eq!(monitor.condition(), NetworkCondition::Poor);
    }

    #[test]
    fn tcp_probe_sees_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let info = TcpProbe::new(addr.to_string(), Duration::from_secs(1)).probe();
        assert!(info.online);
        assert!(info.effective_type.is_some());
    }

    #[test]
    fn tcp_probe_unresolvable_is_offline() {
        let info = TcpProbe::new("not an address", Duration::from_millis(50)).probe();
        assert_eq!(info, ConnectionInfo::offline());
    }

    #[test]
    fn poller_probes_immediately_and_on_notify() {
        let (tx, rx) = mpsc::channel();
        let poller = NetworkPoller::spawn(
            FixedProbe(ConnectionInfo::offline()),
            Duration::from_secs(60),
            tx,
        );

        let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(first, TrackEvent::Network(info) if !info.online));

        poller.notify();
        let second = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(second, TrackEvent::Network(_)));
    }

    #[test]
    fn link_change_triggers_probe() {
        let links = Arc::new(Mutex::new(vec![("eth0".to_string(), "up".to_string())]));
        let (tx, rx) = mpsc::channel();
        let seen = links.clone();
        let _poller = NetworkPoller::spawn(
            FixedProbe(ConnectionInfo::offline()),
            Duration::from_secs(60),
            tx,
        )
        .watch_links(Duration::from_millis(5), move || seen.lock().unwrap().clone());

        rx.recv_timeout(Duration::from_secs(1)).unwrap();
        // unchanged interfaces cause no extra probe
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        links.lock().unwrap()[0].1 = "down".to_string();
        let next = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(next, TrackEvent::Network(_)));
    }

    #[test]
    fn reads_operstate_files() {
        let dir = tempfile::tempdir().unwrap();
        for (name, state) in [("wlan0", "dormant\n"), ("eth0", "up\n")] {
            fs::create_dir(dir.path().join(name)).unwrap();
            fs::write(dir.path().join(name).join("operstate"), state).unwrap();
        }
        fs::create_dir(dir.path().join("bonding_masters")).unwrap();

        assert_eq!(
            read_link_states(dir.path()),
            vec![
                ("eth0".to_string(), "up".to_string()),
                ("wlan0".to_string(), "dormant".to_string()),
            ]
        );
        assert!(read_link_states(&dir.path().join("missing")).is_empty());
    }
}
