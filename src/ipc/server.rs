use anyhow::{Result, anyhow};
use log::{error, info, warn};
use notify::{RecursiveMode, Watcher};
use serde_json::{Value, json};
use std::{
    io::{BufRead, BufReader, ErrorKind, Write},
    os::unix::net::{UnixListener, UnixStream},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender},
    },
    thread,
    time::{Duration, Instant},
};

use depthctl::config::SettingsStore;
use depthctl::control::{Controller, PreviewLayout};

use super::dispatch::{Request, dispatch};
use super::pipeline::FrameDriver;
use super::runtime::socket_path;

const IDLE_SLEEP: Duration = Duration::from_millis(2);
const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

pub fn run_daemon() -> Result<()> {
    // socket
    let sock = socket_path()?;
    if sock.exists() {
        let _ = std::fs::remove_file(&sock);
    }
    let listener = UnixListener::bind(&sock)?;
    listener.set_nonblocking(true)?;
    info!("daemon: listening on {}", sock.display());

    // state
    let mut state = DaemonState::new()?;
    info!("daemon: settings from {}", state.store.path.display());

    // signals
    let term = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&term))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&term))?;

    // settings file watcher
    let (tx_fs, rx_fs) = mpsc::channel::<()>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(ev) = res {
            if ev.kind.is_modify() || ev.kind.is_create() {
                let _ = tx_fs.send(());
            }
        }
    })?;
    if let Err(e) = watcher.watch(&state.store.path, RecursiveMode::NonRecursive) {
        warn!("not watching settings file: {e}");
    }

    // channels
    let (tx_req, rx_req) = mpsc::channel::<IpcMsg>();

    while state.running && !term.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, _)) => {
                let tx = tx_req.clone();
                thread::spawn(move || {
                    if let Err(e) = handle_client(stream, tx) {
                        error!("ipc client error: {e}");
                    }
                });
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {}
            Err(e) => warn!("accept failed: {e}"),
        }

        drain_requests(&rx_req, &mut state);
        drain_file_events(&rx_fs, &mut state);

        let config = state.controller.snapshot();
        if !state.driver.step(&config) {
            thread::sleep(IDLE_SLEEP);
        }
    }

    info!("daemon: shutting down");
    state.driver.set_tilt(0);
    // let client threads flush replies already handed to them
    thread::sleep(Duration::from_millis(50));
    let _ = std::fs::remove_file(&sock);
    Ok(())
}

fn drain_requests(rx: &Receiver<IpcMsg>, st: &mut DaemonState) {
    while let Ok(msg) = rx.try_recv() {
        let resp = dispatch(msg.req, st);
        let _ = msg.reply.send(resp);
    }
}

fn drain_file_events(rx: &Receiver<()>, st: &mut DaemonState) {
    let mut changed = false;
    while rx.try_recv().is_ok() {
        changed = true;
    }
    if changed {
        match st.reload() {
            Ok(()) => info!("settings reloaded after file change"),
            Err(e) => error!("reload failed: {e}"),
        }
    }
}

fn handle_client(mut stream: UnixStream, tx_req: Sender<IpcMsg>) -> Result<()> {
    stream.set_nonblocking(false)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim().is_empty() {
        return Ok(());
    }

    let resp = match serde_json::from_str::<Request>(&line) {
        Ok(req) => {
            let (reply, rx_reply) = mpsc::channel();
            tx_req
                .send(IpcMsg { req, reply })
                .map_err(|_| anyhow!("daemon loop has exited"))?;
            rx_reply
                .recv_timeout(REPLY_TIMEOUT)
                .unwrap_or_else(|_| json!({"ok": false, "error": "daemon did not answer"}))
        }
        Err(e) => json!({"ok": false, "error": format!("bad request: {e}")}),
    };

    writeln!(stream, "{resp}")?;
    Ok(())
}

pub struct DaemonState {
    pub running: bool,
    pub store: SettingsStore,
    pub controller: Controller,
    pub driver: FrameDriver,
    started: Instant,
}

impl DaemonState {
    fn new() -> Result<Self> {
        Self::with_store(SettingsStore::load_or_install_default()?)
    }

    pub fn with_store(store: SettingsStore) -> Result<Self> {
        let settings = &store.settings;
        let layout = PreviewLayout::new(settings.sensor.width, settings.sensor.height);
        let controller = Controller::new(settings.control(), layout);
        let mut driver = FrameDriver::open(settings)?;
        driver.set_tilt(controller.snapshot().angle.degrees());
        Ok(Self {
            running: true,
            store,
            controller,
            driver,
            started: Instant::now(),
        })
    }

    /// Re-read the settings file and apply its control values. Sensor and OSC
    /// sections only take effect after a restart.
    pub fn reload(&mut self) -> depthctl::Result<()> {
        let before = self.controller.snapshot().angle;
        let control = self.store.reload()?.control();
        self.controller.apply(control);
        let after = self.controller.snapshot().angle;
        if after != before {
            self.driver.set_tilt(after.degrees());
        }
        Ok(())
    }

    pub fn control_json(&self) -> Value {
        let cfg = self.controller.snapshot();
        let z = cfg.active_zone;
        let p = cfg.preview_zone;
        json!({
            "angle": cfg.angle.degrees(),
            "distance": cfg.distance.millimeters(),
            "plane_distance": cfg.plane.plane_distance,
            "local_depth": self.controller.settings().local_depth,
            "max_blobs": cfg.max_blobs,
            "zone": {"x": z.x, "y": z.y, "width": z.width, "height": z.height},
            "preview_zone": {"x": p.x, "y": p.y, "width": p.width, "height": p.height},
        })
    }

    pub fn status(&self) -> Value {
        json!({
            "pid": std::process::id(),
            "uptime_s": self.started.elapsed().as_secs(),
            "socket": socket_path().ok(),
            "settings": self.store.path,
            "control": self.control_json(),
            "pipeline": self.driver.status(),
        })
    }
}

struct IpcMsg {
    req: Request,
    reply: Sender<Value>,
}

// client helper
pub fn client_request(req: Value) -> Result<Value> {
    let sock = socket_path()?;
    if !sock.exists() {
        return Err(anyhow!(
            "depthctl daemon is not running (socket missing at {})",
            sock.display()
        ));
    }
    let mut stream = UnixStream::connect(sock)?;
    let line = serde_json::to_string(&req)? + "\n";
    stream.write_all(line.as_bytes())?;
    let mut reader = BufReader::new(stream);
    let mut resp = String::new();
    reader.read_line(&mut resp)?;
    let v: Value = serde_json::from_str(&resp)?;
    Ok(v)
}
