use log::{error, info};
use serde::Deserialize;
use serde_json::{Value, json};

use depthctl::geometry::{Point2, Rect};

use super::server::DaemonState;

/// Requests accepted on the control socket, tagged by `op`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Status,
    Doctor,
    Cursors,
    Reload,
    Save,
    Angle { value: i32 },
    Tilt { steps: i32 },
    Distance { value: i32 },
    Nudge { steps: i32 },
    Zone { x: f32, y: f32, width: f32, height: f32 },
    PreviewDrag { from: Point2, to: Point2 },
    LocalDepth { on: bool },
    Shutdown,
}

fn ok(data: Value) -> Value {
    json!({"ok": true, "data": data})
}

fn fail(msg: impl std::fmt::Display) -> Value {
    json!({"ok": false, "error": msg.to_string()})
}

/// Apply one request to the daemon state. Runs on the frame loop thread, so
/// the change is visible from the next frame on.
pub fn dispatch(req: Request, st: &mut DaemonState) -> Value {
    match req {
        Request::Status => ok(st.status()),
        Request::Doctor => ok(st.store.doctor_report()),
        Request::Cursors => ok(json!({ "cursors": st.driver.cursors() })),
        Request::Reload => match st.reload() {
            Ok(()) => ok(st.control_json()),
            Err(e) => fail(e),
        },
        Request::Save => {
            let control = st.controller.settings();
            match st.store.save(&control) {
                Ok(()) => ok(json!({ "path": st.store.path })),
                Err(e) => {
                    error!("save failed: {e}");
                    fail(e)
                }
            }
        }
        Request::Angle { value } => {
            let angle = st.controller.set_angle(value);
            st.driver.set_tilt(angle.degrees());
            ok(st.control_json())
        }
        Request::Tilt { steps } => {
            let angle = st.controller.nudge_angle(steps);
            st.driver.set_tilt(angle.degrees());
            ok(st.control_json())
        }
        Request::Distance { value } => {
            st.controller.set_distance(value);
            ok(st.control_json())
        }
        Request::Nudge { steps } => {
            st.controller.nudge_distance(steps);
            ok(st.control_json())
        }
        Request::Zone {
            x,
            y,
            width,
            height,
        } => {
            if ![x, y, width, height].iter().all(|v| v.is_finite()) || width == 0.0 || height == 0.0
            {
                return fail("zone must be finite with non-zero width and height");
            }
            st.controller.set_active_zone(Rect::new(x, y, width, height));
            info!("active zone: x={x} y={y} w={width} h={height}");
            ok(st.control_json())
        }
        Request::PreviewDrag { from, to } => {
            if st.controller.set_active_zone_from_preview(from, to) {
                ok(st.control_json())
            } else {
                fail("drag must start inside the preview and span more than 10px")
            }
        }
        Request::LocalDepth { on } => {
            st.controller.set_local_depth(on);
            ok(st.control_json())
        }
        Request::Shutdown => {
            st.running = false;
            ok(json!("shutting down"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depthctl::config::SettingsStore;
    use std::{fs, path::PathBuf};

    fn state(name: &str) -> (DaemonState, PathBuf) {
        let dir = std::env::temp_dir().join(format!("depthctl-ipc-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let store = SettingsStore::open_in(&dir).unwrap();
        (DaemonState::with_store(store).unwrap(), dir)
    }

    fn send(st: &mut DaemonState, req: Value) -> Value {
        dispatch(serde_json::from_value(req).unwrap(), st)
    }

    #[test]
    fn zone_without_extent_is_rejected() {
        let (mut st, dir) = state("zone-reject");
        let before = st.controller.snapshot().active_zone;

        let resp = send(&mut st, json!({"op": "zone", "x": 10.0, "y": 10.0, "width": 0.0, "height": 100.0}));
        assert_eq!(resp["ok"], false);
        assert_eq!(st.controller.snapshot().active_zone, before);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn zone_with_negative_extent_is_standardized() {
        let (mut st, dir) = state("zone-flip");
        let resp = send(&mut st, json!({"op": "zone", "x": 384.0, "y": 288.0, "width": -320.0, "height": -240.0}));
        assert_eq!(resp["ok"], true);
        assert_eq!(
            resp["data"]["zone"],
            json!({"x": 64.0, "y": 48.0, "width": 320.0, "height": 240.0})
        );
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn angle_and_nudges_clamp() {
        let (mut st, dir) = state("clamp");
        let resp = send(&mut st, json!({"op": "angle", "value": 45}));
        assert_eq!(resp["data"]["angle"], 30);
        let resp = send(&mut st, json!({"op": "tilt", "steps": -1}));
        assert_eq!(resp["data"]["angle"], 29);
        let resp = send(&mut st, json!({"op": "nudge", "steps": -1000}));
        assert_eq!(resp["data"]["distance"], 0);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn short_preview_drag_fails() {
        let (mut st, dir) = state("drag");
        let resp = send(
            &mut st,
            json!({"op": "preview_drag", "from": {"x": 100.0, "y": 400.0}, "to": {"x": 104.0, "y": 404.0}}),
        );
        assert_eq!(resp["ok"], false);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn save_then_reload_restores_distance() {
        let (mut st, dir) = state("save");
        send(&mut st, json!({"op": "distance", "value": 1230}));
        assert_eq!(send(&mut st, json!({"op": "save"}))["ok"], true);

        send(&mut st, json!({"op": "distance", "value": 500}));
        let resp = send(&mut st, json!({"op": "reload"}));
        assert_eq!(resp["data"]["distance"], 1230);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let (mut st, dir) = state("shutdown");
        assert!(st.running);
        assert_eq!(send(&mut st, json!({"op": "shutdown"}))["ok"], true);
        assert!(!st.running);
        fs::remove_dir_all(dir).ok();
    }
}
