use anyhow::{Result, anyhow};
use pico_args::Arguments;
use serde_json::json;
use std::{env, process::Command};

use crate::ipc;

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // Hidden daemon mode (spawned by `start`)
    if pargs.contains("--daemon") {
        return ipc::run_daemon();
    }

    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains(["-h", "--help"]) {
        print_help();
        return Ok(());
    }

    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            match topic {
                Some(t) => print_subcmd_help(&t),
                None => print_help(),
            }
            Ok(())
        }

        Some("start") => {
            let exe = env::current_exe()?;
            let child = Command::new(exe).arg("--daemon").spawn()?;
            println!("depthctl: started daemon (pid={})", child.id());
            Ok(())
        }

        Some("run") => ipc::run_daemon(),

        Some("stop") => request(json!({"op": "shutdown"})),
        Some("status") => request(json!({"op": "status"})),
        Some("doctor") => request(json!({"op": "doctor"})),
        Some("cursors") => request(json!({"op": "cursors"})),
        Some("reload") => request(json!({"op": "reload"})),
        Some("save") => request(json!({"op": "save"})),

        Some("angle") => {
            let value: i32 = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: depthctl angle <degrees>"))?;
            request(json!({"op": "angle", "value": value}))
        }

        Some("tilt") => {
            let dir: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: depthctl tilt <up|down>"))?;
            let steps = match dir.as_str() {
                "up" => 1,
                "down" => -1,
                other => return Err(anyhow!("unknown tilt direction: {other}")),
            };
            request(json!({"op": "tilt", "steps": steps}))
        }

        Some("distance") => {
            let value: i32 = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: depthctl distance <mm>"))?;
            request(json!({"op": "distance", "value": value}))
        }

        Some("nudge") => {
            let dir: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: depthctl nudge <left|right>"))?;
            let steps = match dir.as_str() {
                "left" => -1,
                "right" => 1,
                other => return Err(anyhow!("unknown nudge direction: {other}")),
            };
            request(json!({"op": "nudge", "steps": steps}))
        }

        Some("zone") => {
            let usage = || anyhow!("usage: depthctl zone <x> <y> <width> <height>");
            let x: f32 = pargs.free_from_str().map_err(|_| usage())?;
            let y: f32 = pargs.free_from_str().map_err(|_| usage())?;
            let width: f32 = pargs.free_from_str().map_err(|_| usage())?;
            let height: f32 = pargs.free_from_str().map_err(|_| usage())?;
            request(json!({"op": "zone", "x": x, "y": y, "width": width, "height": height}))
        }

        Some("drag") => {
            let usage = || anyhow!("usage: depthctl drag <x0> <y0> <x1> <y1>");
            let x0: f32 = pargs.free_from_str().map_err(|_| usage())?;
            let y0: f32 = pargs.free_from_str().map_err(|_| usage())?;
            let x1: f32 = pargs.free_from_str().map_err(|_| usage())?;
            let y1: f32 = pargs.free_from_str().map_err(|_| usage())?;
            request(json!({
                "op": "preview_drag",
                "from": {"x": x0, "y": y0},
                "to": {"x": x1, "y": y1},
            }))
        }

        Some("local-depth") => {
            let state: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: depthctl local-depth <on|off>"))?;
            let on = match state.as_str() {
                "on" => true,
                "off" => false,
                other => return Err(anyhow!("expected on or off, got {other}")),
            };
            request(json!({"op": "local_depth", "on": on}))
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn request(req: serde_json::Value) -> Result<()> {
    let r = ipc::client_request(req)?;
    println!("{}", serde_json::to_string_pretty(&r).unwrap_or_default());
    Ok(())
}

fn print_help() {
    println!(
        r#"depthctl — depth-sensor blob tracker publishing OSC cursors

USAGE:
  depthctl help [command]                 Show general or command-specific help
  depthctl start                          Start the daemon in the background
  depthctl run                            Run the daemon in the foreground
  depthctl stop                           Stop the daemon (tilt returns to 0)
  depthctl status                         Show control values and pipeline counters
  depthctl doctor                         Check settings, replay file and OSC target
  depthctl cursors                        Print the last cursor list
  depthctl reload                         Re-read the settings file
  depthctl save                           Write angle, distance and zone to the settings file
  depthctl angle <degrees>                Set the tilt angle (-30..30)
  depthctl tilt <up|down>                 Step the tilt angle by one degree
  depthctl distance <mm>                  Set the distance threshold (0..2000)
  depthctl nudge <left|right>             Step the distance threshold by 10mm
  depthctl zone <x> <y> <w> <h>           Set the active zone in sensor pixels
  depthctl drag <x0> <y0> <x1> <y1>       Set the active zone from a preview drag
  depthctl local-depth <on|off>           Toggle the depth-encoded mask

FILES:
  Settings: ~/.config/depthctl/settings.toml
  Socket:   ~/.local/run/depthctl.sock
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "start" => println!("usage: depthctl start\nStarts the background daemon."),
        "run" => println!("usage: depthctl run\nRuns the daemon attached to the terminal."),
        "stop" => println!("usage: depthctl stop\nStops the running daemon."),
        "status" => println!(
            "usage: depthctl status\nShows angle, distance, zones, source state and frame counters."
        ),
        "doctor" => println!("usage: depthctl doctor\nReports settings path, replay file and OSC target."),
        "cursors" => println!("usage: depthctl cursors\nPrints the cursors of the last processed frame."),
        "reload" => println!(
            "usage: depthctl reload\nRe-reads the settings file; keeps the last good settings on error."
        ),
        "save" => println!("usage: depthctl save\nPersists angle, distance, zone and local-depth."),
        "angle" | "tilt" => println!(
            "usage:\n  depthctl angle <degrees>\n  depthctl tilt <up|down>\nValues are clamped to -30..30."
        ),
        "distance" | "nudge" => println!(
            "usage:\n  depthctl distance <mm>\n  depthctl nudge <left|right>\nValues are clamped to 0..2000."
        ),
        "zone" => println!(
            "usage: depthctl zone <x> <y> <width> <height>\nActive zone in sensor pixels, mapped onto [-1,1]."
        ),
        "drag" => println!(
            "usage: depthctl drag <x0> <y0> <x1> <y1>\nPreview coordinates; drags under 10px are ignored."
        ),
        "local-depth" => println!("usage: depthctl local-depth <on|off>"),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}
