mod cli;
mod ipc;
mod logging;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}
