mod effects;
mod logging;
mod render;
mod shell;

fn main() -> anyhow::Result<()> {
    logging::initialize(logging::LogDestination::File);
    shell::run()
}
