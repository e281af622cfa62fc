use slipstream::{app, GameConfig};

fn main() {
    env_logger::init();

    if let Err(e) = app::run(GameConfig::default()) {
        log::error!("fatal: {}", e);
        std::process::exit(1);
    }
}
