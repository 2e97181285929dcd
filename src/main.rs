use log::error;
use uptimesync::Command;

#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let command = match std::env::args().nth(1).as_deref() {
        None | Some("reconcile") => Command::Reconcile,
        Some("purge") => Command::Purge,
        Some(other) => {
            error!("Unknown command {other:?}, expected `reconcile` or `purge`");
            std::process::exit(2);
        }
    };

    if let Err(e) = uptimesync::run(command).await {
        error!("{e}");
        std::process::exit(1);
    }
}
