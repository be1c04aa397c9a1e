use anyhow::{bail, Context};
use clap::Parser;
use scout_app::cli::Cli;
use scout_app::config::{load_config, render_config, FileConfig};
use scout_app::logging;
use scout_app::render::{entity_list, summary, Renderer};
use scout_engine::{SessionController, SessionHandle, StartOutcome};
use scout_logging::scout_info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.verbose);

    let mut config = load_config(&cli.config).into_engine_config();
    cli.apply_overrides(&mut config);

    if cli.print_config {
        let text = render_config(&FileConfig::from(&config)).context("rendering config")?;
        println!("{text}");
        return Ok(());
    }

    let controller = SessionController::connect(config).context("creating HTTP client")?;
    let query = cli.query();
    match controller.start(&query, cli.session_id()).await? {
        StartOutcome::OneShot(entities) => {
            println!("{} companies for {:?}", entities.len(), query);
            for line in entity_list(&entities, cli.show) {
                println!("{line}");
            }
            Ok(())
        }
        StartOutcome::Streaming(session) => follow(&controller, session, cli.show).await,
    }
}

/// Print the session as it evolves until it ends or the user presses Ctrl-C.
async fn follow(
    controller: &SessionController,
    session: SessionHandle,
    show: usize,
) -> anyhow::Result<()> {
    let mut renderer = Renderer::new();
    let mut revisions = session.subscribe();

    loop {
        revisions.borrow_and_update();
        for line in renderer.render(&session.view()) {
            println!("{line}");
        }
        if session.state().is_terminal() {
            break;
        }
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                scout_info!(session = session.id(); "interrupted, closing");
                controller.close().await;
            }
        }
    }

    let view = session.view();
    for line in renderer.render(&view) {
        println!("{line}");
    }
    for line in summary(&view, show) {
        println!("{line}");
    }
    if view.session.state == scout_core::SessionState::Error {
        bail!("session {} gave up without completing", view.session.id);
    }
    Ok(())
}
