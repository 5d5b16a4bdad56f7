use setup_coordinator::{
    cli::{Command, Options},
    environment::Environment,
    logger::initialize_logger,
    CeremonyState,
    DiskTranscriptStore,
    DiskTranscriptStoreFactory,
    Sealer,
    TranscriptStore,
    TranscriptStoreFactory,
};

use std::{path::Path, sync::Arc};
use structopt::StructOpt;
use tracing::{info, warn};

async fn seal(store: DiskTranscriptStore, environment: &Environment, state_path: &Path) -> anyhow::Result<()> {
    let ceremony: CeremonyState = serde_json::from_slice(&fs_err::read(state_path)?)?;

    let sealer = Arc::new(Sealer::from_environment(Arc::new(store), environment));

    let mut progress = sealer.subscribe();
    tokio::spawn(async move {
        while let Some(percentage) = progress.recv().await {
            info!("Sealing progress {}%", percentage);
        }
    });

    let interrupt = {
        let sealer = sealer.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Received an interrupt, cancelling sealing");
                sealer.cancel();
            }
        })
    };

    let result = sealer.run(&ceremony).await;
    interrupt.abort();
    result?;

    info!("Sealing finished in state {:?}", sealer.state());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = Options::from_args();
    let environment = options.environment();
    initialize_logger(&environment);

    let store = DiskTranscriptStoreFactory::new(environment.store_path()).create(environment.ceremony_name())?;

    match options.subcommand {
        Command::Seal { state } => seal(store, &environment, &state).await?,
        Command::Promote { identity } => store.make_live(&identity).await?,
        Command::List {
            identity,
            unverified,
            signatures,
        } => {
            let records = match unverified {
                true => store.unverified(&identity, signatures).await?,
                false => store.verified(&identity, signatures).await?,
            };
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Erase {
            identity,
            unverified,
            num,
        } => {
            let report = match unverified {
                true => store.erase_unverified(&identity, num).await,
                false => store.erase_all(&identity).await,
            };
            for failure in &report.failures {
                eprintln!("Failed to erase {}: {}", failure.path.display(), failure.error);
            }
            println!("Erased {} files and directories", report.removed.len());
        }
        Command::InitParams { path } => store.set_initial_params(&path).await?,
    }

    Ok(())
}
