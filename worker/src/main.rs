use std::{env, io, process::ExitCode};

use log::{error, info};

use worker::{ConfigErr, SampleCount, SearchConfig, Topology, Worker, comm};

/// Validates the arguments and the search settings.
fn configure(topology: &Topology) -> Result<SearchConfig, ConfigErr> {
    let samples = SampleCount::from_args(env::args().skip(1), topology.ctx().size())?;
    SearchConfig::from_env(samples)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let topology = match Topology::from_env() {
        Ok(topology) => topology,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Every rank fails the same way, only the coordinator reports it.
    let config = match configure(&topology) {
        Ok(config) => config,
        Err(e) => {
            if topology.ctx().is_coordinator() {
                eprintln!("{e}");
            }
            return ExitCode::FAILURE;
        }
    };

    let ctx = topology.ctx();
    info!(rank = ctx.rank(), size = ctx.size(); "starting, objective {:?}", config.objective);

    let run = async {
        let mut comm = comm::establish(&topology).await?;
        let worker = Worker::from_config(config);
        worker.run(&mut comm, &mut io::stdout()).await?;
        comm.finalize().await
    };

    match run.await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(rank = ctx.rank(); "{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
