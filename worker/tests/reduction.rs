use comms::msg::MinLoc;
use tokio::task::JoinHandle;
use worker::{
    Landscape, Objective, Outcome, SampleCount, Worker, WorkerErr,
    comm::{self, LocalCommunicator},
};

type RankResult = Result<(Outcome, String), WorkerErr>;

/// Runs a full search on every rank of an in-process group of `size`.
async fn run_group<O>(size: usize, samples: &str, objective: O) -> Vec<(Outcome, String)>
where
    O: Objective + Clone + 'static,
{
    let samples = SampleCount::parse(samples, size).unwrap();

    let handles: Vec<JoinHandle<RankResult>> = comm::local(size)
        .into_iter()
        .map(|mut comm| {
            let worker = Worker::new(samples, objective.clone()).with_seed(11);
            tokio::spawn(async move {
                let mut out = Vec::new();
                let outcome = worker.run(&mut comm, &mut out).await?;
                comm.finalize().await?;
                Ok((outcome, String::from_utf8(out).unwrap()))
            })
        })
        .collect();

    let mut results = Vec::with_capacity(size);
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    results
}

/// Reduces one value per rank and returns what every rank ended up with.
async fn allreduce_all(values: &[f64]) -> Vec<MinLoc> {
    let handles: Vec<JoinHandle<Result<MinLoc, WorkerErr>>> = comm::local(values.len())
        .into_iter()
        .zip(values.iter().copied())
        .map(|(mut comm, value): (LocalCommunicator, f64)| {
            tokio::spawn(async move {
                let rank = comm.ctx().rank();
                let winner = comm.allreduce(MinLoc { value, rank }).await?;
                comm.finalize().await?;
                Ok(winner)
            })
        })
        .collect();

    let mut winners = Vec::with_capacity(values.len());
    for handle in handles {
        winners.push(handle.await.unwrap().unwrap());
    }

    winners
}

#[tokio::test]
async fn every_rank_agrees_on_the_lowest_value() {
    let values = [3.0, 0.5, 2.0, -1.25, 7.0, -1.0, 0.0];
    let winners = allreduce_all(&values).await;

    for winner in winners {
        assert_eq!(winner.value, -1.25);
        assert_eq!(winner.rank, 3);
    }
}

#[tokio::test]
async fn equal_values_go_to_the_lowest_rank() {
    let winners = allreduce_all(&[1.0; 6]).await;
    assert!(winners.iter().all(|w| w.rank == 0 && w.value == 1.0));

    let winners = allreduce_all(&[4.0, 0.5, 4.0, 0.5, 0.5]).await;
    assert!(winners.iter().all(|w| w.rank == 1 && w.value == 0.5));
}

#[tokio::test]
async fn nan_never_wins() {
    let winners = allreduce_all(&[f64::NAN, 2.0, f64::NAN, 1.0]).await;
    assert!(winners.iter().all(|w| w.rank == 3 && w.value == 1.0));
}

#[tokio::test]
async fn every_group_size_reduces_the_same() {
    for size in 1..=9 {
        let values: Vec<f64> = (0..size).map(|r| ((r * 7 + 3) % 5) as f64).collect();
        let winners = allreduce_all(&values).await;

        let expected = values
            .iter()
            .enumerate()
            .fold(None::<(usize, f64)>, |best, (rank, &value)| match best {
                Some((_, v)) if v <= value => best,
                _ => Some((rank, value)),
            })
            .unwrap();

        for winner in winners {
            assert_eq!((winner.rank, winner.value), expected, "size {size}");
        }
    }
}

#[tokio::test]
async fn four_ranks_four_hundred_points() {
    let results = run_group(4, "400", Landscape::Rastrigin).await;

    let total: usize = results.iter().map(|(o, _)| o.local.samples).sum();
    assert_eq!(total, 400);
    assert!(results.iter().all(|(o, _)| o.local.samples == 100));

    let winner = results[0].0.winner;
    assert!(results.iter().all(|(o, _)| o.winner == winner));
    assert!(winner.rank < 4);

    let global = results[0].0.global.unwrap();
    for (outcome, _) in &results {
        assert!(global.value <= outcome.local.best.value);
    }

    let owner = &results[winner.rank].0.local.best;
    assert_eq!(global.value.to_bits(), owner.value.to_bits());
    assert_eq!(global.x.to_bits(), owner.x.to_bits());
    assert_eq!(global.y.to_bits(), owner.y.to_bits());

    assert!(results[1..].iter().all(|(o, _)| o.global.is_none()));
}

#[tokio::test]
async fn coordinates_travel_from_a_remote_owner() {
    // Larger x is always better, so the last strip wins.
    let results = run_group(5, "50", |x: f64, _y: f64| -x).await;

    let global = results[0].0.global.unwrap();
    assert_eq!(global.owner_rank, 4);

    let owner = &results[4].0.local;
    assert_eq!(global.x.to_bits(), owner.best.x.to_bits());
    assert_eq!(global.y.to_bits(), owner.best.y.to_bits());
    assert!(owner.strip.contains(global.x));
}

#[tokio::test]
async fn coordinator_keeps_its_own_minimum() {
    // Smaller x is always better, so the first strip wins.
    let results = run_group(4, "40", |x: f64, _y: f64| x).await;

    let global = results[0].0.global.unwrap();
    assert_eq!(global.owner_rank, 0);
    assert!(results.iter().all(|(o, _)| o.winner.rank == 0));

    let own = &results[0].0.local.best;
    assert_eq!(global.value.to_bits(), own.value.to_bits());
    assert_eq!(global.x.to_bits(), own.x.to_bits());
    assert_eq!(global.y.to_bits(), own.y.to_bits());
    assert!(results[1..].iter().all(|(o, _)| o.global.is_none()));
}

#[tokio::test]
async fn only_the_coordinator_reports_the_global_minimum() {
    let results = run_group(3, "30", Landscape::Paraboloid).await;

    for (rank, (_, out)) in results.iter().enumerate() {
        let local = format!("[{rank}] Local minimum out of 10 points: f(");
        assert!(out.starts_with(&local), "{out:?}");

        let lines = out.lines().filter(|l| !l.is_empty()).count();
        if rank == 0 {
            assert_eq!(lines, 2);
            assert!(out.contains("Global minimum out of 30 points: f("));
            assert!(out.ends_with("\n\n"));
        } else {
            assert_eq!(lines, 1);
        }
    }
}

#[tokio::test]
async fn barriers_can_be_repeated() {
    let handles: Vec<JoinHandle<Result<(), WorkerErr>>> = comm::local(6)
        .into_iter()
        .map(|mut comm| {
            tokio::spawn(async move {
                for _ in 0..5 {
                    comm.barrier().await?;
                }
                comm.finalize().await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}
