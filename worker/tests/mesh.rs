use comms::msg::{Command, MinLoc, Msg};
use tokio::{
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use worker::{
    Landscape, RankContext, SampleCount, Worker, WorkerErr,
    comm::{self, TcpCommunicator},
};

async fn listeners(size: usize) -> (Vec<TcpListener>, Vec<String>) {
    let mut listeners = Vec::with_capacity(size);
    let mut addrs = Vec::with_capacity(size);

    for _ in 0..size {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        addrs.push(listener.local_addr().unwrap().to_string());
        listeners.push(listener);
    }

    (listeners, addrs)
}

async fn mesh(size: usize) -> Vec<TcpCommunicator> {
    let (listeners, addrs) = listeners(size).await;

    let handles: Vec<JoinHandle<Result<TcpCommunicator, WorkerErr>>> = RankContext::group(size)
        .zip(listeners)
        .map(|(ctx, listener)| {
            let addrs = addrs.clone();
            tokio::spawn(async move { comm::establish_with(ctx, listener, &addrs).await })
        })
        .collect();

    let mut comms = Vec::with_capacity(size);
    for handle in handles {
        comms.push(handle.await.unwrap().unwrap());
    }

    comms
}

#[tokio::test]
async fn loopback_mesh_runs_a_search() {
    let samples = SampleCount::parse("120", 4).unwrap();

    let handles: Vec<_> = mesh(4)
        .await
        .into_iter()
        .map(|mut comm| {
            let worker = Worker::new(samples, Landscape::Himmelblau);
            tokio::spawn(async move {
                let mut out = Vec::new();
                let outcome = worker.run(&mut comm, &mut out).await?;
                comm.finalize().await?;
                Ok::<_, WorkerErr>(outcome)
            })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }

    let global = outcomes[0].global.unwrap();
    let owner = outcomes[global.owner_rank].local.best;
    assert_eq!(global.x.to_bits(), owner.x.to_bits());
    assert_eq!(global.y.to_bits(), owner.y.to_bits());
    assert!(outcomes.iter().all(|o| global.value <= o.local.best.value));
}

#[tokio::test]
async fn loopback_mesh_reduces() {
    let handles: Vec<_> = mesh(3)
        .await
        .into_iter()
        .map(|mut comm| {
            tokio::spawn(async move {
                let rank = comm.ctx().rank();
                let value = if rank == 0 { 5.0 } else { 1.0 };
                let winner = comm.allreduce(MinLoc { value, rank }).await?;
                comm.barrier().await?;
                comm.finalize().await?;
                Ok::<_, WorkerErr>(winner)
            })
        })
        .collect();

    for handle in handles {
        let winner = handle.await.unwrap().unwrap();
        assert_eq!(winner.rank, 1);
        assert_eq!(winner.value, 1.0);
    }
}

#[tokio::test]
async fn acceptor_rejects_a_lower_rank() {
    let (mut listeners, addrs) = listeners(2).await;
    let listener = listeners.remove(0);
    let addr = addrs[0].clone();

    let server = tokio::spawn(async move {
        let ctx = RankContext::new(0, 2).unwrap();
        comm::establish_with(ctx, listener, &addrs).await
    });

    let stream = TcpStream::connect(&addr).await.unwrap();
    let (rx, tx) = stream.into_split();
    let (mut rx, mut tx) = comms::channel(rx, tx);
    tx.send(&Msg::Control(Command::Hello { rank: 0, size: 2 }))
        .await
        .unwrap();

    let mut buf = Vec::new();
    let reply: Msg = rx.recv_into(&mut buf).await.unwrap();
    assert!(matches!(reply, Msg::Err(_)));

    let err = server.await.unwrap().err().unwrap();
    assert!(matches!(err, WorkerErr::Handshake(_)));
}

#[tokio::test]
async fn connector_rejects_a_wrong_group_size() {
    let (mut listeners, addrs) = listeners(2).await;
    let fake = listeners.remove(0);

    let client = tokio::spawn(async move {
        let ctx = RankContext::new(1, 2).unwrap();
        let listener = listeners.remove(0);
        comm::establish_with(ctx, listener, &addrs).await
    });

    let (stream, _) = fake.accept().await.unwrap();
    let (rx, tx) = stream.into_split();
    let (mut rx, mut tx) = comms::channel(rx, tx);

    let mut buf = Vec::new();
    let hello: Msg = rx.recv_into(&mut buf).await.unwrap();
    assert!(matches!(
        hello,
        Msg::Control(Command::Hello { rank: 1, size: 2 })
    ));

    tx.send(&Msg::Control(Command::Hello { rank: 0, size: 3 }))
        .await
        .unwrap();

    let err = client.await.unwrap().err().unwrap();
    assert!(matches!(err, WorkerErr::Handshake(_)));
}
