use super::common::*;
use crate::*;
use log::*;
use rstest::*;

#[rstest]
#[tokio::test]
async fn test_fan_out_gated_by_slowest(setup_log: ()) {
    let _ = setup_log; // Disable unused var warning
    let ch1 = Channel::bounded(2).unwrap();
    let ch2 = Channel::bounded(2).unwrap();
    let ch3 = Channel::bounded(4).unwrap();
    ch1.pipe_all(&[ch2.clone(), ch3.clone()]);

    for i in 1..=4 {
        let tx = ch1.clone();
        tokio::spawn(async move { tx.put(i).await });
    }
    timeout(1).await;

    // the forwarder is parked on ch2 (full), so ch1 still holds one value
    // and ch3 is one ahead
    assert_eq!(ch1.buf_len(), 1);
    assert_eq!(ch2.buf_len(), 2);
    assert_eq!(ch2.puts_len(), 1);
    assert_eq!(ch3.buf_len(), 3);

    assert_eq!(ch3.take().await, Ok(1));
    timeout(1).await;
    assert_eq!(ch1.buf_len(), 1);
    assert_eq!(ch2.buf_len(), 2);
    assert_eq!(ch2.puts_len(), 1);
    assert_eq!(ch3.buf_len(), 2);

    for i in 1..=4 {
        assert_eq!(ch2.take().await, Ok(i));
    }
    for i in 2..=4 {
        assert_eq!(ch3.take().await, Ok(i));
    }
    timeout(1).await;
    assert!(ch1.is_empty());
    assert!(ch2.is_empty());
    assert!(ch3.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_static_pipeline(setup_log: ()) {
    let _ = setup_log;
    let (first, last) = Channel::pipeline(vec![
        Transform::map(|x: f64| Some(x + 2.0)),
        Transform::map(|x: f64| Some(x * x)),
        Transform::map(|x: f64| Some(x / 2.0)),
    ])
    .unwrap();

    for v in [1.0, 2.0, 3.0] {
        let tx = first.clone();
        tokio::spawn(async move { tx.put(v).await });
    }
    timeout(0).await;
    first.close_all();

    assert_eq!(last.take().await, Ok(4.5));
    assert_eq!(last.take().await, Ok(8.0));
    assert_eq!(last.take().await, Ok(12.5));

    first.done().await;
    last.done().await;
    assert_eq!(first.state(), State::Ended);
    assert_eq!(last.state(), State::Ended);
    assert_eq!(last.take().await, Err(RecvError));
    info!("pipeline drained");
}

#[rstest]
#[tokio::test]
async fn test_unpipe_leaves_siblings_intact(setup_log: ()) {
    let _ = setup_log;
    let ch1 = Channel::bounded(4).unwrap();
    let ch2 = Channel::bounded(2).unwrap();
    let ch3 = Channel::bounded(2).unwrap();
    ch1.pipe_all(&[ch2.clone(), ch3.clone()]);

    ch1.put(1).await.expect("put");
    ch1.put(2).await.expect("put");
    timeout(1).await;

    ch1.unpipe(&ch2);
    assert_eq!(ch1.pipeline_len(), 1);
    ch1.put(3).await.expect("put");
    ch1.put(4).await.expect("put");
    timeout(1).await;

    assert_eq!(ch2.try_take(), Ok(1));
    assert_eq!(ch2.try_take(), Ok(2));
    assert!(ch2.try_take().unwrap_err().is_empty());
    for i in 1..=4 {
        assert_eq!(ch3.take().await, Ok(i));
    }
}

#[rstest]
#[tokio::test]
async fn test_unpipe_while_forwarder_parked_keeps_value(setup_log: ()) {
    let _ = setup_log;
    let ch1 = Channel::bounded(2).unwrap();
    let ch2 = Channel::bounded(2).unwrap();
    ch1.pipe(&ch2);
    timeout(1).await; // forwarder is parked waiting for a value

    ch1.unpipe(&ch2);
    ch1.put(1).await.expect("put");
    timeout(1).await;
    // nothing reached the removed downstream and nothing was lost upstream
    assert_eq!(ch2.len(), 0);
    assert_eq!(ch1.len(), 1);
    assert_eq!(ch1.take().await, Ok(1));

    // a fresh pipe restarts forwarding for later values
    ch1.pipe(&ch2);
    ch1.put(2).await.expect("put");
    timeout(1).await;
    assert_eq!(ch2.take().await, Ok(2));
}

#[rstest]
#[tokio::test]
async fn test_pipe_chains_through_targets(setup_log: ()) {
    let _ = setup_log;
    let a = Channel::new();
    let b = Channel::bounded(4).unwrap();
    let c = Channel::bounded(4).unwrap();
    let end = a.pipe(&b).pipe(&c);

    a.put(1).await.expect("put");
    a.put(2).await.expect("put");
    timeout(1).await;
    assert_eq!(end.take().await, Ok(1));
    assert_eq!(end.take().await, Ok(2));
    assert!(b.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_close_all_cascades(setup_log: ()) {
    let _ = setup_log;
    let a = Channel::bounded(2).unwrap();
    let b = Channel::bounded(2).unwrap();
    a.pipe(&b);
    a.put(1).await.expect("put");
    a.put(2).await.expect("put");
    a.close_all();

    assert_eq!(b.take().await, Ok(1));
    assert_eq!(b.take().await, Ok(2));
    b.done().await;
    assert_eq!(a.state(), State::Ended);
    assert_eq!(b.state(), State::Ended);
}

#[rstest]
#[tokio::test]
async fn test_merge_ends_after_all_sources(setup_log: ()) {
    let _ = setup_log;
    let a = Channel::bounded(2).unwrap();
    let b = Channel::bounded(2).unwrap();
    let out = a.merge(&[b.clone()]);

    a.put(1).await.expect("put");
    b.put(2).await.expect("put");
    a.close();
    timeout(1).await;

    let mut got = vec![out.take().await.unwrap(), out.take().await.unwrap()];
    got.sort();
    assert_eq!(got, vec![1, 2]);
    // b has not ended, so the merged channel must still be open
    assert_eq!(out.state(), State::Open);

    b.put(3).await.expect("put");
    b.close();
    assert_eq!(out.take().await, Ok(3));
    out.done().await;
    assert_eq!(out.state(), State::Ended);
}

#[rstest]
#[tokio::test]
async fn test_forward_order_preserved_through_pipe(setup_log: ()) {
    let _ = setup_log;
    let a = Channel::bounded(4).unwrap();
    let b = Channel::bounded(4).unwrap();
    a.pipe(&b);
    let tx = a.clone();
    tokio::spawn(async move {
        for i in 0..200 {
            tx.put(i).await.expect("put");
        }
        tx.close_all();
    });
    for i in 0..200 {
        assert_eq!(b.take().await, Ok(i));
    }
    b.done().await;
    assert_eq!(b.state(), State::Ended);
}
