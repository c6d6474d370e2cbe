//! Both sides driven together, over real files and through the pump.

mod helpers;

use duplex_bridge::{Bridge, BridgeError, BridgeState, pump};
use helpers::memory_fs::MemoryOpener;
use helpers::test_fixtures::FileFixture;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn split_sides_run_concurrently() {
    let fixture = FileFixture::with_source(b"the quick brown fox");
    let mut bridge = Bridge::new(fixture.config(8, 5)).unwrap();
    bridge.open().await.unwrap();

    let (reader, writer) = bridge.split().unwrap();
    let read_all = async {
        let mut content = Vec::new();
        while let Some(chunk) = reader.produce_read(5).await? {
            content.extend_from_slice(&chunk);
        }
        Ok::<_, BridgeError>(content)
    };
    let write_all = async {
        for word in ["jumps ", "over ", "the ", "lazy ", "dog"] {
            writer.accept_write(word.as_bytes().to_vec()).await?;
        }
        writer.finalize().await
    };

    let (read, written) = tokio::join!(read_all, write_all);
    assert_eq!(read.unwrap(), b"the quick brown fox");
    written.unwrap();

    bridge.teardown().await.unwrap();
    assert_eq!(fixture.output_bytes(), b"jumps over the lazy dog");
}

#[tokio::test]
async fn pump_copies_through_memory_handles() {
    let opener = MemoryOpener::new().with_file("src", "abcdefghijk");
    let config = duplex_bridge::BridgeConfig::new("src", "dest")
        .with_readable_high_water_mark(3)
        .with_writable_high_water_mark(5);
    let mut bridge = Bridge::with_opener(config, opener.clone()).unwrap();

    let stats = pump(&mut bridge, CancellationToken::new()).await.unwrap();

    // reads of 3 bytes; a flush once more than 5 bytes are pending
    assert_eq!(
        opener.writes(),
        vec![b"abcdef".to_vec(), b"ghijk".to_vec()]
    );
    assert_eq!(stats.chunks, 4);
    assert_eq!(stats.flushes, 2);
    assert_eq!(bridge.state(), BridgeState::Destroyed);
}

#[tokio::test]
async fn pump_destroys_on_read_failure() {
    let opener = MemoryOpener::new().with_file("src", "abc");
    opener.fail_reads();
    let config = duplex_bridge::BridgeConfig::new("src", "dest");
    let mut bridge = Bridge::with_opener(config, opener.clone()).unwrap();

    let err = pump(&mut bridge, CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, BridgeError::Read(_)));
    assert!(opener.source_closed());
    assert!(opener.sink_closed());
    assert_eq!(bridge.state(), BridgeState::Destroyed);
}

#[tokio::test]
async fn pump_copies_a_real_file() {
    let content: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    let fixture = FileFixture::with_source(&content);
    let mut bridge = Bridge::new(fixture.config(4096, 1000)).unwrap();

    let stats = pump(&mut bridge, CancellationToken::new()).await.unwrap();

    assert_eq!(fixture.output_bytes(), content);
    assert_eq!(stats.bytes_read, 50_000);
    assert_eq!(stats.bytes_written, 50_000);
    assert_eq!(stats.chunks, 50);
}
