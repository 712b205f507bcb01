use async_compression::tokio::bufread::{BrotliEncoder, GzipEncoder, ZstdEncoder};
use bytes::Bytes;
use http_body_util::Full;
use stonewall_caldav::common::{ContentEncoding, decompress_body};
use tokio::io::AsyncReadExt;

pub const ICS: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:compressed-1\r\nSUMMARY:Weekly review\\, all hands\r\nDESCRIPTION:Long enough to be worth compressing. Long enough to be worth compressing.\r\nEND:VEVENT\r\nEND:VCALENDAR";

pub async fn encode(data: &[u8], encoding: ContentEncoding) -> Vec<u8> {
    let mut out = Vec::new();
    match encoding {
        ContentEncoding::Br => BrotliEncoder::new(data).read_to_end(&mut out).await,
        ContentEncoding::Gzip => GzipEncoder::new(data).read_to_end(&mut out).await,
        ContentEncoding::Zstd => ZstdEncoder::new(data).read_to_end(&mut out).await,
    }
    .expect("encoding in memory succeeds");
    out
}

#[tokio::test]
async fn test_decompress_each_encoding() {
    for encoding in [ContentEncoding::Br, ContentEncoding::Gzip, ContentEncoding::Zstd] {
        let wire = encode(ICS.as_bytes(), encoding).await;
        assert_ne!(wire, ICS.as_bytes(), "{encoding:?}");

        let decoded = decompress_body(Full::new(Bytes::from(wire)), &[encoding])
            .await
            .expect("body decodes");
        assert_eq!(decoded, Bytes::from(ICS), "{encoding:?}");
    }
}

#[tokio::test]
async fn test_decompress_chain_undoes_last_encoding_first() {
    let gzipped = encode(ICS.as_bytes(), ContentEncoding::Gzip).await;
    let wire = encode(&gzipped, ContentEncoding::Br).await;

    let decoded = decompress_body(
        Full::new(Bytes::from(wire)),
        &[ContentEncoding::Gzip, ContentEncoding::Br],
    )
    .await
    .expect("chain decodes");
    assert_eq!(decoded, Bytes::from(ICS));
}

#[tokio::test]
async fn test_no_encoding_passes_body_through() {
    let decoded = decompress_body(Full::new(Bytes::from(ICS)), &[])
        .await
        .expect("plain body");
    assert_eq!(decoded, Bytes::from(ICS));
}

#[tokio::test]
async fn test_corrupt_body_is_an_error() {
    let result = decompress_body(
        Full::new(Bytes::from_static(b"this is not gzip")),
        &[ContentEncoding::Gzip],
    )
    .await;
    assert!(result.is_err());
}
