use async_compression::tokio::write::GzipEncoder;
use csv_records::{CsvParser, CsvParserError, SourceMeta};
use std::{fs::File, io::Write, time::Duration};
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn reads_local_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("people.csv");
    let mut f = File::create(&path)?;
    writeln!(f, "id,first_name,email")?;
    for i in 0..100 {
        writeln!(f, "{i},name{i},user{i}@example.org")?;
    }

    let mut parser = CsvParser::new();
    parser.from_path(&path).await?;

    let records = parser.parse_records();
    assert_eq!(records.len(), 100);
    assert_eq!(records[42].get("email"), Some("user42@example.org"));
    assert_eq!(parser.source_encoding(), "UTF-8");
    Ok(())
}

#[tokio::test]
async fn reads_gzip_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let gz_path = dir.path().join("tiny.csv.gz");

    let mut encoder = GzipEncoder::new(Vec::new());
    encoder.write_all(b"sku;col1;SKU000001;1").await?;
    encoder.shutdown().await?;
    std::fs::write(&gz_path, encoder.into_inner())?;

    let mut parser = CsvParser::new();
    parser.from_path(&gz_path).await?;
    assert_eq!(parser.parse_rows().len(), 4);
    Ok(())
}

#[tokio::test]
async fn path_errors() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut parser = CsvParser::new();

    assert!(matches!(
        parser.from_path("").await,
        Err(CsvParserError::InvalidPath(_))
    ));
    assert!(matches!(
        parser.from_path("bad\0name.csv").await,
        Err(CsvParserError::InvalidPath(_))
    ));
    assert!(matches!(
        parser.from_path(dir.path().join("missing.csv")).await,
        Err(CsvParserError::InvalidAccess { .. })
    ));
    assert!(matches!(
        parser.from_path(dir.path()).await,
        Err(CsvParserError::InvalidAccess { .. })
    ));

    let empty = dir.path().join("empty.csv");
    File::create(&empty)?;
    assert!(matches!(
        parser.from_path(&empty).await,
        Err(CsvParserError::EmptyResource)
    ));
    assert!(!parser.has_data());
    Ok(())
}

#[tokio::test]
async fn failed_acquisition_keeps_previous_buffer() -> anyhow::Result<()> {
    let mut parser = CsvParser::new();
    parser.from_string("a,b;1,2")?;

    assert!(matches!(
        parser.from_string(""),
        Err(CsvParserError::EmptyResource)
    ));
    assert!(parser.from_path("/definitely/not/here.csv").await.is_err());
    assert!(matches!(
        parser.from_bytes(b"a\0b"),
        Err(CsvParserError::InvalidDataType(_))
    ));

    assert_eq!(parser.data(), Some("a,b;1,2"));
    assert_eq!(parser.parse_records().len(), 1);
    Ok(())
}

#[tokio::test]
async fn reads_async_resource_without_consuming_handle() -> anyhow::Result<()> {
    let mut handle: &[u8] = b"h1,h2;v1,v2";
    let mut parser = CsvParser::new();
    parser.from_resource(&mut handle).await?;

    assert!(handle.is_empty());
    assert_eq!(parser.parse_records()[0].get("h2"), Some("v2"));

    let mut drained: &[u8] = b"";
    assert!(matches!(
        parser.from_resource(&mut drained).await,
        Err(CsvParserError::UnreadableResource)
    ));
    Ok(())
}

#[tokio::test]
async fn broken_resource_is_invalid() {
    struct Broken;

    impl tokio::io::AsyncRead for Broken {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::other("closed")))
        }
    }

    let mut parser = CsvParser::new();
    assert!(matches!(
        parser.from_resource(&mut Broken).await,
        Err(CsvParserError::InvalidResource(_))
    ));
}

#[tokio::test]
async fn declared_charset_resource() -> anyhow::Result<()> {
    let meta = SourceMeta {
        charset: Some(encoding_rs::WINDOWS_1252),
        name_hint: "legacy.csv".into(),
        ..Default::default()
    };
    let mut handle: &[u8] = b"city,venue\nParis,Caf\xE9 de Flore";
    let mut parser = CsvParser::new();
    parser.from_resource_with_meta(&mut handle, meta).await?;

    assert_eq!(parser.source_encoding(), "windows-1252");
    assert_eq!(parser.parse_records()[0].get("venue"), Some("Café de Flore"));
    Ok(())
}

#[tokio::test]
async fn malformed_input_for_declared_charset_is_invalid_encoding() {
    let meta = SourceMeta {
        charset: Some(encoding_rs::UTF_8),
        ..Default::default()
    };
    let mut handle: &[u8] = b"a,b\n\xFF\xFE\xFD,1";
    let mut parser = CsvParser::new();
    assert!(matches!(
        parser.from_resource_with_meta(&mut handle, meta).await,
        Err(CsvParserError::InvalidEncoding(_))
    ));
}

#[test]
fn blocking_reader() -> anyhow::Result<()> {
    let mut parser = CsvParser::new();
    let mut cursor = std::io::Cursor::new(b"a,b\\n1,2".to_vec());
    parser.from_reader(&mut cursor)?;
    assert_eq!(parser.parse_rows(), vec![vec!["a", "b"], vec!["1", "2"]]);

    let mut empty = std::io::empty();
    assert!(matches!(
        parser.from_reader(&mut empty),
        Err(CsvParserError::UnreadableResource)
    ));
    Ok(())
}

#[test]
fn sniffs_latin1_bytes() -> anyhow::Result<()> {
    let mut parser = CsvParser::new();
    parser.from_bytes(b"name\nJos\xE9")?;
    assert_eq!(parser.source_encoding(), "windows-1252");
    assert_eq!(parser.parse_rows(), vec![vec!["name"], vec!["José"]]);
    Ok(())
}

#[tokio::test]
async fn path_read_honours_timeout_setting() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("quick.csv");
    std::fs::write(&path, "a,b;1,2")?;

    let meta = SourceMeta {
        read_timeout: Duration::from_secs(5),
        ..csv_records::meta_from_path(&path)
    };
    let mut parser = CsvParser::new();
    parser.from_path_with_meta(&path, meta).await?;
    assert_eq!(parser.parse_records().len(), 1);
    Ok(())
}
